use crate::tui::app::{App, Mode};
use crate::workspace::{Preview, PreviewLine};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

/// Background colors of pinned tokens, by pin slot
const PIN_COLORS: [Color; 6] = [
    Color::Yellow,
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::Blue,
    Color::LightRed,
];

const HELP: &[(&str, &str)] = &[
    ("Up/Down, j/k", "Select (previews locations)"),
    ("PgUp/PgDn, g/G", "Page, first, last"),
    ("Enter", "Open menu / jump to location"),
    ("Esc", "Cancel preview / back / quit"),
    ("Ctrl+O", "Jump back"),
    ("Tab (Ctrl+I)", "Jump forward"),
    ("p", "Pin or unpin token highlight"),
    ("r", "Rescan changed files"),
    ("F5", "Reindex workspace (clears history)"),
    ("?", "Toggle help"),
    ("Ctrl+C", "Quit"),
];

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Menu / preview
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[0]);

    draw_menu(f, app, panes[0]);
    draw_view(f, app, panes[1]);
    draw_status_bar(f, app, chunks[1]);

    if app.mode == Mode::Help {
        draw_help(f, f.area());
    }
}

fn draw_menu(f: &mut Frame, app: &App, area: Rect) {
    let menu = &app.level.menu;
    let pinned = app.pinned();
    let label_style = Style::default().fg(Color::White);
    let detail_style = Style::default().fg(Color::DarkGray);

    let items: Vec<ListItem> = menu
        .items
        .iter()
        .map(|item| {
            let marker = if pinned.contains(&item.label.as_str()) {
                Span::styled("● ", Style::default().fg(Color::Yellow))
            } else {
                Span::raw("  ")
            };
            ListItem::new(Line::from(vec![
                marker,
                Span::styled(item.label.clone(), label_style),
                Span::raw("  "),
                Span::styled(item.detail.clone(), detail_style),
            ]))
        })
        .collect();

    let breadcrumb: Vec<&str> = app
        .parents
        .iter()
        .map(|level| level.menu.title.as_str())
        .chain(std::iter::once(menu.title.as_str()))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ({}) ", breadcrumb.join(" › "), menu.items.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !menu.items.is_empty() {
        state.select(Some(app.level.selected));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_view(f: &mut Frame, app: &App, area: Rect) {
    let Some(preview) = app.view() else {
        let empty = Paragraph::new("Select a location to preview it")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(" View "));
        f.render_widget(empty, area);
        return;
    };

    let title = if app.is_previewing() {
        format!(" {}:{} (preview) ", preview.name, preview.line + 1)
    } else {
        format!(" {}:{} ", preview.name, preview.line + 1)
    };

    let lines: Vec<Line> = preview
        .context
        .iter()
        .map(|line| render_line(app, &preview, line))
        .collect();

    let view = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });

    f.render_widget(view, area);
}

/// One preview line with pinned tokens and the cursor range painted in.
fn render_line<'a>(app: &App, preview: &Preview, line: &'a PreviewLine) -> Line<'a> {
    let chars: Vec<char> = line.text.chars().collect();
    let mut styles = vec![Style::default(); chars.len()];

    // Later pins paint over earlier ones
    for (start, end, slot) in app.highlights(preview, line) {
        let color = PIN_COLORS[slot % PIN_COLORS.len()];
        for style in &mut styles[start..end] {
            *style = Style::default().fg(Color::Black).bg(color);
        }
    }

    let range = preview.location.range;
    let line_end = line.start + chars.len();
    if range.start < line_end && range.end > line.start {
        let from = range.start.saturating_sub(line.start);
        let to = (range.end - line.start).min(chars.len());
        for style in &mut styles[from..to] {
            *style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
    }

    let number_style = if line.number == preview.line {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut spans = vec![Span::styled(format!("{:4} ", line.number + 1), number_style)];

    // Merge runs of equal style into one span
    let mut run = String::new();
    let mut run_style = styles.first().copied().unwrap_or_default();
    for (c, style) in chars.into_iter().zip(styles) {
        if style != run_style && !run.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut run), run_style));
        }
        run_style = style;
        run.push(c);
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }

    Line::from(spans)
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let (back, forward) = app.depths();
    let mut spans = Vec::new();

    if app.is_busy() {
        spans.push(Span::styled(
            " busy ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(
        format!("◀ {back} ▶ {forward}"),
        Style::default().fg(Color::Green),
    ));
    let pinned = app.pinned().len();
    if pinned > 0 {
        spans.push(Span::styled(
            format!("  pinned {pinned}"),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        app.status_message.as_str(),
        Style::default().fg(Color::Cyan),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let width = 52.min(area.width);
    let height = (HELP.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let lines: Vec<Line> = HELP
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("{keys:16}"), Style::default().fg(Color::Yellow)),
                Span::raw(*action),
            ])
        })
        .collect();

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Keys ")),
        popup,
    );
}
