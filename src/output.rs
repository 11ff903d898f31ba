//! ripgrep-style printing of token occurrences and token tables

use crate::index::DocumentHits;
use crate::workspace::Occurrence;
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print occurrences as `path:line:col:text`, or grouped under a file heading.
pub fn print_occurrences(occurrences: &[Occurrence], color: bool, heading: bool) -> io::Result<()> {
    write_occurrences(&mut stdout(color), occurrences, heading)
}

pub fn write_occurrences<W: WriteColor>(
    out: &mut W,
    occurrences: &[Occurrence],
    heading: bool,
) -> io::Result<()> {
    let mut current: Option<&str> = None;

    for occ in occurrences {
        if current != Some(occ.doc.as_str()) {
            if current.is_some() && heading {
                writeln!(out)?;
            }
            if heading {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
                writeln!(out, "{}", occ.name)?;
                out.reset()?;
            }
            current = Some(occ.doc.as_str());
        }

        if !heading {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            write!(out, "{}", occ.name)?;
            out.reset()?;
            write!(out, ":")?;
        }

        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{}", occ.line)?;
        out.reset()?;
        write!(out, ":{}:", occ.column)?;

        let text = &occ.line_text;
        let start = occ.match_start.min(text.len());
        let end = occ.match_end.clamp(start, text.len());
        write!(out, "{}", &text[..start])?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{}", &text[start..end])?;
        out.reset()?;
        writeln!(out, "{}", &text[end..])?;
    }

    Ok(())
}

/// Print `name:count` per document (for -c)
pub fn print_document_counts(hits: &[DocumentHits], color: bool) -> io::Result<()> {
    write_document_counts(&mut stdout(color), hits)
}

pub fn write_document_counts<W: WriteColor>(out: &mut W, hits: &[DocumentHits]) -> io::Result<()> {
    for hit in hits {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "{}", hit.name)?;
        out.reset()?;
        write!(out, ":")?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        writeln!(out, "{}", hit.count())?;
        out.reset()?;
    }
    Ok(())
}

/// Print a right-aligned count column followed by the token.
pub fn print_token_counts(tokens: &[(&str, usize)], color: bool) -> io::Result<()> {
    write_token_counts(&mut stdout(color), tokens)
}

pub fn write_token_counts<W: WriteColor>(out: &mut W, tokens: &[(&str, usize)]) -> io::Result<()> {
    let width = tokens
        .iter()
        .map(|(_, count)| count.to_string().len())
        .max()
        .unwrap_or(1);

    for (token, count) in tokens {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{count:>width$}")?;
        out.reset()?;
        writeln!(out, "  {token}")?;
    }
    Ok(())
}
