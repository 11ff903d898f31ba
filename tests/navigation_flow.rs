//! Browsing token locations with previews, then jumping back and forth.

use pretty_assertions::assert_eq;
use toknav::config::Config;
use toknav::host::{Cursors, Editor, LogNotifier, MemoryDocuments};
use toknav::index::DocId;
use toknav::navigation::{ChannelId, Location, NavState, Navigator, PreviewTarget, TextRange};
use toknav::workspace::{MenuAction, Workspace};

const LEFT: ChannelId = ChannelId(0);
const RIGHT: ChannelId = ChannelId(1);

async fn workspace() -> Workspace<MemoryDocuments> {
    let docs = MemoryDocuments::new();
    docs.insert("mem://main.rs", "rust", "fn main() {\n    run();\n}\n");
    docs.insert("mem://lib.rs", "rust", "pub fn run() {}\nfn helper() { run() }\n");
    let ws = Workspace::new(docs, Config::default(), LogNotifier, 100);
    ws.scan_all(&[DocId::from("mem://main.rs"), DocId::from("mem://lib.rs")], false)
        .await;
    ws
}

fn targets(ws: &Workspace<MemoryDocuments>, token: &str) -> Vec<PreviewTarget> {
    ws.token_locations(token)
        .items
        .iter()
        .filter_map(|item| match &item.action {
            MenuAction::Goto(target) => Some(target.clone()),
            _ => None,
        })
        .collect()
}

fn start() -> Location {
    Location::new("mem://main.rs", TextRange::new(3, 7))
}

#[tokio::test]
async fn test_browse_then_cancel_restores_view() {
    let ws = workspace().await;
    let mut cursors = Cursors::new();
    let mut nav = Navigator::new(false);
    nav.goto(&mut cursors, LEFT, start());

    let run = targets(&ws, "run");
    assert_eq!(run.len(), 3);

    for target in &run {
        nav.preview_show(&mut cursors, LEFT, target.clone());
        assert_eq!(cursors.position(LEFT).as_ref(), Some(&target.location));
        let preview = ws.preview(&target.location).unwrap();
        assert_eq!(preview.location, target.location);
    }
    assert_eq!(nav.state(LEFT), NavState::Previewing);

    let restored = nav.preview_rollback(&mut cursors, LEFT);
    assert_eq!(restored, Some(start()));
    assert_eq!(cursors.position(LEFT), Some(start()));
    assert_eq!(nav.state(LEFT), NavState::Idle);
    // Hovering never touches history
    assert_eq!(nav.depths(LEFT), (1, 0));
}

#[tokio::test]
async fn test_accept_records_one_step() {
    let ws = workspace().await;
    let mut cursors = Cursors::new();
    let mut nav = Navigator::new(false);
    nav.goto(&mut cursors, LEFT, start());

    let run = targets(&ws, "run");
    nav.preview_show(&mut cursors, LEFT, run[0].clone());
    nav.preview_show(&mut cursors, LEFT, run[2].clone());
    let outcome = nav.accept(LEFT).unwrap();

    assert_eq!(outcome.promoted.as_deref(), Some("run"));
    assert_eq!(nav.pinned(LEFT), vec!["run"]);
    assert_eq!(nav.depths(LEFT), (2, 0));
    assert_eq!(cursors.position(LEFT), Some(run[2].location.clone()));

    assert_eq!(nav.undo(&mut cursors, LEFT), Some(start()));
    assert_eq!(cursors.position(LEFT), Some(start()));

    assert_eq!(nav.redo(&mut cursors, LEFT), Some(run[2].location.clone()));
    assert_eq!(nav.depths(LEFT), (2, 0));
}

#[tokio::test]
async fn test_channels_are_independent() {
    let ws = workspace().await;
    let mut cursors = Cursors::new();
    let mut nav = Navigator::new(false);

    let run = targets(&ws, "run");
    nav.goto(&mut cursors, LEFT, run[0].location.clone());
    nav.goto(&mut cursors, LEFT, run[1].location.clone());
    nav.preview_show(&mut cursors, RIGHT, run[2].clone());

    assert_eq!(nav.state(LEFT), NavState::Idle);
    assert_eq!(nav.state(RIGHT), NavState::Previewing);

    nav.undo(&mut cursors, LEFT);
    assert_eq!(cursors.position(LEFT), Some(run[0].location.clone()));
    assert_eq!(cursors.position(RIGHT), Some(run[2].location.clone()));
    assert_eq!(nav.depths(RIGHT), (0, 0));

    // A new jump on the left branches its history; the right is untouched
    nav.goto(&mut cursors, LEFT, start());
    assert_eq!(nav.depths(LEFT), (2, 0));
    assert_eq!(nav.state(RIGHT), NavState::Previewing);
}

#[tokio::test]
async fn test_preview_survives_rescan_of_other_document() {
    let ws = workspace().await;
    let mut cursors = Cursors::new();
    let mut nav = Navigator::new(false);

    let run = targets(&ws, "run");
    let in_lib = run
        .iter()
        .find(|t| t.location.doc.as_str() == "mem://lib.rs")
        .unwrap()
        .clone();
    nav.preview_show(&mut cursors, LEFT, in_lib.clone());
    let before = ws.preview(&in_lib.location).unwrap();

    ws.source()
        .insert("mem://main.rs", "rust", "fn main() {}\n");
    ws.rescan(&DocId::from("mem://main.rs")).await.unwrap();

    let after = ws.preview(&in_lib.location).unwrap();
    assert!(std::rc::Rc::ptr_eq(&before, &after));
    assert_eq!(targets(&ws, "run").len(), 2);
}
