//! # toknav - Token Index and Navigator
//!
//! toknav keeps an in-memory inverted index of the tokens in a set of
//! documents, updates it incrementally as documents are opened, edited and
//! closed, and lets a user jump between occurrences with per-viewport
//! undo/redo and a rollback-able preview while browsing.
//!
//! ## Architecture
//!
//! - [`index`] - Token index (postings, inverted map, counts) and filesystem indexing
//! - [`guard`] - Reentrant busy tracking around guarded operations
//! - [`cache`] - Prefix-invalidated cache of derived views
//! - [`navigation`] - Per-channel undo/redo history and preview transactions
//! - [`workspace`] - Glue between the index, the guard, the cache and the host
//! - [`host`] - Capabilities supplied by the host (text, patterns, messages, cursors)
//! - [`events`] - Coalescing of document open/change/close events
//! - [`tui`] - Interactive token browser
//! - [`output`] - Result formatting (ripgrep-style)
//!
//! ## Quick Start
//!
//! ```
//! use toknav::config::Config;
//! use toknav::host::{LogNotifier, MemoryDocuments};
//! use toknav::index::DocId;
//! use toknav::workspace::Workspace;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let docs = MemoryDocuments::new();
//! docs.insert("mem://a.txt", "plaintext", "foo bar foo");
//!
//! let workspace = Workspace::new(docs, Config::default(), LogNotifier, 100);
//! workspace.open(&DocId::from("mem://a.txt")).await.unwrap();
//!
//! assert_eq!(workspace.index().count("foo"), 2);
//! assert_eq!(workspace.occurrences("bar")[0].column, 5);
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod guard;
pub mod host;
pub mod index;
pub mod navigation;
pub mod output;
#[cfg(feature = "interactive")]
pub mod tui;
pub mod utils;
pub mod workspace;

pub use error::{HostError, IndexError, Result, WorkspaceError};
