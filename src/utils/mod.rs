//! Utility functions and data structures.
//!
//! ## Modules
//!
//! - [`app_data`] - Application data directory and workspace root lookup
//! - [`progress`] - Progress bars, no-ops without the `progress` feature
//! - [`tokenizer`] - Pattern cache, token hits with character offsets, line mapping
//!
//! ```
//! use regex::Regex;
//! use toknav::utils::{LineIndex, extract_hits};
//!
//! let text = "let x = 1;\nlet y = x;";
//! let hits = extract_hits(&Regex::new(r"\w+").unwrap(), text);
//! assert_eq!(hits[0], ("let", 0));
//!
//! let lines = LineIndex::new(text);
//! assert_eq!(lines.position(19), (1, 8));
//! ```

pub mod app_data;
pub mod progress;
pub mod tokenizer;

pub use app_data::*;
pub use tokenizer::*;
