//! Workspace indexing from the filesystem.
//!
//! Files are discovered with the `ignore` walker (gitignore-aware), read and
//! validated in parallel with rayon, then handed to a [`Workspace`] whose
//! scans run on a single-threaded tokio runtime.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::config::Config;
use crate::events::{DocumentEvent, EventCoalescer};
use crate::host::{FsDocuments, LogNotifier, decode_text};
use crate::index::DocId;
use crate::utils::progress;
use crate::workspace::{ScanSummary, Workspace};

/// Workspace over files on disk, configured from [`Config`].
pub type FsWorkspace = Workspace<FsDocuments, Config, LogNotifier>;

/// Texts read from a workspace tree, ready to be scanned.
#[derive(Debug, Default)]
pub struct Collected {
    pub texts: Vec<(DocId, String)>,
    /// Files skipped as unreadable, too large or not UTF-8
    pub unreadable: usize,
}

impl Collected {
    pub fn docs(&self) -> Vec<DocId> {
        self.texts.iter().map(|(doc, _)| doc.clone()).collect()
    }
}

/// Runtime that drives workspace scans. Scans never leave this thread.
pub fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")
}

/// Create an empty workspace rooted at `root`.
pub fn open_workspace(root: &Path, config: &Config) -> FsWorkspace {
    Workspace::new(
        FsDocuments::new(root, config.max_file_size),
        config.clone(),
        LogNotifier,
        config.max_files,
    )
}

fn build_globset(globs: &[String]) -> Result<Option<GlobSet>> {
    if globs.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(Glob::new(glob).with_context(|| format!("Invalid glob: {glob}"))?);
    }
    Ok(Some(builder.build()?))
}

/// Every file under `root` that survives ignore rules, `ignored_paths` and
/// the optional `globs` (matched against the root-relative path).
pub fn discover_files(root: &Path, config: &Config, globs: &[String]) -> Result<Vec<PathBuf>> {
    let filter = build_globset(globs)?;
    let ignored = config.ignored_paths.clone();

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(move |entry| {
            let name = entry.file_name().to_string_lossy();
            !ignored.iter().any(|skip| skip.as_str() == name.as_ref())
        })
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| match &filter {
            Some(set) => path
                .strip_prefix(root)
                .map(|rel| set.is_match(rel))
                .unwrap_or(false),
            None => true,
        })
        .collect();

    files.sort();
    debug!(root = %root.display(), files = files.len(), "discovered files");
    Ok(files)
}

/// Read `paths` in parallel, keeping the files that decode as text within
/// the size limit.
pub fn collect_texts(paths: &[PathBuf], max_file_size: u64, silent: bool) -> Collected {
    let bar = progress::bar(paths.len() as u64, "Reading files...", silent);

    let results: Vec<Option<(DocId, String)>> = paths
        .par_iter()
        .map(|path| {
            let doc = DocId::from_path(path);
            let text = fs::read(path)
                .map_err(Into::into)
                .and_then(|bytes| decode_text(&doc, bytes, max_file_size));
            if let Some(bar) = &bar {
                bar.inc(1);
            }
            match text {
                Ok(text) => Some((doc, text)),
                Err(e) => {
                    debug!(%doc, error = %e, "skipping file");
                    None
                }
            }
        })
        .collect();

    let unreadable = results.iter().filter(|r| r.is_none()).count();
    let texts: Vec<_> = results.into_iter().flatten().collect();
    if let Some(bar) = bar {
        bar.finish_with_message(format!("Read {} files", texts.len()));
    }

    Collected { texts, unreadable }
}

/// Hand collected texts to the workspace's document source and scan them.
/// Existing tracking is discarded when `rebuild` is set.
pub async fn load_collected(
    workspace: &FsWorkspace,
    collected: Collected,
    rebuild: bool,
) -> ScanSummary {
    let docs = collected.docs();
    for (doc, text) in collected.texts {
        workspace.source().preload(doc, text);
    }
    if rebuild {
        workspace.rebuild(&docs).await
    } else {
        workspace.scan_all(&docs, false).await
    }
}

/// Walk, read and scan a workspace tree.
pub fn index_workspace(
    runtime: &Runtime,
    root: &Path,
    config: &Config,
    globs: &[String],
    silent: bool,
) -> Result<(FsWorkspace, ScanSummary)> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", root.display()))?;

    let spinner = progress::spinner("Discovering files...", silent);
    let paths = discover_files(&root, config, globs)?;
    if let Some(spinner) = spinner {
        spinner.finish_with_message(format!("Found {} files", paths.len()));
    }

    let collected = collect_texts(&paths, config.max_file_size, silent);
    let unreadable = collected.unreadable;

    let workspace = open_workspace(&root, config);
    let mut summary = runtime.block_on(load_collected(&workspace, collected, false));
    summary.failed += unreadable;

    info!(
        root = %root.display(),
        scanned = summary.scanned,
        rejected = summary.rejected,
        failed = summary.failed,
        "workspace indexed"
    );
    Ok((workspace, summary))
}

/// Re-walk the tree and rebuild the index of an existing workspace.
pub fn reindex_workspace(
    runtime: &Runtime,
    workspace: &FsWorkspace,
    config: &Config,
    globs: &[String],
) -> Result<ScanSummary> {
    let root = workspace.source().root().to_path_buf();
    let paths = discover_files(&root, config, globs)?;
    let collected = collect_texts(&paths, workspace.source().max_file_size(), true);
    let unreadable = collected.unreadable;

    let mut summary = runtime.block_on(load_collected(workspace, collected, true));
    summary.failed += unreadable;
    Ok(summary)
}

/// Re-walk the tree and update the index incrementally: new files are
/// opened, files whose text differs are rescanned and vanished or unreadable
/// files are closed. Unchanged files are not touched.
pub fn refresh_workspace(
    runtime: &Runtime,
    workspace: &FsWorkspace,
    config: &Config,
    globs: &[String],
) -> Result<ScanSummary> {
    let root = workspace.source().root().to_path_buf();
    let paths = discover_files(&root, config, globs)?;
    let collected = collect_texts(&paths, workspace.source().max_file_size(), true);
    let unreadable = collected.unreadable;

    let mut events = EventCoalescer::new(config.debounce_duration());
    {
        let index = workspace.index();
        let mut seen = FxHashSet::default();
        for (doc, text) in collected.texts {
            let event = match index.text(&doc) {
                None => DocumentEvent::Opened,
                Some(old) if &*old != text.as_str() => DocumentEvent::Changed,
                Some(_) => {
                    seen.insert(doc);
                    continue;
                }
            };
            workspace.source().preload(doc.clone(), text);
            seen.insert(doc.clone());
            events.add(doc, event);
        }
        for doc in index.documents() {
            if !seen.contains(doc) {
                events.add(doc.clone(), DocumentEvent::Closed);
            }
        }
    }

    let Some(batch) = events.flush() else {
        debug!(root = %root.display(), "workspace unchanged");
        return Ok(ScanSummary {
            failed: unreadable,
            ..Default::default()
        });
    };
    let mut summary = runtime.block_on(workspace.apply(batch));
    summary.failed += unreadable;
    info!(
        root = %root.display(),
        scanned = summary.scanned,
        detached = summary.detached,
        "workspace refreshed"
    );
    Ok(summary)
}
