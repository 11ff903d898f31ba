use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "toknav";
const CONFIG_FILE: &str = "config.json";

/// Per-user data directory of the app. Not created here; nothing is
/// written to it.
pub fn app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|home| home.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // $XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    Ok(base
        .context("Could not determine app data directory")?
        .join(APP_NAME))
}

/// Default location of the config file, which may not exist.
pub fn config_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join(CONFIG_FILE))
}

/// Find the root of a workspace starting from a given path.
/// Walks up the directory tree looking for a .git directory; falls back to
/// the start path itself.
pub fn find_workspace_root(start_path: &Path) -> Result<PathBuf> {
    let start = start_path
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", start_path.display()))?;
    let mut current = start.as_path();

    loop {
        if current.join(".git").exists() {
            return Ok(current.to_path_buf());
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    Ok(start)
}

/// Path of `path` relative to `root`, for display.
pub fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
