use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Platform base directory used for the default home:
/// `%APPDATA%` on Windows, `$HOME` elsewhere.
fn platform_base_dir() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Ok(PathBuf::from(appdata));
        }
    }
    dirs::home_dir().ok_or_else(|| anyhow!("cannot determine the user home directory"))
}

/// Expand a leading `~` (alone or followed by a separator) into the user home.
fn expand_tilde(raw: &str) -> Result<PathBuf> {
    if raw == "~" {
        return dirs::home_dir().ok_or_else(|| anyhow!("cannot expand '~': no home directory"));
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow!("cannot expand '~': no home directory"))?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the server home directory into an absolute path.
///
/// - `explicit`: user-provided path (may start with `~`); `None` selects the
///   platform default `<base>/<default_subdir>`.
/// - relative paths are resolved against the current working directory.
/// - `create`: create the directory (and parents) when missing.
pub fn resolve_home_dir(
    explicit: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    let mut path = match explicit {
        Some(raw) => expand_tilde(raw.trim())?,
        None => platform_base_dir()?.join(default_subdir),
    };

    if path.is_relative() {
        let cwd = std::env::current_dir().context("cannot read current directory")?;
        path = cwd.join(path);
    }

    if create {
        ensure_dir(&path)?;
    }
    Ok(path)
}

fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(anyhow!("'{}' exists and is not a directory", path.display()));
        }
        return Ok(());
    }
    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create home directory '{}'", path.display()))
}
