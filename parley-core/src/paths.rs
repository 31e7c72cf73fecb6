// ABOUTME: XDG Base Directory paths for configuration lookup.
// ABOUTME: Falls back to the working directory when no home directory is known.

use directories::ProjectDirs;
use std::path::PathBuf;

const QUALIFIER: &str = "dev";
const ORGANIZATION: &str = "parley";
const APPLICATION: &str = "parley";

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

/// e.g. ~/.config/parley/
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// e.g. ~/.config/parley/parley.toml
pub fn config_file() -> PathBuf {
    config_dir().join("parley.toml")
}
