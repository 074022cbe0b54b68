//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/apiprobe/`
//! - macOS: `~/Library/Application Support/apiprobe/`
//! - Windows: `%APPDATA%\apiprobe\`

use std::path::{Path, PathBuf};

const APP_NAME: &str = "apiprobe";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
        }
    }

    #[test]
    fn test_resolve_relative() {
        let base = Path::new("/suite");
        assert_eq!(
            resolve_relative(base, Path::new("queries")),
            PathBuf::from("/suite/queries")
        );
        assert_eq!(
            resolve_relative(base, Path::new("/abs/queries")),
            PathBuf::from("/abs/queries")
        );
    }
}
