use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Where the records database and pace reports live. The env override
    /// exists for debugging and portable installs:
    /// `LAPDASH_DATA_DIR="/some/path" lapdash`
    pub fn data_dir() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("LAPDASH_DATA_DIR") {
            if !dir.is_empty() {
                return Some(PathBuf::from(dir));
            }
        }

        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("lapdash"),
            )
        } else {
            ProjectDirs::from("", "", "lapdash")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }
}
