use std::path::PathBuf;

use directories::UserDirs;
use vidmark_core::DEFAULT_EXPORT_FILE_NAME;

/// Default export location: `~/Desktop/marks.csv`
pub fn default_output_path() -> PathBuf {
    let dir = match UserDirs::new() {
        Some(dirs) => match dirs.desktop_dir() {
            Some(desktop) => desktop.to_owned(),
            None => dirs.home_dir().join("Desktop"),
        },
        None => {
            log::warn!("No home directory found, exporting to the working directory");
            PathBuf::from(".")
        }
    };
    dir.join(DEFAULT_EXPORT_FILE_NAME)
}
