use std::env;
use std::fs;
use std::path::PathBuf;

/// Filesystem locations used by the backend.
///
/// Resolved once at startup; every store receives its path from here
/// instead of deciding locations on its own.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub index_db_path: PathBuf,
    pub chat_db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let user_data_dir = discover_user_data_dir();
        let log_dir = user_data_dir.join("logs");
        let index_db_path = user_data_dir.join("recall_index.db");
        let chat_db_path = user_data_dir.join("recall_chat.db");
        let upload_dir = user_data_dir.join("uploads");
        let secrets_path = user_data_dir.join("secrets.yaml");

        for dir in [&user_data_dir, &log_dir, &upload_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            user_data_dir,
            log_dir,
            index_db_path,
            chat_db_path,
            upload_dir,
            secrets_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_user_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("RECALL_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("Recall");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("Recall");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("recall")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
