use std::path::PathBuf;

/// Environment-driven daemon configuration. Loaded once at startup; nothing
/// here changes for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("BRIDGE_DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        let port = std::env::var("BRIDGE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8765);

        Self {
            data_dir: PathBuf::from(data_dir),
            port,
        }
    }

    pub fn app_db_path(&self) -> PathBuf {
        self.data_dir.join("app.db")
    }

    pub fn protocol_db_path(&self) -> PathBuf {
        self.data_dir.join("protocol.db")
    }

    pub fn api_key_path(&self) -> PathBuf {
        self.data_dir.join("api-key")
    }
}
