use serde::{Deserialize, Serialize};

/// Database configuration for connection and DNS logs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file (default: "./netlog.db")
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Upper bound on pooled connections (default: 4)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Connection URL understood by sqlx
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite://{}", self.path)
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_db_path() -> String {
    "./netlog.db".to_string()
}

fn default_max_connections() -> u32 {
    4
}
