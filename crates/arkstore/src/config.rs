use std::path::PathBuf;

const SQLITE_FILE: &str = "noahark.sqlite3";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Postgres connection string; selects the networked backend when set.
    pub database_url: Option<String>,
    /// Directory holding the embedded database file. Created on open.
    pub data_dir: PathBuf,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            data_dir: PathBuf::from("data"),
            max_connections: 5,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                cfg.database_url = Some(url);
            }
        }
        if let Ok(dir) = std::env::var("ARK_DATA_DIR") {
            if !dir.trim().is_empty() {
                cfg.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(n) = std::env::var("ARK_DB_POOL") {
            if let Ok(n) = n.trim().parse::<u32>() {
                cfg.max_connections = n.max(1);
            }
        }
        cfg
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(SQLITE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_the_embedded_store() {
        let cfg = StoreConfig::default();
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.sqlite_path(), PathBuf::from("data").join(SQLITE_FILE));
        assert_eq!(cfg.max_connections, 5);
    }
}
