use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Fixed loopback port every launch probes before deciding to serve.
pub const DEFAULT_PORT: u16 = 61073;

/// Where notes, config, and logs live: `~/.fnoter`, or `FNOTER_DIR` when
/// set (tests point it at temp directories).
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FNOTER_DIR") {
        return PathBuf::from(dir);
    }
    let mut path = dirs::home_dir().expect("could not find home directory");
    path.push(".fnoter");
    path
}

pub fn db_path() -> PathBuf {
    data_dir().join("notes.db")
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Loads `config.toml` from the data dir. A missing file is written out
/// with defaults; an unreadable or unparsable one is never fatal, the
/// broken file is set aside and defaults take over.
pub fn load_config() -> AppConfig {
    let mut path = data_dir();
    fs::create_dir_all(&path).ok();
    path.push("config.toml");

    if !path.exists() {
        let default_config = AppConfig::default();
        if let Ok(toml_str) = toml::to_string_pretty(&default_config) {
            if let Ok(mut file) = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
            {
                let _ = file.write_all(toml_str.as_bytes());
            }
        }
        return default_config;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to parse config.toml: {}.", e);
                let backup_path = path.with_extension("toml.bak");
                if let Err(backup_err) = fs::rename(&path, &backup_path) {
                    eprintln!("Failed to back up corrupted config: {}", backup_err);
                } else {
                    eprintln!("Corrupted config backed up to {:?}", backup_path);
                }
                eprintln!("Using default configuration.");
                AppConfig::default()
            }
        },
        Err(e) => {
            eprintln!("Failed to read config file: {}. Using default.", e);
            AppConfig::default()
        }
    }
}
