use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use crate::config;

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();

/// Opens `logs/fnoter.log` under the data dir, rotating the previous run's
/// log to `fnoter.log.old`. A log that cannot be opened leaves logging as
/// a no-op; it must never take the server down.
pub fn init() {
    let log_dir = config::data_dir().join("logs");
    if fs::create_dir_all(&log_dir).is_err() {
        return;
    }

    let log_path = log_dir.join("fnoter.log");
    rotate(&log_dir, &log_path);

    let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) else {
        return;
    };
    let _ = LOG_FILE.set(Mutex::new(file));
}

fn rotate(log_dir: &Path, log_path: &Path) {
    if !log_path.exists() {
        return;
    }
    let old_path = log_dir.join("fnoter.log.old");
    if old_path.exists() {
        let _ = fs::remove_file(&old_path);
    }
    let _ = fs::rename(log_path, old_path);
}

pub fn log(msg: &str) {
    if let Some(mutex) = LOG_FILE.get() {
        if let Ok(mut file) = mutex.lock() {
            let _ = writeln!(
                file,
                "[{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                msg
            );
        }
    }
}
