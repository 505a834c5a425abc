use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::time::now_secs;

pub fn bot_log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/bot.log")
}

/// Append-only JSON-lines event log. Write failures are swallowed so that
/// logging can never fail a unit of work.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn for_state_root(state_root: &Path) -> Self {
        Self::new(bot_log_path(state_root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, event: &str, message: &str) {
        append_bot_log(&self.path, "info", event, message);
    }

    pub fn warn(&self, event: &str, message: &str) {
        append_bot_log(&self.path, "warn", event, message);
    }

    pub fn error(&self, event: &str, message: &str) {
        append_bot_log(&self.path, "error", event, message);
    }
}

pub fn append_bot_log(path: &Path, level: &str, event: &str, message: &str) {
    let payload = serde_json::json!({
        "timestamp": now_secs(),
        "level": level,
        "event": event,
        "message": message,
    });

    let Ok(line) = serde_json::to_string(&payload) else {
        return;
    };

    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = writeln!(file, "{line}");
}
