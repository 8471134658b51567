//! Persisted login session.
//!
//! Holds the bearer token returned by `login` so later commands can attach it.
//! Stored as JSON next to the config file.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub saved_at_utc: Option<i64>,
}

impl Session {
    pub fn new(token: String, username: Option<String>) -> Self {
        Session { token: Some(token), username, saved_at_utc: Some(Utc::now().timestamp()) }
    }

    /// Load the session, starting empty if the file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Session::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("ignoring unreadable session {}: {e}", path.display());
                    Session::default()
                }
            },
            Err(e) => {
                log::warn!("cannot read session {}: {e}", path.display());
                Session::default()
            }
        }
    }

    /// Save using temp file + rename.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Remove the stored session. Missing file is not an error.
    pub fn clear(path: &Path) -> std::io::Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
