//! JSONL activity log: one event per line, stamped with time and session id.
//!
//! Never pass passwords or tokens in event data.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct ActivityLog {
    pub path: PathBuf,
    session_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl ActivityLog {
    pub fn new(path: &Path, session_id: &str) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open activity log {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn start(&mut self, base_url: &str) -> Result<()> {
        self.log("console_start", json!({ "base_url": base_url }))
    }

    pub fn navigate(&mut self, from: Option<&str>, to: &str) -> Result<()> {
        self.log("navigate", json!({ "from": from, "to": to }))
    }

    /// Log a gate denial or mount redirect
    pub fn redirect(&mut self, from: &str, to: &str, reason: &str) -> Result<()> {
        self.log(
            "redirect",
            json!({ "from": from, "to": to, "reason": reason }),
        )
    }

    pub fn login(&mut self, email: &str, ok: bool) -> Result<()> {
        self.log("login", json!({ "email": email, "ok": ok }))
    }

    pub fn logout(&mut self) -> Result<()> {
        self.log("logout", json!({}))
    }

    pub fn api_call(
        &mut self,
        method: &str,
        path: &str,
        status: Option<u16>,
        duration_ms: u64,
        error: Option<&str>,
    ) -> Result<()> {
        self.log(
            "api_call",
            json!({
                "method": method,
                "path": path,
                "status": status,
                "duration_ms": duration_ms,
                "error": error,
            }),
        )
    }

    pub fn view_error(&mut self, route: &str, message: &str) -> Result<()> {
        self.log("view_error", json!({ "route": route, "message": message }))
    }
}
