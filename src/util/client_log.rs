//! Per-client request log files (`<LOG_DIR>/<client_id>.txt`).
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ClientLog {
    dir: PathBuf,
}

impl ClientLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, client_id: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", sanitize_client_id(client_id)))
    }

    /// Best-effort append; failures are logged and swallowed so a broken log
    /// directory never fails a request.
    pub async fn record(&self, client_id: &str, message: &str) {
        if let Err(e) = self.append(client_id, message).await {
            warn!(client_id, error = %e, "failed to write client log");
        }
    }

    pub async fn append(&self, client_id: &str, message: &str) -> Result<()> {
        let path = self.path_for(client_id);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("error opening or creating log file {}", path.display()))?;
        let line = format!("{} {}\n", Utc::now().to_rfc3339(), message);
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Maps an id onto a file stem made of `[A-Za-z0-9_-]` plus `%XX` escapes for
/// every other byte, so distinct ids never share a file and none can leave the
/// log directory. The empty id maps to `%anonymous`, which no escape produces.
pub fn sanitize_client_id(client_id: &str) -> String {
    if client_id.is_empty() {
        return "%anonymous".to_string();
    }
    let mut out = String::with_capacity(client_id.len());
    for b in client_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
