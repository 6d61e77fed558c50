use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::session::{ScreenCapture, Screenshot, SessionError};

/// Full-screen capture through the platform's screenshot tool.
/// Uses screencapture on macOS, grim on Wayland, ImageMagick's import on X11.
pub struct CommandCapture {
    runtime: tokio::runtime::Handle,
    dir: PathBuf,
}

impl CommandCapture {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self {
            runtime,
            dir: screenshots_dir(),
        }
    }
}

/// Screenshots are kept in ~/Pictures (or the temp dir when there is none).
fn screenshots_dir() -> PathBuf {
    dirs::picture_dir().unwrap_or_else(std::env::temp_dir)
}

#[cfg(target_os = "macos")]
fn capture_command(path: &Path) -> (&'static str, Vec<String>) {
    ("screencapture", vec!["-x".into(), path.display().to_string()])
}

#[cfg(target_os = "linux")]
fn capture_command(path: &Path) -> (&'static str, Vec<String>) {
    let session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();
    command_for_session(&session_type, path)
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn command_for_session(session_type: &str, path: &Path) -> (&'static str, Vec<String>) {
    let target = path.display().to_string();
    if session_type == "wayland" {
        ("grim", vec![target])
    } else {
        ("import", vec!["-window".into(), "root".into(), target])
    }
}

async fn capture_to(dir: PathBuf) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(format!("screenshot_{}.png", Local::now().timestamp_millis()));

    let (cmd, args) = capture_command(&path);
    log::debug!("Starting screenshot capture: {cmd} {}", args.join(" "));

    let output = tokio::process::Command::new(cmd)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("Failed to spawn {cmd}: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{cmd} exited with status {}: {}", output.status, stderr.trim()).into());
    }

    let bytes = tokio::fs::read(&path).await?;
    if bytes.is_empty() {
        return Err(format!("{cmd} produced an empty image").into());
    }

    log::info!("Screenshot captured: {}", path.display());
    Ok(bytes)
}

#[async_trait(?Send)]
impl ScreenCapture for CommandCapture {
    async fn capture(&self) -> Result<Screenshot, SessionError> {
        match self.runtime.spawn(capture_to(self.dir.clone())).await {
            Ok(Ok(bytes)) => Ok(Screenshot::from_png(bytes)),
            Ok(Err(e)) => Err(SessionError::CaptureFailed(e.to_string())),
            Err(e) => Err(SessionError::CaptureFailed(format!(
                "capture task panicked: {e}"
            ))),
        }
    }
}
