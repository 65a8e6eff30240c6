//! Remote propagation through an external storage client

use async_trait::async_trait;
use dirmirror_config::RemoteSettings;
use dirmirror_types::{Error, RelativePath, RemoteReceipt, RemoteStore, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, error, info};

/// Remote object path of `relative` below `remote_root`, joined with exactly one `/`
pub fn remote_object_path(remote_root: &str, relative: &RelativePath) -> String {
    format!("{}/{}", remote_root.trim_end_matches('/'), relative.as_str())
}

/// Remote directory an upload of `relative` lands in
pub fn remote_parent_dir(remote_root: &str, relative: &RelativePath) -> String {
    let object = remote_object_path(remote_root, relative);
    match object.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => parent.to_string(),
        _ => "/".to_string(),
    }
}

/// Remote store driving a command-line client
///
/// Uploads run `<client> <upload_command> <local file> <remote parent dir>` and removals run
/// `<client> <remove_command> <remote object path>`. Exit status 0 is success. No timeout is
/// applied; the call blocks the run until the client exits.
#[derive(Debug, Clone)]
pub struct CommandRemote {
    client: PathBuf,
    remote_root: String,
    upload_command: String,
    remove_command: String,
}

impl CommandRemote {
    /// Create a client from the remote settings
    pub fn new(settings: &RemoteSettings) -> Self {
        Self {
            client: settings.client.clone(),
            remote_root: settings.remote_root.clone(),
            upload_command: settings.upload_command.clone(),
            remove_command: settings.remove_command.clone(),
        }
    }

    /// Remote root prefix
    pub fn remote_root(&self) -> &str {
        &self.remote_root
    }

    async fn run(&self, operation: &str, args: Vec<String>) -> Result<RemoteReceipt> {
        let command_line = format!("{} {}", self.client.display(), args.join(" "));
        debug!("Running remote {}: {}", operation, command_line);

        let start = Instant::now();
        let output = match Command::new(&self.client).args(&args).output().await {
            Ok(output) => output,
            Err(e) => {
                error!(
                    "Failed to launch remote client '{}': {}",
                    self.client.display(),
                    e
                );
                return Err(Error::remote(operation.to_string(), None, e.to_string()));
            }
        };
        let elapsed = start.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            error!(
                "Remote {} failed (exit code: {:?}): {} | stderr: {}",
                operation,
                output.status.code(),
                command_line,
                stderr
            );
            return Err(Error::remote(operation.to_string(), output.status.code(), stderr));
        }

        info!(
            "Remote {} done in {:.2}s: {}",
            operation,
            elapsed.as_secs_f64(),
            command_line
        );
        if !stdout.is_empty() {
            debug!("Remote client output: {}", stdout);
        }

        Ok(RemoteReceipt {
            command: command_line,
            stdout,
            elapsed,
        })
    }
}

#[async_trait]
impl RemoteStore for CommandRemote {
    async fn upload(&self, local_path: &Path, relative: &RelativePath) -> Result<RemoteReceipt> {
        let args = vec![
            self.upload_command.clone(),
            local_path.display().to_string(),
            remote_parent_dir(&self.remote_root, relative),
        ];
        self.run("upload", args).await
    }

    async fn remove(&self, relative: &RelativePath) -> Result<RemoteReceipt> {
        let args = vec![
            self.remove_command.clone(),
            remote_object_path(&self.remote_root, relative),
        ];
        self.run("remove", args).await
    }
}

/// Remote store used when propagation is disabled; every call succeeds without side effects
#[derive(Debug, Clone, Default)]
pub struct NoopRemote;

#[async_trait]
impl RemoteStore for NoopRemote {
    async fn upload(&self, local_path: &Path, relative: &RelativePath) -> Result<RemoteReceipt> {
        debug!(
            "Remote disabled, skipping upload of {} ({})",
            relative,
            local_path.display()
        );
        Ok(RemoteReceipt {
            command: format!("noop upload {}", relative),
            stdout: String::new(),
            elapsed: Duration::ZERO,
        })
    }

    async fn remove(&self, relative: &RelativePath) -> Result<RemoteReceipt> {
        debug!("Remote disabled, skipping removal of {}", relative);
        Ok(RemoteReceipt {
            command: format!("noop remove {}", relative),
            stdout: String::new(),
            elapsed: Duration::ZERO,
        })
    }
}
