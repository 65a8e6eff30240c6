//! Local mutations of the target tree

use dirmirror_types::{Error, RelativePath, Result};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, warn};

/// Outcome of a local deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The file was removed
    Removed,
    /// The file did not exist any more
    AlreadyAbsent,
}

/// Copies files from the reference tree into the target tree and deletes from the target tree
#[derive(Debug, Clone)]
pub struct LocalApplier {
    source_root: PathBuf,
    dest_root: PathBuf,
}

impl LocalApplier {
    /// Create an applier mirroring `source_root` into `dest_root`
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
        }
    }

    /// Reference root
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Target root
    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// Copy `relative` from the reference into the target with its timestamps
    ///
    /// Missing parent directories are created and a read-only destination is made writable
    /// first. Access and modification times are always carried over; the creation time is
    /// written where the platform allows it. Returns the number of bytes copied.
    pub async fn copy_file(&self, relative: &RelativePath) -> Result<u64> {
        let source = relative.to_native(&self.source_root);
        let destination = relative.to_native(&self.dest_root);

        let metadata = fs::metadata(&source)
            .await
            .map_err(|e| Error::from_io(&e, &source))?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Error::Io {
                message: format!("Failed to create directory '{}': {}", parent.display(), e),
            })?;
        }

        make_writable(&destination).await?;

        let bytes = fs::copy(&source, &destination)
            .await
            .map_err(|e| Error::Io {
                message: format!(
                    "Failed to copy '{}' to '{}': {}",
                    source.display(),
                    destination.display(),
                    e
                ),
            })?;

        preserve_times(&metadata, &destination)?;

        debug!("Copied: {} -> {}", source.display(), destination.display());
        Ok(bytes)
    }

    /// Delete `relative` from the target; a missing file is not an error
    pub async fn delete_file(&self, relative: &RelativePath) -> Result<DeleteOutcome> {
        let path = relative.to_native(&self.dest_root);

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted: {}", path.display());
                Ok(DeleteOutcome::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Already absent, nothing to delete: {}", path.display());
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(e) => Err(Error::Io {
                message: format!("Failed to delete file '{}': {}", path.display(), e),
            }),
        }
    }
}

async fn make_writable(path: &Path) -> Result<()> {
    let metadata = match fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::from_io(&e, path)),
    };

    if !metadata.permissions().readonly() {
        return Ok(());
    }

    let mut permissions = metadata.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    #[allow(clippy::permissions_set_readonly_false)]
    {
        permissions.set_readonly(false);
    }

    fs::set_permissions(path, permissions)
        .await
        .map_err(|e| Error::Io {
            message: format!("Failed to make '{}' writable: {}", path.display(), e),
        })?;
    debug!("Cleared read-only flag: {}", path.display());
    Ok(())
}

fn preserve_times(source: &Metadata, destination: &Path) -> Result<()> {
    let accessed = filetime::FileTime::from_last_access_time(source);
    let modified = filetime::FileTime::from_last_modification_time(source);
    filetime::set_file_times(destination, accessed, modified).map_err(|e| Error::Io {
        message: format!(
            "Failed to set timestamps for '{}': {}",
            destination.display(),
            e
        ),
    })?;

    if let Ok(created) = source.created() {
        set_creation_time(destination, created)?;
    }
    Ok(())
}

#[cfg(windows)]
fn set_creation_time(path: &Path, created: SystemTime) -> Result<()> {
    use std::fs::{FileTimes, OpenOptions};
    use std::os::windows::fs::{FileTimesExt, OpenOptionsExt};

    // FILE_WRITE_ATTRIBUTES; a copied read-only file refuses GENERIC_WRITE
    const FILE_WRITE_ATTRIBUTES: u32 = 0x100;

    let file = OpenOptions::new()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .open(path)
        .map_err(|e| Error::from_io(&e, path))?;
    file.set_times(FileTimes::new().set_created(created))
        .map_err(|e| Error::Io {
            message: format!("Failed to set creation time for '{}': {}", path.display(), e),
        })
}

// Birth time is not writable on other platforms; modification time stands in for it.
#[cfg(not(windows))]
#[allow(clippy::unnecessary_wraps)]
fn set_creation_time(_path: &Path, _created: SystemTime) -> Result<()> {
    Ok(())
}
