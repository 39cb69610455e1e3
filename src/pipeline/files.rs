// src/pipeline/files.rs
// Reading, backing up and replacing files inside the repository checkout

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::FileError;

const BACKUP_SUFFIX: &str = ".orig";

/// `<file>.orig` next to the file itself
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Read a file as UTF-8. Binary or otherwise undecodable files are a read error.
pub async fn read_source(path: &Path) -> Result<String, FileError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|e| FileError::Read {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })
}

/// Keep the pre-fix content as a sibling `.orig` file. An existing backup is
/// overwritten with the content seen by this run.
pub async fn write_backup(path: &Path, original: &str) -> Result<PathBuf, FileError> {
    let backup = backup_path(path);
    tokio::fs::write(&backup, original)
        .await
        .map_err(|source| FileError::Backup {
            path: backup.clone(),
            source,
        })?;
    Ok(backup)
}

/// Replace `path` with `content` via a temp file in the same directory and a
/// rename. The original permissions are carried over on Unix.
pub async fn replace_file(path: &Path, content: &str) -> Result<(), FileError> {
    replace_file_inner(path, content)
        .await
        .map_err(|source| FileError::Write {
            path: path.to_path_buf(),
            source,
        })
}

async fn replace_file_inner(path: &Path, content: &str) -> io::Result<()> {
    let temp_path = {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".scanfix.tmp.{}", std::process::id()));
        PathBuf::from(name)
    };

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&temp_path)
        .await?;
    if let Err(e) = write_all_synced(&mut file, content.as_bytes()).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    drop(file);

    #[cfg(unix)]
    {
        if let Ok(meta) = tokio::fs::metadata(path).await {
            let _ = tokio::fs::set_permissions(&temp_path, meta.permissions()).await;
        }
    }

    // rename() does not replace on Windows
    #[cfg(windows)]
    {
        if path.exists() {
            let _ = tokio::fs::remove_file(path).await;
        }
    }

    tokio::fs::rename(&temp_path, path).await
}

async fn write_all_synced(file: &mut tokio::fs::File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.sync_all().await
}
