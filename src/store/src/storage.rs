// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Local directory management: one flat folder of regular files, one per
//! stored object, named by the protocol `name` verbatim.

use std::path::PathBuf;

use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::StoreError;

#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: PathBuf) -> Self {
        Storage { dir }
    }

    /// Fresh-start semantics: delete every regular file already in the
    /// directory, creating it first if absent. Sub-directories are left
    /// alone rather than failing the reset outright — a defensive reading
    /// of "one file per name".
    pub async fn reset(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StoreError::io(entry.path(), e))?;
            if file_type.is_file() {
                fs::remove_file(entry.path())
                    .await
                    .map_err(|e| StoreError::io(entry.path(), e))?;
            }
        }
        Ok(())
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Every regular file's name, no ordering guarantee.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StoreError::io(entry.path(), e))?;
            if file_type.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Writes exactly `size` bytes read from `reader` to `<folder>/<name>`.
    /// No framing beyond the declared size: short reads surface as an I/O
    /// error from the underlying copy.
    pub async fn store_bytes<R>(&self, name: &str, reader: &mut R, size: u64) -> Result<(), StoreError>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.path(name);
        let mut file = File::create(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        copy_exact(reader, &mut file, size)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        file.flush().await.map_err(|e| StoreError::io(&path, e))
    }

    /// Opens the named file for streaming to a client via `LOAD_DATA`, or
    /// `None` if it does not exist.
    pub async fn open(&self, name: &str) -> Result<Option<File>, StoreError> {
        let path = self.path(name);
        match File::open(&path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Deletes the named file. Returns `Ok(false)` rather than an error
    /// when the file is already absent, so the control channel can
    /// distinguish "removed" from "never existed".
    pub async fn remove(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.path(name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}

async fn copy_exact<R, W>(reader: &mut R, writer: &mut W, size: u64) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut limited = reader.take(size);
    let copied = tokio::io::copy(&mut limited, writer).await?;
    if copied != size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected {size} bytes, got {copied}"),
        ));
    }
    Ok(())
}
