//! Whole-document JSON stores.
//!
//! Every access goes through [`StoreFile::lock`], which holds the file's mutex for as long as
//! the returned guard lives.  The guard owns the freshly loaded document; callers mutate it and
//! call [`StoreGuard::save`] before dropping the guard.  Nothing is cached between calls.

use super::error::StoreError;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    marker::PhantomData,
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};
use tokio::sync::{Mutex, MutexGuard};

pub struct StoreFile<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _doc: PhantomData<fn() -> T>,
}

pub struct StoreGuard<'a, T> {
    path: &'a Path,
    _lock: MutexGuard<'a, ()>,
    doc: T,
}

impl<T> StoreFile<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
            _doc: PhantomData,
        }
    }

    /// Wait for exclusive access, then load the current document.  A missing file is an empty
    /// document.
    pub async fn lock(&self) -> Result<StoreGuard<'_, T>, StoreError> {
        let guard = self.lock.lock().await;
        let doc = load(&self.path).await?;

        Ok(StoreGuard {
            path: &self.path,
            _lock: guard,
            doc,
        })
    }

    /// Create the file as an empty document if it does not exist yet.
    pub async fn ensure_exists(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => Ok(()),
            Ok(false) => save(&self.path, &T::default()).await,
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl<T> StoreGuard<'_, T>
where
    T: Serialize,
{
    pub async fn save(&self) -> Result<(), StoreError> {
        save(self.path, &self.doc).await
    }
}

impl<T> Deref for StoreGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.doc
    }
}

impl<T> DerefMut for StoreGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.doc
    }
}

async fn load<T>(path: &Path) -> Result<T, StoreError>
where
    T: Default + DeserializeOwned,
{
    match tokio::fs::read(path).await {
        Ok(data) => serde_json::from_slice(&data).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn save<T>(path: &Path, doc: &T) -> Result<(), StoreError>
where
    T: Serialize,
{
    let contents = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    // Write next to the target so the rename stays on one filesystem.
    let tmp_path = path.with_extension("json.new");

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|source| StoreError::Write {
            path: tmp_path.clone(),
            source,
        })?;

    // Atomically rename the temporary file over the target file.
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
}
