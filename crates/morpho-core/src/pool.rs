//! Keyed image data pool.
//!
//! Cost terms refer to their input images by name and fetch them from a
//! pool on `reinit()`. The pool is shared between concurrently running
//! registrations, so it synchronises internally and guarantees that a
//! loader runs at most once per key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::image::Image;

/// Handle of an image stored in an `ImagePool`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageKey(String);

impl ImageKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Thread-safe store of images by key.
#[derive(Debug, Default)]
pub struct ImagePool<const D: usize> {
    images: RwLock<HashMap<String, Arc<Image<D>>>>,
    // serialises loaders so that two threads never load the same key twice
    load_guard: Mutex<()>,
}

impl<const D: usize> ImagePool<D> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            images: RwLock::new(HashMap::new()),
            load_guard: Mutex::new(()),
        }
    }

    /// Store `image` under `name`, replacing any previous entry.
    pub fn insert(&self, name: impl Into<String>, image: Image<D>) -> ImageKey {
        let name = name.into();
        debug!("Pool: store '{}' with size {}", name, image.size());
        self.images
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.clone(), Arc::new(image));
        ImageKey(name)
    }

    /// Make sure an image is stored under `name`, loading it if needed.
    ///
    /// The loader runs at most once per key; later calls return the key of
    /// the cached image.
    ///
    /// # Errors
    /// Propagates the loader's error; nothing is stored in that case.
    pub fn load_to_pool<F>(&self, name: &str, loader: F) -> Result<ImageKey>
    where
        F: FnOnce() -> Result<Image<D>>,
    {
        let _guard = self.load_guard.lock().unwrap_or_else(|e| e.into_inner());
        if self.contains(name) {
            return Ok(ImageKey::new(name));
        }
        debug!("Pool: load '{}'", name);
        let image = loader()?;
        Ok(self.insert(name, image))
    }

    /// Fetch the image stored under `key`.
    ///
    /// # Errors
    /// Returns `MissingPoolEntry` if nothing is stored under the key.
    pub fn get(&self, key: &ImageKey) -> Result<Arc<Image<D>>> {
        self.images
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key.name())
            .cloned()
            .ok_or_else(|| CoreError::MissingPoolEntry(key.name().to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// Remove an entry, returning the image if one was stored.
    pub fn remove(&self, key: &ImageKey) -> Option<Arc<Image<D>>> {
        self.images
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key.name())
    }
}
