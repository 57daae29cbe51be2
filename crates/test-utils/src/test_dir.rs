//! Temporary directory management for tests.
//!
//! [`TestDir`] wraps [`tempfile::TempDir`] for tests that need an on-disk store.

// Test utilities are expected to panic on failure
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// File name used by [`TestDir::db_path`].
const DB_FILE: &str = "jetledger.redb";

/// A managed temporary directory for tests, removed on drop.
///
/// # Example
///
/// ```
/// use jetledger_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let db_path = dir.db_path();
/// assert!(db_path.starts_with(dir.path()));
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Create a new temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let inner = TempDir::new().expect("failed to create temp directory");
        Self { inner }
    }

    /// Returns the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Joins a relative path onto the temporary directory.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.inner.path().join(path)
    }

    /// Path of a database file inside the directory. The file is not created.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.join(DB_FILE)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
