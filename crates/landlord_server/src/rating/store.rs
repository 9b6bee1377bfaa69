//! Persistent rating storage.
//!
//! Ratings are keyed by player name and held as decimal strings. Unknown
//! names read as [`DEFAULT_RATING`].

use super::DEFAULT_RATING;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs as tokio_fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Key-value access to player ratings.
///
/// `set` only stages a value. Staged values are visible to `get` but become
/// part of the store when `commit` succeeds; a failed `commit` leaves the
/// committed ratings untouched and the staged values in place until
/// `rollback` discards them.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Current rating of `name`, or [`DEFAULT_RATING`] for unseen names.
    async fn get(&self, name: &str) -> Result<f64, StoreError>;

    async fn set(&mut self, name: &str, rating: f64) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Drops every value staged since the last successful `commit`.
    fn rollback(&mut self);
}

/// Committed ratings plus values staged since the last commit.
#[derive(Debug, Default, Clone)]
struct Entries {
    committed: BTreeMap<String, String>,
    staged: BTreeMap<String, String>,
}

impl Entries {
    fn get(&self, name: &str) -> Result<f64, StoreError> {
        match self.staged.get(name).or_else(|| self.committed.get(name)) {
            Some(value) => parse_entry(name, value),
            None => Ok(DEFAULT_RATING),
        }
    }

    fn stage(&mut self, name: &str, rating: f64) {
        self.staged.insert(name.to_string(), rating.to_string());
    }

    /// The committed map with the staged values applied.
    fn merged(&self) -> BTreeMap<String, String> {
        let mut merged = self.committed.clone();
        merged.extend(self.staged.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    fn apply(&mut self, merged: BTreeMap<String, String>) {
        self.committed = merged;
        self.staged.clear();
    }
}

fn parse_entry(name: &str, value: &str) -> Result<f64, StoreError> {
    value.parse::<f64>().map_err(|_| StoreError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// In-memory store, used for tests and for servers started without a
/// rating file.
#[derive(Debug, Default, Clone)]
pub struct MemoryRatingStore {
    entries: Entries,
}

impl MemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with known ratings.
    pub fn with_ratings<'a>(ratings: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            entries: Entries {
                committed: ratings
                    .into_iter()
                    .map(|(name, rating)| (name.to_string(), rating.to_string()))
                    .collect(),
                staged: BTreeMap::new(),
            },
        }
    }
}

#[async_trait]
impl RatingStore for MemoryRatingStore {
    async fn get(&self, name: &str) -> Result<f64, StoreError> {
        self.entries.get(name)
    }

    async fn set(&mut self, name: &str, rating: f64) -> Result<(), StoreError> {
        self.entries.stage(name, rating);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let merged = self.entries.merged();
        self.entries.apply(merged);
        Ok(())
    }

    fn rollback(&mut self) {
        self.entries.staged.clear();
    }
}

/// JSON file store: a single object mapping names to decimal strings.
///
/// The file is read once on open. `commit` rewrites the file through a
/// temporary file and an atomic rename, and only then adopts the staged
/// values.
#[derive(Debug)]
pub struct FileRatingStore {
    path: PathBuf,
    entries: Entries,
}

impl FileRatingStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    #[instrument]
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let entries = match tokio_fs::read_to_string(path).await {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StoreError::Corrupt(path.to_path_buf(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Rating store {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(StoreError::Read(path.to_path_buf(), e)),
        };

        debug!("Loaded {} ratings from {}", entries.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            entries: Entries {
                committed: entries,
                staged: BTreeMap::new(),
            },
        })
    }

    async fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let temp_path = self.path.with_extension("tmp");
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Corrupt(self.path.clone(), e))?;

        let mut file = tokio_fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::Write(temp_path.clone(), e))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(|e| StoreError::Write(temp_path.clone(), e))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::Write(temp_path.clone(), e))?;

        tokio_fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::Write(self.path.clone(), e))
    }
}

#[async_trait]
impl RatingStore for FileRatingStore {
    async fn get(&self, name: &str) -> Result<f64, StoreError> {
        self.entries.get(name)
    }

    async fn set(&mut self, name: &str, rating: f64) -> Result<(), StoreError> {
        self.entries.stage(name, rating);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn commit(&mut self) -> Result<(), StoreError> {
        if self.entries.staged.is_empty() {
            return Ok(());
        }

        let merged = self.entries.merged();
        self.write(&merged).await?;
        self.entries.apply(merged);
        debug!("Committed {} ratings", self.entries.committed.len());
        Ok(())
    }

    fn rollback(&mut self) {
        if !self.entries.staged.is_empty() {
            debug!("Discarding {} staged ratings", self.entries.staged.len());
            self.entries.staged.clear();
        }
    }
}
