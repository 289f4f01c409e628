// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song catalog.
//!
//! This module provides the read-only list of songs a round can be drawn
//! from:
//! - Loading and validating the catalog file (JSON or YAML)
//! - Lookup by id
//! - Substring search for guess suggestions
//! - Random selection with played-song exclusion (see [`selection`])

pub mod selection;

pub use selection::{PlayedSongs, Selection};

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::matcher::normalize;

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The backing resource could not be read or parsed
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// The catalog holds no songs
    #[error("Catalog is empty")]
    Empty,

    /// A record is missing a required field value
    #[error("Invalid catalog record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// Two records share an id
    #[error("Duplicate song id: {0}")]
    DuplicateId(SongId),

    /// No song with the requested id
    #[error("Song not found: {0}")]
    SongNotFound(SongId),
}

/// Unique song identifier.
///
/// Catalog files may spell ids as numbers or strings; both end up here as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawSongId", into = "String")]
pub struct SongId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSongId {
    Number(i64),
    Text(String),
}

impl From<RawSongId> for SongId {
    fn from(raw: RawSongId) -> Self {
        match raw {
            RawSongId::Number(n) => SongId(n.to_string()),
            RawSongId::Text(s) => SongId(s),
        }
    }
}

impl From<SongId> for String {
    fn from(id: SongId) -> Self {
        id.0
    }
}

impl SongId {
    /// Create an id from text
    pub fn new(id: impl Into<String>) -> Self {
        SongId(id.into())
    }

    /// Id as text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SongId {
    fn from(id: &str) -> Self {
        SongId(id.to_string())
    }
}

impl From<String> for SongId {
    fn from(id: String) -> Self {
        SongId(id)
    }
}

impl From<u64> for SongId {
    fn from(id: u64) -> Self {
        SongId(id.to_string())
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// A song that can be the target of a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Unique id
    pub id: SongId,
    /// Song title
    pub title: String,
    /// Performing artist
    pub artist: String,
    /// Audio file name, resolved against the audio base by [`crate::audio::AudioSource`]
    pub filename: String,
}

impl Song {
    /// Create a new song record
    pub fn new(
        id: impl Into<SongId>,
        title: impl Into<String>,
        artist: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            filename: filename.into(),
        }
    }

    /// "Title - Artist" label for display
    pub fn label(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

/// Catalog file layout: a bare list or `{ songs: [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<Song>),
    Wrapped { songs: Vec<Song> },
}

impl CatalogFile {
    fn into_songs(self) -> Vec<Song> {
        match self {
            CatalogFile::List(songs) => songs,
            CatalogFile::Wrapped { songs } => songs,
        }
    }
}

/// Read-only list of available songs
#[derive(Debug, Clone, PartialEq)]
pub struct SongCatalog {
    songs: Vec<Song>,
}

impl SongCatalog {
    /// Create a catalog, validating every record.
    ///
    /// Fails when the list is empty, a field is blank or an id repeats.
    pub fn new(songs: Vec<Song>) -> Result<Self, CatalogError> {
        if songs.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::with_capacity(songs.len());
        for (index, song) in songs.iter().enumerate() {
            let blank = [
                ("id", song.id.as_str()),
                ("title", song.title.as_str()),
                ("artist", song.artist.as_str()),
                ("filename", song.filename.as_str()),
            ]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty());

            if let Some((field, _)) = blank {
                return Err(CatalogError::InvalidRecord {
                    index,
                    reason: format!("{} is empty", field),
                });
            }

            if !seen.insert(song.id.clone()) {
                return Err(CatalogError::DuplicateId(song.id.clone()));
            }
        }

        Ok(Self { songs })
    }

    /// Load a catalog file; `.yaml`/`.yml` is read as YAML, anything else as JSON
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::Unavailable(format!("{:?}: {}", path, e)))?;

        let is_yaml = path
            .extension()
            .map(|ext| ext == "yaml" || ext == "yml")
            .unwrap_or(false);

        let catalog = if is_yaml {
            Self::from_yaml(&contents)?
        } else {
            Self::from_json(&contents)?
        };
        debug!(path = ?path, songs = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    /// Parse a catalog from JSON
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| CatalogError::Unavailable(format!("malformed JSON: {}", e)))?;
        Self::new(file.into_songs())
    }

    /// Parse a catalog from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)
            .map_err(|e| CatalogError::Unavailable(format!("malformed YAML: {}", e)))?;
        Self::new(file.into_songs())
    }

    /// All songs in file order
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    /// Number of songs
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// Whether the catalog has no songs
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Find a song by id
    pub fn get(&self, id: &SongId) -> Option<&Song> {
        self.songs.iter().find(|song| &song.id == id)
    }

    /// Whether every song's id is in `ids`
    pub fn is_covered_by(&self, ids: &HashSet<SongId>) -> bool {
        self.songs.iter().all(|song| ids.contains(&song.id))
    }

    /// Substring search over normalised title and artist.
    ///
    /// Songs whose title starts with the query come first, the rest keep
    /// catalog order. An empty query matches nothing.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Song> {
        let query = normalize(query);
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut prefixed = Vec::new();
        let mut contained = Vec::new();
        for song in &self.songs {
            let title = normalize(&song.title);
            if title.starts_with(&query) {
                prefixed.push(song);
            } else if title.contains(&query) || normalize(&song.artist).contains(&query) {
                contained.push(song);
            }
        }

        prefixed.into_iter().chain(contained).take(limit).collect()
    }
}
