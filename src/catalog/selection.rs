// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Random song selection with played-song exclusion.
//!
//! Songs already played this session are excluded from the draw until
//! every song has been played, at which point the exclusion set resets.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use super::{CatalogError, Song, SongCatalog, SongId};

/// Result of a random pick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'a> {
    /// The chosen song
    pub song: &'a Song,
    /// The exclusion set covered the whole catalog and was ignored for this pick.
    /// The caller must clear its played set before recording `song`.
    pub reset: bool,
}

impl SongCatalog {
    /// Pick a song uniformly at random from those not in `excluding`.
    ///
    /// When `excluding` covers the whole catalog the pick is made from every
    /// song and the returned selection is flagged as a reset.
    pub fn pick_random<R: Rng + ?Sized>(
        &self,
        excluding: &HashSet<SongId>,
        rng: &mut R,
    ) -> Result<Selection<'_>, CatalogError> {
        if self.songs.is_empty() {
            return Err(CatalogError::Empty);
        }

        let candidates: Vec<&Song> = self
            .songs
            .iter()
            .filter(|song| !excluding.contains(&song.id))
            .collect();

        let (pool, reset) = if candidates.is_empty() {
            (self.songs.iter().collect::<Vec<_>>(), true)
        } else {
            (candidates, false)
        };

        let song = pool.choose(rng).copied().ok_or(CatalogError::Empty)?;
        Ok(Selection { song, reset })
    }
}

/// Ids played so far in this session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayedSongs {
    ids: HashSet<SongId>,
}

impl PlayedSongs {
    /// Create an empty played set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a played id. Returns false if it was already recorded.
    pub fn record(&mut self, id: SongId) -> bool {
        self.ids.insert(id)
    }

    /// Record the song a round starts on, clearing the set first when the
    /// selection wrapped around
    pub fn record_round(&mut self, id: SongId, reset: bool) {
        if reset {
            self.clear();
        }
        self.record(id);
    }

    /// Whether an id has been played
    pub fn contains(&self, id: &SongId) -> bool {
        self.ids.contains(id)
    }

    /// The played ids
    pub fn ids(&self) -> &HashSet<SongId> {
        &self.ids
    }

    /// Number of played songs
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing has been played
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forget every played id
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
