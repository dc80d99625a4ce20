//! Active-universe registry.
//!
//! Fixed-capacity, strictly ascending set of the universes the controller
//! has transmitted. Backed by an inline array plus a count, so insertion
//! never allocates. Blackout walks this set to darken every universe that
//! was ever lit.

use lumen_common::consts::MAX_UNIVERSES;
use thiserror::Error;

/// Returned when a new universe does not fit in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("active-universe registry full ({capacity} entries), universe {universe} rejected")]
pub struct RegistryFull {
    /// Universe that was rejected.
    pub universe: u16,
    /// Registry capacity.
    pub capacity: usize,
}

/// Sorted set of active universes with capacity `N`.
#[derive(Debug, Clone)]
pub struct ActiveUniverses<const N: usize = MAX_UNIVERSES> {
    entries: [u16; N],
    count: usize,
}

impl<const N: usize> ActiveUniverses<N> {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            entries: [0; N],
            count: 0,
        }
    }

    /// Insert `universe` keeping ascending order.
    ///
    /// Returns `Ok(true)` if it was inserted, `Ok(false)` if it was already
    /// present. A full registry rejects new universes and leaves the
    /// contents untouched.
    pub fn contains_or_insert(&mut self, universe: u16) -> Result<bool, RegistryFull> {
        let index = match self.as_slice().binary_search(&universe) {
            Ok(_) => return Ok(false),
            Err(index) => index,
        };

        if self.count == N {
            return Err(RegistryFull {
                universe,
                capacity: N,
            });
        }

        // Single contiguous move of the tail one slot to the right.
        self.entries.copy_within(index..self.count, index + 1);
        self.entries[index] = universe;
        self.count += 1;
        Ok(true)
    }

    /// True if `universe` is registered.
    pub fn contains(&self, universe: u16) -> bool {
        self.as_slice().binary_search(&universe).is_ok()
    }

    /// Remove every entry and zero the backing storage.
    pub fn clear(&mut self) {
        self.entries = [0; N];
        self.count = 0;
    }

    /// Registered universes in ascending order.
    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.entries[..self.count]
    }

    /// Number of registered universes.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when nothing is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// True when no further universe can be added.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == N
    }

    /// Maximum number of universes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for ActiveUniverses<N> {
    fn default() -> Self {
        Self::new()
    }
}
