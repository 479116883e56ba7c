//! Entity identifiers and id allocation.
//!
//! An [`Entity`] is a plain integer handle. Ids are recycled through a FIFO
//! queue once the registry has committed an entity's death, so the same
//! number can name different game objects over time, but never two live ones
//! at once.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// Lightweight handle to one game object. Equality is by id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(u32);

impl Entity {
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }

    /// The id as a slot index into pools and signature storage.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out entity ids and tracks which ones are active.
///
/// The allocator does not decide *when* an id may be reused; the registry
/// calls [`retire`](Self::retire) only at commit time.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Next never-used id.
    next_id: u32,
    /// Retired ids waiting for reuse (FIFO).
    free_ids: VecDeque<u32>,
    /// Ids currently handed out and not yet retired.
    active: BTreeSet<u32>,
    /// Times each id has been retired, indexed by id.
    generations: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next candidate id: the oldest retired id, or a fresh one.
    ///
    /// The second value is `true` when the id was freshly minted. The
    /// candidate is not marked active; see [`activate`](Self::activate).
    pub fn next_candidate(&mut self) -> (Entity, bool) {
        match self.free_ids.pop_front() {
            Some(id) => (Entity(id), false),
            None => {
                let id = self.next_id;
                self.next_id += 1;
                (Entity(id), true)
            }
        }
    }

    /// Mark `entity` active. Returns `false` if it already was.
    pub fn activate(&mut self, entity: Entity) -> bool {
        self.active.insert(entity.0)
    }

    /// Mark `entity` inactive and queue its id for reuse.
    ///
    /// Returns `false` (and queues nothing) if it was not active, so an id
    /// can never sit in the free queue twice.
    pub fn retire(&mut self, entity: Entity) -> bool {
        if self.active.remove(&entity.0) {
            let slot = entity.index();
            if slot >= self.generations.len() {
                self.generations.resize(slot + 1, 0);
            }
            self.generations[slot] += 1;
            self.free_ids.push_back(entity.0);
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn is_active(&self, entity: Entity) -> bool {
        self.active.contains(&entity.0)
    }

    /// How many times `entity`'s id has been retired.
    pub fn generation(&self, entity: Entity) -> u32 {
        self.generations.get(entity.index()).copied().unwrap_or(0)
    }

    /// Number of active ids.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active ids in ascending order.
    pub fn active_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.active.iter().map(|&id| Entity(id))
    }

    /// Number of ids waiting in the recycle queue.
    pub fn free_count(&self) -> usize {
        self.free_ids.len()
    }

    /// One past the highest id ever minted.
    pub fn watermark(&self) -> u32 {
        self.next_id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
