//! Fixed-width component signatures.
//!
//! A [`Signature`] is a 64-bit set with one bit per component kind. Entities
//! carry one describing the kinds they currently hold; systems carry one
//! describing the kinds they require. A system is interested in an entity
//! when the entity's signature is a superset of the system's.

use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

use crate::component::ComponentTypeId;

/// Maximum number of distinct component kinds a process may use.
pub const MAX_COMPONENTS: usize = 64;

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A set of component kinds, stored as a `u64` bit mask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(u64);

impl Signature {
    /// The empty signature.
    pub const EMPTY: Signature = Signature(0);

    /// Create an empty signature.
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Set the bit for `id`.
    #[inline]
    pub fn set(&mut self, id: ComponentTypeId) {
        self.0 |= 1u64 << id.index();
    }

    /// Clear the bit for `id`.
    #[inline]
    pub fn unset(&mut self, id: ComponentTypeId) {
        self.0 &= !(1u64 << id.index());
    }

    /// Whether the bit for `id` is set.
    #[inline]
    pub fn test(&self, id: ComponentTypeId) -> bool {
        self.0 & (1u64 << id.index()) != 0
    }

    /// Clear every bit.
    #[inline]
    pub fn reset(&mut self) {
        self.0 = 0;
    }

    /// Whether `self` holds every kind in `required`.
    ///
    /// Equivalent to `(self & required) == required`.
    #[inline]
    pub fn contains(&self, required: Signature) -> bool {
        (*self & required) == required
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of kinds in the set.
    #[inline]
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate the component kinds in the set, lowest id first.
    pub fn iter(&self) -> impl Iterator<Item = ComponentTypeId> {
        let bits = self.0;
        (0..MAX_COMPONENTS as u32)
            .filter(move |bit| bits & (1u64 << bit) != 0)
            .map(ComponentTypeId)
    }
}

impl BitAnd for Signature {
    type Output = Signature;

    #[inline]
    fn bitand(self, rhs: Signature) -> Signature {
        Signature(self.0 & rhs.0)
    }
}

impl BitOr for Signature {
    type Output = Signature;

    #[inline]
    fn bitor(self, rhs: Signature) -> Signature {
        Signature(self.0 | rhs.0)
    }
}

impl FromIterator<ComponentTypeId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        let mut sig = Signature::new();
        for id in iter {
            sig.set(id);
        }
        sig
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:#066b})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
