//! Per-kind component storage.
//!
//! A [`Pool<T>`] holds every value of one component kind, indexed directly by
//! entity id. It is not packed: slot `n` belongs to entity `n` whether or not
//! that entity currently carries the component. Presence is decided by the
//! entity's [`Signature`](crate::signature::Signature), never by the pool, so
//! removing a component leaves its old value in place until a later add
//! overwrites it.
//!
//! The registry stores pools behind the [`ErasedPool`] trait object and
//! downcasts back to `Pool<T>` using the kind id it already resolved.

use std::any::{type_name, Any};

use crate::component::Component;

// ---------------------------------------------------------------------------
// ErasedPool
// ---------------------------------------------------------------------------

/// The kind-independent face of a [`Pool`].
pub trait ErasedPool: Any {
    /// Number of addressable slots.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow so that at least `len` slots exist. Never shrinks.
    fn grow_to(&mut self, len: usize);

    /// Copy the value at `src` into `dst`, growing to fit `dst`.
    ///
    /// Returns `false` if `src` was never written.
    fn duplicate(&mut self, src: usize, dst: usize) -> bool;

    /// Type name of the stored kind.
    fn kind_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Dense, auto-growing storage for one component kind.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    data: Vec<Option<T>>,
}

impl<T> Pool<T> {
    /// Create a pool with `size` empty slots.
    pub fn new(size: usize) -> Self {
        let mut data = Vec::with_capacity(size);
        data.resize_with(size, || None);
        Self { data }
    }

    /// Number of addressable slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Resize to exactly `len` slots. Used only to grow.
    pub fn resize(&mut self, len: usize) {
        if len > self.data.len() {
            self.data.resize_with(len, || None);
        }
    }

    /// Write `value` at `index`, growing the pool if needed.
    pub fn set(&mut self, index: usize, value: T) {
        if index >= self.data.len() {
            self.resize(index + 1);
        }
        self.data[index] = Some(value);
    }

    /// The value at `index`, if the slot was ever written.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index).and_then(Option::as_mut)
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

impl<T: Component> ErasedPool for Pool<T> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn grow_to(&mut self, len: usize) {
        self.resize(len);
    }

    fn duplicate(&mut self, src: usize, dst: usize) -> bool {
        match self.get(src).cloned() {
            Some(value) => {
                self.set(dst, value);
                true
            }
            None => false,
        }
    }

    fn kind_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
