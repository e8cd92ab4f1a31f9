//! Mutation counting for cache invalidation.
//!
//! Every mutable packet field keeps a local counter that its setters bump.
//! A composite reports its own counter plus the counters of its children, so
//! the total only ever grows and any nested change is visible from the top
//! without walking pointers or notifying parents.

use std::hash::{Hash, Hasher};

/// Objects that count their own mutations
pub trait ChangeCount {
    fn change_count(&self) -> u64;
}

/// A local mutation count.
///
/// Two objects with the same contents are equal whatever their history, so a
/// `Version` compares equal to every other `Version` and hashes to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Version(u64);

impl Version {
    pub fn get(self) -> u64 {
        self.0
    }

    pub fn bump(&mut self) {
        self.0 += 1;
    }

    /// Jump past `total`, used when a child that carries its own count is replaced
    pub fn bump_past(&mut self, total: u64) {
        self.0 = self.0.max(total) + 1;
    }
}

impl PartialEq for Version {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

/// Holds a child object for a parent that caches derived state.
///
/// Replacing the child through `set` folds the old child's count into the
/// base, so the reported count stays monotonic even when the new child
/// starts counting from zero.
#[derive(Debug, Clone, Default)]
pub struct ChangeCounter<T> {
    target: T,
    base: u64,
}

impl<T: ChangeCount> ChangeCounter<T> {
    pub fn new(target: T) -> Self {
        Self { target, base: 0 }
    }

    pub fn get(&self) -> &T {
        &self.target
    }

    /// Mutable access; the child's own counter records any change made through it
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn set(&mut self, target: T) {
        self.base += self.target.change_count() + 1;
        self.target = target;
    }

    pub fn change_count(&self) -> u64 {
        self.base + self.target.change_count()
    }
}

impl<T: PartialEq> PartialEq for ChangeCounter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl<T: Eq> Eq for ChangeCounter<T> {}

/// A cached value tagged with the change count it was computed at
#[derive(Debug, Clone)]
pub(crate) struct Cached<V> {
    value: Option<(V, u64)>,
}

impl<V> Cached<V> {
    pub(crate) fn empty() -> Self {
        Self { value: None }
    }

    /// The cached value, if nothing changed since it was stored
    pub(crate) fn get(&self, change_count: u64) -> Option<&V> {
        match &self.value {
            Some((value, stored_at)) if *stored_at == change_count => Some(value),
            _ => None,
        }
    }

    pub(crate) fn store(&mut self, value: V, change_count: u64) {
        self.value = Some((value, change_count));
    }
}

impl<V> Default for Cached<V> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Leaf {
        value: u32,
        change_count: u64,
    }

    impl Leaf {
        fn set_value(&mut self, value: u32) {
            self.value = value;
            self.change_count += 1;
        }
    }

    impl ChangeCount for Leaf {
        fn change_count(&self) -> u64 {
            self.change_count
        }
    }

    #[test]
    fn test_mutation_through_get_mut_is_seen() {
        let mut counter = ChangeCounter::new(Leaf::default());
        let before = counter.change_count();
        counter.get_mut().set_value(3);
        assert!(counter.change_count() > before);
    }

    #[test]
    fn test_replacement_never_decreases_count() {
        let mut counter = ChangeCounter::new(Leaf::default());
        for i in 0..5 {
            counter.get_mut().set_value(i);
        }
        let before = counter.change_count();

        // The new leaf starts at zero
        counter.set(Leaf::default());
        assert!(counter.change_count() > before);
    }

    #[test]
    fn test_equality_ignores_counts() {
        let mut a = ChangeCounter::new(Leaf::default());
        a.get_mut().set_value(1);
        let mut b = ChangeCounter::new(Leaf::default());
        b.set(Leaf { value: 1, change_count: 1 });
        assert_eq!(a, b);
        assert_ne!(a.change_count(), b.change_count());
    }

    #[test]
    fn test_cached_value_invalidation() {
        let mut cached = Cached::empty();
        cached.store("encoding", 4);
        assert_eq!(cached.get(4), Some(&"encoding"));
        assert_eq!(cached.get(5), None);
    }
}
