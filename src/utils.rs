use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::hash::Hash;

/// A mapping from a key to an ordered bag of values.
///
/// Values for one key keep their insertion order, which is what allows the
/// network manager to pair protocol events by "oldest entry first".
#[derive(Debug)]
pub struct MultiMap<K, V> {
    inner: HashMap<K, VecDeque<V>>,
}

impl<K, V> MultiMap<K, V>
where
    K: Eq + Hash,
    V: PartialEq,
{
    /// Appends the value to the bag stored under the key.
    pub fn add(&mut self, key: K, value: V) {
        self.inner.entry(key).or_default().push_back(value)
    }

    /// Removes the first occurrence of the value under the key.
    ///
    /// Returns `true` if a value was removed.
    pub fn delete(&mut self, key: &K, value: &V) -> bool {
        let mut removed = false;
        if let Some(values) = self.inner.get_mut(key) {
            if let Some(idx) = values.iter().position(|v| v == value) {
                values.remove(idx);
                removed = true;
            }
            if values.is_empty() {
                self.inner.remove(key);
            }
        }
        removed
    }

    /// The oldest value still present under the key.
    pub fn first_value(&self, key: &K) -> Option<&V> {
        self.inner.get(key).and_then(|values| values.front())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K, V> Default for MultiMap<K, V> {
    fn default() -> Self {
        Self {
            inner: Default::default(),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "async-std-runtime")] {
        /// Spawns a task on the runtime the crate was configured with.
        pub(crate) fn spawn<F>(fut: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            async_std::task::spawn(fut);
        }
    } else if #[cfg(feature = "tokio-runtime")] {
        /// Spawns a task on the runtime the crate was configured with.
        pub(crate) fn spawn<F>(fut: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            tokio::task::spawn(fut);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_keep_insertion_order() {
        let mut map = MultiMap::default();
        map.add("hash", "first");
        map.add("hash", "second");
        map.add("hash", "third");

        assert_eq!(map.first_value(&"hash"), Some(&"first"));
        assert!(map.delete(&"hash", &"first"));
        assert_eq!(map.first_value(&"hash"), Some(&"second"));
    }

    #[test]
    fn delete_removes_a_single_occurrence() {
        let mut map = MultiMap::default();
        map.add("hash", "dup");
        map.add("hash", "dup");

        assert!(map.delete(&"hash", &"dup"));
        assert_eq!(map.first_value(&"hash"), Some(&"dup"));
        assert!(map.delete(&"hash", &"dup"));
        assert_eq!(map.first_value(&"hash"), None);
        assert!(!map.delete(&"hash", &"dup"));
        assert!(map.is_empty());
    }

    #[test]
    fn keys_are_independent() {
        let mut map = MultiMap::default();
        map.add("a", 1);
        map.add("b", 2);

        assert!(map.delete(&"a", &1));
        assert_eq!(map.first_value(&"a"), None);
        assert_eq!(map.first_value(&"b"), Some(&2));
    }
}
