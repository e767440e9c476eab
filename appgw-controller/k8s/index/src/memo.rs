use ahash::AHashMap as HashMap;
use std::hash::Hash;

/// Caches values computed during a single synthesis pass.
///
/// A memo is created empty for each pass and dropped with it; nothing computed in one pass is
/// visible to another.
#[derive(Debug)]
pub(crate) struct Memo<K, V> {
    values: HashMap<K, V>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash, V> Memo<K, V> {
    /// Returns the value cached for `key`, computing it first if this is the first request.
    pub(crate) fn get_or_compute(&mut self, key: &K, compute: impl FnOnce(&K) -> V) -> &V {
        if !self.values.contains_key(key) {
            let value = compute(key);
            self.values.insert(key.clone(), value);
        }
        &self.values[key]
    }

    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn into_values(self) -> impl Iterator<Item = V> {
        self.values.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn computes_at_most_once() {
        let calls = Cell::new(0);
        let mut memo = Memo::default();
        for key in ["a", "b", "a", "a", "b"] {
            let value = memo.get_or_compute(&key, |k| {
                calls.set(calls.get() + 1);
                k.to_uppercase()
            });
            assert_eq!(*value, key.to_uppercase());
        }
        assert_eq!(calls.get(), 2);
        assert_eq!(memo.len(), 2);

        let mut values = memo.into_values().collect::<Vec<_>>();
        values.sort();
        assert_eq!(values, vec!["A", "B"]);
    }

    #[test]
    fn starts_empty() {
        let memo = Memo::<String, ()>::default();
        assert_eq!(memo.len(), 0);
        assert!(!memo.contains_key(&"a".to_string()));
    }
}
