//! Dense storage addressed through a stable id
//!
//! Values live contiguously. Removal swaps the last value into the hole, so
//! callers keep an id to index table and patch it with the moved entry.

use crate::types::TextureId;

#[derive(Debug, Clone)]
pub struct DenseSlotMap<T> {
    entries: Vec<(TextureId, T)>,
}

impl<T> Default for DenseSlotMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

/// Value removed by [`DenseSlotMap::remove`] and the entry that took
/// its place
#[derive(Debug)]
pub struct Removed<T> {
    pub value: T,
    pub moved: Option<(TextureId, usize)>,
}

impl<T> DenseSlotMap<T> {
    /// Appends and returns the index of the new value
    pub fn insert(&mut self, id: TextureId, value: T) -> usize {
        self.entries.push((id, value));
        self.entries.len() - 1
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index).map(|(_, value)| value)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index).map(|(_, value)| value)
    }

    #[inline]
    pub fn id_at(&self, index: usize) -> Option<TextureId> {
        self.entries.get(index).map(|(id, _)| *id)
    }

    pub fn remove(&mut self, index: usize) -> Option<Removed<T>> {
        if index >= self.entries.len() {
            return None;
        }
        let (_, value) = self.entries.swap_remove(index);
        let moved = self.entries.get(index).map(|(id, _)| (*id, index));
        Some(Removed { value, moved })
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureId, &T)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_reports_moved_entry() {
        let mut map = DenseSlotMap::default();
        map.insert(TextureId(1), "a");
        map.insert(TextureId(2), "b");
        map.insert(TextureId(3), "c");

        let removed = map.remove(0).unwrap();
        assert_eq!(removed.value, "a");
        assert_eq!(removed.moved, Some((TextureId(3), 0)));
        assert_eq!(map.get(0), Some(&"c"));

        let removed = map.remove(1).unwrap();
        assert_eq!(removed.moved, None);
        assert_eq!(map.len(), 1);
    }
}
