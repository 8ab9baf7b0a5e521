//! Fixed-capacity ring buffer for bounded histories
//!
//! Oldest entries are overwritten once the buffer is full, so memory use
//! never grows past `N` regardless of how long a hole lasts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingBuffer<T, const N: usize> {
    items: Vec<T>,
    /// Index of the slot the next push writes to once full
    head: usize,
}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(N),
            head: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Push a value, evicting the oldest when full
    pub fn push(&mut self, value: T) {
        if N == 0 {
            return;
        }
        if self.items.len() < N {
            self.items.push(value);
        } else {
            self.items[self.head] = value;
            self.head = (self.head + 1) % N;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.head = 0;
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.items.split_at(self.head);
        older.iter().chain(newer.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_evicts_oldest() {
        let mut ring: RingBuffer<u32, 3> = RingBuffer::new();
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.len(), 3);
        let items: Vec<u32> = ring.iter().copied().collect();
        assert_eq!(items, vec![2, 3, 4]);
    }

    #[test]
    fn test_ring_partial_fill_order() {
        let mut ring: RingBuffer<u32, 4> = RingBuffer::new();
        ring.push(7);
        ring.push(8);
        let items: Vec<u32> = ring.iter().copied().collect();
        assert_eq!(items, vec![7, 8]);
    }

    #[test]
    fn test_ring_clear() {
        let mut ring: RingBuffer<u32, 2> = RingBuffer::new();
        ring.push(1);
        ring.push(2);
        ring.push(3);
        ring.clear();
        assert!(ring.is_empty());
        ring.push(4);
        let items: Vec<u32> = ring.iter().copied().collect();
        assert_eq!(items, vec![4]);
    }
}
