//! Rotating word storage for the row window cache.
//!
//! The ring keeps the most recent `retain` transport words of a stream.
//! Every push advances a monotonic rotation counter (`head`); a word is
//! addressed by the counter value it was pushed at, so row roles such as
//! "row above" or "look-ahead block" are plain offsets from the counter
//! instead of separately rotated variables. Storage is a power-of-two slot
//! array indexed through a mask.

use crate::codec::TransportWord;

/// Statistics for a word ring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingStats {
    /// Total words pushed.
    pub pushed: u64,
    /// Words rotated out to make room for newer ones.
    pub evicted: u64,
    /// Words discarded by `drain`.
    pub drained: u64,
    /// Current number of retained words.
    pub depth: u64,
    /// Maximum depth observed.
    pub max_depth: u64,
}

/// Fixed-size ring of transport words addressed by rotation counter.
#[derive(Debug)]
pub struct WordRing {
    /// Slot storage (power of 2).
    slots: Vec<Option<TransportWord>>,
    /// Mask for index wrapping.
    mask: usize,
    /// Maximum number of words retained at once.
    retain: usize,
    /// Rotation counter: index the next push will receive.
    head: u64,
    /// Index of the oldest retained word.
    tail: u64,
    /// Statistics.
    stats: RingStats,
}

impl WordRing {
    /// Create a ring retaining at most `retain` words.
    ///
    /// Slot storage is rounded up to the next power of 2.
    pub fn new(retain: usize) -> Self {
        let retain = retain.max(1);
        let capacity = retain.next_power_of_two();

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            slots,
            mask: capacity - 1,
            retain,
            head: 0,
            tail: 0,
            stats: RingStats::default(),
        }
    }

    /// Maximum number of retained words.
    pub fn retain(&self) -> usize {
        self.retain
    }

    /// Allocated slot count.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of retained words.
    pub fn len(&self) -> usize {
        self.head.wrapping_sub(self.tail) as usize
    }

    /// Check if the ring holds no words.
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Check if the next push will evict.
    pub fn is_full(&self) -> bool {
        self.len() >= self.retain
    }

    /// Rotation counter (total pushes since the last drain).
    pub fn head(&self) -> u64 {
        self.head
    }

    /// Index of the oldest retained word.
    pub fn tail(&self) -> u64 {
        self.tail
    }

    /// Push a word, rotating the oldest one out if the ring is full.
    ///
    /// Returns the evicted word, if any.
    pub fn push(&mut self, word: TransportWord) -> Option<TransportWord> {
        let evicted = if self.is_full() { self.pop_oldest() } else { None };
        if evicted.is_some() {
            self.stats.evicted += 1;
        }

        let index = (self.head as usize) & self.mask;
        self.slots[index] = Some(word);
        self.head = self.head.wrapping_add(1);

        self.stats.pushed += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.len() as u64);

        evicted
    }

    /// Look up the word pushed at rotation counter `index`.
    ///
    /// `None` if it has not been pushed yet or was already rotated out.
    #[inline]
    pub fn get(&self, index: u64) -> Option<&TransportWord> {
        if index < self.tail || index >= self.head {
            return None;
        }
        self.slots[(index as usize) & self.mask].as_ref()
    }

    /// Remove the oldest retained word.
    pub fn pop_oldest(&mut self) -> Option<TransportWord> {
        if self.is_empty() {
            return None;
        }
        let index = (self.tail as usize) & self.mask;
        let word = self.slots[index].take();
        self.tail = self.tail.wrapping_add(1);
        word
    }

    /// Discard every retained word and rewind the rotation counter.
    ///
    /// Returns how many words were discarded. Statistics other than
    /// `depth` are kept.
    pub fn drain(&mut self) -> usize {
        let mut discarded = 0;
        while self.pop_oldest().is_some() {
            discarded += 1;
        }
        self.stats.drained += discarded as u64;
        self.head = 0;
        self.tail = 0;
        discarded
    }

    /// Get ring statistics.
    pub fn stats(&self) -> RingStats {
        RingStats {
            depth: self.len() as u64,
            ..self.stats.clone()
        }
    }

    /// Reset ring statistics.
    pub fn reset_stats(&mut self) {
        self.stats = RingStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(tag: u32) -> TransportWord {
        TransportWord::from_limbs(vec![tag, tag + 1])
    }

    #[test]
    fn test_ring_basic() {
        let mut ring = WordRing::new(3);

        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.retain(), 3);

        assert!(ring.push(word(0)).is_none());
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.get(0), Some(&word(0)));
        assert_eq!(ring.get(1), None);
    }

    #[test]
    fn test_ring_rotation() {
        let mut ring = WordRing::new(3);

        for i in 0..3 {
            assert!(ring.push(word(i)).is_none());
        }
        assert!(ring.is_full());

        // Fourth push rotates word 0 out.
        assert_eq!(ring.push(word(3)), Some(word(0)));
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.get(0), None);
        assert_eq!(ring.get(1), Some(&word(1)));
        assert_eq!(ring.get(3), Some(&word(3)));
        assert_eq!(ring.head(), 4);
        assert_eq!(ring.tail(), 1);
    }

    #[test]
    fn test_ring_never_exceeds_retain() {
        let mut ring = WordRing::new(5);
        for i in 0..100 {
            ring.push(word(i));
            assert!(ring.len() <= 5);
        }
        let stats = ring.stats();
        assert_eq!(stats.pushed, 100);
        assert_eq!(stats.evicted, 95);
        assert_eq!(stats.max_depth, 5);
    }

    #[test]
    fn test_ring_drain_rewinds() {
        let mut ring = WordRing::new(4);
        for i in 0..6 {
            ring.push(word(i));
        }

        assert_eq!(ring.drain(), 4);
        assert!(ring.is_empty());
        assert_eq!(ring.head(), 0);
        assert_eq!(ring.stats().drained, 4);

        ring.push(word(9));
        assert_eq!(ring.get(0), Some(&word(9)));
    }

    #[test]
    fn test_ring_zero_retain_clamps() {
        let mut ring = WordRing::new(0);
        assert_eq!(ring.retain(), 1);
        ring.push(word(1));
        assert_eq!(ring.push(word(2)), Some(word(1)));
    }
}
