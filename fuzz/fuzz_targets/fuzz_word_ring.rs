//! Fuzz target for the word ring.
//!
//! Tests the rotation-counter ring with random operation sequences to find
//! addressing or accounting errors.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use streamstencil_core::prelude::*;

/// Operations that can be performed on the ring.
#[derive(Debug, Arbitrary)]
enum RingOp {
    /// Push a word tagged with the given value.
    Push { tag: u32 },
    /// Look up a word by rotation counter.
    Get { index: u64 },
    /// Remove the oldest word.
    PopOldest,
    /// Discard every word and rewind.
    Drain,
}

/// Fuzz input: ring size and operation sequence.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    retain: u8,
    ops: Vec<RingOp>,
}

fuzz_target!(|input: FuzzInput| {
    if input.ops.len() > 5000 {
        return;
    }

    let mut ring = WordRing::new(input.retain as usize);
    // Shadow model: tags of retained words, oldest first, and the counter
    // value of the oldest one.
    let mut model: std::collections::VecDeque<u32> = Default::default();
    let mut tail = 0u64;

    for op in &input.ops {
        match op {
            RingOp::Push { tag } => {
                let evicted = ring.push(TransportWord::from_limbs(vec![*tag]));
                if model.len() == ring.retain() {
                    let oldest = model.pop_front();
                    tail += 1;
                    assert_eq!(evicted.map(|w| w.limbs()[0]), oldest);
                } else {
                    assert!(evicted.is_none());
                }
                model.push_back(*tag);
            }
            RingOp::Get { index } => {
                let expected = index
                    .checked_sub(tail)
                    .and_then(|offset| model.get(offset as usize))
                    .copied();
                assert_eq!(ring.get(*index).map(|w| w.limbs()[0]), expected);
            }
            RingOp::PopOldest => {
                let popped = ring.pop_oldest().map(|w| w.limbs()[0]);
                if popped.is_some() {
                    tail += 1;
                }
                assert_eq!(popped, model.pop_front());
            }
            RingOp::Drain => {
                assert_eq!(ring.drain(), model.len());
                model.clear();
                tail = 0;
            }
        }

        assert_eq!(ring.len(), model.len());
        assert!(ring.len() <= ring.retain());
        assert_eq!(ring.tail(), tail);
    }
});
