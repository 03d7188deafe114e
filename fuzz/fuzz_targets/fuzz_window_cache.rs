//! Fuzz target for the row window cache.
//!
//! Drives a cache over an arbitrary grid shape with arbitrary advance,
//! flush and reset sequences, checking that centres come out in order and
//! that buffering never exceeds the computed capacity.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use streamstencil_core::prelude::*;

/// Operations that can be performed on the cache.
#[derive(Debug, Arbitrary)]
enum CacheOp {
    /// Supply a word built from raw lane bits.
    Advance { limbs: Vec<u32> },
    /// Supply a well-formed word of the right width.
    AdvanceFill { bits: u32 },
    /// Emit the next remaining centre.
    Flush,
    /// Discard the current pass.
    Reset,
}

/// Fuzz input: grid shape, kernel, policy and operation sequence.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    rows: u8,
    words_per_row: u8,
    lanes_log2: u8,
    kernel: u8,
    clamp: bool,
    ops: Vec<CacheOp>,
}

fuzz_target!(|input: FuzzInput| {
    // Limit shapes and operations to prevent timeout
    let rows = (input.rows % 16) as usize + 1;
    let words_per_row = (input.words_per_row % 8) as usize + 1;
    let lanes = 1usize << (input.lanes_log2 % 5);
    if input.ops.len() > 2000 {
        return;
    }

    let kernel = KernelId::ALL[input.kernel as usize % KernelId::ALL.len()];
    let policy = if input.clamp {
        EdgePolicy::Clamp
    } else {
        EdgePolicy::Zero
    };
    let Ok(layout) = GridLayout::with_lanes(rows, words_per_row * lanes, lanes) else {
        return;
    };
    let Ok(mut cache) = RowWindowCache::new(layout, kernel.stencil().taps(), policy) else {
        return;
    };

    let mut next_center = 0usize;
    for op in &input.ops {
        let emitted = match op {
            CacheOp::Advance { limbs } => {
                let limbs: Vec<u32> = limbs.iter().copied().take(64).collect();
                cache
                    .advance(TransportWord::from_limbs(limbs))
                    .map(|b| b.map(|b| (b.word(), b.values().len())))
            }
            CacheOp::AdvanceFill { bits } => cache
                .advance(TransportWord::from_limbs(vec![*bits; lanes]))
                .map(|b| b.map(|b| (b.word(), b.values().len()))),
            CacheOp::Flush => {
                let flushed = cache
                    .flush()
                    .map(|b| b.map(|b| (b.word(), b.values().len())));
                if let Ok(None) = flushed {
                    assert!(cache.is_idle(), "flush returned None on a busy cache");
                    next_center = 0;
                }
                flushed
            }
            CacheOp::Reset => {
                cache.reset();
                next_center = 0;
                Ok(None)
            }
        };

        if let Ok(Some((word, len))) = emitted {
            assert_eq!(word, next_center, "centres must be emitted in order");
            assert_eq!(len, lanes * kernel.stencil().taps().len());
            next_center += 1;
        }

        assert!(
            cache.buffered() <= cache.capacity(),
            "cache holds {} words, capacity {}",
            cache.buffered(),
            cache.capacity()
        );
        assert!(next_center <= layout.word_count());
    }
});
