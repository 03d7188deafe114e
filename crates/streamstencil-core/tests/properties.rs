//! Property tests for the codec, the compute stage and pass invariants.

use proptest::prelude::*;
use streamstencil_core::prelude::*;

/// Grid shape with its lane count: rows, words per row, lanes.
fn shape() -> impl Strategy<Value = (usize, usize, usize)> {
    (1usize..8, 1usize..5, prop::sample::select(vec![1usize, 2, 4, 16]))
}

fn values(len: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-64.0f32..64.0, len)
}

/// Evaluate `block` lane by lane in `order` and compare with the stage.
fn check_lane_order(
    stage: &mut ComputeStage,
    layout: GridLayout,
    order: &[usize],
    block: &WindowBlock<'_>,
) -> std::result::Result<(), TestCaseError> {
    let packed = stage.evaluate(&Skew4, block, None).unwrap();
    let mut permuted = vec![f32::NAN; layout.lanes()];
    for &lane in order {
        permuted[lane] = ComputeStage::evaluate_lane(&Skew4, block, None, lane);
    }
    prop_assert_eq!(layout.codec().pack(&permuted).unwrap(), packed);
    Ok(())
}

proptest! {
    /// Property: packing unpacked lanes restores every bit, NaN payloads included
    #[test]
    fn prop_codec_roundtrip(limbs in prop::collection::vec(any::<u32>(), 1..64)) {
        let word = TransportWord::from_limbs(limbs.clone());
        let codec = LaneCodec::with_lanes(limbs.len()).unwrap();

        let lanes = codec.unpack(&word).unwrap();
        prop_assert_eq!(codec.pack(lanes).unwrap(), word.clone());
        prop_assert_eq!(TransportWord::from_le_bytes(&word.to_le_bytes()).unwrap(), word);
    }

    /// Property: evaluating lanes in any order yields the packed stage output
    #[test]
    fn prop_lane_order_is_irrelevant(
        seed in values(4 * 32),
        order in Just((0..16usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let layout = GridLayout::with_lanes(4, 32, 16).unwrap();
        let grid = PackedGrid::from_values(layout, &seed).unwrap();
        let mut cache = RowWindowCache::new(layout, Skew4.taps(), EdgePolicy::Clamp).unwrap();
        let mut stage = ComputeStage::new(layout.codec(), ExecMode::Sequential);

        let mut checked = 0;
        for word in grid.words() {
            if let Some(block) = cache.advance(word.clone()).unwrap() {
                check_lane_order(&mut stage, layout, &order, &block)?;
                checked += 1;
            }
        }
        while let Some(block) = cache.flush().unwrap() {
            check_lane_order(&mut stage, layout, &order, &block)?;
            checked += 1;
        }
        prop_assert_eq!(checked, layout.word_count());
    }

    /// Property: a pass emits exactly one word per input word, row-major
    #[test]
    fn prop_pass_preserves_shape(
        (rows, words_per_row, lanes) in shape(),
        kernel in prop::sample::select(KernelId::ALL.to_vec()),
        clamp in any::<bool>(),
    ) {
        let layout = GridLayout::with_lanes(rows, words_per_row * lanes, lanes).unwrap();
        let a = PackedGrid::from_fn(layout, |r, c| (r * 3 + c) as f32).unwrap();
        let b = PackedGrid::from_fn(layout, |r, c| c as f32 - r as f32).unwrap();
        let policy = if clamp { EdgePolicy::Clamp } else { EdgePolicy::Zero };
        let driver = PassDriver::new(layout).with_edge_policy(policy);

        let mut out = Vec::new();
        let report = driver
            .run_pass(kernel.stencil(), &a, kernel.is_coupled().then_some(&b), &mut out)
            .unwrap();

        prop_assert_eq!(out.len(), layout.word_count());
        prop_assert_eq!(report.words_out, layout.word_count());
        prop_assert!(out.iter().all(|w| w.lanes() == lanes));
        let live = kernel.stencil().shared_reach().live_words(&layout);
        prop_assert!(report.max_buffered <= live);
    }

    /// Property: splitting a pass into bands never changes its output
    #[test]
    fn prop_partitions_are_invisible(
        (rows, words_per_row, lanes) in shape(),
        partitions in 1usize..10,
        kernel in prop::sample::select(KernelId::ALL.to_vec()),
    ) {
        let layout = GridLayout::with_lanes(rows, words_per_row * lanes, lanes).unwrap();
        let a = PackedGrid::from_fn(layout, |r, c| ((r * 5 + c * 3) % 7) as f32).unwrap();
        let b = PackedGrid::from_fn(layout, |r, c| ((r + c) % 3) as f32 - 1.0).unwrap();
        let companion = kernel.is_coupled().then_some(&b);

        let single = PassDriver::new(layout)
            .run_pass_to_grid(kernel.stencil(), &a, companion)
            .unwrap();
        let split = PassDriver::new(layout)
            .with_partitions(partitions)
            .run_pass_to_grid(kernel.stencil(), &a, companion)
            .unwrap();
        prop_assert_eq!(split, single);
    }
}
