//! Lane-parallel compute stage.
//!
//! Evaluates a stencil once per lane of a window block and packs the
//! results into one output word. Lanes share no mutable state, so they can
//! run on the rayon pool without changing the result.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cache::WindowBlock;
use crate::codec::{LaneCodec, TransportWord};
use crate::error::{Result, StencilError};
use crate::stencil::Stencil;

/// Lane count at which `ExecMode::Auto` switches to rayon.
///
/// Below this a block is too little work to amortise the fork.
pub const PARALLEL_LANE_THRESHOLD: usize = 64;

/// How lanes of one block are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// One lane after another on the calling thread.
    Sequential,
    /// Lanes on the rayon pool.
    Parallel,
    /// Parallel for wide words, sequential otherwise.
    #[default]
    Auto,
}

impl ExecMode {
    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sequential" | "seq" => Some(ExecMode::Sequential),
            "parallel" | "par" => Some(ExecMode::Parallel),
            "auto" => Some(ExecMode::Auto),
            _ => None,
        }
    }

    /// Whether `lanes` lanes run in parallel under this mode.
    pub fn is_parallel(self, lanes: usize) -> bool {
        match self {
            ExecMode::Sequential => false,
            ExecMode::Parallel => true,
            ExecMode::Auto => lanes >= PARALLEL_LANE_THRESHOLD,
        }
    }
}

/// Per-lane stencil evaluation followed by packing.
#[derive(Debug, Clone)]
pub struct ComputeStage {
    codec: LaneCodec,
    mode: ExecMode,
    lanes_out: Vec<f32>,
    evaluated: u64,
}

impl ComputeStage {
    /// Create a stage for words of `codec`'s width.
    pub fn new(codec: LaneCodec, mode: ExecMode) -> Self {
        Self {
            codec,
            mode,
            lanes_out: vec![0.0; codec.lanes()],
            evaluated: 0,
        }
    }

    /// Execution mode.
    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    /// Blocks evaluated so far.
    pub fn evaluated(&self) -> u64 {
        self.evaluated
    }

    /// Evaluate a single lane.
    #[inline]
    pub fn evaluate_lane<S: Stencil + ?Sized>(
        stencil: &S,
        primary: &WindowBlock<'_>,
        companion: Option<&WindowBlock<'_>>,
        lane: usize,
    ) -> f32 {
        let companion_window = companion.map_or(&[][..], |c| c.lane(lane));
        stencil.apply(primary.lane(lane), companion_window)
    }

    /// Evaluate every lane of a block and pack the results.
    pub fn evaluate<S: Stencil + ?Sized>(
        &mut self,
        stencil: &S,
        primary: &WindowBlock<'_>,
        companion: Option<&WindowBlock<'_>>,
    ) -> Result<TransportWord> {
        self.check_arity(stencil, primary, companion)?;

        if self.mode.is_parallel(self.codec.lanes()) {
            self.lanes_out
                .par_iter_mut()
                .enumerate()
                .for_each(|(lane, out)| {
                    *out = Self::evaluate_lane(stencil, primary, companion, lane);
                });
        } else {
            for (lane, out) in self.lanes_out.iter_mut().enumerate() {
                *out = Self::evaluate_lane(stencil, primary, companion, lane);
            }
        }

        self.evaluated += 1;
        self.codec.pack(&self.lanes_out)
    }

    fn check_arity<S: Stencil + ?Sized>(
        &self,
        stencil: &S,
        primary: &WindowBlock<'_>,
        companion: Option<&WindowBlock<'_>>,
    ) -> Result<()> {
        let lanes = self.codec.lanes();
        if primary.lanes() != lanes || primary.taps() != stencil.taps().len() {
            return Err(StencilError::config(format!(
                "{} expects {} lanes x {} taps, block has {} x {}",
                stencil.name(),
                lanes,
                stencil.taps().len(),
                primary.lanes(),
                primary.taps()
            )));
        }

        match (stencil.is_coupled(), companion) {
            (true, None) => Err(StencilError::config(format!(
                "{} needs a companion window",
                stencil.name()
            ))),
            (false, Some(_)) => Err(StencilError::config(format!(
                "{} takes no companion window",
                stencil.name()
            ))),
            (true, Some(c)) => {
                if c.lanes() != lanes || c.taps() != stencil.companion_taps().len() {
                    return Err(StencilError::config(format!(
                        "{} expects a companion of {} lanes x {} taps, block has {} x {}",
                        stencil.name(),
                        lanes,
                        stencil.companion_taps().len(),
                        c.lanes(),
                        c.taps()
                    )));
                }
                if c.word() != primary.word() {
                    return Err(StencilError::violation(
                        primary.word(),
                        primary.row() as isize,
                        0,
                        format!("companion stream is at word {}", c.word()),
                    ));
                }
                Ok(())
            }
            (false, None) => Ok(()),
        }
    }
}
