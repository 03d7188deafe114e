//! # streamstencil core
//!
//! Streaming fixed-stencil engine over packed `f32` grids.
//!
//! A grid travels row-major as fixed-width transport words (512 bits, 16
//! lanes, by default). The engine never holds the whole grid: a
//! [`RowWindowCache`] buffers only the rows a stencil reaches and emits one
//! neighbourhood window per lane, a [`ComputeStage`] evaluates the stencil
//! on every lane, and the [`PassDriver`] streams full grids through both.
//! The [`IterationController`] chains passes, alternating the two grids'
//! roles for the coupled kernel.
//!
//! ## Core Abstractions
//!
//! - [`LaneCodec`] - transport word <-> lane values
//! - [`WordRing`] - rotation-counter ring backing the cache
//! - [`RowWindowCache`] - bounded sliding window with edge policy
//! - [`Stencil`] - fixed-footprint kernel trait ([`Sum4`], [`Skew4`], [`Coupled7`])
//! - [`PassDriver`] / [`apply`] - one pass, optionally split into row bands
//! - [`IterationController`] - chained passes
//!
//! ## Example
//!
//! ```
//! use streamstencil_core::prelude::*;
//!
//! let layout = GridLayout::with_lanes(4, 4, 4)?;
//! let grid = PackedGrid::from_fn(layout, |r, c| (r * 4 + c) as f32)?;
//! let out = PassDriver::new(layout).run_pass_to_grid(&Sum4, &grid, None)?;
//! assert_eq!(out.get(1, 1), Some(19.0));
//! # Ok::<(), StencilError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod codec;
pub mod compute;
pub mod config;
pub mod driver;
pub mod error;
pub mod footprint;
pub mod grid;
pub mod iteration;
pub mod ring;
pub mod stage;
pub mod stencil;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{CacheStats, EdgePolicy, RowWindowCache, WindowBlock};
    pub use crate::codec::{LaneCodec, TransportWord, DEFAULT_WORD_BITS, LANE_BITS};
    pub use crate::compute::{ComputeStage, ExecMode, PARALLEL_LANE_THRESHOLD};
    pub use crate::config::{EngineConfig, EngineConfigBuilder};
    pub use crate::driver::{apply, apply_with, GridSink, PassDriver, PassReport, WordSink};
    pub use crate::error::{Result, StencilError};
    pub use crate::footprint::{Footprint, Reach, Tap};
    pub use crate::grid::{GridLayout, GridShape, PackedGrid, RowBand};
    pub use crate::iteration::{CoupledBuffers, IterationController, IterationOutcome};
    pub use crate::ring::{RingStats, WordRing};
    pub use crate::stage::Stage;
    pub use crate::stencil::{Coupled7, KernelId, Skew4, Stencil, Sum4};
}

pub use cache::{EdgePolicy, RowWindowCache, WindowBlock};
pub use codec::{LaneCodec, TransportWord};
pub use compute::{ComputeStage, ExecMode};
pub use config::EngineConfig;
pub use driver::{apply, PassDriver, WordSink};
pub use error::{Result, StencilError};
pub use grid::{GridLayout, PackedGrid};
pub use iteration::IterationController;
pub use ring::WordRing;
pub use stencil::{Coupled7, KernelId, Skew4, Stencil, Sum4};
