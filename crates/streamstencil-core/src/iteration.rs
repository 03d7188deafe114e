//! Iteration controller.
//!
//! Chains passes. No pass ever reads a buffer it is writing: single-grid
//! runs write into a scratch grid that is swapped in after the pass, and
//! coupled runs rotate three buffers so the destination is always the one
//! buffer neither input names.

use tracing::info;

use crate::driver::{GridSink, PassDriver};
use crate::error::{Result, StencilError};
use crate::grid::PackedGrid;
use crate::stencil::{KernelId, Stencil};

/// Grids left after an iteration run.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationOutcome {
    /// Grid written by the last pass (the input when no pass ran).
    pub primary: PackedGrid,
    /// Companion grid of a coupled run; coupled passes only read it.
    pub companion: Option<PackedGrid>,
    /// Passes executed.
    pub passes: usize,
}

/// Buffers of a coupled run.
#[derive(Debug, Clone, PartialEq)]
pub struct CoupledBuffers {
    /// Starts as the primary input; destination of even passes.
    pub x: PackedGrid,
    /// Starts zeroed; destination of odd passes.
    pub y: PackedGrid,
    /// The companion input, read by every pass.
    pub z: PackedGrid,
    /// Passes executed.
    pub passes: usize,
}

impl CoupledBuffers {
    /// The grid written by the last pass, or `x` when no pass ran.
    pub fn result(&self) -> &PackedGrid {
        if self.passes % 2 == 1 {
            &self.y
        } else {
            &self.x
        }
    }

    /// Split into the last-written grid and the companion.
    pub fn into_result(self) -> (PackedGrid, PackedGrid) {
        if self.passes % 2 == 1 {
            (self.y, self.z)
        } else {
            (self.x, self.z)
        }
    }
}

/// Runs `n` chained passes of one stencil.
#[derive(Debug, Clone, Copy)]
pub struct IterationController {
    driver: PassDriver,
}

impl IterationController {
    /// Create a controller around a configured driver.
    pub fn new(driver: PassDriver) -> Self {
        Self { driver }
    }

    /// The driver used for every pass.
    pub fn driver(&self) -> &PassDriver {
        &self.driver
    }

    /// Apply a single-grid stencil `n` times, each pass reading the
    /// previous pass's output.
    pub fn run_single<S: Stencil + ?Sized>(
        &self,
        stencil: &S,
        grid: PackedGrid,
        n: usize,
    ) -> Result<PackedGrid> {
        if stencil.is_coupled() {
            return Err(StencilError::config(format!(
                "{} is a two-grid kernel",
                stencil.name()
            )));
        }

        let mut current = grid;
        let mut scratch = PackedGrid::zeroed(current.layout());
        for pass in 1..=n {
            self.driver
                .run_pass(stencil, &current, None, &mut GridSink::new(&mut scratch))?;
            std::mem::swap(&mut current, &mut scratch);
            info!(kernel = stencil.name(), pass, of = n, "iteration complete");
        }
        Ok(current)
    }

    /// Apply a two-grid stencil `n` times over three rotating buffers.
    ///
    /// `x` starts as `primary`, `z` holds `companion` and `y` starts
    /// zeroed. Odd passes (from 1) compute `(x, z) -> y`, even passes
    /// compute `(z, y) -> x`. `z` is never written. Every pass writes a
    /// buffer disjoint from the two it reads.
    pub fn run_coupled<S: Stencil + ?Sized>(
        &self,
        stencil: &S,
        primary: PackedGrid,
        companion: PackedGrid,
        n: usize,
    ) -> Result<CoupledBuffers> {
        if !stencil.is_coupled() {
            return Err(StencilError::config(format!(
                "{} is a single-grid kernel",
                stencil.name()
            )));
        }
        if primary.layout() != companion.layout() {
            return Err(StencilError::config(
                "primary and companion grids differ in layout",
            ));
        }

        let mut buffers = CoupledBuffers {
            y: PackedGrid::zeroed(primary.layout()),
            x: primary,
            z: companion,
            passes: 0,
        };
        for pass in 1..=n {
            let CoupledBuffers { x, y, z, .. } = &mut buffers;
            let (source, with, dest) = if pass % 2 == 1 {
                (&*x, &*z, y)
            } else {
                (&*z, &*y, x)
            };
            self.driver
                .run_pass(stencil, source, Some(with), &mut GridSink::new(dest))?;
            buffers.passes = pass;
            info!(
                kernel = stencil.name(),
                pass,
                of = n,
                dest = if pass % 2 == 1 { "y" } else { "x" },
                "iteration complete"
            );
        }
        Ok(buffers)
    }

    /// Run `n` iterations of a catalogue kernel.
    ///
    /// `companion` must be present exactly when the kernel is coupled.
    pub fn run(
        &self,
        kernel: KernelId,
        primary: PackedGrid,
        companion: Option<PackedGrid>,
        n: usize,
    ) -> Result<IterationOutcome> {
        let stencil = kernel.stencil();
        match (kernel.is_coupled(), companion) {
            (true, Some(companion)) => {
                let (result, companion) =
                    self.run_coupled(stencil, primary, companion, n)?.into_result();
                Ok(IterationOutcome {
                    primary: result,
                    companion: Some(companion),
                    passes: n,
                })
            }
            (false, None) => Ok(IterationOutcome {
                primary: self.run_single(stencil, primary, n)?,
                companion: None,
                passes: n,
            }),
            (true, None) => Err(StencilError::config(format!(
                "{kernel} needs a companion grid"
            ))),
            (false, Some(_)) => Err(StencilError::config(format!(
                "{kernel} takes a single grid"
            ))),
        }
    }
}
