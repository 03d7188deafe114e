//! Grid driver.
//!
//! Streams whole grids through the window caches, one word per advance,
//! and collects the output words in row-major order. Coupled kernels get a
//! second cache for the companion grid; both caches share one reach, so
//! they emit the same centre word on the same advance.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::cache::{EdgePolicy, RowWindowCache, WindowBlock};
use crate::codec::TransportWord;
use crate::compute::{ComputeStage, ExecMode};
use crate::error::{Result, StencilError};
use crate::grid::{GridLayout, PackedGrid, RowBand};
use crate::stage::Stage;
use crate::stencil::{KernelId, Stencil};

/// Receiver of output words, in row-major order.
pub trait WordSink {
    /// Accept the next output word.
    fn accept(&mut self, word: TransportWord) -> Result<()>;
}

impl WordSink for Vec<TransportWord> {
    fn accept(&mut self, word: TransportWord) -> Result<()> {
        self.push(word);
        Ok(())
    }
}

/// Sink that overwrites the words of an existing grid in order.
#[derive(Debug)]
pub struct GridSink<'g> {
    grid: &'g mut PackedGrid,
    cursor: usize,
}

impl<'g> GridSink<'g> {
    /// Write into `grid` starting at its first word.
    pub fn new(grid: &'g mut PackedGrid) -> Self {
        Self { grid, cursor: 0 }
    }

    /// Words written so far.
    pub fn written(&self) -> usize {
        self.cursor
    }
}

impl WordSink for GridSink<'_> {
    fn accept(&mut self, word: TransportWord) -> Result<()> {
        let lanes = self.grid.layout().lanes();
        let slot = self.grid.words_mut().get_mut(self.cursor).ok_or_else(|| {
            StencilError::violation(self.cursor, -1, -1, "output grid already full")
        })?;
        if word.lanes() != lanes {
            return Err(StencilError::config(format!(
                "{}-lane word written to a {}-lane grid",
                word.lanes(),
                lanes
            )));
        }
        *slot = word;
        self.cursor += 1;
        Ok(())
    }
}

/// Summary of one completed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Kernel name.
    pub kernel: &'static str,
    /// Output words produced.
    pub words_out: usize,
    /// Input words streamed, summed over every stream and band.
    pub words_streamed: usize,
    /// Bands the pass was split into.
    pub bands: usize,
    /// Largest number of words any cache retained.
    pub max_buffered: usize,
}

#[derive(Debug, Default)]
struct BandReport {
    words_out: usize,
    words_streamed: usize,
    max_buffered: usize,
}

/// Runs single passes of a stencil over packed grids.
#[derive(Debug, Clone, Copy)]
pub struct PassDriver {
    layout: GridLayout,
    policy: EdgePolicy,
    mode: ExecMode,
    partitions: usize,
}

impl PassDriver {
    /// Create a driver for grids of `layout` with default settings.
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            policy: EdgePolicy::default(),
            mode: ExecMode::default(),
            partitions: 1,
        }
    }

    /// Set the edge policy.
    pub fn with_edge_policy(mut self, policy: EdgePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the lane execution mode.
    pub fn with_exec_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    /// Split each pass into at most `partitions` row bands.
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions.max(1);
        self
    }

    /// Grid layout.
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Edge policy.
    pub fn edge_policy(&self) -> EdgePolicy {
        self.policy
    }

    /// Lane execution mode.
    pub fn exec_mode(&self) -> ExecMode {
        self.mode
    }

    /// Requested partitions.
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Run one pass, sending every output word to `sink`.
    ///
    /// The primary and (for coupled kernels) companion grid are read only;
    /// output words arrive in row-major order. Caches are created per pass
    /// and end drained.
    pub fn run_pass<S, W>(
        &self,
        stencil: &S,
        primary: &PackedGrid,
        companion: Option<&PackedGrid>,
        sink: &mut W,
    ) -> Result<PassReport>
    where
        S: Stencil + ?Sized,
        W: WordSink + ?Sized,
    {
        self.check_inputs(stencil, primary, companion)?;

        let bands = self.layout.bands(self.partitions);
        debug!(
            kernel = stencil.name(),
            bands = bands.len(),
            rows_per_band = bands[0].len(),
            "planned pass"
        );

        let reports = if bands.len() == 1 {
            vec![self.run_band(stencil, primary, companion, bands[0], sink)?]
        } else {
            let outputs = bands
                .par_iter()
                .map(|band| {
                    let mut words = Vec::with_capacity(band.len() * self.layout.words_per_row());
                    let report = self.run_band(stencil, primary, companion, *band, &mut words)?;
                    Ok((report, words))
                })
                .collect::<Result<Vec<_>>>()?;

            let mut reports = Vec::with_capacity(outputs.len());
            for (report, words) in outputs {
                for word in words {
                    sink.accept(word)?;
                }
                reports.push(report);
            }
            reports
        };

        let report = PassReport {
            kernel: stencil.name(),
            words_out: reports.iter().map(|r| r.words_out).sum(),
            words_streamed: reports.iter().map(|r| r.words_streamed).sum(),
            bands: bands.len(),
            max_buffered: reports.iter().map(|r| r.max_buffered).max().unwrap_or(0),
        };
        info!(
            kernel = report.kernel,
            rows = self.layout.rows(),
            cols = self.layout.cols(),
            bands = report.bands,
            words = report.words_out,
            "pass complete"
        );
        Ok(report)
    }

    /// Run one pass into a new grid.
    pub fn run_pass_to_grid<S: Stencil + ?Sized>(
        &self,
        stencil: &S,
        primary: &PackedGrid,
        companion: Option<&PackedGrid>,
    ) -> Result<PackedGrid> {
        let mut words = Vec::with_capacity(self.layout.word_count());
        self.run_pass(stencil, primary, companion, &mut words)?;
        PackedGrid::from_words(self.layout, words)
    }

    fn check_inputs<S: Stencil + ?Sized>(
        &self,
        stencil: &S,
        primary: &PackedGrid,
        companion: Option<&PackedGrid>,
    ) -> Result<()> {
        if primary.layout() != self.layout {
            return Err(StencilError::config(format!(
                "primary grid is {}x{} in {} lanes, driver expects {}x{} in {} lanes",
                primary.layout().rows(),
                primary.layout().cols(),
                primary.layout().lanes(),
                self.layout.rows(),
                self.layout.cols(),
                self.layout.lanes()
            )));
        }
        match (stencil.is_coupled(), companion) {
            (true, None) => Err(StencilError::config(format!(
                "{} needs a companion grid",
                stencil.name()
            ))),
            (false, Some(_)) => Err(StencilError::config(format!(
                "{} takes a single grid",
                stencil.name()
            ))),
            (true, Some(c)) if c.layout() != self.layout => Err(StencilError::config(
                "companion grid layout differs from the primary grid",
            )),
            _ => Ok(()),
        }
    }

    fn run_band<S, W>(
        &self,
        stencil: &S,
        primary: &PackedGrid,
        companion: Option<&PackedGrid>,
        band: RowBand,
        sink: &mut W,
    ) -> Result<BandReport>
    where
        S: Stencil + ?Sized,
        W: WordSink + ?Sized,
    {
        let reach = stencil.shared_reach();
        let mut primary_cache =
            RowWindowCache::with_reach(self.layout, stencil.taps(), reach, self.policy)?
                .with_band(band)?;
        let mut companion_cache = match companion {
            Some(_) => Some(
                RowWindowCache::with_reach(
                    self.layout,
                    stencil.companion_taps(),
                    reach,
                    self.policy,
                )?
                .with_band(band)?,
            ),
            None => None,
        };

        let stream_rows = primary_cache.stream_rows();
        let primary_words = primary.row_words(stream_rows.clone());
        let companion_words = companion.map(|c| c.row_words(stream_rows));

        let mut compute = ComputeStage::new(self.layout.codec(), self.mode);
        let mut stage = Stage::new();
        let mut report = BandReport::default();

        for (i, word) in primary_words.iter().enumerate() {
            let p = primary_cache.advance(word.clone())?;
            let c = match (companion_cache.as_mut(), companion_words) {
                (Some(cache), Some(words)) => cache.advance(words[i].clone())?,
                _ => None,
            };
            if let Some(out) = Self::combine(stencil, &mut compute, p, c)? {
                if let Some(ready) = stage.shift(out) {
                    sink.accept(ready)?;
                    report.words_out += 1;
                }
            }
        }

        report.words_streamed = primary_words.len() * if companion.is_some() { 2 } else { 1 };
        report.max_buffered = primary_cache.stats().ring.max_depth as usize;
        if let Some(cache) = &companion_cache {
            report.max_buffered = report.max_buffered.max(cache.stats().ring.max_depth as usize);
        }

        loop {
            let p = primary_cache.flush()?;
            let c = match companion_cache.as_mut() {
                Some(cache) => cache.flush()?,
                None => None,
            };
            let done = p.is_none() && c.is_none();
            if let Some(out) = Self::combine(stencil, &mut compute, p, c)? {
                if let Some(ready) = stage.shift(out) {
                    sink.accept(ready)?;
                    report.words_out += 1;
                }
            }
            if done {
                break;
            }
        }

        if let Some(last) = stage.take() {
            sink.accept(last)?;
            report.words_out += 1;
        }

        let expected = band.len() * self.layout.words_per_row();
        if report.words_out != expected {
            return Err(StencilError::violation(
                band.end * self.layout.words_per_row(),
                band.end as isize,
                0,
                format!("band produced {} of {} words", report.words_out, expected),
            ));
        }
        Ok(report)
    }

    /// Evaluate one advance step, checking that both streams are in step.
    fn combine<S: Stencil + ?Sized>(
        stencil: &S,
        compute: &mut ComputeStage,
        primary: Option<WindowBlock<'_>>,
        companion: Option<WindowBlock<'_>>,
    ) -> Result<Option<TransportWord>> {
        match (primary, companion) {
            (None, None) => Ok(None),
            (Some(p), None) if !stencil.is_coupled() => compute.evaluate(stencil, &p, None).map(Some),
            (Some(p), Some(c)) => compute.evaluate(stencil, &p, Some(&c)).map(Some),
            (Some(b), None) | (None, Some(b)) => Err(StencilError::violation(
                b.word(),
                b.row() as isize,
                0,
                "primary and companion streams out of step",
            )),
        }
    }
}

/// Kernel entry contract.
///
/// Runs one pass of `kernel` over `source` (and `companion` for coupled
/// kernels) and writes the result into `dest`. Every argument is checked
/// before streaming starts; any mismatch is a configuration error.
#[allow(clippy::too_many_arguments)]
pub fn apply(
    kernel: KernelId,
    source: &PackedGrid,
    companion: Option<&PackedGrid>,
    dest: &mut PackedGrid,
    rows: usize,
    cols: usize,
    lane_width: usize,
) -> Result<PassReport> {
    let layout = GridLayout::with_lanes(rows, cols, lane_width)?;
    apply_with(
        &PassDriver::new(layout),
        kernel,
        source,
        companion,
        dest,
    )
}

/// [`apply`] with an explicitly configured driver.
pub fn apply_with(
    driver: &PassDriver,
    kernel: KernelId,
    source: &PackedGrid,
    companion: Option<&PackedGrid>,
    dest: &mut PackedGrid,
) -> Result<PassReport> {
    if dest.layout() != driver.layout() {
        return Err(StencilError::config(
            "destination grid layout differs from the pass layout",
        ));
    }
    let mut sink = GridSink::new(dest);
    driver.run_pass(kernel.stencil(), source, companion, &mut sink)
}
