//! Row window cache.
//!
//! The cache turns a row-major stream of transport words into per-lane
//! neighbourhood windows while buffering only the words a window can
//! reach: `lookback` words behind the centre and `lookahead` words ahead
//! of it.
//!
//! ```text
//!   stream ──► [ oldest ........ centre ........ newest ] ──► evicted
//!              |<-- lookback -->|        |<-- lookahead -->|
//!              row above, block b-1      row below, block b+1
//! ```
//!
//! A centre word is emitted once `lookahead` further words have arrived
//! (prologue). After the last word, `flush` emits the remaining centres and
//! then drains the ring so the cache is ready for the next pass (epilogue).
//! Taps falling across a word boundary are redirected to the adjacent
//! block; taps falling across a row boundary are redirected by whole rows.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::codec::{LaneCodec, TransportWord};
use crate::error::{Result, StencilError};
use crate::footprint::{Reach, Tap};
use crate::grid::{GridLayout, RowBand};
use crate::ring::{RingStats, WordRing};

/// Value substituted for taps that fall outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum EdgePolicy {
    /// Missing neighbours read as `0.0` (default).
    #[default]
    Zero = 0,
    /// Missing neighbours replicate the nearest edge cell; row and column
    /// are clamped independently.
    Clamp = 1,
}

impl EdgePolicy {
    /// All policies.
    pub const ALL: [EdgePolicy; 2] = [EdgePolicy::Zero, EdgePolicy::Clamp];

    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "zero" | "absorbing" => Some(EdgePolicy::Zero),
            "clamp" | "replicate" => Some(EdgePolicy::Clamp),
            _ => None,
        }
    }
}

/// Windows of every lane of one centre word.
///
/// Values are lane-major: lane `k` owns `values[k * taps .. (k + 1) * taps]`.
#[derive(Debug, Clone, Copy)]
pub struct WindowBlock<'a> {
    word: usize,
    row: usize,
    block: usize,
    taps: usize,
    values: &'a [f32],
}

impl<'a> WindowBlock<'a> {
    /// Global index of the centre word.
    pub fn word(&self) -> usize {
        self.word
    }

    /// Grid row of the centre word.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Block (word within the row) of the centre word.
    pub fn block(&self) -> usize {
        self.block
    }

    /// Number of lanes.
    pub fn lanes(&self) -> usize {
        if self.taps == 0 {
            0
        } else {
            self.values.len() / self.taps
        }
    }

    /// Values per window.
    pub fn taps(&self) -> usize {
        self.taps
    }

    /// Window of one lane, in tap order.
    #[inline]
    pub fn lane(&self, lane: usize) -> &'a [f32] {
        &self.values[lane * self.taps..(lane + 1) * self.taps]
    }

    /// All windows, lane-major.
    pub fn values(&self) -> &'a [f32] {
        self.values
    }
}

/// Cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Window blocks emitted since construction.
    pub blocks_emitted: u64,
    /// Completed drains.
    pub drains: u64,
    /// Ring counters.
    pub ring: RingStats,
}

/// Sliding window over one grid stream.
#[derive(Debug)]
pub struct RowWindowCache {
    layout: GridLayout,
    codec: LaneCodec,
    taps: Vec<Tap>,
    reach: Reach,
    policy: EdgePolicy,
    band: RowBand,
    /// Rows carried by the stream: the band plus its halo, clipped.
    stream_rows: Range<usize>,
    lookahead: usize,
    ring: WordRing,
    /// Global word index of the next centre to emit.
    next_center: usize,
    window: Vec<f32>,
    blocks_emitted: u64,
    drains: u64,
}

impl RowWindowCache {
    /// Create a cache for `taps` over the whole grid, using the taps' own
    /// reach.
    pub fn new(layout: GridLayout, taps: &[Tap], policy: EdgePolicy) -> Result<Self> {
        Self::with_reach(layout, taps, Reach::of(taps), policy)
    }

    /// Create a cache with an explicit reach.
    ///
    /// Streams that must advance in lockstep share one reach so they have
    /// the same latency. The reach must cover the taps.
    pub fn with_reach(
        layout: GridLayout,
        taps: &[Tap],
        reach: Reach,
        policy: EdgePolicy,
    ) -> Result<Self> {
        if taps.is_empty() {
            return Err(StencilError::config("a window needs at least one tap"));
        }
        let own = Reach::of(taps);
        if !reach.covers(&own) {
            return Err(StencilError::config(format!(
                "reach {reach:?} does not cover the taps' reach {own:?}"
            )));
        }

        let lookback = reach.lookback_words(&layout);
        let lookahead = reach.lookahead_words(&layout);
        let live = reach.live_words(&layout);
        debug!(
            taps = taps.len(),
            lookback, lookahead, live, "row window cache configured"
        );

        let band = RowBand::full(&layout);
        Ok(Self {
            codec: layout.codec(),
            stream_rows: Self::stream_rows_for(&layout, &reach, band),
            layout,
            taps: taps.to_vec(),
            reach,
            policy,
            band,
            lookahead,
            ring: WordRing::new(live),
            next_center: 0,
            window: vec![0.0; layout.lanes() * taps.len()],
            blocks_emitted: 0,
            drains: 0,
        })
    }

    /// Restrict emission to a band of rows.
    ///
    /// The stream must then carry `stream_rows()`: the band plus up to
    /// `reach.up` rows above and `reach.down` rows below.
    pub fn with_band(mut self, band: RowBand) -> Result<Self> {
        if band.is_empty() || band.end > self.layout.rows() {
            return Err(StencilError::config(format!(
                "band {}..{} is empty or outside a {}-row grid",
                band.start,
                band.end,
                self.layout.rows()
            )));
        }
        if !self.is_idle() {
            return Err(StencilError::config("cannot re-band a cache mid-pass"));
        }
        self.band = band;
        self.stream_rows = Self::stream_rows_for(&self.layout, &self.reach, band);
        self.next_center = self.band_words().start;
        Ok(self)
    }

    fn stream_rows_for(layout: &GridLayout, reach: &Reach, band: RowBand) -> Range<usize> {
        band.start.saturating_sub(reach.up)..(band.end + reach.down).min(layout.rows())
    }

    /// Grid layout.
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Edge policy.
    pub fn policy(&self) -> EdgePolicy {
        self.policy
    }

    /// Shared reach.
    pub fn reach(&self) -> Reach {
        self.reach
    }

    /// Rows whose windows are emitted.
    pub fn band(&self) -> RowBand {
        self.band
    }

    /// Rows the input stream must carry, in order.
    pub fn stream_rows(&self) -> Range<usize> {
        self.stream_rows.clone()
    }

    /// Words the input stream must carry.
    pub fn stream_len(&self) -> usize {
        self.stream_rows.len() * self.layout.words_per_row()
    }

    /// Words supplied since the last drain.
    pub fn supplied(&self) -> usize {
        self.ring.head() as usize
    }

    /// Centre words not yet emitted in this pass.
    pub fn pending(&self) -> usize {
        self.band_words().end.saturating_sub(self.next_center)
    }

    /// Whether the cache is in its freshly constructed state.
    pub fn is_idle(&self) -> bool {
        self.ring.is_empty() && self.ring.head() == 0 && self.next_center == self.band_words().start
    }

    /// Words retained right now.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Maximum words the cache can retain.
    pub fn capacity(&self) -> usize {
        self.ring.retain()
    }

    /// Counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            blocks_emitted: self.blocks_emitted,
            drains: self.drains,
            ring: self.ring.stats(),
        }
    }

    fn band_words(&self) -> Range<usize> {
        let wpr = self.layout.words_per_row();
        self.band.start * wpr..self.band.end * wpr
    }

    fn stream_base(&self) -> usize {
        self.stream_rows.start * self.layout.words_per_row()
    }

    /// Supply the next word of the stream.
    ///
    /// Returns the windows of the centre word that just became complete,
    /// if any.
    pub fn advance(&mut self, word: TransportWord) -> Result<Option<WindowBlock<'_>>> {
        if word.lanes() != self.layout.lanes() {
            return Err(StencilError::config(format!(
                "word with {} lanes supplied to a {}-lane cache",
                word.lanes(),
                self.layout.lanes()
            )));
        }
        if self.supplied() >= self.stream_len() {
            let (row, _) = self.layout.word_position(self.stream_base() + self.supplied());
            return Err(StencilError::violation(
                self.next_center,
                row as isize,
                0,
                format!("stream overrun: band expects {} words", self.stream_len()),
            ));
        }

        self.ring.push(word);

        let newest = self.stream_base() + self.supplied() - 1;
        let ready = self.next_center < self.band_words().end
            && newest >= self.next_center + self.lookahead;
        if !ready {
            return Ok(None);
        }
        self.emit().map(Some)
    }

    /// Emit the next remaining centre after the stream has ended.
    ///
    /// Returns `None` once every centre of the band has been emitted; that
    /// call also drains the ring and rewinds the cache.
    pub fn flush(&mut self) -> Result<Option<WindowBlock<'_>>> {
        if self.next_center >= self.band_words().end {
            let discarded = self.ring.drain();
            self.next_center = self.band_words().start;
            self.drains += 1;
            trace!(discarded, "row window cache drained");
            return Ok(None);
        }
        if self.supplied() < self.stream_len() {
            let (row, _) = self.layout.word_position(self.stream_base() + self.supplied());
            return Err(StencilError::violation(
                self.next_center,
                row as isize,
                0,
                format!(
                    "flush after {} of {} stream words",
                    self.supplied(),
                    self.stream_len()
                ),
            ));
        }
        self.emit().map(Some)
    }

    /// Discard any partial pass state.
    pub fn reset(&mut self) {
        self.ring.drain();
        self.next_center = self.band_words().start;
    }

    fn emit(&mut self) -> Result<WindowBlock<'_>> {
        let center = self.next_center;
        self.assemble(center)?;
        self.next_center += 1;
        self.blocks_emitted += 1;

        let (row, block) = self.layout.word_position(center);
        Ok(WindowBlock {
            word: center,
            row,
            block,
            taps: self.taps.len(),
            values: &self.window,
        })
    }

    /// Fill the scratch window for every lane of `center`.
    fn assemble(&mut self, center: usize) -> Result<()> {
        let lanes = self.layout.lanes() as isize;
        let (row, block) = self.layout.word_position(center);
        let taps = self.taps.len();
        let stream_base = self.stream_base();

        for lane in 0..self.layout.lanes() {
            for (t, tap) in self.taps.iter().enumerate() {
                let (shift, target_lane) = redirect(lane as isize + tap.col, lanes);
                let target_row = row as isize + tap.row;
                let target_col = (block as isize + shift) * lanes + target_lane;

                self.window[lane * taps + t] = read_cell(
                    &self.layout,
                    &self.codec,
                    &self.ring,
                    self.policy,
                    stream_base,
                    center,
                    target_row,
                    target_col,
                )?;
            }
        }
        Ok(())
    }
}

/// Split a lane offset into a block shift and a lane within that block.
///
/// `redirect(-1, 16)` is `(-1, 15)`: the last lane of the previous block.
#[inline]
pub fn redirect(lane_offset: isize, lanes: isize) -> (isize, isize) {
    (lane_offset.div_euclid(lanes), lane_offset.rem_euclid(lanes))
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn read_cell(
    layout: &GridLayout,
    codec: &LaneCodec,
    ring: &WordRing,
    policy: EdgePolicy,
    stream_base: usize,
    center: usize,
    row: isize,
    col: isize,
) -> Result<f32> {
    let rows = layout.rows() as isize;
    let cols = layout.cols() as isize;

    let (row, col) = if (0..rows).contains(&row) && (0..cols).contains(&col) {
        (row, col)
    } else {
        match policy {
            EdgePolicy::Zero => return Ok(0.0),
            EdgePolicy::Clamp => (row.clamp(0, rows - 1), col.clamp(0, cols - 1)),
        }
    };

    let lanes = layout.lanes();
    let (row_u, col_u) = (row as usize, col as usize);
    let global = layout.word_index(row_u, col_u / lanes);

    let word = global
        .checked_sub(stream_base)
        .and_then(|index| ring.get(index as u64))
        .ok_or_else(|| {
            StencilError::violation(
                center,
                row,
                col,
                format!(
                    "word {} not buffered (ring holds {}..{})",
                    global,
                    stream_base as u64 + ring.tail(),
                    stream_base as u64 + ring.head()
                ),
            )
        })?;

    codec.lane(word, col_u % lanes).ok_or_else(|| {
        StencilError::violation(center, row, col, "lane outside buffered word")
    })
}
