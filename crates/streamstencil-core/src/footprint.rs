//! Stencil footprints: tap offsets and the buffering they imply.

use std::collections::BTreeMap;
use std::fmt;

use crate::grid::GridLayout;

/// Relative offset of one stencil input, row first.
///
/// `Tap::new(-1, 0)` is the cell in the row above, `Tap::new(0, -1)` the
/// cell to the west.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tap {
    /// Row offset (negative is up).
    pub row: isize,
    /// Column offset (negative is west).
    pub col: isize,
}

impl Tap {
    /// The centre cell.
    pub const CENTER: Tap = Tap::new(0, 0);

    /// Create a tap.
    pub const fn new(row: isize, col: isize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Tap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// How far a set of taps extends from the centre in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Reach {
    /// Rows above the centre.
    pub up: usize,
    /// Rows below the centre.
    pub down: usize,
    /// Columns west of the centre.
    pub west: usize,
    /// Columns east of the centre.
    pub east: usize,
}

impl Reach {
    /// Reach of a tap set.
    pub fn of(taps: &[Tap]) -> Self {
        taps.iter().fold(Self::default(), |acc, tap| Self {
            up: acc.up.max((-tap.row).max(0) as usize),
            down: acc.down.max(tap.row.max(0) as usize),
            west: acc.west.max((-tap.col).max(0) as usize),
            east: acc.east.max(tap.col.max(0) as usize),
        })
    }

    /// Smallest reach covering both.
    pub fn union(self, other: Reach) -> Self {
        Self {
            up: self.up.max(other.up),
            down: self.down.max(other.down),
            west: self.west.max(other.west),
            east: self.east.max(other.east),
        }
    }

    /// Whether `other` fits inside this reach.
    pub fn covers(&self, other: &Reach) -> bool {
        self.up >= other.up
            && self.down >= other.down
            && self.west >= other.west
            && self.east >= other.east
    }

    /// Whole words west of a centre word that must stay buffered.
    pub fn blocks_back(&self, lanes: usize) -> usize {
        self.west.div_ceil(lanes)
    }

    /// Whole words east of a centre word that must arrive before it is
    /// evaluated.
    pub fn blocks_ahead(&self, lanes: usize) -> usize {
        self.east.div_ceil(lanes)
    }

    /// Words between the oldest word a window may read and its centre.
    pub fn lookback_words(&self, layout: &GridLayout) -> usize {
        self.up * layout.words_per_row() + self.blocks_back(layout.lanes())
    }

    /// Words between a centre and the newest word its window may read.
    ///
    /// This is the startup latency of a pass.
    pub fn lookahead_words(&self, layout: &GridLayout) -> usize {
        self.down * layout.words_per_row() + self.blocks_ahead(layout.lanes())
    }

    /// Words that must be live at once.
    pub fn live_words(&self, layout: &GridLayout) -> usize {
        self.lookback_words(layout) + self.lookahead_words(layout) + 1
    }
}

/// The taps of one input stream together with their reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint {
    taps: Vec<Tap>,
    reach: Reach,
}

impl Footprint {
    /// Build a footprint from taps.
    pub fn new(taps: &[Tap]) -> Self {
        Self {
            taps: taps.to_vec(),
            reach: Reach::of(taps),
        }
    }

    /// Taps in evaluation order.
    pub fn taps(&self) -> &[Tap] {
        &self.taps
    }

    /// Reach of the taps.
    pub fn reach(&self) -> Reach {
        self.reach
    }

    /// Column offsets referenced on each row offset.
    pub fn columns_by_row(&self) -> BTreeMap<isize, Vec<isize>> {
        let mut rows: BTreeMap<isize, Vec<isize>> = BTreeMap::new();
        for tap in &self.taps {
            rows.entry(tap.row).or_default().push(tap.col);
        }
        for cols in rows.values_mut() {
            cols.sort_unstable();
            cols.dedup();
        }
        rows
    }

    /// Human-readable buffering summary for a layout.
    pub fn describe(&self, layout: &GridLayout) -> String {
        let lanes = layout.lanes();
        let mut out = String::new();
        for (row, cols) in self.columns_by_row() {
            let cols: Vec<String> = cols.iter().map(|c| c.to_string()).collect();
            out.push_str(&format!("row {:+}: cols [{}]\n", row, cols.join(", ")));
        }
        out.push_str(&format!(
            "blocks back {}, blocks ahead {}, lookback {} words, lookahead {} words, live {} words",
            self.reach.blocks_back(lanes),
            self.reach.blocks_ahead(lanes),
            self.reach.lookback_words(layout),
            self.reach.lookahead_words(layout),
            self.reach.live_words(layout)
        ));
        out
    }
}
