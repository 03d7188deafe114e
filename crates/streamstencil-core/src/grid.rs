//! Grid geometry and packed grid storage.
//!
//! A grid is transported row-major as transport words; each word holds
//! `lanes` consecutive cells of a single row.

use std::ops::Range;

use crate::codec::{LaneCodec, TransportWord};
use crate::error::{Result, StencilError};

/// Grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl GridShape {
    /// Create a shape, rejecting empty dimensions.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(StencilError::config(format!(
                "grid dimensions must be positive, got {rows}x{cols}"
            )));
        }
        Ok(Self { rows, cols })
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// How a grid shape maps onto transport words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridLayout {
    shape: GridShape,
    codec: LaneCodec,
    words_per_row: usize,
}

impl GridLayout {
    /// Create a layout. `cols` must be a multiple of the codec's lane count.
    pub fn new(shape: GridShape, codec: LaneCodec) -> Result<Self> {
        let shape = GridShape::new(shape.rows, shape.cols)?;
        let lanes = codec.lanes();
        if shape.cols % lanes != 0 {
            return Err(StencilError::config(format!(
                "{} columns is not a multiple of the lane width {}",
                shape.cols, lanes
            )));
        }
        Ok(Self {
            shape,
            codec,
            words_per_row: shape.cols / lanes,
        })
    }

    /// Shortcut for `GridLayout::new(GridShape::new(rows, cols)?, LaneCodec::with_lanes(lanes)?)`.
    pub fn with_lanes(rows: usize, cols: usize, lanes: usize) -> Result<Self> {
        Self::new(GridShape::new(rows, cols)?, LaneCodec::with_lanes(lanes)?)
    }

    /// Grid dimensions.
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.shape.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.shape.cols
    }

    /// Codec used to pack the grid.
    pub fn codec(&self) -> LaneCodec {
        self.codec
    }

    /// Lanes per transport word.
    #[inline]
    pub fn lanes(&self) -> usize {
        self.codec.lanes()
    }

    /// Transport words per row.
    #[inline]
    pub fn words_per_row(&self) -> usize {
        self.words_per_row
    }

    /// Transport words in the whole grid.
    pub fn word_count(&self) -> usize {
        self.shape.rows * self.words_per_row
    }

    /// Global word index of `(row, block)`.
    #[inline]
    pub fn word_index(&self, row: usize, block: usize) -> usize {
        row * self.words_per_row + block
    }

    /// Split a global word index into `(row, block)`.
    #[inline]
    pub fn word_position(&self, word: usize) -> (usize, usize) {
        (word / self.words_per_row, word % self.words_per_row)
    }

    /// Split the rows into at most `partitions` contiguous bands.
    ///
    /// Every band holds `ceil(rows / partitions)` rows except possibly the
    /// last; empty bands are not produced.
    pub fn bands(&self, partitions: usize) -> Vec<RowBand> {
        let partitions = partitions.clamp(1, self.shape.rows);
        let per_band = self.shape.rows.div_ceil(partitions);
        (0..self.shape.rows)
            .step_by(per_band)
            .map(|start| RowBand::new(start, (start + per_band).min(self.shape.rows)))
            .collect()
    }
}

/// A contiguous range of rows `[start, end)` produced by one cache set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowBand {
    /// First row of the band.
    pub start: usize,
    /// One past the last row of the band.
    pub end: usize,
}

impl RowBand {
    /// Create a band.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The band covering every row of a layout.
    pub fn full(layout: &GridLayout) -> Self {
        Self::new(0, layout.rows())
    }

    /// Number of rows in the band.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the band has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row range of the band.
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// A grid stored as row-major transport words.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedGrid {
    layout: GridLayout,
    words: Vec<TransportWord>,
}

impl PackedGrid {
    /// An all-zero grid.
    pub fn zeroed(layout: GridLayout) -> Self {
        Self {
            words: vec![TransportWord::zeroed(layout.lanes()); layout.word_count()],
            layout,
        }
    }

    /// Build a grid by evaluating `f(row, col)` for every cell.
    pub fn from_fn(layout: GridLayout, mut f: impl FnMut(usize, usize) -> f32) -> Result<Self> {
        let codec = layout.codec();
        let lanes = layout.lanes();
        let mut words = Vec::with_capacity(layout.word_count());
        let mut lane_values = vec![0.0f32; lanes];

        for row in 0..layout.rows() {
            for block in 0..layout.words_per_row() {
                for (lane, value) in lane_values.iter_mut().enumerate() {
                    *value = f(row, block * lanes + lane);
                }
                words.push(codec.pack(&lane_values)?);
            }
        }
        Ok(Self { layout, words })
    }

    /// Build a grid from row-major cell values.
    pub fn from_values(layout: GridLayout, values: &[f32]) -> Result<Self> {
        if values.len() != layout.shape().cell_count() {
            return Err(StencilError::config(format!(
                "expected {} cell values for a {}x{} grid, got {}",
                layout.shape().cell_count(),
                layout.rows(),
                layout.cols(),
                values.len()
            )));
        }
        let codec = layout.codec();
        let words = values
            .chunks_exact(layout.lanes())
            .map(|chunk| codec.pack(chunk))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { layout, words })
    }

    /// Wrap already packed words.
    pub fn from_words(layout: GridLayout, words: Vec<TransportWord>) -> Result<Self> {
        if words.len() != layout.word_count() {
            return Err(StencilError::config(format!(
                "expected {} words, got {}",
                layout.word_count(),
                words.len()
            )));
        }
        if let Some(bad) = words.iter().find(|w| w.lanes() != layout.lanes()) {
            return Err(StencilError::config(format!(
                "word with {} lanes in a {}-lane grid",
                bad.lanes(),
                layout.lanes()
            )));
        }
        Ok(Self { layout, words })
    }

    /// Grid layout.
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Transport words in row-major order.
    pub fn words(&self) -> &[TransportWord] {
        &self.words
    }

    pub(crate) fn words_mut(&mut self) -> &mut [TransportWord] {
        &mut self.words
    }

    /// Consume the grid, returning its words.
    pub fn into_words(self) -> Vec<TransportWord> {
        self.words
    }

    /// Words of a row range, in stream order.
    pub fn row_words(&self, rows: Range<usize>) -> &[TransportWord] {
        let wpr = self.layout.words_per_row();
        &self.words[rows.start * wpr..rows.end * wpr]
    }

    /// Value of one cell, `None` if out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.layout.rows() || col >= self.layout.cols() {
            return None;
        }
        let lanes = self.layout.lanes();
        let word = &self.words[self.layout.word_index(row, col / lanes)];
        self.layout.codec().lane(word, col % lanes)
    }

    /// All cell values, row-major.
    pub fn to_values(&self) -> Vec<f32> {
        self.words
            .iter()
            .flat_map(|w| w.limbs().iter().map(|bits| f32::from_bits(*bits)))
            .collect()
    }

    /// Values as a vector of rows.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.to_values()
            .chunks_exact(self.layout.cols())
            .map(|row| row.to_vec())
            .collect()
    }

    /// Little-endian `f32` image, row-major.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Decode a little-endian `f32` image.
    pub fn from_le_bytes(layout: GridLayout, bytes: &[u8]) -> Result<Self> {
        let word_bytes = layout.lanes() * 4;
        if bytes.len() != layout.word_count() * word_bytes {
            return Err(StencilError::config(format!(
                "expected {} bytes for a {}x{} grid, got {}",
                layout.word_count() * word_bytes,
                layout.rows(),
                layout.cols(),
                bytes.len()
            )));
        }
        let words = bytes
            .chunks_exact(word_bytes)
            .map(TransportWord::from_le_bytes)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { layout, words })
    }
}
