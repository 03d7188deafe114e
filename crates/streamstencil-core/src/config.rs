//! Engine configuration.
//!
//! A run is described by grid dimensions, word width, kernel, edge policy
//! and iteration count. The description can be built in code or loaded
//! from TOML:
//!
//! ```toml
//! rows = 1024
//! cols = 1024
//! word_bits = 512
//! iterations = 8
//! partitions = 4
//! kernel = "coupled7"
//! edge_policy = "zero"
//! exec_mode = "auto"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::EdgePolicy;
use crate::codec::{LaneCodec, DEFAULT_WORD_BITS};
use crate::compute::ExecMode;
use crate::driver::PassDriver;
use crate::error::{Result, StencilError};
use crate::grid::{GridLayout, GridShape};
use crate::iteration::IterationController;
use crate::stencil::KernelId;

fn default_word_bits() -> u32 {
    DEFAULT_WORD_BITS
}

fn default_one() -> usize {
    1
}

/// Everything needed to set up a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Grid rows.
    pub rows: usize,
    /// Grid columns; a multiple of the lane count.
    pub cols: usize,
    /// Transport word width in bits.
    #[serde(default = "default_word_bits")]
    pub word_bits: u32,
    /// Passes to run.
    #[serde(default = "default_one")]
    pub iterations: usize,
    /// Row bands per pass.
    #[serde(default = "default_one")]
    pub partitions: usize,
    /// Kernel to apply.
    #[serde(default)]
    pub kernel: KernelId,
    /// Value used for neighbours outside the grid.
    #[serde(default)]
    pub edge_policy: EdgePolicy,
    /// Lane execution mode.
    #[serde(default)]
    pub exec_mode: ExecMode,
}

impl EngineConfig {
    /// Start a builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Parse a TOML document and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        self.layout()?;
        if self.partitions == 0 {
            return Err(StencilError::config("partitions must be at least 1"));
        }
        Ok(())
    }

    /// Codec for the configured word width.
    pub fn codec(&self) -> Result<LaneCodec> {
        LaneCodec::new(self.word_bits)
    }

    /// Grid layout for the configured dimensions and word width.
    pub fn layout(&self) -> Result<GridLayout> {
        GridLayout::new(GridShape::new(self.rows, self.cols)?, self.codec()?)
    }

    /// Driver with the configured policy, mode and partitions.
    pub fn driver(&self) -> Result<PassDriver> {
        self.validate()?;
        Ok(PassDriver::new(self.layout()?)
            .with_edge_policy(self.edge_policy)
            .with_exec_mode(self.exec_mode)
            .with_partitions(self.partitions))
    }

    /// Iteration controller around [`EngineConfig::driver`].
    pub fn controller(&self) -> Result<IterationController> {
        Ok(IterationController::new(self.driver()?))
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
    unrepresentable_lanes: Option<usize>,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig {
                rows: 0,
                cols: 0,
                word_bits: DEFAULT_WORD_BITS,
                iterations: 1,
                partitions: 1,
                kernel: KernelId::default(),
                edge_policy: EdgePolicy::default(),
                exec_mode: ExecMode::default(),
            },
            unrepresentable_lanes: None,
        }
    }
}

impl EngineConfigBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            config,
            unrepresentable_lanes: None,
        }
    }

    /// Set grid dimensions.
    pub fn grid(mut self, rows: usize, cols: usize) -> Self {
        self.config.rows = rows;
        self.config.cols = cols;
        self
    }

    /// Set the row count.
    pub fn rows(mut self, rows: usize) -> Self {
        self.config.rows = rows;
        self
    }

    /// Set the column count.
    pub fn cols(mut self, cols: usize) -> Self {
        self.config.cols = cols;
        self
    }

    /// Set the word width in bits.
    pub fn word_bits(mut self, bits: u32) -> Self {
        self.config.word_bits = bits;
        self.unrepresentable_lanes = None;
        self
    }

    /// Set the word width by lane count.
    ///
    /// A count whose width does not fit in `u32` bits fails at `build()`.
    pub fn lanes(mut self, lanes: usize) -> Self {
        match u32::try_from(lanes)
            .ok()
            .and_then(|n| n.checked_mul(crate::codec::LANE_BITS))
        {
            Some(bits) => {
                self.config.word_bits = bits;
                self.unrepresentable_lanes = None;
            }
            None => self.unrepresentable_lanes = Some(lanes),
        }
        self
    }

    /// Set the iteration count.
    pub fn iterations(mut self, n: usize) -> Self {
        self.config.iterations = n;
        self
    }

    /// Set the number of row bands per pass.
    pub fn partitions(mut self, n: usize) -> Self {
        self.config.partitions = n;
        self
    }

    /// Set the kernel.
    pub fn kernel(mut self, kernel: KernelId) -> Self {
        self.config.kernel = kernel;
        self
    }

    /// Set the edge policy.
    pub fn edge_policy(mut self, policy: EdgePolicy) -> Self {
        self.config.edge_policy = policy;
        self
    }

    /// Set the lane execution mode.
    pub fn exec_mode(mut self, mode: ExecMode) -> Self {
        self.config.exec_mode = mode;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<EngineConfig> {
        if let Some(lanes) = self.unrepresentable_lanes {
            return Err(StencilError::config(format!(
                "{lanes} lanes exceed the widest transport word"
            )));
        }
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_defaults() {
        let config = EngineConfig::from_toml_str("rows = 8\ncols = 32\n").unwrap();
        assert_eq!(config.word_bits, 512);
        assert_eq!(config.iterations, 1);
        assert_eq!(config.partitions, 1);
        assert_eq!(config.kernel, KernelId::Sum4);
        assert_eq!(config.edge_policy, EdgePolicy::Zero);
        assert_eq!(config.layout().unwrap().words_per_row(), 2);
    }

    #[test]
    fn test_toml_full() {
        let text = r#"
            rows = 4
            cols = 8
            word_bits = 128
            iterations = 3
            partitions = 2
            kernel = "coupled7"
            edge_policy = "clamp"
            exec_mode = "sequential"
        "#;
        let config = EngineConfig::from_toml_str(text).unwrap();
        assert_eq!(config.kernel, KernelId::Coupled7);
        assert_eq!(config.edge_policy, EdgePolicy::Clamp);
        assert_eq!(config.exec_mode, ExecMode::Sequential);

        let driver = config.driver().unwrap();
        assert_eq!(driver.layout().lanes(), 4);
        assert_eq!(driver.partitions(), 2);

        let back = EngineConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            EngineConfig::from_toml_str("rows = 4\ncols = 20\n"),
            Err(StencilError::Configuration(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("rows = 4\ncols = 16\nkernel = \"laplace\"\n"),
            Err(StencilError::ConfigParse(_))
        ));
        assert!(EngineConfig::from_toml_str("rows = 0\ncols = 16\n").is_err());
        assert!(EngineConfig::from_toml_str("rows = 4\ncols = 16\nword_bits = 40\n").is_err());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::builder()
            .grid(16, 64)
            .lanes(8)
            .kernel(KernelId::Skew4)
            .iterations(5)
            .build()
            .unwrap();
        assert_eq!(config.word_bits, 256);
        assert_eq!(config.iterations, 5);

        let wider = EngineConfigBuilder::from_config(config.clone())
            .cols(128)
            .build()
            .unwrap();
        assert_eq!((wider.rows, wider.cols), (16, 128));
        assert_eq!(wider.kernel, KernelId::Skew4);

        assert!(EngineConfig::builder().build().is_err());
        assert!(EngineConfig::builder().grid(4, 16).partitions(0).build().is_err());
    }

    #[test]
    fn test_builder_rejects_oversized_lanes() {
        let huge = u32::MAX as usize / 32 + 1;
        let err = EngineConfig::builder()
            .grid(4, 16)
            .lanes(huge)
            .build()
            .unwrap_err();
        assert!(err.is_configuration());

        #[cfg(target_pointer_width = "64")]
        {
            let wrapping = (1usize << 32) + 16;
            let err = EngineConfig::builder()
                .grid(4, 16)
                .lanes(wrapping)
                .build()
                .unwrap_err();
            assert!(err.is_configuration());
        }

        let config = EngineConfig::builder().grid(4, 16).lanes(16).build().unwrap();
        assert_eq!(config.word_bits, 512);
    }
}
