//! `streamstencil run` command - Run chained stencil passes over a grid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use colored::Colorize;
use streamstencil_core::prelude::*;
use tracing::{debug, info};

use crate::error::{CliError, CliResult};

use super::{parse_edge_policy, parse_exec_mode, parse_kernel};

/// Arguments of the `run` command. Flags override the config file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Grid rows
    #[arg(long)]
    pub rows: Option<usize>,

    /// Grid columns (multiple of the lane count)
    #[arg(long)]
    pub cols: Option<usize>,

    /// Transport word width in bits (multiple of 32)
    #[arg(long)]
    pub word_bits: Option<u32>,

    /// Kernel: sum4, skew4 or coupled7
    #[arg(short, long)]
    pub kernel: Option<String>,

    /// Edge policy: zero or clamp
    #[arg(long)]
    pub edge_policy: Option<String>,

    /// Lane execution mode: sequential, parallel or auto
    #[arg(long)]
    pub exec_mode: Option<String>,

    /// Number of passes
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Row bands per pass
    #[arg(short, long)]
    pub partitions: Option<usize>,

    /// Primary grid, raw little-endian f32 (default: ramp r*cols+c)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Companion grid for coupled kernels (default: reversed ramp)
    #[arg(long)]
    pub companion: Option<PathBuf>,

    /// Where to write the primary result
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Where to write the companion grid of a coupled run
    #[arg(long)]
    pub companion_output: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Execute the `run` command.
pub fn execute(args: &RunArgs) -> CliResult<()> {
    let config = resolve_config(args)?;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    check_grid_args(args, config.kernel)?;
    let layout = config.layout()?;
    let controller = config.controller()?;

    println!("{} Running {}", "→".bright_cyan(), config.kernel.to_string().bright_white());
    println!(
        "  {} Grid: {}x{} in {} lanes",
        "•".dimmed(),
        config.rows.to_string().bright_yellow(),
        config.cols.to_string().bright_yellow(),
        layout.lanes().to_string().bright_yellow()
    );
    println!(
        "  {} Iterations: {}, partitions: {}, edge policy: {:?}",
        "•".dimmed(),
        config.iterations.to_string().bright_yellow(),
        config.partitions.to_string().bright_yellow(),
        config.edge_policy
    );
    println!();

    let primary = match &args.input {
        Some(path) => load_grid(path, layout)?,
        None => PackedGrid::from_fn(layout, |r, c| (r * config.cols + c) as f32)?,
    };
    let companion = if config.kernel.is_coupled() {
        Some(match &args.companion {
            Some(path) => load_grid(path, layout)?,
            None => {
                let cells = config.rows * config.cols;
                PackedGrid::from_fn(layout, |r, c| (cells - 1 - (r * config.cols + c)) as f32)?
            }
        })
    } else {
        None
    };

    let start = Instant::now();
    let outcome = controller.run(config.kernel, primary, companion, config.iterations)?;
    let elapsed = start.elapsed();
    info!(passes = outcome.passes, elapsed_ms = elapsed.as_millis() as u64, "run complete");

    print_summary("primary", &outcome.primary);
    if let Some(companion) = &outcome.companion {
        print_summary("companion", companion);
    }

    let cells = (config.rows * config.cols * outcome.passes) as f64;
    println!();
    println!(
        "{} {} passes in {:.3?} ({:.1} Mcells/s)",
        "✓".green().bold(),
        outcome.passes,
        elapsed,
        cells / elapsed.as_secs_f64().max(1e-9) / 1e6
    );

    if let Some(path) = &args.output {
        save_grid(path, &outcome.primary)?;
    }
    if let (Some(path), Some(grid)) = (&args.companion_output, &outcome.companion) {
        save_grid(path, grid)?;
    }

    Ok(())
}

/// Reject companion flags that the kernel cannot use, before any pass runs.
pub fn check_grid_args(args: &RunArgs, kernel: KernelId) -> CliResult<()> {
    if kernel.is_coupled() {
        return Ok(());
    }
    if args.companion.is_some() {
        return Err(CliError::InvalidArgument(format!(
            "{kernel} takes no companion grid"
        )));
    }
    if args.companion_output.is_some() {
        return Err(CliError::InvalidArgument(
            "--companion-output needs a coupled kernel".to_string(),
        ));
    }
    Ok(())
}

/// Merge the config file (if any) with command-line overrides.
pub fn resolve_config(args: &RunArgs) -> CliResult<EngineConfig> {
    let mut builder = match &args.config {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            EngineConfigBuilder::from_config(EngineConfig::from_file(path)?)
        }
        None if args.rows.is_none() || args.cols.is_none() => {
            return Err(CliError::InvalidArgument(
                "--rows and --cols are required without --config".to_string(),
            ));
        }
        None => EngineConfig::builder(),
    };

    if let Some(rows) = args.rows {
        builder = builder.rows(rows);
    }
    if let Some(cols) = args.cols {
        builder = builder.cols(cols);
    }
    if let Some(bits) = args.word_bits {
        builder = builder.word_bits(bits);
    }
    if let Some(kernel) = &args.kernel {
        builder = builder.kernel(parse_kernel(kernel)?);
    }
    if let Some(policy) = &args.edge_policy {
        builder = builder.edge_policy(parse_edge_policy(policy)?);
    }
    if let Some(mode) = &args.exec_mode {
        builder = builder.exec_mode(parse_exec_mode(mode)?);
    }
    if let Some(n) = args.iterations {
        builder = builder.iterations(n);
    }
    if let Some(p) = args.partitions {
        builder = builder.partitions(p);
    }

    Ok(builder.build()?)
}

/// Read a raw little-endian `f32` grid.
pub fn load_grid(path: &Path, layout: GridLayout) -> CliResult<PackedGrid> {
    let bytes = fs::read(path)?;
    let expected = layout.rows() * layout.cols() * 4;
    if bytes.len() != expected {
        return Err(CliError::GridFile {
            path: path.display().to_string(),
            reason: format!("{} bytes, expected {}", bytes.len(), expected),
        });
    }
    Ok(PackedGrid::from_le_bytes(layout, &bytes)?)
}

/// Write a grid as raw little-endian `f32`.
pub fn save_grid(path: &Path, grid: &PackedGrid) -> CliResult<()> {
    fs::write(path, grid.to_le_bytes())?;
    println!("  {} Wrote {}", "•".dimmed(), path.display().to_string().bright_white());
    Ok(())
}

fn print_summary(label: &str, grid: &PackedGrid) {
    let values = grid.to_values();
    let finite: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let min = finite.iter().copied().fold(f32::INFINITY, f32::min);
    let max = finite.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let sum: f64 = finite.iter().map(|v| *v as f64).sum();
    let non_finite = values.len() - finite.len();

    println!("{}:", label.bright_white().underline());
    if finite.is_empty() {
        println!("  {} every cell is non-finite", "!".yellow());
    } else {
        println!("  min {:>14.6e}  max {:>14.6e}  sum {:>14.6e}", min, max, sum);
    }
    if non_finite > 0 {
        println!(
            "  {} {} non-finite cells",
            "Warning:".yellow(),
            non_finite.to_string().bright_white()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_without_config() {
        let args = RunArgs {
            rows: Some(8),
            cols: Some(32),
            kernel: Some("skew4".to_string()),
            iterations: Some(3),
            ..Default::default()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.kernel, KernelId::Skew4);
        assert_eq!(config.iterations, 3);
        assert_eq!(config.word_bits, 512);
    }

    #[test]
    fn test_missing_dimensions() {
        assert!(matches!(
            resolve_config(&RunArgs::default()),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_config_file_with_overrides() {
        let dir = std::env::temp_dir().join(format!("streamstencil-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.toml");
        fs::write(&path, "rows = 4\ncols = 16\nkernel = \"coupled7\"\niterations = 2\n").unwrap();

        let args = RunArgs {
            config: Some(path),
            rows: Some(6),
            edge_policy: Some("clamp".to_string()),
            ..Default::default()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!((config.rows, config.cols), (6, 16));
        assert_eq!(config.kernel, KernelId::Coupled7);
        assert_eq!(config.iterations, 2);
        assert_eq!(config.edge_policy, EdgePolicy::Clamp);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_companion_flags_rejected_before_run() {
        let dir = std::env::temp_dir().join(format!("streamstencil-flags-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let output = dir.join("out.f32");

        let args = RunArgs {
            rows: Some(4),
            cols: Some(16),
            kernel: Some("sum4".to_string()),
            output: Some(output.clone()),
            companion_output: Some(dir.join("companion.f32")),
            ..Default::default()
        };
        assert!(matches!(execute(&args), Err(CliError::InvalidArgument(_))));
        assert!(!output.exists());

        let coupled = RunArgs {
            kernel: Some("coupled7".to_string()),
            ..args
        };
        assert!(check_grid_args(&coupled, KernelId::Coupled7).is_ok());
        assert!(matches!(
            check_grid_args(&coupled, KernelId::Skew4),
            Err(CliError::InvalidArgument(_))
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_grid_file_roundtrip() {
        let dir = std::env::temp_dir().join(format!("streamstencil-grid-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("grid.f32");

        let layout = GridLayout::with_lanes(2, 4, 4).unwrap();
        let grid = PackedGrid::from_fn(layout, |r, c| r as f32 * 10.0 + c as f32).unwrap();
        save_grid(&path, &grid).unwrap();
        assert_eq!(load_grid(&path, layout).unwrap(), grid);

        let wrong = GridLayout::with_lanes(4, 4, 4).unwrap();
        assert!(matches!(
            load_grid(&path, wrong),
            Err(CliError::GridFile { .. })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
