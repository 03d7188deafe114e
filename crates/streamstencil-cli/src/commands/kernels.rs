//! `streamstencil kernels` command - List kernels with their footprints.

use colored::Colorize;
use streamstencil_core::prelude::*;

use crate::error::CliResult;

/// Execute the `kernels` command.
///
/// Buffer sizes are reported for a grid row of `cols` columns packed into
/// words of `lanes` lanes.
pub fn execute(lanes: usize, cols: usize, detailed: bool) -> CliResult<()> {
    let layout = GridLayout::with_lanes(1, cols, lanes)?;

    println!("{}:", "Kernels".bright_white().underline());
    println!(
        "  {} {} lanes per word, {} words per row",
        "•".dimmed(),
        lanes.to_string().bright_yellow(),
        layout.words_per_row().to_string().bright_yellow()
    );
    println!();

    for kernel in KernelId::ALL {
        let stencil = kernel.stencil();
        let arity = if kernel.is_coupled() {
            "two grids".bright_magenta()
        } else {
            "one grid".bright_blue()
        };

        println!("{} {} ({})", "→".bright_cyan(), kernel.to_string().bright_white(), arity);
        println!("    {}", kernel.formula().dimmed());
        println!("    taps:      {}", format_taps(stencil.taps()));
        if kernel.is_coupled() {
            println!("    companion: {}", format_taps(stencil.companion_taps()));
        }

        let reach = stencil.shared_reach();
        println!(
            "    reach:     up {} down {} west {} east {}",
            reach.up, reach.down, reach.west, reach.east
        );
        println!(
            "    buffering: {} words live, latency {} words",
            reach.live_words(&layout).to_string().bright_yellow(),
            reach.lookahead_words(&layout).to_string().bright_yellow()
        );

        if detailed {
            for line in stencil.footprint().describe(&layout).lines() {
                println!("      {}", line.dimmed());
            }
        }
        println!();
    }

    Ok(())
}

fn format_taps(taps: &[Tap]) -> String {
    taps.iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
