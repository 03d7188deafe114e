//! CLI command implementations.

pub mod kernels;
pub mod run;

use streamstencil_core::{EdgePolicy, ExecMode, KernelId};

use crate::error::{CliError, CliResult};

/// Parse a kernel name (`sum4`, `skew4`, `coupled7`, or `a`/`b`/`c`).
pub fn parse_kernel(name: &str) -> CliResult<KernelId> {
    name.parse()
        .map_err(|_| CliError::InvalidArgument(format!("unknown kernel '{}'", name)))
}

/// Parse an edge policy name.
pub fn parse_edge_policy(name: &str) -> CliResult<EdgePolicy> {
    EdgePolicy::parse(name)
        .ok_or_else(|| CliError::InvalidArgument(format!("unknown edge policy '{}'", name)))
}

/// Parse an execution mode name.
pub fn parse_exec_mode(name: &str) -> CliResult<ExecMode> {
    ExecMode::parse(name)
        .ok_or_else(|| CliError::InvalidArgument(format!("unknown exec mode '{}'", name)))
}
