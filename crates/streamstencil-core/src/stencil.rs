//! Stencil kernels.
//!
//! A stencil is a pure function from a fixed neighbourhood to one output
//! value. The engine is generic over [`Stencil`]; the three kernels shipped
//! here are separate types and never share a body.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StencilError};
use crate::footprint::{Footprint, Reach, Tap};

/// A fixed-footprint stencil.
///
/// `apply` receives the primary window in `taps()` order and the companion
/// window in `companion_taps()` order. It must be deterministic and free of
/// side effects; non-finite inputs propagate by IEEE-754 rules.
pub trait Stencil: Send + Sync {
    /// Kernel name for logs.
    fn name(&self) -> &'static str;

    /// Offsets read from the primary grid.
    fn taps(&self) -> &'static [Tap];

    /// Offsets read from the companion grid. Empty for single-grid kernels.
    fn companion_taps(&self) -> &'static [Tap] {
        &[]
    }

    /// Evaluate one output cell.
    fn apply(&self, primary: &[f32], companion: &[f32]) -> f32;

    /// Whether the kernel reads a companion grid.
    fn is_coupled(&self) -> bool {
        !self.companion_taps().is_empty()
    }

    /// Footprint on the primary grid.
    fn footprint(&self) -> Footprint {
        Footprint::new(self.taps())
    }

    /// Footprint on the companion grid.
    fn companion_footprint(&self) -> Footprint {
        Footprint::new(self.companion_taps())
    }

    /// Reach shared by every stream of the kernel.
    fn shared_reach(&self) -> Reach {
        Reach::of(self.taps()).union(Reach::of(self.companion_taps()))
    }
}

/// Kernel A: unweighted four-point sum of centre, north, south and west.
pub fn sum4(center: f32, north: f32, south: f32, west: f32) -> f32 {
    center + north + south + west
}

/// Kernel B: `west2 * (east + center) + above`.
///
/// `above` is the cell one row up.
pub fn skew4(east: f32, center: f32, west2: f32, above: f32) -> f32 {
    west2 * (east + center) + above
}

/// Kernel C: two-grid coupled seven-point stencil.
///
/// `cross_below` and `cross_above` come from the companion grid, one row
/// down and one row up from the centre.
pub fn coupled7(
    east: f32,
    center: f32,
    west2: f32,
    above: f32,
    west: f32,
    cross_below: f32,
    cross_above: f32,
) -> f32 {
    west * (east + center) + west2 + above + cross_below + cross_above
}

/// Kernel A as a [`Stencil`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sum4;

const SUM4_TAPS: [Tap; 4] = [Tap::CENTER, Tap::new(-1, 0), Tap::new(1, 0), Tap::new(0, -1)];

impl Stencil for Sum4 {
    fn name(&self) -> &'static str {
        "sum4"
    }

    fn taps(&self) -> &'static [Tap] {
        &SUM4_TAPS
    }

    #[inline]
    fn apply(&self, p: &[f32], _companion: &[f32]) -> f32 {
        sum4(p[0], p[1], p[2], p[3])
    }
}

/// Kernel B as a [`Stencil`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Skew4;

const SKEW4_TAPS: [Tap; 4] = [Tap::new(0, 1), Tap::CENTER, Tap::new(0, -2), Tap::new(-1, 0)];

impl Stencil for Skew4 {
    fn name(&self) -> &'static str {
        "skew4"
    }

    fn taps(&self) -> &'static [Tap] {
        &SKEW4_TAPS
    }

    #[inline]
    fn apply(&self, p: &[f32], _companion: &[f32]) -> f32 {
        skew4(p[0], p[1], p[2], p[3])
    }
}

/// Kernel C as a [`Stencil`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coupled7;

const COUPLED7_TAPS: [Tap; 5] = [
    Tap::new(0, 1),
    Tap::CENTER,
    Tap::new(0, -2),
    Tap::new(-1, 0),
    Tap::new(0, -1),
];

const COUPLED7_COMPANION_TAPS: [Tap; 2] = [Tap::new(1, 0), Tap::new(-1, 0)];

impl Stencil for Coupled7 {
    fn name(&self) -> &'static str {
        "coupled7"
    }

    fn taps(&self) -> &'static [Tap] {
        &COUPLED7_TAPS
    }

    fn companion_taps(&self) -> &'static [Tap] {
        &COUPLED7_COMPANION_TAPS
    }

    #[inline]
    fn apply(&self, p: &[f32], c: &[f32]) -> f32 {
        coupled7(p[0], p[1], p[2], p[3], p[4], c[0], c[1])
    }
}

/// Kernel selector used by configuration and the entry contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelId {
    /// Kernel A.
    #[default]
    Sum4,
    /// Kernel B.
    Skew4,
    /// Kernel C.
    Coupled7,
}

impl KernelId {
    /// Every kernel, in catalogue order.
    pub const ALL: [KernelId; 3] = [KernelId::Sum4, KernelId::Skew4, KernelId::Coupled7];

    /// The kernel implementation.
    pub fn stencil(self) -> &'static dyn Stencil {
        match self {
            KernelId::Sum4 => &Sum4,
            KernelId::Skew4 => &Skew4,
            KernelId::Coupled7 => &Coupled7,
        }
    }

    /// Whether the kernel needs a companion grid.
    pub fn is_coupled(self) -> bool {
        self.stencil().is_coupled()
    }

    /// Formula, for listings.
    pub fn formula(self) -> &'static str {
        match self {
            KernelId::Sum4 => "x(0,0) + x(-1,0) + x(1,0) + x(0,-1)",
            KernelId::Skew4 => "x(0,-2) * (x(0,1) + x(0,0)) + x(-1,0)",
            KernelId::Coupled7 => {
                "x(0,-1) * (x(0,1) + x(0,0)) + x(0,-2) + x(-1,0) + z(1,0) + z(-1,0)"
            }
        }
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stencil().name())
    }
}

impl FromStr for KernelId {
    type Err = StencilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sum4" | "a" => Ok(KernelId::Sum4),
            "skew4" | "b" => Ok(KernelId::Skew4),
            "coupled7" | "c" => Ok(KernelId::Coupled7),
            other => Err(StencilError::config(format!("unknown kernel '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_formulas() {
        assert_eq!(sum4(5.0, 1.0, 9.0, 4.0), 19.0);
        assert_eq!(skew4(1.0, 2.0, 3.0, 4.0), 3.0 * 3.0 + 4.0);
        assert_eq!(
            coupled7(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0),
            5.0 * 3.0 + 3.0 + 4.0 + 6.0 + 7.0
        );
    }

    #[test]
    fn test_stencil_apply_matches_functions() {
        let p = [1.5, -2.0, 0.25, 8.0, 3.0];
        let c = [0.5, -0.5];
        assert_eq!(Sum4.apply(&p[..4], &[]), sum4(1.5, -2.0, 0.25, 8.0));
        assert_eq!(Skew4.apply(&p[..4], &[]), skew4(1.5, -2.0, 0.25, 8.0));
        assert_eq!(
            Coupled7.apply(&p, &c),
            coupled7(1.5, -2.0, 0.25, 8.0, 3.0, 0.5, -0.5)
        );
    }

    #[test]
    fn test_non_finite_propagates() {
        assert!(sum4(f32::NAN, 0.0, 0.0, 0.0).is_nan());
        assert_eq!(skew4(f32::INFINITY, 0.0, 1.0, 0.0), f32::INFINITY);
        assert!(skew4(f32::INFINITY, 0.0, 0.0, 0.0).is_nan());
    }

    #[test]
    fn test_kernel_shapes() {
        assert!(!Sum4.is_coupled());
        assert!(!Skew4.is_coupled());
        assert!(Coupled7.is_coupled());
        assert_eq!(Coupled7.taps().len(), 5);

        let reach = Coupled7.shared_reach();
        assert_eq!((reach.up, reach.down, reach.west, reach.east), (1, 1, 2, 1));
        assert_eq!(Sum4.shared_reach().east, 0);
    }

    #[test]
    fn test_kernel_id_parsing() {
        assert_eq!("sum4".parse::<KernelId>().unwrap(), KernelId::Sum4);
        assert_eq!("B".parse::<KernelId>().unwrap(), KernelId::Skew4);
        assert_eq!("Coupled7".parse::<KernelId>().unwrap(), KernelId::Coupled7);
        assert!("laplace".parse::<KernelId>().is_err());
        assert_eq!(KernelId::Skew4.to_string(), "skew4");
        assert!(KernelId::Coupled7.is_coupled());
    }
}
