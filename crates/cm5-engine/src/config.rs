//! Simulator configuration, validation, and error types.
//!
//! [`SimulatorOptions`] is the input to
//! [`Simulator::new`](crate::Simulator::new).
//! [`validate()`](SimulatorOptions::validate) checks every structural
//! invariant before anything is allocated or compiled.

use std::error::Error;
use std::fmt;

use cm5_core::{CellSeed, Parameters};
use cm5_shader::Target;

/// Largest supported state capacity, in cells.
pub const MAX_CAPACITY: usize = 1 << 20;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SimulatorOptions::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Capacity is zero or above [`MAX_CAPACITY`].
    InvalidCapacity {
        /// The configured capacity.
        value: usize,
    },
    /// No initial cells were given.
    NoInitialCells,
    /// More initial cells than the capacity can hold.
    TooManyInitialCells {
        /// Number of initial cells.
        count: usize,
        /// Configured capacity.
        capacity: usize,
    },
    /// `dt` is NaN, infinite, zero, or negative.
    InvalidDt {
        /// The invalid value.
        value: f64,
    },
    /// `contact_iterations` is zero.
    NoContactIterations,
    /// `stiffness` is outside `(0, 1]`.
    InvalidStiffness {
        /// The invalid value.
        value: f32,
    },
    /// `target_length` is not finite and positive.
    InvalidTargetLength {
        /// The invalid value.
        value: f32,
    },
    /// `target_spread` is not finite and non-negative.
    InvalidTargetSpread {
        /// The invalid value.
        value: f32,
    },
    /// `growth_rate` is not finite and non-negative.
    InvalidGrowthRate {
        /// The invalid value.
        value: f32,
    },
    /// The palette has no colours.
    EmptyPalette,
    /// An initial cell failed validation.
    InvalidCell {
        /// Index into `initial_cells`.
        index: usize,
        /// Description of the validation failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity { value } => {
                write!(f, "capacity {value} must be in 1..={MAX_CAPACITY}")
            }
            Self::NoInitialCells => write!(f, "at least one initial cell is required"),
            Self::TooManyInitialCells { count, capacity } => {
                write!(f, "{count} initial cells exceed capacity {capacity}")
            }
            Self::InvalidDt { value } => write!(f, "dt must be finite and positive, got {value}"),
            Self::NoContactIterations => write!(f, "contact_iterations must be at least 1"),
            Self::InvalidStiffness { value } => {
                write!(f, "stiffness must be in (0, 1], got {value}")
            }
            Self::InvalidTargetLength { value } => {
                write!(f, "target_length must be finite and positive, got {value}")
            }
            Self::InvalidTargetSpread { value } => {
                write!(f, "target_spread must be finite and non-negative, got {value}")
            }
            Self::InvalidGrowthRate { value } => {
                write!(f, "growth_rate must be finite and non-negative, got {value}")
            }
            Self::EmptyPalette => write!(f, "palette must have at least one colour"),
            Self::InvalidCell { index, reason } => {
                write!(f, "initial cell {index}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

// ── SimulatorOptions ───────────────────────────────────────────────

/// Everything needed to construct a [`Simulator`](crate::Simulator).
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatorOptions {
    /// Maximum number of cells. Fixed for the lifetime of the run.
    /// Default: 4096.
    pub capacity: usize,
    /// Run parameters.
    pub parameters: Parameters,
    /// Cells placed before the first step, in slot order. Default: a
    /// single cell at the origin pointing along +x.
    pub initial_cells: Vec<CellSeed>,
    /// Execution backend. Default: [`Target::Cpu`].
    pub target: Target,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            capacity: 4096,
            parameters: Parameters::default(),
            initial_cells: vec![CellSeed::default()],
            target: Target::Cpu,
        }
    }
}

impl SimulatorOptions {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(ConfigError::InvalidCapacity {
                value: self.capacity,
            });
        }
        if self.initial_cells.is_empty() {
            return Err(ConfigError::NoInitialCells);
        }
        if self.initial_cells.len() > self.capacity {
            return Err(ConfigError::TooManyInitialCells {
                count: self.initial_cells.len(),
                capacity: self.capacity,
            });
        }
        validate_parameters(&self.parameters)?;
        for (index, cell) in self.initial_cells.iter().enumerate() {
            validate_seed(cell, self.parameters.planar)
                .map_err(|reason| ConfigError::InvalidCell { index, reason })?;
        }
        Ok(())
    }
}

/// Check run parameters on their own, as when resuming from a file.
pub fn validate_parameters(p: &Parameters) -> Result<(), ConfigError> {
    if !p.dt.is_finite() || p.dt <= 0.0 {
        return Err(ConfigError::InvalidDt { value: p.dt });
    }
    if p.contact_iterations == 0 {
        return Err(ConfigError::NoContactIterations);
    }
    if !(p.stiffness > 0.0 && p.stiffness <= 1.0) {
        return Err(ConfigError::InvalidStiffness { value: p.stiffness });
    }
    if !p.target_length.is_finite() || p.target_length <= 0.0 {
        return Err(ConfigError::InvalidTargetLength {
            value: p.target_length,
        });
    }
    if !p.target_spread.is_finite() || p.target_spread < 0.0 {
        return Err(ConfigError::InvalidTargetSpread {
            value: p.target_spread,
        });
    }
    if !p.growth_rate.is_finite() || p.growth_rate < 0.0 {
        return Err(ConfigError::InvalidGrowthRate {
            value: p.growth_rate,
        });
    }
    if p.palette.is_empty() {
        return Err(ConfigError::EmptyPalette);
    }
    Ok(())
}

fn validate_seed(cell: &CellSeed, planar: bool) -> Result<(), String> {
    if !cell.position.iter().all(|v| v.is_finite()) {
        return Err("position must be finite".into());
    }
    let z = if planar { 0.0 } else { cell.direction[2] };
    let norm2 = cell.direction[0].powi(2) + cell.direction[1].powi(2) + z * z;
    if !norm2.is_finite() || norm2 <= f32::EPSILON {
        return Err("direction must be finite and non-zero".into());
    }
    if !cell.radius.is_finite() || cell.radius <= 0.0 {
        return Err(format!("radius must be positive, got {}", cell.radius));
    }
    if !cell.length.is_finite() || cell.length < 0.0 {
        return Err(format!("length must be non-negative, got {}", cell.length));
    }
    if let Some(rate) = cell.growth_rate {
        if !rate.is_finite() || rate < 0.0 {
            return Err(format!("growth rate must be non-negative, got {rate}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        SimulatorOptions::default().validate().unwrap();
    }

    #[test]
    fn capacity_bounds() {
        let mut o = SimulatorOptions {
            capacity: 0,
            ..SimulatorOptions::default()
        };
        assert_eq!(o.validate(), Err(ConfigError::InvalidCapacity { value: 0 }));
        o.capacity = MAX_CAPACITY + 1;
        assert!(matches!(o.validate(), Err(ConfigError::InvalidCapacity { .. })));
        o.capacity = 1;
        o.initial_cells = vec![CellSeed::default(); 2];
        assert_eq!(
            o.validate(),
            Err(ConfigError::TooManyInitialCells {
                count: 2,
                capacity: 1
            })
        );
        o.initial_cells.clear();
        assert_eq!(o.validate(), Err(ConfigError::NoInitialCells));
    }

    #[test]
    fn parameter_checks() {
        let bad = |f: fn(&mut Parameters)| {
            let mut p = Parameters::default();
            f(&mut p);
            validate_parameters(&p).unwrap_err()
        };
        assert!(matches!(bad(|p| p.dt = f64::NAN), ConfigError::InvalidDt { .. }));
        assert!(matches!(bad(|p| p.dt = 0.0), ConfigError::InvalidDt { .. }));
        assert_eq!(bad(|p| p.contact_iterations = 0), ConfigError::NoContactIterations);
        assert!(matches!(
            bad(|p| p.stiffness = 1.5),
            ConfigError::InvalidStiffness { .. }
        ));
        assert!(matches!(
            bad(|p| p.target_length = -1.0),
            ConfigError::InvalidTargetLength { .. }
        ));
        assert!(matches!(
            bad(|p| p.target_spread = f32::INFINITY),
            ConfigError::InvalidTargetSpread { .. }
        ));
        assert_eq!(bad(|p| p.palette.clear()), ConfigError::EmptyPalette);
    }

    #[test]
    fn planar_runs_reject_vertical_cells() {
        let o = SimulatorOptions {
            initial_cells: vec![CellSeed {
                direction: [0.0, 0.0, 1.0],
                ..CellSeed::default()
            }],
            ..SimulatorOptions::default()
        };
        assert!(matches!(
            o.validate(),
            Err(ConfigError::InvalidCell { index: 0, .. })
        ));

        let free = SimulatorOptions {
            parameters: Parameters {
                planar: false,
                ..Parameters::default()
            },
            ..o
        };
        free.validate().unwrap();
    }
}
