//! Per-step performance and colony metrics.

/// Timing and colony counters collected during a single step.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step.
    pub total_us: u64,
    /// Per-stage execution times `(program, microseconds)` in plan order.
    /// The GPU executor reports one entry covering the whole submission.
    pub stage_us: Vec<(String, u64)>,
    /// Kernel dispatches issued.
    pub dispatches: u32,
    /// Live cells after the step.
    pub cells: usize,
    /// Divisions performed during the step.
    pub divisions: u32,
}
