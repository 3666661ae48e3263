//! The fixed order in which programs run within a step.

use std::fmt;

use cm5_core::ShaderId;
use smallvec::SmallVec;

/// Role of a stage in the step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Volume growth and division flagging.
    Growth,
    /// Splitting flagged cells.
    Division,
    /// Pairwise overlap accumulation.
    Contact,
    /// Applying accumulated contact response.
    Integrate,
}

impl StageKind {
    /// Program that implements this stage.
    pub fn program(self) -> ShaderId {
        ShaderId::new(match self {
            Self::Growth => "growth",
            Self::Division => "division",
            Self::Contact => "contact",
            Self::Integrate => "integrate",
        })
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Growth => write!(f, "growth"),
            Self::Division => write!(f, "division"),
            Self::Contact => write!(f, "contact"),
            Self::Integrate => write!(f, "integrate"),
        }
    }
}

/// One stage: a kind and the program it dispatches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    /// Role of the stage.
    pub kind: StageKind,
    /// Registry id of the program.
    pub program: ShaderId,
}

/// Ordered list of stages run once per step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagePlan {
    stages: SmallVec<[Stage; 10]>,
}

impl StagePlan {
    /// `growth`, `division`, then `contact` and `integrate`
    /// alternating `contact_iterations` times (at least once).
    pub fn standard(contact_iterations: u32) -> Self {
        let mut stages = SmallVec::new();
        stages.push(Stage::of(StageKind::Growth));
        stages.push(Stage::of(StageKind::Division));
        for _ in 0..contact_iterations.max(1) {
            stages.push(Stage::of(StageKind::Contact));
            stages.push(Stage::of(StageKind::Integrate));
        }
        Self { stages }
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of dispatches per step.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the plan has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Distinct programs the plan uses, in first-use order.
    pub fn programs(&self) -> Vec<&ShaderId> {
        let mut out: Vec<&ShaderId> = Vec::new();
        for stage in &self.stages {
            if !out.contains(&&stage.program) {
                out.push(&stage.program);
            }
        }
        out
    }
}

impl Stage {
    fn of(kind: StageKind) -> Self {
        Self {
            kind,
            program: kind.program(),
        }
    }
}
