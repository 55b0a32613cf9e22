//! Single and repeated harvest plans.

use tracing::warn;

use crate::cohort::SpeciesId;
use crate::cutting::CohortRemovalAllocator;
use crate::error::ConfigError;

use super::stand::StandId;

/// What one pass of a prescription cuts and what it asks the host to plant.
#[derive(Debug, Clone, PartialEq)]
pub struct CutPlan {
    pub allocator: CohortRemovalAllocator,
    pub plant: Vec<SpeciesId>,
}

/// Which pass of a plan is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestPhase {
    Initial,
    Additional,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HarvestPlan {
    Single(CutPlan),
    /// An initial cut followed, one interval later, by a second cut of the
    /// same cells.
    SingleRepeat {
        initial: CutPlan,
        additional: CutPlan,
        interval: RoundedInterval,
    },
}

impl HarvestPlan {
    pub fn cut_plan(&self, phase: HarvestPhase) -> &CutPlan {
        match (self, phase) {
            (Self::Single(plan), _) => plan,
            (Self::SingleRepeat { initial, .. }, HarvestPhase::Initial) => initial,
            (Self::SingleRepeat { additional, .. }, HarvestPhase::Additional) => additional,
        }
    }

    pub fn repeat_interval(&self) -> Option<i32> {
        match self {
            Self::Single(_) => None,
            Self::SingleRepeat { interval, .. } => Some(interval.adjusted),
        }
    }
}

/// A repeat interval rounded up to a multiple of the harvest timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundedInterval {
    pub original: i32,
    pub adjusted: i32,
}

impl RoundedInterval {
    pub fn new(original: i32, timestep: i32) -> Result<Self, ConfigError> {
        if original <= 0 {
            return Err(ConfigError::NonPositiveInterval(original));
        }
        let adjusted = if timestep > 0 && original % timestep != 0 {
            (original / timestep + 1) * timestep
        } else {
            original
        };
        if adjusted != original {
            warn!(
                original,
                adjusted, timestep, "repeat interval rounded up to a multiple of the timestep"
            );
        }
        Ok(Self { original, adjusted })
    }

    pub fn was_adjusted(&self) -> bool {
        self.original != self.adjusted
    }
}

/// An additional harvest waiting on a management area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRepeat {
    pub time: i32,
    pub stand: StandId,
    /// Index of the applied prescription within its management area.
    pub prescription: usize,
}
