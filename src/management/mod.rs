//! Stands, management areas and the prescriptions that harvest them.

mod applied;
mod area;
mod ids;
mod prescription;
mod ranking;
mod repeat;
mod site_selection;
mod stand;

pub use applied::AppliedPrescription;
pub use area::ManagementArea;
pub use ids::IdSequence;
pub use prescription::{HarvestEvent, Prescription};
pub use ranking::{
    sort_descending, BasalAreaRank, MaximumAge, Requirement, StandRanking, StandRankingMethod,
};
pub use repeat::{CutPlan, HarvestPhase, HarvestPlan, RoundedInterval, ScheduledRepeat};
pub use site_selection::{PatchCutting, SiteSelection, SiteSelector};
pub use stand::{Stand, StandId};

use crate::host::Host;
use crate::rng::UniformSource;

/// Everything a harvest needs besides the stands themselves.
pub struct HarvestContext<'a> {
    pub host: &'a mut dyn Host,
    pub rng: &'a mut dyn UniformSource,
    pub event_ids: &'a mut IdSequence,
    pub time: i32,
}
