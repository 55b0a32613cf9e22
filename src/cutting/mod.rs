//! Cohort removal at a single site.

mod allocator;
mod counts;

pub use allocator::{
    plan_basal_removals, CohortRemoval, CohortRemovalAllocator, SiteCut, DEFAULT_TREE_REMOVAL,
};
pub use counts::CohortCounts;
