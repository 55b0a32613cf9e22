//! Host-owned cohort views.
//!
//! The engine never creates cohorts on the host's behalf. It reads these views,
//! decides how many trees to take from each, and hands the numbers back through
//! [`crate::host::SiteCohorts::reduce_or_remove`].

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(u16);

impl SpeciesId {
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One cohort at one site: trees of a single species sharing an age and a
/// diameter class.
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    pub species: SpeciesId,
    pub age: u16,
    /// Diameter at breast height (cm).
    pub diameter: f64,
    pub trees: u32,
    /// Total basal area of the cohort (m²), computed by the host.
    pub basal_area: f64,
}

impl Cohort {
    /// Basal area of a single tree, or `None` for an empty cohort.
    pub fn per_tree_basal_area(&self) -> Option<f64> {
        if self.trees == 0 {
            None
        } else {
            Some(self.basal_area / self.trees as f64)
        }
    }
}

/// Cross-sectional area (m²) of a stem with the given diameter in centimetres.
pub fn stem_basal_area(diameter_cm: f64) -> f64 {
    let radius_m = diameter_cm.max(0.0) / 200.0;
    PI * radius_m * radius_m
}
