//! Contracts the harvest engine consumes from the host simulation.
//!
//! The engine only talks to the landscape through these traits, so any
//! succession model that can answer them can be harvested. [`crate::landscape`]
//! provides the in-memory implementation used by the CLI and the tests.

use serde::{Deserialize, Serialize};

use crate::cohort::{Cohort, SpeciesId};

/// Grid cell position (row-major).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: u32,
    pub col: u32,
}

impl Location {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn offset(self, by: RelativeLocation) -> Option<Location> {
        let row = i64::from(self.row) + i64::from(by.row);
        let col = i64::from(self.col) + i64::from(by.col);
        if row < 0 || col < 0 || row > i64::from(u32::MAX) || col > i64::from(u32::MAX) {
            return None;
        }
        Some(Location::new(row as u32, col as u32))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelativeLocation {
    pub row: i32,
    pub col: i32,
}

impl RelativeLocation {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// The eight cells around a site.
pub const MOORE_NEIGHBORHOOD: [RelativeLocation; 8] = [
    RelativeLocation::new(-1, 0),
    RelativeLocation::new(1, 0),
    RelativeLocation::new(0, -1),
    RelativeLocation::new(0, 1),
    RelativeLocation::new(-1, -1),
    RelativeLocation::new(-1, 1),
    RelativeLocation::new(1, -1),
    RelativeLocation::new(1, 1),
];

pub trait LandscapeGrid {
    /// Area of one cell in hectares.
    fn cell_area(&self) -> f64;

    fn is_active(&self, site: Location) -> bool;

    /// The active neighbour at `offset`, if there is one.
    fn neighbor(&self, site: Location, offset: RelativeLocation) -> Option<Location>;
}

pub trait SiteCohorts {
    fn site_cohorts(&self, site: Location) -> Vec<Cohort>;

    /// Removes up to `trees` trees from the cohort and returns how many were
    /// actually removed. A cohort left with no trees is removed entirely.
    fn reduce_or_remove(&mut self, site: Location, cohort: &Cohort, trees: u32) -> u32;

    /// Total live basal area at a site (m²).
    fn site_basal_area(&self, site: Location) -> f64 {
        self.site_cohorts(site).iter().map(|c| c.basal_area).sum()
    }

    fn max_cohort_age(&self, site: Location) -> u16 {
        self.site_cohorts(site)
            .iter()
            .map(|c| c.age)
            .max()
            .unwrap_or(0)
    }
}

/// Per-site state owned by the host.
pub trait SiteVars {
    fn allows_harvest(&self, site: Location) -> bool;

    fn time_since_last_damage(&self, site: Location) -> i32;

    fn clear_cohorts_damaged(&mut self, site: Location);

    /// Called for every site a prescription visits, even when nothing was cut.
    fn record_prescription(&mut self, site: Location, prescription: &str);

    fn record_cohorts_damaged(&mut self, site: Location, damaged: u32, partially_damaged: u32);

    fn schedule_planting(&mut self, site: Location, species: &[SpeciesId]);
}

pub trait Host: LandscapeGrid + SiteCohorts + SiteVars {}

impl<T: LandscapeGrid + SiteCohorts + SiteVars> Host for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_stops_at_the_grid_origin() {
        let origin = Location::new(0, 0);
        assert_eq!(origin.offset(RelativeLocation::new(-1, 0)), None);
        assert_eq!(
            origin.offset(RelativeLocation::new(1, 1)),
            Some(Location::new(1, 1))
        );
    }

    #[test]
    fn moore_neighborhood_has_no_duplicates() {
        for (i, a) in MOORE_NEIGHBORHOOD.iter().enumerate() {
            assert!(a.row != 0 || a.col != 0);
            for b in &MOORE_NEIGHBORHOOD[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

/// In-memory host with explicit basal areas, for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, HashSet};

    use super::*;

    #[derive(Debug, Default)]
    pub struct GridHost {
        rows: u32,
        cols: u32,
        cell_area: f64,
        inactive: HashSet<Location>,
        blocked: HashSet<Location>,
        cohorts: HashMap<Location, Vec<Cohort>>,
        time_since_damage: HashMap<Location, i32>,
        pub prescriptions: HashMap<Location, String>,
        pub damaged: HashMap<Location, (u32, u32)>,
        pub planted: HashMap<Location, Vec<SpeciesId>>,
    }

    impl GridHost {
        pub fn new(rows: u32, cols: u32, cell_area: f64) -> Self {
            Self {
                rows,
                cols,
                cell_area,
                ..Self::default()
            }
        }

        pub fn add_cohort(&mut self, site: Location, cohort: Cohort) {
            self.cohorts.entry(site).or_default().push(cohort);
        }

        pub fn block(&mut self, site: Location) {
            self.blocked.insert(site);
        }

        pub fn deactivate(&mut self, site: Location) {
            self.inactive.insert(site);
        }

        pub fn set_time_since_damage(&mut self, site: Location, years: i32) {
            self.time_since_damage.insert(site, years);
        }

        pub fn trees_at(&self, site: Location) -> u32 {
            self.cohorts
                .get(&site)
                .map_or(0, |cohorts| cohorts.iter().map(|c| c.trees).sum())
        }
    }

    impl LandscapeGrid for GridHost {
        fn cell_area(&self) -> f64 {
            self.cell_area
        }

        fn is_active(&self, site: Location) -> bool {
            site.row < self.rows && site.col < self.cols && !self.inactive.contains(&site)
        }

        fn neighbor(&self, site: Location, offset: RelativeLocation) -> Option<Location> {
            site.offset(offset).filter(|n| self.is_active(*n))
        }
    }

    impl SiteCohorts for GridHost {
        fn site_cohorts(&self, site: Location) -> Vec<Cohort> {
            self.cohorts.get(&site).cloned().unwrap_or_default()
        }

        fn reduce_or_remove(&mut self, site: Location, cohort: &Cohort, trees: u32) -> u32 {
            let Some(cohorts) = self.cohorts.get_mut(&site) else {
                return 0;
            };
            let Some(index) = cohorts
                .iter()
                .position(|c| c.species == cohort.species && c.age == cohort.age)
            else {
                return 0;
            };
            let existing = &mut cohorts[index];
            let removed = trees.min(existing.trees);
            let left = existing.trees - removed;
            existing.basal_area = if existing.trees > 0 {
                existing.basal_area * f64::from(left) / f64::from(existing.trees)
            } else {
                0.0
            };
            existing.trees = left;
            if left == 0 {
                cohorts.remove(index);
            }
            removed
        }
    }

    impl SiteVars for GridHost {
        fn allows_harvest(&self, site: Location) -> bool {
            !self.blocked.contains(&site)
        }

        fn time_since_last_damage(&self, site: Location) -> i32 {
            self.time_since_damage.get(&site).copied().unwrap_or(100)
        }

        fn clear_cohorts_damaged(&mut self, site: Location) {
            self.damaged.remove(&site);
        }

        fn record_prescription(&mut self, site: Location, prescription: &str) {
            self.prescriptions.insert(site, prescription.to_string());
        }

        fn record_cohorts_damaged(&mut self, site: Location, damaged: u32, partially_damaged: u32) {
            self.damaged.insert(site, (damaged, partially_damaged));
        }

        fn schedule_planting(&mut self, site: Location, species: &[SpeciesId]) {
            self.planted
                .entry(site)
                .or_default()
                .extend_from_slice(species);
        }
    }
}
