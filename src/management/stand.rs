use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::cutting::CohortCounts;
use crate::host::{Host, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StandId(usize);

impl StandId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A contiguous group of cells managed as one unit.
#[derive(Debug, Clone)]
pub struct Stand {
    id: StandId,
    map_code: u32,
    management_area: u32,
    all_locations: Vec<Location>,
    site_locations: Vec<Location>,
    active_area: f64,
    neighbors: Vec<StandId>,
    area_neighbors: Vec<StandId>,

    harvested: bool,
    set_aside_until: Option<i32>,
    time_last_harvested: Option<i32>,
    age: u16,
    year_age_computed: Option<i32>,

    prescription_name: Option<String>,
    harvested_rank: f64,
    event_id: Option<u32>,
    min_time_since_damage: i32,
    rejected_prescriptions: BTreeSet<String>,
    set_aside_sites: HashMap<String, BTreeSet<Location>>,
    removal_shares: HashMap<Location, f64>,
    damage_table: CohortCounts,

    pub last_area_harvested: f64,
    pub last_stands_harvested: u32,
}

impl Stand {
    pub fn new(id: StandId, map_code: u32, management_area: u32) -> Self {
        Self {
            id,
            map_code,
            management_area,
            all_locations: Vec::new(),
            site_locations: Vec::new(),
            active_area: 0.0,
            neighbors: Vec::new(),
            area_neighbors: Vec::new(),
            harvested: false,
            set_aside_until: None,
            time_last_harvested: None,
            age: 0,
            year_age_computed: None,
            prescription_name: None,
            harvested_rank: 0.0,
            event_id: None,
            min_time_since_damage: 0,
            rejected_prescriptions: BTreeSet::new(),
            set_aside_sites: HashMap::new(),
            removal_shares: HashMap::new(),
            damage_table: CohortCounts::new(),
            last_area_harvested: 0.0,
            last_stands_harvested: 0,
        }
    }

    pub fn id(&self) -> StandId {
        self.id
    }

    pub fn map_code(&self) -> u32 {
        self.map_code
    }

    pub fn management_area(&self) -> u32 {
        self.management_area
    }

    /// Adds a cell at load time. Every cell counts as eligible until the
    /// first [`Stand::initialize_for_harvesting`].
    pub fn add_site(&mut self, site: Location, cell_area: f64) {
        self.all_locations.push(site);
        self.site_locations.push(site);
        self.active_area = self.site_locations.len() as f64 * cell_area;
    }

    pub fn add_neighbor(&mut self, other: StandId, same_management_area: bool) {
        let list = if same_management_area {
            &mut self.neighbors
        } else {
            &mut self.area_neighbors
        };
        if !list.contains(&other) {
            list.push(other);
        }
    }

    pub fn neighbors(&self) -> &[StandId] {
        &self.neighbors
    }

    /// Adjacent stands in other management areas.
    pub fn area_neighbors(&self) -> &[StandId] {
        &self.area_neighbors
    }

    pub fn all_locations(&self) -> &[Location] {
        &self.all_locations
    }

    /// Cells currently open to harvest.
    pub fn site_locations(&self) -> &[Location] {
        &self.site_locations
    }

    pub fn site_count(&self) -> usize {
        self.site_locations.len()
    }

    pub fn active_area(&self) -> f64 {
        self.active_area
    }

    /// Resets per-timestep harvest state and recomputes which cells the host
    /// lets us cut.
    pub fn initialize_for_harvesting(&mut self, host: &mut dyn Host) {
        self.harvested = false;
        self.rejected_prescriptions.clear();
        self.last_area_harvested = 0.0;
        self.last_stands_harvested = 0;

        self.site_locations = self
            .all_locations
            .iter()
            .copied()
            .filter(|&site| host.is_active(site) && host.allows_harvest(site))
            .collect();
        self.active_area = self.site_locations.len() as f64 * host.cell_area();
        for &site in &self.all_locations {
            host.clear_cohorts_damaged(site);
        }
    }

    /// Live basal area per hectare of active area.
    pub fn basal_area(&self, host: &dyn Host) -> f64 {
        if self.active_area <= 0.0 {
            return 0.0;
        }
        let total: f64 = self
            .site_locations
            .iter()
            .map(|&site| host.site_basal_area(site))
            .sum();
        total / self.active_area
    }

    /// Mean of the oldest cohort age over the stand's cells, computed at most
    /// once per year.
    pub fn age(&mut self, host: &dyn Host, time: i32) -> u16 {
        if self.year_age_computed != Some(time) {
            self.age = self.compute_age(host);
            self.year_age_computed = Some(time);
        }
        self.age
    }

    fn compute_age(&self, host: &dyn Host) -> u16 {
        if self.all_locations.is_empty() {
            return 0;
        }
        let total: u64 = self
            .all_locations
            .iter()
            .map(|&site| u64::from(host.max_cohort_age(site)))
            .sum();
        (total / self.all_locations.len() as u64) as u16
    }

    pub fn is_harvested(&self) -> bool {
        self.harvested
    }

    pub fn mark_as_harvested(&mut self, time: i32) {
        self.harvested = true;
        self.time_last_harvested = Some(time);
    }

    pub fn time_last_harvested(&self) -> Option<i32> {
        self.time_last_harvested
    }

    pub fn reject_prescription(&mut self, name: &str) {
        self.rejected_prescriptions.insert(name.to_string());
        self.prescription_name = None;
    }

    pub fn is_rejected(&self, name: &str) -> bool {
        self.rejected_prescriptions.contains(name)
    }

    pub fn set_aside_until(&mut self, year: i32) {
        self.set_aside_until = Some(year);
    }

    pub fn is_set_aside(&self, time: i32) -> bool {
        self.set_aside_until.map_or(false, |until| time <= until)
    }

    pub fn set_site_aside(&mut self, site: Location, prescription: &str) {
        self.set_aside_sites
            .entry(prescription.to_string())
            .or_default()
            .insert(site);
    }

    pub fn is_site_set_aside(&self, site: Location, prescription: &str) -> bool {
        self.set_aside_sites
            .get(prescription)
            .map_or(false, |sites| sites.contains(&site))
    }

    pub fn has_set_aside_sites(&self, prescription: &str) -> bool {
        self.set_aside_sites
            .get(prescription)
            .map_or(false, |sites| !sites.is_empty())
    }

    /// Set-aside cells that are still eligible, in stand order.
    pub fn eligible_set_aside_sites(&self, prescription: &str) -> Vec<Location> {
        self.site_locations
            .iter()
            .copied()
            .filter(|&site| self.is_site_set_aside(site, prescription))
            .collect()
    }

    pub fn clear_set_aside_sites(&mut self, prescription: &str) {
        self.set_aside_sites.remove(prescription);
    }

    /// Records which prescription is working on the stand and resets the
    /// damage table for it.
    pub fn begin_harvest(&mut self, prescription: &str, rank: f64, min_time_since_damage: i32) {
        self.prescription_name = Some(prescription.to_string());
        self.harvested_rank = rank;
        self.min_time_since_damage = min_time_since_damage;
        self.damage_table.reset();
    }

    pub fn prescription_name(&self) -> Option<&str> {
        self.prescription_name.as_deref()
    }

    pub fn harvested_rank(&self) -> f64 {
        self.harvested_rank
    }

    pub fn min_time_since_damage(&self) -> i32 {
        self.min_time_since_damage
    }

    pub fn event_id(&self) -> Option<u32> {
        self.event_id
    }

    pub fn set_event_id(&mut self, id: u32) {
        self.event_id = Some(id);
    }

    pub fn damage_table(&self) -> &CohortCounts {
        &self.damage_table
    }

    pub fn update_damage_table(&mut self, counts: &CohortCounts) {
        self.damage_table.increment_counts(counts);
    }

    /// Splits the removal needed to bring the stand down to `residual` m²/ha
    /// across its eligible cells, in proportion to each cell's basal area.
    pub fn distribute_basal_removal(&mut self, host: &dyn Host, residual: f64) {
        self.removal_shares.clear();
        let cell_area = host.cell_area();
        let site_basal: Vec<(Location, f64)> = self
            .site_locations
            .iter()
            .map(|&site| {
                let basal = if cell_area > 0.0 {
                    host.site_basal_area(site) / cell_area
                } else {
                    0.0
                };
                (site, basal)
            })
            .collect();
        let stand_basal: f64 = site_basal.iter().map(|(_, basal)| basal).sum();
        let removal = (stand_basal - residual).max(0.0);
        if removal <= 0.0 {
            debug!(
                stand = self.map_code,
                stand_basal, residual, "stand already at or below residual basal area"
            );
        }
        for (site, basal) in site_basal {
            let share = if stand_basal > 0.0 {
                basal / stand_basal * removal
            } else {
                0.0
            };
            self.removal_shares.insert(site, share);
        }
    }

    pub fn clear_removal_shares(&mut self) {
        self.removal_shares.clear();
    }

    /// Basal area (m²/ha) to remove at `site`.
    ///
    /// # Panics
    ///
    /// When no share was distributed for `site`.
    pub fn site_removal_share(&self, site: Location) -> f64 {
        match self.removal_shares.get(&site) {
            Some(share) => *share,
            None => panic!(
                "no basal area removal share for {site:?} in stand {}",
                self.map_code
            ),
        }
    }
}
