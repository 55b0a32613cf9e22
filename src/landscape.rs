//! In-memory raster landscape implementing the host traits.

use crate::cohort::{stem_basal_area, Cohort, SpeciesId};
use crate::host::{LandscapeGrid, Location, RelativeLocation, SiteCohorts, SiteVars};
use crate::management::StandId;

#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub name: String,
    /// Diameter growth per year (cm).
    pub diameter_growth: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct CohortRecord {
    species: SpeciesId,
    age: u16,
    diameter: f64,
    trees: u32,
}

impl CohortRecord {
    fn view(&self) -> Cohort {
        Cohort {
            species: self.species,
            age: self.age,
            diameter: self.diameter,
            trees: self.trees,
            basal_area: f64::from(self.trees) * stem_basal_area(self.diameter),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Site {
    active: bool,
    allows_harvest: bool,
    cohorts: Vec<CohortRecord>,
    time_since_damage: i32,
    cohorts_damaged: u32,
    cohorts_partially_damaged: u32,
    prescription: Option<String>,
    planted: Vec<SpeciesId>,
    stand: Option<StandId>,
}

#[derive(Debug, Clone)]
pub struct Landscape {
    rows: u32,
    cols: u32,
    cell_area: f64,
    species: Vec<Species>,
    sites: Vec<Site>,
}

impl Landscape {
    /// A grid of inactive cells. `cell_area` is in hectares.
    pub fn new(rows: u32, cols: u32, cell_area: f64) -> Self {
        Self {
            rows,
            cols,
            cell_area,
            species: Vec::new(),
            sites: vec![Site::default(); rows as usize * cols as usize],
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn add_species(&mut self, name: impl Into<String>, diameter_growth: f64) -> SpeciesId {
        let id = SpeciesId::new(self.species.len() as u16);
        self.species.push(Species {
            name: name.into(),
            diameter_growth,
        });
        id
    }

    pub fn species_id(&self, name: &str) -> Option<SpeciesId> {
        self.species
            .iter()
            .position(|s| s.name == name)
            .map(|index| SpeciesId::new(index as u16))
    }

    pub fn species(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id.index())
    }

    /// Makes a cell part of the simulated landscape, open to harvest.
    pub fn activate(&mut self, site: Location, time_since_damage: i32) {
        if let Some(cell) = self.site_mut(site) {
            cell.active = true;
            cell.allows_harvest = true;
            cell.time_since_damage = time_since_damage;
        }
    }

    pub fn add_cohort(
        &mut self,
        site: Location,
        species: SpeciesId,
        age: u16,
        diameter: f64,
        trees: u32,
    ) {
        if let Some(cell) = self.site_mut(site) {
            cell.cohorts.push(CohortRecord {
                species,
                age,
                diameter,
                trees,
            });
        }
    }

    pub fn set_allows_harvest(&mut self, site: Location, allowed: bool) {
        if let Some(cell) = self.site_mut(site) {
            cell.allows_harvest = allowed;
        }
    }

    pub fn active_sites(&self) -> impl Iterator<Item = Location> + '_ {
        (0..self.rows)
            .flat_map(move |row| (0..self.cols).map(move |col| Location::new(row, col)))
            .filter(|&site| self.is_active(site))
    }

    pub fn stand_of(&self, site: Location) -> Option<StandId> {
        self.site(site).and_then(|cell| cell.stand)
    }

    pub fn set_stand(&mut self, site: Location, stand: StandId) {
        if let Some(cell) = self.site_mut(site) {
            cell.stand = Some(stand);
        }
    }

    pub fn last_prescription(&self, site: Location) -> Option<&str> {
        self.site(site).and_then(|cell| cell.prescription.as_deref())
    }

    pub fn cohorts_damaged(&self, site: Location) -> (u32, u32) {
        self.site(site).map_or((0, 0), |cell| {
            (cell.cohorts_damaged, cell.cohorts_partially_damaged)
        })
    }

    pub fn planted(&self, site: Location) -> &[SpeciesId] {
        self.site(site)
            .map(|cell| cell.planted.as_slice())
            .unwrap_or(&[])
    }

    pub fn total_trees(&self) -> u64 {
        self.sites
            .iter()
            .flat_map(|cell| cell.cohorts.iter())
            .map(|c| u64::from(c.trees))
            .sum()
    }

    pub fn total_basal_area(&self) -> f64 {
        self.active_sites()
            .map(|site| self.site_basal_area(site))
            .sum()
    }

    /// Ages every cohort, grows diameters by the species rate and advances
    /// the time since each cell was last disturbed.
    pub fn advance(&mut self, years: i32) {
        let years = years.max(0);
        let age_step = u16::try_from(years).unwrap_or(u16::MAX);
        for cell in self.sites.iter_mut().filter(|cell| cell.active) {
            cell.time_since_damage = cell.time_since_damage.saturating_add(years);
            for cohort in &mut cell.cohorts {
                let growth = self
                    .species
                    .get(cohort.species.index())
                    .map_or(0.0, |s| s.diameter_growth);
                cohort.age = cohort.age.saturating_add(age_step);
                cohort.diameter += growth * f64::from(years);
            }
        }
    }

    fn index(&self, site: Location) -> Option<usize> {
        (site.row < self.rows && site.col < self.cols)
            .then(|| site.row as usize * self.cols as usize + site.col as usize)
    }

    fn site(&self, site: Location) -> Option<&Site> {
        self.index(site).map(|i| &self.sites[i])
    }

    fn site_mut(&mut self, site: Location) -> Option<&mut Site> {
        self.index(site).map(|i| &mut self.sites[i])
    }
}

impl LandscapeGrid for Landscape {
    fn cell_area(&self) -> f64 {
        self.cell_area
    }

    fn is_active(&self, site: Location) -> bool {
        self.site(site).map_or(false, |cell| cell.active)
    }

    fn neighbor(&self, site: Location, offset: RelativeLocation) -> Option<Location> {
        site.offset(offset).filter(|&n| self.is_active(n))
    }
}

impl SiteCohorts for Landscape {
    fn site_cohorts(&self, site: Location) -> Vec<Cohort> {
        self.site(site)
            .map(|cell| cell.cohorts.iter().map(CohortRecord::view).collect())
            .unwrap_or_default()
    }

    fn reduce_or_remove(&mut self, site: Location, cohort: &Cohort, trees: u32) -> u32 {
        let Some(cell) = self.site_mut(site) else {
            return 0;
        };
        let Some(index) = cell
            .cohorts
            .iter()
            .position(|c| {
                c.species == cohort.species && c.age == cohort.age && c.diameter == cohort.diameter
            })
        else {
            return 0;
        };
        let record = &mut cell.cohorts[index];
        let removed = trees.min(record.trees);
        record.trees -= removed;
        if record.trees == 0 {
            cell.cohorts.remove(index);
        }
        removed
    }
}

impl SiteVars for Landscape {
    fn allows_harvest(&self, site: Location) -> bool {
        self.site(site).map_or(false, |cell| cell.allows_harvest)
    }

    fn time_since_last_damage(&self, site: Location) -> i32 {
        self.site(site).map_or(0, |cell| cell.time_since_damage)
    }

    fn clear_cohorts_damaged(&mut self, site: Location) {
        if let Some(cell) = self.site_mut(site) {
            cell.cohorts_damaged = 0;
            cell.cohorts_partially_damaged = 0;
        }
    }

    fn record_prescription(&mut self, site: Location, prescription: &str) {
        if let Some(cell) = self.site_mut(site) {
            cell.prescription = Some(prescription.to_string());
        }
    }

    fn record_cohorts_damaged(&mut self, site: Location, damaged: u32, partially_damaged: u32) {
        if let Some(cell) = self.site_mut(site) {
            cell.cohorts_damaged = damaged;
            cell.cohorts_partially_damaged = partially_damaged;
            cell.time_since_damage = 0;
        }
    }

    fn schedule_planting(&mut self, site: Location, species: &[SpeciesId]) {
        if let Some(cell) = self.site_mut(site) {
            cell.planted.extend_from_slice(species);
        }
    }
}
