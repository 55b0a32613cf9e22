use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::{
    cohort::SpeciesId,
    cutting::CohortRemovalAllocator,
    error::ConfigError,
    host::Location,
    landscape::Landscape,
    management::{
        AppliedPrescription, BasalAreaRank, CutPlan, HarvestPlan, IdSequence, ManagementArea,
        MaximumAge, PatchCutting, Prescription, RoundedInterval, SiteSelector, StandId,
    },
    selection::{CohortMeasure, RangeListParser, SpeciesSelectors},
    world::World,
};

fn default_timestep() -> i32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_initial_time_since_damage() -> i32 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default)]
    pub start_time: i32,
    #[serde(default = "default_timestep")]
    pub timestep: i32,
    #[serde(default)]
    pub timesteps: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub landscape: LandscapeConfig,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionConfig>,
    #[serde(default)]
    pub management_areas: Vec<ManagementAreaConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Raster inputs. Every map is row-major with one entry per cell; community
/// 0 marks an inactive cell and stand 0 a cell outside any stand.
#[derive(Debug, Clone, Deserialize)]
pub struct LandscapeConfig {
    /// Hectares per cell.
    pub cell_area: f64,
    pub species: Vec<SpeciesConfig>,
    pub communities: Vec<CommunityConfig>,
    pub community_map: Vec<Vec<u32>>,
    pub stand_map: Vec<Vec<u32>>,
    pub management_map: Vec<Vec<u32>>,
    #[serde(default)]
    pub harvest_blocked: Vec<[u32; 2]>,
    #[serde(default = "default_initial_time_since_damage")]
    pub initial_time_since_damage: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    #[serde(default)]
    pub diameter_growth: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommunityConfig {
    pub id: u32,
    #[serde(default)]
    pub cohorts: Vec<CohortConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CohortConfig {
    pub species: String,
    pub age: u16,
    pub diameter: f64,
    pub trees: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionConfig {
    pub name: String,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub site_selection: SiteSelectionConfig,
    #[serde(default)]
    pub min_time_since_damage: i32,
    #[serde(default)]
    pub measure: MeasureConfig,
    /// Species name to cohort list, e.g. `"10-30(A-35.0) 45"`.
    pub cohorts: BTreeMap<String, String>,
    #[serde(default)]
    pub plant: Vec<String>,
    #[serde(default)]
    pub repeat: Option<RepeatConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub method: RankingMethodConfig,
    #[serde(default)]
    pub maximum_age: Option<u16>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMethodConfig {
    #[default]
    BasalArea,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SiteSelectionConfig {
    #[default]
    Complete,
    Patch {
        /// Percent of the stand's area to cut, 0 to 100.
        percent: f64,
        /// Hectares per patch.
        patch_size: f64,
        #[serde(default)]
        allow_overlap: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureConfig {
    #[default]
    Diameter,
    Age,
}

impl From<MeasureConfig> for CohortMeasure {
    fn from(measure: MeasureConfig) -> Self {
        match measure {
            MeasureConfig::Diameter => CohortMeasure::Diameter,
            MeasureConfig::Age => CohortMeasure::Age,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepeatConfig {
    pub interval: i32,
    pub cohorts: BTreeMap<String, String>,
    #[serde(default)]
    pub plant: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManagementAreaConfig {
    pub map_code: u32,
    #[serde(default)]
    pub prescriptions: Vec<AppliedPrescriptionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppliedPrescriptionConfig {
    pub prescription: String,
    /// Percent of the area's land to harvest each timestep, 0 to 100.
    #[serde(default)]
    pub area_percent: f64,
    #[serde(default)]
    pub stands_percent: f64,
    #[serde(default)]
    pub begin: Option<i32>,
    #[serde(default)]
    pub end: Option<i32>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// Validates the scenario and builds the landscape, stands and management
    /// areas with their harvest targets set.
    pub fn build_world(&self) -> Result<World> {
        if self.timestep <= 0 {
            bail!("timestep must be positive, got {}", self.timestep);
        }
        let landscape = self
            .landscape
            .build()
            .with_context(|| format!("Invalid landscape in scenario '{}'", self.name))?;

        let prescriptions = self.build_prescriptions(&landscape)?;

        let mut world = World::new(landscape, self.start_time, self.timestep);
        let mut area_index = HashMap::new();
        for config in &self.management_areas {
            if area_index.contains_key(&config.map_code) {
                return Err(ConfigError::Duplicate {
                    kind: "management area",
                    name: config.map_code.to_string(),
                }
                .into());
            }
            let area = self
                .build_management_area(config, &prescriptions)
                .with_context(|| format!("Invalid management area {}", config.map_code))?;
            area_index.insert(config.map_code, world.add_management_area(area));
        }

        self.assign_stands(&mut world, &mut area_index)?;
        world.finish_initialization();
        debug!(
            scenario = %self.name,
            stands = world.stands().len(),
            management_areas = world.management_areas().len(),
            "world built"
        );
        Ok(world)
    }

    pub fn timesteps(&self, override_timesteps: Option<u64>) -> u64 {
        override_timesteps.or(self.timesteps).unwrap_or(10)
    }

    fn build_prescriptions(&self, landscape: &Landscape) -> Result<HashMap<String, Rc<Prescription>>> {
        let mut numbers = IdSequence::new();
        let mut built = HashMap::new();
        for config in &self.prescriptions {
            if built.contains_key(&config.name) {
                return Err(ConfigError::Duplicate {
                    kind: "prescription",
                    name: config.name.clone(),
                }
                .into());
            }
            let prescription = config
                .build(numbers.next_id(), landscape, self.timestep)
                .with_context(|| format!("Invalid prescription \"{}\"", config.name))?;
            built.insert(config.name.clone(), Rc::new(prescription));
        }
        Ok(built)
    }

    fn build_management_area(
        &self,
        config: &ManagementAreaConfig,
        prescriptions: &HashMap<String, Rc<Prescription>>,
    ) -> Result<ManagementArea, ConfigError> {
        let mut area = ManagementArea::new(config.map_code);
        for applied in &config.prescriptions {
            let prescription = prescriptions
                .get(&applied.prescription)
                .ok_or_else(|| ConfigError::UnknownPrescription(applied.prescription.clone()))?;
            area.add_prescription(AppliedPrescription::new(
                Rc::clone(prescription),
                applied.area_percent / 100.0,
                applied.stands_percent / 100.0,
                applied.begin.unwrap_or(self.start_time),
                applied.end.unwrap_or(i32::MAX),
            )?);
        }
        Ok(area)
    }

    /// Groups active cells into stands. Management areas found only in the
    /// map get an area with no prescriptions.
    fn assign_stands(&self, world: &mut World, area_index: &mut HashMap<u32, usize>) -> Result<()> {
        let config = &self.landscape;
        let mut stand_index: HashMap<u32, StandId> = HashMap::new();
        let sites: Vec<Location> = world.landscape().active_sites().collect();
        for site in sites {
            let (row, col) = (site.row as usize, site.col as usize);
            let stand_code = config.stand_map[row][col];
            if stand_code == 0 {
                continue;
            }
            let area_code = config.management_map[row][col];
            let stand = match stand_index.get(&stand_code).copied() {
                Some(id) => {
                    let existing = world.stands()[id.index()].management_area();
                    if existing != area_code {
                        return Err(ConfigError::Invalid(format!(
                            "stand {stand_code} lies in management areas {existing} and {area_code}"
                        ))
                        .into());
                    }
                    id
                }
                None => {
                    let id = world.add_stand(stand_code, area_code);
                    stand_index.insert(stand_code, id);
                    let index = *area_index
                        .entry(area_code)
                        .or_insert_with(|| world.add_management_area(ManagementArea::new(area_code)));
                    if let Some(area) = world.management_area_mut(index) {
                        area.add_stand(id);
                    }
                    id
                }
            };
            world.add_site_to_stand(site, stand);
        }
        Ok(())
    }
}

impl LandscapeConfig {
    fn build(&self) -> Result<Landscape, ConfigError> {
        let rows = self.community_map.len();
        let cols = self.community_map.first().map_or(0, Vec::len);
        for (name, map) in [
            ("community_map", &self.community_map),
            ("stand_map", &self.stand_map),
            ("management_map", &self.management_map),
        ] {
            if map.len() != rows || map.iter().any(|row| row.len() != cols) {
                return Err(ConfigError::Invalid(format!(
                    "{name} is not a {rows} x {cols} grid"
                )));
            }
        }
        if self.cell_area.is_nan() || self.cell_area <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "cell area must be positive, got {}",
                self.cell_area
            )));
        }

        let mut landscape = Landscape::new(rows as u32, cols as u32, self.cell_area);
        for species in &self.species {
            if landscape.species_id(&species.name).is_some() {
                return Err(ConfigError::Duplicate {
                    kind: "species",
                    name: species.name.clone(),
                });
            }
            landscape.add_species(species.name.clone(), species.diameter_growth);
        }

        let mut communities = HashMap::new();
        for community in &self.communities {
            let mut cohorts = Vec::with_capacity(community.cohorts.len());
            for cohort in &community.cohorts {
                cohorts.push((species_id(&landscape, &cohort.species)?, cohort));
            }
            if communities.insert(community.id, cohorts).is_some() {
                return Err(ConfigError::Duplicate {
                    kind: "community",
                    name: community.id.to_string(),
                });
            }
        }

        for (row, codes) in self.community_map.iter().enumerate() {
            for (col, &code) in codes.iter().enumerate() {
                if code == 0 {
                    continue;
                }
                let cohorts = communities.get(&code).ok_or_else(|| {
                    ConfigError::Invalid(format!("community {code} at ({row}, {col}) is not defined"))
                })?;
                let site = Location::new(row as u32, col as u32);
                landscape.activate(site, self.initial_time_since_damage);
                for &(species, cohort) in cohorts {
                    landscape.add_cohort(site, species, cohort.age, cohort.diameter, cohort.trees);
                }
            }
        }

        for &[row, col] in &self.harvest_blocked {
            landscape.set_allows_harvest(Location::new(row, col), false);
        }
        Ok(landscape)
    }
}

impl PrescriptionConfig {
    fn build(&self, number: u32, landscape: &Landscape, timestep: i32) -> Result<Prescription, ConfigError> {
        let mut ranking = BasalAreaRank::new();
        if let Some(max_age) = self.ranking.maximum_age {
            ranking = ranking.with_requirement(MaximumAge::new(max_age));
        }

        let site_selector = match self.site_selection {
            SiteSelectionConfig::Complete => SiteSelector::CompleteStand,
            SiteSelectionConfig::Patch {
                percent,
                patch_size,
                allow_overlap,
            } => SiteSelector::PatchCutting(PatchCutting::new(
                percent / 100.0,
                patch_size,
                allow_overlap,
            )?),
        };

        let measure = CohortMeasure::from(self.measure);
        let initial = cut_plan(&self.cohorts, &self.plant, measure, landscape)?;
        let plan = match &self.repeat {
            None => HarvestPlan::Single(initial),
            Some(repeat) => HarvestPlan::SingleRepeat {
                initial,
                additional: cut_plan(&repeat.cohorts, &repeat.plant, measure, landscape)?,
                interval: RoundedInterval::new(repeat.interval, timestep)?,
            },
        };

        Ok(Prescription::new(
            number,
            self.name.clone(),
            Box::new(ranking),
            site_selector,
            plan,
            self.min_time_since_damage,
        ))
    }
}

fn species_id(landscape: &Landscape, name: &str) -> Result<SpeciesId, ConfigError> {
    landscape
        .species_id(name)
        .ok_or_else(|| ConfigError::UnknownSpecies(name.to_string()))
}

fn cut_plan(
    cohorts: &BTreeMap<String, String>,
    plant: &[String],
    measure: CohortMeasure,
    landscape: &Landscape,
) -> Result<CutPlan, ConfigError> {
    let mut selectors = SpeciesSelectors::new();
    for (species, text) in cohorts {
        let id = species_id(landscape, species)?;
        let selector = RangeListParser::new(text, measure)
            .parse()
            .map_err(|source| ConfigError::Selection {
                species: species.clone(),
                source,
            })?;
        selectors.insert(id, selector);
    }
    let plant = plant
        .iter()
        .map(|name| species_id(landscape, name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CutPlan {
        allocator: CohortRemovalAllocator::from_selectors(selectors)?,
        plant,
    })
}
