//! Choosing which cells of a stand get cut.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::error::ConfigError;
use crate::host::{Host, Location, MOORE_NEIGHBORHOOD};
use crate::rng::UniformSource;

use super::stand::Stand;
use super::HarvestContext;

/// Cells chosen for one harvest and their total area (ha).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteSelection {
    pub sites: Vec<Location>,
    pub area_selected: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SiteSelector {
    CompleteStand,
    PatchCutting(PatchCutting),
}

impl SiteSelector {
    /// Selects cells and records the outcome on the stand: harvested with a
    /// new event id when anything was selected, otherwise the prescription is
    /// rejected for this timestep.
    pub fn select_sites(
        &self,
        stand: &mut Stand,
        prescription: &str,
        ctx: &mut HarvestContext<'_>,
    ) -> SiteSelection {
        let selection = match self {
            Self::CompleteStand => SiteSelection {
                sites: stand.site_locations().to_vec(),
                area_selected: stand.active_area(),
            },
            Self::PatchCutting(patches) => patches.grow_patches(stand, &*ctx.host, &mut *ctx.rng),
        };

        if matches!(self, Self::CompleteStand) || selection.area_selected > 0.0 {
            stand.mark_as_harvested(ctx.time);
            stand.set_event_id(ctx.event_ids.next_id());
        } else {
            debug!(
                stand = stand.map_code(),
                prescription, "no cells eligible for patch cutting"
            );
            stand.reject_prescription(prescription);
        }
        selection
    }
}

/// Randomly seeded patches grown over the Moore neighbourhood.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchCutting {
    percent: f64,
    patch_size: f64,
    allow_overlap: bool,
}

impl PatchCutting {
    /// `percent` is a fraction in `[0, 1]`; `patch_size` is in hectares.
    pub fn new(percent: f64, patch_size: f64, allow_overlap: bool) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&percent) {
            return Err(ConfigError::Percentage {
                name: "patch cutting percentage",
                value: percent * 100.0,
            });
        }
        if patch_size < 0.0 || patch_size.is_nan() {
            return Err(ConfigError::NegativePatchSize(patch_size));
        }
        Ok(Self {
            percent,
            patch_size,
            allow_overlap,
        })
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn patch_size(&self) -> f64 {
        self.patch_size
    }

    pub fn allow_overlap(&self) -> bool {
        self.allow_overlap
    }

    pub fn grow_patches(
        &self,
        stand: &Stand,
        host: &dyn Host,
        rng: &mut dyn UniformSource,
    ) -> SiteSelection {
        let cell_area = host.cell_area();
        let sites: Vec<Location> = self
            .patches(stand, host, rng)
            .into_iter()
            .flatten()
            .collect();
        SiteSelection {
            area_selected: sites.len() as f64 * cell_area,
            sites,
        }
    }

    /// Harvested cells grouped by patch, in the order they were cut.
    pub fn patches(
        &self,
        stand: &Stand,
        host: &dyn Host,
        rng: &mut dyn UniformSource,
    ) -> Vec<Vec<Location>> {
        let cell_area = host.cell_area();
        let target = stand.site_count() as f64 * cell_area * self.percent;

        let mut candidates = CandidatePool::new(stand.site_locations());
        let mut to_consider: VecDeque<Location> = VecDeque::new();
        let mut harvested: HashSet<Location> = HashSet::new();
        let mut patches: Vec<Vec<Location>> = Vec::new();
        let mut area_selected = 0.0;

        while area_selected < target {
            let Some(seed) = candidates.take_random(rng) else {
                break;
            };
            to_consider.push_back(seed);

            let mut patch: Vec<Location> = Vec::new();
            let mut patch_area = 0.0;
            while let Some(site) = to_consider.pop_front() {
                for offset in MOORE_NEIGHBORHOOD {
                    let Some(neighbor) = host.neighbor(site, offset) else {
                        continue;
                    };
                    if candidates.remove(neighbor) {
                        to_consider.push_back(neighbor);
                    }
                }

                if host.time_since_last_damage(site) >= stand.min_time_since_damage() {
                    harvested.insert(site);
                    patch.push(site);
                    patch_area += cell_area;
                    area_selected += cell_area;
                }
                if patch_area >= self.patch_size || area_selected >= target {
                    break;
                }
            }

            candidates.extend(to_consider.drain(..));
            if !self.allow_overlap {
                for &site in &patch {
                    for offset in MOORE_NEIGHBORHOOD {
                        if let Some(neighbor) = host.neighbor(site, offset) {
                            if !harvested.contains(&neighbor) {
                                candidates.remove(neighbor);
                            }
                        }
                    }
                }
            }
            if !patch.is_empty() {
                patches.push(patch);
            }
        }
        patches
    }
}

/// Cells that may still seed a patch. Removal by cell is O(1): the slot map
/// tracks each cell's position and removal swaps the last cell into the gap.
struct CandidatePool {
    cells: Vec<Location>,
    slots: HashMap<Location, usize>,
}

impl CandidatePool {
    fn new(sites: &[Location]) -> Self {
        let mut pool = Self {
            cells: Vec::with_capacity(sites.len()),
            slots: HashMap::with_capacity(sites.len()),
        };
        pool.extend(sites.iter().copied());
        pool
    }

    fn extend(&mut self, sites: impl IntoIterator<Item = Location>) {
        for site in sites {
            if !self.slots.contains_key(&site) {
                self.slots.insert(site, self.cells.len());
                self.cells.push(site);
            }
        }
    }

    fn remove(&mut self, site: Location) -> bool {
        let Some(slot) = self.slots.remove(&site) else {
            return false;
        };
        self.cells.swap_remove(slot);
        if let Some(&moved) = self.cells.get(slot) {
            self.slots.insert(moved, slot);
        }
        true
    }

    /// Removes and returns a uniformly chosen cell.
    fn take_random(&mut self, rng: &mut dyn UniformSource) -> Option<Location> {
        if self.cells.is_empty() {
            return None;
        }
        let index = ((rng.next_uniform() * self.cells.len() as f64) as usize).min(self.cells.len() - 1);
        let site = self.cells[index];
        self.remove(site);
        Some(site)
    }
}
