use serde::Serialize;

use crate::host::{LandscapeGrid, Location, RelativeLocation};
use crate::landscape::Landscape;
use crate::management::{HarvestEvent, HarvestPhase, IdSequence, ManagementArea, Stand, StandId};

/// Harvest totals for one timestep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimestepSummary {
    pub time: i32,
    pub stands_harvested: u32,
    pub area_harvested: f64,
    pub cohorts_damaged: u32,
    pub trees_removed: u64,
    pub repeat_harvests: u32,
}

impl TimestepSummary {
    pub fn from_events(time: i32, events: &[HarvestEvent]) -> Self {
        let mut summary = Self {
            time,
            ..Self::default()
        };
        for event in events {
            summary.stands_harvested += event.stands_harvested;
            summary.area_harvested += event.area_harvested;
            summary.cohorts_damaged += event.cohorts_damaged;
            summary.trees_removed += event.trees_removed;
            if event.phase == HarvestPhase::Additional {
                summary.repeat_harvests += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Default, Clone)]
pub struct BookkeepingState {
    /// Events produced this timestep, not yet logged.
    pub pending: Vec<HarvestEvent>,
    pub events: Vec<HarvestEvent>,
    pub summaries: Vec<TimestepSummary>,
}

#[derive(Debug)]
pub struct World {
    time: i32,
    start_time: i32,
    timestep: i32,
    pub(crate) landscape: Landscape,
    pub(crate) stands: Vec<Stand>,
    pub(crate) areas: Vec<ManagementArea>,
    pub(crate) event_ids: IdSequence,
    pub(crate) bookkeeping: BookkeepingState,
}

impl World {
    pub fn new(landscape: Landscape, start_time: i32, timestep: i32) -> Self {
        Self {
            time: start_time,
            start_time,
            timestep,
            landscape,
            stands: Vec::new(),
            areas: Vec::new(),
            event_ids: IdSequence::new(),
            bookkeeping: BookkeepingState::default(),
        }
    }

    pub fn time(&self) -> i32 {
        self.time
    }

    pub fn start_time(&self) -> i32 {
        self.start_time
    }

    pub fn timestep(&self) -> i32 {
        self.timestep
    }

    pub fn advance_time(&mut self) {
        self.time += self.timestep;
    }

    pub fn landscape(&self) -> &Landscape {
        &self.landscape
    }

    pub fn landscape_mut(&mut self) -> &mut Landscape {
        &mut self.landscape
    }

    pub fn add_management_area(&mut self, area: ManagementArea) -> usize {
        self.areas.push(area);
        self.areas.len() - 1
    }

    pub fn management_areas(&self) -> &[ManagementArea] {
        &self.areas
    }

    pub fn management_area_mut(&mut self, index: usize) -> Option<&mut ManagementArea> {
        self.areas.get_mut(index)
    }

    pub fn add_stand(&mut self, map_code: u32, management_area: u32) -> StandId {
        let id = StandId::new(self.stands.len());
        self.stands.push(Stand::new(id, map_code, management_area));
        id
    }

    pub fn stands(&self) -> &[Stand] {
        &self.stands
    }

    pub fn stand(&self, id: StandId) -> Option<&Stand> {
        self.stands.get(id.index())
    }

    pub fn stand_by_map_code(&self, map_code: u32) -> Option<&Stand> {
        self.stands.iter().find(|s| s.map_code() == map_code)
    }

    /// Adds a cell to a stand and links the stand to the stands already
    /// holding the cells above and to the left.
    pub fn add_site_to_stand(&mut self, site: Location, stand: StandId) {
        let cell_area = self.landscape.cell_area();
        self.stands[stand.index()].add_site(site, cell_area);
        self.landscape.set_stand(site, stand);

        for offset in [RelativeLocation::new(-1, 0), RelativeLocation::new(0, -1)] {
            let Some(neighbor_site) = self.landscape.neighbor(site, offset) else {
                continue;
            };
            let Some(other) = self.landscape.stand_of(neighbor_site) else {
                continue;
            };
            if other == stand {
                continue;
            }
            let same_area = self.stands[other.index()].management_area()
                == self.stands[stand.index()].management_area();
            self.stands[stand.index()].add_neighbor(other, same_area);
            self.stands[other.index()].add_neighbor(stand, same_area);
        }
    }

    /// Sets harvest targets once every stand has its cells.
    pub fn finish_initialization(&mut self) {
        let cell_area = self.landscape.cell_area();
        for area in &mut self.areas {
            area.finish_initialization(&self.stands, cell_area);
        }
    }

    pub fn events(&self) -> &[HarvestEvent] {
        &self.bookkeeping.events
    }

    pub fn summaries(&self) -> &[TimestepSummary] {
        &self.bookkeeping.summaries
    }

    pub fn latest_summary(&self) -> Option<&TimestepSummary> {
        self.bookkeeping
            .summaries
            .last()
            .filter(|summary| summary.time == self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stands_link_to_neighbours_above_and_left() {
        let mut landscape = Landscape::new(2, 2, 1.0);
        for row in 0..2 {
            for col in 0..2 {
                landscape.activate(Location::new(row, col), 0);
            }
        }
        let mut world = World::new(landscape, 0, 10);
        let a = world.add_stand(1, 1);
        let b = world.add_stand(2, 1);
        let c = world.add_stand(3, 2);
        world.add_site_to_stand(Location::new(0, 0), a);
        world.add_site_to_stand(Location::new(0, 1), b);
        world.add_site_to_stand(Location::new(1, 0), a);
        world.add_site_to_stand(Location::new(1, 1), c);

        let stand_a = world.stand(a).unwrap();
        assert_eq!(stand_a.neighbors(), &[b]);
        assert_eq!(stand_a.area_neighbors(), &[c]);
        assert_eq!(world.stand(c).unwrap().area_neighbors(), &[b, a]);
        assert_eq!(stand_a.all_locations().len(), 2);
        assert_eq!(world.landscape().stand_of(Location::new(1, 1)), Some(c));
    }

    #[test]
    fn time_advances_by_timestep() {
        let mut world = World::new(Landscape::new(1, 1, 1.0), 2000, 5);
        world.advance_time();
        world.advance_time();
        assert_eq!(world.time(), 2010);
        assert_eq!(world.start_time(), 2000);
    }
}
