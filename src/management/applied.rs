use std::rc::Rc;

use tracing::debug;

use crate::error::ConfigError;
use crate::host::Host;

use super::prescription::{HarvestEvent, Prescription};
use super::ranking::{sort_descending, StandRanking};
use super::repeat::HarvestPhase;
use super::stand::{Stand, StandId};
use super::HarvestContext;

/// A prescription as applied to one management area, with its harvest
/// targets and the ranked stand list it works through.
#[derive(Debug)]
pub struct AppliedPrescription {
    prescription: Rc<Prescription>,
    area_percent: f64,
    stands_percent: f64,
    begin_time: i32,
    end_time: i32,

    area_to_harvest: f64,
    area_remaining: f64,
    area_remaining_ratio: f64,
    area_harvested: f64,

    stands_to_harvest: u32,
    stands_remaining: u32,
    stands_remaining_ratio: f64,
    stands_harvested: u32,

    rankings: Vec<StandRanking>,
    highest_unharvested_stand: usize,
    harvest_time: i32,
}

impl AppliedPrescription {
    /// Percentages are fractions in `[0, 1]`. The prescription is active for
    /// times in `[begin_time, end_time)`.
    pub fn new(
        prescription: Rc<Prescription>,
        area_percent: f64,
        stands_percent: f64,
        begin_time: i32,
        end_time: i32,
    ) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("area percentage", area_percent),
            ("stand percentage", stands_percent),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Percentage {
                    name,
                    value: value * 100.0,
                });
            }
        }
        if begin_time > end_time {
            return Err(ConfigError::Invalid(format!(
                "prescription \"{}\" begins at {begin_time} after it ends at {end_time}",
                prescription.name()
            )));
        }
        Ok(Self {
            prescription,
            area_percent,
            stands_percent,
            begin_time,
            end_time,
            area_to_harvest: 0.0,
            area_remaining: 0.0,
            area_remaining_ratio: 0.0,
            area_harvested: 0.0,
            stands_to_harvest: 0,
            stands_remaining: 0,
            stands_remaining_ratio: 0.0,
            stands_harvested: 0,
            rankings: Vec::new(),
            highest_unharvested_stand: 0,
            harvest_time: begin_time,
        })
    }

    pub fn prescription(&self) -> &Rc<Prescription> {
        &self.prescription
    }

    pub fn is_active(&self, time: i32) -> bool {
        self.begin_time <= time && time < self.end_time
    }

    /// Sets the targets once the management area's size is known.
    pub fn finish_initialization(&mut self, stand_count: usize, area: f64) {
        self.area_to_harvest = area * self.area_percent;
        self.stands_to_harvest = (stand_count as f64 * self.stands_percent) as u32;
    }

    /// Resets the counters and ranks the stands for this timestep.
    pub fn initialize_for_harvest(
        &mut self,
        stand_ids: &[StandId],
        stands: &mut [Stand],
        host: &dyn Host,
        time: i32,
    ) {
        self.harvest_time = time;
        self.area_remaining = self.area_to_harvest;
        self.area_remaining_ratio = 1.0;
        self.area_harvested = 0.0;

        self.rankings = self
            .prescription
            .ranking()
            .rank_stands(stand_ids, stands, host, time);
        sort_descending(&mut self.rankings);

        let ranked = self.rankings.iter().filter(|r| r.rank != 0.0).count();
        self.stands_to_harvest = (ranked as f64 * self.stands_percent).round_ties_even() as u32;
        self.stands_remaining = self.stands_to_harvest;
        self.stands_remaining_ratio = 1.0;
        self.stands_harvested = 0;
        self.highest_unharvested_stand = 0;
        debug!(
            prescription = self.prescription.name(),
            ranked,
            area_to_harvest = self.area_to_harvest,
            stands_to_harvest = self.stands_to_harvest,
            "ranked stands"
        );
    }

    /// Moves the cursor past stands that cannot take this prescription and
    /// reports whether the stand it stops on is worth harvesting.
    pub fn any_unharvested_stands_ranked_above_0(&mut self, stands: &[Stand]) -> bool {
        let name = self.prescription.name();
        while let Some(ranking) = self.rankings.get(self.highest_unharvested_stand) {
            if ranking.rank <= 0.0 {
                return false;
            }
            let stand = &stands[ranking.stand.index()];
            if stand.is_harvested()
                || stand.is_set_aside(self.harvest_time)
                || stand.is_rejected(name)
            {
                self.highest_unharvested_stand += 1;
                continue;
            }
            return true;
        }
        false
    }

    /// Harvests the stand at the cursor.
    ///
    /// Returns `None` when that stand is ranked at or below zero or is set
    /// aside.
    ///
    /// # Panics
    ///
    /// When the cursor is past the end of the rankings.
    pub fn harvest_highest_ranked_stand(
        &mut self,
        stands: &mut [Stand],
        ctx: &mut HarvestContext<'_>,
    ) -> Option<HarvestEvent> {
        assert!(
            self.highest_unharvested_stand < self.rankings.len(),
            "stand cursor {} is past the {} ranked stands",
            self.highest_unharvested_stand,
            self.rankings.len()
        );
        let ranking = self.rankings[self.highest_unharvested_stand];
        if ranking.rank <= 0.0 {
            return None;
        }
        let stand = &mut stands[ranking.stand.index()];
        if stand.is_set_aside(ctx.time) {
            return None;
        }

        let event = self
            .prescription
            .harvest(stand, HarvestPhase::Initial, ranking.rank, ctx);
        self.record_harvest(event.area_harvested, event.stands_harvested);
        Some(event)
    }

    fn record_harvest(&mut self, area: f64, stands: u32) {
        self.area_harvested += area;
        self.area_remaining = (self.area_remaining - area).max(0.0);
        self.area_remaining_ratio = if self.area_to_harvest > 0.0 {
            self.area_remaining / self.area_to_harvest
        } else {
            0.0
        };

        self.stands_harvested += stands;
        self.stands_remaining = self.stands_remaining.saturating_sub(stands);
        self.stands_remaining_ratio = if self.stands_to_harvest > 0 {
            f64::from(self.stands_remaining) / f64::from(self.stands_to_harvest)
        } else {
            0.0
        };
    }

    /// True while the area target, or the stand target when there is no area
    /// target, still has something left.
    pub fn has_unmet_target(&self) -> bool {
        if self.area_to_harvest > 0.0 {
            self.area_remaining > 0.0
        } else if self.stands_to_harvest > 0 {
            self.stands_remaining > 0
        } else {
            false
        }
    }

    pub fn area_percent(&self) -> f64 {
        self.area_percent
    }

    pub fn stands_percent(&self) -> f64 {
        self.stands_percent
    }

    pub fn area_to_harvest(&self) -> f64 {
        self.area_to_harvest
    }

    pub fn area_remaining(&self) -> f64 {
        self.area_remaining
    }

    pub fn area_remaining_ratio(&self) -> f64 {
        self.area_remaining_ratio
    }

    pub fn area_harvested(&self) -> f64 {
        self.area_harvested
    }

    pub fn stands_to_harvest(&self) -> u32 {
        self.stands_to_harvest
    }

    pub fn stands_remaining(&self) -> u32 {
        self.stands_remaining
    }

    pub fn stands_remaining_ratio(&self) -> f64 {
        self.stands_remaining_ratio
    }

    pub fn stands_harvested(&self) -> u32 {
        self.stands_harvested
    }

    pub fn rankings(&self) -> &[StandRanking] {
        &self.rankings
    }

    pub fn highest_unharvested_stand(&self) -> usize {
        self.highest_unharvested_stand
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::{Cohort, SpeciesId};
    use crate::cutting::CohortRemovalAllocator;
    use crate::host::testing::GridHost;
    use crate::host::Location;
    use crate::management::ids::IdSequence;
    use crate::management::ranking::BasalAreaRank;
    use crate::management::repeat::{CutPlan, HarvestPlan};
    use crate::management::site_selection::SiteSelector;
    use crate::selection::{CohortMeasure, RangeListParser, SpeciesSelectors};

    struct Fixed;

    impl crate::rng::UniformSource for Fixed {
        fn next_uniform(&mut self) -> f64 {
            0.5
        }
    }

    fn clearcut() -> Rc<Prescription> {
        let mut selectors = SpeciesSelectors::new();
        selectors.insert(
            SpeciesId::new(0),
            RangeListParser::new("0-200", CohortMeasure::Diameter)
                .parse()
                .unwrap(),
        );
        Rc::new(Prescription::new(
            1,
            "clearcut",
            Box::new(BasalAreaRank::new()),
            SiteSelector::CompleteStand,
            HarvestPlan::Single(CutPlan {
                allocator: CohortRemovalAllocator::from_selectors(selectors).unwrap(),
                plant: Vec::new(),
            }),
            0,
        ))
    }

    /// One single-cell stand per entry of `basal_areas`, on a 1 ha grid row.
    fn landscape(basal_areas: &[f64]) -> (GridHost, Vec<Stand>, Vec<StandId>) {
        let mut host = GridHost::new(1, basal_areas.len() as u32, 1.0);
        let mut stands = Vec::new();
        for (i, basal) in basal_areas.iter().enumerate() {
            let site = Location::new(0, i as u32);
            if *basal > 0.0 {
                host.add_cohort(
                    site,
                    Cohort {
                        species: SpeciesId::new(0),
                        age: 50,
                        diameter: 30.0,
                        trees: 10,
                        basal_area: *basal,
                    },
                );
            }
            let mut stand = Stand::new(StandId::new(i), i as u32 + 1, 1);
            stand.add_site(site, 1.0);
            stands.push(stand);
        }
        let ids = stands.iter().map(|s| s.id()).collect();
        (host, stands, ids)
    }

    #[test]
    fn stand_target_is_truncated_then_rounded_over_ranked_stands() {
        let (host, mut stands, ids) = landscape(&[5.0, 0.0, 8.0, 3.0, 0.0, 7.0]);
        let mut applied = AppliedPrescription::new(clearcut(), 0.0, 0.5, 0, 100).unwrap();
        applied.finish_initialization(5, 5.0);
        assert_eq!(applied.stands_to_harvest(), 2);

        applied.initialize_for_harvest(&ids, &mut stands, &host, 10);
        // Four stands rank above zero: round(4 * 0.5) = 2.
        assert_eq!(applied.stands_to_harvest(), 2);
        assert_eq!(applied.stands_remaining(), 2);
        let order: Vec<usize> = applied.rankings().iter().map(|r| r.stand.index()).collect();
        assert_eq!(order, vec![2, 5, 0, 3, 1, 4]);
    }

    #[test]
    fn stand_target_ties_round_to_even() {
        let (host, mut stands, ids) = landscape(&[4.0]);
        let mut applied = AppliedPrescription::new(clearcut(), 0.0, 0.5, 0, 100).unwrap();
        applied.initialize_for_harvest(&ids, &mut stands, &host, 10);
        assert_eq!(applied.stands_to_harvest(), 0);
        assert!(!applied.has_unmet_target());

        let (host, mut stands, ids) = landscape(&[4.0, 6.0, 2.0, 9.0, 1.0]);
        let mut applied = AppliedPrescription::new(clearcut(), 0.0, 0.5, 0, 100).unwrap();
        applied.initialize_for_harvest(&ids, &mut stands, &host, 10);
        assert_eq!(applied.stands_to_harvest(), 2);

        let (host, mut stands, ids) = landscape(&[4.0, 6.0, 2.0]);
        let mut applied = AppliedPrescription::new(clearcut(), 0.0, 0.5, 0, 100).unwrap();
        applied.initialize_for_harvest(&ids, &mut stands, &host, 10);
        assert_eq!(applied.stands_to_harvest(), 2);
    }

    #[test]
    fn initialization_is_idempotent() {
        let (host, mut stands, ids) = landscape(&[5.0, 2.0, 9.0]);
        let mut applied = AppliedPrescription::new(clearcut(), 0.5, 0.0, 0, 100).unwrap();
        applied.finish_initialization(ids.len(), 3.0);

        applied.initialize_for_harvest(&ids, &mut stands, &host, 10);
        let first = (
            applied.area_remaining(),
            applied.stands_to_harvest(),
            applied.rankings().to_vec(),
        );
        applied.initialize_for_harvest(&ids, &mut stands, &host, 10);
        let second = (
            applied.area_remaining(),
            applied.stands_to_harvest(),
            applied.rankings().to_vec(),
        );
        assert_eq!(first, second);
        assert_eq!(applied.area_remaining_ratio(), 1.0);
        assert_eq!(applied.highest_unharvested_stand(), 0);
    }

    #[test]
    fn harvests_in_rank_order_and_floors_counters() {
        let (mut host, mut stands, ids) = landscape(&[5.0, 2.0, 9.0]);
        let mut applied = AppliedPrescription::new(clearcut(), 0.5, 0.0, 0, 100).unwrap();
        applied.finish_initialization(ids.len(), 3.0);
        applied.initialize_for_harvest(&ids, &mut stands, &host, 10);
        assert_eq!(applied.area_to_harvest(), 1.5);

        let mut rng = Fixed;
        let mut event_ids = IdSequence::new();
        let mut ctx = HarvestContext {
            host: &mut host,
            rng: &mut rng,
            event_ids: &mut event_ids,
            time: 10,
        };
        let mut harvested = Vec::new();
        while applied.has_unmet_target() && applied.any_unharvested_stands_ranked_above_0(&stands)
        {
            let event = applied
                .harvest_highest_ranked_stand(&mut stands, &mut ctx)
                .unwrap();
            harvested.push(event.stand.index());
        }
        assert_eq!(harvested, vec![2, 0]);
        assert_eq!(applied.area_remaining(), 0.0);
        assert_eq!(applied.area_harvested(), 2.0);
        assert_eq!(applied.stands_remaining(), 0);
    }

    #[test]
    fn cursor_skips_rejected_and_set_aside_stands() {
        let (host, mut stands, ids) = landscape(&[5.0, 2.0, 9.0]);
        let mut applied = AppliedPrescription::new(clearcut(), 1.0, 0.0, 0, 100).unwrap();
        applied.finish_initialization(ids.len(), 3.0);
        applied.initialize_for_harvest(&ids, &mut stands, &host, 10);

        stands[2].set_aside_until(10);
        stands[0].reject_prescription("clearcut");
        assert!(applied.any_unharvested_stands_ranked_above_0(&stands));
        assert_eq!(applied.highest_unharvested_stand(), 2);

        stands[1].mark_as_harvested(10);
        assert!(!applied.any_unharvested_stands_ranked_above_0(&stands));
    }

    #[test]
    #[should_panic(expected = "past the")]
    fn harvesting_past_the_rankings_panics() {
        let (mut host, mut stands, ids) = landscape(&[5.0]);
        let mut applied = AppliedPrescription::new(clearcut(), 1.0, 0.0, 0, 100).unwrap();
        applied.finish_initialization(ids.len(), 1.0);
        applied.initialize_for_harvest(&ids, &mut stands, &host, 10);
        stands[0].mark_as_harvested(10);
        assert!(!applied.any_unharvested_stands_ranked_above_0(&stands));

        let mut rng = Fixed;
        let mut event_ids = IdSequence::new();
        let mut ctx = HarvestContext {
            host: &mut host,
            rng: &mut rng,
            event_ids: &mut event_ids,
            time: 10,
        };
        applied.harvest_highest_ranked_stand(&mut stands, &mut ctx);
    }

    #[test]
    fn window_is_half_open() {
        let applied = AppliedPrescription::new(clearcut(), 0.1, 0.0, 10, 30).unwrap();
        assert!(!applied.is_active(9));
        assert!(applied.is_active(10));
        assert!(applied.is_active(29));
        assert!(!applied.is_active(30));
    }

    #[test]
    fn percentages_are_validated() {
        assert!(AppliedPrescription::new(clearcut(), 1.2, 0.0, 0, 10).is_err());
        assert!(AppliedPrescription::new(clearcut(), 0.2, -0.1, 0, 10).is_err());
    }
}
