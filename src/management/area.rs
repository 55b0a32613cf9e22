use std::rc::Rc;

use tracing::{debug, info};

use super::applied::AppliedPrescription;
use super::prescription::HarvestEvent;
use super::repeat::{HarvestPhase, ScheduledRepeat};
use super::stand::{Stand, StandId};
use super::HarvestContext;

/// A group of stands sharing one ordered list of prescriptions.
#[derive(Debug)]
pub struct ManagementArea {
    map_code: u32,
    stands: Vec<StandId>,
    prescriptions: Vec<AppliedPrescription>,
    scheduled_repeats: Vec<ScheduledRepeat>,
}

impl ManagementArea {
    pub fn new(map_code: u32) -> Self {
        Self {
            map_code,
            stands: Vec::new(),
            prescriptions: Vec::new(),
            scheduled_repeats: Vec::new(),
        }
    }

    pub fn map_code(&self) -> u32 {
        self.map_code
    }

    pub fn add_stand(&mut self, stand: StandId) {
        if !self.stands.contains(&stand) {
            self.stands.push(stand);
        }
    }

    pub fn stands(&self) -> &[StandId] {
        &self.stands
    }

    pub fn add_prescription(&mut self, applied: AppliedPrescription) {
        self.prescriptions.push(applied);
    }

    pub fn prescriptions(&self) -> &[AppliedPrescription] {
        &self.prescriptions
    }

    pub fn scheduled_repeats(&self) -> &[ScheduledRepeat] {
        &self.scheduled_repeats
    }

    /// Sets every applied prescription's targets from the area's size.
    pub fn finish_initialization(&mut self, stands: &[Stand], cell_area: f64) {
        let cells: usize = self
            .stands
            .iter()
            .map(|id| stands[id.index()].all_locations().len())
            .sum();
        let area = cells as f64 * cell_area;
        for applied in &mut self.prescriptions {
            applied.finish_initialization(self.stands.len(), area);
        }
    }

    /// Runs one harvest timestep over this area's stands.
    pub fn harvest(
        &mut self,
        stands: &mut [Stand],
        ctx: &mut HarvestContext<'_>,
    ) -> Vec<HarvestEvent> {
        for &id in &self.stands {
            stands[id.index()].initialize_for_harvesting(&mut *ctx.host);
        }

        let mut events = self.harvest_scheduled_repeats(stands, ctx);

        for index in 0..self.prescriptions.len() {
            let applied = &mut self.prescriptions[index];
            if !applied.is_active(ctx.time) {
                continue;
            }
            applied.initialize_for_harvest(&self.stands, stands, &*ctx.host, ctx.time);
            while applied.has_unmet_target() && applied.any_unharvested_stands_ranked_above_0(stands)
            {
                let Some(event) = applied.harvest_highest_ranked_stand(stands, ctx) else {
                    break;
                };
                if let Some(until) = event.set_aside_until {
                    self.scheduled_repeats.push(ScheduledRepeat {
                        time: until,
                        stand: event.stand,
                        prescription: index,
                    });
                }
                events.push(event);
            }
            debug!(
                management_area = self.map_code,
                prescription = applied.prescription().name(),
                number = applied.prescription().number(),
                area_harvested = applied.area_harvested(),
                stands_harvested = applied.stands_harvested(),
                "prescription applied"
            );
        }

        if !events.is_empty() {
            info!(
                management_area = self.map_code,
                time = ctx.time,
                stands = events.len(),
                "harvested stands"
            );
        }
        events
    }

    fn harvest_scheduled_repeats(
        &mut self,
        stands: &mut [Stand],
        ctx: &mut HarvestContext<'_>,
    ) -> Vec<HarvestEvent> {
        let (due, pending): (Vec<ScheduledRepeat>, Vec<ScheduledRepeat>) =
            std::mem::take(&mut self.scheduled_repeats)
                .into_iter()
                .partition(|repeat| repeat.time <= ctx.time);
        self.scheduled_repeats = pending;

        due.into_iter()
            .map(|repeat| {
                let prescription = Rc::clone(self.prescriptions[repeat.prescription].prescription());
                let stand = &mut stands[repeat.stand.index()];
                let rank = stand.harvested_rank();
                prescription.harvest(stand, HarvestPhase::Additional, rank, ctx)
            })
            .collect()
    }
}
