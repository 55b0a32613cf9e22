use tracing::debug;

use crate::cutting::{CohortCounts, SiteCut};
use crate::host::Location;

use super::ranking::StandRankingMethod;
use super::repeat::{CutPlan, HarvestPhase, HarvestPlan};
use super::site_selection::SiteSelector;
use super::stand::{Stand, StandId};
use super::HarvestContext;

/// A named harvest recipe: how stands are ranked, which cells are cut and
/// which cohorts leave those cells.
#[derive(Debug)]
pub struct Prescription {
    number: u32,
    name: String,
    ranking: Box<dyn StandRankingMethod>,
    site_selector: SiteSelector,
    plan: HarvestPlan,
    min_time_since_damage: i32,
}

/// Record of one stand harvest.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestEvent {
    pub time: i32,
    pub stand: StandId,
    pub stand_map_code: u32,
    pub management_area: u32,
    pub prescription: String,
    pub phase: HarvestPhase,
    pub rank: f64,
    pub event_id: Option<u32>,
    pub sites_visited: usize,
    pub area_harvested: f64,
    pub stands_harvested: u32,
    pub cohorts_damaged: u32,
    pub trees_removed: u64,
    pub set_aside_until: Option<i32>,
}

impl Prescription {
    pub fn new(
        number: u32,
        name: impl Into<String>,
        ranking: Box<dyn StandRankingMethod>,
        site_selector: SiteSelector,
        plan: HarvestPlan,
        min_time_since_damage: i32,
    ) -> Self {
        Self {
            number,
            name: name.into(),
            ranking,
            site_selector,
            plan,
            min_time_since_damage,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ranking(&self) -> &dyn StandRankingMethod {
        self.ranking.as_ref()
    }

    /// Harvests one stand. The initial phase chooses cells with the site
    /// selector; the additional phase of a repeat plan cuts exactly the cells
    /// set aside by the initial phase.
    pub fn harvest(
        &self,
        stand: &mut Stand,
        phase: HarvestPhase,
        rank: f64,
        ctx: &mut HarvestContext<'_>,
    ) -> HarvestEvent {
        debug!(
            stand = stand.map_code(),
            prescription = %self.name,
            ?phase,
            rank,
            "harvesting stand"
        );
        stand.begin_harvest(&self.name, rank, self.min_time_since_damage);
        let plan = self.plan.cut_plan(phase);
        match plan.allocator.residual_basal_area() {
            Some(residual) => stand.distribute_basal_removal(&*ctx.host, residual),
            None => stand.clear_removal_shares(),
        }

        let sites = match phase {
            HarvestPhase::Initial => {
                self.site_selector
                    .select_sites(stand, &self.name, ctx)
                    .sites
            }
            HarvestPhase::Additional => {
                let sites = stand.eligible_set_aside_sites(&self.name);
                stand.mark_as_harvested(ctx.time);
                stand.set_event_id(ctx.event_ids.next_id());
                sites
            }
        };

        let sets_aside = phase == HarvestPhase::Initial && self.plan.repeat_interval().is_some();
        let mut counts = CohortCounts::new();
        let mut cohorts_damaged = 0;
        let mut trees_removed = 0;
        for &site in &sites {
            let cut = self.harvest_site(site, stand, plan, &mut counts, ctx);
            cohorts_damaged += cut.cohorts_damaged;
            trees_removed += cut.trees_removed;
            if sets_aside && cut.cohorts_damaged > 0 {
                stand.set_site_aside(site, &self.name);
            }
        }

        let mut set_aside_until = None;
        if let Some(interval) = self.plan.repeat_interval() {
            match phase {
                HarvestPhase::Initial if stand.has_set_aside_sites(&self.name) => {
                    let until = ctx.time + interval;
                    stand.set_aside_until(until);
                    set_aside_until = Some(until);
                }
                HarvestPhase::Initial => {}
                HarvestPhase::Additional => stand.clear_set_aside_sites(&self.name),
            }
        }

        stand.last_stands_harvested = u32::from(stand.is_harvested());
        HarvestEvent {
            time: ctx.time,
            stand: stand.id(),
            stand_map_code: stand.map_code(),
            management_area: stand.management_area(),
            prescription: self.name.clone(),
            phase,
            rank,
            event_id: stand.is_harvested().then(|| stand.event_id()).flatten(),
            sites_visited: sites.len(),
            area_harvested: stand.last_area_harvested,
            stands_harvested: stand.last_stands_harvested,
            cohorts_damaged,
            trees_removed,
            set_aside_until,
        }
    }

    fn harvest_site(
        &self,
        site: Location,
        stand: &mut Stand,
        plan: &CutPlan,
        counts: &mut CohortCounts,
        ctx: &mut HarvestContext<'_>,
    ) -> SiteCut {
        ctx.host.record_prescription(site, &self.name);
        let share = if plan.allocator.residual_basal_area().is_some() {
            stand.site_removal_share(site)
        } else {
            0.0
        };
        let cut = plan.allocator.cut(site, &mut *ctx.host, share, counts);
        if cut.cohorts_damaged > 0 {
            ctx.host
                .record_cohorts_damaged(site, cut.cohorts_damaged, cut.cohorts_partially_damaged);
            stand.update_damage_table(counts);
            stand.last_area_harvested += ctx.host.cell_area();
        }
        if !plan.plant.is_empty() {
            ctx.host.schedule_planting(site, &plan.plant);
        }
        cut
    }
}
