use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    management::HarvestContext,
    rng::SystemRng,
    world::World,
};

/// Applies every management area's prescriptions, in scenario order.
pub struct HarvestSystem;

impl HarvestSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HarvestSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for HarvestSystem {
    fn name(&self) -> &str {
        "harvest"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let World {
            landscape,
            stands,
            areas,
            event_ids,
            bookkeeping,
            ..
        } = world;
        let mut harvest = HarvestContext {
            host: landscape,
            rng,
            event_ids,
            time: ctx.time,
        };
        for area in areas.iter_mut() {
            let events = area.harvest(stands, &mut harvest);
            bookkeeping.pending.extend(events);
        }
        Ok(())
    }
}
