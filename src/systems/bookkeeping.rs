use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::{TimestepSummary, World},
};

/// Moves this timestep's harvest events into the log and totals them.
pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let pending = std::mem::take(&mut world.bookkeeping.pending);
        let summary = TimestepSummary::from_events(ctx.time, &pending);
        for event in &pending {
            debug!(
                time = event.time,
                stand = event.stand_map_code,
                management_area = event.management_area,
                prescription = %event.prescription,
                phase = ?event.phase,
                event_id = ?event.event_id,
                area = event.area_harvested,
                cohorts = event.cohorts_damaged,
                "harvest event"
            );
        }
        world.bookkeeping.events.extend(pending);
        world.bookkeeping.summaries.push(summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landscape::Landscape;
    use crate::rng::RngManager;

    #[test]
    fn records_a_summary_even_without_events() {
        let mut world = World::new(Landscape::new(1, 1, 1.0), 0, 10);
        world.advance_time();
        let ctx = SystemContext {
            time: world.time(),
            timestep: 10,
            scenario_name: "test",
        };
        let mut rng = RngManager::new(1);

        BookkeepingSystem::new()
            .run(&ctx, &mut world, &mut rng.stream("bookkeeping"))
            .unwrap();

        assert_eq!(world.summaries().len(), 1);
        assert_eq!(world.latest_summary().map(|s| s.time), Some(10));
        assert!(world.events().is_empty());
    }
}
