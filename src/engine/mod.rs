use anyhow::Result;
use tracing::info;

use crate::{
    rng::{RngManager, SystemRng},
    world::{TimestepSummary, World},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            settings: self.settings,
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    settings: EngineSettings,
}

impl Engine {
    pub fn run(&mut self, world: &mut World, timesteps: u64) -> Result<()> {
        self.run_with_hook(world, timesteps, |_| {})
    }

    /// Runs `timesteps` harvest timesteps. Time advances before the systems
    /// run, so the first harvest happens one timestep after the start time.
    pub fn run_with_hook<F>(&mut self, world: &mut World, timesteps: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&TimestepSummary),
    {
        for _ in 0..timesteps {
            world.advance_time();
            let ctx = SystemContext {
                time: world.time(),
                timestep: world.timestep(),
                scenario_name: &self.settings.scenario_name,
            };
            for system in &mut self.systems {
                let mut rng_stream = self.rng.stream(system.name());
                system.run(&ctx, world, &mut rng_stream)?;
            }

            let summary = world.latest_summary().cloned().unwrap_or(TimestepSummary {
                time: world.time(),
                ..TimestepSummary::default()
            });
            info!(
                scenario = %self.settings.scenario_name,
                time = summary.time,
                stands = summary.stands_harvested,
                area = summary.area_harvested,
                trees = summary.trees_removed,
                "timestep complete"
            );
            hook(&summary);
        }
        Ok(())
    }
}

pub struct SystemContext<'a> {
    pub time: i32,
    pub timestep: i32,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}
