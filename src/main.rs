use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use density_harvest::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    systems::{AgingSystem, BookkeepingSystem, HarvestSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Density harvest scenario runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/thinning_demo.yaml")]
    scenario: PathBuf,

    /// Override timestep count (uses scenario default when omitted)
    #[arg(long)]
    timesteps: Option<u64>,

    /// Log filter used when RUST_LOG is unset (defaults to the scenario's level)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| scenario.logging.level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut world = scenario.build_world()?;
    let timesteps = scenario.timesteps(cli.timesteps);

    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
    };

    let mut engine = EngineBuilder::new(settings)
        .with_system(HarvestSystem::new())
        .with_system(BookkeepingSystem::new())
        .with_system(AgingSystem::new())
        .build();

    engine.run(&mut world, timesteps)?;
    print!("{}", serde_yaml::to_string(world.summaries())?);
    println!(
        "Scenario '{}' completed for {} timesteps. Harvest events: {}. Standing trees: {} ({:.2} m² basal area)",
        scenario.name,
        timesteps,
        world.events().len(),
        world.landscape().total_trees(),
        world.landscape().total_basal_area()
    );
    Ok(())
}
