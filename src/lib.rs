pub mod cohort;
pub mod cutting;
pub mod engine;
pub mod error;
pub mod host;
pub mod landscape;
pub mod management;
pub mod rng;
pub mod scenario;
pub mod selection;
pub mod systems;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use error::ConfigError;
pub use scenario::{Scenario, ScenarioLoader};
pub use world::{TimestepSummary, World};
