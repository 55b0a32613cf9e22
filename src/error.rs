use thiserror::Error;

use crate::selection::SelectionParseError;

/// Errors raised while validating a scenario. Nothing is built when one occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cohorts of species \"{species}\": {source}")]
    Selection {
        species: String,
        #[source]
        source: SelectionParseError,
    },

    #[error("unknown species \"{0}\"")]
    UnknownSpecies(String),

    #[error("unknown prescription \"{0}\"")]
    UnknownPrescription(String),

    #[error("duplicate {kind} \"{name}\"")]
    Duplicate { kind: &'static str, name: String },

    #[error("{name} is {value}, which is not between 0% and 100%")]
    Percentage { name: &'static str, value: f64 },

    #[error("patch size {0} is negative")]
    NegativePatchSize(f64),

    #[error("a cohort list cannot mix residual basal area and tree count removals")]
    MixedRemovalKinds,

    #[error("conflicting residual basal area targets {first} and {second}")]
    ConflictingResiduals { first: String, second: String },

    #[error("repeat interval must be positive, got {0}")]
    NonPositiveInterval(i32),

    #[error("{0}")]
    Invalid(String),
}
