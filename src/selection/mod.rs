mod parse;
mod range;
mod selector;

pub use parse::{RangeListParser, SelectionParseError, MAX_REMOVAL_VALUE};
pub use range::MeasureRange;
pub use selector::{
    CohortMeasure, CohortSelector, DistributionOrder, RangeEntry, RemovalSpec, SpeciesSelectors,
};
