use std::collections::BTreeMap;
use std::fmt;

use crate::cohort::{Cohort, SpeciesId};

use super::range::MeasureRange;

/// Order in which a basal-area target walks the selected cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistributionOrder {
    /// Largest diameters first.
    FromAbove,
    /// Smallest diameters first.
    FromBelow,
    /// The same fraction from every selected cohort.
    Distributed,
}

impl DistributionOrder {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "A" => Some(Self::FromAbove),
            "B" => Some(Self::FromBelow),
            "D" => Some(Self::Distributed),
            _ => None,
        }
    }

    pub fn tag(self) -> char {
        match self {
            Self::FromAbove => 'A',
            Self::FromBelow => 'B',
            Self::Distributed => 'D',
        }
    }
}

/// What to remove from a cohort matched by a range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemovalSpec {
    TreeCount(u32),
    /// Thin the stand down to `basal_area` m²/ha, walking cohorts in `order`.
    Residual {
        order: DistributionOrder,
        basal_area: f64,
    },
}

impl fmt::Display for RemovalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TreeCount(n) => write!(f, "({n})"),
            Self::Residual { order, basal_area } => write!(f, "({}-{basal_area})", order.tag()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortMeasure {
    Diameter,
    Age,
}

impl CohortMeasure {
    pub fn of(self, cohort: &Cohort) -> f64 {
        match self {
            Self::Diameter => cohort.diameter,
            Self::Age => f64::from(cohort.age),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeEntry {
    pub range: MeasureRange,
    pub removal: Option<RemovalSpec>,
}

/// Matches the cohorts of one species against a list of values and ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortSelector {
    measure: CohortMeasure,
    entries: Vec<RangeEntry>,
}

impl CohortSelector {
    pub fn new(measure: CohortMeasure, entries: Vec<RangeEntry>) -> Self {
        Self { measure, entries }
    }

    pub fn measure(&self) -> CohortMeasure {
        self.measure
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    /// The entry that selects `cohort`. Exact values are checked before ranges,
    /// so a single value listed inside a wider range keeps its own specifier.
    pub fn select(&self, cohort: &Cohort) -> Option<&RangeEntry> {
        let value = self.measure.of(cohort);
        self.entries
            .iter()
            .filter(|e| e.range.is_single())
            .chain(self.entries.iter().filter(|e| !e.range.is_single()))
            .find(|e| e.range.contains(value))
    }

    pub fn selects(&self, cohort: &Cohort) -> bool {
        self.select(cohort).is_some()
    }

    pub fn has_tree_counts(&self) -> bool {
        self.removals()
            .any(|r| matches!(r, RemovalSpec::TreeCount(_)))
    }

    pub fn removals(&self) -> impl Iterator<Item = &RemovalSpec> + '_ {
        self.entries.iter().filter_map(|e| e.removal.as_ref())
    }
}

/// Per-species cohort selectors of one cut.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesSelectors {
    by_species: BTreeMap<SpeciesId, CohortSelector>,
}

impl SpeciesSelectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, species: SpeciesId, selector: CohortSelector) {
        self.by_species.insert(species, selector);
    }

    pub fn get(&self, species: SpeciesId) -> Option<&CohortSelector> {
        self.by_species.get(&species)
    }

    pub fn selects(&self, cohort: &Cohort) -> bool {
        self.get(cohort.species)
            .map_or(false, |selector| selector.selects(cohort))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &CohortSelector)> + '_ {
        self.by_species.iter().map(|(id, selector)| (*id, selector))
    }

    pub fn is_empty(&self) -> bool {
        self.by_species.is_empty()
    }

    pub fn removals(&self) -> impl Iterator<Item = &RemovalSpec> + '_ {
        self.by_species.values().flat_map(|s| s.removals())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cohort(diameter: f64, age: u16) -> Cohort {
        Cohort {
            species: SpeciesId::new(0),
            age,
            diameter,
            trees: 50,
            basal_area: 1.0,
        }
    }

    #[test]
    fn exact_value_wins_over_enclosing_range() {
        let selector = CohortSelector::new(
            CohortMeasure::Diameter,
            vec![
                RangeEntry {
                    range: MeasureRange::new(10.0, 30.0),
                    removal: Some(RemovalSpec::TreeCount(5)),
                },
                RangeEntry {
                    range: MeasureRange::single(20.0),
                    removal: Some(RemovalSpec::TreeCount(9)),
                },
            ],
        );
        let entry = selector.select(&cohort(20.0, 40)).unwrap();
        assert_eq!(entry.removal, Some(RemovalSpec::TreeCount(9)));
        let entry = selector.select(&cohort(21.0, 40)).unwrap();
        assert_eq!(entry.removal, Some(RemovalSpec::TreeCount(5)));
        assert!(selector.select(&cohort(35.0, 40)).is_none());
    }

    #[test]
    fn age_measure_reads_cohort_age() {
        let selector = CohortSelector::new(
            CohortMeasure::Age,
            vec![RangeEntry {
                range: MeasureRange::new(40.0, 60.0),
                removal: None,
            }],
        );
        assert!(selector.selects(&cohort(5.0, 45)));
        assert!(!selector.selects(&cohort(45.0, 5)));
    }

    #[test]
    fn unknown_species_is_not_selected() {
        let mut selectors = SpeciesSelectors::new();
        selectors.insert(
            SpeciesId::new(3),
            CohortSelector::new(
                CohortMeasure::Diameter,
                vec![RangeEntry {
                    range: MeasureRange::new(0.0, 100.0),
                    removal: None,
                }],
            ),
        );
        assert!(!selectors.selects(&cohort(20.0, 10)));
    }

    #[test]
    fn removal_spec_displays_in_config_syntax() {
        let residual = RemovalSpec::Residual {
            order: DistributionOrder::FromAbove,
            basal_area: 35.5,
        };
        assert_eq!(residual.to_string(), "(A-35.5)");
        assert_eq!(RemovalSpec::TreeCount(20).to_string(), "(20)");
    }
}
