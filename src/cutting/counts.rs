use std::collections::BTreeMap;

use crate::cohort::SpeciesId;

/// Number of cohorts cut per species.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortCounts {
    counts: BTreeMap<SpeciesId, u32>,
}

impl CohortCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, species: SpeciesId) {
        *self.counts.entry(species).or_insert(0) += 1;
    }

    pub fn increment_counts(&mut self, other: &CohortCounts) {
        for (species, count) in &other.counts {
            *self.counts.entry(*species).or_insert(0) += count;
        }
    }

    pub fn get(&self, species: SpeciesId) -> u32 {
        self.counts.get(&species).copied().unwrap_or(0)
    }

    pub fn all_species(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, u32)> + '_ {
        self.counts.iter().map(|(species, count)| (*species, *count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_into_a_damage_table() {
        let oak = SpeciesId::new(0);
        let pine = SpeciesId::new(1);
        let mut site = CohortCounts::new();
        site.increment(oak);
        site.increment(oak);
        site.increment(pine);

        let mut table = CohortCounts::new();
        table.increment_counts(&site);
        table.increment_counts(&site);
        assert_eq!(table.get(oak), 4);
        assert_eq!(table.get(pine), 2);
        assert_eq!(table.all_species(), 6);

        site.reset();
        assert_eq!(site.all_species(), 0);
        assert_eq!(site.get(oak), 0);
    }
}
