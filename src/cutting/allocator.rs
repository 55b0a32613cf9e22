use tracing::debug;

use crate::cohort::Cohort;
use crate::error::ConfigError;
use crate::host::{Host, Location};
use crate::selection::{DistributionOrder, RemovalSpec, SpeciesSelectors};

use super::counts::CohortCounts;

/// Trees removed from a range that has no specifier of its own when its
/// species lists tree counts elsewhere.
pub const DEFAULT_TREE_REMOVAL: u32 = 1;

/// How many trees to take from one cohort.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortRemoval {
    pub cohort: Cohort,
    pub trees: u32,
}

/// Result of cutting one site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteCut {
    pub cohorts_damaged: u32,
    pub cohorts_partially_damaged: u32,
    pub trees_removed: u64,
}

/// Decides which trees leave a site.
#[derive(Debug, Clone, PartialEq)]
pub enum CohortRemovalAllocator {
    /// Every selected cohort is removed outright.
    WholeCohort { selectors: SpeciesSelectors },
    /// Selected cohorts lose a fixed number of trees.
    RangeSelective { selectors: SpeciesSelectors },
    /// Selected cohorts are thinned until the stand reaches `residual` m²/ha.
    BasalAreaProportional {
        selectors: SpeciesSelectors,
        order: DistributionOrder,
        residual: f64,
    },
}

impl CohortRemovalAllocator {
    pub fn from_selectors(selectors: SpeciesSelectors) -> Result<Self, ConfigError> {
        let mut residual: Option<(DistributionOrder, f64)> = None;
        let mut has_counts = false;
        for spec in selectors.removals() {
            match *spec {
                RemovalSpec::TreeCount(_) => has_counts = true,
                RemovalSpec::Residual { order, basal_area } => match residual {
                    None => residual = Some((order, basal_area)),
                    Some((first_order, first_area))
                        if first_order == order && first_area == basal_area => {}
                    Some((first_order, first_area)) => {
                        return Err(ConfigError::ConflictingResiduals {
                            first: RemovalSpec::Residual {
                                order: first_order,
                                basal_area: first_area,
                            }
                            .to_string(),
                            second: spec.to_string(),
                        })
                    }
                },
            }
        }

        match residual {
            Some(_) if has_counts => Err(ConfigError::MixedRemovalKinds),
            Some((order, residual)) => Ok(Self::BasalAreaProportional {
                selectors,
                order,
                residual,
            }),
            None if has_counts => Ok(Self::RangeSelective { selectors }),
            None => Ok(Self::WholeCohort { selectors }),
        }
    }

    pub fn selectors(&self) -> &SpeciesSelectors {
        match self {
            Self::WholeCohort { selectors }
            | Self::RangeSelective { selectors }
            | Self::BasalAreaProportional { selectors, .. } => selectors,
        }
    }

    /// Residual basal area target, when this allocator needs per-site shares.
    pub fn residual_basal_area(&self) -> Option<f64> {
        match self {
            Self::BasalAreaProportional { residual, .. } => Some(*residual),
            _ => None,
        }
    }

    /// Plans the removals for one site without touching the host.
    ///
    /// `basal_share` is the site's share of the stand removal (m²/ha); only the
    /// basal-area variant reads it.
    pub fn plan_removals(
        &self,
        cohorts: &[Cohort],
        cell_area: f64,
        basal_share: f64,
    ) -> Vec<CohortRemoval> {
        match self {
            Self::WholeCohort { selectors } => cohorts
                .iter()
                .filter(|c| c.trees > 0 && selectors.selects(c))
                .map(|c| CohortRemoval {
                    cohort: c.clone(),
                    trees: c.trees,
                })
                .collect(),
            Self::RangeSelective { selectors } => cohorts
                .iter()
                .filter_map(|c| {
                    let selector = selectors.get(c.species)?;
                    let entry = selector.select(c)?;
                    let wanted = if selector.has_tree_counts() {
                        match entry.removal {
                            Some(RemovalSpec::TreeCount(n)) => n,
                            _ => DEFAULT_TREE_REMOVAL,
                        }
                    } else {
                        c.trees
                    };
                    let trees = wanted.min(c.trees);
                    (trees > 0).then(|| CohortRemoval {
                        cohort: c.clone(),
                        trees,
                    })
                })
                .collect(),
            Self::BasalAreaProportional {
                selectors, order, ..
            } => {
                let selected: Vec<&Cohort> =
                    cohorts.iter().filter(|c| selectors.selects(c)).collect();
                plan_basal_removals(selected, *order, cell_area, basal_share)
            }
        }
    }

    /// Cuts one site through the host. `counts` is reset first and ends up
    /// holding the cohorts cut per species.
    pub fn cut(
        &self,
        site: Location,
        host: &mut dyn Host,
        basal_share: f64,
        counts: &mut CohortCounts,
    ) -> SiteCut {
        counts.reset();
        let cohorts = host.site_cohorts(site);
        let plan = self.plan_removals(&cohorts, host.cell_area(), basal_share);
        if plan.is_empty() {
            debug!(?site, cohorts = cohorts.len(), "no cohorts removed");
        }

        let mut cut = SiteCut::default();
        for removal in plan {
            let removed = host.reduce_or_remove(site, &removal.cohort, removal.trees);
            if removed == 0 {
                continue;
            }
            counts.increment(removal.cohort.species);
            cut.trees_removed += u64::from(removed);
            if removed < removal.cohort.trees {
                cut.cohorts_partially_damaged += 1;
            }
        }
        cut.cohorts_damaged = counts.all_species();
        cut
    }
}

/// Converts a basal-area share (m²/ha) into tree removals over the selected
/// cohorts.
pub fn plan_basal_removals(
    mut selected: Vec<&Cohort>,
    order: DistributionOrder,
    cell_area: f64,
    share: f64,
) -> Vec<CohortRemoval> {
    if share <= 0.0 || cell_area <= 0.0 || selected.is_empty() {
        debug!(share, selected = selected.len(), "nothing to thin at site");
        return Vec::new();
    }
    match order {
        DistributionOrder::FromAbove => {
            selected.sort_by(|a, b| b.diameter.total_cmp(&a.diameter));
        }
        DistributionOrder::FromBelow => {
            selected.sort_by(|a, b| a.diameter.total_cmp(&b.diameter));
        }
        DistributionOrder::Distributed => return distribute_evenly(&selected, cell_area, share),
    }

    let mut removals = Vec::new();
    let mut remaining = share;
    for cohort in selected {
        if remaining <= 0.0 {
            break;
        }
        if cohort.trees == 0 {
            continue;
        }
        let cohort_basal = cohort.basal_area / cell_area;
        let trees = if cohort_basal <= remaining {
            cohort.trees
        } else {
            match cohort.per_tree_basal_area() {
                Some(per_tree) => {
                    ((remaining * cell_area / per_tree).ceil() as u32).min(cohort.trees)
                }
                None => 0,
            }
        };
        if trees > 0 {
            removals.push(CohortRemoval {
                cohort: cohort.clone(),
                trees,
            });
        }
        remaining -= cohort_basal;
    }
    removals
}

fn distribute_evenly(selected: &[&Cohort], cell_area: f64, share: f64) -> Vec<CohortRemoval> {
    let selected_basal: f64 = selected.iter().map(|c| c.basal_area / cell_area).sum();
    if selected_basal <= 0.0 {
        debug!("selected cohorts carry no basal area");
        return Vec::new();
    }
    let fraction = (share / selected_basal).min(1.0);
    selected
        .iter()
        .filter(|c| c.trees > 0)
        .filter_map(|c| {
            let trees = ((c.trees as f64 * fraction).ceil() as u32).min(c.trees);
            (trees > 0).then(|| CohortRemoval {
                cohort: (*c).clone(),
                trees,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::SpeciesId;
    use crate::selection::{CohortMeasure, RangeListParser};

    const OAK: SpeciesId = SpeciesId::new(0);
    const PINE: SpeciesId = SpeciesId::new(1);

    fn cohort(species: SpeciesId, age: u16, diameter: f64, trees: u32, basal_area: f64) -> Cohort {
        Cohort {
            species,
            age,
            diameter,
            trees,
            basal_area,
        }
    }

    fn selectors(lists: &[(SpeciesId, &str)]) -> SpeciesSelectors {
        let mut selectors = SpeciesSelectors::new();
        for (species, text) in lists {
            let selector = RangeListParser::new(text, CohortMeasure::Diameter)
                .parse()
                .unwrap();
            selectors.insert(*species, selector);
        }
        selectors
    }

    #[test]
    fn factory_picks_variant_from_specifiers() {
        let whole = CohortRemovalAllocator::from_selectors(selectors(&[(OAK, "10-30")])).unwrap();
        assert!(matches!(whole, CohortRemovalAllocator::WholeCohort { .. }));

        let counts =
            CohortRemovalAllocator::from_selectors(selectors(&[(OAK, "10-30(5)")])).unwrap();
        assert!(matches!(counts, CohortRemovalAllocator::RangeSelective { .. }));

        let basal = CohortRemovalAllocator::from_selectors(selectors(&[
            (OAK, "10-30(A-15)"),
            (PINE, "5-50(A-15)"),
        ]))
        .unwrap();
        assert_eq!(basal.residual_basal_area(), Some(15.0));
    }

    #[test]
    fn factory_rejects_mixed_and_conflicting_specifiers() {
        let mixed =
            CohortRemovalAllocator::from_selectors(selectors(&[(OAK, "10-20(A-15) 30-40(5)")]));
        assert!(matches!(mixed, Err(ConfigError::MixedRemovalKinds)));

        let conflicting = CohortRemovalAllocator::from_selectors(selectors(&[
            (OAK, "10-20(A-15)"),
            (PINE, "10-20(B-15)"),
        ]));
        assert!(matches!(
            conflicting,
            Err(ConfigError::ConflictingResiduals { .. })
        ));
    }

    #[test]
    fn partial_cut_rounds_trees_up() {
        let cohorts = vec![cohort(OAK, 40, 25.0, 100, 10.0)];
        let plan = plan_basal_removals(
            cohorts.iter().collect(),
            DistributionOrder::FromAbove,
            1.0,
            3.0,
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].trees, 30);
    }

    #[test]
    fn partial_cut_scales_per_tree_basal_area_to_the_cell() {
        // 5 m² on a half-hectare cell is 10 m²/ha, 0.1 m²/ha per tree.
        let cohorts = vec![cohort(OAK, 40, 25.0, 100, 5.0)];
        let plan = plan_basal_removals(
            cohorts.iter().collect(),
            DistributionOrder::FromAbove,
            0.5,
            3.0,
        );
        assert_eq!(plan[0].trees, 30);
    }

    #[test]
    fn from_above_takes_largest_first() {
        let cohorts = vec![
            cohort(OAK, 20, 10.0, 100, 2.0),
            cohort(OAK, 60, 40.0, 10, 4.0),
            cohort(OAK, 40, 25.0, 50, 3.0),
        ];
        let plan = plan_basal_removals(
            cohorts.iter().collect(),
            DistributionOrder::FromAbove,
            1.0,
            5.0,
        );
        // 40 cm cohort goes whole (4.0), 25 cm cohort covers the last 1.0.
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].cohort.age, 60);
        assert_eq!(plan[0].trees, 10);
        assert_eq!(plan[1].cohort.age, 40);
        assert_eq!(plan[1].trees, 17);
    }

    #[test]
    fn from_below_takes_smallest_first() {
        let cohorts = vec![
            cohort(OAK, 60, 40.0, 10, 4.0),
            cohort(OAK, 20, 10.0, 100, 2.0),
        ];
        let plan = plan_basal_removals(
            cohorts.iter().collect(),
            DistributionOrder::FromBelow,
            1.0,
            1.0,
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].cohort.age, 20);
        assert_eq!(plan[0].trees, 50);
    }

    #[test]
    fn removal_never_exceeds_cohort_size() {
        let cohorts = vec![
            cohort(OAK, 20, 10.0, 3, 0.9),
            cohort(PINE, 30, 12.0, 0, 0.0),
        ];
        for order in [
            DistributionOrder::FromAbove,
            DistributionOrder::FromBelow,
            DistributionOrder::Distributed,
        ] {
            let plan = plan_basal_removals(cohorts.iter().collect(), order, 1.0, 50.0);
            for removal in &plan {
                assert!(removal.trees <= removal.cohort.trees);
                assert!(removal.trees > 0);
            }
        }
    }

    #[test]
    fn distributed_takes_same_fraction_everywhere() {
        let cohorts = vec![
            cohort(OAK, 20, 10.0, 100, 2.0),
            cohort(PINE, 60, 40.0, 10, 2.0),
        ];
        let plan = plan_basal_removals(
            cohorts.iter().collect(),
            DistributionOrder::Distributed,
            1.0,
            1.0,
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].trees, 25);
        assert_eq!(plan[1].trees, 3);
    }

    #[test]
    fn zero_share_removes_nothing() {
        let cohorts = vec![cohort(OAK, 20, 10.0, 100, 2.0)];
        let plan = plan_basal_removals(
            cohorts.iter().collect(),
            DistributionOrder::FromAbove,
            1.0,
            0.0,
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn range_selective_uses_default_for_unlabelled_ranges() {
        let allocator = CohortRemovalAllocator::from_selectors(selectors(&[
            (OAK, "10-20(5) 30-40"),
            (PINE, "10-40"),
        ]))
        .unwrap();
        let cohorts = vec![
            cohort(OAK, 20, 15.0, 50, 1.0),
            cohort(OAK, 50, 35.0, 50, 1.0),
            cohort(PINE, 50, 35.0, 40, 1.0),
            cohort(OAK, 80, 60.0, 50, 1.0),
        ];
        let plan = allocator.plan_removals(&cohorts, 1.0, 0.0);
        let trees: Vec<u32> = plan.iter().map(|r| r.trees).collect();
        assert_eq!(trees, vec![5, DEFAULT_TREE_REMOVAL, 40]);
    }

    #[test]
    fn whole_cohort_takes_every_selected_tree() {
        let allocator =
            CohortRemovalAllocator::from_selectors(selectors(&[(OAK, "30-100")])).unwrap();
        let cohorts = vec![
            cohort(OAK, 20, 15.0, 50, 1.0),
            cohort(OAK, 50, 35.0, 12, 1.0),
        ];
        let plan = allocator.plan_removals(&cohorts, 1.0, 0.0);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].trees, 12);
    }
}
