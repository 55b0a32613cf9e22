//! Stand ranking methods and the requirements that gate them.

use std::cmp::Ordering;
use std::fmt;

use crate::host::Host;

use super::stand::{Stand, StandId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandRanking {
    pub stand: StandId,
    /// Zero or less means the stand is not eligible.
    pub rank: f64,
}

/// A condition a stand must meet before it is ranked at all.
pub trait Requirement: fmt::Debug {
    fn met_by(&self, stand: &mut Stand, host: &dyn Host, time: i32) -> bool;
}

/// The stand's mean age must not exceed `max_age`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaximumAge {
    max_age: u16,
}

impl MaximumAge {
    pub fn new(max_age: u16) -> Self {
        Self { max_age }
    }
}

impl Requirement for MaximumAge {
    fn met_by(&self, stand: &mut Stand, host: &dyn Host, time: i32) -> bool {
        stand.age(host, time) <= self.max_age
    }
}

pub trait StandRankingMethod: fmt::Debug {
    fn requirements(&self) -> &[Box<dyn Requirement>];

    fn compute_rank(&self, stand: &Stand, host: &dyn Host) -> f64;

    /// Ranks the given stands. A stand failing any requirement ranks 0.
    fn rank_stands(
        &self,
        stand_ids: &[StandId],
        stands: &mut [Stand],
        host: &dyn Host,
        time: i32,
    ) -> Vec<StandRanking> {
        stand_ids
            .iter()
            .map(|&id| {
                let stand = &mut stands[id.index()];
                let eligible = self
                    .requirements()
                    .iter()
                    .all(|requirement| requirement.met_by(stand, host, time));
                let rank = if eligible {
                    self.compute_rank(stand, host)
                } else {
                    0.0
                };
                StandRanking { stand: id, rank }
            })
            .collect()
    }
}

/// Ranks stands by live basal area per hectare.
#[derive(Debug, Default)]
pub struct BasalAreaRank {
    requirements: Vec<Box<dyn Requirement>>,
}

impl BasalAreaRank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requirement(mut self, requirement: impl Requirement + 'static) -> Self {
        self.requirements.push(Box::new(requirement));
        self
    }
}

impl StandRankingMethod for BasalAreaRank {
    fn requirements(&self) -> &[Box<dyn Requirement>] {
        &self.requirements
    }

    fn compute_rank(&self, stand: &Stand, host: &dyn Host) -> f64 {
        let basal = stand.basal_area(host);
        if basal.is_finite() {
            basal
        } else {
            0.0
        }
    }
}

/// Stable sort, highest rank first.
pub fn sort_descending(rankings: &mut [StandRanking]) {
    rankings.sort_by(|a, b| b.rank.partial_cmp(&a.rank).unwrap_or(Ordering::Equal));
}
