//! Work assignment across flush lanes
//!
//! Two policies are supported:
//!
//! - [`AssignmentMode::OneShot`]: a snapshot of the ready pool is partitioned
//!   once per start pass. Key `i` goes to lane `i mod N` for every complete
//!   round; the keys left over after the last complete round all go to the
//!   last lane. Batches sealed after the snapshot wait for the next pass.
//! - [`AssignmentMode::Incremental`]: each sealed key goes straight to the
//!   next lane of a rotating cursor, so lanes pick up work as soon as it is
//!   sealed.
//!
//! In both modes a key is given to exactly one lane and never moves.

use serde::{Deserialize, Serialize};

use super::{BatchKey, LaneId};

/// Policy used to hand sealed batches to lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    /// Assign at seal time, rotating over lanes
    #[default]
    Incremental,
    /// Partition the ready pool once per start pass
    OneShot,
}

impl std::str::FromStr for AssignmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "incremental" => Ok(AssignmentMode::Incremental),
            "one_shot" | "oneshot" => Ok(AssignmentMode::OneShot),
            other => Err(format!("Invalid assignment mode: {other}")),
        }
    }
}

impl std::fmt::Display for AssignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentMode::Incremental => write!(f, "incremental"),
            AssignmentMode::OneShot => write!(f, "one_shot"),
        }
    }
}

/// Partitions batch keys across a fixed number of lanes
#[derive(Debug, Clone)]
pub struct WorkAssigner {
    lanes: usize,
    cursor: usize,
}

impl WorkAssigner {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes: lanes.max(1),
            cursor: 0,
        }
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Partition a snapshot of ready keys, returning one key list per lane
    pub fn assign_snapshot(&self, keys: Vec<BatchKey>) -> Vec<Vec<BatchKey>> {
        let mut per_lane = vec![Vec::new(); self.lanes];
        let full_rounds = keys.len() - keys.len() % self.lanes;

        for (i, key) in keys.into_iter().enumerate() {
            let lane = if i < full_rounds {
                i % self.lanes
            } else {
                self.lanes - 1
            };
            per_lane[lane].push(key);
        }

        per_lane
    }

    /// Lane for the next key in rotation
    pub fn assign_next(&mut self) -> LaneId {
        let lane = LaneId(self.cursor);
        self.cursor = (self.cursor + 1) % self.lanes;
        lane
    }

    /// Distribute `keys` according to `mode`
    pub fn distribute(&mut self, mode: AssignmentMode, keys: Vec<BatchKey>) -> Vec<Vec<BatchKey>> {
        match mode {
            AssignmentMode::OneShot => self.assign_snapshot(keys),
            AssignmentMode::Incremental => {
                let mut per_lane = vec![Vec::new(); self.lanes];
                for key in keys {
                    per_lane[self.assign_next().0].push(key);
                }
                per_lane
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn keys(n: u64) -> Vec<BatchKey> {
        (0..n).map(BatchKey).collect()
    }

    #[test]
    fn test_snapshot_round_robin_with_leftovers_on_last_lane() {
        let assigner = WorkAssigner::new(3);
        let lanes = assigner.assign_snapshot(keys(8));

        assert_eq!(lanes[0], vec![BatchKey(0), BatchKey(3)]);
        assert_eq!(lanes[1], vec![BatchKey(1), BatchKey(4)]);
        assert_eq!(lanes[2], vec![BatchKey(2), BatchKey(5), BatchKey(6), BatchKey(7)]);
    }

    #[test]
    fn test_snapshot_smaller_than_lane_count() {
        let assigner = WorkAssigner::new(4);
        let lanes = assigner.assign_snapshot(keys(2));

        assert!(lanes[..3].iter().all(Vec::is_empty));
        assert_eq!(lanes[3].len(), 2);
    }

    #[test]
    fn test_snapshot_assigns_every_key_once() {
        let assigner = WorkAssigner::new(5);
        let lanes = assigner.assign_snapshot(keys(23));

        let mut all: Vec<BatchKey> = lanes.into_iter().flatten().collect();
        all.sort();
        assert_eq!(all, keys(23));
    }

    #[test]
    fn test_incremental_rotates_across_calls() {
        let mut assigner = WorkAssigner::new(3);
        let picks: Vec<usize> = (0..7).map(|_| assigner.assign_next().0).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);

        let lanes = assigner.distribute(AssignmentMode::Incremental, keys(2));
        assert_eq!(lanes[1], vec![BatchKey(0)]);
        assert_eq!(lanes[2], vec![BatchKey(1)]);
    }

    #[test]
    fn test_single_lane_takes_everything() {
        let mut assigner = WorkAssigner::new(1);
        let lanes = assigner.distribute(AssignmentMode::OneShot, keys(4));
        assert_eq!(lanes.len(), 1);
        assert_eq!(lanes[0].len(), 4);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("one-shot".parse::<AssignmentMode>().unwrap(), AssignmentMode::OneShot);
        assert_eq!("Incremental".parse::<AssignmentMode>().unwrap(), AssignmentMode::Incremental);
        assert!("stealing".parse::<AssignmentMode>().is_err());
    }
}
