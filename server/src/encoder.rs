//! Diff and snapshot encoding
//!
//! A diff classifies each changed coordinate by the cell's state *after* the
//! tick has mutated the grid. Snapshots cover the whole grid and are cached
//! until a newer version is observed.

use crate::grid::GridMap;
use shared::{CellLabel, Coordinate, LabeledGroup, VersionDiff};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct VersionEncoder {
    cached: Option<Arc<VersionDiff>>,
}

impl VersionEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes the changed coordinates of one tick as version `version`.
    pub fn encode_version(
        &self,
        grid: &GridMap,
        version: u64,
        timestamp: u64,
        changes: &[Coordinate],
    ) -> VersionDiff {
        let mut body = Vec::new();
        let mut food = Vec::new();
        let mut cleared = Vec::new();

        for &coord in changes {
            let mark = grid.mark_at(coord);
            if mark.is_empty() {
                cleared.push(coord);
            } else if mark.has_snake() {
                body.push(coord);
            } else if mark.has_food() {
                food.push(coord);
            }
        }

        VersionDiff {
            version,
            timestamp,
            full: false,
            groups: groups(&[
                (CellLabel::Lime, body),
                (CellLabel::Yellow, food),
                (CellLabel::Black, cleared),
            ]),
        }
    }

    /// Encodes every occupied or food cell in the grid.
    pub fn encode_snapshot(&self, grid: &GridMap, version: u64, timestamp: u64) -> VersionDiff {
        let mut body = Vec::new();
        let mut food = Vec::new();

        for (coord, mark) in grid.cells() {
            if mark.has_snake() {
                body.push(coord);
            } else if mark.has_food() {
                food.push(coord);
            }
        }

        VersionDiff {
            version,
            timestamp,
            full: true,
            groups: groups(&[(CellLabel::Lime, body), (CellLabel::Yellow, food)]),
        }
    }

    /// Returns the cached snapshot, rebuilding it only when `current_version`
    /// is newer than the cached one.
    pub fn snapshot(
        &mut self,
        grid: &GridMap,
        current_version: u64,
        timestamp: u64,
    ) -> Arc<VersionDiff> {
        match &self.cached {
            Some(cached) if cached.version >= current_version => Arc::clone(cached),
            _ => {
                let snapshot = Arc::new(self.encode_snapshot(grid, current_version, timestamp));
                self.cached = Some(Arc::clone(&snapshot));
                snapshot
            }
        }
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn cached_version(&self) -> Option<u64> {
        self.cached.as_ref().map(|s| s.version)
    }
}

fn groups(buckets: &[(CellLabel, Vec<Coordinate>)]) -> Vec<LabeledGroup> {
    buckets
        .iter()
        .filter(|(_, coords)| !coords.is_empty())
        .map(|(label, coords)| LabeledGroup::from_coordinates(*label, coords))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_snake_and_food() -> GridMap {
        let mut grid = GridMap::new(10, 10);
        grid.mark_mut(Coordinate::new(5, 5)).unwrap().snake_count = 1;
        grid.mark_mut(Coordinate::new(5, 6)).unwrap().snake_count = 1;
        grid.mark_mut(Coordinate::new(2, 3)).unwrap().food_flag = 1;
        grid
    }

    #[test]
    fn test_encode_version_classifies_current_state() {
        let grid = grid_with_snake_and_food();
        let encoder = VersionEncoder::new();
        let changes = [
            Coordinate::new(5, 6),
            Coordinate::new(5, 3),
            Coordinate::new(2, 3),
            Coordinate::new(5, 5),
        ];

        let diff = encoder.encode_version(&grid, 4, 1000, &changes);

        assert_eq!(diff.version, 4);
        assert_eq!(diff.timestamp, 1000);
        assert!(!diff.full);
        assert_eq!(diff.group(CellLabel::Lime).unwrap().points, "6,5,5,5");
        assert_eq!(diff.group(CellLabel::Yellow).unwrap().points, "3,2");
        assert_eq!(diff.group(CellLabel::Black).unwrap().points, "3,5");
    }

    #[test]
    fn test_encode_version_omits_empty_groups() {
        let grid = grid_with_snake_and_food();
        let encoder = VersionEncoder::new();

        let diff = encoder.encode_version(&grid, 1, 0, &[Coordinate::new(5, 5)]);

        assert_eq!(diff.groups.len(), 1);
        assert_eq!(diff.groups[0].label, CellLabel::Lime);
        assert!(diff.group(CellLabel::Black).is_none());
        assert!(diff.group(CellLabel::Yellow).is_none());
    }

    #[test]
    fn test_snapshot_has_no_cleared_group() {
        let grid = grid_with_snake_and_food();
        let encoder = VersionEncoder::new();

        let snapshot = encoder.encode_snapshot(&grid, 9, 0);

        assert!(snapshot.full);
        assert_eq!(snapshot.version, 9);
        assert_eq!(
            snapshot.coordinates(CellLabel::Lime),
            vec![Coordinate::new(5, 5), Coordinate::new(5, 6)]
        );
        assert_eq!(snapshot.coordinates(CellLabel::Yellow), vec![Coordinate::new(2, 3)]);
        assert!(snapshot.group(CellLabel::Black).is_none());
    }

    #[test]
    fn test_snapshot_of_empty_grid() {
        let grid = GridMap::new(5, 5);
        let snapshot = VersionEncoder::new().encode_snapshot(&grid, 0, 0);
        assert!(snapshot.groups.is_empty());
    }

    #[test]
    fn test_snapshot_is_cached_until_version_advances() {
        let mut grid = grid_with_snake_and_food();
        let mut encoder = VersionEncoder::new();

        let first = encoder.snapshot(&grid, 3, 100);
        grid.mark_mut(Coordinate::new(7, 7)).unwrap().snake_count = 1;
        let second = encoder.snapshot(&grid, 3, 200);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.timestamp, 100);

        let third = encoder.snapshot(&grid, 4, 300);
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.version, 4);
        assert_eq!(third.coordinates(CellLabel::Lime).len(), 3);
    }

    #[test]
    fn test_invalidate_drops_cache() {
        let grid = GridMap::new(5, 5);
        let mut encoder = VersionEncoder::new();
        encoder.snapshot(&grid, 2, 0);
        assert_eq!(encoder.cached_version(), Some(2));
        encoder.invalidate();
        assert_eq!(encoder.cached_version(), None);
    }
}
