//! Dense occupancy grid
//!
//! Every cell carries a [`Mark`] counting the body segments on it and flagging
//! food. Callers adjust marks directly through [`GridMap::mark_mut`]; the grid
//! itself has no higher-level mutation API.

use crate::error::{EngineError, EngineResult};
use shared::Coordinate;

/// Per-cell occupancy state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mark {
    pub snake_count: i32,
    pub food_flag: i32,
}

impl Mark {
    /// A cell is empty when it holds neither body segments nor food
    pub fn is_empty(&self) -> bool {
        self.snake_count <= 0 && self.food_flag <= 0
    }

    pub fn has_snake(&self) -> bool {
        self.snake_count > 0
    }

    pub fn has_food(&self) -> bool {
        self.food_flag > 0
    }
}

#[derive(Debug, Clone)]
pub struct GridMap {
    width: i32,
    height: i32,
    marks: Vec<Mark>,
}

impl GridMap {
    pub fn new(width: i32, height: i32) -> Self {
        let cells = (width.max(0) as usize) * (height.max(0) as usize);
        Self {
            width,
            height,
            marks: vec![Mark::default(); cells],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.marks.len()
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.row >= 0 && coord.row < self.height && coord.col >= 0 && coord.col < self.width
    }

    /// True for cells on the outermost ring
    pub fn is_border(&self, coord: Coordinate) -> bool {
        coord.row <= 0
            || coord.row >= self.height - 1
            || coord.col <= 0
            || coord.col >= self.width - 1
    }

    pub fn index_of(&self, coord: Coordinate) -> Option<usize> {
        if self.contains(coord) {
            Some((coord.row * self.width + coord.col) as usize)
        } else {
            None
        }
    }

    pub fn coordinate_of(&self, index: usize) -> Coordinate {
        let width = self.width as usize;
        Coordinate::new((index / width) as i32, (index % width) as i32)
    }

    /// Returns the mark at `coord`; cells outside the grid read as empty.
    pub fn mark_at(&self, coord: Coordinate) -> Mark {
        self.index_of(coord)
            .map(|index| self.marks[index])
            .unwrap_or_default()
    }

    pub fn mark_mut(&mut self, coord: Coordinate) -> EngineResult<&mut Mark> {
        let index = self.index_of(coord).ok_or(EngineError::OutOfBounds(coord))?;
        Ok(&mut self.marks[index])
    }

    pub fn mark_at_index(&self, index: usize) -> Mark {
        self.marks.get(index).copied().unwrap_or_default()
    }

    pub fn is_empty(&self, coord: Coordinate) -> bool {
        self.mark_at(coord).is_empty()
    }

    /// Iterates every cell in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (Coordinate, &Mark)> + '_ {
        self.marks
            .iter()
            .enumerate()
            .map(move |(index, mark)| (self.coordinate_of(index), mark))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_empty() {
        let grid = GridMap::new(10, 8);
        assert_eq!(grid.cell_count(), 80);
        assert!(grid.cells().all(|(_, mark)| mark.is_empty()));
    }

    #[test]
    fn test_index_is_row_major() {
        let grid = GridMap::new(10, 8);
        assert_eq!(grid.index_of(Coordinate::new(0, 0)), Some(0));
        assert_eq!(grid.index_of(Coordinate::new(2, 3)), Some(23));
        assert_eq!(grid.coordinate_of(23), Coordinate::new(2, 3));
        assert_eq!(grid.index_of(Coordinate::new(8, 0)), None);
        assert_eq!(grid.index_of(Coordinate::new(0, -1)), None);
    }

    #[test]
    fn test_mark_mutation_is_visible() {
        let mut grid = GridMap::new(10, 10);
        let coord = Coordinate::new(4, 4);

        grid.mark_mut(coord).unwrap().snake_count += 1;
        assert!(!grid.is_empty(coord));
        assert!(grid.mark_at(coord).has_snake());

        grid.mark_mut(coord).unwrap().snake_count -= 1;
        assert!(grid.is_empty(coord));

        grid.mark_mut(coord).unwrap().food_flag = 1;
        assert!(grid.mark_at(coord).has_food());
        assert!(!grid.is_empty(coord));
    }

    #[test]
    fn test_out_of_bounds_mutation_fails() {
        let mut grid = GridMap::new(5, 5);
        let coord = Coordinate::new(5, 2);
        assert_eq!(grid.mark_mut(coord), Err(EngineError::OutOfBounds(coord)));
        assert!(grid.is_empty(coord));
    }

    #[test]
    fn test_border_detection() {
        let grid = GridMap::new(10, 8);
        assert!(grid.is_border(Coordinate::new(0, 5)));
        assert!(grid.is_border(Coordinate::new(7, 5)));
        assert!(grid.is_border(Coordinate::new(3, 0)));
        assert!(grid.is_border(Coordinate::new(3, 9)));
        assert!(!grid.is_border(Coordinate::new(1, 1)));
        assert!(!grid.is_border(Coordinate::new(6, 8)));
    }
}
