//! Food placement and consumption
//!
//! Food is placed by a randomized wrap-around scan: start at a random cell,
//! walk the grid once, and take the k-th empty cell seen (or the last empty
//! cell when fewer than k exist).

use crate::error::{EngineError, EngineResult};
use crate::grid::GridMap;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::Coordinate;

/// Upper bound (exclusive) for the number of empty cells skipped per scan
pub const MAX_SKIP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodKind {
    Pellet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Food {
    pub coord: Coordinate,
    pub kind: FoodKind,
}

#[derive(Debug, Clone)]
pub struct FoodSpawner {
    target: usize,
    foods: Vec<Food>,
}

impl FoodSpawner {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            foods: Vec::with_capacity(target),
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    /// True while fewer than the target number of food items are active
    pub fn needs_food(&self) -> bool {
        self.foods.len() < self.target
    }

    pub fn foods(&self) -> &[Food] {
        &self.foods
    }

    pub fn food_at(&self, coord: Coordinate) -> Option<&Food> {
        self.foods.iter().find(|f| f.coord == coord)
    }

    /// Places one food item on a randomly chosen empty cell.
    pub fn grant_food<R: Rng + ?Sized>(
        &mut self,
        grid: &mut GridMap,
        rng: &mut R,
    ) -> EngineResult<Food> {
        let cells = grid.cell_count();
        if cells == 0 {
            return Err(EngineError::SpawnFailure);
        }
        let start = rng.gen_range(0..cells);
        let skip = rng.gen_range(0..MAX_SKIP);

        let index = Self::scan(grid, start, skip).ok_or(EngineError::SpawnFailure)?;
        let coord = grid.coordinate_of(index);
        self.place_food(grid, coord)
    }

    /// Places one food item on `coord`, which must be empty.
    pub fn place_food(&mut self, grid: &mut GridMap, coord: Coordinate) -> EngineResult<Food> {
        let mark = grid.mark_mut(coord)?;
        if !mark.is_empty() {
            return Err(EngineError::CellOccupied(coord));
        }
        mark.food_flag = 1;

        let food = Food {
            coord,
            kind: FoodKind::Pellet,
        };
        self.foods.push(food);
        debug!("Food placed at {}", coord);
        Ok(food)
    }

    /// Consumes the food at `coord` and clears the cell's food flag.
    pub fn digest_food(&mut self, grid: &mut GridMap, coord: Coordinate) -> EngineResult<Food> {
        let position = self
            .foods
            .iter()
            .position(|f| f.coord == coord)
            .ok_or(EngineError::FoodConsistency(coord))?;
        grid.mark_mut(coord)?.food_flag = 0;
        let food = self.foods.remove(position);
        debug!("Food at {} digested", coord);
        Ok(food)
    }

    fn scan(grid: &GridMap, start: usize, skip: usize) -> Option<usize> {
        let cells = grid.cell_count();
        let mut seen = 0;
        let mut last = None;
        for offset in 0..cells {
            let index = (start + offset) % cells;
            if !grid.mark_at_index(index).is_empty() {
                continue;
            }
            if seen == skip {
                return Some(index);
            }
            seen += 1;
            last = Some(index);
        }
        last
    }
}
