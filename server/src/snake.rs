//! Per-player snake state machine
//!
//! A snake owns its ordered body (head first) and the coordinates it added or
//! removed during the current tick. It does not own the grid; every body change
//! is mirrored into the shared [`GridMap`] occupancy counts as it happens.
//!
//! State flow: `Inactive -> Alive <-> Growing -> Dying -> Dead`. Collision and
//! food detection live in the engine, which only ever calls [`SnakeEntity::grow`]
//! and [`SnakeEntity::dying`]; the body itself changes only in [`SnakeEntity::advance`].
//!
//! A Growing snake advances with a single [`SnakeEntity::add_to_head`] and no
//! tail removal. The classic dispatch table reads "add to head, then move
//! step", which would advance the head two cells; the food scenario it is
//! meant to produce (head one cell further, length +1) only holds with the
//! single add.

use crate::error::{EngineError, EngineResult, PlayerId};
use crate::grid::GridMap;
use log::{debug, info};
use shared::{Coordinate, Direction};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnakeState {
    /// Registered, body not yet placed
    Inactive,
    Alive,
    /// Will gain one segment on the next advance
    Growing,
    /// Body is cleared on the next advance
    Dying,
    Dead,
}

impl SnakeState {
    pub fn is_in_play(self) -> bool {
        !matches!(self, SnakeState::Dead)
    }
}

#[derive(Debug, Clone)]
pub struct SnakeEntity {
    id: PlayerId,
    name: String,
    direction: Direction,
    state: SnakeState,
    spawn: Coordinate,
    initial_length: usize,
    body: VecDeque<Coordinate>,
    pending_added: Vec<Coordinate>,
    pending_removed: Vec<Coordinate>,
}

impl SnakeEntity {
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        spawn: Coordinate,
        initial_length: usize,
        direction: Direction,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            direction,
            state: SnakeState::Inactive,
            spawn,
            initial_length,
            body: VecDeque::with_capacity(initial_length + 1),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> SnakeState {
        self.state
    }

    pub fn spawn(&self) -> Coordinate {
        self.spawn
    }

    pub fn head(&self) -> Option<Coordinate> {
        self.body.front().copied()
    }

    pub fn body(&self) -> impl ExactSizeIterator<Item = &Coordinate> + '_ {
        self.body.iter()
    }

    pub fn body_vec(&self) -> Vec<Coordinate> {
        self.body.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn pending_added(&self) -> &[Coordinate] {
        &self.pending_added
    }

    pub fn pending_removed(&self) -> &[Coordinate] {
        &self.pending_removed
    }

    /// Changes heading unless `direction` is a straight reversal.
    ///
    /// Returns whether the direction was accepted.
    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if direction == self.direction.opposite() {
            return false;
        }
        if direction != self.direction {
            debug!("Snake {} turning {:?}", self.id, direction);
        }
        self.direction = direction;
        true
    }

    /// Runs this tick's movement for the current state.
    pub fn advance(&mut self, grid: &mut GridMap) -> EngineResult<()> {
        match self.state {
            SnakeState::Inactive => self.activate(grid),
            SnakeState::Alive => self.move_step(grid),
            // one head step without the matching tail removal, so the head
            // moves a single cell; a further move_step here would take it two
            SnakeState::Growing => {
                self.add_to_head(grid)?;
                self.state = SnakeState::Alive;
                Ok(())
            }
            SnakeState::Dying => self.die(grid),
            SnakeState::Dead => Ok(()),
        }
    }

    /// Cells the initial body covers, head first, trailing away from the heading.
    pub fn initial_cells(&self) -> Vec<Coordinate> {
        let trail = self.direction.opposite();
        let mut cells = Vec::with_capacity(self.initial_length);
        let mut cell = self.spawn;
        for _ in 0..self.initial_length {
            cells.push(cell);
            cell = cell.step(trail);
        }
        cells
    }

    /// Places the initial body. Nothing is touched unless every cell lies
    /// inside the grid.
    pub fn activate(&mut self, grid: &mut GridMap) -> EngineResult<()> {
        let cells = self.initial_cells();
        if let Some(&outside) = cells.iter().find(|&&cell| !grid.contains(cell)) {
            return Err(EngineError::OutOfBounds(outside));
        }
        for cell in cells {
            self.place_at_tail(grid, cell)?;
        }
        self.state = SnakeState::Alive;
        info!(
            "Snake {} ({}) activated at {} heading {:?}",
            self.id, self.name, self.spawn, self.direction
        );
        Ok(())
    }

    /// One cell forward, length unchanged
    pub fn move_step(&mut self, grid: &mut GridMap) -> EngineResult<()> {
        self.add_to_head(grid)?;
        self.remove_from_tail(grid)
    }

    pub fn add_to_head(&mut self, grid: &mut GridMap) -> EngineResult<()> {
        let Some(head) = self.head() else {
            return Ok(());
        };
        let next = head.step(self.direction);
        grid.mark_mut(next)?.snake_count += 1;
        self.body.push_front(next);
        self.pending_added.push(next);
        Ok(())
    }

    pub fn remove_from_tail(&mut self, grid: &mut GridMap) -> EngineResult<()> {
        let Some(tail) = self.body.back().copied() else {
            return Ok(());
        };
        grid.mark_mut(tail)?.snake_count -= 1;
        self.body.pop_back();
        self.pending_removed.push(tail);
        Ok(())
    }

    pub fn grow(&mut self) {
        if matches!(self.state, SnakeState::Alive | SnakeState::Growing) {
            debug!("Snake {} ({}) is growing", self.id, self.name);
            self.state = SnakeState::Growing;
        }
    }

    pub fn dying(&mut self) {
        if self.state.is_in_play() && self.state != SnakeState::Dying {
            info!("Snake {} ({}) is dying", self.id, self.name);
            self.state = SnakeState::Dying;
        }
    }

    /// Clears the whole body and ends the snake.
    pub fn die(&mut self, grid: &mut GridMap) -> EngineResult<()> {
        while !self.body.is_empty() {
            self.remove_from_tail(grid)?;
        }
        self.state = SnakeState::Dead;
        info!("Snake {} ({}) removed from the grid", self.id, self.name);
        Ok(())
    }

    pub fn flush(&mut self) {
        self.pending_added.clear();
        self.pending_removed.clear();
    }

    fn place_at_tail(&mut self, grid: &mut GridMap, cell: Coordinate) -> EngineResult<()> {
        grid.mark_mut(cell)?.snake_count += 1;
        self.body.push_back(cell);
        self.pending_added.push(cell);
        Ok(())
    }
}
