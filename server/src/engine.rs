//! Authoritative tick engine
//!
//! The engine owns the grid, every snake, the active food, the version counter
//! and the diff history. One call to [`TickEngine::tick`] runs five phases in
//! order:
//!
//! 1. **Advance** every snake according to its state.
//! 2. **Rules**: each coordinate a snake added this tick is checked for body
//!    collision, then the border, then food. The first match wins.
//! 3. **Replenish** food up to the configured target.
//! 4. **Version**: a non-empty change-set becomes the next [`VersionDiff`],
//!    archived in history and published to subscribers.
//! 5. **Cleanup** of every snake's per-tick buffers.
//!
//! A snake that fails to advance is logged and sent to Dying; the other snakes
//! and the remaining phases still run. Errors from phases 2-4 are contained at
//! the tick boundary and logged. Cleanup runs regardless.

use crate::config::EngineConfig;
use crate::encoder::VersionEncoder;
use crate::error::{EngineError, EngineResult, PlayerId};
use crate::food::{Food, FoodSpawner};
use crate::grid::GridMap;
use crate::history::VersionHistory;
use crate::snake::{SnakeEntity, SnakeState};
use crate::utils::get_timestamp;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Coordinate, Direction, VersionDiff};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outcome of checking one newly added head coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleOutcome {
    Collision,
    Boundary,
    Food,
    Clear,
}

/// What a single tick produced
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub diff: Option<Arc<VersionDiff>>,
    /// First error seen this tick, whether it aborted the tick or only one snake
    pub error: Option<EngineError>,
}

impl TickReport {
    pub fn version(&self) -> Option<u64> {
        self.diff.as_ref().map(|d| d.version)
    }
}

pub struct TickEngine {
    config: EngineConfig,
    grid: GridMap,
    snakes: Vec<SnakeEntity>,
    index: HashMap<PlayerId, usize>,
    food: FoodSpawner,
    encoder: VersionEncoder,
    history: VersionHistory,
    current_version: u64,
    tick_count: u64,
    rng: StdRng,
    subscribers: Vec<mpsc::UnboundedSender<Arc<VersionDiff>>>,
}

impl TickEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "Engine created: {}x{} grid, {}ms ticks, {} food, history {}",
            config.width,
            config.height,
            config.tick_interval_ms,
            config.target_food_count,
            config.history_depth
        );

        Ok(Self {
            grid: GridMap::new(config.width, config.height),
            snakes: Vec::new(),
            index: HashMap::new(),
            food: FoodSpawner::new(config.target_food_count),
            encoder: VersionEncoder::new(),
            history: VersionHistory::new(config.history_depth),
            current_version: 0,
            tick_count: 0,
            rng,
            subscribers: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn current_version(&self) -> u64 {
        self.current_version
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn food(&self) -> &[Food] {
        self.food.foods()
    }

    pub fn player(&self, id: PlayerId) -> Option<&SnakeEntity> {
        self.index.get(&id).map(|&slot| &self.snakes[slot])
    }

    /// Snakes in registration order
    pub fn players(&self) -> impl Iterator<Item = &SnakeEntity> + '_ {
        self.snakes.iter()
    }

    pub fn player_count(&self) -> usize {
        self.snakes.len()
    }

    /// Opens a channel that receives every diff published from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Arc<VersionDiff>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Registers a player at a random interior spawn point, facing right.
    pub fn register_player(
        &mut self,
        id: PlayerId,
        name: impl Into<String>,
    ) -> EngineResult<&SnakeEntity> {
        let spawn = self.random_spawn();
        self.register_player_at(id, name, spawn, Direction::Right)
    }

    /// Registers a player with an explicit spawn cell and heading.
    ///
    /// A duplicate id is rejected while the existing snake is still in play;
    /// a dead snake is replaced in its registration slot.
    pub fn register_player_at(
        &mut self,
        id: PlayerId,
        name: impl Into<String>,
        spawn: Coordinate,
        direction: Direction,
    ) -> EngineResult<&SnakeEntity> {
        if !self.grid.contains(spawn) {
            return Err(EngineError::OutOfBounds(spawn));
        }

        let snake = SnakeEntity::new(
            id,
            name,
            spawn,
            self.config.initial_body_length,
            direction,
        );
        if let Some(outside) = snake
            .initial_cells()
            .into_iter()
            .find(|&cell| !self.grid.contains(cell))
        {
            warn!("Rejected spawn at {} for player {}: body leaves the grid", spawn, id);
            return Err(EngineError::OutOfBounds(outside));
        }

        let slot = match self.index.get(&id).copied() {
            Some(slot) if self.snakes[slot].state().is_in_play() => {
                warn!("Rejected duplicate registration for player {}", id);
                return Err(EngineError::DuplicatePlayer(id));
            }
            Some(slot) => {
                info!("Player {} ({}) respawning at {}", id, snake.name(), spawn);
                self.snakes[slot] = snake;
                slot
            }
            None => {
                info!("Player {} ({}) registered at {}", id, snake.name(), spawn);
                self.snakes.push(snake);
                let slot = self.snakes.len() - 1;
                self.index.insert(id, slot);
                slot
            }
        };

        Ok(&self.snakes[slot])
    }

    /// Applies an arrow-key style direction code to a player.
    ///
    /// Unknown codes and straight reversals are ignored; the return value says
    /// whether the heading was accepted.
    pub fn set_direction(&mut self, id: PlayerId, code: u32) -> EngineResult<bool> {
        let slot = self.slot_of(id)?;
        let Some(direction) = Direction::from_key_code(code) else {
            debug!("Ignoring unknown direction code {} from player {}", code, id);
            return Ok(false);
        };
        Ok(self.snakes[slot].set_direction(direction))
    }

    pub fn steer(&mut self, id: PlayerId, direction: Direction) -> EngineResult<bool> {
        let slot = self.slot_of(id)?;
        Ok(self.snakes[slot].set_direction(direction))
    }

    /// Sends a player's snake to Dying; its body clears on the next tick.
    pub fn kill_player(&mut self, id: PlayerId) -> EngineResult<()> {
        let slot = self.slot_of(id)?;
        let snake = &mut self.snakes[slot];
        match snake.state() {
            // no body on the grid yet, nothing to clear
            SnakeState::Inactive => {
                info!("Player {} left before spawning", id);
                snake.die(&mut self.grid)
            }
            _ => {
                snake.dying();
                Ok(())
            }
        }
    }

    /// Removes a dead player from the engine.
    pub fn remove_player(&mut self, id: PlayerId) -> EngineResult<SnakeEntity> {
        let slot = self.slot_of(id)?;
        if self.snakes[slot].state().is_in_play() {
            return Err(EngineError::PlayerInPlay(id));
        }

        let snake = self.snakes.remove(slot);
        self.index.remove(&id);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        info!("Player {} ({}) removed", id, snake.name());
        Ok(snake)
    }

    /// Places food on a specific empty cell, outside the regular replenish pass.
    pub fn place_food(&mut self, coord: Coordinate) -> EngineResult<Food> {
        self.food.place_food(&mut self.grid, coord)
    }

    /// The full-grid snapshot for the current version, rebuilt lazily.
    pub fn snapshot(&mut self) -> Arc<VersionDiff> {
        self.encoder
            .snapshot(&self.grid, self.current_version, get_timestamp())
    }

    /// Archived diffs for the requested versions; unknown versions are omitted.
    pub fn versions(&self, versions: &[u64]) -> Vec<Arc<VersionDiff>> {
        self.history.versions(versions)
    }

    /// Runs one full tick. Never fails; errors are logged and reported.
    pub fn tick(&mut self) -> TickReport {
        self.tick_count += 1;
        let mut report = TickReport {
            tick: self.tick_count,
            ..TickReport::default()
        };

        if let Err(e) = self.run_phases(&mut report) {
            error!("Tick {} aborted: {}", self.tick_count, e);
            report.error = Some(e);
        }

        for snake in &mut self.snakes {
            snake.flush();
        }

        report
    }

    fn run_phases(&mut self, report: &mut TickReport) -> EngineResult<()> {
        report.error = self.advance();
        let mut changes = self.apply_rules()?;
        self.replenish_food(&mut changes);
        report.diff = self.publish(changes);
        Ok(())
    }

    /// Moves every snake. A snake that cannot advance is sent to Dying so the
    /// rest of the tick still runs; the first such error is returned.
    fn advance(&mut self) -> Option<EngineError> {
        let mut first = None;
        for snake in &mut self.snakes {
            if let Err(e) = snake.advance(&mut self.grid) {
                error!("Snake {} could not advance: {}", snake.id(), e);
                snake.dying();
                first.get_or_insert(e);
            }
        }
        first
    }

    fn apply_rules(&mut self) -> EngineResult<ChangeSet> {
        let mut changes = ChangeSet::default();

        for slot in 0..self.snakes.len() {
            let added = self.snakes[slot].pending_added().to_vec();
            for coord in added.iter().copied() {
                match self.evaluate(coord) {
                    RuleOutcome::Collision | RuleOutcome::Boundary => {
                        self.snakes[slot].dying();
                    }
                    RuleOutcome::Food => {
                        self.food.digest_food(&mut self.grid, coord)?;
                        self.snakes[slot].grow();
                    }
                    RuleOutcome::Clear => {}
                }
            }

            let snake = &self.snakes[slot];
            changes.extend(snake.pending_added());
            changes.extend(snake.pending_removed());
        }

        Ok(changes)
    }

    fn evaluate(&self, coord: Coordinate) -> RuleOutcome {
        let mark = self.grid.mark_at(coord);
        if mark.snake_count > 1 {
            RuleOutcome::Collision
        } else if self.grid.is_border(coord) {
            RuleOutcome::Boundary
        } else if mark.has_food() {
            RuleOutcome::Food
        } else {
            RuleOutcome::Clear
        }
    }

    fn replenish_food(&mut self, changes: &mut ChangeSet) {
        while self.food.needs_food() {
            match self.food.grant_food(&mut self.grid, &mut self.rng) {
                Ok(food) => changes.push(food.coord),
                Err(e) => {
                    warn!("Food replenishment deferred: {}", e);
                    break;
                }
            }
        }
    }

    fn publish(&mut self, changes: ChangeSet) -> Option<Arc<VersionDiff>> {
        if changes.is_empty() {
            return None;
        }

        let version = self.current_version + 1;
        let diff = Arc::new(self.encoder.encode_version(
            &self.grid,
            version,
            get_timestamp(),
            changes.as_slice(),
        ));

        self.history.push(Arc::clone(&diff));
        self.current_version = version;
        self.encoder.invalidate();
        self.notify(&diff);

        Some(diff)
    }

    fn notify(&mut self, diff: &Arc<VersionDiff>) {
        self.subscribers.retain(|subscriber| {
            match subscriber.send(Arc::clone(diff)) {
                Ok(()) => true,
                Err(e) => {
                    let error = EngineError::ListenerNotification(e.to_string());
                    error!("Dropping subscriber for version {}: {}", diff.version, error);
                    false
                }
            }
        });
    }

    fn slot_of(&self, id: PlayerId) -> EngineResult<usize> {
        self.index.get(&id).copied().ok_or_else(|| {
            warn!("Command for unknown player {}", id);
            EngineError::UnknownPlayer(id)
        })
    }

    /// Picks a spawn cell `spawn_margin` away from every edge. On grids too
    /// small for the margin it shrinks so the initial body still fits.
    fn random_spawn(&mut self) -> Coordinate {
        let width = self.config.width;
        let height = self.config.height;
        let length = self.config.initial_body_length as i32;

        let row_margin = self.config.spawn_margin.clamp(1, ((height - 1) / 2).max(1));
        let row_lo = row_margin;
        let row_hi = (height - 1 - row_margin).max(row_lo);

        let col_margin = self.config.spawn_margin.clamp(1, ((width - 1) / 2).max(1));
        let col_lo = col_margin.max(length);
        let col_hi = (width - 1 - col_margin).max(col_lo);

        Coordinate::new(
            self.rng.gen_range(row_lo..=row_hi),
            self.rng.gen_range(col_lo..=col_hi),
        )
    }
}

/// Ordered, duplicate-free set of coordinates touched in one tick
#[derive(Debug, Default)]
struct ChangeSet {
    order: Vec<Coordinate>,
    seen: HashSet<Coordinate>,
}

impl ChangeSet {
    fn push(&mut self, coord: Coordinate) {
        if self.seen.insert(coord) {
            self.order.push(coord);
        }
    }

    fn extend(&mut self, coords: &[Coordinate]) {
        for &coord in coords {
            self.push(coord);
        }
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn as_slice(&self) -> &[Coordinate] {
        &self.order
    }
}
