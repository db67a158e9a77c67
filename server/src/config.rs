//! Engine construction parameters
//!
//! All values are fixed once a [`TickEngine`](crate::engine::TickEngine) is built.
//! [`EngineConfig::validate`] rejects combinations the engine cannot run with.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_WIDTH: i32 = 400;
pub const DEFAULT_HEIGHT: i32 = 300;
pub const DEFAULT_TICK_MS: u64 = 200;
pub const DEFAULT_BODY_LENGTH: usize = 3;
pub const DEFAULT_FOOD_COUNT: usize = 10;
pub const DEFAULT_HISTORY_DEPTH: usize = 20;
pub const DEFAULT_SPAWN_MARGIN: i32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of columns
    pub width: i32,
    /// Number of rows
    pub height: i32,
    pub tick_interval_ms: u64,
    pub initial_body_length: usize,
    pub target_food_count: usize,
    pub history_depth: usize,
    /// Distance kept between a random spawn point and each edge
    pub spawn_margin: i32,
    /// Seed for reproducible spawns and food placement
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            tick_interval_ms: DEFAULT_TICK_MS,
            initial_body_length: DEFAULT_BODY_LENGTH,
            target_food_count: DEFAULT_FOOD_COUNT,
            history_depth: DEFAULT_HISTORY_DEPTH,
            spawn_margin: DEFAULT_SPAWN_MARGIN,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Convenience constructor for a grid of the given size with default rules
    pub fn with_size(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn cell_count(&self) -> usize {
        (self.width.max(0) as usize) * (self.height.max(0) as usize)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.width < 3 || self.height < 3 {
            return Err(EngineError::Configuration(format!(
                "grid must be at least 3x3, got {}x{}",
                self.width, self.height
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(EngineError::Configuration(
                "tick interval must be positive".to_string(),
            ));
        }
        if self.initial_body_length == 0 {
            return Err(EngineError::Configuration(
                "initial body length must be at least 1".to_string(),
            ));
        }
        if self.initial_body_length > (self.width - 2) as usize {
            return Err(EngineError::Configuration(format!(
                "initial body length {} does not fit a grid {} columns wide",
                self.initial_body_length, self.width
            )));
        }
        if self.history_depth == 0 {
            return Err(EngineError::Configuration(
                "history depth must be at least 1".to_string(),
            ));
        }
        if self.spawn_margin < 0 {
            return Err(EngineError::Configuration(
                "spawn margin must not be negative".to_string(),
            ));
        }
        let interior = ((self.width - 2) * (self.height - 2)) as usize;
        if self.target_food_count >= interior {
            return Err(EngineError::Configuration(format!(
                "target food count {} leaves no room on a {}-cell interior",
                self.target_food_count, interior
            )));
        }
        Ok(())
    }
}
