//! Fixed-delay tick scheduling
//!
//! One tokio task drives the engine. After each tick it sleeps for whatever is
//! left of the interval, so ticks never overlap and an overrunning tick simply
//! delays the next one.

use crate::engine::TickEngine;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub type SharedEngine = Arc<RwLock<TickEngine>>;

/// How often tick statistics are logged
const STATS_EVERY: u64 = 60;

pub struct GameLoop;

impl GameLoop {
    /// Spawns the tick task. The first tick runs one interval after start.
    pub fn start(engine: SharedEngine, interval: Duration) -> GameLoopHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(Self::run(engine, interval, stop_rx));
        info!("Game loop started with {:?} interval", interval);
        GameLoopHandle {
            stop_tx: Some(stop_tx),
            task,
        }
    }

    async fn run(engine: SharedEngine, interval: Duration, mut stop_rx: oneshot::Receiver<()>) {
        let mut delay = interval;
        let mut busiest = Duration::ZERO;

        loop {
            tokio::select! {
                _ = sleep(delay) => {}
                _ = &mut stop_rx => break,
            }

            let started = Instant::now();
            let report = {
                let mut engine = engine.write().await;
                engine.tick()
            };
            let elapsed = started.elapsed();
            busiest = busiest.max(elapsed);

            if elapsed > interval {
                warn!(
                    "Tick {} overran its interval: {:?} > {:?}",
                    report.tick, elapsed, interval
                );
            }
            if report.tick % STATS_EVERY == 0 {
                debug!(
                    "Tick {}: version {:?}, slowest tick {:?}",
                    report.tick,
                    report.version(),
                    busiest
                );
                busiest = Duration::ZERO;
            }

            delay = interval.saturating_sub(elapsed);
        }

        info!("Game loop stopped");
    }
}

pub struct GameLoopHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl GameLoopHandle {
    /// Cancels future ticks and waits for the loop to exit. A tick already in
    /// flight completes first.
    pub async fn stop(mut self) -> Result<(), tokio::task::JoinError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // the loop may already be gone
            let _ = stop_tx.send(());
        }
        self.task.await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use shared::{Coordinate, Direction};

    fn shared_engine() -> SharedEngine {
        let config = EngineConfig {
            target_food_count: 0,
            seed: Some(1),
            ..EngineConfig::with_size(40, 40)
        };
        Arc::new(RwLock::new(TickEngine::new(config).unwrap()))
    }

    #[tokio::test]
    async fn test_loop_ticks_and_stops() {
        let engine = shared_engine();
        engine
            .write()
            .await
            .register_player_at(1, "looper", Coordinate::new(20, 5), Direction::Right)
            .unwrap();
        let mut rx = engine.write().await.subscribe();

        let handle = GameLoop::start(Arc::clone(&engine), Duration::from_millis(5));
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);

        handle.stop().await.unwrap();
        let ticks = engine.read().await.tick_count();
        sleep(Duration::from_millis(30)).await;
        assert_eq!(engine.read().await.tick_count(), ticks);
    }

    #[tokio::test]
    async fn test_stop_before_first_tick() {
        let engine = shared_engine();
        let handle = GameLoop::start(Arc::clone(&engine), Duration::from_secs(60));
        handle.stop().await.unwrap();
        assert_eq!(engine.read().await.tick_count(), 0);
    }

    #[test]
    fn test_stop_handle_with_tokio_test_runtime() {
        let engine = shared_engine();
        tokio_test::block_on(async {
            let handle = GameLoop::start(Arc::clone(&engine), Duration::from_millis(1));
            sleep(Duration::from_millis(20)).await;
            handle.stop().await.unwrap();
        });
        assert!(tokio_test::block_on(engine.read()).tick_count() > 0);
    }
}
