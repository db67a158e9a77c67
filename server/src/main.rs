use clap::Parser;
use log::{error, info};
use server::config::EngineConfig;
use server::engine::TickEngine;
use server::game_loop::GameLoop;
use server::network::Server;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Grid width in cells
    #[clap(long, default_value = "80")]
    width: i32,
    /// Grid height in cells
    #[clap(long, default_value = "80")]
    height: i32,
    /// Delay between ticks in milliseconds
    #[clap(short, long, default_value = "500")]
    tick_ms: u64,
    /// Number of food items kept on the grid
    #[clap(long, default_value = "10")]
    food: usize,
    /// Number of past diffs kept for catch-up requests
    #[clap(long, default_value = "20")]
    history: usize,
    /// Maximum number of connected clients
    #[clap(short, long, default_value = "32")]
    max_clients: usize,
    /// Seed for spawn points and food placement
    #[clap(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = EngineConfig {
        width: args.width,
        height: args.height,
        tick_interval_ms: args.tick_ms,
        target_food_count: args.food,
        history_depth: args.history,
        seed: args.seed,
        ..EngineConfig::default()
    };
    let interval = config.tick_interval();
    let engine = Arc::new(RwLock::new(TickEngine::new(config)?));

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, Arc::clone(&engine), args.max_clients).await?;

    let game_loop = GameLoop::start(Arc::clone(&engine), interval);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped with error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    if let Err(e) = game_loop.stop().await {
        error!("Game loop task panicked: {}", e);
    }

    Ok(())
}
