//! Headless client: joins, steers in a square and prints incoming diffs.

use bincode::{deserialize, serialize};
use clap::Parser;
use shared::{CellLabel, Direction, Packet, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    server: SocketAddr,
    /// Display name
    #[clap(short, long, default_value = "test-client")]
    name: String,
    /// Number of turns to make before disconnecting
    #[clap(short, long, default_value = "8")]
    turns: usize,
    /// Delay between turns in milliseconds
    #[clap(long, default_value = "1500")]
    turn_ms: u64,
}

fn print_packet(packet: &Packet) {
    match packet {
        Packet::Diff { diff } | Packet::Snapshot { snapshot: diff } => {
            println!(
                "version {} (full: {}): {} body, {} food, {} cleared",
                diff.version,
                diff.full,
                diff.coordinates(CellLabel::Lime).len(),
                diff.coordinates(CellLabel::Yellow).len(),
                diff.coordinates(CellLabel::Black).len()
            );
        }
        Packet::History { diffs } => {
            let versions: Vec<u64> = diffs.iter().map(|d| d.version).collect();
            println!("history: {:?}", versions);
        }
        other => println!("Received packet: {:?}", other),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let connect = Packet::Connect {
        client_version: PROTOCOL_VERSION,
        name: args.name.clone(),
    };
    socket.send_to(&serialize(&connect)?, args.server).await?;

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let (len, _) = timeout(Duration::from_secs(3), socket.recv_from(&mut buf)).await??;
    let client_id = match deserialize::<Packet>(&buf[..len])? {
        Packet::Connected { client_id } => client_id,
        other => {
            println!("Expected Connected but got: {:?}", other);
            return Ok(());
        }
    };
    println!("Connection accepted with client ID: {}", client_id);

    let route = [Direction::Up, Direction::Left, Direction::Down, Direction::Right];
    let mut turn_timer = interval(Duration::from_millis(args.turn_ms));
    turn_timer.tick().await;
    let mut turns = 0;
    let mut last_version = 0;

    while turns < args.turns {
        tokio::select! {
            _ = turn_timer.tick() => {
                let direction = route[turns % route.len()];
                let control = Packet::Control { code: direction.key_code() };
                socket.send_to(&serialize(&control)?, args.server).await?;
                println!("Turning {:?}", direction);
                turns += 1;

                if turns % 4 == 0 && last_version > 2 {
                    let request = Packet::HistoryRequest {
                        versions: vec![last_version - 2, last_version - 1],
                    };
                    socket.send_to(&serialize(&request)?, args.server).await?;
                }
            }
            received = socket.recv_from(&mut buf) => {
                let (len, _) = received?;
                match deserialize::<Packet>(&buf[..len]) {
                    Ok(packet) => {
                        if let Packet::Diff { diff } = &packet {
                            last_version = diff.version;
                        }
                        print_packet(&packet);
                    }
                    Err(e) => println!("Failed to deserialize packet: {}", e),
                }
            }
        }
    }

    socket
        .send_to(&serialize(&Packet::Disconnect)?, args.server)
        .await?;
    println!("Test client finished");

    Ok(())
}
