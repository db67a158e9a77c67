//! Server network layer: UDP transport in front of the tick engine
//!
//! The engine never calls into this module. Diffs arrive through the engine's
//! subscriber channel and are fanned out to every client by a sender task.

use crate::client_manager::ClientManager;
use crate::error::PlayerId;
use crate::game_loop::SharedEngine;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, VersionDiff, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// How often departed players are checked for removal from the engine
const REAP_INTERVAL: Duration = Duration::from_secs(1);

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: PlayerId },
    Shutdown,
}

/// Messages queued for the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
    },
}

pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    engine: SharedEngine,
    /// Players whose snakes must finish dying before removal
    departed: Vec<PlayerId>,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(
        addr: &str,
        engine: SharedEngine,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            engine,
            departed: Vec::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// A sender that can ask the running server to shut down
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn spawn_network_sender(&mut self) {
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    /// Forwards every published diff to all clients
    async fn spawn_diff_forwarder(&self) {
        let mut diffs = self.engine.write().await.subscribe();
        let game_tx = self.game_tx.clone();

        tokio::spawn(async move {
            while let Some(diff) = diffs.recv().await {
                let packet = Packet::Diff {
                    diff: VersionDiff::clone(&diff),
                };
                if let Err(e) = game_tx.send(GameMessage::BroadcastPacket { packet }) {
                    error!("Failed to queue diff {}: {}", diff.version, e);
                    break;
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        if data.len() > MAX_DATAGRAM_SIZE {
            return Err(format!("packet of {} bytes exceeds datagram limit", data.len()).into());
        }
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn send_snapshot(&self, addr: SocketAddr) {
        let snapshot = self.engine.write().await.snapshot();
        self.send_packet(
            Packet::Snapshot {
                snapshot: VersionDiff::clone(&snapshot),
            },
            addr,
        );
    }

    async fn client_at(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.clients.write().await.touch(addr)
    }

    /// Kills the player's snake and queues it for removal once dead
    async fn retire_player(&mut self, client_id: PlayerId) {
        if let Err(e) = self.engine.write().await.kill_player(client_id) {
            warn!("Could not retire player {}: {}", client_id, e);
            return;
        }
        self.departed.push(client_id);
    }

    async fn reap_departed(&mut self) {
        if self.departed.is_empty() {
            return;
        }
        let mut engine = self.engine.write().await;
        self.departed
            .retain(|id| engine.remove_player(*id).is_err() && engine.player(*id).is_some());
    }

    /// Processes incoming packets
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                name,
            } => {
                info!(
                    "Client {} connecting from {} (version: {})",
                    name, addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    self.send_packet(
                        Packet::Disconnected {
                            reason: format!("Unsupported protocol version {}", client_version),
                        },
                        addr,
                    );
                    return;
                }

                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    self.clients.write().await.remove_client(&existing_id);
                    self.retire_player(existing_id).await;
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr, name.clone())
                };

                let Some(client_id) = client_id else {
                    self.send_packet(
                        Packet::Disconnected {
                            reason: "Server full".to_string(),
                        },
                        addr,
                    );
                    return;
                };

                let registered = self
                    .engine
                    .write()
                    .await
                    .register_player(client_id, name)
                    .map(|snake| snake.spawn());

                match registered {
                    Ok(spawn) => {
                        debug!("Client {} spawns at {}", client_id, spawn);
                        self.send_packet(Packet::Connected { client_id }, addr);
                        self.send_snapshot(addr).await;
                    }
                    Err(e) => {
                        error!("Failed to register client {}: {}", client_id, e);
                        self.clients.write().await.remove_client(&client_id);
                        self.send_packet(
                            Packet::Disconnected {
                                reason: e.to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            Packet::Control { code } => {
                let Some(client_id) = self.client_at(addr).await else {
                    warn!("Control from unknown address {}", addr);
                    return;
                };
                // unknown ids are logged by the engine
                let _ = self.engine.write().await.set_direction(client_id, code);
            }

            Packet::SnapshotRequest => {
                if self.client_at(addr).await.is_some() {
                    self.send_snapshot(addr).await;
                }
            }

            Packet::HistoryRequest { versions } => {
                if self.client_at(addr).await.is_none() {
                    return;
                }
                let diffs = self
                    .engine
                    .read()
                    .await
                    .versions(&versions)
                    .iter()
                    .map(|diff| VersionDiff::clone(diff))
                    .collect();
                self.send_packet(Packet::History { diffs }, addr);
            }

            Packet::Heartbeat { .. } => {
                self.client_at(addr).await;
            }

            Packet::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    self.clients.write().await.remove_client(&client_id);
                    self.retire_player(client_id).await;
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Main server loop
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();
        self.spawn_diff_forwarder().await;

        let mut reap_interval = interval(REAP_INTERVAL);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            self.retire_player(client_id).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = reap_interval.tick() => {
                    self.reap_departed().await;
                },
            }
        }

        Ok(())
    }
}
