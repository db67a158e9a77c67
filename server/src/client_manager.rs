//! Client connection tracking for the UDP transport
//!
//! This module keeps the roster of connected clients:
//! - Client connection lifecycle (connect, disconnect, timeout)
//! - Address lookup for routing incoming datagrams to a player id
//! - Capacity limits
//!
//! Client ids double as engine player ids.

use crate::error::PlayerId;
use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: PlayerId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Display name sent in the handshake
    pub name: String,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: PlayerId, addr: SocketAddr, name: String) -> Self {
        Self {
            id,
            addr,
            name,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// True if nothing was heard from this client within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Ids start at 1 and are never reused within a server run, so a departed
/// player's snake can finish dying without clashing with a newcomer.
pub struct ClientManager {
    clients: HashMap<PlayerId, Client>,
    next_client_id: PlayerId,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Returns the new client's id, or None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, name: String) -> Option<PlayerId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} ({}) connected from {}", client_id, name, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, name));

        Some(client_id)
    }

    /// Returns true if the client was present
    pub fn remove_client(&mut self, client_id: &PlayerId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} ({}) disconnected", client.id, client.name);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn get(&self, client_id: PlayerId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Refreshes the activity timestamp of the client at `addr`
    pub fn touch(&mut self, addr: SocketAddr) -> Option<PlayerId> {
        let client = self.clients.values_mut().find(|c| c.addr == addr)?;
        client.touch();
        Some(client.id)
    }

    /// Removes clients silent for longer than [`CLIENT_TIMEOUT`] and returns
    /// their ids.
    pub fn check_timeouts(&mut self) -> Vec<PlayerId> {
        self.expire(CLIENT_TIMEOUT)
    }

    pub fn expire(&mut self, timeout: Duration) -> Vec<PlayerId> {
        let timed_out: Vec<PlayerId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// All client ids and addresses, for broadcasting
    pub fn get_client_addrs(&self) -> Vec<(PlayerId, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Client::new(1, test_addr(), "a".to_string());
        assert!(!client.is_timed_out(Duration::from_secs(1)));

        client.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(client.is_timed_out(Duration::from_secs(1)));

        client.touch();
        assert!(!client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_add_multiple_clients() {
        let mut manager = ClientManager::new(3);
        let id1 = manager.add_client(test_addr(), "a".to_string()).unwrap();
        let id2 = manager.add_client(test_addr2(), "b".to_string()).unwrap();

        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.get(2).unwrap().name, "b");
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);
        assert!(manager.add_client(test_addr(), "a".to_string()).is_some());
        assert!(manager.add_client(test_addr2(), "b".to_string()).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut manager = ClientManager::new(2);
        let id1 = manager.add_client(test_addr(), "a".to_string()).unwrap();
        assert!(manager.remove_client(&id1));
        let id2 = manager.add_client(test_addr(), "a".to_string()).unwrap();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_remove_nonexistent_client() {
        let mut manager = ClientManager::new(2);
        assert!(!manager.remove_client(&999));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_find_and_touch_by_addr() {
        let mut manager = ClientManager::new(2);
        let id1 = manager.add_client(test_addr(), "a".to_string()).unwrap();

        assert_eq!(manager.find_client_by_addr(test_addr()), Some(id1));
        assert_eq!(manager.find_client_by_addr(test_addr2()), None);
        assert_eq!(manager.touch(test_addr()), Some(id1));
        assert_eq!(manager.touch(test_addr2()), None);
    }

    #[test]
    fn test_expire_removes_silent_clients() {
        let mut manager = ClientManager::new(3);
        let id1 = manager.add_client(test_addr(), "a".to_string()).unwrap();
        let id2 = manager.add_client(test_addr2(), "b".to_string()).unwrap();
        manager.clients.get_mut(&id1).unwrap().last_seen =
            Instant::now() - Duration::from_secs(10);

        let expired = manager.check_timeouts();

        assert_eq!(expired, vec![id1]);
        assert_eq!(manager.len(), 1);
        assert!(manager.get(id2).is_some());
    }
}
