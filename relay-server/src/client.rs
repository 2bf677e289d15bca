//! Connected clients and their registry.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

/// A connected client.
///
/// The handle is shared between the connection thread and the channel
/// broadcast workers; outgoing frames go through the outbound queue, which
/// only the connection thread drains onto the socket.
pub struct ClientHandle {
    pub id: u32,
    username: Mutex<String>,
    admin: AtomicBool,
    connected: AtomicBool,
    channels: Mutex<Vec<u32>>,
    outbound: Mutex<VecDeque<Vec<u8>>>,
}

impl ClientHandle {
    fn new(id: u32) -> Self {
        Self {
            id,
            username: Mutex::new(format!("user0{id}")),
            admin: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            channels: Mutex::new(Vec::new()),
            outbound: Mutex::new(VecDeque::new()),
        }
    }

    pub fn username(&self) -> String {
        self.username.lock().clone()
    }

    /// Rename to `{name}@{id}` and return the assigned username.
    pub fn rename(&self, name: &str) -> String {
        let username = format!("{name}@{}", self.id);
        *self.username.lock() = username.clone();
        username
    }

    pub fn is_admin(&self) -> bool {
        self.admin.load(Ordering::Acquire)
    }

    pub fn set_admin(&self) {
        debug!("{} registered as an admin", self.username());
        self.admin.store(true, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
        debug!("{} connection status changed: {connected}", self.username());
    }

    pub fn add_channel(&self, channel_id: u32) {
        let mut channels = self.channels.lock();
        if !channels.contains(&channel_id) {
            channels.push(channel_id);
        }
    }

    pub fn remove_channel(&self, channel_id: u32) {
        self.channels.lock().retain(|id| *id != channel_id);
    }

    pub fn is_member(&self, channel_id: u32) -> bool {
        self.channels.lock().contains(&channel_id)
    }

    pub fn channel_ids(&self) -> Vec<u32> {
        self.channels.lock().clone()
    }

    /// Queue a frame for delivery.
    pub fn push_packet(&self, frame: Vec<u8>) {
        self.outbound.lock().push_back(frame);
    }

    /// Take every queued frame. Called by the connection thread only.
    pub fn drain_outbound(&self) -> Vec<Vec<u8>> {
        self.outbound.lock().drain(..).collect()
    }
}

/// Registry of connected clients.
pub struct ClientRegistry {
    max_clients: usize,
    next_id: AtomicU32,
    clients: DashMap<u32, Arc<ClientHandle>>,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            max_clients,
            next_id: AtomicU32::new(1),
            clients: DashMap::new(),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.clients.len() < self.max_clients
    }

    pub fn add(&self) -> Arc<ClientHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let client = Arc::new(ClientHandle::new(id));
        self.clients.insert(id, Arc::clone(&client));
        client
    }

    pub fn remove(&self, id: u32) -> Option<Arc<ClientHandle>> {
        self.clients.remove(&id).map(|(_, client)| client)
    }

    pub fn find(&self, id: u32) -> Option<Arc<ClientHandle>> {
        self.clients.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn count(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_renamed_username() {
        let registry = ClientRegistry::new(10);
        let client = registry.add();

        assert_eq!(client.username(), "user01");
        assert_eq!(client.rename("alice"), "alice@1");
        assert_eq!(client.username(), "alice@1");
    }

    #[test]
    fn test_capacity() {
        let registry = ClientRegistry::new(10);
        for _ in 0..10 {
            registry.add();
        }
        assert!(!registry.has_capacity());

        let last = registry.add();
        registry.remove(last.id);
        assert!(registry.has_capacity());
    }

    #[test]
    fn test_membership() {
        let registry = ClientRegistry::new(10);
        let client = registry.add();

        client.add_channel(4);
        client.add_channel(4);
        assert!(client.is_member(4));
        assert_eq!(client.channel_ids(), vec![4]);

        client.remove_channel(4);
        assert!(!client.is_member(4));
    }

    #[test]
    fn test_outbound_queue_order() {
        let registry = ClientRegistry::new(10);
        let client = registry.add();

        client.push_packet(vec![1]);
        client.push_packet(vec![2]);
        assert_eq!(client.drain_outbound(), vec![vec![1], vec![2]]);
        assert!(client.drain_outbound().is_empty());
    }
}
