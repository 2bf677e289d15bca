//! Channels, their broadcast workers, and the channel registry.
//!
//! Moderation model: moderators have elevated privileges inside a channel;
//! admins (clients that presented the server secret) outrank them
//! everywhere. If a channel is secret, a client can only join after a
//! moderator invited it; the invitation is consumed by the join.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use relay_proto::{BroadcastPayload, ChannelInfo, ChannelView, PacketKind, Response};

use crate::client::{ClientHandle, ClientRegistry};

/// Member cap per channel.
pub const MAX_CAPACITY: usize = 50;

/// Outcome of a join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Success,
    Banned,
    Full,
    Secret,
}

/// Outcome of a moderation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationOutcome {
    Success,
    NotFound,
    Unauthorized,
}

/// State shared with the broadcast worker thread.
struct ChannelShared {
    members: Mutex<Vec<u32>>,
    queue: Mutex<VecDeque<Vec<u8>>>,
    queue_cv: Condvar,
    stop: AtomicBool,
}

/// A chat channel.
pub struct Channel {
    pub id: u32,
    name: Mutex<String>,
    secret: AtomicBool,
    pinned: Mutex<String>,
    moderators: Mutex<Vec<u32>>,
    banned: Mutex<Vec<u32>>,
    invitations: Mutex<Vec<u32>>,
    packet_ids: AtomicI32,
    clients: Arc<ClientRegistry>,
    shared: Arc<ChannelShared>,
    worker: Option<JoinHandle<()>>,
}

impl Channel {
    pub fn new(id: u32, name: String, secret: bool, clients: Arc<ClientRegistry>) -> Self {
        debug!("channel created: {name}");

        let shared = Arc::new(ChannelShared {
            members: Mutex::new(Vec::new()),
            queue: Mutex::new(VecDeque::new()),
            queue_cv: Condvar::new(),
            stop: AtomicBool::new(false),
        });

        let worker = thread::spawn({
            let shared = Arc::clone(&shared);
            let clients = Arc::clone(&clients);
            move || broadcast_worker(&shared, &clients)
        });

        Self {
            id,
            name: Mutex::new(name),
            secret: AtomicBool::new(secret),
            pinned: Mutex::new(String::new()),
            moderators: Mutex::new(Vec::new()),
            banned: Mutex::new(Vec::new()),
            invitations: Mutex::new(Vec::new()),
            packet_ids: AtomicI32::new(1),
            clients,
            shared,
            worker: Some(worker),
        }
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn is_secret(&self) -> bool {
        self.secret.load(Ordering::Acquire)
    }

    pub fn pinned(&self) -> String {
        self.pinned.lock().clone()
    }

    pub fn member_count(&self) -> usize {
        self.shared.members.lock().len()
    }

    pub fn info(&self) -> ChannelInfo {
        ChannelInfo {
            id: self.id,
            secret: self.is_secret(),
            name: self.name(),
        }
    }

    pub fn view(&self) -> ChannelView {
        ChannelView {
            id: self.id,
            secret: self.is_secret(),
            name: self.name(),
        }
    }

    /// Attempt to add a member.
    ///
    /// Capacity is checked before secrecy so a full channel does not consume
    /// an invitation. Joining a secret channel consumes the invitation.
    pub fn join(&self, client: &ClientHandle) -> JoinOutcome {
        if self.banned.lock().contains(&client.id) {
            return JoinOutcome::Banned;
        }

        let mut members = self.shared.members.lock();
        if members.len() >= MAX_CAPACITY {
            return JoinOutcome::Full;
        }

        if self.is_secret() {
            let mut invitations = self.invitations.lock();
            let before = invitations.len();
            invitations.retain(|id| *id != client.id);
            if invitations.len() == before {
                return JoinOutcome::Secret;
            }
        }

        if !members.contains(&client.id) {
            members.push(client.id);
        }
        JoinOutcome::Success
    }

    /// Remove a member from the member and moderator pools.
    pub fn leave(&self, client_id: u32) {
        self.shared.members.lock().retain(|id| *id != client_id);
        self.moderators.lock().retain(|id| *id != client_id);
    }

    /// Whether the actor has moderator authority here (moderator or admin).
    pub fn is_moderator(&self, client: &ClientHandle) -> bool {
        client.is_admin() || self.moderators.lock().contains(&client.id)
    }

    /// Queue a channel message for broadcast to every member.
    pub fn queue_message(&self, message: BroadcastPayload) {
        let packet_id = self.packet_ids.fetch_add(1, Ordering::Relaxed);
        let response = Response::new(packet_id, PacketKind::ChMessage, message.encode());

        let mut queue = self.shared.queue.lock();
        queue.push_back(response.encode());
        self.shared.queue_cv.notify_one();
    }

    // Moderation commands

    /// Kick a member. Moderators cannot kick moderators; admins can.
    pub fn kick(&self, actor: &ClientHandle, target_id: u32) -> ModerationOutcome {
        if !self.shared.members.lock().contains(&target_id) {
            return ModerationOutcome::NotFound;
        }
        let target_is_moderator = self.moderators.lock().contains(&target_id);
        if (target_is_moderator && !actor.is_admin()) || !self.is_moderator(actor) {
            return ModerationOutcome::Unauthorized;
        }

        self.leave(target_id);
        if let Some(target) = self.clients.find(target_id) {
            debug!("{} was kicked from: {}", target.username(), self.name());
            target.remove_channel(self.id);
        }
        ModerationOutcome::Success
    }

    /// Invite a client, letting it join while the channel is secret.
    pub fn invite(&self, actor: &ClientHandle, target_id: u32) -> ModerationOutcome {
        if !self.is_moderator(actor) {
            return ModerationOutcome::Unauthorized;
        }
        let mut invitations = self.invitations.lock();
        if !invitations.contains(&target_id) {
            invitations.push(target_id);
        }
        ModerationOutcome::Success
    }

    /// Promote a member to moderator. Admin only.
    pub fn promote(&self, actor: &ClientHandle, target_id: u32) -> ModerationOutcome {
        if !actor.is_admin() {
            return ModerationOutcome::Unauthorized;
        }
        if !self.shared.members.lock().contains(&target_id) {
            return ModerationOutcome::NotFound;
        }
        let mut moderators = self.moderators.lock();
        if !moderators.contains(&target_id) {
            moderators.push(target_id);
            debug!("member promoted to moderator: {} -> {target_id}", self.name());
        }
        ModerationOutcome::Success
    }

    /// Ban a member: kick plus blacklist. Same authority rules as kick.
    pub fn ban(&self, actor: &ClientHandle, target_id: u32) -> ModerationOutcome {
        match self.kick(actor, target_id) {
            ModerationOutcome::Success => {
                let mut banned = self.banned.lock();
                if !banned.contains(&target_id) {
                    banned.push(target_id);
                }
                ModerationOutcome::Success
            }
            other => other,
        }
    }

    /// Lift a ban.
    pub fn unban(&self, actor: &ClientHandle, target_id: u32) -> ModerationOutcome {
        if !self.is_moderator(actor) {
            return ModerationOutcome::Unauthorized;
        }
        let mut banned = self.banned.lock();
        let before = banned.len();
        banned.retain(|id| *id != target_id);
        if banned.len() == before {
            return ModerationOutcome::NotFound;
        }
        ModerationOutcome::Success
    }

    /// Toggle the secret flag. Admin only.
    pub fn set_privacy(&self, actor: &ClientHandle) -> ModerationOutcome {
        if !actor.is_admin() {
            return ModerationOutcome::Unauthorized;
        }
        self.secret.fetch_xor(true, Ordering::AcqRel);
        debug!("{} privacy has changed", self.name());
        ModerationOutcome::Success
    }

    /// Replace the pinned message.
    pub fn set_pinned(&self, actor: &ClientHandle, text: String) -> ModerationOutcome {
        if !self.is_moderator(actor) {
            return ModerationOutcome::Unauthorized;
        }
        *self.pinned.lock() = text;
        ModerationOutcome::Success
    }

    /// Rename the channel.
    pub fn rename(&self, actor: &ClientHandle, name: String) -> ModerationOutcome {
        if !self.is_moderator(actor) {
            return ModerationOutcome::Unauthorized;
        }
        *self.name.lock() = name;
        ModerationOutcome::Success
    }

    #[cfg(test)]
    fn invitation_count(&self) -> usize {
        self.invitations.lock().len()
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        let name = self.name();
        let farewell =
            Response::new(0, PacketKind::ChDelete, format!("{name} has been deleted").into_bytes());
        let frame = farewell.encode();

        let members = self.shared.members.lock().clone();
        for member_id in members {
            if let Some(client) = self.clients.find(member_id) {
                client.remove_channel(self.id);
                if client.is_connected() {
                    client.push_packet(frame.clone());
                }
            }
        }

        self.shared.stop.store(true, Ordering::Release);
        self.shared.queue_cv.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }

        debug!("channel destroyed: {name}");
    }
}

/// Drains the channel queue and fans each packet out to the outbound queue
/// of every connected member.
fn broadcast_worker(shared: &ChannelShared, clients: &ClientRegistry) {
    loop {
        let batch: Vec<Vec<u8>> = {
            let mut queue = shared.queue.lock();
            while queue.is_empty() && !shared.stop.load(Ordering::Acquire) {
                shared.queue_cv.wait(&mut queue);
            }
            if shared.stop.load(Ordering::Acquire) {
                return;
            }
            queue.drain(..).collect()
        };

        let members = shared.members.lock().clone();
        for frame in batch {
            for member_id in &members {
                if let Some(client) = clients.find(*member_id) {
                    if client.is_connected() {
                        client.push_packet(frame.clone());
                    }
                }
            }
        }
    }
}

/// Registry of live channels.
pub struct ChannelRegistry {
    max_channels: usize,
    next_id: AtomicU32,
    channels: DashMap<u32, Arc<Channel>>,
    clients: Arc<ClientRegistry>,
}

impl ChannelRegistry {
    pub fn new(max_channels: usize, clients: Arc<ClientRegistry>) -> Self {
        Self {
            max_channels,
            next_id: AtomicU32::new(1),
            channels: DashMap::new(),
            clients,
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.channels.len() < self.max_channels
    }

    pub fn create(&self, name: String, secret: bool) -> Arc<Channel> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let channel = Arc::new(Channel::new(id, name, secret, Arc::clone(&self.clients)));
        self.channels.insert(id, Arc::clone(&channel));
        channel
    }

    /// Remove a channel; its drop broadcasts the deletion to members.
    pub fn remove(&self, id: u32) -> bool {
        self.channels.remove(&id).is_some()
    }

    pub fn find(&self, id: u32) -> Option<Arc<Channel>> {
        self.channels.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn views(&self) -> Vec<ChannelView> {
        let mut views: Vec<ChannelView> =
            self.channels.iter().map(|entry| entry.value().view()).collect();
        views.sort_by_key(|view| view.id);
        views
    }

    pub fn count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_proto::Request;

    fn registry() -> Arc<ClientRegistry> {
        Arc::new(ClientRegistry::new(100))
    }

    #[test]
    fn test_join_and_leave() {
        let clients = registry();
        let channel = Channel::new(1, "general".into(), false, Arc::clone(&clients));
        let alice = clients.add();

        assert_eq!(channel.join(&alice), JoinOutcome::Success);
        assert_eq!(channel.member_count(), 1);

        channel.leave(alice.id);
        assert_eq!(channel.member_count(), 0);
    }

    #[test]
    fn test_banned_member_cannot_rejoin() {
        let clients = registry();
        let channel = Channel::new(1, "general".into(), false, Arc::clone(&clients));
        let admin = clients.add();
        let bob = clients.add();
        admin.set_admin();

        channel.join(&admin);
        channel.join(&bob);
        assert_eq!(channel.ban(&admin, bob.id), ModerationOutcome::Success);
        assert_eq!(channel.join(&bob), JoinOutcome::Banned);

        assert_eq!(channel.unban(&admin, bob.id), ModerationOutcome::Success);
        assert_eq!(channel.unban(&admin, bob.id), ModerationOutcome::NotFound);
        assert_eq!(channel.join(&bob), JoinOutcome::Success);
    }

    #[test]
    fn test_full_channel_rejects_join() {
        let clients = registry();
        let channel = Channel::new(1, "general".into(), false, Arc::clone(&clients));

        for _ in 0..MAX_CAPACITY {
            let member = clients.add();
            assert_eq!(channel.join(&member), JoinOutcome::Success);
        }

        let late = clients.add();
        assert_eq!(channel.join(&late), JoinOutcome::Full);
    }

    #[test]
    fn test_secret_join_consumes_invitation() {
        let clients = registry();
        let channel = Channel::new(1, "staff".into(), true, Arc::clone(&clients));
        let admin = clients.add();
        let bob = clients.add();
        admin.set_admin();

        assert_eq!(channel.join(&bob), JoinOutcome::Secret);

        assert_eq!(channel.invite(&admin, bob.id), ModerationOutcome::Success);
        assert_eq!(channel.invitation_count(), 1);
        assert_eq!(channel.join(&bob), JoinOutcome::Success);
        assert_eq!(channel.invitation_count(), 0);

        // the invitation is gone; a second join attempt needs a new one
        channel.leave(bob.id);
        assert_eq!(channel.join(&bob), JoinOutcome::Secret);
    }

    #[test]
    fn test_kick_authority() {
        let clients = registry();
        let channel = Channel::new(1, "general".into(), false, Arc::clone(&clients));
        let admin = clients.add();
        let moderator = clients.add();
        let bob = clients.add();
        admin.set_admin();

        channel.join(&admin);
        channel.join(&moderator);
        channel.join(&bob);
        assert_eq!(channel.promote(&admin, moderator.id), ModerationOutcome::Success);

        // plain member cannot kick
        assert_eq!(channel.kick(&bob, moderator.id), ModerationOutcome::Unauthorized);
        // moderator cannot kick a fellow moderator, admin can
        let other = clients.add();
        channel.join(&other);
        assert_eq!(channel.promote(&admin, other.id), ModerationOutcome::Success);
        assert_eq!(channel.kick(&moderator, other.id), ModerationOutcome::Unauthorized);
        assert_eq!(channel.kick(&admin, other.id), ModerationOutcome::Success);
        // moderator can kick a plain member
        assert_eq!(channel.kick(&moderator, bob.id), ModerationOutcome::Success);
        assert_eq!(channel.kick(&moderator, bob.id), ModerationOutcome::NotFound);
    }

    #[test]
    fn test_privacy_is_admin_only() {
        let clients = registry();
        let channel = Channel::new(1, "general".into(), false, Arc::clone(&clients));
        let admin = clients.add();
        let bob = clients.add();
        admin.set_admin();
        channel.join(&bob);

        assert_eq!(channel.set_privacy(&bob), ModerationOutcome::Unauthorized);
        assert_eq!(channel.set_privacy(&admin), ModerationOutcome::Success);
        assert!(channel.is_secret());
        assert_eq!(channel.set_privacy(&admin), ModerationOutcome::Success);
        assert!(!channel.is_secret());
    }

    #[test]
    fn test_broadcast_reaches_connected_members() {
        let clients = registry();
        let channel = Channel::new(1, "general".into(), false, Arc::clone(&clients));
        let alice = clients.add();
        let bob = clients.add();
        alice.set_connected(true);
        bob.set_connected(true);
        channel.join(&alice);
        channel.join(&bob);

        channel.queue_message(BroadcastPayload {
            channel_id: 1,
            sender_id: alice.id,
            reply_to: 0,
            text: "hello".into(),
        });

        // the worker delivers asynchronously
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        loop {
            let frames = bob.drain_outbound();
            if !frames.is_empty() {
                let request = Request::from_frame(&frames[0]).unwrap();
                assert_eq!(request.packet_kind(), Some(PacketKind::ChMessage));
                let message = BroadcastPayload::decode(&request.payload).unwrap();
                assert_eq!(message.sender_id, alice.id);
                assert_eq!(message.text, "hello");
                break;
            }
            assert!(std::time::Instant::now() < deadline, "broadcast never arrived");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }

    #[test]
    fn test_drop_notifies_members() {
        let clients = registry();
        let alice = clients.add();
        alice.set_connected(true);

        {
            let channel = Channel::new(1, "doomed".into(), false, Arc::clone(&clients));
            channel.join(&alice);
            alice.add_channel(1);
        }

        assert!(!alice.is_member(1));
        let frames = alice.drain_outbound();
        assert_eq!(frames.len(), 1);
        let request = Request::from_frame(&frames[0]).unwrap();
        assert_eq!(request.packet_kind(), Some(PacketKind::ChDelete));
        assert_eq!(request.payload, b"doomed has been deleted");
    }

    #[test]
    fn test_registry_capacity_and_views() {
        let clients = registry();
        let channels = ChannelRegistry::new(2, clients);

        channels.create("one".into(), false);
        channels.create("two".into(), true);
        assert!(!channels.has_capacity());

        let views = channels.views();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].name, "one");
        assert!(views[1].secret);

        assert!(channels.remove(1));
        assert!(!channels.remove(1));
        assert!(channels.has_capacity());
    }
}
