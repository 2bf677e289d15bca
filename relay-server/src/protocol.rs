//! Request dispatch.
//!
//! Every incoming frame is decoded into a [`Request`] and answered with
//! exactly one [`Response`]; channel broadcasts are delivered separately
//! through the client outbound queues. Frames that do not decode still get
//! an `Error` reply so a misbehaving peer learns it is speaking the wrong
//! protocol.

use std::sync::Arc;

use tracing::{debug, info};

use relay_proto::{
    encode_channel_list, BroadcastPayload, ConnectPayload, CreatePayload, JoinPayload,
    MessagePayload, PacketKind, Request, Response, TargetPayload, UpdateField, UpdatePayload,
    FAILURE_ID,
};

use crate::channel::{ChannelRegistry, JoinOutcome, ModerationOutcome};
use crate::client::{ClientHandle, ClientRegistry};
use crate::config::ServerConfig;

/// Shared server state handed to every connection thread.
pub struct Context {
    pub config: ServerConfig,
    pub clients: Arc<ClientRegistry>,
    pub channels: Arc<ChannelRegistry>,
}

impl Context {
    pub fn new(config: ServerConfig) -> Self {
        let clients = Arc::new(ClientRegistry::new(config.max_clients));
        let channels = Arc::new(ChannelRegistry::new(
            config.max_channels,
            Arc::clone(&clients),
        ));
        Self {
            config,
            clients,
            channels,
        }
    }

    /// Handle one raw frame and produce the direct reply.
    pub fn handle_frame(&self, client: &ClientHandle, frame: &[u8]) -> Response {
        match Request::from_frame(frame) {
            Some(request) => self.handle_request(client, request),
            None => Response::failure(PacketKind::Error, "malformed request"),
        }
    }

    /// Dispatch a decoded request.
    pub fn handle_request(&self, client: &ClientHandle, request: Request) -> Response {
        let kind = request.packet_kind();

        // everything but the connect handshake requires a connected client
        if !client.is_connected() && kind != Some(PacketKind::SvrConnect) {
            return Response::failure(PacketKind::SvrConnect, "Connection needed");
        }

        match kind {
            Some(PacketKind::SvrConnect) => self.svr_connect(client, request),
            Some(PacketKind::SvrDisconnect) => Response::empty(request.id, PacketKind::SvrDisconnect),
            Some(PacketKind::ChList) => self.ch_list(request),
            Some(PacketKind::ChCreate) => self.ch_create(client, request),
            Some(PacketKind::ChJoin) => self.ch_join(client, request),
            Some(PacketKind::ChLeave) => self.ch_leave(client, request),
            Some(PacketKind::ChMessage) => self.ch_message(client, request),
            Some(PacketKind::ChUpdate) => self.ch_update(client, request),
            Some(PacketKind::ChDelete) => self.ch_delete(client, request),
            Some(
                op @ (PacketKind::ChKick
                | PacketKind::ChInvite
                | PacketKind::ChBan
                | PacketKind::ChUnban),
            ) => self.ch_moderate(client, op, request),
            Some(PacketKind::Heartbeat) => Response::empty(request.id, PacketKind::Heartbeat),
            _ => Response::failure(PacketKind::Error, "unknown request type"),
        }
    }

    /// `SvrConnect`: register the username; a matching server secret grants
    /// admin. Replies with the assigned `{name}@{id}` username.
    fn svr_connect(&self, client: &ClientHandle, request: Request) -> Response {
        let Some(connect) = ConnectPayload::decode(&request.payload) else {
            return Response::failure(PacketKind::SvrConnect, "username required");
        };

        let username = client.rename(&connect.username);
        if let (Some(secret), Some(expected)) = (&connect.secret, &self.config.admin_secret) {
            if secret == expected {
                client.set_admin();
            }
        }
        client.set_connected(true);
        info!("{username} connected to the server");

        Response::new(request.id, PacketKind::SvrConnect, username.into_bytes())
    }

    fn ch_list(&self, request: Request) -> Response {
        let payload = encode_channel_list(&self.channels.views());
        Response::new(request.id, PacketKind::ChList, payload)
    }

    /// `ChCreate` is admin only. Replies with the new channel's info payload.
    fn ch_create(&self, client: &ClientHandle, request: Request) -> Response {
        if !client.is_admin() {
            return Response::empty(FAILURE_ID, PacketKind::PermissionDenied);
        }
        let Some(create) = CreatePayload::decode(&request.payload) else {
            return Response::failure(PacketKind::Error, "malformed request");
        };
        if !self.channels.has_capacity() {
            return Response::failure(
                PacketKind::RequestRejected,
                "Cannot create more channels. Max reached",
            );
        }

        let channel = self.channels.create(create.name, create.secret);
        info!("channel created: {} (id {})", channel.name(), channel.id);
        Response::new(request.id, PacketKind::ChCreate, channel.info().encode())
    }

    fn ch_join(&self, client: &ClientHandle, request: Request) -> Response {
        let Some(join) = JoinPayload::decode(&request.payload) else {
            return Response::failure(PacketKind::Error, "malformed request");
        };
        let Some(channel) = self.channels.find(join.channel_id) else {
            return Response::failure(PacketKind::NotFound, "Channel not found.");
        };

        match channel.join(client) {
            JoinOutcome::Success => {
                client.add_channel(channel.id);
                debug!("{} joined channel {}", client.username(), channel.name());
                Response::new(request.id, PacketKind::ChJoin, channel.info().encode())
            }
            JoinOutcome::Banned => Response::failure(
                PacketKind::PermissionDenied,
                format!("You are banned from channel {}", channel.id),
            ),
            JoinOutcome::Full => Response::failure(
                PacketKind::RequestRejected,
                format!("Channel is full: {}", channel.id),
            ),
            JoinOutcome::Secret => Response::failure(
                PacketKind::PermissionDenied,
                format!("You need an invitation to join this channel: {}", channel.id),
            ),
        }
    }

    fn ch_leave(&self, client: &ClientHandle, request: Request) -> Response {
        let Some(leave) = JoinPayload::decode(&request.payload) else {
            return Response::failure(PacketKind::Error, "malformed request");
        };
        let Some(channel) = self.channels.find(leave.channel_id) else {
            return Response::failure(PacketKind::NotFound, "Channel not found.");
        };

        channel.leave(client.id);
        client.remove_channel(channel.id);
        Response::empty(request.id, PacketKind::ChLeave)
    }

    /// `ChMessage`: queue the message for broadcast and ack the sender.
    fn ch_message(&self, client: &ClientHandle, request: Request) -> Response {
        let Some(message) = MessagePayload::decode(&request.payload) else {
            return Response::failure(PacketKind::Error, "malformed request");
        };
        let Some(channel) = self.channels.find(message.channel_id) else {
            return Response::failure(PacketKind::NotFound, "Channel not found.");
        };
        if !client.is_member(channel.id) {
            return Response::empty(FAILURE_ID, PacketKind::ChMessage);
        }

        channel.queue_message(BroadcastPayload {
            channel_id: message.channel_id,
            sender_id: client.id,
            reply_to: message.reply_to,
            text: message.text,
        });
        Response::empty(request.id, PacketKind::ChMessage)
    }

    fn ch_update(&self, client: &ClientHandle, request: Request) -> Response {
        let Some(update) = UpdatePayload::decode(&request.payload) else {
            return Response::failure(PacketKind::Error, "malformed request");
        };
        let Some(channel) = self.channels.find(update.channel_id) else {
            return Response::failure(PacketKind::NotFound, "Channel not found.");
        };

        let outcome = match update.update_field() {
            Some(UpdateField::Privacy) => channel.set_privacy(client),
            Some(UpdateField::Pinned) => channel.set_pinned(
                client,
                String::from_utf8_lossy(&update.data).into_owned(),
            ),
            Some(UpdateField::Name) => channel.rename(
                client,
                String::from_utf8_lossy(&update.data).into_owned(),
            ),
            Some(UpdateField::Moderator) => {
                if update.data.len() < 4 {
                    return Response::failure(PacketKind::Error, "malformed request");
                }
                let target = u32::from_le_bytes([
                    update.data[0],
                    update.data[1],
                    update.data[2],
                    update.data[3],
                ]);
                channel.promote(client, target)
            }
            None => return Response::failure(PacketKind::Error, "unknown update field"),
        };
        self.moderation_reply(request.id, PacketKind::ChUpdate, outcome)
    }

    /// `ChDelete`: moderators and admins only. Member notification happens
    /// when the channel drops out of the registry.
    fn ch_delete(&self, client: &ClientHandle, request: Request) -> Response {
        let Some(delete) = JoinPayload::decode(&request.payload) else {
            return Response::failure(PacketKind::Error, "malformed request");
        };
        let Some(channel) = self.channels.find(delete.channel_id) else {
            return Response::failure(PacketKind::NotFound, "Channel not found.");
        };
        if !channel.is_moderator(client) {
            return Response::empty(FAILURE_ID, PacketKind::PermissionDenied);
        }

        let name = channel.name();
        drop(channel);
        self.channels.remove(delete.channel_id);
        info!("channel deleted: {name}");
        Response::empty(request.id, PacketKind::ChDelete)
    }

    /// Shared path for the target-id moderation commands.
    fn ch_moderate(&self, client: &ClientHandle, op: PacketKind, request: Request) -> Response {
        let Some(target) = TargetPayload::decode(&request.payload) else {
            return Response::failure(PacketKind::Error, "malformed request");
        };
        let Some(channel) = self.channels.find(target.channel_id) else {
            return Response::failure(PacketKind::NotFound, "Channel not found.");
        };

        let outcome = match op {
            PacketKind::ChKick => channel.kick(client, target.target_id),
            PacketKind::ChInvite => channel.invite(client, target.target_id),
            PacketKind::ChBan => channel.ban(client, target.target_id),
            PacketKind::ChUnban => channel.unban(client, target.target_id),
            _ => return Response::failure(PacketKind::Error, "unknown request type"),
        };
        self.moderation_reply(request.id, op, outcome)
    }

    fn moderation_reply(&self, id: i32, op: PacketKind, outcome: ModerationOutcome) -> Response {
        match outcome {
            ModerationOutcome::Success => Response::empty(id, op),
            ModerationOutcome::NotFound => {
                Response::failure(PacketKind::NotFound, "Client not found.")
            }
            ModerationOutcome::Unauthorized => {
                Response::empty(FAILURE_ID, PacketKind::PermissionDenied)
            }
        }
    }

    /// Tear down a departed client: drop it from every channel it joined and
    /// from the registry.
    pub fn disconnect(&self, client: &ClientHandle) {
        client.set_connected(false);
        for channel_id in client.channel_ids() {
            if let Some(channel) = self.channels.find(channel_id) {
                channel.leave(client.id);
            }
            client.remove_channel(channel_id);
        }
        self.clients.remove(client.id);
        info!("{} disconnected from the server", client.username());
    }
}
