//! Packet kind discriminator.

/// Packet kinds, shared by requests and responses.
///
/// Failure responses carry an id of -1 and a human-readable reason payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PacketKind {
    // Server scope
    /// client -> server : connect with a username (and optional admin secret)
    /// server -> client : connected, payload is the assigned username
    SvrConnect = 0x01,
    /// client -> server : disconnect from the server
    SvrDisconnect = 0x02,
    /// server -> client : server-scoped message
    SvrMessage = 0x03,
    /// server -> client : you have been banned from the server
    SvrBanned = 0x04,
    /// server -> client : the server is shutting down
    SvrShutdown = 0x05,

    // Channel scope
    /// client -> server : join a channel
    /// server -> client : joined, payload is the channel info
    ChJoin = 0x10,
    /// client -> server : leave a channel
    ChLeave = 0x11,
    /// client -> server : send a message to a channel
    /// server -> client : broadcast message from a channel
    ChMessage = 0x12,
    /// client -> server : update a channel field (privacy, pinned, name)
    ChUpdate = 0x13,
    /// client -> server : delete a channel
    /// server -> client : a channel has been deleted
    ChDelete = 0x14,
    /// client -> server : create a channel (admin only)
    ChCreate = 0x15,
    /// client -> server : request the channel list
    ChList = 0x16,

    // Channel moderation
    /// client -> server : invite a client to a secret channel
    ChInvite = 0x20,
    /// client -> server : kick a member from a channel
    ChKick = 0x21,
    /// client -> server : ban a member from a channel
    ChBan = 0x22,
    /// client -> server : lift a channel ban
    ChUnban = 0x23,

    // Failures
    /// server -> client : operation rejected (with reason)
    RequestRejected = 0xF0,
    /// server -> client : missing permission
    PermissionDenied = 0xF1,
    /// server -> client : requested resource not found
    NotFound = 0xF2,

    /// client <-> server : keepalive
    Heartbeat = 0xFE,
    /// server -> client : generic error (with reason)
    Error = 0xFF,
}

impl TryFrom<u32> for PacketKind {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            0x01 => Ok(PacketKind::SvrConnect),
            0x02 => Ok(PacketKind::SvrDisconnect),
            0x03 => Ok(PacketKind::SvrMessage),
            0x04 => Ok(PacketKind::SvrBanned),
            0x05 => Ok(PacketKind::SvrShutdown),
            0x10 => Ok(PacketKind::ChJoin),
            0x11 => Ok(PacketKind::ChLeave),
            0x12 => Ok(PacketKind::ChMessage),
            0x13 => Ok(PacketKind::ChUpdate),
            0x14 => Ok(PacketKind::ChDelete),
            0x15 => Ok(PacketKind::ChCreate),
            0x16 => Ok(PacketKind::ChList),
            0x20 => Ok(PacketKind::ChInvite),
            0x21 => Ok(PacketKind::ChKick),
            0x22 => Ok(PacketKind::ChBan),
            0x23 => Ok(PacketKind::ChUnban),
            0xF0 => Ok(PacketKind::RequestRejected),
            0xF1 => Ok(PacketKind::PermissionDenied),
            0xF2 => Ok(PacketKind::NotFound),
            0xFE => Ok(PacketKind::Heartbeat),
            0xFF => Ok(PacketKind::Error),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            PacketKind::SvrConnect,
            PacketKind::ChJoin,
            PacketKind::ChMessage,
            PacketKind::ChList,
            PacketKind::ChUnban,
            PacketKind::Heartbeat,
            PacketKind::Error,
        ] {
            assert_eq!(PacketKind::try_from(kind as u32), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_kind() {
        assert!(PacketKind::try_from(0xAB).is_err());
        assert!(PacketKind::try_from(0).is_err());
    }
}
