//! Payload codecs for the channel operations.
//!
//! Payloads are the frame bytes between the kind field and the terminator.
//! Decoders return `None` on truncated input; text is read lossily, the wire
//! carries whatever the client typed.

/// `SvrConnect` payload: `username [\n secret]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPayload {
    pub username: String,
    pub secret: Option<String>,
}

impl ConnectPayload {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = self.username.as_bytes().to_vec();
        if let Some(secret) = &self.secret {
            buf.push(b'\n');
            buf.extend_from_slice(secret.as_bytes());
        }
        buf
    }

    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.is_empty() {
            return None;
        }
        let mut parts = payload.splitn(2, |b| *b == b'\n');
        let username = String::from_utf8_lossy(parts.next()?).into_owned();
        let secret = parts
            .next()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
        Some(Self { username, secret })
    }
}

/// `ChCreate` payload: `[secret u8][name]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePayload {
    pub secret: bool,
    pub name: String,
}

impl CreatePayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + self.name.len());
        buf.push(self.secret as u8);
        buf.extend_from_slice(self.name.as_bytes());
        buf
    }

    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.is_empty() {
            return None;
        }
        Some(Self {
            secret: payload[0] == 1,
            name: String::from_utf8_lossy(&payload[1..]).into_owned(),
        })
    }
}

/// `ChJoin` / `ChLeave` / `ChDelete` payload: `[channel_id u32]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPayload {
    pub channel_id: u32,
}

impl JoinPayload {
    pub fn encode(&self) -> Vec<u8> {
        self.channel_id.to_le_bytes().to_vec()
    }

    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < 4 {
            return None;
        }
        Some(Self {
            channel_id: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
        })
    }
}

/// `ChMessage` request payload: `[channel_id u32][reply_to u32][text]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    pub channel_id: u32,
    pub reply_to: u32,
    pub text: String,
}

impl MessagePayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.text.len());
        buf.extend_from_slice(&self.channel_id.to_le_bytes());
        buf.extend_from_slice(&self.reply_to.to_le_bytes());
        buf.extend_from_slice(self.text.as_bytes());
        buf
    }

    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < 8 {
            return None;
        }
        Some(Self {
            channel_id: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            reply_to: u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]),
            text: String::from_utf8_lossy(&payload[8..]).into_owned(),
        })
    }
}

/// `ChMessage` broadcast payload: `[channel_id u32][sender_id u32][reply_to u32][text]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPayload {
    pub channel_id: u32,
    pub sender_id: u32,
    pub reply_to: u32,
    pub text: String,
}

impl BroadcastPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12 + self.text.len());
        buf.extend_from_slice(&self.channel_id.to_le_bytes());
        buf.extend_from_slice(&self.sender_id.to_le_bytes());
        buf.extend_from_slice(&self.reply_to.to_le_bytes());
        buf.extend_from_slice(self.text.as_bytes());
        buf
    }

    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < 12 {
            return None;
        }
        Some(Self {
            channel_id: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            sender_id: u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]),
            reply_to: u32::from_le_bytes([payload[8], payload[9], payload[10], payload[11]]),
            text: String::from_utf8_lossy(&payload[12..]).into_owned(),
        })
    }
}

/// Moderation payload (`ChKick` / `ChInvite` / `ChBan` / `ChUnban`):
/// `[channel_id u32][target_id u32]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPayload {
    pub channel_id: u32,
    pub target_id: u32,
}

impl TargetPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8);
        buf.extend_from_slice(&self.channel_id.to_le_bytes());
        buf.extend_from_slice(&self.target_id.to_le_bytes());
        buf
    }

    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < 8 {
            return None;
        }
        Some(Self {
            channel_id: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            target_id: u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]),
        })
    }
}

/// Which channel field a `ChUpdate` request changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UpdateField {
    Privacy = 0,
    Pinned = 1,
    Name = 2,
    /// Data is the target client id (u32), promoted to moderator.
    Moderator = 3,
}

impl TryFrom<u8> for UpdateField {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(UpdateField::Privacy),
            1 => Ok(UpdateField::Pinned),
            2 => Ok(UpdateField::Name),
            3 => Ok(UpdateField::Moderator),
            _ => Err(()),
        }
    }
}

/// `ChUpdate` payload: `[channel_id u32][field u8][data]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePayload {
    pub channel_id: u32,
    pub field: u8,
    pub data: Vec<u8>,
}

impl UpdatePayload {
    pub fn new(channel_id: u32, field: UpdateField, data: impl Into<Vec<u8>>) -> Self {
        Self {
            channel_id,
            field: field as u8,
            data: data.into(),
        }
    }

    pub fn update_field(&self) -> Option<UpdateField> {
        UpdateField::try_from(self.field).ok()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(5 + self.data.len());
        buf.extend_from_slice(&self.channel_id.to_le_bytes());
        buf.push(self.field);
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < 5 {
            return None;
        }
        Some(Self {
            channel_id: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            field: payload[4],
            data: payload[5..].to_vec(),
        })
    }
}

/// Channel info payload: `[id u32][secret u8][name]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: u32,
    pub secret: bool,
    pub name: String,
}

impl ChannelInfo {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(5 + self.name.len());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.push(self.secret as u8);
        buf.extend_from_slice(self.name.as_bytes());
        buf
    }

    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < 5 {
            return None;
        }
        Some(Self {
            id: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            secret: payload[4] == 1,
            name: String::from_utf8_lossy(&payload[5..]).into_owned(),
        })
    }
}

/// A channel list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelView {
    pub id: u32,
    pub secret: bool,
    pub name: String,
}

/// Encode the `ChList` response payload.
///
/// Per entry: id as a decimal string, newline, secret byte, newline, name,
/// newline, NUL separator. The list closes with a final NUL.
pub fn encode_channel_list(views: &[ChannelView]) -> Vec<u8> {
    let mut buf = Vec::new();
    for view in views {
        buf.extend_from_slice(view.id.to_string().as_bytes());
        buf.push(b'\n');
        buf.push(view.secret as u8);
        buf.push(b'\n');
        buf.extend_from_slice(view.name.as_bytes());
        buf.push(b'\n');
        buf.push(0x00);
    }
    buf.push(0x00);
    buf
}
