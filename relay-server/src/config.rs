//! Server configuration.

/// Lowest accepted channel capacity.
pub const MIN_CHANNELS: usize = 1;

/// Lowest accepted client capacity.
pub const MIN_CLIENTS: usize = 10;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8081;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_clients: usize,
    pub max_channels: usize,
    /// Clients presenting this secret on connect become admins.
    pub admin_secret: Option<String>,
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{DEFAULT_PORT}"),
            max_clients: MIN_CLIENTS,
            max_channels: MIN_CHANNELS,
            admin_secret: None,
            debug: false,
        }
    }
}

/// Builder for [`ServerConfig`].
pub struct ServerBuilder {
    config: ServerConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Bind to an explicit address (`127.0.0.1:0` for an ephemeral port).
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// Listen on this port on loopback.
    pub fn port(mut self, port: u16) -> Self {
        self.config.bind_addr = format!("127.0.0.1:{port}");
        self
    }

    /// Client capacity, floored at [`MIN_CLIENTS`].
    pub fn max_clients(mut self, max: usize) -> Self {
        self.config.max_clients = max.max(MIN_CLIENTS);
        self
    }

    /// Channel capacity, floored at [`MIN_CHANNELS`].
    pub fn max_channels(mut self, max: usize) -> Self {
        self.config.max_channels = max.max(MIN_CHANNELS);
        self
    }

    pub fn admin_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.admin_secret = Some(secret.into());
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
