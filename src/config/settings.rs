use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Covers the server listener, the broker engine, the client adapters and
/// logging.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub client: ClientSettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration settings for the broker.
///
/// `retention_secs = 0` or `retention_enabled = false` turns retention off;
/// `subscription_ttl_secs = 0` means subscriptions never expire on their own.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrokerSettings {
    pub subscriber_capacity: usize,
    pub retention_enabled: bool,
    pub retention_secs: u64,
    pub retention_max_messages: usize,
    pub subscription_ttl_secs: u64,
}

impl BrokerSettings {
    pub fn retention_window(&self) -> Option<Duration> {
        (self.retention_enabled && self.retention_secs > 0)
            .then(|| Duration::from_secs(self.retention_secs))
    }

    pub fn subscription_ttl(&self) -> Option<Duration> {
        (self.subscription_ttl_secs > 0).then(|| Duration::from_secs(self.subscription_ttl_secs))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClientSettings {
    pub publish_timeout_ms: u64,
}

impl ClientSettings {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub client: Option<PartialClientSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub subscriber_capacity: Option<usize>,
    pub retention_enabled: Option<bool>,
    pub retention_secs: Option<u64>,
    pub retention_max_messages: Option<usize>,
    pub subscription_ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialClientSettings {
    pub publish_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl PartialSettings {
    /// Fill every missing value from `defaults`.
    pub fn merge(self, defaults: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let broker = self.broker.unwrap_or_default();
        let client = self.client.unwrap_or_default();
        let logging = self.logging.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(defaults.server.host),
                port: server.port.unwrap_or(defaults.server.port),
            },
            broker: BrokerSettings {
                subscriber_capacity: broker
                    .subscriber_capacity
                    .unwrap_or(defaults.broker.subscriber_capacity),
                retention_enabled: broker
                    .retention_enabled
                    .unwrap_or(defaults.broker.retention_enabled),
                retention_secs: broker
                    .retention_secs
                    .unwrap_or(defaults.broker.retention_secs),
                retention_max_messages: broker
                    .retention_max_messages
                    .unwrap_or(defaults.broker.retention_max_messages),
                subscription_ttl_secs: broker
                    .subscription_ttl_secs
                    .unwrap_or(defaults.broker.subscription_ttl_secs),
            },
            client: ClientSettings {
                publish_timeout_ms: client
                    .publish_timeout_ms
                    .unwrap_or(defaults.client.publish_timeout_ms),
            },
            logging: LoggingSettings {
                level: logging.level.unwrap_or(defaults.logging.level),
            },
        }
    }
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 50051,
            },
            broker: BrokerSettings {
                subscriber_capacity: 10,
                retention_enabled: true,
                retention_secs: 10,
                retention_max_messages: 1000,
                subscription_ttl_secs: 0,
            },
            client: ClientSettings {
                publish_timeout_ms: 1000,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
