//! Relay configuration.

use clap::Parser;
use std::time::Duration;

/// Default channel capacity per topic.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
/// Default maximum inbound message size (16 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;
/// Default idle timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 16;

/// Command-line arguments, with environment fallbacks.
#[derive(Parser, Debug, Clone)]
#[command(name = "inkboard-server")]
#[command(about = "Realtime whiteboard relay over WebSocket", long_about = None)]
pub struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value_t = 9000)]
    pub port: u16,

    /// Frames buffered per topic before slow subscribers start losing the oldest
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Maximum size of one inbound WebSocket message in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_BYTES)]
    pub max_message_bytes: usize,

    /// Close connections that send nothing for this many seconds
    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT_SECS)]
    pub idle_timeout_secs: u64,
}

/// Resolved relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub channel_capacity: usize,
    pub max_message_bytes: usize,
    pub idle_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl RelayConfig {
    /// Address string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Interval between keepalive pings.
    pub fn ping_interval(&self) -> Duration {
        (self.idle_timeout / 2).max(Duration::from_millis(100))
    }
}

impl From<Args> for RelayConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            channel_capacity: args.channel_capacity.max(1),
            max_message_bytes: args.max_message_bytes,
            idle_timeout: Duration::from_secs(args.idle_timeout_secs.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_args() {
        let args = Args::try_parse_from(["inkboard-server"]).unwrap();
        let config = RelayConfig::from(args);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.max_message_bytes, 16 * 1024 * 1024);
        assert_eq!(config.idle_timeout, Duration::from_secs(16));
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "inkboard-server",
            "--host",
            "127.0.0.1",
            "-p",
            "4000",
            "--channel-capacity",
            "0",
            "--idle-timeout-secs",
            "30",
        ])
        .unwrap();
        let config = RelayConfig::from(args);
        assert_eq!(config.bind_addr(), "127.0.0.1:4000");
        assert_eq!(config.channel_capacity, 1);
        assert_eq!(config.ping_interval(), Duration::from_secs(15));
    }
}
