//! Server configuration and its command-line form

use clap::Parser;
use shared::DEFAULT_PORT;
use std::time::Duration;

/// Timing of the inactivity monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// How often sessions are swept
    pub interval: Duration,
    /// Silence after which a session is probed with `ping$`
    pub inactivity_timeout: Duration,
    /// Silence after the probe after which the session is evicted
    pub ping_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            inactivity_timeout: Duration::from_secs(60),
            ping_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub monitor: MonitorConfig,
    /// Source port that may issue `kick$`
    pub admin_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            monitor: MonitorConfig::default(),
            admin_port: 6666,
        }
    }
}

/// Command line arguments of the server binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// How often idle sessions are checked, in milliseconds
    #[arg(long, default_value = "1000")]
    pub monitor_interval_ms: u64,

    /// Seconds of silence before a client is pinged
    #[arg(long, default_value = "60")]
    pub inactivity_timeout_secs: u64,

    /// Seconds to wait for any reply to a ping before evicting the client
    #[arg(long, default_value = "10")]
    pub ping_timeout_secs: u64,

    /// Client source port allowed to kick other clients
    #[arg(long, default_value = "6666")]
    pub admin_port: u16,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            bind_addr: format!("{}:{}", args.host, args.port),
            monitor: MonitorConfig {
                interval: Duration::from_millis(args.monitor_interval_ms.max(1)),
                inactivity_timeout: Duration::from_secs(args.inactivity_timeout_secs),
                ping_timeout: Duration::from_secs(args.ping_timeout_secs),
            },
            admin_port: args.admin_port,
        }
    }
}
