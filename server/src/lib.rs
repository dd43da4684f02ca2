//! # Chat Server Library
//!
//! A multi-user chat service over UDP. UDP has no handshake and no disconnect
//! signal, so this crate builds session semantics (join, rename, leave and
//! timeout) on top of bare datagrams, identifying every client by its network
//! address.
//!
//! ## Architecture
//!
//! The server uses a single event loop that owns all chat state and consumes
//! two kinds of events: "datagram arrived" and "monitor tick". Each event is
//! applied in full before the next one is looked at, so a disconnect arriving
//! mid-probe can never race the monitor evicting the same client. Two helper
//! tasks sit at the edges of the loop:
//! - **Network Receiver**: reads datagrams and forwards them to the loop
//! - **Network Sender**: performs the sends the loop queued, one datagram per
//!   recipient, so a large fan-out never stalls the receive path
//!
//! ## Module Organization
//!
//! ### Registry (`registry`)
//! Sessions keyed by address: display names, mute lists, activity clocks.
//!
//! ### History (`history`)
//! The last 15 broadcasts, replayed oldest-first to every new session.
//!
//! ### Broadcast (`broadcast`)
//! Delivery sets for public messages, private messages and system notices,
//! with mute filtering.
//!
//! ### Monitor (`monitor`)
//! Two-phase liveness check: `ping$` after a period of silence, eviction if the
//! probe goes unanswered.
//!
//! ### Dispatch (`dispatch`)
//! Turns one parsed command into state changes plus the datagrams to send.
//!
//! ### Outbound (`outbound`)
//! The datagrams a step wants sent, handed from the loop to the sender task.
//!
//! ### Network (`network`)
//! Socket tasks and the event loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!     if let Err(e) = server.run().await {
//!         eprintln!("Server stopped: {}", e);
//!     }
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod dispatch;
pub mod history;
pub mod monitor;
pub mod network;
pub mod outbound;
pub mod registry;
