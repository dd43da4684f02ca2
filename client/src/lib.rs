//! # Chat Client Library
//!
//! A line-oriented terminal client for the UDP chat server. Every line typed
//! is sent verbatim as one datagram, and every datagram from the server is
//! printed as one line. The server decides what is valid.
//!
//! The only thing the client does on its own is answer the server's `ping$`
//! liveness probe with `pong$`, so an idle but running client is never
//! evicted.
//!
//! ## Modules
//!
//! - `input`: classifies typed lines and incoming datagrams
//! - `network`: the socket and the stdin/socket event loop
//!
//! Binding with `--port` set to the server's admin port lets this client
//! issue `kick$<name>`.

pub mod input;
pub mod network;
