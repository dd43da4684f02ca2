//! Server network layer handling UDP communications and the dispatch loop

use crate::config::ServerConfig;
use crate::dispatch::ChatState;
use crate::outbound::OutboundMessage;
use log::{debug, error, info};
use shared::MAX_DATAGRAM_SIZE;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    DatagramReceived { data: Vec<u8>, addr: SocketAddr },
    Shutdown,
}

/// Chat server: socket tasks plus the single loop that owns all chat state
pub struct Server {
    socket: Arc<UdpSocket>,
    state: ChatState,
    monitor_interval: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(config.bind_addr.as_str()).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            state: ChatState::new(config.monitor, config.admin_port),
            monitor_interval: config.monitor.interval,
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sender that can stop a running server with [`ServerMessage::Shutdown`]
    pub fn control_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming datagrams
    fn spawn_network_receiver(&self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let message = ServerMessage::DatagramReceived {
                            data: buffer[..len].to_vec(),
                            addr,
                        };
                        if let Err(e) = server_tx.send(message) {
                            error!("Failed to send datagram to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Spawns task that processes the outgoing datagram queue
    fn spawn_network_sender(&mut self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let mut outbound_rx =
            std::mem::replace(&mut self.outbound_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    OutboundMessage::SendReply { reply, addr } => {
                        let data = reply.to_string();
                        if let Err(e) = socket.send_to(data.as_bytes(), addr).await {
                            error!("Failed to send to {}: {}", addr, e);
                        }
                    }
                    OutboundMessage::Fanout { reply, recipients } => {
                        let data = reply.to_string();
                        for addr in recipients {
                            if let Err(e) = socket.send_to(data.as_bytes(), addr).await {
                                error!("Failed to send to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        })
    }

    fn queue(&self, outgoing: Vec<OutboundMessage>) {
        if !outgoing.is_empty() {
            let datagrams: usize = outgoing.iter().map(OutboundMessage::datagram_count).sum();
            debug!("Queueing {} datagrams", datagrams);
        }
        for message in outgoing {
            if let Err(e) = self.outbound_tx.send(message) {
                error!("Failed to queue datagram for sending: {}", e);
            }
        }
    }

    /// Main server loop
    ///
    /// Datagrams and monitor ticks are handled one at a time, so no step ever
    /// observes another half-applied.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let receiver = self.spawn_network_receiver();
        let sender = self.spawn_network_sender();

        let mut monitor_interval = interval(self.monitor_interval);
        monitor_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::DatagramReceived { data, addr }) => {
                            debug!("Received {} bytes from {}", data.len(), addr);
                            let now = Instant::now().into_std();
                            let outgoing = self.state.handle_datagram(&data, addr, now);
                            self.queue(outgoing);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = monitor_interval.tick() => {
                    let now = Instant::now().into_std();
                    let outgoing = self.state.check_inactivity(now);
                    self.queue(outgoing);
                },
            }
        }

        receiver.abort();
        // Let queued replies drain before the sender stops
        drop(std::mem::replace(
            &mut self.outbound_tx,
            mpsc::unbounded_channel().0,
        ));
        if let Err(e) = sender.await {
            error!("Sender task failed: {}", e);
        }

        Ok(())
    }
}
