use crate::input::{classify_datagram, classify_line, Incoming, InputAction};
use log::{debug, error, info};
use shared::{MAX_DATAGRAM_SIZE, PONG_DATAGRAM};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;

/// Terminal chat client: stdin lines go to the server, datagrams go to stdout
pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
}

impl Client {
    /// Binds a local socket; `local_port` 0 picks an ephemeral port
    pub async fn new(
        server_addr: &str,
        local_port: u16,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind(("0.0.0.0", local_port)).await?;
        let server_addr = server_addr.parse()?;
        info!("Client socket bound to {}", socket.local_addr()?);

        Ok(Client {
            socket,
            server_addr,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    async fn send_text(&self, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.socket.send_to(text.as_bytes(), self.server_addr).await?;
        Ok(())
    }

    /// Handles one datagram from the server
    async fn handle_datagram(&self, data: &[u8]) {
        match classify_datagram(data) {
            Incoming::Ping => {
                debug!("Answering ping");
                if let Err(e) = self.send_text(PONG_DATAGRAM).await {
                    error!("Failed to answer ping: {}", e);
                }
            }
            Incoming::Text(text) => println!("{}", text),
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, from)) if from == self.server_addr => {
                            self.handle_datagram(&buffer[..len]).await;
                        },
                        Ok((_, from)) => debug!("Ignoring datagram from {}", from),
                        Err(e) => error!("Error receiving datagram: {}", e),
                    }
                },

                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("Input closed");
                        break;
                    };

                    match classify_line(&line) {
                        InputAction::Skip => {},
                        InputAction::Send(text) => self.send_text(&text).await?,
                        InputAction::SendAndQuit(text) => {
                            self.send_text(&text).await?;
                            break;
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
