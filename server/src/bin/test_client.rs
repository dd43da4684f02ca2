//! Smoke test against a running server: sends each basic command once and
//! prints the first datagram that comes back.

use clap::Parser;
use shared::{trim_padding, DEFAULT_PORT, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to test against
    #[arg(short, long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))]
    server: SocketAddr,

    /// How long to wait for each reply, in milliseconds
    #[arg(short, long, default_value = "500")]
    wait_ms: u64,
}

const SCRIPT: &[&str] = &[
    "conn$Alice",
    "say$Hello world",
    "sayto$Bob How are you?",
    "mute$Charlie",
    "unmute$Charlie",
    "rename$Alice123",
    "say Hello",
    "$NoCommand",
    "explode$everything",
    "disconn$",
];

/// Discards anything still queued from the previous step
fn drain(socket: &UdpSocket, buf: &mut [u8]) {
    while socket.try_recv_from(buf).is_ok() {}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let wait = Duration::from_millis(args.wait_ms);

    for command in SCRIPT {
        drain(&socket, &mut buf);

        println!("\nSending: {}", command);
        socket.send_to(command.as_bytes(), args.server).await?;

        match timeout(wait, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _))) => {
                let text = String::from_utf8_lossy(trim_padding(&buf[..len]));
                println!("Response: {}", text.trim());
            }
            Ok(Err(e)) => println!("Receive error: {}", e),
            Err(_) => println!("Response: <NO RESPONSE>"),
        }

        sleep(Duration::from_millis(200)).await;
    }

    println!("\nTest client finished");
    Ok(())
}
