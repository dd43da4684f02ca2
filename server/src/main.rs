use clap::Parser;
use log::{error, info};
use server::config::{Args, ServerConfig};
use server::network::{Server, ServerMessage};

/// Parses command-line arguments, then runs the chat server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from(Args::parse());
    info!(
        "Inactivity timeout {:?}, ping timeout {:?}, sweep every {:?}",
        config.monitor.inactivity_timeout, config.monitor.ping_timeout, config.monitor.interval
    );

    let mut server = Server::new(config).await?;
    let control = server.control_handle();

    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server loop failed: {}", e);
        }
    });

    let result = tokio::select! {
        result = &mut server_handle => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = control.send(ServerMessage::Shutdown);
            server_handle.await
        }
    };

    if let Err(e) = result {
        error!("Server task panicked: {}", e);
    }

    Ok(())
}
