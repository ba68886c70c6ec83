use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use shared::DEFAULT_PORT;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Give up on a missing opponent after this many seconds (waits forever if unset)
    #[clap(short = 't', long)]
    opponent_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        opponent_timeout: args.opponent_timeout.map(Duration::from_secs),
    };

    let server = Server::bind(&config).await?;

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    server.shutdown().await;
    Ok(())
}
