use clap::Parser;
use client::network::Client;
use log::info;
use shared::DEFAULT_PORT;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Place mines at random instead of asking
    #[arg(short = 'r', long)]
    random_mines: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    let client = match Client::connect(&args.server, args.random_mines).await {
        Ok(client) => client,
        Err(e) => {
            println!("Server unavailable: {}", e);
            return Ok(());
        }
    };
    println!("Connected to server\n");

    client.run(BufReader::new(tokio::io::stdin())).await?;

    Ok(())
}
