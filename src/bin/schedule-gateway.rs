//! Serves the schedule gateway. Configuration is read from the environment (see [`Config`])

use std::error::Error;
use std::net::SocketAddr;

use clap::Parser;

use schedule_board::config::{Config, DEFAULT_BIND_ADDR};
use schedule_board::gateway::{self, AppContext};

#[derive(Parser, Debug)]
#[command(version, about = "Serves the list/create/update/delete routes of a schedule board")]
struct Args {
    /// Address to listen on. Overrides BIND_ADDR
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    match Config::from_env() {
        Ok(mut config) => {
            if let Some(addr) = args.bind {
                config.bind_addr = addr;
            }
            gateway::serve(&config).await?;
        },
        Err(err) => {
            // Keep serving, so that clients get a proper error instead of a refused connection
            log::error!("Invalid configuration: {}. Every request will fail until this is fixed", err);
            let addr = match args.bind {
                Some(addr) => addr,
                None => DEFAULT_BIND_ADDR.parse()?,
            };
            gateway::serve_context(addr, AppContext::misconfigured(&err)).await?;
        },
    }
    Ok(())
}
