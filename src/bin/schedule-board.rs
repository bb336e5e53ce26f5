//! Fetches the schedules of a gateway, and prints the upcoming ones

use std::error::Error;

use clap::Parser;

use schedule_board::pipeline::{Entity, InstitutionFilter};
use schedule_board::utils::{print_board, print_schedule};
use schedule_board::{Board, Client, KeyMapping};

#[derive(Parser, Debug)]
#[command(version, about = "Prints the upcoming schedules of a schedule board")]
struct Args {
    /// Root URL of the gateway
    #[arg(env = "SCHEDULE_GATEWAY_URL", default_value = "http://localhost:8888/")]
    url: String,

    /// Only show schedules that contain this text
    #[arg(short, long, default_value = "")]
    query: String,

    /// Only show the schedules of this institution
    #[arg(short, long, default_value = "all")]
    institution: String,

    /// Show every schedule of this participant instead
    #[arg(short, long)]
    participant: Option<String>,

    /// The gateway is backed by a spreadsheet
    #[arg(long)]
    sheet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut client = Client::new(&args.url)?;
    if args.sheet {
        client = client.with_key_mapping(KeyMapping::sheet());
    }

    let mut board = Board::new();
    if board.refresh(&client).await == false {
        log::warn!("Unable to fetch schedules from {}", args.url);
    }
    if board.last_rejected() > 0 {
        log::info!("{} rows were skipped", board.last_rejected());
    }

    match args.participant {
        Some(name) => {
            let entity = Entity::Participant(name);
            println!("Schedules of {}:", entity.name());
            for record in board.related(&entity) {
                print_schedule(record);
            }
        },
        None => {
            board.set_query_text(&args.query);
            board.set_institution(InstitutionFilter::from_selector(&args.institution));
            print_board(&board);
        },
    }
    Ok(())
}
