//! Manual control tool for the door service.
//!
//! Usage:
//!   cargo run --bin door -- toggle
//!   cargo run --bin door -- status
//!   cargo run --bin door -- climate

use chrono::Local;
use clap::{Parser, Subcommand};
use garage_bridge::config::HttpConfig;
use garage_bridge::input::http::Poller;
use garage_bridge::state::Reconciler;

#[derive(Parser)]
#[command(name = "door")]
#[command(about = "Command and query the garage door service")]
struct Cli {
    /// Base URL of the door service
    #[arg(long, env = "GARAGE_HTTP_BASE_URL", default_value = "http://192.168.1.75:5000")]
    base_url: String,

    /// Freshness window in minutes for the stale marker
    #[arg(long, env = "GARAGE_FRESHNESS_WINDOW_MINS", default_value_t = 60)]
    freshness_window_mins: i64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Toggle the door (the service decides open vs close)
    Toggle,
    /// Fetch and print the door position
    Status,
    /// Fetch and print the temperature/humidity reading
    Climate,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let poller = Poller::new(HttpConfig {
        base_url: cli.base_url,
    });

    let outcome = match cli.command {
        Commands::Toggle => poller.command_door().await.map(|()| {
            println!("Door command sent");
        }),
        Commands::Status => {
            let mut reconciler = Reconciler::new(cli.freshness_window_mins);
            match poller.fetch_door().await {
                Ok(obs) => reconciler
                    .apply(obs, Local::now().naive_local())
                    .map(|()| {
                        let s = reconciler.snapshot();
                        println!("The garage door is: {}", s.door);
                        if s.stale {
                            println!("(reading may be stale, last event {:?})", s.last_event);
                        }
                        if s.door_battery_low {
                            println!("Low tilt sensor battery");
                        }
                    }),
                Err(e) => Err(e),
            }
        }
        Commands::Climate => {
            let mut reconciler = Reconciler::new(cli.freshness_window_mins);
            match poller.fetch_climate().await {
                Ok(obs) => reconciler
                    .apply(obs, Local::now().naive_local())
                    .map(|()| {
                        let s = reconciler.snapshot();
                        println!("Temperature: {} deg", s.temperature);
                        println!("Humidity:    {} %", s.humidity);
                        if s.stale {
                            println!("(reading may be stale, last event {:?})", s.last_event);
                        }
                        if s.temperature_battery_low {
                            println!("Low temp/humidity sensor battery");
                        }
                    }),
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
