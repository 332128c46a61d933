use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tombot::channels::InboundEvent;
use tombot::config;
use tombot::dispatch::Dispatcher;
use tombot::publish::LogPublisher;

#[derive(Parser)]
#[command(name = "tombot")]
#[command(about = "Tombot: route LINE chat commands to message-bus topics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook gateway. Topics and the channel secret come from the config file or CHANNEL_SECRET, PING_TOPIC_ARN and UNKNOWN_TOPIC_ARN.
    Serve {
        /// Config file path (default: TOMBOT_CONFIG_PATH or ~/.tombot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Show which topic a message text would be routed to. Nothing is published.
    Route {
        /// Config file path (default: TOMBOT_CONFIG_PATH or ~/.tombot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Message text, e.g. "tmb ping"
        text: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("tombot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Route { config, text }) => {
            if let Err(e) = run_route(config, &text) {
                log::error!("route failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn load(config_path: Option<PathBuf>) -> anyhow::Result<config::Config> {
    let (config, path) = config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    Ok(config::apply_env_overrides(config))
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = load(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    tombot::gateway::run_gateway(config).await
}

fn run_route(config_path: Option<PathBuf>, text: &str) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let dispatcher = Dispatcher::from_config(&config.routing, Arc::new(LogPublisher))?;
    let event = InboundEvent::text_message("cli", text);
    match dispatcher.route(&event) {
        Some(topic) => println!("{:?} -> {}", text, topic),
        None => println!(
            "no command (text does not start with {:?})",
            dispatcher.prefix()
        ),
    }
    Ok(())
}
