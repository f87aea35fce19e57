use std::path::PathBuf;

use clap::Parser;
use flexi_logger::{Duplicate, Logger};
use log::{error, warn};

use ludserver::config::Config;
use ludserver::server::Server;

/// A small single-threaded IRC relay server.
#[derive(Parser, Debug)]
#[command(name = "ludserverd", version, about)]
struct Cli {
    /// Path to a TOML configuration file (spec §6). Falls back to built-in
    /// defaults if the file does not exist or fails to parse.
    #[arg(short, long, default_value = "ludserver.toml")]
    config: PathBuf,

    /// Overrides `network.port` from the configuration file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level passed straight through to `flexi_logger` (error, warn,
    /// info, debug, trace).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();

    Logger::try_with_str(&cli.log_level)
        .and_then(|op| {
            op.log_to_stderr()
                .duplicate_to_stderr(Duplicate::All)
                .start()
        })
        .ok();

    let mut config = Config::load(&cli.config).unwrap_or_else(|e| {
        warn!(
            "could not load configuration from {:?} ({e}); using defaults",
            cli.config
        );
        Config::default()
    });

    if let Some(port) = cli.port {
        config.network.port = port;
    }

    let mut server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!("failed to start server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        error!("server exited: {e}");
        std::process::exit(1);
    }
}
