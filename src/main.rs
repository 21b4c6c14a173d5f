// src/main.rs - Headless launch host: UDP device link plus simulated frame loop
use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use launch_rs::config::{self, Config};
use launch_rs::launch::{self, default_sources, Bootstrap};
use launch_rs::{HeadlessHost, ParamValue, UdpLink};

/// Launch host CLI
#[derive(Parser, Debug)]
#[command(
    name = "launch-host",
    about = "Drives a stroke actuator over UDP from simulated motion sources."
)]
struct Cli {
    /// Path to a TOML config file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Motion source active at start
    #[arg(long)]
    source: Option<String>,

    /// Start transmitting immediately instead of paused
    #[arg(long)]
    start: bool,

    /// Frame loop rate in Hz
    #[arg(long)]
    frame_rate: Option<f32>,

    #[arg(long)]
    peer: Option<IpAddr>,

    #[arg(long)]
    send_port: Option<u16>,

    #[arg(long)]
    listen_port: Option<u16>,

    /// Parameter override (e.g. --param osc_speed=45)
    #[arg(long, value_parser = parse_key_val, number_of_values = 1)]
    param: Vec<(String, String)>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available motion sources
    ListSources,
    /// Run the frame loop until Ctrl-C (default)
    Run,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.find('=') {
        Some(pos) => Ok((s[..pos].to_string(), s[pos + 1..].to_string())),
        None => Err(format!("Invalid KEY=VAL: no `=` found in '{}'.", s)),
    }
}

fn parse_param_value(raw: &str) -> ParamValue {
    if let Ok(flag) = raw.parse::<bool>() {
        ParamValue::Bool(flag)
    } else if let Ok(value) = raw.parse::<f32>() {
        ParamValue::Float(value)
    } else {
        ParamValue::Choice(raw.to_string())
    }
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(source) = &cli.source {
        config.motion.source = source.clone();
    }
    if cli.start {
        config.motion.paused = false;
    }
    if let Some(rate) = cli.frame_rate {
        config.motion.frame_rate = rate;
    }
    if let Some(peer) = cli.peer {
        config.network.peer_ip = peer;
    }
    if let Some(port) = cli.send_port {
        config.network.send_port = port;
    }
    if let Some(port) = cli.listen_port {
        config.network.listen_port = port;
    }
    for (key, raw) in &cli.param {
        config.params.insert(key.clone(), parse_param_value(raw));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).init();

    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            tracing::info!("Loading configuration from: {}", path);
            config::load_config(&path).map_err(|e| {
                tracing::error!("Failed to load config from '{}': {}", path, e);
                Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
            })?
        }
        None => Config::default(),
    };
    apply_overrides(&cli, &mut config);

    if let Some(Commands::ListSources) = cli.command {
        for source in default_sources(&config.motion) {
            println!("{}", source.name());
        }
        return Ok(());
    }

    tracing::info!("Starting launch host");
    tracing::info!(
        "Device bridge: {}:{} (listening on {})",
        config.network.peer_ip,
        config.network.send_port,
        config.network.listen_port
    );

    let host = HeadlessHost::from_config(&config.animation);
    let mut driver = Bootstrap::new().start(&config, UdpLink::bind, Box::new(host))?;

    let frames = launch::run(&mut driver, config.motion.frame_rate, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    })
    .await;

    tracing::info!("Ran {} frames", frames);
    Ok(())
}
