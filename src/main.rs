mod app;
mod classifier;
mod config;
mod error;
mod game;
mod help;
mod input;
mod logging;
mod mailbox;
mod settings;
mod terminal;

use clap::{Args, Parser, Subcommand};
use config::GameConfig;
use error::Result;
use input::serial;
use input::telemetry::TelemetryParser;
use settings::Settings;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "termfire")]
#[command(author = "Terminal Art Generator")]
#[command(version = "0.1.0")]
#[command(about = "Terminal fire-fighting game driven by micro:bit serial telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the game
    Play(PlayArgs),

    /// List serial ports
    Ports,

    /// Print parsed micro:bit telemetry until interrupted
    Monitor {
        /// Serial port (auto-detects a micro:bit when omitted)
        #[arg(short, long)]
        port: Option<String>,

        #[arg(short, long)]
        baud: Option<u32>,
    },
}

#[derive(Args, Default)]
struct PlayArgs {
    /// Serial port (auto-detects a micro:bit when omitted)
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long)]
    baud: Option<u32>,

    /// Frames per fire cycle; fires grow at half and spread at the end
    #[arg(short, long)]
    tick_speed: Option<u32>,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(long)]
    fps: Option<u32>,

    /// Canvas width in logical pixels
    #[arg(long)]
    width: Option<f32>,

    /// Canvas height in logical pixels
    #[arg(long)]
    height: Option<f32>,

    /// File or FIFO with JSON predictions from the keyword and colour classifiers
    #[arg(long)]
    predictions: Option<PathBuf>,

    /// Use the microphone level as the blow sensor when no micro:bit is present
    #[arg(long)]
    mic: bool,

    /// Keyboard only, do not open a serial port
    #[arg(long)]
    no_serial: bool,

    #[arg(long, default_value = logging::DEFAULT_LOG_PATH)]
    log_file: PathBuf,

    /// Print a JSON summary of the session on exit
    #[arg(long)]
    summary: bool,
}

/// Layer command-line flags over the settings file over built-in defaults
fn game_config(args: &PlayArgs, settings: &Settings) -> GameConfig {
    let mut cfg = GameConfig::default();
    let game = &settings.game;

    cfg.sim.fire_tick_speed = args.tick_speed.or(game.tick_speed).unwrap_or(cfg.sim.fire_tick_speed);
    cfg.sim.width = args.width.or(game.width).unwrap_or(cfg.sim.width);
    cfg.sim.height = args.height.or(game.height).unwrap_or(cfg.sim.height);
    cfg.sim.large_burnout_life = game.large_burnout_life.unwrap_or(cfg.sim.large_burnout_life);
    cfg.fps = args.fps.or(game.fps).unwrap_or(cfg.fps);

    cfg.seed = args.seed;
    cfg.serial = !args.no_serial;
    cfg.port = args.port.clone().or_else(|| settings.serial.port.clone());
    cfg.baud = args.baud.or(settings.serial.baud).unwrap_or(cfg.baud);

    let input = &settings.input;
    cfg.key_hold_ms = input.key_hold_ms.unwrap_or(cfg.key_hold_ms);
    cfg.mic = args.mic || input.mic.unwrap_or(false);
    cfg.mic_gain = input.mic_gain.unwrap_or(cfg.mic_gain);

    cfg.predictions = args
        .predictions
        .clone()
        .or_else(|| settings.classifier.predictions.clone());
    cfg.summary = args.summary;
    cfg
}

fn play(args: PlayArgs) -> Result<()> {
    logging::init(&args.log_file);
    let settings = Settings::load();
    let config = game_config(&args, &settings);

    let summary = app::run(config.clone())?;
    if config.summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn ports() -> Result<()> {
    logging::init_stderr();
    let ports = serial::list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

fn monitor(port: Option<String>, baud: Option<u32>) -> Result<()> {
    logging::init_stderr();
    let settings = Settings::load();
    let port_name = port.or(settings.serial.port);
    let baud = baud.or(settings.serial.baud).unwrap_or(config::DEFAULT_BAUD);

    let mut port = serial::open_port(port_name.as_deref(), baud)?;
    eprintln!(
        "Listening on {} at {baud} baud (Ctrl-C to stop)",
        port.name().unwrap_or_else(|| "serial".into())
    );

    let mut parser = TelemetryParser::new();
    let mut buf = [0u8; 256];
    loop {
        match port.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => {
                for t in parser.feed(&buf[..n]) {
                    println!("P0:{} P1:{} S:{}", t.p0, t.p1, t.s);
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {}
            Err(e) => return Err(e.into()),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play(args) => play(args),
        Commands::Ports => ports(),
        Commands::Monitor { port, baud } => monitor(port, baud),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("termfire: {e}");
            ExitCode::FAILURE
        }
    }
}
