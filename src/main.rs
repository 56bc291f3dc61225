use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pktvis::config::{Config, LoggingConfig};
use pktvis::filter::{CombinePolicy, FilterState};
use pktvis::replay::{self, Pace};
use pktvis::store::PacketStore;
use pktvis::transport::{ConnectionState, EventBus, Target};
use pktvis::tui::{self, App};
use pktvis::{io, Record, Session};

/// Live viewer for decoded packet streams
#[derive(Parser)]
#[command(name = "pktvis")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Open the terminal viewer (default)
    View {
        /// Decoder websocket host:port; the local bus when omitted
        #[arg(short, long)]
        address: Option<String>,

        /// Play a dump back onto the local bus at its recorded pace
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Load a dump or pcap capture into the store on startup
        #[arg(long)]
        import: Option<PathBuf>,
    },

    /// Log every packet to stderr; writes a dump on Ctrl-C
    Tail {
        /// Decoder websocket host:port; the local bus when omitted
        #[arg(short, long)]
        address: Option<String>,

        /// Play a dump back onto the local bus at its recorded pace
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Do not write a dump on exit
        #[arg(long)]
        no_dump: bool,
    },

    /// Run the packet filter over a dump or pcap capture
    Filter {
        file: PathBuf,

        /// Name filter (type id or name substring)
        #[arg(short, long, default_value = "")]
        name: String,

        /// Content query
        #[arg(short, long, default_value = "")]
        content: String,

        /// Keep a packet when either filter matches
        #[arg(long)]
        or: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the configuration file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    let command = cli.command.unwrap_or(Command::View {
        address: None,
        replay: None,
        import: None,
    });

    // The viewer owns the terminal, so its logs go to a file
    let log_to_file = matches!(command, Command::View { .. });
    init_logging(&config.logging, cli.verbose, log_to_file)?;

    match command {
        Command::View {
            address,
            replay,
            import,
        } => run_view(&config, address, replay, import).await,
        Command::Tail {
            address,
            replay,
            no_dump,
        } => run_tail(&config, address, replay, no_dump).await,
        Command::Filter {
            file,
            name,
            content,
            or,
            format,
        } => {
            let combine = if or {
                CombinePolicy::Or
            } else {
                config.filter.combine
            };
            run_filter(&config, &file, &name, &content, combine, format)
        }
        Command::Config { save } => {
            if save {
                let path = config.save(cli.config.as_deref())?;
                println!("saved {}", path.display());
            } else {
                print!("{}", config.to_toml()?);
            }
            Ok(())
        }
    }
}

fn init_logging(logging: &LoggingConfig, verbose: bool, to_file: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    if to_file {
        if let Some(parent) = logging.file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&logging.file)
            .with_context(|| format!("failed to open log file {}", logging.file.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

fn target_for(config: &Config, address: Option<String>) -> Target {
    Target::from_address(address.or_else(|| config.transport.address.clone()).as_deref())
}

async fn run_view(
    config: &Config,
    address: Option<String>,
    replay: Option<PathBuf>,
    import: Option<PathBuf>,
) -> Result<()> {
    let bus = Arc::new(EventBus::new());
    let mut session = Session::new(Arc::clone(&bus), config);

    let target = target_for(config, address);
    session.connect(target.clone());
    session.poll();

    if let Some(path) = import {
        if session.awaiting_open() {
            warn!(%target, "--import is cleared when the socket opens; use --replay or import from the viewer");
        }
        session
            .import(&path)
            .with_context(|| format!("failed to import {}", path.display()))?;
    }

    if let Some(path) = replay {
        start_replay(config, bus, &target, &path)?;
    }

    tui::run(App::new(session))?;
    Ok(())
}

/// Spawn a paced replay of a dump onto the local bus.
fn start_replay(config: &Config, bus: Arc<EventBus>, target: &Target, path: &Path) -> Result<()> {
    let records = io::load(path, &config.capture)
        .with_context(|| format!("failed to load {}", path.display()))?;
    if *target != Target::Bus {
        warn!(%target, "replaying onto the local bus, which is not the attached source");
    }

    tokio::spawn(replay::run(
        bus,
        config.transport.bus_channel.clone(),
        records,
        Pace::Recorded,
    ));
    Ok(())
}

async fn run_tail(
    config: &Config,
    address: Option<String>,
    replay: Option<PathBuf>,
    no_dump: bool,
) -> Result<()> {
    let bus = Arc::new(EventBus::new());
    let mut session = Session::new(Arc::clone(&bus), config);
    let target = target_for(config, address);
    session.connect(target.clone());

    if let Some(path) = replay {
        start_replay(config, bus, &target, &path)?;
    }
    info!(%target, "tailing packets, Ctrl-C to stop");

    let mut epoch = session.store().epoch();
    let mut logged = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            applied = session.next_event() => {
                match applied {
                    None => break,
                    Some(false) => continue,
                    Some(true) => {}
                }

                let store = session.store();
                if store.epoch() != epoch {
                    epoch = store.epoch();
                    logged = 0;
                }
                for record in store.iter().skip(logged) {
                    info!("{record}");
                }
                logged = store.len();

                let closed = session
                    .connection()
                    .is_some_and(|c| c.state == ConnectionState::Closed);
                if closed {
                    warn!(%target, "source closed, stopping");
                    break;
                }
            }
        }
    }

    session.disconnect();
    if !no_dump && !session.store().is_empty() {
        let path = session.export()?;
        info!(path = %path.display(), "wrote dump");
    }
    Ok(())
}

fn run_filter(
    config: &Config,
    file: &Path,
    name: &str,
    content: &str,
    combine: CombinePolicy,
    format: Format,
) -> Result<()> {
    let records = io::load(file, &config.capture)
        .with_context(|| format!("failed to load {}", file.display()))?;

    let filter = FilterState::new(name, content, combine);
    if let Some(e) = filter.query_error() {
        warn!(error = %e, "content query matches nothing");
    }

    let mut store = PacketStore::new();
    for record in records {
        store.append(record);
    }
    let matched: Vec<_> = store.iter().filter(|r| filter.matches(r)).collect();
    info!(total = store.len(), matched = matched.len(), "filtered dump");

    match format {
        Format::Text => {
            for record in matched {
                let ordinal = record.ordinal.map_or(0, |o| o.index());
                println!("{ordinal:>6} {record}");
            }
        }
        Format::Json => {
            let records: Vec<&Record> = matched.iter().map(|r| r.as_ref()).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }
    Ok(())
}
