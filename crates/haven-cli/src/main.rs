//! Command-line front end for the Haven core
//!
//! Every invocation starts at the disguise; nothing about an unlock is
//! remembered between runs.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::App;
use haven_core::PinRole;
use haven_params::{default_data_dir, HavenConfig, CONFIG_FILE_NAME};
use haven_storage::EvidenceKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "haven")]
#[command(about = "Disguised safety vault", long_about = None)]
struct Cli {
    /// Data directory (defaults to $HAVEN_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to haven.json in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// First-run setup of the real PIN
    Setup {
        /// New PIN
        pin: String,
        /// Same PIN again
        confirm: String,
    },

    /// Configure a decoy, wipe or vault PIN
    SetPin {
        /// Role to configure (decoy, wipe, vault)
        role: PinRole,
        /// New PIN for the role
        pin: String,
        /// Real PIN authorizing the change
        #[arg(long)]
        real: String,
    },

    /// Enter a PIN at the disguise
    Unlock {
        /// PIN to enter
        pin: String,
    },

    /// Evidence vault operations
    Evidence {
        #[command(subcommand)]
        command: EvidenceCommands,
    },

    /// Change the PIN for a role, re-keying evidence when needed
    ChangePin {
        /// Role to change
        role: PinRole,
        /// Current PIN
        old: String,
        /// New PIN
        new: String,
    },

    /// Erase every PIN, evidence record and setting
    Wipe {
        /// Real PIN authorizing the wipe
        #[arg(long)]
        real: String,
    },

    /// Settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum EvidenceCommands {
    /// Encrypt and store a new record
    Add {
        /// Record kind
        #[arg(short, long, value_enum, default_value = "note")]
        kind: KindArg,
        /// Title shown in listings
        #[arg(short, long)]
        title: Option<String>,
        /// Inline text content
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Read content from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Latitude,longitude of capture
        #[arg(long, value_parser = parse_geo)]
        geo: Option<(f64, f64)>,
        /// Vault PIN
        #[arg(long)]
        pin: String,
    },

    /// List record metadata, newest first
    List {
        /// Vault PIN
        #[arg(long)]
        pin: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Decrypt one record
    Reveal {
        /// Record id
        id: String,
        /// Vault PIN
        #[arg(long)]
        pin: String,
        /// Write the content to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Permanently delete one record
    Delete {
        /// Record id
        id: String,
        /// Vault PIN
        #[arg(long)]
        pin: String,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print the current settings as JSON
    Show,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Photo,
    Audio,
    Note,
}

impl From<KindArg> for EvidenceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Photo => EvidenceKind::Photo,
            KindArg::Audio => EvidenceKind::Audio,
            KindArg::Note => EvidenceKind::Note,
        }
    }
}

fn parse_geo(value: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| "expected <lat>,<lon>".to_string())?;
    let lat = lat.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let lon = lon.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok((lat, lon))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()
            .ok_or_else(|| anyhow::anyhow!("No data directory available; pass --data-dir"))?,
    };
    let config_path = cli.config.unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME));
    let config = HavenConfig::load(&config_path)?;
    tracing::debug!("Using data directory {}", data_dir.display());

    let app = App::open(&data_dir, config)?;
    let mut stdout = std::io::stdout().lock();
    let out = &mut stdout;

    match cli.command {
        Commands::Setup { pin, confirm } => app.setup(&pin, &confirm, out)?,
        Commands::SetPin { role, pin, real } => app.set_pin(role, &pin, &real, out)?,
        Commands::Unlock { pin } => app.unlock(&pin, out)?,
        Commands::Evidence { command } => match command {
            EvidenceCommands::Add {
                kind,
                title,
                text,
                file,
                geo,
                pin,
            } => {
                let content = match (text, file) {
                    (Some(text), _) => text.into_bytes(),
                    (None, Some(path)) => std::fs::read(&path)?,
                    (None, None) => anyhow::bail!("Provide --text or --file"),
                };
                app.add_evidence(kind.into(), &content, title, geo, &pin, out)?
            }
            EvidenceCommands::List { pin, json } => app.list_evidence(&pin, json, out)?,
            EvidenceCommands::Reveal { id, pin, out: dest } => {
                app.reveal_evidence(&id, &pin, dest.as_deref(), out)?
            }
            EvidenceCommands::Delete { id, pin } => app.delete_evidence(&id, &pin, out)?,
        },
        Commands::ChangePin { role, old, new } => app.change_pin(role, &old, &new, out)?,
        Commands::Wipe { real } => app.wipe(&real, out)?,
        Commands::Settings { command } => match command {
            SettingsCommands::Show => app.show_settings(out)?,
        },
    }

    Ok(())
}
