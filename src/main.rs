use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use leasereport::{Config, Error, LeaseParser, LeaseStore, Result, TimeZoneSetting, report};

#[derive(Parser)]
#[command(name = "leasereport")]
#[command(author, version, about = "Reports leases from a dhcpd.leases snapshot", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "leasereport.json")]
    config: PathBuf,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Lease file to read instead of the configured one
    #[arg(long)]
    leases: Option<PathBuf>,

    /// Zone of the lease timestamps: utc, local or an offset like -05:00
    #[arg(long)]
    time_zone: Option<TimeZoneSetting>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Report {
        #[arg(long, value_enum, default_value = "csv")]
        format: Format,

        /// Only include leases that have not ended yet
        #[arg(long)]
        active_only: bool,
    },
    ShowConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(leases) = cli.leases {
        config.leases_file = leases;
    }
    if let Some(time_zone) = cli.time_zone {
        config.time_zone = time_zone;
    }
    config.validate()?;

    let command = cli.command.unwrap_or(Commands::Report {
        format: Format::Csv,
        active_only: false,
    });

    match command {
        Commands::Report {
            format,
            active_only,
        } => {
            let file = File::open(&config.leases_file).map_err(|source| Error::LeaseFile {
                path: config.leases_file.clone(),
                source,
            })?;
            info!(
                "Reading {:?} with time zone {}",
                config.leases_file, config.time_zone
            );

            let mut store = LeaseStore::new();
            LeaseParser::from_config(&config).parse(file, &mut store)?;

            let mut leases = report::sorted_leases(&store);
            if active_only {
                leases.retain(|lease| lease.is_active());
            }

            let mut out = BufWriter::new(io::stdout().lock());
            match format {
                Format::Csv => report::write_csv(&mut out, &leases)?,
                Format::Json => report::write_json(&mut out, &leases)?,
            }
            out.flush()?;
            Ok(())
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
