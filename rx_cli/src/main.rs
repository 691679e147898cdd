use clap::{Parser, Subcommand};
use rx_core::*;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "rxledger")]
#[command(about = "Prescription registry on a key/value ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Load configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the asset value and reset the registry to empty
    Init { value: String },

    /// Create a prescription
    Add {
        /// Prescription id (defaults to a fresh UUID)
        #[arg(long)]
        id: Option<String>,
        patient: String,
        doctor: String,
        drug: String,
        dosage: String,
        units: String,
        description: String,
    },

    /// Mark a prescription filled
    Fill { id: String, pharmacist: String },

    /// Print the raw value stored under a key
    Query { key: String },

    /// Store a raw value under a key
    Write { key: String, value: String },

    /// List prescriptions in the registry
    List {
        /// Only prescriptions not yet filled
        #[arg(long, conflicts_with = "filled")]
        pending: bool,

        /// Only filled prescriptions
        #[arg(long)]
        filled: bool,
    },

    /// Export the registry to CSV
    Export { path: PathBuf },

    /// Run a ledger operation by name with raw string arguments
    Invoke {
        operation: String,
        args: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    rx_core::logging::init(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path).map_err(|e| {
            tracing::error!("Unable to load config {:?}: {}", path, e);
            e
        })?,
        None => Config::load()?,
    };
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }

    let engine = config.engine();
    // Held for the whole command so concurrent runs cannot interleave
    let ledger_path = config.ledger_path();
    let mut ledger = FileLedger::open_locked(&ledger_path).map_err(|e| {
        tracing::error!("Unable to open ledger {:?}: {}", ledger_path, e);
        e
    })?;
    tracing::debug!(
        "Using ledger {:?} (registry key {:?})",
        ledger.path(),
        engine.registry_key()
    );

    match cli.command {
        Commands::Init { value } => {
            invoke(&engine, &mut ledger, "init", &[value])?;
            println!("✓ Registry initialized");
        }
        Commands::Add {
            id,
            patient,
            doctor,
            drug,
            dosage,
            units,
            description,
        } => {
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let args = [id.clone(), patient, doctor, drug, dosage, units, description];
            invoke(&engine, &mut ledger, "add_prescription", &args)?;
            println!("✓ Added prescription {}", id);
        }
        Commands::Fill { id, pharmacist } => {
            invoke(&engine, &mut ledger, "fill_prescription", &[id.clone(), pharmacist])?;
            println!("✓ Filled prescription {}", id);
        }
        Commands::Query { key } => {
            let value = invoke(&engine, &mut ledger, "query", &[key])?;
            print_raw(&value)?;
        }
        Commands::Write { key, value } => {
            invoke(&engine, &mut ledger, "write", &[key, value])?;
        }
        Commands::List { pending, filled } => {
            let registry = engine.registry(&ledger)?;
            let shown: Vec<&Prescription> = if pending {
                registry.pending().collect()
            } else if filled {
                registry.filled().collect()
            } else {
                registry.list.iter().collect()
            };
            display_prescriptions(&shown);
        }
        Commands::Export { path } => {
            let registry = engine.registry(&ledger)?;
            let count = export_csv(&registry.list, &path)?;
            println!("✓ Exported {} prescriptions", count);
            println!("  CSV: {}", path.display());
        }
        Commands::Invoke { operation, args } => {
            let value = invoke(&engine, &mut ledger, &operation, &args)?;
            print_raw(&value)?;
        }
    }

    Ok(())
}

fn print_raw(value: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(value)?;
    if !value.is_empty() {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

fn display_prescriptions(prescriptions: &[&Prescription]) {
    if prescriptions.is_empty() {
        println!("No prescriptions.");
        return;
    }

    for rx in prescriptions {
        let status = if rx.filled {
            format!("filled by {}", rx.pharmacist)
        } else {
            "pending".to_string()
        };
        println!("{}  [{}]", rx.id, status);
        println!(
            "  {} {} {} for {} (prescribed by {})",
            rx.drug, rx.dosage, rx.units, rx.patient, rx.doctor
        );
        if !rx.description.is_empty() {
            println!("  {}", rx.description);
        }
    }
}
