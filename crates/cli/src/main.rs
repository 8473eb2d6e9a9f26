use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use dispensary_infra::event_store::EventStore;
use dispensary_infra::{Dispensary, DispensaryConfig};
use dispensary_parties::Directory;
use dispensary_requisitions::{Requisition, RequisitionKind};

#[derive(Parser)]
#[command(name = "dispensary-cli")]
#[command(about = "Inspect a dispensary journal")]
struct Cli {
    /// Directory holding journal.jsonl (overrides DISPENSARY_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List medications with their quantity on hand
    Stock,
    /// List recorded requisitions, oldest first
    History {
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Incoming,
    Outgoing,
}

impl From<KindArg> for RequisitionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Incoming => RequisitionKind::Incoming,
            KindArg::Outgoing => RequisitionKind::Outgoing,
        }
    }
}

fn main() -> anyhow::Result<()> {
    dispensary_observability::init();
    let cli = Cli::parse();

    let config = match cli.data_dir {
        Some(dir) => DispensaryConfig::with_data_dir(dir),
        None => DispensaryConfig::from_env().context("reading configuration")?,
    };

    match config.data_dir {
        Some(dir) => {
            tracing::debug!(data_dir = %dir.display(), "opening data directory");
            let dispensary = Dispensary::open_data_dir(&dir)
                .with_context(|| format!("opening data directory {}", dir.display()))?;
            run(&dispensary, cli.command)
        }
        None => {
            tracing::warn!("no data directory configured; using an empty in-memory journal");
            let dispensary = Dispensary::in_memory(Directory::in_memory())
                .context("opening in-memory journal")?;
            run(&dispensary, cli.command)
        }
    }
}

fn run<S: EventStore>(dispensary: &Dispensary<S>, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Stock => {
            let medications = dispensary.medications()?;
            if medications.is_empty() {
                println!("No medications registered.");
            }
            for m in medications {
                println!(
                    "{}  {:<32} {:>8} {}",
                    m.id_typed(),
                    m.name(),
                    m.quantity_on_hand(),
                    m.unit()
                );
            }
        }
        Commands::History { kind } => {
            let requisitions = dispensary.requisitions(kind.map(Into::into))?;
            if requisitions.is_empty() {
                println!("No requisitions recorded.");
            }
            for r in requisitions {
                println!("{}", describe(&r));
            }
        }
    }
    Ok(())
}

fn describe(requisition: &Requisition) -> String {
    let head = format!(
        "{}  {:<8} {}  employee {}",
        requisition.occurred_at().format("%Y-%m-%d %H:%M"),
        requisition.kind().to_string(),
        requisition.id(),
        requisition.employee_id()
    );
    match requisition {
        Requisition::Incoming(r) => format!(
            "{head}  +{} of {}",
            r.quantity().get(),
            r.medication_id()
        ),
        Requisition::Outgoing(r) => {
            let lines: Vec<String> = r
                .lines()
                .iter()
                .map(|l| format!("-{} of {}", l.quantity.get(), l.medication_id))
                .collect();
            format!(
                "{head}  prescription {} for patient {}: {}",
                r.prescription_id(),
                r.patient_id(),
                lines.join(", ")
            )
        }
    }
}
