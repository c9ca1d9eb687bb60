use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eqjudge_iface::{detect_circuit_traits, parse_verilog_file, Interface};
use eqjudge_judge::{synthesizer_table, Judge, Toolchain};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// eqjudge - grade hardware designs by formal equivalence
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Judge directory
    #[arg(short, long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Toolchain configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade the submission in the judge directory
    Judge,

    /// Print the canonical interfaces of a synthesized netlist
    Iface {
        /// Verilog netlist
        netlist: PathBuf,
    },

    /// Print the circuit traits of an interface file
    Traits {
        /// `.iface` file
        iface: PathBuf,
    },

    /// Print the counterexample contained in a checker trace
    Counterexample {
        /// Value-change dump written by the checker
        trace: PathBuf,

        /// Interface of the submitted module
        iface: PathBuf,
    },

    /// Print the filtered copy of a checker trace
    CleanVcd {
        /// Value-change dump written by the checker
        trace: PathBuf,
    },

    /// Print the supported synthesizers
    Synthesizers,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let toolchain = load_toolchain(cli.config.as_deref())?;

    match cli.command {
        Commands::Judge => judge(&cli.dir, toolchain)?,
        Commands::Iface { netlist } => print_interfaces(&netlist)?,
        Commands::Traits { iface } => print_traits(&iface)?,
        Commands::Counterexample { trace, iface } => print_counterexample(&trace, &iface)?,
        Commands::CleanVcd { trace } => print_clean_trace(&trace)?,
        Commands::Synthesizers => {
            let table = synthesizer_table(&toolchain);
            print!("{}", serde_yaml::to_string(&table)?);
        }
    }

    Ok(())
}

fn load_toolchain(path: Option<&Path>) -> Result<Toolchain> {
    match path {
        Some(path) => Toolchain::from_path(path)
            .with_context(|| format!("Failed to load toolchain configuration {}", path.display())),
        None => Ok(Toolchain::default()),
    }
}

/// Run the verdict pipeline
fn judge(dir: &Path, toolchain: Toolchain) -> Result<()> {
    info!("Judging {}", dir.display());
    let record = Judge::new(dir, toolchain)
        .run()
        .with_context(|| format!("Judge run in {} failed", dir.display()))?;
    println!("{}", record.verdict);
    Ok(())
}

fn print_interfaces(netlist: &Path) -> Result<()> {
    let ifaces = parse_verilog_file(netlist)
        .with_context(|| format!("Failed to scan {}", netlist.display()))?;
    for iface in ifaces.values() {
        print!("{}", iface.to_iface_string());
    }
    Ok(())
}

fn print_traits(path: &Path) -> Result<()> {
    let iface = Interface::read_iface(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let traits = detect_circuit_traits(&iface).context("Invalid interface")?;
    println!("{}", serde_json::to_string_pretty(&traits)?);
    Ok(())
}

fn print_counterexample(trace: &Path, iface: &Path) -> Result<()> {
    let iface = Interface::read_iface(iface)
        .with_context(|| format!("Failed to read {}", iface.display()))?;
    let counterexample = eqjudge_wave::counterexample_from_file(trace, &iface)
        .with_context(|| format!("Failed to extract a counterexample from {}", trace.display()))?;
    println!("{}", counterexample.to_json_pretty()?);
    Ok(())
}

fn print_clean_trace(trace: &Path) -> Result<()> {
    let file = File::open(trace).with_context(|| format!("Failed to open {}", trace.display()))?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    eqjudge_wave::clean_vcd(BufReader::new(file), &mut out)?;
    out.flush()?;
    Ok(())
}
