//! # tessera CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tessera_cli::ceremony::{
    run_phase1_init, run_phase2_contribute, run_phase2_extract, run_phase2_init,
    run_phase2_verify, Phase1InitArgs, Phase2ContributeArgs, Phase2ExtractArgs, Phase2InitArgs,
    Phase2VerifyArgs,
};
use tessera_cli::devtools::{
    run_ptau_dev, run_r1cs_export, run_zkey_export_vk, PtauDevArgs, R1csExportArgs,
    ZkeyExportVkArgs,
};

/// tessera trusted-setup toolchain
///
/// Runs the Groth16 Phase 2 ceremony for the consensus circuit, one stage
/// per invocation.
#[derive(Parser, Debug)]
#[command(name = "tessera", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lift a powers-of-tau transcript into a Phase 1 artifact.
    Phase1Init(Phase1InitArgs),

    /// Derive the initial Phase 2 state and evaluations for a circuit.
    Phase2Init(Phase2InitArgs),

    /// Add one randomness contribution to a Phase 2 state.
    Phase2Contribute(Phase2ContributeArgs),

    /// Check that one Phase 2 state is a valid contribution to another.
    Phase2Verify(Phase2VerifyArgs),

    /// Produce Groth16 proving and verifying keys.
    Phase2Extract(Phase2ExtractArgs),

    /// Write an INSECURE locally generated powers-of-tau transcript.
    PtauDev(PtauDevArgs),

    /// Write the consensus circuit's constraint system.
    R1csExport(R1csExportArgs),

    /// Export the verifying key from a snarkjs zkey.
    ZkeyExportVk(ZkeyExportVkArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Phase1Init(args) => run_phase1_init(args),
        Commands::Phase2Init(args) => run_phase2_init(args),
        Commands::Phase2Contribute(args) => run_phase2_contribute(args),
        Commands::Phase2Verify(args) => run_phase2_verify(args),
        Commands::Phase2Extract(args) => run_phase2_extract(args),
        Commands::PtauDev(args) => run_ptau_dev(args),
        Commands::R1csExport(args) => run_r1cs_export(args),
        Commands::ZkeyExportVk(args) => run_zkey_export_vk(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
