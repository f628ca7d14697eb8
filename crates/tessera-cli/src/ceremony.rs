//! # Ceremony Subcommands
//!
//! One handler per pipeline stage. Each reads its inputs from disk, runs the
//! stage from `tessera-ceremony`, and writes its outputs atomically.
//!
//! ```text
//! ptau ──phase1-init──▶ phase1 ─┐
//!                               ├─phase2-init──▶ phase2₀ + evals
//! r1cs ─────────────────────────┘
//! phase2ᵢ ──phase2-contribute──▶ phase2ᵢ₊₁   (phase2-verify after each)
//! r1cs + phase1 + phase2ₙ + evals ──phase2-extract──▶ pk + vk
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use tessera_ceremony::{extract, short_hash, Phase1, Phase2, Phase2Evaluations, R1cs, Zkey};
use tessera_zkp::keys;

use crate::write_atomic;

/// Arguments for `phase1-init`.
#[derive(Args, Debug)]
pub struct Phase1InitArgs {
    /// Powers-of-tau transcript (`.ptau`).
    pub ptau: PathBuf,
    /// Phase 1 artifact to write.
    pub phase1_out: PathBuf,
}

/// Arguments for `phase2-init`.
#[derive(Args, Debug)]
pub struct Phase2InitArgs {
    /// Circuit constraint system (`.r1cs`).
    pub r1cs: PathBuf,
    /// Phase 1 artifact.
    pub phase1: PathBuf,
    /// Initial Phase 2 state to write.
    pub phase2_out: PathBuf,
    /// Phase 2 evaluations to write.
    pub evals_out: PathBuf,
}

/// Arguments for `phase2-contribute`.
#[derive(Args, Debug)]
pub struct Phase2ContributeArgs {
    /// Current Phase 2 state.
    pub phase2_in: PathBuf,
    /// Contributed Phase 2 state to write.
    pub phase2_out: PathBuf,
}

/// Arguments for `phase2-verify`.
#[derive(Args, Debug)]
pub struct Phase2VerifyArgs {
    /// State before the contribution.
    pub phase2_prev: PathBuf,
    /// State after the contribution.
    pub phase2_contrib: PathBuf,
}

/// Arguments for `phase2-extract`.
#[derive(Args, Debug)]
pub struct Phase2ExtractArgs {
    /// Circuit constraint system (`.r1cs`).
    pub r1cs: PathBuf,
    /// Phase 1 artifact.
    pub phase1: PathBuf,
    /// Final Phase 2 state.
    pub phase2: PathBuf,
    /// Phase 2 evaluations.
    pub evals: PathBuf,
    /// Proving key to write.
    pub pk_out: PathBuf,
    /// Verifying key to write.
    pub vk_out: PathBuf,
    /// Also write a verifier-only snarkjs zkey.
    #[arg(long, value_name = "FILE")]
    pub zkey: Option<PathBuf>,
}

/// `phase1_init`: lift a `ptau` file into a Phase 1 artifact.
pub fn run_phase1_init(args: &Phase1InitArgs) -> Result<u8> {
    let phase1 = Phase1::init(&args.ptau)
        .with_context(|| format!("failed to initialise phase 1 from {}", args.ptau.display()))?;
    write_atomic(&args.phase1_out, |w| phase1.write_to(w))?;
    println!(
        "OK: phase 1 power={} hash={} -> {}",
        phase1.power,
        short_hash(&phase1.hash),
        args.phase1_out.display()
    );
    Ok(0)
}

/// `phase2_init`: derive the initial Phase 2 state and the evaluations.
pub fn run_phase2_init(args: &Phase2InitArgs) -> Result<u8> {
    let r1cs = open_r1cs(&args.r1cs)?;
    let phase1 = open_phase1(&args.phase1)?;
    let (phase2, evals) = Phase2::init(&r1cs, &phase1).context("phase 2 initialisation failed")?;
    write_atomic(&args.evals_out, |w| evals.write_to(w))?;
    write_atomic(&args.phase2_out, |w| phase2.write_to(w))?;
    println!(
        "OK: phase 2 initialised constraints={} hash={}",
        r1cs.num_constraints(),
        short_hash(&phase2.hash)
    );
    Ok(0)
}

/// `phase2_contribute`: apply one contribution with fresh randomness.
pub fn run_phase2_contribute(args: &Phase2ContributeArgs) -> Result<u8> {
    let prev = open_phase2(&args.phase2_in)?;
    let next = prev
        .contribute(&mut rand::thread_rng())
        .context("contribution failed")?;
    write_atomic(&args.phase2_out, |w| next.write_to(w))?;
    println!(
        "OK: contribution #{} hash={}",
        next.contributions,
        short_hash(&next.hash)
    );
    Ok(0)
}

/// `phase2_verify`: check that `contrib` is one valid step from `prev`.
///
/// Exit code 1 if it is not.
pub fn run_phase2_verify(args: &Phase2VerifyArgs) -> Result<u8> {
    let prev = open_phase2(&args.phase2_prev)?;
    let next = open_phase2(&args.phase2_contrib)?;
    match Phase2::verify(&prev, &next) {
        Ok(()) => {
            println!(
                "OK: contribution #{} verified hash={}",
                next.contributions,
                short_hash(&next.hash)
            );
            Ok(0)
        }
        Err(e) => {
            tracing::warn!(error = %e, "contribution rejected");
            println!("FAIL: {e}");
            Ok(1)
        }
    }
}

/// `phase2_extract`: write the Groth16 keys.
pub fn run_phase2_extract(args: &Phase2ExtractArgs) -> Result<u8> {
    let r1cs = open_r1cs(&args.r1cs)?;
    let phase1 = open_phase1(&args.phase1)?;
    let phase2 = open_phase2(&args.phase2)?;
    let evals = Phase2Evaluations::open(&args.evals)
        .with_context(|| format!("failed to read evaluations {}", args.evals.display()))?;

    let (pk, vk) = extract(&r1cs, &phase1, &phase2, &evals).context("key extraction failed")?;
    let pk_bytes = keys::to_bytes(&pk);
    let vk_bytes = keys::to_bytes(&vk);

    write_atomic(&args.pk_out, |w| w.write_all(&pk_bytes))?;
    write_atomic(&args.vk_out, |w| w.write_all(&vk_bytes))?;
    if let Some(zkey_out) = &args.zkey {
        let zkey = Zkey::from_keys(&pk, r1cs.num_wires, r1cs.domain_size() as u32);
        write_atomic(zkey_out, |w| zkey.to_writer().write_to(w))?;
    }
    println!(
        "OK: extracted keys after {} contributions pk={}B vk={}B",
        phase2.contributions,
        pk_bytes.len(),
        vk_bytes.len()
    );
    Ok(0)
}

fn open_r1cs(path: &Path) -> Result<R1cs> {
    R1cs::open(path).with_context(|| format!("failed to read circuit {}", path.display()))
}

fn open_phase1(path: &Path) -> Result<Phase1> {
    Phase1::open(path).with_context(|| format!("failed to read phase 1 {}", path.display()))
}

fn open_phase2(path: &Path) -> Result<Phase2> {
    Phase2::open(path).with_context(|| format!("failed to read phase 2 {}", path.display()))
}
