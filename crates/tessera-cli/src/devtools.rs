//! # Development Subcommands
//!
//! Tooling for local bring-up and tests. `ptau-dev` knows its own toxic
//! waste; its transcripts must never feed a production ceremony.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tessera_ceremony::{Ptau, Zkey};
use tessera_zkp::{groth16, keys};

use crate::write_atomic;

/// Arguments for `ptau-dev`.
#[derive(Args, Debug)]
pub struct PtauDevArgs {
    /// `log2` of the largest supported domain.
    pub power: u32,
    /// Transcript to write.
    pub out: PathBuf,
    /// Derive the secrets from this seed instead of the OS.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for `r1cs-export`.
#[derive(Args, Debug)]
pub struct R1csExportArgs {
    /// Constraint system to write.
    pub out: PathBuf,
}

/// Arguments for `zkey-export-vk`.
#[derive(Args, Debug)]
pub struct ZkeyExportVkArgs {
    /// snarkjs Groth16 zkey.
    pub zkey: PathBuf,
    /// Verifying key to write.
    pub vk_out: PathBuf,
}

/// Write an insecure single-party powers-of-tau transcript.
pub fn run_ptau_dev(args: &PtauDevArgs) -> Result<u8> {
    tracing::warn!("generating an insecure powers-of-tau transcript; for development only");
    let ptau = match args.seed {
        Some(seed) => Ptau::insecure_dev(args.power, &mut StdRng::seed_from_u64(seed)),
        None => Ptau::insecure_dev(args.power, &mut rand::thread_rng()),
    }
    .with_context(|| format!("cannot generate a transcript of power {}", args.power))?;
    write_atomic(&args.out, |w| ptau.write_to(w))?;
    println!(
        "OK: insecure ptau power={} domain={} -> {}",
        args.power,
        ptau.domain_size(),
        args.out.display()
    );
    Ok(0)
}

/// Write the consensus circuit's constraint system.
pub fn run_r1cs_export(args: &R1csExportArgs) -> Result<u8> {
    let r1cs = groth16::compile().context("circuit compilation failed")?;
    write_atomic(&args.out, |w| r1cs.write_to(w))?;
    println!(
        "OK: r1cs constraints={} wires={} domain={} -> {}",
        r1cs.num_constraints(),
        r1cs.num_wires,
        r1cs.domain_size(),
        args.out.display()
    );
    Ok(0)
}

/// Write the verifying key a zkey commits to.
pub fn run_zkey_export_vk(args: &ZkeyExportVkArgs) -> Result<u8> {
    let zkey = Zkey::open(&args.zkey)
        .with_context(|| format!("failed to read zkey {}", args.zkey.display()))?;
    let vk = keys::to_bytes(&zkey.verifying_key());
    write_atomic(&args.vk_out, |w| w.write_all(&vk))?;
    println!(
        "OK: verifying key public_inputs={} -> {}",
        zkey.header.n_public,
        args.vk_out.display()
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use tessera_ceremony::R1cs;

    use super::*;

    #[test]
    fn seeded_ptau_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.ptau", "b.ptau"] {
            let args = PtauDevArgs {
                power: 3,
                out: dir.path().join(name),
                seed: Some(42),
            };
            assert_eq!(run_ptau_dev(&args).unwrap(), 0);
        }
        let a = std::fs::read(dir.path().join("a.ptau")).unwrap();
        assert_eq!(a, std::fs::read(dir.path().join("b.ptau")).unwrap());
        assert_eq!(Ptau::open(dir.path().join("a.ptau")).unwrap().domain_size(), 8);
    }

    #[test]
    fn oversized_power_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = PtauDevArgs {
            power: 64,
            out: dir.path().join("huge.ptau"),
            seed: Some(1),
        };
        assert!(run_ptau_dev(&args).is_err());
        assert!(!args.out.exists());
    }

    #[test]
    fn exported_r1cs_matches_compiled_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("consensus.r1cs");
        run_r1cs_export(&R1csExportArgs { out: out.clone() }).unwrap();
        assert_eq!(
            R1cs::open(&out).unwrap().digest(),
            groth16::compile().unwrap().digest()
        );
    }

    #[test]
    fn zkey_export_rejects_non_zkey() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.zkey");
        std::fs::write(&bogus, b"not a zkey at all").unwrap();
        let args = ZkeyExportVkArgs {
            zkey: bogus,
            vk_out: dir.path().join("vk"),
        };
        assert!(run_zkey_export_vk(&args).is_err());
        assert!(!args.vk_out.exists());
    }
}
