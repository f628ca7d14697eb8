//! # tessera-cli: Trusted Setup Tooling
//!
//! Provides the `tessera` command-line interface. Each ceremony stage is its
//! own invocation; artifacts travel between stages as files.
//!
//! ## Subcommands
//!
//! - `tessera phase1-init <ptau> <phase1Out>`
//! - `tessera phase2-init <r1cs> <phase1> <phase2Out> <evalsOut>`
//! - `tessera phase2-contribute <phase2In> <phase2Out>`
//! - `tessera phase2-verify <phase2Prev> <phase2Contrib>`
//! - `tessera phase2-extract <r1cs> <phase1> <phase2> <evals> <pkOut> <vkOut>`
//! - `tessera ptau-dev <power> <out>`: insecure transcript for local use.
//! - `tessera r1cs-export <out>`: the consensus circuit's constraint system.
//! - `tessera zkey-export-vk <zkey> <vkOut>`
//!
//! ## Output Files
//!
//! Every output is written to a temporary file beside its destination and
//! renamed into place only once complete. A failed stage leaves no partial
//! artifact behind.

pub mod ceremony;
pub mod devtools;

use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Write `path` atomically: `write` fills a temporary file in the same
/// directory, which replaces `path` only if `write` succeeds.
pub fn write_atomic(
    path: &Path,
    write: impl FnOnce(&mut dyn Write) -> std::io::Result<()>,
) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        write(&mut out).with_context(|| format!("failed to write {}", path.display()))?;
        out.flush()
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("failed to sync {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to move output into place at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote artifact");
    Ok(())
}
