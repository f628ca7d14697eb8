//! Groth16 key files.
//!
//! Keys are stored in arkworks' uncompressed canonical encoding. Loading
//! validates every point, so a key file that decodes is safe to prove and
//! verify with.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ark_bn254::Bn254;
use ark_groth16::{ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::traits::BackendError;

pub(crate) fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BackendError + '_ {
    move |source| BackendError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn encoding_err(path: &Path) -> impl FnOnce(ark_serialize::SerializationError) -> BackendError + '_ {
    move |source| BackendError::KeyEncoding {
        path: path.to_path_buf(),
        source,
    }
}

fn load<T: CanonicalDeserialize>(path: &Path) -> Result<T, BackendError> {
    let file = File::open(path).map_err(io_err(path))?;
    T::deserialize_uncompressed(BufReader::new(file)).map_err(encoding_err(path))
}

/// Serialize `value` to bytes.
pub fn to_bytes<T: CanonicalSerialize>(value: &T) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.uncompressed_size());
    // Writing into a Vec cannot fail.
    let _ = value.serialize_uncompressed(&mut out);
    out
}

fn save<T: CanonicalSerialize>(path: &Path, value: &T) -> Result<(), BackendError> {
    let file = File::create(path).map_err(io_err(path))?;
    let mut out = BufWriter::new(file);
    value
        .serialize_uncompressed(&mut out)
        .map_err(encoding_err(path))?;
    out.flush().map_err(io_err(path))
}

/// Read a proving key.
pub fn load_proving_key(path: &Path) -> Result<ProvingKey<Bn254>, BackendError> {
    load(path)
}

/// Read a verifying key.
pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey<Bn254>, BackendError> {
    load(path)
}

/// Write a proving key.
pub fn save_proving_key(path: &Path, pk: &ProvingKey<Bn254>) -> Result<(), BackendError> {
    save(path, pk)
}

/// Write a verifying key.
pub fn save_verifying_key(path: &Path, vk: &VerifyingKey<Bn254>) -> Result<(), BackendError> {
    save(path, vk)
}

/// Decode a verifying key from bytes, as served by `ExportVerifyingKey`.
pub fn verifying_key_from_bytes(
    bytes: &[u8],
) -> Result<VerifyingKey<Bn254>, ark_serialize::SerializationError> {
    VerifyingKey::deserialize_uncompressed(bytes)
}
