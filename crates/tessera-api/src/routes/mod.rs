//! # API Route Modules
//!
//! - `proofs`: the Job API proper: submit, prove-and-wait, status lookup.
//! - `verify`: proof verification, verifying-key export and light-client
//!   message checks.
//! - `stats`: job and backend statistics (`QueryStats`).

pub mod proofs;
pub mod stats;
pub mod verify;
