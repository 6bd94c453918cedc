//! # acfs-core: Foundational Types for the ACFS Manifest Compiler
//!
//! Every other crate in the workspace depends on `acfs-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ModuleId`, `Category` and
//!    `ToolKey` have validated constructors. An identifier that reaches the
//!    shell emitter has already been checked against its pattern, so it can
//!    be turned into a shell function name without further escaping.
//!
//! 2. **One digest path.** `ContentDigest::sha256()` is the only way the
//!    compiler hashes manifest bytes. `Sha256Hex` is the validated form of a
//!    hash read from the checksum registry.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `acfs-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod identity;

pub use digest::{ContentDigest, Sha256Hex};
pub use error::CoreError;
pub use identity::{Category, ModuleId, ToolKey};
