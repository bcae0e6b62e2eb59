//! The Braid orchestrator.
//!
//! [`BraidNode`] owns the `n = k + m` configured blob backends and the
//! metadata store, and drives the four file operations: encode+upload,
//! download+verify+decode with self-healing, listing, and deletion.
//! Protocol adapters depend on the [`FileEngine`] trait instead of the
//! concrete node.

mod engine;
mod error;
mod node;

#[cfg(test)]
mod tests;

pub use engine::FileEngine;
pub use error::EngineError;
pub use node::{BraidNode, BraidNodeConfig};
