//! Utopia Registry - state transitions of the workspace ledger
//!
//! Every operation takes a [`TxContext`](utopia_ledger::TxContext) bound to a
//! single ledger snapshot and only reads and buffers writes through it. The
//! caller decides whether the transaction commits, so a failed operation
//! leaves no trace.
//!
//! - [`SequenceAllocator`]: ledger-resident ID counters and bootstrap
//! - [`IdentityRegistry`]: participants
//! - [`ProjectRegistry`]: projects and their membership
//! - [`InteractionLedger`]: interactions and the validation workflow

#![deny(unsafe_code)]

mod allocator;
mod error;
mod identity;
mod interaction;
pub mod keys;
mod project;
mod store;

#[cfg(test)]
mod testing;

pub use allocator::{IdMode, SequenceAllocator};
pub use error::{RegistryError, RegistryResult};
pub use identity::{IdentityRegistry, NewParticipant};
pub use interaction::{Credentials, InteractionLedger, NewPeerInteraction, NewProjectInteraction};
pub use project::{NewProject, ProjectRegistry};
pub use store::EntityIter;
