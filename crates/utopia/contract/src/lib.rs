//! Utopia Contract - the workspace ledger's operation surface
//!
//! [`UtopiaContract`] exposes every named operation twice: as typed async
//! methods, and through [`UtopiaContract::invoke`], which takes a function
//! name plus string arguments the way a ledger peer delivers them.
//!
//! Each operation runs in its own transaction. It commits only if the
//! operation succeeded; a failure leaves the ledger exactly as it was.

#![deny(unsafe_code)]

pub mod config;
mod contract;
mod dispatch;
mod error;

pub use config::{ConfigError, ContractConfig};
pub use contract::UtopiaContract;
pub use dispatch::FUNCTIONS;
pub use error::{ContractError, ContractResult};

pub use utopia_registry::{
    Credentials, IdMode, NewParticipant, NewPeerInteraction, NewProject, NewProjectInteraction,
};
