//! Utopia Types - the shared vocabulary of the workspace ledger
//!
//! Participants join projects as contributors or validators; interactions
//! record investments either against a project or between two participants.
//! Entities reference each other by ID only.

#![deny(unsafe_code)]

mod entity;
mod error;
mod ids;

pub use entity::{
    CredentialHash, Interaction, InteractionKind, InteractionParties, InteractionStatus,
    Participant, Payload, Project, Redact,
};
pub use error::ErrorKind;
pub use ids::{EntityKind, InteractionId, ParticipantId, ProjectId};
