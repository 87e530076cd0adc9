//! Utopia Auth - who may do what on a project
//!
//! Decisions are pure functions of an entity snapshot and the caller's
//! arguments. Every replica executing the same transaction must reach the
//! same verdict, so nothing here reads clocks, randomness or shared state.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utopia_types::{CredentialHash, Interaction, InteractionParties, Participant, ParticipantId, Project};

const CREDENTIAL_CONTEXT: &str = "utopia workspace ledger 2024-01 credential v1";

/// Membership roles a project grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    /// May record interactions against the project.
    Contributor,
    /// May validate the project's interactions.
    Validator,
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectRole::Contributor => f.write_str("contributor"),
            ProjectRole::Validator => f.write_str("validator"),
        }
    }
}

/// An entity that may be protected by a credential.
pub trait Gated {
    fn subject_id(&self) -> &str;
    fn credential_hash(&self) -> Option<&CredentialHash>;
}

impl Gated for Participant {
    fn subject_id(&self) -> &str {
        self.id.as_str()
    }

    fn credential_hash(&self) -> Option<&CredentialHash> {
        self.credential_hash.as_ref()
    }
}

impl Gated for Project {
    fn subject_id(&self) -> &str {
        self.id.as_str()
    }

    fn credential_hash(&self) -> Option<&CredentialHash> {
        self.credential_hash.as_ref()
    }
}

/// Stateless authorization decisions.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuthorizationEngine;

impl AuthorizationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Whether `participant_id` holds `role` on `project`.
    pub fn permits(&self, project: &Project, participant_id: &ParticipantId, role: ProjectRole) -> bool {
        match role {
            ProjectRole::Contributor => project.is_contributor(participant_id),
            ProjectRole::Validator => project.is_validator(participant_id),
        }
    }

    /// Fail unless `participant_id` holds `role` on `project`.
    pub fn require_role(
        &self,
        project: &Project,
        participant_id: &ParticipantId,
        role: ProjectRole,
    ) -> AuthResult<()> {
        if self.permits(project, participant_id, role) {
            Ok(())
        } else {
            Err(AuthError::MissingRole {
                participant: participant_id.to_string(),
                project: project.id.to_string(),
                role,
            })
        }
    }

    /// Fail unless `participant_id` is one of the two parties of a peer interaction.
    pub fn require_party(&self, interaction: &Interaction, participant_id: &ParticipantId) -> AuthResult<()> {
        match &interaction.parties {
            InteractionParties::PeerToPeer { .. } if interaction.parties.involves(participant_id) => Ok(()),
            _ => Err(AuthError::NotAParty {
                participant: participant_id.to_string(),
                interaction: interaction.id.to_string(),
            }),
        }
    }

    /// Check a supplied secret against the entity's stored credential.
    ///
    /// Entities without a stored credential are not gated.
    pub fn require_credential<G: Gated + ?Sized>(&self, entity: &G, supplied: Option<&str>) -> AuthResult<()> {
        let Some(stored) = entity.credential_hash() else {
            return Ok(());
        };
        let Some(secret) = supplied else {
            return Err(AuthError::CredentialRequired(entity.subject_id().to_string()));
        };
        if verify_credential(stored, entity.subject_id(), secret)? {
            Ok(())
        } else {
            Err(AuthError::CredentialMismatch(entity.subject_id().to_string()))
        }
    }
}

/// Derive the stored form of a credential.
///
/// The subject ID salts the hash so equal secrets on two entities never
/// share a digest.
pub fn hash_credential(subject_id: &str, secret: &str) -> CredentialHash {
    CredentialHash(derive(subject_id, secret).to_hex().to_string())
}

/// Compare a secret against a stored hash in constant time.
pub fn verify_credential(stored: &CredentialHash, subject_id: &str, secret: &str) -> AuthResult<bool> {
    let expected = blake3::Hash::from_hex(stored.as_str())
        .map_err(|_| AuthError::MalformedCredential(subject_id.to_string()))?;
    Ok(expected == derive(subject_id, secret))
}

fn derive(subject_id: &str, secret: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(CREDENTIAL_CONTEXT);
    hasher.update(&(subject_id.len() as u64).to_le_bytes());
    hasher.update(subject_id.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.finalize()
}

/// Result type for authorization checks.
pub type AuthResult<T> = Result<T, AuthError>;

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("participant {participant} is not a {role} of project {project}")]
    MissingRole {
        participant: String,
        project: String,
        role: ProjectRole,
    },

    #[error("participant {participant} is not a party to interaction {interaction}")]
    NotAParty {
        participant: String,
        interaction: String,
    },

    #[error("credential required for {0}")]
    CredentialRequired(String),

    #[error("credential mismatch for {0}")]
    CredentialMismatch(String),

    #[error("stored credential for {0} is malformed")]
    MalformedCredential(String),
}
