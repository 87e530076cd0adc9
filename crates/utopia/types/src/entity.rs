//! Ledger entities: participants, projects and interactions.

use crate::ids::{InteractionId, ParticipantId, ProjectId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Hex-encoded digest of a credential secret. The secret itself is never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHash(pub String);

impl CredentialHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A registered actor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub email: String,
    /// Free-form role or nationality descriptor.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_hash: Option<CredentialHash>,
    #[serde(default)]
    pub project_ids: BTreeSet<ProjectId>,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Add a project back-reference. Returns false when it was already present.
    pub fn attach_project(&mut self, project_id: ProjectId) -> bool {
        self.project_ids.insert(project_id)
    }
}

/// A collaborative effort with contributor and validator membership sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub contributors: BTreeSet<ParticipantId>,
    pub validators: BTreeSet<ParticipantId>,
    /// Interactions recorded against this project, in creation order.
    #[serde(default)]
    pub interaction_ids: Vec<InteractionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_hash: Option<CredentialHash>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn is_contributor(&self, participant_id: &ParticipantId) -> bool {
        self.contributors.contains(participant_id)
    }

    pub fn is_validator(&self, participant_id: &ParticipantId) -> bool {
        self.validators.contains(participant_id)
    }

    /// Every participant holding any role on the project.
    pub fn members(&self) -> BTreeSet<&ParticipantId> {
        self.contributors.iter().chain(self.validators.iter()).collect()
    }

    /// Append an interaction reference. Returns false when it was already present.
    pub fn add_interaction_ref(&mut self, interaction_id: InteractionId) -> bool {
        if self.interaction_ids.contains(&interaction_id) {
            return false;
        }
        self.interaction_ids.push(interaction_id);
        true
    }
}

/// What an interaction carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// An amount in minor units, optionally tagged with a currency code.
    Investment {
        amount: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<String>,
    },
    /// A free-form contribution description.
    Description { text: String },
}

impl Payload {
    pub fn investment(amount: u64, currency: impl Into<String>) -> Self {
        Payload::Investment {
            amount,
            currency: Some(currency.into()),
        }
    }

    /// An investment with no currency attached.
    pub fn amount(amount: u64) -> Self {
        Payload::Investment {
            amount,
            currency: None,
        }
    }

    pub fn description(text: impl Into<String>) -> Self {
        Payload::Description { text: text.into() }
    }
}

/// The two interaction shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    ProjectInvestment,
    PeerToPeer,
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionKind::ProjectInvestment => f.write_str("project_investment"),
            InteractionKind::PeerToPeer => f.write_str("peer_to_peer"),
        }
    }
}

/// Who an interaction involves. The project reference exists only for
/// project-scoped interactions and the second party only for peer ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionParties {
    ProjectInvestment {
        project_id: ProjectId,
        participant_id: ParticipantId,
    },
    PeerToPeer {
        participant_id_a: ParticipantId,
        participant_id_b: ParticipantId,
    },
}

impl InteractionParties {
    pub fn kind(&self) -> InteractionKind {
        match self {
            InteractionParties::ProjectInvestment { .. } => InteractionKind::ProjectInvestment,
            InteractionParties::PeerToPeer { .. } => InteractionKind::PeerToPeer,
        }
    }

    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            InteractionParties::ProjectInvestment { project_id, .. } => Some(project_id),
            InteractionParties::PeerToPeer { .. } => None,
        }
    }

    pub fn involves(&self, participant_id: &ParticipantId) -> bool {
        match self {
            InteractionParties::ProjectInvestment {
                participant_id: p, ..
            } => p == participant_id,
            InteractionParties::PeerToPeer {
                participant_id_a,
                participant_id_b,
            } => participant_id_a == participant_id || participant_id_b == participant_id,
        }
    }
}

/// Validation state. `Validated` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Pending,
    Validated,
}

/// A recorded investment or contribution event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub parties: InteractionParties,
    pub payload: Payload,
    pub status: InteractionStatus,
    /// Distinct approvers in the order they validated.
    #[serde(default)]
    pub approvers: Vec<ParticipantId>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
}

impl Interaction {
    pub fn kind(&self) -> InteractionKind {
        self.parties.kind()
    }

    pub fn is_validated(&self) -> bool {
        self.status == InteractionStatus::Validated
    }

    /// Record an approval. Returns false when the approver had already approved.
    pub fn approve(&mut self, approver: ParticipantId) -> bool {
        if self.approvers.contains(&approver) {
            return false;
        }
        self.approvers.push(approver);
        true
    }

    /// Move to `Validated` once `quorum` distinct approvals are present.
    /// Never moves a validated interaction back.
    pub fn settle(&mut self, quorum: usize, at: DateTime<Utc>) -> bool {
        if self.is_validated() || self.approvers.is_empty() || self.approvers.len() < quorum {
            return false;
        }
        self.status = InteractionStatus::Validated;
        self.validated_at = Some(at);
        true
    }
}

/// Strips fields that must not leave the ledger through query operations.
pub trait Redact {
    fn redacted(self) -> Self;
}

impl Redact for Participant {
    fn redacted(mut self) -> Self {
        self.credential_hash = None;
        self
    }
}

impl Redact for Project {
    fn redacted(mut self) -> Self {
        self.credential_hash = None;
        self
    }
}

impl Redact for Interaction {
    fn redacted(self) -> Self {
        self
    }
}
