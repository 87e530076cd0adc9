//! Participant registry.

use crate::allocator::{IdMode, SequenceAllocator};
use crate::store::{self, EntityIter};
use crate::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};
use utopia_auth::hash_credential;
use utopia_ledger::TxContext;
use utopia_types::{EntityKind, Participant, ParticipantId, ProjectId};

/// Request to register a participant.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewParticipant {
    /// Explicit ID, honoured only in [`IdMode::CallerSupplied`].
    #[serde(default)]
    pub id: Option<ParticipantId>,
    pub name: String,
    pub email: String,
    pub role: String,
    /// Secret gating this participant's actions. Stored only as a hash.
    #[serde(default)]
    pub credential: Option<String>,
}

/// Creates, reads and enumerates participants.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityRegistry {
    id_mode: IdMode,
}

impl IdentityRegistry {
    pub fn new(id_mode: IdMode) -> Self {
        Self { id_mode }
    }

    /// Register a new participant with no project memberships.
    pub async fn create(
        &self,
        tx: &mut TxContext,
        request: NewParticipant,
    ) -> RegistryResult<Participant> {
        require_text("participant name", &request.name)?;
        require_text("participant email", &request.email)?;
        require_text("participant role", &request.role)?;
        if let Some(secret) = &request.credential {
            require_text("participant credential", secret)?;
        }

        let id = SequenceAllocator::assign(
            tx,
            EntityKind::Participant,
            self.id_mode,
            request.id.as_ref().map(ParticipantId::as_str),
        )
        .await?;

        let participant = Participant {
            credential_hash: request
                .credential
                .as_deref()
                .map(|secret| hash_credential(&id, secret)),
            id: ParticipantId::new(id),
            name: request.name,
            email: request.email,
            role: request.role,
            project_ids: BTreeSet::new(),
            created_at: tx.timestamp(),
        };
        store::save(tx, EntityKind::Participant, participant.id.as_str(), &participant)?;

        info!(
            participant = %participant.id,
            gated = participant.credential_hash.is_some(),
            "participant registered"
        );
        Ok(participant)
    }

    pub async fn get(&self, tx: &mut TxContext, id: &ParticipantId) -> RegistryResult<Participant> {
        store::fetch(tx, EntityKind::Participant, id.as_str()).await
    }

    pub async fn exists(&self, tx: &mut TxContext, id: &ParticipantId) -> RegistryResult<bool> {
        store::exists(tx, EntityKind::Participant, id.as_str()).await
    }

    /// Every participant in ID order.
    pub async fn list(&self, tx: &mut TxContext) -> RegistryResult<EntityIter<Participant>> {
        EntityIter::open(tx, EntityKind::Participant).await
    }

    pub async fn count(&self, tx: &mut TxContext) -> RegistryResult<u64> {
        SequenceAllocator::current(tx, EntityKind::Participant).await
    }

    /// Record that the participant belongs to `project_id`. Set semantics:
    /// attaching twice leaves one reference. Returns whether anything changed.
    pub async fn attach_to_project(
        &self,
        tx: &mut TxContext,
        participant_id: &ParticipantId,
        project_id: &ProjectId,
    ) -> RegistryResult<bool> {
        let mut participant = self.get(tx, participant_id).await?;
        if !participant.attach_project(project_id.clone()) {
            debug!(participant = %participant_id, project = %project_id, "already attached");
            return Ok(false);
        }
        store::save(tx, EntityKind::Participant, participant_id.as_str(), &participant)?;
        Ok(true)
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> RegistryResult<()> {
    if value.trim().is_empty() {
        return Err(RegistryError::InvalidArgument(format!("{} must not be empty", field)));
    }
    Ok(())
}
