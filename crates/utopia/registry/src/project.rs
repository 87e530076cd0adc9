//! Project registry and membership.

use crate::allocator::{IdMode, SequenceAllocator};
use crate::identity::{require_text, IdentityRegistry};
use crate::store::{self, EntityIter};
use crate::{RegistryError, RegistryResult};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;
use utopia_auth::hash_credential;
use utopia_ledger::TxContext;
use utopia_types::{EntityKind, InteractionId, ParticipantId, Project, ProjectId};

/// Request to open a project.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewProject {
    /// Explicit ID, honoured only in [`IdMode::CallerSupplied`].
    #[serde(default)]
    pub id: Option<ProjectId>,
    pub name: String,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contributors: Vec<ParticipantId>,
    #[serde(default)]
    pub validators: Vec<ParticipantId>,
    #[serde(default)]
    pub credential: Option<String>,
}

/// Creates, reads and enumerates projects.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProjectRegistry {
    id_mode: IdMode,
    identities: IdentityRegistry,
}

impl ProjectRegistry {
    pub fn new(id_mode: IdMode, identities: IdentityRegistry) -> Self {
        Self {
            id_mode,
            identities,
        }
    }

    /// Open a project and attach every member to it.
    pub async fn create(&self, tx: &mut TxContext, request: NewProject) -> RegistryResult<Project> {
        require_text("project name", &request.name)?;
        if let Some(secret) = &request.credential {
            require_text("project credential", secret)?;
        }
        let start_date = parse_date("start date", &request.start_date)?;
        let end_date = parse_date("end date", &request.end_date)?;
        if start_date > end_date {
            return Err(RegistryError::InvalidArgument(format!(
                "start date {} is after end date {}",
                start_date, end_date
            )));
        }

        let mut seen = BTreeSet::new();
        for member in request.contributors.iter().chain(request.validators.iter()) {
            if seen.insert(member) && !self.identities.exists(tx, member).await? {
                return Err(RegistryError::NotFound(format!(
                    "participant {} does not exist",
                    member
                )));
            }
        }

        let id = SequenceAllocator::assign(
            tx,
            EntityKind::Project,
            self.id_mode,
            request.id.as_ref().map(ProjectId::as_str),
        )
        .await?;

        let project = Project {
            credential_hash: request
                .credential
                .as_deref()
                .map(|secret| hash_credential(&id, secret)),
            id: ProjectId::new(id),
            name: request.name,
            description: request.description,
            start_date,
            end_date,
            contributors: request.contributors.into_iter().collect(),
            validators: request.validators.into_iter().collect(),
            interaction_ids: Vec::new(),
            created_at: tx.timestamp(),
        };
        store::save(tx, EntityKind::Project, project.id.as_str(), &project)?;

        for member in project.members() {
            self.identities.attach_to_project(tx, member, &project.id).await?;
        }

        info!(
            project = %project.id,
            contributors = project.contributors.len(),
            validators = project.validators.len(),
            "project created"
        );
        Ok(project)
    }

    pub async fn get(&self, tx: &mut TxContext, id: &ProjectId) -> RegistryResult<Project> {
        store::fetch(tx, EntityKind::Project, id.as_str()).await
    }

    /// Every project in ID order.
    pub async fn list(&self, tx: &mut TxContext) -> RegistryResult<EntityIter<Project>> {
        EntityIter::open(tx, EntityKind::Project).await
    }

    pub async fn count(&self, tx: &mut TxContext) -> RegistryResult<u64> {
        SequenceAllocator::current(tx, EntityKind::Project).await
    }

    /// Append an interaction back-reference. Only the interaction ledger calls
    /// this, inside the transaction that creates the interaction.
    pub(crate) async fn add_interaction_ref(
        &self,
        tx: &mut TxContext,
        project_id: &ProjectId,
        interaction_id: &InteractionId,
    ) -> RegistryResult<()> {
        let mut project = self.get(tx, project_id).await?;
        if project.add_interaction_ref(interaction_id.clone()) {
            store::save(tx, EntityKind::Project, project_id.as_str(), &project)?;
        }
        Ok(())
    }
}

fn parse_date(field: &str, raw: &str) -> RegistryResult<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| RegistryError::InvalidArgument(format!("{} {:?} is not a valid date", field, raw)))
}
