//! Named operations, each executed as one atomic ledger transaction.

use crate::config::ContractConfig;
use crate::error::ContractResult;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument, Span};
use utopia_ledger::{KeyValueLedger, TxContext, TxHeader};
use utopia_registry::{
    keys, Credentials, EntityIter, IdentityRegistry, InteractionLedger, NewParticipant,
    NewPeerInteraction, NewProject, NewProjectInteraction, ProjectRegistry, RegistryError,
    RegistryResult, SequenceAllocator,
};
use utopia_types::{
    Interaction, InteractionId, Participant, ParticipantId, Project, ProjectId, Redact,
};

/// The workspace contract.
///
/// Holds no mutable state of its own: every call opens a fresh
/// [`TxContext`], runs the operation against it and commits only when the
/// operation succeeded. Entities returned to callers are redacted.
pub struct UtopiaContract {
    ledger: Arc<dyn KeyValueLedger>,
    config: ContractConfig,
    identities: IdentityRegistry,
    projects: ProjectRegistry,
    interactions: InteractionLedger,
}

impl UtopiaContract {
    pub fn new(ledger: Arc<dyn KeyValueLedger>, config: ContractConfig) -> Self {
        let identities = IdentityRegistry::new(config.id_mode);
        let projects = ProjectRegistry::new(config.id_mode, identities);
        let interactions = InteractionLedger::new(
            config.id_mode,
            identities,
            projects,
            config.approval_quorum,
        );
        Self {
            ledger,
            config,
            identities,
            projects,
            interactions,
        }
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    /// Write the bootstrap marker and zeroed counters. Fails on a second call.
    pub async fn init(&self, header: TxHeader) -> ContractResult<()> {
        let span = operation_span("init", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = SequenceAllocator::bootstrap(&mut tx).await;
            self.settle(tx, outcome).await
        }
        .instrument(span)
        .await
    }

    pub async fn get_init_status(&self, header: TxHeader) -> ContractResult<bool> {
        let span = operation_span("getInitStatus", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = SequenceAllocator::is_initialized(&mut tx).await;
            self.settle(tx, outcome).await
        }
        .instrument(span)
        .await
    }

    pub async fn create_participant(
        &self,
        header: TxHeader,
        request: NewParticipant,
    ) -> ContractResult<Participant> {
        let span = operation_span("createParticipant", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                self.identities.create(&mut tx, request).await
            }
            .await;
            self.settle(tx, outcome).await.map(Redact::redacted)
        }
        .instrument(span)
        .await
    }

    pub async fn create_project(
        &self,
        header: TxHeader,
        request: NewProject,
    ) -> ContractResult<Project> {
        let span = operation_span("createProject", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                self.projects.create(&mut tx, request).await
            }
            .await;
            self.settle(tx, outcome).await.map(Redact::redacted)
        }
        .instrument(span)
        .await
    }

    pub async fn create_project_interaction(
        &self,
        header: TxHeader,
        request: NewProjectInteraction,
        credentials: Credentials,
    ) -> ContractResult<Interaction> {
        let span = operation_span("createProjectInteraction", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                self.interactions
                    .create_project_interaction(&mut tx, request, &credentials)
                    .await
            }
            .await;
            self.settle(tx, outcome).await.map(Redact::redacted)
        }
        .instrument(span)
        .await
    }

    pub async fn create_peer_interaction(
        &self,
        header: TxHeader,
        request: NewPeerInteraction,
        credentials: Credentials,
    ) -> ContractResult<Interaction> {
        let span = operation_span("createPeerInteraction", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                self.interactions
                    .create_peer_interaction(&mut tx, request, &credentials)
                    .await
            }
            .await;
            self.settle(tx, outcome).await.map(Redact::redacted)
        }
        .instrument(span)
        .await
    }

    pub async fn validate_interaction(
        &self,
        header: TxHeader,
        interaction_id: &InteractionId,
        approver: &ParticipantId,
        credentials: Credentials,
    ) -> ContractResult<Interaction> {
        let span = operation_span("validateInteraction", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                self.interactions
                    .validate_interaction(&mut tx, interaction_id, approver, &credentials)
                    .await
            }
            .await;
            self.settle(tx, outcome).await.map(Redact::redacted)
        }
        .instrument(span)
        .await
    }

    pub async fn get_participant(
        &self,
        header: TxHeader,
        id: &ParticipantId,
    ) -> ContractResult<Participant> {
        let span = operation_span("getParticipant", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                self.identities.get(&mut tx, id).await
            }
            .await;
            self.settle(tx, outcome).await.map(Redact::redacted)
        }
        .instrument(span)
        .await
    }

    pub async fn get_project(&self, header: TxHeader, id: &ProjectId) -> ContractResult<Project> {
        let span = operation_span("getProject", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                self.projects.get(&mut tx, id).await
            }
            .await;
            self.settle(tx, outcome).await.map(Redact::redacted)
        }
        .instrument(span)
        .await
    }

    pub async fn get_interaction(
        &self,
        header: TxHeader,
        id: &InteractionId,
    ) -> ContractResult<Interaction> {
        let span = operation_span("getInteraction", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                self.interactions.get(&mut tx, id).await
            }
            .await;
            self.settle(tx, outcome).await.map(Redact::redacted)
        }
        .instrument(span)
        .await
    }

    pub async fn list_participants(&self, header: TxHeader) -> ContractResult<Vec<Participant>> {
        let span = operation_span("listParticipants", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                drain(self.identities.list(&mut tx).await?).await
            }
            .await;
            self.settle(tx, outcome).await
        }
        .instrument(span)
        .await
    }

    pub async fn list_projects(&self, header: TxHeader) -> ContractResult<Vec<Project>> {
        let span = operation_span("listProjects", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                drain(self.projects.list(&mut tx).await?).await
            }
            .await;
            self.settle(tx, outcome).await
        }
        .instrument(span)
        .await
    }

    pub async fn list_interactions(&self, header: TxHeader) -> ContractResult<Vec<Interaction>> {
        let span = operation_span("listInteractions", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = async {
                require_initialized(&mut tx).await?;
                drain(self.interactions.list(&mut tx).await?).await
            }
            .await;
            self.settle(tx, outcome).await
        }
        .instrument(span)
        .await
    }

    pub async fn participant_count(&self, header: TxHeader) -> ContractResult<u64> {
        let span = operation_span("getParticipantCount", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = self.identities.count(&mut tx).await;
            self.settle(tx, outcome).await
        }
        .instrument(span)
        .await
    }

    pub async fn project_count(&self, header: TxHeader) -> ContractResult<u64> {
        let span = operation_span("getProjectCount", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = self.projects.count(&mut tx).await;
            self.settle(tx, outcome).await
        }
        .instrument(span)
        .await
    }

    pub async fn interaction_count(&self, header: TxHeader) -> ContractResult<u64> {
        let span = operation_span("getInteractionCount", &header);
        async move {
            let mut tx = self.begin(header);
            let outcome = self.interactions.count(&mut tx).await;
            self.settle(tx, outcome).await
        }
        .instrument(span)
        .await
    }

    fn begin(&self, header: TxHeader) -> TxContext {
        TxContext::new(self.ledger.clone(), header)
    }

    /// Commit on success, discard every buffered write on failure.
    async fn settle<T>(&self, tx: TxContext, outcome: RegistryResult<T>) -> ContractResult<T> {
        match outcome {
            Ok(value) => {
                let receipt = tx.commit().await?;
                debug!(
                    height = receipt.height,
                    keys_written = receipt.keys_written,
                    "transaction committed"
                );
                Ok(value)
            }
            Err(err) => {
                warn!(kind = %err.kind(), error = %err, "operation rejected");
                tx.abort();
                Err(err.into())
            }
        }
    }
}

fn operation_span(name: &'static str, header: &TxHeader) -> Span {
    info_span!("operation", function = name, tx_id = %header.tx_id)
}

async fn require_initialized(tx: &mut TxContext) -> RegistryResult<()> {
    if SequenceAllocator::is_initialized(tx).await? {
        Ok(())
    } else {
        Err(RegistryError::NotInitialized(keys::INIT_KEY.to_string()))
    }
}

async fn drain<T>(entities: EntityIter<T>) -> RegistryResult<Vec<T>>
where
    T: Redact + serde::de::DeserializeOwned,
{
    Ok(entities
        .collect_all()
        .await?
        .into_iter()
        .map(Redact::redacted)
        .collect())
}
