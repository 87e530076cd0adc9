//! Interaction recording and the validation workflow.
//!
//! ```text
//! Pending --validate(authorized approver, quorum reached)--> Validated
//! ```
//!
//! `Validated` is terminal. Later approvals by other eligible participants
//! are still recorded, but the status never moves back.

use crate::allocator::{IdMode, SequenceAllocator};
use crate::identity::{require_text, IdentityRegistry};
use crate::project::ProjectRegistry;
use crate::store::{self, EntityIter};
use crate::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utopia_auth::{AuthorizationEngine, ProjectRole};
use utopia_ledger::TxContext;
use utopia_types::{
    EntityKind, Interaction, InteractionId, InteractionParties, InteractionStatus, ParticipantId,
    Payload, ProjectId,
};

/// Secrets presented alongside an operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Checked against the acting participant.
    #[serde(default)]
    pub participant: Option<String>,
    /// Checked against the project, for project-scoped operations.
    #[serde(default)]
    pub project: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn participant(secret: impl Into<String>) -> Self {
        Self {
            participant: Some(secret.into()),
            project: None,
        }
    }
}

/// Request to record an investment or contribution against a project.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewProjectInteraction {
    #[serde(default)]
    pub id: Option<InteractionId>,
    pub project_id: ProjectId,
    /// The contributing participant.
    pub participant_id: ParticipantId,
    pub payload: Payload,
}

/// Request to record an interaction between two participants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewPeerInteraction {
    #[serde(default)]
    pub id: Option<InteractionId>,
    /// The initiating participant. Participant credentials are checked against it.
    pub participant_id_a: ParticipantId,
    pub participant_id_b: ParticipantId,
    pub payload: Payload,
}

/// Creates interactions and drives them through validation.
#[derive(Clone, Copy, Debug)]
pub struct InteractionLedger {
    auth: AuthorizationEngine,
    id_mode: IdMode,
    identities: IdentityRegistry,
    projects: ProjectRegistry,
    approval_quorum: usize,
}

impl Default for InteractionLedger {
    fn default() -> Self {
        Self::new(IdMode::default(), IdentityRegistry::default(), ProjectRegistry::default(), 1)
    }
}

impl InteractionLedger {
    pub fn new(
        id_mode: IdMode,
        identities: IdentityRegistry,
        projects: ProjectRegistry,
        approval_quorum: usize,
    ) -> Self {
        Self {
            auth: AuthorizationEngine::new(),
            id_mode,
            identities,
            projects,
            approval_quorum: approval_quorum.max(1),
        }
    }

    pub fn approval_quorum(&self) -> usize {
        self.approval_quorum
    }

    /// Record a project-scoped interaction by one of the project's contributors.
    pub async fn create_project_interaction(
        &self,
        tx: &mut TxContext,
        request: NewProjectInteraction,
        credentials: &Credentials,
    ) -> RegistryResult<Interaction> {
        validate_payload(&request.payload)?;
        let project = self.projects.get(tx, &request.project_id).await?;
        let participant = self.identities.get(tx, &request.participant_id).await?;

        self.auth
            .require_credential(&participant, credentials.participant.as_deref())?;
        self.auth
            .require_credential(&project, credentials.project.as_deref())?;
        self.auth
            .require_role(&project, &participant.id, ProjectRole::Contributor)?;

        let id = self.assign(tx, request.id.as_ref()).await?;
        let interaction = Interaction {
            id,
            parties: InteractionParties::ProjectInvestment {
                project_id: project.id.clone(),
                participant_id: participant.id,
            },
            payload: request.payload,
            status: InteractionStatus::Pending,
            approvers: Vec::new(),
            created_at: tx.timestamp(),
            validated_at: None,
        };
        store::save(tx, EntityKind::Interaction, interaction.id.as_str(), &interaction)?;
        self.projects
            .add_interaction_ref(tx, &project.id, &interaction.id)
            .await?;

        info!(
            interaction = %interaction.id,
            project = %project.id,
            kind = %interaction.kind(),
            "interaction recorded"
        );
        Ok(interaction)
    }

    /// Record an interaction between two distinct, existing participants.
    pub async fn create_peer_interaction(
        &self,
        tx: &mut TxContext,
        request: NewPeerInteraction,
        credentials: &Credentials,
    ) -> RegistryResult<Interaction> {
        validate_payload(&request.payload)?;
        if request.participant_id_a == request.participant_id_b {
            return Err(RegistryError::InvalidArgument(format!(
                "peer interaction needs two distinct participants, got {} twice",
                request.participant_id_a
            )));
        }
        let initiator = self.identities.get(tx, &request.participant_id_a).await?;
        if !self.identities.exists(tx, &request.participant_id_b).await? {
            return Err(RegistryError::NotFound(format!(
                "participant {} does not exist",
                request.participant_id_b
            )));
        }
        self.auth
            .require_credential(&initiator, credentials.participant.as_deref())?;

        let id = self.assign(tx, request.id.as_ref()).await?;
        let interaction = Interaction {
            id,
            parties: InteractionParties::PeerToPeer {
                participant_id_a: request.participant_id_a,
                participant_id_b: request.participant_id_b,
            },
            payload: request.payload,
            status: InteractionStatus::Pending,
            approvers: Vec::new(),
            created_at: tx.timestamp(),
            validated_at: None,
        };
        store::save(tx, EntityKind::Interaction, interaction.id.as_str(), &interaction)?;

        info!(interaction = %interaction.id, kind = %interaction.kind(), "interaction recorded");
        Ok(interaction)
    }

    /// Approve an interaction on behalf of `approver`.
    ///
    /// Project-scoped interactions accept the project's validators; peer
    /// interactions accept either party. Approving twice is a no-op.
    pub async fn validate_interaction(
        &self,
        tx: &mut TxContext,
        interaction_id: &InteractionId,
        approver: &ParticipantId,
        credentials: &Credentials,
    ) -> RegistryResult<Interaction> {
        let mut interaction = self.get(tx, interaction_id).await?;
        let participant = self.identities.get(tx, approver).await?;
        self.auth
            .require_credential(&participant, credentials.participant.as_deref())?;

        let eligible = match &interaction.parties {
            InteractionParties::ProjectInvestment { project_id, .. } => {
                let project = self.projects.get(tx, project_id).await?;
                self.auth
                    .require_credential(&project, credentials.project.as_deref())?;
                self.auth
                    .require_role(&project, approver, ProjectRole::Validator)?;
                project.validators.len()
            }
            InteractionParties::PeerToPeer { .. } => {
                self.auth.require_party(&interaction, approver)?;
                2
            }
        };

        let approved = interaction.approve(approver.clone());
        let quorum = self.approval_quorum.min(eligible).max(1);
        let settled = interaction.settle(quorum, tx.timestamp());
        if !approved && !settled {
            debug!(interaction = %interaction.id, approver = %approver, "approval already recorded");
            return Ok(interaction);
        }
        store::save(tx, EntityKind::Interaction, interaction.id.as_str(), &interaction)?;

        info!(
            interaction = %interaction.id,
            approver = %approver,
            approvals = interaction.approvers.len(),
            quorum,
            validated = interaction.is_validated(),
            "interaction approved"
        );
        Ok(interaction)
    }

    pub async fn get(&self, tx: &mut TxContext, id: &InteractionId) -> RegistryResult<Interaction> {
        store::fetch(tx, EntityKind::Interaction, id.as_str()).await
    }

    /// Every interaction in ID order.
    pub async fn list(&self, tx: &mut TxContext) -> RegistryResult<EntityIter<Interaction>> {
        EntityIter::open(tx, EntityKind::Interaction).await
    }

    pub async fn count(&self, tx: &mut TxContext) -> RegistryResult<u64> {
        SequenceAllocator::current(tx, EntityKind::Interaction).await
    }

    async fn assign(
        &self,
        tx: &mut TxContext,
        requested: Option<&InteractionId>,
    ) -> RegistryResult<InteractionId> {
        let id = SequenceAllocator::assign(
            tx,
            EntityKind::Interaction,
            self.id_mode,
            requested.map(InteractionId::as_str),
        )
        .await?;
        Ok(InteractionId::new(id))
    }
}

fn validate_payload(payload: &Payload) -> RegistryResult<()> {
    match payload {
        Payload::Investment { amount, currency } => {
            if *amount == 0 {
                return Err(RegistryError::InvalidArgument(
                    "investment amount must be positive".into(),
                ));
            }
            match currency {
                Some(currency) => require_text("investment currency", currency),
                None => Ok(()),
            }
        }
        Payload::Description { text } => require_text("interaction description", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NewParticipant;
    use crate::project::NewProject;
    use crate::testing::{bootstrapped, tx};
    use proptest::prelude::*;
    use std::sync::Arc;
    use utopia_auth::AuthError;
    use utopia_ledger::InMemoryLedger;

    struct Fixture {
        ledger: Arc<InMemoryLedger>,
        identities: IdentityRegistry,
        projects: ProjectRegistry,
    }

    impl Fixture {
        /// participant0 contributes, participant1 and participant2 validate project0.
        async fn new() -> Self {
            let ledger = bootstrapped().await;
            let identities = IdentityRegistry::default();
            let projects = ProjectRegistry::new(IdMode::Allocated, identities);
            let mut ctx = tx(&ledger);
            for (name, credential) in [("Ana", Some("ana-pw")), ("Bo", None), ("Cy", None)] {
                identities
                    .create(
                        &mut ctx,
                        NewParticipant {
                            name: name.into(),
                            email: format!("{}@example.org", name),
                            role: "ES".into(),
                            credential: credential.map(String::from),
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap();
            }
            projects
                .create(
                    &mut ctx,
                    NewProject {
                        name: "Solar roof".into(),
                        start_date: "2024-01-01".into(),
                        end_date: "2024-12-31".into(),
                        contributors: vec![ParticipantId::new("participant0")],
                        validators: vec![
                            ParticipantId::new("participant1"),
                            ParticipantId::new("participant2"),
                        ],
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            ctx.commit().await.unwrap();
            Self {
                ledger,
                identities,
                projects,
            }
        }

        fn interactions(&self, quorum: usize) -> InteractionLedger {
            InteractionLedger::new(IdMode::Allocated, self.identities, self.projects, quorum)
        }

        fn investment(&self, participant: &str) -> NewProjectInteraction {
            NewProjectInteraction {
                id: None,
                project_id: ProjectId::new("project0"),
                participant_id: ParticipantId::new(participant),
                payload: Payload::investment(100, "EUR"),
            }
        }
    }

    fn ana() -> Credentials {
        Credentials::participant("ana-pw")
    }

    #[tokio::test]
    async fn contributor_records_pending_interaction() {
        let fx = Fixture::new().await;
        let ledger = fx.interactions(1);
        let mut ctx = tx(&fx.ledger);

        let created = ledger
            .create_project_interaction(&mut ctx, fx.investment("participant0"), &ana())
            .await
            .unwrap();
        assert_eq!(created.id.as_str(), "interaction0");
        assert_eq!(created.status, InteractionStatus::Pending);
        assert!(created.approvers.is_empty());

        let project = fx.projects.get(&mut ctx, &ProjectId::new("project0")).await.unwrap();
        assert_eq!(project.interaction_ids, vec![created.id]);
    }

    #[tokio::test]
    async fn non_contributor_is_unauthorized() {
        let fx = Fixture::new().await;
        let ledger = fx.interactions(1);
        let mut ctx = tx(&fx.ledger);
        let result = ledger
            .create_project_interaction(&mut ctx, fx.investment("participant1"), &Credentials::none())
            .await;
        assert!(matches!(
            result,
            Err(RegistryError::Unauthorized(AuthError::MissingRole { .. }))
        ));
    }

    #[tokio::test]
    async fn gated_participant_needs_its_secret() {
        let fx = Fixture::new().await;
        let ledger = fx.interactions(1);
        let mut ctx = tx(&fx.ledger);
        let missing = ledger
            .create_project_interaction(&mut ctx, fx.investment("participant0"), &Credentials::none())
            .await;
        assert!(matches!(
            missing,
            Err(RegistryError::Unauthorized(AuthError::CredentialRequired(_)))
        ));
        let wrong = ledger
            .create_project_interaction(
                &mut ctx,
                fx.investment("participant0"),
                &Credentials::participant("nope"),
            )
            .await;
        assert!(matches!(
            wrong,
            Err(RegistryError::Unauthorized(AuthError::CredentialMismatch(_)))
        ));
    }

    #[tokio::test]
    async fn payloads_are_checked() {
        let fx = Fixture::new().await;
        let ledger = fx.interactions(1);
        let mut ctx = tx(&fx.ledger);
        for payload in [Payload::investment(0, "EUR"), Payload::investment(5, " "), Payload::description("")] {
            let request = NewProjectInteraction {
                payload,
                ..fx.investment("participant0")
            };
            assert!(matches!(
                ledger.create_project_interaction(&mut ctx, request, &ana()).await,
                Err(RegistryError::InvalidArgument(_))
            ));
        }
    }

    #[tokio::test]
    async fn validator_approval_settles_with_single_quorum() {
        let fx = Fixture::new().await;
        let ledger = fx.interactions(1);
        let mut ctx = tx(&fx.ledger);
        let created = ledger
            .create_project_interaction(&mut ctx, fx.investment("participant0"), &ana())
            .await
            .unwrap();

        let denied = ledger
            .validate_interaction(&mut ctx, &created.id, &ParticipantId::new("participant0"), &ana())
            .await;
        assert!(matches!(denied, Err(RegistryError::Unauthorized(_))));
        let unchanged = ledger.get(&mut ctx, &created.id).await.unwrap();
        assert_eq!(unchanged, created);

        let bo = ParticipantId::new("participant1");
        let validated = ledger
            .validate_interaction(&mut ctx, &created.id, &bo, &Credentials::none())
            .await
            .unwrap();
        assert_eq!(validated.status, InteractionStatus::Validated);
        assert_eq!(validated.approvers, vec![bo.clone()]);
        assert_eq!(validated.validated_at, Some(ctx.timestamp()));

        let again = ledger
            .validate_interaction(&mut ctx, &created.id, &bo, &Credentials::none())
            .await
            .unwrap();
        assert_eq!(again, validated);
    }

    #[tokio::test]
    async fn quorum_waits_for_distinct_validators() {
        let fx = Fixture::new().await;
        let ledger = fx.interactions(2);
        let mut ctx = tx(&fx.ledger);
        let created = ledger
            .create_project_interaction(&mut ctx, fx.investment("participant0"), &ana())
            .await
            .unwrap();

        let bo = ParticipantId::new("participant1");
        let first = ledger
            .validate_interaction(&mut ctx, &created.id, &bo, &Credentials::none())
            .await
            .unwrap();
        assert_eq!(first.status, InteractionStatus::Pending);
        let repeat = ledger
            .validate_interaction(&mut ctx, &created.id, &bo, &Credentials::none())
            .await
            .unwrap();
        assert_eq!(repeat.status, InteractionStatus::Pending);

        let second = ledger
            .validate_interaction(
                &mut ctx,
                &created.id,
                &ParticipantId::new("participant2"),
                &Credentials::none(),
            )
            .await
            .unwrap();
        assert_eq!(second.status, InteractionStatus::Validated);
        assert_eq!(second.approvers.len(), 2);
    }

    #[tokio::test]
    async fn quorum_is_capped_by_eligible_approvers() {
        let fx = Fixture::new().await;
        let ledger = fx.interactions(10);
        let mut ctx = tx(&fx.ledger);
        let peer = ledger
            .create_peer_interaction(
                &mut ctx,
                NewPeerInteraction {
                    id: None,
                    participant_id_a: ParticipantId::new("participant1"),
                    participant_id_b: ParticipantId::new("participant2"),
                    payload: Payload::description("code review"),
                },
                &Credentials::none(),
            )
            .await
            .unwrap();

        for approver in ["participant1", "participant2"] {
            ledger
                .validate_interaction(&mut ctx, &peer.id, &ParticipantId::new(approver), &Credentials::none())
                .await
                .unwrap();
        }
        assert!(ledger.get(&mut ctx, &peer.id).await.unwrap().is_validated());
    }

    #[tokio::test]
    async fn peer_interactions_need_two_existing_distinct_parties() {
        let fx = Fixture::new().await;
        let ledger = fx.interactions(1);
        let mut ctx = tx(&fx.ledger);
        let request = |a: &str, b: &str| NewPeerInteraction {
            id: None,
            participant_id_a: ParticipantId::new(a),
            participant_id_b: ParticipantId::new(b),
            payload: Payload::investment(10, "USD"),
        };

        let same = ledger
            .create_peer_interaction(&mut ctx, request("participant1", "participant1"), &Credentials::none())
            .await;
        assert!(matches!(same, Err(RegistryError::InvalidArgument(_))));

        let missing = ledger
            .create_peer_interaction(&mut ctx, request("participant1", "participant9"), &Credentials::none())
            .await;
        assert!(matches!(&missing, Err(RegistryError::NotFound(msg)) if msg.contains("participant9")));

        let created = ledger
            .create_peer_interaction(&mut ctx, request("participant1", "participant2"), &Credentials::none())
            .await
            .unwrap();
        assert_eq!(created.parties.project_id(), None);

        let outsider = ledger
            .validate_interaction(&mut ctx, &created.id, &ParticipantId::new("participant0"), &ana())
            .await;
        assert!(matches!(
            outsider,
            Err(RegistryError::Unauthorized(AuthError::NotAParty { .. }))
        ));
        let by_b = ledger
            .validate_interaction(&mut ctx, &created.id, &ParticipantId::new("participant2"), &Credentials::none())
            .await
            .unwrap();
        assert!(by_b.is_validated());
    }

    #[tokio::test]
    async fn unknown_interaction_is_named() {
        let fx = Fixture::new().await;
        let ledger = fx.interactions(1);
        let mut ctx = tx(&fx.ledger);
        let err = ledger
            .validate_interaction(
                &mut ctx,
                &InteractionId::new("interaction42"),
                &ParticipantId::new("participant1"),
                &Credentials::none(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "not found: interaction interaction42 does not exist");
    }

    proptest! {
        #[test]
        fn repeated_approvals_keep_one_copy(order in proptest::collection::vec(1usize..3, 1..12)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");

            rt.block_on(async move {
                let fx = Fixture::new().await;
                let ledger = fx.interactions(3);
                let mut ctx = tx(&fx.ledger);
                let created = ledger
                    .create_project_interaction(&mut ctx, fx.investment("participant0"), &ana())
                    .await
                    .unwrap();

                let mut expected: Vec<ParticipantId> = Vec::new();
                for n in order {
                    let approver = ParticipantId::new(format!("participant{}", n));
                    ledger
                        .validate_interaction(&mut ctx, &created.id, &approver, &Credentials::none())
                        .await
                        .unwrap();
                    if !expected.contains(&approver) {
                        expected.push(approver);
                    }
                }
                let stored = ledger.get(&mut ctx, &created.id).await.unwrap();
                assert_eq!(stored.approvers, expected);
                assert_eq!(stored.is_validated(), expected.len() == 2);
            });
        }
    }
}
