//! Stored entities survive the canonical codec unchanged.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use proptest::option;
use proptest::prelude::*;
use std::collections::BTreeSet;
use utopia_ledger::codec::{decode, encode};
use utopia_types::{
    CredentialHash, Interaction, InteractionId, InteractionParties, InteractionStatus,
    Participant, ParticipantId, Payload, Project, ProjectId,
};

fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000, 0u32..1_000_000_000)
        .prop_map(|(secs, nanos)| Utc.timestamp_opt(secs, nanos).unwrap())
}

fn date() -> impl Strategy<Value = NaiveDate> {
    (700_000i32..800_000).prop_map(|days| NaiveDate::from_num_days_from_ce_opt(days).unwrap())
}

fn credential() -> impl Strategy<Value = Option<CredentialHash>> {
    option::of("[0-9a-f]{64}".prop_map(CredentialHash))
}

fn participant_id() -> impl Strategy<Value = ParticipantId> {
    (0u64..50).prop_map(|n| ParticipantId::new(format!("participant{}", n)))
}

fn project_id() -> impl Strategy<Value = ProjectId> {
    (0u64..50).prop_map(|n| ProjectId::new(format!("project{}", n)))
}

fn interaction_id() -> impl Strategy<Value = InteractionId> {
    (0u64..100).prop_map(|n| InteractionId::new(format!("interaction{}", n)))
}

fn participant() -> impl Strategy<Value = Participant> {
    (
        participant_id(),
        "\\PC{0,16}",
        "[a-z]{1,8}@[a-z]{1,8}\\.org",
        "[A-Z]{2}",
        credential(),
        proptest::collection::btree_set(project_id(), 0..4),
        timestamp(),
    )
        .prop_map(
            |(id, name, email, role, credential_hash, project_ids, created_at)| Participant {
                id,
                name,
                email,
                role,
                credential_hash,
                project_ids,
                created_at,
            },
        )
}

fn project() -> impl Strategy<Value = Project> {
    (
        (project_id(), "\\PC{0,16}", "\\PC{0,32}", date(), date()),
        proptest::collection::btree_set(participant_id(), 1..4),
        proptest::collection::btree_set(participant_id(), 1..4),
        proptest::collection::vec(interaction_id(), 0..4),
        credential(),
        timestamp(),
    )
        .prop_map(
            |(
                (id, name, description, start_date, end_date),
                contributors,
                validators,
                interaction_ids,
                credential_hash,
                created_at,
            )| Project {
                id,
                name,
                description,
                start_date,
                end_date,
                contributors,
                validators,
                interaction_ids,
                credential_hash,
                created_at,
            },
        )
}

fn payload() -> impl Strategy<Value = Payload> {
    prop_oneof![
        (1u64..1_000_000, option::of("[A-Z]{3}"))
            .prop_map(|(amount, currency)| Payload::Investment { amount, currency }),
        "\\PC{1,24}".prop_map(Payload::description),
    ]
}

fn parties() -> impl Strategy<Value = InteractionParties> {
    prop_oneof![
        (project_id(), participant_id()).prop_map(|(project_id, participant_id)| {
            InteractionParties::ProjectInvestment {
                project_id,
                participant_id,
            }
        }),
        (participant_id(), participant_id()).prop_map(|(participant_id_a, participant_id_b)| {
            InteractionParties::PeerToPeer {
                participant_id_a,
                participant_id_b,
            }
        }),
    ]
}

fn interaction() -> impl Strategy<Value = Interaction> {
    (
        interaction_id(),
        parties(),
        payload(),
        proptest::collection::vec(participant_id(), 0..3),
        timestamp(),
        option::of(timestamp()),
    )
        .prop_map(
            |(id, parties, payload, approvers, created_at, validated_at)| Interaction {
                id,
                parties,
                payload,
                status: if validated_at.is_some() {
                    InteractionStatus::Validated
                } else {
                    InteractionStatus::Pending
                },
                approvers,
                created_at,
                validated_at,
            },
        )
}

proptest! {
    #[test]
    fn participants_round_trip(participant in participant()) {
        let bytes = encode(&participant).unwrap();
        prop_assert_eq!(decode::<Participant>(&bytes).unwrap(), participant);
    }

    #[test]
    fn projects_round_trip(project in project()) {
        let bytes = encode(&project).unwrap();
        prop_assert_eq!(decode::<Project>(&bytes).unwrap(), project);
    }

    #[test]
    fn interactions_round_trip(interaction in interaction()) {
        let bytes = encode(&interaction).unwrap();
        prop_assert_eq!(decode::<Interaction>(&bytes).unwrap(), interaction);
    }
}

#[test]
fn absent_options_are_omitted_and_restored() {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let interaction = Interaction {
        id: InteractionId::new("interaction0"),
        parties: InteractionParties::ProjectInvestment {
            project_id: ProjectId::new("project0"),
            participant_id: ParticipantId::new("participant0"),
        },
        payload: Payload::amount(100),
        status: InteractionStatus::Pending,
        approvers: Vec::new(),
        created_at,
        validated_at: None,
    };
    let text = String::from_utf8(encode(&interaction).unwrap()).unwrap();
    assert!(!text.contains("validated_at"));
    assert!(!text.contains("currency"));
    assert_eq!(decode::<Interaction>(text.as_bytes()).unwrap(), interaction);

    let participant = Participant {
        id: ParticipantId::new("participant0"),
        name: "Ana".into(),
        email: "ana@example.org".into(),
        role: "ES".into(),
        credential_hash: None,
        project_ids: BTreeSet::new(),
        created_at,
    };
    let text = String::from_utf8(encode(&participant).unwrap()).unwrap();
    assert!(!text.contains("credential_hash"));
    assert_eq!(decode::<Participant>(text.as_bytes()).unwrap(), participant);
}
