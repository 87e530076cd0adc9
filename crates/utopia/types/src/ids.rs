//! Strongly-typed identifiers for workspace entities
//!
//! IDs are plain strings on the ledger (`participant0`, `project3`, ...) but
//! wrapped in newtypes so a project ID can never be passed where a participant
//! ID is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three entity kinds kept on the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Participant,
    Project,
    Interaction,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Participant,
        EntityKind::Project,
        EntityKind::Interaction,
    ];

    /// Prefix used both for allocated IDs and for the kind's key namespace.
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Participant => "participant",
            EntityKind::Project => "project",
            EntityKind::Interaction => "interaction",
        }
    }

    /// True when `id` has the shape the sequence allocator hands out for this kind.
    pub fn is_allocated_id(&self, id: &str) -> bool {
        id.strip_prefix(self.prefix())
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub const KIND: EntityKind = $kind;

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The ID the allocator issues for sequence number `n`.
            pub fn from_sequence(n: u64) -> Self {
                Self(format!("{}{}", $kind.prefix(), n))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a registered participant (person or organization).
    ParticipantId,
    EntityKind::Participant
);
entity_id!(
    /// Identifier of a project.
    ProjectId,
    EntityKind::Project
);
entity_id!(
    /// Identifier of a recorded interaction.
    InteractionId,
    EntityKind::Interaction
);
