//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every addressable thing in the engine has a strongly-typed id to prevent
//! accidental mixing of identifiers at compile time. All ids use UUID v7
//! (time-ordered), so naive lexicographic ordering of stored ids also
//! orders them by creation time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a session (a running world instance).
    SessionId
}

define_id! {
    /// Unique identifier for an entity within a session (agent, object,
    /// location, zone).
    EntityId
}

define_id! {
    /// Unique identifier for a proposed action.
    ActionId
}

define_id! {
    /// Unique identifier for an appended world event.
    EventId
}

define_id! {
    /// Unique identifier for a Logic open goal.
    GoalId
}

define_id! {
    /// Unique identifier for a Logic pending proposal (hypothesis or
    /// conclusion awaiting acceptance).
    ProposalId
}

define_id! {
    /// Unique identifier for a Logic refutation record.
    RefutationId
}

define_id! {
    /// Unique identifier for a Logic researcher (an agent acting in the
    /// Logic world kind).
    ResearcherId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let entity = EntityId::new();
        let session = SessionId::new();
        assert_ne!(entity.into_inner(), Uuid::nil());
        assert_ne!(session.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = EntityId::new();
        let json = serde_json::to_string(&original).expect("serialize");
        let restored: EntityId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(original, restored);
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = ActionId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }

    #[test]
    fn ids_are_time_ordered() {
        let first = SessionId::new();
        let second = SessionId::new();
        assert!(first <= second);
    }
}
