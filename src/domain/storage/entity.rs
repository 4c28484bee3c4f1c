//! Storage entity traits and types

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

/// Trait for numeric entity identifiers
///
/// Identifiers are allocated by the repositories, starting at 1. Zero is never a
/// valid persisted id and is used on the wire to mean "nothing was persisted".
pub trait StorageKey: Clone + Copy + Debug + Send + Sync + Eq + std::hash::Hash {
    /// Build a key from its raw value
    fn from_value(value: i64) -> Self;

    /// Raw numeric value of the key
    fn value(&self) -> i64;

    /// String form used by storage backends that key rows by text
    fn as_key(&self) -> String {
        self.value().to_string()
    }
}

/// Trait for types that can be stored
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    /// The key type for this entity
    type Key: StorageKey;

    /// Returns the entity's key
    fn key(&self) -> &Self::Key;
}

/// Declares a transparent numeric identifier usable as a [`StorageKey`]
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl $crate::domain::storage::StorageKey for $name {
            fn from_value(value: i64) -> Self {
                Self(value)
            }

            fn value(&self) -> i64 {
                self.0
            }
        }
    };
}

pub(crate) use entity_id;
