use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

new_key_type! {
    pub struct MoleculeKey;
}

macro_rules! uid_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh, time-ordered uid.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Derives a deterministic uid from a namespace uuid and a name.
            ///
            /// The same inputs always produce the same uid, which is what allows
            /// rebuilt graph elements and legacy documents to keep stable identities.
            pub fn derived(namespace: Uuid, name: &str) -> Self {
                Self(Uuid::new_v5(&namespace, name.as_bytes()))
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uid_type!(
    /// Scene-wide unique identifier of a node, stable across structural edits.
    NodeUid
);
uid_type!(
    /// Unique identifier of a link.
    LinkUid
);
uid_type!(
    /// Unique identifier of a molecule; also the key of the scene document's molecule map.
    MoleculeUid
);
