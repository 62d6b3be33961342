//! Identifiers for production-tracking records.
//!
//! The tracking database hands out integer keys, so every identifier is a
//! thin newtype over `u64` that keeps the kinds from being mixed up.

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw database key.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw database key.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

numeric_id! {
    /// Unique identifier for an Asset or Shot
    EntityId
}

numeric_id! {
    /// Unique identifier for a Task
    TaskId
}

numeric_id! {
    /// Unique identifier for a Version
    VersionId
}

numeric_id! {
    /// Unique identifier for an Attachment
    AttachmentId
}

numeric_id! {
    /// Unique identifier for a PublishedFile
    PublishedFileId
}
