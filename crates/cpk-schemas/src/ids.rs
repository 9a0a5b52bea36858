//! Typed identifiers.
//!
//! Every record id is a v4 uuid wrapped in its own newtype so a schedule id
//! can never be passed where a transaction id is expected.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Fresh random id.
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = crate::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|_| {
                    crate::CoreError::InvalidArgument(format!(
                        "invalid {}: '{s}'",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

uuid_id!(
    /// Tenant isolation boundary.
    WorkspaceId
);
uuid_id!(EntityId);
uuid_id!(AccountId);
uuid_id!(ContractId);
uuid_id!(ScheduleId);
uuid_id!(TransactionId);
uuid_id!(DebitNoteId);
uuid_id!(AlertId);
