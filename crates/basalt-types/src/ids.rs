//! Newtype entity identifiers.
//!
//! Every cluster entity is keyed by an operator- or gossip-supplied string.
//! Wrapping each kind in its own type keeps a `VmId` from being passed where
//! a `NodeId` is expected, the same discipline the source applies to its own
//! identifiers (`TenantId`, `StreamId`, ...).

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Builds an id from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrows the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(NodeId, "Identifies a node object in the cluster state.");
string_id!(VmId, "Identifies a virtual machine.");
string_id!(NetworkId, "Identifies a network.");
string_id!(StoragePoolId, "Identifies a storage pool.");
string_id!(VolumeId, "Identifies a volume.");
string_id!(TemplateId, "Identifies a VM template.");
