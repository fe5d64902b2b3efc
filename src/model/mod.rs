//! Board data model and wire normalization.
//!
//! The REST API and the push channel both speak the same record format
//! (camelCase fields, Mongo-style `_id`). The one wire quirk handled here is
//! the task's column reference: depending on whether the server populated the
//! relation, `columnId` arrives either as a bare id string or as an embedded
//! object carrying `_id`. It is normalized to a plain [`ColumnId`] during
//! deserialization — nothing past this module ever sees the ambiguity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
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
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Opaque server-assigned task identifier.
    TaskId
);
id_type!(
    /// Opaque server-assigned column identifier.
    ColumnId
);

/// Wire-side column reference: bare id or embedded `{ "_id": ... }` object.
///
/// Decoded exactly once, here. Past the serde boundary only [`ColumnId`]
/// exists.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ColumnRef {
    Id(ColumnId),
    Embedded {
        #[serde(rename = "_id")]
        id: ColumnId,
    },
}

impl ColumnRef {
    fn into_id(self) -> ColumnId {
        match self {
            ColumnRef::Id(id) => id,
            ColumnRef::Embedded { id } => id,
        }
    }
}

fn deserialize_column_ref<'de, D>(deserializer: D) -> Result<ColumnId, D::Error>
where
    D: Deserializer<'de>,
{
    ColumnRef::deserialize(deserializer).map(ColumnRef::into_id)
}

/// A task card on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_column_ref")]
    pub column_id: ColumnId,
    /// Real-valued sort key — position within the column, ascending.
    pub order: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Local-origin tag stamped on optimistically created tasks so the
    /// confirmation can match the tentative record without relying on its
    /// synthetic id. Never serialized.
    #[serde(skip)]
    pub local_ref: Option<u64>,
}

/// A board column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(rename = "_id")]
    pub id: ColumnId,
    pub title: String,
    pub order: f64,
    #[serde(default)]
    pub task_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
