// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Operation types of the storage contract.
//!
//! Used to bucket monitoring statistics by the kind of call that was made.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One operation of the [`KeyValueStore`](crate::backend::KeyValueStore) contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Clear,
    Delete,
    DeleteMany,
    Get,
    GetMany,
    Describe,
    Put,
    PutMany,
    Size,
    Dump,
}

impl OperationType {
    /// All operation types in canonical order.
    pub const ALL: [OperationType; 10] = [
        OperationType::Clear,
        OperationType::Delete,
        OperationType::DeleteMany,
        OperationType::Get,
        OperationType::GetMany,
        OperationType::Describe,
        OperationType::Put,
        OperationType::PutMany,
        OperationType::Size,
        OperationType::Dump,
    ];

    /// Upper-snake name, as used in reports and serialized snapshots.
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Clear => "CLEAR",
            OperationType::Delete => "DELETE",
            OperationType::DeleteMany => "DELETE_MANY",
            OperationType::Get => "GET",
            OperationType::GetMany => "GET_MANY",
            OperationType::Describe => "DESCRIBE",
            OperationType::Put => "PUT",
            OperationType::PutMany => "PUT_MANY",
            OperationType::Size => "SIZE",
            OperationType::Dump => "DUMP",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no operation type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation type: {0}")]
pub struct ParseOperationError(pub String);

impl FromStr for OperationType {
    type Err = ParseOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        OperationType::ALL
            .into_iter()
            .find(|op| op.as_str() == wanted)
            .ok_or_else(|| ParseOperationError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_roundtrip() {
        for op in OperationType::ALL {
            let parsed: OperationType = op.to_string().parse().unwrap();
            assert_eq!(op, parsed);
        }
    }

    #[test]
    fn test_case_insensitive_parse() {
        assert_eq!("get_many".parse::<OperationType>().unwrap(), OperationType::GetMany);
        assert_eq!(" Put ".parse::<OperationType>().unwrap(), OperationType::Put);
    }

    #[test]
    fn test_unknown_operation_error() {
        let err = "scan".parse::<OperationType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown operation type: scan");
    }

    #[test]
    fn test_serde_matches_display() {
        for op in OperationType::ALL {
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json, format!("\"{op}\""));
            let parsed: OperationType = serde_json::from_str(&json).unwrap();
            assert_eq!(op, parsed);
        }
    }

    #[test]
    fn test_all_is_complete_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in OperationType::ALL {
            assert!(seen.insert(op));
        }
        assert_eq!(seen.len(), 10);
    }
}
