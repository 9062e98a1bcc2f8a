//! Branch registry
//!
//! The tracked gyms form a closed set. Each branch carries the opaque id the
//! upstream API knows it by and the small integer used as `branch_id` in
//! persisted rows. Both mappings are fixed at compile time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Per-branch ordered sequences, always containing every branch
pub type BranchMap<T> = BTreeMap<Branch, Vec<T>>;

/// A physical gym location tracked by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Westend,
    Milton,
    Newstead,
}

impl Branch {
    /// Every registered branch.
    ///
    /// Callers must not depend on the order of the returned array.
    pub const fn all() -> [Branch; 3] {
        [Branch::Westend, Branch::Milton, Branch::Newstead]
    }

    /// Lowercase name used in URLs, JSON keys and logs
    pub const fn name(self) -> &'static str {
        match self {
            Branch::Westend => "westend",
            Branch::Milton => "milton",
            Branch::Newstead => "newstead",
        }
    }

    /// Identifier passed to the upstream API as the `branch` query value
    pub const fn upstream_id(self) -> &'static str {
        match self {
            Branch::Westend => "D969F1B2-0C9F-49A9-B2AC-D7775642F298",
            Branch::Milton => "690326F9-98CE-4249-BD91-53A0676A137B",
            Branch::Newstead => "A3010228-DFC6-4317-86C0-3839FFDF3FD0",
        }
    }

    /// Stable key stored in the `branch_id` column
    pub const fn storage_id(self) -> i64 {
        match self {
            Branch::Westend => 0,
            Branch::Milton => 1,
            Branch::Newstead => 2,
        }
    }

    /// Reverse lookup of [`Branch::storage_id`]
    pub fn from_storage_id(id: i64) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|b| b.storage_id() == id)
            .ok_or(Error::UnknownStorageId(id))
    }

    /// Reverse lookup of [`Branch::name`] (case-insensitive)
    pub fn from_name(name: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownBranch(name.to_string()))
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Branch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Build a map with an empty sequence for every branch
pub fn empty_branch_map<T>() -> BranchMap<T> {
    Branch::all().into_iter().map(|b| (b, Vec::new())).collect()
}
