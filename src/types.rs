/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raised when a stored or submitted label matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Account role. Admins see and review everything, customers only their own data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            other => Err(UnknownVariant { kind: "role", value: other.to_string() }),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of an uploaded document.
///
/// Documents start as `Pending`; an admin review moves them to `Approved` or
/// `Rejected`. A new upload for the same key replaces the row instead of
/// reopening it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
        }
    }

    /// Only approved and rejected are valid outcomes of a review
    pub fn is_review_outcome(&self) -> bool {
        matches!(self, DocumentStatus::Approved | DocumentStatus::Rejected)
    }
}

impl FromStr for DocumentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "approved" => Ok(DocumentStatus::Approved),
            "rejected" => Ok(DocumentStatus::Rejected),
            other => Err(UnknownVariant { kind: "document status", value: other.to_string() }),
        }
    }
}

impl TryFrom<String> for DocumentStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case progress of a client profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Pending,
    Active,
    Completed,
    Inactive,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Pending => "pending",
            ClientStatus::Active => "active",
            ClientStatus::Completed => "completed",
            ClientStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for ClientStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClientStatus::Pending),
            "active" => Ok(ClientStatus::Active),
            "completed" => Ok(ClientStatus::Completed),
            "inactive" => Ok(ClientStatus::Inactive),
            other => Err(UnknownVariant { kind: "client status", value: other.to_string() }),
        }
    }
}

impl TryFrom<String> for ClientStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// For `Option<Option<T>>` patch fields with `#[serde(default)]`: an absent
/// key stays `None`, an explicit `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// `?skip=&limit=` paging shared by the list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Paging {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Paging {
    /// Resolve to (offset, limit), clamping the limit to `1..=max_limit`
    pub fn resolve(&self, default_limit: i64, max_limit: i64) -> (i64, i64) {
        let offset = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit.max(1));
        (offset, limit)
    }
}
