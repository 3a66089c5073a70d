//! Caller identity handed explicitly to scoping operations.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Partner,
    Manager,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "partner" => Some(Role::Partner),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Admin => "admin",
            Role::Partner => "partner",
            Role::Manager => "manager",
        };
        f.write_str(label)
    }
}

/// The current user's role and station scope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessContext {
    pub role: Role,
    #[serde(default)]
    pub station_id: Option<i64>,
}

impl AccessContext {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            station_id: None,
        }
    }

    pub fn partner() -> Self {
        Self {
            role: Role::Partner,
            station_id: None,
        }
    }

    pub fn manager(station_id: i64) -> Self {
        Self {
            role: Role::Manager,
            station_id: Some(station_id),
        }
    }

    /// Managers only see their own station.
    pub fn is_station_bound(&self) -> bool {
        matches!(self.role, Role::Manager)
    }
}

impl Default for AccessContext {
    fn default() -> Self {
        Self::admin()
    }
}
