//! Polymorphic reference to the business object a task concerns.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Kind of business object an AI task is about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Provider,
    Referral,
    Customer,
    Campaign,
    ServiceRequest,
    Invoice,
    SponsorTile,
}

impl EntityType {
    pub const ALL: [EntityType; 7] = [
        EntityType::Provider,
        EntityType::Referral,
        EntityType::Customer,
        EntityType::Campaign,
        EntityType::ServiceRequest,
        EntityType::Invoice,
        EntityType::SponsorTile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Provider => "provider",
            EntityType::Referral => "referral",
            EntityType::Customer => "customer",
            EntityType::Campaign => "campaign",
            EntityType::ServiceRequest => "service_request",
            EntityType::Invoice => "invoice",
            EntityType::SponsorTile => "sponsor_tile",
        }
    }
}

impl core::fmt::Display for EntityType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown entity type: {s}")))
    }
}

/// `(entity_type, entity_id)` pair stored alongside every invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> DomainResult<Self> {
        let entity_id = entity_id.into();
        if entity_id.trim().is_empty() {
            return Err(DomainError::validation("entity_id must not be empty"));
        }
        Ok(Self {
            entity_type,
            entity_id,
        })
    }

    pub fn provider(id: impl Into<String>) -> DomainResult<Self> {
        Self::new(EntityType::Provider, id)
    }

    pub fn referral(id: impl Into<String>) -> DomainResult<Self> {
        Self::new(EntityType::Referral, id)
    }

    pub fn customer(id: impl Into<String>) -> DomainResult<Self> {
        Self::new(EntityType::Customer, id)
    }
}

impl core::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}
