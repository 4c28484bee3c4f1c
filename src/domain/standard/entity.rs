//! Company standard entity

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::storage::{entity_id, StorageEntity};

entity_id!(
    /// Company standard identifier
    StandardId
);

/// Sub-type of a company standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StandardKind {
    Voice,
    Platform,
    Image,
}

impl StandardKind {
    pub fn label(&self) -> &'static str {
        match self {
            StandardKind::Voice => "Brand Voice",
            StandardKind::Platform => "Platform Requirements",
            StandardKind::Image => "Image Guidelines",
        }
    }
}

impl fmt::Display for StandardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            StandardKind::Voice => "voice",
            StandardKind::Platform => "platform",
            StandardKind::Image => "image",
        };
        f.write_str(tag)
    }
}

/// A saved block of guidance injectable into prompts by name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyStandard {
    id: StandardId,
    user_id: i64,
    name: String,
    standard_type: StandardKind,
    content: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CompanyStandard {
    pub fn new(user_id: i64, name: impl Into<String>, kind: StandardKind, content: Value) -> Self {
        let now = Utc::now();
        Self {
            id: StandardId::default(),
            user_id,
            name: name.into(),
            standard_type: kind,
            content,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: StandardId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> StandardId {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StandardKind {
        self.standard_type
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl StorageEntity for CompanyStandard {
    type Key = StandardId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}
