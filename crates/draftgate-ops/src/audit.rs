//! Admin audit trail
//!
//! Records who changed settings or fired drills. Bounded; oldest entries drop.

use chrono::{DateTime, Utc};
use draftgate_core::Actor;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Title length bound changed
    DraftSettingsUpdate,
    /// Model timeout bound changed
    NewsSettingsUpdate,
    /// Test alert synthesized
    AlertTest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAuditEntry {
    pub id: String,
    pub at: DateTime<Utc>,
    pub actor_id: String,
    pub actor_role: String,
    pub action: AuditAction,
    pub detail: serde_json::Value,
}

impl AdminAuditEntry {
    pub fn new(actor: &Actor, action: AuditAction, detail: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            at: Utc::now(),
            actor_id: actor.id.clone(),
            actor_role: actor.role.clone(),
            action,
            detail,
        }
    }
}

#[derive(Debug)]
pub struct AdminAuditLog {
    entries: Mutex<VecDeque<AdminAuditEntry>>,
    max_entries: usize,
}

impl Default for AdminAuditLog {
    fn default() -> Self {
        Self::with_max_entries(1000)
    }
}

impl AdminAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries: max.max(1),
        }
    }

    pub fn log(&self, entry: AdminAuditEntry) {
        tracing::info!(
            actor = %entry.actor_id,
            role = %entry.actor_role,
            action = ?entry.action,
            "admin action"
        );
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push_back(entry);
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<AdminAuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
