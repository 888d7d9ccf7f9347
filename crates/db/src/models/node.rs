//! Worker node entity models and DTOs.

use mediaq_core::admission::NodeView;
use mediaq_core::load::LoadSample;
use mediaq_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity structs (match database tables)
// ---------------------------------------------------------------------------

/// A row from the `nodes` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Node {
    pub id: DbId,
    pub name: String,
    pub address: Option<String>,
    pub last_seen: Option<Timestamp>,
    pub cpu_pct: Option<f64>,
    pub mem_pct: Option<f64>,
    pub net_in: Option<i64>,
    pub net_out: Option<i64>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Node {
    /// The metrics that feed load scoring.
    pub fn load(&self) -> LoadSample {
        LoadSample::new(self.cpu_pct, self.mem_pct)
    }

    /// Snapshot used by admission control.
    pub fn view(&self) -> NodeView {
        NodeView {
            id: self.id,
            is_active: self.is_active,
            last_seen: self.last_seen,
            load: self.load(),
        }
    }
}

// ---------------------------------------------------------------------------
// Input DTOs
// ---------------------------------------------------------------------------

/// DTO for `POST /nodes/register`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterNode {
    pub name: String,
    pub address: Option<String>,
}

/// DTO for `POST /nodes/heartbeat`. Omitted metrics keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Heartbeat {
    pub name: String,
    pub cpu_pct: Option<f64>,
    pub mem_pct: Option<f64>,
    pub net_in: Option<i64>,
    pub net_out: Option<i64>,
}
