//! Repository for the `nodes` table.

use mediaq_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::node::{Heartbeat, Node, RegisterNode};

/// Column list for `nodes` queries.
const COLUMNS: &str = "\
    id, name, address, last_seen, cpu_pct, mem_pct, net_in, net_out, \
    is_active, created_at, updated_at";

/// Provides registration, heartbeat and admin operations for nodes.
pub struct NodeRepo;

impl NodeRepo {
    // ── Registration ─────────────────────────────────────────────────────

    /// Register a node, or return the existing row on name conflict.
    ///
    /// On conflict only the address is touched, and only when a new one is
    /// supplied. Metrics and `last_seen` are left alone.
    pub async fn register(
        pool: &PgPool,
        input: &RegisterNode,
        now: Timestamp,
    ) -> Result<Node, sqlx::Error> {
        let query = format!(
            "INSERT INTO nodes (name, address, is_active, created_at, updated_at) \
             VALUES ($1, $2, true, $3, $3) \
             ON CONFLICT (name) DO UPDATE SET \
                address = COALESCE(EXCLUDED.address, nodes.address) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Node>(&query)
            .bind(&input.name)
            .bind(&input.address)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Find a node by its unique name.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Node>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM nodes WHERE name = $1");
        sqlx::query_as::<_, Node>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// List all nodes ordered by name (admin view).
    pub async fn list(pool: &PgPool) -> Result<Vec<Node>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM nodes ORDER BY name ASC");
        sqlx::query_as::<_, Node>(&query).fetch_all(pool).await
    }

    /// List nodes with the administrative `is_active` flag set.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Node>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM nodes WHERE is_active = true ORDER BY name ASC");
        sqlx::query_as::<_, Node>(&query).fetch_all(pool).await
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Record a heartbeat: stamp `last_seen` and overwrite only the metrics
    /// that were supplied.
    pub async fn record_heartbeat(
        pool: &PgPool,
        input: &Heartbeat,
        now: Timestamp,
    ) -> Result<Option<Node>, sqlx::Error> {
        let query = format!(
            "UPDATE nodes SET \
                last_seen = $2, \
                cpu_pct = COALESCE($3, cpu_pct), \
                mem_pct = COALESCE($4, mem_pct), \
                net_in = COALESCE($5, net_in), \
                net_out = COALESCE($6, net_out) \
             WHERE name = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Node>(&query)
            .bind(&input.name)
            .bind(now)
            .bind(input.cpu_pct)
            .bind(input.mem_pct)
            .bind(input.net_in)
            .bind(input.net_out)
            .fetch_optional(pool)
            .await
    }

    /// Flip the administrative enable flag.
    pub async fn set_active(
        pool: &PgPool,
        name: &str,
        is_active: bool,
    ) -> Result<Option<Node>, sqlx::Error> {
        let query = format!("UPDATE nodes SET is_active = $2 WHERE name = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Node>(&query)
            .bind(name)
            .bind(is_active)
            .fetch_optional(pool)
            .await
    }
}
