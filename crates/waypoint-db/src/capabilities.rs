//! Startup probe for optional schema features.
//!
//! Older deployments may not have run every migration yet. Instead of trying
//! the current shape and falling back on error for every call, the store
//! checks `information_schema` once and branches on these flags.

use sqlx::PgPool;
use tracing::{debug, warn};

use waypoint_core::{Error, Result};

/// Which optional columns exist in the connected schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `learning_task.attachments` (JSONB). Without it attachments are
    /// folded into `note_md` as markdown links.
    pub task_attachments: bool,
    /// `invite.email`. Without it invites cannot be bound to an address.
    pub invite_email: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::current()
    }
}

impl Capabilities {
    /// Every optional column present (fully migrated schema).
    pub const fn current() -> Self {
        Self {
            task_attachments: true,
            invite_email: true,
        }
    }

    /// Schema from before the optional columns were added.
    pub const fn legacy() -> Self {
        Self {
            task_attachments: false,
            invite_email: false,
        }
    }

    /// Derive flags from `(table, column)` pairs.
    pub fn from_columns<'a>(columns: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut caps = Self::legacy();
        for (table, column) in columns {
            match (table, column) {
                ("learning_task", "attachments") => caps.task_attachments = true,
                ("invite", "email") => caps.invite_email = true,
                _ => {}
            }
        }
        caps
    }

    /// Inspect the connected schema.
    pub async fn probe(pool: &PgPool) -> Result<Self> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT table_name::text, column_name::text
            FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND table_name IN ('learning_task', 'invite')
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(Error::Database)?;

        let caps = Self::from_columns(rows.iter().map(|(t, c)| (t.as_str(), c.as_str())));

        debug!(
            subsystem = "db",
            component = "capabilities",
            task_attachments = caps.task_attachments,
            invite_email = caps.invite_email,
            "Schema capabilities probed"
        );
        if caps != Self::current() {
            warn!(
                subsystem = "db",
                component = "capabilities",
                "Schema is missing optional columns; using legacy storage shape"
            );
        }
        Ok(caps)
    }
}
