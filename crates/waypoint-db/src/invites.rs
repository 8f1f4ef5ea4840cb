//! Invite repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use waypoint_core::{CreateInviteRequest, Error, Invite, InviteRepository, Result};

use crate::capabilities::Capabilities;

/// PostgreSQL implementation of InviteRepository.
#[derive(Clone)]
pub struct PgInviteRepository {
    pool: Pool<Postgres>,
    caps: Capabilities,
}

impl PgInviteRepository {
    pub fn new(pool: Pool<Postgres>, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    fn columns(&self) -> &'static str {
        if self.caps.invite_email {
            "token, role, email, expires_at, used_at, created_at"
        } else {
            "token, role, expires_at, used_at, created_at"
        }
    }

    fn row_to_invite(&self, row: &PgRow) -> Result<Invite> {
        let role: String = row.get("role");
        Ok(Invite {
            token: row.get("token"),
            role: role.parse().map_err(Error::Internal)?,
            email: if self.caps.invite_email {
                row.get("email")
            } else {
                None
            },
            expires_at: row.get("expires_at"),
            used_at: row.get("used_at"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl InviteRepository for PgInviteRepository {
    async fn create(&self, req: CreateInviteRequest) -> Result<Invite> {
        if req.email.is_some() && !self.caps.invite_email {
            tracing::warn!(
                subsystem = "db",
                component = "invites",
                op = "create",
                "Schema has no invite.email column; dropping invite email"
            );
        }

        let sql = if self.caps.invite_email {
            format!(
                "INSERT INTO invite (token, role, expires_at, created_at, email) VALUES ($1, $2, $3, now(), $4) RETURNING {}",
                self.columns()
            )
        } else {
            format!(
                "INSERT INTO invite (token, role, expires_at, created_at) VALUES ($1, $2, $3, now()) RETURNING {}",
                self.columns()
            )
        };

        let mut query = sqlx::query(&sql)
            .bind(&req.token)
            .bind(req.role.as_str())
            .bind(req.expires_at);
        if self.caps.invite_email {
            query = query.bind(&req.email);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        self.row_to_invite(&row)
    }

    async fn find(&self, token: &str) -> Result<Option<Invite>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM invite WHERE token = $1",
            self.columns()
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.as_ref().map(|r| self.row_to_invite(r)).transpose()
    }

    async fn consume(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Invite>> {
        // Single conditional UPDATE: only one concurrent caller can flip used_at.
        let row = sqlx::query(&format!(
            r#"
            UPDATE invite SET used_at = $2
            WHERE token = $1 AND used_at IS NULL AND expires_at > $2
            RETURNING {}
            "#,
            self.columns()
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.as_ref().map(|r| self.row_to_invite(r)).transpose()
    }

    async fn revoke(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM invite WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Invite>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM invite ORDER BY created_at DESC",
            self.columns()
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(|r| self.row_to_invite(r)).collect()
    }
}
