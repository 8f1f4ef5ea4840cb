//! Registration invite actions.

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info, warn};

use waypoint_core::defaults::{INVITES_PAGE, INVITE_TOKEN_LEN};
use waypoint_core::{
    CreateInviteRequest, Error, Invite, Result, Role, CURATOR_ROLES,
};

use crate::auth::authorize;
use crate::portal::Portal;

/// Random alphanumeric invite token.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid || email.contains(char::is_whitespace) {
        return Err(Error::InvalidInput(format!("Invalid email: {}", email)));
    }
    Ok(email)
}

impl Portal {
    /// Mint an invite for `role`, optionally bound to one email address.
    ///
    /// Trainers may invite anyone except administrators.
    pub async fn create_invite(&self, role: Role, email: Option<&str>) -> Result<Invite> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "create_invite").await?;
        if role == Role::Administrator && session.role != Role::Administrator {
            warn!(
                subsystem = "actions",
                component = "invites",
                op = "create_invite",
                user_id = %session.user_id,
                "Rejected: only administrators may invite administrators"
            );
            return Err(Error::Forbidden(
                "Only administrators may invite administrators".to_string(),
            ));
        }
        let email = email
            .filter(|e| !e.trim().is_empty())
            .map(normalize_email)
            .transpose()?;
        let expires_at = Duration::try_hours(self.settings.invite_ttl_hours)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                Error::Config(format!(
                    "Invite lifetime of {} hours is out of range",
                    self.settings.invite_ttl_hours
                ))
            })?;

        let invite = self
            .invites
            .create(CreateInviteRequest {
                token: generate_token(),
                role,
                email,
                expires_at,
            })
            .await?;

        info!(
            subsystem = "actions",
            component = "invites",
            op = "create_invite",
            user_id = %session.user_id,
            role = %invite.role,
            expires_at = %invite.expires_at,
            "Invite created"
        );
        self.revalidate([INVITES_PAGE]).await;
        Ok(invite)
    }

    pub async fn list_invites(&self) -> Result<Vec<Invite>> {
        authorize(self.sessions.as_ref(), CURATOR_ROLES, "list_invites").await?;
        self.invites.list().await
    }

    pub async fn revoke_invite(&self, token: &str) -> Result<()> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "revoke_invite").await?;
        if !self.invites.revoke(token).await? {
            return Err(Error::NotFound("Invite".to_string()));
        }
        info!(
            subsystem = "actions",
            component = "invites",
            op = "revoke_invite",
            user_id = %session.user_id,
            "Invite revoked"
        );
        self.revalidate([INVITES_PAGE]).await;
        Ok(())
    }

    /// Consume an invite at registration time. No session is required.
    ///
    /// Succeeds at most once per token, only before expiry, and only for the
    /// bound email when the invite has one. Returns the consumed invite so
    /// the caller can assign its role.
    pub async fn redeem_invite(&self, token: &str, email: &str) -> Result<Invite> {
        let email = normalize_email(email)?;
        let invite = self
            .invites
            .find(token)
            .await?
            .ok_or_else(|| Error::InviteUnavailable("Unknown invite".to_string()))?;

        if let Some(bound) = &invite.email {
            if !bound.eq_ignore_ascii_case(&email) {
                warn!(
                    subsystem = "actions",
                    component = "invites",
                    op = "redeem_invite",
                    "Invite redeemed with a different email"
                );
                return Err(Error::InviteUnavailable(
                    "Invite is bound to another email".to_string(),
                ));
            }
        }

        let consumed = self
            .invites
            .consume(token, Utc::now())
            .await?
            .ok_or_else(|| Error::InviteUnavailable("Invite expired or already used".to_string()))?;

        info!(
            subsystem = "actions",
            component = "invites",
            op = "redeem_invite",
            role = %consumed.role,
            "Invite redeemed"
        );
        self.revalidate([INVITES_PAGE]).await;
        Ok(consumed)
    }
}
