//! Role guard run at the top of every action.

use tracing::warn;

use waypoint_core::{Error, Result, Role, Session, SessionProvider};

/// Require a session whose role is in `allowed`.
///
/// No session yields `Unauthorized`; a session with any other role yields
/// `Forbidden`. Callers run this before any store access.
pub async fn authorize(
    sessions: &dyn SessionProvider,
    allowed: &[Role],
    op: &'static str,
) -> Result<Session> {
    let Some(session) = sessions.current().await? else {
        warn!(subsystem = "actions", component = "auth", op, "Rejected: no session");
        return Err(Error::Unauthorized("Authentication required".to_string()));
    };

    if !allowed.contains(&session.role) {
        warn!(
            subsystem = "actions",
            component = "auth",
            op,
            user_id = %session.user_id,
            role = %session.role,
            "Rejected: role not allowed"
        );
        return Err(Error::Forbidden(format!(
            "Role {} may not perform {}",
            session.role, op
        )));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{StaticSession, ALL_ROLES, CURATOR_ROLES};

    #[tokio::test]
    async fn test_no_session_is_unauthorized() {
        let err = authorize(&StaticSession(None), ALL_ROLES, "list_records")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_wrong_role_is_forbidden() {
        let sessions = StaticSession(Some(Session::new("u1", Role::Employee)));
        let err = authorize(&sessions, CURATOR_ROLES, "create_record")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_allowed_role_passes() {
        let sessions = StaticSession(Some(Session::new("u1", Role::Trainer)));
        let session = authorize(&sessions, CURATOR_ROLES, "create_record")
            .await
            .unwrap();
        assert_eq!(session.user_id, "u1");
    }
}
