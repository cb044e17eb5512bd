use tokio::sync::watch;
use uuid::Uuid;

use crate::models::UserRole;

/// The signed-in user as far as the client knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
    pub role: UserRole,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub viewer: Option<Viewer>,
    /// Set when the server rejected the token; cleared by the next sign-in.
    pub sign_in_required: bool,
}

/// Auth context shared by every client component. Construct once and pass
/// around as `Arc<Session>`.
#[derive(Debug)]
pub struct Session {
    state: watch::Sender<SessionState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { state }
    }

    pub fn signed_in(user_id: Uuid, role: UserRole, token: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(user_id, role, token);
        session
    }

    pub fn sign_in(&self, user_id: Uuid, role: UserRole, token: impl Into<String>) {
        self.state.send_replace(SessionState {
            viewer: Some(Viewer {
                user_id,
                role,
                token: token.into(),
            }),
            sign_in_required: false,
        });
    }

    pub fn sign_out(&self) {
        self.state.send_replace(SessionState::default());
    }

    /// Drops the credentials after the server answered 401.
    pub fn invalidate(&self) {
        let was_signed_in = self.state.borrow().viewer.is_some();
        self.state.send_replace(SessionState {
            viewer: None,
            sign_in_required: true,
        });
        if was_signed_in {
            tracing::warn!("session rejected by server, sign-in required");
        }
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().viewer.as_ref().map(|v| v.token.clone())
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.state.borrow().viewer.as_ref().map(|v| v.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().viewer.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.state
            .borrow()
            .viewer
            .as_ref()
            .is_some_and(|v| v.role == UserRole::Admin)
    }

    pub fn sign_in_required(&self) -> bool {
        self.state.borrow().sign_in_required
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidation_flags_sign_in() {
        let session = Session::signed_in(Uuid::new_v4(), UserRole::Admin, "t0k3n");
        let rx = session.subscribe();
        assert!(session.is_admin());
        assert_eq!(session.token().as_deref(), Some("t0k3n"));

        session.invalidate();
        assert!(!session.is_authenticated());
        assert!(session.sign_in_required());
        assert!(rx.borrow().sign_in_required);

        session.sign_in(Uuid::new_v4(), UserRole::User, "fresh");
        assert!(!session.sign_in_required());
        assert!(!session.is_admin());
    }
}
