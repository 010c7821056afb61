//! Connection state for the remote video account.
//!
//! A [`Session`] is created once per signed-in user and handed to every
//! component that needs the credential. Clones share the same state, so a
//! disconnect triggered by an expired credential in the remote client is
//! immediately visible everywhere else.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::config::TOKEN_EXPIRY_WARNING_SECS;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionStatus {
    Connected,
    /// Connected, but the credential expires inside the warning window.
    Expiring,
    NotConnected,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    connected: bool,
    credential: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Session {
    owner: String,
    state: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            state: Arc::new(RwLock::new(SessionState::default())),
        }
    }

    /// Opaque user identifier supplied by the identity provider.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn connect(&self, credential: impl Into<String>, expires_at: Option<DateTime<Utc>>) {
        let mut state = self.state.write();
        state.connected = true;
        state.credential = Some(credential.into());
        state.expires_at = expires_at;
        log::info!("Video account connected for {}", self.owner);
    }

    pub fn disconnect(&self) {
        let mut state = self.state.write();
        if state.connected {
            log::warn!("Video account disconnected for {}", self.owner);
        }
        *state = SessionState::default();
    }

    pub fn is_connected(&self) -> bool {
        self.status() != ConnectionStatus::NotConnected
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().expires_at
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status_at(Utc::now())
    }

    fn status_at(&self, now: DateTime<Utc>) -> ConnectionStatus {
        let state = self.state.read();
        if !state.connected || state.credential.is_none() {
            return ConnectionStatus::NotConnected;
        }
        match state.expires_at {
            Some(expires) if expires <= now => ConnectionStatus::NotConnected,
            Some(expires) if expires - now <= TimeDelta::seconds(TOKEN_EXPIRY_WARNING_SECS) => {
                ConnectionStatus::Expiring
            }
            _ => ConnectionStatus::Connected,
        }
    }

    /// The bearer credential for a remote call.
    ///
    /// A credential whose expiry has already passed disconnects the session
    /// and reports [`AppError::CredentialExpired`].
    pub fn bearer(&self) -> Result<String, AppError> {
        let now = Utc::now();
        let (credential, expired) = {
            let state = self.state.read();
            if !state.connected {
                return Err(AppError::NotConnected);
            }
            let expired = state.expires_at.is_some_and(|e| e <= now);
            (state.credential.clone(), expired)
        };

        if expired {
            self.disconnect();
            return Err(AppError::CredentialExpired);
        }
        credential.ok_or(AppError::NotConnected)
    }
}
