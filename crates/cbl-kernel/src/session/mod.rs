use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::GateError;
use crate::types::Role;

/// The session-scoped tag for the current actor.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleMarker {
    pub role: Role,
    pub identity: String,
    pub established_at: DateTime<Utc>,
}

/// Pluggable operator credential check.
///
/// The gate never sees or stores a plaintext secret; it only asks a verifier
/// whether the presented one is acceptable.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, secret: &str) -> bool;
}

/// Verifier holding a SHA-256 digest of the shared secret.
pub struct DigestVerifier {
    digest: [u8; 32],
}

impl DigestVerifier {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            digest: digest_of(secret),
        }
    }
}

impl CredentialVerifier for DigestVerifier {
    fn verify(&self, secret: &str) -> bool {
        digest_of(secret) == self.digest
    }
}

/// Verifier that rejects everything; the safe default until an instance is
/// configured with a real one.
pub struct RejectAll;

impl CredentialVerifier for RejectAll {
    fn verify(&self, _secret: &str) -> bool {
        false
    }
}

fn digest_of(secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

/// Tab-lifetime role gate.
///
/// Holds at most one marker for the process lifetime of the owning handle;
/// never persisted to the backing store. `require` is the only contract the
/// rest of the kernel relies on: deny on absence, deny on mismatch.
pub struct SessionGate {
    current: RwLock<Option<RoleMarker>>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl SessionGate {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            current: RwLock::new(None),
            verifier,
        }
    }

    /// Store a role marker, replacing any existing one.
    pub fn establish(&self, role: Role, identity: impl Into<String>) -> RoleMarker {
        let marker = RoleMarker {
            role,
            identity: identity.into(),
            established_at: Utc::now(),
        };
        debug!(role = %marker.role, identity = %marker.identity, "session established");
        *self.current.write() = Some(marker.clone());
        marker
    }

    /// Establish an operator session after credential verification.
    pub fn establish_operator(
        &self,
        identity: impl Into<String>,
        secret: &str,
    ) -> Result<RoleMarker, GateError> {
        if !self.verifier.verify(secret) {
            return Err(GateError::CredentialsRejected);
        }
        Ok(self.establish(Role::Operator, identity))
    }

    pub fn current(&self) -> Option<RoleMarker> {
        self.current.read().clone()
    }

    /// Return the marker if it satisfies `role`, otherwise deny.
    pub fn require(&self, role: Role) -> Result<RoleMarker, GateError> {
        let marker = self.current().ok_or(GateError::Unauthenticated)?;
        if marker.role != role {
            return Err(GateError::Forbidden {
                required: role,
                actual: marker.role,
            });
        }
        Ok(marker)
    }

    /// Clear the marker.
    pub fn sign_out(&self) {
        *self.current.write() = None;
    }
}
