//! Permission snapshots and the permission request gate

use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::BridgeError;
use crate::store::HealthStore;
use crate::types::Permission;
use crate::vocabulary::PlatformVocabulary;

/// Canonical permissions granted at the time of a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantedPermissions {
    granted: HashSet<Permission>,
}

impl GrantedPermissions {
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolve native granted identifiers into canonical permissions
    pub fn from_native(vocab: &dyn PlatformVocabulary, identifiers: &[String]) -> Self {
        let keys: HashSet<String> = identifiers
            .iter()
            .map(|id| vocab.grant_key(id).to_string())
            .collect();
        let granted = Permission::ALL
            .into_iter()
            .filter(|permission| vocab.is_granted(*permission, &keys))
            .collect();
        Self { granted }
    }

    /// Ask the store for its current grants
    pub async fn fetch<S: HealthStore + ?Sized>(
        store: &S,
        vocab: &dyn PlatformVocabulary,
    ) -> Result<Self, BridgeError> {
        let identifiers = store
            .granted_permissions()
            .await
            .map_err(|e| BridgeError::native("permissions", e))?;
        Ok(Self::from_native(vocab, &identifiers))
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }
}

/// Status of each requested permission name, keyed as requested.
/// Names that are not permissions are left out.
pub fn permission_status(
    requested: &[String],
    granted: &GrantedPermissions,
) -> BTreeMap<String, bool> {
    requested
        .iter()
        .filter_map(|name| {
            Permission::parse(name).map(|permission| (name.clone(), granted.contains(permission)))
        })
        .collect()
}

/// Single slot for the one permission prompt that may be open at a time.
///
/// A request made while another is still waiting on the user fails with
/// [`BridgeError::PermissionRequestInFlight`] instead of replacing it.
#[derive(Debug, Default)]
pub struct PermissionGate {
    slot: Mutex<()>,
}

impl PermissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.slot.try_lock().is_err()
    }

    pub async fn request<S: HealthStore + ?Sized>(
        &self,
        store: &S,
        vocab: &dyn PlatformVocabulary,
        requested: &[String],
    ) -> Result<BTreeMap<String, bool>, BridgeError> {
        let _slot = self
            .slot
            .try_lock()
            .map_err(|_| BridgeError::PermissionRequestInFlight)?;

        let mut identifiers: Vec<&'static str> = Vec::new();
        for permission in requested.iter().filter_map(|name| Permission::parse(name)) {
            for id in vocab.permission_identifiers(permission) {
                if !identifiers.contains(id) {
                    identifiers.push(id);
                }
            }
        }

        if identifiers.is_empty() {
            debug!("no native identifiers to request");
            return Ok(permission_status(requested, &GrantedPermissions::none()));
        }

        let granted = store
            .request_permissions(&identifiers)
            .await
            .map_err(|e| BridgeError::native("permission request", e))?;
        Ok(permission_status(
            requested,
            &GrantedPermissions::from_native(vocab, &granted),
        ))
    }
}
