//! Serving-status tracking.
//!
//! [`HealthRegistry`] is the per-process store a backend uses to report its
//! own health, keyed by service name (empty string = overall process
//! health). It exposes the two logical health-check operations: a point-read
//! ([`HealthRegistry::serving_status`]) and a status stream
//! ([`HealthRegistry::watch`]).
//!
//! [`HealthView`] is the read side the load-balancing policy consults: it
//! maps each backend address to that backend's registry and fails open —
//! an address nobody reported on routes as serving, so omitting health
//! integration never stalls routing.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use futures::Stream;
use tokio::sync::watch;

use crate::resolver::Address;

/// Serving status of one service, as reported by its backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServingStatus {
    /// No status has been reported.
    Unknown,
    /// The service is accepting calls.
    Serving,
    /// The service is up but refusing calls.
    NotServing,
    /// The backend does not know the service.
    ServiceUnknown,
}

impl ServingStatus {
    /// Whether the load-balancing policy may route calls to this status.
    ///
    /// Only explicit refusals (`NotServing`, `ServiceUnknown`) exclude an
    /// address; an unreported status routes — health fails open.
    #[must_use]
    pub fn is_routable(self) -> bool {
        !matches!(self, Self::NotServing | Self::ServiceUnknown)
    }
}

impl fmt::Display for ServingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "UNKNOWN",
            Self::Serving => "SERVING",
            Self::NotServing => "NOT_SERVING",
            Self::ServiceUnknown => "SERVICE_UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Per-service serving-status store for one backend process.
///
/// Supports concurrent readers and writers; entries live in memory for the
/// process's lifetime.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    services: RwLock<HashMap<String, watch::Sender<ServingStatus>>>,
}

impl HealthRegistry {
    /// Service name under which overall process health is tracked.
    pub const OVERALL: &'static str = "";

    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service, defaulting its status to [`ServingStatus::Serving`].
    ///
    /// A no-op if the service already has a status.
    pub fn register(&self, service: &str) {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        services
            .entry(service.to_string())
            .or_insert_with(|| watch::channel(ServingStatus::Serving).0);
    }

    /// Records the status for a service, creating the entry if absent.
    ///
    /// Watchers from [`HealthRegistry::watch`] observe the new value.
    pub fn set_serving_status(&self, service: &str, status: ServingStatus) {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        match services.entry(service.to_string()) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                entry.get().send_replace(status);
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(watch::channel(status).0);
            }
        }
    }

    /// The last-set status for a service, or `Unknown` if never set.
    ///
    /// This is the point-read (`Check`) half of the health surface.
    #[must_use]
    pub fn serving_status(&self, service: &str) -> ServingStatus {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        services
            .get(service)
            .map_or(ServingStatus::Unknown, |entry| *entry.borrow())
    }

    /// Streams the service's status: the current value first, then every
    /// subsequent change.
    ///
    /// This is the streaming (`Watch`) half of the health surface. Watching
    /// a service nobody has reported on creates its entry as `Unknown`.
    #[must_use]
    pub fn watch(&self, service: &str) -> impl Stream<Item = ServingStatus> + Send + use<> {
        let receiver = self.subscribe(service);

        futures::stream::unfold((receiver, true), |(mut receiver, first)| async move {
            if first {
                let current = *receiver.borrow_and_update();
                return Some((current, (receiver, false)));
            }

            match receiver.changed().await {
                Ok(()) => {
                    let status = *receiver.borrow_and_update();
                    Some((status, (receiver, false)))
                }
                // Registry dropped; the stream ends.
                Err(_) => None,
            }
        })
    }

    fn subscribe(&self, service: &str) -> watch::Receiver<ServingStatus> {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        services
            .entry(service.to_string())
            .or_insert_with(|| watch::channel(ServingStatus::Unknown).0)
            .subscribe()
    }
}

/// The load-balancing policy's view of backend health: address → registry.
///
/// In-process fleets and tests attach each backend's [`HealthRegistry`]
/// directly; a health-probing transport integration would attach through the
/// same seam. Addresses with no attached registry route as serving.
#[derive(Debug, Default)]
pub struct HealthView {
    backends: RwLock<HashMap<Address, Arc<HealthRegistry>>>,
}

impl HealthView {
    /// Creates a view with no backends attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates an address with its backend's registry.
    pub fn attach(&self, address: Address, registry: Arc<HealthRegistry>) {
        let mut backends = self.backends.write().unwrap_or_else(PoisonError::into_inner);
        backends.insert(address, registry);
    }

    /// Removes an address's registry association.
    pub fn detach(&self, address: &Address) {
        let mut backends = self.backends.write().unwrap_or_else(PoisonError::into_inner);
        backends.remove(address);
    }

    /// The status of `service` at `address`, `Serving` when unattached.
    #[must_use]
    pub fn serving_status(&self, address: &Address, service: &str) -> ServingStatus {
        let backends = self.backends.read().unwrap_or_else(PoisonError::into_inner);
        backends
            .get(address)
            .map_or(ServingStatus::Serving, |registry| {
                registry.serving_status(service)
            })
    }
}
