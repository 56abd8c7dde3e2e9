//! Round-robin call distribution over the resolved, healthy address set.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

use crate::error::Error;
use crate::health::HealthView;
use crate::resolver::{Address, ResolverState};

/// Round-robin selection over the current address set, skipping addresses
/// whose health status refuses traffic.
///
/// The cursor is shared and advanced atomically, so concurrent dispatches
/// each get a distinct slot. Each decision runs against a single consistent
/// snapshot of the address set; when the resolver publishes a new set, the
/// free-running cursor lands on a valid position in it (no selection order
/// is promised across a resolution boundary).
#[derive(Debug)]
pub struct RoundRobin {
    state: watch::Receiver<ResolverState>,
    health: Arc<HealthView>,
    service: String,
    cursor: AtomicUsize,
}

impl RoundRobin {
    /// Binds the policy to a resolver's state channel and a health view.
    ///
    /// `service` is the health-check service name consulted per address.
    #[must_use]
    pub fn new(
        state: watch::Receiver<ResolverState>,
        health: Arc<HealthView>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            state,
            health,
            service: service.into(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Suspends until the resolver has published its first state.
    ///
    /// Returns immediately if a state is already available. A published
    /// error state counts: callers are released to observe the failure
    /// rather than stalled behind it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAvailableEndpoint`] if the resolver went away
    /// before ever publishing.
    pub async fn ready(&self) -> Result<(), Error> {
        if self.state.borrow().is_resolved() {
            return Ok(());
        }

        let mut state = self.state.clone();
        state
            .wait_for(ResolverState::is_resolved)
            .await
            .map(|_| ())
            .map_err(|_| Error::NoAvailableEndpoint)
    }

    /// Selects the address for the next call, advancing the shared cursor.
    ///
    /// Addresses reporting `NOT_SERVING` or `SERVICE_UNKNOWN` for the
    /// configured service are skipped; over a stable set the remaining
    /// addresses are selected in equal proportion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAvailableEndpoint`] when the set is empty or every
    /// address is unhealthy — a transient condition, not fatal.
    pub fn pick(&self) -> Result<Address, Error> {
        // One borrow = one consistent snapshot for this decision.
        let state = self.state.borrow();
        let addresses = state.addresses();

        let live: Vec<usize> = (0..addresses.len())
            .filter(|&i| {
                self.health
                    .serving_status(&addresses[i], &self.service)
                    .is_routable()
            })
            .collect();

        if live.is_empty() {
            return Err(Error::NoAvailableEndpoint);
        }

        let slot = self.cursor.fetch_add(1, Ordering::Relaxed) % live.len();
        Ok(addresses[live[slot]].clone())
    }

    /// The current address set, healthy or not.
    #[must_use]
    pub fn addresses(&self) -> Vec<Address> {
        self.state.borrow().addresses().to_vec()
    }
}
