//! The logical channel: one caller-facing handle, N live endpoints.
//!
//! [`FleetChannel`] binds a target descriptor to a resolver (via the
//! registry), a round-robin policy, a health view, and transport limits.
//! Stub code asks it for the next call's destination — either the bare
//! [`Address`] or a ready-to-use per-address tonic channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tonic::transport::{Channel, Endpoint};

use crate::balance::RoundRobin;
use crate::config::ConnectionPolicy;
use crate::error::Error;
use crate::health::HealthView;
use crate::registry::ResolverRegistry;
use crate::resolver::{Address, Resolver, state_channel};
use crate::target::Target;

/// A single logical connection fanned out across a fleet of backends.
///
/// Build one per target; clone-free and exclusively owned. Closing (or
/// dropping) the channel closes the resolver and releases any background
/// refresh activity.
#[derive(Debug)]
pub struct FleetChannel {
    target: Target,
    policy: ConnectionPolicy,
    resolver: Box<dyn Resolver>,
    balancer: RoundRobin,
    health: Arc<HealthView>,
    subchannels: Mutex<HashMap<Address, Channel>>,
    closed: AtomicBool,
}

impl FleetChannel {
    /// Builds a channel for `target` using the given resolver registry.
    ///
    /// The registry is only consulted during construction; it does not need
    /// to outlive the channel. Background-resolving schemes (such as `dns`)
    /// require a Tokio runtime to be current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] for a malformed descriptor,
    /// [`Error::UnknownScheme`] when the registry has no builder for the
    /// target's scheme, and any error the resolver build itself raised,
    /// unchanged.
    pub fn build(
        registry: &ResolverRegistry,
        target: &str,
        policy: ConnectionPolicy,
        health: Arc<HealthView>,
    ) -> Result<Self, Error> {
        let target = Target::parse(target)?;
        let (updates, state) = state_channel();
        let resolver = registry.build(&target, updates)?;
        let balancer = RoundRobin::new(state, Arc::clone(&health), policy.health_check_service());

        tracing::debug!(
            "channel ready: target={target} policy={} health_service={:?}",
            policy.lb_policy(),
            policy.health_check_service()
        );

        Ok(Self {
            target,
            policy,
            resolver,
            balancer,
            health,
            subchannels: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Builds a channel with the default scheme set (`static`, `dns`) and a
    /// fresh health view.
    ///
    /// Attach backend registries through [`FleetChannel::health`] if the
    /// policy should see health statuses.
    ///
    /// # Errors
    ///
    /// Same conditions as [`FleetChannel::build`].
    pub fn connect(target: &str, policy: ConnectionPolicy) -> Result<Self, Error> {
        let registry = ResolverRegistry::with_defaults();
        Self::build(&registry, target, policy, Arc::new(HealthView::new()))
    }

    /// Picks the destination address for the next call.
    ///
    /// The first dispatch on a connection whose resolver has not yet
    /// published suspends until the first state arrives (static targets
    /// publish synchronously at build, so only background resolvers can
    /// make a caller wait). Dispatches after the first resolution never
    /// suspend — they succeed or fail immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAvailableEndpoint`] when the channel is closed,
    /// the address set is empty, or every address is unhealthy.
    pub async fn dispatch(&self) -> Result<Address, Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::NoAvailableEndpoint);
        }

        self.balancer.ready().await?;
        self.balancer.pick()
    }

    /// Picks the next destination and returns a lazily-connecting tonic
    /// channel for it.
    ///
    /// Subchannels are cached per address and pruned as resolution drops
    /// addresses from the set; actual connections are established on first
    /// use by the transport.
    ///
    /// # Errors
    ///
    /// Same conditions as [`FleetChannel::dispatch`].
    pub async fn subchannel(&self) -> Result<Channel, Error> {
        let address = self.dispatch().await?;
        self.subchannel_for(&address)
    }

    /// Hints the resolver to refresh its address set now.
    pub fn resolve_now(&self) {
        self.resolver.resolve_now();
    }

    /// The target this channel was built for.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The connection policy this channel was built with.
    #[must_use]
    pub fn policy(&self) -> &ConnectionPolicy {
        &self.policy
    }

    /// The health view consulted by the distribution policy.
    #[must_use]
    pub fn health(&self) -> &Arc<HealthView> {
        &self.health
    }

    /// The currently resolved address set, healthy or not.
    #[must_use]
    pub fn addresses(&self) -> Vec<Address> {
        self.balancer.addresses()
    }

    /// Closes the channel: stops the resolver (exactly once) and drops any
    /// cached subchannels. Later calls are no-ops; later dispatches fail.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.resolver.close();
            self.subchannels
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
            tracing::debug!("channel for {} closed", self.target);
        }
    }

    fn subchannel_for(&self, address: &Address) -> Result<Channel, Error> {
        let current = self.balancer.addresses();
        let mut subchannels = self
            .subchannels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        subchannels.retain(|cached, _| current.contains(cached));

        if let Some(channel) = subchannels.get(address) {
            return Ok(channel.clone());
        }

        let endpoint = Endpoint::from_shared(format!("http://{address}")).map_err(|e| {
            tracing::warn!("resolver produced unusable address {address}: {e}");
            Error::NoAvailableEndpoint
        })?;

        let channel = self.policy.apply_to_endpoint(endpoint).connect_lazy();
        subchannels.insert(address.clone(), channel.clone());
        Ok(channel)
    }
}

impl Drop for FleetChannel {
    fn drop(&mut self) {
        self.close();
    }
}
