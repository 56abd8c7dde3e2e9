//! Name resolution: the resolver contract, resolved-state publication, and
//! the static list resolver.
//!
//! A resolver turns a [`Target`] into the current set of backend addresses
//! and publishes it through a single-slot, latest-wins channel. Each publish
//! fully replaces the previous set; consumers always observe a complete
//! snapshot, never a partial update.

use std::fmt;

use tokio::sync::watch;

use crate::error::Error;
use crate::target::Target;

/// An opaque backend network location, conventionally `host:port`.
///
/// Addresses compare by string value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Creates an address from its `host:port` form.
    #[must_use]
    pub fn new(host_port: impl Into<String>) -> Self {
        Self(host_port.into())
    }

    /// The address as a `host:port` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(host_port: &str) -> Self {
        Self::new(host_port)
    }
}

impl From<String> for Address {
    fn from(host_port: String) -> Self {
        Self(host_port)
    }
}

/// A resolver's last-known address set plus an optional resolution error.
///
/// The initial state is unresolved; it becomes resolved on the first publish
/// (including a failed one, so callers blocked on the first resolution are
/// released rather than stalled behind a bad name).
#[derive(Clone, Debug, Default)]
pub struct ResolverState {
    addresses: Vec<Address>,
    error: Option<String>,
    resolved: bool,
}

impl ResolverState {
    /// The current address set, in resolution order.
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// The most recent resolution error, if the last attempt failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether any resolution has been published yet.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

/// Write half of the resolved-state channel, held by a resolver.
///
/// Publishing swaps the whole snapshot atomically; readers either see the
/// previous state or the new one.
#[derive(Debug)]
pub struct StateSender {
    tx: watch::Sender<ResolverState>,
}

impl StateSender {
    /// Publishes a fresh address set, replacing the previous one wholesale
    /// and clearing any recorded error.
    pub fn publish(&self, addresses: Vec<Address>) {
        self.tx.send_modify(|state| {
            state.addresses = addresses;
            state.error = None;
            state.resolved = true;
        });
    }

    /// Records a resolution failure while keeping the last-known address set.
    pub fn publish_error(&self, error: impl fmt::Display) {
        self.tx.send_modify(|state| {
            state.error = Some(error.to_string());
            state.resolved = true;
        });
    }
}

/// Creates the state channel pair shared by a resolver and its consumer.
#[must_use]
pub fn state_channel() -> (StateSender, watch::Receiver<ResolverState>) {
    let (tx, rx) = watch::channel(ResolverState::default());
    (StateSender { tx }, rx)
}

/// A source of backend addresses for one target.
///
/// Resolvers publish through a [`StateSender`] handed to them at build time.
/// Both operations must be cheap and non-blocking.
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Hints the resolver to refresh its address set soon.
    ///
    /// May be a no-op for resolvers with a fixed set, and must be a no-op
    /// after [`close`](Resolver::close).
    fn resolve_now(&self);

    /// Stops any background activity and releases resources.
    ///
    /// Must be idempotent and safe to call concurrently; second and later
    /// calls are no-ops.
    fn close(&self);
}

/// Resolves a fixed, comma-separated `host:port` list once, at build time.
///
/// Intended for local development and docker-compose setups where there is
/// no discovery system to ask. The address set is published synchronously
/// during construction and never changes.
#[derive(Debug)]
pub struct StaticResolver {
    // Keeps the state channel open for the consumer's lifetime.
    _updates: StateSender,
}

impl StaticResolver {
    /// Builds the resolver and synchronously publishes the parsed list.
    ///
    /// Entries are trimmed; empty entries are dropped; order and duplicates
    /// are preserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] when no entries survive trimming.
    pub fn new(target: &Target, updates: StateSender) -> Result<Self, Error> {
        let addresses = split_address_list(target.endpoint());
        if addresses.is_empty() {
            return Err(Error::invalid_target(
                target.to_string(),
                "no addresses in endpoint list",
            ));
        }

        tracing::debug!("static resolver: {} endpoints for {target}", addresses.len());
        updates.publish(addresses);

        Ok(Self { _updates: updates })
    }
}

impl Resolver for StaticResolver {
    fn resolve_now(&self) {}

    fn close(&self) {}
}

/// Splits a comma-separated address list into trimmed, non-empty entries.
fn split_address_list(endpoint: &str) -> Vec<Address> {
    endpoint
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(Address::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_static(descriptor: &str) -> Result<(StaticResolver, watch::Receiver<ResolverState>), Error> {
        let target = Target::parse(descriptor)?;
        let (tx, rx) = state_channel();
        let resolver = StaticResolver::new(&target, tx)?;
        Ok((resolver, rx))
    }

    // Address tests

    #[test]
    fn address_equality_by_value() {
        assert_eq!(Address::new("db:50051"), Address::from("db:50051"));
        assert_ne!(Address::new("db:50051"), Address::new("db:50052"));
    }

    #[test]
    fn address_displays_host_port() {
        assert_eq!(Address::new("db:50051").to_string(), "db:50051");
    }

    // ResolverState tests

    #[test]
    fn initial_state_is_unresolved() {
        let (_tx, rx) = state_channel();
        let state = rx.borrow();

        assert!(!state.is_resolved());
        assert!(state.addresses().is_empty());
        assert!(state.error().is_none());
    }

    #[test]
    fn publish_replaces_previous_set_wholesale() {
        let (tx, rx) = state_channel();

        tx.publish(vec![Address::new("a:1")]);
        tx.publish(vec![Address::new("b:2"), Address::new("c:3")]);

        let state = rx.borrow();
        assert_eq!(state.addresses(), [Address::new("b:2"), Address::new("c:3")]);
    }

    #[test]
    fn publish_error_keeps_last_known_addresses() {
        let (tx, rx) = state_channel();

        tx.publish(vec![Address::new("a:1")]);
        tx.publish_error("lookup timed out");

        let state = rx.borrow();
        assert_eq!(state.addresses(), [Address::new("a:1")]);
        assert_eq!(state.error(), Some("lookup timed out"));
        assert!(state.is_resolved());
    }

    #[test]
    fn publish_clears_previous_error() {
        let (tx, rx) = state_channel();

        tx.publish_error("lookup timed out");
        tx.publish(vec![Address::new("a:1")]);

        assert!(rx.borrow().error().is_none());
    }

    // StaticResolver tests

    #[test]
    fn publishes_entries_in_order_synchronously() {
        let (_resolver, rx) = build_static("static:///a:1,b:2,c:3").unwrap();

        let state = rx.borrow();
        assert!(state.is_resolved());
        assert_eq!(
            state.addresses(),
            [Address::new("a:1"), Address::new("b:2"), Address::new("c:3")]
        );
    }

    #[test]
    fn trims_whitespace_around_entries() {
        let (_resolver, rx) = build_static("static:/// a:1 ,  b:2 ").unwrap();

        let state = rx.borrow();
        assert_eq!(state.addresses(), [Address::new("a:1"), Address::new("b:2")]);
    }

    #[test]
    fn drops_empty_entries() {
        let (_resolver, rx) = build_static("static:///a:1,,b:2,").unwrap();

        let state = rx.borrow();
        assert_eq!(state.addresses(), [Address::new("a:1"), Address::new("b:2")]);
    }

    #[test]
    fn preserves_duplicate_entries() {
        let (_resolver, rx) = build_static("static:///a:1,a:1").unwrap();

        let state = rx.borrow();
        assert_eq!(state.addresses(), [Address::new("a:1"), Address::new("a:1")]);
    }

    #[test]
    fn fails_when_no_entries_survive_trimming() {
        let err = build_static("static:///,, ,").unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { .. }));
    }

    #[test]
    fn empty_endpoint_fails_at_target_parse() {
        assert!(matches!(
            Target::parse("static:///").unwrap_err(),
            Error::InvalidTarget { .. }
        ));
        assert!(matches!(
            Target::parse("static:///   ").unwrap_err(),
            Error::InvalidTarget { .. }
        ));
    }

    #[test]
    fn resolve_now_is_a_no_op() {
        let (resolver, rx) = build_static("static:///a:1").unwrap();

        resolver.resolve_now();

        assert_eq!(rx.borrow().addresses(), [Address::new("a:1")]);
    }

    #[test]
    fn close_twice_is_safe() {
        let (resolver, _rx) = build_static("static:///a:1").unwrap();

        resolver.close();
        resolver.close();
    }

    #[test]
    fn split_handles_single_entry() {
        assert_eq!(split_address_list("a:1"), [Address::new("a:1")]);
    }
}
