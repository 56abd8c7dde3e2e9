//! DNS-backed resolution for a single `hostname:port` endpoint.
//!
//! In Kubernetes, a headless service name resolves to individual pod IPs;
//! re-running the lookup discovers the current set as pods come and go. This
//! module performs the lookups on a background task; scheduling lives in the
//! periodic wrapper ([`PeriodicResolver`](crate::PeriodicResolver)).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Notify, watch};

use crate::error::Error;
use crate::resolver::{Address, Resolver, StateSender};
use crate::target::Target;

/// Resolves one hostname to its current address set via the system resolver.
///
/// An initial lookup runs immediately on build; [`Resolver::resolve_now`]
/// kicks a fresh one. Lookup failures keep the last-known address set and
/// record the error. One resolution's output is sorted and deduplicated so
/// it is deterministic for a given lookup result.
#[derive(Debug)]
pub struct DnsResolver {
    kick: Arc<Notify>,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl DnsResolver {
    /// Builds the resolver and starts its lookup task.
    ///
    /// Must be called from within a Tokio runtime. The first lookup runs in
    /// the background; consumers observe it through the state channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] when the endpoint is not of the form
    /// `hostname:port`.
    pub fn new(target: &Target, updates: StateSender) -> Result<Self, Error> {
        let endpoint = validated_endpoint(target)?;

        let kick = Arc::new(Notify::new());
        let (shutdown, shutdown_rx) = watch::channel(false);

        tokio::spawn(lookup_loop(endpoint, updates, Arc::clone(&kick), shutdown_rx));

        Ok(Self {
            kick,
            closed: AtomicBool::new(false),
            shutdown,
        })
    }
}

impl Resolver for DnsResolver {
    fn resolve_now(&self) {
        if !self.closed.load(Ordering::SeqCst) {
            self.kick.notify_one();
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.shutdown.send(true);
        }
    }
}

/// Checks that the endpoint looks like `hostname:port` with a numeric port.
fn validated_endpoint(target: &Target) -> Result<String, Error> {
    let endpoint = target.endpoint();
    let well_formed = endpoint
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());

    if well_formed {
        Ok(endpoint.to_string())
    } else {
        Err(Error::invalid_target(
            target.to_string(),
            "expected `hostname:port`",
        ))
    }
}

/// Background task: one lookup per kick, first one immediately.
async fn lookup_loop(
    endpoint: String,
    updates: StateSender,
    kick: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        match tokio::net::lookup_host(endpoint.as_str()).await {
            Ok(resolved) => {
                let mut addresses: Vec<Address> =
                    resolved.map(|addr| Address::new(addr.to_string())).collect();
                addresses.sort();
                addresses.dedup();

                tracing::debug!("dns resolver: {} addresses for {endpoint}", addresses.len());
                updates.publish(addresses);
            }

            Err(e) => {
                tracing::warn!("dns resolver: lookup for {endpoint} failed: {e}");
                updates.publish_error(e);
            }
        }

        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            () = kick.notified() => {}
        }
    }

    tracing::debug!("dns resolver for {endpoint} closed");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::resolver::{ResolverState, state_channel};

    async fn wait_resolved(rx: &mut watch::Receiver<ResolverState>) -> ResolverState {
        tokio::time::timeout(Duration::from_secs(10), rx.wait_for(ResolverState::is_resolved))
            .await
            .expect("resolution within timeout")
            .expect("state channel open")
            .clone()
    }

    #[test]
    fn rejects_endpoint_without_port() {
        let target = Target::parse("dns:///db.internal").unwrap();
        assert!(matches!(
            validated_endpoint(&target).unwrap_err(),
            Error::InvalidTarget { .. }
        ));
    }

    #[test]
    fn rejects_endpoint_with_non_numeric_port() {
        let target = Target::parse("dns:///db.internal:grpc").unwrap();
        assert!(validated_endpoint(&target).is_err());
    }

    #[test]
    fn accepts_ipv6_literal_with_port() {
        let target = Target::parse("dns:///[::1]:50051").unwrap();
        assert_eq!(validated_endpoint(&target).unwrap(), "[::1]:50051");
    }

    #[tokio::test]
    async fn resolves_localhost_on_build() {
        let target = Target::parse("dns:///localhost:50051").unwrap();
        let (tx, mut rx) = state_channel();
        let resolver = DnsResolver::new(&target, tx).unwrap();

        let state = wait_resolved(&mut rx).await;
        assert!(!state.addresses().is_empty());
        assert!(
            state
                .addresses()
                .iter()
                .all(|addr| addr.as_str().ends_with(":50051"))
        );

        resolver.close();
    }

    #[tokio::test]
    async fn lookup_failure_publishes_error() {
        // `.invalid` is reserved and never resolves.
        let target = Target::parse("dns:///backend.invalid:50051").unwrap();
        let (tx, mut rx) = state_channel();
        let resolver = DnsResolver::new(&target, tx).unwrap();

        let state = wait_resolved(&mut rx).await;
        assert!(state.error().is_some());
        assert!(state.addresses().is_empty());

        resolver.close();
    }

    #[tokio::test]
    async fn close_stops_the_lookup_task() {
        let target = Target::parse("dns:///localhost:50051").unwrap();
        let (tx, mut rx) = state_channel();
        let resolver = DnsResolver::new(&target, tx).unwrap();

        wait_resolved(&mut rx).await;
        resolver.close();

        // The task drops its sender on exit; observe the channel closing.
        tokio::time::timeout(Duration::from_secs(5), async {
            while rx.changed().await.is_ok() {}
        })
        .await
        .expect("lookup task stopped after close");
    }

    #[tokio::test]
    async fn close_twice_is_safe() {
        let target = Target::parse("dns:///localhost:50051").unwrap();
        let (tx, _rx) = state_channel();
        let resolver = DnsResolver::new(&target, tx).unwrap();

        resolver.close();
        resolver.close();
    }

    #[tokio::test]
    async fn resolve_now_after_close_is_a_no_op() {
        let target = Target::parse("dns:///localhost:50051").unwrap();
        let (tx, _rx) = state_channel();
        let resolver = DnsResolver::new(&target, tx).unwrap();

        resolver.close();
        resolver.resolve_now();
    }
}
