//! Scheme dispatch for resolver construction.
//!
//! A registry is an explicitly constructed table from scheme name to a
//! resolver builder function — it is passed into channel construction rather
//! than registered process-wide, so two channels can use entirely different
//! resolver sets.

use std::collections::HashMap;

use crate::dns::DnsResolver;
use crate::error::Error;
use crate::refresh::PeriodicResolver;
use crate::resolver::{Resolver, StateSender, StaticResolver};
use crate::target::Target;

/// Builder function for one scheme: target + state channel in, resolver out.
type BuildFn = dyn Fn(&Target, StateSender) -> Result<Box<dyn Resolver>, Error> + Send + Sync;

/// Maps target schemes to the resolver builders that handle them.
#[derive(Default)]
pub struct ResolverRegistry {
    schemes: HashMap<String, Box<BuildFn>>,
}

impl ResolverRegistry {
    /// Creates an empty registry with no schemes registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in schemes:
    ///
    /// - `static` — comma-separated `host:port` list, resolved once
    /// - `dns` — single `hostname:port`, re-resolved every 30 seconds
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register("static", |target, updates| {
            let resolver = StaticResolver::new(target, updates)?;
            Ok(Box::new(resolver) as Box<dyn Resolver>)
        });

        registry.register("dns", |target, updates| {
            let inner = DnsResolver::new(target, updates)?;
            Ok(Box::new(PeriodicResolver::with_default_interval(inner)) as Box<dyn Resolver>)
        });

        registry
    }

    /// Registers (or replaces) the builder for a scheme.
    pub fn register<F>(&mut self, scheme: impl Into<String>, build: F)
    where
        F: Fn(&Target, StateSender) -> Result<Box<dyn Resolver>, Error> + Send + Sync + 'static,
    {
        self.schemes.insert(scheme.into(), Box::new(build));
    }

    /// Whether a builder is registered for `scheme`.
    #[must_use]
    pub fn contains(&self, scheme: &str) -> bool {
        self.schemes.contains_key(scheme)
    }

    /// Builds a resolver for the target by dispatching on its scheme.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownScheme`] when no builder is registered for the
    /// target's scheme; builder failures are propagated unchanged.
    pub fn build(&self, target: &Target, updates: StateSender) -> Result<Box<dyn Resolver>, Error> {
        let Some(build) = self.schemes.get(target.scheme()) else {
            return Err(Error::UnknownScheme {
                scheme: target.scheme().to_string(),
            });
        };

        build(target, updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::state_channel;

    #[test]
    fn defaults_cover_static_and_dns() {
        let registry = ResolverRegistry::with_defaults();

        assert!(registry.contains("static"));
        assert!(registry.contains("dns"));
        assert!(!registry.contains("bogus"));
    }

    #[test]
    fn builds_static_resolver() {
        let registry = ResolverRegistry::with_defaults();
        let target = Target::parse("static:///a:1,b:2").unwrap();
        let (tx, rx) = state_channel();

        let _resolver = registry.build(&target, tx).unwrap();

        assert_eq!(rx.borrow().addresses().len(), 2);
    }

    #[tokio::test]
    async fn builds_dns_resolver() {
        let registry = ResolverRegistry::with_defaults();
        let target = Target::parse("dns:///localhost:50051").unwrap();
        let (tx, _rx) = state_channel();

        let resolver = registry.build(&target, tx).unwrap();
        resolver.close();
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let registry = ResolverRegistry::with_defaults();
        let target = Target::parse("bogus:///a:1").unwrap();
        let (tx, _rx) = state_channel();

        let err = registry.build(&target, tx).unwrap_err();
        assert!(matches!(err, Error::UnknownScheme { scheme } if scheme == "bogus"));
    }

    #[test]
    fn custom_scheme_can_be_registered() {
        let mut registry = ResolverRegistry::new();
        registry.register("fixed", |target, updates| {
            let resolver = StaticResolver::new(target, updates)?;
            Ok(Box::new(resolver) as Box<dyn Resolver>)
        });

        let target = Target::parse("fixed:///a:1").unwrap();
        let (tx, rx) = state_channel();
        let _resolver = registry.build(&target, tx).unwrap();

        assert_eq!(rx.borrow().addresses().len(), 1);
    }

    #[test]
    fn builder_errors_propagate_unchanged() {
        let mut registry = ResolverRegistry::new();
        registry.register("flaky", |target, _updates| {
            Err(Error::resolver_build(
                target.to_string(),
                std::io::Error::other("discovery backend unreachable"),
            ))
        });

        let target = Target::parse("flaky:///a:1").unwrap();
        let (tx, _rx) = state_channel();

        let err = registry.build(&target, tx).unwrap_err();
        assert!(matches!(err, Error::ResolverBuild { .. }));
    }
}
