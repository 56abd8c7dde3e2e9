//! Error taxonomy for channel construction and call dispatch.
//!
//! Build-time failures (`InvalidTarget`, `UnknownScheme`, `ResolverBuild`)
//! are returned to the caller of [`FleetChannel::build`](crate::FleetChannel::build)
//! and never retried internally. `NoAvailableEndpoint` is transient and
//! reported per dispatch; the caller's own retry policy decides what to do
//! with it.

use thiserror::Error;

/// Source type for wrapped resolver construction failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the discovery and load-balancing layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The target descriptor is malformed or its endpoint is empty.
    ///
    /// Fatal at build time; the target will never become valid on its own.
    #[error("invalid target {target:?}: {reason}")]
    InvalidTarget {
        /// The offending descriptor (or endpoint fragment).
        target: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No resolver is registered for the target's scheme.
    ///
    /// Fatal at build time.
    #[error("no resolver registered for scheme {scheme:?}")]
    UnknownScheme {
        /// The unrecognized scheme.
        scheme: String,
    },

    /// A resolver failed to construct for reasons other than target shape.
    ///
    /// Fatal at build time. Wraps the resolver-specific failure.
    #[error("resolver build failed for {target:?}")]
    ResolverBuild {
        /// The descriptor being resolved.
        target: String,
        /// The underlying resolver failure.
        #[source]
        source: BoxError,
    },

    /// Zero healthy addresses were available at dispatch time.
    ///
    /// Transient: the address set may refill on the next resolution or
    /// health transition. Reported per call, never fatal to the channel.
    #[error("no endpoint available for dispatch")]
    NoAvailableEndpoint,
}

impl Error {
    /// Wraps a resolver-specific construction failure.
    ///
    /// Intended for custom resolver builders registered with
    /// [`ResolverRegistry::register`](crate::ResolverRegistry::register)
    /// whose setup can fail for reasons beyond target shape.
    #[must_use]
    pub fn resolver_build(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ResolverBuild {
            target: target.into(),
            source: source.into(),
        }
    }

    pub(crate) fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }
}
