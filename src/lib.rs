#![deny(missing_docs)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Client-side endpoint discovery and load balancing for [tonic](https://docs.rs/tonic) gRPC.
//!
//! With gRPC (HTTP/2), all requests multiplex over long-lived connections, so
//! reaching a fleet of interchangeable backends needs client-side fan-out:
//! this crate resolves a target descriptor into the current address set,
//! spreads calls across it round-robin, and keeps backends that report
//! themselves unhealthy out of rotation — all behind one logical channel.
//!
//! # Features
//!
//! - **Pluggable resolution**: `static` (fixed comma-separated list) and
//!   `dns` (periodic re-resolution) built in; custom schemes register on a
//!   per-channel [`ResolverRegistry`], never process-wide
//! - **Round-robin distribution**: exact rotation over the healthy subset,
//!   safe under concurrent dispatch
//! - **Health-aware routing**: backends report per-service status through a
//!   [`HealthRegistry`]; unreported addresses fail open and keep routing
//!
//! # Usage
//!
//! ```ignore
//! use tonic_lb_fleet::{ConnectionPolicy, FleetChannel};
//!
//! // One handle for the whole fleet. `static` resolves once at build;
//! // `dns:///backend.internal:50051` would re-resolve every 30s instead.
//! let channel = FleetChannel::connect(
//!     "static:///backend-1:50051,backend-2:50051",
//!     ConnectionPolicy::new("docstore.DocumentStore"),
//! )?;
//!
//! // Each call is dispatched to the next healthy backend.
//! let mut client = DocumentStoreClient::new(channel.subchannel().await?);
//! let reply = client.insert(request).await?;
//! ```

mod balance;
mod channel;
mod config;
mod dns;
mod error;
mod health;
mod refresh;
mod registry;
mod resolver;
mod target;

pub use balance::RoundRobin;
pub use channel::FleetChannel;
pub use config::{
    ConnectionPolicy, DEFAULT_MAX_MESSAGE_BYTES, HealthCheckConfig, LbPolicyConfig,
    RoundRobinPolicy, ServiceConfig,
};
pub use dns::DnsResolver;
pub use error::{BoxError, Error};
pub use health::{HealthRegistry, HealthView, ServingStatus};
pub use refresh::{DEFAULT_REFRESH_INTERVAL, PeriodicResolver};
pub use registry::ResolverRegistry;
pub use resolver::{
    Address, Resolver, ResolverState, StateSender, StaticResolver, state_channel,
};
pub use target::Target;
