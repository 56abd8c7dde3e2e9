//! Connection policy and the load-balancing service-config document.
//!
//! [`ConnectionPolicy`] carries everything a channel needs beyond its
//! target: the health-check service name, message-size limits, and keepalive
//! cadence. [`ServiceConfig`] is the serialized form of the distribution
//! policy, compatible with the gRPC service-config document:
//!
//! ```json
//! {"loadBalancingConfig":[{"round_robin":{}}],"healthCheckConfig":{"serviceName":"..."}}
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tonic::transport::Endpoint;

/// Default cap on message size in either direction (16 MiB, sized for bulk
/// payloads).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fallback document if the full config ever fails to serialize.
const MINIMAL_SERVICE_CONFIG: &str = r#"{"loadBalancingConfig":[{"round_robin":{}}]}"#;

/// Distribution policy, health binding, and transport limits for one
/// channel. Immutable once the channel is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionPolicy {
    health_check_service: String,
    max_message_bytes: usize,
    keepalive_interval: Duration,
    keepalive_timeout: Duration,
    permit_idle_pings: bool,
    connect_timeout: Duration,
}

impl ConnectionPolicy {
    /// Creates a policy bound to a health-check service name, with default
    /// limits (16 MiB messages, 30s keepalive pings answered within 10s,
    /// pings permitted while idle).
    #[must_use]
    pub fn new(health_check_service: impl Into<String>) -> Self {
        Self {
            health_check_service: health_check_service.into(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            keepalive_timeout: DEFAULT_KEEPALIVE_TIMEOUT,
            permit_idle_pings: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Caps message size in both directions.
    #[must_use]
    pub fn max_message_bytes(mut self, bytes: usize) -> Self {
        self.max_message_bytes = bytes;
        self
    }

    /// Sets the HTTP/2 keepalive ping interval.
    #[must_use]
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Sets how long to wait for a keepalive ping acknowledgement.
    #[must_use]
    pub fn keepalive_timeout(mut self, timeout: Duration) -> Self {
        self.keepalive_timeout = timeout;
        self
    }

    /// Whether to keep pinging a connection that has no active calls.
    #[must_use]
    pub fn permit_idle_pings(mut self, permit: bool) -> Self {
        self.permit_idle_pings = permit;
        self
    }

    /// Sets the per-endpoint connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The service name the policy consults for per-address health.
    #[must_use]
    pub fn health_check_service(&self) -> &str {
        &self.health_check_service
    }

    /// The name of the distribution policy. Always `round_robin`.
    #[must_use]
    pub fn lb_policy(&self) -> &'static str {
        "round_robin"
    }

    /// The configured message-size cap in bytes.
    ///
    /// Generated clients apply this through their encoding/decoding
    /// message-size limits.
    #[must_use]
    pub fn max_message_bytes_limit(&self) -> usize {
        self.max_message_bytes
    }

    /// The structured service-config document for this policy.
    #[must_use]
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            load_balancing_config: vec![LbPolicyConfig {
                round_robin: Some(RoundRobinPolicy {}),
            }],
            health_check_config: HealthCheckConfig {
                service_name: self.health_check_service.clone(),
            },
        }
    }

    /// The service-config document serialized as JSON.
    ///
    /// Falls back to a minimal round-robin-only document in the (never
    /// expected) event serialization fails.
    #[must_use]
    pub fn service_config_json(&self) -> String {
        serde_json::to_string(&self.service_config())
            .unwrap_or_else(|_| MINIMAL_SERVICE_CONFIG.to_string())
    }

    /// Applies keepalive cadence and connect timeout to a tonic endpoint.
    #[must_use]
    pub fn apply_to_endpoint(&self, endpoint: Endpoint) -> Endpoint {
        endpoint
            .connect_timeout(self.connect_timeout)
            .http2_keep_alive_interval(self.keepalive_interval)
            .keep_alive_timeout(self.keepalive_timeout)
            .keep_alive_while_idle(self.permit_idle_pings)
    }
}

impl Default for ConnectionPolicy {
    /// A policy with default limits and overall-health checking (empty
    /// service name).
    fn default() -> Self {
        Self::new("")
    }
}

/// Serialized distribution-policy document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Candidate load-balancing policies, first supported one wins.
    #[serde(rename = "loadBalancingConfig")]
    pub load_balancing_config: Vec<LbPolicyConfig>,
    /// Which service name health checking probes.
    #[serde(rename = "healthCheckConfig")]
    pub health_check_config: HealthCheckConfig,
}

/// One candidate load-balancing policy entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbPolicyConfig {
    /// Round-robin configuration, present when that policy is requested.
    #[serde(rename = "round_robin", skip_serializing_if = "Option::is_none")]
    pub round_robin: Option<RoundRobinPolicy>,
}

/// Round-robin has no tunables; it serializes as an empty object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRobinPolicy {}

/// Health-checking section of the service config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// The service name whose status gates routing.
    #[serde(rename = "serviceName")]
    pub service_name: String,
}
