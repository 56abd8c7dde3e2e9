//! Target descriptor parsing.
//!
//! A target names how and where to resolve backend addresses, in the form
//! `scheme:///endpoint`:
//!
//! - `static:///host1:50051,host2:50051` — fixed list, resolved once
//! - `dns:///backend.example.internal:50051` — hostname, re-resolved
//!   periodically
//!
//! Parsing only validates shape; whether the scheme is actually handled is
//! decided at registry lookup time.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

const SCHEME_SEPARATOR: &str = ":///";

/// A parsed target descriptor: resolution scheme plus scheme-specific endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    scheme: String,
    endpoint: String,
}

impl Target {
    /// Parses a `scheme:///endpoint` descriptor.
    ///
    /// The endpoint is trimmed of surrounding whitespace; its internal
    /// structure is left to the scheme's resolver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] when the `:///` separator is missing,
    /// the scheme is empty, or the endpoint is empty after trimming.
    pub fn parse(descriptor: &str) -> Result<Self, Error> {
        let Some((scheme, endpoint)) = descriptor.split_once(SCHEME_SEPARATOR) else {
            return Err(Error::invalid_target(
                descriptor,
                format!("expected `scheme{SCHEME_SEPARATOR}endpoint`"),
            ));
        };

        if scheme.is_empty() {
            return Err(Error::invalid_target(descriptor, "empty scheme"));
        }

        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(Error::invalid_target(descriptor, "empty endpoint"));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            endpoint: endpoint.to_string(),
        })
    }

    /// The resolution scheme, e.g. `static` or `dns`.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The scheme-specific endpoint, e.g. a comma-separated address list.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SCHEME_SEPARATOR}{}", self.scheme, self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_and_endpoint() {
        let target = Target::parse("static:///localhost:50051,localhost:50052").unwrap();

        assert_eq!(target.scheme(), "static");
        assert_eq!(target.endpoint(), "localhost:50051,localhost:50052");
    }

    #[test]
    fn trims_endpoint_whitespace() {
        let target = Target::parse("dns:///  db.internal:50051  ").unwrap();
        assert_eq!(target.endpoint(), "db.internal:50051");
    }

    #[test]
    fn display_round_trips() {
        let descriptor = "dns:///db.internal:50051";
        let target = Target::parse(descriptor).unwrap();
        assert_eq!(target.to_string(), descriptor);
    }

    #[test]
    fn rejects_missing_separator() {
        let err = Target::parse("localhost:50051").unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { .. }));
    }

    #[test]
    fn rejects_empty_scheme() {
        let err = Target::parse(":///localhost:50051").unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { .. }));
    }

    #[test]
    fn rejects_empty_endpoint() {
        let err = Target::parse("static:///").unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { .. }));
    }

    #[test]
    fn rejects_whitespace_endpoint() {
        let err = Target::parse("static:///   ").unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { .. }));
    }

    #[test]
    fn from_str_matches_parse() {
        let target: Target = "static:///a:1".parse().unwrap();
        assert_eq!(target.scheme(), "static");
    }
}
