/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use std::error::Error;
use std::fmt::{Display, Formatter};
use url::Url;

pub const DEFAULT_SCHEME: &str = "mqtt";
pub const DEFAULT_PORT: u16 = 1883;

/// Failures resolving a configured broker URI.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerUriError {
    Invalid { uri: String, reason: String },
    UnsupportedScheme(String),
    MissingHost(String),
}

impl Display for BrokerUriError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerUriError::Invalid { uri, reason } => {
                write!(f, "invalid broker uri '{uri}': {reason}")
            }
            BrokerUriError::UnsupportedScheme(scheme) => {
                write!(f, "unsupported broker uri scheme '{scheme}'")
            }
            BrokerUriError::MissingHost(uri) => write!(f, "broker uri '{uri}' has no host"),
        }
    }
}

impl Error for BrokerUriError {}

/// A resolved broker URI.
///
/// A URI without a scheme is prefixed with `mqtt://`. `mqtt` and `tcp` are plain
/// connections, `mqtts` and `ssl` use TLS. The port defaults to 1883.
///
/// ```
/// use binding_mqtt::BrokerUri;
///
/// let uri = BrokerUri::parse("broker.example.org").unwrap();
/// assert_eq!(uri.as_str(), "mqtt://broker.example.org");
/// assert_eq!(uri.host(), "broker.example.org");
/// assert_eq!(uri.port(), 1883);
/// assert!(!uri.is_tls());
///
/// let secure = BrokerUri::parse("mqtts://broker.example.org:8883").unwrap();
/// assert_eq!(secure.port(), 8883);
/// assert!(secure.is_tls());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerUri {
    uri: String,
    host: String,
    port: u16,
    tls: bool,
}

impl BrokerUri {
    pub fn parse(configured: &str) -> Result<Self, BrokerUriError> {
        let uri = if configured.contains("://") {
            configured.to_string()
        } else {
            format!("{DEFAULT_SCHEME}://{configured}")
        };

        let parsed = Url::parse(&uri).map_err(|e| BrokerUriError::Invalid {
            uri: uri.clone(),
            reason: e.to_string(),
        })?;

        let tls = match parsed.scheme() {
            "mqtt" | "tcp" => false,
            "mqtts" | "ssl" => true,
            other => return Err(BrokerUriError::UnsupportedScheme(other.to_string())),
        };

        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| BrokerUriError::MissingHost(uri.clone()))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        // non-special schemes never report a default port
        let port = parsed.port().filter(|port| *port > 0).unwrap_or(DEFAULT_PORT);

        Ok(Self {
            uri,
            host,
            port,
            tls,
        })
    }

    /// The URI as used in form hrefs, scheme included.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }
}

impl Display for BrokerUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::{BrokerUri, BrokerUriError, DEFAULT_PORT};

    #[test]
    fn missing_scheme_is_prefixed() {
        let uri = BrokerUri::parse("localhost:1884").unwrap();

        assert_eq!(uri.as_str(), "mqtt://localhost:1884");
        assert_eq!(uri.host(), "localhost");
        assert_eq!(uri.port(), 1884);
    }

    #[test]
    fn port_defaults_when_absent() {
        let uri = BrokerUri::parse("mqtt://test.mosquitto.org").unwrap();

        assert_eq!(uri.port(), DEFAULT_PORT);
        assert_eq!(uri.to_string(), "mqtt://test.mosquitto.org");
    }

    #[test]
    fn tls_schemes_are_recognized() {
        assert!(BrokerUri::parse("ssl://broker:8883").unwrap().is_tls());
        assert!(!BrokerUri::parse("tcp://broker").unwrap().is_tls());
    }

    #[test]
    fn ipv6_hosts_lose_their_brackets() {
        let uri = BrokerUri::parse("mqtt://[::1]:1885").unwrap();

        assert_eq!(uri.host(), "::1");
        assert_eq!(uri.port(), 1885);
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        assert_eq!(
            BrokerUri::parse("http://broker"),
            Err(BrokerUriError::UnsupportedScheme("http".to_string()))
        );
    }

    #[test]
    fn missing_host_is_rejected() {
        assert!(matches!(
            BrokerUri::parse("mqtt://:1883"),
            Err(BrokerUriError::Invalid { .. }) | Err(BrokerUriError::MissingHost(_))
        ));
    }
}
