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

use crate::config::Credential;
use crate::observability::events;
use tracing::debug;

const COMPONENT: &str = "self_host_auth";

/// Authentication hook for the self-hosted broker.
///
/// Without a credential list every client is accepted. With one, a client is accepted only
/// when it presents a username that exactly matches an entry and a byte-identical password.
///
/// ```
/// use binding_mqtt::{Credential, SelfHostAuthenticator};
///
/// let open = SelfHostAuthenticator::new(None);
/// assert!(open.authenticate(None, b"anything"));
///
/// let closed = SelfHostAuthenticator::new(Some(vec![Credential::new("u1", "p1")]));
/// assert!(closed.authenticate(Some("u1"), b"p1"));
/// assert!(!closed.authenticate(Some("u1"), b"wrong"));
/// assert!(!closed.authenticate(None, b"p1"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SelfHostAuthenticator {
    credentials: Option<Vec<Credential>>,
}

impl SelfHostAuthenticator {
    pub fn new(credentials: Option<Vec<Credential>>) -> Self {
        Self { credentials }
    }

    /// Whether clients must present credentials at all.
    pub fn requires_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn authenticate(&self, username: Option<&str>, password: &[u8]) -> bool {
        let Some(credentials) = self.credentials.as_ref() else {
            return true;
        };

        let allowed = username.is_some_and(|username| {
            credentials.iter().any(|credential| {
                credential.username == username && credential.password.as_bytes() == password
            })
        });

        if !allowed {
            debug!(
                event = events::SELF_HOST_AUTH_DENIED,
                component = COMPONENT,
                username = username.unwrap_or_default(),
                "self-hosted broker rejected client credentials"
            );
        }

        allowed
    }
}
