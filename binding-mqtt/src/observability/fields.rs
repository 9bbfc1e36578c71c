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

//! Canonical structured field values and value-format helpers.

pub const NONE: &str = "none";
pub const REASON_UNKNOWN_SHAPE: &str = "unknown_topic_shape";
pub const REASON_NOT_CONNECTED: &str = "not_connected";

/// Maximum number of payload bytes rendered into a log field.
pub const PAYLOAD_PREVIEW_MAX_LEN: usize = 64;

pub fn format_optional(value: Option<&str>) -> String {
    value.unwrap_or(NONE).to_string()
}

/// Renders a short, lossy UTF-8 preview of a payload for diagnostics.
pub fn format_payload_preview(payload: &[u8]) -> String {
    let end = payload.len().min(PAYLOAD_PREVIEW_MAX_LEN);
    let preview = String::from_utf8_lossy(&payload[..end]);
    if payload.len() > PAYLOAD_PREVIEW_MAX_LEN {
        format!("{preview}...")
    } else {
        preview.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{format_optional, format_payload_preview, NONE, PAYLOAD_PREVIEW_MAX_LEN};

    #[test]
    fn format_optional_falls_back_when_absent() {
        assert_eq!(format_optional(None), NONE);
        assert_eq!(format_optional(Some("application/json")), "application/json");
    }

    #[test]
    fn format_payload_preview_truncates_long_payloads() {
        let payload = vec![b'a'; PAYLOAD_PREVIEW_MAX_LEN + 10];
        let preview = format_payload_preview(&payload);

        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), PAYLOAD_PREVIEW_MAX_LEN + 3);
    }

    #[test]
    fn format_payload_preview_keeps_short_payloads() {
        assert_eq!(format_payload_preview(b"true"), "true");
    }
}
