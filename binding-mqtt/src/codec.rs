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

//! Content codec contract and the default JSON codec.

use crate::resource::DataSchema;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Failures converting between interaction values and wire payloads.
#[derive(Clone, Debug, PartialEq)]
pub enum CodecError {
    UnsupportedMediaType(String),
    SchemaMismatch { expected: String, found: String },
    Malformed(String),
    Stream(String),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::UnsupportedMediaType(media_type) => {
                write!(f, "unsupported media type '{media_type}'")
            }
            CodecError::SchemaMismatch { expected, found } => {
                write!(f, "value of type '{found}' does not match schema type '{expected}'")
            }
            CodecError::Malformed(reason) => write!(f, "malformed content: {reason}"),
            CodecError::Stream(reason) => write!(f, "content stream failed: {reason}"),
        }
    }
}

impl Error for CodecError {}

/// Encoded payload together with its media type.
pub struct Content {
    pub media_type: String,
    pub body: BoxStream<'static, Result<Vec<u8>, CodecError>>,
}

impl Content {
    pub fn from_bytes(media_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            media_type: media_type.to_string(),
            body: stream::iter(vec![Ok(bytes)]).boxed(),
        }
    }

    /// Drains the body stream into one contiguous payload.
    pub async fn read_fully(self) -> Result<Vec<u8>, CodecError> {
        self.body.try_concat().await
    }
}

impl Debug for Content {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Content")
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

pub trait ContentCodec: Send + Sync {
    fn value_to_content(
        &self,
        value: &Value,
        schema: Option<&DataSchema>,
        media_type: &str,
    ) -> Result<Content, CodecError>;

    fn content_to_value(
        &self,
        media_type: &str,
        body: &[u8],
        schema: Option<&DataSchema>,
    ) -> Result<Value, CodecError>;
}

/// Codec for `application/json` (and `+json` suffixes) and `text/plain`.
///
/// Values are checked against the schema's `type` when one is declared.
#[derive(Clone, Debug, Default)]
pub struct JsonCodec;

impl JsonCodec {
    fn essence(media_type: &str) -> String {
        media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    fn is_json(essence: &str) -> bool {
        essence == DEFAULT_CONTENT_TYPE || essence.ends_with("+json")
    }

    fn type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    fn check_schema(value: &Value, schema: Option<&DataSchema>) -> Result<(), CodecError> {
        let Some(expected) = schema.and_then(|s| s.data_type.as_deref()) else {
            return Ok(());
        };
        let found = Self::type_name(value);
        let matches = expected == found || (expected == "number" && found == "integer");
        if matches {
            Ok(())
        } else {
            Err(CodecError::SchemaMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
            })
        }
    }
}

impl ContentCodec for JsonCodec {
    fn value_to_content(
        &self,
        value: &Value,
        schema: Option<&DataSchema>,
        media_type: &str,
    ) -> Result<Content, CodecError> {
        Self::check_schema(value, schema)?;
        let essence = Self::essence(media_type);
        let bytes = if Self::is_json(&essence) {
            serde_json::to_vec(value).map_err(|e| CodecError::Malformed(e.to_string()))?
        } else if essence == TEXT_CONTENT_TYPE {
            match value {
                Value::String(text) => text.clone().into_bytes(),
                other => other.to_string().into_bytes(),
            }
        } else {
            return Err(CodecError::UnsupportedMediaType(media_type.to_string()));
        };
        Ok(Content::from_bytes(media_type, bytes))
    }

    fn content_to_value(
        &self,
        media_type: &str,
        body: &[u8],
        schema: Option<&DataSchema>,
    ) -> Result<Value, CodecError> {
        let essence = Self::essence(media_type);
        let value = if Self::is_json(&essence) {
            serde_json::from_slice(body).map_err(|e| CodecError::Malformed(e.to_string()))?
        } else if essence == TEXT_CONTENT_TYPE {
            Value::String(String::from_utf8_lossy(body).into_owned())
        } else {
            return Err(CodecError::UnsupportedMediaType(media_type.to_string()));
        };
        Self::check_schema(&value, schema)?;
        Ok(value)
    }
}
