//! JSON codec and response materialization.
//!
//! The [`JsonCodec`] trait is the pluggable serialization seam: the client
//! uses it to encode request bodies, to parse structured errors during retry
//! classification, and to materialize successful bodies into one of the
//! result shapes. Materialization is a pure function of (bytes, shape):
//! the input bytes are never mutated and the shape is chosen by the caller,
//! never auto-detected.

use crate::shapes::{CopyOrMoveRowResult, EventResult, PaginatedResult};
use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

/// JSON serialization used by the execution core.
///
/// Implementations must be thread safe; one codec instance is shared across
/// all concurrent requests of a client. The shape-specific methods have
/// default implementations in terms of [`JsonCodec::deserialize`] and only
/// need overriding when a custom codec treats a shape specially.
pub trait JsonCodec: Send + Sync + 'static {
    /// Serializes a value to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] when the value cannot be encoded.
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Materializes a single JSON object (the scalar shape).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deserialization`] carrying the raw body when the
    /// bytes are malformed or do not match the target type.
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Materializes a JSON array, preserving source order.
    fn deserialize_list<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<Vec<T>> {
        self.deserialize(bytes)
    }

    /// Materializes a paginated wrapper: data array plus page metadata.
    fn deserialize_paginated<T: DeserializeOwned>(
        &self,
        bytes: &[u8],
    ) -> Result<PaginatedResult<T>> {
        self.deserialize(bytes)
    }

    /// Materializes an object with arbitrary string keys.
    fn deserialize_map(&self, bytes: &[u8]) -> Result<HashMap<String, serde_json::Value>> {
        self.deserialize(bytes)
    }

    /// Materializes a row copy/move result.
    fn deserialize_row_result(&self, bytes: &[u8]) -> Result<CopyOrMoveRowResult> {
        self.deserialize(bytes)
    }

    /// Materializes an event-stream batch with its cursor.
    fn deserialize_event_result<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<EventResult<T>> {
        self.deserialize(bytes)
    }
}

/// The default codec, backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodec;

impl JsonCodec for DefaultCodec {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization {
            raw_body: String::from_utf8_lossy(bytes).into_owned(),
            detail: e.to_string(),
        })
    }
}
