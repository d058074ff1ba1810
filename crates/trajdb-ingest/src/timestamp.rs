// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timestamp normalization
//!
//! Converts the raw epoch fields found in trajectory exports into an
//! [`EpochInstant`] and renders it as the text form embedded in temporal
//! literals:
//!
//! ```text
//! 2023-11-14T22:13:19.500000+00   (UtcMarker::Offset, MobilityDB)
//! 2023-11-14T22:13:19.500000Z     (UtcMarker::Zulu, QuestDB)
//! ```
//!
//! Precision of the text form is one microsecond. Sub-microsecond nanoseconds
//! are floored so that the text never sorts before an earlier instant.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use thiserror::Error;

const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_MICRO: i64 = 1_000;

/// Largest magnitude (in microseconds) that still fits in i64 nanoseconds.
const MAX_MICROS: f64 = (i64::MAX / NANOS_PER_MICRO) as f64;

/// Timestamp conversion errors (always row-level).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("not a number: {0:?}")]
    InvalidNumber(String),

    #[error("non-finite timestamp: {0}")]
    NonFinite(f64),

    #[error("timestamp out of range")]
    OutOfRange,

    #[error("invalid timestamp text: {0:?}")]
    InvalidText(String),
}

/// UTC marker appended to the text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtcMarker {
    /// `+00`, accepted by PostgreSQL/MobilityDB timestamptz input.
    Offset,
    /// `Z`, ISO 8601 form used by QuestDB.
    Zulu,
}

impl UtcMarker {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offset => "+00",
            Self::Zulu => "Z",
        }
    }
}

/// A point in time, nanoseconds since the Unix epoch (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpochInstant {
    nanos: i64,
}

impl EpochInstant {
    /// Build from split `secs` + `nanos` fields (ROS `header.stamp`).
    pub fn from_secs_nanos(secs: i64, nanos: i64) -> Result<Self, TimestampError> {
        let nanos = secs
            .checked_mul(NANOS_PER_SEC)
            .and_then(|n| n.checked_add(nanos))
            .ok_or(TimestampError::OutOfRange)?;
        Ok(Self { nanos })
    }

    /// Build from floating-point epoch seconds, rounded to the microsecond.
    pub fn from_secs_f64(secs: f64) -> Result<Self, TimestampError> {
        if !secs.is_finite() {
            return Err(TimestampError::NonFinite(secs));
        }
        let micros = (secs * 1e6).round();
        if micros.abs() >= MAX_MICROS {
            return Err(TimestampError::OutOfRange);
        }
        Ok(Self {
            nanos: micros as i64 * NANOS_PER_MICRO,
        })
    }

    /// Parse split seconds/nanoseconds text fields.
    pub fn parse_secs_nanos(secs: &str, nanos: &str) -> Result<Self, TimestampError> {
        Self::from_secs_nanos(parse_integral(secs)?, parse_integral(nanos)?)
    }

    /// Parse a single epoch-seconds text field (`"1699999999.5"`).
    pub fn parse_secs(text: &str) -> Result<Self, TimestampError> {
        let trimmed = text.trim();
        let secs: f64 = trimmed
            .parse()
            .map_err(|_| TimestampError::InvalidNumber(trimmed.to_string()))?;
        Self::from_secs_f64(secs)
    }

    /// Parse the text produced by [`EpochInstant::to_text`] (either marker).
    pub fn parse_text(text: &str) -> Result<Self, TimestampError> {
        let body = text
            .strip_suffix(UtcMarker::Offset.as_str())
            .or_else(|| text.strip_suffix(UtcMarker::Zulu.as_str()))
            .ok_or_else(|| TimestampError::InvalidText(text.to_string()))?;
        let naive = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| TimestampError::InvalidText(text.to_string()))?;
        let micros = naive.and_utc().timestamp_micros();
        micros
            .checked_mul(NANOS_PER_MICRO)
            .map(|nanos| Self { nanos })
            .ok_or(TimestampError::OutOfRange)
    }

    pub fn as_nanos(self) -> i64 {
        self.nanos
    }

    /// Microseconds since the epoch, floored.
    pub fn as_micros(self) -> i64 {
        self.nanos.div_euclid(NANOS_PER_MICRO)
    }

    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / NANOS_PER_SEC as f64
    }

    /// Canonical `YYYY-MM-DDTHH:MM:SS.ffffff` text followed by `marker`.
    pub fn to_text(self, marker: UtcMarker) -> String {
        let datetime: DateTime<Utc> =
            DateTime::<Utc>::UNIX_EPOCH + TimeDelta::microseconds(self.as_micros());
        format!(
            "{}{}",
            datetime.format("%Y-%m-%dT%H:%M:%S%.6f"),
            marker.as_str()
        )
    }
}

/// Parse integer text, tolerating integral float text such as `"10.0"`.
fn parse_integral(text: &str) -> Result<i64, TimestampError> {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    let v: f64 = trimmed
        .parse()
        .map_err(|_| TimestampError::InvalidNumber(trimmed.to_string()))?;
    if !v.is_finite() {
        return Err(TimestampError::NonFinite(v));
    }
    if v.fract() != 0.0 {
        return Err(TimestampError::InvalidNumber(trimmed.to_string()));
    }
    if v.abs() >= i64::MAX as f64 {
        return Err(TimestampError::OutOfRange);
    }
    Ok(v as i64)
}
