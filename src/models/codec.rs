//! Scalar property codec
//!
//! Converts the value kinds that have no native wire representation
//! (date/time, decimal, unique identifier) to and from wire primitives.
//! [`WireCodec`] is the default: date/times travel as fractional epoch
//! seconds, decimals as canonical decimal strings and UUIDs as hyphenated
//! strings.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::param::Decimal;
use crate::errors::{OgmError, Result};

/// Per-kind conversion between Rust values and wire primitives.
pub trait PropertyCodec: Send + Sync {
    fn datetime_to_wire(&self, value: &DateTime<Utc>) -> Result<Value>;
    fn datetime_from_wire(&self, value: &Value) -> Result<DateTime<Utc>>;

    fn decimal_to_wire(&self, value: &Decimal) -> Result<Value>;
    fn decimal_from_wire(&self, value: &Value) -> Result<Decimal>;

    fn uuid_to_wire(&self, value: &Uuid) -> Result<Value>;
    fn uuid_from_wire(&self, value: &Value) -> Result<Uuid>;
}

/// Default codec used by the dispatcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct WireCodec;

impl PropertyCodec for WireCodec {
    fn datetime_to_wire(&self, value: &DateTime<Utc>) -> Result<Value> {
        let seconds =
            value.timestamp() as f64 + f64::from(value.timestamp_subsec_micros()) / 1_000_000.0;
        serde_json::Number::from_f64(seconds)
            .map(Value::Number)
            .ok_or_else(|| OgmError::Codec(format!("timestamp {} is not finite", seconds)))
    }

    fn datetime_from_wire(&self, value: &Value) -> Result<DateTime<Utc>> {
        let seconds = value
            .as_f64()
            .ok_or_else(|| OgmError::Codec(format!("expected epoch seconds, got {}", value)))?;
        let floor = seconds.floor();
        // Round to microseconds, the precision the encoder keeps.
        let mut micros = ((seconds - floor) * 1_000_000.0).round() as u32;
        let mut whole = floor as i64;
        if micros >= 1_000_000 {
            whole += 1;
            micros -= 1_000_000;
        }
        DateTime::from_timestamp(whole, micros * 1_000)
            .ok_or_else(|| OgmError::Codec(format!("timestamp {} is out of range", seconds)))
    }

    fn decimal_to_wire(&self, value: &Decimal) -> Result<Value> {
        Ok(Value::String(value.as_str().to_string()))
    }

    fn decimal_from_wire(&self, value: &Value) -> Result<Decimal> {
        match value {
            Value::String(s) => Decimal::parse(s),
            Value::Number(n) => Decimal::parse(&n.to_string()),
            other => Err(OgmError::Codec(format!(
                "expected a decimal string or number, got {}",
                other
            ))),
        }
    }

    fn uuid_to_wire(&self, value: &Uuid) -> Result<Value> {
        Ok(Value::String(value.hyphenated().to_string()))
    }

    fn uuid_from_wire(&self, value: &Value) -> Result<Uuid> {
        let text = value
            .as_str()
            .ok_or_else(|| OgmError::Codec(format!("expected a UUID string, got {}", value)))?;
        Uuid::parse_str(text).map_err(|e| OgmError::Codec(format!("invalid UUID '{}': {}", text, e)))
    }
}
