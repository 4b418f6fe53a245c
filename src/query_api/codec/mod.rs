//! # Value Codec
//!
//! Translation between driver [`Value`](crate::driver::Value)s and the typed
//! JSON [`WireValue`](crate::query_api::wire::WireValue)s of the Query API.
//!
//! - [`encoder`] - parameters going out
//! - [`decoder`] - result rows coming in
//! - [`temporal`] - ISO-8601 dates, times and durations
//! - [`spatial`] - well-known-text points

pub mod decoder;
pub mod encoder;
pub mod spatial;
pub mod temporal;

pub use decoder::Decoder;
pub use encoder::encode;

use crate::driver::error::DriverResult;
use crate::driver::types::Value;
use crate::query_api::wire::WireValue;

/// How wire integers are represented after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegerMode {
    /// `Value::Integer(i64)`; values outside `i64` are rejected.
    #[default]
    Lossless,
    /// `Value::Number(f64)`; exact up to 2^53.
    Number,
    /// `Value::BigInt(i128)`.
    BigInt,
}

/// Decode one value with the given integer representation.
pub fn decode(value: &WireValue, mode: IntegerMode) -> DriverResult<Value> {
    Decoder::new(mode).decode(value)
}
