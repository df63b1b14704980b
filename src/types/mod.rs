// src/types/mod.rs

//! Value variants and the per-family command implementations.
//!
//! Each submodule adds one command family to [`crate::store::Store`]:
//! - `string`: GET / SET and friends, counters, ranges
//! - `hash`: HSET / HGET / HGETALL ...
//! - `list`: LPUSH / RPUSH / LRANGE / LREM / LINSERT ...

pub mod hash;
pub mod list;
pub mod string;

use std::collections::VecDeque;

pub use hash::MapValue;
pub use list::ListPosition;
pub use string::{SetCondition, SetExpiration, SetOptions};

/// Renders a float the way the float counters store and reply with it: at most
/// 15 significant digits (the precision an `f64` round-trips through decimal),
/// no exponent, trailing zeros trimmed. `0.1 + 0.2` renders as `0.3`.
pub fn format_float(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let magnitude = v.abs().log10().floor() as i32;
    let decimals = usize::try_from(14 - magnitude).unwrap_or(0);
    let mut s = format!("{:.*}", decimals, v);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// The value bound to a key. A key holds exactly one variant at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    List(VecDeque<String>),
    Map(MapValue),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "hash",
        }
    }

    /// Collections that lost their last element are dropped from the key space.
    pub(crate) fn is_empty_collection(&self) -> bool {
        match self {
            Value::Scalar(_) => false,
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
        }
    }
}
