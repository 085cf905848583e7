//! Component C — the value cell: a tagged union holding one decoded value.
//!
//! Rust gives us a sum type for free, so cross-type access is forbidden by
//! construction rather than by a C union plus an enum tag.
//! Byte/text payloads are stored in `bytes::Bytes`, matching the teacher's
//! use of `bytes` for owned buffer slices.

use bytes::Bytes;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{Duration, SystemTime};

/// One decoded field value, parallel to `FieldType`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    /// Identity of the buffer a `Protocol`-typed FI refers to, and the span
    /// of it this FI covers.
    Protocol { ds_tvb: u64, bytes: Bytes },
    Bytes(Bytes),
    Bool(bool),
    /// All integer widths share one signed 64-bit cell; `FieldType` on the
    /// owning HFI tells readers how to interpret/truncate it.
    Uint(u64),
    Int(i64),
    IPv4(Ipv4Addr),
    IPv6(Ipv6Addr),
    IpxNet(u32),
    Ether([u8; 6]),
    String(String),
    AbsTime(SystemTime),
    RelTime(Duration),
    Float(f32),
    Double(f64),
}

impl Value {
    pub fn get_integer(&self) -> Option<i64> {
        match self {
            Value::Uint(v) => Some(*v as i64),
            Value::Int(v) => Some(*v),
            Value::Bool(b) => Some(*b as i64),
            Value::IpxNet(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn get_floating(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn get_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Protocol { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    pub fn get_time(&self) -> Option<TimeValue> {
        match self {
            Value::AbsTime(t) => Some(TimeValue::Abs(*t)),
            Value::RelTime(d) => Some(TimeValue::Rel(*d)),
            _ => None,
        }
    }

    pub fn get_protocol_segment(&self) -> Option<(u64, &Bytes)> {
        match self {
            Value::Protocol { ds_tvb, bytes } => Some((*ds_tvb, bytes)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeValue {
    Abs(SystemTime),
    Rel(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_projection_rejects_non_integer_variants() {
        assert_eq!(Value::String("x".into()).get_integer(), None);
        assert_eq!(Value::Uint(42).get_integer(), Some(42));
    }

    #[test]
    fn bool_reads_back_through_get_integer() {
        assert_eq!(Value::Bool(true).get_integer(), Some(1));
        assert_eq!(Value::Bool(false).get_integer(), Some(0));
    }
}
