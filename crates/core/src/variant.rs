// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tagged-value type carried across the worker RPC boundary.
//!
//! Worker methods are invoked with a bag of named/positional arguments and
//! return a single value; neither side knows the other's types ahead of
//! time, so the wire format is a small self-describing union rather than
//! a typed protobuf message per call. [`fleet-rpc`] maps this type to and
//! from the generated `Variant` wire message.

use std::collections::BTreeMap;
use thiserror::Error;

/// A self-describing value passed to or returned from a worker method call.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Variant>),
    Map(BTreeMap<String, Variant>),
}

/// A named or positional call argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Variant,
}

impl Argument {
    pub fn positional(value: Variant) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Variant) -> Self {
        Self { name: Some(name.into()), value }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VariantError {
    #[error("unsupported variant tag: {0}")]
    UnsupportedTag(i32),
}

impl Variant {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Variant::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Variant::None)
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Variant::Int(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Float(v)
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::String(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Variant {
    fn from(v: Vec<u8>) -> Self {
        Variant::Bytes(v)
    }
}

#[cfg(test)]
#[path = "variant_tests.rs"]
mod tests;
