// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire messages for the worker RPC surface.
//!
//! These mirror what `tonic-build` would generate from a
//! `dynamic_subclass.proto` + `commons.proto` pair (`Setup`/`Call` unary
//! methods on `DynamicSubclassService`, opaque `commons.Variant` payloads);
//! they are hand-written here since no `.proto` build step runs in this
//! workspace, but the shape and derive usage match generated output exactly.

use std::collections::HashMap;

pub mod commons {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Argument {
        #[prost(string, optional, tag = "1")]
        pub name: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(message, optional, tag = "2")]
        pub value: ::core::option::Option<Variant>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct KwArgument {
        #[prost(string, tag = "1")]
        pub name: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "2")]
        pub value: ::core::option::Option<Variant>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Variant {
        #[prost(oneof = "variant::Kind", tags = "1, 2, 3, 4, 5, 6, 7")]
        pub kind: ::core::option::Option<variant::Kind>,
    }

    pub mod variant {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Kind {
            #[prost(bool, tag = "1")]
            BoolValue(bool),
            #[prost(int64, tag = "2")]
            IntValue(i64),
            #[prost(double, tag = "3")]
            FloatValue(f64),
            #[prost(string, tag = "4")]
            StringValue(::prost::alloc::string::String),
            #[prost(bytes, tag = "5")]
            BytesValue(::prost::alloc::vec::Vec<u8>),
            #[prost(message, tag = "6")]
            ListValue(super::ListValue),
            #[prost(message, tag = "7")]
            MapValue(super::MapValue),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ListValue {
        #[prost(message, repeated, tag = "1")]
        pub values: ::prost::alloc::vec::Vec<Variant>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct MapValue {
        #[prost(map = "string, message", tag = "1")]
        pub entries: ::std::collections::HashMap<::prost::alloc::string::String, Variant>,
    }
}

pub mod dynamic_subclass {
    use super::commons::{Argument, KwArgument, Variant};

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SetupRequest {
        #[prost(string, tag = "1")]
        pub class_name: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "2")]
        pub instance_arguments: ::prost::alloc::vec::Vec<Argument>,
        #[prost(message, repeated, tag = "3")]
        pub instance_kw_arguments: ::prost::alloc::vec::Vec<KwArgument>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SetupResponse {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CallRequest {
        #[prost(string, tag = "1")]
        pub method_name: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "2")]
        pub method_arguments: ::prost::alloc::vec::Vec<Argument>,
        #[prost(message, repeated, tag = "3")]
        pub method_kw_arguments: ::prost::alloc::vec::Vec<KwArgument>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CallResponse {
        #[prost(message, optional, tag = "1")]
        pub method_response: ::core::option::Option<Variant>,
    }
}

/// Converts a core [`fleet_core::Variant`] into its wire representation.
impl From<&fleet_core::Variant> for commons::Variant {
    fn from(v: &fleet_core::Variant) -> Self {
        use commons::variant::Kind;
        let kind = match v {
            fleet_core::Variant::None => None,
            fleet_core::Variant::Bool(b) => Some(Kind::BoolValue(*b)),
            fleet_core::Variant::Int(i) => Some(Kind::IntValue(*i)),
            fleet_core::Variant::Float(f) => Some(Kind::FloatValue(*f)),
            fleet_core::Variant::String(s) => Some(Kind::StringValue(s.clone())),
            fleet_core::Variant::Bytes(b) => Some(Kind::BytesValue(b.clone())),
            fleet_core::Variant::List(items) => {
                Some(Kind::ListValue(commons::ListValue {
                    values: items.iter().map(commons::Variant::from).collect(),
                }))
            }
            fleet_core::Variant::Map(map) => {
                let entries: HashMap<String, commons::Variant> =
                    map.iter().map(|(k, v)| (k.clone(), commons::Variant::from(v))).collect();
                Some(Kind::MapValue(commons::MapValue { entries }))
            }
        };
        commons::Variant { kind }
    }
}

/// Converts a wire [`commons::Variant`] back into the core tagged-value type.
impl From<commons::Variant> for fleet_core::Variant {
    fn from(v: commons::Variant) -> Self {
        use commons::variant::Kind;
        match v.kind {
            None => fleet_core::Variant::None,
            Some(Kind::BoolValue(b)) => fleet_core::Variant::Bool(b),
            Some(Kind::IntValue(i)) => fleet_core::Variant::Int(i),
            Some(Kind::FloatValue(f)) => fleet_core::Variant::Float(f),
            Some(Kind::StringValue(s)) => fleet_core::Variant::String(s),
            Some(Kind::BytesValue(b)) => fleet_core::Variant::Bytes(b),
            Some(Kind::ListValue(list)) => {
                fleet_core::Variant::List(list.values.into_iter().map(Into::into).collect())
            }
            Some(Kind::MapValue(map)) => fleet_core::Variant::Map(
                map.entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<&fleet_core::Argument> for commons::Argument {
    fn from(a: &fleet_core::Argument) -> Self {
        commons::Argument { name: a.name.clone(), value: Some((&a.value).into()) }
    }
}

#[cfg(test)]
#[path = "proto_tests.rs"]
mod tests;
