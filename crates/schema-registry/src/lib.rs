//! # Schema Registry
//!
//! Maps program keys (`scheme://authority`) to validators. A validated
//! node looks the write's program key up here and forwards only accepted
//! writes; a write whose program key has no entry fails with the
//! `no-schema` kind, never silently.
//!
//! Validators are pure with respect to their inputs plus currently
//! readable state: they get a [`ReadHandle`] that exposes only `read`, so
//! a validator cannot write even by accident.

#![warn(clippy::all)]

pub mod builtin;
pub mod registry;
pub mod validator;

pub use builtin::{
    ContentHash, Link, OpenImmutable, OpenMutable, PrincipalAt, PubkeyScoped,
};
pub use registry::{named_set, SchemaRegistry};
pub use validator::{ReadHandle, Validator};
