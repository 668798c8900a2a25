//! # Registry
//!
//! The mapping from program key to validator, plus the named validator
//! sets installations select with `SCHEMA_MODULE`.

use crate::builtin::{ContentHash, Link, OpenImmutable, OpenMutable, PrincipalAt, PubkeyScoped};
use crate::validator::Validator;
use shared_types::ProgramKey;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Program-key → validator mapping.
///
/// Lookups are by the normalized `scheme://authority` form, so a single
/// `hash://sha256` entry covers every content address.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    validators: BTreeMap<String, Arc<dyn Validator>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator for a `scheme://authority` program key.
    ///
    /// Panics on a malformed key; registration happens at wiring time
    /// where a bad key is a programming error.
    pub fn register(mut self, program_key: &str, validator: Arc<dyn Validator>) -> Self {
        let key = ProgramKey::parse(program_key)
            .unwrap_or_else(|e| panic!("invalid program key {:?}: {}", program_key, e));
        self.validators.insert(key.as_str().to_string(), validator);
        self
    }

    /// Look up the validator for a program key.
    pub fn get(&self, key: &ProgramKey) -> Option<Arc<dyn Validator>> {
        self.validators.get(key.as_str()).cloned()
    }

    /// All registered program keys.
    pub fn program_keys(&self) -> Vec<ProgramKey> {
        self.validators
            .keys()
            .map(|key| ProgramKey::parse(key).expect("registered keys are normalized"))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// The open programs: unauthenticated mutable/immutable storage plus
    /// content addressing and links.
    pub fn open() -> Self {
        Self::new()
            .register("mutable://open", Arc::new(OpenMutable))
            .register("once://open", Arc::new(OpenImmutable))
            .register("hash://sha256", Arc::new(ContentHash))
            .register("link://open", Arc::new(Link))
    }

    /// The standard installation: the open programs plus account-scoped,
    /// signed, inbox, and batch programs.
    pub fn standard() -> Self {
        Self::open()
            .register("mutable://accounts", Arc::new(OpenMutable))
            .register("msg://batch", Arc::new(OpenMutable))
            .register("inbox://open", Arc::new(OpenImmutable))
            .register(
                "signed://accounts",
                Arc::new(PubkeyScoped::mutable(PrincipalAt::PathSegment(0))),
            )
            .register(
                "signed-once://accounts",
                Arc::new(PubkeyScoped::immutable(PrincipalAt::PathSegment(0))),
            )
    }
}

/// Resolve a named validator set (the `SCHEMA_MODULE` values).
pub fn named_set(name: &str) -> Option<SchemaRegistry> {
    match name {
        "standard" => Some(SchemaRegistry::standard()),
        "open" => Some(SchemaRegistry::open()),
        "none" => Some(SchemaRegistry::new()),
        _ => None,
    }
}
