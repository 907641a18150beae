//! Identifier enumerations
//!
//! Some structures in a Data Dictionary are "identifiers": a `name`, an
//! `index` and a `description` drawn from a named enumeration. The
//! enumerations themselves live outside the dictionary and are consumed
//! through [`IdentifierRegistry`].

mod registry;

pub use registry::{
    IdentifierEntry, IdentifierEnum, IdentifierError, IdentifierRegistry, IdentifierResult,
    StaticIdentifierRegistry,
};
