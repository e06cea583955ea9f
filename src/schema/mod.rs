//! Schema layer: tri-state field values, type descriptors, the conversion
//! engine, and cached model metadata (no I/O).
//!
//! Every API model is backed by a builder-declared [`ModelSchema`]: an
//! ordered table of field descriptors built once per model type and memoized
//! process-wide. The schema drives both directions of the wire translation:
//! [`TypeDescriptor::coerce`] materializes decoded JSON into typed
//! [`Record`]s, and [`Record::to_wire`] serializes them back under their wire
//! names, omitting absent fields and emitting explicit nulls.

mod convert;
mod descriptor;
mod field;
mod metadata;
mod value;

pub use convert::{ConversionError, ConvertMode, ConvertState};
pub use descriptor::{
    ConfigurationError, Discriminator, Primitive, TypeDecl, TypeDescriptor, UnionDecl,
    UnionDescriptor,
};
pub use field::Field;
pub use metadata::{
    Model, ModelSchema, PropertyDecl, PropertyMetadata, SchemaBuilder, SchemaRef, cached_schema,
};
pub use value::{FieldValue, Record};
