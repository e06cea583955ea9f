use std::sync::OnceLock;

use crate::schema::descriptor::{ConfigurationError, TypeDecl, TypeDescriptor};

/// Lazy reference to another model's schema.
///
/// Stored as a function pointer so nested and recursive model references
/// resolve on first use instead of at declaration time.
pub type SchemaRef = fn() -> Result<&'static ModelSchema, ConfigurationError>;

#[derive(Debug)]
/// Cached metadata for one declared model field.
pub struct PropertyMetadata {
    /// Field name used programmatically on [`crate::schema::Record`]s.
    pub local_name: &'static str,
    /// Field key as it appears in JSON payloads.
    pub wire_name: &'static str,
    /// How to coerce and dump this field's value.
    pub descriptor: TypeDescriptor,
    /// Whether an explicit JSON null is a valid state for this field.
    pub nullable: bool,
    /// Whether the field may be absent from wire payloads.
    pub optional: bool,
}

#[derive(Debug)]
/// Per-model-type field table, built once and cached process-wide.
///
/// Declaration order is preserved and drives serialization order.
pub struct ModelSchema {
    name: &'static str,
    properties: Vec<PropertyMetadata>,
}

impl ModelSchema {
    /// Start declaring a model's fields.
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            fields: Vec::new(),
        }
    }

    /// Model name, used in error context.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared properties in declaration order.
    pub fn properties(&self) -> &[PropertyMetadata] {
        &self.properties
    }

    /// Look up a property by its local name.
    pub fn property(&self, local_name: &str) -> Option<&PropertyMetadata> {
        self.properties
            .iter()
            .find(|property| property.local_name == local_name)
    }

    /// Look up a property by its wire name.
    pub fn property_by_wire(&self, wire_name: &str) -> Option<&PropertyMetadata> {
        self.properties
            .iter()
            .find(|property| property.wire_name == wire_name)
    }
}

#[derive(Debug)]
/// One field declaration for [`SchemaBuilder`].
///
/// Defaults: wire name equals the local name, required, non-nullable.
/// `optional` and `nullable` are independent axes.
pub struct PropertyDecl {
    local_name: &'static str,
    wire_name: Option<&'static str>,
    decl: TypeDecl,
    nullable: bool,
    optional: bool,
}

impl PropertyDecl {
    pub fn new(local_name: &'static str, decl: TypeDecl) -> Self {
        Self {
            local_name,
            wire_name: None,
            decl,
            nullable: false,
            optional: false,
        }
    }

    /// Override the wire key (defaults to the local name).
    pub fn wire_name(mut self, wire_name: &'static str) -> Self {
        self.wire_name = Some(wire_name);
        self
    }

    /// Allow an explicit JSON null for this field.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Allow this field to be absent from wire payloads.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[derive(Debug)]
/// Builder-registered field table for one model type.
pub struct SchemaBuilder {
    name: &'static str,
    fields: Vec<PropertyDecl>,
}

impl SchemaBuilder {
    /// Append a field; call order is declaration order.
    pub fn field(mut self, decl: PropertyDecl) -> Self {
        self.fields.push(decl);
        self
    }

    /// Resolve every declaration and produce the immutable schema.
    ///
    /// Fails fast on duplicate field names and on any unresolvable type
    /// declaration; the error names the offending `Model.field`.
    pub fn build(self) -> Result<ModelSchema, ConfigurationError> {
        let mut properties = Vec::<PropertyMetadata>::with_capacity(self.fields.len());

        for field in self.fields {
            if properties
                .iter()
                .any(|existing| existing.local_name == field.local_name)
            {
                return Err(ConfigurationError::DuplicateField {
                    model: self.name,
                    field: field.local_name,
                });
            }

            let context = format!("{}.{}", self.name, field.local_name);
            let descriptor = field.decl.resolve(&context)?;
            properties.push(PropertyMetadata {
                local_name: field.local_name,
                wire_name: field.wire_name.unwrap_or(field.local_name),
                descriptor,
                nullable: field.nullable,
                optional: field.optional,
            });
        }

        Ok(ModelSchema {
            name: self.name,
            properties,
        })
    }
}

/// Memoize a model's schema behind a `OnceLock`.
///
/// The cell stores the build `Result`, so a configuration error is computed
/// once and surfaced identically on every subsequent access. This is the
/// single-initialization guard that makes first-time concurrent access safe.
pub fn cached_schema(
    cell: &'static OnceLock<Result<ModelSchema, ConfigurationError>>,
    build: impl FnOnce() -> Result<ModelSchema, ConfigurationError>,
) -> Result<&'static ModelSchema, ConfigurationError> {
    match cell.get_or_init(build) {
        Ok(schema) => Ok(schema),
        Err(err) => Err(err.clone()),
    }
}

/// A type backed by a declared model schema.
pub trait Model {
    /// The memoized schema for this model type.
    fn schema() -> Result<&'static ModelSchema, ConfigurationError>;
}
