use crate::schema::metadata::SchemaRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Scalar wire types understood by the converter.
pub enum Primitive {
    Bool,
    Int,
    Float,
    String,
}

impl Primitive {
    /// Name used in conversion error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "integer",
            Self::Float => "float",
            Self::String => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Schema declaration failures, raised at model-metadata build time.
///
/// These are configuration bugs, not runtime conditions: the memoized schema
/// for a model caches the failure, so every access to a misdeclared model
/// reports the same error without re-running the builder.
pub enum ConfigurationError {
    /// A declaration carries no type aspect at all.
    #[error("{context}: type declaration carries no type aspect")]
    EmptyDecl { context: String },

    /// A declaration carries two explicit types at once.
    #[error("{context}: conflicting explicit types ({first} and {second})")]
    ConflictingDecl {
        context: String,
        first: &'static str,
        second: &'static str,
    },

    /// A union declaration lists no variants.
    #[error("{context}: union declares no variants")]
    EmptyUnion { context: String },

    /// A discriminator mapping names a variant that is not declared.
    #[error("{context}: discriminator value `{value}` maps to unknown variant `{label}`")]
    UnknownUnionVariant {
        context: String,
        value: &'static str,
        label: &'static str,
    },

    /// A model declares the same local field name twice.
    #[error("model `{model}` declares field `{field}` more than once")]
    DuplicateField {
        model: &'static str,
        field: &'static str,
    },
}

#[derive(Debug, Clone, Default)]
/// Author-facing type declaration for one model field.
///
/// A declaration may carry several aspects (a legacy of annotation-style
/// schemas); [`TypeDecl::resolve`] normalizes it into a single
/// [`TypeDescriptor`] using the documented priority
/// `explicit type > enum > union > list > map`. A declaration with no aspect,
/// or with two explicit types, is a [`ConfigurationError`] rather than a
/// silent fallback.
pub struct TypeDecl {
    primitive: Option<Primitive>,
    model: Option<SchemaRef>,
    enumeration: Option<&'static [&'static str]>,
    union: Option<UnionDecl>,
    list_of: Option<Box<TypeDecl>>,
    map_of: Option<Box<TypeDecl>>,
}

impl TypeDecl {
    /// A declaration with no aspect; resolving it is an error.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Declare an explicit scalar type.
    pub fn primitive(primitive: Primitive) -> Self {
        Self {
            primitive: Some(primitive),
            ..Self::default()
        }
    }

    /// Shorthand for [`TypeDecl::primitive`] with [`Primitive::String`].
    pub fn string() -> Self {
        Self::primitive(Primitive::String)
    }

    /// Shorthand for [`TypeDecl::primitive`] with [`Primitive::Int`].
    pub fn integer() -> Self {
        Self::primitive(Primitive::Int)
    }

    /// Shorthand for [`TypeDecl::primitive`] with [`Primitive::Float`].
    pub fn float() -> Self {
        Self::primitive(Primitive::Float)
    }

    /// Shorthand for [`TypeDecl::primitive`] with [`Primitive::Bool`].
    pub fn boolean() -> Self {
        Self::primitive(Primitive::Bool)
    }

    /// Declare a reference to another model's schema.
    pub fn model(schema: SchemaRef) -> Self {
        Self {
            model: Some(schema),
            ..Self::default()
        }
    }

    /// Declare a closed set of string literals.
    pub fn enumeration(values: &'static [&'static str]) -> Self {
        Self {
            enumeration: Some(values),
            ..Self::default()
        }
    }

    /// Declare a union of subtypes.
    pub fn union(union: UnionDecl) -> Self {
        Self {
            union: Some(union),
            ..Self::default()
        }
    }

    /// Declare a list with the given element type.
    pub fn list_of(element: TypeDecl) -> Self {
        Self {
            list_of: Some(Box::new(element)),
            ..Self::default()
        }
    }

    /// Declare a string-keyed map with the given value type.
    pub fn map_of(value: TypeDecl) -> Self {
        Self {
            map_of: Some(Box::new(value)),
            ..Self::default()
        }
    }

    /// Add an enum aspect to an existing declaration.
    pub fn with_enumeration(mut self, values: &'static [&'static str]) -> Self {
        self.enumeration = Some(values);
        self
    }

    /// Add a union aspect to an existing declaration.
    pub fn with_union(mut self, union: UnionDecl) -> Self {
        self.union = Some(union);
        self
    }

    /// Add a list aspect to an existing declaration.
    pub fn with_list_of(mut self, element: TypeDecl) -> Self {
        self.list_of = Some(Box::new(element));
        self
    }

    /// Add a map aspect to an existing declaration.
    pub fn with_map_of(mut self, value: TypeDecl) -> Self {
        self.map_of = Some(Box::new(value));
        self
    }

    /// Normalize this declaration into a [`TypeDescriptor`].
    ///
    /// Resolution is pure and deterministic; `context` names the declaration
    /// site (`Model.field`) in configuration errors.
    pub fn resolve(&self, context: &str) -> Result<TypeDescriptor, ConfigurationError> {
        if let (Some(_), Some(_)) = (self.primitive, self.model) {
            return Err(ConfigurationError::ConflictingDecl {
                context: context.to_owned(),
                first: "primitive",
                second: "model",
            });
        }

        if let Some(primitive) = self.primitive {
            return Ok(TypeDescriptor::Primitive(primitive));
        }
        if let Some(model) = self.model {
            return Ok(TypeDescriptor::Model(model));
        }
        if let Some(values) = self.enumeration {
            return Ok(TypeDescriptor::Enum(values));
        }
        if let Some(union) = &self.union {
            return Ok(TypeDescriptor::Union(union.resolve(context)?));
        }
        if let Some(element) = &self.list_of {
            let inner = element.resolve(&format!("{context}[]"))?;
            return Ok(TypeDescriptor::ListOf(Box::new(inner)));
        }
        if let Some(value) = &self.map_of {
            let inner = value.resolve(&format!("{context}{{}}"))?;
            return Ok(TypeDescriptor::MapOf(Box::new(inner)));
        }

        Err(ConfigurationError::EmptyDecl {
            context: context.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Default)]
/// Author-facing union declaration: labeled variants plus an optional
/// discriminator mapping wire values to variant labels.
pub struct UnionDecl {
    variants: Vec<(&'static str, TypeDecl)>,
    discriminator: Option<(&'static str, Vec<(&'static str, &'static str)>)>,
}

impl UnionDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a variant; declaration order is the coercion trial order.
    pub fn variant(mut self, label: &'static str, decl: TypeDecl) -> Self {
        self.variants.push((label, decl));
        self
    }

    /// Set the discriminator key and its wire-value to variant-label mapping.
    pub fn discriminator(
        mut self,
        key: &'static str,
        mapping: Vec<(&'static str, &'static str)>,
    ) -> Self {
        self.discriminator = Some((key, mapping));
        self
    }

    fn resolve(&self, context: &str) -> Result<UnionDescriptor, ConfigurationError> {
        if self.variants.is_empty() {
            return Err(ConfigurationError::EmptyUnion {
                context: context.to_owned(),
            });
        }

        let mut variants = Vec::with_capacity(self.variants.len());
        for (label, decl) in &self.variants {
            let descriptor = decl.resolve(&format!("{context}({label})"))?;
            variants.push((*label, descriptor));
        }

        let discriminator = match &self.discriminator {
            None => None,
            Some((key, mapping)) => {
                let mut resolved = Vec::with_capacity(mapping.len());
                for &(value, label) in mapping {
                    let index = variants
                        .iter()
                        .position(|(variant_label, _)| *variant_label == label)
                        .ok_or_else(|| ConfigurationError::UnknownUnionVariant {
                            context: context.to_owned(),
                            value,
                            label,
                        })?;
                    resolved.push((value, index));
                }
                Some(Discriminator {
                    key: *key,
                    mapping: resolved,
                })
            }
        };

        Ok(UnionDescriptor {
            variants,
            discriminator,
        })
    }
}

#[derive(Debug, Clone)]
/// Normalized, engine-facing description of how to coerce and dump one value.
pub enum TypeDescriptor {
    Primitive(Primitive),
    Enum(&'static [&'static str]),
    Union(UnionDescriptor),
    ListOf(Box<TypeDescriptor>),
    MapOf(Box<TypeDescriptor>),
    Model(SchemaRef),
}

impl TypeDescriptor {
    /// Name of the wire shape this descriptor expects, for error messages.
    pub fn expected(&self) -> &'static str {
        match self {
            Self::Primitive(primitive) => primitive.name(),
            Self::Enum(_) => "enum string",
            Self::Union(_) => "union",
            Self::ListOf(_) => "array",
            Self::MapOf(_) => "object",
            Self::Model(_) => "object",
        }
    }
}

#[derive(Debug, Clone)]
/// Resolved union: ordered variants, with an optional discriminator lookup
/// table replacing branch scanning.
pub struct UnionDescriptor {
    pub(crate) variants: Vec<(&'static str, TypeDescriptor)>,
    pub(crate) discriminator: Option<Discriminator>,
}

#[derive(Debug, Clone)]
/// Lookup table from a discriminator wire value to the variant index to try.
pub struct Discriminator {
    pub(crate) key: &'static str,
    pub(crate) mapping: Vec<(&'static str, usize)>,
}

impl Discriminator {
    pub(crate) fn variant_for(&self, value: &str) -> Option<usize> {
        self.mapping
            .iter()
            .find(|(wire, _)| *wire == value)
            .map(|(_, index)| *index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_declaration_is_a_hard_error() {
        let err = TypeDecl::empty().resolve("Test.field").unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyDecl { .. }));
        assert_eq!(
            err.to_string(),
            "Test.field: type declaration carries no type aspect"
        );
    }

    #[test]
    fn priority_explicit_type_beats_enum() {
        let decl = TypeDecl::string().with_enumeration(&["a", "b"]);
        let descriptor = decl.resolve("Test.field").unwrap();
        assert!(matches!(
            descriptor,
            TypeDescriptor::Primitive(Primitive::String)
        ));
    }

    #[test]
    fn priority_enum_beats_union() {
        let decl = TypeDecl::enumeration(&["a", "b"])
            .with_union(UnionDecl::new().variant("s", TypeDecl::string()));
        let descriptor = decl.resolve("Test.field").unwrap();
        assert!(matches!(descriptor, TypeDescriptor::Enum(_)));
    }

    #[test]
    fn priority_union_beats_list_beats_map() {
        let decl = TypeDecl::union(UnionDecl::new().variant("s", TypeDecl::string()))
            .with_list_of(TypeDecl::string())
            .with_map_of(TypeDecl::string());
        assert!(matches!(
            decl.resolve("Test.field").unwrap(),
            TypeDescriptor::Union(_)
        ));

        let decl = TypeDecl::list_of(TypeDecl::string()).with_map_of(TypeDecl::string());
        assert!(matches!(
            decl.resolve("Test.field").unwrap(),
            TypeDescriptor::ListOf(_)
        ));
    }

    #[test]
    fn conflicting_explicit_types_are_rejected() {
        fn missing_schema() -> Result<&'static crate::schema::ModelSchema, ConfigurationError> {
            Err(ConfigurationError::EmptyDecl {
                context: "unused".to_owned(),
            })
        }

        let mut decl = TypeDecl::string();
        decl.model = Some(missing_schema);
        let err = decl.resolve("Test.field").unwrap_err();
        assert!(matches!(err, ConfigurationError::ConflictingDecl { .. }));
    }

    #[test]
    fn union_without_variants_is_rejected() {
        let err = TypeDecl::union(UnionDecl::new())
            .resolve("Test.field")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyUnion { .. }));
    }

    #[test]
    fn discriminator_must_name_declared_variants() {
        let union = UnionDecl::new()
            .variant("phone", TypeDecl::string())
            .discriminator("type", vec![("email_address", "email")]);
        let err = TypeDecl::union(union).resolve("Test.field").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnknownUnionVariant {
                value: "email_address",
                label: "email",
                ..
            }
        ));
    }

    #[test]
    fn discriminator_lookup_resolves_variant_index() {
        let union = UnionDecl::new()
            .variant("phone", TypeDecl::string())
            .variant("count", TypeDecl::integer())
            .discriminator("type", vec![("phone_number", "phone"), ("total", "count")]);
        let TypeDescriptor::Union(resolved) =
            TypeDecl::union(union).resolve("Test.field").unwrap()
        else {
            panic!("expected union descriptor");
        };

        let discriminator = resolved.discriminator.expect("discriminator retained");
        assert_eq!(discriminator.key, "type");
        assert_eq!(discriminator.variant_for("phone_number"), Some(0));
        assert_eq!(discriminator.variant_for("total"), Some(1));
        assert_eq!(discriminator.variant_for("unknown"), None);
    }

    #[test]
    fn nested_container_contexts_appear_in_errors() {
        let err = TypeDecl::list_of(TypeDecl::empty())
            .resolve("Test.items")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Test.items[]: type declaration carries no type aspect"
        );
    }
}
