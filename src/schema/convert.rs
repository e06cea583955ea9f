use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::descriptor::{
    ConfigurationError, Primitive, TypeDescriptor, UnionDescriptor,
};
use crate::schema::field::Field;
use crate::schema::metadata::ModelSchema;
use crate::schema::value::{FieldValue, Record};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
/// Coercion/dump failures for a specific field or value.
///
/// Every variant carries the field path (`$.target.value` style) so the
/// offending location can be found without re-running the conversion.
pub enum ConversionError {
    /// The raw value's shape does not match the descriptor.
    #[error("{path}: expected {expected}, found {found}")]
    Mismatch {
        path: String,
        expected: &'static str,
        found: String,
    },

    /// No union variant accepted the value; lists every attempted variant.
    #[error("{}: no union variant matched (attempted: {})", .path, .attempted.join(", "))]
    UnionMismatch {
        path: String,
        attempted: Vec<&'static str>,
    },

    /// A required field is missing from the payload or the record.
    #[error("{path}: required field is missing")]
    MissingField { path: String },

    /// An explicit null on a field that is not nullable.
    #[error("{path}: null is not allowed")]
    UnexpectedNull { path: String },

    /// Programmatic access to a field the model does not declare.
    #[error("model `{model}` has no field `{field}`")]
    UnknownField { model: &'static str, field: String },

    /// Schema resolution failed while converting.
    #[error(transparent)]
    Config(#[from] ConfigurationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How the converter reacts to element-level failures inside containers and
/// models.
pub enum ConvertMode {
    /// First failure aborts the whole conversion.
    Strict,
    /// Failures are recorded in the state; the failing piece is kept as an
    /// opaque raw value (coerce) or skipped (dump). Nothing is dropped
    /// silently: the caller inspects [`ConvertState::errors`] and decides
    /// whether to retry the whole conversion or accept the partial result.
    Tolerant,
}

#[derive(Debug)]
/// State threaded through [`TypeDescriptor::coerce`] and
/// [`TypeDescriptor::dump`]: conversion mode, the current field path, and the
/// failures deferred under [`ConvertMode::Tolerant`]. Performs no caching.
pub struct ConvertState {
    mode: ConvertMode,
    path: Vec<PathSegment>,
    errors: Vec<ConversionError>,
}

#[derive(Debug, Clone)]
enum PathSegment {
    Field(&'static str),
    Index(usize),
    Key(String),
}

impl ConvertState {
    pub fn strict() -> Self {
        Self::new(ConvertMode::Strict)
    }

    pub fn tolerant() -> Self {
        Self::new(ConvertMode::Tolerant)
    }

    pub fn new(mode: ConvertMode) -> Self {
        Self {
            mode,
            path: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn mode(&self) -> ConvertMode {
        self.mode
    }

    /// Failures deferred so far under [`ConvertMode::Tolerant`].
    pub fn errors(&self) -> &[ConversionError] {
        &self.errors
    }

    /// Drain the deferred failures.
    pub fn take_errors(&mut self) -> Vec<ConversionError> {
        std::mem::take(&mut self.errors)
    }

    fn is_tolerant(&self) -> bool {
        self.mode == ConvertMode::Tolerant
    }

    fn defer(&mut self, err: ConversionError) {
        self.errors.push(err);
    }

    fn push_field(&mut self, name: &'static str) {
        self.path.push(PathSegment::Field(name));
    }

    fn push_index(&mut self, index: usize) {
        self.path.push(PathSegment::Index(index));
    }

    fn push_key(&mut self, key: &str) {
        self.path.push(PathSegment::Key(key.to_owned()));
    }

    fn pop(&mut self) {
        self.path.pop();
    }

    fn path(&self) -> String {
        let mut rendered = String::from("$");
        for segment in &self.path {
            match segment {
                PathSegment::Field(name) => {
                    rendered.push('.');
                    rendered.push_str(name);
                }
                PathSegment::Index(index) => {
                    rendered.push_str(&format!("[{index}]"));
                }
                PathSegment::Key(key) => {
                    rendered.push_str(&format!("[\"{key}\"]"));
                }
            }
        }
        rendered
    }

    /// Fresh strict state for a union branch trial.
    ///
    /// Trials are always strict: a branch either fully matches or the next
    /// one is tried, and a failed trial must not leak deferred errors.
    fn branch_scope(&self) -> ConvertState {
        ConvertState {
            mode: ConvertMode::Strict,
            path: self.path.clone(),
            errors: Vec::new(),
        }
    }

    fn mismatch(&self, expected: &'static str, found: &Value) -> ConversionError {
        ConversionError::Mismatch {
            path: self.path(),
            expected,
            found: json_type_name(found).to_owned(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl TypeDescriptor {
    /// Convert a raw JSON-decoded value into the shape this descriptor
    /// describes.
    pub fn coerce(
        &self,
        raw: &Value,
        state: &mut ConvertState,
    ) -> Result<FieldValue, ConversionError> {
        match self {
            Self::Primitive(primitive) => coerce_primitive(*primitive, raw, state),
            // Membership in the allowed set is not enforced: server-added
            // enum members must pass through opaquely and dump unchanged.
            Self::Enum(_) => match raw {
                Value::String(value) => Ok(FieldValue::String(value.clone())),
                other => Err(state.mismatch("enum string", other)),
            },
            Self::Union(union) => coerce_union(union, raw, state),
            Self::ListOf(element) => coerce_list(element, raw, state),
            Self::MapOf(value) => coerce_map(value, raw, state),
            Self::Model(schema_ref) => {
                let schema = schema_ref()?;
                Record::from_wire(schema, raw, state).map(FieldValue::Record)
            }
        }
    }

    /// Convert a typed value back into a raw, wire-ready JSON value.
    ///
    /// The structural inverse of [`TypeDescriptor::coerce`]; opaque
    /// [`FieldValue::Raw`] values dump back unchanged regardless of the
    /// descriptor.
    pub fn dump(
        &self,
        value: &FieldValue,
        state: &mut ConvertState,
    ) -> Result<Value, ConversionError> {
        if let FieldValue::Raw(raw) = value {
            return Ok(raw.clone());
        }

        match (self, value) {
            (Self::Primitive(Primitive::Bool), FieldValue::Bool(value)) => {
                Ok(Value::Bool(*value))
            }
            (Self::Primitive(Primitive::Int), FieldValue::Int(value)) => {
                Ok(Value::Number((*value).into()))
            }
            (Self::Primitive(Primitive::Float), FieldValue::Float(value)) => {
                serde_json::Number::from_f64(*value)
                    .map(Value::Number)
                    .ok_or_else(|| ConversionError::Mismatch {
                        path: state.path(),
                        expected: "finite float",
                        found: "non-finite float".to_owned(),
                    })
            }
            // Integers widened into float fields stay integral on the wire.
            (Self::Primitive(Primitive::Float), FieldValue::Int(value)) => {
                Ok(Value::Number((*value).into()))
            }
            (Self::Primitive(Primitive::String), FieldValue::String(value)) => {
                Ok(Value::String(value.clone()))
            }
            // Unknown enum members round-trip byte-identical.
            (Self::Enum(_), FieldValue::String(value)) => Ok(Value::String(value.clone())),
            (Self::Union(union), value) => dump_union(union, value, state),
            (Self::ListOf(element), FieldValue::List(items)) => {
                dump_list(element, items, state)
            }
            (Self::MapOf(value_descriptor), FieldValue::Map(entries)) => {
                dump_map(value_descriptor, entries, state)
            }
            (Self::Model(schema_ref), FieldValue::Record(record)) => {
                let schema = schema_ref()?;
                if !std::ptr::eq(schema, record.schema()) {
                    return Err(ConversionError::Mismatch {
                        path: state.path(),
                        expected: "model object",
                        found: format!("record of model `{}`", record.schema().name()),
                    });
                }
                record.to_wire(state)
            }
            (descriptor, value) => Err(ConversionError::Mismatch {
                path: state.path(),
                expected: descriptor.expected(),
                found: value.type_name().to_owned(),
            }),
        }
    }
}

fn coerce_primitive(
    primitive: Primitive,
    raw: &Value,
    state: &mut ConvertState,
) -> Result<FieldValue, ConversionError> {
    match (primitive, raw) {
        (Primitive::Bool, Value::Bool(value)) => Ok(FieldValue::Bool(*value)),
        (Primitive::Int, Value::Number(number)) => number
            .as_i64()
            .map(FieldValue::Int)
            .ok_or_else(|| state.mismatch(primitive.name(), raw)),
        (Primitive::Float, Value::Number(number)) => number
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| state.mismatch(primitive.name(), raw)),
        (Primitive::String, Value::String(value)) => Ok(FieldValue::String(value.clone())),
        _ => Err(state.mismatch(primitive.name(), raw)),
    }
}

fn coerce_union(
    union: &UnionDescriptor,
    raw: &Value,
    state: &mut ConvertState,
) -> Result<FieldValue, ConversionError> {
    // Discriminator fast path: a mapped wire value selects exactly one
    // branch, and that branch's failure is final. Unmapped values fall back
    // to the ordered trial below.
    if let Some(discriminator) = &union.discriminator {
        if let Value::Object(map) = raw {
            if let Some(Value::String(tag)) = map.get(discriminator.key) {
                if let Some(index) = discriminator.variant_for(tag) {
                    let (_, descriptor) = &union.variants[index];
                    return descriptor.coerce(raw, state);
                }
            }
        }
    }

    let mut attempted = Vec::with_capacity(union.variants.len());
    for (label, descriptor) in &union.variants {
        let mut trial = state.branch_scope();
        if let Ok(value) = descriptor.coerce(raw, &mut trial) {
            return Ok(value);
        }
        attempted.push(*label);
    }

    Err(ConversionError::UnionMismatch {
        path: state.path(),
        attempted,
    })
}

fn coerce_list(
    element: &TypeDescriptor,
    raw: &Value,
    state: &mut ConvertState,
) -> Result<FieldValue, ConversionError> {
    let Value::Array(items) = raw else {
        return Err(state.mismatch("array", raw));
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        state.push_index(index);
        let coerced = element.coerce(item, state);
        state.pop();

        match coerced {
            Ok(value) => out.push(value),
            Err(err) if state.is_tolerant() => {
                state.defer(err);
                out.push(FieldValue::Raw(item.clone()));
            }
            Err(err) => return Err(err),
        }
    }
    Ok(FieldValue::List(out))
}

fn coerce_map(
    value_descriptor: &TypeDescriptor,
    raw: &Value,
    state: &mut ConvertState,
) -> Result<FieldValue, ConversionError> {
    let Value::Object(entries) = raw else {
        return Err(state.mismatch("object", raw));
    };

    let mut out = BTreeMap::new();
    for (key, item) in entries {
        state.push_key(key);
        let coerced = value_descriptor.coerce(item, state);
        state.pop();

        match coerced {
            Ok(value) => {
                out.insert(key.clone(), value);
            }
            Err(err) if state.is_tolerant() => {
                state.defer(err);
                out.insert(key.clone(), FieldValue::Raw(item.clone()));
            }
            Err(err) => return Err(err),
        }
    }
    Ok(FieldValue::Map(out))
}

fn dump_union(
    union: &UnionDescriptor,
    value: &FieldValue,
    state: &mut ConvertState,
) -> Result<Value, ConversionError> {
    // Records dump through the variant whose schema they were built from;
    // the discriminator mapping makes that a direct lookup.
    if let Some(discriminator) = &union.discriminator {
        if let FieldValue::Record(record) = value {
            for (_, index) in &discriminator.mapping {
                if let TypeDescriptor::Model(schema_ref) = &union.variants[*index].1 {
                    let schema = schema_ref()?;
                    if std::ptr::eq(schema, record.schema()) {
                        return union.variants[*index].1.dump(value, state);
                    }
                }
            }
        }
    }

    let mut attempted = Vec::with_capacity(union.variants.len());
    for (label, descriptor) in &union.variants {
        let mut trial = state.branch_scope();
        if let Ok(raw) = descriptor.dump(value, &mut trial) {
            return Ok(raw);
        }
        attempted.push(*label);
    }

    Err(ConversionError::UnionMismatch {
        path: state.path(),
        attempted,
    })
}

fn dump_list(
    element: &TypeDescriptor,
    items: &[FieldValue],
    state: &mut ConvertState,
) -> Result<Value, ConversionError> {
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        state.push_index(index);
        let dumped = element.dump(item, state);
        state.pop();

        match dumped {
            Ok(raw) => out.push(raw),
            Err(err) if state.is_tolerant() => state.defer(err),
            Err(err) => return Err(err),
        }
    }
    Ok(Value::Array(out))
}

fn dump_map(
    value_descriptor: &TypeDescriptor,
    entries: &BTreeMap<String, FieldValue>,
    state: &mut ConvertState,
) -> Result<Value, ConversionError> {
    let mut out = serde_json::Map::with_capacity(entries.len());
    for (key, item) in entries {
        state.push_key(key);
        let dumped = value_descriptor.dump(item, state);
        state.pop();

        match dumped {
            Ok(raw) => {
                out.insert(key.clone(), raw);
            }
            Err(err) if state.is_tolerant() => state.defer(err),
            Err(err) => return Err(err),
        }
    }
    Ok(Value::Object(out))
}

impl Record {
    /// Materialize a record from a decoded wire object.
    ///
    /// Only wire keys present in the input populate fields; a key absent from
    /// the input leaves the field absent, not null. Unknown wire keys are
    /// preserved in [`Record::extra`].
    pub fn from_wire(
        schema: &'static ModelSchema,
        raw: &Value,
        state: &mut ConvertState,
    ) -> Result<Record, ConversionError> {
        let Value::Object(map) = raw else {
            return Err(state.mismatch("object", raw));
        };

        let mut record = Record::new(schema);
        for property in schema.properties() {
            state.push_field(property.local_name);
            let outcome = match map.get(property.wire_name) {
                None if property.optional => Ok(None),
                None => Err(ConversionError::MissingField { path: state.path() }),
                Some(Value::Null) if property.nullable => Ok(Some(Field::Null)),
                Some(Value::Null) => {
                    Err(ConversionError::UnexpectedNull { path: state.path() })
                }
                Some(raw_value) => property
                    .descriptor
                    .coerce(raw_value, state)
                    .map(|value| Some(Field::Value(value))),
            };
            state.pop();

            match outcome {
                Ok(Some(field_state)) => {
                    record.insert_state(property.local_name, field_state);
                }
                Ok(None) => {}
                Err(err) if state.is_tolerant() => {
                    // Keep what the wire carried: null stays null, a value
                    // that failed coercion stays as its raw form.
                    match map.get(property.wire_name) {
                        Some(Value::Null) => record.insert_state(property.local_name, Field::Null),
                        Some(raw_value) => record.insert_state(
                            property.local_name,
                            Field::Value(FieldValue::Raw(raw_value.clone())),
                        ),
                        None => {}
                    }
                    state.defer(err);
                }
                Err(err) => return Err(err),
            }
        }

        let mut extra = BTreeMap::new();
        for (key, value) in map {
            if schema.property_by_wire(key).is_none() {
                extra.insert(key.clone(), value.clone());
            }
        }
        record.set_extra(extra);

        Ok(record)
    }

    /// Serialize this record to a wire object.
    ///
    /// Keys appear in declaration order under their wire names. Absent fields
    /// are omitted entirely; explicit nulls are emitted as JSON `null`;
    /// preserved unknown keys follow the declared fields.
    pub fn to_wire(&self, state: &mut ConvertState) -> Result<Value, ConversionError> {
        let schema = self.schema();
        let mut out = serde_json::Map::with_capacity(schema.properties().len());

        for property in schema.properties() {
            state.push_field(property.local_name);
            let outcome: Result<Option<Value>, ConversionError> = match self
                .get(property.local_name)
            {
                Field::Absent if property.optional => Ok(None),
                Field::Absent => Err(ConversionError::MissingField { path: state.path() }),
                Field::Null if property.nullable => Ok(Some(Value::Null)),
                Field::Null => Err(ConversionError::UnexpectedNull { path: state.path() }),
                Field::Value(value) => property.descriptor.dump(value, state).map(Some),
            };
            state.pop();

            match outcome {
                Ok(Some(raw)) => {
                    out.insert(property.wire_name.to_owned(), raw);
                }
                Ok(None) => {}
                Err(err) if state.is_tolerant() => {
                    if self.get(property.local_name).is_null() {
                        out.insert(property.wire_name.to_owned(), Value::Null);
                    }
                    state.defer(err);
                }
                Err(err) => return Err(err),
            }
        }

        for (key, value) in self.extra() {
            if !out.contains_key(key) {
                out.insert(key.clone(), value.clone());
            }
        }

        Ok(Value::Object(out))
    }
}
