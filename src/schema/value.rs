use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::schema::convert::ConversionError;
use crate::schema::field::Field;
use crate::schema::metadata::ModelSchema;

#[derive(Debug, Clone, PartialEq)]
/// Dynamic typed value produced by coercion and consumed by dumping.
///
/// `Raw` is the opaque pass-through: it carries wire data the converter was
/// told to tolerate (or that belongs to no declared field) and dumps back
/// byte-identical.
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
    Record(Record),
    Raw(Value),
}

impl FieldValue {
    /// Name of this value's shape, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "array",
            Self::Map(_) => "object",
            Self::Record(_) => "model object",
            Self::Raw(_) => "raw value",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            Self::Map(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Debug, Clone)]
/// Schema-backed model instance with dictionary-like, tri-state field access.
///
/// Storage invariant: `fields` never holds [`Field::Absent`]; absence is the
/// lack of an entry. The accessors always speak [`Field`], so the invariant
/// is not observable from outside.
pub struct Record {
    schema: &'static ModelSchema,
    fields: HashMap<&'static str, Field<FieldValue>>,
    extra: BTreeMap<String, Value>,
}

impl Record {
    /// An instance of `schema` with every field absent.
    pub fn new(schema: &'static ModelSchema) -> Self {
        Self {
            schema,
            fields: HashMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &'static ModelSchema {
        self.schema
    }

    /// Tri-state read of a declared field by local name.
    ///
    /// Undeclared names read as [`Field::Absent`].
    pub fn get(&self, local_name: &str) -> Field<&FieldValue> {
        match self.fields.get(local_name) {
            Some(state) => state.as_ref(),
            None => Field::Absent,
        }
    }

    /// Whether the field was ever set (explicit null counts, absence does not).
    pub fn exists(&self, local_name: &str) -> bool {
        self.fields.contains_key(local_name)
    }

    /// Tri-state write of a declared field by local name.
    ///
    /// Setting [`Field::Absent`] clears the field. Undeclared names are
    /// rejected.
    pub fn set(
        &mut self,
        local_name: &str,
        state: Field<FieldValue>,
    ) -> Result<(), ConversionError> {
        let property = self.schema.property(local_name).ok_or_else(|| {
            ConversionError::UnknownField {
                model: self.schema.name(),
                field: local_name.to_owned(),
            }
        })?;

        match state {
            Field::Absent => {
                self.fields.remove(property.local_name);
            }
            state => {
                self.fields.insert(property.local_name, state);
            }
        }
        Ok(())
    }

    /// Wire keys from deserialization that match no declared field.
    ///
    /// Preserved verbatim and re-emitted on dump, after the declared fields.
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    pub(crate) fn set_extra(&mut self, extra: BTreeMap<String, Value>) {
        self.extra = extra;
    }

    /// Insert a field state already validated against the schema.
    ///
    /// `state` must not be [`Field::Absent`]; callers clear fields through
    /// [`Record::set`] instead.
    pub(crate) fn insert_state(&mut self, local_name: &'static str, state: Field<FieldValue>) {
        debug_assert!(!state.is_absent());
        self.fields.insert(local_name, state);
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema)
            && self.fields == other.fields
            && self.extra == other.extra
    }
}
