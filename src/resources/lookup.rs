use std::sync::OnceLock;

use reqwest::Method;

use crate::client::{Client, Error};
use crate::resources::Target;
use crate::schema::{
    ConfigurationError, ConvertState, Field, FieldValue, Model, ModelSchema, PropertyDecl,
    Record, TypeDecl, cached_schema,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Optional lookup data packages.
pub enum LookupType {
    CallerName,
    LineType,
}

impl LookupType {
    /// Wire value of the `type` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CallerName => "cnam",
            Self::LineType => "line_type",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Lookup result for one phone number.
pub struct Lookup {
    record: Record,
}

impl Lookup {
    pub(crate) fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.record
            .get("phone_number")
            .value()
            .and_then(FieldValue::as_str)
    }

    pub fn country_code(&self) -> Option<&str> {
        self.record
            .get("country_code")
            .value()
            .and_then(FieldValue::as_str)
    }

    /// Caller name, tri-state: the API distinguishes "not requested"
    /// (absent) from "requested but unlisted" (null).
    pub fn caller_name(&self) -> Field<&str> {
        match self.record.get("caller_name") {
            Field::Absent => Field::Absent,
            Field::Null => Field::Null,
            Field::Value(value) => match value.as_str() {
                Some(name) => Field::Value(name),
                None => Field::Absent,
            },
        }
    }

    pub fn line_type(&self) -> Option<&str> {
        self.record
            .get("line_type")
            .value()
            .and_then(FieldValue::as_str)
    }

    pub fn flags(&self) -> Vec<&str> {
        self.record
            .get("flags")
            .value()
            .and_then(FieldValue::as_list)
            .map(|items| items.iter().filter_map(FieldValue::as_str).collect())
            .unwrap_or_default()
    }

    pub fn network_info(&self) -> Option<&Record> {
        self.record
            .get("network_info")
            .value()
            .and_then(FieldValue::as_record)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }
}

impl Model for Lookup {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("Lookup")
                .field(PropertyDecl::new("phone_number", TypeDecl::string()))
                .field(PropertyDecl::new("country_code", TypeDecl::string()).optional())
                .field(
                    PropertyDecl::new("caller_name", TypeDecl::string())
                        .optional()
                        .nullable(),
                )
                .field(
                    PropertyDecl::new(
                        "line_type",
                        TypeDecl::enumeration(&[
                            "fixed_line",
                            "mobile",
                            "voip",
                            "toll_free",
                            "premium_rate",
                            "unknown",
                        ]),
                    )
                    .optional(),
                )
                .field(
                    PropertyDecl::new(
                        "flags",
                        TypeDecl::list_of(TypeDecl::enumeration(&[
                            "ported",
                            "temporary",
                            "spam_reported",
                        ])),
                    )
                    .optional(),
                )
                .field(
                    PropertyDecl::new("network_info", TypeDecl::model(NetworkInfo::schema))
                        .optional(),
                )
                .build()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Schema anchor for the carrier details nested inside a [`Lookup`].
pub struct NetworkInfo;

impl NetworkInfo {
    pub fn carrier_name(record: &Record) -> Option<&str> {
        record
            .get("carrier_name")
            .value()
            .and_then(FieldValue::as_str)
    }
}

impl Model for NetworkInfo {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("NetworkInfo")
                .field(PropertyDecl::new("carrier_name", TypeDecl::string()).optional())
                .field(PropertyDecl::new("mcc", TypeDecl::string()).optional())
                .field(PropertyDecl::new("mnc", TypeDecl::string()).optional())
                .build()
        })
    }
}

/// Phone number lookup.
pub struct LookupResource<'a> {
    pub(crate) client: &'a Client,
}

impl LookupResource<'_> {
    /// Look up metadata for a phone number.
    ///
    /// `types` selects optional data packages; the base lookup is always
    /// returned.
    pub fn lookup(&self, phone_number: &str, types: &[LookupType]) -> Result<Lookup, Error> {
        let target = Target::phone_number(phone_number)?;
        let path = format!("/v2/lookup/{}", target.value());
        let query: Vec<(String, String)> = types
            .iter()
            .map(|lookup_type| ("type".to_owned(), lookup_type.as_str().to_owned()))
            .collect();

        let value = self.client.request_value(Method::GET, &path, &query, None)?;

        let mut state = ConvertState::strict();
        let record = Record::from_wire(Lookup::schema()?, &value, &mut state)?;
        Ok(Lookup::from_record(record))
    }
}
