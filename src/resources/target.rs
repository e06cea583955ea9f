use std::sync::OnceLock;

use phonenumber::country;

use crate::resources::ValidationError;
use crate::schema::{
    ConfigurationError, ConversionError, Field, FieldValue, Model, ModelSchema, PropertyDecl,
    Record, TypeDecl, cached_schema,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Kind of identity a request is aimed at.
pub enum TargetKind {
    PhoneNumber,
    EmailAddress,
}

impl TargetKind {
    /// Wire value of the target `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PhoneNumber => "phone_number",
            Self::EmailAddress => "email_address",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// The phone number or email address a verification/watch request targets.
///
/// [`Target::phone_number`] does not normalize; pass exactly what the API
/// should see. For E.164 normalization, use [`Target::parsed_phone_number`].
pub struct Target {
    kind: TargetKind,
    value: String,
}

impl Target {
    /// Create a phone-number target from a raw value.
    ///
    /// Invariant: non-empty after trimming.
    pub fn phone_number(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty {
                field: "target.value",
            });
        }
        Ok(Self {
            kind: TargetKind::PhoneNumber,
            value: trimmed.to_owned(),
        })
    }

    /// Parse and normalize a phone number into E.164 before targeting it.
    ///
    /// `default_region` is used when the input does not carry an explicit
    /// country prefix.
    pub fn parsed_phone_number(
        default_region: Option<country::Id>,
        input: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let input = input.into();
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ValidationError::Empty {
                field: "target.value",
            });
        }

        let parsed = phonenumber::parse(default_region, raw).map_err(|_| {
            ValidationError::InvalidPhoneNumber {
                input: raw.to_owned(),
            }
        })?;
        let e164 = phonenumber::format(&parsed)
            .mode(phonenumber::Mode::E164)
            .to_string();

        Ok(Self {
            kind: TargetKind::PhoneNumber,
            value: e164,
        })
    }

    /// Create an email-address target.
    pub fn email_address(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty {
                field: "target.value",
            });
        }
        if !trimmed.contains('@') {
            return Err(ValidationError::InvalidEmailAddress {
                input: trimmed.to_owned(),
            });
        }
        Ok(Self {
            kind: TargetKind::EmailAddress,
            value: trimmed.to_owned(),
        })
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// The value exactly as it will appear on the wire.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn into_record(self) -> Result<Record, ConversionError> {
        let mut record = Record::new(Self::schema()?);
        record.set("kind", Field::Value(self.kind.as_str().into()))?;
        record.set("value", Field::Value(self.value.into()))?;
        Ok(record)
    }

    pub(crate) fn into_field(self) -> Result<Field<FieldValue>, ConversionError> {
        Ok(Field::Value(FieldValue::Record(self.into_record()?)))
    }
}

impl Model for Target {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("Target")
                .field(
                    PropertyDecl::new(
                        "kind",
                        TypeDecl::enumeration(&["phone_number", "email_address"]),
                    )
                    .wire_name("type"),
                )
                .field(PropertyDecl::new("value", TypeDecl::string()))
                .build()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ConvertState;

    #[test]
    fn phone_number_trims_and_preserves_the_raw_value() {
        let target = Target::phone_number(" +30123456789 ").unwrap();
        assert_eq!(target.kind(), TargetKind::PhoneNumber);
        assert_eq!(target.value(), "+30123456789");

        assert!(Target::phone_number("  ").is_err());
    }

    #[test]
    fn parsed_phone_number_normalizes_to_e164() {
        let target = Target::parsed_phone_number(None, "+1 202-555-0142").unwrap();
        assert_eq!(target.value(), "+12025550142");

        let with_region =
            Target::parsed_phone_number(Some(country::Id::US), "(202) 555-0142").unwrap();
        assert_eq!(with_region.value(), "+12025550142");

        assert!(Target::parsed_phone_number(None, "not-a-number").is_err());
    }

    #[test]
    fn email_address_requires_an_at_sign() {
        let target = Target::email_address("user@example.com").unwrap();
        assert_eq!(target.kind(), TargetKind::EmailAddress);
        assert!(Target::email_address("user.example.com").is_err());
        assert!(Target::email_address(" ").is_err());
    }

    #[test]
    fn target_dumps_with_the_type_wire_name() {
        let target = Target::phone_number("+30123456789").unwrap();
        let record = target.into_record().unwrap();

        let mut state = ConvertState::strict();
        let wire = record.to_wire(&mut state).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({"type": "phone_number", "value": "+30123456789"})
        );
    }
}
