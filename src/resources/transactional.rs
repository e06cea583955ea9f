use std::collections::BTreeMap;
use std::sync::OnceLock;

use reqwest::Method;

use crate::client::{Client, Error};
use crate::resources::ValidationError;
use crate::schema::{
    ConfigurationError, ConversionError, ConvertState, Field, FieldValue, Model, ModelSchema,
    PropertyDecl, Record, TypeDecl, cached_schema,
};

#[derive(Debug, Clone)]
/// Parameters for [`TransactionalResource::send`].
pub struct SendMessageParams {
    pub to: String,
    pub template_id: String,
    pub variables: Field<BTreeMap<String, String>>,
    pub from: Field<String>,
    pub expires_at: Field<String>,
    pub callback_url: Field<String>,
}

impl SendMessageParams {
    /// Create parameters for a templated message to one recipient.
    ///
    /// Invariant: both `to` and `template_id` are non-empty after trimming.
    pub fn new(
        to: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let to = to.into();
        let to = to.trim();
        if to.is_empty() {
            return Err(ValidationError::Empty { field: "to" });
        }
        let template_id = template_id.into();
        let template_id = template_id.trim();
        if template_id.is_empty() {
            return Err(ValidationError::Empty {
                field: "template_id",
            });
        }

        Ok(Self {
            to: to.to_owned(),
            template_id: template_id.to_owned(),
            variables: Field::Absent,
            from: Field::Absent,
            expires_at: Field::Absent,
            callback_url: Field::Absent,
        })
    }

    pub(crate) fn into_record(self) -> Result<Record, ConversionError> {
        let mut record = Record::new(Self::schema()?);
        record.set("to", Field::Value(self.to.into()))?;
        record.set("template_id", Field::Value(self.template_id.into()))?;
        record.set(
            "variables",
            self.variables.map(|variables| {
                FieldValue::Map(
                    variables
                        .into_iter()
                        .map(|(key, value)| (key, FieldValue::String(value)))
                        .collect(),
                )
            }),
        )?;
        record.set("from", self.from.map(FieldValue::from))?;
        record.set("expires_at", self.expires_at.map(FieldValue::from))?;
        record.set("callback_url", self.callback_url.map(FieldValue::from))?;
        Ok(record)
    }
}

impl Model for SendMessageParams {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("TransactionalSendRequest")
                .field(PropertyDecl::new("to", TypeDecl::string()))
                .field(PropertyDecl::new("template_id", TypeDecl::string()))
                .field(
                    PropertyDecl::new("variables", TypeDecl::map_of(TypeDecl::string()))
                        .optional(),
                )
                .field(PropertyDecl::new("from", TypeDecl::string()).optional())
                .field(PropertyDecl::new("expires_at", TypeDecl::string()).optional())
                .field(PropertyDecl::new("callback_url", TypeDecl::string()).optional())
                .build()
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A queued transactional message.
pub struct TransactionalMessage {
    record: Record,
}

impl TransactionalMessage {
    pub(crate) fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn id(&self) -> Option<&str> {
        self.record.get("id").value().and_then(FieldValue::as_str)
    }

    pub fn to(&self) -> Option<&str> {
        self.record.get("to").value().and_then(FieldValue::as_str)
    }

    pub fn template_id(&self) -> Option<&str> {
        self.record
            .get("template_id")
            .value()
            .and_then(FieldValue::as_str)
    }

    /// Template variables echoed back by the API.
    pub fn variables(&self) -> BTreeMap<&str, &str> {
        self.record
            .get("variables")
            .value()
            .and_then(FieldValue::as_map)
            .map(|variables| {
                variables
                    .iter()
                    .filter_map(|(key, value)| {
                        value.as_str().map(|value| (key.as_str(), value))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn created_at(&self) -> Option<&str> {
        self.record
            .get("created_at")
            .value()
            .and_then(FieldValue::as_str)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }
}

impl Model for TransactionalMessage {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("TransactionalMessage")
                .field(PropertyDecl::new("id", TypeDecl::string()))
                .field(PropertyDecl::new("to", TypeDecl::string()))
                .field(PropertyDecl::new("template_id", TypeDecl::string()))
                .field(
                    PropertyDecl::new("variables", TypeDecl::map_of(TypeDecl::string()))
                        .optional(),
                )
                .field(PropertyDecl::new("expires_at", TypeDecl::string()).optional())
                .field(PropertyDecl::new("created_at", TypeDecl::string()).optional())
                .build()
        })
    }
}

/// Transactional messaging.
pub struct TransactionalResource<'a> {
    pub(crate) client: &'a Client,
}

impl TransactionalResource<'_> {
    /// Send a templated transactional message.
    pub fn send(&self, params: SendMessageParams) -> Result<TransactionalMessage, Error> {
        let record = params.into_record()?;
        let mut state = ConvertState::strict();
        let body = record.to_wire(&mut state)?;

        let value =
            self.client
                .request_value(Method::POST, "/v2/transactional", &[], Some(body))?;

        let mut state = ConvertState::strict();
        let record = Record::from_wire(TransactionalMessage::schema()?, &value, &mut state)?;
        Ok(TransactionalMessage::from_record(record))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::testing::{FakeTransport, make_client};

    #[test]
    fn new_validates_recipient_and_template() {
        assert!(SendMessageParams::new(" ", "tpl_1").is_err());
        assert!(SendMessageParams::new("+30123456789", "").is_err());

        let params = SendMessageParams::new(" +30123456789 ", " tpl_1 ").unwrap();
        assert_eq!(params.to, "+30123456789");
        assert_eq!(params.template_id, "tpl_1");
    }

    #[test]
    fn send_posts_variables_as_a_string_map() {
        let transport = FakeTransport::new(
            200,
            r#"{
                "id": "msg_1",
                "to": "+30123456789",
                "template_id": "tpl_1",
                "variables": {"code": "123456"},
                "created_at": "2024-03-01T08:00:00Z"
            }"#,
        );
        let client = make_client(transport.clone());

        let mut params = SendMessageParams::new("+30123456789", "tpl_1").unwrap();
        params.variables = Field::Value(BTreeMap::from([(
            "code".to_owned(),
            "123456".to_owned(),
        )]));

        let message = client.transactional().send(params).unwrap();
        assert_eq!(message.id(), Some("msg_1"));
        assert_eq!(message.template_id(), Some("tpl_1"));
        assert_eq!(message.variables().get("code"), Some(&"123456"));
        assert_eq!(message.created_at(), Some("2024-03-01T08:00:00Z"));

        let requests = transport.requests();
        assert_eq!(requests[0].url.path(), "/v2/transactional");
        assert_eq!(
            requests[0].body,
            Some(json!({
                "to": "+30123456789",
                "template_id": "tpl_1",
                "variables": {"code": "123456"},
            }))
        );
    }

    #[test]
    fn omitted_options_never_reach_the_wire() {
        let params = SendMessageParams::new("+30123456789", "tpl_1").unwrap();
        let record = params.into_record().unwrap();

        let mut state = ConvertState::strict();
        let body = record.to_wire(&mut state).unwrap();
        assert_eq!(body, json!({"to": "+30123456789", "template_id": "tpl_1"}));
    }
}
