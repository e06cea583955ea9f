use std::sync::OnceLock;

use reqwest::Method;

use crate::client::{Client, Error};
use crate::resources::Target;
use crate::schema::{
    ConfigurationError, ConversionError, ConvertState, Field, FieldValue, Model, ModelSchema,
    PropertyDecl, Record, TypeDecl, cached_schema,
};

#[derive(Debug, Clone, Default, PartialEq)]
/// Free-form request metadata forwarded back on responses and events.
pub struct Metadata {
    pub correlation_id: Field<String>,
}

impl Metadata {
    pub(crate) fn into_record(self) -> Result<Record, ConversionError> {
        let mut record = Record::new(Self::schema()?);
        record.set("correlation_id", self.correlation_id.map(FieldValue::from))?;
        Ok(record)
    }
}

impl Model for Metadata {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("Metadata")
                .field(PropertyDecl::new("correlation_id", TypeDecl::string()).optional())
                .build()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Device/session signals attached to verification and watch requests.
pub struct DeviceSignals {
    pub ip: Field<String>,
    pub device_platform: Field<String>,
    pub app_version: Field<String>,
}

impl DeviceSignals {
    pub(crate) fn into_record(self) -> Result<Record, ConversionError> {
        let mut record = Record::new(Self::schema()?);
        record.set("ip", self.ip.map(FieldValue::from))?;
        record.set("device_platform", self.device_platform.map(FieldValue::from))?;
        record.set("app_version", self.app_version.map(FieldValue::from))?;
        Ok(record)
    }
}

impl Model for DeviceSignals {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("DeviceSignals")
                .field(PropertyDecl::new("ip", TypeDecl::string()).optional())
                .field(
                    PropertyDecl::new(
                        "device_platform",
                        TypeDecl::enumeration(&["android", "ios", "web"]),
                    )
                    .optional(),
                )
                .field(PropertyDecl::new("app_version", TypeDecl::string()).optional())
                .build()
        })
    }
}

#[derive(Debug, Clone)]
/// Parameters for [`VerificationResource::create`].
///
/// Every optional field carries its own tri-state: leave it
/// [`Field::Absent`] to omit the key, set [`Field::Null`] to send an explicit
/// null (nullable fields only), or supply a value.
pub struct CreateVerificationParams {
    pub target: Target,
    pub dispatch_id: Field<String>,
    pub metadata: Field<Metadata>,
    pub signals: Field<DeviceSignals>,
}

impl CreateVerificationParams {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            dispatch_id: Field::Absent,
            metadata: Field::Absent,
            signals: Field::Absent,
        }
    }

    pub(crate) fn into_record(self) -> Result<Record, ConversionError> {
        let mut record = Record::new(Self::schema()?);
        record.set("target", self.target.into_field()?)?;
        record.set("dispatch_id", self.dispatch_id.map(FieldValue::from))?;
        record.set(
            "metadata",
            match self.metadata {
                Field::Absent => Field::Absent,
                Field::Null => Field::Null,
                Field::Value(metadata) => Field::Value(FieldValue::Record(metadata.into_record()?)),
            },
        )?;
        record.set(
            "signals",
            match self.signals {
                Field::Absent => Field::Absent,
                Field::Null => Field::Null,
                Field::Value(signals) => Field::Value(FieldValue::Record(signals.into_record()?)),
            },
        )?;
        Ok(record)
    }
}

impl Model for CreateVerificationParams {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("VerificationCreateRequest")
                .field(PropertyDecl::new("target", TypeDecl::model(Target::schema)))
                .field(PropertyDecl::new("dispatch_id", TypeDecl::string()).optional())
                .field(
                    PropertyDecl::new("metadata", TypeDecl::model(Metadata::schema))
                        .optional()
                        .nullable(),
                )
                .field(
                    PropertyDecl::new("signals", TypeDecl::model(DeviceSignals::schema))
                        .optional(),
                )
                .build()
        })
    }
}

#[derive(Debug, Clone)]
/// Parameters for [`VerificationResource::check`].
pub struct CheckVerificationParams {
    pub target: Target,
    pub code: String,
}

impl CheckVerificationParams {
    pub fn new(target: Target, code: impl Into<String>) -> Self {
        Self {
            target,
            code: code.into(),
        }
    }

    pub(crate) fn into_record(self) -> Result<Record, ConversionError> {
        let mut record = Record::new(Self::schema()?);
        record.set("target", self.target.into_field()?)?;
        record.set("code", Field::Value(self.code.into()))?;
        Ok(record)
    }
}

impl Model for CheckVerificationParams {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("VerificationCheckRequest")
                .field(PropertyDecl::new("target", TypeDecl::model(Target::schema)))
                .field(PropertyDecl::new("code", TypeDecl::string()))
                .build()
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A created (or re-used) verification.
pub struct Verification {
    record: Record,
}

impl Verification {
    pub(crate) fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn id(&self) -> Option<&str> {
        self.record.get("id").value().and_then(FieldValue::as_str)
    }

    /// `success`, `retry`, or `blocked`; unknown server-added statuses pass
    /// through verbatim.
    pub fn status(&self) -> Option<&str> {
        self.record
            .get("status")
            .value()
            .and_then(FieldValue::as_str)
    }

    pub fn method(&self) -> Option<&str> {
        self.record
            .get("method")
            .value()
            .and_then(FieldValue::as_str)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.record
            .get("request_id")
            .value()
            .and_then(FieldValue::as_str)
    }

    /// Delivery channels attempted for this verification, in order.
    pub fn channels(&self) -> Vec<&str> {
        self.record
            .get("channels")
            .value()
            .and_then(FieldValue::as_list)
            .map(|items| items.iter().filter_map(FieldValue::as_str).collect())
            .unwrap_or_default()
    }

    pub fn metadata(&self) -> Option<&Record> {
        self.record
            .get("metadata")
            .value()
            .and_then(FieldValue::as_record)
    }

    /// Dictionary-like access to the underlying record.
    pub fn record(&self) -> &Record {
        &self.record
    }
}

impl Model for Verification {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("Verification")
                .field(PropertyDecl::new("id", TypeDecl::string()))
                .field(PropertyDecl::new(
                    "status",
                    TypeDecl::enumeration(&["success", "retry", "blocked"]),
                ))
                .field(
                    PropertyDecl::new("method", TypeDecl::enumeration(&["message", "voice"]))
                        .optional(),
                )
                .field(PropertyDecl::new("request_id", TypeDecl::string()).optional())
                .field(
                    PropertyDecl::new(
                        "channels",
                        TypeDecl::list_of(TypeDecl::enumeration(&[
                            "sms", "rcs", "whatsapp", "voice",
                        ])),
                    )
                    .optional(),
                )
                .field(
                    PropertyDecl::new("metadata", TypeDecl::model(Metadata::schema))
                        .optional()
                        .nullable(),
                )
                .build()
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Outcome of a code check.
pub struct VerificationCheck {
    record: Record,
}

impl VerificationCheck {
    pub(crate) fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn id(&self) -> Option<&str> {
        self.record.get("id").value().and_then(FieldValue::as_str)
    }

    /// `success`, `failure`, or `expired_or_not_found`.
    pub fn status(&self) -> Option<&str> {
        self.record
            .get("status")
            .value()
            .and_then(FieldValue::as_str)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }
}

impl Model for VerificationCheck {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("VerificationCheck")
                .field(PropertyDecl::new("id", TypeDecl::string()).optional())
                .field(PropertyDecl::new(
                    "status",
                    TypeDecl::enumeration(&["success", "failure", "expired_or_not_found"]),
                ))
                .build()
        })
    }
}

/// Phone verification operations.
pub struct VerificationResource<'a> {
    pub(crate) client: &'a Client,
}

impl VerificationResource<'_> {
    /// Start a verification for the given target.
    pub fn create(&self, params: CreateVerificationParams) -> Result<Verification, Error> {
        let record = params.into_record()?;
        let mut state = ConvertState::strict();
        let body = record.to_wire(&mut state)?;

        let value =
            self.client
                .request_value(Method::POST, "/v2/verification", &[], Some(body))?;

        let mut state = ConvertState::strict();
        let record = Record::from_wire(Verification::schema()?, &value, &mut state)?;
        Ok(Verification::from_record(record))
    }

    /// Check a code the end user submitted.
    pub fn check(&self, params: CheckVerificationParams) -> Result<VerificationCheck, Error> {
        let record = params.into_record()?;
        let mut state = ConvertState::strict();
        let body = record.to_wire(&mut state)?;

        let value = self.client.request_value(
            Method::POST,
            "/v2/verification/check",
            &[],
            Some(body),
        )?;

        let mut state = ConvertState::strict();
        let record = Record::from_wire(VerificationCheck::schema()?, &value, &mut state)?;
        Ok(VerificationCheck::from_record(record))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::testing::{FakeTransport, make_client};

    fn target() -> Target {
        Target::phone_number("+30123456789").unwrap()
    }

    #[test]
    fn create_request_dumps_exactly_the_supplied_fields() {
        let params = CreateVerificationParams::new(target());
        let record = params.into_record().unwrap();

        let mut state = ConvertState::strict();
        let body = record.to_wire(&mut state).unwrap();

        // No dispatch_id/metadata/signals keys: omitted optionals disappear.
        assert_eq!(
            body,
            json!({"target": {"type": "phone_number", "value": "+30123456789"}})
        );
    }

    #[test]
    fn explicit_null_metadata_is_emitted_while_absent_is_omitted() {
        let mut params = CreateVerificationParams::new(target());
        params.metadata = Field::Null;
        let record = params.into_record().unwrap();

        let mut state = ConvertState::strict();
        let body = record.to_wire(&mut state).unwrap();
        assert_eq!(body.get("metadata"), Some(&json!(null)));

        let params = CreateVerificationParams::new(target());
        let record = params.into_record().unwrap();
        let body = record.to_wire(&mut state).unwrap();
        assert!(body.get("metadata").is_none());
    }

    #[test]
    fn optional_fields_keep_independent_tri_states() {
        let mut params = CreateVerificationParams::new(target());
        params.dispatch_id = Field::Value("dsp_1".to_owned());
        params.metadata = Field::Null;
        // signals stays absent.
        let record = params.into_record().unwrap();

        let mut state = ConvertState::strict();
        let body = record.to_wire(&mut state).unwrap();
        assert_eq!(
            body,
            json!({
                "target": {"type": "phone_number", "value": "+30123456789"},
                "dispatch_id": "dsp_1",
                "metadata": null,
            })
        );
    }

    #[test]
    fn nested_signals_dump_under_their_wire_names() {
        let mut params = CreateVerificationParams::new(target());
        params.signals = Field::Value(DeviceSignals {
            ip: Field::Value("203.0.113.7".to_owned()),
            device_platform: Field::Value("android".to_owned()),
            app_version: Field::Absent,
        });
        let record = params.into_record().unwrap();

        let mut state = ConvertState::strict();
        let body = record.to_wire(&mut state).unwrap();
        assert_eq!(
            body["signals"],
            json!({"ip": "203.0.113.7", "device_platform": "android"})
        );
    }

    #[test]
    fn create_posts_and_coerces_the_response() {
        let transport = FakeTransport::new(
            200,
            r#"{
                "id": "vrf_1",
                "status": "success",
                "method": "message",
                "request_id": "req_9",
                "channels": ["sms", "whatsapp"],
                "metadata": {"correlation_id": "corr_1"}
            }"#,
        );
        let client = make_client(transport.clone());

        let verification = client
            .verification()
            .create(CreateVerificationParams::new(target()))
            .unwrap();

        assert_eq!(verification.id(), Some("vrf_1"));
        assert_eq!(verification.status(), Some("success"));
        assert_eq!(verification.method(), Some("message"));
        assert_eq!(verification.request_id(), Some("req_9"));
        assert_eq!(verification.channels(), vec!["sms", "whatsapp"]);
        let metadata = verification.metadata().unwrap();
        assert_eq!(
            metadata
                .get("correlation_id")
                .value()
                .and_then(FieldValue::as_str),
            Some("corr_1")
        );

        let requests = transport.requests();
        assert_eq!(requests[0].url.path(), "/v2/verification");
        assert_eq!(
            requests[0].body,
            Some(json!({"target": {"type": "phone_number", "value": "+30123456789"}}))
        );
    }

    #[test]
    fn unknown_status_passes_through_opaquely() {
        let transport = FakeTransport::new(
            200,
            r#"{"id": "vrf_2", "status": "under_review"}"#,
        );
        let client = make_client(transport);

        let verification = client
            .verification()
            .create(CreateVerificationParams::new(target()))
            .unwrap();
        assert_eq!(verification.status(), Some("under_review"));
    }

    #[test]
    fn check_posts_code_and_target() {
        let transport =
            FakeTransport::new(200, r#"{"id": "vrf_1", "status": "success"}"#);
        let client = make_client(transport.clone());

        let outcome = client
            .verification()
            .check(CheckVerificationParams::new(target(), "123456"))
            .unwrap();
        assert_eq!(outcome.status(), Some("success"));
        assert_eq!(outcome.id(), Some("vrf_1"));

        let requests = transport.requests();
        assert_eq!(requests[0].url.path(), "/v2/verification/check");
        assert_eq!(
            requests[0].body,
            Some(json!({
                "target": {"type": "phone_number", "value": "+30123456789"},
                "code": "123456",
            }))
        );
    }

    #[test]
    fn verification_response_round_trips_presence_states() {
        let wire = json!({
            "id": "vrf_3",
            "status": "retry",
            "metadata": null,
        });

        let mut state = ConvertState::strict();
        let record = Record::from_wire(Verification::schema().unwrap(), &wire, &mut state).unwrap();

        assert!(record.get("metadata").is_null());
        assert!(record.exists("metadata"));
        assert!(!record.exists("channels"));

        let dumped = record.to_wire(&mut state).unwrap();
        assert_eq!(dumped, wire);
    }
}
