use std::sync::OnceLock;

use reqwest::Method;

use crate::client::{Client, Error};
use crate::resources::verification::{DeviceSignals, Metadata};
use crate::resources::Target;
use crate::schema::{
    ConfigurationError, ConversionError, ConvertState, Field, FieldValue, Model, ModelSchema,
    PropertyDecl, Record, TypeDecl, cached_schema,
};

#[derive(Debug, Clone)]
/// Parameters for [`WatchResource::predict`].
pub struct PredictParams {
    pub target: Target,
    pub signals: Field<DeviceSignals>,
    pub metadata: Field<Metadata>,
}

impl PredictParams {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            signals: Field::Absent,
            metadata: Field::Absent,
        }
    }

    pub(crate) fn into_record(self) -> Result<Record, ConversionError> {
        let mut record = Record::new(Self::schema()?);
        record.set("target", self.target.into_field()?)?;
        record.set(
            "signals",
            match self.signals {
                Field::Absent => Field::Absent,
                Field::Null => Field::Null,
                Field::Value(signals) => Field::Value(FieldValue::Record(signals.into_record()?)),
            },
        )?;
        record.set(
            "metadata",
            match self.metadata {
                Field::Absent => Field::Absent,
                Field::Null => Field::Null,
                Field::Value(metadata) => Field::Value(FieldValue::Record(metadata.into_record()?)),
            },
        )?;
        Ok(record)
    }
}

impl Model for PredictParams {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("WatchPredictRequest")
                .field(PropertyDecl::new("target", TypeDecl::model(Target::schema)))
                .field(
                    PropertyDecl::new("signals", TypeDecl::model(DeviceSignals::schema))
                        .optional(),
                )
                .field(
                    PropertyDecl::new("metadata", TypeDecl::model(Metadata::schema)).optional(),
                )
                .build()
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Fraud risk prediction for a target.
pub struct Prediction {
    record: Record,
}

impl Prediction {
    pub(crate) fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn id(&self) -> Option<&str> {
        self.record.get("id").value().and_then(FieldValue::as_str)
    }

    /// `legitimate` or `suspicious`; unknown verdicts pass through verbatim.
    pub fn prediction(&self) -> Option<&str> {
        self.record
            .get("prediction")
            .value()
            .and_then(FieldValue::as_str)
    }

    pub fn reasoning(&self) -> Option<&Record> {
        self.record
            .get("reasoning")
            .value()
            .and_then(FieldValue::as_record)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }
}

impl Model for Prediction {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("Prediction")
                .field(PropertyDecl::new("id", TypeDecl::string()))
                .field(PropertyDecl::new(
                    "prediction",
                    TypeDecl::enumeration(&["legitimate", "suspicious"]),
                ))
                .field(
                    PropertyDecl::new("reasoning", TypeDecl::model(Reasoning::schema)).optional(),
                )
                .build()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Schema anchor for the reasoning block nested inside a [`Prediction`].
pub struct Reasoning;

impl Model for Reasoning {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("Reasoning")
                .field(
                    PropertyDecl::new(
                        "cause",
                        TypeDecl::enumeration(&["none", "smart_antifraud", "repeat_number"]),
                    )
                    .optional(),
                )
                .field(PropertyDecl::new("score", TypeDecl::float()).optional())
                .build()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Outcome signals reported back to the watch service.
pub enum FeedbackKind {
    VerificationStarted,
    VerificationCompleted,
}

impl FeedbackKind {
    /// Wire value of the feedback `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VerificationStarted => "verification.started",
            Self::VerificationCompleted => "verification.completed",
        }
    }
}

#[derive(Debug, Clone)]
/// Parameters for [`WatchResource::feedback`].
pub struct SendFeedbackParams {
    pub target: Target,
    pub kind: FeedbackKind,
}

impl SendFeedbackParams {
    pub fn new(target: Target, kind: FeedbackKind) -> Self {
        Self { target, kind }
    }

    pub(crate) fn into_record(self) -> Result<Record, ConversionError> {
        let mut record = Record::new(Self::schema()?);
        record.set("target", self.target.into_field()?)?;
        record.set("kind", Field::Value(self.kind.as_str().into()))?;
        Ok(record)
    }
}

impl Model for SendFeedbackParams {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("WatchFeedbackRequest")
                .field(PropertyDecl::new("target", TypeDecl::model(Target::schema)))
                .field(
                    PropertyDecl::new(
                        "kind",
                        TypeDecl::enumeration(&[
                            "verification.started",
                            "verification.completed",
                        ]),
                    )
                    .wire_name("type"),
                )
                .build()
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Acknowledgment of a feedback submission.
pub struct FeedbackAck {
    record: Record,
}

impl FeedbackAck {
    pub(crate) fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn id(&self) -> Option<&str> {
        self.record.get("id").value().and_then(FieldValue::as_str)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }
}

impl Model for FeedbackAck {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("FeedbackAck")
                .field(PropertyDecl::new("id", TypeDecl::string()))
                .build()
        })
    }
}

/// Fraud-watch operations.
pub struct WatchResource<'a> {
    pub(crate) client: &'a Client,
}

impl WatchResource<'_> {
    /// Predict whether a verification attempt looks legitimate.
    pub fn predict(&self, params: PredictParams) -> Result<Prediction, Error> {
        let record = params.into_record()?;
        let mut state = ConvertState::strict();
        let body = record.to_wire(&mut state)?;

        let value =
            self.client
                .request_value(Method::POST, "/v2/watch/predict", &[], Some(body))?;

        let mut state = ConvertState::strict();
        let record = Record::from_wire(Prediction::schema()?, &value, &mut state)?;
        Ok(Prediction::from_record(record))
    }

    /// Report a verification outcome back to the watch service.
    pub fn feedback(&self, params: SendFeedbackParams) -> Result<FeedbackAck, Error> {
        let record = params.into_record()?;
        let mut state = ConvertState::strict();
        let body = record.to_wire(&mut state)?;

        let value =
            self.client
                .request_value(Method::POST, "/v2/watch/feedback", &[], Some(body))?;

        let mut state = ConvertState::strict();
        let record = Record::from_wire(FeedbackAck::schema()?, &value, &mut state)?;
        Ok(FeedbackAck::from_record(record))
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
    fn predict_posts_target_and_signals() {
        let transport = FakeTransport::new(
            200,
            r#"{
                "id": "prd_1",
                "prediction": "suspicious",
                "reasoning": {"cause": "smart_antifraud", "score": 0.93}
            }"#,
        );
        let client = make_client(transport.clone());

        let mut params = PredictParams::new(target());
        params.signals = Field::Value(DeviceSignals {
            ip: Field::Value("203.0.113.7".to_owned()),
            device_platform: Field::Absent,
            app_version: Field::Absent,
        });

        let prediction = client.watch().predict(params).unwrap();
        assert_eq!(prediction.id(), Some("prd_1"));
        assert_eq!(prediction.prediction(), Some("suspicious"));
        let reasoning = prediction.reasoning().unwrap();
        assert_eq!(
            reasoning.get("score").value().and_then(FieldValue::as_float),
            Some(0.93)
        );

        let requests = transport.requests();
        assert_eq!(requests[0].url.path(), "/v2/watch/predict");
        assert_eq!(
            requests[0].body,
            Some(json!({
                "target": {"type": "phone_number", "value": "+30123456789"},
                "signals": {"ip": "203.0.113.7"},
            }))
        );
    }

    #[test]
    fn feedback_maps_kind_to_the_type_wire_field() {
        let transport = FakeTransport::new(200, r#"{"id": "ftk_1"}"#);
        let client = make_client(transport.clone());

        let ack = client
            .watch()
            .feedback(SendFeedbackParams::new(
                target(),
                FeedbackKind::VerificationCompleted,
            ))
            .unwrap();
        assert_eq!(ack.id(), Some("ftk_1"));

        let requests = transport.requests();
        assert_eq!(requests[0].url.path(), "/v2/watch/feedback");
        assert_eq!(
            requests[0].body,
            Some(json!({
                "target": {"type": "phone_number", "value": "+30123456789"},
                "type": "verification.completed",
            }))
        );
    }
}
