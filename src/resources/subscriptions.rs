use std::sync::OnceLock;

use reqwest::Method;

use crate::client::{Client, Error, Page, PageShape};
use crate::schema::{
    ConfigurationError, Field, FieldValue, Model, ModelSchema, PropertyDecl, Record, TypeDecl,
    UnionDecl, cached_schema,
};

const PAGE_SHAPE: PageShape = PageShape {
    items_field: "subscriptions",
    cursor_param: "cursor",
    next_cursor_field: "next_cursor",
};

#[derive(Debug, Clone, Default)]
/// Parameters for [`SubscriptionsResource::list`].
pub struct ListSubscriptionsParams {
    pub page_size: Field<i64>,
    pub cursor: Field<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// A notification subscription.
///
/// Pages yield raw [`Record`]s; wrap them with
/// [`Subscription::from_record`] for typed access.
pub struct Subscription {
    record: Record,
}

impl Subscription {
    pub fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn id(&self) -> Option<&str> {
        self.record.get("id").value().and_then(FieldValue::as_str)
    }

    /// Webhook URL notifications are delivered to.
    pub fn url(&self) -> Option<&str> {
        self.record.get("url").value().and_then(FieldValue::as_str)
    }

    /// The most recent event delivered on this subscription, if any.
    ///
    /// The record's schema identifies which event model applied: the wire
    /// `type` field discriminates between [`VerificationEvent`] and
    /// [`DeliveryEvent`].
    pub fn last_event(&self) -> Option<&Record> {
        self.record
            .get("last_event")
            .value()
            .and_then(FieldValue::as_record)
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

impl Model for Subscription {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("Subscription")
                .field(PropertyDecl::new("id", TypeDecl::string()))
                .field(PropertyDecl::new("url", TypeDecl::string()).optional())
                .field(
                    PropertyDecl::new(
                        "last_event",
                        TypeDecl::union(
                            UnionDecl::new()
                                .variant(
                                    "verification",
                                    TypeDecl::model(VerificationEvent::schema),
                                )
                                .variant("delivery", TypeDecl::model(DeliveryEvent::schema))
                                .discriminator(
                                    "type",
                                    vec![
                                        ("verification.started", "verification"),
                                        ("verification.completed", "verification"),
                                        ("message.delivered", "delivery"),
                                        ("message.failed", "delivery"),
                                    ],
                                ),
                        ),
                    )
                    .optional()
                    .nullable(),
                )
                .field(PropertyDecl::new("created_at", TypeDecl::string()).optional())
                .build()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Schema anchor for verification lifecycle events.
pub struct VerificationEvent;

impl Model for VerificationEvent {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("VerificationEvent")
                .field(PropertyDecl::new("kind", TypeDecl::string()).wire_name("type"))
                .field(PropertyDecl::new("verification_id", TypeDecl::string()).optional())
                .field(
                    PropertyDecl::new(
                        "status",
                        TypeDecl::enumeration(&["success", "retry", "blocked"]),
                    )
                    .optional(),
                )
                .build()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Schema anchor for message delivery events.
pub struct DeliveryEvent;

impl Model for DeliveryEvent {
    fn schema() -> Result<&'static ModelSchema, ConfigurationError> {
        static SCHEMA: OnceLock<Result<ModelSchema, ConfigurationError>> = OnceLock::new();
        cached_schema(&SCHEMA, || {
            ModelSchema::builder("DeliveryEvent")
                .field(PropertyDecl::new("kind", TypeDecl::string()).wire_name("type"))
                .field(PropertyDecl::new("message_id", TypeDecl::string()).optional())
                .field(PropertyDecl::new("delivered_at", TypeDecl::string()).optional())
                .build()
        })
    }
}

/// Notification subscription operations.
pub struct SubscriptionsResource<'a> {
    pub(crate) client: &'a Client,
}

impl<'a> SubscriptionsResource<'a> {
    /// List subscriptions, one cursor-delimited page at a time.
    ///
    /// Use [`Page::pages`] or [`Page::all_items`] on the result to walk the
    /// full collection lazily.
    pub fn list(&self, params: ListSubscriptionsParams) -> Result<Page<'a>, Error> {
        let mut query = Vec::new();
        if let Field::Value(page_size) = params.page_size {
            query.push(("page_size".to_owned(), page_size.to_string()));
        }
        if let Field::Value(cursor) = params.cursor {
            query.push(("cursor".to_owned(), cursor));
        }

        let body =
            self.client
                .request_value(Method::GET, "/v2/subscriptions", &query, None)?;
        Page::from_body(
            self.client,
            Method::GET,
            "/v2/subscriptions".to_owned(),
            query,
            PAGE_SHAPE,
            Subscription::schema,
            body,
        )
    }
}
