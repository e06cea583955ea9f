//! Typed Rust client for the TextPulse messaging and verification HTTP API.
//!
//! The crate is built around a schema layer: every request and response model
//! is declared as a table of field descriptors, and one conversion engine
//! translates between wire JSON and typed records in both directions,
//! tracking for every optional field whether it was absent, explicitly null,
//! or set. The client and resource layers on top are thin: one blocking
//! request per operation, no retries.
//!
//! ```rust,no_run
//! use textpulse::{Client, CreateVerificationParams, Target};
//!
//! fn main() -> Result<(), textpulse::Error> {
//!     let client = Client::new("tp_live_...")?;
//!     let target = Target::phone_number("+30123456789")?;
//!     let verification = client
//!         .verification()
//!         .create(CreateVerificationParams::new(target))?;
//!     println!("status: {:?}", verification.status());
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod schema;
mod resources;
mod transport;

pub use client::{
    ApiErrorBody, ApiKey, Client, ClientBuilder, Error, Page, PageItems, PageShape, Pages,
    RequestSummary, StatusKind,
};
pub use resources::{
    CheckVerificationParams, CreateVerificationParams, DeliveryEvent, DeviceSignals, FeedbackAck,
    FeedbackKind, ListSubscriptionsParams, Lookup, LookupResource, LookupType, Metadata,
    NetworkInfo, Prediction, PredictParams, Reasoning, SendFeedbackParams, SendMessageParams,
    Subscription,
    SubscriptionsResource, Target, TargetKind, TransactionalMessage, TransactionalResource,
    ValidationError, Verification, VerificationCheck, VerificationEvent, VerificationResource,
    WatchResource,
};
pub use schema::{
    ConfigurationError, ConversionError, ConvertMode, ConvertState, Field, FieldValue, Model,
    ModelSchema, PropertyDecl, PropertyMetadata, Record, SchemaBuilder, TypeDecl, TypeDescriptor,
    UnionDecl,
};
pub use transport::{ApiRequest, HttpResponse, HttpTransport, TransportFailure};
