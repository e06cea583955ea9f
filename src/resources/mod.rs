//! Resource layer: per-endpoint request/response models and the thin methods
//! that exercise them.
//!
//! Every model here is a table-declared schema over [`crate::schema`]; the
//! methods do nothing beyond dumping a params record, issuing one request,
//! and coercing the response.

mod lookup;
mod subscriptions;
mod target;
mod transactional;
mod verification;
mod watch;

pub use lookup::{Lookup, LookupResource, LookupType, NetworkInfo};
pub use subscriptions::{
    DeliveryEvent, ListSubscriptionsParams, Subscription, SubscriptionsResource,
    VerificationEvent,
};
pub use target::{Target, TargetKind};
pub use transactional::{SendMessageParams, TransactionalMessage, TransactionalResource};
pub use verification::{
    CheckVerificationParams, CreateVerificationParams, DeviceSignals, Metadata, Verification,
    VerificationCheck, VerificationResource,
};
pub use watch::{
    FeedbackAck, FeedbackKind, Prediction, PredictParams, Reasoning, SendFeedbackParams,
    WatchResource,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Rejected caller input, raised by domain constructors before any request
/// is issued.
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("invalid phone number: {input}")]
    InvalidPhoneNumber { input: String },

    #[error("invalid email address: {input}")]
    InvalidEmailAddress { input: String },
}

#[cfg(test)]
mod tests {
    use super::ValidationError;

    #[test]
    fn display_messages_are_human_readable() {
        let err = ValidationError::Empty { field: "target.value" };
        assert_eq!(err.to_string(), "target.value must not be empty");

        let err = ValidationError::InvalidPhoneNumber {
            input: "bad".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid phone number: bad");

        let err = ValidationError::InvalidEmailAddress {
            input: "nope".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid email address: nope");
    }
}
