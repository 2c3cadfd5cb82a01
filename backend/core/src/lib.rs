//! `linkdrop-core`: data model, collaborator traits, and errors shared by
//! every linkdrop crate.

pub mod code;
pub mod content;
pub mod error;
pub mod gateway;
pub mod oracle;
pub mod recipient;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use code::{Code, CodeError, CODE_LEN, MAX_CODE_LEN};
pub use content::{ContentDraft, ContentKind, ContentReference, UnknownKind, NO_CAPTION_KINDS};
pub use error::RelayError;
pub use gateway::{
    Button, Delivery, GatewayError, MessagingGateway, OutboundText, RelayPayload, SentMessage,
};
pub use oracle::MembershipOracle;
pub use recipient::{RecipientId, RecipientRecord};
