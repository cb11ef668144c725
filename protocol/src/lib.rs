//! Types shared between a privileged requester and the `rootprompt` consent broker.
//!
//! The requester creates a FIFO, launches the broker with a set of named
//! activation parameters, and blocks reading a single [`DECISION_RECORD_LEN`]
//! byte record from the FIFO. This crate owns the parameter names, the
//! parsing of those parameters into a [`RequestDescriptor`], and the encoding
//! of the [`Policy`] written back.

pub mod activation;
pub mod decision;
pub mod request;

pub use activation::Activation;
pub use activation::ActivationValue;
pub use decision::DECISION_RECORD_LEN;
pub use decision::DecodeError;
pub use decision::Policy;
pub use request::ActivationError;
pub use request::RequestDescriptor;
pub use request::RequestKind;
pub use request::RequestMode;
