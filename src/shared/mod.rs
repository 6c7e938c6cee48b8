//! Request and response types exchanged with the host
//!
//! The host bridge hands over an image path plus numeric options and expects
//! either the accepted strings or an error code and message back.

pub mod messages;

pub use messages::{RecognitionRequest, RecognitionResponse};
