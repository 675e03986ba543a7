//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod media;

pub use entities::{Chat, ChatType, MediaPayload, Message, SignInResult};
pub use errors::DomainError;
pub use media::MediaKind;
