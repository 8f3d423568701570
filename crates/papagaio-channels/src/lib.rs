//! # papagaio-channels
//!
//! WhatsApp session adapter for papagaio: the `whatsapp-rust` connector
//! (feature `whatsapp-web`), the JSON credential file it persists to, and
//! terminal QR rendering for pairing.

pub mod auth_store;
pub mod qr;
pub mod whatsapp;

pub use auth_store::JsonCredentialStore;
pub use whatsapp::WhatsAppConnector;
