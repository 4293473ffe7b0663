//! EPUB intake - authenticated single-file upload service
//!
//! This library provides the request pipeline (gatekeeper, bounded multipart
//! decoder, validator and persister) behind the `epub_intake` server binary.

pub mod api;
pub mod config;
pub mod intake;
pub mod storage;
