//! product-relay: newline-delimited JSON product collection over raw TCP
//!
//! A collector accepts one JSON frame per connection, keeps every product in
//! memory and answers each producer with one acknowledgement frame. Producers
//! validate form input, send a single record and wait for that reply.
//!
//! Features:
//! - Bounded frame reads with partial-arrival and early-close handling
//! - Per-connection read/write timeouts and a cap on concurrent connections
//! - Append-only product store shared across handlers
//! - Configuration via CLI arguments or TOML file

pub mod client;
pub mod config;
pub mod envelope;
pub mod form;
pub mod frame;
pub mod product;
pub mod server;
pub mod storage;

pub use client::{submit_form, submit_product, Reply, SubmitError};
pub use envelope::Envelope;
pub use form::{ProductForm, ValidationError};
pub use product::{FolderData, ProductRecord, Size};
pub use server::Server;
pub use storage::ProductStore;
