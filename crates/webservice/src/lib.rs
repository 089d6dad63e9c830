//! Remote peer adapter for the Cenote federation server.
//!
//! This crate implements the [`Adapter`] contract from `cenote-core`
//! against a sibling federation server's GraphQL endpoint. Every
//! operation maps to one query or mutation over HTTP; the peer's
//! partial-failure list travels back inside the connection payload and
//! is merged into the local fan-out's error list.
//!
//! # Usage
//!
//! ```ignore
//! use cenote_webservice::{PeerClient, PeerClientConfig, WebserviceAdapter, WebserviceAdapterConfig};
//!
//! let client = PeerClient::new(&PeerClientConfig {
//!     url: "http://peer.example/graphql".parse()?,
//!     timeout: Duration::from_secs(10),
//! })?;
//!
//! let adapter = Arc::new(WebserviceAdapter::new(client, definition, config));
//! ```
//!
//! [`Adapter`]: cenote_core::ports::Adapter

mod adapter;
mod client;
mod wire;

pub use adapter::{WebserviceAdapter, WebserviceAdapterConfig};
pub use client::{PeerClient, PeerClientConfig};
pub use wire::{order_to_wire, pagination_to_wire, search_to_wire};
