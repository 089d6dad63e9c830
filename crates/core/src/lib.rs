//! Core domain layer for the Cenote federated data server.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! the federation services that merge cursor-paginated result sets from
//! heterogeneous storage adapters. It follows hexagonal architecture
//! principles - this is the innermost layer with no dependencies on
//! infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      cenote (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cenote-graphql   │   cenote-models    │ cenote-webservice  │
//! │     (API)         │  (model families)  │   (remote peers)   │
//! ├───────────────────┴────────────────────┴────────────────────┤
//! │                    cenote-storage                           │
//! │                     (PostgreSQL)                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     cenote-core  ← YOU ARE HERE             │
//! │             (models, ports, catalog, services)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (model definitions, records, scalar types)
//! - [`ports`] - Interface traits for adapters and record sources
//! - [`cursor`] - Opaque pagination cursor codec
//! - [`catalog`] - Logical model registry and id-space resolution
//! - [`services`] - Single-source paginator and the distributed aggregator
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Adapters
//!
//! A logical model is backed by an ordered registry of adapters, each
//! owning a disjoint partition of the id space. Adapters implement
//! [`ports::Adapter`] and are registered in a [`catalog::Catalog`] built
//! once at startup; the registry is read-only afterwards.
//!
//! ## Federation
//!
//! [`services::DdmService`] fans a count or connection read out to every
//! applicable adapter, isolates per-adapter failures as data, merges the
//! raw records, and re-applies a single global order and pagination
//! window. No adapter failure aborts the aggregate: callers always get
//! whatever the healthy adapters produced, annotated with the failures
//! in the connection's `errors` list.

pub mod catalog;
pub mod cursor;
pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
