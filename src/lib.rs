//! Inventrack - network equipment inventory client
//!
//! This library provides the client-side core of the Inventrack inventory
//! system: the session watchdog, the barcode scan pipeline and the backend
//! REST client.

pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod store;
