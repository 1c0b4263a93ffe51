//! Core types and pure logic for the circle contact client.
//!
//! This crate is deliberately free of HTTP and I/O. It owns the typed
//! [`Contact`](contact::Contact) and [`Event`](event::Event) records, the
//! email join between them, and the date-window filters the timeline and
//! detail views are built from.

pub mod contact;
pub mod correlate;
pub mod error;
pub mod event;
pub mod view;
pub mod window;

pub use error::{Error, Result};
