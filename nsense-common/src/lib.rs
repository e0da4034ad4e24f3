//! # nsense Common Library
//!
//! Shared code for the nsense crates including:
//! - Label enumerations (instrument and note label spaces)
//! - Common error type
//! - Configuration schema, loading and resolution
//! - Tracing initialization

pub mod config;
pub mod error;
pub mod labels;
pub mod logging;

pub use error::{Error, Result};
pub use labels::{Instrument, LabelSpace, Note};
