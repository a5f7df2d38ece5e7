//! Shared utilities for the OpenCOR engine
//!
//! This crate holds the pieces every other engine crate depends on: the
//! [`issue`] module (diagnostics that are accumulated rather than thrown) and
//! the [`number`] module (the textual number format used by CellML and SED-ML
//! documents).

pub mod issue;
pub mod number;
