//! HTTP request handlers
//!
//! Status endpoints are answered from the context's snapshot and never wait
//! on the pipeline. Downloads take the pipeline lock so they never observe a
//! half-written workbook.

pub mod download;
pub mod status;

pub use download::*;
pub use status::*;
