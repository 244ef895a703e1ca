//! Error types and error handling for the front end.
//!
//! This module defines the single fatal error every stage reports:
//!
//! - Error structures with source position information
//! - Specific error variants grouped by lexical, syntax and type phase
//! - Error names and suggestions used when the error is displayed

pub mod errors;

#[cfg(test)]
mod tests;
