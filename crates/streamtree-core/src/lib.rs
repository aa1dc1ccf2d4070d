//! Streamtree Core
//!
//! This crate provides core types, traits, and error definitions
//! for the streamtree markdown parser.
//!
//! # Overview
//!
//! The core crate contains:
//! - [`Token`], [`TokenKind`], [`TokenMeta`] - The flat token stream
//! - [`Node`] - The typed tree returned to callers
//! - [`Alignment`], [`Nesting`] - Shared enums
//! - [`StreamtreeError`] - Error types
//! - [`LineSpan`] - Source line ranges

pub mod enums;
pub mod error;
pub mod node;
pub mod token;
pub mod types;

pub use enums::{Alignment, Nesting};
pub use error::{Result, StreamtreeError};
pub use node::{walk_all, Node};
pub use token::{raw_of, ContainerAttrs, Token, TokenKind, TokenMeta};
pub use types::LineSpan;
