//! Kestrel embeddable scripting runtime
//!
//! Kestrel is the core of a dynamically-typed scripting language: a closed
//! value model, a type-dispatch protocol for every operator and member
//! access, a native-interop bridge for exposing host functions and classes
//! to scripts, a cooperative async scheduler, and a versioned plugin ABI.
//! The lexer/parser/interpreter front-end is a separate consumer that plugs
//! in through the [`engine::Evaluator`] seam.
//!
//! # Example
//!
//! ```rust
//! use kestrel::engine::Engine;
//! use kestrel::runtime::value::Value;
//!
//! let mut engine = Engine::new();
//! engine.register_function("double", |args| {
//!     args[0].multiply(&Value::int(2))
//! });
//! let result = engine.call_function("double", &[Value::int(21)]).unwrap();
//! assert!(result.equals(&Value::int(42)));
//! ```

#![doc(html_root_url = "https://docs.rs/kestrel")]
#![warn(rust_2018_idioms)]
#![allow(dead_code)]

// Public modules
pub mod api;
pub mod engine;
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

pub use api::convert::{FromValue, IntoValue};
pub use engine::{Engine, EngineConfig, Evaluator};
pub use runtime::error::{RtResult, RuntimeError};
pub use runtime::value::Value;

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime name
pub const NAME: &str = "Kestrel";
