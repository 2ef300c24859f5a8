//! Runtime core
//!
//! The dynamically-typed value model, the type dispatch registry that every
//! operation flows through, the integer-kind machinery, the error taxonomy,
//! and the cooperative task scheduler.

pub mod error;
pub mod int_kind;
pub mod scheduler;
pub mod types;
pub mod value;

pub use error::{RtResult, RuntimeError};
pub use int_kind::{promote_kinds, IntKind, DEFAULT_INT};
pub use scheduler::{Promise, PromiseState, Scheduler, TaskFn, TaskState, TaskStep};
pub use types::TypeDescriptor;
pub use value::{format_float, Value};
