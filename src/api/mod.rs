//! Native interop bridge
//!
//! Everything a host application or plugin uses to cross the static/dynamic
//! boundary: value conversion traits, native function/class/module
//! registration, per-instance binding tables, and the plugin ABI.

pub mod convert;
pub mod native;
pub mod plugin;
pub mod wrapper;

pub use convert::{check_arity, FromValue, IntoValue};
pub use native::{native_fn, NativeClass, NativeClassExt, NativeFn, NativeModule};
pub use plugin::{Plugin, PluginInfo, PluginLibrary, PluginVersion, PLUGIN_API_VERSION};
pub use wrapper::{InstanceBindings, NativeInstance};
