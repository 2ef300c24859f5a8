//! Plugin ABI and loader protocol
//!
//! A plugin library exports three C-linkage symbols by fixed name: a factory
//! returning an opaque plugin pointer, a matching destructor, and an API
//! version probe. The `declare_plugin!` macro emits all three. The mechanics
//! of actually opening a shared library stay behind the [`PluginLibrary`]
//! seam (they are platform plumbing, not protocol); everything protocol-side
//! lives here: the [`Plugin`] trait, version gating, and the
//! catch-and-convert boundary that keeps panics from ever crossing a library
//! edge.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::api::native::NativeModule;
use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::value::Value;

/// Symbol name of the plugin factory every library must export.
pub const CREATE_PLUGIN_SYMBOL: &str = "kestrel_create_plugin";
/// Symbol name of the plugin destructor every library must export.
pub const DESTROY_PLUGIN_SYMBOL: &str = "kestrel_destroy_plugin";
/// Symbol name of the API version probe every library must export.
pub const API_VERSION_SYMBOL: &str = "kestrel_get_api_version";

/// The plugin ABI version spoken by this engine. Incremented on breaking
/// changes to the boundary types.
pub const PLUGIN_API_VERSION: u32 = 1;

/// A semantic version triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PluginVersion {
    pub const fn new(
        major: u32,
        minor: u32,
        patch: u32,
    ) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether a host at version `self` satisfies a plugin requiring
    /// `required` as its minimum: equal major, host minor at least the
    /// required minor. Patch never participates.
    pub fn is_compatible_with(
        &self,
        required: &PluginVersion,
    ) -> bool {
        self.major == required.major && self.minor >= required.minor
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Plugin metadata reported through [`Plugin::info`].
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    pub author: String,
    pub version: PluginVersion,
    pub min_engine_version: PluginVersion,
    pub dependencies: Vec<String>,
    pub license: String,
    pub website: String,
}

impl PluginInfo {
    pub fn new(
        name: impl Into<String>,
        version: PluginVersion,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            author: String::new(),
            version,
            min_engine_version: PluginVersion::new(1, 0, 0),
            dependencies: Vec::new(),
            license: String::new(),
            website: String::new(),
        }
    }
}

impl fmt::Display for PluginInfo {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)?;
        if !self.author.is_empty() {
            write!(f, " by {}", self.author)?;
        }
        if !self.description.is_empty() {
            write!(f, "\n{}", self.description)?;
        }
        Ok(())
    }
}

/// The interface a plugin object answers once constructed.
///
/// `initialize` runs before any import, `create_module` runs once per
/// import, `finalize` runs at unload. The remaining hooks are optional and
/// default to "not handled".
pub trait Plugin {
    /// Plugin metadata.
    fn info(&self) -> PluginInfo;

    /// Called when the library is loaded, before any imports. The plugin may
    /// register functions or classes directly on the engine.
    fn initialize(
        &mut self,
        engine: &mut crate::engine::Engine,
    ) -> RtResult<()>;

    /// Called when the library is unloaded.
    fn finalize(&mut self) {}

    /// Produce the plugin's module. Called for each import.
    fn create_module(&mut self) -> RtResult<NativeModule>;

    /// Direct symbol lookup, for named imports.
    fn get_symbol(
        &self,
        name: &str,
    ) -> Option<Value> {
        let _ = name;
        None
    }

    /// Bulk symbol export, for `import *`.
    fn get_all_symbols(&self) -> Option<IndexMap<String, Value>> {
        None
    }

    /// Custom import-spec handling.
    fn handle_custom_import(
        &self,
        import_spec: &str,
    ) -> Option<Value> {
        let _ = import_spec;
        None
    }

    /// Plugin-specific configuration.
    fn configure(
        &mut self,
        config: &IndexMap<String, String>,
    ) -> RtResult<()> {
        let _ = config;
        Ok(())
    }

    /// Health check hook.
    fn health_check(&self) -> RtResult<()> {
        Ok(())
    }
}

/// Thin-pointer wrapper for the C boundary: `Box<dyn Plugin>` is a fat
/// pointer and must not appear in an `extern "C"` signature, so the factory
/// returns `*mut PluginBox` instead.
pub struct PluginBox(pub Box<dyn Plugin>);

/// Factory symbol signature.
pub type CreatePluginFn = unsafe extern "C" fn() -> *mut PluginBox;
/// Destructor symbol signature.
pub type DestroyPluginFn = unsafe extern "C" fn(*mut PluginBox);
/// Version probe symbol signature.
pub type ApiVersionFn = unsafe extern "C" fn() -> u32;

/// Emit the three C-linkage exports for a plugin type.
///
/// ```rust,ignore
/// struct MathPlugin;
/// impl Plugin for MathPlugin { /* ... */ }
///
/// kestrel::declare_plugin!(MathPlugin, MathPlugin::default);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($plugin_type:ty, $constructor:path) => {
        #[no_mangle]
        pub extern "C" fn kestrel_create_plugin() -> *mut $crate::api::plugin::PluginBox {
            let plugin: $plugin_type = $constructor();
            Box::into_raw(Box::new($crate::api::plugin::PluginBox(Box::new(plugin))))
        }

        /// # Safety
        /// `plugin` must be a pointer previously returned by
        /// `kestrel_create_plugin` and not yet destroyed.
        #[no_mangle]
        pub unsafe extern "C" fn kestrel_destroy_plugin(
            plugin: *mut $crate::api::plugin::PluginBox
        ) {
            if !plugin.is_null() {
                drop(unsafe { Box::from_raw(plugin) });
            }
        }

        #[no_mangle]
        pub extern "C" fn kestrel_get_api_version() -> u32 {
            $crate::api::plugin::PLUGIN_API_VERSION
        }
    };
}

/// The seam behind which dynamic-library mechanics live.
///
/// A production implementation resolves the three exported symbols with the
/// platform loader; tests and embedders that link plugins statically
/// implement it directly.
pub trait PluginLibrary {
    /// The library's reported ABI version.
    fn api_version(&self) -> u32;

    /// Construct the plugin object.
    fn create(&mut self) -> Box<dyn Plugin>;
}

/// Resolver from a library path to a loaded [`PluginLibrary`].
pub type PluginResolver = Box<dyn FnMut(&str) -> RtResult<Box<dyn PluginLibrary>>>;

/// Run a plugin entry point behind the panic barrier.
///
/// Nothing is allowed to unwind across the plugin boundary; a panic becomes
/// an `IOError` carrying whatever message the panic payload had.
pub fn guard_plugin_call<T>(
    what: &str,
    call: impl FnOnce() -> RtResult<T>,
) -> RtResult<T> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(RuntimeError::Io(format!(
                "Plugin {what} panicked: {message}"
            )))
        }
    }
}
