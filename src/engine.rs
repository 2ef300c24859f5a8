//! Host embedding surface
//!
//! [`Engine`] is what an embedding application holds: registries for native
//! functions, classes, and modules, the cooperative scheduler, engine
//! statistics, and the plugin loader protocol. Script execution itself is
//! delegated through the [`Evaluator`] seam - the engine never parses
//! source, it only routes it to whatever interpreter front-end the embedder
//! installed.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::native::{NativeClass, NativeFn, NativeModule};
use crate::api::plugin::{
    guard_plugin_call, Plugin, PluginInfo, PluginResolver, PluginVersion, PLUGIN_API_VERSION,
};
use crate::runtime::error::{RtResult, RuntimeError};
use crate::runtime::scheduler::Scheduler;
use crate::runtime::value::Value;

/// The seam the out-of-scope interpreter implements.
///
/// `execute_string` runs a whole script; `evaluate_expression` evaluates one
/// expression. Both produce values from the object model and report failures
/// through the standard error taxonomy.
pub trait Evaluator {
    fn execute_string(
        &mut self,
        source: &str,
        name: Option<&str>,
    ) -> RtResult<Value>;

    fn evaluate_expression(
        &mut self,
        expression: &str,
    ) -> RtResult<Value>;
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name reported to plugins.
    pub name: String,
    /// Engine version used for plugin compatibility gating.
    pub version: PluginVersion,
    /// Emit verbose debug events.
    pub debug_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "kestrel".to_string(),
            version: parse_crate_version(),
            debug_mode: false,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from JSON, with defaults for missing fields.
    pub fn from_json(json: &str) -> RtResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| RuntimeError::Value(format!("Invalid engine config: {e}")))
    }
}

fn parse_crate_version() -> PluginVersion {
    let mut parts = env!("CARGO_PKG_VERSION")
        .split('.')
        .map(|p| p.parse::<u32>().unwrap_or(0));
    PluginVersion::new(
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

/// Engine statistics counters.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub functions_registered: usize,
    pub classes_registered: usize,
    pub modules_registered: usize,
    pub scripts_executed: usize,
    pub expressions_evaluated: usize,
    pub total_execution_time: Duration,
}

struct LoadedPlugin {
    path: String,
    info: PluginInfo,
    plugin: Box<dyn Plugin>,
}

/// The embedding engine.
pub struct Engine {
    config: EngineConfig,
    globals: Rc<RefCell<IndexMap<String, Value>>>,
    functions: Rc<RefCell<IndexMap<String, NativeFn>>>,
    classes: IndexMap<String, Rc<NativeClass>>,
    modules: IndexMap<String, Rc<NativeModule>>,
    plugins: Vec<LoadedPlugin>,
    scheduler: Scheduler,
    evaluator: Option<Box<dyn Evaluator>>,
    plugin_resolver: Option<PluginResolver>,
    stats: EngineStats,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        info!(engine = %config.name, version = %config.version, "engine created");
        Self {
            config,
            globals: Rc::new(RefCell::new(IndexMap::new())),
            functions: Rc::new(RefCell::new(IndexMap::new())),
            classes: IndexMap::new(),
            modules: IndexMap::new(),
            plugins: Vec::new(),
            scheduler: Scheduler::new(),
            evaluator: None,
            plugin_resolver: None,
            stats: EngineStats::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Attach the interpreter front-end.
    pub fn set_evaluator(
        &mut self,
        evaluator: Box<dyn Evaluator>,
    ) {
        self.evaluator = Some(evaluator);
    }

    /// Install the resolver that turns a library path into a loaded plugin
    /// library (the `dlopen` shim lives behind this).
    pub fn set_plugin_resolver(
        &mut self,
        resolver: PluginResolver,
    ) {
        self.plugin_resolver = Some(resolver);
    }

    /// Shared handle to the global variable table, for interpreter
    /// integration.
    pub fn globals(&self) -> Rc<RefCell<IndexMap<String, Value>>> {
        self.globals.clone()
    }

    /// Shared handle to the native function table, for interpreter
    /// integration.
    pub fn functions(&self) -> Rc<RefCell<IndexMap<String, NativeFn>>> {
        self.functions.clone()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a native function under `name`. Overwrites silently.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> RtResult<Value> + 'static,
    ) {
        let name = name.into();
        debug!(function = %name, "native function registered");
        self.functions.borrow_mut().insert(name, Rc::new(func));
        self.stats.functions_registered += 1;
    }

    pub fn unregister_function(
        &mut self,
        name: &str,
    ) -> bool {
        self.functions.borrow_mut().shift_remove(name).is_some()
    }

    pub fn has_function(
        &self,
        name: &str,
    ) -> bool {
        self.functions.borrow().contains_key(name)
    }

    pub fn register_class(
        &mut self,
        name: impl Into<String>,
        class: NativeClass,
    ) {
        let name = name.into();
        debug!(class = %name, "native class registered");
        self.classes.insert(name, Rc::new(class));
        self.stats.classes_registered += 1;
    }

    pub fn get_class(
        &self,
        name: &str,
    ) -> Option<Rc<NativeClass>> {
        self.classes.get(name).cloned()
    }

    pub fn register_module(
        &mut self,
        name: impl Into<String>,
        module: NativeModule,
    ) {
        let name = name.into();
        debug!(module = %name, "native module registered");
        self.modules.insert(name, Rc::new(module));
        self.stats.modules_registered += 1;
    }

    pub fn unregister_module(
        &mut self,
        name: &str,
    ) -> bool {
        self.modules.shift_remove(name).is_some()
    }

    /// A registered module as a script value.
    pub fn get_module(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.modules.get(name).map(|m| Value::Module(m.clone()))
    }

    pub fn set_global(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.globals.borrow_mut().insert(name.into(), value);
    }

    pub fn get_global(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute a script through the installed evaluator.
    pub fn execute_string(
        &mut self,
        source: &str,
        name: Option<&str>,
    ) -> RtResult<Value> {
        let mut evaluator = self.evaluator.take().ok_or_else(no_evaluator)?;
        let start = Instant::now();
        let result = evaluator.execute_string(source, name);
        self.stats.total_execution_time += start.elapsed();
        self.stats.scripts_executed += 1;
        self.evaluator = Some(evaluator);
        result
    }

    /// Evaluate a single expression through the installed evaluator.
    pub fn evaluate_expression(
        &mut self,
        expression: &str,
    ) -> RtResult<Value> {
        let mut evaluator = self.evaluator.take().ok_or_else(no_evaluator)?;
        let start = Instant::now();
        let result = evaluator.evaluate_expression(expression);
        self.stats.total_execution_time += start.elapsed();
        self.stats.expressions_evaluated += 1;
        self.evaluator = Some(evaluator);
        result
    }

    /// Call a registered native function by name.
    pub fn call_function(
        &mut self,
        name: &str,
        args: &[Value],
    ) -> RtResult<Value> {
        let func = self.functions.borrow().get(name).cloned();
        let func = func.ok_or_else(|| {
            RuntimeError::Attribute(format!("Function '{name}' is not registered"))
        })?;
        let start = Instant::now();
        let result = func(args);
        self.stats.total_execution_time += start.elapsed();
        result
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    // ========================================================================
    // Plugins
    // ========================================================================

    /// Load a plugin library by path.
    ///
    /// Checks the ABI version, gates on the plugin's minimum engine version,
    /// initializes it behind the panic barrier, and registers its module. A
    /// plugin whose `create_module` fails degrades to an empty module rather
    /// than aborting the host.
    pub fn load_plugin(
        &mut self,
        path: &str,
    ) -> RtResult<PluginInfo> {
        let mut resolver = self.plugin_resolver.take().ok_or_else(|| {
            RuntimeError::Io("No plugin resolver installed".to_string())
        })?;
        let library = resolver(path);
        self.plugin_resolver = Some(resolver);
        let mut library = library?;

        let api_version = library.api_version();
        if api_version != PLUGIN_API_VERSION {
            return Err(RuntimeError::Io(format!(
                "Plugin '{path}' speaks ABI version {api_version}, engine requires {PLUGIN_API_VERSION}"
            )));
        }

        let mut plugin = library.create();
        let info = plugin.info();

        if !self.config.version.is_compatible_with(&info.min_engine_version) {
            return Err(RuntimeError::Io(format!(
                "Plugin '{}' requires engine {} or newer, this engine is {}",
                info.name, info.min_engine_version, self.config.version
            )));
        }

        guard_plugin_call("initialize", || plugin.initialize(self))?;

        let module = match guard_plugin_call("create_module", || plugin.create_module()) {
            Ok(module) => module,
            Err(error) => {
                // The plugin produced no module; degrade to an empty one.
                warn!(plugin = %info.name, %error, "create_module failed, registering empty module");
                NativeModule::new(info.name.clone())
            }
        };
        self.register_module(info.name.clone(), module);

        info!(plugin = %info.name, version = %info.version, "plugin loaded");
        self.plugins.push(LoadedPlugin {
            path: path.to_string(),
            info: info.clone(),
            plugin,
        });
        Ok(info)
    }

    /// Unload a plugin by path: finalize it and drop its module.
    pub fn unload_plugin(
        &mut self,
        path: &str,
    ) -> RtResult<()> {
        let index = self
            .plugins
            .iter()
            .position(|p| p.path == path)
            .ok_or_else(|| RuntimeError::Io(format!("No plugin loaded from '{path}'")))?;
        let mut entry = self.plugins.remove(index);
        let _ = guard_plugin_call("finalize", || {
            entry.plugin.finalize();
            Ok(())
        });
        self.unregister_module(&entry.info.name);
        info!(plugin = %entry.info.name, "plugin unloaded");
        Ok(())
    }

    /// Metadata of every loaded plugin.
    pub fn loaded_plugins(&self) -> Vec<PluginInfo> {
        self.plugins.iter().map(|p| p.info.clone()).collect()
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> EngineStats {
        self.stats.clone()
    }

    pub fn reset_stats(&mut self) {
        self.stats = EngineStats::default();
    }
}

fn no_evaluator() -> RuntimeError {
    RuntimeError::Type(
        "No evaluator installed; attach an interpreter front-end first".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::convert::arg;

    #[test]
    fn test_register_and_call_function() {
        let mut engine = Engine::new();
        engine.register_function("add", |args| {
            let a: i64 = arg("add", args, 0)?;
            let b: i64 = arg("add", args, 1)?;
            Ok(Value::int(a + b))
        });

        assert!(engine.has_function("add"));
        let result = engine
            .call_function("add", &[Value::int(2), Value::int(3)])
            .unwrap();
        assert!(result.equals(&Value::int(5)));

        assert!(matches!(
            engine.call_function("missing", &[]).unwrap_err(),
            RuntimeError::Attribute(_)
        ));

        assert!(engine.unregister_function("add"));
        assert!(!engine.has_function("add"));
    }

    #[test]
    fn test_stats_count_registrations_and_calls() {
        let mut engine = Engine::new();
        engine.register_function("noop", |_| Ok(Value::None));
        engine.register_module("empty", NativeModule::new("empty"));
        engine.register_class("Thing", NativeClass::new("Thing"));

        let stats = engine.stats();
        assert_eq!(stats.functions_registered, 1);
        assert_eq!(stats.modules_registered, 1);
        assert_eq!(stats.classes_registered, 1);
        assert_eq!(stats.scripts_executed, 0);

        engine.reset_stats();
        assert_eq!(engine.stats().functions_registered, 0);
    }

    #[test]
    fn test_execution_requires_evaluator() {
        let mut engine = Engine::new();
        let err = engine.execute_string("1 + 1", None).unwrap_err();
        assert!(err.to_string().contains("evaluator"));
    }

    /// An evaluator stub that answers every request with its input length.
    struct LengthEvaluator;

    impl Evaluator for LengthEvaluator {
        fn execute_string(
            &mut self,
            source: &str,
            _name: Option<&str>,
        ) -> RtResult<Value> {
            Ok(Value::int(source.len() as i64))
        }

        fn evaluate_expression(
            &mut self,
            expression: &str,
        ) -> RtResult<Value> {
            Ok(Value::int(expression.len() as i64))
        }
    }

    #[test]
    fn test_evaluator_seam_and_stats() {
        let mut engine = Engine::new();
        engine.set_evaluator(Box::new(LengthEvaluator));

        let result = engine.execute_string("abcd", Some("test")).unwrap();
        assert!(result.equals(&Value::int(4)));
        let result = engine.evaluate_expression("xy").unwrap();
        assert!(result.equals(&Value::int(2)));

        let stats = engine.stats();
        assert_eq!(stats.scripts_executed, 1);
        assert_eq!(stats.expressions_evaluated, 1);
    }

    #[test]
    fn test_globals_are_shared_with_integrations() {
        let mut engine = Engine::new();
        engine.set_global("answer", Value::int(42));

        let shared = engine.globals();
        assert!(shared
            .borrow()
            .get("answer")
            .unwrap()
            .equals(&Value::int(42)));

        shared
            .borrow_mut()
            .insert("question".to_string(), Value::string("?"));
        assert!(engine.get_global("question").is_some());
    }

    #[test]
    fn test_config_from_json() {
        let config =
            EngineConfig::from_json(r#"{"name": "embedded", "debug_mode": true}"#).unwrap();
        assert_eq!(config.name, "embedded");
        assert!(config.debug_mode);
        assert!(EngineConfig::from_json("not json").is_err());
    }
}
