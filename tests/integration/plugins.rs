//! Plugin protocol integration tests
//!
//! Drives the loader protocol end-to-end with a statically linked plugin
//! behind the `PluginLibrary` seam: version gating, initialization,
//! module registration, graceful degradation, and the ABI macro.

use indexmap::IndexMap;
use kestrel::api::convert::arg;
use kestrel::api::native::{native_fn, NativeModule};
use kestrel::api::plugin::{
    Plugin, PluginBox, PluginInfo, PluginLibrary, PluginVersion, PLUGIN_API_VERSION,
};
use kestrel::engine::{Engine, EngineConfig};
use kestrel::runtime::error::{RtResult, RuntimeError};
use kestrel::runtime::value::Value;

/// A well-behaved math plugin.
#[derive(Default)]
struct MathPlugin {
    min_engine: PluginVersion,
    fail_module_creation: bool,
    panic_in_module_creation: bool,
}

impl MathPlugin {
    fn requiring(min_engine: PluginVersion) -> Self {
        Self {
            min_engine,
            ..Default::default()
        }
    }
}

impl Plugin for MathPlugin {
    fn info(&self) -> PluginInfo {
        let mut info = PluginInfo::new("math", PluginVersion::new(0, 1, 0));
        info.description = "Arithmetic helpers".to_string();
        info.author = "Kestrel Team".to_string();
        info.license = "MIT".to_string();
        info.min_engine_version = self.min_engine;
        info
    }

    fn initialize(
        &mut self,
        engine: &mut Engine,
    ) -> RtResult<()> {
        // Plugins may register functions directly during initialization.
        engine.register_function("math_square", |args| {
            let n: i64 = arg("math_square", args, 0)?;
            Ok(Value::int(n * n))
        });
        Ok(())
    }

    fn create_module(&mut self) -> RtResult<NativeModule> {
        if self.panic_in_module_creation {
            panic!("plugin bug");
        }
        if self.fail_module_creation {
            return Err(RuntimeError::Io("module assembly failed".to_string()));
        }
        let mut module = NativeModule::new("math");
        module.export_function(
            "add",
            native_fn(|args| {
                let a: i64 = arg("add", args, 0)?;
                let b: i64 = arg("add", args, 1)?;
                Ok(Value::int(a + b))
            }),
        );
        module.export_constant("ZERO", Value::int(0));
        Ok(module)
    }

    fn get_symbol(
        &self,
        name: &str,
    ) -> Option<Value> {
        (name == "ZERO").then(|| Value::int(0))
    }

    fn get_all_symbols(&self) -> Option<IndexMap<String, Value>> {
        let mut symbols = IndexMap::new();
        symbols.insert("ZERO".to_string(), Value::int(0));
        Some(symbols)
    }
}

/// A statically linked stand-in for a shared library.
struct StaticLibrary {
    api_version: u32,
    make: std::rc::Rc<dyn Fn() -> Box<dyn Plugin>>,
}

impl PluginLibrary for StaticLibrary {
    fn api_version(&self) -> u32 {
        self.api_version
    }

    fn create(&mut self) -> Box<dyn Plugin> {
        (self.make)()
    }
}

fn engine_at(version: PluginVersion) -> Engine {
    let config = EngineConfig {
        version,
        ..Default::default()
    };
    Engine::with_config(config)
}

fn install_resolver(
    engine: &mut Engine,
    api_version: u32,
    make: impl Fn() -> Box<dyn Plugin> + 'static,
) {
    let make: std::rc::Rc<dyn Fn() -> Box<dyn Plugin>> = std::rc::Rc::new(make);
    engine.set_plugin_resolver(Box::new(move |path| {
        if path.ends_with(".so") {
            Ok(Box::new(StaticLibrary {
                api_version,
                make: make.clone(),
            }) as Box<dyn PluginLibrary>)
        } else {
            Err(RuntimeError::Io(format!("Cannot open '{path}'")))
        }
    }));
}

#[test]
fn load_plugin_registers_module_and_initializes() {
    let mut engine = engine_at(PluginVersion::new(1, 5, 0));
    install_resolver(&mut engine, PLUGIN_API_VERSION, || {
        Box::new(MathPlugin::requiring(PluginVersion::new(1, 3, 0)))
    });

    let info = engine.load_plugin("math.so").unwrap();
    assert_eq!(info.name, "math");

    // initialize() registered a function on the engine.
    let squared = engine
        .call_function("math_square", &[Value::int(6)])
        .unwrap();
    assert!(squared.equals(&Value::int(36)));

    // create_module() produced the module, reachable as a value.
    let module = engine.get_module("math").unwrap();
    let add = module.get_member("add").unwrap();
    assert!(add
        .call_method("call", &[Value::int(1), Value::int(2)])
        .unwrap()
        .equals(&Value::int(3)));

    assert_eq!(engine.loaded_plugins().len(), 1);
}

#[test]
fn version_gate_accepts_only_compatible_minimums() {
    // Engine 1.5.0 accepts a plugin requiring 1.3.0...
    let mut engine = engine_at(PluginVersion::new(1, 5, 0));
    install_resolver(&mut engine, PLUGIN_API_VERSION, || {
        Box::new(MathPlugin::requiring(PluginVersion::new(1, 3, 0)))
    });
    assert!(engine.load_plugin("math.so").is_ok());

    // ...but not 2.0.0...
    let mut engine = engine_at(PluginVersion::new(1, 5, 0));
    install_resolver(&mut engine, PLUGIN_API_VERSION, || {
        Box::new(MathPlugin::requiring(PluginVersion::new(2, 0, 0)))
    });
    assert!(engine.load_plugin("math.so").is_err());

    // ...and not 1.6.0.
    let mut engine = engine_at(PluginVersion::new(1, 5, 0));
    install_resolver(&mut engine, PLUGIN_API_VERSION, || {
        Box::new(MathPlugin::requiring(PluginVersion::new(1, 6, 0)))
    });
    let err = engine.load_plugin("math.so").unwrap_err();
    assert!(err.to_string().contains("requires engine"));
}

#[test]
fn abi_version_mismatch_is_rejected() {
    let mut engine = engine_at(PluginVersion::new(1, 5, 0));
    install_resolver(&mut engine, PLUGIN_API_VERSION + 1, || {
        Box::new(MathPlugin::requiring(PluginVersion::new(1, 0, 0)))
    });
    let err = engine.load_plugin("math.so").unwrap_err();
    assert!(err.to_string().contains("ABI version"));
}

#[test]
fn failing_create_module_degrades_to_empty_module() {
    let mut engine = engine_at(PluginVersion::new(1, 5, 0));
    install_resolver(&mut engine, PLUGIN_API_VERSION, || {
        Box::new(MathPlugin {
            min_engine: PluginVersion::new(1, 0, 0),
            fail_module_creation: true,
            ..Default::default()
        })
    });

    // Loading still succeeds; the module is just empty.
    let info = engine.load_plugin("math.so").unwrap();
    let module = engine.get_module(&info.name).unwrap();
    assert!(module.get_member("add").is_err());
}

#[test]
fn panicking_plugin_never_unwinds_across_the_boundary() {
    let mut engine = engine_at(PluginVersion::new(1, 5, 0));
    install_resolver(&mut engine, PLUGIN_API_VERSION, || {
        Box::new(MathPlugin {
            min_engine: PluginVersion::new(1, 0, 0),
            panic_in_module_creation: true,
            ..Default::default()
        })
    });

    // The panic is absorbed and the plugin degrades to an empty module.
    let info = engine.load_plugin("math.so").unwrap();
    assert!(engine.get_module(&info.name).is_some());
}

#[test]
fn unload_finalizes_and_removes_the_module() {
    let mut engine = engine_at(PluginVersion::new(1, 5, 0));
    install_resolver(&mut engine, PLUGIN_API_VERSION, || {
        Box::new(MathPlugin::requiring(PluginVersion::new(1, 0, 0)))
    });

    engine.load_plugin("math.so").unwrap();
    engine.unload_plugin("math.so").unwrap();
    assert!(engine.get_module("math").is_none());
    assert!(engine.loaded_plugins().is_empty());
    assert!(engine.unload_plugin("math.so").is_err());
}

#[test]
fn optional_hooks_answer_symbols() {
    let plugin = MathPlugin::requiring(PluginVersion::new(1, 0, 0));
    assert!(plugin.get_symbol("ZERO").unwrap().equals(&Value::int(0)));
    assert!(plugin.get_symbol("ONE").is_none());
    assert_eq!(plugin.get_all_symbols().unwrap().len(), 1);
    assert!(plugin.handle_custom_import("anything").is_none());
    assert!(plugin.health_check().is_ok());
}

// The ABI macro must expand to the three fixed exports.
kestrel::declare_plugin!(MathPlugin, MathPlugin::default);

#[test]
fn declared_abi_exports_work() {
    assert_eq!(kestrel_get_api_version(), PLUGIN_API_VERSION);

    let raw: *mut PluginBox = kestrel_create_plugin();
    assert!(!raw.is_null());
    let name = unsafe { (*raw).0.info().name.clone() };
    assert_eq!(name, "math");
    unsafe { kestrel_destroy_plugin(raw) };
}
