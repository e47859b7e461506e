//! End-to-end pipeline scenarios.

use std::path::Path;

use indexmap::IndexMap;

use ember_codegen::scheduler::{get_variable, StartFn};
use ember_codegen::{Expression, Handle, Resume, Statement};
use ember_config::schema::{Schema, Validator};
use ember_config::{ConfigValue, Ident};
use ember_pipeline::{run, run_and_write, Component, ComponentRegistry, Error};

/// Test component with pluggable behavior.
struct Fake {
    domain: &'static str,
    priority: f64,
    schema: Option<fn() -> Validator>,
    make: fn() -> StartFn,
}

impl Component for Fake {
    fn domain(&self) -> &'static str {
        self.domain
    }

    fn priority(&self) -> f64 {
        self.priority
    }

    fn schema(&self) -> Option<Validator> {
        self.schema.map(|f| f())
    }

    fn to_code(&self, _config: ConfigValue) -> StartFn {
        (self.make)()
    }
}

fn core_stanza(name: &str) -> ConfigValue {
    let mut core = IndexMap::new();
    core.insert("name".to_string(), ConfigValue::string(name));
    core.insert("platform".to_string(), ConfigValue::string("esp32"));
    core.insert("board".to_string(), ConfigValue::string("b"));
    ConfigValue::map(core)
}

fn document(name: &str, extra: &[(&str, ConfigValue)]) -> ConfigValue {
    let mut doc = IndexMap::new();
    doc.insert("core".to_string(), core_stanza(name));
    for (k, v) in extra {
        doc.insert(k.to_string(), v.clone());
    }
    ConfigValue::map(doc)
}

fn registry_with(fakes: Vec<Fake>) -> ComponentRegistry {
    let mut registry = ComponentRegistry::with_builtins();
    for fake in fakes {
        registry.register(Box::new(fake));
    }
    registry
}

// S1: a minimal document produces a setup() that records the node name and
// a board define.
#[test]
fn test_trivial_document() {
    let registry = ComponentRegistry::with_builtins();
    let build = run(&registry, Path::new("dev1.yaml"), document("dev1", &[]), None).unwrap();

    assert!(build.artifacts.main_cpp.contains("void setup() {"));
    assert!(build
        .artifacts
        .main_cpp
        .contains("App.pre_setup(\"dev1\", \"dev1\");"));
    assert!(build
        .artifacts
        .defines_h
        .contains("#define ESPHOME_BOARD \"b\""));
}

// S2: a forward reference resolves once the producer registers the id, and
// the producer's declaration lands before the consumer's use.
#[test]
fn test_forward_reference() {
    fn task_a() -> StartFn {
        Box::new(|_ctx| {
            Ok(get_variable(Ident::use_site("x"), |ctx, handle| {
                ctx.add(Statement::expr(Expression::call(
                    "A_use",
                    vec![Expression::raw(handle.expr())],
                )));
                Ok(Resume::Done)
            }))
        })
    }
    fn task_b() -> StartFn {
        Box::new(|ctx| {
            ctx.add(Statement::raw("b::B b_instance;"));
            ctx.register_variable(
                Ident::declare(Some("x"), "b::B"),
                Handle::pointer("&b_instance"),
            )?;
            Ok(Resume::Done)
        })
    }

    let registry = registry_with(vec![
        Fake {
            domain: "a",
            priority: 0.0,
            schema: None,
            make: task_a,
        },
        Fake {
            domain: "b",
            priority: 0.0,
            schema: None,
            make: task_b,
        },
    ]);
    let doc = document(
        "dev1",
        &[("a", ConfigValue::empty_map()), ("b", ConfigValue::empty_map())],
    );
    let build = run(&registry, Path::new("dev1.yaml"), doc, None).unwrap();

    let main = &build.artifacts.main_cpp;
    let decl = main.find("b::B b_instance;").unwrap();
    let usage = main.find("A_use(&b_instance);").unwrap();
    assert!(decl < usage);
}

// S3: with a higher priority and no await, A's statements precede B's.
#[test]
fn test_priority_ordering() {
    fn task_a() -> StartFn {
        Box::new(|ctx| {
            ctx.add(Statement::raw("from_a();"));
            Ok(Resume::Done)
        })
    }
    fn task_b() -> StartFn {
        Box::new(|ctx| {
            ctx.add(Statement::raw("from_b();"));
            Ok(Resume::Done)
        })
    }

    let registry = registry_with(vec![
        Fake {
            domain: "b",
            priority: 0.0,
            schema: None,
            make: task_b,
        },
        Fake {
            domain: "a",
            priority: 100.0,
            schema: None,
            make: task_a,
        },
    ]);
    // B appears before A in the document; priority must still win.
    let doc = document(
        "dev1",
        &[("b", ConfigValue::empty_map()), ("a", ConfigValue::empty_map())],
    );
    let build = run(&registry, Path::new("dev1.yaml"), doc, None).unwrap();

    let main = &build.artifacts.main_cpp;
    assert!(main.find("from_a();").unwrap() < main.find("from_b();").unwrap());
}

// S4: two tasks awaiting each other's ids abort with a diagnostic naming
// both components.
#[test]
fn test_deadlock_names_both_components() {
    fn wait_for_b() -> StartFn {
        Box::new(|_ctx| {
            Ok(get_variable(Ident::use_site("id_b"), |_ctx, _h| {
                Ok(Resume::Done)
            }))
        })
    }
    fn wait_for_a() -> StartFn {
        Box::new(|_ctx| {
            Ok(get_variable(Ident::use_site("id_a"), |_ctx, _h| {
                Ok(Resume::Done)
            }))
        })
    }

    let registry = registry_with(vec![
        Fake {
            domain: "a",
            priority: 0.0,
            schema: None,
            make: wait_for_b,
        },
        Fake {
            domain: "b",
            priority: 0.0,
            schema: None,
            make: wait_for_a,
        },
    ]);
    let doc = document(
        "dev1",
        &[("a", ConfigValue::empty_map()), ("b", ConfigValue::empty_map())],
    );
    let err = run(&registry, Path::new("dev1.yaml"), doc, None).unwrap_err();

    let Error::Codegen(ember_codegen::Error::Deadlock { remaining }) = err else {
        panic!("expected deadlock, got {err}");
    };
    let domains: Vec<&str> = remaining.iter().map(|t| t.domain.as_str()).collect();
    assert!(domains.contains(&"a"));
    assert!(domains.contains(&"b"));
    let awaited: Vec<&str> = remaining
        .iter()
        .filter_map(|t| t.awaited.as_deref())
        .collect();
    assert!(awaited.contains(&"id_a"));
    assert!(awaited.contains(&"id_b"));
}

// S5: two stanzas declaring the same manual id fail before generation, and
// nothing is written.
#[test]
fn test_duplicate_manual_id() {
    fn id_schema() -> Validator {
        Schema::new().generate_id("id", "fake::Fake").into_validator()
    }
    fn noop() -> StartFn {
        Box::new(|_ctx| Ok(Resume::Done))
    }

    let registry = registry_with(vec![
        Fake {
            domain: "a",
            priority: 0.0,
            schema: Some(id_schema),
            make: noop,
        },
        Fake {
            domain: "b",
            priority: 0.0,
            schema: Some(id_schema),
            make: noop,
        },
    ]);
    let mut with_id = IndexMap::new();
    with_id.insert("id".to_string(), ConfigValue::string("foo"));
    let stanza = ConfigValue::map(with_id);
    let doc = document("dev1", &[("a", stanza.clone()), ("b", stanza)]);

    let build_path = std::env::temp_dir().join(format!("ember-dup-{}", std::process::id()));
    let err = run_and_write(
        &registry,
        Path::new("dev1.yaml"),
        doc,
        Some(build_path.clone()),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Codegen(ember_codegen::Error::DuplicateId(name)) if name == "foo"
    ));
    assert!(!build_path.exists());
}

// S6: repeated and unpinned requests for the same library serialize as one
// pinned lib_deps entry.
#[test]
fn test_library_merge() {
    fn add_libs() -> StartFn {
        Box::new(|ctx| {
            ctx.add_library(ember_codegen::Library::new("lib", Some("1.0.0".into()), None))?;
            ctx.add_library(ember_codegen::Library::new("lib", None, None))?;
            ctx.add_library(ember_codegen::Library::new("lib", Some("1.0.0".into()), None))?;
            Ok(Resume::Done)
        })
    }

    let registry = registry_with(vec![Fake {
        domain: "a",
        priority: 0.0,
        schema: None,
        make: add_libs,
    }]);
    let doc = document("dev1", &[("a", ConfigValue::empty_map())]);
    let build = run(&registry, Path::new("dev1.yaml"), doc, None).unwrap();

    let ini = &build.artifacts.platformio_ini;
    assert_eq!(ini.matches("lib@1.0.0").count(), 1);
    assert_eq!(ini.matches("    lib").count(), 1);
}

// Determinism: two runs over the same input render byte-identical output.
#[test]
fn test_determinism() {
    let doc = document(
        "dev1",
        &[
            ("logger", ConfigValue::empty_map()),
            ("wifi", {
                let mut wifi = IndexMap::new();
                wifi.insert("ssid".to_string(), ConfigValue::string("net"));
                ConfigValue::map(wifi)
            }),
        ],
    );
    let registry = ComponentRegistry::with_builtins();
    let a = run(&registry, Path::new("dev1.yaml"), doc.clone(), None).unwrap();
    let b = run(&registry, Path::new("dev1.yaml"), doc, None).unwrap();
    assert_eq!(a.artifacts, b.artifacts);
}

// Emission order for equal priorities follows document order.
#[test]
fn test_equal_priority_document_order() {
    fn task_a() -> StartFn {
        Box::new(|ctx| {
            ctx.add(Statement::raw("first();"));
            Ok(Resume::Done)
        })
    }
    fn task_b() -> StartFn {
        Box::new(|ctx| {
            ctx.add(Statement::raw("second();"));
            Ok(Resume::Done)
        })
    }

    let registry = registry_with(vec![
        Fake {
            domain: "a",
            priority: 0.0,
            schema: None,
            make: task_a,
        },
        Fake {
            domain: "b",
            priority: 0.0,
            schema: None,
            make: task_b,
        },
    ]);
    let doc = document(
        "dev1",
        &[("a", ConfigValue::empty_map()), ("b", ConfigValue::empty_map())],
    );
    let build = run(&registry, Path::new("dev1.yaml"), doc, None).unwrap();
    let main = &build.artifacts.main_cpp;
    assert!(main.find("first();").unwrap() < main.find("second();").unwrap());
}

// Schema idempotence: a validated document validates to itself.
#[test]
fn test_validated_document_is_fixed_point() {
    use ember_pipeline::validate::validate_document;

    let registry = ComponentRegistry::with_builtins();
    let mut doc = document("dev1", &[("logger", ConfigValue::empty_map())]);
    validate_document(&mut doc, &registry).unwrap();
    let once = doc.clone();
    validate_document(&mut doc, &registry).unwrap();
    assert_eq!(doc, once);
}

// Dependency closure: auto-loaded domains end up configured and loaded.
#[test]
fn test_dependency_closure() {
    struct NeedsLogger;
    impl Component for NeedsLogger {
        fn domain(&self) -> &'static str {
            "needs_logger"
        }
        fn dependencies(&self) -> &'static [&'static str] {
            &["logger"]
        }
        fn auto_load(&self) -> &'static [&'static str] {
            &["logger"]
        }
        fn to_code(&self, _config: ConfigValue) -> StartFn {
            Box::new(|_ctx| Ok(Resume::Done))
        }
    }

    let mut registry = ComponentRegistry::with_builtins();
    registry.register(Box::new(NeedsLogger));
    let doc = document("dev1", &[("needs_logger", ConfigValue::empty_map())]);
    let build = run(&registry, Path::new("dev1.yaml"), doc, None).unwrap();

    assert!(build.context.loaded_integrations().contains("logger"));
    assert!(build.context.document().get("logger").is_some());
    assert!(build.artifacts.defines_h.contains("#define USE_LOGGER"));
}

// MULTI_CONF: a list stanza becomes one generation task per element.
#[test]
fn test_multi_conf_list() {
    struct Multi;
    impl Component for Multi {
        fn domain(&self) -> &'static str {
            "multi"
        }
        fn multi_conf(&self) -> bool {
            true
        }
        fn to_code(&self, config: ConfigValue) -> StartFn {
            Box::new(move |ctx| {
                let tag = config.get("tag").and_then(|v| v.as_str()).unwrap_or("?");
                ctx.add(Statement::raw(format!("multi_{}();", tag)));
                Ok(Resume::Done)
            })
        }
    }

    let mut registry = ComponentRegistry::with_builtins();
    registry.register(Box::new(Multi));
    let items: Vec<ConfigValue> = ["one", "two"]
        .iter()
        .map(|tag| {
            let mut m = IndexMap::new();
            m.insert("tag".to_string(), ConfigValue::string(*tag));
            ConfigValue::map(m)
        })
        .collect();
    let doc = document("dev1", &[("multi", ConfigValue::list(items))]);
    let build = run(&registry, Path::new("dev1.yaml"), doc, None).unwrap();

    let main = &build.artifacts.main_cpp;
    assert!(main.contains("multi_one();"));
    assert!(main.contains("multi_two();"));
    assert!(main.find("multi_one();").unwrap() < main.find("multi_two();").unwrap());
}

// Full stack: logger + wifi end to end.
#[test]
fn test_full_builtin_stack() {
    let mut wifi = IndexMap::new();
    wifi.insert("ssid".to_string(), ConfigValue::string("HomeNet"));
    wifi.insert("password".to_string(), ConfigValue::string("hunter2"));
    let doc = document(
        "dev1",
        &[
            ("logger", ConfigValue::empty_map()),
            ("wifi", ConfigValue::map(wifi)),
        ],
    );
    let registry = ComponentRegistry::with_builtins();
    let build = run(&registry, Path::new("dev1.yaml"), doc, None).unwrap();

    let main = &build.artifacts.main_cpp;
    // Logger (priority 90) must set up before wifi (priority 40).
    let logger_decl = main.find("new logger::Logger(115200)").unwrap();
    let wifi_decl = main.find("new wifi::WiFiComponent()").unwrap();
    assert!(logger_decl < wifi_decl);
    assert!(main.contains("set_ssid(\"HomeNet\")"));
    assert!(main.contains("set_password(\"hunter2\")"));
    assert_eq!(build.context.address(), "dev1.local");

    let ini = &build.artifacts.platformio_ini;
    assert!(ini.contains("[env:dev1]"));
    assert!(ini.contains("platform = espressif32"));
    assert!(ini.contains("board = b"));
    assert!(ini.contains("WiFi"));
}
