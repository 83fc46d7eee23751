//! Function and class translation through the context caches.

use std::sync::Arc;

use num_bigint::BigInt;

use solverforge_bytecode::RawCode;
use solverforge_interop::native::{ClassKind, CodeObject, NativeFunction};
use solverforge_interop::{
    FallbackReason, InteropError, NativeClass, NativeRef, TargetShape,
};
use solverforge_test::{
    bridge, empty_class, module_scope, point, point_class, FunctionBuilder, RecordingTranslator,
};

fn shape() -> TargetShape {
    TargetShape::new("java.util.function.Function").with_arity(1)
}

#[test]
fn test_unit_carries_code_tables() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[("LIMIT", NativeRef::int(10))]);
    let function = FunctionBuilder::new("clamp", &scope)
        .module("limits")
        .param("value")
        .constant(NativeRef::int(0))
        .global("LIMIT")
        .build();

    let unit = bridge.build_function(&function).unwrap();
    assert_eq!(unit.name, "clamp");
    assert_eq!(unit.qualified_name, "limits.clamp");
    assert_eq!(unit.co_names, vec!["LIMIT"]);
    assert_eq!(unit.varnames, vec!["value"]);
    assert_eq!(unit.argcount, 1);
    assert_eq!(unit.constants.len(), 1);
    assert_eq!(unit.instructions.first().map(|i| i.name()), Some("RESUME"));
    assert_eq!(unit.instructions.last().map(|i| i.name()), Some("RETURN_VALUE"));
    assert!(unit.exception_ranges.is_empty());
    assert_eq!(
        unit.globals.get("LIMIT").and_then(|v| v.as_int().cloned()),
        Some(BigInt::from(10))
    );
}

#[test]
fn test_protected_body_has_exception_range() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[]);
    let function = FunctionBuilder::new("guarded", &scope)
        .constant(NativeRef::none())
        .protected()
        .build();

    let unit = bridge.build_function(&function).unwrap();
    assert_eq!(unit.exception_ranges.len(), 1);
    assert!(unit.exception_ranges[0].push_last_instr);
}

#[test]
fn test_reserved_and_invalid_names_are_sanitized() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[]);
    let function = FunctionBuilder::new("<lambda>", &scope)
        .param("class")
        .param("new")
        .global("a.b")
        .global("a_b")
        .build();

    let unit = bridge.build_function(&function).unwrap();
    assert_eq!(unit.name, "_lambda_");
    assert_eq!(unit.varnames, vec!["$class", "$new"]);
    assert_eq!(unit.co_names, vec!["a_b", "a_b$1"]);
    assert!(unit.parameter_hint("$class").is_some());
}

#[test]
fn test_globals_shared_and_extended_per_scope() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[
        ("LIMIT", NativeRef::int(10)),
        ("NAME", NativeRef::str("fleet")),
    ]);
    let first = FunctionBuilder::new("first", &scope).global("LIMIT").build();
    let second = FunctionBuilder::new("second", &scope)
        .global("NAME")
        .global("LIMIT")
        .global("undefined")
        .build();

    let first_unit = bridge.build_function(&first).unwrap();
    assert_eq!(first_unit.globals.names(), vec!["LIMIT"]);
    let limit = first_unit.globals.get("LIMIT").unwrap();

    let second_unit = bridge.build_function(&second).unwrap();
    assert!(second_unit.globals.ptr_eq(&first_unit.globals));
    assert_eq!(first_unit.globals.names(), vec!["LIMIT", "NAME"]);
    assert!(second_unit.globals.get("LIMIT").unwrap().ptr_eq(&limit));
    assert!(!second_unit.globals.contains("undefined"));

    let other = FunctionBuilder::new("other", &module_scope(&[("LIMIT", NativeRef::int(1))]))
        .global("LIMIT")
        .build();
    let other_unit = bridge.build_function(&other).unwrap();
    assert!(!other_unit.globals.ptr_eq(&first_unit.globals));
}

#[test]
fn test_bridge_modules_stay_out_of_globals() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[
        ("jpype", NativeRef::module("jpype", NativeRef::dict(Vec::new()))),
        ("math", NativeRef::module("math", NativeRef::dict(Vec::new()))),
    ]);
    let function = FunctionBuilder::new("uses_modules", &scope)
        .global("jpype")
        .global("math")
        .build();

    let unit = bridge.build_function(&function).unwrap();
    assert!(!unit.globals.contains("jpype"));
    assert!(unit.globals.contains("math"));
}

#[test]
fn test_closure_cells_convert() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[]);
    let cell = NativeRef::cell(Some(NativeRef::int(5)));
    let function = FunctionBuilder::new("counter", &scope)
        .free("count", cell)
        .build();

    let unit = bridge.build_function(&function).unwrap();
    assert_eq!(unit.freevars, vec!["count"]);
    assert_eq!(unit.closure.len(), 1);
    let contents = unit.closure[0].cell_get().unwrap();
    assert_eq!(contents.as_int(), Some(&BigInt::from(5)));
}

#[test]
fn test_constants_shared_across_units() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[]);
    let table = NativeRef::tuple(vec![NativeRef::int(1), NativeRef::int(2)]);
    let first = FunctionBuilder::new("first", &scope).constant(table.clone()).build();
    let second = FunctionBuilder::new("second", &scope).constant(table).build();

    let first_unit = bridge.build_function(&first).unwrap();
    let second_unit = bridge.build_function(&second).unwrap();
    assert!(first_unit.constants[0].ptr_eq(&second_unit.constants[0]));
}

#[test]
fn test_defaults_and_kwdefaults_convert() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[]);
    let function = FunctionBuilder::new("configure", &scope)
        .param("retries")
        .kwonly("strict")
        .default_value(NativeRef::int(3))
        .kwdefault("strict", NativeRef::bool(true))
        .build();

    let unit = bridge.build_function(&function).unwrap();
    assert_eq!(unit.kwonlyargcount, 1);
    assert_eq!(unit.defaults.len(), 1);
    assert_eq!(unit.defaults[0].as_int(), Some(&BigInt::from(3)));
    assert!(unit.kwdefaults.contains_key("strict"));
}

#[test]
fn test_bare_code_object_builds() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[]);
    let code = FunctionBuilder::new("body", &scope).param("x").code();

    let unit = bridge.build_function(&NativeRef::code(code.into_ref())).unwrap();
    assert_eq!(unit.name, "body");
    assert!(unit.globals.is_empty());
    assert!(unit.parameter_hint("x").unwrap().is_object());
}

#[test]
fn test_non_callable_is_rejected() {
    let bridge = bridge(&RecordingTranslator::new());
    let err = bridge.build_function(&NativeRef::int(1)).unwrap_err();
    assert!(matches!(err, InteropError::InvalidState(_)));
}

#[test]
fn test_translation_is_cached_per_shape() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let scope = module_scope(&[]);
    let function = FunctionBuilder::new("apply", &scope).param("x").build();

    let first = bridge.translate(&function, &shape(), &[]).unwrap();
    let second = bridge.translate(&function, &shape(), &[]).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(translator.function_calls(), 1);
    assert_eq!(first.class_name, "org.solverforge.generated.apply$Impl");

    let other_shape = TargetShape::new("java.util.function.Supplier").with_arity(0);
    let third = bridge.translate(&function, &other_shape, &[]).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(translator.function_calls(), 2);
    assert_eq!(bridge.context().function_count(), 2);
}

#[test]
fn test_failed_translation_is_not_cached() {
    let translator = RecordingTranslator::failing(&["broken"]);
    let bridge = bridge(&translator);
    let scope = module_scope(&[]);
    let function = FunctionBuilder::new("broken", &scope).build();

    let err = bridge.translate(&function, &shape(), &[]).unwrap_err();
    match &err {
        InteropError::Translation { name, foreign, .. } => {
            assert_eq!(name, "app.broken");
            assert_eq!(foreign.message, "rejected by fixture");
            assert_eq!(foreign.diagnostics.len(), 1);
        }
        other => panic!("expected a translation error, got {other:?}"),
    }
    assert_eq!(bridge.context().function_count(), 0);

    bridge.translate(&function, &shape(), &[]).unwrap_err();
    assert_eq!(translator.function_calls(), 2);
}

#[test]
fn test_older_dialect_builds() {
    let translator = RecordingTranslator::new();
    let config = solverforge_interop::BridgeConfig::default()
        .with_runtime_version(solverforge_interop::RuntimeVersion::PY_3_10);
    let bridge = solverforge_interop::Bridge::new(config, translator).unwrap();
    let scope = module_scope(&[("LIMIT", NativeRef::int(1))]);
    let function = FunctionBuilder::new("legacy", &scope)
        .version(solverforge_interop::RuntimeVersion::PY_3_10)
        .global("LIMIT")
        .build();

    let unit = bridge.build_function(&function).unwrap();
    assert_eq!(unit.source_version, solverforge_interop::RuntimeVersion::PY_3_10);
    assert_eq!(unit.instructions.first().map(|i| i.name()), Some("LOAD_GLOBAL"));
    assert!(unit.globals.contains("LIMIT"));
}

#[test]
fn test_class_compiled_once() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let class = point_class(&module_scope(&[]));

    let first = bridge.compile_class(&class).unwrap();
    let second = bridge.compile_class(&class).unwrap();
    assert_eq!(first, second);
    assert!(first.is_compiled());
    assert_eq!(translator.class_calls(), 1);
    assert_eq!(
        first.definition().map(|d| d.binary_name.as_str()),
        Some("org.solverforge.generated.geometry.Point")
    );

    // Instances reuse the cached descriptor.
    bridge.to_foreign(&point(&class, 1, 2)).unwrap();
    assert_eq!(translator.class_calls(), 1);
}

#[test]
fn test_class_unit_sorts_members() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let class = point_class(&module_scope(&[]));

    bridge.compile_class(&class).unwrap();
    let unit = translator.class("Point").unwrap();
    assert!(unit.instance_methods.contains_key("norm"));
    assert!(unit.static_methods.contains_key("origin"));
    assert!(unit.class_methods.is_empty());
    assert!(unit.static_attributes.contains_key("DIMENSIONS"));
    assert!(!unit.static_attributes.contains_key("__module__"));
    assert!(unit.superclasses.is_empty());
}

#[test]
fn test_colliding_member_names_get_suffixes() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let scope = module_scope(&[]);
    let method = FunctionBuilder::new("scale", &scope).param("self").build();
    let helper = FunctionBuilder::new("helper", &scope).build();
    let class = NativeClass::new("Gauge", "meters")
        .with_member("scale_by", NativeRef::int(3))
        .with_member("scale-by", method)
        .with_member("scale.by", NativeRef::staticmethod(helper))
        .into_ref();

    bridge.compile_class(&class).unwrap();
    let unit = translator.class("Gauge").unwrap();
    assert!(unit.static_attributes.contains_key("scale_by"));
    assert!(unit.instance_methods.contains_key("scale_by$1"));
    assert!(unit.static_methods.contains_key("scale_by$2"));
}

#[test]
fn test_mutually_recursive_classes() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let employee = empty_class("Employee", "staff");
    let shift = NativeClass::new("Shift", "staff")
        .with_member("assignee_type", NativeRef::class_object(&employee))
        .into_ref();
    employee
        .dict
        .write()
        .insert("shift_type".to_string(), NativeRef::class_object(&shift));

    let employee_type = bridge.compile_class(&employee).unwrap();
    assert!(employee_type.is_compiled());
    assert_eq!(translator.class_calls(), 2);

    let shift_type = bridge.context().cached_class_type(&shift).unwrap();
    assert!(shift_type.is_compiled());

    let shift_unit = translator.class("Shift").unwrap();
    let referenced = shift_unit.static_attributes["assignee_type"].as_type().unwrap().clone();
    assert_eq!(referenced, employee_type);
}

#[test]
fn test_subclass_lists_compiled_superclass() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let base = empty_class("Base", "model");
    let derived = NativeClass::new("Derived", "model")
        .with_bases(vec![base.clone()])
        .into_ref();

    let derived_type = bridge.compile_class(&derived).unwrap();
    let base_type = bridge.context().cached_class_type(&base).unwrap();
    assert_eq!(derived_type.superclasses(), &[base_type]);
}

/// `A.SUB = B` with `B(A)`: B is reached while A is still being built.
fn base_referencing_subclass() -> (Arc<NativeClass>, Arc<NativeClass>) {
    let a = empty_class("A", "tree");
    let b = NativeClass::new("B", "tree")
        .with_bases(vec![a.clone()])
        .into_ref();
    a.dict
        .write()
        .insert("SUB".to_string(), NativeRef::class_object(&b));
    (a, b)
}

#[test]
fn test_subclass_waits_for_rejected_base() {
    let translator = RecordingTranslator::failing(&["A"]);
    let bridge = bridge(&translator);
    let (a, b) = base_referencing_subclass();

    let a_type = bridge.context().class_type(&a);
    let b_type = bridge.context().class_type(&b);

    assert!(a_type.is_opaque());
    assert!(b_type.is_opaque());
    assert_eq!(
        b_type.fallback_reason(),
        Some(&FallbackReason::OpaqueSuperclass("tree.A".to_string()))
    );
    assert!(translator.class("B").is_none());
}

#[test]
fn test_subclass_compiles_after_its_base() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let (a, b) = base_referencing_subclass();

    let a_type = bridge.compile_class(&a).unwrap();
    let b_type = bridge.context().cached_class_type(&b).unwrap();

    assert!(b_type.is_compiled());
    assert_eq!(b_type.superclasses(), &[a_type.clone()]);
    let order: Vec<_> = translator.classes().into_iter().map(|unit| unit.name).collect();
    assert_eq!(order, vec!["A", "B"]);

    let a_unit = translator.class("A").unwrap();
    assert_eq!(a_unit.static_attributes["SUB"].as_type(), Some(&b_type));
}

#[test]
fn test_opaque_fallbacks() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);

    let bridge_class = empty_class("Facade", "solverforge.api");
    let ty = bridge.compile_class(&bridge_class).unwrap();
    assert_eq!(
        ty.fallback_reason(),
        Some(&FallbackReason::BridgeModule("solverforge.api".to_string()))
    );

    let marker = NativeClass::new("Comparable", "app")
        .with_kind(ClassKind::AbstractBaseMarker)
        .into_ref();
    assert_eq!(
        bridge.compile_class(&marker).unwrap().fallback_reason(),
        Some(&FallbackReason::AbstractBase)
    );

    let child = NativeClass::new("Child", "app")
        .with_bases(vec![bridge_class])
        .into_ref();
    assert!(matches!(
        bridge.compile_class(&child).unwrap().fallback_reason(),
        Some(FallbackReason::OpaqueSuperclass(_))
    ));

    assert_eq!(translator.class_calls(), 0);
}

#[test]
fn test_method_failure_makes_class_opaque() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let scope = module_scope(&[]);
    let broken_code = CodeObject::new(RawCode::new("run", vec![0x97])).into_ref();
    let method = NativeRef::function(NativeFunction::new(broken_code, scope, "app"));
    let class = NativeClass::new("Job", "app")
        .with_member("run", method)
        .into_ref();

    let ty = bridge.compile_class(&class).unwrap();
    assert!(matches!(
        ty.fallback_reason(),
        Some(FallbackReason::MethodFailed { method, .. }) if method == "run"
    ));

    let instance = NativeRef::instance(&class, vec![("id", NativeRef::int(1))]);
    let foreign = bridge.to_foreign(&instance).unwrap();
    assert!(foreign.as_opaque().is_some());
}

#[test]
fn test_rejected_class_reports_and_stays_opaque() {
    let translator = RecordingTranslator::failing(&["Broken"]);
    let bridge = bridge(&translator);
    let class = empty_class("Broken", "app");

    let err = bridge.compile_class(&class).unwrap_err();
    assert!(matches!(err, InteropError::Translation { .. }));

    let foreign = bridge.to_foreign(&NativeRef::instance(&class, Vec::new())).unwrap();
    assert!(foreign.as_opaque().is_some());
    assert_eq!(translator.class_calls(), 1);
}

#[test]
fn test_clear_drops_caches() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let class = empty_class("Cached", "app");

    let before = bridge.compile_class(&class).unwrap();
    bridge.clear();
    assert_eq!(bridge.context().class_count(), 0);

    let after = bridge.compile_class(&class).unwrap();
    assert_ne!(before, after);
    assert_eq!(translator.class_calls(), 2);
}
