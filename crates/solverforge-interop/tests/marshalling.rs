//! Object-graph marshalling through the bridge facade.

use num_bigint::BigInt;

use solverforge_interop::foreign::ForeignValue;
use solverforge_interop::native::deep_eq;
use solverforge_interop::{ForeignRef, IdentityMemo, InteropError, NativeRef, NativeValue};
use solverforge_test::{bridge, module_scope, point, point_class, FunctionBuilder, RecordingTranslator};

#[test]
fn test_nested_graph_round_trip() {
    let bridge = bridge(&RecordingTranslator::new());
    let graph = NativeRef::dict(vec![
        (
            NativeRef::str("values"),
            NativeRef::list(vec![NativeRef::int(1), NativeRef::float(0.5)]),
        ),
        (
            NativeRef::str("tags"),
            NativeRef::frozenset(vec![NativeRef::str("a"), NativeRef::str("b")]),
        ),
        (NativeRef::int(7), NativeRef::tuple(vec![NativeRef::none()])),
    ]);

    let foreign = bridge.to_foreign(&graph).unwrap();
    let back = bridge.to_native(&foreign).unwrap();

    assert!(deep_eq(&graph, &back));
    assert!(!back.ptr_eq(&graph));
}

#[test]
fn test_identity_shared_between_branches() {
    let bridge = bridge(&RecordingTranslator::new());
    let shared = NativeRef::dict(Vec::new());
    let graph = NativeRef::list(vec![
        NativeRef::tuple(vec![shared.clone()]),
        NativeRef::list(vec![shared.clone()]),
    ]);

    let foreign = bridge.to_foreign(&graph).unwrap();
    let branches = foreign.items().unwrap();
    let left = branches[0].items().unwrap();
    let right = branches[1].items().unwrap();
    assert!(left[0].ptr_eq(&right[0]));
}

#[test]
fn test_cycle_through_instance() {
    let bridge = bridge(&RecordingTranslator::new());
    let class = point_class(&module_scope(&[]));
    let node = point(&class, 1, 2);
    let holder = NativeRef::list(vec![node.clone()]);
    node.set_attr("owner", holder.clone());

    let foreign = bridge.to_foreign(&holder).unwrap();
    let inner = foreign.items().unwrap()[0].clone();
    assert!(inner.field("owner").unwrap().ptr_eq(&foreign));

    let back = bridge.to_native(&foreign).unwrap();
    let node_back = back.items().unwrap()[0].clone();
    assert!(node_back.attr("owner").unwrap().ptr_eq(&back));
}

#[test]
fn test_huge_integers_survive() {
    let bridge = bridge(&RecordingTranslator::new());
    let huge: BigInt = BigInt::from(1) << 200;
    let value = NativeRef::int(huge.clone() - 1);

    let back = bridge.to_native(&bridge.to_foreign(&value).unwrap()).unwrap();
    assert_eq!(back.as_int(), Some(&(huge - 1)));
}

#[test]
fn test_function_value_becomes_translated_handle() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let scope = module_scope(&[]);
    let function = FunctionBuilder::new("callback", &scope)
        .constant(NativeRef::none())
        .build();

    let foreign = bridge.to_foreign(&function).unwrap();
    let handle = foreign.as_function().unwrap();
    assert_eq!(handle.shape().interface, "PythonLikeFunction");
    assert!(handle.artifact().is_some());
    assert_eq!(translator.function_calls(), 1);

    let again = bridge.to_foreign(&function).unwrap();
    assert!(again.ptr_eq(&foreign));
    assert_eq!(translator.function_calls(), 1);

    let back = bridge.to_native(&foreign).unwrap();
    assert!(back.ptr_eq(&function));
}

#[test]
fn test_unmappable_value_uses_default() {
    let bridge = bridge(&RecordingTranslator::new());
    let host = ForeignRef::host("java.lang.Thread", 42);

    let err = bridge.to_native(&host).unwrap_err();
    assert!(matches!(err, InteropError::Conversion(_)));

    let replacement = NativeRef::none();
    let back = bridge.to_native_or(&host, replacement.clone()).unwrap();
    assert!(back.ptr_eq(&replacement));
}

#[test]
fn test_default_applies_inside_containers() {
    let bridge = bridge(&RecordingTranslator::new());
    let list = ForeignRef::list(vec![ForeignRef::int(1), ForeignRef::host("Handle", 3)]);

    let back = bridge.to_native_or(&list, NativeRef::str("?")).unwrap();
    let items = back.items().unwrap();
    assert_eq!(items[1].as_str(), Some("?"));
}

#[test]
fn test_explicit_memo_spans_conversions() {
    let bridge = bridge(&RecordingTranslator::new());
    let shared = NativeRef::list(vec![NativeRef::int(1)]);
    let mut memo = IdentityMemo::new();

    let first = bridge
        .to_foreign_in(&NativeRef::tuple(vec![shared.clone()]), &mut memo)
        .unwrap();
    let second = bridge.to_foreign_in(&shared, &mut memo).unwrap();
    assert!(first.items().unwrap()[0].ptr_eq(&second));
}

#[test]
fn test_exception_args_convert() {
    let bridge = bridge(&RecordingTranslator::new());
    let key_error = solverforge_interop::native::builtin_exception("KeyError").unwrap();
    let error = NativeRef::exception(&key_error, vec![NativeRef::str("missing"), NativeRef::int(3)]);

    let foreign = bridge.to_foreign(&error).unwrap();
    let ForeignValue::Exception(exception) = foreign.value() else {
        panic!("expected an exception");
    };
    assert_eq!(exception.args.read().len(), 2);

    let back = bridge.to_native(&foreign).unwrap();
    assert!(deep_eq(&error, &back));
    assert!(matches!(back.value(), NativeValue::Exception(_)));
}
