//! Concurrent access to one shared context.

use std::sync::{Arc, Barrier};
use std::thread;

use solverforge_interop::{Bridge, BridgeConfig, ForeignValue, NativeRef, RuntimeVersion, TargetShape};
use solverforge_test::{bridge, module_scope, point, point_class, FunctionBuilder, RecordingTranslator};

const THREADS: usize = 8;

#[test]
fn test_concurrent_translation_runs_once() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let scope = module_scope(&[("LIMIT", NativeRef::int(3))]);
    let function = FunctionBuilder::new("shared", &scope).global("LIMIT").build();
    let shape = TargetShape::new("PythonLikeFunction");
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let bridge = bridge.clone();
            let function = function.clone();
            let shape = shape.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                bridge.translate(&function, &shape, &[]).unwrap()
            })
        })
        .collect();

    let artifacts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(artifacts.iter().all(|a| Arc::ptr_eq(a, &artifacts[0])));
    assert_eq!(translator.function_calls(), 1);
}

#[test]
fn test_concurrent_class_requests_share_descriptor() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let class = point_class(&module_scope(&[]));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let bridge = bridge.clone();
            let class = class.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let foreign = bridge.to_foreign(&point(&class, i as i64, 0)).unwrap();
                match foreign.value() {
                    ForeignValue::Object(object) => object.ty.clone(),
                    other => panic!("expected a compiled object, got {}", other.kind_name()),
                }
            })
        })
        .collect();

    let types: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(types.iter().all(|ty| *ty == types[0]));
    assert!(types[0].is_compiled());
    assert_eq!(bridge.compile_class(&class).unwrap(), types[0]);
    assert_eq!(translator.class_calls(), 1);
}

#[test]
fn test_unsupported_version_fails_at_creation() {
    let config = BridgeConfig::default().with_runtime_version(RuntimeVersion::new(3, 12));
    let err = Bridge::new(config, RecordingTranslator::new()).unwrap_err();
    assert!(err.is_unsupported_version());
}
