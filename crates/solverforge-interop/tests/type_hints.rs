//! Annotation resolution.

use solverforge_interop::{Annotation, BuiltinType, ForeignType, NativeRef, TypeHint};
use solverforge_test::{bridge, module_scope, point_class, FunctionBuilder, RecordingTranslator};

#[test]
fn test_optional_equals_union_with_none() {
    let bridge = bridge(&RecordingTranslator::new());
    let optional = bridge.resolve_type(&Annotation::optional(Annotation::builtin(BuiltinType::Str)));
    let union = bridge.resolve_type(&Annotation::Union(vec![
        Annotation::builtin(BuiltinType::Str),
        Annotation::NoneType,
    ]));

    assert_eq!(optional, union);
    assert_eq!(optional, TypeHint::builtin(BuiltinType::Str).nullable());
}

#[test]
fn test_union_without_common_type() {
    let bridge = bridge(&RecordingTranslator::new());
    let hint = bridge.resolve_type(&Annotation::Union(vec![
        Annotation::builtin(BuiltinType::Int),
        Annotation::builtin(BuiltinType::Str),
        Annotation::builtin(BuiltinType::Int),
    ]));

    assert!(hint.is_object());
    assert!(!hint.nullable);
    let alternatives: Vec<_> = hint.alternatives.iter().map(|h| h.ty.clone()).collect();
    assert_eq!(
        alternatives,
        vec![
            ForeignType::builtin(BuiltinType::Int),
            ForeignType::builtin(BuiltinType::Str)
        ]
    );
}

#[test]
fn test_any_member_absorbs_union() {
    let bridge = bridge(&RecordingTranslator::new());
    let hint = bridge.resolve_type(&Annotation::Union(vec![
        Annotation::builtin(BuiltinType::Int),
        Annotation::Any,
    ]));
    assert_eq!(hint, TypeHint::object());
}

#[test]
fn test_annotated_keeps_metadata() {
    let bridge = bridge(&RecordingTranslator::new());
    let hint = bridge.resolve_type(&Annotation::annotated(
        Annotation::builtin(BuiltinType::Int),
        vec![NativeRef::str("planning_id"), NativeRef::int(5)],
    ));

    assert_eq!(hint.ty, ForeignType::builtin(BuiltinType::Int));
    assert_eq!(hint.metadata.len(), 2);
    assert_eq!(hint.metadata[0].as_str(), Some("planning_id"));
}

#[test]
fn test_generic_arguments_resolve() {
    let bridge = bridge(&RecordingTranslator::new());
    let hint = bridge.resolve_type(&Annotation::generic(
        BuiltinType::Dict,
        vec![
            Annotation::builtin(BuiltinType::Str),
            Annotation::generic(BuiltinType::List, vec![Annotation::builtin(BuiltinType::Int)]),
        ],
    ));

    assert_eq!(hint.ty, ForeignType::builtin(BuiltinType::Dict));
    assert_eq!(hint.generic_args.len(), 2);
    assert_eq!(hint.generic_args[1].ty, ForeignType::builtin(BuiltinType::List));
    assert_eq!(
        hint.generic_args[1].generic_args[0].ty,
        ForeignType::builtin(BuiltinType::Int)
    );
}

#[test]
fn test_forward_reference_uses_scope() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let scope = module_scope(&[]);
    let class = point_class(&scope);
    scope.dict_set_str("Point", NativeRef::class_object(&class));

    let hint = bridge.resolve_type_in(&Annotation::forward("Point"), &scope);
    assert!(hint.ty.native_class().is_some_and(|c| std::sync::Arc::ptr_eq(c, &class)));
    assert!(hint.ty.is_compiled());

    let list_of = bridge.resolve_type_in(&Annotation::forward("list[Point]"), &scope);
    assert_eq!(list_of.ty, ForeignType::builtin(BuiltinType::List));

    let unknown = bridge.resolve_type_in(&Annotation::forward("Missing"), &scope);
    assert!(unknown.is_object());
}

#[test]
fn test_parameter_hints_from_function() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[]);
    let function = FunctionBuilder::new("schedule", &scope)
        .param("count")
        .param("label")
        .varargs("rest")
        .varkeywords("options")
        .default_value(NativeRef::none())
        .annotate("count", Annotation::builtin(BuiltinType::Int))
        .annotate("label", Annotation::builtin(BuiltinType::Str))
        .returns(Annotation::builtin(BuiltinType::Bool))
        .build();

    let unit = bridge.build_function(&function).unwrap();
    assert_eq!(
        unit.parameter_hint("count"),
        Some(&TypeHint::builtin(BuiltinType::Int))
    );
    // `label` defaults to None.
    assert_eq!(
        unit.parameter_hint("label"),
        Some(&TypeHint::builtin(BuiltinType::Str).nullable())
    );
    assert_eq!(
        unit.parameter_hint("rest"),
        Some(&TypeHint::builtin(BuiltinType::Tuple))
    );
    assert_eq!(
        unit.parameter_hint("options"),
        Some(&TypeHint::builtin(BuiltinType::Dict))
    );
    assert_eq!(unit.return_hint, TypeHint::builtin(BuiltinType::Bool));
}

#[test]
fn test_default_of_other_type_widens_hint() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[]);
    let function = FunctionBuilder::new("pick", &scope)
        .param("choice")
        .default_value(NativeRef::int(0))
        .annotate("choice", Annotation::builtin(BuiltinType::Str))
        .build();

    let unit = bridge.build_function(&function).unwrap();
    let hint = unit.parameter_hint("choice").unwrap();
    assert!(hint.is_object());
    assert_eq!(hint.alternatives.len(), 2);
}

#[test]
fn test_unannotated_parameter_is_object() {
    let bridge = bridge(&RecordingTranslator::new());
    let scope = module_scope(&[]);
    let function = FunctionBuilder::new("identity", &scope).param("value").build();

    let unit = bridge.build_function(&function).unwrap();
    assert_eq!(unit.parameter_hint("value"), Some(&TypeHint::object()));
    assert_eq!(unit.return_hint, TypeHint::object());
}

#[test]
fn test_field_hints_on_class_unit() {
    let translator = RecordingTranslator::new();
    let bridge = bridge(&translator);
    let class = point_class(&module_scope(&[]));

    bridge.compile_class(&class).unwrap();
    let unit = translator.class("Point").unwrap();
    assert_eq!(unit.field_hints["x"], TypeHint::builtin(BuiltinType::Int));
    assert_eq!(unit.field_hints["y"], TypeHint::builtin(BuiltinType::Int));
}
