//! Native class fixtures.

use std::sync::Arc;

use solverforge_interop::{Annotation, BuiltinType, NativeClass, NativeRef};

use crate::function::FunctionBuilder;

/// A `Point` class with annotated `x`/`y` fields, an instance method, a
/// static method and a class constant.
pub fn point_class(scope: &NativeRef) -> Arc<NativeClass> {
    let norm = FunctionBuilder::new("norm", scope)
        .module("geometry")
        .param("self")
        .returns(Annotation::builtin(BuiltinType::Float))
        .build();
    let origin = FunctionBuilder::new("origin", scope).module("geometry").build();

    NativeClass::new("Point", "geometry")
        .with_annotation("x", Annotation::builtin(BuiltinType::Int))
        .with_annotation("y", Annotation::builtin(BuiltinType::Int))
        .with_member("__module__", NativeRef::str("geometry"))
        .with_member("DIMENSIONS", NativeRef::int(2))
        .with_member("norm", norm)
        .with_member("origin", NativeRef::staticmethod(origin))
        .with_scope(scope.clone())
        .into_ref()
}

/// A class with no members defined in `module`.
pub fn empty_class(name: &str, module: &str) -> Arc<NativeClass> {
    NativeClass::new(name, module).into_ref()
}

/// A point instance.
pub fn point(class: &Arc<NativeClass>, x: i64, y: i64) -> NativeRef {
    NativeRef::instance(class, vec![("x", NativeRef::int(x)), ("y", NativeRef::int(y))])
}
