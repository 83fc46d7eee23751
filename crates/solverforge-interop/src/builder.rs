//! Assembly of compiled units from native functions and classes.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use solverforge_bytecode::exception_table;

use crate::context::TranslationContext;
use crate::error::{FallbackReason, InteropError, Result};
use crate::foreign::{ForeignRef, ForeignType, ForeignValue, OpaqueObject};
use crate::hints::{ParameterKind, TypeHint, TypeHintResolver};
use crate::marshal::{to_foreign, IdentityMemo};
use crate::native::{BuiltinType, CodeObject, NativeClass, NativeFunction, NativeRef, NativeValue};
use crate::unit::{CompiledClassUnit, CompiledFunctionUnit, GlobalsMap};

/// Words the foreign runtime reserves; identifiers matching one are prefixed with `$`.
const RESERVED_WORDS: &[&str] = &[
    "_", "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
    "const", "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// Makes `name` a legal foreign identifier.
pub fn sanitize_identifier(name: &str) -> String {
    if RESERVED_WORDS.contains(&name) {
        return format!("${name}");
    }
    let mut out: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if out.is_empty() {
        out.push('_');
    } else if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Sanitizes a name table, keeping its length and order.
///
/// Names that collide after sanitizing get a numeric suffix, so indices
/// into the table stay valid and every entry is unique.
pub fn identifier_list(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    names
        .iter()
        .map(|name| {
            let base = sanitize_identifier(name);
            let mut candidate = base.clone();
            let mut suffix = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}${suffix}");
                suffix += 1;
            }
            candidate
        })
        .collect()
}

/// Builds [`CompiledFunctionUnit`]s and [`CompiledClassUnit`]s.
pub struct CompiledUnitBuilder<'a> {
    ctx: &'a Arc<TranslationContext>,
}

impl<'a> CompiledUnitBuilder<'a> {
    pub fn new(ctx: &'a Arc<TranslationContext>) -> Self {
        Self { ctx }
    }

    /// Builds the unit for a function, code object, or static/class method.
    pub fn build_function(&self, callable: &NativeRef) -> Result<CompiledFunctionUnit> {
        let mut memo = IdentityMemo::new();
        self.build_function_in(callable, &mut memo)
    }

    fn build_function_in(
        &self,
        callable: &NativeRef,
        memo: &mut IdentityMemo,
    ) -> Result<CompiledFunctionUnit> {
        let (code, function) = match callable.value() {
            NativeValue::Function(function) => (function.code.clone(), Some(function)),
            NativeValue::Code(code) => (code.clone(), None),
            NativeValue::StaticMethod(inner) | NativeValue::ClassMethod(inner) => {
                return self.build_function_in(inner, memo)
            }
            other => {
                return Err(InteropError::InvalidState(format!(
                    "'{}' object is not a function or code object",
                    other.type_name()
                )))
            }
        };

        let instructions = self.ctx.extractor().extract(&code.raw)?;
        let exception_ranges = exception_table::decode(&code.raw.exception_table)?;

        let constants = code
            .consts
            .iter()
            .map(|constant| self.ctx.shared_constant(constant, memo))
            .collect::<Result<Vec<_>>>()?;

        let mut unit = CompiledFunctionUnit {
            name: sanitize_identifier(code.name()),
            qualified_name: code.qualname.clone(),
            module: String::new(),
            source_version: self.ctx.extractor().version(),
            instructions,
            exception_ranges,
            co_names: identifier_list(&code.names),
            varnames: identifier_list(&code.varnames),
            cellvars: identifier_list(&code.cellvars),
            freevars: identifier_list(&code.freevars),
            constants,
            closure: Vec::new(),
            globals: GlobalsMap::new(),
            parameter_hints: Vec::new(),
            return_hint: TypeHint::object(),
            defaults: Vec::new(),
            kwdefaults: IndexMap::new(),
            argcount: code.argcount,
            posonlyargcount: code.posonlyargcount,
            kwonlyargcount: code.kwonlyargcount,
            has_varargs: code.has_varargs,
            has_varkeywords: code.has_varkeywords,
        };

        match function {
            Some(function) => self.bind_function(&mut unit, function, &code, memo)?,
            None => {
                unit.parameter_hints = self.parameter_hints(None, &code);
            }
        }

        trace!(
            unit = %unit.qualified_name,
            instructions = unit.instructions.len(),
            constants = unit.constants.len(),
            globals = unit.globals.len(),
            "built function unit"
        );
        Ok(unit)
    }

    /// Fills in everything that comes from the function rather than its code.
    fn bind_function(
        &self,
        unit: &mut CompiledFunctionUnit,
        function: &NativeFunction,
        code: &CodeObject,
        memo: &mut IdentityMemo,
    ) -> Result<()> {
        unit.qualified_name = function.full_name();
        unit.module = function.module.clone();

        unit.closure = function
            .closure
            .iter()
            .map(|cell| to_foreign(self.ctx, cell, memo))
            .collect::<Result<Vec<_>>>()?;

        unit.globals = self.ctx.globals_for(&function.globals, &code.names, memo)?;

        unit.parameter_hints = self.parameter_hints(Some(function), code);
        unit.return_hint = match function.annotations.get("return") {
            Some(annotation) => TypeHintResolver::new(self.ctx)
                .with_scope(Some(&function.globals))
                .resolve(annotation),
            None => TypeHint::object(),
        };

        unit.defaults = function
            .defaults
            .iter()
            .map(|value| to_foreign(self.ctx, value, memo))
            .collect::<Result<Vec<_>>>()?;
        for (name, value) in &function.kwdefaults {
            let converted = to_foreign(self.ctx, value, memo)?;
            unit.kwdefaults.insert(sanitize_identifier(name), converted);
        }
        Ok(())
    }

    fn parameter_hints(
        &self,
        function: Option<&NativeFunction>,
        code: &CodeObject,
    ) -> Vec<(String, TypeHint)> {
        let resolver =
            TypeHintResolver::new(self.ctx).with_scope(function.map(|f| &f.globals));
        let annotation = |name: &str| function.and_then(|f| f.annotations.get(name));

        let mut hints: Vec<(String, TypeHint)> = code
            .parameter_names()
            .iter()
            .map(|name| {
                let default = function.and_then(|f| f.default_for(name));
                let hint =
                    resolver.resolve_parameter(ParameterKind::Normal, annotation(name), default);
                (sanitize_identifier(name), hint)
            })
            .collect();
        if let Some(name) = code.vararg_name() {
            let hint = resolver.resolve_parameter(ParameterKind::VarArgs, annotation(name), None);
            hints.push((sanitize_identifier(name), hint));
        }
        if let Some(name) = code.kwarg_name() {
            let hint =
                resolver.resolve_parameter(ParameterKind::VarKeywords, annotation(name), None);
            hints.push((sanitize_identifier(name), hint));
        }
        hints
    }

    /// Builds the unit for `class`, whose placeholder is `descriptor`.
    ///
    /// An `Err` is a decision to wrap the class opaquely, not a failure of
    /// the bridge.
    pub(crate) fn build_class(
        &self,
        class: &Arc<NativeClass>,
        descriptor: &ForeignType,
    ) -> std::result::Result<CompiledClassUnit, FallbackReason> {
        let object = NativeClass::builtin(BuiltinType::Object);
        let mut superclasses = Vec::with_capacity(class.bases.len());
        for base in &class.bases {
            if Arc::ptr_eq(base, &object) {
                continue;
            }
            let ty = self.ctx.class_type(base);
            if ty.is_opaque() {
                return Err(FallbackReason::OpaqueSuperclass(base.full_name()));
            }
            superclasses.push(ty);
        }

        let mut unit = CompiledClassUnit {
            name: sanitize_identifier(&class.name),
            qualified_name: class.full_name(),
            module: class.module.clone(),
            descriptor: descriptor.clone(),
            superclasses,
            static_attributes: IndexMap::new(),
            static_attribute_types: IndexMap::new(),
            static_methods: IndexMap::new(),
            class_methods: IndexMap::new(),
            instance_methods: IndexMap::new(),
            field_hints: IndexMap::new(),
        };

        let members: Vec<(String, NativeRef)> = class
            .dict
            .read()
            .iter()
            .filter(|(name, member)| is_method(member) || !is_dunder(name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let names: Vec<String> = members.iter().map(|(name, _)| name.clone()).collect();
        // Members share one namespace on the foreign side.
        let keys = identifier_list(&names);

        let mut attributes = Vec::new();
        for ((name, member), key) in members.into_iter().zip(keys) {
            let target = match member.value() {
                NativeValue::StaticMethod(_) => &mut unit.static_methods,
                NativeValue::ClassMethod(_) => &mut unit.class_methods,
                NativeValue::Function(_) => &mut unit.instance_methods,
                _ => {
                    attributes.push((name, key, member));
                    continue;
                }
            };
            let method = self.build_function(&member).map_err(|err| FallbackReason::MethodFailed {
                method: name.clone(),
                reason: err.to_string(),
            })?;
            target.insert(key, method);
        }

        let mut memo = IdentityMemo::new();
        for (name, key, value) in attributes {
            let attribute_type = match value.value() {
                NativeValue::Type(_) | NativeValue::GenericAlias(_) => {
                    ForeignType::builtin(BuiltinType::Type)
                }
                _ => self.ctx.class_type(&value.class()),
            };
            let converted = match to_foreign(self.ctx, &value, &mut memo) {
                Ok(converted) => converted,
                Err(err) => {
                    debug!(
                        class = %unit.qualified_name,
                        attribute = %name,
                        error = %err,
                        "static attribute wrapped opaquely"
                    );
                    ForeignRef::new(ForeignValue::Opaque(OpaqueObject::new(value.clone())))
                }
            };
            unit.static_attributes.insert(key.clone(), converted);
            unit.static_attribute_types.insert(key, attribute_type);
        }

        let resolver = TypeHintResolver::new(self.ctx).with_scope(class.scope.as_ref());
        for (field, annotation) in &class.annotations {
            unit.field_hints
                .insert(sanitize_identifier(field), resolver.resolve(annotation));
        }

        Ok(unit)
    }
}

fn is_method(member: &NativeRef) -> bool {
    matches!(
        member.value(),
        NativeValue::StaticMethod(_) | NativeValue::ClassMethod(_) | NativeValue::Function(_)
    )
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}
