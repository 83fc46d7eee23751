//! Resolution of native annotations to foreign type hints.
//!
//! Resolution never fails: anything that cannot be pinned down becomes the
//! root object type. Rules apply in priority order:
//!
//! 1. `Annotated[T, m...]` resolves `T` and attaches the metadata.
//! 2. A parameter default widens the declared type with the default's type.
//! 3. Variadic and keyword-variadic parameters are always tuple and dict.
//! 4. Generics resolve their origin and attach resolved arguments.
//! 5. Forward references resolve by name in the defining scope.
//! 6. Everything else is the object type.

use std::sync::Arc;

use tracing::trace;

use crate::context::TranslationContext;
use crate::foreign::{ForeignRef, ForeignType};
use crate::marshal::{self, IdentityMemo};
use crate::native::{Annotation, BuiltinType, NativeClass, NativeRef, NativeValue};

/// Nesting limit for annotations that refer to themselves through forward references.
const MAX_DEPTH: usize = 32;

/// A resolved foreign type with its refinements.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeHint {
    pub ty: ForeignType,
    /// True if `None` is an accepted value.
    pub nullable: bool,
    /// Members of a union that has no narrower common type.
    pub alternatives: Vec<TypeHint>,
    pub generic_args: Vec<TypeHint>,
    /// Converted `Annotated` metadata, in declaration order.
    pub metadata: Vec<ForeignRef>,
}

impl TypeHint {
    pub fn of(ty: ForeignType) -> Self {
        Self {
            ty,
            nullable: false,
            alternatives: Vec::new(),
            generic_args: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn builtin(builtin: BuiltinType) -> Self {
        Self::of(ForeignType::builtin(builtin))
    }

    pub fn object() -> Self {
        Self::of(ForeignType::object())
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_generic_args(mut self, args: Vec<TypeHint>) -> Self {
        self.generic_args = args;
        self
    }

    pub fn is_object(&self) -> bool {
        self.ty == ForeignType::object()
    }
}

/// How a parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Normal,
    VarArgs,
    VarKeywords,
}

/// Resolves annotations against one defining scope.
pub struct TypeHintResolver<'a> {
    ctx: &'a Arc<TranslationContext>,
    scope: Option<NativeRef>,
}

impl<'a> TypeHintResolver<'a> {
    pub fn new(ctx: &'a Arc<TranslationContext>) -> Self {
        Self { ctx, scope: None }
    }

    /// Sets the globals dict used to look up forward references.
    pub fn with_scope(mut self, scope: Option<&NativeRef>) -> Self {
        self.scope = scope.cloned();
        self
    }

    pub fn resolve(&self, annotation: &Annotation) -> TypeHint {
        self.resolve_at(annotation, 0)
    }

    /// Resolves a parameter hint, applying default widening and variadic rules.
    pub fn resolve_parameter(
        &self,
        kind: ParameterKind,
        annotation: Option<&Annotation>,
        default: Option<&NativeRef>,
    ) -> TypeHint {
        match kind {
            ParameterKind::VarArgs => return TypeHint::builtin(BuiltinType::Tuple),
            ParameterKind::VarKeywords => return TypeHint::builtin(BuiltinType::Dict),
            ParameterKind::Normal => {}
        }
        let declared = match annotation {
            Some(annotation) => self.resolve(annotation),
            None => return TypeHint::object(),
        };
        match default {
            Some(default) => {
                let runtime = self.resolve(&annotation_of_value(default));
                self.merge_union(vec![declared, runtime])
            }
            None => declared,
        }
    }

    fn resolve_at(&self, annotation: &Annotation, depth: usize) -> TypeHint {
        if depth > MAX_DEPTH {
            trace!(depth, "annotation nesting limit reached");
            return TypeHint::object();
        }
        match annotation {
            Annotation::Annotated { inner, metadata } => {
                let mut hint = self.resolve_at(inner, depth + 1);
                hint.metadata.extend(self.convert_metadata(metadata));
                hint
            }
            Annotation::Class(class) => self.class_hint(class),
            Annotation::Generic { origin, args } => self.class_hint(origin).with_generic_args(
                args.iter()
                    .map(|arg| self.resolve_at(arg, depth + 1))
                    .collect(),
            ),
            Annotation::Optional(inner) => {
                let members = vec![
                    self.resolve_at(inner, depth + 1),
                    TypeHint::builtin(BuiltinType::NoneType),
                ];
                self.merge_union(members)
            }
            Annotation::Union(members) => {
                let members = members
                    .iter()
                    .map(|member| self.resolve_at(member, depth + 1))
                    .collect();
                self.merge_union(members)
            }
            Annotation::ForwardRef(name) => self.resolve_forward(name, depth),
            Annotation::NoneType => TypeHint::builtin(BuiltinType::NoneType),
            Annotation::Any | Annotation::TypeVar(_) => TypeHint::object(),
            Annotation::Other(value) => match value.value() {
                NativeValue::Type(class) => self.class_hint(class),
                NativeValue::GenericAlias(alias) => {
                    let generic = Annotation::Generic {
                        origin: alias.origin.clone(),
                        args: alias.args.clone(),
                    };
                    self.resolve_at(&generic, depth + 1)
                }
                NativeValue::None => TypeHint::builtin(BuiltinType::NoneType),
                _ => TypeHint::object(),
            },
        }
    }

    fn class_hint(&self, class: &Arc<NativeClass>) -> TypeHint {
        match class.builtin_type() {
            Some(builtin) => TypeHint::builtin(builtin),
            None => TypeHint::of(self.ctx.class_type(class)),
        }
    }

    /// Looks a forward reference up by its base name, ignoring subscripts.
    fn resolve_forward(&self, name: &str, depth: usize) -> TypeHint {
        let base = name.split('[').next().unwrap_or(name).trim();
        if let Some(value) = self.scope.as_ref().and_then(|scope| scope.dict_get_str(base)) {
            return self.resolve_at(&Annotation::Other(value), depth + 1);
        }
        if let Some(builtin) = BuiltinType::from_name(base) {
            return TypeHint::builtin(builtin);
        }
        trace!(name, "unresolved forward reference");
        TypeHint::object()
    }

    /// Flattens union members: `None` sets nullability, duplicates collapse,
    /// and `object` absorbs everything else.
    fn merge_union(&self, members: Vec<TypeHint>) -> TypeHint {
        let none = ForeignType::builtin(BuiltinType::NoneType);
        let mut nullable = false;
        let mut unique: Vec<TypeHint> = Vec::new();
        for member in members {
            nullable |= member.nullable;
            if member.ty == none {
                nullable = true;
                continue;
            }
            let flattened = if member.alternatives.is_empty() {
                vec![member]
            } else {
                member.alternatives
            };
            for hint in flattened {
                if !unique.iter().any(|u| u.ty == hint.ty) {
                    unique.push(TypeHint {
                        nullable: false,
                        ..hint
                    });
                }
            }
        }

        let mut merged = if unique.is_empty() {
            TypeHint::builtin(BuiltinType::NoneType)
        } else if let Some(object) = unique.iter().find(|u| u.is_object()) {
            TypeHint {
                nullable: false,
                ..object.clone()
            }
        } else if unique.len() == 1 {
            unique.remove(0)
        } else {
            TypeHint {
                alternatives: unique,
                ..TypeHint::object()
            }
        };
        merged.nullable = nullable && merged.ty != none;
        merged
    }

    fn convert_metadata(&self, metadata: &[NativeRef]) -> Vec<ForeignRef> {
        let mut memo = IdentityMemo::new();
        metadata
            .iter()
            .filter_map(|item| match marshal::to_foreign(self.ctx, item, &mut memo) {
                Ok(converted) => Some(converted),
                Err(err) => {
                    trace!(error = %err, "dropping unconvertible annotation metadata");
                    None
                }
            })
            .collect()
    }
}

/// Annotation naming the runtime type of `value`.
fn annotation_of_value(value: &NativeRef) -> Annotation {
    match value.value() {
        NativeValue::None => Annotation::NoneType,
        _ => Annotation::Class(value.class()),
    }
}
