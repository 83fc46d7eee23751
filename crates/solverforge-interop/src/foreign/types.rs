//! Foreign type descriptors.
//!
//! A descriptor is created once per native class and never replaced: a
//! class under construction is represented by a placeholder descriptor that
//! is later resolved in place, so every reference taken during construction
//! (by recursive field types, superclasses or methods) already points at the
//! final descriptor.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::error::FallbackReason;
use crate::identity::ObjectId;
use crate::native::{BuiltinType, NativeClass};
use crate::translator::ForeignClassDefinition;

/// Final state of a class descriptor.
#[derive(Debug, Clone)]
pub enum ClassResolution {
    /// Translated structurally by the foreign compiler.
    Compiled(CompiledClass),
    /// Wrapped opaquely: instances keep a back-reference to the native object.
    Opaque(FallbackReason),
}

#[derive(Debug, Clone)]
pub struct CompiledClass {
    pub definition: ForeignClassDefinition,
    pub superclasses: Vec<ForeignType>,
}

enum DescriptorKind {
    Builtin(BuiltinType),
    Class {
        native: Arc<NativeClass>,
        resolution: OnceLock<ClassResolution>,
    },
}

pub struct TypeDescriptor {
    name: String,
    kind: DescriptorKind,
}

/// Shared handle to a foreign type descriptor. Equality is identity.
#[derive(Clone)]
pub struct ForeignType(Arc<TypeDescriptor>);

impl ForeignType {
    /// Fixed descriptor for a builtin type.
    pub fn builtin(builtin: BuiltinType) -> ForeignType {
        static TABLE: OnceLock<Vec<ForeignType>> = OnceLock::new();
        let table = TABLE.get_or_init(|| {
            BuiltinType::ALL
                .into_iter()
                .map(|b| {
                    ForeignType(Arc::new(TypeDescriptor {
                        name: b.name().to_string(),
                        kind: DescriptorKind::Builtin(b),
                    }))
                })
                .collect()
        });
        table[builtin.index()].clone()
    }

    /// The root object descriptor.
    pub fn object() -> ForeignType {
        Self::builtin(BuiltinType::Object)
    }

    /// Unresolved descriptor for a class under construction.
    pub(crate) fn placeholder(native: &Arc<NativeClass>) -> ForeignType {
        ForeignType(Arc::new(TypeDescriptor {
            name: native.full_name(),
            kind: DescriptorKind::Class {
                native: native.clone(),
                resolution: OnceLock::new(),
            },
        }))
    }

    /// Descriptor that is opaque from the start.
    pub(crate) fn opaque(native: &Arc<NativeClass>, reason: FallbackReason) -> ForeignType {
        let ty = Self::placeholder(native);
        ty.resolve(ClassResolution::Opaque(reason));
        ty
    }

    /// Resolves a placeholder. Returns false if it was already resolved.
    pub(crate) fn resolve(&self, resolution: ClassResolution) -> bool {
        match &self.0.kind {
            DescriptorKind::Class { resolution: slot, .. } => slot.set(resolution).is_ok(),
            DescriptorKind::Builtin(_) => false,
        }
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::of(&self.0)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn builtin_type(&self) -> Option<BuiltinType> {
        match self.0.kind {
            DescriptorKind::Builtin(b) => Some(b),
            DescriptorKind::Class { .. } => None,
        }
    }

    /// The native class a class descriptor stands for.
    pub fn native_class(&self) -> Option<&Arc<NativeClass>> {
        match &self.0.kind {
            DescriptorKind::Class { native, .. } => Some(native),
            DescriptorKind::Builtin(_) => None,
        }
    }

    pub fn resolution(&self) -> Option<&ClassResolution> {
        match &self.0.kind {
            DescriptorKind::Class { resolution, .. } => resolution.get(),
            DescriptorKind::Builtin(_) => None,
        }
    }

    /// True while the class behind this descriptor is still being built.
    pub fn is_placeholder(&self) -> bool {
        matches!(&self.0.kind, DescriptorKind::Class { resolution, .. } if resolution.get().is_none())
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.resolution(), Some(ClassResolution::Opaque(_)))
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.resolution(), Some(ClassResolution::Compiled(_)))
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self.resolution() {
            Some(ClassResolution::Opaque(reason)) => Some(reason),
            _ => None,
        }
    }

    pub fn definition(&self) -> Option<&ForeignClassDefinition> {
        match self.resolution() {
            Some(ClassResolution::Compiled(compiled)) => Some(&compiled.definition),
            _ => None,
        }
    }

    pub fn superclasses(&self) -> &[ForeignType] {
        match self.resolution() {
            Some(ClassResolution::Compiled(compiled)) => &compiled.superclasses,
            _ => &[],
        }
    }
}

impl PartialEq for ForeignType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ForeignType {}

impl Hash for ForeignType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for ForeignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match (&self.0.kind, self.resolution()) {
            (DescriptorKind::Builtin(_), _) => "builtin",
            (_, None) => "placeholder",
            (_, Some(ClassResolution::Compiled(_))) => "compiled",
            (_, Some(ClassResolution::Opaque(_))) => "opaque",
        };
        write!(f, "ForeignType({} {})", self.name(), state)
    }
}

impl fmt::Display for ForeignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_singletons() {
        assert_eq!(ForeignType::builtin(BuiltinType::Str), ForeignType::builtin(BuiltinType::Str));
        assert_ne!(ForeignType::builtin(BuiltinType::Str), ForeignType::object());
        assert_eq!(ForeignType::object().name(), "object");
    }

    #[test]
    fn test_placeholder_resolves_once() {
        let class = NativeClass::new("Node", "graph").into_ref();
        let ty = ForeignType::placeholder(&class);
        let alias = ty.clone();
        assert!(ty.is_placeholder());

        assert!(ty.resolve(ClassResolution::Opaque(FallbackReason::AbstractBase)));
        assert!(!ty.resolve(ClassResolution::Opaque(FallbackReason::NativeArray)));

        assert!(alias.is_opaque());
        assert_eq!(alias.fallback_reason(), Some(&FallbackReason::AbstractBase));
        assert_eq!(alias.name(), "graph.Node");
    }

    #[test]
    fn test_distinct_placeholders_are_unequal() {
        let class = NativeClass::new("Node", "graph").into_ref();
        assert_ne!(ForeignType::placeholder(&class), ForeignType::placeholder(&class));
    }
}
