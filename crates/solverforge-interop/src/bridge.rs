//! The single entry point a host embeds.

use std::sync::Arc;

use tracing::debug;

use solverforge_config::BridgeConfig;

use crate::builder::CompiledUnitBuilder;
use crate::context::TranslationContext;
use crate::error::{FallbackReason, InteropError, Result};
use crate::foreign::{ForeignRef, ForeignType};
use crate::hints::{TypeHint, TypeHintResolver};
use crate::marshal::{self, Fallback, IdentityMemo};
use crate::native::{Annotation, NativeClass, NativeRef};
use crate::translator::{CompiledArtifact, TargetShape, Translator};
use crate::unit::CompiledFunctionUnit;

/// Facade over a [`TranslationContext`].
///
/// Cloning a `Bridge` shares its caches.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use solverforge_config::BridgeConfig;
/// use solverforge_interop::{Bridge, NativeRef, Translator};
///
/// fn run(translator: Arc<dyn Translator>) -> solverforge_interop::Result<()> {
///     let bridge = Bridge::new(BridgeConfig::default(), translator)?;
///     let list = NativeRef::list(vec![NativeRef::int(1), NativeRef::str("two")]);
///     let foreign = bridge.to_foreign(&list)?;
///     let back = bridge.to_native(&foreign)?;
///     assert!(solverforge_interop::native::deep_eq(&list, &back));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Bridge {
    ctx: Arc<TranslationContext>,
}

impl Bridge {
    /// Creates a bridge with a fresh context.
    ///
    /// # Errors
    ///
    /// Returns [`InteropError::UnsupportedVersion`] if `config.runtime_version`
    /// is outside `config.supported_versions`.
    pub fn new(config: BridgeConfig, translator: Arc<dyn Translator>) -> Result<Self> {
        Ok(Self {
            ctx: TranslationContext::new(config, translator)?,
        })
    }

    /// Wraps an existing context.
    pub fn with_context(ctx: Arc<TranslationContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<TranslationContext> {
        &self.ctx
    }

    /// Converts a native value with a fresh identity memo.
    pub fn to_foreign(&self, value: &NativeRef) -> Result<ForeignRef> {
        self.to_foreign_in(value, &mut IdentityMemo::new())
    }

    /// Converts a native value, sharing identity with earlier conversions in `memo`.
    pub fn to_foreign_in(&self, value: &NativeRef, memo: &mut IdentityMemo) -> Result<ForeignRef> {
        marshal::to_foreign(&self.ctx, value, memo)
    }

    /// Converts a foreign value, failing on values with no native rule.
    pub fn to_native(&self, value: &ForeignRef) -> Result<NativeRef> {
        self.to_native_in(value, &mut IdentityMemo::new(), &Fallback::Raise)
    }

    /// Converts a foreign value, substituting `default` for unmappable ones.
    pub fn to_native_or(&self, value: &ForeignRef, default: NativeRef) -> Result<NativeRef> {
        self.to_native_in(value, &mut IdentityMemo::new(), &Fallback::Default(default))
    }

    pub fn to_native_in(
        &self,
        value: &ForeignRef,
        memo: &mut IdentityMemo,
        fallback: &Fallback,
    ) -> Result<NativeRef> {
        marshal::to_native(&self.ctx, value, memo, fallback)
    }

    /// Resolves an annotation with no enclosing scope.
    pub fn resolve_type(&self, annotation: &Annotation) -> TypeHint {
        TypeHintResolver::new(&self.ctx).resolve(annotation)
    }

    /// Resolves an annotation, looking forward references up in `scope`.
    pub fn resolve_type_in(&self, annotation: &Annotation, scope: &NativeRef) -> TypeHint {
        TypeHintResolver::new(&self.ctx)
            .with_scope(Some(scope))
            .resolve(annotation)
    }

    /// Builds the compiled unit of `callable` without translating it.
    pub fn build_function(&self, callable: &NativeRef) -> Result<CompiledFunctionUnit> {
        CompiledUnitBuilder::new(&self.ctx).build_function(callable)
    }

    /// Translates `callable` into a foreign implementation of `shape`.
    ///
    /// Repeated requests for the same callable, shape and generic
    /// arguments return the same artifact without invoking the translator.
    ///
    /// # Errors
    ///
    /// Returns [`InteropError::Translation`] if the foreign compiler rejects
    /// the unit, or the builder's error if the unit cannot be built.
    pub fn translate(
        &self,
        callable: &NativeRef,
        shape: &TargetShape,
        generic_args: &[ForeignType],
    ) -> Result<Arc<CompiledArtifact>> {
        let handle = self.ctx.function_handle(callable, shape, generic_args)?;
        let Some(function) = handle.as_function() else {
            return Err(InteropError::InvalidState(
                "function handle is not a foreign function".to_string(),
            ));
        };
        // Only reachable when a unit's own constants refer back to it.
        function.artifact().cloned().ok_or_else(|| {
            InteropError::InvalidState(format!(
                "translation of '{}' is still in progress",
                function.name()
            ))
        })
    }

    /// Returns the foreign type of `class`, translating it on first use.
    ///
    /// Classes wrapped opaquely by policy (bridge modules, abstract bases,
    /// classes with an opaque superclass) are returned as such. A class the
    /// foreign compiler rejects is an error here, though its opaque
    /// descriptor stays cached for marshalling.
    pub fn compile_class(&self, class: &Arc<NativeClass>) -> Result<ForeignType> {
        let ty = self.ctx.class_type(class);
        if let Some(FallbackReason::CompilationFailed(err)) = ty.fallback_reason() {
            debug!(class = %class.full_name(), "class compilation reported to caller");
            return Err(InteropError::Translation {
                name: class.full_name(),
                native: "class could not be compiled".to_string(),
                foreign: err.clone(),
            });
        }
        Ok(ty)
    }

    /// Drops every cache held by the context.
    pub fn clear(&self) {
        self.ctx.clear();
    }
}
