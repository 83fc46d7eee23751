//! Shared translation state.
//!
//! A [`TranslationContext`] owns every cache the bridge keeps: class
//! descriptors, translated function handles, per-scope globals maps and
//! shared constants. It is created explicitly, shared behind an `Arc`, and
//! dropped (or [cleared](TranslationContext::clear)) explicitly.
//!
//! Class and function translation is serialized by one reentrant lock, so
//! "register placeholder, build, resolve" happens atomically with respect
//! to other threads while recursion on the same thread sees the
//! placeholder. Lookups of finished entries never take that lock.
//!
//! A class whose superclass is still a placeholder is not built until that
//! superclass resolves, so it never compiles over a base that later turns
//! out opaque.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, info, warn};

use solverforge_bytecode::InstructionExtractor;
use solverforge_config::BridgeConfig;

use crate::builder::CompiledUnitBuilder;
use crate::error::{FallbackReason, InteropError, Result};
use crate::foreign::{
    ClassResolution, CompiledClass, ForeignFunction, ForeignRef, ForeignType, ForeignValue,
};
use crate::identity::ObjectId;
use crate::marshal::{to_foreign, IdentityMemo};
use crate::native::{builtin_exceptions, BuiltinType, ClassKind, NativeClass, NativeRef, NativeValue};
use crate::translator::{TargetShape, Translator};
use crate::unit::GlobalsMap;

struct ClassEntry {
    _class: Arc<NativeClass>,
    ty: ForeignType,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct FunctionKey {
    callable: ObjectId,
    shape: TargetShape,
    generic_args: Vec<ForeignType>,
}

struct FunctionEntry {
    _callable: NativeRef,
    handle: ForeignRef,
    ready: bool,
}

struct ScopeEntry {
    _scope: NativeRef,
    map: GlobalsMap,
}

/// Process-wide bridge state shared by every conversion and translation.
pub struct TranslationContext {
    config: BridgeConfig,
    extractor: InstructionExtractor,
    translator: Arc<dyn Translator>,
    compile_lock: ReentrantMutex<()>,
    classes: RwLock<HashMap<ObjectId, ClassEntry>>,
    deferred: Mutex<HashMap<ObjectId, Vec<Arc<NativeClass>>>>,
    functions: RwLock<HashMap<FunctionKey, FunctionEntry>>,
    scopes: RwLock<HashMap<ObjectId, ScopeEntry>>,
    constants: RwLock<HashMap<ObjectId, (NativeRef, ForeignRef)>>,
    exception_types: RwLock<HashMap<String, Arc<NativeClass>>>,
}

impl TranslationContext {
    /// Creates a context for the interpreter described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`InteropError::UnsupportedVersion`] if the configured
    /// interpreter is outside the supported window. This is the only
    /// version check the bridge performs.
    pub fn new(config: BridgeConfig, translator: Arc<dyn Translator>) -> Result<Arc<Self>> {
        let extractor =
            InstructionExtractor::with_window(config.runtime_version, config.supported_versions)
                .map_err(InteropError::UnsupportedVersion)?;

        info!(
            event = "context_ready",
            version = %config.runtime_version,
            bridge_modules = config.bridge_modules.len(),
        );

        Ok(Arc::new(Self {
            config,
            extractor,
            translator,
            compile_lock: ReentrantMutex::new(()),
            classes: RwLock::new(HashMap::new()),
            deferred: Mutex::new(HashMap::new()),
            functions: RwLock::new(HashMap::new()),
            scopes: RwLock::new(HashMap::new()),
            constants: RwLock::new(HashMap::new()),
            exception_types: RwLock::new(builtin_exceptions().clone()),
        }))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn extractor(&self) -> &InstructionExtractor {
        &self.extractor
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    /// Shape used for callables marshalled without an explicit target.
    pub fn default_shape(&self) -> TargetShape {
        TargetShape::new(self.config.default_callable_interface.clone())
    }

    /// Returns the foreign type of `class`, translating it on first use.
    ///
    /// Never fails: classes that cannot be translated structurally get an
    /// opaque descriptor, and that decision is cached like any other.
    pub fn class_type(self: &Arc<Self>, class: &Arc<NativeClass>) -> ForeignType {
        if let Some(builtin) = class.builtin_type() {
            return ForeignType::builtin(builtin);
        }
        let id = ObjectId::of(class);
        if let Some(ty) = self.cached_class(id) {
            if !ty.is_placeholder() {
                return ty;
            }
        }

        let _guard = self.compile_lock.lock();
        // Either another thread finished it while we waited, or this thread
        // is already building it further up the stack.
        if let Some(ty) = self.cached_class(id) {
            return ty;
        }

        if let Some(reason) = self.short_circuit(class) {
            debug!(class = %class.full_name(), reason = %reason, "class wrapped opaquely");
            let ty = ForeignType::opaque(class, reason);
            self.store_class(id, class, &ty);
            return ty;
        }

        let ty = ForeignType::placeholder(class);
        self.store_class(id, class, &ty);
        self.settle_class(class, &ty);
        ty
    }

    /// Builds `class` now, or parks it behind a superclass that is still a
    /// placeholder. Caller holds the compile lock.
    fn settle_class(self: &Arc<Self>, class: &Arc<NativeClass>, ty: &ForeignType) {
        if let Some(base) = self.pending_base(class) {
            debug!(
                class = %class.full_name(),
                superclass = %base.full_name(),
                "class deferred until its superclass resolves"
            );
            self.deferred
                .lock()
                .entry(ObjectId::of(&base))
                .or_default()
                .push(class.clone());
            return;
        }

        let resolution = match CompiledUnitBuilder::new(self).build_class(class, ty) {
            Ok(unit) => match self.translator.compile_class(&unit) {
                Ok(definition) => {
                    info!(
                        event = "class_compiled",
                        class = %class.full_name(),
                        binary_name = %definition.binary_name,
                        methods = unit.instance_methods.len()
                            + unit.static_methods.len()
                            + unit.class_methods.len(),
                    );
                    ClassResolution::Compiled(CompiledClass {
                        definition,
                        superclasses: unit.superclasses,
                    })
                }
                Err(err) => {
                    warn!(class = %class.full_name(), error = %err, "class compilation failed");
                    ClassResolution::Opaque(FallbackReason::CompilationFailed(err))
                }
            },
            Err(reason) => {
                debug!(class = %class.full_name(), reason = %reason, "class wrapped opaquely");
                ClassResolution::Opaque(reason)
            }
        };
        ty.resolve(resolution);

        let dependents = self.deferred.lock().remove(&ObjectId::of(class));
        for dependent in dependents.into_iter().flatten() {
            if let Some(dependent_ty) = self.cached_class(ObjectId::of(&dependent)) {
                self.settle_class(&dependent, &dependent_ty);
            }
        }
    }

    /// First superclass whose descriptor is still unresolved.
    fn pending_base(self: &Arc<Self>, class: &Arc<NativeClass>) -> Option<Arc<NativeClass>> {
        let object = NativeClass::builtin(BuiltinType::Object);
        class
            .bases
            .iter()
            .filter(|base| !Arc::ptr_eq(base, &object))
            .find(|base| self.class_type(base).is_placeholder())
            .cloned()
    }

    /// Returns the cached descriptor for `class` without translating it.
    pub fn cached_class_type(&self, class: &Arc<NativeClass>) -> Option<ForeignType> {
        self.cached_class(ObjectId::of(class))
    }

    fn cached_class(&self, id: ObjectId) -> Option<ForeignType> {
        self.classes.read().get(&id).map(|entry| entry.ty.clone())
    }

    fn store_class(&self, id: ObjectId, class: &Arc<NativeClass>, ty: &ForeignType) {
        self.classes.write().insert(
            id,
            ClassEntry {
                _class: class.clone(),
                ty: ty.clone(),
            },
        );
    }

    /// Reasons a class is never translated structurally.
    fn short_circuit(&self, class: &NativeClass) -> Option<FallbackReason> {
        match &class.kind {
            ClassKind::AbstractBaseMarker => return Some(FallbackReason::AbstractBase),
            ClassKind::NativeArray => return Some(FallbackReason::NativeArray),
            ClassKind::ForeignNative(name) => {
                return Some(FallbackReason::AlreadyForeign(name.clone()))
            }
            ClassKind::Builtin(_) | ClassKind::Ordinary => {}
        }
        if self.config.is_bridge_module(&class.module) {
            return Some(FallbackReason::BridgeModule(class.module.clone()));
        }
        None
    }

    /// Returns the foreign handle for `callable` implementing `shape`.
    ///
    /// The first request for a (callable, shape, generic arguments) triple
    /// builds the unit and invokes the translator; later requests return the
    /// same handle. A failed translation is not cached.
    pub fn function_handle(
        self: &Arc<Self>,
        callable: &NativeRef,
        shape: &TargetShape,
        generic_args: &[ForeignType],
    ) -> Result<ForeignRef> {
        let key = FunctionKey {
            callable: callable.id(),
            shape: shape.clone(),
            generic_args: generic_args.to_vec(),
        };
        if let Some(handle) = self.cached_function(&key, true) {
            return Ok(handle);
        }

        let _guard = self.compile_lock.lock();
        if let Some(handle) = self.cached_function(&key, false) {
            return Ok(handle);
        }

        let name = callable_name(callable);
        let handle = ForeignRef::new(ForeignValue::Function(ForeignFunction::new(
            name.clone(),
            callable.clone(),
            shape.clone(),
        )));
        self.functions.write().insert(
            key.clone(),
            FunctionEntry {
                _callable: callable.clone(),
                handle: handle.clone(),
                ready: false,
            },
        );

        let outcome = CompiledUnitBuilder::new(self)
            .build_function(callable)
            .and_then(|unit| {
                self.translator
                    .translate(&unit, shape, generic_args)
                    .map_err(|foreign| InteropError::Translation {
                        name: name.clone(),
                        native: format!("cannot implement {shape}"),
                        foreign,
                    })
            });

        match outcome {
            Ok(artifact) => {
                info!(
                    event = "function_translated",
                    function = %name,
                    shape = %shape,
                    class_name = %artifact.class_name,
                );
                if let ForeignValue::Function(function) = handle.value() {
                    function.set_artifact(Arc::new(artifact));
                }
                if let Some(entry) = self.functions.write().get_mut(&key) {
                    entry.ready = true;
                }
                Ok(handle)
            }
            Err(err) => {
                warn!(function = %name, error = %err, "function translation failed");
                self.functions.write().remove(&key);
                Err(err)
            }
        }
    }

    fn cached_function(&self, key: &FunctionKey, ready_only: bool) -> Option<ForeignRef> {
        self.functions
            .read()
            .get(key)
            .filter(|entry| entry.ready || !ready_only)
            .map(|entry| entry.handle.clone())
    }

    /// Returns the globals map for `scope`, extended with `names`.
    ///
    /// Names already present are left untouched; bridge modules are skipped.
    pub(crate) fn globals_for(
        self: &Arc<Self>,
        scope: &NativeRef,
        names: &[String],
        memo: &mut IdentityMemo,
    ) -> Result<GlobalsMap> {
        let map = self
            .scopes
            .write()
            .entry(scope.id())
            .or_insert_with(|| ScopeEntry {
                _scope: scope.clone(),
                map: GlobalsMap::new(),
            })
            .map
            .clone();

        for name in names {
            if map.contains(name) {
                continue;
            }
            let Some(value) = scope.dict_get_str(name) else {
                continue;
            };
            if let NativeValue::Module(module) = value.value() {
                if self.config.is_bridge_module(&module.name) {
                    debug!(name = %name, module = %module.name, "skipping bridge module global");
                    continue;
                }
            }
            let converted = to_foreign(self, &value, memo)?;
            map.insert_if_absent(name, converted);
        }
        Ok(map)
    }

    /// Returns the globals map already built for `scope`, if any.
    pub fn globals(&self, scope: &NativeRef) -> Option<GlobalsMap> {
        self.scopes
            .read()
            .get(&scope.id())
            .map(|entry| entry.map.clone())
    }

    /// Converts a code-object constant, sharing the result across units.
    pub(crate) fn shared_constant(
        self: &Arc<Self>,
        value: &NativeRef,
        memo: &mut IdentityMemo,
    ) -> Result<ForeignRef> {
        if let Some((_, converted)) = self.constants.read().get(&value.id()) {
            return Ok(converted.clone());
        }
        let converted = to_foreign(self, value, memo)?;
        Ok(self
            .constants
            .write()
            .entry(value.id())
            .or_insert_with(|| (value.clone(), converted))
            .1
            .clone())
    }

    /// Makes `class` available to reconstruct foreign exceptions by name.
    pub fn register_exception_type(&self, class: &Arc<NativeClass>) {
        self.exception_types
            .write()
            .entry(class.exception_name())
            .or_insert_with(|| class.clone());
    }

    /// Native exception type recorded under `name`.
    ///
    /// `name` is module-qualified for user classes; a `builtins.` prefix is
    /// accepted for builtin ones.
    pub fn exception_type(&self, name: &str) -> Option<Arc<NativeClass>> {
        let types = self.exception_types.read();
        types
            .get(name)
            .or_else(|| name.strip_prefix("builtins.").and_then(|bare| types.get(bare)))
            .cloned()
    }

    /// Number of classes with a cached descriptor, opaque ones included.
    pub fn class_count(&self) -> usize {
        self.classes.read().len()
    }

    /// Number of cached function handles, pending ones included.
    pub fn function_count(&self) -> usize {
        self.functions.read().len()
    }

    /// Drops every cache.
    ///
    /// Descriptors and handles already handed out stay valid; later requests
    /// translate again.
    pub fn clear(&self) {
        let _guard = self.compile_lock.lock();
        self.classes.write().clear();
        self.deferred.lock().clear();
        self.functions.write().clear();
        self.scopes.write().clear();
        self.constants.write().clear();
        info!(event = "context_cleared");
    }
}

fn callable_name(callable: &NativeRef) -> String {
    match callable.value() {
        NativeValue::Function(function) => function.full_name(),
        NativeValue::Code(code) => code.qualname.clone(),
        other => other.type_name(),
    }
}

impl std::fmt::Debug for TranslationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationContext")
            .field("version", &self.config.runtime_version)
            .field("classes", &self.class_count())
            .field("functions", &self.function_count())
            .finish()
    }
}
