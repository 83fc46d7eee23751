//! A translator that records what the bridge hands it.
//!
//! # Example
//!
//! ```ignore
//! use solverforge_test::translator::RecordingTranslator;
//!
//! let translator = RecordingTranslator::failing(&["broken"]);
//! let bridge = Bridge::new(BridgeConfig::default(), translator.clone())?;
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use solverforge_interop::{
    CompiledArtifact, CompiledClassUnit, CompiledFunctionUnit, ForeignClassDefinition,
    ForeignCompilationError, ForeignType, TargetShape, Translator,
};

/// Counts calls, keeps every unit it receives, and rejects configured names.
#[derive(Debug, Default)]
pub struct RecordingTranslator {
    function_calls: AtomicUsize,
    class_calls: AtomicUsize,
    failing: HashSet<String>,
    functions: Mutex<Vec<CompiledFunctionUnit>>,
    classes: Mutex<Vec<CompiledClassUnit>>,
}

impl RecordingTranslator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a translator that rejects units whose simple name is in `names`.
    pub fn failing(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: names.iter().map(|name| name.to_string()).collect(),
            ..Self::default()
        })
    }

    pub fn function_calls(&self) -> usize {
        self.function_calls.load(Ordering::SeqCst)
    }

    pub fn class_calls(&self) -> usize {
        self.class_calls.load(Ordering::SeqCst)
    }

    /// Function units received so far, in call order.
    pub fn functions(&self) -> Vec<CompiledFunctionUnit> {
        self.functions.lock().clone()
    }

    /// Class units received so far, in call order.
    pub fn classes(&self) -> Vec<CompiledClassUnit> {
        self.classes.lock().clone()
    }

    /// The last function unit received under `name`.
    pub fn function(&self, name: &str) -> Option<CompiledFunctionUnit> {
        self.functions
            .lock()
            .iter()
            .rev()
            .find(|unit| unit.name == name)
            .cloned()
    }

    /// The last class unit received under `name`.
    pub fn class(&self, name: &str) -> Option<CompiledClassUnit> {
        self.classes
            .lock()
            .iter()
            .rev()
            .find(|unit| unit.name == name)
            .cloned()
    }
}

impl Translator for RecordingTranslator {
    fn translate(
        &self,
        unit: &CompiledFunctionUnit,
        shape: &TargetShape,
        generic_args: &[ForeignType],
    ) -> Result<CompiledArtifact, ForeignCompilationError> {
        self.function_calls.fetch_add(1, Ordering::SeqCst);
        self.functions.lock().push(unit.clone());
        if self.failing.contains(&unit.name) {
            return Err(ForeignCompilationError::new(&unit.qualified_name, "rejected by fixture")
                .with_diagnostic(format!("{} instructions", unit.instructions.len())));
        }
        Ok(CompiledArtifact {
            class_name: format!("org.solverforge.generated.{}$Impl", unit.name),
            shape: shape.clone(),
            generic_args: generic_args.to_vec(),
        })
    }

    fn compile_class(
        &self,
        unit: &CompiledClassUnit,
    ) -> Result<ForeignClassDefinition, ForeignCompilationError> {
        self.class_calls.fetch_add(1, Ordering::SeqCst);
        self.classes.lock().push(unit.clone());
        if self.failing.contains(&unit.name) {
            return Err(ForeignCompilationError::new(&unit.qualified_name, "rejected by fixture"));
        }
        Ok(ForeignClassDefinition {
            binary_name: format!("org.solverforge.generated.{}", unit.qualified_name),
        })
    }
}
