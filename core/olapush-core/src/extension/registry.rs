//! Process-wide module catalog and init-once loading

use std::sync::{Arc, RwLock};

use parking_lot::{Mutex, const_mutex};
use tracing::{debug, info};

use super::{BUILTIN_MODULE_NAME, BuiltinModule, LoadedModules, PlannerModule};
use crate::config::PlannerConfig;
use crate::error::{PlannerError, PlannerResult};

/// Registered modules, append-only until `reset`
static CATALOG: RwLock<Vec<Arc<dyn PlannerModule>>> = RwLock::new(Vec::new());

/// Loaded set; the critical section covers the whole load
static LOADED: Mutex<Option<Arc<LoadedModules>>> = const_mutex(None);

/// 모듈 등록
///
/// Fails with `DuplicateModule` when the name is taken, including the
/// built-in module's name.
pub fn register_module(module: Arc<dyn PlannerModule>) -> PlannerResult<()> {
    let name = module.name().to_string();
    let mut catalog = CATALOG.write().map_err(|_| PlannerError::LockPoisoned)?;

    if name == BUILTIN_MODULE_NAME || catalog.iter().any(|m| m.name() == name) {
        return Err(PlannerError::DuplicateModule(name));
    }

    debug!(target: "registry", module = %name, "module registered");
    catalog.push(module);
    Ok(())
}

/// 등록된 모듈 이름 (등록 순서)
pub fn registered_modules() -> PlannerResult<Vec<String>> {
    let catalog = CATALOG.read().map_err(|_| PlannerError::LockPoisoned)?;
    Ok(catalog.iter().map(|m| m.name().to_string()).collect())
}

/// Loads the built-in module plus `config.modules`, once per process.
///
/// Later calls return the first load's result whatever their config. A
/// name that was never registered fails the load and leaves nothing
/// loaded, so a corrected config can retry.
pub fn load_modules(config: &PlannerConfig) -> PlannerResult<Arc<LoadedModules>> {
    let mut loaded = LOADED.lock();
    if let Some(existing) = loaded.as_ref() {
        return Ok(Arc::clone(existing));
    }

    let mut modules: Vec<Arc<dyn PlannerModule>> = vec![Arc::new(BuiltinModule)];
    {
        let catalog = CATALOG.read().map_err(|_| PlannerError::LockPoisoned)?;
        for name in &config.modules {
            let module = catalog
                .iter()
                .find(|m| m.name() == name.as_str())
                .ok_or_else(|| PlannerError::ModuleNotRegistered(name.clone()))?;
            modules.push(Arc::clone(module));
        }
    }

    let result = Arc::new(LoadedModules::from_modules(&modules));
    info!(
        target: "registry",
        modules = ?result.module_names(),
        functions = ?result.functions().names(),
        "planner modules loaded"
    );
    *loaded = Some(Arc::clone(&result));
    Ok(result)
}

/// Currently loaded set, if `load_modules` has succeeded.
pub fn loaded_modules() -> Option<Arc<LoadedModules>> {
    LOADED.lock().clone()
}

/// Drops the loaded set and the catalog.
pub fn reset() {
    let mut loaded = LOADED.lock();
    *loaded = None;
    match CATALOG.write() {
        Ok(mut catalog) => catalog.clear(),
        Err(poisoned) => poisoned.into_inner().clear(),
    }
    debug!(target: "registry", "module registry reset");
}
