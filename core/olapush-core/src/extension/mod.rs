//! 확장 모듈: 함수/규칙/파서/실행 전략 기여
//!
//! A module is a named capability set. The process-wide registry
//! (`registry`) keeps every registered module and loads the configured
//! ones exactly once, built-in module first.

mod builtin;
mod registry;


use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::error::PlannerResult;
use crate::pushdown::PushdownPlan;
use crate::relation::RelationMetadataProvider;
use crate::sql::optimizer::{OptimizationRule, RulePlacement};
use crate::sql::planner::{Expr, LogicalPlan, ScalarFunction};

pub use builtin::{BUILTIN_MODULE_NAME, BuiltinModule};
pub use registry::{load_modules, loaded_modules, register_module, registered_modules, reset};

/// Named scalar functions the planner may push into the engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, ScalarFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names are case-insensitive. A later registration replaces the
    /// earlier one.
    pub fn register(&mut self, name: &str, function: ScalarFunction) {
        self.functions.insert(name.to_lowercase(), function);
    }

    pub fn resolve(&self, name: &str) -> Option<ScalarFunction> {
        self.functions.get(&name.to_lowercase()).copied()
    }

    /// Some registered name maps onto `function`.
    pub fn supports(&self, function: ScalarFunction) -> bool {
        self.functions.values().any(|f| *f == function)
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }
}

/// One optimizer rule contributed by a module
#[derive(Clone)]
pub struct RuleContribution {
    pub name: String,
    pub placement: RulePlacement,
    pub rule: Arc<dyn OptimizationRule>,
}

impl RuleContribution {
    pub fn new(placement: RulePlacement, rule: Arc<dyn OptimizationRule>) -> Self {
        Self {
            name: rule.name().to_string(),
            placement,
            rule,
        }
    }
}

impl fmt::Debug for RuleContribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleContribution")
            .field("name", &self.name)
            .field("placement", &self.placement)
            .finish()
    }
}

/// Turns a function call the host parser does not know into an expression.
pub trait ParserExtension: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the call is not handled by this extension
    fn parse_function(&self, name: &str, args: &[Expr]) -> Option<Expr>;
}

/// Everything a planning strategy may consult
pub struct PlanningContext<'a> {
    pub provider: &'a dyn RelationMetadataProvider,
    pub config: &'a PlannerConfig,
    pub functions: &'a FunctionRegistry,
}

/// Turns a normalised host plan into an engine request.
pub trait PlanningStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the plan provably matches no row.
    fn plan(&self, ctx: &PlanningContext<'_>, plan: &LogicalPlan)
    -> PlannerResult<Option<PushdownPlan>>;
}

/// 플래너 확장 모듈
pub trait PlannerModule: Send + Sync {
    /// Unique module name, used in configuration
    fn name(&self) -> &str;

    fn register_functions(&self, _registry: &mut FunctionRegistry) {}

    fn optimizer_rules(&self) -> Vec<RuleContribution> {
        Vec::new()
    }

    fn parser_extension(&self) -> Option<Arc<dyn ParserExtension>> {
        None
    }

    /// Rewrite applied before the optimizer rules run
    fn pre_analysis_transform(&self) -> Option<Arc<dyn OptimizationRule>> {
        None
    }

    fn planning_strategies(&self) -> Vec<Arc<dyn PlanningStrategy>> {
        Vec::new()
    }
}

/// Merged contributions of every loaded module, in load order
#[derive(Default)]
pub struct LoadedModules {
    names: Vec<String>,
    functions: FunctionRegistry,
    rules: Vec<RuleContribution>,
    parser_extensions: Vec<Arc<dyn ParserExtension>>,
    pre_analysis: Vec<Arc<dyn OptimizationRule>>,
    strategies: Vec<Arc<dyn PlanningStrategy>>,
}

impl LoadedModules {
    /// Folds `modules` in order into one contribution set.
    pub fn from_modules(modules: &[Arc<dyn PlannerModule>]) -> Self {
        let mut loaded = Self::default();
        for module in modules {
            loaded.names.push(module.name().to_string());
            module.register_functions(&mut loaded.functions);
            loaded.rules.extend(module.optimizer_rules());
            loaded.parser_extensions.extend(module.parser_extension());
            loaded.pre_analysis.extend(module.pre_analysis_transform());
            loaded.strategies.extend(module.planning_strategies());
        }
        loaded
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn optimizer_rules(&self) -> &[RuleContribution] {
        &self.rules
    }

    pub fn pre_analysis_transforms(&self) -> &[Arc<dyn OptimizationRule>] {
        &self.pre_analysis
    }

    pub fn planning_strategies(&self) -> &[Arc<dyn PlanningStrategy>] {
        &self.strategies
    }

    /// First parser extension that handles the call wins.
    pub fn parse_function(&self, name: &str, args: &[Expr]) -> Option<Expr> {
        self.parser_extensions
            .iter()
            .find_map(|extension| extension.parse_function(name, args))
    }

    /// Applies the pre-analysis transforms in module order.
    pub fn pre_analyze(&self, plan: LogicalPlan) -> PlannerResult<LogicalPlan> {
        self.pre_analysis
            .iter()
            .try_fold(plan, |plan, transform| transform.apply(plan))
    }
}

impl fmt::Debug for LoadedModules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModules")
            .field("names", &self.names)
            .field("functions", &self.functions.names())
            .field("rules", &self.rules)
            .field("strategies", &self.strategies.len())
            .finish()
    }
}
