// fc-pipeline/src/run.rs
// ============================================================================
// Module: Run Context
// Description: Owns one run's policy, engines, trace writer, and taint state.
// Purpose: Give `pipeline::run_step` everything it needs without threading a
//          dozen parameters through every call.
// Dependencies: fc-core, fc-policy, fc-validate, fc-semantic, fc-taint,
//               fc-trace, fc-replay, crate::{registry, side_effect}
// ============================================================================

//! ## Overview
//! A [`Run`] is constructed once per execution session and then driven
//! step by step via [`crate::pipeline`]. [`Run::bootstrap`] wires the
//! ordinary case — a layered policy loaded from a [`FailcoreLayout`],
//! built-in validators and semantic rules, a trace file opened under the
//! same layout — while [`Run::new`] stays available for callers (tests,
//! embedders) that want to assemble every collaborator themselves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use fc_core::Policy;
use fc_core::RunId;
use fc_core::StepId;
use fc_core::Timestamp;
use fc_core::TraceId;
use fc_policy::FailcoreLayout;
use fc_replay::ReplayIndex;
use fc_replay::ReplayMode;
use fc_replay::Replayer;
use fc_semantic::RuleRegistry;
use fc_semantic::SemanticGuard;
use fc_semantic::SemanticGuardConfig;
use fc_semantic::builtin_rules;
use fc_taint::TaintEngine;
use fc_taint::TaintEngineConfig;
use fc_taint::TaintFlowValidator;
use fc_taint::TaintStore;
use fc_trace::TraceContext;
use fc_trace::TraceWriter;
use fc_validate::ValidatorRegistry;
use fc_validate::builtin::register_builtins as register_builtin_validators;

use crate::error::PipelineError;
use crate::executor::InlineExecutor;
use crate::executor::ProcessExecutor;
use crate::registry::ToolRegistry;
use crate::side_effect::SideEffectBoundary;

// ============================================================================
// SECTION: Run
// ============================================================================

/// Owns every collaborator one run's `run_step` calls need, plus the
/// per-run bookkeeping the pipeline itself is responsible for (the
/// attempt counter and the append-only dependency graph).
pub struct Run {
    pub(crate) policy: Policy,
    pub(crate) validators: ValidatorRegistry,
    pub(crate) semantic_guard: SemanticGuard,
    pub(crate) taint_engine: TaintEngine,
    pub(crate) taint_store: TaintStore,
    pub(crate) tools: ToolRegistry,
    pub(crate) process_executor: Arc<dyn ProcessExecutor>,
    pub(crate) trace: TraceWriter,
    pub(crate) replayer: Option<Replayer>,
    pub(crate) side_effect_boundary: Option<SideEffectBoundary>,
    pub(crate) sandbox_root: String,
    pub(crate) override_token_present: bool,
    pub(crate) dependency_graph: BTreeMap<StepId, Vec<StepId>>,
    pub(crate) attempts: BTreeMap<StepId, u32>,
}

impl Run {
    /// Builds a run from already-assembled collaborators.
    #[must_use]
    pub fn new(
        policy: Policy,
        validators: ValidatorRegistry,
        semantic_guard: SemanticGuard,
        taint_engine: TaintEngine,
        tools: ToolRegistry,
        trace: TraceWriter,
        sandbox_root: impl Into<String>,
    ) -> Self {
        Self {
            policy,
            validators,
            semantic_guard,
            taint_engine,
            taint_store: TaintStore::new(),
            tools,
            process_executor: Arc::new(InlineExecutor),
            trace,
            replayer: None,
            side_effect_boundary: None,
            sandbox_root: sandbox_root.into(),
            override_token_present: false,
            dependency_graph: BTreeMap::new(),
            attempts: BTreeMap::new(),
        }
    }

    /// Bootstraps a run the ordinary way: loads the three-layer policy and
    /// opens the trace file under `layout`, and registers every built-in
    /// validator, the taint-flow validator, and every built-in semantic
    /// rule.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the policy fails to load, a built-in
    /// id collides (should not happen with this crate's own built-ins),
    /// the sandbox directory cannot be created, or the trace file cannot
    /// be opened.
    pub fn bootstrap(
        layout: &FailcoreLayout,
        run_id: RunId,
        tools: ToolRegistry,
        semantic_guard_config: SemanticGuardConfig,
        taint_engine_config: TaintEngineConfig,
        tags: Vec<String>,
    ) -> Result<Self, PipelineError> {
        let policy = fc_policy::load_layered_policy(layout)?;

        let sandbox_root = layout.sandbox_dir(&run_id);
        std::fs::create_dir_all(&sandbox_root).map_err(|error| PipelineError::Sandbox(error.to_string()))?;
        let sandbox_root = sandbox_root.to_string_lossy().into_owned();

        let mut validators = ValidatorRegistry::new();
        register_builtin_validators(&mut validators)?;
        validators.register(Box::new(TaintFlowValidator::new()))?;

        let mut rules = RuleRegistry::new();
        builtin_rules::register_builtins(&mut rules)?;
        let semantic_guard = SemanticGuard::new(semantic_guard_config, rules);

        let taint_engine = TaintEngine::new(taint_engine_config);

        let created_at = Timestamp::now();
        let trace_context = TraceContext::new(run_id.clone(), TraceId::new(run_id.as_str()), created_at, sandbox_root.clone(), tags);
        let trace = TraceWriter::open(layout.trace_path(&run_id), trace_context)?;

        Ok(Self::new(policy, validators, semantic_guard, taint_engine, tools, trace, sandbox_root))
    }

    /// Attaches a replayer built from a historical trace file at `path`,
    /// returning `self` for chaining.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the historical trace cannot be read.
    pub fn with_replay(mut self, path: &Path, mode: ReplayMode) -> Result<Self, PipelineError> {
        let index = ReplayIndex::build(path)?;
        self.replayer = Some(Replayer::new(index, mode));
        Ok(self)
    }

    /// Attaches a side-effect boundary, returning `self` for chaining.
    #[must_use]
    pub fn with_side_effect_boundary(mut self, boundary: SideEffectBoundary) -> Self {
        self.side_effect_boundary = Some(boundary);
        self
    }

    /// Marks the global break-glass override token as present for every
    /// step this run evaluates, returning `self` for chaining.
    #[must_use]
    pub fn with_override_token_present(mut self, present: bool) -> Self {
        self.override_token_present = present;
        self
    }

    /// Replaces the dispatch executor, returning `self` for chaining.
    ///
    /// Every run defaults to [`InlineExecutor`]; callers that need
    /// subprocess-group isolation for `isolated` tools provide their own
    /// [`ProcessExecutor`] here.
    #[must_use]
    pub fn with_process_executor(mut self, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.process_executor = executor;
        self
    }

    /// Returns this run's sandbox root.
    #[must_use]
    pub fn sandbox_root(&self) -> &str {
        &self.sandbox_root
    }

    /// Returns the path of this run's trace file.
    #[must_use]
    pub fn trace_path(&self) -> &Path {
        self.trace.path()
    }

    /// Flushes this run's trace writer to disk.
    ///
    /// Buffered trace lines are otherwise only guaranteed durable once the
    /// writer is dropped; callers that hand `trace_path()` to another run
    /// (replay, offline drift analysis) while this one is still live must
    /// flush first.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Trace`] when the underlying flush fails.
    pub fn flush_trace(&self) -> Result<(), PipelineError> {
        self.trace.flush().map_err(PipelineError::from)
    }

    pub(crate) fn next_attempt(&mut self, step_id: &StepId) -> u32 {
        let entry = self.attempts.entry(step_id.clone()).or_insert(0);
        let attempt = *entry;
        *entry += 1;
        attempt
    }

    pub(crate) fn record_dependencies(&mut self, step_id: &StepId, depends_on: &[StepId]) {
        self.dependency_graph.insert(step_id.clone(), depends_on.to_vec());
    }
}
