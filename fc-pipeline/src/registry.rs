// fc-pipeline/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: The dispatch target every step's tool name resolves to.
// Purpose: Let the pipeline's dispatch stage call arbitrary host-provided
//          logic without knowing its implementation.
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! A [`ToolFn`] is whatever the host application wires up to a tool name:
//! a wrapped LLM function call, a local command, a network client. The
//! pipeline calls it with the step's [`fc_core::Context`] (params plus the
//! run's taint/session state) and expects either a [`fc_core::StepOutput`]
//! or a [`ToolError`] — anything a tool raises becomes a `TOOL_RAISED`
//! result, never a panic or an unwound error out of the pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use fc_core::Context;
use fc_core::StepOutput;

// ============================================================================
// SECTION: Tool Contract
// ============================================================================

/// An error a tool implementation raises instead of returning output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    /// Caller-supplied error code, surfaced verbatim in the step result.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ToolError {
    /// Builds a tool error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Dispatch target for a registered tool name.
pub trait ToolFn: Send + Sync {
    /// Executes the tool against `context`, returning its output or a raised error.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for any failure the tool wants surfaced as
    /// `TOOL_RAISED`; the pipeline never unwinds on this.
    fn call(&self, context: &Context) -> Result<StepOutput, ToolError>;
}

impl<F> ToolFn for F
where
    F: Fn(&Context) -> Result<StepOutput, ToolError> + Send + Sync,
{
    fn call(&self, context: &Context) -> Result<StepOutput, ToolError> {
        self(context)
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Tool-name to dispatch-target registry, populated by the host application
/// before a run starts.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolFn>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `tool` under `name`, replacing any prior registration.
    pub fn register(&mut self, name: impl Into<String>, tool: Arc<dyn ToolFn>) {
        self.tools.insert(name.into(), tool);
    }

    /// Returns the tool registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolFn>> {
        self.tools.get(name)
    }

    /// Returns `true` when `name` has a registered dispatch target.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use fc_core::StepId;

    use super::*;

    fn sample_context() -> Context {
        Context {
            tool: "echo".to_string(),
            params: serde_json::Map::new(),
            result: None,
            expected_output: None,
            step_id: StepId::new("s1"),
            session_id: None,
            state: std::collections::BTreeMap::new(),
            metadata: std::collections::BTreeMap::new(),
        }
    }

    #[test]
    fn closures_implement_tool_fn() {
        let mut registry = ToolRegistry::new();
        registry.register("echo", Arc::new(|_: &Context| Ok(StepOutput::text("hi"))));
        let tool = registry.get("echo").unwrap();
        let output = tool.call(&sample_context()).unwrap();
        assert_eq!(output.value, Some(serde_json::json!("hi")));
    }

    #[test]
    fn unregistered_tool_is_absent() {
        let registry = ToolRegistry::new();
        assert!(!registry.contains("missing"));
        assert!(registry.is_empty());
    }
}
