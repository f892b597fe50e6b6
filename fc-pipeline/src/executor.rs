// fc-pipeline/src/executor.rs
// ============================================================================
// Module: Process Executor
// Description: Extension point for routing tool dispatch through isolation.
// Purpose: Let a host swap in subprocess-group isolation for tools marked
//          `isolated` without changing the dispatch stage itself.
// Dependencies: fc-core, crate::registry
// ============================================================================

//! ## Overview
//! Dispatch normally calls a [`crate::registry::ToolFn`] in-process. A tool
//! that shells out or otherwise needs a timeout to be enforceable by
//! killing a whole process group can instead be routed through a
//! [`ProcessExecutor`]. [`InlineExecutor`] is the default and the common
//! case: it calls the tool directly and carries no isolation. No built-in
//! end-to-end scenario requires anything else; this is the seam a host
//! grows a real subprocess-group executor behind, not a finished one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use fc_core::Context;
use fc_core::StepOutput;

use crate::registry::ToolError;
use crate::registry::ToolFn;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Routes a single tool call, optionally through isolation.
///
/// Implementors must not panic: a tool's own failure is reported as
/// [`ToolError`], same as calling the [`ToolFn`] directly would.
pub trait ProcessExecutor: Send + Sync {
    /// Executes `tool` with `context`, returning what the tool itself
    /// would have returned.
    fn execute(&self, tool: &dyn ToolFn, context: &Context) -> Result<StepOutput, ToolError>;
}

// ============================================================================
// SECTION: Default Executor
// ============================================================================

/// Calls the tool in-process. No isolation, no overhead; the default for
/// every [`crate::run::Run`].
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl ProcessExecutor for InlineExecutor {
    fn execute(&self, tool: &dyn ToolFn, context: &Context) -> Result<StepOutput, ToolError> {
        tool.call(context)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use fc_core::StepId;

    use super::*;

    fn context() -> Context {
        Context {
            tool: "noop".to_string(),
            params: serde_json::Map::new(),
            result: None,
            expected_output: None,
            step_id: StepId::new("s1"),
            session_id: None,
            state: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn inline_executor_calls_the_tool_directly() {
        let tool = move |_ctx: &Context| Ok(StepOutput::text("ok"));
        let result = InlineExecutor.execute(&tool, &context());
        assert_eq!(result.expect("tool succeeds").summarize_text(), "ok");
    }
}
