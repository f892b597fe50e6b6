// fc-pipeline/src/lib.rs
// ============================================================================
// Module: FailCore Pipeline Library
// Description: The seven-stage tool-call execution pipeline.
// Purpose: Compose validation, the semantic guard, taint tracking, replay,
//          dispatch, and output-contract checking into one step executor.
// Dependencies: fc-core, fc-policy, fc-validate, fc-semantic, fc-taint,
//               fc-trace, fc-replay, crate::{error, registry, run,
//               side_effect, pipeline}
// ============================================================================

//! ## Overview
//! `fc-pipeline` is the Execution Pipeline described in the runtime
//! overview. A host application builds a [`run::Run`] (via
//! [`run::Run::bootstrap`] for the ordinary layered-policy case, or
//! [`run::Run::new`] to assemble every collaborator itself), registers its
//! tool implementations in a [`registry::ToolRegistry`], and then calls
//! [`run::Run::run_step`] once per step. Every stage's contribution is
//! implemented in [`pipeline`]; this crate's only public surface beyond
//! that method is the collaborators a caller needs to construct a `Run`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod executor;
pub mod pipeline;
pub mod registry;
pub mod run;
pub mod side_effect;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::PipelineError;
pub use executor::InlineExecutor;
pub use executor::ProcessExecutor;
pub use registry::ToolError;
pub use registry::ToolFn;
pub use registry::ToolRegistry;
pub use run::Run;
pub use side_effect::SideEffectBoundary;
pub use side_effect::predict as predict_side_effect;
