// fc-replay/src/lib.rs
// ============================================================================
// Module: FailCore Replay Library
// Description: Historical-trace replay and post-run drift analysis.
// Purpose: Expose the replay index/replayer and the drift engine to the
//          pipeline's replay hook and to offline drift reporting.
// Dependencies: crate::{drift, error, index, replay}
// ============================================================================

//! ## Overview
//! `fc-replay` answers two related but distinct questions from a prior run's
//! trace file: "have we seen this exact call before, and what happened?"
//! ([`index`], [`replay`]) and "how has this tool's call shape drifted over
//! the course of a run?" ([`drift`]).

pub mod drift;
pub mod error;
pub mod index;
pub mod replay;

pub use drift::BaselineStrategy;
pub use drift::CallSnapshot;
pub use drift::ChangeEntry;
pub use drift::ChangeType;
pub use drift::DriftConfig;
pub use drift::DriftPoint;
pub use drift::DriftSeverity;
pub use drift::InflectionPoint;
pub use drift::InflectionTrigger;
pub use drift::analyze_drift;
pub use drift::group_snapshots_by_tool;
pub use drift::inflection_points;
pub use error::ReplayError;
pub use index::HistoricalStep;
pub use index::ReplayIndex;
pub use replay::HitDetail;
pub use replay::ReplayMode;
pub use replay::ReplayOutcome;
pub use replay::ReplayQueryResult;
pub use replay::Replayer;
pub use replay::outputs_differ;
