//! # Workflow - Task Graphs with Compositional Error Bounds
//!
//! A workflow is a DAG of tasks. Every task has two faces in the Kleisli
//! category: an implementation `F(task)` (what really happens, possibly
//! noisy) and a specification `G(task)` (what should happen). A validator
//! attached to each task declares how far the two may drift locally (ε).
//!
//! Executing a path composes both faces and measures the drift of the whole:
//!
//! ```text
//! W₁(F(path)(x), G(path)(x)) ≤ Σεᵢ + (n−1)·δ_F
//! ```
//!
//! The bound is a theorem when every morphism is non-expansive, which tasks
//! can have checked at insertion.
//!
//! ## Example
//!
//! ```rust
//! use compositional_kleisli::{deterministic, from_fn, Absolute, Distribution};
//! use compositional_workflow::{Engine, NewTask, NullHook, PassThroughValidator, TaskDag};
//!
//! let mut dag = TaskDag::with_metric(Absolute);
//! dag.add_task(NewTask::new(
//!     "parse",
//!     from_fn(|&s: &i64| Distribution::from_raw([(s + 1, 0.9), (s + 2, 0.1)])),
//!     deterministic(|&s: &i64| s + 1),
//!     PassThroughValidator::new(0.1),
//! ))?;
//! dag.add_task(NewTask::new(
//!     "emit",
//!     from_fn(|&s: &i64| Distribution::from_raw([(s + 3, 0.85), (s + 4, 0.15)])),
//!     deterministic(|&s: &i64| s + 3),
//!     PassThroughValidator::new(0.15),
//! ))?;
//! dag.add_dependency("parse", "emit")?;
//!
//! let engine = Engine::new(&dag, Absolute, 0.0)?.with_hook(NullHook);
//! let result = engine.execute(&["parse", "emit"], &5, true)?;
//!
//! assert!((result.guaranteed_bound - 0.25).abs() < 1e-12);
//! assert!(result.bound_holds(1e-9));
//! # Ok::<(), compositional_workflow::WorkflowError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod result;
pub mod task;
pub mod validator;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Layer, WorkflowError};
pub use graph::{SharedMetric, TaskDag};
pub use hooks::{CompositeHook, ExecutionHook, LoggingHook, NullHook};
pub use result::{ExecutionResult, ExecutionSummary, LocalBoundAudit, TraceStep};
pub use task::{Certification, Metadata, NewTask, Task};
pub use validator::{JudgedValidator, Judgment, JudgmentThresholds, PassThroughValidator, Validator};
