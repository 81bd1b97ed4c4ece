//! Tasks: the objects of the workflow graph.
//!
//! Each task carries two images of itself in the Kleisli category:
//!
//! - `F(task)`: the implementation (real, possibly noisy behavior)
//! - `G(task)`: the specification (ideal behavior)
//!
//! plus a validator supplying the local error bound ε.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use compositional_kleisli::{KleisliMorphism, LipschitzReport, Morphism, State};

use crate::validator::Validator;

/// Open metadata map attached to a task.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Non-expansiveness results recorded at insertion time.
///
/// `None` means the layer was never checked.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Certification {
    pub implementation: Option<LipschitzReport>,
    pub specification: Option<LipschitzReport>,
}

impl Certification {
    /// Both layers were checked and passed.
    pub fn is_complete(&self) -> bool {
        let passed = |r: &Option<LipschitzReport>| r.map_or(false, |r| r.is_non_expansive);
        passed(&self.implementation) && passed(&self.specification)
    }
}

/// A task in a [`TaskDag`](crate::graph::TaskDag).
///
/// Logically immutable once inserted; only its dependency list grows as
/// edges are added.
pub struct Task<S> {
    id: String,
    implementation: Morphism<S>,
    specification: Morphism<S>,
    validator: Arc<dyn Validator<S>>,
    pub(crate) dependencies: Vec<String>,
    metadata: Metadata,
    certification: Certification,
}

impl<S: State> Task<S> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `F(task)`.
    pub fn implementation(&self) -> &Morphism<S> {
        &self.implementation
    }

    /// `G(task)`.
    pub fn specification(&self) -> &Morphism<S> {
        &self.specification
    }

    pub fn validator(&self) -> &dyn Validator<S> {
        self.validator.as_ref()
    }

    /// Direct prerequisites, in the order the edges were added.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn certification(&self) -> &Certification {
        &self.certification
    }

    /// Both morphisms were verified non-expansive at insertion.
    pub fn is_certified(&self) -> bool {
        self.certification.is_complete()
    }
}

impl<S> fmt::Debug for Task<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("metadata", &self.metadata)
            .field("certification", &self.certification)
            .finish_non_exhaustive()
    }
}

/// Everything needed to insert a task, plus verification options.
///
/// # Example
///
/// ```rust
/// use compositional_kleisli::{deterministic, from_fn, Absolute, Distribution};
/// use compositional_workflow::{NewTask, PassThroughValidator, TaskDag};
///
/// let mut dag = TaskDag::with_metric(Absolute);
/// dag.add_task(
///     NewTask::new(
///         "increment",
///         from_fn(|&s: &i64| Distribution::from_raw([(s + 1, 0.9), (s + 2, 0.1)])),
///         deterministic(|&s: &i64| s + 1),
///         PassThroughValidator::new(0.1),
///     )
///     .describe("add one, occasionally two")
///     .verify_both()
///     .samples(vec![0, 1, 2, 5]),
/// )
/// .unwrap();
///
/// assert!(dag.task("increment").unwrap().is_certified());
/// ```
pub struct NewTask<S> {
    pub(crate) id: String,
    pub(crate) implementation: Morphism<S>,
    pub(crate) specification: Morphism<S>,
    pub(crate) validator: Arc<dyn Validator<S>>,
    pub(crate) metadata: Metadata,
    pub(crate) verify_implementation: bool,
    pub(crate) verify_specification: bool,
    pub(crate) samples: Vec<S>,
}

impl<S: State> NewTask<S> {
    pub fn new<F, G, V>(id: impl Into<String>, implementation: F, specification: G, validator: V) -> Self
    where
        F: KleisliMorphism<S> + 'static,
        G: KleisliMorphism<S> + 'static,
        V: Validator<S> + 'static,
    {
        Self::from_shared(
            id,
            Arc::new(implementation),
            Arc::new(specification),
            Arc::new(validator),
        )
    }

    /// Build from already-shared morphisms and validator.
    pub fn from_shared(
        id: impl Into<String>,
        implementation: Morphism<S>,
        specification: Morphism<S>,
        validator: Arc<dyn Validator<S>>,
    ) -> Self {
        Self {
            id: id.into(),
            implementation,
            specification,
            validator,
            metadata: Metadata::new(),
            verify_implementation: false,
            verify_specification: false,
            samples: Vec::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Shorthand for a `description` metadata entry.
    pub fn describe(self, description: impl Into<String>) -> Self {
        self.meta("description", description.into())
    }

    /// Require `F(task)` to pass the non-expansiveness check.
    pub fn verify_implementation(mut self) -> Self {
        self.verify_implementation = true;
        self
    }

    /// Require `G(task)` to pass the non-expansiveness check.
    pub fn verify_specification(mut self) -> Self {
        self.verify_specification = true;
        self
    }

    /// Require both layers to pass.
    pub fn verify_both(self) -> Self {
        self.verify_implementation().verify_specification()
    }

    /// States to run the non-expansiveness check on.
    pub fn samples(mut self, samples: Vec<S>) -> Self {
        self.samples = samples;
        self
    }

    pub(crate) fn into_task(self, certification: Certification) -> Task<S> {
        Task {
            id: self.id,
            implementation: self.implementation,
            specification: self.specification,
            validator: self.validator,
            dependencies: Vec::new(),
            metadata: self.metadata,
            certification,
        }
    }
}
