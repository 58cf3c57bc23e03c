//! Execution of user transformations against the data context.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::context::UdfDataContext;
use crate::error::{ExecutionError, Result};

/// A user-defined transformation of the data context.
///
/// Implementations may add, replace, mutate or remove tiles and may change
/// the projection. Whatever the context holds when `apply` returns `Ok` is
/// what gets written.
pub trait UdfTransform {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Transforms `context` in place.
    ///
    /// # Errors
    ///
    /// Any error aborts the run; the context handed to the executor is left
    /// as it was before the call.
    fn apply(&self, context: &mut UdfDataContext) -> anyhow::Result<()>;
}

/// Transformation backed by a closure.
///
/// # Examples
///
/// ```
/// use geoudf_core::executor::{FnTransform, UdfExecutor};
/// use geoudf_core::UdfDataContext;
///
/// let reproject = FnTransform::new("reproject", |ctx: &mut UdfDataContext| {
///     ctx.projection = "EPSG:4326".to_string();
///     Ok(())
/// });
///
/// let mut context = UdfDataContext::default();
/// let status = UdfExecutor::new().execute(&reproject, &mut context).unwrap();
/// assert!(status.modified);
/// assert_eq!(context.projection, "EPSG:4326");
/// ```
pub struct FnTransform<F> {
    name: String,
    func: F,
}

impl<F> FnTransform<F>
where
    F: Fn(&mut UdfDataContext) -> anyhow::Result<()>,
{
    #[must_use]
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> UdfTransform for FnTransform<F>
where
    F: Fn(&mut UdfDataContext) -> anyhow::Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, context: &mut UdfDataContext) -> anyhow::Result<()> {
        (self.func)(context)
    }
}

/// Outcome of a successful execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStatus {
    pub transform: String,
    pub elapsed: Duration,
    /// Raster tiles in the context after execution
    pub raster_tiles: usize,
    /// Feature tiles in the context after execution
    pub feature_tiles: usize,
    /// Whether the transformation changed the context
    pub modified: bool,
}

/// Applies transformations to a context.
///
/// The transformation works on a copy of the context; the copy replaces the
/// caller's context only when the transformation succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdfExecutor;

impl UdfExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs `transform` once against `context`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Failed`] if the transformation returns an
    /// error and [`ExecutionError::Panicked`] if it panics. Execution errors
    /// raised by the transformation itself, such as those of
    /// [`ProcessTransform`](crate::script::ProcessTransform), are passed
    /// through unchanged.
    pub fn execute(
        &self,
        transform: &dyn UdfTransform,
        context: &mut UdfDataContext,
    ) -> Result<ExecutionStatus> {
        let name = transform.name().to_string();
        info!(
            "Executing transformation '{name}' on {} raster and {} feature tile(s)",
            context.raster_tiles.len(),
            context.feature_tiles.len()
        );

        let mut working = context.clone();
        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| transform.apply(&mut working)));
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(())) => {},
            Ok(Err(err)) => {
                let err = match err.downcast::<ExecutionError>() {
                    Ok(execution) => execution,
                    Err(other) => ExecutionError::Failed {
                        transform: name,
                        source: other.into(),
                    },
                };
                return Err(err.into());
            },
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                return Err(ExecutionError::Panicked {
                    transform: name,
                    message,
                }
                .into());
            },
        }

        let modified = working != *context;
        *context = working;

        if context.is_empty() {
            warn!("Transformation '{name}' left no tiles; nothing will be written");
        }
        info!("Transformation '{name}' finished in {elapsed:?} (modified: {modified})");

        Ok(ExecutionStatus {
            transform: name,
            elapsed,
            raster_tiles: context.raster_tiles.len(),
            feature_tiles: context.feature_tiles.len(),
            modified,
        })
    }
}
