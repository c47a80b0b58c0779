//! Bounded checkout of execution handles against one compiled model.
//!
//! The inference engine is not safe to drive concurrently through a single
//! execution context, so every model invocation goes through a pool: checkout
//! blocks until a permit is free, produces a fresh execution handle, and the
//! permit is returned exactly once when the slot is released or dropped.

use crate::core::errors::OcrError;
use crate::core::inference::{CompiledModel, ExecutionHandle, Tensor4D};
use ndarray::ArrayD;
use std::sync::{Arc, Condvar, Mutex};

/// How many execution handles may be checked out at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolPolicy {
    /// At most `n` concurrent checkouts.
    Fixed(usize),
    /// `min(4, available_parallelism)` concurrent checkouts.
    Auto,
    /// No bound; checkout never blocks.
    Unlimited,
}

impl PoolPolicy {
    fn permit_count(self) -> Option<usize> {
        match self {
            PoolPolicy::Fixed(n) => Some(n.max(1)),
            PoolPolicy::Auto => Some(4.min(crate::core::available_parallelism()).max(1)),
            PoolPolicy::Unlimited => None,
        }
    }
}

/// Counting permit guarding checkout. `None` capacity means unbounded.
#[derive(Debug)]
struct Permits {
    available: Mutex<usize>,
    returned: Condvar,
}

impl Permits {
    fn acquire(&self) {
        let mut available = match self.available.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while *available == 0 {
            available = match self.returned.wait(available) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        *available -= 1;
    }

    fn release(&self) {
        let mut available = match self.available.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *available += 1;
        drop(available);
        self.returned.notify_one();
    }
}

/// Bounds concurrent use of one compiled model.
pub struct InferencePool {
    model: Arc<dyn CompiledModel>,
    permits: Option<Permits>,
}

impl std::fmt::Debug for InferencePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePool")
            .field("model", &self.model.name())
            .field("bounded", &self.permits.is_some())
            .finish()
    }
}

impl InferencePool {
    /// Creates a pool around `model` with the given checkout policy.
    pub fn new(model: Arc<dyn CompiledModel>, policy: PoolPolicy) -> Self {
        let permits = policy.permit_count().map(|n| Permits {
            available: Mutex::new(n),
            returned: Condvar::new(),
        });
        Self { model, permits }
    }

    /// Name of the pooled model.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Blocks until a permit is free (no-op when unbounded), then creates a
    /// fresh execution handle. The permit is returned when the slot is
    /// released or dropped.
    pub fn checkout(&self) -> Result<InferenceSlot<'_>, OcrError> {
        if let Some(permits) = &self.permits {
            permits.acquire();
        }
        match self.model.create_handle() {
            Ok(handle) => Ok(InferenceSlot {
                pool: self,
                handle: Some(handle),
            }),
            Err(e) => {
                if let Some(permits) = &self.permits {
                    permits.release();
                }
                Err(e)
            }
        }
    }

    fn return_permit(&self) {
        if let Some(permits) = &self.permits {
            permits.release();
        }
    }
}

/// A checked-out, exclusive execution handle.
///
/// The permit is returned exactly once: either through [`release`] or when
/// the slot is dropped, whichever happens first.
///
/// [`release`]: InferenceSlot::release
pub struct InferenceSlot<'a> {
    pool: &'a InferencePool,
    handle: Option<Box<dyn ExecutionHandle>>,
}

impl InferenceSlot<'_> {
    /// Runs a blocking forward pass on the checked-out handle.
    pub fn run(&mut self, input: &Tensor4D) -> Result<ArrayD<f32>, OcrError> {
        match self.handle.as_mut() {
            Some(handle) => handle.run(input),
            // Unreachable through the public API: the handle is only taken
            // inside release(), which consumes the slot.
            None => Err(OcrError::invalid_input("inference slot already released")),
        }
    }

    /// Explicitly returns the permit and drops the handle.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.handle.take().is_some() {
            self.pool.return_permit();
        }
    }
}

impl Drop for InferenceSlot<'_> {
    fn drop(&mut self) {
        self.release_once();
    }
}
