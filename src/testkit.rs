//! Scriptable inference fakes shared by the unit tests.

use crate::core::errors::OcrError;
use crate::core::inference::{CompiledModel, ExecutionHandle, Tensor4D};
use ndarray::ArrayD;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type FakeRun = dyn Fn(&Tensor4D) -> Result<ArrayD<f32>, OcrError> + Send + Sync;

/// A `CompiledModel` whose forward pass is a closure, letting tests script
/// any output shape or failure without touching ONNX Runtime.
pub(crate) struct FakeModel {
    name: String,
    run: Arc<FakeRun>,
    runs: Arc<AtomicUsize>,
}

impl FakeModel {
    /// A model that computes its output from the input tensor.
    pub(crate) fn with(
        name: &str,
        run: impl Fn(&Tensor4D) -> Result<ArrayD<f32>, OcrError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            run: Arc::new(run),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A model that always returns the same tensor regardless of input.
    pub(crate) fn constant(name: &str, shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self::with(name, move |_| {
            Ok(ArrayD::from_shape_vec(ndarray::IxDyn(&shape), data.clone())
                .expect("constant fake tensor shape"))
        })
    }

    /// Shared counter of completed forward passes.
    pub(crate) fn run_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.runs)
    }
}

impl CompiledModel for FakeModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_handle(&self) -> Result<Box<dyn ExecutionHandle>, OcrError> {
        Ok(Box::new(FakeHandle {
            run: Arc::clone(&self.run),
            runs: Arc::clone(&self.runs),
        }))
    }
}

struct FakeHandle {
    run: Arc<FakeRun>,
    runs: Arc<AtomicUsize>,
}

impl ExecutionHandle for FakeHandle {
    fn run(&mut self, input: &Tensor4D) -> Result<ArrayD<f32>, OcrError> {
        let out = (self.run)(input);
        if out.is_ok() {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
        out
    }
}

/// A fake detection model producing a probability map of zeros in the input's
/// spatial shape, i.e. "no text anywhere".
pub(crate) fn blank_detector() -> FakeModel {
    FakeModel::with("fake-det", |input| {
        let (batch, _c, h, w) = input.dim();
        Ok(ArrayD::zeros(ndarray::IxDyn(&[batch, 1, h, w])))
    })
}

/// Builds a flat-colored RGB test image.
pub(crate) fn create_test_image(width: u32, height: u32) -> image::RgbImage {
    image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]))
}
