//! The OCR pipeline orchestrator.
//!
//! [`OcrPipeline`] composes detection, optional orientation correction, and
//! recognition into a single image-to-text call. Build one with
//! [`OcrPipeline::builder`]; for multi-caller deployments wrap a pipeline
//! factory in an [`service::OcrService`].

pub mod service;

pub use service::{CancelToken, OcrService, Receipt};

use crate::core::config::PipelineConfig;
use crate::core::errors::OcrError;
use crate::core::inference::CompiledModel;
use crate::core::pool::{InferencePool, PoolPolicy};
use crate::predictor::{LineOrientationClassifier, TextDetector, TextRecognizer};
use crate::processors::geometry::OrientedBox;
use crate::utils::image::{ensure_rgb, validate_non_empty};
use crate::utils::transform::{axis_aligned_crop, rectify_oriented_box};
use image::{DynamicImage, RgbImage};
use std::sync::Arc;
use tracing::{debug, info_span};

/// One recognized text region.
#[derive(Debug, Clone)]
pub struct TextRegion {
    /// Where the text sits in the source image.
    pub bounds: OrientedBox,
    /// The recognized text, possibly empty.
    pub text: String,
    /// Recognition confidence; NaN when nothing was decoded.
    pub score: f32,
}

/// The result of one pipeline run: regions in detection reading order.
#[derive(Debug, Clone, Default)]
pub struct OcrOutput {
    /// Recognized regions, ordered ascending by `(center.y, center.x)`.
    pub regions: Vec<TextRegion>,
}

impl OcrOutput {
    /// Regions whose score is at least `minimum`, preserving order.
    ///
    /// NaN-scored regions (empty decodes) never pass the filter.
    pub fn regions_with_min_score(&self, minimum: f32) -> impl Iterator<Item = &TextRegion> {
        self.regions.iter().filter(move |r| r.score >= minimum)
    }
}

/// A full OCR pipeline: detection, rectification, optional orientation
/// correction, recognition.
///
/// A pipeline is not shareable across threads; give each worker its own
/// instance and share the models through their pools instead.
pub struct OcrPipeline {
    config: PipelineConfig,
    detector: TextDetector,
    classifier: Option<LineOrientationClassifier>,
    recognizer: TextRecognizer,
}

impl OcrPipeline {
    /// Starts building a pipeline with the given configuration.
    pub fn builder(config: PipelineConfig) -> OcrPipelineBuilder {
        OcrPipelineBuilder {
            config,
            detection: None,
            classification: None,
            recognition: None,
        }
    }

    /// Runs OCR over any decoded image. Only 1- and 3-channel layouts are
    /// accepted.
    pub fn run(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
        let rgb = ensure_rgb(image)?;
        self.run_rgb(&rgb)
    }

    /// Runs OCR over an RGB image.
    pub fn run_rgb(&self, image: &RgbImage) -> Result<OcrOutput, OcrError> {
        let span = info_span!("ocr_run", width = image.width(), height = image.height());
        let _guard = span.enter();

        validate_non_empty(image)?;
        if self.config.correct_orientation && self.classifier.is_none() {
            return Err(OcrError::config(
                "orientation correction enabled but no classifier model was configured",
            ));
        }

        let boxes = self.detector.run(image)?;

        let mut crops = Vec::with_capacity(boxes.len());
        for bounds in &boxes {
            let crop = if self.config.rotated_crop {
                rectify_oriented_box(image, bounds)?
            } else {
                axis_aligned_crop(image, bounds)?
            };
            crops.push(crop);
        }

        if self.config.correct_orientation {
            if let Some(classifier) = &self.classifier {
                classifier.classify_and_correct(&mut crops)?;
            }
        }

        let texts = self.recognizer.run(&crops)?;
        let regions = boxes
            .into_iter()
            .zip(texts)
            .map(|(bounds, recognized)| TextRegion {
                bounds,
                text: recognized.text,
                score: recognized.score,
            })
            .collect::<Vec<_>>();

        debug!(regions = regions.len(), "pipeline run finished");
        Ok(OcrOutput { regions })
    }
}

/// Builder wiring models (or shared pools) into an [`OcrPipeline`].
pub struct OcrPipelineBuilder {
    config: PipelineConfig,
    detection: Option<Arc<InferencePool>>,
    classification: Option<Arc<InferencePool>>,
    recognition: Option<(Arc<InferencePool>, Vec<char>)>,
}

impl OcrPipelineBuilder {
    /// Sets the detection model, pooled with the given policy.
    pub fn detection_model(self, model: Arc<dyn CompiledModel>, policy: PoolPolicy) -> Self {
        self.detection_pool(Arc::new(InferencePool::new(model, policy)))
    }

    /// Shares an existing detection pool, e.g. across service workers.
    pub fn detection_pool(mut self, pool: Arc<InferencePool>) -> Self {
        self.detection = Some(pool);
        self
    }

    /// Sets the orientation classifier model, pooled with the given policy.
    pub fn classifier_model(self, model: Arc<dyn CompiledModel>, policy: PoolPolicy) -> Self {
        self.classifier_pool(Arc::new(InferencePool::new(model, policy)))
    }

    /// Shares an existing classifier pool.
    pub fn classifier_pool(mut self, pool: Arc<InferencePool>) -> Self {
        self.classification = Some(pool);
        self
    }

    /// Sets the recognition model, pooled with the given policy, and its
    /// character vocabulary (without the blank).
    pub fn recognition_model(
        self,
        model: Arc<dyn CompiledModel>,
        policy: PoolPolicy,
        charset: Vec<char>,
    ) -> Self {
        self.recognition_pool(Arc::new(InferencePool::new(model, policy)), charset)
    }

    /// Shares an existing recognition pool.
    pub fn recognition_pool(mut self, pool: Arc<InferencePool>, charset: Vec<char>) -> Self {
        self.recognition = Some((pool, charset));
        self
    }

    /// Finishes the build, validating that every enabled stage has a model.
    pub fn build(self) -> Result<OcrPipeline, OcrError> {
        let detection = self
            .detection
            .ok_or_else(|| OcrError::config("no detection model configured"))?;
        let (recognition, charset) = self
            .recognition
            .ok_or_else(|| OcrError::config("no recognition model configured"))?;
        if charset.is_empty() {
            return Err(OcrError::config("recognition charset is empty"));
        }
        if self.config.correct_orientation && self.classification.is_none() {
            return Err(OcrError::config(
                "orientation correction enabled but no classifier model was configured",
            ));
        }

        let classifier = self
            .classification
            .map(|pool| LineOrientationClassifier::new(pool, self.config.classifier.clone()));

        Ok(OcrPipeline {
            detector: TextDetector::new(detection, self.config.detector.clone()),
            classifier,
            recognizer: TextRecognizer::new(recognition, self.config.recognizer.clone(), charset),
            config: self.config,
        })
    }
}
