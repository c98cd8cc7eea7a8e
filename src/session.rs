use crate::bitmap::Bitmap;
use crate::config::DigitDrawConfig;
use crate::error::{DigitError, Result};
use crate::model::DigitClassifier;
use crate::normalize::{NormalizeMode, NormalizedTensor, StrokeNormalizer};
use crate::scores::{ClassScores, Prediction};
use crate::weights::{load_classifier, WeightFormat};
use burn::prelude::*;
use std::path::Path;

/// CPU backend used by the binary.
pub type CpuBackend = burn::backend::NdArray<f32>;

/// Holds one loaded classifier and runs the end-to-end classification.
///
/// Weights are loaded once and never mutated afterwards. Every call allocates its own
/// input and intermediate tensors, so a session can be cloned and the clones used from
/// different threads; clones share the parameter storage.
#[derive(Debug, Clone)]
pub struct InferenceSession<B: Backend> {
    device: B::Device,
    normalizer: StrokeNormalizer,
    classifier: Option<DigitClassifier<B>>,
}

impl<B: Backend> InferenceSession<B> {
    /// Creates a session without weights; [classify](Self::classify) fails until
    /// [load](Self::load) succeeds.
    pub fn new(normalizer: StrokeNormalizer, device: B::Device) -> Self {
        Self {
            device,
            normalizer,
            classifier: None,
        }
    }

    /// Creates a session and loads the weights named by `config`.
    pub fn open(config: &DigitDrawConfig, device: B::Device) -> Result<Self> {
        let normalizer = StrokeNormalizer::new(config.polarity.clone());
        let mut session = Self::new(normalizer, device);

        session.load(Path::new(&config.weights), &config.weight_format)?;

        Ok(session)
    }

    /// Loads and validates the weight artifact.
    ///
    /// On failure the session is left without weights, even if it had some before.
    pub fn load(&mut self, path: &Path, format: &WeightFormat) -> Result<()> {
        self.classifier = None;
        self.classifier = Some(load_classifier(path, format, &self.device)?);

        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn normalizer(&self) -> &StrokeNormalizer {
        &self.normalizer
    }

    /// Normalizes a snapshot and classifies it.
    pub fn classify(&self, bitmap: &Bitmap) -> Result<Prediction> {
        let classifier = self.classifier()?;
        let tensor = self
            .normalizer
            .normalize(bitmap, NormalizeMode::Classification)?;

        self.run(classifier, &tensor)
    }

    /// Classifies an already normalized tensor; intensities are standardized first.
    pub fn classify_tensor(&self, tensor: &NormalizedTensor) -> Result<Prediction> {
        let classifier = self.classifier()?;

        self.run(classifier, &tensor.standardized())
    }

    fn classifier(&self) -> Result<&DigitClassifier<B>> {
        self.classifier.as_ref().ok_or(DigitError::SessionNotReady)
    }

    fn run(&self, classifier: &DigitClassifier<B>, tensor: &NormalizedTensor) -> Result<Prediction> {
        let input = tensor.to_tensor::<B>(&self.device);
        let output = classifier.forward(input);

        let logits = output
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|err| DigitError::Inference {
                reason: format!("could not read classifier output ({err:?})"),
            })?;
        let prediction = Prediction::from_scores(ClassScores::from_logits(logits)?);

        log::debug!(
            "Predicted {} with confidence {:.3}",
            prediction.label,
            prediction.confidence()
        );

        Ok(prediction)
    }
}
