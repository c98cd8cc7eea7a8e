//! Loading and validation of trained classifier parameters.
//!
//! Two artifact formats are understood: Burn's named MessagePack records (`.mpk`) and
//! PyTorch `state_dict` files (`.pt` / `.pth`) written by the training script, whose
//! `net.{0,3,7,9}` keys are remapped onto the classifier fields.

use crate::error::DigitError;
use crate::model::{DigitClassifier, DigitClassifierConfig, DigitClassifierRecord};
use burn::{
    module::Param,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use std::path::{Path, PathBuf};

/// Recorder used for native weight artifacts.
pub type ClassifierRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Serialization format of a weight artifact.
#[derive(Config, Debug, PartialEq)]
pub enum WeightFormat {
    /// Picks the format from the file extension.
    Auto,
    /// Burn named MessagePack record.
    Burn,
    /// PyTorch `state_dict` pickle.
    PyTorch,
}

impl WeightFormat {
    /// Resolves [Auto](WeightFormat::Auto) using the extension of `path`.
    pub fn resolve(&self, path: &Path) -> WeightFormat {
        match self {
            WeightFormat::Auto => match path.extension().and_then(|ext| ext.to_str()) {
                Some("pt") | Some("pth") => WeightFormat::PyTorch,
                _ => WeightFormat::Burn,
            },
            format => format.clone(),
        }
    }
}

/// Loads a classifier from `path`, checking every parameter shape against the
/// default architecture before the weights are applied.
///
/// Burn records are named either with the `.mpk` extension or without any extension, in
/// which case `.mpk` is appended like the recorder does. Any other extension is rejected
/// rather than silently swapped for a sibling `.mpk` file.
pub fn load_classifier<B: Backend>(
    path: &Path,
    format: &WeightFormat,
    device: &B::Device,
) -> crate::Result<DigitClassifier<B>> {
    let config = DigitClassifierConfig::new();
    let record = match format.resolve(path) {
        WeightFormat::PyTorch => load_pytorch_record::<B>(path, device)?,
        _ => load_burn_record::<B>(path, device)?,
    };

    check_shapes(&record, &config).map_err(|reason| DigitError::weight_load(path, reason))?;

    log::info!("Loaded classifier weights from '{}'", path.display());

    Ok(config.init::<B>(device).load_record(record))
}

/// Writes `classifier` as a native artifact; the `.mpk` extension is always used.
pub fn save_classifier<B: Backend>(
    classifier: DigitClassifier<B>,
    path: &Path,
) -> crate::Result<PathBuf> {
    let file = path.with_extension("mpk");

    classifier
        .save_file(file.clone(), &ClassifierRecorder::new())
        .map_err(|err| DigitError::Export {
            reason: format!("could not save weights to '{}' ({err})", file.display()),
        })?;

    Ok(file)
}

fn load_burn_record<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> crate::Result<DigitClassifierRecord<B>> {
    let file = match path.extension().and_then(|ext| ext.to_str()) {
        None => path.with_extension("mpk"),
        Some("mpk") => path.to_path_buf(),
        Some(ext) => {
            return Err(DigitError::weight_load(
                path,
                format!("unsupported extension '.{ext}' for a Burn record, expected '.mpk'"),
            ))
        }
    };
    if !file.is_file() {
        return Err(DigitError::weight_load(file, "file not found"));
    }

    ClassifierRecorder::new()
        .load(file.clone(), device)
        .map_err(|err| DigitError::weight_decode(file, err))
}

#[cfg(feature = "pytorch")]
fn load_pytorch_record<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> crate::Result<DigitClassifierRecord<B>> {
    use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

    if !path.is_file() {
        return Err(DigitError::weight_load(path, "file not found"));
    }

    // Layer indices of the sequential network the weights were trained with.
    let args = LoadArgs::new(path.to_path_buf())
        .with_key_remap(r"^net\.0\.(.+)", "conv1.$1")
        .with_key_remap(r"^net\.3\.(.+)", "conv2.$1")
        .with_key_remap(r"^net\.7\.(.+)", "fc1.$1")
        .with_key_remap(r"^net\.9\.(.+)", "fc2.$1");

    PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(args, device)
        .map_err(|err| DigitError::weight_decode(path, err))
}

#[cfg(not(feature = "pytorch"))]
fn load_pytorch_record<B: Backend>(
    path: &Path,
    _device: &B::Device,
) -> crate::Result<DigitClassifierRecord<B>> {
    Err(DigitError::weight_load(
        path,
        "PyTorch artifacts require the `pytorch` feature",
    ))
}

fn check_shapes<B: Backend>(
    record: &DigitClassifierRecord<B>,
    config: &DigitClassifierConfig,
) -> Result<(), String> {
    let [c1, c2] = [config.conv1_channels, config.conv2_channels];
    let [hidden, classes] = [config.hidden_size, config.num_classes];

    check_dims("conv1.weight", &record.conv1.weight, [c1, 1, 3, 3])?;
    check_bias("conv1.bias", record.conv1.bias.as_ref(), c1)?;
    check_dims("conv2.weight", &record.conv2.weight, [c2, c1, 3, 3])?;
    check_bias("conv2.bias", record.conv2.bias.as_ref(), c2)?;
    check_dims("fc1.weight", &record.fc1.weight, [config.flattened_size(), hidden])?;
    check_bias("fc1.bias", record.fc1.bias.as_ref(), hidden)?;
    check_dims("fc2.weight", &record.fc2.weight, [hidden, classes])?;
    check_bias("fc2.bias", record.fc2.bias.as_ref(), classes)
}

fn check_dims<B: Backend, const D: usize>(
    name: &str,
    param: &Param<Tensor<B, D>>,
    expected: [usize; D],
) -> Result<(), String> {
    let actual = param.dims();
    if actual != expected {
        return Err(format!(
            "parameter '{name}' has shape {actual:?}, expected {expected:?}"
        ));
    }

    Ok(())
}

fn check_bias<B: Backend>(
    name: &str,
    param: Option<&Param<Tensor<B, 1>>>,
    expected: usize,
) -> Result<(), String> {
    match param {
        Some(param) => check_dims(name, param, [expected]),
        None => Err(format!("parameter '{name}' is missing")),
    }
}
