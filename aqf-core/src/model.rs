//! Forecast model abstraction and the ONNX-backed implementation.

use std::path::Path;

use ndarray::Array3;
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::internal::DimLike;

use crate::error::{AqfError, Result};

/// A loaded forecasting model. Implementations are opaque beyond their
/// input contract: `sequence_length` timesteps of `feature_count` scaled
/// features in, a flat sequence of scaled forecast steps out.
pub trait ForecastModel: Send + Sync {
    fn sequence_length(&self) -> usize;
    fn feature_count(&self) -> usize;
    fn predict(&self, window: &Array3<f64>) -> Result<Vec<f64>>;
}

/// Pre-trained ONNX model executed with tract
pub struct OnnxForecastModel {
    plan: TypedRunnableModel<TypedModel>,
    sequence_length: usize,
    feature_count: usize,
}

impl OnnxForecastModel {
    /// Loads and optimizes the model artifact, reading the sequence
    /// length and feature count from its declared input shape. The batch
    /// dimension may stay symbolic; the other two must be fixed.
    pub fn load(path: &Path) -> Result<Self> {
        let load_err = |e: TractError| AqfError::ModelLoad(format!("{}: {e}", path.display()));

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_err)?
            .into_optimized()
            .map_err(load_err)?;

        let (sequence_length, feature_count) = {
            let fact = model.input_fact(0).map_err(load_err)?;
            if fact.rank() != 3 {
                return Err(AqfError::ModelLoad(format!(
                    "{}: expected a rank-3 input, found rank {}",
                    path.display(),
                    fact.rank()
                )));
            }
            let fixed = |dim: &TDim, name: &str| {
                dim.to_usize().map_err(|_| {
                    AqfError::ModelLoad(format!(
                        "{}: input {name} dimension is not fixed",
                        path.display()
                    ))
                })
            };
            (
                fixed(&fact.shape[1], "sequence")?,
                fixed(&fact.shape[2], "feature")?,
            )
        };

        let plan = model.into_runnable().map_err(load_err)?;
        log::info!(
            "Loaded model from {} (sequence length {sequence_length}, {feature_count} features)",
            path.display()
        );
        Ok(OnnxForecastModel {
            plan,
            sequence_length,
            feature_count,
        })
    }
}

impl ForecastModel for OnnxForecastModel {
    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict(&self, window: &Array3<f64>) -> Result<Vec<f64>> {
        let run_err = |e: TractError| AqfError::Inference(e.to_string());

        let flat: Vec<f32> = window.iter().map(|&v| v as f32).collect();
        let input = Tensor::from_shape(window.shape(), &flat).map_err(run_err)?;
        let outputs = self.plan.run(tvec!(input.into())).map_err(run_err)?;
        let steps = outputs[0].as_slice::<f32>().map_err(run_err)?;
        Ok(steps.iter().map(|&v| f64::from(v)).collect())
    }
}
