//! Min-max scaling with externally fitted parameters.
//!
//! The parameters come from JSON attribute files written when the model
//! was trained; nothing here ever fits. Per-feature parameters broadcast
//! along the trailing axis of the input, scalar parameters broadcast
//! everywhere, matching how the training pipeline applied them.

use std::fs;
use std::path::Path;

use ndarray::{Array1, ArrayD};
use serde::Deserialize;

use crate::error::{AqfError, Result};

/// Scalar-or-list parameter values as serialized by the training pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttributeValues {
    Scalar(f64),
    PerFeature(Vec<f64>),
}

impl AttributeValues {
    fn into_vec(self) -> Vec<f64> {
        match self {
            AttributeValues::Scalar(value) => vec![value],
            AttributeValues::PerFeature(values) => values,
        }
    }
}

/// On-disk scaler parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ScalerAttributes {
    #[serde(rename = "min_")]
    pub min: AttributeValues,
    #[serde(rename = "max_")]
    pub max: AttributeValues,
    #[serde(rename = "scale_")]
    pub scale: AttributeValues,
    pub minmax_range: (f64, f64),
}

/// Min-max scaler over a fixed output range
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    pub min: Array1<f64>,
    pub max: Array1<f64>,
    pub scale: Array1<f64>,
    pub range: (f64, f64),
}

impl MinMaxScaler {
    pub fn from_attributes(attributes: ScalerAttributes) -> Result<Self> {
        let min = Array1::from(attributes.min.into_vec());
        let max = Array1::from(attributes.max.into_vec());
        let scale = Array1::from(attributes.scale.into_vec());
        let (low, high) = attributes.minmax_range;

        if min.len() != scale.len() || max.len() != scale.len() {
            return Err(AqfError::InvalidScaler(format!(
                "mismatched parameter lengths (min_ {}, max_ {}, scale_ {})",
                min.len(),
                max.len(),
                scale.len()
            )));
        }
        if scale.iter().any(|&s| s == 0.0 || !s.is_finite()) {
            return Err(AqfError::InvalidScaler(
                "scale_ contains zero or non-finite entries".to_string(),
            ));
        }
        if low == high || !low.is_finite() || !high.is_finite() {
            return Err(AqfError::InvalidScaler(format!(
                "degenerate minmax_range ({low}, {high})"
            )));
        }

        Ok(MinMaxScaler {
            min,
            max,
            scale,
            range: (low, high),
        })
    }

    /// Reads and validates a scaler attribute artifact.
    pub fn from_attribute_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let attributes: ScalerAttributes = serde_json::from_str(&raw)?;
        Self::from_attributes(attributes)
    }

    /// Number of per-feature parameters (1 for a scalar scaler).
    pub fn feature_count(&self) -> usize {
        self.scale.len()
    }

    fn check_shape(&self, shape: &[usize]) -> Result<()> {
        if self.scale.len() == 1 {
            return Ok(());
        }
        match shape.last() {
            Some(&trailing) if trailing == self.scale.len() => Ok(()),
            other => Err(AqfError::ShapeMismatch {
                expected: self.scale.len(),
                found: other.copied().unwrap_or(0),
            }),
        }
    }

    /// Maps values into the scaler's output range.
    pub fn transform(&self, values: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        self.check_shape(values.shape())?;
        let (low, high) = self.range;
        Ok((values - &self.min) / &self.scale * (high - low) + low)
    }

    /// Maps scaled values back into their original units.
    pub fn inverse_transform(&self, scaled: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        self.check_shape(scaled.shape())?;
        let (low, high) = self.range;
        Ok((scaled - low) / (high - low) * &self.scale + &self.min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const INPUT_ATTRS: &str = r#"{
        "min_": [0.0, -10.0, 0.0, 0.0, 0.1],
        "max_": [300.0, 45.0, 500.0, 600.0, 18.0],
        "scale_": [300.0, 55.0, 500.0, 600.0, 17.9],
        "minmax_range": [0, 1]
    }"#;

    const TARGET_ATTRS: &str = r#"{
        "min_": 0.2,
        "max_": 3.4,
        "scale_": 3.2,
        "minmax_range": [0, 1]
    }"#;

    fn scaler(raw: &str) -> MinMaxScaler {
        let attributes: ScalerAttributes = serde_json::from_str(raw).unwrap();
        MinMaxScaler::from_attributes(attributes).unwrap()
    }

    #[test]
    fn parses_per_feature_and_scalar_attribute_files() {
        assert_eq!(scaler(INPUT_ATTRS).feature_count(), 5);
        assert_eq!(scaler(TARGET_ATTRS).feature_count(), 1);
    }

    #[test]
    fn transform_then_inverse_recovers_the_input() {
        let scaler = scaler(INPUT_ATTRS);
        let values = array![
            [150.0, 20.0, 55.0, 80.0, 2.0],
            [40.0, -3.0, 410.0, 12.0, 9.5]
        ]
        .into_dyn();
        let round_trip = scaler
            .inverse_transform(&scaler.transform(&values).unwrap())
            .unwrap();
        for (a, b) in values.iter().zip(round_trip.iter()) {
            assert!((a - b).abs() < 1e-9, "expected {a}, got {b}");
        }
    }

    #[test]
    fn transform_broadcasts_over_the_trailing_axis_of_3d_input() {
        let scaler = scaler(INPUT_ATTRS);
        let values = array![[
            [150.0, 20.0, 55.0, 80.0, 2.0],
            [40.0, -3.0, 410.0, 12.0, 9.5]
        ]]
        .into_dyn();
        let scaled = scaler.transform(&values).unwrap();
        assert_eq!(scaled.shape(), &[1, 2, 5]);
        let expected = (150.0 - 0.0) / 300.0;
        assert!((scaled[[0, 0, 0]] - expected).abs() < 1e-12);
        let expected = (-3.0 - -10.0) / 55.0;
        assert!((scaled[[0, 1, 1]] - expected).abs() < 1e-12);
    }

    #[test]
    fn scalar_parameters_apply_elementwise() {
        let scaler = scaler(TARGET_ATTRS);
        let scaled = scaler
            .transform(&array![0.2, 1.8, 3.4].into_dyn())
            .unwrap();
        assert!((scaled[[0]] - 0.0).abs() < 1e-12);
        assert!((scaled[[2]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_input_with_the_wrong_feature_axis() {
        let scaler = scaler(INPUT_ATTRS);
        let narrow = array![[1.0, 2.0, 3.0, 4.0]].into_dyn();
        match scaler.transform(&narrow) {
            Err(AqfError::ShapeMismatch { expected, found }) => {
                assert_eq!(expected, 5);
                assert_eq!(found, 4);
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_scale_and_degenerate_range() {
        let zero_scale = r#"{"min_": 0.0, "max_": 0.0, "scale_": 0.0, "minmax_range": [0, 1]}"#;
        let attributes: ScalerAttributes = serde_json::from_str(zero_scale).unwrap();
        assert!(MinMaxScaler::from_attributes(attributes).is_err());

        let flat_range = r#"{"min_": 0.0, "max_": 1.0, "scale_": 1.0, "minmax_range": [1, 1]}"#;
        let attributes: ScalerAttributes = serde_json::from_str(flat_range).unwrap();
        assert!(MinMaxScaler::from_attributes(attributes).is_err());
    }
}
