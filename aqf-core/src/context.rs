//! Startup artifact loading and the shared service context.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::meteo::MeteoClient;
use crate::model::{ForecastModel, OnnxForecastModel};
use crate::scaler::MinMaxScaler;

/// Locations of the artifacts the service loads at startup
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub input_scaler: PathBuf,
    pub target_scaler: PathBuf,
}

/// Everything a prediction request reads: the model, the two scalers it
/// was trained with, and the provider client. Built once, then shared
/// read-only across requests.
pub struct ServiceContext {
    pub model: Box<dyn ForecastModel>,
    pub input_scaler: MinMaxScaler,
    pub target_scaler: MinMaxScaler,
    pub meteo: MeteoClient,
}

impl ServiceContext {
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let model = OnnxForecastModel::load(&paths.model)?;
        let input_scaler = load_scaler(&paths.input_scaler, "input")?;
        let target_scaler = load_scaler(&paths.target_scaler, "target")?;
        let meteo = MeteoClient::new()?;
        Ok(ServiceContext {
            model: Box::new(model),
            input_scaler,
            target_scaler,
            meteo,
        })
    }
}

fn load_scaler(path: &Path, which: &str) -> Result<MinMaxScaler> {
    log::info!("Loading {which} scaler attributes from {}", path.display());
    MinMaxScaler::from_attribute_file(path)
}

/// Whether the service came up with usable artifacts. A load failure
/// leaves the process serving; every prediction is then refused with the
/// captured reason until a restart.
pub enum ServiceState {
    Ready(ServiceContext),
    Unready { reason: String },
}

impl ServiceState {
    /// Loads the context, capturing any failure as `Unready` instead of
    /// propagating it.
    pub fn initialize(paths: &ArtifactPaths) -> Self {
        match ServiceContext::load(paths) {
            Ok(context) => {
                log::info!("Service context ready");
                ServiceState::Ready(context)
            }
            Err(e) => {
                log::error!("Failed to initialize service context: {e}");
                ServiceState::Unready {
                    reason: e.to_string(),
                }
            }
        }
    }
}
