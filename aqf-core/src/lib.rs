//! Core library for the hourly AQI forecast service.
//!
//! Reconstructs gap-free model input windows from Open-Meteo history,
//! scales them with the parameters the model was trained with, runs the
//! pre-trained model, and converts its ratio output back into absolute
//! AQI forecasts.

pub mod aqi;
pub mod context;
pub mod error;
pub mod forecast;
pub mod hour_range;
pub mod meteo;
pub mod model;
pub mod observation;
pub mod predict;
pub mod scaler;
pub mod window;
