//! FuelPredictor - feature encoding and model invocation

use std::fmt;
use std::path::Path;

use contracts::TripParameters;
use tracing::{debug, info, instrument};

use crate::error::{FuelPredictorError, Result};
use crate::model::{ModelArtifact, RegressionModel};

/// Feature layout the model was trained on
pub const FEATURE_NAMES: [&str; 10] = [
    "distance",
    "speed",
    "gas_type_E10",
    "gas_type_SP98",
    "AC_0",
    "AC_1",
    "rain_0",
    "rain_1",
    "sun_0",
    "sun_1",
];

fn one_hot(value: u8) -> [f64; 2] {
    [f64::from(u8::from(value == 0)), f64::from(u8::from(value == 1))]
}

/// One-hot encode a trip into the training feature layout.
///
/// Categorical codes other than 0/1 encode as all-zero columns.
pub fn encode_features(distance: f64, speed: f64, gas_type: u8, ac: u8, rain: u8, sun: u8) -> [f64; 10] {
    let [e10, sp98] = one_hot(gas_type);
    let [ac_0, ac_1] = one_hot(ac);
    let [rain_0, rain_1] = one_hot(rain);
    let [sun_0, sun_1] = one_hot(sun);
    [distance, speed, e10, sp98, ac_0, ac_1, rain_0, rain_1, sun_0, sun_1]
}

/// Fuel consumption predictor
///
/// The model is loaded once at construction and shared by every prediction.
pub struct FuelPredictor {
    model: Box<dyn RegressionModel>,
}

impl fmt::Debug for FuelPredictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuelPredictor")
            .field("features", &self.model.feature_names())
            .finish()
    }
}

impl FuelPredictor {
    /// Load the exported model from `path`.
    ///
    /// # Errors
    /// `ModelUnavailable` if the file is missing, malformed, or its feature
    /// layout differs from `FEATURE_NAMES`.
    #[instrument(name = "fuel_predictor_load", fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FuelPredictorError::unavailable(&display, e.to_string()))?;
        let artifact: ModelArtifact = serde_json::from_str(&content)
            .map_err(|e| FuelPredictorError::unavailable(&display, format!("parse error: {e}")))?;
        let model = artifact
            .into_model()
            .map_err(|e| FuelPredictorError::unavailable(&display, e))?;

        let predictor = Self::with_boxed(model, &display)?;
        info!("fuel model loaded");
        Ok(predictor)
    }

    /// Wrap an in-memory model
    pub fn from_model(model: impl RegressionModel + 'static) -> Result<Self> {
        Self::with_boxed(Box::new(model), "<memory>")
    }

    fn with_boxed(model: Box<dyn RegressionModel>, origin: &str) -> Result<Self> {
        let names = model.feature_names();
        let matches = names.len() == FEATURE_NAMES.len()
            && names.iter().zip(FEATURE_NAMES).all(|(a, b)| a == b);
        if !matches {
            return Err(FuelPredictorError::unavailable(
                origin,
                format!("feature layout {names:?} does not match {FEATURE_NAMES:?}"),
            ));
        }
        Ok(Self { model })
    }

    /// Predict fuel consumption. Categorical inputs are 0/1 codes.
    pub fn predict(&self, distance: f64, speed: f64, gas_type: u8, ac: u8, rain: u8, sun: u8) -> f64 {
        let features = encode_features(distance, speed, gas_type, ac, rain, sun);
        let prediction = self.model.predict(&features);
        debug!(distance, speed, gas_type, ac, rain, sun, prediction, "fuel prediction");
        prediction
    }

    /// Predict for a typed trip
    pub fn predict_trip(&self, trip: &TripParameters) -> f64 {
        self.predict(
            trip.distance,
            trip.speed,
            trip.gas_type.code(),
            u8::from(trip.air_conditioning),
            u8::from(trip.rain),
            u8::from(trip.sun),
        )
    }
}
