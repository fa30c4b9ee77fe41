//! Model bias calculator
//!
//! The bias of a model is the absolute difference between its climatology over the
//! reference period and the observed climatology. Biases enter the denominator of
//! the bias reliability factor, so they are floored at `epsilon_floor`.

use rea_core::errors::ReaResult;
use rea_core::parameters::ReaParameters;
use rea_core::periodic::PeriodValues;
use rea_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasCalculator {
    floor: FloatValue,
}

impl BiasCalculator {
    pub fn from_parameters(parameters: &ReaParameters) -> Self {
        Self::new(parameters.epsilon_floor)
    }

    pub fn new(floor: FloatValue) -> Self {
        Self { floor }
    }

    /// `max(|model - observed|, floor)` per period; missing in either input stays missing
    pub fn bias(
        &self,
        model_climatology: &PeriodValues,
        observed_climatology: &PeriodValues,
    ) -> ReaResult<PeriodValues> {
        model_climatology.zip_with(observed_climatology, |m, o| (m - o).abs().max(self.floor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rea_core::timeseries::{Calendar, MISSING};

    #[test]
    fn absolute_difference() {
        let mut model = vec![2.0; 12];
        model[3] = -1.0;
        let model = PeriodValues::new(Calendar::Monthly, model).unwrap();
        let obs = PeriodValues::filled(Calendar::Monthly, 0.5);

        let bias = BiasCalculator::new(0.01).bias(&model, &obs).unwrap();
        assert_eq!(bias[0], 1.5);
        assert_eq!(bias[3], 1.5);
    }

    #[test]
    fn zero_bias_is_floored() {
        let clim = PeriodValues::filled(Calendar::Monthly, 3.0);
        let bias = BiasCalculator::from_parameters(&ReaParameters::default())
            .bias(&clim, &clim)
            .unwrap();
        assert!(bias.iter().all(|b| b == 0.01));
    }

    #[test]
    fn missing_observation_gives_missing_bias() {
        let model = PeriodValues::filled(Calendar::Monthly, 1.0);
        let mut obs = vec![1.0; 12];
        obs[1] = MISSING;
        let obs = PeriodValues::new(Calendar::Monthly, obs).unwrap();

        let bias = BiasCalculator::new(0.01).bias(&model, &obs).unwrap();
        assert!(bias.is_missing_at(1));
        assert!(!bias.is_missing_at(0));
    }
}
