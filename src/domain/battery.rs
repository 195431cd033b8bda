use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Physical limits of the stationary battery
///
/// Power values are in W, energy values in Wh. Efficiencies are dimensionless
/// and must lie in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// Minimum charging power when the battery charges at all (W)
    pub charge_min_w: f64,

    /// Maximum charging power (W)
    pub charge_max_w: f64,

    /// Minimum discharging power when the battery discharges at all (W)
    pub discharge_min_w: f64,

    /// Maximum discharging power (W)
    pub discharge_max_w: f64,

    /// Fraction of charging power that ends up stored
    pub charge_efficiency: f64,

    /// Fraction of stored energy delivered when discharging
    pub discharge_efficiency: f64,

    /// Minimum state of charge (Wh)
    pub soc_min_wh: f64,

    /// Maximum state of charge (Wh)
    pub soc_max_wh: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            charge_min_w: 100.0,
            charge_max_w: 32_000.0,
            discharge_min_w: 100.0,
            discharge_max_w: 32_000.0,
            charge_efficiency: 1.0,
            discharge_efficiency: 1.0,
            soc_min_wh: 20_000.0,
            soc_max_wh: 100_000.0,
        }
    }
}

impl BatteryConfig {
    /// Build a validated battery configuration
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        charge_min_w: f64,
        charge_max_w: f64,
        discharge_min_w: f64,
        discharge_max_w: f64,
        charge_efficiency: f64,
        discharge_efficiency: f64,
        soc_min_wh: f64,
        soc_max_wh: f64,
    ) -> Result<Self, DispatchError> {
        let config = Self {
            charge_min_w,
            charge_max_w,
            discharge_min_w,
            discharge_max_w,
            charge_efficiency,
            discharge_efficiency,
            soc_min_wh,
            soc_max_wh,
        };
        config.validate()?;
        Ok(config)
    }

    /// Usable energy window between the soc bounds (Wh)
    pub fn usable_capacity_wh(&self) -> f64 {
        self.soc_max_wh - self.soc_min_wh
    }

    /// Check bound ordering, positivity and efficiency ranges
    pub fn validate(&self) -> Result<(), DispatchError> {
        let fields = [
            ("charge_min_w", self.charge_min_w),
            ("charge_max_w", self.charge_max_w),
            ("discharge_min_w", self.discharge_min_w),
            ("discharge_max_w", self.discharge_max_w),
            ("charge_efficiency", self.charge_efficiency),
            ("discharge_efficiency", self.discharge_efficiency),
            ("soc_min_wh", self.soc_min_wh),
            ("soc_max_wh", self.soc_max_wh),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(DispatchError::config(format!("{name} is not finite: {value}")));
            }
            if value < 0.0 {
                return Err(DispatchError::config(format!("{name} cannot be negative: {value}")));
            }
        }

        if self.charge_max_w <= 0.0 {
            return Err(DispatchError::config("charge_max_w must be positive"));
        }
        if self.discharge_max_w <= 0.0 {
            return Err(DispatchError::config("discharge_max_w must be positive"));
        }
        if self.soc_max_wh <= 0.0 {
            return Err(DispatchError::config("soc_max_wh must be positive"));
        }

        if self.charge_min_w > self.charge_max_w {
            return Err(DispatchError::config("charge_min_w must be <= charge_max_w"));
        }
        if self.discharge_min_w > self.discharge_max_w {
            return Err(DispatchError::config("discharge_min_w must be <= discharge_max_w"));
        }
        if self.soc_min_wh > self.soc_max_wh {
            return Err(DispatchError::config("soc_min_wh must be <= soc_max_wh"));
        }

        for (name, eff) in [
            ("charge_efficiency", self.charge_efficiency),
            ("discharge_efficiency", self.discharge_efficiency),
        ] {
            if eff <= 0.0 || eff > 1.0 {
                return Err(DispatchError::config(format!(
                    "{name} must be in (0, 1], got {eff}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_matches_reference_battery() {
        let battery = BatteryConfig::default();
        assert!(battery.validate().is_ok());
        assert_eq!(battery.charge_max_w, 32_000.0);
        assert_eq!(battery.soc_min_wh, 20_000.0);
        assert_eq!(battery.usable_capacity_wh(), 80_000.0);
    }

    #[test]
    fn test_new_validates() {
        let battery = BatteryConfig::new(0.0, 5_000.0, 0.0, 5_000.0, 0.95, 0.95, 0.0, 10_000.0);
        assert!(battery.is_ok());

        let battery = BatteryConfig::new(6_000.0, 5_000.0, 0.0, 5_000.0, 0.95, 0.95, 0.0, 10_000.0);
        assert!(matches!(battery, Err(DispatchError::InvalidConfig(_))));
    }

    #[rstest]
    #[case::charge_order(|b: &mut BatteryConfig| b.charge_min_w = 40_000.0)]
    #[case::discharge_order(|b: &mut BatteryConfig| b.discharge_min_w = 40_000.0)]
    #[case::soc_order(|b: &mut BatteryConfig| b.soc_min_wh = 200_000.0)]
    #[case::zero_charge_max(|b: &mut BatteryConfig| { b.charge_min_w = 0.0; b.charge_max_w = 0.0 })]
    #[case::zero_discharge_max(|b: &mut BatteryConfig| { b.discharge_min_w = 0.0; b.discharge_max_w = 0.0 })]
    #[case::zero_capacity(|b: &mut BatteryConfig| { b.soc_min_wh = 0.0; b.soc_max_wh = 0.0 })]
    #[case::negative_min(|b: &mut BatteryConfig| b.charge_min_w = -1.0)]
    #[case::zero_efficiency(|b: &mut BatteryConfig| b.charge_efficiency = 0.0)]
    #[case::efficiency_above_one(|b: &mut BatteryConfig| b.discharge_efficiency = 1.05)]
    #[case::nan(|b: &mut BatteryConfig| b.soc_max_wh = f64::NAN)]
    fn test_invalid_configs_rejected(#[case] mutate: fn(&mut BatteryConfig)) {
        let mut battery = BatteryConfig::default();
        mutate(&mut battery);
        assert!(matches!(battery.validate(), Err(DispatchError::InvalidConfig(_))));
    }

    #[test]
    fn test_equal_bounds_allowed() {
        let mut battery = BatteryConfig::default();
        battery.charge_min_w = battery.charge_max_w;
        battery.soc_min_wh = battery.soc_max_wh;
        battery.discharge_efficiency = 1.0;
        assert!(battery.validate().is_ok());
    }
}
