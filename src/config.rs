use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::domain::BatteryConfig;
use crate::error::DispatchError;
use crate::optimizer::{GoodLpSolver, ModelOptions, ObjectiveSense, SolverBackend, DEFAULT_BIG_M};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "batteryopt.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub battery: BatteryConfig,
    pub tariff: TariffConfig,
    pub model: ModelConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TariffConfig {
    /// Flat electricity price ($/Wh), used when `price_file` is unset
    pub price: f64,
    /// CSV with an hourly price column
    pub price_file: Option<PathBuf>,
    /// Paid per exported Wh
    pub feed_in_tariff: f64,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            price: 0.0002624,
            price_file: None,
            feed_in_tariff: 0.0000791,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub sense: ObjectiveSense,
    pub big_m: f64,
    pub solver: SolverBackend,
    pub time_limit_seconds: Option<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sense: ObjectiveSense::default(),
            big_m: DEFAULT_BIG_M,
            solver: SolverBackend::default(),
            time_limit_seconds: None,
        }
    }
}

impl ModelConfig {
    pub fn options(&self) -> ModelOptions {
        ModelOptions::default()
            .with_sense(self.sense)
            .with_big_m(self.big_m)
    }

    pub fn solver(&self) -> Result<GoodLpSolver, DispatchError> {
        GoodLpSolver::new(self.solver, self.time_limit_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub demand_file: PathBuf,
    pub demand_column: String,
    pub generation_file: PathBuf,
    pub generation_column: String,
    pub price_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            demand_file: PathBuf::from("data/demand.csv"),
            demand_column: "SUM_DEMAND".to_string(),
            generation_file: PathBuf::from("data/pvgen.csv"),
            generation_column: "SUM_GENERATION".to_string(),
            price_column: "PRICE".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file, then `BATTERYOPT__*` environment variables
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("config file {} does not exist", path.display());
                }
                path.to_path_buf()
            }
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config: Config = Self::figment(&file)
            .extract()
            .with_context(|| format!("failed to load configuration from {}", file.display()))?;
        Ok(config)
    }

    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("BATTERYOPT__").split("__"))
    }

    /// Every check that would otherwise fail halfway through a run
    pub fn validate(&self) -> Result<(), DispatchError> {
        self.battery.validate()?;
        self.model.options().validate()?;
        self.model.solver()?;

        let tariff = &self.tariff;
        if !tariff.price.is_finite() || tariff.price < 0.0 {
            return Err(DispatchError::config(format!(
                "price must be non-negative and finite, got {}",
                tariff.price
            )));
        }
        if !tariff.feed_in_tariff.is_finite() || tariff.feed_in_tariff < 0.0 {
            return Err(DispatchError::config(format!(
                "feed_in_tariff must be non-negative and finite, got {}",
                tariff.feed_in_tariff
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_match_reference_tool() {
        let config = Config::default();
        assert_eq!(config.tariff.price, 0.0002624);
        assert_eq!(config.tariff.feed_in_tariff, 0.0000791);
        assert_eq!(config.battery.soc_max_wh, 100_000.0);
        assert_eq!(config.model.big_m, 5.0e7);
        assert_eq!(config.data.demand_column, "SUM_DEMAND");
    }

    #[test]
    fn test_toml_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "batteryopt.toml",
                r#"
                [battery]
                soc_min_wh = 5000.0
                soc_max_wh = 50000.0

                [model]
                sense = "minimize_cost"
                "#,
            )?;
            jail.set_env("BATTERYOPT__TARIFF__PRICE", "0.0003");

            let config = Config::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.battery.soc_min_wh, 5000.0);
            assert_eq!(config.battery.soc_max_wh, 50000.0);
            // untouched keys keep their defaults
            assert_eq!(config.battery.charge_max_w, 32_000.0);
            assert_eq!(config.model.sense, ObjectiveSense::MinimizeCost);
            assert_eq!(config.tariff.price, 0.0003);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/batteryopt.toml"))).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_tariff() {
        let mut config = Config::default();
        config.tariff.feed_in_tariff = -1.0;
        assert!(matches!(config.validate(), Err(DispatchError::InvalidConfig(_))));
    }
}
