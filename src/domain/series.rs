use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Number of hourly timesteps in the yearly horizon
pub const HOURS_PER_YEAR: usize = 8760;

/// Electricity purchase price ($/Wh)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSignal {
    /// One price for every hour
    Flat(f64),
    /// One price per timestep
    Hourly(Vec<f64>),
}

impl PriceSignal {
    /// Price at timestep `t`
    ///
    /// Only meaningful once the signal has been aligned to a horizon by
    /// [`TimeSeriesInput`].
    pub fn at(&self, t: usize) -> f64 {
        match self {
            PriceSignal::Flat(price) => *price,
            PriceSignal::Hourly(prices) => prices[t],
        }
    }
}

/// Hourly demand, PV generation and tariffs over one horizon
///
/// All series are index-aligned and have exactly `horizon()` entries. The
/// struct is immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesInput {
    demand_w: Vec<f64>,
    pv_w: Vec<f64>,
    price: PriceSignal,
    feed_in_tariff: f64,
}

impl TimeSeriesInput {
    /// Build a full-year input (8760 hourly values per series)
    pub fn new(
        demand_w: Vec<f64>,
        pv_w: Vec<f64>,
        price: PriceSignal,
        feed_in_tariff: f64,
    ) -> Result<Self, DispatchError> {
        Self::with_horizon(HOURS_PER_YEAR, demand_w, pv_w, price, feed_in_tariff)
    }

    /// Build an input over an explicit number of hours
    ///
    /// The last hour wraps around to hour 0 exactly as hour 8759 does for a
    /// full year.
    pub fn with_horizon(
        hours: usize,
        demand_w: Vec<f64>,
        pv_w: Vec<f64>,
        price: PriceSignal,
        feed_in_tariff: f64,
    ) -> Result<Self, DispatchError> {
        if hours == 0 {
            return Err(DispatchError::misaligned("horizon must contain at least one hour"));
        }
        if demand_w.len() != hours {
            return Err(DispatchError::misaligned(format!(
                "demand series has {} values, expected {hours}",
                demand_w.len()
            )));
        }
        if pv_w.len() != hours {
            return Err(DispatchError::misaligned(format!(
                "generation series has {} values, expected {hours}",
                pv_w.len()
            )));
        }
        if let PriceSignal::Hourly(prices) = &price {
            if prices.len() != hours {
                return Err(DispatchError::misaligned(format!(
                    "price series has {} values, expected {hours}",
                    prices.len()
                )));
            }
        }

        check_series("demand", &demand_w)?;
        check_series("generation", &pv_w)?;
        match &price {
            PriceSignal::Flat(p) => check_series("price", std::slice::from_ref(p))?,
            PriceSignal::Hourly(prices) => check_series("price", prices)?,
        }
        check_series("feed-in tariff", std::slice::from_ref(&feed_in_tariff))?;

        Ok(Self {
            demand_w,
            pv_w,
            price,
            feed_in_tariff,
        })
    }

    /// Number of timesteps
    pub fn horizon(&self) -> usize {
        self.demand_w.len()
    }

    pub fn demand(&self) -> &[f64] {
        &self.demand_w
    }

    pub fn pv(&self) -> &[f64] {
        &self.pv_w
    }

    pub fn price_signal(&self) -> &PriceSignal {
        &self.price
    }

    pub fn price(&self, t: usize) -> f64 {
        self.price.at(t)
    }

    pub fn feed_in_tariff(&self) -> f64 {
        self.feed_in_tariff
    }

    /// `max(demand - pv, 0)` at timestep `t`
    pub fn shortfall(&self, t: usize) -> f64 {
        (self.demand_w[t] - self.pv_w[t]).max(0.0)
    }

    /// `max(pv - demand, 0)` at timestep `t`
    pub fn surplus(&self, t: usize) -> f64 {
        (self.pv_w[t] - self.demand_w[t]).max(0.0)
    }
}

fn check_series(name: &str, values: &[f64]) -> Result<(), DispatchError> {
    if let Some((t, v)) = values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(DispatchError::input(format!(
            "{name} value at hour {t} must be finite and non-negative, got {v}"
        )));
    }
    Ok(())
}
