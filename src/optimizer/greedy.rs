use super::types::{DispatchPlan, DispatchStrategy};
use crate::domain::{BatteryConfig, DispatchTable, Entity, TimeSeriesInput};
use crate::error::DispatchError;

/// Solver-free forward simulation of the battery
///
/// Rules, applied hour by hour starting from `soc_min`:
/// - PV surplus charges the battery up to `soc_max`, the rest is exported
/// - a shortfall is covered from the battery down to `soc_min`, the rest is bought
///
/// No lookahead, so it is neither optimal nor guaranteed to end the horizon at
/// its starting state of charge. It serves as a baseline to compare the exact
/// formulation against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreedyDispatchHeuristic {
    pub soc_min_wh: f64,
    pub soc_max_wh: f64,
}

/// Hourly output of [`GreedyDispatchHeuristic::run`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeuristicSchedule {
    pub soc: Vec<f64>,
    pub pv_export: Vec<f64>,
    pub charge_power: Vec<f64>,
    pub discharge_power: Vec<f64>,
    /// Shortfall left after discharging, bought from the grid
    pub grid_import: Vec<f64>,
}

impl GreedyDispatchHeuristic {
    pub fn new(soc_min_wh: f64, soc_max_wh: f64) -> Result<Self, DispatchError> {
        if !soc_min_wh.is_finite() || !soc_max_wh.is_finite() {
            return Err(DispatchError::config("soc bounds must be finite"));
        }
        if soc_min_wh < 0.0 || soc_min_wh > soc_max_wh {
            return Err(DispatchError::config(format!(
                "soc bounds must satisfy 0 <= soc_min <= soc_max, got [{soc_min_wh}, {soc_max_wh}]"
            )));
        }
        Ok(Self {
            soc_min_wh,
            soc_max_wh,
        })
    }

    /// One forward pass over the horizon
    pub fn run(&self, input: &TimeSeriesInput) -> HeuristicSchedule {
        let n = input.horizon();
        let mut schedule = HeuristicSchedule {
            soc: vec![0.0; n],
            pv_export: vec![0.0; n],
            charge_power: vec![0.0; n],
            discharge_power: vec![0.0; n],
            grid_import: vec![0.0; n],
        };
        schedule.soc[0] = self.soc_min_wh;

        for t in 0..n {
            let generation = input.pv()[t];
            let demand = input.demand()[t];
            let soc = schedule.soc[t];

            if generation >= demand {
                let surplus = generation - demand;
                if surplus > 0.0 {
                    let headroom = self.soc_max_wh - soc;
                    if surplus <= headroom {
                        schedule.charge_power[t] = surplus;
                    } else {
                        schedule.charge_power[t] = headroom;
                        schedule.pv_export[t] = surplus - headroom;
                    }
                }
            } else {
                let shortfall = demand - generation;
                if soc > self.soc_min_wh {
                    schedule.discharge_power[t] = (soc - self.soc_min_wh).min(shortfall);
                }
                schedule.grid_import[t] = shortfall - schedule.discharge_power[t];
            }

            if t + 1 < n {
                schedule.soc[t + 1] =
                    soc - schedule.discharge_power[t] + schedule.charge_power[t];
            }
        }

        tracing::debug!(
            hours = n,
            charged_wh = schedule.charge_power.iter().sum::<f64>(),
            discharged_wh = schedule.discharge_power.iter().sum::<f64>(),
            final_soc_wh = schedule.soc.last().copied().unwrap_or(self.soc_min_wh),
            "greedy dispatch finished"
        );

        schedule
    }
}

impl HeuristicSchedule {
    /// Lay the schedule out like a solved model
    ///
    /// Indicator columns are derived from the flows: buying when importing,
    /// charging / discharging when the respective power is positive.
    pub fn into_table(mut self, input: &TimeSeriesInput) -> Result<DispatchTable, DispatchError> {
        let n = input.horizon();
        let flag = |values: &[f64]| -> Vec<f64> {
            values.iter().map(|v| if *v > 0.0 { 1.0 } else { 0.0 }).collect()
        };

        let mut is_buying = flag(&self.grid_import);
        let mut is_charging = flag(&self.charge_power);
        let mut is_discharging = flag(&self.discharge_power);
        let mut unmet: Vec<f64> = (0..n).map(|t| input.shortfall(t)).collect();
        let mut excess: Vec<f64> = (0..n).map(|t| input.surplus(t)).collect();

        DispatchTable::try_from_fn(n, |entity| match entity {
            Entity::GridImport => std::mem::take(&mut self.grid_import),
            Entity::PvExport => std::mem::take(&mut self.pv_export),
            Entity::ChargePower => std::mem::take(&mut self.charge_power),
            Entity::DischargePower => std::mem::take(&mut self.discharge_power),
            Entity::UnmetDemand => std::mem::take(&mut unmet),
            Entity::ExcessPv => std::mem::take(&mut excess),
            Entity::Soc => std::mem::take(&mut self.soc),
            Entity::IsBuying => std::mem::take(&mut is_buying),
            Entity::IsCharging => std::mem::take(&mut is_charging),
            Entity::IsDischarging => std::mem::take(&mut is_discharging),
        })
    }
}

/// [`DispatchStrategy`] running the heuristic with the battery's soc bounds
///
/// Power limits and efficiencies are not modelled by the heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyDispatcher;

impl DispatchStrategy for GreedyDispatcher {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn dispatch(
        &self,
        input: &TimeSeriesInput,
        battery: &BatteryConfig,
    ) -> Result<DispatchPlan, DispatchError> {
        battery.validate()?;
        let heuristic = GreedyDispatchHeuristic::new(battery.soc_min_wh, battery.soc_max_wh)?;
        let table = heuristic.run(input).into_table(input)?;
        Ok(DispatchPlan::new(self.name(), table, input, None))
    }
}
