use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};

use crate::error::DispatchError;

/// Per-timestep quantity tracked by a dispatch schedule
///
/// The declaration order is the column order of every [`DispatchTable`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    EnumCount,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
    /// Power bought from the grid (W)
    GridImport,
    /// PV power sold to the grid (W)
    PvExport,
    /// Battery charging power (W)
    ChargePower,
    /// Battery discharging power (W)
    DischargePower,
    /// Demand not covered by PV (W)
    UnmetDemand,
    /// PV generation above demand (W)
    ExcessPv,
    /// Battery state of charge (Wh)
    Soc,
    IsBuying,
    IsCharging,
    IsDischarging,
}

impl Entity {
    /// Whether the entity is a 0/1 indicator flag
    pub fn is_indicator(self) -> bool {
        matches!(self, Entity::IsBuying | Entity::IsCharging | Entity::IsDischarging)
    }

    pub fn unit(self) -> &'static str {
        match self {
            Entity::Soc => "Wh",
            e if e.is_indicator() => "-",
            _ => "W",
        }
    }
}

/// One row of a [`DispatchTable`], used for serialization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispatchRow {
    pub time_step: usize,
    pub grid_import: f64,
    pub pv_export: f64,
    pub charge_power: f64,
    pub discharge_power: f64,
    pub unmet_demand: f64,
    pub excess_pv: f64,
    pub soc: f64,
    pub is_buying: f64,
    pub is_charging: f64,
    pub is_discharging: f64,
}

/// Hourly schedule with one column per [`Entity`]
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchTable {
    horizon: usize,
    columns: Vec<Vec<f64>>,
}

impl DispatchTable {
    /// Build a table by asking `column` for every entity in column order
    pub fn try_from_fn<F>(horizon: usize, mut column: F) -> Result<Self, DispatchError>
    where
        F: FnMut(Entity) -> Vec<f64>,
    {
        let mut columns = Vec::with_capacity(Entity::COUNT);
        for entity in Entity::iter() {
            let values = column(entity);
            if values.len() != horizon {
                return Err(DispatchError::misaligned(format!(
                    "column {entity} has {} values, expected {horizon}",
                    values.len()
                )));
            }
            columns.push(values);
        }
        Ok(Self { horizon, columns })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn column(&self, entity: Entity) -> &[f64] {
        &self.columns[entity as usize]
    }

    pub fn value(&self, entity: Entity, t: usize) -> f64 {
        self.columns[entity as usize][t]
    }

    /// Column values summed over the horizon
    pub fn total(&self, entity: Entity) -> f64 {
        self.column(entity).iter().sum()
    }

    pub fn row(&self, t: usize) -> DispatchRow {
        DispatchRow {
            time_step: t,
            grid_import: self.value(Entity::GridImport, t),
            pv_export: self.value(Entity::PvExport, t),
            charge_power: self.value(Entity::ChargePower, t),
            discharge_power: self.value(Entity::DischargePower, t),
            unmet_demand: self.value(Entity::UnmetDemand, t),
            excess_pv: self.value(Entity::ExcessPv, t),
            soc: self.value(Entity::Soc, t),
            is_buying: self.value(Entity::IsBuying, t),
            is_charging: self.value(Entity::IsCharging, t),
            is_discharging: self.value(Entity::IsDischarging, t),
        }
    }

    /// Rows in timestep order
    pub fn rows(&self) -> impl Iterator<Item = DispatchRow> + '_ {
        (0..self.horizon).map(|t| self.row(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_names() {
        assert_eq!(Entity::GridImport.to_string(), "grid_import");
        assert_eq!(Entity::IsDischarging.as_ref(), "is_discharging");
        assert_eq!("soc".parse::<Entity>().unwrap(), Entity::Soc);
        assert_eq!(Entity::iter().count(), Entity::COUNT);
    }

    #[test]
    fn test_entity_units() {
        assert_eq!(Entity::Soc.unit(), "Wh");
        assert_eq!(Entity::IsBuying.unit(), "-");
        assert_eq!(Entity::ChargePower.unit(), "W");
    }

    #[test]
    fn test_table_columns_follow_entity_order() {
        let table =
            DispatchTable::try_from_fn(3, |entity| vec![entity as usize as f64; 3]).unwrap();
        assert_eq!(table.horizon(), 3);
        assert_eq!(table.column(Entity::PvExport), &[1.0, 1.0, 1.0]);
        assert_eq!(table.total(Entity::Soc), 18.0);

        let row = table.row(2);
        assert_eq!(row.time_step, 2);
        assert_eq!(row.is_discharging, 9.0);
        assert_eq!(table.rows().count(), 3);
    }

    #[test]
    fn test_short_column_rejected() {
        let result = DispatchTable::try_from_fn(3, |entity| match entity {
            Entity::Soc => vec![0.0; 2],
            _ => vec![0.0; 3],
        });
        assert!(matches!(result, Err(DispatchError::MisalignedInput(_))));
    }
}
