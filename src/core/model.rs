use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use strum_macros::Display as StrumDisplay;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyId(pub u64);

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OrganizationId(pub u64);

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MeterId(pub u64);

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScenarioId(pub u64);

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SensorId(pub u64);

impl Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for OrganizationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for MeterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for SensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The physical quantity a meter measures. The string forms are the wire
/// vocabulary used both in ingested data and as lookup keys into organization
/// display settings and the conversion-factor tables.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, StrumDisplay)]
pub enum MeterType {
    #[serde(rename = "Coal (anthracite)")]
    #[strum(to_string = "Coal (anthracite)")]
    CoalAnthracite,
    #[serde(rename = "Coal (bituminous)")]
    #[strum(to_string = "Coal (bituminous)")]
    CoalBituminous,
    #[serde(rename = "Coke")]
    #[strum(to_string = "Coke")]
    Coke,
    #[serde(rename = "Diesel")]
    #[strum(to_string = "Diesel")]
    Diesel,
    #[serde(rename = "District Chilled Water")]
    #[strum(to_string = "District Chilled Water")]
    DistrictChilledWater,
    #[serde(rename = "District Hot Water")]
    #[strum(to_string = "District Hot Water")]
    DistrictHotWater,
    #[serde(rename = "District Steam")]
    #[strum(to_string = "District Steam")]
    DistrictSteam,
    #[serde(rename = "Electric - Grid")]
    #[strum(to_string = "Electric - Grid")]
    ElectricGrid,
    #[serde(rename = "Electric - Solar")]
    #[strum(to_string = "Electric - Solar")]
    ElectricSolar,
    #[serde(rename = "Electric - Wind")]
    #[strum(to_string = "Electric - Wind")]
    ElectricWind,
    #[serde(rename = "Fuel Oil (No. 1)")]
    #[strum(to_string = "Fuel Oil (No. 1)")]
    FuelOilNo1,
    #[serde(rename = "Fuel Oil (No. 2)")]
    #[strum(to_string = "Fuel Oil (No. 2)")]
    FuelOilNo2,
    #[serde(rename = "Kerosene")]
    #[strum(to_string = "Kerosene")]
    Kerosene,
    #[serde(rename = "Natural Gas")]
    #[strum(to_string = "Natural Gas")]
    NaturalGas,
    #[serde(rename = "Propane")]
    #[strum(to_string = "Propane")]
    Propane,
    #[serde(rename = "Wood")]
    #[strum(to_string = "Wood")]
    Wood,
    #[serde(rename = "Other")]
    #[strum(to_string = "Other")]
    Other,
    /// Monetary readings bypass the thermal factor tables entirely.
    #[serde(rename = "Cost")]
    #[strum(to_string = "Cost")]
    Cost,
}

/// Where a meter's readings were ingested from.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, StrumDisplay)]
pub enum MeterSource {
    #[serde(rename = "Portfolio Manager")]
    #[strum(to_string = "Portfolio Manager")]
    PortfolioManager,
    #[serde(rename = "GreenButton")]
    #[strum(to_string = "GreenButton")]
    GreenButton,
    #[serde(rename = "BuildingSync")]
    #[strum(to_string = "BuildingSync")]
    BuildingSync,
    #[serde(rename = "Manual Entry")]
    #[strum(to_string = "Manual Entry")]
    ManualEntry,
}

/// A logical measurement channel on a property, producing interval readings.
#[derive(Clone, Debug, PartialEq)]
pub struct Meter {
    pub id: MeterId,
    pub property_id: PropertyId,
    pub scenario_id: Option<ScenarioId>,
    pub meter_type: MeterType,
    pub source: MeterSource,
    pub source_id: String,
}

/// One interval reading: a quantity accumulated over `[start_time, end_time]`,
/// stored in kBtu for thermal types.
///
/// Invariant: `start_time <= end_time` (checked at ingestion time).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeterReading {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reading: f64,
}

/// An instantaneous sensor channel, reached through a data logger bound to
/// the property.
#[derive(Clone, Debug, PartialEq)]
pub struct Sensor {
    pub id: SensorId,
    pub display_name: String,
    pub data_logger_name: String,
}

/// One point reading taken by a sensor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    pub reading: f64,
    pub is_occupied: bool,
}

/// Extracts the canonical usage point id from a GreenButton (ESPI) source id,
/// which arrives as a resource URL such as
/// `https://example.org/espi/1_1/resource/Subscription/1/UsagePoint/409483/MeterReading/1`.
///
/// The id is the path segment following `UsagePoint`. Source ids without such
/// a segment are used verbatim.
pub(crate) fn usage_point_id(raw_source_id: &str) -> &str {
    let mut segments = raw_source_id.split('/');
    while let Some(segment) = segments.next() {
        if segment == "UsagePoint" {
            if let Some(id) = segments.next() {
                if !id.is_empty() {
                    return id;
                }
            }
        }
    }
    raw_source_id
}
