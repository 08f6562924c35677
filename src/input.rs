use crate::core::model::{
    Meter, MeterId, MeterReading, MeterSource, MeterType, OrganizationId, PropertyId, ScenarioId,
    Sensor, SensorId, SensorReading,
};
use crate::core::store::{InMemoryInventory, OrganizationRecord, PropertyRecord};
use crate::core::units::Country;
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, FixedOffset, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// Reads a JSON inventory document and materializes it as an in-memory store.
///
/// Readings are validated (`start_time <= end_time`) and sorted into the order
/// the store contract promises: ascending `(start_time, end_time)` for meter
/// readings, ascending timestamp for sensor readings.
pub fn ingest_inventory(json: impl Read) -> anyhow::Result<InMemoryInventory> {
    let input: Inventory =
        serde_json::from_reader(json).context("inventory JSON failed to parse")?;
    build_inventory(input)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inventory {
    pub organizations: Vec<OrganizationInput>,
    pub properties: Vec<PropertyInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationInput {
    pub id: OrganizationId,
    #[serde(default)]
    pub display_meter_units: IndexMap<String, String>,
    #[serde(default)]
    pub country: Country,
    /// Fixed UTC offset, e.g. "-05:00".
    #[serde(default = "default_timezone", deserialize_with = "deserialize_utc_offset")]
    pub timezone: FixedOffset,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyInput {
    pub id: PropertyId,
    pub organization: OrganizationId,
    #[serde(default)]
    pub meters: Vec<MeterInput>,
    #[serde(default)]
    pub data_loggers: Vec<DataLoggerInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeterInput {
    pub id: MeterId,
    #[serde(rename = "type")]
    pub meter_type: MeterType,
    pub source: MeterSource,
    pub source_id: String,
    #[serde(default)]
    pub scenario_id: Option<ScenarioId>,
    #[serde(default)]
    pub readings: Vec<MeterReadingInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeterReadingInput {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reading: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataLoggerInput {
    pub display_name: String,
    #[serde(default)]
    pub sensors: Vec<SensorInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorInput {
    pub id: SensorId,
    pub display_name: String,
    #[serde(default)]
    pub readings: Vec<SensorReadingInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorReadingInput {
    pub timestamp: DateTime<Utc>,
    pub reading: f64,
    #[serde(default)]
    pub is_occupied: bool,
}

fn default_timezone() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is always valid")
}

fn deserialize_utc_offset<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<FixedOffset, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_utc_offset(&raw).map_err(serde::de::Error::custom)
}

fn parse_utc_offset(raw: &str) -> anyhow::Result<FixedOffset> {
    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => bail!("UTC offset \"{raw}\" must start with '+' or '-'"),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| anyhow!("UTC offset \"{raw}\" must look like \"+HH:MM\""))?;
    let hours: i32 = hours.parse().context("offset hours")?;
    let minutes: i32 = minutes.parse().context("offset minutes")?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("UTC offset \"{raw}\" is out of range"))
}

fn build_inventory(input: Inventory) -> anyhow::Result<InMemoryInventory> {
    let mut inventory = InMemoryInventory::default();

    for org in input.organizations {
        inventory.organizations.insert(
            org.id,
            OrganizationRecord {
                display_meter_units: org.display_meter_units,
                country: org.country,
                timezone: org.timezone,
            },
        );
    }

    for property in input.properties {
        if !inventory.organizations.contains_key(&property.organization) {
            bail!(
                "property {} references unknown organization {}",
                property.id,
                property.organization
            );
        }

        let mut record = PropertyRecord {
            organization: property.organization,
            meter_ids: vec![],
            sensor_ids: vec![],
        };

        for meter in property.meters {
            let mut readings = Vec::with_capacity(meter.readings.len());
            for reading in meter.readings {
                if reading.start_time > reading.end_time {
                    bail!(
                        "meter {} has a reading ending before it starts ({} > {})",
                        meter.id,
                        reading.start_time,
                        reading.end_time
                    );
                }
                readings.push(MeterReading {
                    start_time: reading.start_time,
                    end_time: reading.end_time,
                    reading: reading.reading,
                });
            }
            readings.sort_by_key(|r| (r.start_time, r.end_time));

            record.meter_ids.push(meter.id);
            inventory.meters.insert(
                meter.id,
                Meter {
                    id: meter.id,
                    property_id: property.id,
                    scenario_id: meter.scenario_id,
                    meter_type: meter.meter_type,
                    source: meter.source,
                    source_id: meter.source_id,
                },
            );
            inventory.meter_readings.insert(meter.id, readings);
        }

        for logger in property.data_loggers {
            for sensor in logger.sensors {
                let mut readings: Vec<SensorReading> = sensor
                    .readings
                    .into_iter()
                    .map(|r| SensorReading {
                        timestamp: r.timestamp,
                        reading: r.reading,
                        is_occupied: r.is_occupied,
                    })
                    .collect();
                readings.sort_by_key(|r| r.timestamp);

                record.sensor_ids.push(sensor.id);
                inventory.sensors.insert(
                    sensor.id,
                    Sensor {
                        id: sensor.id,
                        display_name: sensor.display_name,
                        data_logger_name: logger.display_name.clone(),
                    },
                );
                inventory.sensor_readings.insert(sensor.id, readings);
            }
        }

        inventory.properties.insert(property.id, record);
    }

    Ok(inventory)
}
