use crate::core::calendar;
use crate::core::columns::{ColumnDef, ColumnDefs, FilterType};
use crate::core::exporter::{CellValue, ReadingInterval, ReadingRow, ReadingsExport, TIME_FORMAT};
use crate::core::model::{OrganizationId, PropertyId, Sensor, SensorId};
use crate::core::store::{OrganizationStore, SensorStore};
use crate::errors::ExportError;
use chrono::{Datelike, FixedOffset};
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::BTreeMap;

/// Aggregates one property's sensor readings into exact, monthly or yearly
/// buckets. Sensors produce point readings: Month and Year modes report the
/// bucket average (not a sum), no unit conversion applies, and points cannot
/// overlap so no overlap resolution is involved.
pub struct PropertySensorReadingsExporter<'a, S: SensorStore> {
    sensors: Vec<Sensor>,
    store: &'a S,
    tz: FixedOffset,
    show_only_occupied_readings: bool,
}

impl<'a, S: SensorStore> PropertySensorReadingsExporter<'a, S> {
    pub fn new<O: OrganizationStore>(
        store: &'a S,
        org_store: &O,
        property_id: PropertyId,
        org_id: OrganizationId,
        excluded_sensor_ids: &[SensorId],
        show_only_occupied_readings: bool,
    ) -> Result<Self, ExportError> {
        let sensors = store.sensors_for_property(property_id, org_id, excluded_sensor_ids)?;
        let tz = org_store.timezone(org_id)?;

        Ok(Self {
            sensors,
            store,
            tz,
            show_only_occupied_readings,
        })
    }

    pub fn readings_and_column_defs(
        &self,
        interval: ReadingInterval,
    ) -> Result<ReadingsExport, ExportError> {
        match interval {
            ReadingInterval::Exact => self.usages_by_exact_times(),
            ReadingInterval::Month => self.usages_by_month(),
            ReadingInterval::Year => self.usages_by_year(),
        }
    }

    /// One row per distinct timestamp across all sensors, formatted to second
    /// precision in the organization's timezone.
    fn usages_by_exact_times(&self) -> Result<ReadingsExport, ExportError> {
        let mut timestamps: IndexMap<String, ReadingRow> = IndexMap::new();

        let mut column_defs = ColumnDefs::new();
        column_defs.register(
            "_timestamp",
            ColumnDef {
                field: "timestamp".to_string(),
                display_name: None,
                filter_type: FilterType::Datetime,
            },
        );

        for sensor in &self.sensors {
            let field_name = build_column_def(sensor, &mut column_defs);

            for reading in self
                .store
                .sensor_readings(sensor.id, self.show_only_occupied_readings)?
            {
                let timestamp = reading
                    .timestamp
                    .with_timezone(&self.tz)
                    .format(TIME_FORMAT)
                    .to_string();

                let row = timestamps.entry(timestamp.clone()).or_default();
                row.insert("timestamp".to_string(), CellValue::Text(timestamp));
                row.insert(field_name.clone(), CellValue::Number(reading.reading));
            }
        }

        Ok(ReadingsExport {
            readings: timestamps.into_values().collect(),
            column_defs: column_defs.into_vec(),
        })
    }

    /// Average reading per sensor per calendar month, in chronological order.
    fn usages_by_month(&self) -> Result<ReadingsExport, ExportError> {
        let mut monthly_readings: BTreeMap<(i32, u32), ReadingRow> = BTreeMap::new();

        let mut column_defs = ColumnDefs::new();
        column_defs.register(
            "_month",
            ColumnDef {
                field: "month".to_string(),
                display_name: None,
                filter_type: FilterType::Datetime,
            },
        );

        for sensor in &self.sensors {
            let field_name = build_column_def(sensor, &mut column_defs);
            let readings = self
                .store
                .sensor_readings(sensor.id, self.show_only_occupied_readings)?;

            // readings arrive timestamp-ordered, so month chunks are contiguous
            for ((year, month), chunk) in &readings.iter().chunk_by(|reading| {
                let local = reading.timestamp.with_timezone(&self.tz);
                (local.year(), local.month())
            }) {
                let (count, sum) = chunk.fold((0usize, 0.0), |(count, sum), reading| {
                    (count + 1, sum + reading.reading)
                });

                let row = monthly_readings.entry((year, month)).or_default();
                row.entry("month".to_string())
                    .or_insert_with(|| CellValue::Text(calendar::month_label(year, month)));
                row.insert(field_name.clone(), CellValue::Number(sum / count as f64));
            }
        }

        Ok(ReadingsExport {
            readings: monthly_readings.into_values().collect(),
            column_defs: column_defs.into_vec(),
        })
    }

    /// Average reading per sensor per calendar year, ascending by year.
    fn usages_by_year(&self) -> Result<ReadingsExport, ExportError> {
        let mut yearly_readings: BTreeMap<i32, ReadingRow> = BTreeMap::new();

        let mut column_defs = ColumnDefs::new();
        column_defs.register(
            "_year",
            ColumnDef {
                field: "year".to_string(),
                display_name: None,
                filter_type: FilterType::Datetime,
            },
        );

        for sensor in &self.sensors {
            let field_name = build_column_def(sensor, &mut column_defs);
            let readings = self
                .store
                .sensor_readings(sensor.id, self.show_only_occupied_readings)?;

            for (year, chunk) in &readings
                .iter()
                .chunk_by(|reading| reading.timestamp.with_timezone(&self.tz).year())
            {
                let (count, sum) = chunk.fold((0usize, 0.0), |(count, sum), reading| {
                    (count + 1, sum + reading.reading)
                });

                let row = yearly_readings.entry(year).or_default();
                row.entry("year".to_string())
                    .or_insert(CellValue::Integer(year));
                row.insert(field_name.clone(), CellValue::Number(sum / count as f64));
            }
        }

        Ok(ReadingsExport {
            readings: yearly_readings.into_values().collect(),
            column_defs: column_defs.into_vec(),
        })
    }
}

/// Sensor columns are named "<sensor display name> (<data logger name>)" and
/// need no unit resolution.
fn build_column_def(sensor: &Sensor, column_defs: &mut ColumnDefs) -> String {
    let field_name = format!("{} ({})", sensor.display_name, sensor.data_logger_name);
    column_defs.register(
        field_name.clone(),
        ColumnDef {
            field: field_name.clone(),
            display_name: Some(field_name.clone()),
            filter_type: FilterType::Reading,
        },
    );
    field_name
}
