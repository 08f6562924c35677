use crate::core::calendar;
use crate::core::columns::{ColumnDef, ColumnDefs, FilterType};
use crate::core::exporter::{round2, CellValue, ReadingInterval, ReadingRow, ReadingsExport, TIME_FORMAT};
use crate::core::model::{usage_point_id, Meter, MeterId, MeterSource, MeterType, OrganizationId, PropertyId, ScenarioId};
use crate::core::overlap::{max_reading_total, WeightedInterval};
use crate::core::store::{MeterStore, OrganizationStore};
use crate::core::units::{thermal_conversion_factors, ConversionFactors, Country, DEFAULT_TYPE_KEY};
use crate::errors::ExportError;
use chrono::{Datelike, Duration, FixedOffset, Utc};
use indexmap::IndexMap;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use tracing::warn;

/// Aggregates one property's meter readings into exact, monthly or yearly
/// buckets, converting stored kBtu magnitudes into the organization's
/// configured display units.
///
/// Instances are cheap, single-threaded and per-call; the country and the
/// conversion-factor table are resolved at most once per instance.
#[derive(Debug)]
pub struct PropertyMeterReadingsExporter<'a, M: MeterStore, O: OrganizationStore> {
    meters: Vec<Meter>,
    store: &'a M,
    org_store: &'a O,
    org_id: OrganizationId,
    display_settings: IndexMap<String, String>,
    tz: FixedOffset,
    country: OnceCell<Country>,
    factors: OnceCell<ConversionFactors>,
}

impl<'a, M: MeterStore, O: OrganizationStore> PropertyMeterReadingsExporter<'a, M, O> {
    pub fn new(
        store: &'a M,
        org_store: &'a O,
        property_id: PropertyId,
        org_id: OrganizationId,
        excluded_meter_ids: &[MeterId],
        scenario_ids: &[ScenarioId],
    ) -> Result<Self, ExportError> {
        let meters = store.meters_for_property(property_id, org_id, excluded_meter_ids, scenario_ids)?;
        let display_settings = org_store.display_meter_units(org_id)?;
        let tz = org_store.timezone(org_id)?;

        Ok(Self {
            meters,
            store,
            org_store,
            org_id,
            display_settings,
            tz,
            country: OnceCell::new(),
            factors: OnceCell::new(),
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

    /// One row per distinct `(start_time, end_time)` pair across all meters,
    /// formatted to second precision in the organization's timezone. Readings
    /// from different meters that share a window merge into one row.
    fn usages_by_exact_times(&self) -> Result<ReadingsExport, ExportError> {
        let mut start_end_times: IndexMap<String, ReadingRow> = IndexMap::new();

        let mut column_defs = ColumnDefs::new();
        column_defs.register(
            "_start_time",
            ColumnDef {
                field: "start_time".to_string(),
                display_name: None,
                filter_type: FilterType::Datetime,
            },
        );
        column_defs.register(
            "_end_time",
            ColumnDef {
                field: "end_time".to_string(),
                display_name: None,
                filter_type: FilterType::Datetime,
            },
        );

        for meter in &self.meters {
            let (field_name, conversion_factor) = self.build_column_def(meter, &mut column_defs)?;

            for reading in self.store.meter_readings(meter.id)? {
                let start_time = reading
                    .start_time
                    .with_timezone(&self.tz)
                    .format(TIME_FORMAT)
                    .to_string();
                let end_time = reading
                    .end_time
                    .with_timezone(&self.tz)
                    .format(TIME_FORMAT)
                    .to_string();

                let times_key = format!("{start_time}-{end_time}");
                let row = start_end_times.entry(times_key).or_default();
                row.insert("start_time".to_string(), CellValue::Text(start_time));
                row.insert("end_time".to_string(), CellValue::Text(end_time));
                row.insert(
                    field_name.clone(),
                    CellValue::Number(reading.reading / conversion_factor),
                );
            }
        }

        Ok(ReadingsExport {
            readings: start_end_times.into_values().collect(),
            column_defs: column_defs.into_vec(),
        })
    }

    /// Splits every reading into single-month sub-ranges, apportioning its
    /// value linearly by wall-clock seconds, and accumulates the converted
    /// sub-values into "<Month name> <Year>" buckets. Running totals round to
    /// 2 decimal places after each addition; rows come out in chronological
    /// order.
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

        for meter in &self.meters {
            let (field_name, conversion_factor) = self.build_column_def(meter, &mut column_defs)?;

            for reading in self.store.meter_readings(meter.id)? {
                let start_time = reading.start_time.with_timezone(&self.tz);
                let end_time = reading.end_time.with_timezone(&self.tz);
                let total_seconds = (end_time - start_time).num_seconds();
                if total_seconds <= 0 {
                    continue;
                }

                let mut current_time = start_time;
                while current_time < end_time {
                    // month windows close at the last whole second (23:59:59)
                    let end_of_month = calendar::end_of_month(current_time);
                    let range_end = end_time.min(end_of_month);
                    let seconds_in_range = (range_end - current_time).num_seconds();

                    if seconds_in_range > 0 {
                        let sub_value =
                            reading.reading / total_seconds as f64 * seconds_in_range as f64;
                        let bucket = (range_end.year(), range_end.month());
                        let row = monthly_readings.entry(bucket).or_default();
                        row.entry("month".to_string()).or_insert_with(|| {
                            CellValue::Text(calendar::month_label(range_end.year(), range_end.month()))
                        });
                        let cell = row
                            .entry(field_name.clone())
                            .or_insert(CellValue::Number(0.0));
                        if let CellValue::Number(total) = cell {
                            *total = round2(*total + sub_value / conversion_factor);
                        }
                    }

                    current_time = if range_end == end_of_month {
                        end_of_month + Duration::seconds(1)
                    } else {
                        end_time
                    };
                }
            }
        }

        Ok(ReadingsExport {
            readings: monthly_readings.into_values().collect(),
            column_defs: column_defs.into_vec(),
        })
    }

    /// Walks calendar years across each meter's overall reading span. A year
    /// bucket takes only readings whose entire interval falls inside the year
    /// window; those are resolved to a single maximum non-overlapping total
    /// rather than summed, since ingestion can deliver duplicate or
    /// overlapping submissions.
    ///
    /// Readings straddling a year boundary are excluded from both adjacent
    /// years (upstream behavior, kept as-is pending a decision on
    /// apportioning them); each exclusion is logged.
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

        for meter in &self.meters {
            let (field_name, conversion_factor) = self.build_column_def(meter, &mut column_defs)?;

            let readings = self.store.meter_readings(meter.id)?;
            let Some(min_time) = readings.iter().map(|r| r.start_time).min() else {
                continue;
            };
            let max_time = readings
                .iter()
                .map(|r| r.end_time)
                .max()
                .unwrap_or(min_time);

            let first_year = min_time.with_timezone(&self.tz).year();
            let last_year = max_time.with_timezone(&self.tz).year();

            for year in first_year..=last_year {
                let window_start = calendar::start_of_year(year, self.tz).with_timezone(&Utc);
                let window_end = calendar::end_of_year(year, self.tz).with_timezone(&Utc);

                for reading in &readings {
                    if reading.start_time < window_start && reading.end_time > window_start {
                        warn!(
                            meter_id = meter.id.0,
                            start_time = %reading.start_time,
                            end_time = %reading.end_time,
                            year,
                            "reading straddles a calendar-year boundary and is excluded from both years"
                        );
                    }
                }

                let mut in_year: Vec<WeightedInterval> = readings
                    .iter()
                    .filter(|r| r.start_time >= window_start && r.end_time <= window_end)
                    .map(|r| WeightedInterval {
                        start: r.start_time,
                        end: r.end_time,
                        value: r.reading,
                    })
                    .collect();

                if in_year.is_empty() {
                    continue;
                }

                // the resolver requires ascending end times
                in_year.sort_by_key(|r| r.end);
                let reading_year_total = max_reading_total(&in_year);

                let row = yearly_readings.entry(year).or_default();
                row.entry("year".to_string())
                    .or_insert(CellValue::Integer(year));
                row.insert(
                    field_name.clone(),
                    CellValue::Number(reading_year_total / conversion_factor),
                );
            }
        }

        Ok(ReadingsExport {
            readings: yearly_readings.into_values().collect(),
            column_defs: column_defs.into_vec(),
        })
    }

    /// Resolves a meter's output field name, display unit and conversion
    /// factor, and registers its column definition (idempotently).
    fn build_column_def(
        &self,
        meter: &Meter,
        column_defs: &mut ColumnDefs,
    ) -> Result<(String, f64), ExportError> {
        let type_name = meter.meter_type.to_string();
        let source_name = meter.source.to_string();
        let source_id = match meter.source {
            MeterSource::GreenButton => usage_point_id(&meter.source_id),
            _ => meter.source_id.as_str(),
        };
        let field_name = format!("{type_name} - {source_name} - {source_id}");

        let (display_unit, conversion_factor) = self.resolve_display_unit(meter.meter_type)?;

        column_defs.register(
            field_name.clone(),
            ColumnDef {
                field: field_name.clone(),
                display_name: Some(format!("{field_name} ({display_unit})")),
                filter_type: FilterType::Reading,
            },
        );

        Ok((field_name, conversion_factor))
    }

    /// Display unit and kBtu conversion factor for a meter type, applying the
    /// "Default" fallback to both the organization settings and the factor
    /// table. Cost meters bypass the factor table: the unit is the
    /// organization country's currency and the factor is 1.
    fn resolve_display_unit(&self, meter_type: MeterType) -> Result<(String, f64), ExportError> {
        if meter_type == MeterType::Cost {
            return Ok((self.org_country()?.cost_unit(), 1.0));
        }

        let type_name = meter_type.to_string();
        let display_unit = self
            .display_settings
            .get(&type_name)
            .or_else(|| self.display_settings.get(DEFAULT_TYPE_KEY))
            .ok_or_else(|| ExportError::MissingDisplayUnit {
                type_name: type_name.clone(),
            })?
            .clone();

        let factors = self.thermal_factors()?;
        let conversion_factor = factors
            .get(&type_name)
            .and_then(|units| units.get(&display_unit))
            .or_else(|| {
                factors
                    .get(DEFAULT_TYPE_KEY)
                    .and_then(|units| units.get(&display_unit))
            })
            .copied()
            .ok_or_else(|| ExportError::MissingConversionFactor {
                type_name,
                display_unit: display_unit.clone(),
            })?;

        Ok((display_unit, conversion_factor))
    }

    fn org_country(&self) -> Result<Country, ExportError> {
        if let Some(country) = self.country.get() {
            return Ok(*country);
        }
        let country = self.org_store.country(self.org_id)?;
        Ok(*self.country.get_or_init(|| country))
    }

    fn thermal_factors(&self) -> Result<&ConversionFactors, ExportError> {
        if let Some(factors) = self.factors.get() {
            return Ok(factors);
        }
        let country = self.org_country()?;
        Ok(self.factors.get_or_init(|| thermal_conversion_factors(country)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exporter::ReadingInterval;
    use crate::input::ingest_inventory;
    use crate::core::store::{InMemoryInventory, StoreError};
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    const ELECTRIC_FIELD: &str = "Electric - Grid - Portfolio Manager - 123";
    const GAS_FIELD: &str = "Natural Gas - Portfolio Manager - 456";

    fn inventory_from(value: serde_json::Value) -> InMemoryInventory {
        ingest_inventory(value.to_string().as_bytes()).unwrap()
    }

    fn exporter<'a>(
        inventory: &'a InMemoryInventory,
        excluded: &[MeterId],
        scenarios: &[ScenarioId],
    ) -> PropertyMeterReadingsExporter<'a, InMemoryInventory, InMemoryInventory> {
        PropertyMeterReadingsExporter::new(
            inventory,
            inventory,
            PropertyId(10),
            OrganizationId(1),
            excluded,
            scenarios,
        )
        .unwrap()
    }

    fn row(cells: Vec<(&str, CellValue)>) -> ReadingRow {
        cells
            .into_iter()
            .map(|(field, value)| (field.to_string(), value))
            .collect()
    }

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    #[fixture]
    fn whole_month_inventory() -> InMemoryInventory {
        inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {
                    "Electric - Grid": "kBtu (thousand Btu)",
                    "Default": "kBtu (thousand Btu)"
                },
                "country": "US",
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Electric - Grid",
                    "source": "Portfolio Manager",
                    "source_id": "123",
                    "readings": [
                        {"start_time": "2020-01-01T00:00:00Z", "end_time": "2020-01-31T23:59:59Z", "reading": 100.0},
                        {"start_time": "2020-02-01T00:00:00Z", "end_time": "2020-02-28T23:59:59Z", "reading": 50.0}
                    ]
                }]
            }]
        }))
    }

    #[rstest]
    fn month_mode_buckets_whole_month_readings(whole_month_inventory: InMemoryInventory) {
        let export = exporter(&whole_month_inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Month)
            .unwrap();

        assert_eq!(
            export.readings,
            vec![
                row(vec![("month", text("January 2020")), (ELECTRIC_FIELD, CellValue::Number(100.0))]),
                row(vec![("month", text("February 2020")), (ELECTRIC_FIELD, CellValue::Number(50.0))]),
            ]
        );
        let fields: Vec<_> = export.column_defs.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["month", ELECTRIC_FIELD]);
    }

    #[rstest]
    fn month_mode_apportions_across_month_boundaries() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {"Electric - Grid": "kBtu (thousand Btu)"},
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Electric - Grid",
                    "source": "Portfolio Manager",
                    "source_id": "123",
                    "readings": [
                        {"start_time": "2020-01-15T00:00:00Z", "end_time": "2020-02-15T00:00:00Z", "reading": 100.0}
                    ]
                }]
            }]
        }));

        let export = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Month)
            .unwrap();

        // 31 days split as 16d 23:59:59 in January and 14d in February,
        // apportioned by wall-clock seconds and rounded to 2 decimals
        assert_eq!(
            export.readings,
            vec![
                row(vec![("month", text("January 2020")), (ELECTRIC_FIELD, CellValue::Number(54.84))]),
                row(vec![("month", text("February 2020")), (ELECTRIC_FIELD, CellValue::Number(45.16))]),
            ]
        );

        let total: f64 = export
            .readings
            .iter()
            .filter_map(|r| match r.get(ELECTRIC_FIELD) {
                Some(CellValue::Number(v)) => Some(*v),
                _ => None,
            })
            .sum();
        approx::assert_relative_eq!(total, 100.0, epsilon = 0.05);
    }

    #[rstest]
    fn exact_mode_merges_meters_sharing_a_window() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {
                    "Electric - Grid": "kBtu (thousand Btu)",
                    "Default": "kBtu (thousand Btu)"
                },
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [
                    {
                        "id": 100,
                        "type": "Electric - Grid",
                        "source": "Portfolio Manager",
                        "source_id": "123",
                        "readings": [
                            {"start_time": "2020-01-01T00:00:00Z", "end_time": "2020-01-02T00:00:00Z", "reading": 10.0},
                            {"start_time": "2020-01-02T00:00:00Z", "end_time": "2020-01-03T00:00:00Z", "reading": 20.0}
                        ]
                    },
                    {
                        // resolves through the "Default" display-unit fallback
                        "id": 101,
                        "type": "Natural Gas",
                        "source": "Portfolio Manager",
                        "source_id": "456",
                        "readings": [
                            {"start_time": "2020-01-01T00:00:00Z", "end_time": "2020-01-02T00:00:00Z", "reading": 5.0}
                        ]
                    }
                ]
            }]
        }));

        let export = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Exact)
            .unwrap();

        // one row per distinct (start, end) pair across all meters
        assert_eq!(
            export.readings,
            vec![
                row(vec![
                    ("start_time", text("2020-01-01 00:00:00")),
                    ("end_time", text("2020-01-02 00:00:00")),
                    (ELECTRIC_FIELD, CellValue::Number(10.0)),
                    (GAS_FIELD, CellValue::Number(5.0)),
                ]),
                row(vec![
                    ("start_time", text("2020-01-02 00:00:00")),
                    ("end_time", text("2020-01-03 00:00:00")),
                    (ELECTRIC_FIELD, CellValue::Number(20.0)),
                ]),
            ]
        );
        let fields: Vec<_> = export.column_defs.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["start_time", "end_time", ELECTRIC_FIELD, GAS_FIELD]);
    }

    #[rstest]
    fn exact_mode_formats_times_in_the_organization_timezone() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {"Electric - Grid": "kBtu (thousand Btu)"},
                "timezone": "-05:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Electric - Grid",
                    "source": "Portfolio Manager",
                    "source_id": "123",
                    "readings": [
                        {"start_time": "2020-01-01T00:00:00Z", "end_time": "2020-01-02T00:00:00Z", "reading": 10.0}
                    ]
                }]
            }]
        }));

        let export = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Exact)
            .unwrap();
        assert_eq!(
            export.readings[0].get("start_time"),
            Some(&text("2019-12-31 19:00:00"))
        );
    }

    #[rstest]
    fn year_mode_resolves_overlapping_submissions() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {"Electric - Grid": "kBtu (thousand Btu)"},
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Electric - Grid",
                    "source": "Portfolio Manager",
                    "source_id": "123",
                    "readings": [
                        {"start_time": "2020-01-01T00:00:00Z", "end_time": "2020-06-30T00:00:00Z", "reading": 5.0},
                        {"start_time": "2020-04-01T00:00:00Z", "end_time": "2020-09-30T00:00:00Z", "reading": 8.0},
                        {"start_time": "2020-06-30T00:00:00Z", "end_time": "2020-12-30T00:00:00Z", "reading": 6.0}
                    ]
                }]
            }]
        }));

        let export = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Year)
            .unwrap();

        // maximum non-overlapping total: 5 + 6 = 11 beats the overlapping 8
        assert_eq!(
            export.readings,
            vec![row(vec![
                ("year", CellValue::Integer(2020)),
                (ELECTRIC_FIELD, CellValue::Number(11.0)),
            ])]
        );
    }

    #[rstest]
    fn year_mode_excludes_readings_straddling_the_boundary() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {"Electric - Grid": "kBtu (thousand Btu)"},
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Electric - Grid",
                    "source": "Portfolio Manager",
                    "source_id": "123",
                    "readings": [
                        {"start_time": "2020-03-01T00:00:00Z", "end_time": "2020-04-01T00:00:00Z", "reading": 10.0},
                        {"start_time": "2020-12-01T00:00:00Z", "end_time": "2021-01-31T00:00:00Z", "reading": 99.0},
                        {"start_time": "2021-02-01T00:00:00Z", "end_time": "2021-03-01T00:00:00Z", "reading": 7.0}
                    ]
                }]
            }]
        }));

        let export = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Year)
            .unwrap();

        // the December-to-January reading is counted in neither year
        assert_eq!(
            export.readings,
            vec![
                row(vec![("year", CellValue::Integer(2020)), (ELECTRIC_FIELD, CellValue::Number(10.0))]),
                row(vec![("year", CellValue::Integer(2021)), (ELECTRIC_FIELD, CellValue::Number(7.0))]),
            ]
        );
    }

    #[rstest]
    fn cost_meters_bypass_the_factor_table() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {},
                "country": "US",
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Cost",
                    "source": "Portfolio Manager",
                    "source_id": "123",
                    "readings": [
                        {"start_time": "2020-01-01T00:00:00Z", "end_time": "2020-01-02T00:00:00Z", "reading": 123.45}
                    ]
                }]
            }]
        }));

        let export = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Exact)
            .unwrap();

        let cost_field = "Cost - Portfolio Manager - 123";
        assert_eq!(
            export.readings[0].get(cost_field),
            Some(&CellValue::Number(123.45))
        );
        let def = export.column_defs.iter().find(|d| d.field == cost_field).unwrap();
        assert_eq!(
            def.display_name.as_deref(),
            Some("Cost - Portfolio Manager - 123 (US Dollars)")
        );
    }

    #[rstest]
    fn factor_lookup_falls_back_to_the_default_row() {
        // natural gas has no kWh factor of its own; the Default row covers it
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {"Default": "kWh (thousand Watt-hours)"},
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Natural Gas",
                    "source": "Portfolio Manager",
                    "source_id": "456",
                    "readings": [
                        {"start_time": "2020-01-01T00:00:00Z", "end_time": "2020-01-02T00:00:00Z", "reading": 3.412}
                    ]
                }]
            }]
        }));

        let export = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Exact)
            .unwrap();
        let field = "Natural Gas - Portfolio Manager - 456";
        assert_eq!(export.readings[0].get(field), Some(&CellValue::Number(1.0)));
    }

    #[rstest]
    fn missing_display_unit_is_fatal() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {},
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Electric - Grid",
                    "source": "Portfolio Manager",
                    "source_id": "123"
                }]
            }]
        }));

        let err = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Exact)
            .unwrap_err();
        assert!(matches!(err, ExportError::MissingDisplayUnit { type_name } if type_name == "Electric - Grid"));
    }

    #[rstest]
    fn missing_conversion_factor_is_fatal() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {"Natural Gas": "cords"},
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Natural Gas",
                    "source": "Portfolio Manager",
                    "source_id": "456"
                }]
            }]
        }));

        let err = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Month)
            .unwrap_err();
        assert!(matches!(err, ExportError::MissingConversionFactor { .. }));
    }

    #[rstest]
    fn meters_without_readings_still_register_a_column() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {"Electric - Grid": "kBtu (thousand Btu)"},
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Electric - Grid",
                    "source": "Portfolio Manager",
                    "source_id": "123"
                }]
            }]
        }));

        let export = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Month)
            .unwrap();
        assert!(export.readings.is_empty());
        assert!(export.column_defs.iter().any(|d| d.field == ELECTRIC_FIELD));
    }

    #[rstest]
    fn greenbutton_source_ids_decode_to_usage_point_ids() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {"Electric - Grid": "kBtu (thousand Btu)"},
                "timezone": "+00:00"
            }],
            "properties": [{
                "id": 10,
                "organization": 1,
                "meters": [{
                    "id": 100,
                    "type": "Electric - Grid",
                    "source": "GreenButton",
                    "source_id": "https://example.org/espi/1_1/resource/Subscription/1/UsagePoint/409483/MeterReading/1"
                }]
            }]
        }));

        let export = exporter(&inventory, &[], &[])
            .readings_and_column_defs(ReadingInterval::Exact)
            .unwrap();
        assert!(export
            .column_defs
            .iter()
            .any(|d| d.field == "Electric - Grid - GreenButton - 409483"));
    }

    #[rstest]
    fn scenario_meters_join_the_scope_and_exclusions_leave_it() {
        let inventory = inventory_from(json!({
            "organizations": [{
                "id": 1,
                "display_meter_units": {"Electric - Grid": "kBtu (thousand Btu)", "Default": "kBtu (thousand Btu)"},
                "timezone": "+00:00"
            }],
            "properties": [
                {
                    "id": 10,
                    "organization": 1,
                    "meters": [{
                        "id": 100,
                        "type": "Electric - Grid",
                        "source": "Portfolio Manager",
                        "source_id": "123"
                    }]
                },
                {
                    "id": 20,
                    "organization": 1,
                    "meters": [
                        {
                            "id": 200,
                            "type": "Natural Gas",
                            "source": "Portfolio Manager",
                            "source_id": "456",
                            "scenario_id": 7
                        },
                        {
                            "id": 201,
                            "type": "Propane",
                            "source": "Portfolio Manager",
                            "source_id": "789"
                        }
                    ]
                }
            ]
        }));

        let export = exporter(&inventory, &[], &[ScenarioId(7)])
            .readings_and_column_defs(ReadingInterval::Exact)
            .unwrap();
        let fields: Vec<_> = export.column_defs.iter().map(|d| d.field.as_str()).collect();
        // the scenario meter joins, the unrelated property-20 meter does not
        assert_eq!(fields, vec!["start_time", "end_time", ELECTRIC_FIELD, GAS_FIELD]);

        let export = exporter(&inventory, &[MeterId(100)], &[ScenarioId(7)])
            .readings_and_column_defs(ReadingInterval::Exact)
            .unwrap();
        let fields: Vec<_> = export.column_defs.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["start_time", "end_time", GAS_FIELD]);
    }

    #[rstest]
    fn unknown_properties_fail_at_construction(whole_month_inventory: InMemoryInventory) {
        let err = PropertyMeterReadingsExporter::new(
            &whole_month_inventory,
            &whole_month_inventory,
            PropertyId(999),
            OrganizationId(1),
            &[],
            &[],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExportError::Store(StoreError::PropertyNotFound(PropertyId(999)))
        ));
    }
}
