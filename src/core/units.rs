use indexmap::{indexmap, IndexMap};
use serde::{Deserialize, Serialize};
use strum_macros::Display as StrumDisplay;

/// Key used as the fallback row both in organization display settings and in
/// the conversion-factor tables.
pub const DEFAULT_TYPE_KEY: &str = "Default";

/// Country an organization reports in, selecting the currency label and the
/// thermal conversion-factor table.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize, StrumDisplay)]
pub enum Country {
    #[default]
    #[serde(rename = "US")]
    #[strum(to_string = "US")]
    UnitedStates,
    #[serde(rename = "CAN")]
    #[strum(to_string = "CAN")]
    Canada,
}

impl Country {
    /// Display unit for monetary ("Cost") readings, e.g. "US Dollars".
    pub fn cost_unit(&self) -> String {
        format!("{self} Dollars")
    }
}

/// Mapping from meter type name to display unit name to the number of kBtu
/// represented by one display unit. Readings are stored in kBtu; dividing by
/// the factor converts a stored magnitude into the display unit.
pub type ConversionFactors = IndexMap<String, IndexMap<String, f64>>;

const KBTU: &str = "kBtu (thousand Btu)";
const MBTU: &str = "MBtu/MMBtu (million Btu)";
const GJ: &str = "GJ";
const KWH: &str = "kWh (thousand Watt-hours)";
const MWH: &str = "MWh (million Watt-hours)";
const THERMS: &str = "therms";
const CF: &str = "cf (cubic feet)";
const CCF: &str = "Ccf (hundred cubic feet)";
const KCF: &str = "kcf (thousand cubic feet)";
const MCF: &str = "Mcf (million cubic feet)";
const GALLONS_US: &str = "Gallons (US)";
const GALLONS_UK: &str = "Gallons (UK)";
const LITRES: &str = "Litres";
const POUNDS: &str = "Lbs. (pounds)";
const K_POUNDS: &str = "kLbs. (thousand pounds)";
const M_POUNDS: &str = "MLbs. (million pounds)";
const TONS: &str = "tons";
const TONNES: &str = "Tonnes (metric)";
const TON_HOURS: &str = "ton hours";
const CORDS: &str = "cords";

fn with_common_energy_units(mut units: IndexMap<String, f64>) -> IndexMap<String, f64> {
    units.insert(KBTU.into(), 1.0);
    units.insert(MBTU.into(), 1_000.0);
    units.insert(GJ.into(), 947.817);
    units
}

/// Builds the kBtu thermal conversion-factor table for a country.
///
/// The tables differ between countries where the reference fuel heat contents
/// differ (natural gas volumetric factors, imperial gallons for liquid fuels
/// in Canada). Every table carries a "Default" row so that types without an
/// explicit entry still resolve.
pub fn thermal_conversion_factors(country: Country) -> ConversionFactors {
    let electricity = with_common_energy_units(indexmap! {
        KWH.into() => 3.412,
        MWH.into() => 3_412.0,
    });
    let district_water = with_common_energy_units(indexmap! {
        TON_HOURS.into() => 12.0,
    });
    let natural_gas_cf = match country {
        Country::UnitedStates => 1.026,
        Country::Canada => 1.0292,
    };
    let liquid_fuel = |kbtu_per_us_gallon: f64, kbtu_per_litre: f64| {
        let mut units = with_common_energy_units(indexmap! {
            GALLONS_US.into() => kbtu_per_us_gallon,
            LITRES.into() => kbtu_per_litre,
        });
        if country == Country::Canada {
            units.insert(GALLONS_UK.into(), kbtu_per_us_gallon * 1.20095);
        }
        units
    };
    let coal = |kbtu_per_ton: f64| {
        with_common_energy_units(indexmap! {
            TONS.into() => kbtu_per_ton,
            TONNES.into() => kbtu_per_ton * 1.10231,
            POUNDS.into() => kbtu_per_ton / 2_000.0,
            K_POUNDS.into() => kbtu_per_ton / 2.0,
            M_POUNDS.into() => kbtu_per_ton * 500.0,
        })
    };

    indexmap! {
        "Coal (anthracite)".into() => coal(25_090.0),
        "Coal (bituminous)".into() => coal(24_930.0),
        "Coke".into() => coal(24_800.0),
        "Diesel".into() => liquid_fuel(138.69, 36.64),
        "District Chilled Water".into() => district_water.clone(),
        "District Hot Water".into() => district_water,
        "District Steam".into() => with_common_energy_units(indexmap! {
            POUNDS.into() => 1.194,
            K_POUNDS.into() => 1_194.0,
            M_POUNDS.into() => 1_194_000.0,
            THERMS.into() => 100.0,
        }),
        "Electric - Grid".into() => electricity.clone(),
        "Electric - Solar".into() => electricity.clone(),
        "Electric - Wind".into() => electricity.clone(),
        "Fuel Oil (No. 1)".into() => liquid_fuel(139.0, 36.72),
        "Fuel Oil (No. 2)".into() => liquid_fuel(138.0, 36.456),
        "Kerosene".into() => liquid_fuel(135.0, 35.67),
        "Natural Gas".into() => with_common_energy_units(indexmap! {
            CF.into() => natural_gas_cf,
            CCF.into() => natural_gas_cf * 100.0,
            KCF.into() => natural_gas_cf * 1_000.0,
            MCF.into() => natural_gas_cf * 1_000_000.0,
            THERMS.into() => 100.0,
        }),
        "Propane".into() => with_common_energy_units(indexmap! {
            CF.into() => 2.516,
            CCF.into() => 251.6,
            KCF.into() => 2_516.0,
            GALLONS_US.into() => 91.63,
            LITRES.into() => 24.21,
        }),
        "Wood".into() => with_common_energy_units(indexmap! {
            TONS.into() => 17_480.0,
            TONNES.into() => 19_268.3,
            CORDS.into() => 20_000.0,
        }),
        DEFAULT_TYPE_KEY.into() => electricity,
    }
}
