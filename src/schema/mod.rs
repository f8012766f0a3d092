//! Schema normalization: raw survey headers to the canonical field set.
//!
//! Raw spreadsheets arrive with inconsistently cased and hyphenated headers
//! (`Average-max-temp`, `PH`, `Hectare`, ...). A [`RenameTable`] maps every
//! known variant onto a [`CanonicalField`]; [`SchemaNormalizer::normalize`]
//! applies it and projects each row into a [`CanonicalRecord`].
//!
//! This stage only renames and projects. Cells are parsed into numbers but
//! never adjusted; unparseable cells become `NaN` and are rejected later by
//! the validity filter rather than being defaulted here.

mod ingest;

pub use ingest::RawTable;

use crate::error::{CosechaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// The fixed set of column names every downstream stage depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    /// Administrative state
    State,
    /// District; the grouping key for evaluation
    District,
    /// Average temperature
    AvgTemp,
    /// Minimum temperature
    MinTemp,
    /// Maximum temperature
    MaxTemp,
    /// Average precipitation
    AvgPrecipitation,
    /// Wind speed
    WindSpeed,
    /// Soil pH
    Ph,
    /// Clay fraction
    Clay,
    /// Sand fraction
    Sand,
    /// Silt fraction
    Silt,
    /// Total production (tonnes)
    TotalProduction,
    /// Cultivated area (hectares)
    AreaHa,
}

impl CanonicalField {
    /// Every canonical field, in canonical column order.
    pub const ALL: [Self; 13] = [
        Self::State,
        Self::District,
        Self::AvgTemp,
        Self::MinTemp,
        Self::MaxTemp,
        Self::AvgPrecipitation,
        Self::WindSpeed,
        Self::Ph,
        Self::Clay,
        Self::Sand,
        Self::Silt,
        Self::TotalProduction,
        Self::AreaHa,
    ];

    /// Fields without which the pipeline cannot run.
    pub const REQUIRED: [Self; 7] = [
        Self::District,
        Self::AvgTemp,
        Self::MinTemp,
        Self::MaxTemp,
        Self::Ph,
        Self::TotalProduction,
        Self::AreaHa,
    ];

    /// Canonical column name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::District => "district",
            Self::AvgTemp => "avg_temp",
            Self::MinTemp => "min_temp",
            Self::MaxTemp => "max_temp",
            Self::AvgPrecipitation => "avg_precipitation",
            Self::WindSpeed => "wind_speed",
            Self::Ph => "ph",
            Self::Clay => "clay",
            Self::Sand => "sand",
            Self::Silt => "silt",
            Self::TotalProduction => "total_production",
            Self::AreaHa => "area_ha",
        }
    }

    /// Parses a canonical column name (exact, lower snake case).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Whether the field must be present after renaming.
    #[must_use]
    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    /// Whether the field holds a number (everything except state/district).
    #[must_use]
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::State | Self::District)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercases and strips `-`, `_` and whitespace so that `Average-max-temp`
/// and `average_max temp` compare equal.
fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| !matches!(c, '-' | '_') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Mapping from source header variants to canonical fields.
///
/// Lookup tries the exact header, then the canonical name itself, then a
/// normalized comparison that ignores case, hyphens, underscores and spaces.
///
/// # Examples
///
/// ```
/// use cosecha::schema::{CanonicalField, RenameTable};
///
/// let table = RenameTable::default();
/// assert_eq!(table.resolve("Average-max-temp"), Some(CanonicalField::MaxTemp));
/// assert_eq!(table.resolve("HECTARE"), Some(CanonicalField::AreaHa));
/// assert_eq!(table.resolve("ph"), Some(CanonicalField::Ph));
/// assert_eq!(table.resolve("Notes"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, CanonicalField>", into = "BTreeMap<String, CanonicalField>")]
pub struct RenameTable {
    entries: BTreeMap<String, CanonicalField>,
    keyed: BTreeMap<String, CanonicalField>,
}

impl RenameTable {
    /// Builds a rename table from `(source header, canonical field)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a source header is blank, or if two source
    /// headers that normalize to the same key map to different fields.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, CanonicalField)>,
        S: Into<String>,
    {
        let mut table = Self {
            entries: BTreeMap::new(),
            keyed: BTreeMap::new(),
        };
        for (source, field) in entries {
            let source = source.into();
            let key = header_key(&source);
            if key.is_empty() {
                return Err(CosechaError::invalid_param(
                    "rename_table",
                    format!("{source:?}"),
                    "non-blank source header",
                ));
            }
            if let Some(existing) = table.keyed.get(&key) {
                if *existing != field {
                    return Err(CosechaError::invalid_param(
                        "rename_table",
                        &source,
                        &format!("a single target field (already mapped to {existing})"),
                    ));
                }
            }
            table.keyed.insert(key, field);
            table.entries.insert(source, field);
        }
        Ok(table)
    }

    /// Resolves a raw header to its canonical field.
    #[must_use]
    pub fn resolve(&self, header: &str) -> Option<CanonicalField> {
        let trimmed = header.trim();
        if let Some(field) = self.entries.get(trimmed) {
            return Some(*field);
        }
        if let Some(field) = CanonicalField::from_name(trimmed) {
            return Some(field);
        }
        let key = header_key(trimmed);
        self.keyed.get(&key).copied().or_else(|| {
            CanonicalField::ALL
                .into_iter()
                .find(|f| header_key(f.as_str()) == key)
        })
    }

    /// Number of explicit source-header entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no explicit entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RenameTable {
    /// The header variants found in the district corn survey workbook.
    fn default() -> Self {
        use CanonicalField as F;
        let entries = [
            ("Abia", F::State),
            ("State", F::State),
            ("District", F::District),
            ("Average_avg-Temp", F::AvgTemp),
            ("Average-Min Temp", F::MinTemp),
            ("Average-max-temp", F::MaxTemp),
            ("avg-precipitation", F::AvgPrecipitation),
            ("avg-windSpeed", F::WindSpeed),
            ("PH", F::Ph),
            ("Clay", F::Clay),
            ("Sand", F::Sand),
            ("Silt", F::Silt),
            ("Crop Yield", F::TotalProduction),
            ("Hectare", F::AreaHa),
        ];
        let mut table = Self {
            entries: BTreeMap::new(),
            keyed: BTreeMap::new(),
        };
        for (source, field) in entries {
            table.keyed.insert(header_key(source), field);
            table.entries.insert(source.to_string(), field);
        }
        table
    }
}

impl TryFrom<BTreeMap<String, CanonicalField>> for RenameTable {
    type Error = CosechaError;

    fn try_from(map: BTreeMap<String, CanonicalField>) -> Result<Self> {
        Self::new(map)
    }
}

impl From<RenameTable> for BTreeMap<String, CanonicalField> {
    fn from(table: RenameTable) -> Self {
        table.entries
    }
}

/// One survey row in canonical form.
///
/// Required numeric fields are always present (possibly non-finite if the
/// raw cell was unparseable). Optional fields are `None` exactly when their
/// column was absent from the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Zero-based data row index in the raw input
    pub row: usize,
    /// Administrative state
    pub state: Option<String>,
    /// District name (grouping key)
    pub district: String,
    /// Average temperature
    pub avg_temp: f64,
    /// Minimum temperature
    pub min_temp: f64,
    /// Maximum temperature
    pub max_temp: f64,
    /// Average precipitation
    pub avg_precipitation: Option<f64>,
    /// Wind speed
    pub wind_speed: Option<f64>,
    /// Soil pH
    pub ph: f64,
    /// Clay fraction
    pub clay: Option<f64>,
    /// Sand fraction
    pub sand: Option<f64>,
    /// Silt fraction
    pub silt: Option<f64>,
    /// Total production
    pub total_production: f64,
    /// Cultivated area in hectares
    pub area_ha: f64,
}

impl CanonicalRecord {
    /// Numeric value of a field; `None` for text fields and absent columns.
    #[must_use]
    pub fn value(&self, field: CanonicalField) -> Option<f64> {
        use CanonicalField as F;
        match field {
            F::State | F::District => None,
            F::AvgTemp => Some(self.avg_temp),
            F::MinTemp => Some(self.min_temp),
            F::MaxTemp => Some(self.max_temp),
            F::AvgPrecipitation => self.avg_precipitation,
            F::WindSpeed => self.wind_speed,
            F::Ph => Some(self.ph),
            F::Clay => self.clay,
            F::Sand => self.sand,
            F::Silt => self.silt,
            F::TotalProduction => Some(self.total_production),
            F::AreaHa => Some(self.area_ha),
        }
    }
}

/// Canonical records plus the set of canonical columns the input supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    fields: Vec<CanonicalField>,
    records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    /// Assembles a table; `fields` are sorted into canonical order.
    ///
    /// # Errors
    ///
    /// Returns a schema error if a required field is not listed.
    pub fn new(mut fields: Vec<CanonicalField>, records: Vec<CanonicalRecord>) -> Result<Self> {
        fields.sort_unstable();
        fields.dedup();
        let missing: Vec<CanonicalField> = CanonicalField::REQUIRED
            .into_iter()
            .filter(|f| !fields.contains(f))
            .collect();
        if !missing.is_empty() {
            return Err(CosechaError::Schema {
                missing,
                available: fields.iter().map(|f| f.as_str().to_string()).collect(),
            });
        }
        Ok(Self { fields, records })
    }

    /// Canonical columns present, in canonical order.
    #[must_use]
    pub fn fields(&self) -> &[CanonicalField] {
        &self.fields
    }

    /// Whether the input supplied the given column.
    #[must_use]
    pub fn has(&self, field: CanonicalField) -> bool {
        self.fields.contains(&field)
    }

    /// The records.
    #[must_use]
    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Splits into the present columns and the owned records.
    #[must_use]
    pub fn into_parts(self) -> (Vec<CanonicalField>, Vec<CanonicalRecord>) {
        (self.fields, self.records)
    }
}

/// Applies a [`RenameTable`] to raw tables.
#[derive(Debug, Clone, Default)]
pub struct SchemaNormalizer {
    renames: RenameTable,
}

impl SchemaNormalizer {
    /// Creates a normalizer with the given rename table.
    #[must_use]
    pub fn new(renames: RenameTable) -> Self {
        Self { renames }
    }

    /// The rename table in use.
    #[must_use]
    pub fn renames(&self) -> &RenameTable {
        &self.renames
    }

    /// Resolves raw headers to canonical column positions.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::Schema`] listing every required field that no
    /// header resolves to, or [`CosechaError::AmbiguousHeader`] if two
    /// headers claim the same field.
    pub fn resolve_columns(&self, headers: &[String]) -> Result<BTreeMap<CanonicalField, usize>> {
        let mut columns: BTreeMap<CanonicalField, usize> = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            let Some(field) = self.renames.resolve(header) else {
                debug!(header = %header, "dropping unmapped column");
                continue;
            };
            if columns.contains_key(&field) {
                let headers = headers
                    .iter()
                    .filter(|h| self.renames.resolve(h) == Some(field))
                    .cloned()
                    .collect();
                return Err(CosechaError::AmbiguousHeader { field, headers });
            }
            columns.insert(field, idx);
        }

        let missing: Vec<CanonicalField> = CanonicalField::REQUIRED
            .into_iter()
            .filter(|f| !columns.contains_key(f))
            .collect();
        if !missing.is_empty() {
            return Err(CosechaError::Schema {
                missing,
                available: headers.to_vec(),
            });
        }
        Ok(columns)
    }

    /// Renames and projects a raw table into canonical records.
    ///
    /// # Errors
    ///
    /// Returns [`CosechaError::Schema`] if a required field is absent.
    pub fn normalize(&self, raw: &RawTable) -> Result<CanonicalTable> {
        let columns = self.resolve_columns(raw.headers())?;

        let text = |row: &[String], field: CanonicalField| -> Option<String> {
            columns.get(&field).map(|&i| row[i].trim().to_string())
        };
        let number = |row: &[String], field: CanonicalField| -> Option<f64> {
            columns
                .get(&field)
                .map(|&i| row[i].trim().parse::<f64>().unwrap_or(f64::NAN))
        };
        let required = |row: &[String], field: CanonicalField| -> f64 {
            number(row, field).unwrap_or(f64::NAN)
        };

        use CanonicalField as F;
        let records: Vec<CanonicalRecord> = raw
            .rows()
            .iter()
            .enumerate()
            .map(|(idx, row)| CanonicalRecord {
                row: idx,
                state: text(row, F::State),
                district: text(row, F::District).unwrap_or_default(),
                avg_temp: required(row, F::AvgTemp),
                min_temp: required(row, F::MinTemp),
                max_temp: required(row, F::MaxTemp),
                avg_precipitation: number(row, F::AvgPrecipitation),
                wind_speed: number(row, F::WindSpeed),
                ph: required(row, F::Ph),
                clay: number(row, F::Clay),
                sand: number(row, F::Sand),
                silt: number(row, F::Silt),
                total_production: required(row, F::TotalProduction),
                area_ha: required(row, F::AreaHa),
            })
            .collect();

        info!(
            rows = records.len(),
            columns = columns.len(),
            "normalized raw table to canonical schema"
        );
        CanonicalTable::new(columns.into_keys().collect(), records)
    }
}
