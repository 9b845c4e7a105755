//! Feature assembly for ML inference
//!
//! Turns raw form fields into a record aligned to the expected column
//! schema. Categorical fields are one-hot encoded through a fixed map from
//! category value to schema column, built once from the schema, so the
//! dropped reference category never depends on request-time ordering.

use crate::error::ValidationError;
use crate::models::{
    CategoricalField, ConnectionRecord, EncodedFeatureRecord, NumericField, NumericKind,
    RawInputRecord, CATEGORICAL_FIELDS, NUMERIC_FIELDS,
};
use crate::schema::ColumnSchema;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where the value of one schema column comes from
#[derive(Debug, Clone, PartialEq)]
enum ColumnSource {
    Numeric(NumericField),
    Indicator(CategoricalField),
    Absent,
}

/// Builds schema-aligned feature records from raw request fields
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    schema: Arc<ColumnSchema>,
    sources: Vec<ColumnSource>,
    indicators: HashMap<(CategoricalField, String), usize>,
}

impl FeatureAssembler {
    pub fn new(schema: Arc<ColumnSchema>) -> Self {
        let mut sources = Vec::with_capacity(schema.len());
        let mut indicators = HashMap::new();

        for (idx, column) in schema.iter().enumerate() {
            if let Some(field) = NumericField::from_name(column) {
                sources.push(ColumnSource::Numeric(field));
                continue;
            }

            let indicator = CATEGORICAL_FIELDS.iter().find_map(|field| {
                column
                    .strip_prefix(field.column_prefix().as_str())
                    .filter(|category| !category.is_empty())
                    .map(|category| (*field, category.to_string()))
            });

            match indicator {
                Some((field, category)) => {
                    indicators.insert((field, category), idx);
                    sources.push(ColumnSource::Indicator(field));
                }
                None => {
                    warn!(column = %column, "Schema column has no input source, it will always be zero");
                    sources.push(ColumnSource::Absent);
                }
            }
        }

        for field in NUMERIC_FIELDS {
            if !schema.contains(field.name()) {
                warn!(field = field.name(), "Numeric field is not part of the schema and will be dropped");
            }
        }

        Self {
            schema,
            sources,
            indicators,
        }
    }

    pub fn schema(&self) -> &Arc<ColumnSchema> {
        &self.schema
    }

    /// Categories of a field that have an indicator column, sorted
    pub fn known_categories(&self, field: CategoricalField) -> Vec<&str> {
        let mut categories: Vec<&str> = self
            .indicators
            .keys()
            .filter(|(f, _)| *f == field)
            .map(|(_, category)| category.as_str())
            .collect();
        categories.sort_unstable();
        categories
    }

    /// Validate and coerce raw fields into a typed record
    ///
    /// Fields are checked in declared order; the first failure is returned.
    pub fn parse(raw: &RawInputRecord) -> Result<ConnectionRecord, ValidationError> {
        Ok(ConnectionRecord {
            duration: parse_float(raw, NumericField::Duration)?,
            src_bytes: parse_float(raw, NumericField::SrcBytes)?,
            dst_bytes: parse_float(raw, NumericField::DstBytes)?,
            logged_in: parse_integer(raw, NumericField::LoggedIn)?,
            wrong_fragment: parse_integer(raw, NumericField::WrongFragment)?,
            same_srv_rate: parse_float(raw, NumericField::SameSrvRate)?,
            srv_count: parse_integer(raw, NumericField::SrvCount)?,
            protocol_type: parse_category(raw, CategoricalField::ProtocolType)?,
            service: parse_category(raw, CategoricalField::Service)?,
            flag: parse_category(raw, CategoricalField::Flag)?,
        })
    }

    /// One-hot encode a typed record and align it to the schema
    ///
    /// Every schema column is present, in schema order; columns the record
    /// does not produce are zero.
    pub fn encode(&self, record: &ConnectionRecord) -> EncodedFeatureRecord {
        let mut values: Vec<f64> = self
            .sources
            .iter()
            .map(|source| match source {
                ColumnSource::Numeric(field) => record.numeric(*field),
                ColumnSource::Indicator(_) | ColumnSource::Absent => 0.0,
            })
            .collect();

        for field in CATEGORICAL_FIELDS {
            let category = record.category(field);
            match self.indicators.get(&(field, category.to_string())) {
                Some(&idx) => values[idx] = 1.0,
                None => debug!(
                    field = field.name(),
                    category = %category,
                    "Category has no indicator column, encoded as reference"
                ),
            }
        }

        EncodedFeatureRecord::new(Arc::clone(&self.schema), values)
    }

    /// Parse and encode in one step
    pub fn assemble(&self, raw: &RawInputRecord) -> Result<EncodedFeatureRecord, ValidationError> {
        let record = Self::parse(raw)?;
        Ok(self.encode(&record))
    }
}

fn required<'a>(raw: &'a RawInputRecord, field: &'static str) -> Result<&'a str, ValidationError> {
    raw.get(field)
        .map(str::trim)
        .ok_or(ValidationError::MissingField { field })
}

fn parse_float(raw: &RawInputRecord, field: NumericField) -> Result<f64, ValidationError> {
    debug_assert_eq!(field.kind(), NumericKind::Float);
    let value = required(raw, field.name())?;
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::InvalidNumber {
            field: field.name(),
            expected: "a finite number",
            value: value.to_string(),
        })
}

fn parse_integer(raw: &RawInputRecord, field: NumericField) -> Result<i64, ValidationError> {
    debug_assert_eq!(field.kind(), NumericKind::Integer);
    let value = required(raw, field.name())?;
    value
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidNumber {
            field: field.name(),
            expected: "an integer",
            value: value.to_string(),
        })
}

fn parse_category(raw: &RawInputRecord, field: CategoricalField) -> Result<String, ValidationError> {
    let value = required(raw, field.name())?;
    if value.is_empty() {
        return Err(ValidationError::EmptyCategory { field: field.name() });
    }
    Ok(value.to_string())
}
