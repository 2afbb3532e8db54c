//! Engine result rows back into host values

use serde_json::{Map, Value};

use crate::builder::{AverageDecomposition, OutputAttribute, QueryBuilder};
use crate::error::{PlannerError, PlannerResult};
use crate::sql::planner::ScalarValue;

#[derive(Debug, Clone)]
struct MappedColumn {
    field: String,
    attribute: OutputAttribute,
    average: Option<AverageDecomposition>,
}

/// Reads flat engine rows through a finished builder's output attributes.
///
/// Every output attribute yields one value per row, in recording order.
/// Missing fields read as `Null`. Decomposed averages are rebuilt as
/// `sum / count`, `Null` on a zero count.
#[derive(Debug, Clone)]
pub struct RowMapper {
    columns: Vec<MappedColumn>,
}

impl RowMapper {
    pub fn new(builder: &QueryBuilder) -> Self {
        let columns = builder
            .output_attributes()
            .iter()
            .map(|(field, attribute)| MappedColumn {
                field: field.clone(),
                attribute: attribute.clone(),
                average: builder.average_decomposition(&attribute.expr).cloned(),
            })
            .collect();
        Self { columns }
    }

    /// Output field names, in row order
    pub fn fields(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.field.as_str()).collect()
    }

    pub fn map_row(&self, row: &Value) -> PlannerResult<Vec<(String, ScalarValue)>> {
        let object = row
            .as_object()
            .ok_or_else(|| PlannerError::Serialization(format!("result row is not an object: {}", row)))?;
        Ok(self
            .columns
            .iter()
            .map(|column| (column.field.clone(), self.read(column, object)))
            .collect())
    }

    pub fn map_rows(&self, rows: &[Value]) -> PlannerResult<Vec<Vec<(String, ScalarValue)>>> {
        rows.iter().map(|row| self.map_row(row)).collect()
    }

    /// Parses a JSON array of rows and maps each one.
    pub fn map_json(&self, json: &str) -> PlannerResult<Vec<Vec<(String, ScalarValue)>>> {
        let rows: Vec<Value> = serde_json::from_str(json)?;
        self.map_rows(&rows)
    }

    fn read(&self, column: &MappedColumn, row: &Map<String, Value>) -> ScalarValue {
        match &column.average {
            Some(average) => {
                let number = |field: &str| row.get(field).and_then(Value::as_f64);
                match (number(&average.sum_alias), number(&average.count_alias)) {
                    (Some(sum), Some(count)) if count != 0.0 => ScalarValue::Float64(sum / count),
                    _ => ScalarValue::Null,
                }
            }
            None => column
                .attribute
                .transform
                .apply(row.get(&column.field).unwrap_or(&Value::Null)),
        }
    }
}
