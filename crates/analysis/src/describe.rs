use serde::ser::{Serialize, SerializeMap, Serializer};
use terrastat_core::{ColumnKind, Outcome, Table, Warnings};

/// Summary of one numeric column, missing values excluded.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1 denominator); `None` below 2 values.
    pub std_dev: Option<f64>,
}

impl ColumnStatistics {
    /// `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / n;
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        let std_dev = (values.len() >= 2)
            .then(|| (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt());

        Some(Self {
            count: values.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            median,
            std_dev,
        })
    }
}

/// Column name -> statistics, in request order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatisticsResult {
    columns: Vec<(String, ColumnStatistics)>,
}

impl StatisticsResult {
    pub fn get(&self, column: &str) -> Option<&ColumnStatistics> {
        self.columns.iter().find(|(c, _)| c == column).map(|(_, s)| s)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for StatisticsResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, stats) in &self.columns {
            map.serialize_entry(column, stats)?;
        }
        map.end()
    }
}

/// Descriptive statistics for each requested numeric column.
///
/// Absent, non-numeric and all-missing columns are skipped with a warning.
/// Non-finite values count as missing.
pub fn describe<S: AsRef<str>>(table: &Table, columns: &[S]) -> Outcome<StatisticsResult> {
    const OP: &str = "describe";
    let mut warnings = Warnings::new();
    let mut result = StatisticsResult::default();

    for column in columns {
        let column = column.as_ref();
        let Some(kind) = table.column_kind(column) else {
            warnings.warn(OP, format!("column '{column}' does not exist; skipped"));
            continue;
        };
        if kind == ColumnKind::Empty {
            warnings.warn(OP, format!("column '{column}' has no values; skipped"));
            continue;
        }
        if !kind.is_numeric() {
            warnings.warn(OP, format!("column '{column}' is {kind}, not numeric; skipped"));
            continue;
        }
        if result.get(column).is_some() {
            continue;
        }

        let (values, non_finite): (Vec<f64>, Vec<f64>) = table
            .column(column)
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_f64())
            .partition(|x| x.is_finite());
        if !non_finite.is_empty() {
            warnings.caution(
                OP,
                format!("{} non-finite value(s) in '{column}' treated as missing", non_finite.len()),
            );
        }
        match ColumnStatistics::from_values(&values) {
            Some(stats) => result.columns.push((column.to_string(), stats)),
            None => warnings.warn(OP, format!("column '{column}' has no finite values; skipped")),
        }
    }

    warnings.finish(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrastat_core::Value;

    fn table() -> Table {
        Table::from_rows(
            ["Gmina", "Pożary", "Powierzchnia", "Uwagi"],
            vec![
                vec!["Bolesławiec".into(), Value::Int(12), Value::Float(23.6), Value::Missing],
                vec!["Gromadka".into(), Value::Int(3), Value::Float(264.8), Value::Missing],
                vec!["Osiek".into(), Value::Missing, Value::Float(101.0), Value::Missing],
                vec!["Warta".into(), Value::Int(5), Value::Int(10), Value::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn numeric_columns_summarized_in_order() {
        let out = describe(&table(), &["Powierzchnia", "Pożary"]);
        assert!(!out.has_warnings());
        let r = out.value;
        assert_eq!(r.columns().collect::<Vec<_>>(), vec!["Powierzchnia", "Pożary"]);

        let fires = r.get("Pożary").unwrap();
        assert_eq!(fires.count, 3);
        assert_eq!(fires.min, 3.0);
        assert_eq!(fires.max, 12.0);
        assert!((fires.mean - 20.0 / 3.0).abs() < 1e-12);
        assert_eq!(fires.median, 5.0);
        assert!((fires.std_dev.unwrap() - 4.725_815_626_252_608).abs() < 1e-9);

        let area = r.get("Powierzchnia").unwrap();
        assert!((area.median - 62.3).abs() < 1e-9);
    }

    #[test]
    fn unusable_columns_skipped_with_warning() {
        let out = describe(&table(), &["Gmina", "Uwagi", "Ludność"]);
        assert!(out.value.is_empty());
        assert_eq!(out.warnings.len(), 3);
        assert!(out.has_warnings());
    }

    #[test]
    fn non_finite_values_excluded() {
        let t = Table::from_rows(
            ["TERYT", "Ludność"],
            vec![
                vec![Value::Int(201011), Value::Float(39000.0)],
                vec![Value::Int(201022), Value::Float(f64::NAN)],
                vec![Value::Int(201032), Value::Float(5300.0)],
                vec![Value::Int(201043), Value::Float(f64::INFINITY)],
                vec![Value::Int(201052), Value::Float(15200.0)],
            ],
        )
        .unwrap();
        let out = describe(&t, &["Ludność"]);
        assert!(!out.has_warnings());
        assert_eq!(out.warnings.len(), 1);

        let s = out.value.get("Ludność").unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.max, 39000.0);
        assert_eq!(s.median, 15200.0);
        assert!((s.mean - 59500.0 / 3.0).abs() < 1e-9);
        assert!(s.std_dev.unwrap().is_finite());

        let all_nan = Table::from_rows(["Ludność"], vec![vec![Value::Float(f64::NAN)]]).unwrap();
        let out = describe(&all_nan, &["Ludność"]);
        assert!(out.value.is_empty());
        assert!(out.has_warnings());
    }

    #[test]
    fn mixed_column_skipped_with_warning() {
        let t = Table::from_rows(
            ["Pożary"],
            vec![vec![Value::Int(12)], vec![Value::from("brak danych")], vec![Value::Int(3)]],
        )
        .unwrap();
        let out = describe(&t, &["Pożary"]);
        assert!(out.value.is_empty());
        assert_eq!(out.warnings.len(), 1);
        assert!(out.has_warnings());
        assert!(out.warnings[0].message.contains("mixed"));
    }

    #[test]
    fn single_value_has_no_std_dev() {
        let s = ColumnStatistics::from_values(&[4.0]).unwrap();
        assert_eq!(s.std_dev, None);
        assert_eq!(s.median, 4.0);
        assert!(ColumnStatistics::from_values(&[]).is_none());
    }

    #[test]
    fn serializes_as_ordered_map() {
        let r = describe(&table(), &["Pożary", "Powierzchnia"]).value;
        let json = serde_json::to_string(&r).unwrap();
        let fires = json.find("Pożary").unwrap();
        let area = json.find("Powierzchnia").unwrap();
        assert!(fires < area);
        assert!(json.contains("\"std_dev\""));
    }
}
