use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use crate::sheet::Sheet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregation function applied to each metric column per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Count,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregate::Sum => "sum",
            Aggregate::Mean => "mean",
            Aggregate::Median => "median",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Count => "count",
        };
        write!(f, "{name}")
    }
}

/// Parameters for one grouped-aggregation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSpec {
    /// Columns whose value tuples partition the rows
    pub group_by: Vec<String>,
    /// Columns to aggregate within each partition
    pub metrics: Vec<String>,
    /// The aggregation function
    pub agg: Aggregate,
}

/// Hashable stand-in for a normalized cell value in a group key.
///
/// Integral floats collapse onto their integer reading so `1` and `1.0`
/// land in the same partition; `Null` is its own key value, never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    FloatBits(u64),
    Date(i64),
    Text(String),
}

fn key_part(value: &CellValue) -> KeyPart {
    match value {
        CellValue::Null => KeyPart::Null,
        CellValue::Bool(b) => KeyPart::Bool(*b),
        CellValue::Int(i) => KeyPart::Int(*i),
        CellValue::Float(f) => {
            let f = if *f == 0.0 { 0.0 } else { *f };
            if f.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&f) {
                KeyPart::Int(f as i64)
            } else {
                KeyPart::FloatBits(f.to_bits())
            }
        }
        CellValue::Date(dt) => KeyPart::Date(dt.and_utc().timestamp()),
        CellValue::String(s) => KeyPart::Text(s.clone()),
    }
}

/// Compute a grouped summary table over a sheet.
///
/// Rows are partitioned by the tuple of group-by values; groups appear in
/// first-appearance order of their key in the source sheet. Output columns
/// are the group-by columns followed by one `"{agg}({metric})"` column per
/// metric. `Count` counts every row in the partition; all other
/// aggregations skip non-numeric cells and yield `Null` for a partition
/// with no numeric values.
///
/// # Errors
///
/// `EmptySelection` when no group-by column is given; `ColumnNotFound` for
/// an unknown group-by or metric column. The source sheet is never
/// modified.
pub fn report(sheet: &Sheet, spec: &ReportSpec) -> Result<Sheet> {
    if spec.group_by.is_empty() {
        return Err(SheetError::EmptySelection);
    }

    let group_idx: Vec<usize> = spec
        .group_by
        .iter()
        .map(|name| sheet.column_index(name))
        .collect::<Result<_>>()?;
    let metric_idx: Vec<usize> = spec
        .metrics
        .iter()
        .map(|name| sheet.column_index(name))
        .collect::<Result<_>>()?;

    let mut groups: IndexMap<Vec<KeyPart>, Vec<usize>> = IndexMap::new();
    for (i, row) in sheet.rows().iter().enumerate() {
        let key: Vec<KeyPart> = group_idx.iter().map(|&c| key_part(&row[c])).collect();
        groups.entry(key).or_default().push(i);
    }

    let mut columns: Vec<String> = spec.group_by.clone();
    for metric in &spec.metrics {
        columns.push(format!("{}({})", spec.agg, metric));
    }

    let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(groups.len());
    for row_indices in groups.values() {
        let first = &sheet.rows()[row_indices[0]];
        let mut out: Vec<CellValue> = group_idx.iter().map(|&c| first[c].clone()).collect();
        for &mc in &metric_idx {
            let cells: Vec<&CellValue> = row_indices.iter().map(|&r| &sheet.rows()[r][mc]).collect();
            out.push(aggregate(spec.agg, &cells));
        }
        rows.push(out);
    }

    Ok(Sheet::from_rows("Report", columns, rows))
}

fn aggregate(agg: Aggregate, values: &[&CellValue]) -> CellValue {
    if agg == Aggregate::Count {
        return CellValue::Int(values.len() as i64);
    }

    let mut nums: Vec<f64> = values.iter().filter_map(|v| v.numeric()).collect();
    if nums.is_empty() {
        return CellValue::Null;
    }

    let value = match agg {
        Aggregate::Sum => nums.iter().sum(),
        Aggregate::Mean => nums.iter().sum::<f64>() / nums.len() as f64,
        Aggregate::Median => {
            nums.sort_by(f64::total_cmp);
            let mid = nums.len() / 2;
            if nums.len() % 2 == 0 {
                (nums[mid - 1] + nums[mid]) / 2.0
            } else {
                nums[mid]
            }
        }
        Aggregate::Min => nums.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregate::Max => nums.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregate::Count => unreachable!("handled above"),
    };
    CellValue::Float(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_gv() -> Sheet {
        Sheet::from_rows(
            "Data",
            vec!["g".to_string(), "v".to_string()],
            vec![
                vec![CellValue::from("A"), CellValue::Int(1)],
                vec![CellValue::from("A"), CellValue::Int(3)],
                vec![CellValue::from("B"), CellValue::Int(5)],
            ],
        )
    }

    fn spec(agg: Aggregate) -> ReportSpec {
        ReportSpec {
            group_by: vec!["g".to_string()],
            metrics: vec!["v".to_string()],
            agg,
        }
    }

    #[test]
    fn test_sum_by_group() {
        let result = report(&sheet_gv(), &spec(Aggregate::Sum)).unwrap();
        assert_eq!(result.columns(), &["g".to_string(), "sum(v)".to_string()]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.rows()[0][1], CellValue::Float(4.0));
        assert_eq!(result.rows()[1][1], CellValue::Float(5.0));
    }

    #[test]
    fn test_count_by_group() {
        let result = report(&sheet_gv(), &spec(Aggregate::Count)).unwrap();
        assert_eq!(result.rows()[0][1], CellValue::Int(2));
        assert_eq!(result.rows()[1][1], CellValue::Int(1));
    }

    #[test]
    fn test_non_numeric_skipped_for_sum_counted_for_count() {
        let mut sheet = sheet_gv();
        sheet.row_append_padded(vec![CellValue::from("A"), CellValue::from("n/a")]);

        let sum = report(&sheet, &spec(Aggregate::Sum)).unwrap();
        assert_eq!(sum.rows()[0][1], CellValue::Float(4.0));

        let count = report(&sheet, &spec(Aggregate::Count)).unwrap();
        assert_eq!(count.rows()[0][1], CellValue::Int(3));
    }

    #[test]
    fn test_first_appearance_ordering() {
        let sheet = Sheet::from_rows(
            "S",
            vec!["g".to_string()],
            vec![
                vec![CellValue::from("zebra")],
                vec![CellValue::from("apple")],
                vec![CellValue::from("zebra")],
            ],
        );
        let result = report(
            &sheet,
            &ReportSpec {
                group_by: vec!["g".to_string()],
                metrics: vec![],
                agg: Aggregate::Count,
            },
        )
        .unwrap();
        // groups keep source order, not sorted order
        assert_eq!(result.rows()[0][0].as_str(), "zebra");
        assert_eq!(result.rows()[1][0].as_str(), "apple");
    }

    #[test]
    fn test_empty_group_by_rejected_and_sheet_untouched() {
        let sheet = sheet_gv();
        let before = sheet.clone();
        let err = report(
            &sheet,
            &ReportSpec {
                group_by: vec![],
                metrics: vec!["v".to_string()],
                agg: Aggregate::Sum,
            },
        );
        assert!(matches!(err, Err(SheetError::EmptySelection)));
        assert_eq!(sheet, before);
    }

    #[test]
    fn test_unknown_column() {
        let err = report(
            &sheet_gv(),
            &ReportSpec {
                group_by: vec!["missing".to_string()],
                metrics: vec![],
                agg: Aggregate::Sum,
            },
        );
        assert!(matches!(err, Err(SheetError::ColumnNotFound { .. })));
    }

    #[test]
    fn test_null_is_a_distinct_group() {
        let sheet = Sheet::from_rows(
            "S",
            vec!["g".to_string(), "v".to_string()],
            vec![
                vec![CellValue::from("A"), CellValue::Int(1)],
                vec![CellValue::Null, CellValue::Int(2)],
                vec![CellValue::Null, CellValue::Int(4)],
            ],
        );
        let result = report(&sheet, &spec(Aggregate::Sum)).unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.rows()[1][0], CellValue::Null);
        assert_eq!(result.rows()[1][1], CellValue::Float(6.0));
    }

    #[test]
    fn test_int_and_float_share_a_partition() {
        let sheet = Sheet::from_rows(
            "S",
            vec!["g".to_string(), "v".to_string()],
            vec![
                vec![CellValue::Int(1), CellValue::Int(10)],
                vec![CellValue::Float(1.0), CellValue::Int(20)],
            ],
        );
        let result = report(&sheet, &spec(Aggregate::Sum)).unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.rows()[0][1], CellValue::Float(30.0));
    }

    #[test]
    fn test_mean_median_min_max() {
        let sheet = Sheet::from_rows(
            "S",
            vec!["g".to_string(), "v".to_string()],
            vec![
                vec![CellValue::from("A"), CellValue::Int(1)],
                vec![CellValue::from("A"), CellValue::Int(2)],
                vec![CellValue::from("A"), CellValue::Int(7)],
                vec![CellValue::from("A"), CellValue::Int(10)],
            ],
        );
        assert_eq!(
            report(&sheet, &spec(Aggregate::Mean)).unwrap().rows()[0][1],
            CellValue::Float(5.0)
        );
        assert_eq!(
            report(&sheet, &spec(Aggregate::Median)).unwrap().rows()[0][1],
            CellValue::Float(4.5)
        );
        assert_eq!(
            report(&sheet, &spec(Aggregate::Min)).unwrap().rows()[0][1],
            CellValue::Float(1.0)
        );
        assert_eq!(
            report(&sheet, &spec(Aggregate::Max)).unwrap().rows()[0][1],
            CellValue::Float(10.0)
        );
    }

    #[test]
    fn test_all_non_numeric_partition_yields_null() {
        let sheet = Sheet::from_rows(
            "S",
            vec!["g".to_string(), "v".to_string()],
            vec![vec![CellValue::from("A"), CellValue::from("oops")]],
        );
        let result = report(&sheet, &spec(Aggregate::Sum)).unwrap();
        assert_eq!(result.rows()[0][1], CellValue::Null);
    }

    #[test]
    fn test_report_csv_rendering() {
        let result = report(&sheet_gv(), &spec(Aggregate::Sum)).unwrap();
        let csv = result.to_csv_string().unwrap();
        assert!(csv.starts_with("g,sum(v)"));
        assert!(csv.contains("A,4"));
    }
}
