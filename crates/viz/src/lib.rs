//! # webbook-viz
//!
//! Chart specification generation for webbook.
//!
//! This crate turns a sheet's columns into a declarative chart spec
//! (marks + encodings) that a Chart.js-compatible frontend can render.
//! It never mutates the data it reads.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use webbook_sheet::Sheet;

/// Errors building or serializing a chart specification
#[derive(Error, Debug)]
pub enum VizError {
    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },

    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VizError>;

/// Chart specification for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub data: ChartData,
    pub options: ChartOptions,
}

/// Visual encoding family for a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Area,
    Scatter,
}

/// Chart data: x-axis labels plus one dataset per y column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// A single series in a chart.
///
/// Points are `None` where the source cell had no numeric reading; for
/// line/bar/area charts over a non-numeric column this yields a degenerate
/// but well-defined rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
}

/// Chart rendering options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
    pub show_legend: bool,
}

/// Escape HTML special characters to prevent XSS.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

impl ChartSpec {
    /// Build a chart spec from a sheet: one label per row from the x
    /// column, one dataset per y column.
    ///
    /// # Errors
    ///
    /// Returns an error when the x column or any y column does not exist.
    pub fn from_sheet(
        sheet: &Sheet,
        kind: ChartKind,
        x: &str,
        y_columns: &[String],
    ) -> Result<Self> {
        let labels: Vec<String> = sheet
            .column_by_name(x)
            .map_err(|_| VizError::ColumnNotFound {
                name: x.to_string(),
            })?
            .iter()
            .map(|v| v.as_str())
            .collect();

        let mut datasets = Vec::with_capacity(y_columns.len());
        for column in y_columns {
            let data: Vec<Option<f64>> = sheet
                .column_by_name(column)
                .map_err(|_| VizError::ColumnNotFound {
                    name: column.clone(),
                })?
                .iter()
                .map(|v| v.numeric())
                .collect();

            datasets.push(Dataset {
                label: column.clone(),
                data,
                fill: (kind == ChartKind::Area).then_some(true),
            });
        }

        Ok(ChartSpec {
            kind,
            title: format!("{} by {x}", sheet.name()),
            data: ChartData { labels, datasets },
            options: ChartOptions {
                x_axis_label: Some(x.to_string()),
                y_axis_label: None,
                show_legend: y_columns.len() > 1,
            },
        })
    }

    /// Convert to JSON string for frontend rendering.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Generate a standalone HTML page with embedded Chart.js.
    #[must_use]
    pub fn to_html(&self) -> String {
        // Escape title for HTML context and JSON for script context
        let title = escape_html(&self.title);
        let json = serde_json::to_string(&self)
            .unwrap_or_default()
            .replace("</", "<\\/"); // Prevent script tag breakout

        let chart_type = match self.kind {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
            ChartKind::Area => "line", // Area is line with fill
        };

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
</head>
<body>
    <canvas id="chart"></canvas>
    <script>
        const spec = {json};
        const ctx = document.getElementById('chart').getContext('2d');
        new Chart(ctx, {{
            type: '{chart_type}',
            data: spec.data,
            options: {{
                responsive: true,
                plugins: {{
                    title: {{
                        display: true,
                        text: spec.title
                    }},
                    legend: {{
                        display: spec.options.show_legend
                    }}
                }}
            }}
        }});
    </script>
</body>
</html>"#,
            title = title,
            json = json,
            chart_type = chart_type,
        )
    }
}
