//! Equal-width histograms of mortality, rendered as text bar charts

use anyhow::Result;
use console::style;
use polars::prelude::*;
use serde::Serialize;

/// Default number of bins
pub const DEFAULT_BINS: usize = 30;

const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    /// `bins + 1` edges; empty when no finite value was seen
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    /// Null and non-finite values left out of the bins
    pub excluded: usize,
}

impl Histogram {
    /// Bin the finite values into `bins` equal-width bins spanning their range.
    /// The last bin is closed on the right.
    pub fn from_values(column: &str, values: &[Option<f64>], bins: usize) -> Self {
        let bins = bins.max(1);
        let finite: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
        let excluded = values.len() - finite.len();

        if finite.is_empty() {
            return Self {
                column: column.to_string(),
                edges: Vec::new(),
                counts: vec![0; bins],
                excluded,
            };
        }

        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let width = (max - min) / bins as f64;

        let edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();
        let mut counts = vec![0usize; bins];
        for v in &finite {
            let idx = if width > 0.0 {
                (((v - min) / width) as usize).min(bins - 1)
            } else {
                0
            };
            counts[idx] += 1;
        }

        Self {
            column: column.to_string(),
            edges,
            counts,
            excluded,
        }
    }

    /// Histogram of a numeric column of `df`
    pub fn from_column(df: &DataFrame, column: &str, bins: usize) -> Result<Self> {
        let values = df.column(column)?.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = values.f64()?.into_iter().collect();
        Ok(Self::from_values(column, &values, bins))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// One line per bin: range, bar scaled to the largest bin, count
    pub fn render(&self) -> Vec<String> {
        if self.edges.is_empty() {
            return vec!["(no finite values)".to_string()];
        }
        let peak = self.counts.iter().copied().max().unwrap_or(0).max(1);

        self.counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                let len = (count * BAR_WIDTH).div_ceil(peak);
                format!(
                    "{:>12.4} - {:<12.4} {:<width$} {}",
                    self.edges[i],
                    self.edges[i + 1],
                    "█".repeat(len),
                    count,
                    width = BAR_WIDTH
                )
            })
            .collect()
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📊").cyan(),
            style(format!("DISTRIBUTION: {}", self.column)).white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        for line in self.render() {
            println!("    {}", line);
        }
        if self.excluded > 0 {
            println!(
                "    {}",
                style(format!("{} null or non-finite values not shown", self.excluded)).dim()
            );
        }
    }
}
