//! Terminal rendering of model fits, comparisons and the run summary

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::model::{AnovaComparison, Family, FitStatistics, ModelFit};
use crate::pipeline::{MergeStats, ZeroMortalityPolicy};

/// Significance threshold used to highlight p-values
const ALPHA: f64 = 0.05;

/// Summary of a pipeline run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub merge: MergeStats,
    pub policy: ZeroMortalityPolicy,
    /// Rows whose log mortality was non-finite before the policy was applied
    pub zero_mortality_rows: usize,
    pub models_fitted: usize,
    pub models_failed: Vec<(String, String)>,
    pub outputs: Vec<String>,
}

impl RunSummary {
    pub fn new(merge: MergeStats, policy: ZeroMortalityPolicy) -> Self {
        Self {
            merge,
            policy,
            ..Default::default()
        }
    }

    pub fn display(&self) {
        section_header("📋", "RUN SUMMARY");

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("💀 Death records"), Cell::new(self.merge.death_rows)]);
        table.add_row(vec![Cell::new("💰 GDP country-years"), Cell::new(self.merge.gdp_rows)]);
        table.add_row(vec![
            Cell::new("👥 Population country-years"),
            Cell::new(self.merge.population_rows),
        ]);
        table.add_row(vec![
            Cell::new("🔗 GDP ∩ population"),
            Cell::new(self.merge.gdp_population_rows),
        ]);
        table.add_row(vec![
            Cell::new("❔ Country-years without deaths"),
            Cell::new(self.merge.unmatched_country_years).fg(if self.merge.unmatched_country_years == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);
        table.add_row(vec![
            Cell::new("📁 Merged rows"),
            Cell::new(self.merge.maindata_rows)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new("0️⃣  Zero-mortality rows"),
            Cell::new(format!("{} ({})", self.zero_mortality_rows, self.policy)),
        ]);
        table.add_row(vec![
            Cell::new("✅ Models fitted"),
            Cell::new(self.models_fitted).fg(Color::Green),
        ]);
        table.add_row(vec![
            Cell::new("❌ Models failed"),
            Cell::new(self.models_failed.len()).fg(if self.models_failed.is_empty() {
                Color::White
            } else {
                Color::Red
            }),
        ]);

        print_indented(&table);

        if !self.models_failed.is_empty() {
            println!();
            println!("      {}:", style("Failed models").yellow());
            for (name, reason) in &self.models_failed {
                println!("        {} {} {}", style("•").dim(), name, style(reason).dim());
            }
        }

        if !self.outputs.is_empty() {
            println!();
            println!("      {}:", style("Outputs").cyan());
            for path in &self.outputs {
                println!("        {} {}", style("•").dim(), path);
            }
        }
    }
}

/// Coefficient table and fit statistics for one model
pub fn display_fit(fit: &ModelFit) {
    section_header("📈", &format!("MODEL {}", fit.name.to_uppercase()));
    println!("    {}", style(&fit.formula).dim());
    println!(
        "    {} {} observations, {} dropped",
        style(fit.family.to_string()).cyan(),
        fit.n_obs,
        fit.n_dropped
    );
    println!();

    let log_scale = fit.coefficients.iter().any(|c| c.exp_estimate.is_some());
    let statistic_label = match fit.statistics {
        FitStatistics::Gaussian { .. } => "t value",
        FitStatistics::Poisson { .. } => "z value",
    };

    let mut header = vec![
        Cell::new("Term").add_attribute(Attribute::Bold),
        Cell::new("Estimate").add_attribute(Attribute::Bold),
        Cell::new("Std. Error").add_attribute(Attribute::Bold),
        Cell::new(statistic_label).add_attribute(Attribute::Bold),
        Cell::new("Pr(>|.|)").add_attribute(Attribute::Bold),
    ];
    if log_scale {
        header.push(Cell::new("exp(Est.)").add_attribute(Attribute::Bold));
        header.push(Cell::new("% change").add_attribute(Attribute::Bold));
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header);

    for row in &fit.coefficients {
        let c = &row.coefficient;
        let mut cells = vec![
            Cell::new(&c.term),
            number_cell(c.estimate, 6),
            number_cell(c.std_error, 6),
            number_cell(c.statistic, 3),
            p_value_cell(c.p_value),
        ];
        if log_scale {
            cells.push(number_cell(row.exp_estimate, 4));
            cells.push(number_cell(row.percent_change(), 2));
        }
        table.add_row(cells);
    }

    print_indented(&table);
    println!();

    match &fit.statistics {
        FitStatistics::Gaussian {
            df_residual,
            sigma,
            r_squared,
            adj_r_squared,
            f_statistic,
            f_p_value,
            ..
        } => {
            println!(
                "    Residual standard error: {:.4} on {} degrees of freedom",
                sigma, df_residual
            );
            println!(
                "    R²: {:.4}, adjusted R²: {:.4}",
                r_squared, adj_r_squared
            );
            if let (Some(f), Some(p)) = (f_statistic, f_p_value) {
                println!("    F-statistic: {:.3}, p-value: {}", f, format_p(*p));
            }
        }
        FitStatistics::Poisson {
            deviance,
            null_deviance,
            df_residual,
            df_null,
            aic,
            iterations,
            converged,
            ..
        } => {
            println!(
                "    Null deviance: {:.3} on {} degrees of freedom",
                null_deviance, df_null
            );
            println!(
                "    Residual deviance: {:.3} on {} degrees of freedom",
                deviance, df_residual
            );
            println!("    AIC: {:.3}", aic);
            let status = if *converged {
                style(format!("converged in {} iterations", iterations)).green()
            } else {
                style(format!("did not converge after {} iterations", iterations)).red()
            };
            println!("    IRLS: {}", status);
        }
    }

    let aliased = fit.aliased_terms();
    if !aliased.is_empty() {
        println!(
            "    {} {} not defined because of singularities",
            style("⚠").yellow(),
            aliased.len()
        );
    }
}

/// Analysis-of-deviance table for nested comparisons
pub fn display_comparison(comparisons: &[AnovaComparison]) {
    if comparisons.is_empty() {
        return;
    }
    section_header("⚖️ ", "NESTED MODEL COMPARISONS");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Reduced").add_attribute(Attribute::Bold),
        Cell::new("Full").add_attribute(Attribute::Bold),
        Cell::new("Test").add_attribute(Attribute::Bold),
        Cell::new("Res. Df").add_attribute(Attribute::Bold),
        Cell::new("Df").add_attribute(Attribute::Bold),
        Cell::new("Statistic").add_attribute(Attribute::Bold),
        Cell::new("p-value").add_attribute(Attribute::Bold),
    ]);

    for cmp in comparisons {
        let test = match cmp.family {
            Family::Gaussian => "F",
            Family::Poisson => "Chi²",
        };
        table.add_row(vec![
            Cell::new(&cmp.reduced),
            Cell::new(&cmp.full),
            Cell::new(test),
            Cell::new(format!("{} → {}", cmp.df_reduced, cmp.df_full)).set_alignment(CellAlignment::Right),
            Cell::new(cmp.df_difference()).set_alignment(CellAlignment::Right),
            number_cell(Some(cmp.statistic), 3),
            p_value_cell(Some(cmp.p_value)),
        ]);
    }

    print_indented(&table);
}

fn section_header(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn number_cell(value: Option<f64>, precision: usize) -> Cell {
    match value {
        Some(v) => Cell::new(format!("{:.*}", precision, v)).set_alignment(CellAlignment::Right),
        None => Cell::new("NA").fg(Color::DarkGrey).set_alignment(CellAlignment::Right),
    }
}

fn p_value_cell(p: Option<f64>) -> Cell {
    match p {
        Some(p) => {
            let cell = Cell::new(format_p(p)).set_alignment(CellAlignment::Right);
            if p < ALPHA {
                cell.fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                cell
            }
        }
        None => Cell::new("NA").fg(Color::DarkGrey).set_alignment(CellAlignment::Right),
    }
}

/// R-style p-value formatting: tiny values collapse to `< 2e-16`
pub fn format_p(p: f64) -> String {
    if p < 2e-16 {
        "< 2e-16".to_string()
    } else if p < 1e-4 {
        format!("{:.2e}", p)
    } else {
        format!("{:.4}", p)
    }
}
