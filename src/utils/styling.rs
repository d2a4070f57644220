//! Terminal styling utilities

use std::path::Path;
use std::time::Duration;

use console::{style, Emoji};

use crate::pipeline::ZeroMortalityPolicy;

pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ██╗  ██╗██╗██╗   ██╗███████╗████████╗ █████╗ ████████╗
    ██║  ██║██║██║   ██║██╔════╝╚══██╔══╝██╔══██╗╚══██╔══╝
    ███████║██║██║   ██║███████╗   ██║   ███████║   ██║
    ██╔══██║██║╚██╗ ██╔╝╚════██║   ██║   ██╔══██║   ██║
    ██║  ██║██║ ╚████╔╝ ███████║   ██║   ██║  ██║   ██║
    ╚═╝  ╚═╝╚═╝  ╚═══╝  ╚══════╝   ╚═╝   ╚═╝  ╚═╝   ╚═╝
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("HIV mortality against GDP, population, age and sex").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Settings shown in the configuration card
pub struct ConfigCard<'a> {
    pub deaths: &'a Path,
    pub gdp: &'a Path,
    pub population: &'a Path,
    pub output_dir: &'a Path,
    pub first_year: i64,
    pub last_year: i64,
    pub policy: ZeroMortalityPolicy,
    pub models: usize,
}

/// Print configuration card
pub fn print_config(card: &ConfigCard) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!("    │  {} Deaths:     {:<35}│", FOLDER, truncate_path(card.deaths, 34));
    println!("    │  {} GDP:        {:<35}│", FOLDER, truncate_path(card.gdp, 34));
    println!("    │  {} Population: {:<35}│", FOLDER, truncate_path(card.population, 34));
    println!("    │  {} Output:     {:<35}│", SAVE, truncate_path(card.output_dir, 34));
    println!("    ├{}┤", line);
    println!(
        "    │  {} Years:          {:<31}│",
        CHART,
        style(format!("{}-{}", card.first_year, card.last_year)).yellow()
    );
    println!(
        "    │  {} Zero mortality: {:<31}│",
        CHART,
        style(card.policy.to_string()).yellow()
    );
    println!(
        "    │  {} Models:         {:<31}│",
        CHART,
        style(card.models).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print the elapsed time of a step
pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}",
        style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    if let Some(info) = detail {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!("      Found {} {}", style(count).yellow().bold(), description);
    }
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!("    {} {}", ROCKET, style("hivstat run complete!").green().bold());
    println!();
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}
