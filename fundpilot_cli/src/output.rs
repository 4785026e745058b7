use anyhow::Result;
use chrono::Local;
use fundpilot_lib::types::{Fund, MarketIndex, Trend};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

#[derive(Tabled, Serialize)]
struct FundRow {
    #[tabled(rename = "Code")]
    #[serde(rename = "Code")]
    code: String,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "Type")]
    fund_type: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
    #[tabled(rename = "Change")]
    #[serde(rename = "Change")]
    change: String,
    #[tabled(rename = "Change %")]
    #[serde(rename = "Change %")]
    change_percent: String,
    #[tabled(rename = "Updated")]
    #[serde(rename = "Updated")]
    updated: String,
}

#[derive(Tabled, Serialize)]
struct IndexRow {
    #[tabled(rename = "Index")]
    #[serde(rename = "Index")]
    name: String,
    #[tabled(rename = "Code")]
    #[serde(rename = "Code")]
    code: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
    #[tabled(rename = "Change")]
    #[serde(rename = "Change")]
    change: String,
    #[tabled(rename = "Change %")]
    #[serde(rename = "Change %")]
    change_percent: String,
    #[tabled(rename = "Trend")]
    #[serde(rename = "Trend")]
    trend: String,
}

fn build_fund_rows(funds: &[Fund]) -> Vec<FundRow> {
    funds
        .iter()
        .map(|f| FundRow {
            code: f.code.clone(),
            name: f.name.clone(),
            fund_type: f.fund_type.to_string(),
            value: format!("{:.4}", f.current_value),
            change: format_signed(f.daily_change, 4),
            change_percent: format_percent(f.daily_change_percent),
            updated: f
                .last_update
                .with_timezone(&Local)
                .format("%m-%d %H:%M")
                .to_string(),
        })
        .collect()
}

fn build_index_rows(indices: &[MarketIndex]) -> Vec<IndexRow> {
    indices
        .iter()
        .map(|i| IndexRow {
            name: i.name.clone(),
            code: i.code.clone(),
            value: format!("{:.2}", i.value),
            change: format_signed(i.change, 2),
            change_percent: format_percent(i.change_percent),
            trend: trend_arrow(i.trend).to_string(),
        })
        .collect()
}

// -- Table output --

pub fn print_funds_table(funds: &[Fund]) {
    println!("{}", Table::new(build_fund_rows(funds)));
}

pub fn print_indices_table(indices: &[MarketIndex]) {
    println!("{}", Table::new(build_index_rows(indices)));
}

// -- Markdown output --

pub fn print_funds_markdown(funds: &[Fund]) {
    let mut table = Table::new(build_fund_rows(funds));
    table.with(Style::markdown());
    println!("{}", table);
}

pub fn print_indices_markdown(indices: &[MarketIndex]) {
    let mut table = Table::new(build_index_rows(indices));
    table.with(Style::markdown());
    println!("{}", table);
}

// -- CSV output --

pub fn print_funds_csv(funds: &[Fund]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in build_fund_rows(funds) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn print_indices_csv(indices: &[MarketIndex]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in build_index_rows(indices) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

/// Prints funds in any format. JSON keeps the wire field names.
pub fn print_funds(funds: &[Fund], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_funds_table(funds),
        OutputFormat::Json => print_json(&funds),
        OutputFormat::Csv => print_funds_csv(funds)?,
        OutputFormat::Markdown => print_funds_markdown(funds),
    }
    Ok(())
}

pub fn print_indices(indices: &[MarketIndex], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_indices_table(indices),
        OutputFormat::Json => print_json(&indices),
        OutputFormat::Csv => print_indices_csv(indices)?,
        OutputFormat::Markdown => print_indices_markdown(indices),
    }
    Ok(())
}

fn format_signed(value: f64, decimals: usize) -> String {
    if value > 0.0 {
        format!("+{:.*}", decimals, value)
    } else {
        format!("{:.*}", decimals, value)
    }
}

fn format_percent(value: f64) -> String {
    format!("{}%", format_signed(value, 2))
}

fn trend_arrow(trend: Trend) -> &'static str {
    match trend {
        Trend::Up => "▲",
        Trend::Down => "▼",
        Trend::Neutral => "-",
    }
}
