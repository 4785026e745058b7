use anyhow::Result;
use clap::Args;
use fundpilot_lib::fundpilot_api::{FundSearchParams, DEFAULT_SEARCH_LIMIT};
use fundpilot_lib::types::FundType;
use fundpilot_lib::validation;

use crate::commands::Context;
use crate::output::{print_funds, OutputFormat};

#[derive(Args)]
pub struct FundsArgs {
    /// Look up a single fund by code
    #[arg(long)]
    pub code: Option<String>,

    /// Search by name or code
    #[arg(long)]
    pub search: Option<String>,

    /// Filter by type: stock, bond, mixed, index
    #[arg(long = "type")]
    pub fund_type: Option<String>,

    /// Maximum number of results
    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: u32,

    /// Number of results to skip
    #[arg(long)]
    pub offset: Option<u32>,
}

pub async fn run(args: &FundsArgs, ctx: &Context, format: &OutputFormat) -> Result<()> {
    if let Some(code) = &args.code {
        let code = validation::validate_fund_code(code)?;
        let fund = ctx.client.funds().get_by_code(&code).await?;
        return print_funds(&[fund], format);
    }

    let limit = validation::validate_limit(args.limit)?;

    // Plain text queries go to the search endpoint; filters need the listing.
    if let (Some(search), None, None) = (&args.search, &args.fund_type, args.offset) {
        let query = validation::validate_search(search)?;
        let funds = ctx.client.funds().search(&query, limit).await?;
        eprintln!("{} funds", funds.len());
        return print_funds(&funds, format);
    }

    let mut params = FundSearchParams::default().with_limit(limit);

    if let Some(search) = &args.search {
        params = params.with_query(&validation::validate_search(search)?);
    }

    if let Some(fund_type) = &args.fund_type {
        let parsed: FundType = fund_type
            .trim()
            .to_lowercase()
            .parse()
            .map_err(anyhow::Error::msg)?;
        params = params.with_fund_type(parsed);
    }

    if let Some(offset) = args.offset {
        params = params.with_offset(offset);
    }

    let funds = ctx.client.funds().list(&params).await?;
    eprintln!("{} funds", funds.len());
    print_funds(&funds, format)
}
