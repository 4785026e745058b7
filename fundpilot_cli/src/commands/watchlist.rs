use anyhow::Result;
use clap::{Args, Subcommand};
use fundpilot_lib::validation;
use fundpilot_lib::{FundStore, SettingsStore};

use crate::commands::Context;
use crate::output::{print_funds, print_json, OutputFormat};

#[derive(Args)]
pub struct WatchlistArgs {
    #[command(subcommand)]
    pub action: WatchlistAction,
}

#[derive(Subcommand)]
pub enum WatchlistAction {
    /// Show the watchlist with current valuations
    List,
    /// Add a fund to the watchlist
    Add {
        /// Fund code, e.g. 110022
        code: String,
    },
    /// Remove a fund from the watchlist
    Remove {
        /// Fund code, e.g. 110022
        code: String,
    },
}

pub async fn run(args: &WatchlistArgs, ctx: &Context, format: &OutputFormat) -> Result<()> {
    let settings = SettingsStore::load(ctx.storage.clone());

    match &args.action {
        WatchlistAction::List => {
            let funds = ctx.client.funds().watchlist().await?;
            settings.set_watchlist(funds.iter().map(|f| f.code.clone()).collect())?;
            FundStore::load(ctx.storage.clone()).set_funds(funds.clone())?;
            print_funds(&funds, format)?;
        }
        WatchlistAction::Add { code } => {
            let code = validation::validate_fund_code(code)?;
            ctx.client.funds().add_to_watchlist(&code).await?;
            settings.add_to_watchlist(&code)?;
            report(&code, "Added", &settings, format);
        }
        WatchlistAction::Remove { code } => {
            let code = validation::validate_fund_code(code)?;
            ctx.client.funds().remove_from_watchlist(&code).await?;
            settings.remove_from_watchlist(&code)?;
            FundStore::load(ctx.storage.clone()).remove_fund(&code)?;
            report(&code, "Removed", &settings, format);
        }
    }

    Ok(())
}

fn report(code: &str, action: &str, settings: &SettingsStore, format: &OutputFormat) {
    let watchlist = settings.settings().watchlist;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "code": code,
            "action": action.to_lowercase(),
            "watchlist": watchlist,
        })),
        _ => println!("{} {} ({} funds watched)", action, code, watchlist.len()),
    }
}
