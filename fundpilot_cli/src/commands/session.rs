use anyhow::Result;
use clap::Args;
use fundpilot_lib::fundpilot_api::{TokenStore, TOKEN_KEY};
use fundpilot_lib::validation;

use crate::commands::Context;

#[derive(Args)]
pub struct LoginArgs {
    /// Bearer token issued by the backend
    #[arg(long)]
    pub token: String,

    /// Store the token without checking it against the backend
    #[arg(long)]
    pub no_verify: bool,
}

pub async fn login(args: &LoginArgs, ctx: &Context) -> Result<()> {
    let token = validation::validate_token(&args.token)?;
    ctx.storage.set_item(TOKEN_KEY, &token)?;

    if args.no_verify {
        println!("Token saved to {}", ctx.config.storage_path.display());
        return Ok(());
    }

    // A 401 here clears the token again through the client's session handling.
    let watchlist = ctx.client.funds().watchlist().await?;
    println!(
        "Logged in. {} funds on the watchlist. Token saved to {}",
        watchlist.len(),
        ctx.config.storage_path.display()
    );
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    if ctx.storage.token().is_none() {
        println!("Not logged in");
        return Ok(());
    }
    ctx.storage.remove_item(TOKEN_KEY)?;
    println!("Logged out");
    Ok(())
}
