use clap::Args;
use serde_json::json;

use crate::auth::{issue_token, IdentityClaims};
use crate::cli::OutputFormat;
use crate::config::EdgeConfig;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(help = "Subject username")]
    pub username: String,

    #[arg(long, default_value = "", help = "Subject email")]
    pub email: String,

    #[arg(long, default_value = "", help = "Subject display name")]
    pub name: String,

    #[arg(long, default_value_t = 1, help = "Validity in hours")]
    pub ttl_hours: i64,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = EdgeConfig::from_env();
    let claims = IdentityClaims {
        username: args.username,
        email: args.email,
        name: args.name,
    };

    let token = issue_token(&config.auth, &claims, args.ttl_hours)?;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "token": token, "claims": claims })),
        OutputFormat::Text => println!("{}", token),
    }

    Ok(())
}
