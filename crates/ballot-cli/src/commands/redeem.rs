//! Redeem command implementation.
//!
//! Voters have no account: the code they were handed is checked in a guest
//! session, and a valid code unlocks the election's candidate list.

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Deserialize;
use serde_json::json;

use ballot_core::Operation;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

const CHECK_CODE: &str = "query checkCode($input: CheckCodeInput!) {
  checkCode(input: $input) {
    isValid
  }
}";

const GET_VOTING_CANDIDATES: &str = "query getVotingCandidates($electionId: String!, $codeId: String!) {
  getCandidates(electionId: $electionId, codeId: $codeId) {
    id
    name
    imageUrl
    createdAt
  }
}";

#[derive(Args, Debug)]
pub struct RedeemArgs {
    /// Election ID printed on the voter card
    #[arg(long)]
    pub election: String,

    /// Voter code
    #[arg(long)]
    pub code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckCode {
    is_valid: bool,
}

pub async fn run(api: &ApiArgs, args: RedeemArgs) -> Result<()> {
    let client = session::guest(api)?;

    let check = Operation::new("checkCode", CHECK_CODE).with_variables(&json!({
        "input": { "electionId": args.election, "codeId": args.code }
    }))?;
    let response = client.dispatch(&check).await.context("Failed to check code")?;
    if !response.is_ok() {
        output::graphql_errors(&response.errors);
        bail!("Code check failed");
    }

    let valid = response
        .field_as::<CheckCode>("checkCode")
        .is_some_and(|c| c.is_valid);
    if !valid {
        bail!("Code {} is not valid for election {}", args.code, args.election);
    }
    output::success("Code is valid");

    let candidates = Operation::new("getVotingCandidates", GET_VOTING_CANDIDATES)
        .with_variables(&json!({ "electionId": args.election, "codeId": args.code }))?;
    let response = client
        .dispatch(&candidates)
        .await
        .context("Failed to fetch candidates")?;
    if !response.is_ok() {
        output::graphql_errors(&response.errors);
        bail!("Fetching candidates failed");
    }

    if let Some(serde_json::Value::Array(list)) = response.field("getCandidates") {
        for candidate in list {
            output::json(candidate)?;
        }
    }

    Ok(())
}
