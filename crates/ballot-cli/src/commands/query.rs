//! Query command implementation.

use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Args};
use serde_json::Value;

use ballot_core::Operation;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["document", "file"])))]
pub struct QueryArgs {
    /// Operation name (must match the name in the document)
    #[arg(long)]
    pub name: String,

    /// GraphQL document text
    #[arg(long)]
    pub document: Option<String>,

    /// File containing the GraphQL document (use - for stdin)
    #[arg(long)]
    pub file: Option<String>,

    /// Variables as a JSON object
    #[arg(long)]
    pub variables: Option<String>,
}

fn read_document(args: &QueryArgs) -> Result<String> {
    if let Some(document) = &args.document {
        return Ok(document.clone());
    }

    match args.file.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
        Some(path) => std::fs::read_to_string(path).context("Failed to read document file"),
        None => bail!("Either --document or --file is required"),
    }
}

pub async fn run(api: &ApiArgs, args: QueryArgs) -> Result<()> {
    let client = session::connect(api)?;

    let mut operation = Operation::new(&args.name, read_document(&args)?);
    if let Some(variables) = &args.variables {
        let variables: Value = serde_json::from_str(variables).context("Invalid variables JSON")?;
        operation = operation
            .with_variables(&variables)
            .context("Invalid variables")?;
    }

    let response = client
        .dispatch(&operation)
        .await
        .with_context(|| format!("Operation {} failed", args.name))?;

    if !response.is_ok() {
        output::graphql_errors(&response.errors);
        bail!("Operation {} returned errors", args.name);
    }

    output::json_pretty(&response.data.unwrap_or(Value::Null))?;
    Ok(())
}
