//! Ad-hoc MI transaction caller.
//!
//! Loads service-account credentials from a `.ionapi` file and prints the
//! API response as JSON on stdout so other processes can consume the result
//! directly. Errors are printed as `{"error": "..."}` with a non-zero exit
//! code.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;

use sparepart_core::config::MiConfig;
use sparepart_core::mi::{MiClient, TransactionService};

/// Example parameter set for an as-built lookup.
const EXAMPLE_PARAMS: &[(&str, &str)] = &[
    ("MTRL", "EXAMPLE_WAGON"),
    ("SERN", "00 00 0000 000-0"),
    ("EXPA", "1"),
    ("MEVA", "1"),
];

#[derive(Parser, Debug)]
#[command(name = "mi-call", about = "Infor M3 MI caller", version)]
struct Args {
    /// Path to the .ionapi file
    #[arg(long)]
    ionapi: Option<PathBuf>,

    /// MI program, e.g. MOS256MI
    #[arg(long)]
    program: String,

    /// MI transaction, e.g. LstAsBuild
    #[arg(long)]
    transaction: String,

    /// JSON string with parameters
    #[arg(long)]
    params_json: Option<String>,

    /// Path to a JSON file with parameters
    #[arg(long)]
    params_file: Option<PathBuf>,

    /// Add the example parameter set
    #[arg(long)]
    use_example: bool,

    /// Target environment (live/test)
    #[arg(long, env = "SPAREPART_ENV", default_value = "live")]
    env: String,

    /// Additional logs on stderr
    #[arg(long)]
    verbose: bool,
}

fn load_params(args: &Args) -> anyhow::Result<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    if let Some(raw) = &args.params_json {
        let parsed: BTreeMap<String, String> = serde_json::from_str(raw)?;
        params.extend(parsed);
    }
    if let Some(file) = &args.params_file {
        let raw = std::fs::read_to_string(file)?;
        let parsed: BTreeMap<String, String> = serde_json::from_str(&raw)?;
        params.extend(parsed);
    }
    if args.use_example {
        for (key, value) in EXAMPLE_PARAMS {
            params.insert((*key).to_string(), (*value).to_string());
        }
    }
    Ok(params)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mi = MiConfig {
        ionapi_path: args.ionapi.clone(),
        ..MiConfig::default()
    };

    let client = match MiClient::connect(&mi, &args.env).await {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };
    if args.verbose {
        eprintln!("access token acquired, environment {}", args.env);
    }

    let params = match load_params(&args) {
        Ok(params) => params,
        Err(err) => {
            println!("{}", json!({ "error": err.to_string() }));
            return ExitCode::from(1);
        }
    };

    match client.call(&args.program, &args.transaction, &params).await {
        Ok(response) => {
            let output = json!({
                "program": args.program,
                "transaction": args.transaction,
                "parameters": params,
                "response": response,
            });
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{}", json!({ "error": err.to_string() }));
            ExitCode::from(1)
        }
    }
}
