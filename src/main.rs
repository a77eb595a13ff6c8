//! microdata-anon CLI
//!
//! Entry point for the command-line tool: loads the job config, runs the
//! anonymization, writes the result CSV and prints a run summary.

use anyhow::{Context, Result};
use clap::Parser;
use microdata_anon::config::Config;
use microdata_anon::engine::ModelKind;
use microdata_anon::output::RunReport;
use microdata_anon::{HierarchyStore, Job, anonymize, input, output};
use std::path::PathBuf;
use std::str::FromStr;
use strum::IntoEnumIterator;

#[derive(Parser, Debug)]
#[command(name = "microdata-anon")]
#[command(about = "Generalization-and-suppression anonymizer for tabular microdata", long_about = None)]
struct Args {
    /// Path to the job configuration file
    #[arg(short, long, default_value = "anonymize.toml")]
    config: PathBuf,

    /// Explain a privacy model (e.g. --explain l-diversity)
    #[arg(long)]
    explain: Option<String>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    // Handle --explain early exit
    if let Some(name) = args.explain {
        return explain_model(&name);
    }

    let config = Config::from_file(&args.config).context("Failed to load configuration")?;

    let table = input::load_table(&config.data)
        .with_context(|| format!("Failed to load table {}", config.data.display()))?;

    let mut hierarchies = HierarchyStore::new();
    for (qi, path) in &config.hierarchies {
        let hierarchy = input::load_hierarchy(path)
            .with_context(|| format!("Failed to load hierarchy for '{qi}'"))?;
        hierarchies.insert(qi.clone(), hierarchy);
    }

    let model = config.to_model()?;
    let identifiers: Vec<&str> = config.columns.identifiers.iter().map(String::as_str).collect();
    let quasi_identifiers: Vec<&str> = config
        .columns
        .quasi_identifiers
        .iter()
        .map(String::as_str)
        .collect();
    let job = Job {
        identifiers: &identifiers,
        quasi_identifiers: &quasi_identifiers,
        sensitive: config.columns.sensitive.as_deref(),
        model,
        supp_level: config.privacy.supp_level,
    };

    let result = anonymize(&table, &job, &hierarchies).context("Anonymization failed")?;

    output::write_csv(&result.table, &config.output)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    let model_name: &'static str = model.kind().into();
    let report = RunReport::new(model_name, table.n_rows(), &result);
    if let Some(path) = &args.report {
        std::fs::write(path, report.to_json())
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    print!("{}", report.render_text());

    if !report.satisfied {
        anyhow::bail!(
            "the requested privacy level is not achievable within the suppression budget"
        );
    }
    Ok(())
}

fn explain_model(name: &str) -> Result<()> {
    match ModelKind::from_str(name) {
        Ok(kind) => {
            println!("{}", kind.describe());
            Ok(())
        }
        Err(_) => {
            let known: Vec<&'static str> = ModelKind::iter().map(|k| k.into()).collect();
            anyhow::bail!("Unknown model: {name}. Valid models: {}", known.join(", "));
        }
    }
}
