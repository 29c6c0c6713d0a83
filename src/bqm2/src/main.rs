mod cli;
mod error;
mod kvoption;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use indexmap::IndexMap;
use resource_catalog::{load_folder, LoaderContext};
use resource_model::{Resource, WarehouseBackend};
use template_model::{Binding, Value};
use warehouse_client::InMemoryBackend;

use crate::cli::{Cli, Mode};
use crate::error::AppError;
use crate::kvoption::collect_vars;

#[tokio::main]
async fn main() {
    shared_utils::logging::init();
    if let Err(err) = run().await {
        eprintln!("bqm2: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let Some(mode) = cli.mode().map_err(AppError::InvalidArgs)? else {
        Cli::command().print_help().ok();
        println!();
        return Ok(());
    };

    if let Ok(token) = shared_utils::env::get_env_var("GOOGLE_OAUTH_ACCESS_TOKEN") {
        tracing::debug!(len = token.len(), "using GOOGLE_OAUTH_ACCESS_TOKEN as warehouse credential");
    }

    let effective_date = match &cli.effective_date {
        Some(s) => parse_effective_date(s)?,
        None => chrono::Local::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time"),
    };

    let vars_file = match &cli.vars_file {
        Some(path) => load_vars_file(path)?,
        None => IndexMap::new(),
    };
    let cli_vars = collect_vars(&cli.var)?;
    if matches!(cli_vars.get("project"), Some(v) if !matches!(v, Value::Str(_))) {
        return Err(AppError::InvalidArgs("if '--var project=...' is given, its value must be a plain string".to_string()));
    }

    let loader_ctx = LoaderContext {
        effective_date,
        cli_vars,
        vars_file,
        default_project: cli.default_project.clone(),
        default_dataset: cli.default_dataset.clone(),
    };

    if mode == Mode::PrintGlobalArgs {
        println!("{}", render_globals(&loader_ctx.merged_globals()));
        return Ok(());
    }

    let mut resources: Vec<Resource> = Vec::new();
    for folder in &cli.folders {
        resources.extend(load_folder(folder, &loader_ctx)?);
    }
    let resource_map: HashMap<String, Resource> = resources.iter().cloned().map(|r| (r.key(), r)).collect();
    let graph = dependency_planner::build_dependency_graph(&resources)?;

    match mode {
        Mode::Show => {
            for line in executor::show(&graph) {
                println!("{line}");
            }
        }
        Mode::Dotml => {
            println!("{}", executor::dotml(&graph));
        }
        Mode::Dump => {
            let folder = cli.dump_to_folder.as_deref().expect("Mode::Dump implies --dumpToFolder was given");
            for line in executor::dump(&graph, &resource_map, folder)? {
                println!("{line}");
            }
        }
        Mode::ShowJobs => {
            let backend = build_backend(&cli);
            for resource in &resources {
                if resource.is_running(backend.as_ref()).await? {
                    println!("{} is running", resource.key());
                }
            }
        }
        Mode::Execute => {
            let backend = build_backend(&cli);
            let config = executor::ExecutorConfig {
                max_concurrent: cli.max_concurrent,
                max_retry: cli.max_retry,
                check_frequency: Duration::from_secs(cli.check_frequency_secs),
            };
            executor::execute(graph, &resource_map, backend.as_ref(), config).await?;
        }
        Mode::PrintGlobalArgs => unreachable!("handled above"),
    }

    Ok(())
}

/// A production build swaps this for a real warehouse SDK client (e.g. a
/// BigQuery-backed [`WarehouseBackend`]); that client is an external
/// collaborator this crate only defines the interface for. The in-memory
/// backend here drives `--execute`/`--showJobs` against an in-process
/// double so the CLI is runnable end to end without one.
fn build_backend(cli: &Cli) -> Box<dyn WarehouseBackend> {
    Box::new(InMemoryBackend::new(cli.bq_client_location.clone(), 0))
}

fn parse_effective_date(s: &str) -> Result<chrono::NaiveDateTime, AppError> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_hms_opt(0, 0, 0).expect("midnight is always valid"));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    Err(AppError::BadEffectiveDate(s.to_string()))
}

fn load_vars_file(path: &Path) -> Result<Binding, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| AppError::VarsFile(format!("{}: {e}", path.display())))?;
    let mut bindings =
        resource_catalog::descriptor::parse_descriptor(&text, path).map_err(|e| AppError::VarsFile(e.to_string()))?;
    match bindings.len() {
        1 => Ok(bindings.remove(0)),
        0 => Ok(IndexMap::new()),
        _ => Err(AppError::VarsFile(format!("'{}' must be a single mapping, not a list", path.display()))),
    }
}

fn render_globals(binding: &Binding) -> String {
    let as_json: serde_json::Map<String, serde_json::Value> =
        binding.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect();
    serde_json::to_string_pretty(&serde_json::Value::Object(as_json)).expect("binding values are all JSON-representable")
}

fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Objects(subs) => serde_json::Value::Array(
            subs.iter()
                .map(|b| serde_json::Value::Object(b.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect()))
                .collect(),
        ),
    }
}
