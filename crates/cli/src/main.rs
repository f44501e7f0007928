//! Restmap CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load `restmap.toml` (API settings and resource
//!    class declarations) and apply command-line overrides.
//! 2. **Wire observability**: configure `tracing-subscriber` with a JSON or
//!    compact layer and, when an endpoint is configured, an OpenTelemetry OTLP
//!    exporter. All `tracing` spans emitted by every crate in the workspace
//!    flow through these layers.
//! 3. **Construct infrastructure**: create the [`transport::ReqwestTransport`],
//!    wrap it in a [`model::Dispatcher`] and build the [`model::Schema`].
//! 4. **Run one command**: fetch records, collections or association targets
//!    and print them to stdout as JSON.

mod config;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use model::{build_schema, Direction, Dispatcher, Resource, Schema, SortKey};
use serde_json::Value;
use transport::ReqwestTransport;

use crate::config::{parse_header, parse_param, to_params, CliConfig};
use crate::telemetry::LogFormat;

/// Query a REST API through declared resource classes.
#[derive(Debug, Parser)]
#[command(name = "restmap", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(long, short, env = "RESTMAP_CONFIG", default_value = "restmap.toml")]
    config: PathBuf,

    /// Overrides `base_url` from the configuration file.
    #[arg(long, env = "RESTMAP_BASE_URL")]
    base_url: Option<String>,

    /// Extra request header (`NAME: VALUE`). Repeatable.
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Overrides `timeout_secs` from the configuration file.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log line format (written to stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Default log level when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// OTLP collector endpoint; overrides `[telemetry]` in the configuration.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    /// Pretty-print JSON output.
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the declared resource classes.
    Classes,
    /// Fetch one record by identifier.
    Find {
        class: String,
        id: String,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Fetch the class collection.
    List {
        class: String,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// GET a path relative to the class; the payload decides record or collection.
    Get {
        class: String,
        /// Bare name, `/`-template or absolute URL.
        path: String,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Invoke a custom request declared on the class.
    Call {
        class: String,
        name: String,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Load a record, then resolve one of its associations.
    Related {
        class: String,
        id: String,
        association: String,
        /// Filter on the association target (`KEY=VALUE`). Repeatable.
        #[arg(long = "where", short = 'w', value_parser = parse_param)]
        filters: Vec<(String, Value)>,
        /// Sort key, `field` or `field:desc`. Repeatable.
        #[arg(long = "order", short = 'o', value_parser = parse_sort_key)]
        order: Vec<SortKey>,
        /// Look up one member of the association by identifier.
        #[arg(long)]
        find: Option<String>,
    },
}

#[derive(Debug, Args)]
struct ParamArgs {
    /// Request parameter (`KEY=VALUE`). Repeatable.
    #[arg(long = "param", short = 'p', value_parser = parse_param)]
    params: Vec<(String, Value)>,
}

fn parse_sort_key(raw: &str) -> anyhow::Result<SortKey> {
    let (field, direction) = match raw.rsplit_once(':') {
        Some((field, "asc")) => (field, Direction::Asc),
        Some((field, "desc")) => (field, Direction::Desc),
        Some((_, other)) => anyhow::bail!("unknown sort direction '{other}'"),
        None => (raw, Direction::Asc),
    };
    if field.is_empty() {
        anyhow::bail!("sort field is empty in '{raw}'");
    }
    Ok(SortKey::new(field, direction))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(&cli.config)?;
    config.apply_overrides(cli.base_url.clone(), cli.headers.clone(), cli.timeout_secs);

    let endpoint = cli
        .otlp_endpoint
        .as_deref()
        .or(config.telemetry.otlp_endpoint.as_deref());
    let _telemetry = telemetry::init(cli.log_format, &cli.log_level, endpoint)?;

    let transport =
        ReqwestTransport::from_config(&config.api).context("failed to create HTTP transport")?;
    let dispatcher = Dispatcher::from_config(&config.api, Arc::new(transport))
        .context("invalid API configuration")?;
    let schema = build_schema(Arc::new(dispatcher), &config.resources)
        .context("invalid resource declarations")?;
    tracing::info!(
        base_url = %config.api.base_url,
        classes = config.resources.len(),
        "Schema ready"
    );

    let output = run(&schema, cli.command).await?;
    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{text}");
    Ok(())
}

async fn run(schema: &Arc<Schema>, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::Classes => Ok(schema.class_names().collect::<Vec<_>>().into()),
        Command::Find { class, id, params } => {
            let record = schema
                .model(&class)?
                .find_with(id.as_str(), to_params(params.params))
                .await
                .with_context(|| format!("failed to find {class} {id}"))?;
            Ok(record.to_json())
        }
        Command::List { class, params } => {
            let collection = schema
                .model(&class)?
                .all(to_params(params.params))
                .await
                .with_context(|| format!("failed to list {class}"))?;
            Ok(collection.to_json())
        }
        Command::Get {
            class,
            path,
            params,
        } => {
            let resource = schema
                .model(&class)?
                .get(&path, to_params(params.params))
                .await
                .with_context(|| format!("failed to get {path} on {class}"))?;
            Ok(resource.to_json())
        }
        Command::Call {
            class,
            name,
            params,
        } => {
            let resource = schema
                .model(&class)?
                .call(&name, to_params(params.params))
                .await
                .with_context(|| format!("custom request {name} on {class} failed"))?;
            Ok(resource.to_json())
        }
        Command::Related {
            class,
            id,
            association,
            filters,
            order,
            find,
        } => {
            let owner = schema
                .model(&class)?
                .find(id.as_str())
                .await
                .with_context(|| format!("failed to find {class} {id}"))?;
            let proxy = owner
                .association(&association)?
                .filter(to_params(filters))
                .order(order);
            if let Some(member) = find {
                let found = proxy
                    .find(member.as_str())
                    .await
                    .with_context(|| format!("failed to find {association} {member}"))?;
                return Ok(found.map_or(Value::Null, |record| record.to_json()));
            }
            let resource: Resource = proxy
                .fetch()
                .await
                .with_context(|| format!("failed to load {association} of {class} {id}"))?;
            Ok(resource.to_json())
        }
    }
}
