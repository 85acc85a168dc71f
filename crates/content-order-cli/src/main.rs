//! content-order CLI
//!
//! Sort and query JSON content collections from the command line, and render
//! date tokens the way listing pages show them.
//!
//! # Commands
//!
//! - `sort`: three-bucket order sort of a JSON array
//! - `query`: filter → sort → limit, from a query spec file and/or flags
//! - `format-date`: `"2024-06"` → `"June 2024"`
//! - `format-range`: `"2022-09" "present"` → `"September 2022 – Present"`
//!
//! Collections are read from a file or stdin and written to stdout as JSON.
//! Logs go to stderr.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use content_order::item::{json_order, json_str};
use content_order::{
    format_date, format_date_range, parse_collection, sort_by_order, FieldValue, QuerySpec,
    SortBy, SortDirection, SortOptions,
};

/// Order and query content collections
#[derive(Parser)]
#[command(name = "content-order")]
#[command(version)]
#[command(about = "Order and query JSON content collections")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print JSON on a single line
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort a collection: pinned first, then newest, then pinned-last
    Sort {
        /// JSON array file ("-" or omitted for stdin)
        file: Option<PathBuf>,

        #[command(flatten)]
        keys: KeyArgs,
    },
    /// Filter, sort and limit a collection
    Query {
        /// JSON array file ("-" or omitted for stdin)
        file: Option<PathBuf>,

        /// Query spec JSON file; flags override its values
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Keep items whose field equals the value (repeatable), e.g. isFeatured=true
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Sort key: order or date
        #[arg(long)]
        sort_by: Option<SortBy>,

        /// Date sort direction: asc or desc
        #[arg(long)]
        sort_order: Option<SortDirection>,

        /// Maximum number of items to return
        #[arg(long)]
        limit: Option<usize>,

        /// Field holding the order value
        #[arg(long)]
        order_field: Option<String>,

        /// Field holding the date token
        #[arg(long)]
        date_field: Option<String>,

        /// Instant "present" resolves to (RFC 3339); defaults to now
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
    },
    /// Render a date token for display
    FormatDate {
        token: String,
    },
    /// Render a start/end pair for display
    FormatRange {
        start: String,
        end: Option<String>,
    },
}

#[derive(Args)]
struct KeyArgs {
    /// Field holding the order value
    #[arg(long, default_value = "order")]
    order_field: String,

    /// Field holding the date token
    #[arg(long, default_value = "date")]
    date_field: String,

    /// Instant "present" resolves to (RFC 3339); defaults to now
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("'{s}' is not an RFC 3339 datetime: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Sort { file, keys } => {
            let items = read_collection(file.as_deref())?;
            let anchor = keys.now.unwrap_or_else(Utc::now);
            let KeyArgs {
                order_field,
                date_field,
                ..
            } = keys;
            info!(items = items.len(), %order_field, %date_field, "Sorting collection");

            let options = SortOptions::new(anchor)
                .order_by(move |item: &Value| json_order(item, &order_field))
                .date_by(move |item: &Value| json_str(item, &date_field).map(str::to_owned));
            print_json(&sort_by_order(&items, &options), cli.compact)
        }
        Commands::Query {
            file,
            spec,
            filters,
            sort_by,
            sort_order,
            limit,
            order_field,
            date_field,
            now,
        } => {
            let mut query_spec = match spec {
                Some(path) => load_spec(&path)?,
                None => QuerySpec::default(),
            };
            for raw in &filters {
                let (key, value) = parse_filter(raw)?;
                query_spec.filter.insert(key, value);
            }
            query_spec.sort_by = sort_by.or(query_spec.sort_by);
            query_spec.sort_order = sort_order.or(query_spec.sort_order);
            query_spec.limit = limit.or(query_spec.limit);
            query_spec.order_field = order_field.or(query_spec.order_field);
            query_spec.date_field = date_field.or(query_spec.date_field);
            debug!(spec = ?query_spec, "Resolved query spec");

            let items = read_collection(file.as_deref())?;
            let query = query_spec.into_query(now.unwrap_or_else(Utc::now));
            print_json(&query.apply(&items), cli.compact)
        }
        Commands::FormatDate { token } => {
            println!("{}", format_date(&token));
            Ok(())
        }
        Commands::FormatRange { start, end } => {
            println!("{}", format_date_range(Some(&start), end.as_deref()));
            Ok(())
        }
    }
}

/// Read a JSON array from `path`, or from stdin for `None` / `"-"`.
fn read_collection(path: Option<&Path>) -> Result<Vec<Value>> {
    let input = match path {
        Some(p) if p != Path::new("-") => fs::read_to_string(p)
            .with_context(|| format!("failed to read collection from {}", p.display()))?,
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read collection from stdin")?;
            buf
        }
    };
    let items = parse_collection(&input)?;
    debug!(items = items.len(), "Loaded collection");
    Ok(items)
}

fn load_spec(path: &Path) -> Result<QuerySpec> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read query spec from {}", path.display()))?;
    QuerySpec::from_json(&raw).with_context(|| format!("in query spec {}", path.display()))
}

/// Split `KEY=VALUE`. The value is read as a JSON scalar when it is one
/// (`true`, `3`, `"x"`), and as a plain string otherwise.
fn parse_filter(raw: &str) -> Result<(String, FieldValue)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("filter '{raw}' must look like KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("filter '{raw}' has an empty key");
    }
    let value = serde_json::from_str::<FieldValue>(value)
        .unwrap_or_else(|_| FieldValue::Text(value.to_string()));
    Ok((key.to_string(), value))
}

fn print_json(items: &[Value], compact: bool) -> Result<()> {
    let out = if compact {
        serde_json::to_string(items)?
    } else {
        serde_json::to_string_pretty(items)?
    };
    println!("{out}");
    Ok(())
}
