//! o2bridge CLI
//!
//! Command-line interface for analyzing, rewriting and running OpenObserve
//! SQL queries.
//!
//! # Usage
//!
//! ```bash
//! o2bridge --help
//! o2bridge health
//! o2bridge analyze "SELECT level, count(*) AS n FROM logs GROUP BY level"
//! o2bridge inject "SELECT * FROM logs" --filter "level = error"
//! o2bridge query "SELECT * FROM logs" --minutes 15 --filter "code > number(499)"
//! o2bridge streams --type metrics
//! ```

#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use shared::client::{SearchBackend, SearchClient};
use shared::config::{
    BackendConfig, DEFAULT_BACKEND_URL, DEFAULT_BACKEND_USER, DEFAULT_ORGANIZATION,
};
use shared::models::StreamType;
use shared::pipeline::{run_query, QueryModel, TimeRange};
use shared::query::{analyze, inject_filters, Analysis, FilterCondition};
use std::time::Duration;

/// o2bridge CLI - query bridge for OpenObserve
#[derive(Parser)]
#[command(name = "o2bridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// OpenObserve base URL
    #[arg(long, env = "O2BRIDGE_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    url: String,

    /// Basic auth user
    #[arg(long, env = "O2BRIDGE_BACKEND_USER", default_value = DEFAULT_BACKEND_USER)]
    user: String,

    /// Basic auth password
    #[arg(long, env = "O2BRIDGE_BACKEND_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Organization to query
    #[arg(short, long, env = "O2BRIDGE_ORGANIZATION", default_value = DEFAULT_ORGANIZATION)]
    org: String,

    /// Request timeout in seconds
    #[arg(
        long,
        env = "O2BRIDGE_TIMEOUT_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable
    Health,

    /// Show how a query is interpreted, without contacting the backend
    Analyze {
        /// The SQL text
        sql: String,
    },

    /// Splice ad-hoc filters into a query and print the result
    Inject {
        /// The SQL text
        sql: String,

        /// Filter as "key op value", e.g. "level = error" (repeatable)
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<FilterCondition>,
    },

    /// Run a query and print the shaped frame as JSON
    Query {
        /// The SQL text, or "\dt <kind>" to list streams
        sql: String,

        /// Kind of stream queried
        #[arg(short = 't', long = "type", default_value = "logs")]
        stream_type: StreamType,

        /// Window length in minutes, ending now (ignored with --start)
        #[arg(short, long, default_value_t = 60)]
        minutes: i64,

        /// Window start (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Window end (RFC 3339, default: now)
        #[arg(long)]
        end: Option<DateTime<Utc>>,

        /// Number of hits to request (0: query LIMIT or the default)
        #[arg(long, default_value_t = 0)]
        size: i64,

        /// Offset of the first hit
        #[arg(long, default_value_t = 0)]
        offset: i64,

        /// Use the streaming search protocol
        #[arg(long)]
        stream: bool,

        /// Filter as "key op value" (repeatable)
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<FilterCondition>,
    },

    /// List streams of a kind with their fields
    Streams {
        /// Kind of streams to list
        #[arg(short = 't', long = "type", default_value = "logs")]
        stream_type: StreamType,
    },
}

/// Parses `key op value`; the value may contain spaces.
fn parse_filter(raw: &str) -> Result<FilterCondition, String> {
    let mut parts = raw.trim().splitn(3, ' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(operator), Some(value)) if !key.is_empty() && !operator.is_empty() => {
            Ok(FilterCondition::new(key, operator, value.trim()))
        }
        _ => Err(format!("expected \"key op value\", got \"{raw}\"")),
    }
}

impl Cli {
    fn backend_config(&self) -> BackendConfig {
        let mut config = BackendConfig::new(&self.url)
            .with_credentials(&self.user, &self.password)
            .with_timeout(Duration::from_secs(self.timeout));
        config.organization.clone_from(&self.org);
        config
    }

    fn client(&self) -> Result<SearchClient> {
        SearchClient::new(self.backend_config()).context("Failed to create search client")
    }
}

fn time_range(
    minutes: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<TimeRange> {
    let end = end.unwrap_or_else(Utc::now);
    let start = start.unwrap_or_else(|| end - ChronoDuration::minutes(minutes));
    if start > end {
        bail!("window start {start} is after its end {end}");
    }
    Ok(TimeRange::new(start, end))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = &cli.command else {
        println!("o2bridge CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for usage information");
        return Ok(());
    };

    match command {
        Commands::Health => {
            let client = cli.client()?;
            client
                .health_check()
                .await
                .with_context(|| format!("Backend at {} is not healthy", cli.url))?;
            println!("Backend at {} is healthy", cli.url);
        }
        Commands::Analyze { sql } => match analyze(sql)? {
            Analysis::Introspection(command) => print_json(&json!({ "introspection": command }))?,
            Analysis::Select(parsed) => print_json(&parsed)?,
        },
        Commands::Inject { sql, filters } => {
            println!("{}", inject_filters(sql, filters)?);
        }
        Commands::Query {
            sql,
            stream_type,
            minutes,
            start,
            end,
            size,
            offset,
            stream,
            filters,
        } => {
            let range = time_range(*minutes, *start, *end)?;
            let mut model = QueryModel::new("cli", sql.clone())
                .with_query_type(*stream_type)
                .with_streaming(*stream)
                .with_size(*size);
            model.from = *offset;
            model.adhoc_filters.clone_from(filters);

            let client = cli.client()?;
            let frame = run_query(&client, &cli.org, &range, &model).await?;
            tracing::info!(rows = frame.row_count(), "Query completed");
            print_json(&frame)?;
        }
        Commands::Streams { stream_type } => {
            let client = cli.client()?;
            let streams = client.list_streams(&cli.org, *stream_type).await?;
            let listing: std::collections::BTreeMap<_, _> = streams
                .iter()
                .map(|stream| (stream.name.clone(), stream.field_names()))
                .collect();
            print_json(&listing)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    run(Cli::parse()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["o2bridge"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_health_command() {
        let cli = Cli::try_parse_from(["o2bridge", "health"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Health)));
    }

    #[test]
    fn test_cli_connection_flags() {
        let cli = Cli::try_parse_from([
            "o2bridge",
            "--url",
            "https://o2.example.com/",
            "--user",
            "admin",
            "--password",
            "secret",
            "--org",
            "acme",
            "--timeout",
            "5",
            "health",
        ])
        .unwrap();

        let config = cli.backend_config();
        assert_eq!(config.url, "https://o2.example.com");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "secret");
        assert_eq!(config.organization, "acme");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_cli_rejects_zero_timeout() {
        assert!(Cli::try_parse_from(["o2bridge", "--timeout", "0", "health"]).is_err());
    }

    #[test]
    fn test_cli_query_command() {
        let cli = Cli::try_parse_from([
            "o2bridge",
            "query",
            "SELECT * FROM logs",
            "--type",
            "traces",
            "--stream",
            "--filter",
            "level = error",
            "--filter",
            "msg != connection reset",
        ])
        .unwrap();

        let Some(Commands::Query {
            stream_type,
            stream,
            filters,
            minutes,
            ..
        }) = cli.command
        else {
            panic!("Expected query command");
        };
        assert_eq!(stream_type, StreamType::Traces);
        assert!(stream);
        assert_eq!(minutes, 60);
        assert_eq!(
            filters,
            vec![
                FilterCondition::new("level", "=", "error"),
                FilterCondition::new("msg", "!=", "connection reset"),
            ]
        );
    }

    #[test]
    fn test_cli_rejects_bad_type_and_filter() {
        assert!(Cli::try_parse_from(["o2bridge", "streams", "--type", "events"]).is_err());
        let args = ["o2bridge", "inject", "SELECT 1", "--filter", "level"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter(" code > number(499) ").unwrap(),
            FilterCondition::new("code", ">", "number(499)")
        );
        assert!(parse_filter("level =").is_err());
    }

    #[test]
    fn test_time_range() {
        let end = DateTime::parse_from_rfc3339("2024-01-01T01:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let range = time_range(30, None, Some(end)).unwrap();
        assert_eq!(range.to - range.from, ChronoDuration::minutes(30));

        assert!(time_range(30, Some(end), Some(end - ChronoDuration::minutes(1))).is_err());
    }

    #[tokio::test]
    async fn test_run_offline_commands() {
        let analyze = Cli::try_parse_from(["o2bridge", "analyze", "SELECT a FROM t"]).unwrap();
        assert!(run(analyze).await.is_ok());

        let args = ["o2bridge", "inject", "SELECT * FROM t", "--filter", "a = b"];
        let inject = Cli::try_parse_from(args).unwrap();
        assert!(run(inject).await.is_ok());

        let broken = Cli::try_parse_from(["o2bridge", "analyze", "UPDATE t SET a = 1"]).unwrap();
        assert!(run(broken).await.is_err());
    }
}
