//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pipeline::{HttpMethod, Payload, RequestOptions};
use serde_json::Value;

/// Calls knowledge-base backend services through the unified request layer.
#[derive(Debug, Parser)]
#[command(name = "kbctl", version, about, propagate_version = true)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "KBCTL_CONFIG", default_value = "kbctl.toml")]
    pub config: PathBuf,

    /// Environment whose service addresses are used.
    #[arg(long, global = true, env = "KBCTL_ENV", default_value = "development")]
    pub env: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Log filter directive, used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// OTLP collector endpoint; traces are exported when set.
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// The view the caller is on, used as the return target after sign-in.
    #[arg(long, global = true, default_value = "/")]
    pub location: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// GET a resource.
    Get(ReadArgs),
    /// DELETE a resource.
    Delete(ReadArgs),
    /// POST a JSON body.
    Post(WriteArgs),
    /// PUT a JSON body.
    Put(WriteArgs),
    /// Store a session token.
    Login {
        /// Bearer token.
        #[arg(long)]
        token: String,
        /// User identifier sent as `X-User-ID`.
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Clear the stored session.
    Logout,
    /// List the services of the selected environment.
    Services,
}

/// Target of a call.
#[derive(Debug, Args)]
pub struct Target {
    /// Logical service name.
    pub service: String,
    /// Path relative to the service's base address.
    pub path: String,
    /// Report failures only through the exit status.
    #[arg(long)]
    pub skip_error_handler: bool,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    #[command(flatten)]
    pub target: Target,
    /// Query parameter as `key=value`; repeat the key for a list.
    #[arg(long = "query", value_parser = parse_query_pair)]
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    #[command(flatten)]
    pub target: Target,
    /// JSON request body.
    #[arg(long, value_parser = parse_json)]
    pub data: Option<Value>,
}

/// A resolved call: verb, target, body, and options.
#[derive(Debug)]
pub struct Call {
    pub method: HttpMethod,
    pub service: String,
    pub path: String,
    pub body: Option<Payload>,
    pub options: RequestOptions,
}

impl Command {
    /// Returns the call this command performs, or `None` for local commands.
    pub fn call(&self) -> Option<Call> {
        let no_query: &[(String, String)] = &[];
        let (method, target, query, body) = match self {
            Self::Get(args) => (HttpMethod::Get, &args.target, args.query.as_slice(), None),
            Self::Delete(args) => (HttpMethod::Delete, &args.target, args.query.as_slice(), None),
            Self::Post(args) => (HttpMethod::Post, &args.target, no_query, args.data.clone()),
            Self::Put(args) => (HttpMethod::Put, &args.target, no_query, args.data.clone()),
            Self::Login { .. } | Self::Logout | Self::Services => return None,
        };

        let mut options = RequestOptions::default();
        if target.skip_error_handler {
            options = options.skip_error_handler();
        }
        if !query.is_empty() {
            options = options.with_query(query_payload(query));
        }

        Some(Call {
            method,
            service: target.service.clone(),
            path: target.path.clone(),
            body: body.map(Payload::from),
            options,
        })
    }
}

fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON body: {e}"))
}

/// Folds `key=value` pairs into a mapping; a repeated key becomes a list.
fn query_payload(pairs: &[(String, String)]) -> Payload {
    let mut object = std::collections::BTreeMap::<String, Payload>::new();
    for (key, value) in pairs {
        let value = Payload::from(value.as_str());
        match object.remove(key) {
            None => {
                object.insert(key.clone(), value);
            }
            Some(Payload::Array(mut items)) => {
                items.push(value);
                object.insert(key.clone(), Payload::Array(items));
            }
            Some(first) => {
                object.insert(key.clone(), Payload::Array(vec![first, value]));
            }
        }
    }
    Payload::Object(object)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("kbctl").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn get_with_repeated_query_keys() {
        let cli = parse(&[
            "get", "content", "/articles", "--query", "tag=a", "--query", "tag=b", "--query",
            "page=2",
        ]);
        let call = cli.command.call().unwrap();

        assert_eq!(call.method, HttpMethod::Get);
        assert_eq!(call.service, "content");
        assert_eq!(
            call.options.query.unwrap().to_query_pairs(),
            vec![
                ("page".to_owned(), "2".to_owned()),
                ("tag".to_owned(), "a".to_owned()),
                ("tag".to_owned(), "b".to_owned()),
            ]
        );
        assert!(!call.options.skip_error_handler);
    }

    #[test]
    fn post_parses_json_body_and_global_flags_after_subcommand() {
        let cli = parse(&[
            "post",
            "content",
            "/articles",
            "--data",
            r#"{"title":"Intro"}"#,
            "--skip-error-handler",
            "--env",
            "production",
            "--log-format",
            "json",
        ]);

        assert_eq!(cli.env, "production");
        assert_eq!(cli.log_format, LogFormat::Json);
        let call = cli.command.call().unwrap();
        assert_eq!(call.method, HttpMethod::Post);
        assert_eq!(call.body, Some(Payload::from(serde_json::json!({"title": "Intro"}))));
        assert!(call.options.skip_error_handler);
    }

    #[test]
    fn rejects_malformed_query_and_body() {
        assert!(Cli::try_parse_from(["kbctl", "get", "content", "/a", "--query", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["kbctl", "get", "content", "/a", "--query", "=x"]).is_err());
        assert!(Cli::try_parse_from(["kbctl", "put", "content", "/a", "--data", "{oops"]).is_err());
    }

    #[test]
    fn local_commands_perform_no_call() {
        assert!(parse(&["login", "--token", "t"]).command.call().is_none());
        assert!(parse(&["logout"]).command.call().is_none());
        assert!(parse(&["services"]).command.call().is_none());
    }

    #[test]
    fn query_value_may_contain_equals() {
        assert_eq!(
            parse_query_pair("filter=a=b"),
            Ok(("filter".to_owned(), "a=b".to_owned()))
        );
    }
}
