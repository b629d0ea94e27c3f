//! Waypoint CLI - credential registry for network traversal workspaces
//!
//! This binary manages the credentials of a workspace:
//! - Add credentials of any registered authentication method
//! - List, show and edit stored credentials
//! - Move credentials in and out of scope
//! - Delete credentials along with the connections that use them

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use waypoint_core::config::{self, ConfigSource, WorkspaceConfig};
use waypoint_core::{
    Credential, EndpointId, EndpointLookup, FieldEdits, FoundFilter, ScopeFilter, Workspace,
};

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(version)]
#[command(about = "Manage the credentials of a network traversal workspace")]
#[command(long_about = "
Waypoint keeps one record per logical credential: adding the same
password user or the same private key twice reuses the existing entry.

Quick start:
  1. Add a password:     waypoint add password 'admin:Winter2024!'
  2. Add a key file:     waypoint add privkey keys/id_rsa
  3. List credentials:   waypoint list --scope in
  4. Remove one:         waypoint delete 3
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Workspace directory (overrides WAYPOINT_WORKSPACE and config file)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    /// In scope only
    In,
    /// Out of scope only
    Out,
    /// Both
    All,
}

impl From<ScopeArg> for ScopeFilter {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::In => ScopeFilter::InScope,
            ScopeArg::Out => ScopeFilter::OutOfScope,
            ScopeArg::All => ScopeFilter::Any,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ScopeState {
    In,
    Out,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered authentication methods
    Methods,

    /// List stored credentials
    #[command(alias = "ls")]
    List {
        /// Filter by scope
        #[arg(short, long, default_value = "all")]
        scope: ScopeArg,

        /// Filter by discovery endpoint id, or "none" for manually added ones
        #[arg(long, value_parser = parse_found_filter)]
        found: Option<FoundFilter>,
    },

    /// Add credentials (reuses the stored entry for a known identity)
    Add {
        /// Authentication method kind (see `waypoint methods`)
        method: String,

        /// Serialized content, e.g. 'user:password' or a key file path
        content: String,

        /// Mark the credentials out of scope
        #[arg(long)]
        out_of_scope: bool,

        /// Endpoint id the credentials were found on
        #[arg(long)]
        found: Option<i64>,
    },

    /// Show stored credentials
    Show {
        /// Credentials id
        id: i64,
    },

    /// Edit fields of stored credentials
    Edit {
        /// Credentials id
        id: i64,

        /// Field update as key=value (repeatable)
        #[arg(long = "set", value_parser = parse_field_edit, required = true)]
        set: Vec<(String, String)>,
    },

    /// Put credentials in or out of scope
    Scope {
        /// Credentials id
        id: i64,

        state: ScopeState,
    },

    /// Delete credentials and every connection using them
    #[command(alias = "rm")]
    Delete {
        /// Credentials id
        id: i64,
    },

    /// Print the fingerprint of credentials without storing them
    Fingerprint {
        method: String,
        content: String,
    },

    /// Show configuration paths and settings
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("waypoint={},waypoint_core={}", log_level, log_level).into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Config = cli.command {
        return cmd_config(&cli);
    }

    let workspace = open_workspace(&cli)?;

    match &cli.command {
        Commands::Methods => cmd_methods(&cli, &workspace),
        Commands::List { scope, found } => {
            cmd_list(&cli, &workspace, (*scope).into(), found.unwrap_or_default())
        }
        Commands::Add {
            method,
            content,
            out_of_scope,
            found,
        } => cmd_add(&cli, &workspace, method, content, *out_of_scope, *found),
        Commands::Show { id } => cmd_show(&cli, &workspace, *id),
        Commands::Edit { id, set } => cmd_edit(&cli, &workspace, *id, set),
        Commands::Scope { id, state } => {
            cmd_scope(&cli, &workspace, *id, matches!(state, ScopeState::In))
        }
        Commands::Delete { id } => cmd_delete(&cli, &workspace, *id),
        Commands::Fingerprint { method, content } => {
            cmd_fingerprint(&cli, &workspace, method, content)
        }
        Commands::Config => cmd_config(&cli),
    }
}

fn workspace_config(cli: &Cli) -> WorkspaceConfig {
    match &cli.workspace {
        Some(path) => WorkspaceConfig {
            path: path.clone(),
            source: ConfigSource::CommandLine,
        },
        None => config::load_workspace_config(),
    }
}

fn open_workspace(cli: &Cli) -> Result<Workspace> {
    let workspace_config = workspace_config(cli);
    tracing::debug!(
        "Workspace {:?} (from {})",
        workspace_config.path,
        workspace_config.source
    );
    Workspace::open(&workspace_config.path)
        .with_context(|| format!("Failed to open workspace {:?}", workspace_config.path))
}

/// `--found` value: an endpoint id or "none"
fn parse_found_filter(value: &str) -> Result<FoundFilter, String> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(FoundFilter::Nowhere);
    }
    value
        .parse::<i64>()
        .map(|id| FoundFilter::Endpoint(EndpointId(id)))
        .map_err(|_| format!("expected an endpoint id or 'none', got '{}'", value))
}

/// `--set` value: key=value
fn parse_field_edit(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => Ok((key.trim().to_string(), val.to_string())),
        _ => Err(format!("expected key=value, got '{}'", value)),
    }
}

fn load_creds(workspace: &Workspace, id: i64) -> Result<Credential> {
    match Credential::find_one(workspace, id)? {
        Some(creds) => Ok(creds),
        None => bail!("No credentials with id #{}", id),
    }
}

fn found_label(workspace: &Workspace, found: Option<EndpointId>) -> Result<String> {
    let Some(id) = found else {
        return Ok("-".to_string());
    };
    Ok(match workspace.topology().find_endpoint(id)? {
        Some(endpoint) => endpoint.to_string(),
        None => format!("{} (missing)", id),
    })
}

fn cmd_methods(cli: &Cli, workspace: &Workspace) -> Result<()> {
    let kinds: Vec<&str> = workspace.methods().kinds().collect();
    match cli.format {
        OutputFormat::Text => {
            for kind in kinds {
                println!("{}", kind);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::json!({ "methods": kinds })),
    }
    Ok(())
}

fn cmd_list(cli: &Cli, workspace: &Workspace, scope: ScopeFilter, found: FoundFilter) -> Result<()> {
    let rows = workspace.store().list_all(scope, found)?;

    match cli.format {
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No credentials.");
                return Ok(());
            }
            println!("  {:>4}  {:<9} {:<5} {:<21} {}", "ID", "TYPE", "SCOPE", "FOUND", "IDENTITY");
            for row in &rows {
                println!(
                    "  {:>4}  {:<9} {:<5} {:<21} {}",
                    row.id,
                    row.method_kind,
                    if row.in_scope { "in" } else { "out" },
                    found_label(workspace, row.found)?,
                    row.identifier
                );
            }
        }
        OutputFormat::Json => {
            let creds: Vec<_> = rows
                .iter()
                .map(|row| {
                    serde_json::json!({
                        "id": row.id,
                        "type": row.method_kind,
                        "identifier": row.identifier,
                        "fingerprint": waypoint_core::Fingerprint::of(&row.method_kind, &row.identifier),
                        "scope": row.in_scope,
                        "found": row.found,
                    })
                })
                .collect();
            println!("{}", serde_json::json!({ "creds": creds }));
        }
    }

    Ok(())
}

fn cmd_add(
    cli: &Cli,
    workspace: &Workspace,
    method: &str,
    content: &str,
    out_of_scope: bool,
    found: Option<i64>,
) -> Result<()> {
    let mut creds = Credential::open(workspace, method, content)?;

    if let Some(id) = creds.id() {
        match cli.format {
            OutputFormat::Text => println!("Already stored as #{}", id),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({
                    "status": "exists",
                    "id": id,
                    "fingerprint": creds.fingerprint(),
                }));
            }
        }
        return Ok(());
    }

    if let Some(endpoint) = found.map(EndpointId) {
        if workspace.topology().find_endpoint(endpoint)?.is_none() {
            bail!("No endpoint with id {}", endpoint);
        }
        creds.set_found(Some(endpoint));
    }
    creds.set_scope(!out_of_scope);
    creds.save(workspace)?;

    match cli.format {
        OutputFormat::Text => println!("Added {} credentials {}", creds.method_kind(), creds),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "status": "added",
                "id": creds.id(),
                "fingerprint": creds.fingerprint(),
            }));
        }
    }

    Ok(())
}

fn cmd_show(cli: &Cli, workspace: &Workspace, id: i64) -> Result<()> {
    let creds = load_creds(workspace, id)?;
    let found = found_label(workspace, creds.found())?;

    match cli.format {
        OutputFormat::Text => {
            println!("Credentials {}", creds);
            println!("Type:        {}", creds.method_kind());
            println!("Scope:       {}", if creds.in_scope() { "in" } else { "out" });
            println!("Found on:    {}", found);
            println!("Fingerprint: {}", creds.fingerprint());
            println!();
            for (field, value) in creds.show() {
                println!("  {:<12} {}", format!("{}:", field), value);
            }
        }
        OutputFormat::Json => {
            let fields: serde_json::Map<String, serde_json::Value> = creds
                .show()
                .into_iter()
                .map(|(field, value)| (field, value.into()))
                .collect();
            println!("{}", serde_json::json!({
                "id": creds.id(),
                "type": creds.method_kind(),
                "scope": creds.in_scope(),
                "found": creds.found(),
                "fingerprint": creds.fingerprint(),
                "fields": fields,
                "connection_params": creds.connection_params(),
            }));
        }
    }

    Ok(())
}

fn cmd_edit(cli: &Cli, workspace: &Workspace, id: i64, set: &[(String, String)]) -> Result<()> {
    let mut creds = load_creds(workspace, id)?;
    let edits: FieldEdits = set.iter().cloned().collect();
    creds.edit(workspace, &edits)?;

    match cli.format {
        OutputFormat::Text => println!("Updated credentials {}", creds),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "status": "updated",
                "id": creds.id(),
            }));
        }
    }

    Ok(())
}

fn cmd_scope(cli: &Cli, workspace: &Workspace, id: i64, in_scope: bool) -> Result<()> {
    let mut creds = load_creds(workspace, id)?;
    creds.set_scope(in_scope);
    creds.save(workspace)?;

    match cli.format {
        OutputFormat::Text => {
            println!(
                "Credentials {} {}",
                creds,
                if in_scope { "in scope" } else { "out of scope" }
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "id": creds.id(),
                "scope": in_scope,
            }));
        }
    }

    Ok(())
}

fn cmd_delete(cli: &Cli, workspace: &Workspace, id: i64) -> Result<()> {
    let creds = load_creds(workspace, id)?;
    let report = creds.delete(workspace, &workspace.topology())?;

    match cli.format {
        OutputFormat::Text => {
            println!("Deleted credentials #{}", id);
            for (kind, ids) in report.iter() {
                let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                println!("  {:<12} {}", kind, ids.join(", "));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "status": "deleted",
                "removed": report,
            }));
        }
    }

    Ok(())
}

fn cmd_fingerprint(cli: &Cli, workspace: &Workspace, method: &str, content: &str) -> Result<()> {
    let fingerprint = workspace.resolver().compute_fingerprint(method, content)?;
    match cli.format {
        OutputFormat::Text => println!("{}", fingerprint),
        OutputFormat::Json => println!("{}", serde_json::json!({ "fingerprint": fingerprint })),
    }
    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let workspace_config = workspace_config(cli);
    let config_path = config::get_config_file_path_string();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:  {}", config_path);
            println!(
                "Workspace:    {} (from {})",
                workspace_config.path.display(),
                workspace_config.source
            );
            println!();
            println!("Environment variables:");
            println!("  {} - Override workspace directory", config::ENV_WORKSPACE);
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", config::generate_example_config());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "config_file": config_path,
                "workspace": workspace_config.path,
                "workspace_source": format!("{}", workspace_config.source),
            }));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_found_filter() {
        assert_eq!(parse_found_filter("none"), Ok(FoundFilter::Nowhere));
        assert_eq!(
            parse_found_filter("12"),
            Ok(FoundFilter::Endpoint(EndpointId(12)))
        );
        assert!(parse_found_filter("router").is_err());
    }

    #[test]
    fn test_parse_field_edit() {
        assert_eq!(
            parse_field_edit("password=a=b"),
            Ok(("password".to_string(), "a=b".to_string()))
        );
        assert_eq!(
            parse_field_edit("password="),
            Ok(("password".to_string(), String::new()))
        );
        assert!(parse_field_edit("=value").is_err());
        assert!(parse_field_edit("novalue").is_err());
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from([
            "waypoint", "--workspace", "/tmp/ws", "edit", "3", "--set", "user=root", "--set", "password=x",
        ])
        .unwrap();
        match cli.command {
            Commands::Edit { id, set } => {
                assert_eq!(id, 3);
                assert_eq!(set.len(), 2);
            }
            _ => panic!("expected edit"),
        }
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));

        let cli = Cli::try_parse_from(["waypoint", "list", "--scope", "out", "--found", "none"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List {
                scope: ScopeArg::Out,
                found: Some(FoundFilter::Nowhere)
            }
        ));
    }
}
