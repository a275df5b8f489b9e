//! CLI module for client and inbound administration.
//!
//! Can be used either as a standalone binary or as a subcommand of the
//! main xpanel CLI.
//!
//! # Usage
//!
//! ```bash
//! # Add an inbound
//! xpanel admin add-inbound -p vless -t ws --port 8080
//!
//! # Add a client attached to it and print its link
//! xpanel admin add -u alice -q 5 -d 30 -t vless-ws
//!
//! # List clients
//! xpanel admin list -f json
//!
//! # Extend a client by 30 days
//! xpanel admin edit -u alice --add-days 30
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tabled::{Table, Tabled};
use xpanel_config::{
    CliOverrides, Config, apply_overrides, init_tracing, load_or_default, validate_config,
};
use xpanel_core::{Client, Endpoint, Family, Protocol, Transport, format_bytes};
use xpanel_store::LineIssue;

use crate::domain::resolve_domain;
use crate::service::{ClientEdit, NewClient, Panel};

/// Client and inbound management CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "xpanel-admin",
    version,
    about = "Manage xpanel clients and inbounds"
)]
pub struct AdminArgs {
    /// Panel config file (TOML, YAML or JSON).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,

    #[command(subcommand)]
    pub command: AdminCommands,
}

/// Admin CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommands {
    /// Add a client and print its connection link.
    Add {
        /// Username, also the engine email.
        #[arg(short, long)]
        username: String,

        /// Quota in GB (0 for unlimited).
        #[arg(short, long, default_value_t = 0.0)]
        quota: f64,

        /// Days until expiry.
        #[arg(short, long, default_value_t = 30)]
        days: i64,

        /// Inbound tag, e.g. "vless-ws".
        #[arg(short, long)]
        tag: String,

        /// Use this UUID or password instead of a generated one.
        #[arg(long)]
        credential: Option<String>,
    },

    /// Change quota or expiry of a client.
    Edit {
        #[arg(short, long)]
        username: String,

        /// New quota in GB.
        #[arg(short, long)]
        quota: Option<f64>,

        /// Days added to the current expiry.
        #[arg(long)]
        add_days: Option<i64>,

        /// Zero the recorded usage.
        #[arg(long)]
        reset_usage: bool,
    },

    /// Remove a client.
    Remove {
        #[arg(short, long)]
        username: String,
    },

    /// List clients.
    List {
        /// Output format (table, json, csv).
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Print the connection link of a client.
    Link {
        #[arg(short, long)]
        username: String,
    },

    /// Add an inbound.
    AddInbound {
        /// Protocol family (vless, vmess, trojan).
        #[arg(short, long)]
        protocol: Family,

        /// Transport (xtls, ws, grpc).
        #[arg(short, long)]
        transport: Transport,

        #[arg(long, default_value_t = 443)]
        port: u16,
    },

    /// Remove every inbound on a port.
    RemoveInbound {
        #[arg(long)]
        port: u16,
    },

    /// List inbounds.
    Inbounds {
        /// Output format (table, json, csv).
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Regenerate the engine config and restart the engine.
    Sync,

    /// Show whether the engine service is running.
    Status,
}

/// Client row for display.
#[derive(Tabled, Serialize)]
struct ClientDisplay {
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Inbound")]
    inbound: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Quota")]
    quota: String,
    #[tabled(rename = "Expires")]
    expires: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Online")]
    online: String,
}

impl ClientDisplay {
    fn new(client: &Client, now: NaiveDateTime, online: bool) -> Self {
        Self {
            username: client.username.clone(),
            inbound: client.protocol.clone(),
            used: format_bytes(client.used),
            quota: format_quota(client.quota),
            expires: client.expiry.format("%Y-%m-%d").to_string(),
            status: if client.is_expired(now) {
                "EXPIRED"
            } else {
                "ACTIVE"
            }
            .to_string(),
            online: if online { "yes" } else { "no" }.to_string(),
        }
    }
}

/// Inbound row for display.
#[derive(Tabled, Serialize)]
struct InboundDisplay {
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Clients")]
    clients: usize,
}

/// Run the admin CLI with the given arguments.
///
/// This is the main entry point for the admin CLI, used by both the
/// standalone binary and the unified xpanel CLI.
pub async fn run(args: AdminArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(&args)?;
    init_tracing(&config.logging);
    let panel = Panel::from_config(&config);

    match args.command {
        AdminCommands::Add {
            username,
            quota,
            days,
            tag,
            credential,
        } => {
            let request = NewClient {
                username,
                quota,
                days,
                tag,
                credential,
            };
            add_client(&panel, &config, request).await
        }
        AdminCommands::Edit {
            username,
            quota,
            add_days,
            reset_usage,
        } => {
            let edit = ClientEdit {
                quota,
                add_days,
                reset_usage,
            };
            if edit.is_empty() {
                println!("No updates specified.");
                return Ok(());
            }
            let client = panel.edit_client(&username, edit).await?;
            println!("Client updated.");
            println!("  Quota: {}", format_quota(client.quota));
            println!("  Used: {}", format_bytes(client.used));
            println!("  Expires: {}", client.expiry);
            Ok(())
        }
        AdminCommands::Remove { username } => {
            match panel.delete_client(&username).await? {
                0 => println!("No client named {username}."),
                n => println!("Removed {n} record(s) for {username}."),
            }
            Ok(())
        }
        AdminCommands::List { format } => list_clients(&panel, &format).await,
        AdminCommands::Link { username } => {
            let domain = resolve_domain(&config.panel).await;
            println!("{}", panel.link(&username, &domain).await?);
            Ok(())
        }
        AdminCommands::AddInbound {
            protocol,
            transport,
            port,
        } => {
            let endpoint = panel
                .add_endpoint(Protocol::new(protocol, transport), port)
                .await?;
            println!("Inbound {} added on port {}.", endpoint.tag, endpoint.port);
            Ok(())
        }
        AdminCommands::RemoveInbound { port } => {
            match panel.delete_endpoint(port).await? {
                0 => println!("No inbound on port {port}."),
                n => println!("Removed {n} inbound(s) on port {port}."),
            }
            Ok(())
        }
        AdminCommands::Inbounds { format } => list_inbounds(&panel, &format).await,
        AdminCommands::Sync => {
            let rendered = panel.sync_and_restart().await?;
            println!(
                "Engine config written ({} inbounds) and engine restarted.",
                rendered.document.user_inbounds().count()
            );
            for orphan in &rendered.orphans {
                println!("  warning: {} references missing inbound {}", orphan.username, orphan.tag);
            }
            Ok(())
        }
        AdminCommands::Status => {
            let active = panel.status().await?;
            println!("{}: {}", config.engine.service, if active { "running" } else { "stopped" });
            Ok(())
        }
    }
}

fn load(args: &AdminArgs) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = load_or_default(args.config.as_deref())?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;
    Ok(config)
}

async fn add_client(
    panel: &Panel,
    config: &Config,
    request: NewClient,
) -> Result<(), Box<dyn std::error::Error>> {
    // the link is only printed once the record is stored and the engine reloaded
    let client = panel.create_client(request).await?;

    println!("Client added successfully.");
    println!("  Username: {}", client.username);
    println!("  Inbound: {}", client.protocol);
    println!("  Quota: {}", format_quota(client.quota));
    println!("  Expires: {}", client.expiry);

    let domain = resolve_domain(&config.panel).await;
    println!("  Link: {}", panel.link_for(&client, &domain).await?);
    Ok(())
}

async fn list_clients(panel: &Panel, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = panel.clients().await?;
    report_issues("clients", &loaded.issues);
    if loaded.records.is_empty() {
        println!("No clients found.");
        return Ok(());
    }

    let online = match panel.online_users().await {
        Ok(online) => online,
        Err(e) => {
            eprintln!("warning: online state unavailable: {e}");
            HashSet::new()
        }
    };
    let now = Local::now().naive_local();
    let rows: Vec<ClientDisplay> = loaded
        .records
        .iter()
        .map(|c| ClientDisplay::new(c, now, online.contains(&c.username)))
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        "csv" => {
            println!("username,inbound,used,quota,expires,status,online");
            for row in rows {
                println!(
                    "{},{},{},{},{},{},{}",
                    row.username,
                    row.inbound,
                    row.used,
                    row.quota,
                    row.expires,
                    row.status,
                    row.online
                );
            }
        }
        _ => println!("{}", Table::new(rows)),
    }
    Ok(())
}

async fn list_inbounds(panel: &Panel, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let endpoints = panel.endpoints().await?;
    report_issues("inbounds", &endpoints.issues);
    if endpoints.records.is_empty() {
        println!("No inbounds found.");
        return Ok(());
    }

    let clients = panel.clients().await?.into_records();
    let rows = inbound_rows(&endpoints.records, &clients);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        "csv" => {
            println!("tag,port,clients");
            for row in rows {
                println!("{},{},{}", row.tag, row.port, row.clients);
            }
        }
        _ => println!("{}", Table::new(rows)),
    }
    Ok(())
}

fn inbound_rows(endpoints: &[Endpoint], clients: &[Client]) -> Vec<InboundDisplay> {
    endpoints
        .iter()
        .map(|ep| InboundDisplay {
            tag: ep.tag.clone(),
            port: ep.port,
            clients: clients.iter().filter(|c| c.protocol == ep.tag).count(),
        })
        .collect()
}

fn report_issues(file: &str, issues: &[LineIssue]) {
    for issue in issues {
        eprintln!("warning: {file} line {}: {}", issue.line, issue.kind);
    }
}

/// Format a GB quota (0 means unlimited).
fn format_quota(quota: f64) -> String {
    if quota > 0.0 {
        format!("{quota:.2} GB")
    } else {
        "Unlimited".to_string()
    }
}
