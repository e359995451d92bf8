//! NOTIFIX CLI
//!
//! Resolve recipients against the RBAC service, one-shot or interactively.

use anyhow::Context;
use clap::{Parser, Subcommand};
use notifix::{CacheSweeper, Config, RbacClient, RecipientProvider, Recipients};
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// NOTIFIX CLI - Recipient lookups
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RBAC base URL, overrides the configuration
    #[arg(long)]
    rbac_url: Option<String>,

    /// Users requested per RBAC call, overrides the configuration
    #[arg(long)]
    page_size: Option<NonZeroUsize>,

    #[command(subcommand)]
    command: Option<Lookup>,
}

#[derive(Subcommand, Debug)]
enum Lookup {
    /// All users of a tenant
    Users {
        tenant: String,
        #[arg(long)]
        admins_only: bool,
    },
    /// Users of one group of a tenant
    GroupUsers {
        tenant: String,
        group: Uuid,
        #[arg(long)]
        admins_only: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("notifix=warn".parse()?))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(url) = args.rbac_url {
        config = config.with_rbac_url(url);
    }
    if let Some(page_size) = args.page_size {
        config = config.with_elements_per_page(page_size);
    }

    let rbac = Arc::new(RbacClient::new(&config.rbac)?);
    let provider = RecipientProvider::new(rbac.clone(), rbac, &config.recipients);

    match args.command {
        Some(lookup) => {
            let users = run_lookup(&provider, lookup).await?;
            print_users(&users);
        }
        None => {
            let shutdown = CancellationToken::new();
            let sweeper = CacheSweeper::spawn(
                provider.cache().clone(),
                config.recipients.cache_sweep_interval_secs,
                shutdown.clone(),
            );
            let result = interactive(&provider).await;
            shutdown.cancel();
            sweeper.await?;
            result?;
        }
    }

    Ok(())
}

async fn run_lookup(provider: &RecipientProvider, lookup: Lookup) -> anyhow::Result<Recipients> {
    let users = match lookup {
        Lookup::Users {
            tenant,
            admins_only,
        } => provider.get_users(&tenant, admins_only).await?,
        Lookup::GroupUsers {
            tenant,
            group,
            admins_only,
        } => provider.get_group_users(&tenant, admins_only, group).await?,
    };
    Ok(users)
}

async fn interactive(provider: &RecipientProvider) -> anyhow::Result<()> {
    println!("Type 'help' for available commands, 'quit' to exit.\n");

    loop {
        print!("notifix> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }

        if input.eq_ignore_ascii_case("help") {
            print_help();
            continue;
        }

        if input.eq_ignore_ascii_case("invalidate") {
            provider.invalidate_all();
            println!("OK");
            continue;
        }

        if input.eq_ignore_ascii_case("stats") {
            println!("{}", provider.metrics().summary());
            println!("Cached lookups: {}", provider.cache().len());
            continue;
        }

        match parse_lookup(input) {
            Ok(lookup) => match run_lookup(provider, lookup).await {
                Ok(users) => print_users(&users),
                Err(e) => eprintln!("Error: {}", e),
            },
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

fn parse_lookup(input: &str) -> anyhow::Result<Lookup> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    match parts.first().map(|c| c.to_ascii_lowercase()).as_deref() {
        Some("users") => {
            let tenant = parts
                .get(1)
                .context("users requires a tenant: users <tenant> [admins]")?;
            Ok(Lookup::Users {
                tenant: tenant.to_string(),
                admins_only: parse_admins_flag(&parts[2..])?,
            })
        }
        Some("group-users") => {
            let (tenant, group) = match (parts.get(1), parts.get(2)) {
                (Some(tenant), Some(group)) => (tenant, group),
                _ => anyhow::bail!("group-users requires a tenant and a group: group-users <tenant> <group-uuid> [admins]"),
            };
            Ok(Lookup::GroupUsers {
                tenant: tenant.to_string(),
                group: group.parse().context("invalid group uuid")?,
                admins_only: parse_admins_flag(&parts[3..])?,
            })
        }
        _ => anyhow::bail!("Unknown command: {}. Type 'help' for available commands.", input),
    }
}

/// Optional trailing `admins` after the required arguments
fn parse_admins_flag(rest: &[&str]) -> anyhow::Result<bool> {
    match rest {
        [] => Ok(false),
        [flag] if flag.eq_ignore_ascii_case("admins") => Ok(true),
        _ => anyhow::bail!("Unexpected arguments: {}", rest.join(" ")),
    }
}

fn print_users(users: &Recipients) {
    for user in users.iter() {
        println!(
            "{}\t{}\t{}{}",
            user.username,
            user.email,
            if user.active { "active" } else { "inactive" },
            if user.org_admin { "\torg-admin" } else { "" }
        );
    }
    println!("({} users)", users.len());
}

fn print_help() {
    println!("Available commands:");
    println!("  users <tenant> [admins]                     - All users of a tenant");
    println!("  group-users <tenant> <group-uuid> [admins]  - Users of a group");
    println!("  invalidate                                  - Drop every cached lookup");
    println!("  stats                                       - Lookup and cache counters");
    println!("  help                                        - Show this help");
    println!("  quit                                        - Exit");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_users() {
        match parse_lookup("users acct").unwrap() {
            Lookup::Users {
                tenant,
                admins_only,
            } => {
                assert_eq!(tenant, "acct");
                assert!(!admins_only);
            }
            other => panic!("unexpected lookup: {:?}", other),
        }

        match parse_lookup("USERS acct Admins").unwrap() {
            Lookup::Users {
                tenant,
                admins_only,
            } => {
                assert_eq!(tenant, "acct");
                assert!(admins_only);
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn test_parse_tenant_named_admins() {
        match parse_lookup("users admins").unwrap() {
            Lookup::Users {
                tenant,
                admins_only,
            } => {
                assert_eq!(tenant, "admins");
                assert!(!admins_only);
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn test_parse_group_users() {
        let group = Uuid::new_v4();

        match parse_lookup(&format!("group-users acct {}", group)).unwrap() {
            Lookup::GroupUsers {
                tenant,
                group: parsed,
                admins_only,
            } => {
                assert_eq!(tenant, "acct");
                assert_eq!(parsed, group);
                assert!(!admins_only);
            }
            other => panic!("unexpected lookup: {:?}", other),
        }

        match parse_lookup(&format!("group-users admins {} admins", group)).unwrap() {
            Lookup::GroupUsers {
                tenant,
                admins_only,
                ..
            } => {
                assert_eq!(tenant, "admins");
                assert!(admins_only);
            }
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_lookup("users").is_err());
        assert!(parse_lookup("users acct everyone").is_err());
        assert!(parse_lookup("users acct admins extra").is_err());
        assert!(parse_lookup("group-users acct").is_err());
        assert!(parse_lookup("group-users acct not-a-uuid").is_err());
        assert!(parse_lookup("group-users acct admins").is_err());
        assert!(parse_lookup("groups acct").is_err());
    }
}
