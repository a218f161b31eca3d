use std::path::PathBuf;

use anyhow::Context;
use arkcore::catalog::{items_of, Rarity};
use arkcore::draw::draw;
use arkcore::UserId;
use arkstore::config::StoreConfig;
use arkstore::Store;
use serde::Serialize;

fn usage_and_exit() -> ! {
    eprintln!(
        "arkctl\n\n\
USAGE:\n\
  arkctl [--data-dir DIR] [--database-url URL] <command> [args...]\n\n\
ENV:\n\
  DATABASE_URL  postgres URL; the embedded store is used when unset\n\
  ARK_DATA_DIR  directory for the embedded store file (default: data)\n\
  ARK_DB_POOL   connection pool size (default: 5)\n\n\
COMMANDS:\n\
  init-schema\n\
  catalog\n\
  rescue    [--external-id N] [--handle NAME] [--first F] [--last L]\n\
  inventory [--external-id N] [--handle NAME]\n\n\
rescue and inventory need at least one of --external-id / --handle.\n"
    );
    std::process::exit(2);
}

fn take_flag_value(rest: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < rest.len() {
        if rest[i] == flag {
            return rest.get(i + 1).cloned();
        }
        i += 1;
    }
    None
}

fn identity_flags(rest: &[String]) -> (Option<i64>, Option<String>) {
    let external_id = take_flag_value(rest, "--external-id")
        .map(|v| v.parse::<i64>().unwrap_or_else(|_| usage_and_exit()));
    let handle = take_flag_value(rest, "--handle");
    if external_id.is_none() && handle.is_none() {
        usage_and_exit();
    }
    (external_id, handle)
}

#[derive(Debug, Serialize)]
struct RescueOut {
    user_id: UserId,
    item: &'static str,
    symbol: &'static str,
    rarity: Rarity,
    count: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let mut cfg = StoreConfig::from_env();

    let mut args = std::env::args().skip(1);
    let mut cmd: Option<String> = None;
    let mut rest: Vec<String> = Vec::new();

    while let Some(a) = args.next() {
        if a == "--data-dir" {
            let v = args.next().unwrap_or_else(|| usage_and_exit());
            cfg.data_dir = PathBuf::from(v);
            continue;
        }
        if a == "--database-url" {
            cfg.database_url = Some(args.next().unwrap_or_else(|| usage_and_exit()));
            continue;
        }
        cmd = Some(a);
        rest.extend(args);
        break;
    }

    let Some(cmd) = cmd else { usage_and_exit() };

    match cmd.as_str() {
        "init-schema" => {
            if !rest.is_empty() {
                usage_and_exit();
            }
            // Opening the store runs the DDL.
            let _store = Store::open(&cfg).await.context("open capture store")?;
            match cfg.database_url.as_deref() {
                Some(_) => println!("schema ready (postgres)"),
                None => println!("schema ready: {}", cfg.sqlite_path().display()),
            }
        }
        "catalog" => {
            if !rest.is_empty() {
                usage_and_exit();
            }
            for r in Rarity::ALL {
                println!("{}:", r.label());
                for d in items_of(r) {
                    println!("  {} {} (weight {})", d.symbol, d.name, d.weight);
                }
            }
        }
        "rescue" => {
            let (external_id, handle) = identity_flags(&rest);
            let first = take_flag_value(&rest, "--first");
            let last = take_flag_value(&rest, "--last");
            let store = Store::open(&cfg).await.context("open capture store")?;
            let user = store
                .resolve_or_create(
                    external_id,
                    handle.as_deref(),
                    first.as_deref(),
                    last.as_deref(),
                )
                .await?;
            let item = draw();
            let count = store.record_capture(user, item).await?;
            let out = RescueOut {
                user_id: user,
                item: item.name,
                symbol: item.symbol,
                rarity: item.rarity,
                count,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        "inventory" => {
            let (external_id, handle) = identity_flags(&rest);
            let store = Store::open(&cfg).await.context("open capture store")?;
            let rows = store.inventory(external_id, handle.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => usage_and_exit(),
    }

    Ok(())
}
