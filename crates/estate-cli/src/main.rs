use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use estate_core::{compile, registry, FilterRequest};
use estate_storage::{snapshot, InMemoryStore, ListingStore, Page, DEFAULT_PAGE_SIZE};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "estate")]
#[command(about = "Listing filter compiler CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the plan and diagnostics compiled from a filter file
    Compile {
        #[arg(long)]
        group: String,
        /// Search route the form was submitted from, e.g. /rent/search
        #[arg(long)]
        route: Option<String>,
        filter: PathBuf,
    },
    /// Run a filter against a listing snapshot
    Search {
        #[arg(long)]
        group: String,
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        route: Option<String>,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        filter: PathBuf,
    },
    /// Print the property type groups and categorical fields
    Taxonomy,
}

fn read_filter(path: &Path, route: Option<String>) -> Result<FilterRequest> {
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut req: FilterRequest =
        serde_json::from_slice(&raw).with_context(|| format!("decoding {}", path.display()))?;
    if route.is_some() {
        req.base_route = route;
    }
    Ok(req)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Compile {
            group,
            route,
            filter,
        } => {
            let req = read_filter(&filter, route)?;
            let plan = compile(&group, &req);
            print_json(&serde_json::json!({
                "group": group,
                "fingerprint": plan.fingerprint(),
                "plan": plan,
            }))?;
        }
        Cmd::Search {
            group,
            snapshot,
            route,
            limit,
            offset,
            filter,
        } => {
            let req = read_filter(&filter, route)?;
            let listings = snapshot::read_snapshot(&snapshot)
                .with_context(|| format!("loading {}", snapshot.display()))?;
            let store = InMemoryStore::new();
            store.load(listings);
            let plan = compile(&group, &req);
            let rt = tokio::runtime::Builder::new_current_thread().build()?;
            let found = rt.block_on(store.search(&plan, Page { offset, limit }))?;
            print_json(&serde_json::json!({
                "total": found.total,
                "items": found.items,
                "plan_fingerprint": plan.fingerprint(),
            }))?;
        }
        Cmd::Taxonomy => print_json(&registry())?,
    }
    Ok(())
}
