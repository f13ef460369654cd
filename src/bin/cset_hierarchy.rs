//! Concept hierarchy CLI
//!
//! Loads a concept-set comparison payload, builds the hierarchy, applies the
//! requested toggles and prints the visible rows.
//!
//! Usage:
//!   cargo run --features cli --bin cset-hierarchy -- \
//!     --input graph.json \
//!     --expand 201826 --expand unlinked \
//!     --enable added
//!
//! Examples:
//!   # Rows and category table with a custom catalogue
//!   cargo run --features cli --bin cset-hierarchy -- \
//!     --input graph.json --config config/categories.yaml
//!
//!   # Machine-readable output
//!   cargo run --features cli --bin cset-hierarchy -- --input graph.json --json

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde_json::json;

use cset_hierarchy::{
    Action, CategoryKey, GraphContainer, GraphData, GraphStore, HierarchyConfig, NodeId,
    VisibleRow,
};

/// Concept hierarchy viewer
#[derive(Parser, Debug)]
#[command(name = "cset-hierarchy")]
#[command(about = "Project a concept DAG into collapsible hierarchy rows")]
struct Args {
    /// GraphData JSON file
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Category catalogue (YAML). Built-in catalogue when omitted.
    #[arg(long, short = 'c', env = "CSET_HIERARCHY_CONFIG")]
    config: Option<PathBuf>,

    /// Expand a node (concept id or "unlinked"); may be repeated
    #[arg(long, short = 'e')]
    expand: Vec<NodeId>,

    /// Toggle a category's rule on (e.g. "added", "zeroRecord"); may be repeated
    #[arg(long)]
    enable: Vec<String>,

    /// Output rows and categories as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => HierarchyConfig::load(path)?,
        None => HierarchyConfig::default(),
    };

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let data: GraphData = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    let mut store = GraphStore::new(config);
    let mut gc = store.dispatch(Action::Create(Box::new(data)))?;

    for category in &args.enable {
        gc = store.dispatch(Action::ToggleOption {
            category: CategoryKey::new(category.as_str()),
        })?;
    }
    for node_id in &args.expand {
        gc = store.dispatch(Action::ToggleNodeExpanded { node_id: *node_id })?;
    }

    if args.json {
        let out = json!({
            "visibleRows": gc.visible_rows(),
            "statsOptions": gc.stats_options(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_rows(gc.visible_rows());
        print_categories(&gc);
    }

    Ok(())
}

fn print_rows(rows: &[VisibleRow]) {
    for row in rows {
        let node = &row.node;
        let marker = if node.is_leaf() {
            " "
        } else if node.expanded {
            "-"
        } else {
            "+"
        };

        let mut line = format!(
            "{}{} {}",
            "  ".repeat(row.depth),
            marker,
            node.concept.concept_name
        );
        if !node.id.is_unlinked() {
            line.push_str(&format!(" {}", format!("[{}]", node.id).dimmed()));
        }
        if let Some(breadcrumb) = &row.breadcrumb {
            let trail: Vec<String> = breadcrumb.iter().map(NodeId::to_string).collect();
            line.push_str(&format!(" {}", format!("via {}", trail.join(" > ")).cyan()));
        }
        if node.descendant_count > 0 {
            line.push_str(&format!(
                " ({} below, drc {})",
                node.descendant_count, node.drc
            ));
        }
        println!("{}", line);
    }
}

fn print_categories(gc: &GraphContainer) {
    println!("\n{}", "Categories:".cyan().bold());
    for row in gc.stats_options() {
        let hidden = row
            .hidden_concept_cnt
            .map(|n| format!(", {} hidden", n))
            .unwrap_or_default();
        let rule = match (row.rule, row.enabled) {
            (Some(rule), Some(true)) => format!(" {}", format!("[{}: on]", rule).green()),
            (Some(rule), _) => format!(" {}", format!("[{}: off]", rule).dimmed()),
            _ => String::new(),
        };
        println!("  {:<28} {:>6}{}{}", row.name, row.value, hidden, rule);
    }
}
