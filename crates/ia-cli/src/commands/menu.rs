//! Interactive numbered menu.
//!
//! Each selection triggers one aggregation pass. The menu loops until the
//! user exits or stdin closes.

use anyhow::Result;
use colored::Colorize;
use ia_core::{InventoryPipeline, ResourceKind};
use ia_export::Exporter;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::run::{print_outcome, run_selection, Selection};
use crate::OutputFormat;

/// A parsed menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    Run(Selection),
    /// Group lookup; the name is asked for separately.
    GroupLookup,
    Exit,
}

const ALL_ENTRY: usize = ResourceKind::ALL.len() + 1;
const GRAPH_ENTRY: usize = ResourceKind::ALL.len() + 2;
const GROUP_ENTRY: usize = ResourceKind::ALL.len() + 3;

/// Parses one line of menu input. Numbers follow the printed menu;
/// `q`/`quit`/`exit`/`0` leave.
pub fn parse_choice(input: &str) -> Option<MenuChoice> {
    let input = input.trim().to_lowercase();
    if matches!(input.as_str(), "0" | "q" | "quit" | "exit") {
        return Some(MenuChoice::Exit);
    }

    let number: usize = input.parse().ok()?;
    match number {
        n if (1..=ResourceKind::ALL.len()).contains(&n) => {
            Some(MenuChoice::Run(Selection::Kind(ResourceKind::ALL[n - 1])))
        }
        ALL_ENTRY => Some(MenuChoice::Run(Selection::All)),
        GRAPH_ENTRY => Some(MenuChoice::Run(Selection::Graph)),
        GROUP_ENTRY => Some(MenuChoice::GroupLookup),
        _ => None,
    }
}

fn print_menu() {
    println!();
    println!("{}", "Assignment Inventory".bold());
    println!("────────────────────");
    for (index, kind) in ResourceKind::ALL.iter().enumerate() {
        println!("  {:>2}. {}", index + 1, kind.description());
    }
    println!("  {:>2}. All assignments", ALL_ENTRY);
    println!("  {:>2}. Build assignment graph", GRAPH_ENTRY);
    println!("  {:>2}. Look up a group", GROUP_ENTRY);
    println!("  {:>2}. Exit", 0);
}

fn prompt(text: &str) {
    print!("{} ", text.cyan());
    let _ = std::io::stdout().flush();
}

/// Runs the menu, reading choices from `input`.
pub async fn run_menu<R>(
    input: R,
    pipeline: &InventoryPipeline,
    exporter: &Exporter,
    format: OutputFormat,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        print_menu();
        prompt("Select an option:");

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let selection = match parse_choice(&line) {
            Some(MenuChoice::Exit) => break,
            Some(MenuChoice::Run(selection)) => selection,
            Some(MenuChoice::GroupLookup) => {
                prompt("Group name:");
                match lines.next_line().await? {
                    Some(name) if !name.trim().is_empty() => {
                        Selection::Group(name.trim().to_string())
                    }
                    Some(_) => {
                        println!("{}", "No group name given.".yellow());
                        continue;
                    }
                    None => break,
                }
            }
            None => {
                println!("{} '{}'", "Invalid option:".red(), line.trim());
                continue;
            }
        };

        // A failed export is reported and the menu stays up.
        match run_selection(pipeline, exporter, &selection).await {
            Ok(outcome) => print_outcome(&outcome, format)?,
            Err(e) => println!("{}: {:#}", "Export failed".red().bold(), e),
        }
    }

    Ok(())
}
