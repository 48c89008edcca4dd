//! The `certpath status` command.

use anyhow::{Context as _, Result};
use comfy_table::{Cell, Table};

use super::Context;

pub async fn execute(ctx: &Context, history: usize, json: bool) -> Result<()> {
    let (_, session) = ctx.session().await?;

    if json {
        let snapshot = session.snapshot().await;
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("failed to serialize snapshot")?
        );
        return Ok(());
    }

    let modules = session.modules().await;
    let ledger = session.ledger().await;
    let tier = session.tier_status().await;

    println!("Learner: {}", session.user_id());
    if session.override_enabled().await {
        println!("Admin override: ON");
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Module", "Type", "Status", "XP"]);
    for (i, module) in modules.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format!("{} ({})", module.title, module.id)),
            Cell::new(&module.icon_type),
            if session.catalog().is_offerable(module) {
                Cell::new(&module.status)
            } else {
                Cell::new(format!("{} (blocked)", module.status))
            },
            Cell::new(module.xp_reward),
        ]);
    }
    println!("{table}");

    println!(
        "Balance: {} XP  Pending: {} XP  Lifetime: {} XP",
        ledger.balance, ledger.pending, ledger.lifetime_earned
    );
    match &tier.next {
        Some(next) => println!(
            "Tier: {} ({:.1}% to {}, {} XP to go)",
            tier.current.name, tier.progress_percent, next.name, tier.remaining
        ),
        None => println!("Tier: {} (top tier)", tier.current.name),
    }

    if history > 0 && !ledger.transactions.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Id", "When", "Type", "Amount", "Category", "Description"]);
        for tx in ledger.recent().take(history) {
            table.add_row(vec![
                Cell::new(&tx.id),
                Cell::new(tx.timestamp.format("%Y-%m-%d %H:%M")),
                Cell::new(&tx.kind),
                Cell::new(tx.amount),
                Cell::new(&tx.category),
                Cell::new(&tx.description),
            ]);
        }
        println!("\nRecent transactions:\n{table}");
    }

    Ok(())
}
