//! The `certpath feedback` subcommands.

use anyhow::Result;
use comfy_table::{Cell, Table};

use certpath_store::{FeedbackFilter, FeedbackRecord, FeedbackStatus};

use super::Context;

pub async fn add(ctx: &Context, category: &str, message: &str) -> Result<()> {
    let config = ctx.config()?;
    let author = ctx.user_id(&config);
    let record = config
        .feedback_store()
        .add(&author, category, message)
        .await?;
    println!("Recorded feedback {}", record.id);
    Ok(())
}

pub async fn list(
    ctx: &Context,
    status: Option<String>,
    category: Option<String>,
    flagged: bool,
) -> Result<()> {
    let filter = FeedbackFilter {
        status: status.as_deref().map(str::parse).transpose()?,
        category,
        flagged: flagged.then_some(true),
    };
    let records = ctx.config()?.feedback_store().list(&filter).await?;

    if records.is_empty() {
        println!("No feedback found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "When", "Author", "Category", "Status", "Flag", "Message"]);
    for r in &records {
        table.add_row(vec![
            Cell::new(&r.id),
            Cell::new(r.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(&r.author),
            Cell::new(&r.category),
            Cell::new(&r.status),
            Cell::new(if r.flagged { "!" } else { "" }),
            Cell::new(&r.message),
        ]);
    }
    println!("{table}");
    println!("{} record(s).", records.len());
    Ok(())
}

pub async fn set_status(ctx: &Context, id: &str, status: &str) -> Result<()> {
    let status: FeedbackStatus = status.parse()?;
    let record = ctx.config()?.feedback_store().set_status(id, status).await?;
    print_record(&record);
    Ok(())
}

pub async fn flag(ctx: &Context, id: &str, flagged: bool) -> Result<()> {
    let record = ctx.config()?.feedback_store().set_flagged(id, flagged).await?;
    print_record(&record);
    Ok(())
}

pub async fn remove(ctx: &Context, id: &str) -> Result<()> {
    let record = ctx.config()?.feedback_store().remove(id).await?;
    println!("Removed feedback {}", record.id);
    Ok(())
}

fn print_record(r: &FeedbackRecord) {
    println!(
        "{} [{}]{} {}",
        r.id,
        r.status,
        if r.flagged { " flagged" } else { "" },
        r.message
    );
}
