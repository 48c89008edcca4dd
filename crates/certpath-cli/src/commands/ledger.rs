//! The `certpath earn`, `spend` and `resolve` commands.

use anyhow::Result;

use certpath_core::ledger::{Resolution, Transaction};

use super::Context;

pub async fn earn(
    ctx: &Context,
    amount: u64,
    category: &str,
    description: &str,
    pending: bool,
) -> Result<()> {
    let (_, session) = ctx.session().await?;
    let tx = session.earn(amount, category, description, pending).await?;
    print_transaction(&tx);
    print_balance(&session).await;
    Ok(())
}

pub async fn spend(ctx: &Context, amount: u64, category: &str, description: &str) -> Result<()> {
    let (_, session) = ctx.session().await?;
    let tx = session.spend(amount, category, description).await?;
    print_transaction(&tx);
    print_balance(&session).await;
    Ok(())
}

pub async fn resolve(ctx: &Context, transaction_id: &str, approve: bool) -> Result<()> {
    let resolution = if approve {
        Resolution::Approve
    } else {
        Resolution::Reject
    };
    let (_, session) = ctx.session().await?;
    let tx = session.resolve_pending(transaction_id, resolution).await?;
    print_transaction(&tx);
    print_balance(&session).await;
    Ok(())
}

fn print_transaction(tx: &Transaction) {
    println!(
        "{} {} XP ({}) id={}",
        tx.kind, tx.amount, tx.category, tx.id
    );
}

async fn print_balance(session: &certpath_core::Session) {
    let ledger = session.ledger().await;
    println!(
        "Balance: {} XP  Pending: {} XP  Lifetime: {} XP",
        ledger.balance, ledger.pending, ledger.lifetime_earned
    );
}
