//! The `certpath interact`, `claim` and `override` commands.

use anyhow::Result;

use certpath_core::pathway::CompletionOutcome;

use super::Context;

pub async fn interact(ctx: &Context, module_id: &str) -> Result<()> {
    let (_, session) = ctx.session().await?;
    let interaction = session.attempt_interact(module_id).await?;

    if interaction.blocked {
        println!("{module_id} is unavailable (catalog error; run `certpath validate`).");
    } else if !interaction.allowed {
        println!("{module_id} is locked.");
    } else if interaction.via_override {
        println!("{module_id} is open (admin override).");
    } else {
        println!("{module_id} is open ({}).", interaction.status);
    }
    Ok(())
}

pub async fn claim(ctx: &Context, module_id: &str) -> Result<()> {
    let (_, session) = ctx.session().await?;
    let outcome = session.claim_module(module_id).await?;
    print_completion(&outcome);
    Ok(())
}

pub async fn set_override(ctx: &Context, enabled: bool) -> Result<()> {
    let (_, session) = ctx.session().await?;
    session.toggle_override(enabled).await?;
    println!(
        "Admin override is {} for {}.",
        if enabled { "on" } else { "off" },
        session.user_id()
    );
    Ok(())
}

pub(crate) fn print_completion(outcome: &CompletionOutcome) {
    match outcome {
        CompletionOutcome::AlreadyCompleted { module_id } => {
            println!("{module_id} was already completed; nothing changed.")
        }
        CompletionOutcome::Completed { module_id, .. } => {
            println!("Module {module_id} complete.")
        }
    }
}
