//! The `certpath watch` command.

use std::io::Write;

use anyhow::Result;

use certpath_core::playback::{spawn_playback, PlaybackEnd};

use super::progress::print_completion;
use super::Context;

pub async fn execute(ctx: &Context, module_id: &str) -> Result<()> {
    let (config, session) = ctx.session().await?;
    session.start_video(module_id).await?;
    println!("Watching {module_id} (Ctrl-C to stop)...");

    let period = config.playback.period();
    let handle = spawn_playback(session.clone(), module_id, config.playback.clone());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let end = loop {
        let interrupted = tokio::select! {
            _ = &mut ctrl_c => true,
            _ = tokio::time::sleep(period) => false,
        };
        if interrupted {
            break handle.cancel().await;
        }
        if handle.is_finished() {
            break handle.join().await;
        }
        if let Ok(progress) = session.video_progress().await {
            print!("\r  {:>3}%", progress.percent);
            let _ = std::io::stdout().flush();
        }
    };
    println!();

    match end {
        PlaybackEnd::Stopped {
            percent,
            completion: Some(completion),
        } => {
            println!("  {percent}% watched.");
            print_completion(&completion);
        }
        PlaybackEnd::Stopped { percent: 100, .. } => {
            println!("  100% watched.");
            println!("  {module_id} is still locked; nothing was recorded.");
        }
        PlaybackEnd::Stopped { percent, .. } => {
            println!("  Stopped at {percent}%.");
        }
        PlaybackEnd::Cancelled => {
            println!("  Stopped before the end; the module is not complete.");
        }
        PlaybackEnd::Failed(e) => return Err(e.into()),
    }

    session.close_video().await;
    Ok(())
}
