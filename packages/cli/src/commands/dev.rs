use super::GlobalArgs;
use anyhow::Result;
use chrono::Local;
use clap::Args;
use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;
use toolpad_project::ProjectEvent;
use tracing::warn;

#[derive(Args, Debug)]
pub struct DevArgs {
    /// Only print events, no startup summary
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn dev(args: DevArgs, global: &GlobalArgs) -> Result<()> {
    let project = global.open_for_edit("dev").await?;
    let mut events = project.subscribe();
    let snapshot = project.load().await?;

    if !args.quiet {
        println!("🚀 {} {}", "Watching".green().bold(), project.root().display());
        println!(
            "   {} pages, {} code components, {} nodes",
            snapshot.dom.pages().len(),
            snapshot.dom.code_components().len(),
            snapshot.dom.len()
        );
        println!("   Press Ctrl-C to stop");
        println!();
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dropped project events"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    project.dispose().await;
    println!();
    println!("👋 {}", "Stopped".bright_white());
    Ok(())
}

fn print_event(event: &ProjectEvent) {
    let time = Local::now().format("%H:%M:%S").to_string();
    print!("{} ", time.dimmed());
    match event {
        ProjectEvent::Change { fingerprint } => {
            println!("{} tree updated ({fingerprint})", "●".blue());
        }
        ProjectEvent::ExternalChange { .. } => {
            println!("{} reloaded from disk", "↻".cyan());
        }
        ProjectEvent::ComponentsListChanged => {
            println!("{} code components changed", "✚".green());
        }
        ProjectEvent::QueriesInvalidated => {
            println!("{} queries invalidated", "↯".yellow());
        }
    }
}
