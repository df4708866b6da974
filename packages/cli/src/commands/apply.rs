use super::GlobalArgs;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use toolpad_appdom::DiffOp;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// JSON file holding an array of diff operations
    pub diff: PathBuf,
}

pub async fn apply(args: ApplyArgs, global: &GlobalArgs) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.diff)
        .await
        .with_context(|| format!("Cannot read {}", args.diff.display()))?;
    let ops: Vec<DiffOp> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid diff in {}", args.diff.display()))?;

    let project = global.open_for_edit("apply").await?;
    let before = project.load().await?;
    let result = project.apply_diff(&ops).await;
    project.dispose().await;
    let after = result?;

    println!(
        "  {} Applied {} operations ({} → {} nodes)",
        "✓".green(),
        ops.len(),
        before.dom.len(),
        after.dom.len()
    );
    Ok(())
}
