use super::GlobalArgs;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct NewComponentArgs {
    /// Component name (also its file name)
    pub name: String,
}

pub async fn new_component(args: NewComponentArgs, global: &GlobalArgs) -> Result<()> {
    let project = global.open_for_edit("new-component").await?;
    let result = project.create_component(&args.name).await;
    project.dispose().await;
    let snapshot = result?;

    let path = project.layout().component_file(&args.name);
    println!("  {} Created {}", "✓".green(), path.display());
    println!(
        "   {} code components in project",
        snapshot.dom.code_components().len()
    );
    Ok(())
}
