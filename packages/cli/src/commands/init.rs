use super::GlobalArgs;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use toolpad_project::config::DEFAULT_CONFIG_NAME;
use toolpad_project::ProjectConfig;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub async fn init(args: InitArgs, global: &GlobalArgs) -> Result<()> {
    let root = global.root()?;
    let config_path = root.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Toolpad project...".bright_blue().bold());

    fs::create_dir_all(&root)?;
    let config_json = serde_json::to_string_pretty(&ProjectConfig::default())?;
    fs::write(&config_path, config_json)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    // Opening in edit mode lays out toolpad/ and its .gitignore
    let project = global.open_for_edit("init").await?;
    project.dispose().await;
    println!("  {} Created toolpad/", "✓".green());

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: toolpad new-page home");
    println!("  2. Run: toolpad dev");

    Ok(())
}
