use super::GlobalArgs;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use toolpad_appdom::{DiffOp, Node, NodeAttributes, PageAttributes, ParentProp};

#[derive(Args, Debug)]
pub struct NewPageArgs {
    /// Page name (also its directory name)
    pub name: String,

    /// Page title, defaults to the name
    #[arg(short, long)]
    pub title: Option<String>,
}

pub async fn new_page(args: NewPageArgs, global: &GlobalArgs) -> Result<()> {
    let project = global.open_for_edit("new-page").await?;
    let snapshot = project.load().await?;

    let title = args.title.unwrap_or_else(|| args.name.clone());
    let page = Node::create(&args.name, NodeAttributes::Page(PageAttributes::titled(title)));
    let op = DiffOp::add(page, snapshot.dom.root_id(), ParentProp::Pages);

    let result = project.apply_diff(&[op]).await;
    project.dispose().await;
    result?;

    let path = project.layout().page_file(&args.name);
    println!("  {} Created {}", "✓".green(), path.display());
    Ok(())
}
