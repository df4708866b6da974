use super::GlobalArgs;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use toolpad_appdom::{AppDom, Node, NodeAttributes};
use toolpad_project::{missing_env_vars, DotenvEnvironment, ProjectMode};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Print the tree as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn inspect(args: InspectArgs, global: &GlobalArgs) -> Result<()> {
    let project = global.open(ProjectMode::ReadOnly).await?;
    let snapshot = project.load().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot.dom)?);
        return Ok(());
    }

    println!("🔍 {} {}", "Project".green().bold(), project.root().display());
    println!("   Fingerprint: {}", snapshot.fingerprint);
    println!();

    let mut lines = Vec::new();
    render_node(&snapshot.dom, snapshot.dom.root(), "", 0, &mut lines);
    for line in lines {
        println!("{line}");
    }

    let env = DotenvEnvironment::load(&project.layout().env_file());
    let missing = missing_env_vars(&snapshot.dom, &env);
    if !missing.is_empty() {
        println!();
        for name in missing {
            println!("{} Missing environment variable {}", "⚠️".yellow(), name.bright_white());
        }
    }
    Ok(())
}

fn label(node: &Node) -> String {
    match &node.attributes {
        NodeAttributes::App => node.name.bold().to_string(),
        NodeAttributes::Page(page) => format!("{} {} ({:?})", "page".cyan(), node.name.bold(), page.title),
        NodeAttributes::Element(element) => {
            format!("{} {}", element.component.blue(), node.name)
        }
        NodeAttributes::Query(query) => {
            format!("{} {} [{}]", "query".magenta(), node.name, query.query.kind())
        }
        NodeAttributes::Theme(_) => "theme".yellow().to_string(),
        NodeAttributes::CodeComponent(component) => format!(
            "{} {} ({} bytes)",
            "component".green(),
            node.name,
            component.code.len()
        ),
    }
}

/// One line per node, slots shown as `prop:` between a parent and its children.
fn render_node(dom: &AppDom, node: &Node, slot: &str, depth: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let slot = if slot.is_empty() {
        String::new()
    } else {
        format!("{}: ", slot.dimmed())
    };
    out.push(format!("{indent}{slot}{}", label(node)));

    for (prop, children) in dom.child_nodes(&node.id) {
        for child in children {
            render_node(dom, child, prop.as_str(), depth + 1, out);
        }
    }
}
