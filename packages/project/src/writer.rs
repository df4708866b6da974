//! Writing an [`AppDom`] back to the project folder.

use crate::errors::{ProjectError, ProjectResult};
use crate::expand::collapse_page;
use crate::layout::ProjectLayout;
use crate::loader::{read_optional, read_optional_bytes};
use crate::schema::{page_to_string, theme_to_string};
use futures::future::try_join_all;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use toolpad_appdom::AppDom;
use tracing::{debug, info};

/// Write pages and theme of `dom`. Code components are left alone.
///
/// Page files are only removed for pages that were in `previous` and are gone
/// from `dom`. Directories the tree never knew about, such as pages skipped for
/// being invalid, stay on disk.
pub async fn write_dom(
    layout: &ProjectLayout,
    previous: Option<&AppDom>,
    dom: &AppDom,
) -> ProjectResult<()> {
    let mut writes: Vec<(PathBuf, String)> = Vec::new();
    let mut page_names = HashSet::new();

    for page in dom.pages() {
        let path = layout.page_file(&page.name);
        let spec = collapse_page(dom, page, &path)?;
        writes.push((path.clone(), page_to_string(&path, &spec)?));
        page_names.insert(page.name.clone());
    }

    let removed: Vec<String> = previous
        .map(|previous| previous.pages())
        .unwrap_or_default()
        .into_iter()
        .filter(|page| !page_names.contains(&page.name))
        .map(|page| page.name.clone())
        .collect();

    let theme_path = layout.theme_file();
    match dom.theme().and_then(|node| node.as_theme()) {
        Some(theme) => writes.push((theme_path.clone(), theme_to_string(&theme_path, theme)?)),
        None => remove_if_exists(&theme_path).await?,
    }

    let written = try_join_all(
        writes
            .iter()
            .map(|(path, text)| write_if_changed(path, text)),
    )
    .await?;
    debug!(
        files = writes.len(),
        written = written.iter().filter(|w| **w).count(),
        "Saved project files"
    );

    remove_pages(layout, &removed).await
}

/// Create `components/<name>.tsx` from the default template.
pub async fn write_component(layout: &ProjectLayout, name: &str) -> ProjectResult<PathBuf> {
    let path = layout.component_file(name);
    if fs::try_exists(&path).await? {
        return Err(ProjectError::ComponentExists(name.to_string()));
    }
    write_atomic(&path, &component_template(name)).await?;
    info!(component = name, path = %path.display(), "Created code component");
    Ok(path)
}

/// Make sure `toolpad/.gitignore` ignores the generated folder.
pub async fn ensure_gitignore(layout: &ProjectLayout) -> ProjectResult<()> {
    let path = layout.gitignore_file();
    let entry = layout.generated_dir_name();
    let existing = read_optional(&path).await?.unwrap_or_default();
    if existing.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }

    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(entry);
    content.push('\n');
    write_atomic(&path, &content).await
}

/// Returns whether the file was written.
async fn write_if_changed(path: &Path, text: &str) -> ProjectResult<bool> {
    if read_optional_bytes(path).await?.as_deref() == Some(text.as_bytes()) {
        return Ok(false);
    }
    write_atomic(path, text).await?;
    Ok(true)
}

/// Write through a temp file in the same directory, then rename over `path`.
pub(crate) async fn write_atomic(path: &Path, text: &str) -> ProjectResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(dir).await?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

    fs::write(&temp, text).await?;
    if let Err(e) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}

async fn remove_if_exists(path: &Path) -> ProjectResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn remove_pages(layout: &ProjectLayout, names: &[String]) -> ProjectResult<()> {
    for name in names {
        remove_if_exists(&layout.page_file(name)).await?;
        // Only succeeds once the directory is empty
        if fs::remove_dir(layout.pages_dir().join(name)).await.is_ok() {
            debug!(page = %name, "Removed page directory");
        }
    }
    Ok(())
}

fn component_template(name: &str) -> String {
    format!(
        r#"import * as React from 'react';
import {{ Typography }} from '@mui/material';
import {{ createComponent }} from '@toolpad/core';

export interface {name}Props {{
  msg: string;
}}

function {name}({{ msg }}: {name}Props) {{
  return <Typography>{{msg}}</Typography>;
}}

export default createComponent({name}, {{
  argTypes: {{
    msg: {{
      type: 'string',
      default: 'Hello world!',
    }},
  }},
}});
"#
    )
}
