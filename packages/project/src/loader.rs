//! Reading the project folder into an [`AppDom`].

use crate::errors::{FileError, ProjectResult};
use crate::expand::{merge_code_components, merge_page, merge_theme};
use crate::layout::ProjectLayout;
use crate::schema::{parse_page_file, parse_theme_file};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use toolpad_appdom::AppDom;
use tracing::{debug, warn};

/// Build the tree from everything under `toolpad/`.
///
/// Invalid pages and an invalid theme are logged and left out. An unknown
/// query, body or response kind fails the whole load.
pub async fn load_dom(layout: &ProjectLayout) -> ProjectResult<AppDom> {
    let mut dom = AppDom::new();

    for name in list_page_dirs(&layout.pages_dir()).await? {
        let path = layout.page_file(&name);
        let Some(bytes) = read_optional_bytes(&path).await? else {
            debug!(page = %name, "Page directory without page file");
            continue;
        };

        let file = match decode(&path, bytes).and_then(|text| parse_page_file(&path, &text)) {
            Ok(file) => file,
            Err(e) => {
                skip_invalid(e, "page", &name)?;
                continue;
            }
        };

        match merge_page(&dom, &name, file) {
            Ok(next) => dom = next,
            Err(e) => warn!(page = %name, error = %e, "Skipping page"),
        }
    }

    let theme_path = layout.theme_file();
    if let Some(bytes) = read_optional_bytes(&theme_path).await? {
        match decode(&theme_path, bytes).and_then(|text| parse_theme_file(&theme_path, &text)) {
            Ok(theme) => dom = merge_theme(&dom, theme)?,
            Err(e) => skip_invalid(e, "theme", "theme")?,
        }
    }

    let components = read_components(&layout.components_dir()).await?;
    dom = merge_code_components(&dom, &components)?;

    debug!(
        pages = dom.pages().len(),
        components = components.len(),
        nodes = dom.len(),
        "Loaded project"
    );
    Ok(dom)
}

/// Code component sources keyed by file stem.
pub async fn read_components(dir: &Path) -> ProjectResult<BTreeMap<String, String>> {
    let mut components = BTreeMap::new();
    for (file_name, path) in list_entries(dir, false).await? {
        let Some(stem) = Path::new(&file_name).file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let stem = stem.to_string();
        let Some(bytes) = read_optional_bytes(&path).await? else {
            continue;
        };
        let code = match decode(&path, bytes) {
            Ok(code) => code,
            Err(e) => {
                warn!(component = %stem, error = %e, "Skipping unreadable code component");
                continue;
            }
        };
        if components.insert(stem.clone(), code).is_some() {
            warn!(component = %stem, file = %file_name, "Duplicate code component name");
        }
    }
    Ok(components)
}

fn decode(path: &Path, bytes: Vec<u8>) -> Result<String, FileError> {
    String::from_utf8(bytes).map_err(|e| FileError::invalid(path, "document", e))
}

fn skip_invalid(error: FileError, unit: &str, name: &str) -> ProjectResult<()> {
    if error.is_fatal() {
        return Err(error.into());
    }
    warn!(unit, name, error = %error, "Skipping invalid file");
    Ok(())
}

async fn list_page_dirs(dir: &Path) -> ProjectResult<Vec<String>> {
    Ok(list_entries(dir, true)
        .await?
        .into_iter()
        .map(|(name, _)| name)
        .collect())
}

/// Non-hidden directory entries (directories or files), sorted by name.
async fn list_entries(dir: &Path, dirs: bool) -> ProjectResult<Vec<(String, std::path::PathBuf)>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut out = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type().await?;
        let wanted = if dirs {
            file_type.is_dir()
        } else {
            file_type.is_file()
        };
        if wanted {
            out.push((name, entry.path()));
        }
    }
    out.sort();
    Ok(out)
}

/// File contents, or `None` if the file doesn't exist (any more).
pub(crate) async fn read_optional(path: &Path) -> ProjectResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn read_optional_bytes(path: &Path) -> ProjectResult<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use std::path::PathBuf;

    fn write(root: &Path, relative: &str, text: &str) {
        let path: PathBuf = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[tokio::test]
    async fn test_empty_project() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), &ProjectConfig::default());
        let dom = load_dom(&layout).await.unwrap();
        assert_eq!(dom.len(), 1);
    }

    #[tokio::test]
    async fn test_pages_sorted_and_components_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "toolpad/pages/zeta/page.yml", "apiVersion: v1\nkind: page\nspec: {}\n");
        write(root, "toolpad/pages/alpha/page.yml", "apiVersion: v1\nkind: page\nspec: {}\n");
        write(root, "toolpad/pages/empty/notes.txt", "no page here");
        write(root, "toolpad/components/Chart.tsx", "export default Chart;");
        write(root, "toolpad/components/.hidden.tsx", "ignored");

        let layout = ProjectLayout::new(root, &ProjectConfig::default());
        let dom = load_dom(&layout).await.unwrap();

        let pages: Vec<_> = dom.pages().iter().map(|p| p.name.clone()).collect();
        assert_eq!(pages, vec!["alpha", "zeta"]);

        let components = dom.code_components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].name, "Chart");
        assert_eq!(
            components[0].as_code_component().unwrap().code,
            "export default Chart;"
        );
    }

    #[tokio::test]
    async fn test_invalid_theme_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "toolpad/theme.yml", "apiVersion: v1\nkind: page\nspec: {}\n");

        let layout = ProjectLayout::new(dir.path(), &ProjectConfig::default());
        let dom = load_dom(&layout).await.unwrap();
        assert!(dom.theme().is_none());
    }

    #[tokio::test]
    async fn test_non_utf8_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "toolpad/pages/home/page.yml", "apiVersion: v1\nkind: page\nspec: {}\n");
        write(root, "toolpad/components/Chart.tsx", "export default Chart;");
        for relative in [
            "toolpad/pages/broken/page.yml",
            "toolpad/theme.yml",
            "toolpad/components/Garbled.tsx",
        ] {
            let path = root.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, [0xff, 0xfe]).unwrap();
        }

        let layout = ProjectLayout::new(root, &ProjectConfig::default());
        let dom = load_dom(&layout).await.unwrap();

        let pages: Vec<_> = dom.pages().iter().map(|p| p.name.clone()).collect();
        assert_eq!(pages, vec!["home"]);
        assert!(dom.theme().is_none());
        let components: Vec<_> = dom.code_components().iter().map(|c| c.name.clone()).collect();
        assert_eq!(components, vec!["Chart"]);
    }
}
