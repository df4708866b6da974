/// Integration tests for the project folder ⇄ tree pipeline
/// Files on disk → load → diff/save → files on disk → reload
use std::path::Path;
use std::time::Duration;
use toolpad_appdom::{
    BindableValue, DiffOp, ElementAttributes, LocalQuery, Node, NodeAttributes, NodeId, ParentProp,
    Position, QueryAttributes, QueryConfig, RestBody, ThemeAttributes,
};
use toolpad_project::{
    FileError, FingerprintStrategy, Project, ProjectConfig, ProjectError, ProjectEvent, ProjectMode,
    ProjectOptions,
};

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn options(mode: ProjectMode) -> ProjectOptions {
    ProjectOptions {
        mode,
        config: Some(ProjectConfig {
            fingerprint: FingerprintStrategy::Content,
            ..ProjectConfig::default()
        }),
    }
}

const HOME_PAGE: &str = "apiVersion: v1\nkind: page\nspec:\n  id: home_id\n  title: Home\n";

const REST_PAGE: &str = r#"apiVersion: v1
kind: page
spec:
  id: api_page
  title: Api
  queries:
    - name: submit
      query:
        kind: rest
        url: https://example.com/submit
        method: POST
        body:
          kind: urlEncoded
          content:
            - [a, "1"]
"#;

#[tokio::test]
async fn test_integration_single_page() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);

    let project = Project::open(dir.path(), options(ProjectMode::ReadOnly)).await.unwrap();
    let dom = project.load().await.unwrap().dom;

    assert_eq!(dom.len(), 2);
    let pages = dom.pages();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].id.as_str(), "home_id");
    assert_eq!(pages[0].name, "home");
    assert_eq!(pages[0].as_page().unwrap().title, "Home");
}

#[tokio::test]
async fn test_integration_url_encoded_body_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/api/page.yml", REST_PAGE);

    let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
    let loaded = project.load().await.unwrap().dom;
    project.save(&loaded).await.unwrap();

    let reloaded = project.reload().await.unwrap().dom;
    let page = reloaded.page_by_name("api").unwrap();
    let query = &reloaded.children(&page.id, &ParentProp::Queries)[0];
    let QueryConfig::Rest(rest) = &query.as_query().unwrap().query else {
        panic!("expected rest query");
    };
    assert_eq!(rest.method, "POST");
    assert_eq!(
        rest.body,
        Some(RestBody::UrlEncoded {
            content: vec![("a".to_string(), BindableValue::string("1"))]
        })
    );
    project.dispose().await;
}

#[tokio::test]
async fn test_integration_save_without_theme_deletes_theme_file() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "toolpad/theme.yml",
        "apiVersion: v1\nkind: theme\nspec:\n  palette:\n    mode: dark\n",
    );

    let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
    let snapshot = project.load().await.unwrap();
    let theme = snapshot.dom.theme().unwrap().clone();
    assert_eq!(
        theme.as_theme().unwrap().options["palette"]["mode"],
        serde_json::json!("dark")
    );

    project.apply_diff(&[DiffOp::remove(&theme.id)]).await.unwrap();
    assert!(!dir.path().join("toolpad/theme.yml").exists());
    project.dispose().await;
}

#[tokio::test]
async fn test_integration_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);

    let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
    let dom = project.load().await.unwrap().dom;
    let page_id = dom.page_by_name("home").unwrap().id.clone();

    let text = Node::create(
        "greeting",
        NodeAttributes::Element(
            ElementAttributes::of("Text")
                .with_prop("value", BindableValue::expression("`Hello ${name}`")),
        ),
    );
    let button = Node::create(
        "submit",
        NodeAttributes::Element(ElementAttributes::of("Button")),
    );
    let theme = Node::create("Theme", NodeAttributes::Theme(ThemeAttributes::default()));
    let root = dom.root_id().clone();
    let saved = project
        .apply_diff(&[
            DiffOp::add(text, &page_id, ParentProp::Children),
            DiffOp::add(button, &page_id, ParentProp::Children),
            DiffOp::add(theme, &root, ParentProp::Themes),
        ])
        .await
        .unwrap()
        .dom;

    let reloaded = project.reload().await.unwrap().dom;
    assert_eq!(reloaded.len(), saved.len());
    let names: Vec<_> = reloaded
        .children(&page_id, &ParentProp::Children)
        .iter()
        .map(|node| node.name.clone())
        .collect();
    assert_eq!(names, vec!["greeting", "submit"]);
    let greeting = reloaded.children(&page_id, &ParentProp::Children)[0];
    assert_eq!(
        greeting.as_element().unwrap().props["value"],
        BindableValue::expression("`Hello ${name}`")
    );
    assert!(reloaded.theme().is_some());
    project.dispose().await;
}

fn element(name: &str, component: &str) -> Node {
    Node::create(name, NodeAttributes::Element(ElementAttributes::of(component)))
}

#[tokio::test]
async fn test_integration_round_trip_keeps_sibling_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);

    let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
    let page_id = project.load().await.unwrap().dom.page_by_name("home").unwrap().id.clone();

    let a = element("a", "Text");
    let a_id = a.id.clone();
    let list = element("list", "List");
    let list_id = list.id.clone();
    let row2 = element("row2", "Text");
    let row2_id = row2.id.clone();
    let query = Node::create(
        "items",
        NodeAttributes::Query(QueryAttributes::new(QueryConfig::Local(LocalQuery {
            function: "getItems".to_string(),
        }))),
    );
    let add = |node: Node, parent_id: &NodeId, parent_prop: ParentProp, position: Position| {
        DiffOp::Add {
            node,
            parent_id: parent_id.clone(),
            parent_prop,
            position,
        }
    };

    // Creation order a, b, c, list; sibling order b, c, a, list
    project
        .apply_diff(&[
            add(a, &page_id, ParentProp::Children, Position::Last),
            add(element("b", "Button"), &page_id, ParentProp::Children, Position::First),
            add(element("c", "Text"), &page_id, ParentProp::Children, Position::Before(a_id.clone())),
            add(list, &page_id, ParentProp::Children, Position::Last),
            add(row2, &list_id, ParentProp::template("renderItem"), Position::Last),
            add(
                element("row1", "Text"),
                &list_id,
                ParentProp::template("renderItem"),
                Position::Before(row2_id),
            ),
            add(query, &page_id, ParentProp::Queries, Position::Last),
        ])
        .await
        .unwrap();

    let dom = project.reload().await.unwrap().dom;
    let names = |parent: &NodeId, prop: &ParentProp| -> Vec<String> {
        dom.children(parent, prop).iter().map(|node| node.name.clone()).collect()
    };
    assert_eq!(names(&page_id, &ParentProp::Children), vec!["b", "c", "a", "list"]);

    let reloaded_list = dom.children(&page_id, &ParentProp::Children)[3].id.clone();
    assert_eq!(
        names(&reloaded_list, &ParentProp::template("renderItem")),
        vec!["row1", "row2"]
    );
    assert!(names(&reloaded_list, &ParentProp::Children).is_empty());

    let queries = dom.children(&page_id, &ParentProp::Queries);
    assert_eq!(queries.len(), 1);
    assert_eq!(
        queries[0].as_query().unwrap().query,
        QueryConfig::Local(LocalQuery {
            function: "getItems".to_string()
        })
    );
    project.dispose().await;
}

#[tokio::test]
async fn test_integration_save_keeps_invalid_page_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);
    write(dir.path(), "toolpad/pages/draft/page.yml", "spec: [1, 2]\n");

    let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
    let snapshot = project.load().await.unwrap();
    assert_eq!(snapshot.dom.pages().len(), 1);
    project.save(&snapshot.dom).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("toolpad/pages/draft/page.yml")).unwrap(),
        "spec: [1, 2]\n"
    );
    project.dispose().await;
}

#[tokio::test]
async fn test_integration_removed_page_is_deleted_on_save() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);

    let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
    let dom = project.load().await.unwrap().dom;
    let page_id = dom.page_by_name("home").unwrap().id.clone();
    project.apply_diff(&[DiffOp::remove(&page_id)]).await.unwrap();

    assert!(!dir.path().join("toolpad/pages/home").exists());
    project.dispose().await;
}

#[tokio::test]
async fn test_integration_back_to_back_saves() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);
    let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
    let page_id = project.load().await.unwrap().dom.page_by_name("home").unwrap().id.clone();

    let first = Node::create("first", NodeAttributes::Element(ElementAttributes::of("Text")));
    let second = Node::create("second", NodeAttributes::Element(ElementAttributes::of("Text")));
    let first_ops = [DiffOp::add(first, &page_id, ParentProp::Children)];
    let second_ops = [DiffOp::add(second, &page_id, ParentProp::Children)];
    let (a, b) = tokio::join!(
        project.apply_diff(&first_ops),
        project.apply_diff(&second_ops),
    );
    a.unwrap();
    b.unwrap();

    let dom = project.reload().await.unwrap().dom;
    assert_eq!(dom.children(&page_id, &ParentProp::Children).len(), 2);
    project.dispose().await;
}

#[tokio::test]
async fn test_integration_failed_diff_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);
    let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
    let before = project.load().await.unwrap();
    let page_id = before.dom.page_by_name("home").unwrap().id.clone();

    let element = Node::create("ok", NodeAttributes::Element(ElementAttributes::of("Text")));
    let err = project
        .apply_diff(&[
            DiffOp::add(element, &page_id, ParentProp::Children),
            DiffOp::remove(&"missing".into()),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, ProjectError::Dom(_)));
    assert_eq!(project.load().await.unwrap(), before);
    project.dispose().await;
}

#[tokio::test]
async fn test_integration_read_only_save_fails() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);
    let project = Project::open(dir.path(), options(ProjectMode::ReadOnly)).await.unwrap();
    let snapshot = project.load().await.unwrap();

    assert!(matches!(
        project.save(&snapshot.dom).await,
        Err(ProjectError::ReadOnly)
    ));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("toolpad/pages/home/page.yml")).unwrap(),
        HOME_PAGE
    );
}

#[tokio::test]
async fn test_integration_unknown_query_kind_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);
    write(
        dir.path(),
        "toolpad/pages/broken/page.yml",
        "apiVersion: v1\nkind: page\nspec:\n  queries:\n    - name: q\n      query:\n        kind: graphql\n",
    );

    let project = Project::open(dir.path(), options(ProjectMode::ReadOnly)).await.unwrap();
    let err = project.load().await.unwrap_err();
    assert!(matches!(err, ProjectError::File(FileError::UnknownTag { .. })));
}

#[tokio::test]
async fn test_integration_invalid_page_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);
    write(dir.path(), "toolpad/pages/broken/page.yml", "apiVersion: v1\nkind: page\nspec: [1, 2]\n");

    let project = Project::open(dir.path(), options(ProjectMode::ReadOnly)).await.unwrap();
    let dom = project.load().await.unwrap().dom;
    let names: Vec<_> = dom.pages().iter().map(|page| page.name.clone()).collect();
    assert_eq!(names, vec!["home"]);
}

#[tokio::test]
async fn test_integration_non_utf8_page_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);
    let broken = dir.path().join("toolpad/pages/broken/page.yml");
    std::fs::create_dir_all(broken.parent().unwrap()).unwrap();
    std::fs::write(&broken, [0xff, 0xfe]).unwrap();

    let project = Project::open(dir.path(), options(ProjectMode::ReadOnly)).await.unwrap();
    let dom = project.load().await.unwrap().dom;
    let names: Vec<_> = dom.pages().iter().map(|page| page.name.clone()).collect();
    assert_eq!(names, vec!["home"]);
}

#[tokio::test]
async fn test_integration_external_edit_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "toolpad/pages/home/page.yml", HOME_PAGE);
    let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
    project.load().await.unwrap();
    let mut events = project.subscribe();

    write(
        dir.path(),
        "toolpad/pages/home/page.yml",
        "apiVersion: v1\nkind: page\nspec:\n  id: home_id\n  title: Welcome\n",
    );

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no change event")
        .unwrap();
    assert!(matches!(event, ProjectEvent::Change { .. }));

    let dom = project.load().await.unwrap().dom;
    assert_eq!(dom.page_by_name("home").unwrap().as_page().unwrap().title, "Welcome");
    project.dispose().await;
}
