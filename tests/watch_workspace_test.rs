//! Discovery of projects and documents from a real directory tree.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docsync::client::ChannelClientNotifier;
use docsync::config::WatcherConfig;
use docsync::{ClientCapabilities, FileChangeDetector, IdentityProcessor, Settings, SyncHost};
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        &root.join("App/project.razor.json"),
        r#"{
            "filePath": "App.csproj",
            "rootNamespace": "App",
            "documents": [
                { "filePath": "Pages/Index.razor", "targetPath": "Pages/Index.razor" }
            ]
        }"#,
    );
    write(&root.join("App/Pages/Index.razor"), "<h1>Index</h1>");
    write(&root.join("App/Pages/Counter.razor"), "<h1>Counter</h1>");
    write(&root.join("App/obj/Generated.razor"), "ignored");
    write(&root.join("App/README.md"), "not matched");
    dir
}

fn quick_config() -> WatcherConfig {
    WatcherConfig {
        debounce_ms: 50,
        ..WatcherConfig::default()
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

#[tokio::test]
async fn test_scan_skips_ignored_and_unmatched_files() {
    let dir = workspace();
    let root = dir.path().canonicalize().unwrap();

    let detector = FileChangeDetector::builder(&root)
        .config(&quick_config())
        .build()
        .unwrap();
    let files = detector.scan().await.unwrap();

    assert_eq!(
        files,
        vec![
            root.join("App/Pages/Counter.razor"),
            root.join("App/Pages/Index.razor"),
            root.join("App/project.razor.json"),
        ]
    );
}

#[tokio::test]
async fn test_watch_discovers_projects_and_documents() {
    let dir = workspace();
    let root = dir.path().canonicalize().unwrap();
    let (notifier, _notifications) = ChannelClientNotifier::new();
    let mut host = SyncHost::new(
        &Settings::default(),
        Arc::new(notifier),
        Arc::new(ClientCapabilities::all()),
        Arc::new(IdentityProcessor),
    );

    let found = host.watch(&root, &quick_config()).await.unwrap();
    assert_eq!(found, 3);

    let manager = host.manager().clone();
    let discovered = wait_for(|| {
        manager
            .snapshot()
            .projects()
            .next()
            .is_some_and(|project| project.document_count() == 2)
    })
    .await;
    assert!(discovered, "project with both documents was not discovered");

    let snapshot = manager.snapshot();
    let project = snapshot.projects().next().unwrap();
    assert_eq!(project.file_path(), root.join("App/App.csproj"));
    assert_eq!(project.root_namespace(), Some("App"));
    assert!(project.document(&root.join("App/Pages/Counter.razor")).is_some());

    // A file created after start arrives through the OS watcher
    write(&root.join("App/Pages/Fetch.razor"), "<h1>Fetch</h1>");
    let added = wait_for(|| {
        manager
            .snapshot()
            .projects()
            .next()
            .is_some_and(|project| project.document_count() == 3)
    })
    .await;
    assert!(added, "document created after start was not added");

    host.shutdown();
}
