// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rstest::{fixture, rstest};

use super::*;
use crate::test_utils::{TempDir, SAMPLE_PY};

struct WorkspaceTestCtx {
    _tmp: TempDir,
    workspace: Workspace,
}

#[fixture]
fn ctx() -> WorkspaceTestCtx {
    let tmp = TempDir::new("workspace");
    tmp.write("project/src/main.py", SAMPLE_PY);
    tmp.write("project/README.md", "# demo\n");
    tmp.write("project/.hidden/secret.txt", "nope\n");
    tmp.write("project/.env", "TOKEN=1\n");
    tmp.write("outside.txt", "outside\n");
    std::fs::write(tmp.path().join("project/blob.bin"), [0u8, 159, 146, 150]).unwrap();
    let workspace = Workspace::open(tmp.path().join("project")).unwrap();
    WorkspaceTestCtx { _tmp: tmp, workspace }
}

#[rstest]
fn listing_is_sorted_and_skips_hidden_entries(ctx: WorkspaceTestCtx) {
    let items = ctx.workspace.list_dir("").unwrap();
    let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["README.md", "blob.bin", "src"]);

    let src = items.iter().find(|item| item.name == "src").unwrap();
    assert!(src.is_dir);
    assert_eq!(src.size, 0);
    assert_eq!(src.path, "src");

    let nested = ctx.workspace.list_dir("/src").unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].path, "src/main.py");
    assert_eq!(nested[0].size, SAMPLE_PY.len() as u64);
}

#[rstest]
#[case::parent("../outside.txt")]
#[case::nested_parent("src/../../outside.txt")]
fn paths_escaping_the_root_are_rejected(ctx: WorkspaceTestCtx, #[case] request: &str) {
    assert!(matches!(
        ctx.workspace.read_file(request),
        Err(WorkspaceError::OutsideRoot { .. })
    ));
}

#[rstest]
fn absolute_paths_inside_the_root_resolve(ctx: WorkspaceTestCtx) {
    let absolute = ctx.workspace.root().join("src/main.py");
    let content = ctx.workspace.read_file(&absolute.to_string_lossy()).unwrap();
    assert_eq!(content.path, "src/main.py");
    assert_eq!(content.content.as_deref(), Some(SAMPLE_PY));
}

#[rstest]
fn dot_segments_inside_the_root_are_fine(ctx: WorkspaceTestCtx) {
    let content = ctx.workspace.read_file("./src/../README.md").unwrap();
    assert_eq!(content.path, "README.md");
    assert!(content.is_text);
}

#[rstest]
fn binary_files_have_no_text(ctx: WorkspaceTestCtx) {
    let content = ctx.workspace.read_file("blob.bin").unwrap();
    assert!(!content.is_text);
    assert_eq!(content.content, None);
    assert_eq!(content.size, 4);
}

#[rstest]
fn missing_and_wrong_kind_paths_are_reported(ctx: WorkspaceTestCtx) {
    assert!(matches!(
        ctx.workspace.read_file("nope.py"),
        Err(WorkspaceError::NotFound { .. })
    ));
    assert!(matches!(
        ctx.workspace.read_file("src"),
        Err(WorkspaceError::NotAFile { .. })
    ));
    assert!(matches!(
        ctx.workspace.list_dir("README.md"),
        Err(WorkspaceError::NotADirectory { .. })
    ));
    assert!(ctx.workspace.exists_file("src/main.py"));
    assert!(!ctx.workspace.exists_file("src"));
}

#[rstest]
fn walk_lists_visible_files_in_order(ctx: WorkspaceTestCtx) {
    assert_eq!(
        ctx.workspace.walk_files(),
        vec!["README.md".to_owned(), "blob.bin".to_owned(), "src/main.py".to_owned()]
    );
}

#[cfg(unix)]
#[rstest]
fn symlinks_cannot_escape_the_root(ctx: WorkspaceTestCtx) {
    let link = ctx.workspace.root().join("escape.txt");
    let target = ctx.workspace.root().parent().unwrap().join("outside.txt");
    std::os::unix::fs::symlink(target, link).unwrap();
    assert!(matches!(
        ctx.workspace.read_file("escape.txt"),
        Err(WorkspaceError::OutsideRoot { .. })
    ));
}

#[cfg(unix)]
#[rstest]
fn missing_paths_under_an_escaping_symlink_are_rejected(ctx: WorkspaceTestCtx) {
    let outside = ctx.workspace.root().parent().unwrap().join("elsewhere");
    std::fs::create_dir_all(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, ctx.workspace.root().join("linked")).unwrap();

    assert!(matches!(
        ctx.workspace.resolve("linked/new.txt"),
        Err(WorkspaceError::OutsideRoot { .. })
    ));
    assert!(matches!(
        ctx.workspace.resolve("linked/deeper/new.txt"),
        Err(WorkspaceError::OutsideRoot { .. })
    ));
}

#[rstest]
fn missing_paths_inside_the_root_resolve_under_it(ctx: WorkspaceTestCtx) {
    let resolved = ctx.workspace.resolve("src/later/new.py").unwrap();
    assert_eq!(resolved, ctx.workspace.root().join("src/later/new.py"));
    assert!(matches!(
        ctx.workspace.read_file("src/later/new.py"),
        Err(WorkspaceError::NotFound { .. })
    ));
}

#[cfg(unix)]
#[rstest]
fn dangling_symlinks_are_not_found(ctx: WorkspaceTestCtx) {
    let target = ctx.workspace.root().parent().unwrap().join("gone.txt");
    std::os::unix::fs::symlink(target, ctx.workspace.root().join("dangling.txt")).unwrap();
    assert!(matches!(
        ctx.workspace.resolve("dangling.txt"),
        Err(WorkspaceError::NotFound { .. })
    ));
}
