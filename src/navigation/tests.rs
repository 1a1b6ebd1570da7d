// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use rstest::rstest;

use super::*;
use crate::capture::source_lines;
use crate::model::{NavigationKind, NavigationTarget};
use crate::test_utils::{TempDir, SAMPLE_PY};

/// In-memory viewer that counts how often it navigated.
#[derive(Default)]
struct CountingViewer {
    files: BTreeMap<String, String>,
    current: Option<String>,
    opened: Vec<String>,
    revealed: Vec<usize>,
}

impl CountingViewer {
    fn with_file(path: &str, text: &str) -> Self {
        let mut viewer = Self::default();
        viewer.files.insert(path.to_owned(), text.to_owned());
        viewer
    }
}

impl NavigationViewer for CountingViewer {
    fn current_file(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn open_file(&mut self, file_path: &str) -> Result<(), WorkspaceError> {
        if !self.files.contains_key(file_path) {
            return Err(WorkspaceError::NotFound {
                path: file_path.to_owned(),
            });
        }
        self.opened.push(file_path.to_owned());
        self.current = Some(file_path.to_owned());
        Ok(())
    }

    fn current_lines(&self) -> Vec<&str> {
        self.current
            .as_ref()
            .and_then(|path| self.files.get(path))
            .map(|text| source_lines(text))
            .unwrap_or_default()
    }

    fn reveal_line(&mut self, line: usize) {
        self.revealed.push(line);
    }
}

#[rstest]
#[case::python_def("fibonacci", 1)]
#[case::python_class("Greeter", 6)]
#[case::python_method("greet", 7)]
fn definitions_in_python(#[case] name: &str, #[case] expected: usize) {
    let lines = source_lines(SAMPLE_PY);
    assert_eq!(
        resolve_destination(&lines, &NavigationAction::FindFunction(name.to_owned())),
        Some(expected)
    );
}

#[rstest]
#[case::rust_pub_async_fn("pub(crate) async fn load_state() {}", "load_state")]
#[case::rust_unsafe_extern_fn(r#"unsafe extern "C" fn callback() {}"#, "callback")]
#[case::rust_struct("pub struct StateStore {", "StateStore")]
#[case::rust_trait_impl("impl<T> Display for Wrapper<T> {", "Wrapper")]
#[case::js_function("export async function render(root) {", "render")]
#[case::js_arrow("const handler = async (event) => {", "handler")]
#[case::ts_typed_arrow("export const parse: Parser = (input) => {", "parse")]
#[case::js_class("export default class App {", "App")]
#[case::go_method("func (s *Server) Serve(ctx context.Context) error {", "Serve")]
#[case::go_generic("func Map[T any](xs []T) []T {", "Map")]
#[case::ruby_self_def("  def self.build(opts)", "build")]
#[case::shell_function("deploy() {", "deploy")]
#[case::shell_subshell_function("deploy () (", "deploy")]
#[case::shell_keyword("function deploy {", "deploy")]
fn definition_shapes_match(#[case] line: &str, #[case] name: &str) {
    let pattern = definition_pattern(name).expect("pattern");
    assert!(pattern.is_match(line), "{line:?} should define {name}");
}

#[rstest]
#[case::call_site("    return fibonacci(n - 1)", "fibonacci")]
#[case::longer_name("def fibonacci_fast(n):", "fibonacci")]
#[case::comment("# see fibonacci", "fibonacci")]
#[case::plain_assignment("const handler = 3;", "handler")]
#[case::indented_bare_call("    setup()", "setup")]
#[case::statement_call("init();", "init")]
fn definition_shapes_ignore_non_definitions(#[case] line: &str, #[case] name: &str) {
    let pattern = definition_pattern(name).expect("pattern");
    assert!(!pattern.is_match(line), "{line:?} should not define {name}");
}

#[rstest]
#[case::python(
    "def main():\n    setup()\n    run()\n\ndef setup():\n    pass\n",
    "setup",
    5
)]
#[case::hoisted_js("init();\n\nfunction init() {\n  start();\n}\n", "init", 3)]
#[case::shell("deploy\n\ndeploy() {\n  make\n}\n", "deploy", 3)]
fn calls_before_the_definition_are_skipped(
    #[case] text: &str,
    #[case] name: &str,
    #[case] expected: usize,
) {
    let lines = source_lines(text);
    assert_eq!(
        resolve_destination(&lines, &NavigationAction::FindFunction(name.to_owned())),
        Some(expected)
    );
}

#[test]
fn definition_pattern_escapes_regex_metacharacters() {
    let pattern = definition_pattern("a.b").expect("pattern");
    assert!(pattern.is_match("def a.b():"));
    assert!(!pattern.is_match("def axb():"));
    assert!(definition_pattern("   ").is_none());
}

#[test]
fn search_is_case_insensitive_and_returns_the_first_match() {
    let lines = source_lines(SAMPLE_PY);
    let action = NavigationAction::SearchText("RETURN".to_owned());
    assert_eq!(resolve_destination(&lines, &action), Some(3));

    let action = NavigationAction::SearchText("f\"hello".to_owned());
    assert_eq!(resolve_destination(&lines, &action), Some(8));

    let action = NavigationAction::SearchText("missing".to_owned());
    assert_eq!(resolve_destination(&lines, &action), None);
}

#[test]
fn goto_line_is_taken_as_given() {
    assert_eq!(resolve_destination(&[], &NavigationAction::GotoLine(42)), Some(42));
}

#[rstest]
#[case::zero(0)]
#[case::negative(-3)]
fn line_action_rejects_non_positive_lines(#[case] line: i64) {
    assert!(matches!(line_action(line), Err(NavigationError::InvalidLine { line: got }) if got == line));
}

#[test]
fn issue_validates_inputs_and_replaces_pending_command() {
    let tmp = TempDir::new("navigation-issue");
    let store = tmp.store();

    assert!(matches!(
        issue(&store, &NavigationAction::GotoLine(3), " "),
        Err(NavigationError::EmptyFilePath)
    ));
    assert!(matches!(
        issue(&store, &NavigationAction::SearchText("  ".into()), "a.py"),
        Err(NavigationError::EmptyTarget)
    ));
    assert!(store.load().navigation.is_none());

    issue(&store, &NavigationAction::GotoLine(3), "a.py").unwrap();
    let second = issue(&store, &NavigationAction::FindFunction("main".into()), "b.py").unwrap();

    let pending = store.load().navigation.expect("pending");
    assert_eq!(pending, second);
    assert_eq!(pending.command, NavigationKind::FindFunction);
    assert_eq!(pending.target, NavigationTarget::Text("main".into()));
    assert!(!pending.executed);
}

#[test]
fn repeated_commands_execute_once_each() {
    let tmp = TempDir::new("navigation-once");
    let store = tmp.store();
    let mut viewer = CountingViewer::with_file("main.py", SAMPLE_PY);
    let mut agent = NavigationAgent::new();

    issue(&store, &NavigationAction::GotoLine(10), "main.py").unwrap();
    assert!(matches!(
        agent.poll(&store, &mut viewer).unwrap(),
        NavigationOutcome::Executed { line: 10, .. }
    ));
    // Overlapping poll cycles see the same command again.
    assert!(matches!(agent.poll(&store, &mut viewer).unwrap(), NavigationOutcome::Idle));
    assert!(matches!(agent.poll(&store, &mut viewer).unwrap(), NavigationOutcome::Idle));
    assert_eq!(viewer.revealed, vec![10]);
    assert!(store.load().navigation.expect("pending").executed);

    // A fresh agent (viewer restart) must not replay an executed command.
    let mut restarted = NavigationAgent::new();
    assert!(matches!(restarted.poll(&store, &mut viewer).unwrap(), NavigationOutcome::Idle));

    // The same target issued again is a new command and runs once.
    issue(&store, &NavigationAction::GotoLine(10), "main.py").unwrap();
    agent.poll(&store, &mut viewer).unwrap();
    agent.poll(&store, &mut viewer).unwrap();
    assert_eq!(viewer.revealed, vec![10, 10]);
    assert_eq!(viewer.opened, vec!["main.py".to_owned()]);
}

#[test]
fn stale_commands_are_ignored() {
    let tmp = TempDir::new("navigation-stale");
    let store = tmp.store();
    let mut viewer = CountingViewer::with_file("main.py", SAMPLE_PY);
    let mut agent = NavigationAgent::new();

    let newer = issue(&store, &NavigationAction::GotoLine(2), "main.py").unwrap();
    agent.poll(&store, &mut viewer).unwrap();
    assert_eq!(agent.last_seen(), Some(newer.timestamp));

    // Rewrite an unexecuted command carrying an older timestamp.
    let mut state = store.load();
    let mut older = NavigationCommand::new(&NavigationAction::GotoLine(5), "main.py");
    older.timestamp = Timestamp::from_secs(newer.timestamp.as_secs() - 10.0);
    state.navigation = Some(older);
    store.save(&state).unwrap();

    assert!(matches!(agent.poll(&store, &mut viewer).unwrap(), NavigationOutcome::Idle));
    assert_eq!(viewer.revealed, vec![2]);
}

#[test]
fn unresolved_targets_stay_unexecuted_and_are_not_retried() {
    let tmp = TempDir::new("navigation-missing");
    let store = tmp.store();
    let mut viewer = CountingViewer::with_file("main.py", SAMPLE_PY);
    let mut agent = NavigationAgent::new();

    issue(&store, &NavigationAction::FindFunction("nowhere".into()), "main.py").unwrap();
    assert!(matches!(
        agent.poll(&store, &mut viewer).unwrap(),
        NavigationOutcome::TargetNotFound { .. }
    ));
    assert!(matches!(agent.poll(&store, &mut viewer).unwrap(), NavigationOutcome::Idle));
    assert!(!store.load().navigation.expect("pending").executed);
    assert!(viewer.revealed.is_empty());

    issue(&store, &NavigationAction::GotoLine(1), "gone.py").unwrap();
    assert!(matches!(
        agent.poll(&store, &mut viewer).unwrap(),
        NavigationOutcome::FileUnavailable { .. }
    ));
    assert!(!store.load().navigation.expect("pending").executed);
}

#[test]
fn malformed_payloads_are_skipped() {
    let tmp = TempDir::new("navigation-malformed");
    let store = tmp.store();
    let mut viewer = CountingViewer::with_file("main.py", SAMPLE_PY);
    let mut agent = NavigationAgent::new();

    let mut command = NavigationCommand::new(&NavigationAction::SearchText("x".into()), "main.py");
    command.target = NavigationTarget::Line(4);
    store
        .save(&crate::model::SharedState {
            navigation: Some(command),
            ..Default::default()
        })
        .unwrap();

    assert!(matches!(
        agent.poll(&store, &mut viewer).unwrap(),
        NavigationOutcome::Malformed { .. }
    ));
    assert!(viewer.revealed.is_empty());
}

#[test]
fn file_switch_happens_before_line_lookup() {
    let tmp = TempDir::new("navigation-switch");
    let store = tmp.store();
    let mut viewer = CountingViewer::with_file("main.py", SAMPLE_PY);
    viewer.files.insert("other.rs".into(), "use std::io;\n\nfn target() {}\n".into());
    viewer.current = Some("main.py".into());
    let mut agent = NavigationAgent::new();

    issue(&store, &NavigationAction::FindFunction("target".into()), "other.rs").unwrap();
    assert!(matches!(
        agent.poll(&store, &mut viewer).unwrap(),
        NavigationOutcome::Executed { line: 3, .. }
    ));
    assert_eq!(viewer.current_file(), Some("other.rs"));
}
