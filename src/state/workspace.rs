//! Code panel and project board view state.
//!
//! Both are fed by outbound call results. Results are keyed by the path they
//! were issued for, so an answer that arrives after the user moved on to a
//! different file is dropped instead of clobbering the current buffer.

use crate::host::api::{ExecutionResult, FileEntry, TaskBoard};
use serde::Serialize;

/// File tree, open file, edit buffer and console of the code panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceView {
    tree: Vec<FileEntry>,
    tree_loaded: bool,
    open_file: Option<String>,
    buffer: String,
    console: String,
}

impl WorkspaceView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the file tree with a listing from the host.
    pub fn set_tree(&mut self, entries: Vec<FileEntry>) {
        self.tree = entries;
        self.tree_loaded = true;
    }

    /// Select a file. The buffer is cleared until its content arrives.
    pub fn select(&mut self, path: impl Into<String>) {
        self.open_file = Some(path.into());
        self.buffer.clear();
    }

    /// Apply file content read for `path`. Returns `false` if `path` is no
    /// longer the open file.
    pub fn apply_content(&mut self, path: &str, content: String) -> bool {
        if !self.is_open(path) {
            return false;
        }
        self.buffer = content;
        true
    }

    /// Replace the buffer with local edits. Requires an open file.
    pub fn edit(&mut self, text: impl Into<String>) -> bool {
        if self.open_file.is_none() {
            return false;
        }
        self.buffer = text.into();
        true
    }

    /// Record the outcome of a save issued for `path`.
    pub fn apply_save(&mut self, path: &str, saved: bool) -> bool {
        if !self.is_open(path) {
            return false;
        }
        self.console = if saved {
            format!("Saved {path}")
        } else {
            format!("Failed to save {path}")
        };
        true
    }

    /// Show the running banner for `path`.
    pub fn begin_run(&mut self, path: &str) {
        self.console = format!("> python {path}\nRunning...");
    }

    /// Replace the running banner with the execution output.
    pub fn apply_run(&mut self, path: &str, result: &ExecutionResult) -> bool {
        if !self.is_open(path) {
            return false;
        }
        let mut output = result.stdout.clone();
        if !result.stderr.is_empty() {
            output.push_str("\n--- STDERR ---\n");
            output.push_str(&result.stderr);
        }
        self.console = format!("> python {path}\n{output}");
        true
    }

    /// Show a failure line for `path` in the console.
    pub fn apply_failure(&mut self, path: &str, description: &str) -> bool {
        if !self.is_open(path) {
            return false;
        }
        self.console = format!("Error: {description}");
        true
    }

    #[must_use]
    pub fn is_open(&self, path: &str) -> bool {
        self.open_file.as_deref() == Some(path)
    }

    #[must_use]
    pub fn tree(&self) -> &[FileEntry] {
        &self.tree
    }

    #[must_use]
    pub fn tree_loaded(&self) -> bool {
        self.tree_loaded
    }

    #[must_use]
    pub fn open_file(&self) -> Option<&str> {
        self.open_file.as_deref()
    }

    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    #[must_use]
    pub fn console(&self) -> &str {
        &self.console
    }
}

/// Last task board snapshot fetched from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectBoard {
    board: TaskBoard,
    loaded: bool,
}

impl ProjectBoard {
    /// Replace the board wholesale.
    pub fn replace(&mut self, board: TaskBoard) {
        self.board = board;
        self.loaded = true;
    }

    #[must_use]
    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::api::{FileKind, Task};

    fn result(stdout: &str, stderr: &str) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_owned(),
            stderr: stderr.to_owned(),
            returncode: 0,
        }
    }

    #[test]
    fn content_for_the_open_file_fills_the_buffer() {
        let mut ws = WorkspaceView::new();
        ws.select("main.py");
        assert!(ws.apply_content("main.py", "print(1)".to_owned()));
        assert_eq!(ws.buffer(), "print(1)");
    }

    #[test]
    fn stale_content_is_discarded() {
        let mut ws = WorkspaceView::new();
        ws.select("a.py");
        ws.select("b.py");
        assert!(!ws.apply_content("a.py", "old".to_owned()));
        assert_eq!(ws.buffer(), "");
        assert_eq!(ws.open_file(), Some("b.py"));
    }

    #[test]
    fn edits_require_an_open_file() {
        let mut ws = WorkspaceView::new();
        assert!(!ws.edit("x = 1"));
        ws.select("a.py");
        assert!(ws.edit("x = 1"));
        assert_eq!(ws.buffer(), "x = 1");
    }

    #[test]
    fn save_outcome_is_shown_in_console() {
        let mut ws = WorkspaceView::new();
        ws.select("a.py");
        ws.apply_save("a.py", true);
        assert_eq!(ws.console(), "Saved a.py");
        ws.apply_save("a.py", false);
        assert_eq!(ws.console(), "Failed to save a.py");
    }

    #[test]
    fn run_output_appends_stderr_section_only_when_present() {
        let mut ws = WorkspaceView::new();
        ws.select("a.py");
        ws.begin_run("a.py");
        assert_eq!(ws.console(), "> python a.py\nRunning...");

        ws.apply_run("a.py", &result("hi\n", ""));
        assert_eq!(ws.console(), "> python a.py\nhi\n");

        ws.apply_run("a.py", &result("", "Traceback"));
        assert_eq!(ws.console(), "> python a.py\n\n--- STDERR ---\nTraceback");
    }

    #[test]
    fn run_result_for_closed_file_is_dropped() {
        let mut ws = WorkspaceView::new();
        ws.select("a.py");
        ws.begin_run("a.py");
        ws.select("b.py");
        assert!(!ws.apply_run("a.py", &result("late", "")));
        assert_eq!(ws.console(), "> python a.py\nRunning...");
    }

    #[test]
    fn tree_and_board_are_replaced_wholesale() {
        let mut ws = WorkspaceView::new();
        assert!(!ws.tree_loaded());
        ws.set_tree(vec![FileEntry {
            name: "src".to_owned(),
            kind: FileKind::Folder,
            path: "./src".to_owned(),
        }]);
        ws.set_tree(Vec::new());
        assert!(ws.tree_loaded());
        assert!(ws.tree().is_empty());

        let mut board = ProjectBoard::default();
        board.replace(TaskBoard {
            todo: vec![Task {
                id: 1,
                title: "write docs".to_owned(),
                status: "todo".to_owned(),
            }],
            ..TaskBoard::default()
        });
        board.replace(TaskBoard::default());
        assert!(board.is_loaded());
        assert!(board.board().todo.is_empty());
    }
}
