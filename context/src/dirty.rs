//! Mutation tracking between checkpoint boundaries.

use std::collections::BTreeSet;

/// Tools that never mutate the workspace.
///
/// Everything else, including tools this crate has never heard of, counts as
/// mutating. Keep in sync with the tool registry.
pub const READ_ONLY_TOOLS: [&str; 8] = [
    "read_file",
    "list_files",
    "grep",
    "glob",
    "fetch_url",
    "think",
    "todo",
    "snapshot",
];

#[must_use]
pub fn is_read_only(tool_name: &str) -> bool {
    READ_ONLY_TOOLS.contains(&tool_name)
}

/// Mutating tool names invoked since the last boundary (sorted, deduplicated).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    tools: BTreeSet<String>,
}

impl DirtySet {
    /// Record an invocation. Returns `true` if the tool counts as mutating.
    pub fn mark(&mut self, tool_name: &str) -> bool {
        if is_read_only(tool_name) {
            return false;
        }
        if !self.tools.contains(tool_name) {
            self.tools.insert(tool_name.to_string());
        }
        true
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.tools.is_empty()
    }

    pub fn clear(&mut self) {
        self.tools.clear();
    }

    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(String::as_str)
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.tools.iter().cloned().collect()
    }
}
