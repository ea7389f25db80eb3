//! Tree rendering for diagnostics.

use std::fmt::Write as _;

use super::{NodeId, PhysicalPlan};

impl PhysicalPlan {
    /// Renders the sub-tree rooted at `root` as an indented tree, one
    /// node per line.
    #[must_use]
    pub fn display_tree(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.render(root, 0, &mut out);
        out
    }

    fn render(&self, id: NodeId, indent: usize, out: &mut String) {
        let _ = writeln!(out, "{:indent$}{}", "", self.kind(id), indent = indent * 2);
        for &input in self.inputs(id) {
            self.render(input, indent + 1, out);
        }
    }
}
