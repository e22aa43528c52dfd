//! Graphviz export of control-flow graphs.

use std::fmt::Write;

use crate::{
    analysis::cfg::{Graph, NodeKind},
    utils::escape_dot,
};

impl Graph {
    /// Generates a DOT representation of the graph for visualization.
    ///
    /// Only live nodes are emitted. The start node is filled light green and
    /// return nodes light coral; the true edge of a branch is drawn green and
    /// the false edge red.
    ///
    /// # Arguments
    ///
    /// * `title` - Optional title for the graph (e.g., function name)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cfgopt::Graph;
    ///
    /// let mut graph = Graph::new();
    /// let ret = graph.add_return();
    /// graph.add_start(ret)?;
    ///
    /// let dot = graph.to_dot(Some("main"));
    /// assert!(dot.starts_with("digraph CFG {"));
    /// assert!(dot.contains("n1 -> n0"));
    /// # Ok::<(), cfgopt::Error>(())
    /// ```
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = String::new();

        dot.push_str("digraph CFG {\n");
        if let Some(name) = title {
            let _ = writeln!(dot, "    label=\"CFG: {}\";", escape_dot(name));
        }
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n");
        dot.push_str("    edge [fontname=\"Courier\", fontsize=9];\n\n");

        for id in self.nodes() {
            let Some(kind) = self.kind(id) else {
                continue;
            };
            let label = escape_dot(&format!("{id}: {kind}"));
            let style = match kind {
                NodeKind::Start => ", style=filled, fillcolor=lightgreen",
                NodeKind::Return => ", style=filled, fillcolor=lightcoral",
                NodeKind::Stub => ", style=dashed",
                _ => "",
            };
            let _ = writeln!(dot, "    {id} [label=\"{label}\"{style}];");
        }

        dot.push('\n');

        for id in self.nodes() {
            let is_branch = matches!(self.kind(id), Some(NodeKind::If { .. }));
            for (slot, &target) in self.successors(id).iter().enumerate() {
                let attrs = match (is_branch, slot) {
                    (true, 0) => " [label=\"true\", color=green]",
                    (true, _) => " [label=\"false\", color=red]",
                    _ => "",
                };
                let _ = writeln!(dot, "    {id} -> {target}{attrs};");
            }
        }

        dot.push_str("}\n");
        dot
    }
}

#[cfg(test)]
mod tests {
    use crate::{ir::Expr, Graph};

    #[test]
    fn test_dot_colors_branches() {
        let mut g = Graph::new();
        let ret = g.add_return();
        let a = g.add_var_assign("a", Expr::constant(1), ret).unwrap();
        let branch = g.add_if(Expr::temp("c"), a, ret).unwrap();
        g.add_start(branch).unwrap();

        let dot = g.to_dot(None);
        assert!(dot.contains(&format!("{branch} -> {a} [label=\"true\", color=green];")));
        assert!(dot.contains(&format!("{branch} -> {ret} [label=\"false\", color=red];")));
        assert!(dot.contains("fillcolor=lightgreen"));
        assert!(dot.contains("fillcolor=lightcoral"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_dot_escapes_labels() {
        let mut g = Graph::new();
        let ret = g.add_return();
        g.add_mem_assign(Expr::mem(Expr::temp("p")), Expr::temp("v"), ret)
            .unwrap();

        let dot = g.to_dot(Some("say \"hi\""));
        assert!(dot.contains("label=\"CFG: say \\\"hi\\\"\""));
        assert!(!dot.contains("fillcolor=lightgreen"));
    }
}
