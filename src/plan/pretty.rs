//! Uniform tree pretty-printer (spec.md §6 "Plan-pretty format", Design Note
//! "Tree nodes with a uniform pretty-printer").
//!
//! The source mixes `pretty` into every plan node type. Re-architected here
//! as a capability trait — "has a label and ordered children" — plus one
//! free function [`pretty`] that renders anything implementing it. Both
//! [`super::logical::LogicalPlan`] and [`super::physical::PhysicalPlan`]
//! implement [`PrettyNode`] without otherwise depending on each other.

/// A tree node with a one-line label and ordered children, renderable by
/// [`pretty`] without the caller knowing the concrete node type.
pub trait PrettyNode {
    fn label(&self) -> String;
    fn pretty_children(&self) -> Vec<&dyn PrettyNode>;
}

/// Box-drawing tree rendering: `╟──` for a non-last sibling, `╙──` for the
/// last, `║` continuing a still-open ancestor, 4-space indent per depth
/// level (spec.md §6). This is a debug contract, not a stable machine format.
pub fn pretty(node: &dyn PrettyNode) -> String {
    let mut out = String::new();
    render(node, "", true, &mut out);
    out
}

fn render(node: &dyn PrettyNode, prefix: &str, is_root: bool, out: &mut String) {
    if is_root {
        out.push_str(&node.label());
        out.push('\n');
    }
    let children = node.pretty_children();
    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == children.len();
        let branch = if is_last { "╙── " } else { "╟── " };
        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&child.label());
        out.push('\n');
        let child_prefix = format!("{prefix}{}    ", if is_last { " " } else { "║" });
        render_children_only(*child, &child_prefix, out);
    }
}

fn render_children_only(node: &dyn PrettyNode, prefix: &str, out: &mut String) {
    let children = node.pretty_children();
    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == children.len();
        let branch = if is_last { "╙── " } else { "╟── " };
        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&child.label());
        out.push('\n');
        let child_prefix = format!("{prefix}{}    ", if is_last { " " } else { "║" });
        render_children_only(*child, &child_prefix, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf(&'static str);
    impl PrettyNode for Leaf {
        fn label(&self) -> String {
            self.0.to_string()
        }
        fn pretty_children(&self) -> Vec<&dyn PrettyNode> {
            vec![]
        }
    }

    struct Branch(&'static str, Vec<Leaf>);
    impl PrettyNode for Branch {
        fn label(&self) -> String {
            self.0.to_string()
        }
        fn pretty_children(&self) -> Vec<&dyn PrettyNode> {
            self.1.iter().map(|l| l as &dyn PrettyNode).collect()
        }
    }

    #[test]
    fn last_child_uses_double_bar_branch() {
        let tree = Branch("Root", vec![Leaf("a"), Leaf("b")]);
        let rendered = pretty(&tree);
        assert_eq!(rendered, "Root\n╟── a\n╙── b\n");
    }

    #[test]
    fn single_child_is_last() {
        let tree = Branch("Root", vec![Leaf("only")]);
        assert_eq!(pretty(&tree), "Root\n╙── only\n");
    }
}
