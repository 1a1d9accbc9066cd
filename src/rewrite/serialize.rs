//! HTML serialization of a [`DocumentNode`] tree.
//!
//! The tree walk lives here; escaping, void elements, raw-text elements and
//! namespace prefixes are html5ever's serializer. Output is produced in
//! source order.

use std::io;

use html5ever::serialize::{SerializeOpts, Serializer, TraversalScope};
use html5ever::{namespace_url, ns, QualName};

use crate::rewrite::document::{DocumentNode, NodeKind};

/// HTML elements whose first newline is eaten by the parser.
const LEADING_NEWLINE_ELEMENTS: [&str; 3] = ["listing", "pre", "textarea"];

enum Step<'a> {
    Enter(&'a DocumentNode),
    Close(&'a QualName),
}

impl html5ever::serialize::Serialize for DocumentNode {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut steps: Vec<Step<'_>> = match traversal_scope {
            TraversalScope::IncludeNode => vec![Step::Enter(self)],
            TraversalScope::ChildrenOnly(_) => self.children.iter().rev().map(Step::Enter).collect(),
        };

        while let Some(step) = steps.pop() {
            let node = match step {
                Step::Close(name) => {
                    serializer.end_elem(name.clone())?;
                    continue;
                }
                Step::Enter(node) => node,
            };

            match &node.kind {
                NodeKind::Document => {}
                NodeKind::Doctype {
                    name,
                    public_id,
                    system_id,
                } => serializer.write_doctype(&doctype_text(name, public_id, system_id))?,
                NodeKind::Comment(text) => serializer.write_comment(text)?,
                NodeKind::Text(text) => serializer.write_text(text)?,
                NodeKind::Element { name, attrs } => {
                    serializer.start_elem(
                        name.clone(),
                        attrs.iter().map(|attr| (&attr.name, attr.value.as_str())),
                    )?;
                    if restores_leading_newline(name, node) {
                        serializer.write_text("\n")?;
                    }
                    steps.push(Step::Close(name));
                }
            }

            steps.extend(node.children.iter().rev().map(Step::Enter));
        }

        Ok(())
    }
}

/// Serialize the tree rooted at `root`, including `root` itself.
pub fn serialize(root: &DocumentNode) -> io::Result<String> {
    let mut out = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..SerializeOpts::default()
    };
    html5ever::serialize::serialize(&mut out, root, opts)?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// The doctype as written after `<!DOCTYPE `.
fn doctype_text(name: &str, public_id: &str, system_id: &str) -> String {
    match (public_id.is_empty(), system_id.is_empty()) {
        (true, true) => name.to_string(),
        (false, true) => format!("{name} PUBLIC \"{public_id}\""),
        (false, false) => format!("{name} PUBLIC \"{public_id}\" \"{system_id}\""),
        (true, false) => format!("{name} SYSTEM \"{system_id}\""),
    }
}

fn restores_leading_newline(name: &QualName, node: &DocumentNode) -> bool {
    name.ns == ns!(html)
        && LEADING_NEWLINE_ELEMENTS.contains(&&*name.local)
        && matches!(
            node.children.first().map(|child| &child.kind),
            Some(NodeKind::Text(text)) if text.starts_with('\n')
        )
}
