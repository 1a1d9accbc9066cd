//! Rewrite rules applied to every element of a parsed document.
//!
//! # Rules
//! - `href`, `src`, `action`: resolved against the page URL, re-encoded as
//!   proxy-local paths. SVG `xlink:href` counts as `href`
//! - `on*` event handlers and `data`: value cleared, attribute kept
//! - `<script>`: element and subtree removed
//!
//! Everything else is left exactly as parsed.

use html5ever::{namespace_url, ns, QualName};
use url::Url;

use crate::rewrite::document::{Attribute, DocumentNode, NodeKind};
use crate::routing::codec;

/// Attributes carrying a URL that must stay inside the proxy.
pub const LINK_ATTRIBUTES: [&str; 3] = ["href", "src", "action"];

/// Attributes whose value is cleared outright.
pub const CLEARED_ATTRIBUTES: [&str; 1] = ["data"];

/// Prefix of inline event handler attributes.
pub const EVENT_HANDLER_PREFIX: &str = "on";

/// Elements removed from the tree with their subtree.
pub const REMOVED_ELEMENTS: [&str; 1] = ["script"];

/// Summary of what a rewrite pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    pub links_rewritten: usize,
    pub links_unresolved: usize,
    pub attributes_cleared: usize,
    pub elements_removed: usize,
}

/// Apply every rule to the whole tree, pre-order.
pub fn rewrite_document(root: &mut DocumentNode, base: &Url) -> RewriteStats {
    let mut stats = RewriteStats::default();
    let mut stack: Vec<&mut DocumentNode> = vec![root];

    while let Some(node) = stack.pop() {
        if let NodeKind::Element { attrs, .. } = &mut node.kind {
            rewrite_attributes(attrs, base, &mut stats);
        }

        for tag in REMOVED_ELEMENTS {
            stats.elements_removed += remove_elements(&mut node.children, tag);
        }

        // reversed so siblings are visited in document order
        stack.extend(node.children.iter_mut().rev());
    }

    stats
}

/// Detach every direct child named `tag`, keeping the others in order.
///
/// Returns the number removed.
pub fn remove_elements(children: &mut Vec<DocumentNode>, tag: &str) -> usize {
    let before = children.len();
    children.retain(|child| !child.is_element(tag));
    before - children.len()
}

fn is_link_attribute(name: &QualName) -> bool {
    (name.ns == ns!() || name.ns == ns!(xlink)) && LINK_ATTRIBUTES.contains(&&*name.local)
}

fn is_cleared_attribute(name: &QualName) -> bool {
    name.ns == ns!()
        && (name.local.starts_with(EVENT_HANDLER_PREFIX) || CLEARED_ATTRIBUTES.contains(&&*name.local))
}

fn rewrite_attributes(attrs: &mut [Attribute], base: &Url, stats: &mut RewriteStats) {
    for attr in attrs.iter_mut() {
        if is_link_attribute(&attr.name) {
            match rewrite_link(&attr.value, base) {
                Some(link) => {
                    attr.value = link;
                    stats.links_rewritten += 1;
                }
                None => stats.links_unresolved += 1,
            }
        }

        if is_cleared_attribute(&attr.name) {
            attr.value.clear();
            stats.attributes_cleared += 1;
        }
    }
}

/// Resolve `value` against `base` and encode it as a proxy-local path.
///
/// Returns `None` when the value cannot be resolved; the caller keeps the
/// original value.
pub fn rewrite_link(value: &str, base: &Url) -> Option<String> {
    match base.join(value.trim()) {
        Ok(url) => Some(codec::collapse(&url)),
        Err(e) => {
            tracing::debug!(value = %value, base = %base, error = %e, "Leaving unresolvable link untouched");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://example.com/dir/page.html").unwrap()
    }

    fn el(name: &str, attrs: &[(&str, &str)], children: Vec<DocumentNode>) -> DocumentNode {
        let attrs = attrs.iter().map(|(k, v)| Attribute::new(*k, *v)).collect();
        DocumentNode::element(name, attrs, children)
    }

    fn tags(children: &[DocumentNode]) -> Vec<&str> {
        children.iter().filter_map(DocumentNode::tag_name).collect()
    }

    #[test]
    fn rewrites_relative_and_absolute_links() {
        assert_eq!(rewrite_link("/about", &base()).unwrap(), "/http/example.com/about");
        assert_eq!(rewrite_link("img/a.png", &base()).unwrap(), "/http/example.com/dir/img/a.png");
        assert_eq!(rewrite_link("../up", &base()).unwrap(), "/http/example.com/up");
        assert_eq!(
            rewrite_link("https://other.org/x?y=1", &base()).unwrap(),
            "/https/other.org/x?y=1"
        );
        assert_eq!(rewrite_link("//cdn.example.net/lib", &base()).unwrap(), "/http/cdn.example.net/lib");
        assert_eq!(rewrite_link("  /padded  ", &base()).unwrap(), "/http/example.com/padded");
    }

    #[test]
    fn unresolvable_link_is_left_alone() {
        assert_eq!(rewrite_link("http://[invalid", &base()), None);

        let mut doc = el("a", &[("href", "http://[invalid"), ("onclick", "go()")], vec![]);
        let stats = rewrite_document(&mut doc, &base());
        assert_eq!(doc.attr("href"), Some("http://[invalid"));
        assert_eq!(doc.attr("onclick"), Some(""));
        assert_eq!(stats.links_unresolved, 1);
    }

    #[test]
    fn script_urls_are_neutralized() {
        assert_eq!(rewrite_link("javascript:alert(1)", &base()).unwrap(), "/javascript:alert(1)");
    }

    #[test]
    fn clears_event_handlers_and_data() {
        let mut doc = el(
            "object",
            &[("onclick", "alert(1)"), ("onload", "x()"), ("data", "movie.swf"), ("type", "app/x")],
            vec![],
        );
        rewrite_document(&mut doc, &base());

        assert_eq!(doc.attr("onclick"), Some(""));
        assert_eq!(doc.attr("onload"), Some(""));
        assert_eq!(doc.attr("data"), Some(""));
        assert_eq!(doc.attr("type"), Some("app/x"));
    }

    #[test]
    fn event_prefix_is_case_sensitive() {
        let mut doc = el("div", &[("ONCLICK", "keep"), ("one", "cleared")], vec![]);
        rewrite_document(&mut doc, &base());
        assert_eq!(doc.attr("ONCLICK"), Some("keep"));
        assert_eq!(doc.attr("one"), Some(""));
    }

    #[test]
    fn other_attributes_are_untouched() {
        let attrs = [
            ("class", "nav"),
            ("id", "top"),
            ("style", "background:url(/x.png)"),
            ("title", "/not/a/link"),
            ("srcset", "a.png 1x"),
            ("data-id", "7"),
        ];
        let mut doc = el("div", &attrs, vec![]);
        let before = doc.clone();
        rewrite_document(&mut doc, &base());
        assert_eq!(doc, before);
    }

    #[test]
    fn removes_adjacent_scripts_without_skipping() {
        let mut children = vec![
            el("p", &[], vec![]),
            el("script", &[], vec![]),
            el("script", &[], vec![]),
            el("span", &[], vec![]),
            el("script", &[], vec![]),
        ];
        assert_eq!(remove_elements(&mut children, "script"), 3);
        assert_eq!(tags(&children), ["p", "span"]);
    }

    #[test]
    fn removes_many_sibling_scripts_in_order() {
        let mut children = Vec::new();
        for i in 0..10_000 {
            let id = i.to_string();
            children.push(el("script", &[], vec![]));
            children.push(el("p", &[("id", id.as_str())], vec![]));
        }
        assert_eq!(remove_elements(&mut children, "script"), 10_000);
        assert_eq!(children.len(), 10_000);
        assert_eq!(children[0].attr("id"), Some("0"));
        assert_eq!(children[9_999].attr("id"), Some("9999"));
    }

    #[test]
    fn xlink_href_is_rewritten_in_place() {
        let mut doc = DocumentNode::parse(
            r##"<svg xmlns:xlink="http://www.w3.org/1999/xlink"><a xlink:href="/docs" xml:lang="en">d</a></svg>"##,
        );
        let stats = rewrite_document(&mut doc, &base());
        assert_eq!(stats.links_rewritten, 1);

        let mut pending = vec![&doc];
        let mut seen = Vec::new();
        while let Some(node) = pending.pop() {
            if let NodeKind::Element { attrs, .. } = &node.kind {
                seen.extend(attrs.iter().map(|a| (a.name.ns.to_string(), a.key().to_string(), a.value.clone())));
            }
            pending.extend(node.children.iter());
        }
        assert!(seen.contains(&(
            "http://www.w3.org/1999/xlink".to_string(),
            "href".to_string(),
            "/http/example.com/docs".to_string()
        )));
        assert!(seen.contains(&("http://www.w3.org/XML/1998/namespace".to_string(), "lang".to_string(), "en".to_string())));
        // the namespace declaration itself is not a link
        assert!(seen.contains(&(
            "http://www.w3.org/2000/xmlns/".to_string(),
            "xlink".to_string(),
            "http://www.w3.org/1999/xlink".to_string()
        )));
    }

    #[test]
    fn removes_leading_scripts() {
        let mut children = vec![
            el("script", &[], vec![]),
            el("script", &[], vec![]),
            el("em", &[], vec![]),
        ];
        assert_eq!(remove_elements(&mut children, "script"), 2);
        assert_eq!(tags(&children), ["em"]);
    }

    #[test]
    fn removes_scripts_at_any_depth() {
        let mut doc = DocumentNode::document(vec![el(
            "body",
            &[],
            vec![
                el("h1", &[], vec![el("script", &[], vec![DocumentNode::text("a()")])]),
                el("script", &[("src", "/app.js")], vec![]),
                el(
                    "div",
                    &[],
                    vec![
                        el("ul", &[], vec![el("li", &[], vec![el("script", &[], vec![])])]),
                        el("script", &[], vec![el("script", &[], vec![])]),
                        el("p", &[], vec![]),
                    ],
                ),
                el("footer", &[], vec![]),
            ],
        )]);

        let stats = rewrite_document(&mut doc, &base());

        assert_eq!(doc.count_elements("script"), 0);
        assert_eq!(stats.elements_removed, 4);

        let body = &doc.children[0];
        assert_eq!(tags(&body.children), ["h1", "div", "footer"]);
        assert_eq!(tags(&body.children[1].children), ["ul", "p"]);
    }

    #[test]
    fn rewrites_nested_elements() {
        let mut doc = el(
            "form",
            &[("action", "/submit"), ("method", "post")],
            vec![el("div", &[], vec![el("img", &[("src", "pic.jpg"), ("alt", "pic")], vec![])])],
        );
        let stats = rewrite_document(&mut doc, &base());

        assert_eq!(doc.attr("action"), Some("/http/example.com/submit"));
        assert_eq!(doc.attr("method"), Some("post"));
        let img = &doc.children[0].children[0];
        assert_eq!(img.attr("src"), Some("/http/example.com/dir/pic.jpg"));
        assert_eq!(img.attr("alt"), Some("pic"));
        assert_eq!(stats.links_rewritten, 2);
    }
}
