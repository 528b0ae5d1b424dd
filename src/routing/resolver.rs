//! Route resolution: request path → action identifier + parameters.
//!
//! # Responsibilities
//! - Walk the route tree segment by segment
//! - Bind `:name` capture parameters (values kept raw, not decoded)
//! - Apply the `#` index action of the final branch
//! - Fall back to the reserved not-found action
//!
//! # Design Decisions
//! - A literal child always wins over a capture sibling
//! - When two capture keys share a level, the first in map iteration
//!   order wins; route tables should not rely on this
//! - A dead-end branch (no literal, no capture) resolves to the
//!   not-found action; it does not fall back to an ancestor's `#`

use std::collections::BTreeMap;

use crate::config::schema::RouteNode;

/// Action identifier served when no route matches.
pub const NOT_FOUND_ACTION: &str = "System.404";

/// Result of route resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionAndParams {
    /// Dotted action identifier.
    pub action: String,
    /// Capture-parameter names (without the `:` prefix) → raw segments.
    pub params: BTreeMap<String, String>,
}

impl ActionAndParams {
    pub fn not_found() -> Self {
        Self {
            action: NOT_FOUND_ACTION.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.action == NOT_FOUND_ACTION
    }
}

/// Resolve a request path against the route tree.
///
/// Matching terminates early when a segment maps directly to an action
/// identifier; remaining segments are ignored. The `#` key names the
/// index action of a branch and applies only when the walk itself found
/// no action.
pub fn resolve(tree: &RouteNode, path: &str) -> ActionAndParams {
    let mut segments: Vec<&str> = path.split('/').skip(1).collect();
    if segments.last() == Some(&"") {
        segments.pop();
    }

    let mut params = BTreeMap::new();
    let mut node = tree;

    for segment in segments {
        if segment.is_empty() {
            return ActionAndParams::not_found();
        }
        match node.child(segment) {
            Some(RouteNode::Action(action)) => {
                return ActionAndParams {
                    action: action.clone(),
                    params,
                };
            }
            Some(branch @ RouteNode::Branch(_)) => {
                node = branch;
            }
            None => {
                let Some((key, child)) = capture_child(node) else {
                    return ActionAndParams::not_found();
                };
                params.insert(key[1..].to_string(), segment.to_string());
                match child {
                    RouteNode::Action(action) => {
                        return ActionAndParams {
                            action: action.clone(),
                            params,
                        };
                    }
                    RouteNode::Branch(_) => {
                        node = child;
                    }
                }
            }
        }
    }

    match node.child("#") {
        Some(RouteNode::Action(action)) => ActionAndParams {
            action: action.clone(),
            params,
        },
        _ => ActionAndParams::not_found(),
    }
}

/// First `:`-prefixed child of a branch, in map iteration order.
fn capture_child(node: &RouteNode) -> Option<(&str, &RouteNode)> {
    match node {
        RouteNode::Branch(children) => children
            .iter()
            .find(|(key, _)| key.starts_with(':'))
            .map(|(key, child)| (key.as_str(), child)),
        RouteNode::Action(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(json: &str) -> RouteNode {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn resolves_capture_and_index_action() {
        let tree = tree(r##"{"user": {":id": {"#": "User.show"}}}"##);

        let result = resolve(&tree, "/user/42");
        assert_eq!(result.action, "User.show");
        assert_eq!(result.params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn resolves_literal_leaf() {
        let tree = tree(r#"{"about": "Page.about"}"#);
        assert_eq!(resolve(&tree, "/about").action, "Page.about");
    }

    #[test]
    fn literal_child_wins_over_capture() {
        let tree = tree(r#"{"user": {"new": "User.new", ":id": "User.show"}}"#);

        let result = resolve(&tree, "/user/new");
        assert_eq!(result.action, "User.new");
        assert!(result.params.is_empty());
    }

    #[test]
    fn root_resolves_only_through_index() {
        let tree = tree(r##"{"#": "Top.index", "about": "Page.about"}"##);
        assert_eq!(resolve(&tree, "/").action, "Top.index");

        let bare = tree_without_index();
        assert!(resolve(&bare, "/").is_not_found());
    }

    fn tree_without_index() -> RouteNode {
        serde_json::from_str(r#"{"about": "Page.about"}"#).unwrap()
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let tree = tree(r##"{"user": {":id": {"#": "User.show"}}}"##);
        assert_eq!(resolve(&tree, "/user/42/").action, "User.show");
    }

    #[test]
    fn extra_segments_after_leaf_are_ignored() {
        let tree = tree(r#"{"about": "Page.about"}"#);
        assert_eq!(resolve(&tree, "/about/anything/else").action, "Page.about");
    }

    #[test]
    fn dead_end_does_not_fall_back_to_ancestor_index() {
        let tree = tree(r##"{"#": "Top.index", "user": {"profile": "User.profile"}}"##);
        assert!(resolve(&tree, "/user/unknown").is_not_found());
    }

    #[test]
    fn index_does_not_override_walk_match() {
        let tree = tree(r##"{"#": "Top.index", "about": "Page.about"}"##);
        assert_eq!(resolve(&tree, "/about").action, "Page.about");
    }

    #[test]
    fn unmatched_path_is_not_found() {
        let tree = tree(r##"{"user": {":id": {"#": "User.show"}}}"##);
        assert!(resolve(&tree, "/nothing").is_not_found());
    }

    #[test]
    fn empty_interior_segment_is_not_found() {
        let tree = tree(r##"{"user": {":id": {"#": "User.show"}}}"##);
        assert!(resolve(&tree, "/user//42").is_not_found());
    }

    #[test]
    fn capture_value_is_kept_raw() {
        let tree = tree(r##"{"tag": {":name": {"#": "Tag.show"}}}"##);
        let result = resolve(&tree, "/tag/caf%C3%A9");
        assert_eq!(
            result.params.get("name").map(String::as_str),
            Some("caf%C3%A9")
        );
    }

    #[test]
    fn nested_captures_bind_independently() {
        let tree = tree(
            r##"{"blog": {":year": {":month": {"#": "Blog.archive"}}}}"##,
        );
        let result = resolve(&tree, "/blog/2026/08");
        assert_eq!(result.action, "Blog.archive");
        assert_eq!(result.params.get("year").map(String::as_str), Some("2026"));
        assert_eq!(result.params.get("month").map(String::as_str), Some("08"));
    }
}
