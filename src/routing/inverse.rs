//! Inverse routing: action identifier → canonical URL template.
//!
//! # Responsibilities
//! - Rebuild a URL template per action by concatenating tree keys
//! - Expand a template's `:name` slots with concrete parameter values
//!
//! The inverse map is computed once per route-tree load; redirects and
//! the `url()` template helper both consume it.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::schema::RouteNode;

/// Escape set for one path segment. Unreserved characters and the
/// sub-delimiters that are legal inside a segment stay literal; `/`,
/// `?` and `#` are always escaped so a parameter value cannot change
/// the URL structure.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b',')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$');

/// Percent-encode a single path segment or parameter value.
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Build the action → URL template map for a route tree.
///
/// A branch's `#` action maps to the accumulated prefix (`/` when the
/// prefix is empty); every other action maps to prefix + its key.
pub fn invert(tree: &RouteNode) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    collect(tree, "", &mut map);
    map
}

fn collect(node: &RouteNode, prefix: &str, map: &mut BTreeMap<String, String>) {
    let RouteNode::Branch(children) = node else {
        return;
    };
    for (key, child) in children {
        match child {
            RouteNode::Action(action) => {
                let url = if key == "#" {
                    if prefix.is_empty() {
                        "/".to_string()
                    } else {
                        prefix.to_string()
                    }
                } else {
                    format!("{prefix}/{key}")
                };
                map.insert(action.clone(), url);
            }
            RouteNode::Branch(_) => {
                collect(child, &format!("{prefix}/{key}"), map);
            }
        }
    }
}

/// Expand a URL template, substituting `:name` segments from `params`.
///
/// Substituted values are percent-encoded. A capture slot with no
/// matching parameter is kept verbatim, mirroring resolution's view of
/// the template.
pub fn expand(template: &str, params: &BTreeMap<String, String>) -> String {
    template
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => params
                .get(name)
                .map(|value| encode_segment(value))
                .unwrap_or_else(|| segment.to_string()),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
