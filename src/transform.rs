//! Per-file transform pipeline
//!
//! Ties the resolver, analyzer and injector together for one consumer file:
//! locate the shim call, resolve its deferred-load path, analyze the deferred
//! unit on disk, and rewrite the consumer to carry the slot manifest. The
//! "one transform per file" policy lives in an explicit [`TransformContext`]
//! passed through the pipeline, never in global state.

use std::fs;
use std::path::Path;

use tracing::debug;
use tree_sitter::{Node, Tree};

use crate::analyzer::{analyze_unit, find_tagged_declaration};
use crate::config::SHIM_FUNCTION_NAME;
use crate::error::{TransformError, TransformResult};
use crate::injector::{apply_edits, inject};
use crate::ir::Span;
use crate::resolver::resolve_load_path;
use crate::tree_sitter_parser::{node_span, node_text, JsParser};
use crate::unit_rewriter::rewrite_unit;

/// Per-file build state: the "already handled one shim call" latch
#[derive(Debug, Default)]
pub struct TransformContext {
    handled: Option<Span>,
}

impl TransformContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, span: Span) -> TransformResult<()> {
        if self.handled.is_some() {
            return Err(TransformError::MultipleTransformsPerFile(span));
        }
        self.handled = Some(span);
        Ok(())
    }
}

/// Transform a consumer file's source text.
///
/// Returns `Ok(None)` when the file contains no shim call and is left
/// untouched. `consumer_path` anchors the deferred unit's relative path.
pub fn transform_consumer(
    source: &str,
    consumer_path: &Path,
    context: &mut TransformContext,
) -> TransformResult<Option<String>> {
    let tree = JsParser::new()?.parse(source)?;
    let root = tree.root_node();

    let shim_calls = find_shim_calls(&tree, source);
    let Some(shim_call) = shim_calls.first().copied() else {
        return Ok(None);
    };
    if shim_calls.len() > 1 {
        return Err(TransformError::MultipleTransformsPerFile(node_span(
            shim_calls[1],
        )));
    }
    context.claim(node_span(shim_call))?;

    let resolved = resolve_load_path(shim_call, root, source)?;
    let unit_path = consumer_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(&resolved.path);
    debug!(
        target: "lazyhook::transform",
        consumer = %consumer_path.display(),
        unit = %unit_path.display(),
        "resolved deferred unit"
    );

    let manifest = analyze_unit(&unit_path)?;
    let edits = inject(source, root, shim_call, &manifest)?;
    Ok(Some(apply_edits(source, edits)))
}

/// Transform a deferred unit's source text to the generated loading
/// contract. Returns `Ok(None)` when the file carries no marker.
pub fn transform_unit(source: &str, path: &Path) -> TransformResult<Option<String>> {
    let tree = JsParser::new()?.parse(source)?;
    if find_tagged_declaration(tree.root_node(), source).is_none() {
        return Ok(None);
    }
    rewrite_unit(source, path).map(Some)
}

/// Transform one file on disk, whichever side of the contract it is on.
///
/// A consumer file gets the manifest injected; a marked deferred unit gets
/// the generated signature; any other file passes through as `None`.
pub fn transform_file(path: &Path) -> TransformResult<Option<String>> {
    let source = fs::read_to_string(path)
        .map_err(|e| TransformError::Io(path.to_path_buf(), e.to_string()))?;

    let mut context = TransformContext::new();
    if let Some(rewritten) = transform_consumer(&source, path, &mut context)? {
        return Ok(Some(rewritten));
    }
    transform_unit(&source, path)
}

/// All shim calls in a consumer file, in source order
fn find_shim_calls<'t>(tree: &'t Tree, source: &str) -> Vec<Node<'t>> {
    let mut calls = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if node.kind() == "call_expression"
            && node
                .child_by_field_name("function")
                .is_some_and(|callee| {
                    callee.kind() == "identifier"
                        && node_text(callee, source) == SHIM_FUNCTION_NAME
                })
        {
            calls.push(node);
        }
        for i in (0..node.named_child_count()).rev() {
            if let Some(child) = node.named_child(i) {
                stack.push(child);
            }
        }
    }
    calls.sort_by_key(|node| node.start_byte());
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_file_without_shim_call_passes_through() {
        let mut context = TransformContext::new();
        let result =
            transform_consumer("const x = 1", &PathBuf::from("a.js"), &mut context).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_two_shim_calls_in_one_file_rejected() {
        let source = r#"
function useA() { return useImportedHook(import('./a.jsx')) }
function useB() { return useImportedHook(import('./b.jsx')) }
"#;
        let mut context = TransformContext::new();
        assert!(matches!(
            transform_consumer(source, &PathBuf::from("a.js"), &mut context),
            Err(TransformError::MultipleTransformsPerFile(_))
        ));
    }

    #[test]
    fn test_context_latch_blocks_second_transform() {
        let mut context = TransformContext::new();
        context.claim(Span::zero()).unwrap();
        assert!(matches!(
            context.claim(Span::zero()),
            Err(TransformError::MultipleTransformsPerFile(_))
        ));
    }

    #[test]
    fn test_unit_without_marker_passes_through() {
        let result =
            transform_unit("export default function f() {}", &PathBuf::from("f.js")).unwrap();
        assert_eq!(result, None);
    }
}
