//! Deferred-unit analyzer
//!
//! Reads the lazily-loaded hook's source ahead of time and produces the
//! ordered slot manifest describing exactly which primitives it registers.
//! The unit declares itself importable with a marker comment immediately
//! preceding its declaration; everything the unit does with primitives must
//! be statically capturable, or analysis fails with a build error pointing
//! at the offending call.

use std::fs;
use std::path::Path;

use tracing::debug;
use tree_sitter::Node;

use crate::config::{EXTRA_DEPENDENCY_IDENT, INITIAL_STATES_IDENT, MARKER_COMMENT};
use crate::error::{TransformError, TransformResult};
use crate::manifest::{
    classify, DependencyArity, Manifest, PrimitiveClass, SlotDescriptor, SlotKind,
};
use crate::static_value::{encode, StaticValue};
use crate::tree_sitter_parser::{named_children, node_span, node_text, JsParser};

/// Analyze a deferred unit on disk and return its slot manifest
pub fn analyze_unit(path: &Path) -> TransformResult<Manifest> {
    let source = fs::read_to_string(path)
        .map_err(|e| TransformError::Io(path.to_path_buf(), e.to_string()))?;
    analyze_source(&source, path)
}

/// Analyze deferred-unit source text; `path` is only used in diagnostics
pub fn analyze_source(source: &str, path: &Path) -> TransformResult<Manifest> {
    let tree = JsParser::new()?.parse(source)?;
    let root = tree.root_node();

    let declaration = find_tagged_declaration(root, source)
        .ok_or_else(|| TransformError::NoMarkerFound(path.to_path_buf()))?;
    let function = declared_function(declaration)
        .ok_or_else(|| TransformError::NoMarkerFound(path.to_path_buf()))?;

    check_parameters(function, source)?;

    let mut manifest = Manifest::new();
    if let Some(body) = function.child_by_field_name("body") {
        collect_slots(body, source, &mut manifest)?;
    }

    debug!(
        target: "lazyhook::analyzer",
        path = %path.display(),
        slots = manifest.len(),
        "analyzed deferred unit"
    );
    Ok(manifest)
}

/// Find the first declaration whose immediately preceding comment run
/// contains the marker token.
pub fn find_tagged_declaration<'t>(root: Node<'t>, source: &str) -> Option<Node<'t>> {
    let mut stack = vec![root];
    let mut candidates = Vec::new();
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "function_declaration" | "export_statement")
            && has_marker_comment(node, source)
        {
            candidates.push(node);
        }
        for i in (0..node.named_child_count()).rev() {
            if let Some(child) = node.named_child(i) {
                stack.push(child);
            }
        }
    }
    candidates.into_iter().min_by_key(|node| node.start_byte())
}

/// The function node a tagged declaration declares, if any
pub fn declared_function(declaration: Node) -> Option<Node> {
    match declaration.kind() {
        "function_declaration" => Some(declaration),
        "export_statement" => {
            let inner = declaration
                .child_by_field_name("declaration")
                .or_else(|| declaration.child_by_field_name("value"))?;
            match inner.kind() {
                "function_declaration" | "function_expression" | "arrow_function"
                | "generator_function_declaration" => Some(inner),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Check the comment run directly above a declaration for the marker token
fn has_marker_comment(node: Node, source: &str) -> bool {
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        if sibling.kind() != "comment" {
            return false;
        }
        if node_text(sibling, source).contains(MARKER_COMMENT) {
            return true;
        }
        prev = sibling.prev_sibling();
    }
    false
}

/// Enforce the single-argument rule on the tagged declaration.
///
/// One parameter for the unit's own arguments; the synthetic dependency and
/// initial-states parameters are tolerated so an already-rewritten unit
/// still analyzes cleanly.
pub(crate) fn check_parameters(function: Node, source: &str) -> TransformResult<()> {
    let Some(parameters) = function.child_by_field_name("parameters") else {
        return Ok(());
    };
    let params = named_children(parameters);
    for (index, param) in params.iter().enumerate() {
        let synthetic = param.kind() == "identifier"
            && matches!(
                node_text(*param, source),
                name if name == EXTRA_DEPENDENCY_IDENT || name == INITIAL_STATES_IDENT
            );
        if index >= 1 && !synthetic {
            return Err(TransformError::SingleArgumentRequired(node_span(*param)));
        }
    }
    Ok(())
}

/// Walk every call expression in the declaration body, in source order,
/// classifying primitive calls into slot descriptors.
fn collect_slots(body: Node, source: &str, manifest: &mut Manifest) -> TransformResult<()> {
    if body.kind() == "call_expression" {
        classify_call(body, source, manifest)?;
    }
    for i in 0..body.named_child_count() {
        if let Some(child) = body.named_child(i) {
            collect_slots(child, source, manifest)?;
        }
    }
    Ok(())
}

fn classify_call(call: Node, source: &str, manifest: &mut Manifest) -> TransformResult<()> {
    let Some(callee) = call.child_by_field_name("function") else {
        return Ok(());
    };
    if callee.kind() != "identifier" {
        return Ok(());
    }
    let name = node_text(callee, source);
    let Some(class) = classify(name) else {
        return Ok(());
    };
    let span = node_span(call);

    let kind = match class {
        PrimitiveClass::Forbidden => {
            return Err(TransformError::ForbiddenPrimitiveUsed(name.to_string(), span));
        }
        PrimitiveClass::Stateful(primitive) => {
            let initial = match call_argument(call, 0) {
                Some(arg) => encode(arg, source).ok_or_else(|| {
                    TransformError::NonStaticInitialState(name.to_string(), node_span(arg))
                })?,
                None => StaticValue::Undefined,
            };
            SlotKind::Stateful { primitive, initial }
        }
        PrimitiveClass::WithDeps(primitive) => {
            let arity = match call_argument(call, 1) {
                None => DependencyArity::EveryPass,
                Some(deps) => {
                    if deps.kind() != "array" {
                        return Err(TransformError::ArrayLiteralRequired(node_span(deps)));
                    }
                    let elements = named_children(deps);
                    if let Some(spread) =
                        elements.iter().find(|el| el.kind() == "spread_element")
                    {
                        return Err(TransformError::NoSpreadAllowed(node_span(*spread)));
                    }
                    let count = elements
                        .iter()
                        .filter(|el| node_text(**el, source) != EXTRA_DEPENDENCY_IDENT)
                        .count();
                    DependencyArity::Count(count)
                }
            };
            SlotKind::WithDeps { primitive, arity }
        }
        PrimitiveClass::ImperativeHandle => SlotKind::ImperativeHandle,
        PrimitiveClass::DebugOnly => SlotKind::DebugOnly,
    };

    manifest.push(SlotDescriptor { kind, span });
    Ok(())
}

/// The n-th positional argument of a call, if present
fn call_argument(call: Node, index: usize) -> Option<Node> {
    let arguments = call.child_by_field_name("arguments")?;
    named_children(arguments).get(index).copied()
}
