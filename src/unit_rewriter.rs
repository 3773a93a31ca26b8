//! Deferred-unit contract generator
//!
//! The tagged declaration's post-transform signature
//! `(originalArgs, syntheticToken, initialStates)` is generated, never
//! hand-written. This rewriter:
//!
//! - appends the synthetic dependency parameter (and, when the unit has
//!   stateful slots, the initial-states parameter) to the declaration;
//! - prepends the synthetic dependency as the first element of every
//!   dependency-array literal, so the loaded implementation re-evaluates its
//!   dependency-bearing slots exactly once across the load transition;
//! - replaces each stateful primitive call with an index into the
//!   initial-states parameter, because after delegation those slots are
//!   registered by the shim, and a second registration would break the
//!   host's per-pass slot count.
//!
//! Every rewrite is idempotent: running it over already-rewritten output
//! changes nothing.

use std::path::Path;

use tracing::debug;
use tree_sitter::Node;

use crate::analyzer::{check_parameters, declared_function, find_tagged_declaration};
use crate::config::{EXTRA_DEPENDENCY_IDENT, INITIAL_STATES_IDENT};
use crate::error::{TransformError, TransformResult};
use crate::injector::{apply_edits, Edit};
use crate::manifest::{classify, PrimitiveClass};
use crate::tree_sitter_parser::{named_children, node_span, node_text, JsParser};

/// Rewrite a deferred unit's source to the generated loading contract.
///
/// `path` is only used in diagnostics.
pub fn rewrite_unit(source: &str, path: &Path) -> TransformResult<String> {
    let tree = JsParser::new()?.parse(source)?;
    let root = tree.root_node();

    let declaration = find_tagged_declaration(root, source)
        .ok_or_else(|| TransformError::NoMarkerFound(path.to_path_buf()))?;
    let function = declared_function(declaration)
        .ok_or_else(|| TransformError::NoMarkerFound(path.to_path_buf()))?;
    check_parameters(function, source)?;

    let mut edits = Vec::new();
    let mut stateful_seen = 0usize;
    if let Some(body) = function.child_by_field_name("body") {
        rewrite_calls(body, source, &mut edits, &mut stateful_seen)?;
    }

    if let Some(parameters) = function.child_by_field_name("parameters") {
        edits.extend(parameter_edits(parameters, source, stateful_seen > 0));
    }

    debug!(
        target: "lazyhook::unit_rewriter",
        path = %path.display(),
        stateful = stateful_seen,
        edits = edits.len(),
        "rewrote deferred unit"
    );
    Ok(apply_edits(source, edits))
}

/// Synthesize the missing parameters of the tagged declaration
fn parameter_edits(parameters: Node, source: &str, needs_initial_states: bool) -> Vec<Edit> {
    let params = named_children(parameters);
    let names: Vec<&str> = params.iter().map(|p| node_text(*p, source)).collect();

    let mut pieces: Vec<&str> = Vec::new();
    if params.is_empty() {
        pieces.push("{}");
    }
    if !names.contains(&EXTRA_DEPENDENCY_IDENT) {
        pieces.push(EXTRA_DEPENDENCY_IDENT);
    }
    if needs_initial_states && !names.contains(&INITIAL_STATES_IDENT) {
        pieces.push(INITIAL_STATES_IDENT);
    }
    if pieces.is_empty() {
        return vec![];
    }

    let mut text = pieces.join(", ");
    if !params.is_empty() {
        text = format!(", {}", text);
    }
    // Insert just before the closing parenthesis of the parameter list.
    vec![Edit::insert(parameters.end_byte() - 1, text)]
}

/// Walk the body in source order, rewriting primitive calls
fn rewrite_calls(
    node: Node,
    source: &str,
    edits: &mut Vec<Edit>,
    stateful_seen: &mut usize,
) -> TransformResult<()> {
    if node.kind() == "call_expression" {
        if let Some(done) = rewrite_call(node, source, edits, stateful_seen)? {
            // A replaced stateful call has no surviving children to rewrite.
            if done {
                return Ok(());
            }
        }
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            rewrite_calls(child, source, edits, stateful_seen)?;
        }
    }
    Ok(())
}

/// Rewrite one call if it is a primitive call. Returns `Some(true)` when the
/// whole call was replaced.
fn rewrite_call(
    call: Node,
    source: &str,
    edits: &mut Vec<Edit>,
    stateful_seen: &mut usize,
) -> TransformResult<Option<bool>> {
    let Some(callee) = call.child_by_field_name("function") else {
        return Ok(None);
    };
    if callee.kind() != "identifier" {
        return Ok(None);
    }
    let name = node_text(callee, source);
    let Some(class) = classify(name) else {
        return Ok(None);
    };

    match class {
        PrimitiveClass::Forbidden => Err(TransformError::ForbiddenPrimitiveUsed(
            name.to_string(),
            node_span(call),
        )),
        PrimitiveClass::Stateful(_) => {
            let index = *stateful_seen;
            *stateful_seen += 1;
            edits.push(Edit {
                start_byte: call.start_byte(),
                end_byte: call.end_byte(),
                text: format!("{}[{}]", INITIAL_STATES_IDENT, index),
            });
            Ok(Some(true))
        }
        PrimitiveClass::WithDeps(_) => {
            if let Some(deps) = call
                .child_by_field_name("arguments")
                .and_then(|args| named_children(args).get(1).copied())
            {
                if deps.kind() != "array" {
                    return Err(TransformError::ArrayLiteralRequired(node_span(deps)));
                }
                let elements = named_children(deps);
                let already_first = elements
                    .first()
                    .is_some_and(|el| node_text(*el, source) == EXTRA_DEPENDENCY_IDENT);
                if !already_first {
                    let text = if elements.is_empty() {
                        EXTRA_DEPENDENCY_IDENT.to_string()
                    } else {
                        format!("{}, ", EXTRA_DEPENDENCY_IDENT)
                    };
                    edits.push(Edit::insert(deps.start_byte() + 1, text));
                }
            }
            Ok(Some(false))
        }
        PrimitiveClass::ImperativeHandle | PrimitiveClass::DebugOnly => Ok(Some(false)),
    }
}
