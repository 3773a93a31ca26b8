//! Manifest injector
//!
//! Rewrites the consumer call to carry the slot manifest as literal data:
//! pads missing positional arguments with explicit `undefined`, appends the
//! stateful and stateless slot arrays as arguments 4 and 5, and makes sure
//! every primitive the manifest references is imported from the primitive
//! module exactly once. All rewriting is expressed as byte-span edits
//! applied back-to-front over a rope, so spans from the original parse stay
//! valid throughout.

use itertools::Itertools;
use ropey::Rope;
use tracing::debug;
use tree_sitter::Node;

use crate::config::PRIMITIVE_MODULE;
use crate::error::{TransformError, TransformResult};
use crate::manifest::{DependencyArity, Manifest, StatefulSlot, StatelessSlot};
use crate::static_value::decode;
use crate::tree_sitter_parser::{named_children, node_span, node_text, string_literal_value};

/// One text replacement, in byte offsets of the unedited source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start_byte: usize,
    pub end_byte: usize,
    pub text: String,
}

impl Edit {
    /// Pure insertion at a byte offset
    pub fn insert(at: usize, text: String) -> Self {
        Self {
            start_byte: at,
            end_byte: at,
            text,
        }
    }
}

/// Apply non-overlapping edits to a source string
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    let mut rope = Rope::from_str(source);
    edits.sort_by(|a, b| b.start_byte.cmp(&a.start_byte));
    for edit in edits {
        let start = rope.byte_to_char(edit.start_byte);
        let end = rope.byte_to_char(edit.end_byte);
        rope.remove(start..end);
        rope.insert(start, &edit.text);
    }
    rope.to_string()
}

/// Compute the edits embedding `manifest` into a consumer shim call.
///
/// `root` is the consumer file's program node, used to manage imports.
pub fn inject(
    source: &str,
    root: Node,
    shim_call: Node,
    manifest: &Manifest,
) -> TransformResult<Vec<Edit>> {
    let arguments = shim_call
        .child_by_field_name("arguments")
        .ok_or_else(|| TransformError::NoDeferredLoadFound(node_span(shim_call)))?;
    let existing = named_children(arguments);

    // A shim call already carrying the manifest arrays means this file went
    // through the transform before; fail loudly instead of double-injecting.
    if existing.len() > 3 {
        return Err(TransformError::MultipleTransformsPerFile(node_span(shim_call)));
    }

    let (stateful, stateless) = manifest.partition();
    let mut appended: Vec<String> = Vec::new();
    for _ in existing.len()..3 {
        appended.push("undefined".to_string());
    }
    appended.push(serialize_stateful(&stateful));
    appended.push(serialize_stateless(&stateless));

    let mut text = appended.join(", ");
    if !existing.is_empty() {
        text = format!(", {}", text);
    }
    // Insert just before the closing parenthesis of the argument list.
    let mut edits = vec![Edit::insert(arguments.end_byte() - 1, text)];

    if !manifest.is_empty() {
        edits.extend(ensure_primitive_imports(
            source,
            root,
            &manifest.referenced_primitives(),
        ));
    }

    debug!(
        target: "lazyhook::injector",
        stateful = stateful.len(),
        stateless = stateless.len(),
        "injected slot manifest"
    );
    Ok(edits)
}

/// `[[useState, 0], [useRef, null]]`
fn serialize_stateful(slots: &[StatefulSlot]) -> String {
    if slots.is_empty() {
        return "[]".to_string();
    }
    let tuples = slots
        .iter()
        .map(|slot| format!("[{}, {}]", slot.primitive.name(), decode(&slot.initial)))
        .join(", ");
    format!("[{}]", tuples)
}

/// `[[useEffect, 2], [useMemo], [useImperativeHandle, null], [useDebugValue]]`
fn serialize_stateless(slots: &[StatelessSlot]) -> String {
    if slots.is_empty() {
        return "[]".to_string();
    }
    let tuples = slots
        .iter()
        .map(|slot| match slot {
            StatelessSlot::WithDeps {
                primitive,
                arity: DependencyArity::Count(count),
            } => format!("[{}, {}]", primitive.name(), count),
            // No dependency argument: the slot re-runs every pass and the
            // shim replays it without a dependency list.
            StatelessSlot::WithDeps {
                primitive,
                arity: DependencyArity::EveryPass,
            } => format!("[{}]", primitive.name()),
            // Explicit null marker so the shim can special-case the handle.
            StatelessSlot::ImperativeHandle => "[useImperativeHandle, null]".to_string(),
            StatelessSlot::DebugOnly => "[useDebugValue]".to_string(),
        })
        .join(", ");
    format!("[{}]", tuples)
}

/// Make every referenced primitive a named import from the primitive module,
/// without ever duplicating a specifier.
fn ensure_primitive_imports(source: &str, root: Node, names: &[&'static str]) -> Vec<Edit> {
    let Some(import) = find_primitive_import(root, source) else {
        let line = format!(
            "import {{ {} }} from '{}'\n",
            names.iter().join(", "),
            PRIMITIVE_MODULE
        );
        return vec![Edit::insert(0, line)];
    };

    let clause = named_children(import)
        .into_iter()
        .find(|child| child.kind() == "import_clause");
    let named = clause.and_then(|clause| {
        named_children(clause)
            .into_iter()
            .find(|child| child.kind() == "named_imports")
    });

    match (clause, named) {
        (_, Some(named)) => {
            let specifiers = named_children(named);
            let imported: Vec<&str> = specifiers
                .iter()
                .filter(|spec| spec.kind() == "import_specifier")
                .filter_map(|spec| spec.child_by_field_name("name"))
                .map(|name| node_text(name, source))
                .collect();
            let missing: Vec<&&str> = names.iter().filter(|n| !imported.contains(*n)).collect();
            if missing.is_empty() {
                return vec![];
            }
            let text = if specifiers.is_empty() {
                missing.iter().join(", ")
            } else {
                format!(", {}", missing.iter().join(", "))
            };
            // Insert before the closing brace of the named import list.
            vec![Edit::insert(named.end_byte() - 1, format!("{} ", text))]
        }
        (Some(clause), None) => {
            // `import React from 'react'`: extend the clause with a named
            // import list.
            vec![Edit::insert(
                clause.end_byte(),
                format!(", {{ {} }}", names.iter().join(", ")),
            )]
        }
        (None, None) => {
            // Bare `import 'react'`: give it a clause.
            let keyword_end = import.start_byte() + "import".len();
            vec![Edit::insert(
                keyword_end,
                format!(" {{ {} }} from", names.iter().join(", ")),
            )]
        }
    }
}

/// Find an existing import of the primitive module (source match is
/// case-insensitive, matching how consumers commonly spell it).
fn find_primitive_import<'t>(root: Node<'t>, source: &str) -> Option<Node<'t>> {
    named_children(root).into_iter().find(|node| {
        node.kind() == "import_statement"
            && node
                .child_by_field_name("source")
                .and_then(|src| string_literal_value(src, source))
                .is_some_and(|value| value.to_lowercase() == PRIMITIVE_MODULE)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Span;
    use crate::manifest::{SlotDescriptor, SlotKind, StatefulPrimitive};
    use crate::static_value::StaticValue;
    use crate::tree_sitter_parser::JsParser;

    #[test]
    fn test_apply_edits_back_to_front() {
        let out = apply_edits(
            "abcdef",
            vec![
                Edit::insert(6, "!".to_string()),
                Edit {
                    start_byte: 1,
                    end_byte: 3,
                    text: "X".to_string(),
                },
            ],
        );
        assert_eq!(out, "aXdef!");
    }

    #[test]
    fn test_serialize_stateless_variants() {
        use crate::manifest::DepPrimitive;
        let slots = vec![
            StatelessSlot::WithDeps {
                primitive: DepPrimitive::UseEffect,
                arity: DependencyArity::Count(2),
            },
            StatelessSlot::WithDeps {
                primitive: DepPrimitive::UseMemo,
                arity: DependencyArity::EveryPass,
            },
            StatelessSlot::ImperativeHandle,
            StatelessSlot::DebugOnly,
        ];
        assert_eq!(
            serialize_stateless(&slots),
            "[[useEffect, 2], [useMemo], [useImperativeHandle, null], [useDebugValue]]"
        );
    }

    #[test]
    fn test_serialize_stateful_decodes_initial_values() {
        let slots = vec![
            StatefulSlot {
                primitive: StatefulPrimitive::UseState,
                initial: StaticValue::Object(vec![("a".to_string(), StaticValue::Number(1.0))]),
            },
            StatefulSlot {
                primitive: StatefulPrimitive::UseRef,
                initial: StaticValue::Null,
            },
        ];
        assert_eq!(
            serialize_stateful(&slots),
            "[[useState, { a: 1 }], [useRef, null]]"
        );
    }

    fn inject_into(source: &str, manifest: &Manifest) -> TransformResult<String> {
        let tree = JsParser::new().unwrap().parse(source).unwrap();
        let root = tree.root_node();
        let mut shim = None;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.kind() == "call_expression"
                && node
                    .child_by_field_name("function")
                    .is_some_and(|c| node_text(c, source) == "useImportedHook")
            {
                shim = Some(node);
                break;
            }
            for i in 0..node.named_child_count() {
                stack.push(node.named_child(i).unwrap());
            }
        }
        let edits = inject(source, root, shim.expect("shim call"), manifest)?;
        Ok(apply_edits(source, edits))
    }

    fn one_slot_manifest() -> Manifest {
        let mut manifest = Manifest::new();
        manifest.push(SlotDescriptor {
            kind: SlotKind::Stateful {
                primitive: StatefulPrimitive::UseState,
                initial: StaticValue::Number(0.0),
            },
            span: Span::zero(),
        });
        manifest
    }

    #[test]
    fn test_pads_missing_positional_arguments() {
        let source = "useImportedHook(import('./hook.jsx'))";
        let out = inject_into(source, &one_slot_manifest()).unwrap();
        assert!(
            out.contains(
                "useImportedHook(import('./hook.jsx'), undefined, undefined, [[useState, 0]], [])"
            ),
            "{}",
            out
        );
        assert!(out.starts_with("import { useState } from 'react'\n"));
    }

    #[test]
    fn test_no_padding_when_three_arguments_present() {
        let source = "useImportedHook(import('./hook.jsx'), { a }, null)";
        let out = inject_into(source, &one_slot_manifest()).unwrap();
        assert!(
            out.contains("null, [[useState, 0]], [])"),
            "{}",
            out
        );
    }

    #[test]
    fn test_reinjection_fails_loudly() {
        let source =
            "useImportedHook(import('./hook.jsx'), undefined, undefined, [[useState, 0]], [])";
        assert!(matches!(
            inject_into(source, &one_slot_manifest()),
            Err(TransformError::MultipleTransformsPerFile(_))
        ));
    }

    #[test]
    fn test_extends_existing_react_import_without_duplicates() {
        let source = "import { useState } from 'react'\nuseImportedHook(import('./hook.jsx'))";
        let out = inject_into(source, &one_slot_manifest()).unwrap();
        assert_eq!(out.matches("useState").count(), 2); // import + tuple
        assert!(out.starts_with("import { useState } from 'react'"), "{}", out);
    }

    #[test]
    fn test_adds_named_imports_to_default_only_import() {
        let source = "import React from 'react'\nuseImportedHook(import('./hook.jsx'))";
        let out = inject_into(source, &one_slot_manifest()).unwrap();
        assert!(
            out.starts_with("import React, { useState } from 'react'"),
            "{}",
            out
        );
    }

    #[test]
    fn test_empty_manifest_injects_empty_arrays_and_no_import() {
        let source = "useImportedHook(import('./hook.jsx'))";
        let out = inject_into(source, &Manifest::new()).unwrap();
        assert!(
            out.contains("useImportedHook(import('./hook.jsx'), undefined, undefined, [], [])"),
            "{}",
            out
        );
        assert!(!out.contains("react"));
    }
}
