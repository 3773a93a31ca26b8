//! Call-site resolver
//!
//! Finds the single deferred-load expression (a dynamic `import()` call) a
//! shim call depends on, tolerating indirection at the call site: wrapping
//! functions, promise chains, and conditional or logical guards. Exactly one
//! distinct candidate must exist; the same node reached through two unwrap
//! rules counts once.

use std::collections::HashSet;

use tracing::trace;
use tree_sitter::Node;

use crate::error::{TransformError, TransformResult};
use crate::ir::Span;
use crate::tree_sitter_parser::{node_span, node_text, string_literal_value};

/// The deferred-load expression a shim call resolves to
#[derive(Debug, Clone)]
pub struct ResolvedLoad {
    /// Literal path of the deferred unit
    pub path: String,
    /// Span of the `import()` path argument
    pub path_span: Span,
}

struct Search<'t, 's> {
    root: Node<'t>,
    source: &'s str,
    shim_span: Span,
    /// Candidate `import()` path argument, keyed by byte range for
    /// distinctness
    candidate: Option<Node<'t>>,
    /// Declarations already entered, by byte range
    visited: HashSet<(usize, usize)>,
}

/// Resolve the deferred-load path of a shim call.
///
/// `root` is the consumer file's program node; local bindings are resolved
/// against it.
pub fn resolve_load_path<'t>(
    shim_call: Node<'t>,
    root: Node<'t>,
    source: &str,
) -> TransformResult<ResolvedLoad> {
    let mut search = Search {
        root,
        source,
        shim_span: node_span(shim_call),
        candidate: None,
        visited: HashSet::new(),
    };

    search.walk(shim_call)?;

    let Some(argument) = search.candidate else {
        return Err(TransformError::NoDeferredLoadFound(search.shim_span));
    };
    let path_span = node_span(argument);
    let path = string_literal_value(argument, source)
        .ok_or(TransformError::DeferredLoadPathNotLiteral(path_span))?;

    trace!(target: "lazyhook::resolver", path = %path, "resolved deferred-load expression");
    Ok(ResolvedLoad { path, path_span })
}

impl<'t> Search<'t, '_> {
    /// Pre-order walk collecting deferred-load candidates
    fn walk(&mut self, node: Node<'t>) -> TransformResult<()> {
        match node.kind() {
            "call_expression" => {
                if let Some(argument) = find_import_argument(node) {
                    self.record(argument)?;
                }
            }
            "identifier" => {
                if let Some(declaration) = self.resolve_binding(node_text(node, self.source)) {
                    let range = (declaration.start_byte(), declaration.end_byte());
                    if self.visited.insert(range) {
                        self.walk(declaration)?;
                    }
                }
            }
            _ => {}
        }
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                self.walk(child)?;
            }
        }
        Ok(())
    }

    fn record(&mut self, argument: Node<'t>) -> TransformResult<()> {
        if let Some(existing) = self.candidate {
            let same = existing.start_byte() == argument.start_byte()
                && existing.end_byte() == argument.end_byte();
            if !same {
                return Err(TransformError::TooManyDeferredLoads(self.shim_span));
            }
            return Ok(());
        }
        self.candidate = Some(argument);
        Ok(())
    }

    /// Resolve an identifier to a file-local function declaration or
    /// variable declarator of the same name.
    fn resolve_binding(&self, name: &str) -> Option<Node<'t>> {
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            let declares = match node.kind() {
                "function_declaration" | "variable_declarator" => node
                    .child_by_field_name("name")
                    .is_some_and(|n| n.kind() == "identifier" && node_text(n, self.source) == name),
                _ => false,
            };
            if declares {
                return Some(node);
            }
            for i in (0..node.named_child_count()).rev() {
                if let Some(child) = node.named_child(i) {
                    stack.push(child);
                }
            }
        }
        None
    }
}

/// If this call (or its callee/object chain) is a dynamic import, return the
/// path argument.
fn find_import_argument(node: Node) -> Option<Node> {
    if node.kind() == "call_expression" {
        let callee = node.child_by_field_name("function")?;
        if callee.kind() == "import" {
            let arguments = node.child_by_field_name("arguments")?;
            let mut cursor = arguments.walk();
            return arguments.named_children(&mut cursor).next();
        }
        return find_import_argument(callee);
    }
    if node.kind() == "member_expression" {
        return find_import_argument(node.child_by_field_name("object")?);
    }
    if node.kind() == "parenthesized_expression" {
        return find_import_argument(node.named_child(0)?);
    }
    None
}
