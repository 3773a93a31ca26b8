/// lazyhook - deferred hook transform and replay library
///
/// This library lets a component defer loading a custom hook behind a
/// dynamic `import()` without breaking the host framework's invariant that
/// every render pass registers the same ordered sequence of hook slots.
///
/// # Architecture
///
/// The build-time pipeline runs over one file at a time:
///
/// 1. **Parsing** (`tree_sitter_parser` module)
///    - Parses JavaScript/JSX with Tree-Sitter
///    - Reports the first syntax error with source location
///
/// 2. **Analysis** (`analyzer` module)
///    - Locates the declaration tagged with the marker comment
///    - Classifies every primitive call into an ordered slot manifest
///    - Rejects anything that cannot be statically replayed
///
/// 3. **Resolution** (`resolver` module)
///    - Finds the single `import()` expression a shim call depends on,
///      through wrapping functions, promise chains and conditional guards
///
/// 4. **Injection** (`injector` module)
///    - Embeds the manifest as literal slot arrays in the shim call
///    - Manages the primitive imports at module scope
///
/// 5. **Unit rewriting** (`unit_rewriter` module)
///    - Generates the deferred unit's loading contract:
///      `(args, syntheticToken, initialStates)`
///
/// At runtime, the `runtime` module's replay shim consumes the embedded
/// manifest: placeholder registrations while the unit is not loaded,
/// delegation once it is, with an identical slot count either way.
///
/// # Example
///
/// ```rust
/// use lazyhook::analyzer::analyze_source;
/// use std::path::Path;
///
/// let source = r#"
/// /* @__IMPORTABLE_HOOK__ */
/// export default function useCustomHook({ a }) {
///   const [count, setCount] = useState(0)
///   useEffect(() => {}, [a])
///   return count
/// }
/// "#;
///
/// let manifest = analyze_source(source, Path::new("useCustomHook.jsx")).unwrap();
/// assert_eq!(manifest.len(), 2);
/// ```
pub mod analyzer;
pub mod config;
pub mod error;
pub mod injector;
pub mod ir;
pub mod manifest;
pub mod resolver;
pub mod runtime;
pub mod static_value;
pub mod transform;
pub mod tree_sitter_parser;
pub mod unit_rewriter;

pub use error::{TransformError, TransformResult};
pub use ir::{Position, Span};
pub use manifest::{Manifest, SlotDescriptor, SlotKind};
pub use static_value::StaticValue;
pub use transform::{transform_consumer, transform_file, transform_unit, TransformContext};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_analyze_simple_unit() {
        let source = r#"
/* @__IMPORTABLE_HOOK__ */
export default function useHook() {
  useEffect(() => {}, [])
}
"#;
        let manifest = analyzer::analyze_source(source, Path::new("hook.jsx")).unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_invalid_syntax_is_a_parse_error() {
        let result = analyzer::analyze_source("function (((", Path::new("hook.jsx"));
        assert!(matches!(result, Err(TransformError::Parse(_))));
    }
}
