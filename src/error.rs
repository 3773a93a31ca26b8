//! Transform error taxonomy
//!
//! Every error is a build-time failure, fatal to the transform of the file it
//! was raised for. Errors carry the offending source span so the CLI can
//! point developers at the exact call site; none are retried.

use std::path::PathBuf;

use crate::config::{MARKER_COMMENT, SHIM_FUNCTION_NAME};
use crate::ir::Span;

/// Result type for build-time transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Errors raised by the analyzer, resolver and injector.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformError {
    /// The deferred unit has no declaration tagged with the marker comment.
    NoMarkerFound(PathBuf),
    /// The tagged declaration takes more than one non-synthetic parameter.
    SingleArgumentRequired(Span),
    /// A dependency argument is not an array literal.
    ArrayLiteralRequired(Span),
    /// A dependency array literal contains a spread element.
    NoSpreadAllowed(Span),
    /// The tagged declaration calls a primitive outside the supported set.
    ForbiddenPrimitiveUsed(String, Span),
    /// A stateful primitive's initializer is not a static value.
    NonStaticInitialState(String, Span),
    /// The consumer call has no resolvable deferred-load expression.
    NoDeferredLoadFound(Span),
    /// The consumer call resolves to more than one distinct deferred-load
    /// expression.
    TooManyDeferredLoads(Span),
    /// The resolved deferred-load argument is not a literal path string.
    DeferredLoadPathNotLiteral(Span),
    /// More than one shim call (or an already-injected one) in a single
    /// consumer file.
    MultipleTransformsPerFile(Span),
    /// The source file could not be parsed.
    Parse(String),
    /// A file could not be read.
    Io(PathBuf, String),
    /// The JavaScript grammar could not be loaded into the parser.
    Language(String),
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::NoMarkerFound(path) => write!(
                f,
                "no importable declaration found in '{}': hooks loaded with \
                 {} must carry /* {} */ as a leading comment",
                path.display(),
                SHIM_FUNCTION_NAME,
                MARKER_COMMENT
            ),
            TransformError::SingleArgumentRequired(span) => write!(
                f,
                "{}: an importable hook takes a single argument, e.g. \
                 `function useHook({{a, b}})`, not `function useHook(a, b)`",
                span.start
            ),
            TransformError::ArrayLiteralRequired(span) => write!(
                f,
                "{}: dependencies of an importable hook must be an array \
                 literal, e.g. `[a, b]`, not a variable",
                span.start
            ),
            TransformError::NoSpreadAllowed(span) => write!(
                f,
                "{}: dependencies of an importable hook must not contain a \
                 spread element",
                span.start
            ),
            TransformError::ForbiddenPrimitiveUsed(name, span) => write!(
                f,
                "{}: cannot use '{}' in an importable hook: its registration \
                 cannot be replayed statically",
                span.start, name
            ),
            TransformError::NonStaticInitialState(name, span) => write!(
                f,
                "{}: initial state passed to '{}' must be statically \
                 reconstructible (literals, plain objects and arrays only)",
                span.start, name
            ),
            TransformError::NoDeferredLoadFound(span) => write!(
                f,
                "{}: could not find an `import()` call expression in this \
                 {} call",
                span.start, SHIM_FUNCTION_NAME
            ),
            TransformError::TooManyDeferredLoads(span) => write!(
                f,
                "{}: too many `import()` call expressions in a single {} call",
                span.start, SHIM_FUNCTION_NAME
            ),
            TransformError::DeferredLoadPathNotLiteral(span) => write!(
                f,
                "{}: `import()` path must be a string literal so the bundler \
                 can chunk the deferred unit",
                span.start
            ),
            TransformError::MultipleTransformsPerFile(span) => write!(
                f,
                "{}: only one {} call is supported per file, and a file may \
                 only be transformed once",
                span.start, SHIM_FUNCTION_NAME
            ),
            TransformError::Parse(msg) => write!(f, "{}", msg),
            TransformError::Io(path, err) => {
                write!(f, "failed to read '{}': {}", path.display(), err)
            }
            TransformError::Language(msg) => {
                write!(f, "failed to load JavaScript grammar: {}", msg)
            }
        }
    }
}

impl std::error::Error for TransformError {}
