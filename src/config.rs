//! Fixed vocabulary shared by the build-time transform and the generated code.

/// Marker token that must appear in the comment immediately preceding the
/// deferred unit's importable declaration.
pub const MARKER_COMMENT: &str = "@__IMPORTABLE_HOOK__";

/// Name of the runtime shim call the consumer file invokes.
pub const SHIM_FUNCTION_NAME: &str = "useImportedHook";

/// Module the injector imports hook primitives from.
pub const PRIMITIVE_MODULE: &str = "react";

/// Synthetic dependency identifier appended to the deferred unit's parameter
/// list and prepended to each of its dependency arrays. The analyzer excludes
/// it when counting dependency arity.
pub const EXTRA_DEPENDENCY_IDENT: &str = "__importableHookAdditionalDependency";

/// Generated parameter through which the loaded implementation receives the
/// stateful slot handles registered by the shim.
pub const INITIAL_STATES_IDENT: &str = "__importableHookInitialStates";
