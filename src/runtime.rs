//! Runtime replay shim
//!
//! The function the consumer executes on every render pass. While the
//! deferred unit is not loaded, it replays the embedded slot manifest with
//! no-op placeholder registrations so the host framework sees the same
//! ordered slot sequence on every pass; once loaded, it delegates to the
//! real implementation. Stateful slots are always registered by the shim
//! itself, pre- and post-load, so their count never changes across the
//! transition.
//!
//! Single-threaded cooperative model: the host serializes passes per
//! instance, so `Rc<RefCell<_>>` is the right ownership shape. The only
//! asynchronous boundary is the load handle's completion callback, which
//! checks the `mounted` flag before touching state.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::manifest::{DependencyArity, StatefulSlot, StatelessSlot};
use crate::static_value::StaticValue;

/// One positional slot registration, as seen by the host framework.
///
/// The host's invariant is that every pass of a component instance performs
/// the same ordered sequence of these.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotRegistration<'a> {
    Stateful {
        primitive: crate::manifest::StatefulPrimitive,
        initial: &'a StaticValue,
    },
    WithDeps {
        primitive: crate::manifest::DepPrimitive,
        /// `None` means no dependency list: the slot re-runs every pass
        deps: Option<Vec<StaticValue>>,
    },
    ImperativeHandle {
        /// Placeholders register with no target
        target_present: bool,
    },
    DebugOnly,
}

/// The host framework's ordered positional slot-registration capability
pub trait SlotHost {
    /// Register the next slot of the current pass. Returns the slot's
    /// retained handle (previous state for stateful slots), `Null` for
    /// everything else.
    fn register(&mut self, slot: SlotRegistration<'_>) -> StaticValue;
}

/// The loaded deferred-unit implementation:
/// `(host, args, syntheticToken, initialStates) -> result`
pub type HookImpl =
    Rc<dyn Fn(&mut dyn SlotHost, &StaticValue, &str, &[StaticValue]) -> StaticValue>;

/// Awaitable handle supplied by the module loader.
///
/// A rejected or never-resolving load is the loader's concern: the shim
/// keeps replaying placeholders forever and never retries.
pub trait LoadHandle {
    /// Subscribe the one-time completion callback
    fn on_ready(self: Box<Self>, ready: Box<dyn FnOnce(HookImpl)>);
}

/// Load state owned by a single component instance, never shared across
/// instances.
#[derive(Default)]
struct LoadState {
    loaded: bool,
    loading: bool,
    implementation: Option<HookImpl>,
    mounted: bool,
}

/// Per-instance replay shim: Unloaded -> Loading -> Loaded
pub struct DeferredHook {
    state: Rc<RefCell<LoadState>>,
}

impl Default for DeferredHook {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferredHook {
    /// Create the shim for one freshly mounted component instance
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(LoadState {
                mounted: true,
                ..LoadState::default()
            })),
        }
    }

    /// Whether the deferred unit has finished loading
    pub fn is_loaded(&self) -> bool {
        self.state.borrow().loaded
    }

    /// Execute one render pass.
    ///
    /// `load` is the deferred-load expression: `None` while the condition
    /// guarding the load is still false. `stateful_slots` and
    /// `stateless_slots` are the embedded manifest partitions.
    pub fn render(
        &self,
        host: &mut dyn SlotHost,
        load: Option<Box<dyn LoadHandle>>,
        args: &StaticValue,
        default_return: &StaticValue,
        stateful_slots: &[StatefulSlot],
        stateless_slots: &[StatelessSlot],
    ) -> StaticValue {
        let has_load = load.is_some();

        // Kick off the load exactly once; redundant passes before the
        // handle resolves must not start a second load.
        if let Some(handle) = load {
            let start = {
                let state = self.state.borrow();
                !state.loaded && !state.loading
            };
            if start {
                self.state.borrow_mut().loading = true;
                let state = Rc::clone(&self.state);
                handle.on_ready(Box::new(move |implementation| {
                    let mut state = state.borrow_mut();
                    // Teardown already happened: stay silent.
                    if !state.mounted {
                        return;
                    }
                    state.implementation = Some(implementation);
                    state.loaded = true;
                    debug!(target: "lazyhook::runtime", "deferred unit loaded");
                }));
            }
        }

        // Stateful slots are registered on every single pass, loaded or
        // not; their handles are collected in manifest order.
        let mut initial_states = Vec::with_capacity(stateful_slots.len());
        for slot in stateful_slots {
            initial_states.push(host.register(SlotRegistration::Stateful {
                primitive: slot.primitive,
                initial: &slot.initial,
            }));
        }

        let loaded = self.state.borrow().loaded;
        // Changes exactly once, on the pass where `loaded` flips; appended
        // to every replayed dependency list to force one re-evaluation
        // across the transition.
        let token = synthetic_token(has_load, loaded);

        if !loaded || !has_load {
            for slot in stateless_slots {
                match slot {
                    StatelessSlot::WithDeps { primitive, arity } => {
                        let deps = match arity {
                            DependencyArity::Count(count) => {
                                let mut deps = Vec::with_capacity(count + 1);
                                deps.push(StaticValue::Str(token.clone()));
                                deps.extend(std::iter::repeat(StaticValue::Null).take(*count));
                                Some(deps)
                            }
                            DependencyArity::EveryPass => None,
                        };
                        host.register(SlotRegistration::WithDeps {
                            primitive: *primitive,
                            deps,
                        });
                    }
                    StatelessSlot::ImperativeHandle => {
                        host.register(SlotRegistration::ImperativeHandle {
                            target_present: false,
                        });
                    }
                    StatelessSlot::DebugOnly => {
                        host.register(SlotRegistration::DebugOnly);
                    }
                }
            }
            return default_return.clone();
        }

        // Loaded: the stateless slots now live inside the implementation,
        // which registers exactly the same number of them.
        let implementation = self
            .state
            .borrow()
            .implementation
            .clone()
            .expect("loaded flag implies a stored implementation");
        implementation(host, args, &token, &initial_states)
    }

    /// Instance teardown: any load completion firing afterwards is a
    /// silent no-op.
    pub fn unmount(&self) {
        self.state.borrow_mut().mounted = false;
    }
}

/// Token derived from `(hasLoadExpression, loaded)`
fn synthetic_token(has_load: bool, loaded: bool) -> String {
    format!("{}{}", has_load, loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{DepPrimitive, StatefulPrimitive};

    /// Records every registration of one pass for order and count checks
    #[derive(Default)]
    struct RecordingHost {
        log: Vec<String>,
    }

    impl SlotHost for RecordingHost {
        fn register(&mut self, slot: SlotRegistration<'_>) -> StaticValue {
            match slot {
                SlotRegistration::Stateful { primitive, initial } => {
                    self.log.push(format!("{}({:?})", primitive.name(), initial));
                    initial.clone()
                }
                SlotRegistration::WithDeps { primitive, deps } => {
                    self.log.push(format!("{}(deps: {:?})", primitive.name(), deps));
                    StaticValue::Null
                }
                SlotRegistration::ImperativeHandle { target_present } => {
                    self.log
                        .push(format!("useImperativeHandle(target: {})", target_present));
                    StaticValue::Null
                }
                SlotRegistration::DebugOnly => {
                    self.log.push("useDebugValue".to_string());
                    StaticValue::Null
                }
            }
        }
    }

    /// Load handle resolvable by hand, standing in for the event loop
    struct ManualLoad {
        slot: Rc<RefCell<Option<Box<dyn FnOnce(HookImpl)>>>>,
    }

    impl ManualLoad {
        fn new() -> (Self, Rc<RefCell<Option<Box<dyn FnOnce(HookImpl)>>>>) {
            let slot = Rc::new(RefCell::new(None));
            (Self { slot: Rc::clone(&slot) }, slot)
        }
    }

    impl LoadHandle for ManualLoad {
        fn on_ready(self: Box<Self>, ready: Box<dyn FnOnce(HookImpl)>) {
            *self.slot.borrow_mut() = Some(ready);
        }
    }

    fn resolve(pending: &Rc<RefCell<Option<Box<dyn FnOnce(HookImpl)>>>>, implementation: HookImpl) {
        let ready = pending.borrow_mut().take().expect("load was subscribed");
        ready(implementation);
    }

    fn slots() -> (Vec<StatefulSlot>, Vec<StatelessSlot>) {
        (
            vec![StatefulSlot {
                primitive: StatefulPrimitive::UseState,
                initial: StaticValue::Number(0.0),
            }],
            vec![StatelessSlot::WithDeps {
                primitive: DepPrimitive::UseEffect,
                arity: DependencyArity::Count(2),
            }],
        )
    }

    #[test]
    fn test_unloaded_pass_replays_placeholders_and_returns_default() {
        let hook = DeferredHook::new();
        let mut host = RecordingHost::default();
        let (stateful, stateless) = slots();

        let result = hook.render(
            &mut host,
            None,
            &StaticValue::Undefined,
            &StaticValue::Str("default".to_string()),
            &stateful,
            &stateless,
        );

        assert_eq!(result, StaticValue::Str("default".to_string()));
        assert_eq!(host.log.len(), 2);
        assert!(host.log[0].starts_with("useState"), "{:?}", host.log);
        assert!(host.log[1].starts_with("useEffect"), "{:?}", host.log);
        // Placeholder deps: token + arity nulls.
        assert!(host.log[1].contains("falsefalse"), "{:?}", host.log);
        assert!(!hook.is_loaded());
    }

    #[test]
    fn test_placeholder_order_is_stable_across_passes() {
        let hook = DeferredHook::new();
        let (stateful, stateless) = slots();
        let mut first = RecordingHost::default();
        let mut second = RecordingHost::default();
        for host in [&mut first, &mut second] {
            hook.render(
                host,
                None,
                &StaticValue::Undefined,
                &StaticValue::Null,
                &stateful,
                &stateless,
            );
        }
        assert_eq!(first.log, second.log);
    }

    #[test]
    fn test_load_transition_delegates_with_initial_states() {
        let hook = DeferredHook::new();
        let (stateful, stateless) = slots();
        let (handle, pending) = ManualLoad::new();

        // Pass 1: load kicked off, still replaying placeholders.
        let mut host = RecordingHost::default();
        let result = hook.render(
            &mut host,
            Some(Box::new(handle)),
            &StaticValue::Str("args".to_string()),
            &StaticValue::Str("default".to_string()),
            &stateful,
            &stateless,
        );
        assert_eq!(result, StaticValue::Str("default".to_string()));
        assert_eq!(host.log.len(), 2);

        // Module arrives; implementation registers its own stateless slot.
        let seen: Rc<RefCell<Vec<(StaticValue, String, Vec<StaticValue>)>>> =
            Rc::new(RefCell::new(Vec::new()));
        let seen_inner = Rc::clone(&seen);
        resolve(
            &pending,
            Rc::new(move |host: &mut dyn SlotHost, args: &StaticValue, token: &str, states: &[StaticValue]| {
                host.register(SlotRegistration::WithDeps {
                    primitive: DepPrimitive::UseEffect,
                    deps: Some(vec![StaticValue::Str(token.to_string())]),
                });
                seen_inner
                    .borrow_mut()
                    .push((args.clone(), token.to_string(), states.to_vec()));
                StaticValue::Str("loaded".to_string())
            }),
        );
        assert!(hook.is_loaded());

        // Pass 2: delegation; slot count per pass is unchanged.
        let (handle2, _pending2) = ManualLoad::new();
        let mut host = RecordingHost::default();
        let result = hook.render(
            &mut host,
            Some(Box::new(handle2)),
            &StaticValue::Str("args".to_string()),
            &StaticValue::Str("default".to_string()),
            &stateful,
            &stateless,
        );
        assert_eq!(result, StaticValue::Str("loaded".to_string()));
        assert_eq!(host.log.len(), 2, "{:?}", host.log);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, StaticValue::Str("args".to_string()));
        assert_eq!(seen[0].1, "truetrue");
        assert_eq!(seen[0].2, vec![StaticValue::Number(0.0)]);
    }

    #[test]
    fn test_synthetic_token_flips_exactly_once() {
        assert_eq!(synthetic_token(false, false), "falsefalse");
        assert_eq!(synthetic_token(true, false), "truefalse");
        assert_eq!(synthetic_token(true, true), "truetrue");
    }

    #[test]
    fn test_load_started_at_most_once() {
        let hook = DeferredHook::new();
        let (stateful, stateless) = slots();
        let (first, first_pending) = ManualLoad::new();
        let (second, second_pending) = ManualLoad::new();
        let mut host = RecordingHost::default();

        for handle in [first, second] {
            hook.render(
                &mut host,
                Some(Box::new(handle)),
                &StaticValue::Undefined,
                &StaticValue::Null,
                &stateful,
                &stateless,
            );
        }

        assert!(first_pending.borrow().is_some());
        // The second handle was never subscribed: the loading latch held.
        assert!(second_pending.borrow().is_none());
    }

    #[test]
    fn test_completion_after_unmount_is_silent() {
        let hook = DeferredHook::new();
        let (stateful, stateless) = slots();
        let (handle, pending) = ManualLoad::new();
        let mut host = RecordingHost::default();

        hook.render(
            &mut host,
            Some(Box::new(handle)),
            &StaticValue::Undefined,
            &StaticValue::Null,
            &stateful,
            &stateless,
        );
        hook.unmount();
        resolve(
            &pending,
            Rc::new(|_: &mut dyn SlotHost, _: &StaticValue, _: &str, _: &[StaticValue]| {
                StaticValue::Null
            }),
        );

        assert!(!hook.is_loaded());
    }

    #[test]
    fn test_no_load_expression_keeps_replaying() {
        // A loaded hook whose guard went falsy again replays placeholders,
        // not the implementation.
        let hook = DeferredHook::new();
        let (stateful, stateless) = slots();
        let (handle, pending) = ManualLoad::new();
        let mut host = RecordingHost::default();
        hook.render(
            &mut host,
            Some(Box::new(handle)),
            &StaticValue::Undefined,
            &StaticValue::Str("default".to_string()),
            &stateful,
            &stateless,
        );
        resolve(
            &pending,
            Rc::new(|_: &mut dyn SlotHost, _: &StaticValue, _: &str, _: &[StaticValue]| {
                StaticValue::Str("loaded".to_string())
            }),
        );

        let mut host = RecordingHost::default();
        let result = hook.render(
            &mut host,
            None,
            &StaticValue::Undefined,
            &StaticValue::Str("default".to_string()),
            &stateful,
            &stateless,
        );
        assert_eq!(result, StaticValue::Str("default".to_string()));
        assert_eq!(host.log.len(), 2);
    }
}
