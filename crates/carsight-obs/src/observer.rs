//! The observation composer.
//!
//! [`Observer`] holds handlers in registration order. On reset it
//! resets each one; on every step it calls each exactly once, checks
//! the returned fragment against the handler's declared spec, and
//! gathers fragments by key alongside a merged info map.

use carsight_core::{ConfigError, Fragment, HandlerError, Info, ObserverError, OutputSpec};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::handler::{EnvState, Handler};

/// One step's aggregate observation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepObservation {
    /// Fragments keyed by handler key, in registration order.
    pub observations: IndexMap<String, Fragment>,
    /// Info from every handler, merged last-write-wins.
    pub info: Info,
}

struct Registered {
    key: String,
    handler: Box<dyn Handler>,
}

/// Drives an ordered set of handlers through an episode.
pub struct Observer {
    handlers: Vec<Registered>,
    is_reset: bool,
}

impl Observer {
    /// Register handlers under their observation keys.
    ///
    /// Keys must be non-empty and distinct. Handlers are reset and
    /// observed in the order given.
    pub fn new(handlers: Vec<(String, Box<dyn Handler>)>) -> Result<Self, ConfigError> {
        let mut seen = indexmap::IndexSet::with_capacity(handlers.len());
        for (key, _) in &handlers {
            if key.is_empty() {
                return Err(ConfigError::EmptyKey);
            }
            if !seen.insert(key.as_str()) {
                return Err(ConfigError::DuplicateKey { key: key.clone() });
            }
        }
        let handlers: Vec<Registered> = handlers
            .into_iter()
            .map(|(key, handler)| {
                debug!(key = %key, handler = handler.name(), "registered handler");
                Registered { key, handler }
            })
            .collect();
        Ok(Self {
            handlers,
            is_reset: false,
        })
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|r| r.key.as_str())
    }

    /// Declared spec of every handler that produces a fragment.
    ///
    /// Stable for the observer's lifetime; suitable for building an RL
    /// observation space.
    pub fn observation_space(&self) -> IndexMap<String, OutputSpec> {
        self.handlers
            .iter()
            .filter_map(|r| r.handler.output_spec().map(|s| (r.key.clone(), s.clone())))
            .collect()
    }

    /// Reset every handler for a new episode.
    ///
    /// Stops at the first failure. The observer stays unusable until a
    /// reset completes.
    pub fn reset(&mut self) -> Result<(), ObserverError> {
        self.is_reset = false;
        for r in &mut self.handlers {
            r.handler.reset().map_err(|source| ObserverError::Handler {
                key: r.key.clone(),
                source,
            })?;
            debug!(key = %r.key, "handler reset");
        }
        self.is_reset = true;
        Ok(())
    }

    /// Observe one environment step.
    ///
    /// Calls every handler exactly once. Any handler failure aborts the
    /// step and is returned with the handler's key.
    pub fn observe(&mut self, env: &EnvState<'_>) -> Result<StepObservation, ObserverError> {
        if !self.is_reset {
            return Err(ObserverError::NotReset);
        }
        let mut step = StepObservation::default();
        for r in &mut self.handlers {
            let fail = |source| ObserverError::Handler {
                key: r.key.clone(),
                source,
            };
            let output = r.handler.get_observation(env).map_err(fail)?;
            match (r.handler.output_spec(), output.fragment) {
                (Some(spec), Some(fragment)) => {
                    if fragment.shape() != spec.shape.as_slice() {
                        return Err(fail(HandlerError::ShapeMismatch {
                            expected: spec.shape.clone(),
                            actual: fragment.shape().into(),
                        }));
                    }
                    if fragment.dtype() != spec.dtype {
                        return Err(fail(HandlerError::DtypeMismatch {
                            expected: spec.dtype,
                            actual: fragment.dtype(),
                        }));
                    }
                    step.observations.insert(r.key.clone(), fragment);
                }
                (Some(_), None) => return Err(fail(HandlerError::MissingFragment)),
                (None, Some(_)) => return Err(fail(HandlerError::UnexpectedFragment)),
                (None, None) => {}
            }
            for (k, v) in output.info {
                if step.info.contains_key(&k) {
                    warn!(key = %r.key, info_key = %k, "info key overwritten");
                }
                step.info.insert(k, v);
            }
        }
        trace!(
            frame = %env.frame,
            fragments = step.observations.len(),
            "observation composed"
        );
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carsight_core::{ActorId, Dtype, FrameId, Value};
    use carsight_test_utils::MockWorld;
    use smallvec::smallvec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::handler::HandlerOutput;

    /// Emits a constant vector and counts calls.
    struct Const {
        spec: OutputSpec,
        value: f32,
        calls: Arc<AtomicUsize>,
        resets: Arc<AtomicUsize>,
        info: Option<(&'static str, i64)>,
    }

    impl Const {
        fn new(value: f32) -> Self {
            Self {
                spec: OutputSpec::vector(2, Dtype::F32),
                value,
                calls: Arc::new(AtomicUsize::new(0)),
                resets: Arc::new(AtomicUsize::new(0)),
                info: None,
            }
        }
    }

    impl Handler for Const {
        fn name(&self) -> &str {
            "const"
        }

        fn output_spec(&self) -> Option<&OutputSpec> {
            Some(&self.spec)
        }

        fn reset(&mut self) -> Result<(), HandlerError> {
            self.resets.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn get_observation(&mut self, _env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let frag = Fragment::from_f32(smallvec![2], vec![self.value; 2])?;
            let mut out = HandlerOutput::new(frag);
            if let Some((k, v)) = self.info {
                out = out.with_info(k, v);
            }
            Ok(out)
        }
    }

    /// Returns whatever it is told to, regardless of its spec.
    struct Rogue {
        spec: Option<OutputSpec>,
        emit: Option<Fragment>,
        fail_reset: bool,
    }

    impl Handler for Rogue {
        fn name(&self) -> &str {
            "rogue"
        }

        fn output_spec(&self) -> Option<&OutputSpec> {
            self.spec.as_ref()
        }

        fn reset(&mut self) -> Result<(), HandlerError> {
            if self.fail_reset {
                return Err(HandlerError::MissingValue { key: "x".into() });
            }
            Ok(())
        }

        fn get_observation(&mut self, _env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
            Ok(HandlerOutput {
                fragment: self.emit.clone(),
                info: Info::new(),
            })
        }
    }

    fn boxed(h: impl Handler + 'static) -> Box<dyn Handler> {
        Box::new(h)
    }

    #[test]
    fn rejects_duplicate_and_empty_keys() {
        let dup = Observer::new(vec![
            ("a".into(), boxed(Const::new(0.0))),
            ("a".into(), boxed(Const::new(1.0))),
        ]);
        assert_eq!(
            dup.err(),
            Some(ConfigError::DuplicateKey { key: "a".into() })
        );
        let empty = Observer::new(vec![(String::new(), boxed(Const::new(0.0)))]);
        assert_eq!(empty.err(), Some(ConfigError::EmptyKey));
    }

    #[test]
    fn observe_before_reset_fails() {
        let world = MockWorld::new();
        let values = Info::new();
        let env = EnvState::new(&world, FrameId(1), ActorId(1), &values);
        let mut obs = Observer::new(vec![("a".into(), boxed(Const::new(0.0)))]).unwrap();
        assert_eq!(obs.observe(&env), Err(ObserverError::NotReset));
    }

    #[test]
    fn calls_each_handler_once_per_step_in_order() {
        let a = Const::new(1.0);
        let b = Const::new(2.0);
        let (a_calls, b_calls) = (a.calls.clone(), b.calls.clone());
        let (a_resets, b_resets) = (a.resets.clone(), b.resets.clone());
        let mut obs =
            Observer::new(vec![("b".into(), boxed(b)), ("a".into(), boxed(a))]).unwrap();
        obs.reset().unwrap();
        assert_eq!(a_resets.load(Ordering::Relaxed), 1);
        assert_eq!(b_resets.load(Ordering::Relaxed), 1);

        let world = MockWorld::new();
        let values = Info::new();
        for frame in 1..=3 {
            let env = EnvState::new(&world, FrameId(frame), ActorId(1), &values);
            let step = obs.observe(&env).unwrap();
            let keys: Vec<&str> = step.observations.keys().map(String::as_str).collect();
            assert_eq!(keys, ["b", "a"]);
            assert_eq!(step.observations["a"].as_f32(), Some(&[1.0, 1.0][..]));
        }
        assert_eq!(a_calls.load(Ordering::Relaxed), 3);
        assert_eq!(b_calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn info_merge_last_write_wins() {
        let mut first = Const::new(0.0);
        first.info = Some(("lane", 1));
        let mut second = Const::new(0.0);
        second.info = Some(("lane", 2));
        let mut obs =
            Observer::new(vec![("x".into(), boxed(first)), ("y".into(), boxed(second))]).unwrap();
        obs.reset().unwrap();
        let world = MockWorld::new();
        let values = Info::new();
        let env = EnvState::new(&world, FrameId(1), ActorId(1), &values);
        let step = obs.observe(&env).unwrap();
        assert_eq!(step.info["lane"], Value::Int(2));
    }

    #[test]
    fn shape_mismatch_is_fatal() {
        let rogue = Rogue {
            spec: Some(OutputSpec::vector(3, Dtype::F32)),
            emit: Some(Fragment::from_f32(smallvec![2], vec![0.0; 2]).unwrap()),
            fail_reset: false,
        };
        let mut obs = Observer::new(vec![("r".into(), boxed(rogue))]).unwrap();
        obs.reset().unwrap();
        let world = MockWorld::new();
        let values = Info::new();
        let env = EnvState::new(&world, FrameId(1), ActorId(1), &values);
        assert_eq!(
            obs.observe(&env),
            Err(ObserverError::Handler {
                key: "r".into(),
                source: HandlerError::ShapeMismatch {
                    expected: smallvec![3],
                    actual: smallvec![2],
                },
            })
        );
    }

    #[test]
    fn dtype_mismatch_is_fatal() {
        let rogue = Rogue {
            spec: Some(OutputSpec::vector(2, Dtype::U8)),
            emit: Some(Fragment::from_f32(smallvec![2], vec![0.0; 2]).unwrap()),
            fail_reset: false,
        };
        let mut obs = Observer::new(vec![("r".into(), boxed(rogue))]).unwrap();
        obs.reset().unwrap();
        let world = MockWorld::new();
        let values = Info::new();
        let env = EnvState::new(&world, FrameId(1), ActorId(1), &values);
        assert_eq!(
            obs.observe(&env),
            Err(ObserverError::Handler {
                key: "r".into(),
                source: HandlerError::DtypeMismatch {
                    expected: Dtype::U8,
                    actual: Dtype::F32,
                },
            })
        );
    }

    #[test]
    fn fragment_presence_must_match_declaration() {
        let world = MockWorld::new();
        let values = Info::new();
        let env = EnvState::new(&world, FrameId(1), ActorId(1), &values);

        let missing = Rogue {
            spec: Some(OutputSpec::vector(1, Dtype::F32)),
            emit: None,
            fail_reset: false,
        };
        let mut obs = Observer::new(vec![("m".into(), boxed(missing))]).unwrap();
        obs.reset().unwrap();
        assert!(matches!(
            obs.observe(&env),
            Err(ObserverError::Handler {
                source: HandlerError::MissingFragment,
                ..
            })
        ));

        let unexpected = Rogue {
            spec: None,
            emit: Some(Fragment::from_f32(smallvec![1], vec![0.0]).unwrap()),
            fail_reset: false,
        };
        let mut obs = Observer::new(vec![("u".into(), boxed(unexpected))]).unwrap();
        obs.reset().unwrap();
        assert!(matches!(
            obs.observe(&env),
            Err(ObserverError::Handler {
                source: HandlerError::UnexpectedFragment,
                ..
            })
        ));
    }

    #[test]
    fn failed_reset_blocks_observe() {
        let bad = Rogue {
            spec: None,
            emit: None,
            fail_reset: true,
        };
        let mut obs = Observer::new(vec![("bad".into(), boxed(bad))]).unwrap();
        assert!(matches!(
            obs.reset(),
            Err(ObserverError::Handler { ref key, .. }) if key == "bad"
        ));
        let world = MockWorld::new();
        let values = Info::new();
        let env = EnvState::new(&world, FrameId(1), ActorId(1), &values);
        assert_eq!(obs.observe(&env), Err(ObserverError::NotReset));
    }

    #[test]
    fn observation_space_skips_side_effect_handlers() {
        let silent = Rogue {
            spec: None,
            emit: None,
            fail_reset: false,
        };
        let obs = Observer::new(vec![
            ("spectator".into(), boxed(silent)),
            ("vec".into(), boxed(Const::new(0.0))),
        ])
        .unwrap();
        let space = obs.observation_space();
        assert_eq!(space.len(), 1);
        assert_eq!(space["vec"], OutputSpec::vector(2, Dtype::F32));
        assert_eq!(obs.keys().collect::<Vec<_>>(), ["spectator", "vec"]);
        assert_eq!(obs.len(), 2);
    }
}
