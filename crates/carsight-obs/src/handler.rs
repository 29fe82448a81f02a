//! The [`Handler`] trait, its per-step input and its output.

use carsight_core::{ActorId, Fragment, FrameId, HandlerError, Info, OutputSpec, Value, World};

/// Everything a handler may look at during one environment step.
///
/// Borrowed for the duration of the call only. Handlers must copy out
/// whatever they need rather than keep references into the world.
pub struct EnvState<'a> {
    /// Live simulator.
    pub world: &'a dyn World,
    /// Frame the environment just ticked to.
    pub frame: FrameId,
    /// Agent-controlled actor.
    pub ego: ActorId,
    /// Task-level values published by the environment (speed, route
    /// progress, commands, ...).
    pub values: &'a Info,
}

impl<'a> EnvState<'a> {
    /// Bundle one step's state.
    pub fn new(world: &'a dyn World, frame: FrameId, ego: ActorId, values: &'a Info) -> Self {
        Self {
            world,
            frame,
            ego,
            values,
        }
    }

    /// Look up an environment value by key.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Look up an environment value, failing with [`HandlerError::MissingValue`].
    pub fn require(&self, key: &str) -> Result<&Value, HandlerError> {
        self.value(key).ok_or_else(|| HandlerError::MissingValue {
            key: key.to_string(),
        })
    }
}

/// What a handler returns for one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandlerOutput {
    /// The observation array, present iff the handler declares an
    /// [`OutputSpec`].
    pub fragment: Option<Fragment>,
    /// Auxiliary metadata, merged into the step's info.
    pub info: Info,
}

impl HandlerOutput {
    /// No fragment, no info.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A fragment with empty info.
    pub fn new(fragment: Fragment) -> Self {
        Self {
            fragment: Some(fragment),
            info: Info::new(),
        }
    }

    /// Add one info entry.
    pub fn with_info(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.info.insert(key.to_string(), value.into());
        self
    }
}

/// A component producing one named observation fragment per step.
///
/// # Contract
///
/// - Construction validates configuration; a built handler is ready to
///   observe.
/// - [`reset`](Handler::reset) clears per-episode state. It must be safe
///   to call any number of times, including zero, before the first
///   [`get_observation`](Handler::get_observation).
/// - `get_observation` returns a fragment conforming to
///   [`output_spec`](Handler::output_spec), or no fragment when the spec
///   is `None`. The fragment is freshly allocated every call.
/// - Handlers own their state exclusively; calls are sequential.
///
/// # Object safety
///
/// The observer stores handlers as `Box<dyn Handler>`.
///
/// # Examples
///
/// A handler publishing the ego speed as a one-element vector:
///
/// ```
/// use carsight_core::{Dtype, Fragment, HandlerError, OutputSpec};
/// use carsight_obs::{EnvState, Handler, HandlerOutput};
///
/// struct Speed {
///     spec: OutputSpec,
/// }
///
/// impl Handler for Speed {
///     fn name(&self) -> &str { "speed" }
///
///     fn output_spec(&self) -> Option<&OutputSpec> { Some(&self.spec) }
///
///     fn get_observation(&mut self, env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
///         let speed = env
///             .world
///             .actor(env.ego)
///             .ok_or(HandlerError::MissingActor { id: env.ego })?
///             .speed;
///         Ok(HandlerOutput::new(Fragment::from_f32(self.spec.shape.clone(), vec![speed as f32])?))
///     }
/// }
///
/// let h = Speed { spec: OutputSpec::vector(1, Dtype::F32) };
/// assert_eq!(h.name(), "speed");
/// ```
pub trait Handler: Send {
    /// Handler kind, for logs and error reports.
    fn name(&self) -> &str;

    /// Declared fragment shape and dtype, or `None` for handlers that
    /// only produce side effects or info.
    fn output_spec(&self) -> Option<&OutputSpec>;

    /// Clear per-episode state.
    ///
    /// Default: no-op.
    fn reset(&mut self) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Produce this step's fragment and info.
    fn get_observation(&mut self, env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError>;
}
