//! Bird's-eye-view handler: rasterizes actor bounding boxes around the ego.
//!
//! The image is ego-centric with forward up. The ego origin sits on
//! `ego_row` at column `width / 2`; one pixel spans `obs_range / width`
//! metres. A pixel is filled when its centre lies inside an actor's
//! oriented bounding box.
//!
//! | Channel | Contents |
//! |---------|----------|
//! | 0 | vehicles other than the ego |
//! | 1 | walkers |
//! | 2 | the ego |

use carsight_core::{
    ActorKind, ActorState, ConfigError, Dtype, Fragment, HandlerError, OutputSpec, Transform,
};
use carsight_obs::{EnvState, Handler, HandlerOutput};

use crate::config::BirdeyeConfig;

const FILLED: u8 = 255;

/// Renders surrounding actors as a `(height, width, 3)` byte image.
#[derive(Debug)]
pub struct BirdeyeHandler {
    spec: OutputSpec,
    height: usize,
    width: usize,
    ego_row: usize,
    pixels_per_metre: f64,
}

impl BirdeyeHandler {
    /// Handler kind name.
    pub const NAME: &'static str = "birdeye";

    /// Validate `config`.
    pub fn new(config: &BirdeyeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            spec: OutputSpec::image(config.height, config.width, 3, Dtype::U8),
            height: config.height,
            width: config.width,
            ego_row: config.resolved_ego_row(),
            pixels_per_metre: config.pixels_per_metre(),
        })
    }

    /// Pixel-space `(row, col)` of an ego-frame point, unclamped.
    fn to_pixel(&self, forward: f64, right: f64) -> (f64, f64) {
        (
            self.ego_row as f64 + 0.5 - forward * self.pixels_per_metre,
            (self.width / 2) as f64 + 0.5 + right * self.pixels_per_metre,
        )
    }

    /// Ego-frame `(forward, right)` of a pixel centre.
    fn to_ego(&self, row: usize, col: usize) -> (f64, f64) {
        (
            (self.ego_row as f64 - row as f64) / self.pixels_per_metre,
            (col as f64 - (self.width / 2) as f64) / self.pixels_per_metre,
        )
    }

    /// Fill `actor`'s box into `channel`. Returns whether any pixel was set.
    fn draw(&self, image: &mut [u8], ego: &Transform, actor: &ActorState, channel: usize) -> bool {
        let [hx, hy] = actor.half_extent;
        let t = &actor.transform;
        let (mut r0, mut r1) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut c0, mut c1) = (f64::INFINITY, f64::NEG_INFINITY);
        for (sf, sr) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
            let (wx, wy) = t.to_world(sf * hx, sr * hy);
            let (f, r) = ego.to_local(wx, wy);
            let (row, col) = self.to_pixel(f, r);
            r0 = r0.min(row);
            r1 = r1.max(row);
            c0 = c0.min(col);
            c1 = c1.max(col);
        }
        let rows = r0.floor().max(0.0) as usize..(r1.ceil().min(self.height as f64)).max(0.0) as usize;
        let cols = c0.floor().max(0.0) as usize..(c1.ceil().min(self.width as f64)).max(0.0) as usize;

        let mut drawn = false;
        for row in rows {
            for col in cols.clone() {
                let (f, r) = self.to_ego(row, col);
                let (wx, wy) = ego.to_world(f, r);
                let (lf, lr) = t.to_local(wx, wy);
                if lf.abs() <= hx && lr.abs() <= hy {
                    image[(row * self.width + col) * 3 + channel] = FILLED;
                    drawn = true;
                }
            }
        }
        drawn
    }
}

impl Handler for BirdeyeHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn output_spec(&self) -> Option<&OutputSpec> {
        Some(&self.spec)
    }

    fn get_observation(&mut self, env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
        let ego = env
            .world
            .actor(env.ego)
            .ok_or(HandlerError::MissingActor { id: env.ego })?;
        let mut image = vec![0u8; self.height * self.width * 3];
        let mut drawn = 0i64;
        for actor in env.world.actors() {
            let channel = if actor.id == ego.id {
                2
            } else {
                match actor.kind {
                    ActorKind::Vehicle => 0,
                    ActorKind::Walker => 1,
                    ActorKind::TrafficLight | ActorKind::Other => continue,
                }
            };
            if self.draw(&mut image, &ego.transform, &actor, channel) {
                drawn += 1;
            }
        }
        let fragment = Fragment::from_u8(self.spec.shape.clone(), image)?;
        Ok(HandlerOutput::new(fragment).with_info("birdeye_actors", drawn))
    }
}
