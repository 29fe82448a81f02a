//! Egocentric field-of-view mask.
//!
//! Marks the grid cells inside the agent's forward visibility cone.
//! The agent sits on row `ego_offset` at column `width / 2`, looking
//! towards row 0. For a cell `(y, x)`:
//!
//! - `dx = x - width / 2` is the lateral offset,
//! - `dy = ego_offset - y` is the forward distance.
//!
//! Cells with `dy <= 0` (level with or behind the agent) are never
//! visible. Otherwise the cell is visible iff
//! `|atan2(dx, dy)| < sight_fov / 2` in degrees. The argument order
//! measures the angle from the forward axis; the comparison is strict,
//! so cells exactly on the cone boundary are excluded.
//!
//! The mask depends only on configuration. It is computed once at
//! construction and copied out on every step.

use carsight_core::{ConfigError, Dtype, Fragment, HandlerError, OutputSpec};
use carsight_obs::{EnvState, Handler, HandlerOutput};
use tracing::debug;

use crate::config::MaskConfig;

/// Compute a row-major `height * width` visibility mask of `0.0` / `1.0`.
///
/// Geometry is evaluated in `f64`; only the stored values are `f32`.
pub fn visibility_mask(height: usize, width: usize, sight_fov: f64, ego_offset: usize) -> Vec<f32> {
    let mut mask = vec![0.0f32; height * width];
    let center_x = (width / 2) as i64;
    let half_fov = sight_fov / 2.0;
    for y in 0..height {
        let dy = ego_offset as i64 - y as i64;
        if dy <= 0 {
            continue;
        }
        let row = &mut mask[y * width..(y + 1) * width];
        for (x, cell) in row.iter_mut().enumerate() {
            let dx = x as i64 - center_x;
            let angle = (dx as f64).atan2(dy as f64).to_degrees();
            if angle.abs() < half_fov {
                *cell = 1.0;
            }
        }
    }
    mask
}

/// Static visibility-cone mask, shaped `(height, width, 1)`.
#[derive(Debug)]
pub struct MaskHandler {
    height: usize,
    width: usize,
    sight_fov: f64,
    ego_offset: usize,
    spec: OutputSpec,
    mask: Vec<f32>,
}

impl MaskHandler {
    /// Handler kind name.
    pub const NAME: &'static str = "mask";

    /// Validate `config` and precompute the mask.
    pub fn new(config: &MaskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let ego_offset = config.resolved_ego_offset();
        let mask = visibility_mask(config.height, config.width, config.sight_fov, ego_offset);
        debug!(
            height = config.height,
            width = config.width,
            sight_fov = config.sight_fov,
            ego_offset,
            visible = mask.iter().filter(|&&v| v > 0.0).count(),
            "mask built"
        );
        Ok(Self {
            height: config.height,
            width: config.width,
            sight_fov: config.sight_fov,
            ego_offset,
            spec: OutputSpec::image(config.height, config.width, 1, Dtype::F32),
            mask,
        })
    }

    /// Grid rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Grid columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Cone angle in degrees.
    pub fn sight_fov(&self) -> f64 {
        self.sight_fov
    }

    /// Resolved ego row.
    pub fn ego_offset(&self) -> usize {
        self.ego_offset
    }

    /// Row-major mask values.
    pub fn mask(&self) -> &[f32] {
        &self.mask
    }

    /// Whether cell `(y, x)` is inside the cone. Out-of-grid is `false`.
    pub fn is_visible(&self, y: usize, x: usize) -> bool {
        y < self.height && x < self.width && self.mask[y * self.width + x] > 0.0
    }
}

impl Handler for MaskHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn output_spec(&self) -> Option<&OutputSpec> {
        Some(&self.spec)
    }

    fn get_observation(&mut self, _env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
        let fragment = Fragment::from_f32(self.spec.shape.clone(), self.mask.clone())?;
        Ok(HandlerOutput::new(fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carsight_core::{ActorId, FrameId, Info, Value};
    use carsight_test_utils::MockWorld;
    use proptest::prelude::*;

    fn handler(
        height: usize,
        width: usize,
        sight_fov: f64,
        ego_offset: Option<usize>,
    ) -> MaskHandler {
        MaskHandler::new(&MaskConfig {
            height,
            width,
            sight_fov,
            ego_offset,
        })
        .unwrap()
    }

    fn observe(h: &mut MaskHandler, frame: u64, values: &Info) -> Fragment {
        let world = MockWorld::new();
        let env = EnvState::new(&world, FrameId(frame), ActorId(1), values);
        h.get_observation(&env).unwrap().fragment.unwrap()
    }

    #[test]
    fn three_by_three_ninety_degrees() {
        let mut h = handler(3, 3, 90.0, Some(2));
        let frag = observe(&mut h, 0, &Info::new());
        assert_eq!(frag.shape(), &[3, 3, 1]);
        assert_eq!(frag.dtype(), Dtype::F32);
        // Row 1 sits exactly on the ±45° boundary at dx = ±1.
        assert_eq!(
            frag.as_f32().unwrap(),
            &[
                1.0, 1.0, 1.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0,
            ]
        );
    }

    #[test]
    fn info_is_empty() {
        let mut h = handler(4, 4, 120.0, None);
        let world = MockWorld::new();
        let values = Info::new();
        let env = EnvState::new(&world, FrameId(0), ActorId(1), &values);
        assert!(h.get_observation(&env).unwrap().info.is_empty());
    }

    #[test]
    fn default_offset_is_bottom_row() {
        let h = handler(5, 5, 90.0, None);
        assert_eq!(h.ego_offset(), 4);
        assert!(!h.is_visible(4, 2));
        assert!(h.is_visible(3, 2));
    }

    #[test]
    fn center_uses_floor_for_even_width() {
        // width 4: center_x = 2, so column 2 is straight ahead.
        let h = handler(2, 4, 1.0, Some(1));
        assert_eq!(h.mask(), &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn tiny_fov_sees_only_axis() {
        let h = handler(6, 7, 0.5, None);
        for y in 0..6 {
            for x in 0..7 {
                assert_eq!(h.is_visible(y, x), y < 5 && x == 3, "cell ({y}, {x})");
            }
        }
    }

    #[test]
    fn offset_at_top_row_hides_everything() {
        let h = handler(4, 4, 360.0, Some(0));
        assert!(h.mask().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn one_by_one_grid() {
        let mut h = handler(1, 1, 360.0, None);
        let frag = observe(&mut h, 0, &Info::new());
        assert_eq!(frag.as_f32().unwrap(), &[0.0]);
    }

    #[test]
    fn reset_is_a_noop() {
        let mut h = handler(8, 8, 90.0, None);
        let before = h.mask().to_vec();
        h.reset().unwrap();
        h.reset().unwrap();
        assert_eq!(h.mask(), &before[..]);
    }

    #[test]
    fn fragments_do_not_alias() {
        let mut h = handler(3, 3, 90.0, Some(2));
        let first = observe(&mut h, 0, &Info::new());
        let second = observe(&mut h, 1, &Info::new());
        assert_eq!(first, second);
        assert_ne!(
            first.as_f32().unwrap().as_ptr(),
            second.as_f32().unwrap().as_ptr()
        );
    }

    #[test]
    fn is_visible_out_of_grid_is_false() {
        let h = handler(3, 3, 360.0, None);
        assert!(!h.is_visible(3, 0));
        assert!(!h.is_visible(0, 3));
    }

    fn config_strategy() -> impl Strategy<Value = (usize, usize, f64, usize)> {
        (1usize..24, 1usize..24, 0.01f64..=360.0).prop_flat_map(|(h, w, fov)| {
            (Just(h), Just(w), Just(fov), 0..h)
        })
    }

    proptest! {
        #[test]
        fn values_are_binary_and_shape_fixed((h, w, fov, off) in config_strategy()) {
            let mut handler = handler(h, w, fov, Some(off));
            let frag = observe(&mut handler, 0, &Info::new());
            prop_assert_eq!(frag.shape(), &[h, w, 1][..]);
            prop_assert!(frag.as_f32().unwrap().iter().all(|&v| v == 0.0 || v == 1.0));
        }

        #[test]
        fn independent_of_env_state(
            (h, w, fov, off) in config_strategy(),
            frame in 0u64..1000,
            speed in -50.0f64..50.0,
        ) {
            let mut handler = handler(h, w, fov, Some(off));
            let baseline = observe(&mut handler, 0, &Info::new());
            let mut values = Info::new();
            values.insert("speed".into(), Value::Scalar(speed));
            handler.reset().unwrap();
            let again = observe(&mut handler, frame, &values);
            prop_assert_eq!(baseline, again);
        }

        #[test]
        fn rows_at_or_behind_ego_are_zero((h, w, fov, off) in config_strategy()) {
            let handler = handler(h, w, fov, Some(off));
            for y in off..h {
                for x in 0..w {
                    prop_assert!(!handler.is_visible(y, x));
                }
            }
        }

        #[test]
        fn full_circle_sees_every_cell_ahead(
            (h, w, _fov, off) in config_strategy(),
        ) {
            let handler = handler(h, w, 360.0, Some(off));
            for y in 0..h {
                for x in 0..w {
                    prop_assert_eq!(handler.is_visible(y, x), y < off);
                }
            }
        }

        #[test]
        fn symmetric_about_center_for_odd_width(
            h in 1usize..24,
            half in 0usize..12,
            fov in 0.01f64..=360.0,
        ) {
            let w = 2 * half + 1;
            let handler = handler(h, w, fov, None);
            for y in 0..h {
                for d in 0..=half {
                    prop_assert_eq!(
                        handler.is_visible(y, half - d),
                        handler.is_visible(y, half + d)
                    );
                }
            }
        }

        #[test]
        fn wider_fov_never_hides_cells(
            (h, w, fov, off) in config_strategy(),
            extra in 0.0f64..180.0,
        ) {
            let narrow = handler(h, w, fov, Some(off));
            let wide = handler(h, w, (fov + extra).min(360.0), Some(off));
            for (a, b) in narrow.mask().iter().zip(wide.mask()) {
                prop_assert!(a <= b);
            }
        }
    }
}
