//! Compositing of rotated windows with the GLES renderer.
//!
//! Each toplevel is drawn into the axis-aligned bounding box of its rotated
//! body. A custom texture shader walks every fragment of that box back into
//! window space and samples the client buffer there, discarding whatever
//! falls outside the window rectangle.

use crate::physics::Pose;
use crate::state::GravState;
use smithay::{
    backend::renderer::{
        gles::{GlesError, GlesRenderer, GlesTarget, GlesTexProgram, Uniform, UniformName, UniformType},
        utils::{import_surface_tree, with_renderer_surface_state},
        Color32F, Frame, Renderer, Texture,
    },
    output::Output,
    utils::{Logical, Physical, Point, Rectangle, Size, Transform},
};
use tracing::{trace, warn};

const ROTATED_TEXTURE_SHADER: &str = r#"
#version 100

//_DEFINES_

#if defined(EXTERNAL)
#extension GL_OES_EGL_image_external : require
#endif

precision mediump float;
#if defined(EXTERNAL)
uniform samplerExternalOES tex;
#else
uniform sampler2D tex;
#endif

uniform float alpha;
varying vec2 v_coords;

uniform float angle;
uniform vec2 bbox_size;
uniform vec2 win_size;

#if defined(DEBUG_FLAGS)
uniform float tint;
#endif

void main() {
    vec2 d = v_coords * bbox_size - bbox_size * 0.5;
    float s = sin(angle);
    float c = cos(angle);
    vec2 local = vec2(c * d.x + s * d.y, -s * d.x + c * d.y) + win_size * 0.5;
    if (local.x < 0.0 || local.y < 0.0 || local.x >= win_size.x || local.y >= win_size.y) {
        discard;
    }

    vec4 color = texture2D(tex, local / win_size);
#if defined(NO_ALPHA)
    color = vec4(color.rgb, 1.0) * alpha;
#else
    color = color * alpha;
#endif

#if defined(DEBUG_FLAGS)
    if (tint == 1.0)
        color = vec4(0.0, 0.3, 0.0, 0.2) + color * 0.8;
#endif

    gl_FragColor = color;
}
"#;

/// Where and how one window lands on an output, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawGeometry {
    /// Bounding box of the rotated window; the shader draws into this.
    pub dest: Rectangle<i32, Physical>,
    /// The window without rotation, centred on the same point. Used when
    /// the rotation shader is unavailable.
    pub upright: Rectangle<i32, Physical>,
    pub angle: f32,
    pub bbox_size: (f32, f32),
    pub win_size: (f32, f32),
}

/// Compute the draw rectangles and shader uniforms for a window of `size`
/// at `pose` on an output whose top-left corner sits at `output_origin`.
pub fn window_draw_geometry(
    pose: Pose,
    size: Size<i32, Logical>,
    output_origin: Point<i32, Logical>,
    scale: f64,
) -> DrawGeometry {
    let (w, h) = (f64::from(size.w), f64::from(size.h));
    let bb = pose.bounding_box(size.w as f32, size.h as f32);
    let ox = f64::from(output_origin.x);
    let oy = f64::from(output_origin.y);

    let to_physical = |x: f64, y: f64, w: f64, h: f64| -> Rectangle<i32, Physical> {
        Rectangle::new(
            Point::from((((x - ox) * scale).round() as i32, ((y - oy) * scale).round() as i32)),
            Size::from(((w * scale).round() as i32, (h * scale).round() as i32)),
        )
    };

    let dest = to_physical(
        f64::from(bb.min_x),
        f64::from(bb.min_y),
        f64::from(bb.width()),
        f64::from(bb.height()),
    );
    let upright = to_physical(
        f64::from(pose.x) - w / 2.0,
        f64::from(pose.y) - h / 2.0,
        w,
        h,
    );

    DrawGeometry {
        dest,
        upright,
        angle: pose.angle,
        bbox_size: (dest.size.w as f32, dest.size.h as f32),
        win_size: ((w * scale) as f32, (h * scale) as f32),
    }
}

/// Draws the mapped toplevels of a [`GravState`] onto an output.
#[derive(Default)]
pub struct WindowRenderer {
    program: Option<GlesTexProgram>,
    compile_failed: bool,
}

impl WindowRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_program(&mut self, renderer: &mut GlesRenderer) {
        if self.program.is_some() || self.compile_failed {
            return;
        }
        match renderer.compile_custom_texture_shader(
            ROTATED_TEXTURE_SHADER,
            &[
                UniformName::new("angle", UniformType::_1f),
                UniformName::new("bbox_size", UniformType::_2f),
                UniformName::new("win_size", UniformType::_2f),
            ],
        ) {
            Ok(program) => self.program = Some(program),
            Err(e) => {
                warn!("rotation shader failed to compile, drawing windows upright: {}", e);
                self.compile_failed = true;
            }
        }
    }

    /// Clear `output` and draw every mapped toplevel bottom to top, then
    /// send frame callbacks.
    pub fn render_output(
        &mut self,
        renderer: &mut GlesRenderer,
        framebuffer: &mut GlesTarget<'_>,
        output_size: Size<i32, Physical>,
        state: &GravState,
        output: &Output,
    ) -> Result<(), GlesError> {
        self.ensure_program(renderer);

        let origin = state
            .space
            .output_geometry(output)
            .map(|geo| geo.loc)
            .unwrap_or_default();
        let scale = output.current_scale().fractional_scale();
        let context = renderer.context_id();

        let mut draws = Vec::new();
        for (toplevel, pose) in state.visible_toplevels() {
            let (Some(surface), Some(size)) = (toplevel.wl_surface(), toplevel.sim.size) else {
                continue;
            };
            if let Err(e) = import_surface_tree(renderer, surface) {
                warn!(id = toplevel.id, "failed to import surface: {}", e);
                continue;
            }
            let Some(texture) =
                with_renderer_surface_state(surface, |s| s.texture(context.clone()).cloned()).flatten()
            else {
                continue;
            };
            draws.push((texture, window_draw_geometry(pose, size, origin, scale)));
        }

        let full = Rectangle::from_size(output_size);
        let mut frame = renderer.render(framebuffer, output_size, Transform::Flipped180)?;
        frame.clear(Color32F::new(0.0, 0.0, 0.0, 1.0), &[full])?;

        // Damage rectangles are relative to the destination.
        for (texture, geo) in &draws {
            let src = Rectangle::from_size(texture.size().to_f64());
            match self.program.as_ref() {
                Some(program) => {
                    let uniforms = [
                        Uniform::new("angle", geo.angle),
                        Uniform::new("bbox_size", geo.bbox_size),
                        Uniform::new("win_size", geo.win_size),
                    ];
                    frame.render_texture_from_to(
                        texture,
                        src,
                        geo.dest,
                        &[Rectangle::from_size(geo.dest.size)],
                        &[],
                        Transform::Normal,
                        1.0,
                        Some(program),
                        &uniforms,
                    )?;
                }
                None => {
                    frame.render_texture_from_to(
                        texture,
                        src,
                        geo.upright,
                        &[Rectangle::from_size(geo.upright.size)],
                        &[],
                        Transform::Normal,
                        1.0,
                        None,
                        &[],
                    )?;
                }
            }
        }
        let _ = frame.finish()?;
        trace!(output = output.name(), windows = draws.len(), "frame rendered");

        state.send_frame_callbacks(output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn pose(x: f32, y: f32, angle: f32) -> Pose {
        Pose { x, y, angle }
    }

    #[test]
    fn test_upright_window_fills_its_bbox() {
        let geo = window_draw_geometry(pose(100.0, 200.0, 0.0), Size::from((50, 20)), Point::from((0, 0)), 1.0);
        assert_eq!(geo.dest, Rectangle::new(Point::from((75, 190)), Size::from((50, 20))));
        assert_eq!(geo.upright, geo.dest);
        assert_eq!(geo.bbox_size, (50.0, 20.0));
        assert_eq!(geo.win_size, (50.0, 20.0));
    }

    #[test]
    fn test_quarter_turn_swaps_bbox_axes() {
        let geo = window_draw_geometry(pose(100.0, 200.0, FRAC_PI_2), Size::from((50, 20)), Point::from((0, 0)), 1.0);
        assert_eq!(geo.dest.size, Size::from((20, 50)));
        assert_eq!(geo.dest.loc, Point::from((90, 175)));
        assert_eq!(geo.upright.size, Size::from((50, 20)));
        assert_eq!(geo.win_size, (50.0, 20.0));
        assert!((geo.angle - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_second_output_offset_and_scale() {
        let geo = window_draw_geometry(pose(2000.0, 100.0, 0.0), Size::from((100, 100)), Point::from((1920, 0)), 2.0);
        assert_eq!(geo.dest.loc, Point::from((60, 100)));
        assert_eq!(geo.dest.size, Size::from((200, 200)));
        assert_eq!(geo.win_size, (200.0, 200.0));
    }

    #[test]
    fn test_tilted_bbox_is_larger_than_window() {
        let geo = window_draw_geometry(pose(500.0, 500.0, 0.3), Size::from((200, 100)), Point::from((0, 0)), 1.0);
        assert!(geo.dest.size.w > 200);
        assert!(geo.dest.size.h > 100);
        let center_x = geo.dest.loc.x + geo.dest.size.w / 2;
        assert!((center_x - 500).abs() <= 1);
    }
}
