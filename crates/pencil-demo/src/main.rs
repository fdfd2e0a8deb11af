use std::f32::consts::FRAC_PI_3;

use pencil_engine::device::GpuInit;
use pencil_engine::logging::{init_logging, LoggingConfig};
use pencil_engine::window::{Runtime, RuntimeConfig};
use pencil_engine::{
    App, AppControl, DrawError, FrameCtx, Mat4, TextureHandle, UvRect, Vec2, Vec3, WgpuBackend,
};

const CHECKER_SIZE: u32 = 8;

/// Every primitive family once per frame: colored flat shapes, wireframe,
/// textured quads and a rotating textured cube face in perspective.
#[derive(Default)]
struct Gallery {
    checker: Option<TextureHandle>,
}

/// Two-tone RGBA checkerboard, one texel per cell.
fn checker_pixels(size: u32) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let texel = if (x + y) % 2 == 0 {
                [240, 240, 240, 255]
            } else {
                [40, 90, 200, 255]
            };
            rgba.extend_from_slice(&texel);
        }
    }
    rgba
}

impl Gallery {
    fn checker(
        &mut self,
        renderer: &mut pencil_engine::Renderer<WgpuBackend<'_>>,
    ) -> Result<TextureHandle, DrawError> {
        if let Some(handle) = self.checker {
            return Ok(handle);
        }
        let handle = renderer.create_texture(
            "checker",
            CHECKER_SIZE,
            CHECKER_SIZE,
            &checker_pixels(CHECKER_SIZE),
        )?;
        self.checker = Some(handle);
        Ok(handle)
    }

    fn draw(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<(), DrawError> {
        let (width, height) = ctx.window.size();
        let t = ctx.time.elapsed;
        let checker = self.checker(ctx.renderer)?;
        let r = &mut *ctx.renderer;

        r.clear(0.08, 0.08, 0.1, 1.0)?;
        r.set_ortho_matrix(width, height)?;

        // ── colored flat ──
        r.set_wireframe(false);
        r.set_color(0.9, 0.2, 0.2, 1.0);
        r.rectangle(20.0, 20.0, 120.0, 80.0)?;
        r.set_color(0.2, 0.8, 0.3, 1.0);
        r.triangle(160.0, 100.0, 220.0, 20.0, 280.0, 100.0)?;
        r.set_color(1.0, 0.8, 0.1, 0.8);
        r.circle(350.0, 60.0, 40.0)?;
        r.set_color(1.0, 1.0, 1.0, 1.0);
        r.set_line_width(3.0);
        r.line(20.0, 130.0, 400.0, 130.0 + 20.0 * t.sin())?;
        for i in 0..10 {
            r.point(20.0 + i as f32 * 12.0, 150.0)?;
        }

        // ── wireframe ──
        r.set_wireframe(true);
        r.set_line_width(2.0);
        r.set_color(0.4, 0.8, 1.0, 1.0);
        r.rectangle(20.0, 180.0, 120.0, 80.0)?;
        r.triangle(160.0, 260.0, 220.0, 180.0, 280.0, 260.0)?;
        r.circle_with_segments(350.0, 220.0, 40.0, 6)?;
        r.set_wireframe(false);

        // ── textured flat ──
        r.set_texture(Some(checker))?;
        r.set_color(1.0, 1.0, 1.0, 1.0);
        r.textured_quad(20.0, 290.0, 120.0, 120.0)?;
        r.textured_quad_region(160.0, 290.0, 120.0, 120.0, UvRect::new(0.0, 0.0, 0.5, 0.5))?;
        r.set_color(1.0, 0.6, 0.6, 1.0);
        r.textured_triangle([
            (Vec2::new(300.0, 410.0), [0.0, 0.0]),
            (Vec2::new(420.0, 410.0), [1.0, 0.0]),
            (Vec2::new(360.0, 290.0), [0.5, 1.0]),
        ])?;
        r.flush()?;

        // ── spatial ──
        let aspect = if height > 0.0 { width / height } else { 1.0 };
        let mvp = Mat4::perspective(FRAC_PI_3, aspect, 0.1, 100.0)
            .mul(&Mat4::translation(1.2, 0.0, -4.0))
            .mul(&Mat4::rotation_y(t));
        r.set_mvp_matrix(mvp.to_cols_array())?;

        r.set_color(1.0, 1.0, 1.0, 1.0);
        r.textured_quad_3d([
            (Vec3::new(-0.5, -0.5, 0.5), [0.0, 0.0]),
            (Vec3::new(0.5, -0.5, 0.5), [1.0, 0.0]),
            (Vec3::new(0.5, 0.5, 0.5), [1.0, 1.0]),
            (Vec3::new(-0.5, 0.5, 0.5), [0.0, 1.0]),
        ])?;
        r.set_color(0.9, 0.5, 0.1, 1.0);
        r.quad_3d(
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
        )?;
        r.set_color(0.3, 0.9, 0.6, 1.0);
        r.triangle_3d(
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(-0.5, 0.5, 0.0),
        )?;
        r.set_color(1.0, 1.0, 1.0, 0.7);
        r.textured_triangle_3d([
            (Vec3::new(0.5, -0.5, 0.5), [0.0, 0.0]),
            (Vec3::new(0.5, -0.5, -0.5), [1.0, 0.0]),
            (Vec3::new(0.5, 0.5, 0.0), [0.5, 1.0]),
        ])?;
        r.set_texture(None)?;

        ctx.present()
    }
}

impl App for Gallery {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        match self.draw(ctx) {
            Ok(()) => AppControl::Continue,
            Err(e @ DrawError::Surface(_)) => {
                log::error!("surface lost: {e}");
                AppControl::Exit
            }
            Err(e) => {
                log::warn!("frame {} dropped: {e}", ctx.time.frame_index);
                ctx.discard();
                AppControl::Continue
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());
    log::info!("starting pencil demo");

    Runtime::run(
        RuntimeConfig::new("Pencil Gallery", 820, 560),
        GpuInit::default(),
        Gallery::default(),
    )
}
