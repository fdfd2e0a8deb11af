use pencil_engine::backend::{BackendEvent, EventLog, RecordingBackend, ResourceHandle};
use pencil_engine::{
    Backend, DrawError, DrawMode, Mat4, Renderer, RendererConfig, UvRect, Vec2, Vec3,
    Viewport,
};

fn renderer(width: f32, height: f32) -> (Renderer<RecordingBackend>, EventLog) {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let r = Renderer::new(backend, RendererConfig::new(width, height)).expect("renderer");
    log.clear();
    (r, log)
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

// ── end to end ──────────────────────────────────────────────────────────────

#[test]
fn red_rectangle_is_one_draw_of_six_red_vertices() {
    let (mut r, log) = renderer(800.0, 600.0);
    r.set_color(1.0, 0.0, 0.0, 1.0);
    r.rectangle(0.0, 0.0, 100.0, 50.0).unwrap();
    r.flush().unwrap();

    let draws = log.draws();
    assert_eq!(draws.len(), 1);
    let d = &draws[0];
    assert_eq!(d.vertex_count(), 6);
    assert_eq!(d.primitive_count, 2);

    let expected = [
        [0.0, 0.0],
        [100.0, 0.0],
        [100.0, 50.0],
        [0.0, 0.0],
        [100.0, 50.0],
        [0.0, 50.0],
    ];
    for (i, [x, y]) in expected.into_iter().enumerate() {
        assert_eq!(d.position(i), [x, y, 0.0], "vertex {i}");
        assert_eq!(d.color(i), [1.0, 0.0, 0.0, 1.0]);
    }
}

#[test]
fn flush_uploads_ortho_to_both_programs() {
    let (mut r, log) = renderer(800.0, 600.0);
    r.point(1.0, 1.0).unwrap();
    r.flush().unwrap();

    let uploads: Vec<Mat4> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            BackendEvent::MatrixUploaded { matrix, .. } => Some(matrix),
            _ => None,
        })
        .collect();
    assert_eq!(uploads.len(), 2);

    let m = uploads[0].to_cols_array();
    assert!(close(m[0], 0.0025));
    assert!(close(m[5], -2.0 / 600.0));
    assert!(close(m[12], -1.0));
    assert!(close(m[13], 1.0));
    assert_eq!(uploads[0], uploads[1]);
}

// ── flush semantics ─────────────────────────────────────────────────────────

#[test]
fn stream_holds_whole_records_before_flush() {
    let (mut r, _log) = renderer(100.0, 100.0);
    r.rectangle(0.0, 0.0, 1.0, 1.0).unwrap();
    r.circle_with_segments(0.0, 0.0, 5.0, 16).unwrap();
    assert_eq!(r.pending_floats(), (6 + 48) * 7);

    r.textured_quad(0.0, 0.0, 1.0, 1.0).unwrap();
    assert_eq!(r.pending_floats(), 6 * 9);
}

#[test]
fn second_flush_is_a_noop() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.triangle(0.0, 0.0, 1.0, 0.0, 0.0, 1.0).unwrap();
    r.flush().unwrap();
    let after_first = log.events().len();
    r.flush().unwrap();
    assert_eq!(log.events().len(), after_first);
    assert_eq!(r.pending_floats(), 0);
}

#[test]
fn every_mode_change_flushes_once() {
    let (mut r, log) = renderer(100.0, 100.0);
    let z = Vec3::zero();
    let x = Vec3::new(1.0, 0.0, 0.0);
    let y = Vec3::new(0.0, 1.0, 0.0);

    r.rectangle(0.0, 0.0, 1.0, 1.0).unwrap();
    r.textured_quad(0.0, 0.0, 1.0, 1.0).unwrap();
    assert_eq!(log.draw_count(), 1);
    r.triangle_3d(z, x, y).unwrap();
    assert_eq!(log.draw_count(), 2);
    r.textured_triangle_3d([(z, [0.0, 0.0]), (x, [1.0, 0.0]), (y, [0.0, 1.0])])
        .unwrap();
    assert_eq!(log.draw_count(), 3);
    r.point(0.0, 0.0).unwrap();
    assert_eq!(log.draw_count(), 4);
    r.flush().unwrap();

    let strides: Vec<usize> = log.draws().iter().map(|d| d.vertex_stride).collect();
    assert_eq!(strides, vec![7, 9, 7, 9, 7]);
}

#[test]
fn transform_setters_force_exactly_one_flush() {
    let (mut r, log) = renderer(100.0, 100.0);

    r.point(0.0, 0.0).unwrap();
    r.set_ortho_matrix(200.0, 200.0).unwrap();
    assert_eq!(log.draw_count(), 1);

    r.point(0.0, 0.0).unwrap();
    r.set_mvp_matrix(Mat4::IDENTITY.to_cols_array()).unwrap();
    assert_eq!(log.draw_count(), 2);

    r.point(0.0, 0.0).unwrap();
    r.set_view_direction(0.0, 0.0, -1.0).unwrap();
    assert_eq!(log.draw_count(), 3);

    // Idle: nothing to flush.
    r.set_ortho_matrix_with_offset(5.0, 5.0, 10.0, 10.0).unwrap();
    assert_eq!(log.draw_count(), 3);
}

#[test]
fn plain_setters_never_flush() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.point(0.0, 0.0).unwrap();
    r.set_color(0.5, 0.5, 0.5, 1.0);
    r.set_line_width(4.0);
    r.set_wireframe(true);
    r.set_depth(0.25);
    assert_eq!(log.draw_count(), 0);
    assert_eq!(r.state().depth(), 0.25);
}

#[test]
fn geometry_before_ortho_change_uses_old_matrix() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.point(0.0, 0.0).unwrap();
    r.set_ortho_matrix(50.0, 50.0).unwrap();
    r.point(0.0, 0.0).unwrap();
    r.flush().unwrap();

    let firsts: Vec<f32> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            BackendEvent::MatrixUploaded { matrix, .. } => Some(matrix.to_cols_array()[0]),
            _ => None,
        })
        .collect();
    assert_eq!(firsts.len(), 4);
    assert!(close(firsts[0], 2.0 / 100.0));
    assert!(close(firsts[2], 2.0 / 50.0));
}

#[test]
fn clear_does_not_touch_pending_geometry() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.point(0.0, 0.0).unwrap();
    r.clear(0.0, 0.0, 0.0, 1.0).unwrap();
    assert_eq!(r.pending_floats(), 42);
    r.present().unwrap();

    let events = log.events();
    assert!(matches!(events[0], BackendEvent::Cleared(_)));
    assert!(matches!(events.last(), Some(BackendEvent::Presented)));
    assert_eq!(log.draw_count(), 1);
}

/// Destroys the colored program behind the renderer's back so its next
/// flush fails.
fn break_colored_program(r: &mut Renderer<RecordingBackend>, log: &EventLog) {
    let colored = log
        .events()
        .into_iter()
        .find_map(|e| match e {
            BackendEvent::ProgramLinked { handle, label } if label == "colored" => Some(handle),
            _ => None,
        })
        .unwrap();
    r.backend_mut().destroy(colored.into());
}

#[test]
fn backend_failure_still_drains_stream() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut r = Renderer::new(backend, RendererConfig::new(10.0, 10.0)).unwrap();
    break_colored_program(&mut r, &log);

    r.point(0.0, 0.0).unwrap();
    let err = r.flush().unwrap_err();
    assert!(matches!(err, DrawError::UnknownHandle(ResourceHandle::Program(_))));
    assert_eq!(r.pending_floats(), 0);
    assert!(r.flush().is_ok());
}

#[test]
fn transform_setters_apply_even_when_flush_fails() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut r = Renderer::new(backend, RendererConfig::new(100.0, 100.0)).unwrap();
    break_colored_program(&mut r, &log);

    r.point(0.0, 0.0).unwrap();
    assert!(r.set_ortho_matrix(400.0, 300.0).is_err());
    assert_eq!(r.pending_floats(), 0);
    assert_eq!(r.state().viewport(), Viewport::new(400.0, 300.0));

    let mvp = Mat4::translation(1.0, 2.0, 3.0);
    r.point(0.0, 0.0).unwrap();
    assert!(r.set_mvp_matrix(mvp.to_cols_array()).is_err());
    assert_eq!(r.state().mvp_matrix(), mvp);

    r.point(0.0, 0.0).unwrap();
    assert!(r.set_view_direction(0.0, 1.0, 0.0).is_err());
    assert_eq!(r.state().view_direction(), Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn larger_second_flush_in_one_frame_keeps_both_batches() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.point(1.0, 1.0).unwrap();
    r.set_mvp_matrix(Mat4::IDENTITY.to_cols_array()).unwrap();
    for i in 0..200 {
        let x = i as f32 * 0.01;
        r.quad_3d(
            Vec3::new(x, 0.0, 0.0),
            Vec3::new(x + 0.01, 0.0, 0.0),
            Vec3::new(x + 0.01, 0.01, 0.0),
            Vec3::new(x, 0.01, 0.0),
        )
        .unwrap();
    }
    r.present().unwrap();

    let draws = log.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].vertex_count(), 6);
    assert_eq!(draws[0].position(0), [1.0, 1.0, 0.0]);
    assert_eq!(draws[1].vertex_count(), 200 * 6);
    assert!(matches!(log.events().last(), Some(BackendEvent::Presented)));
}

#[test]
fn present_still_swaps_when_flush_fails() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut r = Renderer::new(backend, RendererConfig::new(100.0, 100.0)).unwrap();
    break_colored_program(&mut r, &log);

    r.point(0.0, 0.0).unwrap();
    assert!(r.present().is_err());
    assert!(matches!(log.events().last(), Some(BackendEvent::Presented)));
}

#[test]
fn discard_drops_staged_geometry_without_drawing() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.rectangle(0.0, 0.0, 10.0, 10.0).unwrap();
    assert!(r.pending_floats() > 0);

    r.discard();
    assert_eq!(r.pending_floats(), 0);
    r.flush().unwrap();
    assert_eq!(log.draw_count(), 0);
}

// ── primitives ──────────────────────────────────────────────────────────────

#[test]
fn wireframe_rectangle_is_twenty_four_vertices() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.set_wireframe(true);
    r.set_line_width(2.0);
    r.rectangle(10.0, 10.0, 40.0, 20.0).unwrap();
    r.flush().unwrap();
    assert_eq!(log.draws()[0].vertex_count(), 24);
}

#[test]
fn circle_rim_follows_sin_cos() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.circle_with_segments(0.0, 0.0, 5.0, 16).unwrap();
    r.flush().unwrap();

    let d = &log.draws()[0];
    assert_eq!(d.vertex_count(), 48);
    let step = std::f32::consts::TAU / 16.0;
    for i in 0..16 {
        let rim = d.position(i * 3 + 1);
        let a = step * i as f32;
        assert!(close(rim[0], 5.0 * a.sin()), "x of rim {i}");
        assert!(close(rim[1], 5.0 * a.cos()), "y of rim {i}");
    }
}

#[test]
fn circle_segments_are_clamped_to_three() {
    let (mut r, _log) = renderer(100.0, 100.0);
    r.circle_with_segments(0.0, 0.0, 1.0, 1).unwrap();
    assert_eq!(r.pending_floats(), 3 * 3 * 7);
}

#[test]
fn default_circle_uses_configured_segments() {
    let backend = RecordingBackend::new();
    let config = RendererConfig {
        circle_segments: 8,
        ..RendererConfig::new(10.0, 10.0)
    };
    let mut r = Renderer::new(backend, config).unwrap();
    r.circle(0.0, 0.0, 1.0).unwrap();
    assert_eq!(r.pending_floats(), 8 * 3 * 7);
}

#[test]
fn zero_length_line_emits_nothing() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.line(3.0, 3.0, 3.0, 3.0).unwrap();
    r.flush().unwrap();
    assert_eq!(log.draw_count(), 0);
}

#[test]
fn textured_region_maps_uvs() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.textured_quad_region(0.0, 0.0, 10.0, 10.0, UvRect::new(0.25, 0.5, 0.25, 0.5))
        .unwrap();
    r.flush().unwrap();

    let d = &log.draws()[0];
    let uv = |i: usize| {
        let at = i * d.vertex_stride + 7;
        [d.vertices[at], d.vertices[at + 1]]
    };
    assert_eq!(uv(0), [0.25, 1.0]);
    assert_eq!(uv(1), [0.5, 1.0]);
    assert_eq!(uv(2), [0.5, 0.5]);
    assert_eq!(uv(5), [0.25, 0.5]);
}

#[test]
fn textured_triangle_keeps_corner_order() {
    let (mut r, log) = renderer(100.0, 100.0);
    r.set_depth(0.5);
    r.textured_triangle([
        (Vec2::new(0.0, 0.0), [0.0, 0.0]),
        (Vec2::new(1.0, 0.0), [1.0, 0.0]),
        (Vec2::new(0.0, 1.0), [0.0, 1.0]),
    ])
    .unwrap();
    r.flush().unwrap();
    let d = &log.draws()[0];
    assert_eq!(d.position(1), [1.0, 0.0, 0.5]);
}

#[test]
fn unsupported_wireframe_names_the_mode() {
    let (mut r, _log) = renderer(100.0, 100.0);
    r.set_wireframe(true);
    let err = r
        .triangle_3d(Vec3::zero(), Vec3::zero(), Vec3::zero())
        .unwrap_err();
    assert!(matches!(
        err,
        DrawError::UnsupportedWireframe { mode: DrawMode::ColoredSpatial, .. }
    ));
}

// ── lifetime ────────────────────────────────────────────────────────────────

#[test]
fn shader_failure_fails_construction() {
    let backend = RecordingBackend::new().failing_program("colored");
    let err = Renderer::new(backend, RendererConfig::default()).err();
    assert!(matches!(err, Some(DrawError::Shader { .. })));
}

#[test]
fn drop_destroys_everything_created() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    {
        let mut r = Renderer::new(backend, RendererConfig::default()).unwrap();
        r.create_texture("checker", 2, 2, &[255; 16]).unwrap();
    }
    let destroyed = log.destroyed();
    // two programs, two buffers, the white texture and one user texture
    assert_eq!(destroyed.len(), 6);
    let programs = destroyed
        .iter()
        .filter(|h| matches!(h, ResourceHandle::Program(_)))
        .count();
    assert_eq!(programs, 2);
}

#[test]
fn shutdown_flushes_pending_geometry() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut r = Renderer::new(backend, RendererConfig::default()).unwrap();
    r.point(0.0, 0.0).unwrap();
    r.shutdown().unwrap();
    assert_eq!(log.draw_count(), 1);
    assert_eq!(log.destroyed().len(), 5);
}

#[test]
fn independent_renderers_do_not_share_state() {
    let (mut a, log_a) = renderer(100.0, 100.0);
    let (mut b, log_b) = renderer(100.0, 100.0);
    a.set_color(1.0, 0.0, 0.0, 1.0);
    a.point(0.0, 0.0).unwrap();
    b.point(0.0, 0.0).unwrap();
    a.flush().unwrap();
    b.flush().unwrap();
    assert_eq!(log_a.draws()[0].color(0), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(log_b.draws()[0].color(0), [1.0, 1.0, 1.0, 1.0]);
}
