//! Render context lifecycle tests on the headless backend.

use videosprite::resources::gpu::headless::{GpuCall, HeadlessBackend};
use videosprite::resources::gpu::{
    Binding, DisplayRect, GpuBackend, GpuResource, GpuScope, ShaderStage, TextureFilter,
    TextureWrap,
};
use videosprite::resources::rendercontext::{
    QUAD_SCALE, QUAD_STRIP, RenderContext, RenderError, RenderSettings,
};
use videosprite::resources::uploadstats::UploadStats;
use videosprite::resources::videosource::testpattern::TestPatternSource;
use videosprite::resources::videosource::{VideoFrame, VideoSourceSettings};
use videosprite::systems::upload::{UploadOutcome, upload_frame};

fn settings() -> RenderSettings {
    RenderSettings {
        surface_width: 1280,
        surface_height: 720,
        texture_width: 320,
        texture_height: 180,
        flip_y: false,
    }
}

fn source_settings(autoplay: bool) -> VideoSourceSettings {
    VideoSourceSettings {
        url: String::new(),
        autoplay,
        controls: false,
        cross_origin: String::new(),
        width: 320,
        height: 180,
    }
}

#[test]
fn initialize_creates_four_objects_with_expected_state() {
    let backend = HeadlessBackend::recording();
    let gpu_log = backend.log();
    let mut ctx = RenderContext::new(backend);

    ctx.initialize(&settings()).unwrap();

    assert!(ctx.is_initialized());
    assert_eq!(ctx.texture_size(), Some((320, 180)));
    assert_eq!(ctx.surface_size(), Some((1280, 720)));
    assert_eq!(gpu_log.live(), 4);

    let calls = gpu_log.calls();
    assert!(calls.contains(&GpuCall::SetUniformVec4 {
        program: match calls[1] {
            GpuCall::CreateProgram { id } => id,
            ref other => panic!("expected program creation, got {:?}", other),
        },
        name: "uScale".to_string(),
        value: QUAD_SCALE,
    }));
    assert!(calls.iter().any(|c| matches!(
        c,
        GpuCall::SetUniformSampler { unit: 0, name, .. } if name == "texture0"
    )));
    assert!(calls.iter().any(|c| matches!(
        c,
        GpuCall::CreateVertexBuffer { vertices, .. } if vertices.as_slice() == QUAD_STRIP
    )));
    assert!(calls.iter().any(|c| matches!(
        c,
        GpuCall::CreateTexture { desc, .. }
            if desc.filter == TextureFilter::Linear && desc.wrap == TextureWrap::ClampToEdge
    )));
    // the uniform scope is closed before the texture is created
    let quad = calls
        .iter()
        .position(|c| matches!(c, GpuCall::CreateVertexBuffer { .. }))
        .unwrap();
    assert_eq!(calls[quad + 1], GpuCall::RestoreDefaults);
    assert!(matches!(calls.last(), Some(GpuCall::CreateTexture { .. })));
}

#[test]
fn second_initialize_is_rejected_without_new_objects() {
    let backend = HeadlessBackend::new();
    let gpu_log = backend.log();
    let mut ctx = RenderContext::new(backend);
    ctx.initialize(&settings()).unwrap();
    let created = gpu_log.created();

    assert_eq!(
        ctx.initialize(&settings()),
        Err(RenderError::AlreadyInitialized)
    );
    assert_eq!(gpu_log.created(), created);
    assert_eq!(gpu_log.live(), 4);
}

#[test]
fn shader_compile_failure_is_typed_and_cleans_up() {
    let backend = HeadlessBackend::new().with_shader_failure(ShaderStage::Fragment, "0:3: error");
    let gpu_log = backend.log();
    let mut ctx = RenderContext::new(backend);

    let err = ctx.initialize(&settings()).unwrap_err();

    assert_eq!(
        err,
        RenderError::ShaderCompile {
            stage: ShaderStage::Fragment,
            log: "0:3: error".to_string()
        }
    );
    assert!(!ctx.is_initialized());
    assert_eq!(gpu_log.live(), 0);
}

#[test]
fn link_failure_is_typed() {
    let backend = HeadlessBackend::new().with_link_failure("varying mismatch");
    let mut ctx = RenderContext::new(backend);

    assert_eq!(
        ctx.initialize(&settings()),
        Err(RenderError::ProgramLink {
            log: "varying mismatch".to_string()
        })
    );
}

#[test]
fn failed_initialize_can_be_retried() {
    let mut ctx = RenderContext::new(HeadlessBackend::new());
    let mut bad = settings();
    bad.surface_width = 0;

    assert!(matches!(
        ctx.initialize(&bad),
        Err(RenderError::SurfaceCreation(_))
    ));
    ctx.initialize(&settings()).unwrap();
    assert!(ctx.is_initialized());
}

#[test]
fn upload_before_initialize_fails() {
    let backend = HeadlessBackend::new();
    let gpu_log = backend.log();
    let mut ctx = RenderContext::new(backend);
    let mut stats = UploadStats::new(10);
    let mut source = TestPatternSource::new(source_settings(true));

    assert_eq!(
        upload_frame(&mut stats, &mut ctx, &mut source),
        Err(RenderError::NotInitialized)
    );
    assert_eq!(stats.count(), 0);
    assert_eq!(gpu_log.uploads(), 0);
    assert_eq!(
        ctx.present(DisplayRect {
            x: 0.0,
            y: 0.0,
            width: 320.0,
            height: 180.0
        }),
        Err(RenderError::NotInitialized)
    );
}

#[test]
fn missing_frame_is_not_counted() {
    let backend = HeadlessBackend::new();
    let gpu_log = backend.log();
    let mut ctx = RenderContext::new(backend);
    ctx.initialize(&settings()).unwrap();
    let mut stats = UploadStats::new(10);
    let mut source = TestPatternSource::new(source_settings(false));

    assert_eq!(
        upload_frame(&mut stats, &mut ctx, &mut source),
        Ok(UploadOutcome::FrameNotReady)
    );
    assert_eq!(stats.count(), 0);
    assert_eq!(gpu_log.uploads(), 0);
    assert_eq!(gpu_log.draws(), 0);
}

#[test]
fn uploaded_frame_is_counted_and_timed() {
    let backend = HeadlessBackend::new();
    let gpu_log = backend.log();
    let mut ctx = RenderContext::new(backend);
    ctx.initialize(&settings()).unwrap();
    let mut stats = UploadStats::new(10);
    let mut source = TestPatternSource::new(source_settings(true));

    let outcome = upload_frame(&mut stats, &mut ctx, &mut source).unwrap();

    let UploadOutcome::Uploaded { cost } = outcome else {
        panic!("expected an upload, got {:?}", outcome);
    };
    assert_eq!(stats.count(), 1);
    assert_eq!(stats.total_cost(), cost);
    assert_eq!((gpu_log.uploads(), gpu_log.draws()), (1, 1));
}

#[test]
fn texture_is_reused_for_same_size_and_reallocated_on_change() {
    let backend = HeadlessBackend::new();
    let gpu_log = backend.log();
    let mut ctx = RenderContext::new(backend);
    ctx.initialize(&settings()).unwrap();
    let created = gpu_log.created();

    for _ in 0..3 {
        ctx.upload_and_draw(&VideoFrame::solid(320, 180, [10, 20, 30]))
            .unwrap();
    }
    assert_eq!(gpu_log.created(), created);

    ctx.upload_and_draw(&VideoFrame::solid(160, 90, [10, 20, 30]))
        .unwrap();
    assert_eq!(ctx.texture_size(), Some((160, 90)));
    assert_eq!(gpu_log.created(), created + 1);
    assert_eq!(gpu_log.live(), 4);
}

#[test]
fn short_frame_is_rejected() {
    let mut ctx = RenderContext::new(HeadlessBackend::new());
    ctx.initialize(&settings()).unwrap();
    let mut frame = VideoFrame::solid(320, 180, [0, 0, 0]);
    frame.pixels.truncate(100);

    assert_eq!(
        ctx.upload_and_draw(&frame),
        Err(RenderError::FrameSize {
            expected: 320 * 180 * 3,
            actual: 100
        })
    );
}

#[test]
fn dropping_the_context_releases_everything() {
    let backend = HeadlessBackend::new();
    let gpu_log = backend.log();
    let mut ctx = RenderContext::new(backend);
    ctx.initialize(&settings()).unwrap();
    assert_eq!(gpu_log.live(), 4);

    drop(ctx);
    assert_eq!(gpu_log.live(), 0);
}

#[test]
fn scope_restores_bindings_on_error() {
    let mut backend = HeadlessBackend::recording();
    let gpu_log = backend.log();
    let surface = backend.create_surface(8, 8).unwrap();
    backend.release(GpuResource::Surface(surface));

    let result = GpuScope::bind(&mut backend, &[Binding::Surface(surface)]);

    assert!(matches!(result, Err(RenderError::InvalidHandle("surface"))));
    assert_eq!(gpu_log.calls().last(), Some(&GpuCall::RestoreDefaults));
}
