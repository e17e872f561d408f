//! Upload loop integration tests: fixed-step timing, the upload ceiling,
//! readiness gating and render context lifecycle, run on the headless backend.

use bevy_ecs::observer::{Observer, On};
use bevy_ecs::prelude::*;

use videosprite::components::mapposition::MapPosition;
use videosprite::components::videodisplay::VideoDisplay;
use videosprite::events::uploadsummary::UploadSummaryEvent;
use videosprite::events::videoready::VideoReadyEvent;
use videosprite::player::{build_update_schedule, register_observers, setup_world};
use videosprite::resources::fixedstep::FixedStepClock;
use videosprite::resources::gpu::headless::{GpuCall, GpuCallLog, HeadlessBackend};
use videosprite::resources::gpu::{Binding, Primitive};
use videosprite::resources::playerconfig::{PlayerConfig, ReadyTrigger};
use videosprite::resources::rendercontext::RenderContext;
use videosprite::resources::streamstate::StreamState;
use videosprite::resources::uploadstats::{UploadStats, UploadSummary};
use videosprite::resources::videosource::VideoSourceRes;
use videosprite::resources::videosource::testpattern::TestPatternSource;
use videosprite::systems::time::update_world_time;

const EPSILON: f64 = 1e-6;
const QUANTUM: f64 = 1.0 / 60.0;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

#[derive(Resource, Default)]
struct Summaries(Vec<UploadSummary>);

fn collect_summaries(trigger: On<UploadSummaryEvent>, mut summaries: ResMut<Summaries>) {
    summaries.0.push(trigger.event().summary);
}

fn make_config(ceiling: u64, trigger: ReadyTrigger, autoplay: bool) -> PlayerConfig {
    let mut config = PlayerConfig::new();
    config.video_width = 14;
    config.video_height = 6;
    config.render_width = 64;
    config.render_height = 36;
    config.upload_ceiling = ceiling;
    config.ready_trigger = trigger;
    config.autoplay = autoplay;
    config
}

fn make_world(config: PlayerConfig, backend: HeadlessBackend) -> (World, GpuCallLog) {
    let gpu_log = backend.log();
    let mut ctx = RenderContext::new(backend);
    ctx.initialize(&config.render_settings()).unwrap();
    let source = VideoSourceRes::new(TestPatternSource::new(config.video_settings()));

    let mut world = World::new();
    setup_world(&mut world, config, ctx, source);
    world.insert_resource(Summaries::default());
    register_observers(&mut world);
    world.spawn(Observer::new(collect_summaries));
    world.flush();
    (world, gpu_log)
}

/// World that is already streaming when the first update arrives.
fn make_streaming_world(ceiling: u64) -> (World, GpuCallLog) {
    let (mut world, gpu_log) = make_world(
        make_config(ceiling, ReadyTrigger::Manual, true),
        HeadlessBackend::new(),
    );
    world.trigger(VideoReadyEvent {});
    (world, gpu_log)
}

fn tick(world: &mut World, schedule: &mut Schedule, dt: f32) {
    update_world_time(world, dt);
    schedule.run(world);
}

fn summaries(world: &World) -> &[UploadSummary] {
    &world.resource::<Summaries>().0
}

#[test]
fn uploads_match_elapsed_quanta() {
    let (mut world, gpu_log) = make_streaming_world(UploadStats::DEFAULT_CEILING);
    let mut schedule = build_update_schedule();

    let dt = 0.005_f32;
    let mut total = 0.0_f64;
    for _ in 0..201 {
        tick(&mut world, &mut schedule, dt);
        total += f64::from(dt);
    }

    let expected = (total / QUANTUM).floor() as u64;
    assert_eq!(expected, 60);
    assert_eq!(world.resource::<UploadStats>().count(), expected);
    assert_eq!(gpu_log.uploads(), expected);
    assert_eq!(gpu_log.draws(), expected);

    let clock = world.resource::<FixedStepClock>();
    assert!(approx_eq(clock.accumulator(), total % QUANTUM));
    assert!(summaries(&world).is_empty());
}

#[test]
fn ceiling_of_two_with_three_long_updates() {
    let (mut world, gpu_log) = make_streaming_world(2);
    let mut schedule = build_update_schedule();

    for dt in [0.02, 0.02, 0.02] {
        tick(&mut world, &mut schedule, dt);
    }

    assert_eq!(gpu_log.uploads(), 2);
    assert_eq!(gpu_log.draws(), 2);
    let emitted = summaries(&world);
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].count, 2);
    assert_eq!(world.resource::<UploadStats>().count(), 2);
}

#[test]
fn nothing_reaches_the_backend_after_the_ceiling() {
    let (mut world, gpu_log) = make_streaming_world(3);
    let mut schedule = build_update_schedule();

    for _ in 0..100 {
        tick(&mut world, &mut schedule, 0.02);
    }

    assert_eq!(gpu_log.uploads(), 3);
    assert_eq!(gpu_log.draws(), 3);
    assert_eq!(summaries(&world).len(), 1);
    assert!(world.resource::<UploadStats>().is_exhausted());
    // the clock keeps running
    assert_eq!(world.resource::<FixedStepClock>().total_steps(), 100);
}

#[test]
fn zero_ceiling_reports_once_without_uploading() {
    let (mut world, gpu_log) = make_streaming_world(0);
    let mut schedule = build_update_schedule();

    for _ in 0..5 {
        tick(&mut world, &mut schedule, 0.02);
    }

    assert_eq!(gpu_log.uploads(), 0);
    let emitted = summaries(&world);
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].count, 0);
}

#[test]
fn idle_updates_never_upload() {
    let (mut world, gpu_log) = make_world(
        make_config(UploadStats::DEFAULT_CEILING, ReadyTrigger::Manual, false),
        HeadlessBackend::new(),
    );
    let mut schedule = build_update_schedule();

    for _ in 0..30 {
        tick(&mut world, &mut schedule, 0.02);
    }
    assert_eq!(*world.resource::<StreamState>(), StreamState::Idle);
    assert_eq!(gpu_log.uploads(), 0);
    assert_eq!(gpu_log.draws(), 0);

    world.trigger(VideoReadyEvent {});
    assert_eq!(*world.resource::<StreamState>(), StreamState::Streaming);

    tick(&mut world, &mut schedule, 0.02);
    assert_eq!(gpu_log.uploads(), 1);
}

#[test]
fn auto_trigger_starts_streaming_on_source_ready() {
    let (mut world, gpu_log) = make_world(
        make_config(UploadStats::DEFAULT_CEILING, ReadyTrigger::Auto, true),
        HeadlessBackend::new(),
    );
    let mut schedule = build_update_schedule();

    tick(&mut world, &mut schedule, 0.0);
    assert!(world.resource::<StreamState>().is_streaming());

    for _ in 0..3 {
        tick(&mut world, &mut schedule, 0.02);
    }
    assert_eq!(gpu_log.uploads(), 3);
}

#[test]
fn auto_trigger_starts_a_source_without_autoplay() {
    let (mut world, gpu_log) = make_world(
        make_config(UploadStats::DEFAULT_CEILING, ReadyTrigger::Auto, false),
        HeadlessBackend::new(),
    );
    let mut schedule = build_update_schedule();

    tick(&mut world, &mut schedule, 0.0);
    assert!(world.resource::<StreamState>().is_streaming());

    for _ in 0..3 {
        tick(&mut world, &mut schedule, 0.02);
    }
    assert_eq!(gpu_log.uploads(), 3);
}

#[test]
fn manual_trigger_ignores_source_ready() {
    let (mut world, gpu_log) = make_world(
        make_config(UploadStats::DEFAULT_CEILING, ReadyTrigger::Manual, true),
        HeadlessBackend::new(),
    );
    let mut schedule = build_update_schedule();

    for _ in 0..10 {
        tick(&mut world, &mut schedule, 0.02);
    }
    assert!(!world.resource::<StreamState>().is_streaming());
    assert_eq!(gpu_log.uploads(), 0);
}

#[test]
fn one_step_per_update_leaves_backlog() {
    let (mut world, gpu_log) = make_streaming_world(UploadStats::DEFAULT_CEILING);
    let mut schedule = build_update_schedule();

    // 100 ms stall: six quanta due, one runs
    tick(&mut world, &mut schedule, 0.1);
    assert_eq!(gpu_log.uploads(), 1);
    let backlog = world.resource::<FixedStepClock>().accumulator();
    assert!(backlog > 4.0 * QUANTUM);

    for _ in 0..5 {
        tick(&mut world, &mut schedule, 0.0);
    }
    assert_eq!(gpu_log.uploads(), 6);
}

#[test]
fn upload_binds_draws_and_restores_in_order() {
    let (mut world, gpu_log) = make_world(
        make_config(1, ReadyTrigger::Manual, true),
        HeadlessBackend::recording(),
    );
    world.trigger(VideoReadyEvent {});
    let mut schedule = build_update_schedule();
    let setup_calls = gpu_log.calls().len();

    tick(&mut world, &mut schedule, 0.02);

    let calls = gpu_log.calls();
    let step = &calls[setup_calls..];
    assert_eq!(step.len(), 7);
    assert!(matches!(step[0], GpuCall::Bind(Binding::Surface(_))));
    assert!(matches!(step[1], GpuCall::Bind(Binding::Program(_))));
    assert!(matches!(step[2], GpuCall::Bind(Binding::VertexBuffer(_))));
    assert!(matches!(
        step[3],
        GpuCall::Bind(Binding::Texture { unit: 0, .. })
    ));
    assert!(matches!(
        step[4],
        GpuCall::UploadTexture {
            width: 14,
            height: 6,
            flip_y: false,
            ..
        }
    ));
    assert_eq!(
        step[5],
        GpuCall::DrawArrays {
            mode: Primitive::TriangleStrip,
            first: 0,
            count: 4
        }
    );
    assert_eq!(step[6], GpuCall::RestoreDefaults);
}

#[test]
fn configured_position_places_the_display() {
    let mut config = make_config(1, ReadyTrigger::Manual, true);
    config.display_position = Some((40.0, 24.0));
    let (mut world, _) = make_world(config, HeadlessBackend::new());

    let mut query = world.query::<(&VideoDisplay, Option<&MapPosition>)>();
    let (display, position) = query.single(&world).unwrap();
    let position = position.copied().unwrap();
    assert_eq!(position, MapPosition::new(40.0, 24.0));
    let rect = display.rect_at(position.x, position.y);
    assert_eq!((rect.x, rect.y, rect.width, rect.height), (40.0, 24.0, 14.0, 6.0));
}

#[test]
fn display_without_position_is_centred() {
    let (mut world, _) = make_world(
        make_config(1, ReadyTrigger::Manual, true),
        HeadlessBackend::new(),
    );

    let mut query = world.query::<(&VideoDisplay, Option<&MapPosition>)>();
    let (_, position) = query.single(&world).unwrap();
    assert!(position.is_none());
}
