//! videosprite main entry point.
//!
//! Plays a remote video and copies its decoded frames into a GPU texture on
//! a fixed 60 Hz step, showing the result as a sprite. Built on:
//! - **raylib** for windowing and graphics
//! - **bevy_ecs** for entity-component-system architecture
//! - **GStreamer** for decoding (feature `video`)
//!
//! # Project Structure
//!
//! - [`components`] – ECS components (video display, position)
//! - [`events`] – Event types (readiness, upload summary, debug toggle)
//! - [`player`] – World setup shared with the integration tests
//! - [`resources`] – ECS resources (config, clock, stats, render context, video source)
//! - [`systems`] – ECS systems (time, upload, input, render)
//!
//! # Main Loop
//!
//! 1. Load `config.ini`, apply command line overrides
//! 2. Open the window (or not, with `--headless`) and initialize the render context
//! 3. Open the video source, register observers and systems
//! 4. Run the main loop:
//!    - Advance world time by the frame delta
//!    - Poll the video source, run due fixed steps, render
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --url https://example.com/video.mp4
//! cargo run --release -- --test-pattern --headless 5 --ceiling 120
//! ```

// Do not create console on Windows
#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

mod components;
mod events;
mod player;
mod resources;
mod systems;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;
use clap::Parser;
use log::{error, info};

use crate::events::videoready::VideoReadyEvent;
use crate::resources::gpu::headless::HeadlessBackend;
use crate::resources::gpu::raylibbackend::RaylibBackend;
use crate::resources::input::InputState;
use crate::resources::playerconfig::{PlayerConfig, ReadyTrigger};
use crate::resources::rendercontext::RenderContext;
use crate::resources::uploadstats::UploadStats;
use crate::resources::videosource::{VideoSourceRes, VideoSourceSettings};
use crate::resources::videosource::testpattern::TestPatternSource;
use crate::systems::fixedstep::fixed_step_upload;
use crate::systems::input::update_input_state;
use crate::systems::render::render_system;
use crate::systems::time::update_world_time;
use crate::systems::videosource::poll_video_source;

/// Video to GPU texture player
#[derive(Parser)]
#[command(version, about = "Copies video frames into a GPU texture on a fixed step")]
struct Cli {
    /// Configuration file (default: ./config.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Remote video URL, overrides the configuration.
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Use the synthetic colour-bar source instead of decoding a URL.
    #[arg(long)]
    test_pattern: bool,

    /// Run without a window for the given number of seconds.
    #[arg(long, value_name = "SECONDS")]
    headless: Option<f32>,

    /// Number of uploads before the uploader stops and reports.
    #[arg(long, value_name = "N")]
    ceiling: Option<u64>,

    /// Wait for the start key (SPACE) instead of starting on the first frame.
    #[arg(long)]
    manual_start: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // --------------- Configuration ---------------
    let mut config = match &cli.config {
        Some(path) => PlayerConfig::with_path(path),
        None => PlayerConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        if cli.config.is_some() {
            error!("{}", e);
            std::process::exit(1);
        }
        info!("{}; using defaults", e);
    }
    if let Some(url) = cli.url {
        config.video_url = url;
    }
    if let Some(ceiling) = cli.ceiling {
        config.upload_ceiling = ceiling;
    }
    if cli.manual_start {
        config.ready_trigger = ReadyTrigger::Manual;
    }

    match cli.headless {
        Some(seconds) => run_headless(config, cli.test_pattern, seconds),
        None => run_window(config, cli.test_pattern),
    }
}

fn open_source(config: &PlayerConfig, test_pattern: bool) -> VideoSourceRes {
    let settings = config.video_settings();
    if test_pattern {
        return VideoSourceRes::new(TestPatternSource::new(settings));
    }
    open_remote(settings)
}

#[cfg(feature = "video")]
fn open_remote(settings: VideoSourceSettings) -> VideoSourceRes {
    match resources::videosource::remote::GstVideoSource::open(settings) {
        Ok(source) => VideoSourceRes::new(source),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "video"))]
fn open_remote(settings: VideoSourceSettings) -> VideoSourceRes {
    log::warn!("Built without the `video` feature, playing the test pattern");
    VideoSourceRes::new(TestPatternSource::new(settings))
}

fn initialize_context(mut ctx: RenderContext, config: &PlayerConfig) -> RenderContext {
    if let Err(e) = ctx.initialize(&config.render_settings()) {
        error!("Cannot start without a render context: {}", e);
        std::process::exit(1);
    }
    ctx
}

fn run_window(config: PlayerConfig, test_pattern: bool) {
    let (window_width, window_height) = config.window_size();
    let (mut rl, thread) = raylib::init()
        .size(window_width as i32, window_height as i32)
        .resizable()
        .title("videosprite")
        .build();
    rl.set_target_fps(config.target_fps);
    // Disable ESC to exit
    rl.set_exit_key(None);

    let ctx = initialize_context(RenderContext::new(RaylibBackend::new(&thread)), &config);
    let source = open_source(&config, test_pattern);

    // --------------- ECS world + resources ---------------
    let mut world = World::new();
    player::setup_world(&mut world, config, ctx, source);
    world.insert_resource(InputState::default());
    world.insert_non_send_resource(rl);
    world.insert_non_send_resource(thread);
    player::register_observers(&mut world);

    let mut update = player::build_update_schedule();
    update.add_systems(update_input_state.before(poll_video_source));
    update.add_systems(render_system.after(fixed_step_upload));

    if let Err(e) = update.initialize(&mut world) {
        error!("Failed to initialize schedule: {}", e);
        std::process::exit(1);
    }

    // --------------- Main loop ---------------
    while !world
        .non_send_resource::<raylib::RaylibHandle>()
        .window_should_close()
    {
        let dt = world
            .non_send_resource::<raylib::RaylibHandle>()
            .get_frame_time();
        update_world_time(&mut world, dt);

        update.run(&mut world);

        world.clear_trackers(); // Clear changed components for next frame
    }

    // GPU objects must go before the window closes
    world.remove_non_send_resource::<RenderContext>();
    world.remove_non_send_resource::<VideoSourceRes>();
}

fn run_headless(config: PlayerConfig, test_pattern: bool, seconds: f32) {
    let backend = HeadlessBackend::new();
    let gpu_log = backend.log();
    let ctx = initialize_context(RenderContext::new(backend), &config);
    let source = open_source(&config, test_pattern);
    let frame_period = Duration::from_secs_f64(1.0 / f64::from(config.target_fps.max(1)));
    let manual = config.ready_trigger == ReadyTrigger::Manual;

    let mut world = World::new();
    player::setup_world(&mut world, config, ctx, source);
    player::register_observers(&mut world);
    if manual {
        // No keyboard without a window; the run itself is the start signal.
        world.trigger(VideoReadyEvent {});
    }

    let mut update = player::build_update_schedule();
    if let Err(e) = update.initialize(&mut world) {
        error!("Failed to initialize schedule: {}", e);
        std::process::exit(1);
    }

    info!("Running headless for {:.1}s", seconds);
    let run_for = Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO);
    let started = Instant::now();
    let mut last = started;
    while started.elapsed() < run_for {
        std::thread::sleep(frame_period);
        let now = Instant::now();
        update_world_time(&mut world, (now - last).as_secs_f32());
        last = now;

        update.run(&mut world);

        world.clear_trackers();
    }

    let stats = world.resource::<UploadStats>();
    info!(
        "Headless run finished: {} uploads, {} draws reached the backend, summary {}",
        gpu_log.uploads(),
        gpu_log.draws(),
        if stats.summary_taken() {
            "emitted"
        } else {
            "not reached"
        }
    );
}
