//! Player configuration resource.
//!
//! Manages player settings loaded from an INI configuration file. Provides
//! defaults for safe startup and methods to load/save configuration.
//!
//! # Configuration File Format
//!
//! ```ini
//! [video]
//! url = http://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4
//! width = 320
//! height = 180
//! autoplay = true
//! controls = true
//! cross_origin = anonymous
//! ready_trigger = auto
//!
//! [render]
//! width = 1280
//! height = 720
//! flip_y = false
//!
//! [upload]
//! ceiling = 100000
//! step_hz = 60
//! max_steps_per_update = 1
//!
//! [window]
//! width = 1280
//! height = 720
//! target_fps = 120
//! # top-left corner of the video; centred when absent
//! # video_x = 40
//! # video_y = 40
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::resources::fixedstep::FixedStepClock;
use crate::resources::rendercontext::RenderSettings;
use crate::resources::uploadstats::UploadStats;
use crate::resources::videosource::VideoSourceSettings;

/// Default safe values for startup
const DEFAULT_VIDEO_URL: &str =
    "http://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";
const DEFAULT_VIDEO_WIDTH: u32 = 320;
const DEFAULT_VIDEO_HEIGHT: u32 = 180;
const DEFAULT_AUTOPLAY: bool = true;
const DEFAULT_CONTROLS: bool = true;
const DEFAULT_CROSS_ORIGIN: &str = "anonymous";
const DEFAULT_RENDER_WIDTH: u32 = 1280;
const DEFAULT_RENDER_HEIGHT: u32 = 720;
const DEFAULT_FLIP_Y: bool = false;
const DEFAULT_MAX_STEPS_PER_UPDATE: u32 = 1;
const DEFAULT_WINDOW_WIDTH: u32 = 1280;
const DEFAULT_WINDOW_HEIGHT: u32 = 720;
const DEFAULT_TARGET_FPS: u32 = 120;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

/// What moves the player from idle to streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyTrigger {
    /// Start as soon as the source reports its first decoded frame.
    #[default]
    Auto,
    /// Wait for the start key.
    Manual,
}

impl ReadyTrigger {
    fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ReadyTrigger::Auto),
            "manual" => Ok(ReadyTrigger::Manual),
            other => Err(format!("Unknown ready_trigger '{}'", other)),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ReadyTrigger::Auto => "auto",
            ReadyTrigger::Manual => "manual",
        }
    }
}

/// Player configuration resource.
#[derive(Resource, Debug, Clone)]
pub struct PlayerConfig {
    /// Remote media URL.
    pub video_url: String,
    /// Display size of the video in pixels; decoded frames are scaled to it.
    pub video_width: u32,
    pub video_height: u32,
    pub autoplay: bool,
    pub controls: bool,
    pub cross_origin: String,
    pub ready_trigger: ReadyTrigger,
    /// Offscreen surface size in pixels.
    pub render_width: u32,
    pub render_height: u32,
    /// Flip frames vertically on upload.
    pub flip_y: bool,
    /// Uploads allowed before the uploader stops.
    pub upload_ceiling: u64,
    /// Fixed steps per second.
    pub step_hz: u32,
    /// Steps allowed per update; 0 means no limit.
    pub max_steps_per_update: u32,
    /// Window width in pixels.
    pub window_width: u32,
    /// Window height in pixels.
    pub window_height: u32,
    /// Target frames per second.
    pub target_fps: u32,
    /// Top-left corner of the video in window pixels; `None` centres it.
    pub display_position: Option<(f32, f32)>,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            video_url: DEFAULT_VIDEO_URL.to_string(),
            video_width: DEFAULT_VIDEO_WIDTH,
            video_height: DEFAULT_VIDEO_HEIGHT,
            autoplay: DEFAULT_AUTOPLAY,
            controls: DEFAULT_CONTROLS,
            cross_origin: DEFAULT_CROSS_ORIGIN.to_string(),
            ready_trigger: ReadyTrigger::default(),
            render_width: DEFAULT_RENDER_WIDTH,
            render_height: DEFAULT_RENDER_HEIGHT,
            flip_y: DEFAULT_FLIP_Y,
            upload_ceiling: UploadStats::DEFAULT_CEILING,
            step_hz: FixedStepClock::DEFAULT_HZ,
            max_steps_per_update: DEFAULT_MAX_STEPS_PER_UPDATE,
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            target_fps: DEFAULT_TARGET_FPS,
            display_position: None,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply_ini(&config)?;

        info!(
            "Loaded config: video {}x{} from {}, surface {}x{}, ceiling={}, step={}Hz, trigger={}",
            self.video_width,
            self.video_height,
            self.video_url,
            self.render_width,
            self.render_height,
            self.upload_ceiling,
            self.step_hz,
            self.ready_trigger.as_str()
        );

        Ok(())
    }

    /// Load configuration from INI text instead of a file.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply_ini(&config)
    }

    fn apply_ini(&mut self, config: &Ini) -> Result<(), String> {
        let uint = |section: &str, key: &str| -> Result<Option<u64>, String> {
            config
                .getuint(section, key)
                .map_err(|e| format!("[{}] {}: {}", section, key, e))
        };
        let uint32 = |section: &str, key: &str| -> Result<Option<u32>, String> {
            uint(section, key)?
                .map(|v| {
                    u32::try_from(v)
                        .map_err(|_| format!("[{}] {}: {} is too large", section, key, v))
                })
                .transpose()
        };
        let float = |section: &str, key: &str| -> Result<Option<f64>, String> {
            config
                .getfloat(section, key)
                .map_err(|e| format!("[{}] {}: {}", section, key, e))
        };
        let boolean = |section: &str, key: &str| -> Result<Option<bool>, String> {
            config
                .getbool(section, key)
                .map_err(|e| format!("[{}] {}: {}", section, key, e))
        };

        // [video] section
        if let Some(url) = config.get("video", "url") {
            self.video_url = url;
        }
        if let Some(width) = uint32("video", "width")? {
            self.video_width = width;
        }
        if let Some(height) = uint32("video", "height")? {
            self.video_height = height;
        }
        if let Some(autoplay) = boolean("video", "autoplay")? {
            self.autoplay = autoplay;
        }
        if let Some(controls) = boolean("video", "controls")? {
            self.controls = controls;
        }
        if let Some(cross_origin) = config.get("video", "cross_origin") {
            self.cross_origin = cross_origin;
        }
        if let Some(trigger) = config.get("video", "ready_trigger") {
            self.ready_trigger = ReadyTrigger::parse(&trigger)?;
        }

        // [render] section
        if let Some(width) = uint32("render", "width")? {
            self.render_width = width;
        }
        if let Some(height) = uint32("render", "height")? {
            self.render_height = height;
        }
        if let Some(flip_y) = boolean("render", "flip_y")? {
            self.flip_y = flip_y;
        }

        // [upload] section
        if let Some(ceiling) = uint("upload", "ceiling")? {
            self.upload_ceiling = ceiling;
        }
        if let Some(hz) = uint32("upload", "step_hz")? {
            if hz == 0 {
                return Err("[upload] step_hz must be at least 1".to_string());
            }
            self.step_hz = hz;
        }
        if let Some(max) = uint32("upload", "max_steps_per_update")? {
            self.max_steps_per_update = max;
        }

        // [window] section
        if let Some(width) = uint32("window", "width")? {
            self.window_width = width;
        }
        if let Some(height) = uint32("window", "height")? {
            self.window_height = height;
        }
        if let Some(fps) = uint32("window", "target_fps")? {
            self.target_fps = fps;
        }
        match (float("window", "video_x")?, float("window", "video_y")?) {
            (Some(x), Some(y)) => self.display_position = Some((x as f32, y as f32)),
            (None, None) => {}
            _ => return Err("[window] video_x and video_y must be set together".to_string()),
        }

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        // [video] section
        config.set("video", "url", Some(self.video_url.clone()));
        config.set("video", "width", Some(self.video_width.to_string()));
        config.set("video", "height", Some(self.video_height.to_string()));
        config.set("video", "autoplay", Some(self.autoplay.to_string()));
        config.set("video", "controls", Some(self.controls.to_string()));
        config.set("video", "cross_origin", Some(self.cross_origin.clone()));
        config.set(
            "video",
            "ready_trigger",
            Some(self.ready_trigger.as_str().to_string()),
        );

        // [render] section
        config.set("render", "width", Some(self.render_width.to_string()));
        config.set("render", "height", Some(self.render_height.to_string()));
        config.set("render", "flip_y", Some(self.flip_y.to_string()));

        // [upload] section
        config.set("upload", "ceiling", Some(self.upload_ceiling.to_string()));
        config.set("upload", "step_hz", Some(self.step_hz.to_string()));
        config.set(
            "upload",
            "max_steps_per_update",
            Some(self.max_steps_per_update.to_string()),
        );

        // [window] section
        config.set("window", "width", Some(self.window_width.to_string()));
        config.set("window", "height", Some(self.window_height.to_string()));
        config.set("window", "target_fps", Some(self.target_fps.to_string()));
        if let Some((x, y)) = self.display_position {
            config.set("window", "video_x", Some(x.to_string()));
            config.set("window", "video_y", Some(y.to_string()));
        }

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// Settings handed to the video source.
    pub fn video_settings(&self) -> VideoSourceSettings {
        VideoSourceSettings {
            url: self.video_url.clone(),
            autoplay: self.autoplay,
            controls: self.controls,
            cross_origin: self.cross_origin.clone(),
            width: self.video_width,
            height: self.video_height,
        }
    }

    /// Settings for render context initialization.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            surface_width: self.render_width,
            surface_height: self.render_height,
            texture_width: self.video_width,
            texture_height: self.video_height,
            flip_y: self.flip_y,
        }
    }

    /// Fixed-step clock for the configured rate and catch-up limit.
    pub fn fixed_step_clock(&self) -> FixedStepClock {
        let max = match self.max_steps_per_update {
            0 => None,
            n => Some(n),
        };
        FixedStepClock::new(self.step_hz).with_max_steps_per_update(max)
    }

    /// Upload counters for the configured ceiling.
    pub fn upload_stats(&self) -> UploadStats {
        UploadStats::new(self.upload_ceiling)
    }

    /// Window size.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}
