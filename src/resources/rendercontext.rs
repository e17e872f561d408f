//! Render context resource.
//!
//! Owns the GPU backend and every GPU object the video uploader needs: the
//! offscreen surface, the pass-through shader program, the static quad and
//! the video texture. Systems reach the GPU only through this resource.
//!
//! Lifecycle:
//! 1. [`RenderContext::new`] wraps a backend; nothing is allocated yet.
//! 2. [`RenderContext::initialize`] creates the objects exactly once.
//! 3. [`RenderContext::upload_and_draw`] copies a frame and draws the quad.
//! 4. Dropping the context releases the objects.
//!
//! This is a NonSend resource because backends hold graphics-API state tied
//! to the thread that created the window.

use std::time::{Duration, Instant};

use log::{debug, error, info};
use thiserror::Error;

use crate::resources::gpu::{
    Binding, BufferId, DisplayRect, GpuBackend, GpuResource, GpuScope, Primitive, ProgramId,
    ShaderStage, SurfaceId, TextureDesc, TextureId,
};
use crate::resources::videosource::VideoFrame;

/// Pass-through vertex shader; scales clip-space positions by `uScale`.
pub const VERTEX_SHADER: &str = include_str!("../shaders/passthrough.vs");
/// Samples texture unit 0.
pub const FRAGMENT_SHADER: &str = include_str!("../shaders/texture.fs");

/// Full-surface quad as a triangle strip.
pub const QUAD_STRIP: [[f32; 2]; 4] = [[-1.0, 1.0], [1.0, 1.0], [-1.0, -1.0], [1.0, -1.0]];
/// Value of the `uScale` uniform.
pub const QUAD_SCALE: [f32; 4] = [1.0, 1.0, 0.0, 1.0];
/// Texture unit the video texture is bound to.
pub const VIDEO_TEXTURE_UNIT: u32 = 0;

/// Errors produced while creating or using GPU objects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("failed to create drawing surface: {0}")]
    SurfaceCreation(String),
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("shader program failed to link: {log}")]
    ProgramLink { log: String },
    #[error("failed to create texture: {0}")]
    TextureCreation(String),
    #[error("render context used before initialization")]
    NotInitialized,
    #[error("render context is already initialized")]
    AlreadyInitialized,
    #[error("invalid {0} handle")]
    InvalidHandle(&'static str),
    #[error("frame carries {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
}

/// Sizes and options used by [`RenderContext::initialize`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    /// Offscreen surface width in pixels.
    pub surface_width: u32,
    /// Offscreen surface height in pixels.
    pub surface_height: u32,
    /// Initial texture width; should match the video display size.
    pub texture_width: u32,
    /// Initial texture height.
    pub texture_height: u32,
    /// Flip rows on upload so the first video row ends up at the top.
    pub flip_y: bool,
}

struct GpuObjects {
    surface: SurfaceId,
    program: ProgramId,
    quad: BufferId,
    texture: TextureId,
    texture_size: (u32, u32),
    surface_size: (u32, u32),
}

impl GpuObjects {
    fn resources(&self) -> [GpuResource; 4] {
        [
            GpuResource::Texture(self.texture),
            GpuResource::Buffer(self.quad),
            GpuResource::Program(self.program),
            GpuResource::Surface(self.surface),
        ]
    }
}

pub struct RenderContext {
    backend: Box<dyn GpuBackend>,
    objects: Option<GpuObjects>,
    flip_y: bool,
}

impl RenderContext {
    /// Wrap a backend. No GPU object exists until [`Self::initialize`].
    pub fn new(backend: impl GpuBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            objects: None,
            flip_y: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.objects.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current texture size, once initialized.
    pub fn texture_size(&self) -> Option<(u32, u32)> {
        self.objects.as_ref().map(|o| o.texture_size)
    }

    /// Offscreen surface size, once initialized.
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.objects.as_ref().map(|o| o.surface_size)
    }

    /// Create the surface, program, quad and texture.
    ///
    /// Returns [`RenderError::AlreadyInitialized`] without touching the GPU
    /// if called twice. On any failure the objects created so far are
    /// released and the context stays uninitialized.
    pub fn initialize(&mut self, settings: &RenderSettings) -> Result<(), RenderError> {
        if self.objects.is_some() {
            return Err(RenderError::AlreadyInitialized);
        }

        let mut created = Vec::with_capacity(4);
        match create_objects(self.backend.as_mut(), settings, &mut created) {
            Ok(objects) => {
                info!(
                    "Render context ready on {}: surface {}x{}, texture {}x{}",
                    self.backend.name(),
                    settings.surface_width,
                    settings.surface_height,
                    settings.texture_width,
                    settings.texture_height
                );
                self.flip_y = settings.flip_y;
                self.objects = Some(objects);
                Ok(())
            }
            Err(e) => {
                error!("Render context initialization failed: {}", e);
                for resource in created.into_iter().rev() {
                    self.backend.release(resource);
                }
                Err(e)
            }
        }
    }

    /// Copy `frame` into the video texture and draw the quad into the
    /// surface. Returns the wall-clock time spent.
    ///
    /// The texture is updated in place; it is reallocated only when the
    /// frame size differs from the current texture size.
    pub fn upload_and_draw(&mut self, frame: &VideoFrame) -> Result<Duration, RenderError> {
        let objects = self.objects.as_mut().ok_or(RenderError::NotInitialized)?;
        if frame.pixels.len() != frame.expected_len() {
            return Err(RenderError::FrameSize {
                expected: frame.expected_len(),
                actual: frame.pixels.len(),
            });
        }

        let started = Instant::now();

        if (frame.width, frame.height) != objects.texture_size {
            debug!(
                "Frame size changed {:?} -> {}x{}, reallocating texture",
                objects.texture_size, frame.width, frame.height
            );
            let texture = self
                .backend
                .create_texture(&TextureDesc::new(frame.width, frame.height))?;
            self.backend.release(GpuResource::Texture(objects.texture));
            objects.texture = texture;
            objects.texture_size = (frame.width, frame.height);
        }

        let mut scope = GpuScope::bind(
            self.backend.as_mut(),
            &[
                Binding::Surface(objects.surface),
                Binding::Program(objects.program),
                Binding::VertexBuffer(objects.quad),
                Binding::Texture {
                    unit: VIDEO_TEXTURE_UNIT,
                    texture: objects.texture,
                },
            ],
        )?;
        scope.upload_texture(objects.texture, frame, self.flip_y)?;
        scope.draw_arrays(Primitive::TriangleStrip, 0, QUAD_STRIP.len() as u32)?;
        drop(scope);

        Ok(started.elapsed())
    }

    /// Draw the surface onto the window framebuffer at `dest`.
    pub fn present(&mut self, dest: DisplayRect) -> Result<(), RenderError> {
        let objects = self.objects.as_ref().ok_or(RenderError::NotInitialized)?;
        self.backend.present(objects.surface, dest)
    }
}

fn create_objects(
    backend: &mut dyn GpuBackend,
    settings: &RenderSettings,
    created: &mut Vec<GpuResource>,
) -> Result<GpuObjects, RenderError> {
    let surface = backend.create_surface(settings.surface_width, settings.surface_height)?;
    created.push(GpuResource::Surface(surface));

    let program = backend.create_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
    created.push(GpuResource::Program(program));

    let quad = {
        let mut scope = GpuScope::bind(backend, &[Binding::Program(program)])?;
        scope.set_uniform_vec4(program, "uScale", QUAD_SCALE)?;
        scope.set_uniform_sampler(program, "texture0", VIDEO_TEXTURE_UNIT)?;
        scope.create_vertex_buffer(program, "vertexPosition", &QUAD_STRIP)?
    };
    created.push(GpuResource::Buffer(quad));

    let texture =
        backend.create_texture(&TextureDesc::new(settings.texture_width, settings.texture_height))?;
    created.push(GpuResource::Texture(texture));

    Ok(GpuObjects {
        surface,
        program,
        quad,
        texture,
        texture_size: (settings.texture_width, settings.texture_height),
        surface_size: (settings.surface_width, settings.surface_height),
    })
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        if let Some(objects) = self.objects.take() {
            for resource in objects.resources() {
                self.backend.release(resource);
            }
        }
    }
}
