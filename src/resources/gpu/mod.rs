//! GPU backend abstraction.
//!
//! The render context talks to the graphics API only through the
//! [`GpuBackend`] trait, using opaque integer handles in the style of an
//! immediate-mode API. Two implementations exist:
//!
//! - [`raylibbackend::RaylibBackend`] – draws through raylib's FFI; needs an open window.
//! - [`headless::HeadlessBackend`] – records every call; used for headless
//!   runs and tests.
//!
//! Bindings made through a [`GpuScope`] are restored when the scope drops,
//! so no bind leaks from one call sequence into the next.

pub mod headless;
pub mod raylibbackend;

use std::ops::{Deref, DerefMut};

use crate::resources::rendercontext::RenderError;
use crate::resources::videosource::VideoFrame;

/// Handle to an offscreen drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

/// Handle to a linked shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Handle to a vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Handle to a 2D texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Shader pipeline stage, used for compile diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Texture sampling filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

/// Texture coordinate wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureWrap {
    Repeat,
    #[default]
    ClampToEdge,
}

/// Parameters for a new 2D texture. Pixel format is always packed RGB8.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
}

impl TextureDesc {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: TextureFilter::default(),
            wrap: TextureWrap::default(),
        }
    }
}

/// Vertex layout used by draw calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    TriangleStrip,
}

/// A piece of pipeline state bound for the duration of a [`GpuScope`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    Surface(SurfaceId),
    Program(ProgramId),
    VertexBuffer(BufferId),
    Texture { unit: u32, texture: TextureId },
}

/// Any GPU object that can be released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuResource {
    Surface(SurfaceId),
    Program(ProgramId),
    Buffer(BufferId),
    Texture(TextureId),
}

/// Destination rectangle in window pixels for presenting a surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Minimal immediate-mode graphics API used by the render context.
///
/// Every method that takes a handle must reject handles it did not create
/// (or already released) with [`RenderError::InvalidHandle`] instead of
/// forwarding them to the driver.
pub trait GpuBackend {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Create an offscreen surface of `width` x `height` pixels.
    fn create_surface(&mut self, width: u32, height: u32) -> Result<SurfaceId, RenderError>;

    /// Compile both stages and link them into a program.
    fn create_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, RenderError>;

    /// Set a `vec4` uniform on `program`. Unknown uniform names are ignored.
    fn set_uniform_vec4(
        &mut self,
        program: ProgramId,
        name: &str,
        value: [f32; 4],
    ) -> Result<(), RenderError>;

    /// Point a sampler uniform at a texture unit.
    fn set_uniform_sampler(
        &mut self,
        program: ProgramId,
        name: &str,
        unit: u32,
    ) -> Result<(), RenderError>;

    /// Upload a static vertex buffer of 2D positions for `attribute`.
    fn create_vertex_buffer(
        &mut self,
        program: ProgramId,
        attribute: &str,
        vertices: &[[f32; 2]],
    ) -> Result<BufferId, RenderError>;

    /// Allocate a texture.
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId, RenderError>;

    /// Overwrite the whole texture with `frame`'s RGB8 pixels. The frame size
    /// must equal the texture size.
    fn upload_texture(
        &mut self,
        texture: TextureId,
        frame: &VideoFrame,
        flip_y: bool,
    ) -> Result<(), RenderError>;

    /// Make `binding` current.
    fn bind(&mut self, binding: Binding) -> Result<(), RenderError>;

    /// Drop every binding made since the last restore.
    fn restore_defaults(&mut self);

    /// Draw `count` vertices from the bound buffer with the bound program
    /// into the bound surface.
    fn draw_arrays(&mut self, mode: Primitive, first: u32, count: u32) -> Result<(), RenderError>;

    /// Draw `surface` onto the default framebuffer at `dest`.
    fn present(&mut self, surface: SurfaceId, dest: DisplayRect) -> Result<(), RenderError>;

    /// Free a GPU object. Releasing an unknown handle is a no-op.
    fn release(&mut self, resource: GpuResource);
}

/// Scoped pipeline state.
///
/// Binds everything in `bindings` on creation and calls
/// [`GpuBackend::restore_defaults`] on drop, also when a call inside the
/// scope fails.
pub struct GpuScope<'a> {
    backend: &'a mut dyn GpuBackend,
}

impl<'a> GpuScope<'a> {
    pub fn bind(
        backend: &'a mut dyn GpuBackend,
        bindings: &[Binding],
    ) -> Result<Self, RenderError> {
        let mut scope = Self { backend };
        for binding in bindings {
            // on error the scope drops here and restores what was bound so far
            scope.backend.bind(*binding)?;
        }
        Ok(scope)
    }
}

impl<'a> Deref for GpuScope<'a> {
    type Target = dyn GpuBackend + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.backend
    }
}

impl DerefMut for GpuScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.backend
    }
}

impl Drop for GpuScope<'_> {
    fn drop(&mut self) {
        self.backend.restore_defaults();
    }
}
