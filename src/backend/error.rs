//! Typed failures for the per-frame path.
//!
//! Setup code reports through `anyhow`; everything the frame loop touches on
//! every frame reports through these enums so callers can tell a broken chain
//! apart from a broken submission without string matching.

use ash::vk;
use thiserror::Error;

/// Failure to build (or rebuild) the presentable image chain.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// Surface capability/format/present-mode query failed
    #[error("failed to query surface support: {0}")]
    Query(#[source] vk::Result),

    /// The surface reports no formats at all
    #[error("surface reports no supported formats")]
    NoFormats,

    /// vkCreateSwapchainKHR or vkGetSwapchainImagesKHR failed
    #[error("failed to create swapchain: {0}")]
    CreateChain(#[source] vk::Result),

    /// A per-image view could not be created
    #[error("failed to create view for swapchain image {index}: {result}")]
    CreateView {
        index: usize,
        #[source]
        result: vk::Result,
    },

    /// A per-image framebuffer could not be created
    #[error("failed to create framebuffer for swapchain image {index}: {result}")]
    CreateFramebuffer {
        index: usize,
        #[source]
        result: vk::Result,
    },

    /// The pipeline could not be rebuilt for a new surface format
    #[error("failed to rebuild pipeline for new surface format: {0}")]
    Pipeline(#[source] vk::Result),
}

/// Failure while recording a frame's command buffer.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The acquired image has no framebuffer in the current chain
    #[error("no framebuffer for swapchain image {0}")]
    NoFramebuffer(u32),

    #[error("failed to reset command buffer: {0}")]
    Reset(#[source] vk::Result),

    #[error("failed to begin recording command buffer: {0}")]
    Begin(#[source] vk::Result),

    #[error("failed to end recording command buffer: {0}")]
    End(#[source] vk::Result),
}

/// Fatal failure of one pass through the frame loop.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("failed waiting on frame fence: {0}")]
    FenceWait(#[source] vk::Result),

    #[error("failed to acquire swapchain image: {0}")]
    Acquire(#[source] vk::Result),

    #[error("failed to reset frame fence: {0}")]
    FenceReset(#[source] vk::Result),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("failed to submit draw command buffer: {0}")]
    Submit(#[source] vk::Result),

    #[error("failed to present swapchain image: {0}")]
    Present(#[source] vk::Result),

    #[error("failed waiting for device idle: {0}")]
    DeviceIdle(#[source] vk::Result),

    #[error("swapchain repair failed: {0}")]
    Repair(#[from] SurfaceError),
}

/// Failure to create or fill a GPU buffer.
#[derive(Error, Debug)]
pub enum BufferError {
    /// No memory type satisfies both the buffer's type bits and the requested properties
    #[error("no memory type matches type bits {type_bits:#b} with properties {properties:?}")]
    NoMemoryType {
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
    },

    /// More vertex data than the buffer was sized for
    #[error("{requested} bytes do not fit in a {capacity}-byte buffer")]
    Overflow {
        requested: vk::DeviceSize,
        capacity: vk::DeviceSize,
    },

    #[error("Vulkan error during {operation}: {result}")]
    Vulkan {
        operation: &'static str,
        #[source]
        result: vk::Result,
    },
}

impl BufferError {
    pub(crate) fn vulkan(operation: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Vulkan { operation, result }
    }
}
