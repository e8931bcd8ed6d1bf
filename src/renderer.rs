// Renderer - the Vulkan side of the frame loop
//
// Owns every GPU object the demo uses and implements PresentBackend over
// them. Fields are declared in teardown order: chain-derived resources
// first, the device last.

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use crate::backend::buffer::VertexBuffer;
use crate::backend::commands::{CommandRecorder, DrawTarget};
use crate::backend::error::{RecordError, SurfaceError};
use crate::backend::pipeline::{Framebuffers, GraphicsPipeline};
use crate::backend::shader::ShaderStages;
use crate::backend::sync::{create_frame_slots, FrameSync};
use crate::backend::{Swapchain, VulkanDevice};
use crate::config::Config;
use crate::frame::{AcquireOutcome, PresentBackend, PresentOutcome};
use crate::geometry::{self, Vertex};

pub struct Renderer {
    // Rebuilt on repair; None only while a rebuild is in progress
    framebuffers: Option<Framebuffers>,
    swapchain: Option<Swapchain>,

    pipeline: GraphicsPipeline,
    shaders: ShaderStages,
    commands: CommandRecorder,
    frame_sync: Vec<FrameSync>,
    vertex_buffer: VertexBuffer,

    clear_color: [f32; 4],
    present_mode: vk::PresentModeKHR,
    device: Arc<VulkanDevice>,
}

impl Renderer {
    /// Build everything needed to draw the grid into a window of size `drawable`
    pub fn new(device: Arc<VulkanDevice>, config: &Config, drawable: vk::Extent2D) -> Result<Self> {
        // ─── Shaders ───
        let shaders = ShaderStages::load(&device, &config.shaders.vertex, &config.shaders.fragment)
            .context("Failed to load grid shaders")?;

        // ─── Presentation surface ───
        let present_mode = config.get_present_mode();
        let swapchain = Swapchain::new(device.clone(), drawable, present_mode)
            .context("Failed to create swapchain")?;

        // ─── Pipeline + framebuffers ───
        let pipeline = GraphicsPipeline::new(&device, swapchain.format, &shaders)
            .context("Failed to create graphics pipeline")?;
        let framebuffers = Framebuffers::new(&device, pipeline.render_pass, &swapchain)
            .context("Failed to create framebuffers")?;

        // ─── Frame slots ───
        let frames_in_flight = config.frames_in_flight();
        let commands = CommandRecorder::new(&device, frames_in_flight)?;
        let frame_sync = create_frame_slots(&device, frames_in_flight)?;

        // ─── Geometry ───
        let vertices = geometry::triangle_grid(config.geometry.max_triangles);
        let vertex_buffer =
            VertexBuffer::new(&device, vertices.len(), config.graphics.vertex_upload)
                .context("Failed to create vertex buffer")?;

        log::info!(
            "Renderer ready: {} frames in flight, {} swapchain images ({:?}), {} triangles",
            frames_in_flight,
            swapchain.image_count(),
            swapchain.present_mode,
            vertices.len() / 3
        );

        let mut renderer = Self {
            framebuffers: Some(framebuffers),
            swapchain: Some(swapchain),
            pipeline,
            shaders,
            commands,
            frame_sync,
            vertex_buffer,
            clear_color: config.graphics.clear_color,
            present_mode,
            device,
        };
        renderer.write_vertices(&vertices)?;

        Ok(renderer)
    }

    /// Replace the vertex data. Drains the device first so no draw is reading it.
    pub fn write_vertices(&mut self, vertices: &[Vertex]) -> Result<()> {
        self.device
            .wait_idle()
            .context("Failed waiting for device idle before vertex upload")?;
        self.vertex_buffer
            .write(vertices)
            .context("Failed to upload vertex data")
    }
}

impl PresentBackend for Renderer {
    fn frames_in_flight(&self) -> usize {
        self.frame_sync.len()
    }

    fn wait_for_slot(&mut self, slot: usize) -> Result<(), vk::Result> {
        self.frame_sync[slot].wait()
    }

    fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome, vk::Result> {
        let Some(chain) = &self.swapchain else {
            return Ok(AcquireOutcome::OutOfDate);
        };

        match chain.acquire_next_image(u64::MAX, self.frame_sync[slot].image_available) {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(e),
        }
    }

    fn reset_slot(&mut self, slot: usize) -> Result<(), vk::Result> {
        self.frame_sync[slot].reset()
    }

    fn record(&mut self, slot: usize, image_index: u32) -> Result<(), RecordError> {
        let (Some(chain), Some(framebuffers)) = (&self.swapchain, &self.framebuffers) else {
            return Err(RecordError::NoFramebuffer(image_index));
        };
        let framebuffer = framebuffers
            .get(image_index)
            .ok_or(RecordError::NoFramebuffer(image_index))?;

        let target = DrawTarget {
            render_pass: self.pipeline.render_pass,
            framebuffer,
            pipeline: self.pipeline.pipeline,
            extent: chain.extent,
            vertex_buffer: self.vertex_buffer.handle(),
            vertex_count: self.vertex_buffer.vertex_count(),
            clear_color: self.clear_color,
        };
        self.commands.record(slot, &target)
    }

    fn submit(&mut self, slot: usize) -> Result<(), vk::Result> {
        let sync = &self.frame_sync[slot];
        let wait_semaphores = [sync.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.commands.buffer(slot)];
        let signal_semaphores = [sync.render_finished];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.device.device.queue_submit(
                self.device.graphics_queue,
                &[submit_info],
                sync.in_flight_fence,
            )
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome, vk::Result> {
        let Some(chain) = &self.swapchain else {
            return Ok(PresentOutcome::Stale);
        };

        let wait_semaphores = [self.frame_sync[slot].render_finished];
        match chain.present(self.device.present_queue, image_index, &wait_semaphores) {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(e) => Err(e),
        }
    }

    fn wait_idle(&mut self) -> Result<(), vk::Result> {
        self.device.wait_idle()
    }

    fn rebuild_surface(&mut self, extent: vk::Extent2D) -> Result<(), SurfaceError> {
        // Framebuffers reference the views, the views belong to the chain
        self.framebuffers = None;
        self.swapchain = None;

        let chain = Swapchain::new(self.device.clone(), extent, self.present_mode)?;

        if chain.format != self.pipeline.format {
            log::info!(
                "Surface format changed {:?} -> {:?}, rebuilding pipeline",
                self.pipeline.format,
                chain.format
            );
            self.pipeline = GraphicsPipeline::new(&self.device, chain.format, &self.shaders)?;
        }

        self.framebuffers = Some(Framebuffers::new(
            &self.device,
            self.pipeline.render_pass,
            &chain,
        )?);
        self.swapchain = Some(chain);
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Nothing below may be destroyed while the GPU still uses it
        if let Err(e) = self.device.wait_idle() {
            log::error!("Device wait idle failed during shutdown: {}", e);
        }
        log::info!("Destroying renderer");
    }
}
