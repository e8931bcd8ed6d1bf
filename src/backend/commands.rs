// Command buffer recording
//
// One primary command buffer per frame slot, re-recorded every frame after
// the slot's fence confirms the GPU is done with it.

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use super::error::RecordError;
use super::VulkanDevice;

/// Everything a frame's draw needs, resolved for the acquired image
#[derive(Debug, Clone, Copy)]
pub struct DrawTarget {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub pipeline: vk::Pipeline,
    pub extent: vk::Extent2D,
    pub vertex_buffer: vk::Buffer,
    pub vertex_count: u32,
    pub clear_color: [f32; 4],
}

/// Full-extent viewport with the standard depth range
pub fn viewport_for(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

pub fn scissor_for(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

pub struct CommandRecorder {
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
    device: Arc<VulkanDevice>,
}

impl CommandRecorder {
    /// Create a resettable pool on the graphics family and `count` primary buffers
    pub fn new(device: &Arc<VulkanDevice>, count: usize) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(device.graphics_queue_family);

        let pool = unsafe { device.device.create_command_pool(&pool_info, None) }
            .context("Failed to create command pool")?;

        // Owned from here so the pool is destroyed if allocation fails
        let mut recorder = Self {
            pool,
            buffers: Vec::new(),
            device: device.clone(),
        };

        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count as u32);

        recorder.buffers = unsafe { device.device.allocate_command_buffers(&alloc_info) }
            .context("Failed to allocate command buffers")?;

        Ok(recorder)
    }

    pub fn buffer(&self, slot: usize) -> vk::CommandBuffer {
        self.buffers[slot]
    }

    /// Re-record slot `slot`'s command buffer to clear and draw into `target`
    pub fn record(&self, slot: usize, target: &DrawTarget) -> Result<(), RecordError> {
        let device = &self.device.device;
        let command_buffer = self.buffers[slot];

        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(RecordError::Reset)?;

            let begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(RecordError::Begin)?;

            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: target.clear_color,
                },
            }];

            let render_pass_info = vk::RenderPassBeginInfo::builder()
                .render_pass(target.render_pass)
                .framebuffer(target.framebuffer)
                .render_area(scissor_for(target.extent))
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                target.pipeline,
            );
            device.cmd_set_viewport(command_buffer, 0, &[viewport_for(target.extent)]);
            device.cmd_set_scissor(command_buffer, 0, &[scissor_for(target.extent)]);
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[target.vertex_buffer], &[0]);
            device.cmd_draw(command_buffer, target.vertex_count, 1, 0, 0);
            device.cmd_end_render_pass(command_buffer);

            device
                .end_command_buffer(command_buffer)
                .map_err(RecordError::End)?;
        }

        Ok(())
    }
}

impl Drop for CommandRecorder {
    fn drop(&mut self) {
        // Frees the command buffers along with the pool
        unsafe { self.device.device.destroy_command_pool(self.pool, None) };
    }
}
