// Synchronization primitives
//
// Fences, semaphores for GPU-CPU and GPU-GPU sync
// Critical for correct and efficient multi-frame rendering

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use super::VulkanDevice;

/// Frame synchronization - one per frame in flight
pub struct FrameSync {
    /// Signaled by acquire, waited on by submit
    pub image_available: vk::Semaphore,
    /// Signaled by submit, waited on by present
    pub render_finished: vk::Semaphore,
    /// Signaled when the slot's GPU work completes
    pub in_flight_fence: vk::Fence,
    device: Arc<VulkanDevice>,
}

impl FrameSync {
    pub fn new(device: &Arc<VulkanDevice>) -> Result<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED); // Start signaled

        // Null handles are valid to destroy, so a failure halfway leaks nothing
        let mut sync = Self {
            image_available: vk::Semaphore::null(),
            render_finished: vk::Semaphore::null(),
            in_flight_fence: vk::Fence::null(),
            device: device.clone(),
        };

        unsafe {
            sync.image_available = device
                .device
                .create_semaphore(&semaphore_info, None)
                .context("Failed to create image-available semaphore")?;
            sync.render_finished = device
                .device
                .create_semaphore(&semaphore_info, None)
                .context("Failed to create render-finished semaphore")?;
            sync.in_flight_fence = device
                .device
                .create_fence(&fence_info, None)
                .context("Failed to create in-flight fence")?;
        }

        Ok(sync)
    }

    /// Block until the slot's last submission has finished on the GPU
    pub fn wait(&self) -> Result<(), vk::Result> {
        unsafe {
            self.device
                .device
                .wait_for_fences(&[self.in_flight_fence], true, u64::MAX)
        }
    }

    /// Return the fence to unsignaled so the next submit can arm it
    pub fn reset(&self) -> Result<(), vk::Result> {
        unsafe { self.device.device.reset_fences(&[self.in_flight_fence]) }
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_semaphore(self.image_available, None);
            self.device.device.destroy_semaphore(self.render_finished, None);
            self.device.device.destroy_fence(self.in_flight_fence, None);
        }
    }
}

/// Create `count` independent frame slots
pub fn create_frame_slots(device: &Arc<VulkanDevice>, count: usize) -> Result<Vec<FrameSync>> {
    (0..count).map(|_| FrameSync::new(device)).collect()
}
