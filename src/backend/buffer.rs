// Buffer utilities for the grid's vertex data
//
// Two upload strategies: a device-local buffer filled through a staging copy,
// or a host-visible buffer written in place.

use ash::vk;
use std::sync::Arc;

use super::error::BufferError;
use super::VulkanDevice;
use crate::config::VertexUpload;
use crate::geometry::Vertex;

/// Find a memory type allowed by `type_bits` that has every requested property
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    properties: vk::MemoryPropertyFlags,
) -> Result<u32, BufferError> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            let allowed = type_bits & (1 << i) != 0;
            allowed
                && memory_properties.memory_types[i as usize]
                    .property_flags
                    .contains(properties)
        })
        .ok_or(BufferError::NoMemoryType {
            type_bits,
            properties,
        })
}

/// Copy vertices into mapped memory, returning the number of bytes written
pub fn copy_into_mapped(dst: &mut [u8], vertices: &[Vertex]) -> Result<usize, BufferError> {
    let bytes: &[u8] = bytemuck::cast_slice(vertices);
    if bytes.len() > dst.len() {
        return Err(BufferError::Overflow {
            requested: bytes.len() as vk::DeviceSize,
            capacity: dst.len() as vk::DeviceSize,
        });
    }
    dst[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

/// A buffer and its dedicated allocation, freed on drop
pub struct GpuBuffer {
    pub buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
    device: Arc<VulkanDevice>,
}

impl GpuBuffer {
    pub fn new(
        device: &Arc<VulkanDevice>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self, BufferError> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        // Null memory is valid to free, so Drop covers a failed allocation
        let mut gpu = Self {
            buffer: unsafe { device.device.create_buffer(&buffer_info, None) }
                .map_err(BufferError::vulkan("create buffer"))?,
            memory: vk::DeviceMemory::null(),
            size,
            device: device.clone(),
        };

        let requirements = unsafe { device.device.get_buffer_memory_requirements(gpu.buffer) };
        let memory_type_index = find_memory_type(
            &device.memory_properties,
            requirements.memory_type_bits,
            properties,
        )?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        unsafe {
            gpu.memory = device
                .device
                .allocate_memory(&alloc_info, None)
                .map_err(BufferError::vulkan("allocate buffer memory"))?;
            device
                .device
                .bind_buffer_memory(gpu.buffer, gpu.memory, 0)
                .map_err(BufferError::vulkan("bind buffer memory"))?;
        }

        Ok(gpu)
    }

    /// Map the whole buffer, hand it to `fill`, then unmap
    pub fn write_mapped<F>(&self, fill: F) -> Result<usize, BufferError>
    where
        F: FnOnce(&mut [u8]) -> Result<usize, BufferError>,
    {
        let ptr = unsafe {
            self.device
                .device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
        }
        .map_err(BufferError::vulkan("map buffer memory"))?;

        let dst = unsafe { std::slice::from_raw_parts_mut(ptr.cast::<u8>(), self.size as usize) };
        let written = fill(dst);

        unsafe { self.device.device.unmap_memory(self.memory) };
        written
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_buffer(self.buffer, None);
            self.device.device.free_memory(self.memory, None);
        }
    }
}

/// Record and run a one-off buffer copy on the graphics queue, blocking until done
fn copy_buffer(
    device: &VulkanDevice,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
) -> Result<(), BufferError> {
    let pool_info = vk::CommandPoolCreateInfo::builder()
        .flags(vk::CommandPoolCreateFlags::TRANSIENT)
        .queue_family_index(device.graphics_queue_family);
    let pool = unsafe { device.device.create_command_pool(&pool_info, None) }
        .map_err(BufferError::vulkan("create transfer command pool"))?;

    let result = (|| unsafe {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = device
            .device
            .allocate_command_buffers(&alloc_info)
            .map_err(BufferError::vulkan("allocate transfer command buffer"))?[0];

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        device
            .device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(BufferError::vulkan("begin transfer command buffer"))?;

        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        device.device.cmd_copy_buffer(command_buffer, src, dst, &[region]);
        device
            .device
            .end_command_buffer(command_buffer)
            .map_err(BufferError::vulkan("end transfer command buffer"))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);
        device
            .device
            .queue_submit(device.graphics_queue, &[submit_info.build()], vk::Fence::null())
            .map_err(BufferError::vulkan("submit transfer"))?;
        device
            .device
            .queue_wait_idle(device.graphics_queue)
            .map_err(BufferError::vulkan("wait for transfer"))
    })();

    // Destroying the pool frees its command buffer
    unsafe { device.device.destroy_command_pool(pool, None) };
    result
}

/// The vertex buffer the draw reads from, plus its staging buffer when staged
pub struct VertexBuffer {
    buffer: GpuBuffer,
    staging: Option<GpuBuffer>,
    vertex_count: u32,
    device: Arc<VulkanDevice>,
}

impl VertexBuffer {
    /// Allocate room for `max_vertices` vertices
    pub fn new(
        device: &Arc<VulkanDevice>,
        max_vertices: usize,
        upload: VertexUpload,
    ) -> Result<Self, BufferError> {
        // Zero-sized buffers are invalid, keep room for at least one vertex
        let capacity = (std::mem::size_of::<Vertex>() * max_vertices.max(1)) as vk::DeviceSize;
        let host_visible =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;

        let (buffer, staging) = match upload {
            VertexUpload::Staged => {
                let staging = GpuBuffer::new(
                    device,
                    capacity,
                    vk::BufferUsageFlags::TRANSFER_SRC,
                    host_visible,
                )?;
                let buffer = GpuBuffer::new(
                    device,
                    capacity,
                    vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
                    vk::MemoryPropertyFlags::DEVICE_LOCAL,
                )?;
                (buffer, Some(staging))
            }
            VertexUpload::Mapped => {
                let buffer = GpuBuffer::new(
                    device,
                    capacity,
                    vk::BufferUsageFlags::VERTEX_BUFFER,
                    host_visible,
                )?;
                (buffer, None)
            }
        };

        log::info!("Created vertex buffer: {} bytes ({:?} upload)", capacity, upload);

        Ok(Self {
            buffer,
            staging,
            vertex_count: 0,
            device: device.clone(),
        })
    }

    /// Replace the buffer's contents. The GPU must not be reading it.
    pub fn write(&mut self, vertices: &[Vertex]) -> Result<(), BufferError> {
        let host = self.staging.as_ref().unwrap_or(&self.buffer);
        let written = host.write_mapped(|dst| copy_into_mapped(dst, vertices))?;

        if let Some(staging) = &self.staging {
            if written > 0 {
                copy_buffer(
                    &self.device,
                    staging.buffer,
                    self.buffer.buffer,
                    written as vk::DeviceSize,
                )?;
            }
        }

        self.vertex_count = vertices.len() as u32;
        log::debug!("Uploaded {} vertices ({} bytes)", self.vertex_count, written);
        Ok(())
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}
