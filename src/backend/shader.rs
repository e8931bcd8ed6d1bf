// Shader module loading and management
//
// Vulkan uses SPIR-V bytecode for shaders. build.rs compiles the GLSL in
// shaders/ ahead of time; this module loads the result at startup.

use anyhow::{Context, Result};
use ash::vk;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use super::VulkanDevice;

/// Decode SPIR-V bytes into words, fixing endianness and rejecting truncated input
pub fn parse_spirv(code: &[u8]) -> Result<Vec<u32>> {
    ash::util::read_spv(&mut Cursor::new(code)).context("Invalid SPIR-V bytecode")
}

/// Owned shader module, destroyed on drop
pub struct ShaderModule {
    pub handle: vk::ShaderModule,
    device: Arc<VulkanDevice>,
}

impl ShaderModule {
    /// Create a shader module from SPIR-V bytes
    pub fn from_bytes(device: &Arc<VulkanDevice>, code: &[u8]) -> Result<Self> {
        let words = parse_spirv(code)?;
        let create_info = vk::ShaderModuleCreateInfo::builder().code(&words);

        let handle = unsafe { device.device.create_shader_module(&create_info, None) }
            .context("Failed to create shader module")?;

        Ok(Self {
            handle,
            device: device.clone(),
        })
    }

    /// Read a compiled .spv file and create a module from it
    pub fn load(device: &Arc<VulkanDevice>, path: &Path) -> Result<Self> {
        let code = std::fs::read(path)
            .with_context(|| format!("Failed to open shader file: {:?}", path))?;
        log::debug!("Loaded shader {:?} ({} bytes)", path, code.len());
        Self::from_bytes(device, &code).with_context(|| format!("Bad shader: {:?}", path))
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe { self.device.device.destroy_shader_module(self.handle, None) };
    }
}

/// The vertex + fragment pair the grid pipeline is built from
pub struct ShaderStages {
    pub vertex: ShaderModule,
    pub fragment: ShaderModule,
}

impl ShaderStages {
    pub fn load(device: &Arc<VulkanDevice>, vertex: &Path, fragment: &Path) -> Result<Self> {
        Ok(Self {
            vertex: ShaderModule::load(device, vertex)?,
            fragment: ShaderModule::load(device, fragment)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    #[test]
    fn accepts_word_aligned_spirv() {
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        let words = parse_spirv(&bytes).unwrap();
        assert_eq!(words, vec![SPIRV_MAGIC, 0x0001_0000]);
    }

    #[test]
    fn rejects_truncated_bytecode() {
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.push(0);
        assert!(parse_spirv(&bytes).is_err());
    }
}
