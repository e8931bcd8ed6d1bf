// Procedural geometry: a full-screen grid of colored quads
//
// The grid is the only content the demo draws. It is generated once at
// startup and sized from the configured triangle budget.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::mem::{offset_of, size_of};

/// Interleaved vertex as the grid shaders consume it
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    fn new(position: Vec2, color: [f32; 4]) -> Self {
        Self {
            position: position.extend(0.0).to_array(),
            color,
            uv: [0.0; 2],
        }
    }

    /// One interleaved binding at slot 0
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::builder()
            .binding(0)
            .stride(size_of::<Self>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
            .build()
    }

    /// position (location 0), color (location 1), uv (location 2)
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription::builder()
                .binding(0)
                .location(0)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(offset_of!(Self, position) as u32)
                .build(),
            vk::VertexInputAttributeDescription::builder()
                .binding(0)
                .location(1)
                .format(vk::Format::R32G32B32A32_SFLOAT)
                .offset(offset_of!(Self, color) as u32)
                .build(),
            vk::VertexInputAttributeDescription::builder()
                .binding(0)
                .location(2)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(offset_of!(Self, uv) as u32)
                .build(),
        ]
    }
}

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Cells per side for a triangle budget (two triangles per cell)
pub fn grid_size(max_triangles: u32) -> u32 {
    f64::from(max_triangles / 2).sqrt().floor() as u32
}

/// Generate a square grid covering clip space [-1, 1] x [-1, 1].
///
/// Produces `grid_size(max_triangles)^2 * 2` triangles as a triangle list,
/// row by row, each cell split along its bottom-left/top-right diagonal.
pub fn triangle_grid(max_triangles: u32) -> Vec<Vertex> {
    let size = grid_size(max_triangles);
    if size == 0 {
        return Vec::new();
    }

    let d = 1.0 / size as f32;
    let origin = Vec2::new(-1.0 + d, 1.0 - d);
    let mut vertices = Vec::with_capacity((size * size * 6) as usize);

    for y in 0..size {
        for x in 0..size {
            let center = origin + Vec2::new(x as f32, -(y as f32)) * (2.0 * d);
            let top_left = center + Vec2::new(-d, d);
            let bottom_left = center + Vec2::new(-d, -d);
            let top_right = center + Vec2::new(d, d);
            let bottom_right = center + Vec2::new(d, -d);

            vertices.extend_from_slice(&[
                Vertex::new(top_left, RED),
                Vertex::new(bottom_left, GREEN),
                Vertex::new(top_right, BLUE),
                Vertex::new(bottom_left, GREEN),
                Vertex::new(bottom_right, WHITE),
                Vertex::new(top_right, BLUE),
            ]);
        }
    }

    vertices
}
