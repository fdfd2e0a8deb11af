//! Program construction: shader module, bind group layouts, render pipeline.

use crate::backend::{check_attributes, check_entry_points, ProgramDesc, VertexAttribute};
use crate::coords::Mat4;
use crate::error::DrawError;

/// Size of the transform uniform (`mat4x4<f32>`).
pub(super) const MATRIX_BYTES: u64 = std::mem::size_of::<Mat4>() as u64;

/// One linked program and the uniform its matrix lives in.
pub(super) struct Program {
    pub label: String,
    pub pipeline: wgpu::RenderPipeline,
    pub matrix_ubo: wgpu::Buffer,
    pub matrix_bind_group: wgpu::BindGroup,
    /// Last matrix staged through `upload_matrix`.
    pub matrix: Mat4,
    pub stride_bytes: u64,
    pub textured: bool,
}

impl Program {
    pub fn destroy(self) {
        self.matrix_ubo.destroy();
    }
}

pub(super) fn matrix_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("pencil transform bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(MATRIX_BYTES),
            },
            count: None,
        }],
    })
}

pub(super) fn texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("pencil texture bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Shared layouts a program is built against.
pub(super) struct Layouts<'a> {
    pub matrix: &'a wgpu::BindGroupLayout,
    pub texture: &'a wgpu::BindGroupLayout,
    pub surface_format: wgpu::TextureFormat,
}

pub(super) fn build_program(
    device: &wgpu::Device,
    layouts: &Layouts<'_>,
    desc: &ProgramDesc<'_>,
) -> Result<Program, DrawError> {
    check_entry_points(desc)?;
    check_attributes(desc)?;

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(desc.label),
        source: wgpu::ShaderSource::Wgsl(desc.source.into()),
    });
    compilation_errors(desc.label, &module)?;

    let wgpu_attrs = vertex_attributes(desc.attributes);
    let stride_bytes = (desc.stride() * std::mem::size_of::<f32>()) as u64;

    let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = if desc.textured {
        vec![layouts.matrix, layouts.texture]
    } else {
        vec![layouts.matrix]
    };

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: &bind_group_layouts,
        immediate_size: 0,
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some(desc.vertex_entry),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: stride_bytes,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu_attrs,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some(desc.fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: layouts.surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    let matrix_ubo = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(desc.label),
        size: MATRIX_BYTES,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let matrix_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(desc.label),
        layout: layouts.matrix,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: matrix_ubo.as_entire_binding(),
        }],
    });

    Ok(Program {
        label: desc.label.to_string(),
        pipeline,
        matrix_ubo,
        matrix_bind_group,
        matrix: Mat4::IDENTITY,
        stride_bytes,
        textured: desc.textured,
    })
}

fn vertex_attributes(attrs: &[VertexAttribute]) -> Vec<wgpu::VertexAttribute> {
    let mut offset = 0u64;
    attrs
        .iter()
        .map(|a| {
            let format = match a.components {
                1 => wgpu::VertexFormat::Float32,
                2 => wgpu::VertexFormat::Float32x2,
                3 => wgpu::VertexFormat::Float32x3,
                _ => wgpu::VertexFormat::Float32x4,
            };
            let out = wgpu::VertexAttribute {
                format,
                offset,
                shader_location: a.location,
            };
            offset += format.size();
            out
        })
        .collect()
}

fn compilation_errors(label: &str, module: &wgpu::ShaderModule) -> Result<(), DrawError> {
    let info = pollster::block_on(module.get_compilation_info());
    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| match &m.location {
            Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, m.message),
            None => m.message.clone(),
        })
        .collect();

    for m in info
        .messages
        .iter()
        .filter(|m| m.message_type != wgpu::CompilationMessageType::Error)
    {
        log::debug!("shader `{label}`: {}", m.message);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(DrawError::Shader {
            label: label.to_string(),
            message: errors.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TEXTURED_ATTRIBUTES;

    #[test]
    fn attributes_are_tightly_packed() {
        let attrs = vertex_attributes(&TEXTURED_ATTRIBUTES);
        let offsets: Vec<u64> = attrs.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 28]);
        assert_eq!(attrs[1].format, wgpu::VertexFormat::Float32x4);
        assert_eq!(attrs[2].shader_location, 2);
    }

    #[test]
    fn matrix_uniform_is_sixty_four_bytes() {
        assert_eq!(MATRIX_BYTES, 64);
    }
}
