use std::borrow::Cow;

/// WGSL source together with the entry points that form one program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub wgsl: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
}

/// Fixed-function state the program is linked against.
pub struct ProgramTargets<'a> {
    pub layout: &'a wgpu::PipelineLayout,
    pub vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    pub color_format: wgpu::TextureFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("shader '{label}' has no entry point '{entry}'")]
    MissingEntryPoint { label: String, entry: String },
    #[error("shader '{label}' failed to compile: {message}")]
    Compile { label: String, message: String },
    #[error("program '{label}' failed to link: {message}")]
    Link { label: String, message: String },
}

/// Compiled and linked render program.
pub struct Program {
    pub pipeline: wgpu::RenderPipeline,
}

/// Compiles `source` and links it into a render pipeline.
///
/// Validation errors are captured with an error scope instead of reaching
/// the device's uncaptured error handler.
pub fn compile_program(
    device: &wgpu::Device,
    source: ProgramSource<'_>,
    targets: ProgramTargets<'_>,
) -> Result<Program, ShaderError> {
    for entry in [source.vertex_entry, source.fragment_entry] {
        if !declares_entry_point(source.wgsl, entry) {
            return Err(ShaderError::MissingEntryPoint {
                label: source.label.to_owned(),
                entry: entry.to_owned(),
            });
        }
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(source.label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source.wgsl)),
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(ShaderError::Compile {
            label: source.label.to_owned(),
            message: error.to_string(),
        });
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(source.label),
        layout: Some(targets.layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: source.vertex_entry,
            buffers: targets.vertex_buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: source.fragment_entry,
            targets: &[Some(wgpu::ColorTargetState {
                format: targets.color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(ShaderError::Link {
            label: source.label.to_owned(),
            message: error.to_string(),
        });
    }

    tracing::info!(label = source.label, "shader program ready");
    Ok(Program { pipeline })
}

fn declares_entry_point(wgsl: &str, entry: &str) -> bool {
    wgsl.match_indices("fn ").any(|(index, _)| {
        let rest = wgsl[index + 3..].trim_start();
        rest.strip_prefix(entry)
            .map_or(false, |tail| tail.trim_start().starts_with('('))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_declared_entry_points() {
        let wgsl = "@vertex\nfn vs_main(@location(0) p: vec2<f32>) {}\n@fragment\nfn  fs_main () {}";
        assert!(declares_entry_point(wgsl, "vs_main"));
        assert!(declares_entry_point(wgsl, "fs_main"));
        assert!(!declares_entry_point(wgsl, "vs"));
        assert!(!declares_entry_point(wgsl, "main"));
    }

    #[test]
    fn error_messages_name_the_program() {
        let error = ShaderError::MissingEntryPoint {
            label: "raytrace".into(),
            entry: "fs_main".into(),
        };
        assert_eq!(
            error.to_string(),
            "shader 'raytrace' has no entry point 'fs_main'"
        );
    }
}
