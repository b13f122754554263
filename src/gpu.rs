//! Host side of the fragment-shader ray tracer: uniform/storage layouts and
//! the pipeline that draws the full-screen quad.

use crate::renderer::{
    IndexBuffer, StorageBuffer, UniformBuffer, Vertex, VertexBuffer, QUAD_INDICES, QUAD_VERTICES,
};
use crate::scene::{Scene, Sphere};
use crate::shader::{compile_program, Program, ProgramSource, ProgramTargets, ShaderError};
use crate::tracer::Frame;

pub const RAYTRACE_WGSL: &str = include_str!("asset/shader/raytrace.wgsl");

pub const RAYTRACE_PROGRAM: ProgramSource<'static> = ProgramSource {
    label: "raytrace",
    wgsl: RAYTRACE_WGSL,
    vertex_entry: "vs_main",
    fragment_entry: "fs_main",
};

/// std430 image of a [`Sphere`] (48 bytes, 16 byte aligned).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuSphere {
    pub center: glam::Vec3,
    pub radius: f32,
    pub color: glam::Vec3,
    pub shininess: f32,
    pub reflectivity: f32,
    pub _padding: [f32; 3],
}

impl From<&Sphere> for GpuSphere {
    fn from(sphere: &Sphere) -> Self {
        Self {
            center: sphere.center,
            radius: sphere.radius,
            color: sphere.color,
            shininess: sphere.shininess,
            reflectivity: sphere.reflectivity,
            _padding: [0.0; 3],
        }
    }
}

/// Mirrors `struct Frame` in `raytrace.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub camera_eye: [f32; 4],
    pub camera_target: [f32; 4],
    pub camera_up: [f32; 4],
    pub light_position: [f32; 4],
    pub resolution: [f32; 2],
    pub render_mode: u32,
    pub sphere_count: u32,
}

impl FrameUniforms {
    pub fn new(frame: Frame<'_>, width: u32, height: u32) -> Self {
        let camera = frame.camera;
        Self {
            camera_eye: camera.eye.extend(camera.fov_scale()).to_array(),
            camera_target: camera.target.extend(0.0).to_array(),
            camera_up: camera.up.extend(0.0).to_array(),
            light_position: frame
                .light
                .position
                .extend(frame.scene.ambient_strength)
                .to_array(),
            resolution: [width.max(1) as f32, height.max(1) as f32],
            render_mode: frame.mode as u32,
            sphere_count: frame.scene.spheres.len() as u32,
        }
    }
}

/// Packs the scene for upload. An empty scene still yields one zeroed slot
/// because zero-sized storage bindings are invalid; `sphere_count` masks it.
pub fn pack_spheres(scene: &Scene) -> Vec<GpuSphere> {
    let mut packed: Vec<GpuSphere> = scene.spheres.iter().map(GpuSphere::from).collect();
    if packed.is_empty() {
        packed.push(bytemuck::Zeroable::zeroed());
    }
    packed
}

/// Sphere storage buffer and the bind group that exposes it with the frame
/// uniforms. Rebuilt whenever a new scene is uploaded.
pub struct SceneBindings {
    spheres: StorageBuffer<GpuSphere>,
    bind_group: wgpu::BindGroup,
}

impl SceneBindings {
    pub fn sphere_slots(&self) -> usize {
        self.spheres.count()
    }
}

pub struct RayTracePipeline {
    program: Program,
    bind_group_layout: wgpu::BindGroupLayout,
    frame_uniforms: UniformBuffer<FrameUniforms>,
    vertex_buffer: VertexBuffer,
    index_buffer: IndexBuffer,
}

impl RayTracePipeline {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("raytrace_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Ray Trace Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let program = compile_program(
            device,
            RAYTRACE_PROGRAM,
            ProgramTargets {
                layout: &layout,
                vertex_buffers: &[Vertex::layout()],
                color_format,
            },
        )?;

        let frame_uniforms: UniformBuffer<FrameUniforms> = UniformBuffer::init_immediate(
            device,
            &bytemuck::Zeroable::zeroed(),
            Some("Frame Uniform Buffer"),
        );
        let vertex_buffer = VertexBuffer::init_immediate(
            device,
            bytemuck::cast_slice(QUAD_VERTICES),
            Some("Quad Vertex Buffer"),
        );
        let index_buffer =
            IndexBuffer::init_immediate_u16(device, QUAD_INDICES, Some("Quad Index Buffer"));

        Ok(Self {
            program,
            bind_group_layout,
            frame_uniforms,
            vertex_buffer,
            index_buffer,
        })
    }

    pub fn bind_scene(&self, device: &wgpu::Device, scene: &Scene) -> SceneBindings {
        let spheres =
            StorageBuffer::init_immediate(device, &pack_spheres(scene), Some("Sphere Buffer"));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("raytrace_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.frame_uniforms.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: spheres.buffer().as_entire_binding(),
                },
            ],
        });
        tracing::info!(spheres = scene.spheres.len(), "scene uploaded");
        SceneBindings {
            spheres,
            bind_group,
        }
    }

    pub fn write_frame(&self, queue: &wgpu::Queue, uniforms: &FrameUniforms) {
        self.frame_uniforms.write(queue, uniforms);
    }

    pub fn draw<'pass>(
        &'pass self,
        render_pass: &mut wgpu::RenderPass<'pass>,
        bindings: &'pass SceneBindings,
    ) {
        render_pass.set_pipeline(&self.program.pipeline);
        render_pass.set_bind_group(0, &bindings.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.buffer().slice(..));
        render_pass.set_index_buffer(
            self.index_buffer.buffer().slice(..),
            self.index_buffer.format(),
        );
        render_pass.draw_indexed(0..self.index_buffer.count(), 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::tracer::{Light, RenderMode};

    #[test]
    fn layouts_match_wgsl() {
        assert_eq!(std::mem::size_of::<GpuSphere>(), 48);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 80);
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
    }

    #[test]
    fn frame_uniforms_carry_mode_light_and_ambient() {
        let scene = Scene::default();
        let camera = Camera::default();
        let uniforms = FrameUniforms::new(
            Frame {
                scene: &scene,
                camera: &camera,
                light: Light {
                    position: glam::Vec3::new(-3.0, 5.0, 5.0),
                },
                mode: RenderMode::PhongShadow,
            },
            640,
            480,
        );
        assert_eq!(uniforms.render_mode, 2);
        assert_eq!(uniforms.sphere_count, 7);
        assert_eq!(uniforms.light_position, [-3.0, 5.0, 5.0, 0.15]);
        assert_eq!(uniforms.resolution, [640.0, 480.0]);
        assert_eq!(uniforms.camera_eye[3], camera.fov_scale());
    }

    #[test]
    fn empty_scene_still_packs_one_slot() {
        let packed = pack_spheres(&Scene::new(Vec::new(), 0.1));
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].radius, 0.0);
    }

    #[test]
    fn packs_spheres_in_index_order() {
        let scene = Scene::default();
        let packed = pack_spheres(&scene);
        assert_eq!(packed.len(), scene.spheres.len());
        for (gpu, cpu) in packed.iter().zip(&scene.spheres) {
            assert_eq!(gpu.center, cpu.center);
            assert_eq!(gpu.reflectivity, cpu.reflectivity);
        }
    }

    #[test]
    fn raytrace_shader_validates() {
        use naga::valid::{Capabilities, ValidationFlags, Validator};

        let module = naga::front::wgsl::parse_str(RAYTRACE_WGSL)
            .unwrap_or_else(|error| panic!("{}", error.emit_to_string(RAYTRACE_WGSL)));
        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .unwrap();
        for entry in [RAYTRACE_PROGRAM.vertex_entry, RAYTRACE_PROGRAM.fragment_entry] {
            assert!(module.entry_points.iter().any(|ep| ep.name == entry));
        }
    }

    #[test]
    fn shader_declares_the_bindings_it_is_given() {
        assert!(RAYTRACE_WGSL.contains("var<uniform> frame: Frame;"));
        assert!(RAYTRACE_WGSL.contains("var<storage, read> spheres: array<Sphere>;"));
        assert!(RAYTRACE_WGSL.contains("const MAX_BOUNCES: u32 = 3u;"));
        assert!(RAYTRACE_WGSL.contains("const EPSILON: f32 = 0.001;"));
    }
}
