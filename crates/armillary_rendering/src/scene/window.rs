//! Native window backend - winit for the window, wgpu for drawing.
//!
//! ```text
//! group 0: camera   { view_proj, eye }           one per scene
//! group 1: actor    { model, color, flags }      one per actor
//!
//! pipelines: TriangleList | LineList | PointList  (chosen by Mesh::topology)
//! ```
//!
//! Events are drained with `pump_events` and a zero timeout, so the
//! caller's simulation loop stays in charge. Line widths are recorded
//! but wgpu rasterizes 1-pixel lines and points.

use super::{union_bounds, ActorId, ActorProperties, SceneBackend, WindowStatus};
use crate::camera::Camera;
use crate::config::WindowConfig;
use crate::error::{RenderError, RenderResult};
use crate::mesh::{Bounds, Mesh, Topology};
use armillary_shared::{Real, Transform};
use bytemuck::{Pod, Zeroable};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const SHADER: &str = r"
struct Camera {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
};

struct ActorUniform {
    model: mat4x4<f32>,
    color: vec4<f32>,
    // x: use vertex color, y: lit
    flags: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var<uniform> actor: ActorUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(v: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip = camera.view_proj * actor.model * vec4<f32>(v.position, 1.0);
    out.normal = (actor.model * vec4<f32>(v.normal, 0.0)).xyz;
    out.color = select(actor.color, vec4<f32>(v.color.rgb, actor.color.a), actor.flags.x > 0.5);
    return out;
}

@fragment
fn fs_main(f: VertexOutput) -> @location(0) vec4<f32> {
    var shade = 1.0;
    if (actor.flags.y > 0.5) {
        let n = normalize(f.normal);
        let l = normalize(vec3<f32>(0.3, 1.0, 0.6));
        shade = 0.35 + 0.65 * abs(dot(n, l));
    }
    return vec4<f32>(f.color.rgb * shade, f.color.a);
}
";

/// Vertex layout uploaded to the GPU
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct GpuVertex {
    position: [f32; 3],
    normal: [f32; 3],
    color: [f32; 4],
}

impl GpuVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,  // position
        1 => Float32x3,  // normal
        2 => Float32x4,  // color
    ];

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct ActorUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    flags: [f32; 4],
}

/// GPU side of one actor.
struct GpuActor {
    mesh: Mesh,
    properties: ActorProperties,
    transform: Transform,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuActor {
    fn uniform(&self) -> ActorUniform {
        let use_vertex_color = if self.mesh.has_vertex_colors() { 1.0 } else { 0.0 };
        let lit = if self.mesh.topology == Topology::Triangles { 1.0 } else { 0.0 };
        ActorUniform {
            model: self.transform.to_cols_array_2d(),
            color: self.properties.color.with_alpha(self.properties.opacity),
            flags: [use_vertex_color, lit, 0.0, 0.0],
        }
    }
}

struct Pipelines {
    triangles: wgpu::RenderPipeline,
    lines: wgpu::RenderPipeline,
    points: wgpu::RenderPipeline,
}

impl Pipelines {
    fn get(&self, topology: Topology) -> &wgpu::RenderPipeline {
        match topology {
            Topology::Triangles => &self.triangles,
            Topology::Lines => &self.lines,
            Topology::Points => &self.points,
        }
    }
}

/// Scene drawn into a native window.
pub struct WindowScene {
    actors: BTreeMap<ActorId, GpuActor>,
    next_id: u64,
    camera: Camera,
    background: wgpu::Color,
    pipelines: Pipelines,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    actor_layout: wgpu::BindGroupLayout,
    depth_view: wgpu::TextureView,
    config: wgpu::SurfaceConfiguration,
    queue: wgpu::Queue,
    device: wgpu::Device,
    surface: wgpu::Surface<'static>,
    window: Arc<Window>,
    event_loop: EventLoop<()>,
}

impl WindowScene {
    /// Opens a window and initializes the GPU.
    ///
    /// Blocks on adapter and device requests.
    ///
    /// # Errors
    ///
    /// One `RenderError` variant per failing step. Anything created before
    /// the failure is dropped.
    pub fn new(window_config: &WindowConfig) -> RenderResult<Self> {
        let event_loop = EventLoop::new().map_err(|e| RenderError::EventLoop(e.to_string()))?;
        let window = WindowBuilder::new()
            .with_title(window_config.title.as_str())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height))
            .build(&event_loop)
            .map_err(|e| RenderError::WindowCreation(e.to_string()))?;
        let window = Arc::new(window);

        #[cfg(target_os = "windows")]
        let backends = wgpu::Backends::DX12;
        #[cfg(not(target_os = "windows"))]
        let backends = wgpu::Backends::PRIMARY;

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| RenderError::SurfaceCreation(e.to_string()))?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::AdapterUnavailable)?;

        info!(adapter = %adapter.get_info().name, "GPU adapter selected");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Armillary"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::DeviceRequest(e.to_string()))?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::SurfaceCreation("surface reports no formats".to_string()))?;
        let alpha_mode = caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_texture(&device, config.width, config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Decoration Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let camera_layout = uniform_layout(&device, "Camera Layout");
        let actor_layout = uniform_layout(&device, "Actor Layout");

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Decoration Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &actor_layout],
            push_constant_ranges: &[],
        });
        let pipeline = |label, topology| create_pipeline(&device, &pipeline_layout, &shader, format, label, topology);
        let pipelines = Pipelines {
            triangles: pipeline("Triangle Pipeline", wgpu::PrimitiveTopology::TriangleList),
            lines: pipeline("Line Pipeline", wgpu::PrimitiveTopology::LineList),
            points: pipeline("Point Pipeline", wgpu::PrimitiveTopology::PointList),
        };

        let bg = window_config.background;
        info!(
            width = config.width,
            height = config.height,
            title = %window_config.title,
            "Window created"
        );

        Ok(Self {
            actors: BTreeMap::new(),
            next_id: 0,
            camera: Camera::default(),
            background: wgpu::Color { r: f64::from(bg.r), g: f64::from(bg.g), b: f64::from(bg.b), a: 1.0 },
            pipelines,
            camera_buffer,
            camera_bind_group,
            actor_layout,
            depth_view,
            config,
            queue,
            device,
            surface,
            window,
            event_loop,
        })
    }

    fn upload_mesh(&self, mesh: &Mesh) -> (Option<wgpu::Buffer>, Option<wgpu::Buffer>, u32) {
        if mesh.is_empty() {
            return (None, None, 0);
        }
        let vertices: Vec<GpuVertex> = (0..mesh.vertex_count())
            .map(|i| GpuVertex {
                position: mesh.positions[i].to_f32_array(),
                normal: mesh.normals.get(i).map_or([0.0; 3], |n| n.to_f32_array()),
                color: mesh.colors.get(i).map_or([1.0; 4], |c| c.with_alpha(1.0)),
            })
            .collect();
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Actor Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Actor Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let count = u32::try_from(mesh.indices.len()).unwrap_or(u32::MAX);
        (Some(vertex_buffer), Some(index_buffer), count)
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.config.width = size.width.max(1);
        self.config.height = size.height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_texture(&self.device, self.config.width, self.config.height);
    }

    /// The host window.
    #[must_use]
    pub fn window(&self) -> &Window {
        &self.window
    }
}

fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    label: &str,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers: &[GpuVertex::desc()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            // Decorations are viewed from both sides
            cull_mode: None,
            front_face: wgpu::FrontFace::Ccw,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

impl SceneBackend for WindowScene {
    fn add_actor(&mut self, mesh: Mesh, properties: ActorProperties) -> ActorId {
        let id = ActorId(self.next_id);
        self.next_id += 1;

        let (vertex_buffer, index_buffer, index_count) = self.upload_mesh(&mesh);
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Actor Uniform"),
            size: std::mem::size_of::<ActorUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Actor Bind Group"),
            layout: &self.actor_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let actor = GpuActor {
            mesh,
            properties,
            transform: Transform::IDENTITY,
            vertex_buffer,
            index_buffer,
            index_count,
            uniform_buffer,
            bind_group,
        };
        self.queue.write_buffer(&actor.uniform_buffer, 0, bytemuck::bytes_of(&actor.uniform()));
        self.actors.insert(id, actor);
        id
    }

    fn set_actor_mesh(&mut self, id: ActorId, mesh: Mesh) {
        let (vertex_buffer, index_buffer, index_count) = self.upload_mesh(&mesh);
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.mesh = mesh;
            actor.vertex_buffer = vertex_buffer;
            actor.index_buffer = index_buffer;
            actor.index_count = index_count;
            self.queue.write_buffer(&actor.uniform_buffer, 0, bytemuck::bytes_of(&actor.uniform()));
        }
    }

    fn set_actor_transform(&mut self, id: ActorId, transform: Transform) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.transform = transform;
            self.queue.write_buffer(&actor.uniform_buffer, 0, bytemuck::bytes_of(&actor.uniform()));
        }
    }

    fn remove_actor(&mut self, id: ActorId) {
        self.actors.remove(&id);
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    fn visible_bounds(&self) -> Option<Bounds> {
        union_bounds(self.actors.values().map(|a| (&a.mesh, &a.transform)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn render(&mut self) -> bool {
        let aspect = Real::from(self.config.width) / Real::from(self.config.height);
        let eye = self.camera.position();
        let uniform = CameraUniform {
            view_proj: self.camera.view_projection(aspect),
            eye: [eye.x as f32, eye.y as f32, eye.z as f32, 1.0],
        };
        self.queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Frame skipped");
                return false;
            }
        };

        let view = output.texture.create_view(&Default::default());
        let mut encoder = self.device.create_command_encoder(&Default::default());

        // Opaque first so translucent actors blend over them.
        let mut order: Vec<&GpuActor> = self.actors.values().filter(|a| a.index_count > 0).collect();
        order.sort_by_key(|a| a.properties.opacity < 1.0);

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            for actor in order {
                let (Some(vertices), Some(indices)) = (&actor.vertex_buffer, &actor.index_buffer) else {
                    continue;
                };
                pass.set_pipeline(self.pipelines.get(actor.mesh.topology));
                pass.set_bind_group(1, &actor.bind_group, &[]);
                pass.set_vertex_buffer(0, vertices.slice(..));
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..actor.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        true
    }

    fn pump_events(&mut self) -> WindowStatus {
        let mut closed = false;
        let mut resized = None;
        let status = self.event_loop.pump_events(Some(Duration::ZERO), |event, target| {
            if let Event::WindowEvent { event, .. } = event {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        closed = true;
                        target.exit();
                    }
                    WindowEvent::Resized(size) => resized = Some(size),
                    _ => {}
                }
            }
        });

        if let Some(size) = resized {
            self.resize(size);
        }
        if closed || matches!(status, PumpStatus::Exit(_)) {
            WindowStatus::Closed
        } else {
            WindowStatus::Open
        }
    }
}

impl Drop for WindowScene {
    fn drop(&mut self) {
        info!(actors = self.actors.len(), "Window scene released");
    }
}
