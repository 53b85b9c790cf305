use anyhow::Result;
use bytemuck::{Pod, Zeroable};

use super::layout::{PlotRect, BAR_GAP, FRAME_THICKNESS};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BarUniforms {
    pub resolution: [f32; 2],
    /// Bar height scale: a chroma value equal to `peak` fills the plot.
    pub peak: f32,
    pub time: f32,
    /// left, top, right, bottom in pixels
    pub plot: [f32; 4],
    pub chroma: [[f32; 4]; 3],
}

impl BarUniforms {
    pub fn new(width: u32, height: u32, peak: f32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            peak: if peak > 0.0 { peak } else { 1.0 },
            time: 0.0,
            plot: PlotRect::for_canvas(width, height).as_array(),
            chroma: [[0.0; 4]; 3],
        }
    }
}

pub fn bars_shader() -> String {
    format!(
        r#"
struct BarUniforms {{
    resolution: vec2<f32>,
    peak: f32,
    time: f32,
    plot: vec4<f32>,
    chroma: array<vec4<f32>, 3>,
}};

@group(0) @binding(0) var<uniform> u: BarUniforms;

struct VertexOutput {{
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}};

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {{
    var out: VertexOutput;
    let x = f32(i32(vertex_index) / 2) * 4.0 - 1.0;
    let y = f32(i32(vertex_index) % 2) * 4.0 - 1.0;
    out.position = vec4<f32>(x, y, 0.0, 1.0);
    out.uv = vec2<f32>((x + 1.0) * 0.5, (1.0 - y) * 0.5);
    return out;
}}

fn viridis(t: f32) -> vec3<f32> {{
    let c0 = vec3<f32>(0.2777273, 0.0054073, 0.3340998);
    let c1 = vec3<f32>(0.1050930, 1.4046135, 1.3845902);
    let c2 = vec3<f32>(-0.3308618, 0.2148476, 0.0950952);
    let c3 = vec3<f32>(-4.6342305, -5.7991010, -19.3324410);
    let c4 = vec3<f32>(6.2282699, 14.1799334, 56.6905526);
    let c5 = vec3<f32>(4.7763850, -13.7451454, -65.3530326);
    let c6 = vec3<f32>(-5.4354559, 4.6458526, 26.3124352);
    return c0 + t * (c1 + t * (c2 + t * (c3 + t * (c4 + t * (c5 + t * c6)))));
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let p = in.uv * u.resolution;
    let lo = u.plot.xy;
    let hi = u.plot.zw;
    let t = {frame:.1};

    // White frame around the plot area
    let outer = all(p >= lo - vec2<f32>(t)) && all(p <= hi + vec2<f32>(t));
    let inner = all(p >= lo) && all(p <= hi);
    if (outer && !inner) {{
        return vec4<f32>(1.0, 1.0, 1.0, 1.0);
    }}
    if (!inner) {{
        return vec4<f32>(0.0, 0.0, 0.0, 1.0);
    }}

    let slots = (p.x - lo.x) / (hi.x - lo.x) * 12.0;
    let idx = min(u32(slots), 11u);
    let local = fract(slots);
    let half_gap = {gap:.3} * 0.5;
    if (local < half_gap || local > 1.0 - half_gap) {{
        return vec4<f32>(0.0, 0.0, 0.0, 1.0);
    }}

    let value = clamp(u.chroma[idx / 4u][idx % 4u] / u.peak, 0.0, 1.0);
    let top = hi.y - value * (hi.y - lo.y);
    if (p.y < top) {{
        return vec4<f32>(0.0, 0.0, 0.0, 1.0);
    }}
    return vec4<f32>(clamp(viridis(f32(idx) / 11.0), vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}}
"#,
        frame = FRAME_THICKNESS,
        gap = BAR_GAP,
    )
}

/// Fullscreen-triangle pipeline that draws the twelve chroma bars.
pub struct BarsPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl BarsPipeline {
    pub fn new(device: &wgpu::Device, texture_format: wgpu::TextureFormat) -> Result<Self> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bars_shader"),
            source: wgpu::ShaderSource::Wgsl(bars_shader().into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bars_bind_group_layout"),
            entries: &[
                // @binding(0): BarUniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bars_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("bars_render_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }
}
