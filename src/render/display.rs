use anyhow::{Context, Result};

use super::frame::{FrameRenderer, TEXTURE_FORMAT};
use super::gpu::GpuContext;
use super::layout::{self, PlotRect};
use super::pipeline::{BarUniforms, BarsPipeline};
use super::text::TextOverlay;
use super::window::FfplayWindow;
use crate::audio::analysis::{Analysis, Frame};
use crate::audio::features::PITCH_CLASSES;
use crate::playback::Renderer;

const LABEL_COLOR: [u8; 4] = [255, 255, 255, 255];
const READOUT_COLOR: [u8; 4] = [255, 255, 0, 255];

pub struct DisplayOptions {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Without a font only the bars are drawn.
    pub font: Option<Vec<u8>>,
}

/// Chroma bar chart with pitch-class labels and a time/chord/frequency
/// readout, rendered offscreen and shown in an ffplay window.
pub struct ChromaDisplay {
    gpu: GpuContext,
    frame_renderer: FrameRenderer,
    pipeline: BarsPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    uniforms: BarUniforms,
    plot: PlotRect,
    labels: Option<TextOverlay>,
    readout: Option<TextOverlay>,
    window: FfplayWindow,
    released: bool,
}

impl ChromaDisplay {
    pub fn new(analysis: &Analysis, options: DisplayOptions) -> Result<Self> {
        let DisplayOptions {
            width,
            height,
            title,
            font,
        } = options;

        log::info!("Initializing GPU...");
        let gpu = GpuContext::new()?;
        let frame_renderer = FrameRenderer::new(&gpu, width, height);
        let pipeline = BarsPipeline::new(&gpu.device, TEXTURE_FORMAT)?;

        let uniforms = BarUniforms::new(width, height, analysis.peak_chroma());
        let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bars_uniform_buffer"),
            size: std::mem::size_of::<BarUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bars_bind_group"),
            layout: &pipeline.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shorter = width.min(height) as f32;
        let (labels, readout) = match font {
            Some(bytes) => (
                Some(TextOverlay::new(&bytes, (shorter * 0.035).max(14.0))?),
                Some(TextOverlay::new(&bytes, (shorter * 0.045).max(18.0))?),
            ),
            None => (None, None),
        };

        let hop = analysis.hop_duration().as_secs_f32();
        let fps = if hop > 0.0 { 1.0 / hop } else { 30.0 };
        let window = FfplayWindow::open(width, height, fps, &title)?;
        log::info!("Chroma display ready on {}", gpu.adapter_name);

        Ok(Self {
            gpu,
            frame_renderer,
            pipeline,
            uniform_buffer,
            bind_group,
            uniforms,
            plot: PlotRect::for_canvas(width, height),
            labels,
            readout,
            window,
            released: false,
        })
    }

    fn overlay_text(&self, pixels: &mut [u8], frame: &Frame) {
        let (w, h) = (self.frame_renderer.width, self.frame_renderer.height);

        if let Some(ref overlay) = self.labels {
            for (class, name) in PITCH_CLASSES.iter().enumerate() {
                let (x, y) = layout::label_origin(&self.plot, class, overlay.measure_width(name));
                overlay.composite(pixels, w, h, name, x, y, LABEL_COLOR);
            }
        }

        if let Some(ref overlay) = self.readout {
            for (line, text) in layout::readout_lines(frame).iter().enumerate() {
                let (x, y) = layout::readout_origin(w, h, line, overlay.line_height());
                overlay.composite(pixels, w, h, text, x, y, READOUT_COLOR);
            }
        }
    }
}

impl Renderer for ChromaDisplay {
    fn draw_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.released {
            return Ok(());
        }

        self.uniforms.chroma = layout::pack_chroma(&frame.chroma);
        self.uniforms.time = frame.time;
        self.gpu
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let mut pixels = self
            .frame_renderer
            .render_and_readback(&self.gpu, &self.pipeline.pipeline, &self.bind_group)
            .with_context(|| format!("Failed to render frame {}", frame.index))?;
        self.overlay_text(&mut pixels, frame);

        self.window.write_frame(&pixels)
    }

    fn close_requested(&mut self) -> bool {
        !self.released && self.window.is_closed()
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.window.close();
    }
}
