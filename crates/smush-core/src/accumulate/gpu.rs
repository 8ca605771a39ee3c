//! wgpu compute backend: channel sums live on the device until the average is read.

use bytemuck::{Pod, Zeroable};
use tracing::info;
use wgpu::util::DeviceExt;

use crate::error::{Result, SmushError};
use crate::frame::{pack_rgb, ChannelAccess, DecodedImage, PixelData, PixelLayout};

use super::{blank_dimensions, check_capacity, check_dimensions, FrameAccumulator};

const WORKGROUP_SIZE: u32 = 256;
const MAX_WORKGROUPS_X: u32 = 65_535;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct AccumulateParams {
    pixel_count: u32,
    packed: u32,
    step: u32,
    row_stride: u32,
    red: u32,
    green: u32,
    blue: u32,
    _pad: u32,
}

pub struct GpuAccumulator {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    sums: wgpu::Buffer,
    adapter_name: String,
    width: u32,
    height: u32,
    frames_added: u32,
}

impl GpuAccumulator {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixels = blank_dimensions(width, height)?;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| SmushError::GpuError(format!("No suitable GPU adapter found: {e}")))?;

        let adapter_name = adapter.get_info().name.clone();
        info!("GPU adapter: {adapter_name}");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("smush"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .map_err(|e| SmushError::GpuError(format!("Failed to create GPU device: {e}")))?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("accumulate"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/accumulate.wgsl").into()),
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("accumulate"),
            layout: None,
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let sums = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("channel sums"),
            size: (pixels * 3 * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            sums,
            adapter_name,
            width,
            height,
            frames_added: 0,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    fn download_sums(&self) -> Result<Vec<u32>> {
        let size = self.sums.size();
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut enc = self.device.create_command_encoder(&Default::default());
        enc.copy_buffer_to_buffer(&self.sums, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(enc.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        slice.map_async(wgpu::MapMode::Read, move |r| {
            tx.send(r).ok();
        });
        self.device.poll(wgpu::PollType::wait_indefinitely()).ok();
        rx.recv()
            .map_err(|_| SmushError::GpuError("GPU channel closed".into()))?
            .map_err(|e| SmushError::GpuError(format!("Buffer mapping failed: {e}")))?;

        let data = slice.get_mapped_range();
        let result: Vec<u32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();
        Ok(result)
    }
}

/// Input words plus kernel parameters for one frame.
fn frame_upload(image: &DecodedImage) -> Result<(Vec<u32>, AccumulateParams)> {
    let pixel_count = image.pixel_count() as u32;
    let params = |packed, step, [red, green, blue]: [u32; 3]| AccumulateParams {
        pixel_count,
        packed,
        step,
        row_stride: 0,
        red,
        green,
        blue,
        _pad: 0,
    };
    match (image.layout().channel_access(), image.data()) {
        (
            Some(ChannelAccess::Packed {
                red_shift,
                green_shift,
                blue_shift,
            }),
            PixelData::Packed(words),
        ) => Ok((words.clone(), params(1, 1, [red_shift, green_shift, blue_shift]))),
        (
            Some(ChannelAccess::Bytes {
                step,
                red,
                green,
                blue,
            }),
            PixelData::Bytes(bytes),
        ) => {
            let words = bytes
                .chunks(4)
                .map(|chunk| {
                    let mut word = [0u8; 4];
                    word[..chunk.len()].copy_from_slice(chunk);
                    u32::from_le_bytes(word)
                })
                .collect();
            Ok((
                words,
                params(0, step as u32, [red as u32, green as u32, blue as u32]),
            ))
        }
        _ => Err(SmushError::UnsupportedPixelLayout(format!(
            "{} frames cannot be accumulated, convert to a colour layout first",
            image.layout()
        ))),
    }
}

impl FrameAccumulator for GpuAccumulator {
    fn name(&self) -> &str {
        "GPU"
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn frames_added(&self) -> u32 {
        self.frames_added
    }

    fn add(&mut self, image: &DecodedImage) -> Result<()> {
        check_dimensions((self.width, self.height), image)?;
        let (words, mut params) = frame_upload(image)?;
        check_capacity(self.frames_added)?;

        let groups = self.pixel_count().div_ceil(WORKGROUP_SIZE);
        let groups_x = groups.min(MAX_WORKGROUPS_X);
        let groups_y = groups.div_ceil(groups_x);
        params.row_stride = groups_x * WORKGROUP_SIZE;

        let input = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("frame"),
                contents: bytemuck::cast_slice(&words),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let uniform = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("accumulate params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let layout = self.pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.sums.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });

        let mut enc = self.device.create_command_encoder(&Default::default());
        {
            let mut pass = enc.begin_compute_pass(&Default::default());
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        self.queue.submit(std::iter::once(enc.finish()));

        self.frames_added += 1;
        Ok(())
    }

    fn to_average_and_reset(&mut self) -> Result<DecodedImage> {
        if self.frames_added == 0 {
            return Err(SmushError::EmptySequence);
        }
        let sums = self.download_sums()?;
        let n = self.pixel_count() as usize;
        let count = self.frames_added;
        let words: Vec<u32> = (0..n)
            .map(|i| {
                pack_rgb([
                    (sums[i] / count) as u8,
                    (sums[n + i] / count) as u8,
                    (sums[2 * n + i] / count) as u8,
                ])
            })
            .collect();

        let mut enc = self.device.create_command_encoder(&Default::default());
        enc.clear_buffer(&self.sums, 0, None);
        self.queue.submit(std::iter::once(enc.finish()));
        self.frames_added = 0;

        DecodedImage::new(
            self.width,
            self.height,
            PixelLayout::IntRgb,
            PixelData::Packed(words),
        )
    }

    fn close(&mut self) {
        self.sums.destroy();
        self.frames_added = 0;
    }
}
