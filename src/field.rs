// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

// Rotating off-screen buffers, one Field per simulated quantity.
// Resizes only reallocate a slot when it is next acquired.

use crate::error::{FluidError, Result};
use crate::gpu::GpuContext;
use crate::pass::Renderer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelFormat {
    /// Four 32-bit float channels. Velocity, pressure and divergence.
    Float,
    /// Four 8-bit normalized channels. Dye and gradient ramps.
    Unorm,
}

impl ChannelFormat {
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            ChannelFormat::Float => wgpu::TextureFormat::Rgba32Float,
            ChannelFormat::Unorm => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    pub fn bytes_per_texel(self) -> u32 {
        match self {
            ChannelFormat::Float => 16,
            ChannelFormat::Unorm => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldId(usize);

/// Weak handle to one slot of one field. Resolving it goes through the
/// [`FieldSet`] that owns the storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureRef {
    field: FieldId,
    slot: usize,
}

impl TextureRef {
    pub fn field(self) -> FieldId {
        self.field
    }

    pub fn slot(self) -> usize {
        self.slot
    }

    #[cfg(test)]
    pub(crate) fn dummy(slot: usize) -> Self {
        Self {
            field: FieldId(0),
            slot,
        }
    }
}

/// Rotation index and deferred-resize flags for a ring of `len` slots.
#[derive(Clone, Debug)]
pub struct SlotRing {
    next: usize,
    pending: Vec<bool>,
}

impl SlotRing {
    pub fn new(len: usize) -> Self {
        Self {
            next: 0,
            pending: vec![false; len.max(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn mark_all(&mut self) {
        self.pending.iter_mut().for_each(|flag| *flag = true);
    }

    pub fn is_pending(&self, slot: usize) -> bool {
        self.pending.get(slot).copied().unwrap_or(false)
    }

    /// Picks the slot for the next write. The second value reports whether the
    /// slot had a pending resize; that flag is cleared here and nowhere else.
    pub fn advance(&mut self) -> (usize, bool) {
        let slot = self.next;
        let needs_resize = std::mem::replace(&mut self.pending[slot], false);
        self.next = (self.next + 1) % self.pending.len();
        (slot, needs_resize)
    }
}

struct BufferSlot {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: [u32; 2],
}

impl BufferSlot {
    fn allocate(
        device: &wgpu::Device,
        label: &str,
        size: [u32; 2],
        format: ChannelFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: format.texture_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }
}

pub struct Field {
    id: FieldId,
    label: &'static str,
    format: ChannelFormat,
    resolution: [u32; 2],
    ring: SlotRing,
    slots: Vec<BufferSlot>,
}

impl Field {
    fn new(
        device: &wgpu::Device,
        id: FieldId,
        label: &'static str,
        resolution: [u32; 2],
        buffer_count: usize,
        format: ChannelFormat,
    ) -> Self {
        let resolution = [resolution[0].max(1), resolution[1].max(1)];
        let ring = SlotRing::new(buffer_count);
        let slots = (0..ring.len())
            .map(|_| BufferSlot::allocate(device, label, resolution, format))
            .collect();
        Self {
            id,
            label,
            format,
            resolution,
            ring,
            slots,
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn format(&self) -> ChannelFormat {
        self.format
    }

    /// Target resolution. Slots not yet reacquired since the last resize
    /// still have their previous size.
    pub fn resolution(&self) -> [u32; 2] {
        self.resolution
    }

    pub fn buffer_count(&self) -> usize {
        self.ring.len()
    }

    pub fn mark_resize_needed(&mut self, resolution: [u32; 2]) {
        self.resolution = [resolution[0].max(1), resolution[1].max(1)];
        self.ring.mark_all();
    }

    /// Selects the next slot, reallocates it if a resize is pending, and makes
    /// it the renderer's output.
    pub fn acquire_next(&mut self, renderer: &mut Renderer<'_>) -> TextureRef {
        let handle = self.advance(renderer.device());
        renderer.set_render_target(handle);
        handle
    }

    fn advance(&mut self, device: &wgpu::Device) -> TextureRef {
        let (slot, needs_resize) = self.ring.advance();
        if needs_resize && self.slots[slot].size != self.resolution {
            log::debug!(
                "Reallocating {} slot {} at {}x{}",
                self.label,
                slot,
                self.resolution[0],
                self.resolution[1]
            );
            self.slots[slot] = BufferSlot::allocate(device, self.label, self.resolution, self.format);
        }
        TextureRef {
            field: self.id,
            slot,
        }
    }

    fn slot(&self, handle: TextureRef) -> Result<&BufferSlot> {
        if handle.field != self.id {
            return Err(FluidError::StaleTexture(handle));
        }
        self.slots
            .get(handle.slot)
            .ok_or(FluidError::StaleTexture(handle))
    }
}

/// Owner of every field. Texture handles resolve through here.
#[derive(Default)]
pub struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        device: &wgpu::Device,
        label: &'static str,
        resolution: [u32; 2],
        buffer_count: usize,
        format: ChannelFormat,
    ) -> FieldId {
        let id = FieldId(self.fields.len());
        self.fields
            .push(Field::new(device, id, label, resolution, buffer_count, format));
        id
    }

    /// # Panics
    ///
    /// Panics if `id` was not created by this set.
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    /// # Panics
    ///
    /// Panics if `id` was not created by this set.
    pub fn field_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.fields[id.0]
    }

    /// # Panics
    ///
    /// Panics if `id` was not created by this set.
    pub fn acquire_next(&mut self, id: FieldId, renderer: &mut Renderer<'_>) -> TextureRef {
        self.field_mut(id).acquire_next(renderer)
    }

    /// # Panics
    ///
    /// Panics if `id` was not created by this set.
    pub fn mark_resize_needed(&mut self, id: FieldId, resolution: [u32; 2]) {
        self.field_mut(id).mark_resize_needed(resolution);
    }

    /// Writes raw texel rows into the field's next slot without a render pass.
    /// `bytes` must cover the full target resolution in the field's format.
    pub fn upload(&mut self, gpu: &GpuContext, id: FieldId, bytes: &[u8]) -> Result<TextureRef> {
        let field = self.field_mut(id);
        let [width, height] = field.resolution;
        let bytes_per_row = width * field.format.bytes_per_texel();
        let expected = (bytes_per_row * height) as usize;
        if bytes.len() != expected {
            return Err(FluidError::UploadSize {
                field: field.label,
                expected,
                got: bytes.len(),
            });
        }

        let handle = field.advance(&gpu.device);
        let slot = field.slot(handle)?;
        gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &slot.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(handle)
    }

    fn slot(&self, handle: TextureRef) -> Result<&BufferSlot> {
        self.fields
            .get(handle.field.0)
            .ok_or(FluidError::StaleTexture(handle))?
            .slot(handle)
    }

    pub fn view(&self, handle: TextureRef) -> Result<&wgpu::TextureView> {
        Ok(&self.slot(handle)?.view)
    }

    pub fn texture(&self, handle: TextureRef) -> Result<&wgpu::Texture> {
        Ok(&self.slot(handle)?.texture)
    }

    /// Allocated size of the slot behind `handle`.
    pub fn extent(&self, handle: TextureRef) -> Result<[u32; 2]> {
        Ok(self.slot(handle)?.size)
    }

    pub fn format(&self, handle: TextureRef) -> Result<ChannelFormat> {
        self.slot(handle)?;
        Ok(self.field(handle.field).format)
    }
}
