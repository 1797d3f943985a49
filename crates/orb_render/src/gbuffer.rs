//! Per-pixel frame storage: the shaded color and the auxiliary geometry
//! channels the denoiser needs.

use crate::Color;
use orb_math::{Mat4, Vec3};

/// A width x height grid of per-pixel values in row-major order.
#[derive(Debug, Clone)]
pub struct FrameBuffer<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> FrameBuffer<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }

    /// Full-buffer replace; previous contents are discarded. Zero-area
    /// dimensions are valid and yield an empty grid.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width * height, T::default());
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.data[y * self.width + x] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn fill_from(&mut self, values: Vec<T>) {
        debug_assert_eq!(values.len(), self.data.len());
        self.data = values;
    }
}

impl<T: Clone + Default> Default for FrameBuffer<T> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// G-buffer: all channel grids share the same dimensions and are resized
/// together. When `contributor` is false for a pixel (primary ray missed),
/// the other channels of that pixel are meaningless and downstream filters
/// must skip them.
#[derive(Debug, Clone, Default)]
pub struct GBuffer {
    pub color: FrameBuffer<Color>,
    pub world_position: FrameBuffer<Vec3>,
    pub world_normal: FrameBuffer<Vec3>,
    pub primitive_id: FrameBuffer<i32>,
    pub contributor: FrameBuffer<bool>,
    /// Camera matrices of the frame that produced these channels; the
    /// temporal filter reprojects through them.
    pub projection: Mat4,
    pub view: Mat4,
}

impl GBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            color: FrameBuffer::new(width, height),
            world_position: FrameBuffer::new(width, height),
            world_normal: FrameBuffer::new(width, height),
            primitive_id: FrameBuffer::new(width, height),
            contributor: FrameBuffer::new(width, height),
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.color.resize(width, height);
        self.world_position.resize(width, height);
        self.world_normal.resize(width, height);
        self.primitive_id.resize(width, height);
        self.contributor.resize(width, height);
    }

    pub fn width(&self) -> usize {
        self.color.width()
    }

    pub fn height(&self) -> usize {
        self.color.height()
    }
}
