/// A decoded video frame as handed to the object stream.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub dims: (u32, u32),
    pub timestamp: f32, // in seconds
    /// Packed BGR8 rows, empty when the source does not decode pixels.
    pub data: Vec<u8>,
}

impl Frame {
    pub fn empty(index: u64, dims: (u32, u32), fps: f32) -> Self {
        Self {
            index,
            dims,
            timestamp: if fps > 0.0 { index as f32 / fps } else { 0.0 },
            data: Vec::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.dims.0
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.dims.1
    }

    #[inline]
    pub fn has_pixels(&self) -> bool {
        !self.data.is_empty()
    }
}
