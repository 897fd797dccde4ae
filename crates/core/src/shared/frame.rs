use image::RgbImage;

const RGB_CHANNELS: u8 = 3;

/// One captured camera frame: contiguous RGB bytes in row-major order.
///
/// Owned by the capture session. Consumers borrow it for the duration of a
/// single call and never keep a reference past it.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (RGB_CHANNELS as usize),
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// Wraps an `image` buffer without copying.
    pub fn from_rgb_image(image: RgbImage, index: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, index)
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        // Length is checked at construction, so this cannot fail.
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        RGB_CHANNELS
    }

    /// Capture-order index assigned by the capture session.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12];
        let frame = Frame::new(data.clone(), 2, 2, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
        assert!(!frame.is_empty());
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 0);
    }

    #[test]
    fn test_rgb_image_round_trip_keeps_pixels() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgb([10, 20, 30]));
        let frame = Frame::from_rgb_image(img, 7);
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 7);
        assert_eq!(frame.to_rgb_image().get_pixel(2, 1).0, [10, 20, 30]);
    }

    #[test]
    fn test_zero_sized_frame_is_empty() {
        let frame = Frame::new(Vec::new(), 0, 0, 0);
        assert!(frame.is_empty());
    }
}
