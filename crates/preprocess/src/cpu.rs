use crate::config::{DEFAULT_INPUT_SIZE, LETTERBOX_COLOR};
use crate::{Letterbox, Preprocess, PreprocessResult};
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use ndarray::{Array, IxDyn};

/// Letterbox + scale-to-unit preprocessing for YOLO-style detectors.
///
/// Holds no per-call buffers, so one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct CpuPreProcessor {
    pub input_size: (u32, u32),
}

impl CpuPreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self { input_size }
    }

    /// Compute scale and centred padding for a `width`x`height` source.
    pub fn letterbox_for(&self, width: u32, height: u32) -> (Letterbox, u32, u32) {
        let (input_w, input_h) = self.input_size;
        let scale = (input_w as f32 / width as f32).min(input_h as f32 / height as f32);
        let new_width = ((width as f32 * scale) as u32).clamp(1, input_w);
        let new_height = ((height as f32 * scale) as u32).clamp(1, input_h);

        let offset_x = (input_w - new_width) / 2;
        let offset_y = (input_h - new_height) / 2;

        let letterbox = Letterbox {
            orig_width: width,
            orig_height: height,
            scale,
            offset_x: offset_x as f32,
            offset_y: offset_y as f32,
        };
        (letterbox, new_width, new_height)
    }

    pub fn preprocess_rgb(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<PreprocessResult> {
        let _s = span!("preprocess_rgb");

        tracing::trace!(
            width,
            height,
            pixel_bytes = pixels.len(),
            "Preprocessing image dimensions"
        );

        if width == 0 || height == 0 {
            anyhow::bail!("Cannot preprocess an empty {}x{} image", width, height);
        }

        let expected_size = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected_size {
            anyhow::bail!(
                "Buffer size mismatch: expected {}, got {} bytes",
                expected_size,
                pixels.len()
            );
        }

        let (letterbox, new_width, new_height) = self.letterbox_for(width, height);
        let resized = Self::resize(pixels, width, height, new_width, new_height)?;
        let tensor = self.to_tensor(&resized, &letterbox)?;

        Ok(PreprocessResult { tensor, letterbox })
    }

    fn resize(
        pixels: &[u8],
        width: u32,
        height: u32,
        new_width: u32,
        new_height: u32,
    ) -> anyhow::Result<Image<'static>> {
        let _s = span!("resize");

        let src = ImageRef::new(width, height, pixels, PixelType::U8x3)?;
        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        Ok(resized)
    }

    /// Write the resized image into a padded NCHW tensor scaled to [0, 1].
    fn to_tensor(
        &self,
        resized: &Image,
        letterbox: &Letterbox,
    ) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("to_tensor");

        let (input_w, input_h) = (self.input_size.0 as usize, self.input_size.1 as usize);
        let spatial = input_w * input_h;
        let pad = LETTERBOX_COLOR as f32 / 255.0;

        let mut output = vec![pad; 3 * spatial];

        let resized_w = resized.width() as usize;
        let offset_x = letterbox.offset_x as usize;
        let offset_y = letterbox.offset_y as usize;

        for (i, px) in resized.buffer().chunks_exact(3).enumerate() {
            let x = offset_x + i % resized_w;
            let y = offset_y + i / resized_w;
            let idx = y * input_w + x;

            output[idx] = px[0] as f32 / 255.0;
            output[idx + spatial] = px[1] as f32 / 255.0;
            output[idx + 2 * spatial] = px[2] as f32 / 255.0;
        }

        Ok(Array::from_shape_vec(
            IxDyn(&[1, 3, input_h, input_w]),
            output,
        )?)
    }
}

impl Default for CpuPreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

impl Preprocess for CpuPreProcessor {
    fn preprocess(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<PreprocessResult> {
        self.preprocess_rgb(pixels, width, height)
    }

    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }
}
