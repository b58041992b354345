// THEORY:
// The `LumaFrame` module is the comparison-side view of a captured frame. The
// display keeps the full color image; everything the engine compares is a single
// channel of perceived brightness.
//
// Key architectural principles:
// 1.  **Dumb Container**: A `LumaFrame` is a flat row-major `Vec<u8>` plus its
//     dimensions. It knows how to hand out rows and samples, nothing more.
// 2.  **One Conversion**: Color to luminance uses the Rec. 601 weights
//     (0.299, 0.587, 0.114) in 14-bit fixed point with rounding, which is the same
//     arithmetic capture libraries use for BGR to gray. Frames converted here and
//     frames converted by the capture backend agree to the bit.
// 3.  **Owned Once**: The control loop owns exactly one current and one previous
//     `LumaFrame` and swaps them each cycle; there is no pool.

pub mod luma_frame {
    use image::RgbImage;

    pub type Luma = u8;

    const R_WEIGHT: u32 = 4899; // 0.299 * 2^14
    const G_WEIGHT: u32 = 9617; // 0.587 * 2^14
    const B_WEIGHT: u32 = 1868; // 0.114 * 2^14
    const SHIFT: u32 = 14;
    const ROUND: u32 = 1 << (SHIFT - 1);

    /// Rec. 601 luma of a single RGB sample.
    #[inline]
    pub fn luminance(red: u8, green: u8, blue: u8) -> Luma {
        let weighted =
            red as u32 * R_WEIGHT + green as u32 * G_WEIGHT + blue as u32 * B_WEIGHT + ROUND;
        (weighted >> SHIFT) as Luma
    }

    /// A single-channel brightness frame.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LumaFrame {
        width: u32,
        height: u32,
        samples: Vec<Luma>,
    }

    impl LumaFrame {
        /// Wraps an existing buffer. Returns `None` if the buffer length does not
        /// match `width * height`.
        pub fn from_raw(width: u32, height: u32, samples: Vec<Luma>) -> Option<Self> {
            if samples.len() != (width as usize) * (height as usize) {
                return None;
            }
            Some(Self {
                width,
                height,
                samples,
            })
        }

        /// A frame where every sample has the same value.
        pub fn filled(width: u32, height: u32, value: Luma) -> Self {
            Self {
                width,
                height,
                samples: vec![value; (width as usize) * (height as usize)],
            }
        }

        pub fn from_rgb(image: &RgbImage) -> Self {
            let (width, height) = image.dimensions();
            let samples = image
                .as_raw()
                .chunks_exact(3)
                .map(|px| luminance(px[0], px[1], px[2]))
                .collect();
            Self {
                width,
                height,
                samples,
            }
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        pub fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        /// The samples of row `y`. Panics if `y` is out of range.
        #[inline]
        pub fn row(&self, y: u32) -> &[Luma] {
            let start = y as usize * self.width as usize;
            &self.samples[start..start + self.width as usize]
        }

        #[inline]
        pub fn get(&self, x: u32, y: u32) -> Luma {
            self.row(y)[x as usize]
        }

        pub fn samples(&self) -> &[Luma] {
            &self.samples
        }

        pub fn samples_mut(&mut self) -> &mut [Luma] {
            &mut self.samples
        }
    }
}
