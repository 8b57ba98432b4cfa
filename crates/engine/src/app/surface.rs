use thiserror::Error;

/// RGBA color, one byte per channel.
pub type Rgba = [u8; 4];

/// Decoded RGBA image handed to [`DrawSurface::draw_image`].
///
/// The engine never decodes image files itself; the platform side does (see
/// `platform::load_image`) and callbacks pass the result through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ImageDataError {
    #[error("pixel byte count mismatch: expected {expected}, got {actual}")]
    ByteCountMismatch { expected: usize, actual: usize },
}

impl ImageData {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, ImageDataError> {
        let expected = width as usize * height as usize * 4;
        let actual = rgba.len();
        if expected != actual {
            return Err(ImageDataError::ByteCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

/// Drawing capability the environment supplies to the engine.
///
/// Semantics follow the familiar 2D canvas model: a current transform
/// (translate/rotate, with a save/restore stack), a current path built from
/// move/line/arc segments, and stroke/fill of that path in the current
/// colors. The engine only ever sequences calls on this trait; it never
/// rasterizes anything itself.
pub trait DrawSurface {
    /// Clear the axis-aligned region to the background color.
    fn clear_region(&mut self, x: f32, y: f32, width: f32, height: f32);

    fn begin_path(&mut self);
    /// Connect the current subpath back to its starting point.
    fn close_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    /// Append a circular arc centered at (`cx`, `cy`) from `start_angle` to
    /// `end_angle` (radians).
    fn arc(&mut self, cx: f32, cy: f32, radius: f32, start_angle: f32, end_angle: f32);

    fn set_stroke_color(&mut self, color: Rgba);
    fn set_fill_color(&mut self, color: Rgba);
    /// Outline the current path in the stroke color.
    fn stroke(&mut self);
    /// Fill the current path in the fill color.
    fn fill(&mut self);

    /// Push the current transform and colors.
    fn save(&mut self);
    /// Pop to the most recently saved transform and colors.
    fn restore(&mut self);
    fn translate(&mut self, dx: f32, dy: f32);
    fn rotate(&mut self, angle: f32);

    /// Draw `image` with its top-left corner at (`x`, `y`) under the current
    /// transform.
    fn draw_image(&mut self, image: &ImageData, x: f32, y: f32);
}
