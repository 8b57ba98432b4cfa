use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Pixels, SurfaceTexture};
use thiserror::Error;
use winit::dpi::PhysicalPosition;
use winit::window::Window;

use crate::app::{DrawSurface, Engine, ImageData, Rgba};

const CLEAR_COLOR: Rgba = [255, 255, 255, 255];

/// Rotation + translation, in surface pixel space. Enough for the canvas
/// transform ops the engine exposes; no shear or scale ever enters.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    tx: f32,
    ty: f32,
}

impl Affine {
    const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.b * y + self.tx,
            self.c * x + self.d * y + self.ty,
        )
    }

    fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            tx: self.tx + self.a * dx + self.b * dy,
            ty: self.ty + self.c * dx + self.d * dy,
            ..*self
        }
    }

    fn rotated(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            a: self.a * cos + self.b * sin,
            b: -self.a * sin + self.b * cos,
            c: self.c * cos + self.d * sin,
            d: -self.c * sin + self.d * cos,
            ..*self
        }
    }

    fn inverse(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() <= f32::EPSILON {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Self {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + b * self.ty),
            ty: -(c * self.tx + d * self.ty),
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct GfxState {
    transform: Affine,
    stroke: Rgba,
    fill: Rgba,
}

impl Default for GfxState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            stroke: [0, 0, 0, 255],
            fill: [0, 0, 0, 255],
        }
    }
}

/// CPU canvas over an RGBA frame buffer, implementing the engine's
/// [`DrawSurface`] capability with familiar 2D-canvas semantics: a current
/// transform with a save/restore stack, a path built from move/line/arc
/// segments, and stroke/fill in the current colors. Points are transformed
/// as they are appended to the path.
pub struct SoftwareCanvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
    state: GfxState,
    saved: Vec<GfxState>,
    subpaths: Vec<Vec<(f32, f32)>>,
}

impl<'a> SoftwareCanvas<'a> {
    /// `frame` must hold exactly `width * height` RGBA pixels.
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        debug_assert_eq!(frame.len(), width as usize * height as usize * 4);
        Self {
            frame,
            width,
            height,
            state: GfxState::default(),
            saved: Vec::new(),
            subpaths: Vec::new(),
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        self.frame[offset..offset + 4].copy_from_slice(&color);
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let alpha = color[3] as u32;
        if alpha == 0 {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        if alpha == 255 {
            self.frame[offset..offset + 4].copy_from_slice(&color);
            return;
        }
        for channel in 0..3 {
            let src = color[channel] as u32;
            let dst = self.frame[offset + channel] as u32;
            self.frame[offset + channel] = ((src * alpha + dst * (255 - alpha)) / 255) as u8;
        }
        self.frame[offset + 3] = 255;
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba) {
        let (mut x0, mut y0) = (from.0.round() as i32, from.1.round() as i32);
        let (x1, y1) = (to.0.round() as i32, to.1.round() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let step_x = if x0 < x1 { 1 } else { -1 };
        let step_y = if y0 < y1 { 1 } else { -1 };
        let mut error = dx + dy;
        loop {
            self.set_pixel(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let doubled = 2 * error;
            if doubled >= dy {
                error += dy;
                x0 += step_x;
            }
            if doubled <= dx {
                error += dx;
                y0 += step_y;
            }
        }
    }

    fn current_subpath(&mut self) -> &mut Vec<(f32, f32)> {
        if self.subpaths.is_empty() {
            self.subpaths.push(Vec::new());
        }
        self.subpaths.last_mut().expect("subpath")
    }

    fn fill_rect_device(&mut self, left: f32, top: f32, right: f32, bottom: f32, color: Rgba) {
        let x_min = left.floor().max(0.0) as i32;
        let y_min = top.floor().max(0.0) as i32;
        let x_max = (right.ceil() as i32).min(self.width as i32);
        let y_max = (bottom.ceil() as i32).min(self.height as i32);
        for y in y_min..y_max {
            for x in x_min..x_max {
                self.set_pixel(x, y, color);
            }
        }
    }
}

impl DrawSurface for SoftwareCanvas<'_> {
    fn clear_region(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let (x0, y0) = self.state.transform.apply(x, y);
        let (x1, y1) = self.state.transform.apply(x + width, y + height);
        self.fill_rect_device(
            x0.min(x1),
            y0.min(y1),
            x0.max(x1),
            y0.max(y1),
            CLEAR_COLOR,
        );
    }

    fn begin_path(&mut self) {
        self.subpaths.clear();
    }

    fn close_path(&mut self) {
        if let Some(subpath) = self.subpaths.last_mut() {
            if subpath.len() >= 2 {
                let first = subpath[0];
                subpath.push(first);
            }
        }
    }

    fn move_to(&mut self, x: f32, y: f32) {
        let point = self.state.transform.apply(x, y);
        self.subpaths.push(vec![point]);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let point = self.state.transform.apply(x, y);
        self.current_subpath().push(point);
    }

    fn arc(&mut self, cx: f32, cy: f32, radius: f32, start_angle: f32, end_angle: f32) {
        let span = end_angle - start_angle;
        let steps = ((span.abs() / std::f32::consts::TAU) * 48.0).ceil().max(8.0) as u32;
        let transform = self.state.transform;
        let started_empty = self
            .subpaths
            .last()
            .map(|subpath| subpath.is_empty())
            .unwrap_or(true);
        if started_empty {
            self.subpaths.push(Vec::new());
        }
        for step in 0..=steps {
            let t = start_angle + span * step as f32 / steps as f32;
            let point = transform.apply(cx + radius * t.cos(), cy + radius * t.sin());
            self.current_subpath().push(point);
        }
    }

    fn set_stroke_color(&mut self, color: Rgba) {
        self.state.stroke = color;
    }

    fn set_fill_color(&mut self, color: Rgba) {
        self.state.fill = color;
    }

    fn stroke(&mut self) {
        let color = self.state.stroke;
        let subpaths = std::mem::take(&mut self.subpaths);
        for subpath in &subpaths {
            for segment in subpath.windows(2) {
                self.draw_line(segment[0], segment[1], color);
            }
        }
        self.subpaths = subpaths;
    }

    fn fill(&mut self) {
        let color = self.state.fill;
        // Even-odd scanline fill across all subpaths, each implicitly
        // closed.
        let mut edges = Vec::new();
        let mut y_min = f32::INFINITY;
        let mut y_max = f32::NEG_INFINITY;
        for subpath in &self.subpaths {
            if subpath.len() < 3 {
                continue;
            }
            for i in 0..subpath.len() {
                let from = subpath[i];
                let to = subpath[(i + 1) % subpath.len()];
                y_min = y_min.min(from.1);
                y_max = y_max.max(from.1);
                if from.1 != to.1 {
                    edges.push((from, to));
                }
            }
        }
        if edges.is_empty() {
            return;
        }
        let row_start = y_min.floor().max(0.0) as i32;
        let row_end = (y_max.ceil() as i32).min(self.height as i32);
        let mut crossings = Vec::new();
        for row in row_start..row_end {
            let sample_y = row as f32 + 0.5;
            crossings.clear();
            for (from, to) in &edges {
                let (x0, y0) = *from;
                let (x1, y1) = *to;
                if (y0 <= sample_y && sample_y < y1) || (y1 <= sample_y && sample_y < y0) {
                    crossings.push(x0 + (sample_y - y0) * (x1 - x0) / (y1 - y0));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks_exact(2) {
                let x_start = pair[0].round() as i32;
                let x_end = pair[1].round() as i32;
                for x in x_start..x_end {
                    self.set_pixel(x, row, color);
                }
            }
        }
    }

    fn save(&mut self) {
        self.saved.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.state.transform = self.state.transform.translated(dx, dy);
    }

    fn rotate(&mut self, angle: f32) {
        self.state.transform = self.state.transform.rotated(angle);
    }

    fn draw_image(&mut self, image: &ImageData, x: f32, y: f32) {
        let Some(inverse) = self.state.transform.inverse() else {
            return;
        };
        let image_w = image.width() as f32;
        let image_h = image.height() as f32;
        let corners = [
            self.state.transform.apply(x, y),
            self.state.transform.apply(x + image_w, y),
            self.state.transform.apply(x + image_w, y + image_h),
            self.state.transform.apply(x, y + image_h),
        ];
        let left = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
        let right = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
        let top = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
        let bottom = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);

        let x_min = left.floor().max(0.0) as i32;
        let y_min = top.floor().max(0.0) as i32;
        let x_max = (right.ceil() as i32).min(self.width as i32);
        let y_max = (bottom.ceil() as i32).min(self.height as i32);
        let rgba = image.rgba();
        for py in y_min..y_max {
            for px in x_min..x_max {
                let (u, v) = inverse.apply(px as f32 + 0.5, py as f32 + 0.5);
                let u = u - x;
                let v = v - y;
                if u < 0.0 || v < 0.0 || u >= image_w || v >= image_h {
                    continue;
                }
                let offset = (v as usize * image.width() as usize + u as usize) * 4;
                let color = [
                    rgba[offset],
                    rgba[offset + 1],
                    rgba[offset + 2],
                    rgba[offset + 3],
                ];
                self.blend_pixel(px, py, color);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to open image at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Decode a PNG from disk into the engine's [`ImageData`] form.
pub fn load_image(path: &Path) -> Result<ImageData, ImageLoadError> {
    let reader = ImageReader::open(path).map_err(|source| ImageLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| ImageLoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ImageData::new(width, height, rgba.into_raw()).expect("decoded image is self-consistent"))
}

/// Window-backed presentation target: owns the GPU surface and exposes a
/// [`SoftwareCanvas`] over its frame buffer once per frame. The buffer stays
/// at the engine's logical size; window resizes only rescale the surface.
pub(crate) struct FrameTarget {
    pixels: Pixels<'static>,
    buffer_width: u32,
    buffer_height: u32,
}

impl FrameTarget {
    pub(crate) fn new(
        window: Arc<Window>,
        buffer_width: u32,
        buffer_height: u32,
    ) -> Result<Self, pixels::Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width.max(1), size.height.max(1), window);
        let pixels = Pixels::new(buffer_width, buffer_height, surface)?;
        Ok(Self {
            pixels,
            buffer_width,
            buffer_height,
        })
    }

    pub(crate) fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), pixels::TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// Map a window-space cursor position onto the logical frame buffer,
    /// clamping positions outside it to the nearest edge.
    pub(crate) fn cursor_to_surface(&self, position: PhysicalPosition<f64>) -> (f32, f32) {
        let raw = (position.x as f32, position.y as f32);
        let (x, y) = self
            .pixels
            .window_pos_to_pixel(raw)
            .unwrap_or_else(|outside| self.pixels.clamp_pixel_pos(outside));
        (x as f32, y as f32)
    }

    pub(crate) fn present(&mut self, engine: &mut Engine) -> Result<(), pixels::Error> {
        let mut canvas = SoftwareCanvas::new(
            self.pixels.frame_mut(),
            self.buffer_width,
            self.buffer_height,
        );
        engine.render_frame(&mut canvas);
        self.pixels.render()
    }
}
