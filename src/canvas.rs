//! Paletted drawing surface for three-color e-paper tags.
//!
//! [`Canvas`] is an embedded-graphics [`DrawTarget`] over [`TriColor`]
//! pixels, so primitives and monospace text from embedded-graphics draw
//! straight into it. Conversion to RGB happens once, at export time,
//! through the tag's [`Palette`].

use std::convert::Infallible;

use embedded_graphics::pixelcolor::PixelColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{
    PointsIter, PrimitiveStyleBuilder, Rectangle, RoundedRectangle, StrokeAlignment,
};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::Error;

/// JPEG quality used for uploads.
pub const JPEG_QUALITY: u8 = 100;

/// Highest valid calendar color tag.
pub const MAX_COLOR_TAG: u8 = 5;

/// One of the three inks of the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriColor {
    /// Palette index 0
    #[default]
    White,
    /// Palette index 1
    Black,
    /// Palette index 2 (red or yellow, depending on the tag)
    Accent,
}

impl PixelColor for TriColor {
    type Raw = ();
}

impl TriColor {
    /// Color for a palette index, if it is one of the three inks.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(TriColor::White),
            1 => Some(TriColor::Black),
            2 => Some(TriColor::Accent),
            _ => None,
        }
    }
}

/// Fill for an event block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Every pixel in the ink
    Solid(TriColor),
    /// 2x2 checkerboard of the ink and white
    Dithered(TriColor),
}

impl Fill {
    /// Fill for a calendar color tag.
    ///
    /// Tags 0-2 are solid white/black/accent, 3-5 the same inks dithered.
    /// Anything higher is treated as dithered accent.
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0..=2 => Fill::Solid(TriColor::from_index(tag).unwrap_or_default()),
            3..=5 => Fill::Dithered(TriColor::from_index(tag - 3).unwrap_or_default()),
            _ => Fill::Dithered(TriColor::Accent),
        }
    }

    /// Ink at offset `(dx, dy)` from the top-left corner of the filled shape.
    pub fn color_at(self, dx: i32, dy: i32) -> TriColor {
        match self {
            Fill::Solid(color) => color,
            Fill::Dithered(color) if (dx + dy).rem_euclid(2) == 0 => color,
            Fill::Dithered(_) => TriColor::White,
        }
    }
}

/// RGB values for the three inks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// RGB for [`TriColor::White`]
    pub white: [u8; 3],
    /// RGB for [`TriColor::Black`]
    pub black: [u8; 3],
    /// RGB for [`TriColor::Accent`]
    pub accent: [u8; 3],
}

impl Palette {
    /// White/black palette with the given accent.
    pub fn with_accent(accent: [u8; 3]) -> Self {
        Self {
            white: [255, 255, 255],
            black: [0, 0, 0],
            accent,
        }
    }

    /// RGB value of an ink.
    pub fn rgb(&self, color: TriColor) -> [u8; 3] {
        match color {
            TriColor::White => self.white,
            TriColor::Black => self.black,
            TriColor::Accent => self.accent,
        }
    }
}

/// A width x height grid of [`TriColor`] pixels, initially white.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<TriColor>,
}

impl Canvas {
    /// Create a white canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![TriColor::White; (width as usize) * (height as usize)],
        }
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Pixel at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: i32, y: i32) -> Option<TriColor> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Set a pixel; coordinates outside the canvas are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: TriColor) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Copy `other` onto this canvas with its top-left corner at `(x, y)`.
    pub fn paste(&mut self, other: &Canvas, x: i32, y: i32) {
        for oy in 0..other.height as i32 {
            for ox in 0..other.width as i32 {
                if let Some(color) = other.pixel(ox, oy) {
                    self.set_pixel(x + ox, y + oy, color);
                }
            }
        }
    }

    /// Draw a rounded rectangle between two inclusive corners.
    ///
    /// The inside is painted with `fill`; dithering is anchored at the
    /// top-left corner. The outline is drawn inside the shape in black.
    pub fn rounded_block(
        &mut self,
        top_left: Point,
        bottom_right: Point,
        radius: u32,
        fill: Fill,
        outline_width: u32,
    ) {
        if bottom_right.x < top_left.x || bottom_right.y < top_left.y {
            return;
        }
        let shape = RoundedRectangle::with_equal_corners(
            Rectangle::with_corners(top_left, bottom_right),
            Size::new(radius, radius),
        );

        for point in shape.points() {
            let color = fill.color_at(point.x - top_left.x, point.y - top_left.y);
            self.set_pixel(point.x, point.y, color);
        }

        if outline_width > 0 {
            let style = PrimitiveStyleBuilder::new()
                .stroke_color(TriColor::Black)
                .stroke_width(outline_width)
                .stroke_alignment(StrokeAlignment::Inside)
                .build();
            infallible(shape.into_styled(style).draw(self));
        }
    }

    /// Single-pixel dots every `step` pixels along a horizontal line.
    pub fn dotted_hline(&mut self, y: i32, x_from: i32, x_to: i32, step: usize) {
        for x in (x_from..x_to).step_by(step.max(1)) {
            self.set_pixel(x, y, TriColor::Black);
        }
    }

    /// Single-pixel dots every `step` pixels along a vertical line.
    pub fn dotted_vline(&mut self, x: i32, y_from: i32, y_to: i32, step: usize) {
        for y in (y_from..y_to).step_by(step.max(1)) {
            self.set_pixel(x, y, TriColor::Black);
        }
    }

    /// Convert to an RGB image through `palette`.
    pub fn to_rgb_image(&self, palette: &Palette) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let color = self.pixels[y as usize * self.width as usize + x as usize];
            image::Rgb(palette.rgb(color))
        })
    }

    /// Encode as JPEG at [`JPEG_QUALITY`].
    pub fn encode_jpeg(&self, palette: &Palette) -> Result<Vec<u8>, Error> {
        let rgb = self.to_rgb_image(palette);
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).encode_image(&rgb)?;
        Ok(bytes)
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Canvas {
    type Color = TriColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color);
        }
        Ok(())
    }
}

/// Unwrap the result of drawing onto a [`Canvas`], which cannot fail.
pub fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}
