//! Drawing engine: background, persisted markups, local paths and pins.
//!
//! Rendering is expressed against the [`Surface`] trait so the same scene can
//! be replayed onto a host canvas ([`DisplayList`]) or rasterized in-process
//! ([`RasterSurface`]).

use std::sync::Arc;

use ab_glyph::{Font, FontArc, ScaleFont, point};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use portal_types::{Attachment, Markup, MarkupType, Point};
use tiny_skia::{
    Color, ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pixmap,
    PixmapPaint, PremultipliedColorU8, Stroke, Transform,
};
use tracing::{debug, warn};

use crate::error::{Result, ReviewError};
use crate::geometry::{Path, Placement, color_or_default, place_centered};

pub const PIN_RADIUS: f64 = 12.0;
pub const PIN_BORDER: f64 = 2.0;
pub const PIN_GLYPH: &str = "💬";
pub const PIN_GLYPH_FALLBACK: &str = "…";
const PIN_GLYPH_SIZE: f32 = 14.0;
const PIN_BORDER_COLOR: [u8; 4] = [255, 255, 255, 255];

/// Anything the engine can paint onto.
pub trait Surface {
    /// Intrinsic size in pixels.
    fn size(&self) -> (f64, f64);
    fn clear(&mut self);
    fn draw_image(&mut self, image: &RgbaImage, at: Placement);
    /// Round caps and round joins.
    fn stroke_polyline(&mut self, points: &[Point], color: [u8; 4], width: f64);
    fn draw_pin(&mut self, center: Point, fill: [u8; 4], glyph: &str);
}

/// Recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Image {
        at: Placement,
    },
    Polyline {
        points: Vec<Point>,
        color: [u8; 4],
        width: f64,
    },
    Pin {
        center: Point,
        radius: f64,
        fill: [u8; 4],
        border: f64,
        glyph: String,
    },
}

/// Surface that records every call for a host canvas to replay.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }
}

impl Surface for DisplayList {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn draw_image(&mut self, _image: &RgbaImage, at: Placement) {
        self.ops.push(DrawOp::Image { at });
    }

    fn stroke_polyline(&mut self, points: &[Point], color: [u8; 4], width: f64) {
        self.ops.push(DrawOp::Polyline {
            points: points.to_vec(),
            color,
            width,
        });
    }

    fn draw_pin(&mut self, center: Point, fill: [u8; 4], glyph: &str) {
        self.ops.push(DrawOp::Pin {
            center,
            radius: PIN_RADIUS,
            fill,
            border: PIN_BORDER,
            glyph: glyph.to_string(),
        });
    }
}

/// Software rasterizer on a `tiny_skia` pixmap.
///
/// Pin glyphs are drawn with `imageproc` in a final pass by [`into_image`],
/// so [`pixel`] shows the frame without them.
///
/// [`into_image`]: RasterSurface::into_image
/// [`pixel`]: RasterSurface::pixel
pub struct RasterSurface {
    pixmap: Pixmap,
    font: Option<FontArc>,
    glyphs: Vec<(Point, String)>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| ReviewError::Raster(format!("cannot allocate {width}x{height} pixmap")))?;
        Ok(Self {
            pixmap,
            font: None,
            glyphs: Vec::new(),
        })
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Straight (not premultiplied) RGBA at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixmap.pixel(x, y).map(straight)
    }

    pub fn into_image(self) -> Result<RgbaImage> {
        let raw = self.pixmap.pixels().iter().flat_map(|p| straight(*p)).collect();
        let mut image = RgbaImage::from_raw(self.pixmap.width(), self.pixmap.height(), raw)
            .ok_or_else(|| ReviewError::Raster("pixmap and image sizes differ".into()))?;

        if let Some(font) = &self.font {
            for (center, glyph) in &self.glyphs {
                draw_glyph(&mut image, font, *center, glyph);
            }
        }
        Ok(image)
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (f64, f64) {
        (self.pixmap.width() as f64, self.pixmap.height() as f64)
    }

    fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
        self.glyphs.clear();
    }

    fn draw_image(&mut self, image: &RgbaImage, at: Placement) {
        let Some(source) = premultiplied(image) else {
            return;
        };
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        let transform = Transform::from_scale(at.scale as f32, at.scale as f32)
            .post_translate(at.x as f32, at.y as f32);
        self.pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    }

    fn stroke_polyline(&mut self, points: &[Point], color: [u8; 4], width: f64) {
        let width = width.max(1.0) as f32;
        let paint = solid(color);

        // A lone point has no segment to stroke; draw the round cap it would get.
        if let [only] = points {
            if let Some(dot) = PathBuilder::from_circle(only.x as f32, only.y as f32, width / 2.0) {
                self.pixmap
                    .fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
            }
            return;
        }

        let Some(path) = polyline(points) else {
            debug!(points = points.len(), "Skipping unstrokable polyline");
            return;
        };
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    fn draw_pin(&mut self, center: Point, fill: [u8; 4], glyph: &str) {
        let Some(circle) =
            PathBuilder::from_circle(center.x as f32, center.y as f32, PIN_RADIUS as f32)
        else {
            return;
        };
        self.pixmap
            .fill_path(&circle, &solid(fill), FillRule::Winding, Transform::identity(), None);

        let border = Stroke {
            width: PIN_BORDER as f32,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &circle,
            &solid(PIN_BORDER_COLOR),
            &border,
            Transform::identity(),
            None,
        );
        self.glyphs.push((center, glyph.to_string()));
    }
}

fn solid(color: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}

fn straight(p: PremultipliedColorU8) -> [u8; 4] {
    let c = p.demultiply();
    [c.red(), c.green(), c.blue(), c.alpha()]
}

fn premultiplied(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn polyline(points: &[Point]) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    pb.finish()
}

/// The pin face: the preferred glyph, or a plain fallback when the font lacks it.
fn pin_face<'a>(font: &FontArc, glyph: &'a str) -> Option<&'a str> {
    let covers = |text: &str| text.chars().all(|c| font.glyph_id(c).0 != 0);
    if covers(glyph) {
        Some(glyph)
    } else if covers(PIN_GLYPH_FALLBACK) {
        Some(PIN_GLYPH_FALLBACK)
    } else {
        None
    }
}

/// Pixel bounds of `face` laid out on one line from the origin, as imageproc draws it.
fn face_bounds(font: &FontArc, face: &str) -> Option<ab_glyph::Rect> {
    let scaled = font.as_scaled(PIN_GLYPH_SIZE);
    let mut caret = 0.0;
    let mut bounds: Option<ab_glyph::Rect> = None;
    for c in face.chars() {
        let id = scaled.glyph_id(c);
        let glyph = id.with_scale_and_position(PIN_GLYPH_SIZE, point(caret, scaled.ascent()));
        caret += scaled.h_advance(id);
        if let Some(outline) = font.outline_glyph(glyph) {
            let b = outline.px_bounds();
            bounds = Some(match bounds {
                None => b,
                Some(u) => ab_glyph::Rect {
                    min: point(u.min.x.min(b.min.x), u.min.y.min(b.min.y)),
                    max: point(u.max.x.max(b.max.x), u.max.y.max(b.max.y)),
                },
            });
        }
    }
    bounds
}

fn draw_glyph(image: &mut RgbaImage, font: &FontArc, center: Point, glyph: &str) {
    let Some(face) = pin_face(font, glyph) else {
        return;
    };
    let Some(bounds) = face_bounds(font, face) else {
        return;
    };
    let x = (center.x - f64::from(bounds.min.x + bounds.max.x) / 2.0).round() as i32;
    let y = (center.y - f64::from(bounds.min.y + bounds.max.y) / 2.0).round() as i32;
    draw_text_mut(image, Rgba(PIN_BORDER_COLOR), x, y, PIN_GLYPH_SIZE, font, face);
}

/// First readable font from the usual system locations.
pub fn load_system_font() -> Option<FontArc> {
    let candidates = [
        "/usr/share/fonts/truetype/noto/NotoEmoji-Regular.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\seguiemj.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    for path in candidates {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontArc::try_from_vec(bytes) {
                debug!(path, "Loaded pin glyph font");
                return Some(font);
            }
        }
    }
    None
}

/// State of the layer under the markups.
#[derive(Debug, Clone, Default)]
pub enum BackgroundLayer {
    /// Nothing to show (non-visual attachment).
    #[default]
    None,
    /// Image bytes are still on their way.
    Loading,
    Image(Arc<RgbaImage>),
    /// A document viewer sits beneath the canvas (PDF).
    Transparent,
    /// Load or decode failed; the canvas stays blank under the markups.
    Failed,
}

impl BackgroundLayer {
    pub fn for_attachment(attachment: &Attachment) -> Self {
        if attachment.is_pdf() {
            Self::Transparent
        } else if attachment.is_image() {
            Self::Loading
        } else {
            Self::None
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        debug!(width = image.width(), height = image.height(), "Background decoded");
        Ok(Self::Image(Arc::new(image)))
    }

    /// Decode, logging and recording failure instead of returning it.
    pub fn decode_or_failed(bytes: &[u8]) -> Self {
        Self::decode(bytes).unwrap_or_else(|e| {
            warn!("Background image failed to load: {}", e);
            Self::Failed
        })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Everything one frame needs.
pub struct Scene<'a> {
    pub background: &'a BackgroundLayer,
    pub markups: &'a [Markup],
    /// Committed locally, not yet confirmed by the server.
    pub pending: &'a [Path],
    /// The drag in progress.
    pub active: Option<&'a Path>,
    pub show_markups: bool,
}

pub fn render<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>) {
    surface.clear();

    if let BackgroundLayer::Image(image) = scene.background {
        let (cw, ch) = surface.size();
        let at = place_centered(cw, ch, image.width() as f64, image.height() as f64);
        surface.draw_image(image, at);
    }

    if scene.show_markups {
        for markup in scene.markups {
            draw_markup(surface, markup);
        }
    }

    for path in scene.pending {
        draw_path(surface, path);
    }

    if let Some(path) = scene.active {
        draw_path(surface, path);
    }
}

fn draw_markup<S: Surface + ?Sized>(surface: &mut S, markup: &Markup) {
    let color = color_or_default(&markup.color);
    match (markup.kind, markup.position) {
        (MarkupType::Comment, Some(center)) => surface.draw_pin(center, color, PIN_GLYPH),
        // Pins without a position have nothing to draw.
        (MarkupType::Comment, None) => {}
        _ if !markup.canvas_data.is_empty() => {
            surface.stroke_polyline(&markup.canvas_data, color, markup.stroke_width as f64)
        }
        _ => {}
    }
}

fn draw_path<S: Surface + ?Sized>(surface: &mut S, path: &Path) {
    surface.stroke_polyline(&path.points, color_or_default(&path.color), path.stroke_width as f64);
}

/// First comment pin within [`PIN_RADIUS`] of `at`, in list order.
pub fn hit_test_pin(markups: &[Markup], at: Point) -> Option<&Markup> {
    markups.iter().find(|m| match (m.kind, m.position) {
        (MarkupType::Comment, Some(center)) => center.distance(at) <= PIN_RADIUS,
        _ => false,
    })
}
