use portal_types::Point;

pub const DEFAULT_COLOR: &str = "#ef4444";
pub const DEFAULT_STROKE_WIDTH: u8 = 3;
pub const MIN_STROKE_WIDTH: u8 = 1;
pub const MAX_STROKE_WIDTH: u8 = 20;

/// One continuous pointer drag in canvas pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub points: Vec<Point>,
    pub color: String,
    pub stroke_width: u8,
}

impl Path {
    pub fn start(at: Point, color: &str, stroke_width: u8) -> Self {
        Self {
            points: vec![at],
            color: color.to_string(),
            stroke_width,
        }
    }

    /// A single point is a click, not a stroke.
    pub fn is_committable(&self) -> bool {
        self.points.len() >= 2
    }
}

/// The canvas element's bounding rectangle in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CanvasRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Client coordinates to canvas-local coordinates. The canvas backing
    /// size is assumed to equal its displayed size.
    pub fn to_canvas(&self, client: Point) -> Point {
        Point::new(client.x - self.left, client.y - self.top)
    }
}

/// Where a background image lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

/// Uniform scale that fits the image inside the canvas without upscaling.
pub fn fit_scale(canvas_w: f64, canvas_h: f64, image_w: f64, image_h: f64) -> f64 {
    if image_w <= 0.0 || image_h <= 0.0 {
        return 1.0;
    }
    (canvas_w / image_w).min(canvas_h / image_h).min(1.0)
}

/// Scale and center an image inside the canvas.
pub fn place_centered(canvas_w: f64, canvas_h: f64, image_w: f64, image_h: f64) -> Placement {
    let scale = fit_scale(canvas_w, canvas_h, image_w, image_h);
    let width = image_w * scale;
    let height = image_h * scale;
    Placement {
        x: (canvas_w - width) / 2.0,
        y: (canvas_h - height) / 2.0,
        width,
        height,
        scale,
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` into RGBA.
pub fn parse_hex_color(value: &str) -> Option<[u8; 4]> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [255u8; 4];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(out)
        }
        6 => Some([byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?, 255]),
        8 => Some([
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        ]),
        _ => None,
    }
}

/// Like [`parse_hex_color`], falling back to the default stroke color.
pub fn color_or_default(value: &str) -> [u8; 4] {
    parse_hex_color(value)
        .or_else(|| parse_hex_color(DEFAULT_COLOR))
        .unwrap_or([239, 68, 68, 255])
}
