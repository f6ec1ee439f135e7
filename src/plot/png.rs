//! Static PNG output
//!
//! Orthographic projection of the mesh, quads painted back to front with a
//! viridis colour ramp.

use std::io::Cursor;

use image::{DynamicImage, ImageError, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

use super::mesh::{bounds, Mesh};

const AZIMUTH_DEG: f64 = -60.0;
const ELEVATION_DEG: f64 = 30.0;
const MARGIN: f64 = 24.0;
const MIN_SIDE: u32 = 16;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const FRAME: Rgb<u8> = Rgb([200, 200, 200]);

const VIRIDIS: [(f64, [f64; 3]); 5] = [
    (0.0, [68.0, 1.0, 84.0]),
    (0.25, [59.0, 82.0, 139.0]),
    (0.5, [33.0, 145.0, 140.0]),
    (0.75, [94.0, 201.0, 98.0]),
    (1.0, [253.0, 231.0, 37.0]),
];

struct Quad {
    corners: [(f64, f64); 4],
    depth: f64,
    shade: f64,
}

/// Maps normalized scene coordinates to the screen plane
struct Camera {
    sin_az: f64,
    cos_az: f64,
    sin_el: f64,
    cos_el: f64,
}

impl Camera {
    fn new() -> Self {
        let (sin_az, cos_az) = AZIMUTH_DEG.to_radians().sin_cos();
        let (sin_el, cos_el) = ELEVATION_DEG.to_radians().sin_cos();
        Self {
            sin_az,
            cos_az,
            sin_el,
            cos_el,
        }
    }

    /// Returns `(right, up, towards_viewer)`
    fn project(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        let xr = x * self.cos_az - y * self.sin_az;
        let yr = x * self.sin_az + y * self.cos_az;
        (
            xr,
            yr * self.sin_el + z * self.cos_el,
            -yr * self.cos_el + z * self.sin_el,
        )
    }
}

/// Scale each axis into `[-1, 1]`
struct Normalizer {
    ranges: [(f64, f64); 3],
}

impl Normalizer {
    fn new(mesh: &Mesh) -> Self {
        let axis = |grid: &Vec<Vec<f64>>| bounds(grid.iter().flatten().copied()).unwrap_or((0.0, 0.0));
        Self {
            ranges: [axis(&mesh.x), axis(&mesh.y), axis(&mesh.z)],
        }
    }

    fn apply(&self, axis: usize, value: f64) -> f64 {
        let (lo, hi) = self.ranges[axis];
        let span = hi - lo;
        if span <= f64::EPSILON {
            0.0
        } else {
            (value - lo) / span * 2.0 - 1.0
        }
    }
}

pub fn render(mesh: &Mesh, width: u32, height: u32) -> Result<Vec<u8>, ImageError> {
    let width = width.max(MIN_SIDE);
    let height = height.max(MIN_SIDE);
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

    let camera = Camera::new();
    let normalizer = Normalizer::new(mesh);
    let (color_lo, color_hi) = mesh.color_bounds().unwrap_or((0.0, 1.0));
    let color_span = (color_hi - color_lo).max(f64::EPSILON);

    let project = |row: usize, col: usize| {
        camera.project(
            normalizer.apply(0, mesh.x[row][col]),
            normalizer.apply(1, mesh.y[row][col]),
            normalizer.apply(2, mesh.z[row][col]),
        )
    };

    let mut quads = Vec::new();
    for row in 0..mesh.rows().saturating_sub(1) {
        for col in 0..mesh.cols().saturating_sub(1) {
            let cells = [(row, col), (row, col + 1), (row + 1, col + 1), (row + 1, col)];
            if !cells.iter().all(|&(r, c)| mesh.is_finite_at(r, c)) {
                continue;
            }
            let projected = cells.map(|(r, c)| project(r, c));
            let color = cells.iter().map(|&(r, c)| mesh.color[r][c]).sum::<f64>() / 4.0;
            quads.push(Quad {
                corners: projected.map(|(right, up, _)| (right, up)),
                depth: projected.iter().map(|p| p.2).sum::<f64>() / 4.0,
                shade: ((color - color_lo) / color_span).clamp(0.0, 1.0),
            });
        }
    }

    // Fit the unit cube's projection so every figure uses the same framing
    let frame: Vec<(f64, f64)> = cube_corners()
        .iter()
        .map(|&(x, y, z)| {
            let (right, up, _) = camera.project(x, y, z);
            (right, up)
        })
        .collect();
    let viewport = Viewport::fit(&frame, width, height);

    draw_floor(&mut canvas, &camera, &viewport);

    quads.sort_by(|a, b| a.depth.total_cmp(&b.depth));
    for quad in &quads {
        let fill = viridis(quad.shade);
        let outline = darken(fill, 0.75);
        let screen = quad.corners.map(|(right, up)| viewport.to_screen(right, up));
        fill_polygon(&mut canvas, &screen, fill);
        for i in 0..4 {
            draw_line_segment_mut(&mut canvas, screen[i], screen[(i + 1) % 4], outline);
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(canvas).write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

struct Viewport {
    scale: f64,
    center: (f64, f64),
    origin: (f64, f64),
}

impl Viewport {
    fn fit(points: &[(f64, f64)], width: u32, height: u32) -> Self {
        let (min_x, max_x) = bounds(points.iter().map(|p| p.0)).unwrap_or((-1.0, 1.0));
        let (min_y, max_y) = bounds(points.iter().map(|p| p.1)).unwrap_or((-1.0, 1.0));
        let usable_w = (f64::from(width) - 2.0 * MARGIN).max(1.0);
        let usable_h = (f64::from(height) - 2.0 * MARGIN).max(1.0);
        let scale = (usable_w / (max_x - min_x).max(f64::EPSILON))
            .min(usable_h / (max_y - min_y).max(f64::EPSILON));
        Self {
            scale,
            center: (f64::from(width) / 2.0, f64::from(height) / 2.0),
            origin: ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
        }
    }

    /// Screen y grows downwards
    fn to_screen(&self, right: f64, up: f64) -> (f32, f32) {
        (
            (self.center.0 + (right - self.origin.0) * self.scale) as f32,
            (self.center.1 - (up - self.origin.1) * self.scale) as f32,
        )
    }
}

fn cube_corners() -> [(f64, f64, f64); 8] {
    [
        (-1.0, -1.0, -1.0),
        (1.0, -1.0, -1.0),
        (1.0, 1.0, -1.0),
        (-1.0, 1.0, -1.0),
        (-1.0, -1.0, 1.0),
        (1.0, -1.0, 1.0),
        (1.0, 1.0, 1.0),
        (-1.0, 1.0, 1.0),
    ]
}

/// Outline of the cube's bottom face as a reference plane
fn draw_floor(canvas: &mut RgbImage, camera: &Camera, viewport: &Viewport) {
    let floor: Vec<(f32, f32)> = cube_corners()[..4]
        .iter()
        .map(|&(x, y, z)| {
            let (right, up, _) = camera.project(x, y, z);
            viewport.to_screen(right, up)
        })
        .collect();
    for i in 0..floor.len() {
        draw_line_segment_mut(canvas, floor[i], floor[(i + 1) % floor.len()], FRAME);
    }
}

/// Fill a quad; collapsed quads (fewer than three distinct pixels) are skipped
fn fill_polygon(canvas: &mut RgbImage, corners: &[(f32, f32); 4], color: Rgb<u8>) {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(4);
    for &(x, y) in corners {
        let point = Point::new(x.round() as i32, y.round() as i32);
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    // The first and last vertex must differ
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() >= 3 {
        draw_polygon_mut(canvas, &points, color);
    }
}

fn viridis(t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let upper = VIRIDIS
        .iter()
        .position(|(stop, _)| *stop >= t)
        .unwrap_or(VIRIDIS.len() - 1)
        .max(1);
    let (t0, c0) = VIRIDIS[upper - 1];
    let (t1, c1) = VIRIDIS[upper];
    let f = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);
    Rgb([0, 1, 2].map(|i| (c0[i] + (c1[i] - c0[i]) * f).round() as u8))
}

fn darken(color: Rgb<u8>, factor: f64) -> Rgb<u8> {
    Rgb(color.0.map(|c| (f64::from(c) * factor).round() as u8))
}
