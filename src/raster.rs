use ab_glyph::{point, Font, FontRef, GlyphId, ScaleFont};
use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};

use crate::chart::{Anchor, Label, Rgba, Scene, Shape, LABEL_SIZE};

/// Inter Regular, SIL Open Font License (see `assets/fonts/Inter-LICENSE`).
const LABEL_FONT: &[u8] = include_bytes!("../assets/fonts/Inter-Regular.ttf");

/// Draws the scene's shapes, then its labels, into a PNG.
pub fn render_png(scene: &Scene, background: Rgba) -> Result<Vec<u8>> {
    let font = FontRef::try_from_slice(LABEL_FONT).context("Bundled label font is invalid")?;
    let width = scene.width.round().max(1.0) as u32;
    let height = scene.height.round().max(1.0) as u32;
    let mut canvas = RgbaImage::from_pixel(width, height, image::Rgba(background.0));

    for shape in &scene.shapes {
        match shape {
            Shape::Rect {
                x,
                y,
                width,
                height,
                color,
            } => fill_rect(&mut canvas, *x, *y, *width, *height, *color),
            Shape::Polygon { points, color } => fill_polygon(&mut canvas, points, *color),
            Shape::Polyline {
                points,
                width,
                color,
            } => {
                for pair in points.windows(2) {
                    stroke_segment(&mut canvas, pair[0], pair[1], *width, *color);
                }
            }
            Shape::Circle {
                center,
                radius,
                color,
            } => fill_circle(&mut canvas, *center, *radius, *color),
        }
    }

    for label in &scene.labels {
        draw_label(&mut canvas, &font, label);
    }

    let mut buffer = Vec::new();
    canvas
        .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
        .context("Failed to encode chart image")?;
    Ok(buffer)
}

fn blend(canvas: &mut RgbaImage, x: u32, y: u32, color: Rgba) {
    let [r, g, b, a] = color.0;
    if a == 0 {
        return;
    }
    let pixel = canvas.get_pixel_mut(x, y);
    if a == 255 {
        pixel.0 = [r, g, b, 255];
        return;
    }
    let alpha = a as f32 / 255.0;
    for (channel, source) in pixel.0.iter_mut().take(3).zip([r, g, b]) {
        *channel = (source as f32 * alpha + *channel as f32 * (1.0 - alpha)).round() as u8;
    }
    pixel.0[3] = 255;
}

/// Pixel range whose centres may fall inside `[min, max]`.
fn span(min: f32, max: f32, limit: u32) -> std::ops::Range<u32> {
    let start = (min - 0.5).ceil().max(0.0) as u32;
    let end = ((max - 0.5).floor() + 1.0).clamp(0.0, limit as f32) as u32;
    start.min(end)..end
}

fn fill_rect(canvas: &mut RgbaImage, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
    let (w, h) = canvas.dimensions();
    for py in span(y, y + height - 0.001, h) {
        for px in span(x, x + width - 0.001, w) {
            blend(canvas, px, py, color);
        }
    }
}

fn fill_polygon(canvas: &mut RgbaImage, points: &[(f32, f32)], color: Rgba) {
    if points.len() < 3 {
        return;
    }
    let (w, h) = canvas.dimensions();
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    for py in span(min_y, max_y, h) {
        for px in span(min_x, max_x, w) {
            if contains(points, px as f32 + 0.5, py as f32 + 0.5) {
                blend(canvas, px, py, color);
            }
        }
    }
}

/// Even-odd point-in-polygon test.
fn contains(points: &[(f32, f32)], x: f32, y: f32) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn stroke_segment(canvas: &mut RgbaImage, a: (f32, f32), b: (f32, f32), width: f32, color: Rgba) {
    let (w, h) = canvas.dimensions();
    let half = (width / 2.0).max(0.5);
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let length_sq = dx * dx + dy * dy;

    for py in span(a.1.min(b.1) - half, a.1.max(b.1) + half, h) {
        for px in span(a.0.min(b.0) - half, a.0.max(b.0) + half, w) {
            let (cx, cy) = (px as f32 + 0.5, py as f32 + 0.5);
            let t = if length_sq == 0.0 {
                0.0
            } else {
                (((cx - a.0) * dx + (cy - a.1) * dy) / length_sq).clamp(0.0, 1.0)
            };
            let (nx, ny) = (a.0 + t * dx - cx, a.1 + t * dy - cy);
            if nx * nx + ny * ny <= half * half {
                blend(canvas, px, py, color);
            }
        }
    }
}

fn fill_circle(canvas: &mut RgbaImage, center: (f32, f32), radius: f32, color: Rgba) {
    let (w, h) = canvas.dimensions();
    for py in span(center.1 - radius, center.1 + radius, h) {
        for px in span(center.0 - radius, center.0 + radius, w) {
            let (dx, dy) = (px as f32 + 0.5 - center.0, py as f32 + 0.5 - center.1);
            if dx * dx + dy * dy <= radius * radius {
                blend(canvas, px, py, color);
            }
        }
    }
}

/// Lays the label out on one line, anchored horizontally at its position and
/// centred vertically on it.
fn draw_label(canvas: &mut RgbaImage, font: &FontRef<'_>, label: &Label) {
    let scaled = font.as_scaled(LABEL_SIZE);
    let ids: Vec<GlyphId> = label.text.chars().map(|c| scaled.glyph_id(c)).collect();

    let mut offsets = Vec::with_capacity(ids.len());
    let mut width = 0.0;
    for (i, &id) in ids.iter().enumerate() {
        if i > 0 {
            width += scaled.kern(ids[i - 1], id);
        }
        offsets.push(width);
        width += scaled.h_advance(id);
    }

    let (x, y) = label.position;
    let start = match label.anchor {
        Anchor::Start => x,
        Anchor::Middle => x - width / 2.0,
        Anchor::End => x - width,
    };
    let baseline = y + (scaled.ascent() + scaled.descent()) / 2.0;
    let (w, h) = canvas.dimensions();

    for (&id, &offset) in ids.iter().zip(&offsets) {
        let glyph = id.with_scale_and_position(scaled.scale(), point(start + offset, baseline));
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i64 + gx as i64;
            let py = bounds.min.y as i64 + gy as i64;
            if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                return;
            }
            let alpha = (label.color.0[3] as f32 * coverage.min(1.0)).round() as u8;
            blend(canvas, px as u32, py as u32, label.color.with_alpha(alpha));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(shapes: Vec<Shape>) -> Scene {
        Scene {
            width: 20.0,
            height: 10.0,
            shapes,
            labels: Vec::new(),
            legend: Vec::new(),
        }
    }

    fn decode(png: &[u8]) -> RgbaImage {
        image::load_from_memory(png).unwrap().to_rgba8()
    }

    #[test]
    fn empty_scene_is_background() {
        let png = render_png(&scene(Vec::new()), Rgba::WHITE).unwrap();
        let image = decode(&png);
        assert_eq!(image.dimensions(), (20, 10));
        assert!(image.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn rect_covers_exact_pixels() {
        let red = Rgba::rgb(255, 0, 0);
        let png = render_png(
            &scene(vec![Shape::Rect {
                x: 2.0,
                y: 3.0,
                width: 4.0,
                height: 2.0,
                color: red,
            }]),
            Rgba::WHITE,
        )
        .unwrap();
        let image = decode(&png);
        assert_eq!(image.pixels().filter(|p| p.0 == [255, 0, 0, 255]).count(), 8);
        assert_eq!(image.get_pixel(2, 3).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(6, 3).0, [255, 255, 255, 255]);
    }

    #[test]
    fn translucent_fill_blends_with_background() {
        let png = render_png(
            &scene(vec![Shape::Rect {
                x: 0.0,
                y: 0.0,
                width: 20.0,
                height: 10.0,
                color: Rgba([0, 0, 0, 128]),
            }]),
            Rgba::WHITE,
        )
        .unwrap();
        let pixel = decode(&png).get_pixel(5, 5).0;
        assert_eq!(pixel, [127, 127, 127, 255]);
    }

    fn label(text: &str, position: (f32, f32), anchor: Anchor) -> Label {
        Label {
            text: text.to_string(),
            position,
            color: Rgba::rgb(0, 0, 0),
            anchor,
        }
    }

    fn inked(image: &RgbaImage) -> Vec<(u32, u32)> {
        image
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0 != [255, 255, 255, 255])
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn labels_are_rasterized() {
        let mut labeled = scene(Vec::new());
        labeled.width = 120.0;
        labeled.height = 30.0;
        labeled.labels.push(label("Revenue", (10.0, 15.0), Anchor::Start));

        let image = decode(&render_png(&labeled, Rgba::WHITE).unwrap());
        let ink = inked(&image);
        assert!(!ink.is_empty());
        assert!(ink.iter().all(|&(x, y)| x >= 9 && (4..26).contains(&y)));
    }

    #[test]
    fn end_anchored_label_sits_left_of_its_position() {
        let mut labeled = scene(Vec::new());
        labeled.width = 120.0;
        labeled.height = 30.0;
        labeled.labels.push(label("1.5k", (100.0, 15.0), Anchor::End));

        let image = decode(&render_png(&labeled, Rgba::WHITE).unwrap());
        let ink = inked(&image);
        assert!(!ink.is_empty());
        assert!(ink.iter().all(|&(x, _)| x <= 101));
    }

    #[test]
    fn polygon_and_line_paint_inside_only() {
        let blue = Rgba::rgb(0, 0, 255);
        let png = render_png(
            &scene(vec![
                Shape::Polygon {
                    points: vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
                    color: blue,
                },
                Shape::Polyline {
                    points: vec![(12.0, 5.0), (19.0, 5.0)],
                    width: 2.0,
                    color: blue,
                },
            ]),
            Rgba::WHITE,
        )
        .unwrap();
        let image = decode(&png);
        assert_eq!(image.get_pixel(5, 5).0, [0, 0, 255, 255]);
        assert_eq!(image.get_pixel(15, 4).0, [0, 0, 255, 255]);
        assert_eq!(image.get_pixel(15, 8).0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(11, 1).0, [255, 255, 255, 255]);
    }
}
