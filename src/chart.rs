use std::collections::BTreeSet;
use std::f32::consts::{PI, TAU};

use iced::event;
use iced::mouse;
use iced::widget::canvas::{self, Frame, Path, Stroke};
use iced::widget::{button, column, container, row, text};
use iced::{alignment, Border, Element, Length, Point, Rectangle, Renderer, Size, Theme};

use crate::content::{Chart, ChartKind, Dataset};
use crate::raster;
use crate::theme::Palette;
use crate::{Message, ViewId};

pub const PNG_FILE_NAME: &str = "chart.png";

const MARGIN: f32 = 16.0;
const AXIS_GUTTER: f32 = 56.0;
const CATEGORY_GUTTER: f32 = 28.0;
const LEGEND_TOP: f32 = 8.0;
const LEGEND_ROW: f32 = 20.0;
const SWATCH: f32 = 12.0;
const CHAR_WIDTH: f32 = 7.0;
const LEGEND_GAP: f32 = 16.0;
pub const LABEL_SIZE: f32 = 12.0;
const CANVAS_HEIGHT: f32 = 320.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);
    pub const INK: Rgba = Rgba([55, 65, 81, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba([r, g, b, 255])
    }

    pub fn with_alpha(self, alpha: u8) -> Self {
        let [r, g, b, _] = self.0;
        Rgba([r, g, b, alpha])
    }

    pub fn to_color(self) -> iced::Color {
        let [r, g, b, a] = self.0;
        iced::Color::from_rgba8(r, g, b, a as f32 / 255.0)
    }

    pub fn from_color(color: iced::Color) -> Self {
        let [r, g, b, a] = color.into_rgba8();
        Rgba([r, g, b, a])
    }
}

/// Series colours used when a dataset does not bring its own.
const SERIES: [Rgba; 8] = [
    Rgba::rgb(54, 162, 235),
    Rgba::rgb(255, 99, 132),
    Rgba::rgb(75, 192, 192),
    Rgba::rgb(255, 159, 64),
    Rgba::rgb(153, 102, 255),
    Rgba::rgb(255, 205, 86),
    Rgba::rgb(46, 204, 113),
    Rgba::rgb(201, 203, 207),
];

fn series(index: usize) -> Rgba {
    SERIES[index % SERIES.len()]
}

/// Parses the CSS colour forms chart payloads use: hex, `rgb()`, `rgba()`
/// and a handful of names.
pub fn parse_color(input: &str) -> Option<Rgba> {
    let value = input.trim().to_ascii_lowercase();

    if let Some(hex) = value.strip_prefix('#') {
        let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return match hex.len() {
            3 => Some(Rgba([digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 255])),
            6 => Some(Rgba([pair(0)?, pair(2)?, pair(4)?, 255])),
            8 => Some(Rgba([pair(0)?, pair(2)?, pair(4)?, pair(6)?])),
            _ => None,
        };
    }

    let args = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'));
    if let Some(args) = args {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let channel = |s: &str| s.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
        let alpha = match parts.get(3) {
            Some(a) => (a.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
            None => 255,
        };
        return Some(Rgba([channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha]));
    }

    match value.as_str() {
        "black" => Some(Rgba::rgb(0, 0, 0)),
        "white" => Some(Rgba::WHITE),
        "red" => Some(Rgba::rgb(255, 0, 0)),
        "green" => Some(Rgba::rgb(0, 128, 0)),
        "blue" => Some(Rgba::rgb(0, 0, 255)),
        "orange" => Some(Rgba::rgb(255, 165, 0)),
        "yellow" => Some(Rgba::rgb(255, 255, 0)),
        "purple" => Some(Rgba::rgb(128, 0, 128)),
        "gray" | "grey" => Some(Rgba::rgb(128, 128, 128)),
        "transparent" => Some(Rgba([0, 0, 0, 0])),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgba,
    },
    Polygon {
        points: Vec<(f32, f32)>,
        color: Rgba,
    },
    Polyline {
        points: Vec<(f32, f32)>,
        width: f32,
        color: Rgba,
    },
    Circle {
        center: (f32, f32),
        radius: f32,
        color: Rgba,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub position: (f32, f32),
    pub color: Rgba,
    pub anchor: Anchor,
}

/// Clickable area of one legend entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendEntry {
    pub dataset: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Everything needed to draw a chart at one size. Built fresh from the chart
/// and its hidden set on every draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    pub shapes: Vec<Shape>,
    pub labels: Vec<Label>,
    pub legend: Vec<LegendEntry>,
}

impl Scene {
    pub fn legend_hit(&self, x: f32, y: f32) -> Option<usize> {
        self.legend
            .iter()
            .find(|e| x >= e.x && x <= e.x + e.width && y >= e.y && y <= e.y + e.height)
            .map(|e| e.dataset)
    }
}

#[derive(Debug, Clone)]
pub struct ChartView {
    chart: Chart,
    hidden: BTreeSet<usize>,
}

impl ChartView {
    pub fn new(chart: Chart) -> Self {
        ChartView {
            chart,
            hidden: BTreeSet::new(),
        }
    }

    pub fn is_hidden(&self, dataset: usize) -> bool {
        self.hidden.contains(&dataset)
    }

    /// Flips a dataset's visibility. The data itself is never touched.
    pub fn toggle_dataset(&mut self, dataset: usize) {
        if dataset >= self.chart.datasets.len() {
            return;
        }
        let mut next = self.hidden.clone();
        if !next.remove(&dataset) {
            next.insert(dataset);
        }
        self.hidden = next;
    }

    fn visible(&self) -> Vec<usize> {
        (0..self.chart.datasets.len())
            .filter(|&i| !self.is_hidden(i))
            .collect()
    }

    pub fn scene(&self, width: f32, height: f32, ink: Rgba) -> Scene {
        let mut scene = Scene {
            width,
            height,
            shapes: Vec::new(),
            labels: Vec::new(),
            legend: Vec::new(),
        };

        let legend_bottom = self.layout_legend(&mut scene, ink);
        let plot = match self.chart.kind {
            ChartKind::Pie => Plot {
                left: MARGIN,
                right: width - MARGIN,
                top: legend_bottom + MARGIN,
                bottom: height - MARGIN,
            },
            ChartKind::Line | ChartKind::Bar => Plot {
                left: AXIS_GUTTER,
                right: width - MARGIN,
                top: legend_bottom + 8.0,
                bottom: height - CATEGORY_GUTTER,
            },
        };
        if plot.width() <= 0.0 || plot.height() <= 0.0 {
            return scene;
        }

        match self.chart.kind {
            ChartKind::Pie => self.layout_pie(&mut scene, &plot, ink),
            ChartKind::Line | ChartKind::Bar => self.layout_cartesian(&mut scene, &plot, ink),
        }
        scene
    }

    /// Rasterizes what is currently visible, hidden datasets excluded.
    pub fn export_png(&self, width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
        let scene = self.scene(width as f32, height as f32, Rgba::INK);
        raster::render_png(&scene, Rgba::WHITE)
    }

    fn layout_legend(&self, scene: &mut Scene, ink: Rgba) -> f32 {
        let mut x = MARGIN;
        let mut y = LEGEND_TOP;
        for (index, dataset) in self.chart.datasets.iter().enumerate() {
            let name = legend_name(dataset, index);
            let width = SWATCH + 6.0 + name.chars().count() as f32 * CHAR_WIDTH;
            if x > MARGIN && x + width > scene.width - MARGIN {
                x = MARGIN;
                y += LEGEND_ROW;
            }

            let hidden = self.is_hidden(index);
            let swatch = dataset_color(dataset, index, self.chart.kind);
            let (swatch, text_color) = if hidden {
                (swatch.with_alpha(60), ink.with_alpha(90))
            } else {
                (swatch, ink)
            };
            let swatch_y = y + (LEGEND_ROW - SWATCH) / 2.0;
            scene.shapes.push(Shape::Rect {
                x,
                y: swatch_y,
                width: SWATCH,
                height: SWATCH,
                color: swatch,
            });
            scene.labels.push(Label {
                text: name,
                position: (x + SWATCH + 6.0, y + LEGEND_ROW / 2.0),
                color: text_color,
                anchor: Anchor::Start,
            });
            if hidden {
                scene.shapes.push(Shape::Rect {
                    x: x + SWATCH + 6.0,
                    y: y + LEGEND_ROW / 2.0,
                    width: width - SWATCH - 6.0,
                    height: 1.0,
                    color: text_color,
                });
            }
            scene.legend.push(LegendEntry {
                dataset: index,
                x,
                y,
                width,
                height: LEGEND_ROW,
            });
            x += width + LEGEND_GAP;
        }

        if self.chart.datasets.is_empty() {
            0.0
        } else {
            y + LEGEND_ROW
        }
    }

    fn layout_cartesian(&self, scene: &mut Scene, plot: &Plot, ink: Rgba) {
        let visible = self.visible();
        let slots = self.chart.labels.len().max(
            visible
                .iter()
                .map(|&d| self.chart.datasets[d].values.len())
                .max()
                .unwrap_or(0),
        );

        let (mut lo, mut hi) = (0.0f64, 0.0f64);
        for &d in &visible {
            for &v in self.chart.datasets[d].values.iter().take(slots) {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        if hi <= lo {
            hi = lo + 1.0;
        }
        let y_of = |v: f64| plot.bottom - ((v - lo) / (hi - lo)) as f32 * plot.height();

        for step in 0..=4 {
            let v = lo + (hi - lo) * step as f64 / 4.0;
            let y = y_of(v);
            scene.shapes.push(Shape::Rect {
                x: plot.left,
                y,
                width: plot.width(),
                height: 1.0,
                color: ink.with_alpha(30),
            });
            scene.labels.push(Label {
                text: format_tick(v),
                position: (plot.left - 6.0, y),
                color: ink,
                anchor: Anchor::End,
            });
        }
        scene.shapes.push(Shape::Polyline {
            points: vec![(plot.left, plot.top), (plot.left, plot.bottom)],
            width: 1.0,
            color: ink.with_alpha(120),
        });
        scene.shapes.push(Shape::Polyline {
            points: vec![(plot.left, y_of(0.0)), (plot.right, y_of(0.0))],
            width: 1.0,
            color: ink.with_alpha(120),
        });

        if slots == 0 {
            return;
        }
        let slot = plot.width() / slots as f32;
        for (i, name) in self.chart.labels.iter().enumerate().take(slots) {
            scene.labels.push(Label {
                text: name.clone(),
                position: (plot.left + slot * (i as f32 + 0.5), plot.bottom + 12.0),
                color: ink,
                anchor: Anchor::Middle,
            });
        }

        match self.chart.kind {
            ChartKind::Bar => {
                if visible.is_empty() {
                    return;
                }
                let bar = slot * 0.8 / visible.len() as f32;
                for (j, &d) in visible.iter().enumerate() {
                    let dataset = &self.chart.datasets[d];
                    for (i, &v) in dataset.values.iter().enumerate().take(slots) {
                        let top = y_of(v.max(0.0));
                        let bottom = y_of(v.min(0.0));
                        scene.shapes.push(Shape::Rect {
                            x: plot.left + slot * i as f32 + slot * 0.1 + bar * j as f32,
                            y: top,
                            width: bar,
                            height: (bottom - top).max(1.0),
                            color: point_color(dataset, d, i),
                        });
                    }
                }
            }
            ChartKind::Line => {
                for &d in &visible {
                    let dataset = &self.chart.datasets[d];
                    let color = dataset_color(dataset, d, ChartKind::Line);
                    let points: Vec<(f32, f32)> = dataset
                        .values
                        .iter()
                        .enumerate()
                        .take(slots)
                        .map(|(i, &v)| (plot.left + slot * (i as f32 + 0.5), y_of(v)))
                        .collect();
                    if points.len() >= 2 {
                        scene.shapes.push(Shape::Polyline {
                            points: points.clone(),
                            width: 2.0,
                            color,
                        });
                    }
                    for center in points {
                        scene.shapes.push(Shape::Circle {
                            center,
                            radius: 3.0,
                            color,
                        });
                    }
                }
            }
            ChartKind::Pie => {}
        }
    }

    fn layout_pie(&self, scene: &mut Scene, plot: &Plot, ink: Rgba) {
        let visible = self.visible();
        if visible.is_empty() {
            return;
        }
        let center = (
            plot.left + plot.width() / 2.0,
            plot.top + plot.height() / 2.0,
        );
        let radius = (plot.width().min(plot.height()) / 2.0 - 18.0).max(4.0);
        let ring = radius / visible.len() as f32;

        for (k, &d) in visible.iter().enumerate() {
            let dataset = &self.chart.datasets[d];
            let outer = radius - ring * k as f32;
            let inner = (outer - ring).max(0.0);
            let total: f64 = dataset.values.iter().map(|v| v.max(0.0)).sum();
            if total <= 0.0 {
                continue;
            }

            let mut start = -PI / 2.0;
            for (i, &v) in dataset.values.iter().enumerate() {
                let sweep = (v.max(0.0) / total) as f32 * TAU;
                if sweep <= 0.0 {
                    continue;
                }
                scene.shapes.push(Shape::Polygon {
                    points: wedge(center, inner, outer, start, sweep),
                    color: point_color(dataset, i, i),
                });
                if k == 0 {
                    if let Some(name) = self.chart.labels.get(i) {
                        let mid = start + sweep / 2.0;
                        let x = center.0 + (outer + 10.0) * mid.cos();
                        let y = center.1 + (outer + 10.0) * mid.sin();
                        scene.labels.push(Label {
                            text: name.clone(),
                            position: (x, y),
                            color: ink,
                            anchor: if x >= center.0 { Anchor::Start } else { Anchor::End },
                        });
                    }
                }
                start += sweep;
            }
        }
    }

    pub fn view(&self, id: ViewId, palette: Palette) -> Element<'_, Message> {
        let toolbar = row![
            text("Chart Visualization").size(12).color(palette.muted),
            iced::widget::horizontal_space(),
            button(text("Download PNG").size(12))
                .style(button::text)
                .padding([4, 8])
                .on_press(Message::ExportChart(id)),
        ]
        .align_y(alignment::Vertical::Center);

        let chart = canvas::Canvas::new(ChartCanvas {
            chart: self,
            id,
            ink: Rgba::from_color(palette.text),
        })
        .width(Length::Fill)
        .height(Length::Fixed(CANVAS_HEIGHT));

        container(column![toolbar, chart].spacing(8))
            .padding(12)
            .width(Length::Fill)
            .style(move |_theme| container::Style {
                border: Border {
                    color: palette.border,
                    width: 1.0,
                    radius: 8.0.into(),
                },
                ..container::Style::default()
            })
            .into()
    }
}

struct Plot {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

impl Plot {
    fn width(&self) -> f32 {
        self.right - self.left
    }

    fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

fn legend_name(dataset: &Dataset, index: usize) -> String {
    if dataset.label.is_empty() {
        format!("Dataset {}", index + 1)
    } else {
        dataset.label.clone()
    }
}

/// Colour that stands for the whole dataset (legend swatch, line stroke).
fn dataset_color(dataset: &Dataset, index: usize, kind: ChartKind) -> Rgba {
    let stroke = dataset.stroke_color.as_deref().and_then(parse_color);
    let fill = dataset
        .fill_color
        .as_ref()
        .and_then(|paint| paint.at(0))
        .and_then(parse_color);
    let chosen = match kind {
        ChartKind::Line => stroke.or(fill),
        ChartKind::Bar | ChartKind::Pie => fill.or(stroke),
    };
    chosen.unwrap_or_else(|| series(index))
}

/// Colour for one bar or slice. Per-point fills win over the dataset colour.
fn point_color(dataset: &Dataset, fallback: usize, point: usize) -> Rgba {
    dataset
        .fill_color
        .as_ref()
        .and_then(|paint| paint.at(point))
        .and_then(parse_color)
        .or_else(|| dataset.stroke_color.as_deref().and_then(parse_color))
        .unwrap_or_else(|| series(fallback))
}

fn wedge(center: (f32, f32), inner: f32, outer: f32, start: f32, sweep: f32) -> Vec<(f32, f32)> {
    let steps = ((sweep.abs() / (PI / 90.0)).ceil() as usize).max(2);
    let at = |r: f32, a: f32| (center.0 + r * a.cos(), center.1 + r * a.sin());

    let mut points: Vec<(f32, f32)> = (0..=steps)
        .map(|s| at(outer, start + sweep * s as f32 / steps as f32))
        .collect();
    if inner > 0.0 {
        points.extend((0..=steps).rev().map(|s| at(inner, start + sweep * s as f32 / steps as f32)));
    } else {
        points.push(center);
    }
    points
}

fn format_tick(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e9 {
        format!("{:.1}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if abs >= 1e4 {
        format!("{:.1}k", v / 1e3)
    } else if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        let s = format!("{:.2}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

struct ChartCanvas<'a> {
    chart: &'a ChartView,
    id: ViewId,
    ink: Rgba,
}

impl<'a> canvas::Program<Message> for ChartCanvas<'a> {
    type State = ();

    fn update(
        &self,
        _state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> (event::Status, Option<Message>) {
        if let canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) = event {
            if let Some(position) = cursor.position_in(bounds) {
                let scene = self.chart.scene(bounds.width, bounds.height, self.ink);
                if let Some(dataset) = scene.legend_hit(position.x, position.y) {
                    return (
                        event::Status::Captured,
                        Some(Message::ToggleDataset { view: self.id, dataset }),
                    );
                }
            }
        }
        (event::Status::Ignored, None)
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let scene = self.chart.scene(bounds.width, bounds.height, self.ink);
        let mut frame = Frame::new(renderer, bounds.size());

        for shape in &scene.shapes {
            match shape {
                Shape::Rect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    let path = Path::rectangle(Point::new(*x, *y), Size::new(*width, *height));
                    frame.fill(&path, color.to_color());
                }
                Shape::Polygon { points, color } => {
                    let path = Path::new(|builder| {
                        let mut iter = points.iter();
                        if let Some(&(x, y)) = iter.next() {
                            builder.move_to(Point::new(x, y));
                            for &(x, y) in iter {
                                builder.line_to(Point::new(x, y));
                            }
                            builder.close();
                        }
                    });
                    frame.fill(&path, color.to_color());
                }
                Shape::Polyline {
                    points,
                    width,
                    color,
                } => {
                    let path = Path::new(|builder| {
                        let mut iter = points.iter();
                        if let Some(&(x, y)) = iter.next() {
                            builder.move_to(Point::new(x, y));
                            for &(x, y) in iter {
                                builder.line_to(Point::new(x, y));
                            }
                        }
                    });
                    frame.stroke(
                        &path,
                        Stroke::default().with_color(color.to_color()).with_width(*width),
                    );
                }
                Shape::Circle {
                    center,
                    radius,
                    color,
                } => {
                    let path = Path::circle(Point::new(center.0, center.1), *radius);
                    frame.fill(&path, color.to_color());
                }
            }
        }

        for label in &scene.labels {
            frame.fill_text(canvas::Text {
                content: label.text.clone(),
                position: Point::new(label.position.0, label.position.1),
                color: label.color.to_color(),
                size: LABEL_SIZE.into(),
                horizontal_alignment: match label.anchor {
                    Anchor::Start => alignment::Horizontal::Left,
                    Anchor::Middle => alignment::Horizontal::Center,
                    Anchor::End => alignment::Horizontal::Right,
                },
                vertical_alignment: alignment::Vertical::Center,
                ..canvas::Text::default()
            });
        }

        vec![frame.into_geometry()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Paint;

    fn dataset(label: &str, values: &[f64], color: &str) -> Dataset {
        Dataset {
            label: label.to_string(),
            values: values.to_vec(),
            fill_color: Some(Paint::One(color.to_string())),
            stroke_color: None,
        }
    }

    fn bar_chart() -> ChartView {
        ChartView::new(Chart {
            kind: ChartKind::Bar,
            labels: vec!["2022".into(), "2023".into(), "2024".into()],
            datasets: vec![
                dataset("LS Cable", &[4.8, 5.2, 5.9], "#ff0000"),
                dataset("MnM", &[1.9, 2.1, 2.4], "#0000ff"),
            ],
        })
    }

    fn bars_with(scene: &Scene, color: Rgba) -> usize {
        scene
            .shapes
            .iter()
            .filter(|s| matches!(s, Shape::Rect { color: c, height, .. } if *c == color && *height > SWATCH))
            .count()
    }

    #[test]
    fn parses_css_colors() {
        assert_eq!(parse_color("#f00"), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(parse_color("#3B82F6"), Some(Rgba::rgb(0x3b, 0x82, 0xf6)));
        assert_eq!(parse_color("#00000080"), Some(Rgba([0, 0, 0, 0x80])));
        assert_eq!(
            parse_color("rgba(54, 162, 235, 0.5)"),
            Some(Rgba([54, 162, 235, 128]))
        );
        assert_eq!(parse_color("rgb(1,2,3)"), Some(Rgba::rgb(1, 2, 3)));
        assert_eq!(parse_color(" Red "), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(parse_color("hsl(0, 100%, 50%)"), None);
        assert_eq!(parse_color("#12"), None);
    }

    #[test]
    fn bar_scene_has_one_bar_per_point() {
        let scene = bar_chart().scene(800.0, 400.0, Rgba::INK);
        assert_eq!(bars_with(&scene, Rgba::rgb(255, 0, 0)), 3);
        assert_eq!(bars_with(&scene, Rgba::rgb(0, 0, 255)), 3);
        assert_eq!(scene.legend.len(), 2);
    }

    #[test]
    fn toggling_a_dataset_hides_and_restores_it() {
        let mut chart = bar_chart();
        chart.toggle_dataset(0);
        assert!(chart.is_hidden(0));
        let scene = chart.scene(800.0, 400.0, Rgba::INK);
        assert_eq!(bars_with(&scene, Rgba::rgb(255, 0, 0)), 0);
        assert_eq!(bars_with(&scene, Rgba::rgb(0, 0, 255)), 3);
        // Legend keeps the hidden entry so it can be clicked back on.
        assert_eq!(scene.legend.len(), 2);

        chart.toggle_dataset(0);
        assert!(!chart.is_hidden(0));
        assert_eq!(chart.scene(800.0, 400.0, Rgba::INK), bar_chart().scene(800.0, 400.0, Rgba::INK));
    }

    #[test]
    fn toggling_unknown_dataset_is_ignored() {
        let mut chart = bar_chart();
        chart.toggle_dataset(7);
        assert!(!chart.is_hidden(7));
    }

    #[test]
    fn legend_hit_finds_entry() {
        let scene = bar_chart().scene(800.0, 400.0, Rgba::INK);
        let second = scene.legend[1];
        assert_eq!(scene.legend_hit(second.x + 1.0, second.y + 1.0), Some(1));
        assert_eq!(scene.legend_hit(790.0, 390.0), None);
    }

    #[test]
    fn line_scene_draws_one_polyline_per_visible_dataset() {
        let mut chart = bar_chart();
        chart.chart.kind = ChartKind::Line;
        let count = |scene: &Scene| {
            scene
                .shapes
                .iter()
                .filter(|s| matches!(s, Shape::Polyline { width, .. } if *width == 2.0))
                .count()
        };
        assert_eq!(count(&chart.scene(800.0, 400.0, Rgba::INK)), 2);
        chart.toggle_dataset(1);
        assert_eq!(count(&chart.scene(800.0, 400.0, Rgba::INK)), 1);
    }

    #[test]
    fn pie_slices_follow_values() {
        let chart = ChartView::new(Chart {
            kind: ChartKind::Pie,
            labels: vec!["A".into(), "B".into(), "C".into()],
            datasets: vec![Dataset {
                label: "share".into(),
                values: vec![1.0, 0.0, 3.0],
                fill_color: None,
                stroke_color: None,
            }],
        });
        let scene = chart.scene(600.0, 400.0, Rgba::INK);
        let wedges = scene
            .shapes
            .iter()
            .filter(|s| matches!(s, Shape::Polygon { .. }))
            .count();
        assert_eq!(wedges, 2);
    }

    #[test]
    fn pie_with_zero_total_draws_nothing() {
        let chart = ChartView::new(Chart {
            kind: ChartKind::Pie,
            labels: vec!["A".into()],
            datasets: vec![dataset("x", &[0.0], "#123456")],
        });
        let scene = chart.scene(600.0, 400.0, Rgba::INK);
        assert!(!scene.shapes.iter().any(|s| matches!(s, Shape::Polygon { .. })));
    }

    #[test]
    fn export_png_leaves_hidden_dataset_out() {
        let mut chart = bar_chart();
        chart.toggle_dataset(0);
        let png = chart.export_png(400, 240).unwrap();
        let image = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (400, 240));
        assert!(!image.pixels().any(|p| p.0 == [255, 0, 0, 255]));
        assert!(image.pixels().any(|p| p.0 == [0, 0, 255, 255]));

        // The visible dataset's legend name is drawn in ink next to its swatch.
        let entry = chart.scene(400.0, 240.0, Rgba::INK).legend[1];
        let text_left = (entry.x + SWATCH + 6.0) as u32;
        let text_right = (entry.x + entry.width) as u32;
        let inked = (entry.y as u32..(entry.y + entry.height) as u32)
            .flat_map(|y| (text_left..text_right).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                let [r, g, b, _] = image.get_pixel(x, y).0;
                r < 200 && r <= g && g <= b && b < 255
            })
            .count();
        assert!(inked > 0);
    }

    #[test]
    fn tick_labels_are_compact() {
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_tick(2.5), "2.5");
        assert_eq!(format_tick(1.25), "1.25");
        assert_eq!(format_tick(5_200_000_000.0), "5.2B");
        assert_eq!(format_tick(12_000.0), "12.0k");
    }
}
