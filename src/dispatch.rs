use base64::Engine;
use iced::widget::{container, image, text};
use iced::{Border, Element, Length};

use crate::chart::ChartView;
use crate::content::{ContentVariant, TextKind};
use crate::markdown::{self, Block};
use crate::table::TableView;
use crate::theme::Palette;
use crate::{Message, ViewId};

#[derive(Debug, Clone)]
pub struct TextView {
    pub kind: TextKind,
    pub blocks: Vec<Block>,
}

impl TextView {
    pub fn new(kind: TextKind, body: &str) -> Self {
        TextView {
            kind,
            blocks: markdown::parse(body, kind == TextKind::Plain),
        }
    }

    pub fn view(&self, palette: Palette) -> Element<'_, Message> {
        let body = markdown::view(&self.blocks, palette);
        let accent = match self.kind {
            TextKind::Insight => Some((palette.info_bg, palette.info_border)),
            TextKind::Notice => Some((palette.warning_bg, palette.warning_border)),
            TextKind::Summary | TextKind::Plain => None,
        };
        match accent {
            Some((background, border)) => container(body)
                .padding([12, 16])
                .width(Length::Fill)
                .style(move |_theme| container::Style {
                    background: Some(background.into()),
                    border: Border {
                        color: border,
                        width: 1.0,
                        radius: 4.0.into(),
                    },
                    ..container::Style::default()
                })
                .into(),
            None => body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageView {
    handle: Option<image::Handle>,
}

impl ImageView {
    pub fn new(base64: &str) -> Self {
        let handle = match base64::engine::general_purpose::STANDARD.decode(base64.trim()) {
            Ok(bytes) => Some(image::Handle::from_bytes(bytes)),
            Err(e) => {
                tracing::warn!("image payload is not valid base64: {}", e);
                None
            }
        };
        ImageView { handle }
    }

    #[cfg(test)]
    fn is_decoded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn view(&self, palette: Palette) -> Element<'_, Message> {
        match &self.handle {
            Some(handle) => image(handle.clone()).width(Length::Fill).into(),
            None => text("[image could not be decoded]")
                .size(13)
                .color(palette.muted)
                .into(),
        }
    }
}

/// Rendered form of one content variant, holding its local view state.
#[derive(Debug, Clone)]
pub enum ContentView {
    Text(TextView),
    Table(TableView),
    Chart(ChartView),
    Image(ImageView),
}

impl ContentView {
    pub fn view(&self, id: ViewId, palette: Palette) -> Element<'_, Message> {
        match self {
            ContentView::Text(view) => view.view(palette),
            ContentView::Table(view) => view.view(id, palette),
            ContentView::Chart(view) => view.view(id, palette),
            ContentView::Image(view) => view.view(palette),
        }
    }
}

/// One view per recognized variant, in input order.
pub fn render_message_content(content: &[ContentVariant]) -> Vec<ContentView> {
    content.iter().filter_map(render_variant).collect()
}

fn render_variant(variant: &ContentVariant) -> Option<ContentView> {
    match variant {
        ContentVariant::Text { kind, body } => Some(ContentView::Text(TextView::new(*kind, body))),
        ContentVariant::Table(table) => Some(ContentView::Table(TableView::new(table.clone()))),
        ContentVariant::Chart(chart) => Some(ContentView::Chart(ChartView::new(chart.clone()))),
        ContentVariant::Image { base64 } => Some(ContentView::Image(ImageView::new(base64))),
        ContentVariant::Unrecognized { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Cell, ChatMessage, Table};
    use serde_json::json;

    fn kinds(views: &[ContentView]) -> Vec<&'static str> {
        views
            .iter()
            .map(|v| match v {
                ContentView::Text(_) => "text",
                ContentView::Table(_) => "table",
                ContentView::Chart(_) => "chart",
                ContentView::Image(_) => "image",
            })
            .collect()
    }

    #[test]
    fn unknown_variant_between_valid_ones_is_skipped() {
        let message: ChatMessage = serde_json::from_value(json!({
            "id": "msg-agent-7",
            "author": "agent",
            "timestamp": "2024-05-01T09:00:00Z",
            "content": [
                {"type": "summary", "content": "Revenue overview"},
                {"type": "foo", "content": {"anything": true}},
                {"type": "table", "content": {"columns": ["A"], "rows": [[1]]}}
            ]
        }))
        .unwrap();

        let views = render_message_content(&message.content);
        assert_eq!(kinds(&views), vec!["text", "table"]);
    }

    #[test]
    fn one_view_per_variant_in_order() {
        let content = vec![
            ContentVariant::Table(Table {
                columns: vec!["A".into()],
                rows: vec![vec![Cell::Number(1.0)]],
            }),
            ContentVariant::Image {
                base64: "aGVsbG8=".into(),
            },
            ContentVariant::Text {
                kind: TextKind::Notice,
                body: "heads up".into(),
            },
            ContentVariant::Unrecognized { tag: "x".into() },
        ];
        let views = render_message_content(&content);
        assert!(views.len() <= content.len());
        assert_eq!(kinds(&views), vec!["table", "image", "text"]);
    }

    #[test]
    fn empty_content_renders_nothing() {
        assert!(render_message_content(&[]).is_empty());
    }

    #[test]
    fn plain_text_parses_tables_but_styled_kinds_do_not() {
        let source = "| A |\n|---|\n| 1 |";
        let plain = TextView::new(TextKind::Plain, source);
        assert!(matches!(plain.blocks[0], Block::Table { .. }));
        let insight = TextView::new(TextKind::Insight, source);
        assert!(matches!(insight.blocks[0], Block::Paragraph(_)));
    }

    #[test]
    fn invalid_base64_image_still_renders_a_view() {
        assert!(ImageView::new("aGVsbG8=").is_decoded());
        assert!(!ImageView::new("not base64!!").is_decoded());
    }
}
