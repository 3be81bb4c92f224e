use std::ops::Range;

use iced::widget::{column, container, rich_text, row, span, text, Column, Row};
use iced::widget::text::Span;
use iced::{Border, Element, Font, Length};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};

use crate::theme::Palette;
use crate::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineStyle {
    Plain,
    Strong,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inline {
    pub text: String,
    pub style: InlineStyle,
}

impl Inline {
    fn new(text: impl Into<String>, style: InlineStyle) -> Self {
        Inline {
            text: text.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, inlines: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    Quote(Vec<Block>),
    Table { header: Vec<String>, rows: Vec<Vec<String>> },
    /// Source text of a construct outside the supported subset.
    Literal(String),
}

/// Parses markdown into the supported block subset. Tables are only
/// recognized when `tables` is set; otherwise their source stays as text.
pub fn parse(source: &str, tables: bool) -> Vec<Block> {
    let mut options = Options::empty();
    if tables {
        options.insert(Options::ENABLE_TABLES);
    }
    let mut reader = Reader {
        source,
        events: Parser::new_ext(source, options).into_offset_iter(),
        tables,
    };
    reader.blocks()
}

struct Reader<'s, I> {
    source: &'s str,
    events: I,
    tables: bool,
}

impl<'s, I> Reader<'s, I>
where
    I: Iterator<Item = (Event<'s>, Range<usize>)>,
{
    /// Reads blocks until the end of the enclosing container.
    fn blocks(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        // Tight list items carry inline events without a paragraph.
        let mut loose: Vec<Inline> = Vec::new();

        while let Some((event, range)) = self.events.next() {
            match event {
                Event::End(_) => break,
                Event::Start(tag) => match tag {
                    Tag::Paragraph => {
                        flush(&mut loose, &mut blocks);
                        let inlines = self.inlines();
                        blocks.push(Block::Paragraph(inlines));
                    }
                    Tag::Heading(level @ (HeadingLevel::H3 | HeadingLevel::H4), _, _) => {
                        flush(&mut loose, &mut blocks);
                        let inlines = self.inlines();
                        let level = if level == HeadingLevel::H3 { 3 } else { 4 };
                        blocks.push(Block::Heading { level, inlines });
                    }
                    Tag::List(start) => {
                        flush(&mut loose, &mut blocks);
                        let items = self.list_items();
                        blocks.push(Block::List { start, items });
                    }
                    Tag::BlockQuote => {
                        flush(&mut loose, &mut blocks);
                        let inner = self.blocks();
                        blocks.push(Block::Quote(inner));
                    }
                    Tag::Table(_) if self.tables => {
                        flush(&mut loose, &mut blocks);
                        let table = self.table();
                        blocks.push(table);
                    }
                    Tag::Strong => {
                        let strong = self.strong();
                        loose.extend(strong);
                    }
                    Tag::Emphasis | Tag::Strikethrough | Tag::Link(..) | Tag::Image(..) => {
                        self.skip();
                        loose.push(Inline::new(self.literal(&range), InlineStyle::Plain));
                    }
                    _ => {
                        flush(&mut loose, &mut blocks);
                        self.skip();
                        blocks.push(Block::Literal(self.literal(&range)));
                    }
                },
                Event::Text(t) => loose.push(Inline::new(t.to_string(), InlineStyle::Plain)),
                Event::Code(c) => loose.push(Inline::new(c.to_string(), InlineStyle::Code)),
                Event::SoftBreak => loose.push(Inline::new(" ", InlineStyle::Plain)),
                Event::HardBreak => loose.push(Inline::new("\n", InlineStyle::Plain)),
                _ => {
                    flush(&mut loose, &mut blocks);
                    let literal = self.literal(&range);
                    if !literal.is_empty() {
                        blocks.push(Block::Literal(literal));
                    }
                }
            }
        }

        flush(&mut loose, &mut blocks);
        blocks
    }

    fn inlines(&mut self) -> Vec<Inline> {
        let mut out = Vec::new();
        while let Some((event, range)) = self.events.next() {
            match event {
                Event::End(_) => break,
                Event::Text(t) => out.push(Inline::new(t.to_string(), InlineStyle::Plain)),
                Event::Code(c) => out.push(Inline::new(c.to_string(), InlineStyle::Code)),
                Event::SoftBreak => out.push(Inline::new(" ", InlineStyle::Plain)),
                Event::HardBreak => out.push(Inline::new("\n", InlineStyle::Plain)),
                Event::Start(Tag::Strong) => out.extend(self.strong()),
                Event::Start(_) => {
                    self.skip();
                    out.push(Inline::new(self.literal(&range), InlineStyle::Plain));
                }
                _ => out.push(Inline::new(self.literal(&range), InlineStyle::Plain)),
            }
        }
        out
    }

    fn strong(&mut self) -> Vec<Inline> {
        let mut out = Vec::new();
        while let Some((event, range)) = self.events.next() {
            match event {
                Event::End(_) => break,
                Event::Text(t) => out.push(Inline::new(t.to_string(), InlineStyle::Strong)),
                Event::Code(c) => out.push(Inline::new(c.to_string(), InlineStyle::Code)),
                Event::SoftBreak => out.push(Inline::new(" ", InlineStyle::Strong)),
                Event::Start(_) => {
                    self.skip();
                    out.push(Inline::new(self.literal(&range), InlineStyle::Strong));
                }
                _ => out.push(Inline::new(self.literal(&range), InlineStyle::Strong)),
            }
        }
        out
    }

    fn list_items(&mut self) -> Vec<Vec<Block>> {
        let mut items = Vec::new();
        while let Some((event, _)) = self.events.next() {
            match event {
                Event::Start(Tag::Item) => items.push(self.blocks()),
                Event::Start(_) => self.skip(),
                Event::End(_) => break,
                _ => {}
            }
        }
        items
    }

    fn table(&mut self) -> Block {
        let mut header = Vec::new();
        let mut rows = Vec::new();
        while let Some((event, _)) = self.events.next() {
            match event {
                Event::Start(Tag::TableHead) => header = self.table_cells(),
                Event::Start(Tag::TableRow) => rows.push(self.table_cells()),
                Event::Start(_) => self.skip(),
                Event::End(_) => break,
                _ => {}
            }
        }
        Block::Table { header, rows }
    }

    fn table_cells(&mut self) -> Vec<String> {
        let mut cells = Vec::new();
        while let Some((event, _)) = self.events.next() {
            match event {
                Event::Start(Tag::TableCell) => {
                    let inlines = self.inlines();
                    cells.push(inlines.into_iter().map(|i| i.text).collect());
                }
                Event::Start(_) => self.skip(),
                Event::End(_) => break,
                _ => {}
            }
        }
        cells
    }

    /// Consumes events up to the end matching an already-read start.
    fn skip(&mut self) {
        let mut depth = 1usize;
        for (event, _) in self.events.by_ref() {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    fn literal(&self, range: &Range<usize>) -> String {
        self.source
            .get(range.clone())
            .unwrap_or_default()
            .trim_end()
            .to_string()
    }
}

fn flush(loose: &mut Vec<Inline>, blocks: &mut Vec<Block>) {
    if !loose.is_empty() {
        blocks.push(Block::Paragraph(std::mem::take(loose)));
    }
}

pub fn view<'a>(blocks: &'a [Block], palette: Palette) -> Element<'a, Message> {
    blocks
        .iter()
        .fold(Column::new().spacing(8), |col, block| {
            col.push(block_view(block, palette))
        })
        .into()
}

fn block_view<'a>(block: &'a Block, palette: Palette) -> Element<'a, Message> {
    match block {
        Block::Heading { level, inlines } => {
            let size = if *level == 3 { 17 } else { 15 };
            let spans: Vec<Span<'a, Message>> = inlines
                .iter()
                .map(|inline| {
                    span(inline.text.as_str())
                        .font(Font {
                            weight: iced::font::Weight::Bold,
                            ..Font::DEFAULT
                        })
                        .color(palette.text)
                })
                .collect();
            rich_text(spans).size(size).into()
        }
        Block::Paragraph(inlines) => paragraph(inlines, palette),
        Block::List { start, items } => items
            .iter()
            .enumerate()
            .fold(Column::new().spacing(4), |col, (index, item)| {
                let marker = match start {
                    Some(first) => format!("{}.", first + index as u64),
                    None => "•".to_string(),
                };
                col.push(
                    row![
                        text(marker).size(14).color(palette.muted),
                        view(item, palette),
                    ]
                    .spacing(8),
                )
            })
            .into(),
        Block::Quote(inner) => container(view(inner, palette))
            .padding([4, 12])
            .style(move |_theme| container::Style {
                border: Border {
                    color: palette.border,
                    width: 0.0,
                    radius: 0.0.into(),
                },
                background: Some(palette.code_bg.into()),
                ..container::Style::default()
            })
            .width(Length::Fill)
            .into(),
        Block::Table { header, rows } => {
            let cell = |value: &'a str, bold: bool| -> Element<'a, Message> {
                let font = if bold {
                    Font {
                        weight: iced::font::Weight::Semibold,
                        ..Font::DEFAULT
                    }
                } else {
                    Font::DEFAULT
                };
                container(text(value).size(13).font(font).color(palette.text))
                    .width(Length::Fixed(140.0))
                    .padding([4, 8])
                    .into()
            };
            let head = header
                .iter()
                .fold(Row::new(), |line, value| line.push(cell(value.as_str(), true)));
            let body = rows.iter().fold(Column::new(), |col, values| {
                col.push(
                    values
                        .iter()
                        .fold(Row::new(), |line, value| line.push(cell(value.as_str(), false))),
                )
            });
            container(column![head, body])
                .style(move |_theme| container::Style {
                    border: Border {
                        color: palette.border,
                        width: 1.0,
                        radius: 4.0.into(),
                    },
                    ..container::Style::default()
                })
                .into()
        }
        Block::Literal(source) => text(source.as_str()).size(14).color(palette.text).into(),
    }
}

fn paragraph<'a>(inlines: &'a [Inline], palette: Palette) -> Element<'a, Message> {
    let spans: Vec<Span<'a, Message>> = inlines
        .iter()
        .map(|inline| match inline.style {
            InlineStyle::Plain => span(inline.text.as_str()).color(palette.text),
            InlineStyle::Strong => span(inline.text.as_str())
                .font(Font {
                    weight: iced::font::Weight::Semibold,
                    ..Font::DEFAULT
                })
                .color(palette.text),
            InlineStyle::Code => span(inline.text.as_str())
                .font(Font::MONOSPACE)
                .color(palette.accent),
        })
        .collect();
    rich_text(spans).size(14).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> Inline {
        Inline::new(s, InlineStyle::Plain)
    }

    #[test]
    fn headings_three_and_four_with_inline_styles() {
        let blocks = parse("### Revenue\n\nGrew **8.3%** in `2023`.", false);
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 3,
                    inlines: vec![plain("Revenue")]
                },
                Block::Paragraph(vec![
                    plain("Grew "),
                    Inline::new("8.3%", InlineStyle::Strong),
                    plain(" in "),
                    Inline::new("2023", InlineStyle::Code),
                    plain("."),
                ]),
            ]
        );
    }

    #[test]
    fn unsupported_heading_levels_render_literally() {
        assert_eq!(parse("# Title", false), vec![Block::Literal("# Title".to_string())]);
        assert_eq!(
            parse("###### Deep", false),
            vec![Block::Literal("###### Deep".to_string())]
        );
    }

    #[test]
    fn tight_and_ordered_lists() {
        let blocks = parse("1. first\n2. **second**", false);
        assert_eq!(
            blocks,
            vec![Block::List {
                start: Some(1),
                items: vec![
                    vec![Block::Paragraph(vec![plain("first")])],
                    vec![Block::Paragraph(vec![Inline::new("second", InlineStyle::Strong)])],
                ]
            }]
        );
    }

    #[test]
    fn nested_unordered_list() {
        let blocks = parse("- a\n  - b", false);
        let Block::List { start: None, items } = &blocks[0] else {
            panic!("expected list, got {:?}", blocks);
        };
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0][1], Block::List { start: None, .. }));
    }

    #[test]
    fn blockquote_wraps_paragraph() {
        assert_eq!(
            parse("> note this", false),
            vec![Block::Quote(vec![Block::Paragraph(vec![plain("note this")])])]
        );
    }

    #[test]
    fn emphasis_and_links_keep_source_text() {
        let blocks = parse("see *this* and [docs](http://x)", false);
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![
                plain("see "),
                plain("*this*"),
                plain(" and "),
                plain("[docs](http://x)"),
            ])]
        );
    }

    #[test]
    fn code_block_is_literal() {
        let blocks = parse("```\nlet x = 1;\n```", false);
        assert_eq!(blocks, vec![Block::Literal("```\nlet x = 1;\n```".to_string())]);
    }

    #[test]
    fn tables_only_when_enabled() {
        let source = "| A | B |\n|---|---|\n| 1 | 2 |";
        assert_eq!(
            parse(source, true),
            vec![Block::Table {
                header: vec!["A".into(), "B".into()],
                rows: vec![vec!["1".into(), "2".into()]],
            }]
        );

        let blocks = parse(source, false);
        let Block::Paragraph(inlines) = &blocks[0] else {
            panic!("expected paragraph, got {:?}", blocks);
        };
        let flat: String = inlines.iter().map(|i| i.text.as_str()).collect();
        assert!(flat.contains("| A | B |"));
        assert!(flat.contains("| 1 | 2 |"));
    }
}
