use std::cmp::Ordering;

use iced::widget::{button, column, container, row, scrollable, text, Column, Row};
use iced::{alignment, Background, Border, Element, Font, Length};

use crate::content::{Cell, Table};
use crate::theme::Palette;
use crate::{Message, ViewId};

pub const CSV_FILE_NAME: &str = "data.csv";

const CELL_WIDTH: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Interactive view over a [`Table`]. Owns its displayed row order; the
/// source rows are kept untouched.
#[derive(Debug, Clone)]
pub struct TableView {
    table: Table,
    displayed: Vec<Vec<Cell>>,
    sort: Option<(usize, SortDirection)>,
}

impl TableView {
    pub fn new(table: Table) -> Self {
        let displayed = table.rows.clone();
        TableView {
            table,
            displayed,
            sort: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.table.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.displayed
    }

    pub fn sort(&self) -> Option<(usize, SortDirection)> {
        self.sort
    }

    /// Sorts the displayed rows by `column`. Works from the order currently
    /// on screen, so earlier sorts decide how ties fall.
    pub fn sort_by(&mut self, column: usize) {
        match self.sort {
            Some((current, SortDirection::Ascending)) if current == column => {
                // Same column again: exact reversal of what is shown.
                self.displayed.reverse();
                self.sort = Some((column, SortDirection::Descending));
            }
            _ => {
                let rows = std::mem::take(&mut self.displayed);
                self.displayed = merge_sort(rows, &mut |a: &Vec<Cell>, b: &Vec<Cell>| {
                    compare_cells(a.get(column), b.get(column))
                });
                self.sort = Some((column, SortDirection::Ascending));
            }
        }
    }

    /// Comma-joined header plus displayed rows. Cells are not quoted.
    pub fn export_csv(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows().len() + 1);
        lines.push(self.columns().join(","));
        for row in self.rows() {
            lines.push(
                row.iter()
                    .map(|cell| cell.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }
        lines.join("\n")
    }

    pub fn view(&self, id: ViewId, palette: Palette) -> Element<'_, Message> {
        let toolbar = row![
            text("Data Table").size(12).color(palette.muted),
            iced::widget::horizontal_space(),
            button(text("Download CSV").size(12))
                .style(button::text)
                .padding([4, 8])
                .on_press(Message::ExportCsv(id)),
        ]
        .align_y(alignment::Vertical::Center)
        .padding([4, 8]);

        let header = self
            .columns()
            .iter()
            .enumerate()
            .fold(Row::new(), |header, (index, name)| {
                let marker = match self.sort() {
                    Some((column, SortDirection::Ascending)) if column == index => "▲",
                    Some((column, SortDirection::Descending)) if column == index => "▼",
                    _ => "↕",
                };
                header.push(
                    button(
                        row![
                            text(name.as_str())
                                .size(13)
                                .font(Font {
                                    weight: iced::font::Weight::Semibold,
                                    ..Font::DEFAULT
                                })
                                .color(palette.text),
                            text(marker).size(11).color(palette.muted),
                        ]
                        .spacing(6),
                    )
                    .style(button::text)
                    .width(Length::Fixed(CELL_WIDTH))
                    .padding([8, 12])
                    .on_press(Message::SortTable { view: id, column: index }),
                )
            });

        let column_count = self.columns().len();
        let body = self
            .rows()
            .iter()
            .enumerate()
            .fold(Column::new(), |body, (row_index, cells)| {
                let line = (0..column_count).fold(Row::new(), |line, index| {
                    let value = cells.get(index).map(Cell::to_string).unwrap_or_default();
                    line.push(
                        container(text(value).size(13).color(palette.text))
                            .width(Length::Fixed(CELL_WIDTH))
                            .padding([8, 12]),
                    )
                });
                let stripe = if row_index % 2 == 1 {
                    Some(Background::Color(palette.code_bg))
                } else {
                    None
                };
                body.push(container(line).style(move |_theme| container::Style {
                    background: stripe,
                    ..container::Style::default()
                }))
            });

        let grid = scrollable(column![header, body]).direction(scrollable::Direction::Horizontal(
            scrollable::Scrollbar::new(),
        ));

        container(column![toolbar, grid])
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

/// Numeric cells compare numerically; anything else compares as text.
pub fn compare_cells(a: Option<&Cell>, b: Option<&Cell>) -> Ordering {
    if let (Some(x), Some(y)) = (a.and_then(Cell::as_number), b.and_then(Cell::as_number)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    let a = a.map(Cell::to_string).unwrap_or_default();
    let b = b.map(Cell::to_string).unwrap_or_default();
    locale_compare(&a, &b)
}

/// Stable top-down merge sort. Mixed number/text columns make the cell
/// comparison non-transitive, which `slice::sort_by` may panic on; this
/// always finishes and always returns a permutation of its input.
fn merge_sort<T, F>(mut items: Vec<T>, compare: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare);
    let right = merge_sort(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }
    merged
}

/// Case-insensitive first, then exact, so `apple` sorts before `Banana`.
fn locale_compare(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}
