use std::collections::BTreeSet;

use iced::widget::{button, column, container, row, text, Column};
use iced::{Element, Length};
use serde::Deserialize;
use serde_json::Value;

use crate::theme::Palette;
use crate::Message;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KnowledgeMenu {
    #[serde(deserialize_with = "lenient_categories")]
    pub menu: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    #[serde(rename = "category")]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Leaf {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CicGroup {
    pub name: String,
    #[serde(default)]
    pub segments: Vec<Leaf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuItem {
    Leaf(Leaf),
    Subcategory {
        name: String,
        children: Vec<Leaf>,
    },
    SegmentCompany {
        id: String,
        name: String,
        cics: Vec<CicGroup>,
        segments: Vec<Leaf>,
    },
}

#[derive(Deserialize)]
struct RawSubcategory {
    name: String,
    sub_items: Vec<Leaf>,
}

#[derive(Deserialize)]
struct RawSegmentCompany {
    id: String,
    name: String,
    #[serde(default)]
    cics: Vec<CicGroup>,
    #[serde(default)]
    segments: Vec<Leaf>,
}

impl MenuItem {
    /// Picks the item shape from the keys present. Returns `None` for items
    /// that fit no shape.
    pub fn from_value(value: Value) -> Option<Self> {
        let object = value.as_object()?;
        let decoded = if object.contains_key("sub_items") {
            serde_json::from_value::<RawSubcategory>(value).map(|raw| MenuItem::Subcategory {
                name: raw.name,
                children: raw.sub_items,
            })
        } else if object.contains_key("cics") || object.contains_key("segments") {
            serde_json::from_value::<RawSegmentCompany>(value).map(|raw| MenuItem::SegmentCompany {
                id: raw.id,
                name: raw.name,
                cics: raw.cics,
                segments: raw.segments,
            })
        } else {
            serde_json::from_value::<Leaf>(value).map(MenuItem::Leaf)
        };
        match decoded {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("skipping malformed knowledge menu item: {}", e);
                None
            }
        }
    }
}

fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<MenuItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values.into_iter().filter_map(MenuItem::from_value).collect())
}

fn lenient_categories<'de, D>(deserializer: D) -> Result<Vec<Category>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Category>(value) {
            Ok(category) => Some(category),
            Err(e) => {
                tracing::warn!("skipping malformed knowledge menu category: {}", e);
                None
            }
        })
        .collect())
}

/// Knowledge menu as the sidebar sees it. A failed fetch stays `Loading`.
#[derive(Debug, Clone, Default)]
pub enum MenuLoad {
    #[default]
    Loading,
    Ready(KnowledgeMenu),
}

/// Expanded nodes of the menu tree. Transitions return a new state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuState {
    expanded: BTreeSet<String>,
}

impl MenuState {
    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.contains(key)
    }

    pub fn toggled(&self, key: &str) -> Self {
        let mut expanded = self.expanded.clone();
        if !expanded.remove(key) {
            expanded.insert(key.to_string());
        }
        MenuState { expanded }
    }
}

pub fn node_key(path: &[&str]) -> String {
    path.join("/")
}

pub fn view<'a>(load: &'a MenuLoad, state: &'a MenuState, palette: Palette) -> Element<'a, Message> {
    let menu = match load {
        MenuLoad::Loading => {
            return container(text("Loading knowledge base...").size(13).color(palette.muted))
                .padding(16)
                .into();
        }
        MenuLoad::Ready(menu) => menu,
    };

    let categories = menu.menu.iter().fold(Column::new().spacing(4), |col, category| {
        let key = node_key(&[category.name.as_str()]);
        let open = state.is_expanded(&key);
        let header = toggle_row(
            format!("{} {}", icon(&category.kind), category.name),
            key.clone(),
            open,
            14,
            palette,
        );
        let mut section = column![header];
        if open {
            let items = category.items.iter().fold(Column::new().spacing(2), |col, item| {
                col.push(item_view(&category.name, item, state, palette))
            });
            section = section.push(container(items).padding(iced::Padding {
                left: 20.0,
                ..iced::Padding::ZERO
            }));
        }
        col.push(section)
    });

    container(categories).padding(12).width(Length::Fill).into()
}

fn item_view<'a>(
    category: &str,
    item: &'a MenuItem,
    state: &MenuState,
    palette: Palette,
) -> Element<'a, Message> {
    match item {
        MenuItem::Leaf(leaf) => leaf_view(leaf, palette),
        MenuItem::Subcategory { name, children } => {
            let key = node_key(&[category, name.as_str()]);
            let open = state.is_expanded(&key);
            let mut section = column![toggle_row(name.clone(), key, open, 13, palette)];
            if open {
                section = section.push(indent(leaves(children, palette)));
            }
            section.into()
        }
        MenuItem::SegmentCompany {
            id,
            name,
            cics,
            segments,
        } => {
            let key = node_key(&[category, id.as_str()]);
            let open = state.is_expanded(&key);
            let mut section = column![toggle_row(name.clone(), key, open, 13, palette)];
            if open {
                let mut body = Column::new().spacing(2);
                for cic in cics {
                    let cic_key = node_key(&[category, id.as_str(), cic.name.as_str()]);
                    let cic_open = state.is_expanded(&cic_key);
                    body = body.push(toggle_row(cic.name.clone(), cic_key, cic_open, 12, palette));
                    if cic_open {
                        body = body.push(indent(leaves(&cic.segments, palette)));
                    }
                }
                body = body.push(leaves(segments, palette));
                section = section.push(indent(body.into()));
            }
            section.into()
        }
    }
}

fn toggle_row<'a>(
    label: String,
    key: String,
    open: bool,
    size: u16,
    palette: Palette,
) -> Element<'a, Message> {
    let chevron = if open { "▾" } else { "▸" };
    button(
        row![
            text(chevron).size(size).color(palette.muted),
            text(label).size(size).color(palette.text),
        ]
        .spacing(8),
    )
    .style(button::text)
    .width(Length::Fill)
    .padding([4, 8])
    .on_press(Message::ToggleMenuNode(key))
    .into()
}

fn leaves<'a>(items: &'a [Leaf], palette: Palette) -> Element<'a, Message> {
    items
        .iter()
        .fold(Column::new().spacing(2), |col, leaf| col.push(leaf_view(leaf, palette)))
        .into()
}

fn leaf_view<'a>(leaf: &'a Leaf, palette: Palette) -> Element<'a, Message> {
    container(text(leaf.name.as_str()).size(12).color(palette.muted))
        .padding([3, 8])
        .into()
}

fn indent(content: Element<'_, Message>) -> Element<'_, Message> {
    container(content)
        .padding(iced::Padding {
            left: 16.0,
            ..iced::Padding::ZERO
        })
        .into()
}

fn icon(kind: &str) -> &'static str {
    match kind {
        "company" => "🏢",
        "account" => "📄",
        "segment" => "📊",
        _ => "•",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_all_item_shapes() {
        let menu: KnowledgeMenu = serde_json::from_value(json!({
            "menu": [
                {"category": "Companies", "type": "company", "items": [
                    {"id": "E1", "name": "E1"}
                ]},
                {"category": "Accounts", "type": "account", "items": [
                    {"name": "Income Statement", "sub_items": [
                        {"id": "revenue", "name": "Revenue"}
                    ]}
                ]},
                {"category": "Business", "type": "segment", "items": [
                    {"id": "ELECTRIC", "name": "LS ELECTRIC",
                     "cics": [{"name": "Power CIC", "segments": [{"id": "p1", "name": "Transformers"}]}],
                     "segments": [{"id": "d1", "name": "Direct line"}]}
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(menu.menu.len(), 3);
        assert_eq!(
            menu.menu[0].items[0],
            MenuItem::Leaf(Leaf {
                id: "E1".into(),
                name: "E1".into()
            })
        );
        assert!(matches!(
            &menu.menu[1].items[0],
            MenuItem::Subcategory { children, .. } if children.len() == 1
        ));
        let MenuItem::SegmentCompany { cics, segments, .. } = &menu.menu[2].items[0] else {
            panic!("expected segment company");
        };
        assert_eq!(cics[0].segments[0].name, "Transformers");
        assert_eq!(segments[0].id, "d1");
    }

    #[test]
    fn segment_company_with_only_direct_segments() {
        let item = MenuItem::from_value(json!({
            "id": "MnM", "name": "LS MnM", "segments": []
        }))
        .unwrap();
        assert!(matches!(item, MenuItem::SegmentCompany { ref cics, .. } if cics.is_empty()));
    }

    #[test]
    fn malformed_items_are_skipped() {
        let category: Category = serde_json::from_value(json!({
            "category": "Companies",
            "type": "company",
            "items": [
                {"id": "E1", "name": "E1"},
                {"name": "missing id"},
                {"name": "bad", "sub_items": "nope"},
                42,
                {"id": "I&D", "name": "LS I&D"}
            ]
        }))
        .unwrap();
        let names: Vec<&str> = category
            .items
            .iter()
            .map(|item| match item {
                MenuItem::Leaf(leaf) => leaf.name.as_str(),
                _ => "?",
            })
            .collect();
        assert_eq!(names, vec!["E1", "LS I&D"]);
    }

    #[test]
    fn malformed_category_does_not_sink_the_menu() {
        let menu: KnowledgeMenu = serde_json::from_value(json!({
            "menu": [
                {"type": "company", "items": [{"id": "E1", "name": "E1"}]},
                "not a category",
                {"category": "Accounts", "type": "account", "items": [
                    {"name": "Income Statement", "sub_items": []}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(menu.menu.len(), 1);
        assert_eq!(menu.menu[0].name, "Accounts");
        assert_eq!(menu.menu[0].items.len(), 1);
    }

    #[test]
    fn toggle_returns_new_state() {
        let closed = MenuState::default();
        let key = node_key(&["Accounts", "Income Statement"]);
        let open = closed.toggled(&key);
        assert!(!closed.is_expanded(&key));
        assert!(open.is_expanded(&key));
        assert_eq!(open.toggled(&key), closed);
    }
}
