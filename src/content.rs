use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One renderable unit of agent output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawContent")]
pub enum ContentVariant {
    Text { kind: TextKind, body: String },
    Table(Table),
    Chart(Chart),
    Image { base64: String },
    /// A payload with a tag this client does not know. Renders nothing.
    Unrecognized { tag: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Summary,
    Insight,
    Notice,
    Plain,
}

impl TextKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "summary" => Some(TextKind::Summary),
            "insight" => Some(TextKind::Insight),
            "notice" => Some(TextKind::Notice),
            "text" => Some(TextKind::Plain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Integral values print without a trailing `.0`.
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Chart {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub label: String,
    #[serde(rename = "data")]
    pub values: Vec<f64>,
    #[serde(rename = "backgroundColor", default)]
    pub fill_color: Option<Paint>,
    #[serde(rename = "borderColor", default)]
    pub stroke_color: Option<String>,
}

/// A single colour for the whole dataset, or one per data point.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Paint {
    One(String),
    Many(Vec<String>),
}

impl Paint {
    pub fn at(&self, index: usize) -> Option<&str> {
        match self {
            Paint::One(color) => Some(color),
            Paint::Many(colors) if colors.is_empty() => None,
            Paint::Many(colors) => Some(&colors[index % colors.len()]),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    content: Value,
}

impl From<RawContent> for ContentVariant {
    fn from(raw: RawContent) -> Self {
        let RawContent { tag, content } = raw;

        if let Some(kind) = TextKind::from_tag(&tag) {
            let body = match content {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            return ContentVariant::Text { kind, body };
        }

        let decoded = match tag.as_str() {
            "table" => serde_json::from_value(content).map(ContentVariant::Table),
            "chart" => match content.get("image_base64").and_then(Value::as_str) {
                Some(image) => Ok(ContentVariant::Image {
                    base64: image.to_string(),
                }),
                None => serde_json::from_value(content).map(ContentVariant::Chart),
            },
            "image" => match &content {
                Value::String(s) => Ok(ContentVariant::Image { base64: s.clone() }),
                _ => match content.get("base64").and_then(Value::as_str) {
                    Some(image) => Ok(ContentVariant::Image {
                        base64: image.to_string(),
                    }),
                    None => {
                        tracing::warn!("image content without a base64 payload");
                        return ContentVariant::Unrecognized { tag };
                    }
                },
            },
            _ => {
                tracing::debug!(tag = %tag, "skipping unrecognized content type");
                return ContentVariant::Unrecognized { tag };
            }
        };

        decoded.unwrap_or_else(|e| {
            tracing::warn!(tag = %tag, "malformed content payload: {}", e);
            ContentVariant::Unrecognized { tag }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub author: Author,
    pub content: Vec<ContentVariant>,
    pub timestamp: String,
}

impl ChatMessage {
    pub fn user(query: &str) -> Self {
        ChatMessage {
            id: format!("msg-user-{}", uuid::Uuid::new_v4()),
            author: Author::User,
            content: vec![ContentVariant::Text {
                kind: TextKind::Plain,
                body: query.to_string(),
            }],
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn agent_notice(body: &str) -> Self {
        ChatMessage {
            id: format!("msg-error-{}", uuid::Uuid::new_v4()),
            author: Author::Agent,
            content: vec![ContentVariant::Text {
                kind: TextKind::Plain,
                body: body.to_string(),
            }],
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Body of the first text variant, used for user bubbles.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|c| match c {
            ContentVariant::Text { body, .. } => Some(body.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub last_updated: String,
}
