mod activity;
mod api;
mod chart;
mod config;
mod content;
mod conversation;
mod dispatch;
mod export;
mod knowledge;
mod logging;
mod markdown;
mod raster;
mod table;
mod theme;

use std::path::PathBuf;
use std::time::Duration;

use iced::{
    alignment,
    event::{self, Event as IcedEvent},
    keyboard::{self, Key},
    time, window,
    widget::{
        button, column, container, horizontal_space, row, scrollable, text, text_input, Column,
        Row,
    },
    Border, Element, Length, Size, Subscription, Task, Theme,
};

use api::AgentClient;
use chart::PNG_FILE_NAME;
use config::Config;
use content::Author;
use conversation::{ChatReply, Conversation, SendRejected, Ticket, Turn};
use dispatch::ContentView;
use knowledge::{KnowledgeMenu, MenuLoad, MenuState};
use table::CSV_FILE_NAME;
use theme::{Palette, ThemeMode};

const APP_NAME: &str = "GMIS Agent";
const VERSION_LABEL: &str = "v4.0.1";

const EXAMPLE_PROMPTS: [&str; 4] = [
    "Compare last year's revenue for LS Cable and MnM",
    "What is a Debt Ratio?",
    "Show me the list of business items for LS ELECTRIC",
    "Draw a chart of operating profit for the top 4 manufacturing companies",
];

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn main() -> iced::Result {
    logging::init();
    let config = Config::load();

    iced::application(APP_NAME, App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size: Size::new(config.window.width as f32, config.window.height as f32),
            min_size: Some(Size::new(
                config.window.min_width as f32,
                config.window.min_height as f32,
            )),
            position: window::Position::Centered,
            ..Default::default()
        })
        .run_with(move || App::new(config))
}

/// Addresses one rendered content view: the turn it belongs to and its
/// position within that turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewId {
    pub turn: usize,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub enum Message {
    InputChanged(String),
    Submit,
    PromptChosen(String),
    ChatSettled(Ticket, Result<ChatReply, String>),
    MenuLoaded(Result<KnowledgeMenu, String>),
    NewChat,
    SelectSession(String),
    ToggleLeftSidebar,
    ToggleTheme,
    ToggleMenuNode(String),
    SortTable { view: ViewId, column: usize },
    ToggleDataset { view: ViewId, dataset: usize },
    ExportCsv(ViewId),
    ExportChart(ViewId),
    Exported(Result<PathBuf, String>),
    Tick,
}

struct App {
    config: Config,
    client: AgentClient,
    conversation: Conversation,
    menu: MenuLoad,
    menu_state: MenuState,
    theme_mode: ThemeMode,
    sidebar_collapsed: bool,
    input_text: String,
    loading_frame: usize,
    input_id: text_input::Id,
    transcript_id: scrollable::Id,
}

impl App {
    fn new(config: Config) -> (Self, Task<Message>) {
        let client = AgentClient::with_config(&config);
        let input_id = text_input::Id::unique();

        let app = App {
            theme_mode: config.ui.theme,
            client: client.clone(),
            conversation: Conversation::default(),
            menu: MenuLoad::Loading,
            menu_state: MenuState::default(),
            sidebar_collapsed: false,
            input_text: String::new(),
            loading_frame: 0,
            input_id: input_id.clone(),
            transcript_id: scrollable::Id::unique(),
            config,
        };

        activity::log_with(activity::Kind::Http, "Loading knowledge base");
        let menu_task = Task::future(async move {
            Message::MenuLoaded(client.knowledge_menu().await.map_err(|e| e.to_string()))
        });

        (app, Task::batch([text_input::focus(input_id), menu_task]))
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::InputChanged(value) => {
                self.input_text = value;
                Task::none()
            }
            Message::Submit => {
                let query = self.input_text.clone();
                self.send(&query)
            }
            Message::PromptChosen(prompt) => self.send(&prompt),
            Message::ChatSettled(ticket, result) => {
                match &result {
                    Ok(_) => activity::log_with(activity::Kind::Http, "Agent replied"),
                    Err(e) => activity::log_with(
                        activity::Kind::Error,
                        format!("Agent request failed: {}", e),
                    ),
                }
                if self.conversation.settle(ticket, result) {
                    self.scroll_to_end()
                } else {
                    Task::none()
                }
            }
            Message::MenuLoaded(Ok(menu)) => {
                activity::log(format!("Knowledge base ready ({} categories)", menu.menu.len()));
                self.menu = MenuLoad::Ready(menu);
                Task::none()
            }
            Message::MenuLoaded(Err(e)) => {
                activity::log_with(
                    activity::Kind::Error,
                    format!("Could not load knowledge base: {}", e),
                );
                Task::none()
            }
            Message::NewChat => {
                self.conversation.new_chat();
                self.input_text.clear();
                text_input::focus(self.input_id.clone())
            }
            Message::SelectSession(id) => {
                self.conversation.select_session(&id);
                Task::none()
            }
            Message::ToggleLeftSidebar => {
                self.sidebar_collapsed = !self.sidebar_collapsed;
                Task::none()
            }
            Message::ToggleTheme => {
                self.theme_mode = self.theme_mode.toggled();
                Task::none()
            }
            Message::ToggleMenuNode(key) => {
                self.menu_state = self.menu_state.toggled(&key);
                Task::none()
            }
            Message::SortTable { view, column } => {
                if let Some(ContentView::Table(table)) = self.content_view_mut(view) {
                    table.sort_by(column);
                }
                Task::none()
            }
            Message::ToggleDataset { view, dataset } => {
                if let Some(ContentView::Chart(chart)) = self.content_view_mut(view) {
                    chart.toggle_dataset(dataset);
                }
                Task::none()
            }
            Message::ExportCsv(view) => match self.content_view(view) {
                Some(ContentView::Table(table)) => {
                    let bytes = table.export_csv().into_bytes();
                    self.save(CSV_FILE_NAME, bytes)
                }
                _ => Task::none(),
            },
            Message::ExportChart(view) => {
                let (width, height) = (self.config.export.chart_width, self.config.export.chart_height);
                let png = match self.content_view(view) {
                    Some(ContentView::Chart(chart)) => chart.export_png(width, height),
                    _ => return Task::none(),
                };
                match png {
                    Ok(bytes) => self.save(PNG_FILE_NAME, bytes),
                    Err(e) => {
                        activity::log_with(activity::Kind::Error, format!("{:#}", e));
                        Task::none()
                    }
                }
            }
            Message::Exported(Ok(path)) => {
                activity::log_with(activity::Kind::Export, format!("Saved {}", path.display()));
                Task::none()
            }
            Message::Exported(Err(e)) => {
                activity::log_with(activity::Kind::Error, format!("Download failed: {}", e));
                Task::none()
            }
            Message::Tick => {
                if self.conversation.is_pending() {
                    self.loading_frame = (self.loading_frame + 1) % SPINNER_FRAMES.len();
                }
                Task::none()
            }
        }
    }

    fn send(&mut self, query: &str) -> Task<Message> {
        let (request, ticket) = match self.conversation.begin_send(query) {
            Ok(issued) => issued,
            Err(SendRejected::Blank) => return Task::none(),
            Err(SendRejected::Pending) => {
                tracing::debug!("ignoring send while a request is in flight");
                return Task::none();
            }
        };
        self.input_text.clear();
        self.loading_frame = 0;
        activity::log_with(activity::Kind::Http, "Asking the agent");

        let client = self.client.clone();
        let request_task = Task::future(async move {
            let result = client.send_chat(&request).await.map_err(|e| e.to_string());
            Message::ChatSettled(ticket, result)
        });

        Task::batch([request_task, self.scroll_to_end()])
    }

    fn save(&self, file_name: &'static str, bytes: Vec<u8>) -> Task<Message> {
        let dir = self.config.download_dir();
        Task::future(async move {
            let result = export::save_download(&dir, file_name, bytes).await;
            Message::Exported(result.map_err(|e| format!("{:#}", e)))
        })
    }

    fn scroll_to_end(&self) -> Task<Message> {
        scrollable::snap_to(self.transcript_id.clone(), scrollable::RelativeOffset::END)
    }

    fn content_view(&self, id: ViewId) -> Option<&ContentView> {
        self.conversation.turns().get(id.turn)?.views.get(id.index)
    }

    fn content_view_mut(&mut self, id: ViewId) -> Option<&mut ContentView> {
        self.conversation.turn_mut(id.turn)?.views.get_mut(id.index)
    }

    fn subscription(&self) -> Subscription<Message> {
        let timer = if self.conversation.is_pending() {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        let shortcuts = event::listen_with(|event, _status, _id| {
            if let IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                key: Key::Character(c),
                modifiers,
                ..
            }) = event
            {
                if !modifiers.command() {
                    return None;
                }
                match c.as_str().to_ascii_lowercase().as_str() {
                    "n" => Some(Message::NewChat),
                    "b" => Some(Message::ToggleLeftSidebar),
                    "t" => Some(Message::ToggleTheme),
                    _ => None,
                }
            } else {
                None
            }
        });

        Subscription::batch([timer, shortcuts])
    }

    fn view(&self) -> Element<Message> {
        let palette = self.theme_mode.palette();

        let mut panes = Row::new().height(Length::Fill);
        if !self.sidebar_collapsed {
            panes = panes.push(self.history_sidebar(palette));
        }
        panes = panes
            .push(self.chat_pane(palette))
            .push(self.knowledge_sidebar(palette));

        column![panes, self.status_bar(palette)].into()
    }

    fn history_sidebar(&self, palette: Palette) -> Element<'_, Message> {
        let today = chrono::Local::now().date_naive();

        let header = column![
            text(APP_NAME).size(20).color(palette.text),
            button(text("+ New chat").size(14))
                .on_press(Message::NewChat)
                .width(Length::Fill)
                .padding([8, 12]),
        ]
        .spacing(12);

        let mut history = Column::new().spacing(4);
        for (group, sessions) in conversation::group_sessions(self.conversation.sessions(), today) {
            history = history.push(
                container(text(group.title()).size(12).color(palette.muted)).padding([8, 4]),
            );
            for session in sessions {
                let active = self.conversation.active_session() == Some(session.id.as_str());
                let style: fn(&Theme, button::Status) -> button::Style =
                    if active { button::secondary } else { button::text };
                history = history.push(
                    button(
                        column![
                            text(session.title.as_str()).size(13),
                            text(conversation::display_time(&session.last_updated))
                                .size(11)
                                .color(palette.muted),
                        ]
                        .spacing(2),
                    )
                    .style(style)
                    .width(Length::Fill)
                    .on_press(Message::SelectSession(session.id.clone())),
                );
            }
        }

        let theme_label = match self.theme_mode {
            ThemeMode::Dark => "Light mode",
            ThemeMode::Light => "Dark mode",
        };
        let footer = row![
            text(VERSION_LABEL).size(11).color(palette.muted),
            horizontal_space(),
            button(text(theme_label).size(12))
                .style(button::text)
                .on_press(Message::ToggleTheme),
        ]
        .align_y(alignment::Vertical::Center);

        let background = palette.sidebar;
        container(
            column![header, scrollable(history).height(Length::Fill), footer]
                .spacing(12)
                .padding(12),
        )
        .width(260)
        .height(Length::Fill)
        .style(move |_theme| container::Style {
            background: Some(background.into()),
            ..container::Style::default()
        })
        .into()
    }

    fn chat_pane(&self, palette: Palette) -> Element<'_, Message> {
        let top_bar = row![
            button(text("☰").size(16))
                .style(button::text)
                .on_press(Message::ToggleLeftSidebar),
            text(APP_NAME).size(15).color(palette.muted),
        ]
        .spacing(8)
        .align_y(alignment::Vertical::Center);

        let body: Element<Message> = if self.conversation.turns().is_empty() {
            welcome_screen(palette)
        } else {
            self.transcript(palette)
        };

        column![top_bar, body, self.input_row(palette)]
            .spacing(8)
            .padding(12)
            .width(Length::Fill)
            .into()
    }

    fn transcript(&self, palette: Palette) -> Element<'_, Message> {
        let mut messages = Column::new().spacing(20).padding([8, 16]);
        for (turn_index, turn) in self.conversation.turns().iter().enumerate() {
            messages = messages.push(turn_view(turn_index, turn, palette));
        }

        if self.conversation.is_pending() {
            messages = messages.push(
                row![
                    text(SPINNER_FRAMES[self.loading_frame]).size(18).color(palette.accent),
                    text("Analyzing...").size(14).color(palette.muted),
                ]
                .spacing(10)
                .align_y(alignment::Vertical::Center),
            );
        }

        scrollable(messages)
            .id(self.transcript_id.clone())
            .height(Length::Fill)
            .into()
    }

    fn input_row(&self, palette: Palette) -> Element<'_, Message> {
        let pending = self.conversation.is_pending();

        let mut input = text_input("Ask about companies, accounts or segments...", &self.input_text)
            .id(self.input_id.clone())
            .padding(12)
            .size(15);
        if !pending {
            input = input
                .on_input(Message::InputChanged)
                .on_submit(Message::Submit);
        }

        let send = button(text(if pending { "..." } else { "Send" }).size(15))
            .padding([10, 18])
            .on_press_maybe(
                self.conversation
                    .can_send(&self.input_text)
                    .then_some(Message::Submit),
            );

        let theme_icon = match self.theme_mode {
            ThemeMode::Dark => "☀",
            ThemeMode::Light => "☾",
        };

        row![
            button(text(theme_icon).size(16).color(palette.muted))
                .style(button::text)
                .on_press(Message::ToggleTheme),
            input,
            send,
        ]
        .spacing(8)
        .align_y(alignment::Vertical::Center)
        .into()
    }

    fn knowledge_sidebar(&self, palette: Palette) -> Element<'_, Message> {
        let background = palette.sidebar;
        container(
            column![
                container(text("Knowledge Base").size(16).color(palette.text)).padding([12, 16]),
                scrollable(knowledge::view(&self.menu, &self.menu_state, palette))
                    .height(Length::Fill),
            ]
            .spacing(4),
        )
        .width(280)
        .height(Length::Fill)
        .style(move |_theme| container::Style {
            background: Some(background.into()),
            ..container::Style::default()
        })
        .into()
    }

    fn status_bar(&self, palette: Palette) -> Element<'_, Message> {
        let (line, color) = match activity::latest() {
            Some(entry) if entry.kind == activity::Kind::Error => (entry.text, palette.warning_border),
            Some(entry) => (entry.text, palette.muted),
            None => ("Ready".to_string(), palette.muted),
        };
        let background = palette.surface;
        let border = palette.border;
        container(text(line).size(12).color(color))
            .width(Length::Fill)
            .padding([4, 12])
            .style(move |_theme| container::Style {
                background: Some(background.into()),
                border: Border {
                    color: border,
                    width: 1.0,
                    radius: 0.0.into(),
                },
                ..container::Style::default()
            })
            .into()
    }

    fn theme(&self) -> Theme {
        self.theme_mode.theme()
    }
}

fn turn_view(turn_index: usize, turn: &Turn, palette: Palette) -> Element<'_, Message> {
    let stamp = text(conversation::display_time(&turn.message.timestamp))
        .size(11)
        .color(palette.muted);

    match turn.message.author {
        Author::User => {
            let (bubble_bg, bubble_text) = (palette.user_bubble, palette.user_text);
            let bubble = container(
                text(turn.message.first_text().unwrap_or_default())
                    .size(15)
                    .color(bubble_text),
            )
            .padding([10, 14])
            .max_width(640)
            .style(move |_theme| container::Style {
                background: Some(bubble_bg.into()),
                border: Border {
                    radius: 12.0.into(),
                    ..Border::default()
                },
                ..container::Style::default()
            });
            column![row![horizontal_space(), bubble], row![horizontal_space(), stamp]]
                .spacing(4)
                .into()
        }
        Author::Agent => {
            let views = turn
                .views
                .iter()
                .enumerate()
                .fold(Column::new().spacing(12), |col, (index, view)| {
                    col.push(view.view(
                        ViewId {
                            turn: turn_index,
                            index,
                        },
                        palette,
                    ))
                });
            column![views, stamp].spacing(4).width(Length::Fill).into()
        }
    }
}

fn welcome_screen<'a>(palette: Palette) -> Element<'a, Message> {
    let prompts = EXAMPLE_PROMPTS
        .chunks(2)
        .fold(Column::new().spacing(12), |col, pair| {
            col.push(
                pair.iter()
                    .fold(Row::new().spacing(12), |line, prompt| {
                        line.push(
                            button(text(*prompt).size(14))
                                .style(button::secondary)
                                .padding([14, 20])
                                .width(Length::Fill)
                                .on_press(Message::PromptChosen(prompt.to_string())),
                        )
                    }),
            )
        });

    container(
        column![
            text(APP_NAME).size(30).color(palette.text),
            text("How can I help you?").size(17).color(palette.muted),
            container(prompts).max_width(720).padding([24, 0]),
        ]
        .spacing(8)
        .align_x(alignment::Horizontal::Center),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .align_x(alignment::Horizontal::Center)
    .align_y(alignment::Vertical::Center)
    .into()
}
