use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::error;

use docchat_core::{ChatMessage, ChatSession, Source, TranscriptView, TurnOutcome, UserInfo};

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Sources,
}

/// Which conversation the screen is showing
#[derive(Debug, Clone)]
pub enum ChatKind {
    /// Shared knowledge base, history kept by the backend
    KnowledgeBase { user: UserInfo },
    /// Anonymous chat over one uploaded PDF
    Pdf { filename: String },
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub kind: ChatKind,

    // Conversation. The session is moved into the turn task while a reply
    // streams and handed back when it settles.
    pub session: Option<ChatSession>,
    pub turn_task: Option<JoinHandle<(ChatSession, TurnOutcome)>>,
    pub events: UnboundedSender<AppEvent>,

    // Rendered copy of the transcript
    pub messages: Vec<ChatMessage>,
    pub loading: bool,
    pub sources: Vec<Source>,
    pub sources_state: ListState,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat scrolling
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub confirm_new_chat: bool,
    pub status: Option<String>,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub sources_area: Option<Rect>,
}

impl App {
    pub fn new(kind: ChatKind, session: ChatSession, events: UnboundedSender<AppEvent>) -> Self {
        let view = session.view();

        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Chat,
            kind,

            session: Some(session),
            turn_task: None,
            events,

            messages: view.messages,
            loading: view.loading,
            sources: Vec::new(),
            sources_state: ListState::default(),

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            confirm_new_chat: false,
            status: None,

            chat_area: None,
            sources_area: None,
        };
        app.scroll_chat_to_bottom();
        app
    }

    pub fn is_busy(&self) -> bool {
        self.loading || self.turn_task.is_some() || self.session.is_none()
    }

    /// Send the input box contents as a new turn.
    pub fn submit_input(&mut self) {
        if self.is_busy() || self.input.trim().is_empty() {
            return;
        }
        let Some(mut session) = self.session.take() else {
            return;
        };

        let query = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.loading = true;
        self.status = None;

        let tx = self.events.clone();
        self.turn_task = Some(tokio::spawn(async move {
            let view_tx = tx.clone();
            let outcome = session
                .submit(&query, move |view| {
                    // The UI may already be gone
                    let _ = view_tx.send(AppEvent::Transcript(view));
                })
                .await;
            let _ = tx.send(AppEvent::TurnFinished);
            (session, outcome)
        }));
    }

    pub fn apply_view(&mut self, view: TranscriptView) {
        self.messages = view.messages;
        self.loading = view.loading;
        self.scroll_chat_to_bottom();
    }

    /// Take the session back from the finished turn task.
    pub async fn finish_turn(&mut self) {
        let Some(task) = self.turn_task.take() else {
            return;
        };

        match task.await {
            Ok((session, outcome)) => {
                self.apply_view(session.view());
                match outcome {
                    TurnOutcome::Completed(report) => {
                        self.sources = report.sources.unwrap_or_default();
                        self.sources_state.select(if self.sources.is_empty() { None } else { Some(0) });
                    }
                    TurnOutcome::Failed { error } => {
                        self.sources.clear();
                        self.status = Some(format!("Query failed: {}", error));
                    }
                    TurnOutcome::Rejected | TurnOutcome::Busy => {}
                }
                self.session = Some(session);
            }
            Err(e) => {
                error!(error = %e, "Chat task ended abnormally");
                self.status = Some("Chat stopped unexpectedly. Restart docchat to continue.".to_string());
            }
        }
        self.loading = false;
    }

    /// Ask for confirmation before wiping the conversation.
    pub fn request_new_chat(&mut self) {
        if !self.is_busy() {
            self.confirm_new_chat = true;
        }
    }

    pub async fn start_new_chat(&mut self) {
        self.confirm_new_chat = false;
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.new_conversation().await {
            Ok(()) => {
                let view = session.view();
                self.apply_view(view);
                self.sources.clear();
                self.sources_state.select(None);
                self.chat_scroll = 0;
                self.status = Some("Started a new conversation".to_string());
            }
            Err(e) => {
                self.status = Some(format!("Could not clear history: {}", e));
            }
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Chat if !self.sources.is_empty() => FocusPane::Sources,
            _ => FocusPane::Chat,
        };
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll());
    }

    pub fn sources_down(&mut self) {
        let len = self.sources.len();
        if len > 0 {
            let i = self.sources_state.selected().unwrap_or(0);
            self.sources_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn sources_up(&mut self) {
        if !self.sources.is_empty() {
            let i = self.sources_state.selected().unwrap_or(0);
            self.sources_state.select(Some(i.saturating_sub(1)));
        }
    }

    /// Number of wrapped lines the chat pane needs.
    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in &self.messages {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "AI:")
            let content = if msg.content.is_empty() { " " } else { msg.content.as_str() };
            for line in content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add((char_count / wrap_width + 1) as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }
        total_lines
    }

    fn max_chat_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_line_count().saturating_sub(visible_height)
    }

    /// Scroll chat to bottom so the newest text is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    pub fn title(&self) -> String {
        match &self.kind {
            ChatKind::KnowledgeBase { user } => {
                format!(" docchat: {} ({}) ", user.email, user.role.as_str())
            }
            ChatKind::Pdf { filename } => format!(" Chatting with: {} ", filename),
        }
    }

    pub fn welcome(&self) -> &'static str {
        match self.kind {
            ChatKind::KnowledgeBase { .. } => "Welcome! Ask me anything about the company documents.",
            ChatKind::Pdf { .. } => "Ask a question about the document...",
        }
    }
}
