// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use civica_activation::{
    ActivationEvent, ChatTrigger, ProbeDue, ProbeScheduler, RetryPolicy, TabActivator,
    TabSelector, ThreadScheduler, WidgetHandle, WidgetLocator,
};
use civica_app::{AppCommand, AppState, ChatTab, ChatVisibility, PageKind, TabId};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs};
use std::cell::{RefCell, RefMut};
use std::io;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const TRANSCRIPT_TAIL: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOptions {
    pub retry_policy: RetryPolicy,
    pub mount_delay: Duration,
    pub initial_chat_tab: Option<TabId>,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            mount_delay: Duration::from_millis(450),
            initial_chat_tab: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatRole {
    Visitor,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ChatMessage {
    role: ChatRole,
    body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MountState {
    Unmounted,
    Mounting { since: Instant },
    Mounted,
}

/// The chat overlay. Its tabs only exist once it has finished mounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatWidget {
    mount: MountState,
    mount_delay: Duration,
    active_tab: ChatTab,
    input: String,
    transcript: Vec<ChatMessage>,
}

impl ChatWidget {
    pub fn new(mount_delay: Duration) -> Self {
        Self {
            mount: MountState::Unmounted,
            mount_delay,
            active_tab: ChatTab::Chat,
            input: String::new(),
            transcript: Vec::new(),
        }
    }

    pub const fn is_mounted(&self) -> bool {
        matches!(self.mount, MountState::Mounted)
    }

    pub const fn active_tab(&self) -> ChatTab {
        self.active_tab
    }

    /// Advances the mount lifecycle to match the app's chat visibility.
    pub fn sync_visibility(&mut self, visibility: ChatVisibility, now: Instant) {
        match (visibility, self.mount) {
            (ChatVisibility::Hidden, MountState::Unmounted) => {}
            (ChatVisibility::Hidden, _) => {
                self.mount = MountState::Unmounted;
                self.active_tab = ChatTab::Chat;
                self.input.clear();
            }
            (ChatVisibility::Visible, MountState::Unmounted) => {
                self.mount = MountState::Mounting { since: now };
                self.finish_mount(now);
            }
            (ChatVisibility::Visible, MountState::Mounting { .. }) => self.finish_mount(now),
            (ChatVisibility::Visible, MountState::Mounted) => {}
        }
    }

    fn finish_mount(&mut self, now: Instant) {
        if let MountState::Mounting { since } = self.mount
            && now.saturating_duration_since(since) >= self.mount_delay
        {
            self.mount = MountState::Mounted;
        }
    }

    pub fn select(&mut self, tab: ChatTab) {
        self.active_tab = tab;
    }

    fn rotate_tab(&mut self, delta: isize) {
        let tabs = ChatTab::ALL;
        let current = tabs
            .iter()
            .position(|tab| *tab == self.active_tab)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        self.active_tab = tabs[(current + delta).rem_euclid(len) as usize];
    }

    fn submit_input(&mut self) -> bool {
        let body = self.input.trim().to_owned();
        self.input.clear();
        if body.is_empty() {
            return false;
        }
        self.transcript.push(ChatMessage {
            role: ChatRole::Visitor,
            body,
        });
        self.transcript.push(ChatMessage {
            role: ChatRole::Assistant,
            body: format!(
                "Recebido. A equipe de {} responde em horário de atendimento.",
                self.active_tab.label()
            ),
        });
        true
    }
}

pub type ChatWidgetSlot = Rc<RefCell<ChatWidget>>;

/// Finds the chat widget through the shared slot the host renders from.
#[derive(Debug, Clone)]
pub struct ChatLocator {
    slot: ChatWidgetSlot,
}

impl ChatLocator {
    pub fn new(slot: ChatWidgetSlot) -> Self {
        Self { slot }
    }
}

struct MountedChat<'a>(RefMut<'a, ChatWidget>);

impl TabSelector for MountedChat<'_> {
    fn select_tab(&mut self, tab: &TabId) -> Result<()> {
        let Some(chat_tab) = ChatTab::parse(tab.as_str()) else {
            bail!("chat widget has no tab {tab:?}");
        };
        self.0.select(chat_tab);
        Ok(())
    }
}

impl WidgetLocator for ChatLocator {
    fn locate(&mut self) -> Option<WidgetHandle<'_>> {
        let widget = self.slot.try_borrow_mut().ok()?;
        if !widget.is_mounted() {
            return None;
        }
        Some(WidgetHandle::new(MountedChat(widget)))
    }
}

/// Posts an open-chat request onto the UI loop's queue.
#[derive(Debug, Clone)]
pub struct ChannelTrigger {
    tx: Sender<InternalEvent>,
}

impl ChannelTrigger {
    pub fn new(tx: Sender<InternalEvent>) -> Self {
        Self { tx }
    }
}

impl ChatTrigger for ChannelTrigger {
    fn request_open(&mut self) {
        if self.tx.send(InternalEvent::OpenChatRequested).is_err() {
            tracing::debug!("ui loop gone; dropping open-chat request");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    OpenChatRequested,
    ActivationProbe(ProbeDue),
}

impl From<ProbeDue> for InternalEvent {
    fn from(value: ProbeDue) -> Self {
        Self::ActivationProbe(value)
    }
}

pub type ChatActivator<S> = TabActivator<ChatLocator, ChannelTrigger, S>;

struct ViewData<S: ProbeScheduler> {
    chat: ChatWidgetSlot,
    activator: ChatActivator<S>,
    status_token: u64,
    help_visible: bool,
}

impl<S: ProbeScheduler> ViewData<S> {
    fn new(
        retry_policy: RetryPolicy,
        mount_delay: Duration,
        scheduler: S,
        tx: &Sender<InternalEvent>,
    ) -> Self {
        let chat = Rc::new(RefCell::new(ChatWidget::new(mount_delay)));
        let activator = TabActivator::new(
            retry_policy,
            ChatLocator::new(Rc::clone(&chat)),
            ChannelTrigger::new(tx.clone()),
            scheduler,
        );
        Self {
            chat,
            activator,
            status_token: 0,
            help_visible: false,
        }
    }
}

pub fn run_app(state: &mut AppState, options: HostOptions) -> Result<()> {
    let (internal_tx, internal_rx) = mpsc::channel();
    let scheduler = ThreadScheduler::spawn(internal_tx.clone())?;
    let mut view_data = ViewData::new(
        options.retry_policy,
        options.mount_delay,
        scheduler,
        &internal_tx,
    );

    if let Some(tab) = options.initial_chat_tab {
        tracing::info!(tab = %tab, "opening chat from startup link");
        let events = view_data.activator.open(tab);
        report_activation(state, &mut view_data, &internal_tx, &events);
    }

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut result = Ok(());
    loop {
        let now = Instant::now();
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx, now);
        sync_chat_mount(state, &view_data, now);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(50)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    view_data.activator.cancel();
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn sync_chat_mount<S: ProbeScheduler>(state: &AppState, view_data: &ViewData<S>, now: Instant) {
    view_data
        .chat
        .borrow_mut()
        .sync_visibility(state.chat, now);
}

fn process_internal_events<S: ProbeScheduler>(
    state: &mut AppState,
    view_data: &mut ViewData<S>,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
    now: Instant,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::OpenChatRequested => {
                state.dispatch(AppCommand::OpenChat);
                sync_chat_mount(state, view_data, now);
            }
            InternalEvent::ActivationProbe(due) => {
                sync_chat_mount(state, view_data, now);
                let events = view_data.activator.handle_probe(due);
                report_activation(state, view_data, tx, &events);
            }
        }
    }
}

fn report_activation<S: ProbeScheduler>(
    state: &mut AppState,
    view_data: &mut ViewData<S>,
    tx: &Sender<InternalEvent>,
    events: &[ActivationEvent],
) {
    for event in events {
        match event {
            ActivationEvent::Activated { tab, .. } => {
                emit_status(state, view_data, tx, format!("chat tab: {tab}"));
            }
            ActivationEvent::AlreadyProbing { .. } => {
                emit_status(state, view_data, tx, "already opening chat");
            }
            ActivationEvent::Cancelled { .. } => {
                emit_status(state, view_data, tx, "chat opening canceled");
            }
            // Exhaustion is logged by the activator and otherwise silent.
            _ => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status<S: ProbeScheduler>(
    state: &mut AppState,
    view_data: &mut ViewData<S>,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<S: ProbeScheduler>(
    state: &mut AppState,
    view_data: &mut ViewData<S>,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        let events = view_data.activator.cancel();
        if events.is_empty() {
            emit_status(
                state,
                view_data,
                internal_tx,
                "cancel requested; chat is not opening",
            );
        } else {
            report_activation(state, view_data, internal_tx, &events);
        }
        return false;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
            emit_status(state, view_data, internal_tx, "help hidden");
        }
        return false;
    }

    if state.chat == ChatVisibility::Visible {
        handle_chat_overlay_key(state, view_data, internal_tx, key);
        return false;
    }

    match key.code {
        KeyCode::Char('f') | KeyCode::Char('l') | KeyCode::Right => {
            state.dispatch(AppCommand::NextPage);
        }
        KeyCode::Char('b') | KeyCode::Char('h') | KeyCode::Left => {
            state.dispatch(AppCommand::PrevPage);
        }
        KeyCode::Char(digit @ '1'..='9') => {
            let index = digit as usize - '1' as usize;
            if let Some(page) = PageKind::ALL.get(index) {
                state.dispatch(AppCommand::GoToPage(*page));
            }
        }
        KeyCode::Enter | KeyCode::Char('o') => {
            press_chat_button(state, view_data, internal_tx);
        }
        KeyCode::Char('@') => {
            state.dispatch(AppCommand::OpenChat);
        }
        KeyCode::Char('?') => {
            view_data.help_visible = true;
        }
        _ => {}
    }
    false
}

fn press_chat_button<S: ProbeScheduler>(
    state: &mut AppState,
    view_data: &mut ViewData<S>,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(tab) = state.active_page.chat_shortcut() else {
        emit_status(
            state,
            view_data,
            internal_tx,
            "no chat shortcut on this page; press @ for the general chat",
        );
        return;
    };
    let events = view_data.activator.open(tab);
    report_activation(state, view_data, internal_tx, &events);
}

fn handle_chat_overlay_key<S: ProbeScheduler>(
    state: &mut AppState,
    view_data: &mut ViewData<S>,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.code == KeyCode::Esc {
        // Closing the widget abandons any activation still waiting for it.
        view_data.activator.cancel();
        state.dispatch(AppCommand::CloseChat);
        view_data
            .chat
            .borrow_mut()
            .sync_visibility(state.chat, Instant::now());
        return;
    }

    let mut chat = view_data.chat.borrow_mut();
    if !chat.is_mounted() {
        return;
    }
    match key.code {
        KeyCode::Tab => chat.rotate_tab(1),
        KeyCode::BackTab => chat.rotate_tab(-1),
        KeyCode::Backspace => {
            chat.input.pop();
        }
        KeyCode::Enter => {
            if chat.submit_input() {
                let tab = chat.active_tab;
                drop(chat);
                emit_status(state, view_data, internal_tx, format!("sent to {}", tab.label()));
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            chat.input.push(ch);
        }
        _ => {}
    }
}

fn render<S: ProbeScheduler>(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData<S>) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = PageKind::ALL
        .iter()
        .position(|page| *page == state.active_page)
        .unwrap_or(0);
    let titles = PageKind::ALL
        .iter()
        .map(|page| page.label().to_owned())
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("civica").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    let body = Paragraph::new(render_page_text(state.active_page)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(state.active_page.label()),
    );
    frame.render_widget(body, layout[1]);

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if state.chat == ChatVisibility::Visible {
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);
        let chat = Paragraph::new(render_chat_overlay_text(&view_data.chat.borrow())).block(
            Block::default()
                .title("Assistente Virtual")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Green)),
        );
        frame.render_widget(chat, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_page_text(page: PageKind) -> String {
    let mut lines = vec![page.summary().to_owned(), String::new()];
    match page.chat_shortcut() {
        Some(tab) => lines.push(format!("[enter] Abrir Chat {}", tab.label())),
        None => lines.push("[@] Assistente Virtual".to_owned()),
    }
    lines.join("\n")
}

fn render_chat_overlay_text(chat: &ChatWidget) -> String {
    if !chat.is_mounted() {
        return "carregando assistente...".to_owned();
    }

    let mut lines = Vec::new();
    lines.push(
        ChatTab::ALL
            .iter()
            .map(|tab| {
                if *tab == chat.active_tab {
                    format!("[{}]", tab.label())
                } else {
                    tab.label().to_owned()
                }
            })
            .collect::<Vec<String>>()
            .join(" "),
    );
    lines.push(String::new());
    lines.push(format!("bot: {}", chat.active_tab.greeting()));

    let keep = chat.transcript.len().saturating_sub(TRANSCRIPT_TAIL);
    for message in chat.transcript.iter().skip(keep) {
        let label = match message.role {
            ChatRole::Visitor => "você",
            ChatRole::Assistant => "bot",
        };
        lines.push(format!("{label}: {}", message.body));
    }

    lines.push(String::new());
    lines.push(format!("> {}", chat.input));
    lines.join("\n")
}

fn status_text<S: ProbeScheduler>(state: &AppState, view_data: &ViewData<S>) -> String {
    let phase = view_data.activator.phase();
    let default = "b/f pages | 1-5 jump | enter chat button | @ chat | ctrl+c cancel | ? help | ctrl+q";
    let mut parts = Vec::new();
    if phase.is_probing() {
        parts.push(format!("chat: {}", phase.label()));
    }
    if let Some(status) = &state.status_line {
        parts.push(status.clone());
    }
    parts.push(default.to_owned());
    parts.join(" | ")
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ctrl+c cancel chat opening | ? help\n\
pages: b/f or h/l switch | 1-5 jump | enter/o press chat button | @ open chat\n\
chat: tab/shift+tab topic | type + enter send | backspace edit | esc close"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
