use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, info};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};
use std::{io, time::Duration};
use textwrap::{core::display_width, wrap};

use tripchat::chat::{ApplyOutcome, ChatError, ChatSession, LoadState, LoadTicket, ViewScroller};
use tripchat::models::{ChatPage, Message};

// Export types needed by main module
pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

/// Entries of the overflow menu. Choosing one only logs it.
const MENU_ITEMS: [&str; 3] = ["Members", "Share Number", "Report"];

/// What the main loop should do after a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Nothing,
    Quit,
    Fetch(LoadTicket),
}

pub struct ChatUI {
    session: ChatSession,
    scroller: ViewScroller,
    menu: Option<OverflowMenu>,
}

struct OverflowMenu {
    selected: usize,
}

impl ChatUI {
    pub fn new(start_page: u32) -> Self {
        ChatUI {
            session: ChatSession::new(start_page),
            scroller: ViewScroller::new(),
            menu: None,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Kick off the first page
    pub fn mount(&mut self) -> Option<LoadTicket> {
        self.session.mount()
    }

    /// Hand a finished fetch to the session and keep the view on the latest message
    pub fn apply_result(
        &mut self,
        ticket: LoadTicket,
        result: std::result::Result<ChatPage, ChatError>,
    ) -> ApplyOutcome {
        let outcome = self.session.apply(ticket, result);
        self.scroller.on_list_changed(self.session.messages().len());
        outcome
    }

    /// Advance the scroll animation, true if the view moved
    pub fn tick(&mut self) -> bool {
        self.scroller.tick()
    }

    /// Tear down the screen; later fetch results are ignored
    pub fn close(&mut self) {
        self.menu = None;
        self.session.teardown();
    }

    pub fn handle_input(&mut self) -> Result<UiAction> {
        if event::poll(Duration::from_millis(10))? {
            let event = event::read()?;
            return Ok(self.handle_event(&event));
        }
        Ok(UiAction::Nothing)
    }

    pub fn handle_event(&mut self, event: &Event) -> UiAction {
        let Event::Key(key) = event else {
            return UiAction::Nothing;
        };
        if key.kind != KeyEventKind::Press {
            return UiAction::Nothing;
        }

        if self.menu.is_some() {
            self.handle_menu_key(key);
            return UiAction::Nothing;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => UiAction::Quit,
            KeyCode::Char('c') if ctrl => UiAction::Quit,
            KeyCode::Enter => {
                self.session.submit_draft();
                UiAction::Nothing
            }
            KeyCode::PageUp => self.fetch_next(),
            KeyCode::Char('l') if ctrl => self.fetch_next(),
            KeyCode::Char('r') if ctrl => match self.session.retry() {
                Some(ticket) => UiAction::Fetch(ticket),
                None => UiAction::Nothing,
            },
            KeyCode::Char('o') if ctrl => {
                self.menu = Some(OverflowMenu { selected: 0 });
                UiAction::Nothing
            }
            _ => {
                self.session.composer_mut().handle_event(event);
                UiAction::Nothing
            }
        }
    }

    fn fetch_next(&mut self) -> UiAction {
        match self.session.load_next_page() {
            Some(ticket) => UiAction::Fetch(ticket),
            None => UiAction::Nothing,
        }
    }

    fn handle_menu_key(&mut self, key: &KeyEvent) {
        let Some(menu) = self.menu.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.menu = None,
            KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => self.menu = None,
            KeyCode::Up => {
                menu.selected = (menu.selected + MENU_ITEMS.len() - 1) % MENU_ITEMS.len();
            }
            KeyCode::Down => {
                menu.selected = (menu.selected + 1) % MENU_ITEMS.len();
            }
            KeyCode::Enter => {
                info!("UI: Menu item '{}' chosen (no action)", MENU_ITEMS[menu.selected]);
                self.menu = None;
            }
            _ => {}
        }
    }

    pub fn draw<B: Backend>(&mut self, frame: &mut Frame<B>) {
        let size = frame.size();

        // First paint attaches the scroller to the list
        if !self.scroller.is_attached() {
            self.scroller.attach();
            self.scroller.on_list_changed(self.session.messages().len());
            self.scroller.scroll_to_latest();
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Header
                Constraint::Min(5),    // Messages area
                Constraint::Length(3), // Input box
                Constraint::Length(1), // Status line
            ])
            .split(size);

        draw_header(frame, &self.session, chunks[0]);
        draw_messages(frame, &self.session, &mut self.scroller, chunks[1]);

        let composer = self.session.composer();
        // Borders plus one column for the cursor
        let input_width = chunks[2].width.saturating_sub(3) as usize;
        let scroll = composer.visual_scroll(input_width);
        let input_widget = Paragraph::new(composer.value())
            .scroll((0, scroll as u16))
            .block(
                Block::default()
                    .title("Type a message...")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .style(Style::default());
        frame.render_widget(input_widget, chunks[2]);

        draw_status(frame, &self.session, chunks[3]);

        if let Some(menu) = &self.menu {
            draw_menu(frame, menu, size);
        } else {
            frame.set_cursor(
                // Put cursor past the end of the visible input text
                chunks[2].x + (composer.visual_cursor().saturating_sub(scroll)) as u16 + 1,
                chunks[2].y + 1,
            );
        }
    }
}

fn draw_header<B: Backend>(f: &mut Frame<B>, session: &ChatSession, area: Rect) {
    let metadata = session.metadata();

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(12)])
        .split(area);

    let lines = vec![
        Line::from(vec![
            Span::styled("← ", Style::default().fg(Color::Gray)),
            Span::styled(
                metadata.display_name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!("From {}", metadata.origin)),
        Line::from(format!("To {}", metadata.destination)),
    ];
    let header = Paragraph::new(lines).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, chunks[0]);

    let menu_hint = Paragraph::new("⋮ Ctrl+O")
        .alignment(Alignment::Right)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(menu_hint, chunks[1]);
}

/// Turn one message into display lines, right-aligned for our own messages
fn message_lines(message: &Message, width: usize) -> Vec<Line<'static>> {
    let bubble_width = (width * 4 / 5).max(10);
    let is_self = message.sender.is_self;

    let who = if is_self {
        "You".to_string()
    } else {
        message.sender.user_id.clone()
    };
    let badge = if message.sender.verified { " ✓" } else { "" };
    let heading = format!("[{}] {}{}", message.display_time(), who, badge);

    let body = message.plain_body();
    let mut texts = vec![heading];
    for paragraph in body.lines() {
        if paragraph.is_empty() {
            texts.push(String::new());
            continue;
        }
        texts.extend(wrap(paragraph, bubble_width).into_iter().map(|l| l.into_owned()));
    }

    let body_style = if is_self {
        Style::default().fg(Color::Blue)
    } else {
        Style::default()
    };

    let mut lines: Vec<Line<'static>> = texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let padded = if is_self {
                let pad = width.saturating_sub(display_width(&text));
                format!("{}{}", " ".repeat(pad), text)
            } else {
                text
            };
            let style = if i == 0 {
                Style::default().fg(Color::DarkGray)
            } else {
                body_style
            };
            Line::from(Span::styled(padded, style))
        })
        .collect();
    lines.push(Line::from(""));
    lines
}

fn draw_messages<B: Backend>(
    f: &mut Frame<B>,
    session: &ChatSession,
    scroller: &mut ViewScroller,
    area: Rect,
) {
    let width = area.width.saturating_sub(2) as usize; // Account for borders

    // One item per message so the scroller's index is the message index
    let items: Vec<ListItem> = session
        .messages()
        .iter()
        .map(|m| ListItem::new(Text::from(message_lines(m, width))))
        .collect();

    let title = match session.state() {
        LoadState::Loading => format!("Messages ({}) · loading…", items.len()),
        LoadState::Idle => format!("Messages ({})", items.len()),
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default()); // Selection only drives the scroll offset

    match scroller.state_mut() {
        Some(state) => f.render_stateful_widget(list, area, state),
        None => f.render_widget(list, area),
    }
}

fn draw_status<B: Backend>(f: &mut Frame<B>, session: &ChatSession, area: Rect) {
    let mut spans = Vec::new();

    if let Some(err) = session.last_error() {
        spans.push(Span::styled(
            format!("{} (Ctrl+R retry) ", err),
            Style::default().fg(Color::Red),
        ));
    } else if session.state() == LoadState::Loading {
        let page = session.current_page().unwrap_or(0);
        spans.push(Span::styled(
            format!("Loading page {}… ", page),
            Style::default().fg(Color::Yellow),
        ));
    } else if session.is_exhausted() {
        spans.push(Span::styled("No older messages ", Style::default().fg(Color::Gray)));
    }

    spans.push(Span::styled(
        "ESC quit | Enter send | PgUp/Ctrl+L more | Ctrl+O menu",
        Style::default().fg(Color::Gray),
    ));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_menu<B: Backend>(f: &mut Frame<B>, menu: &OverflowMenu, area: Rect) {
    // Anchor the popup to the top-right corner, under the header
    let popup_width = 20.min(area.width.saturating_sub(2));
    let popup_height = (MENU_ITEMS.len() as u16 + 2).min(area.height.saturating_sub(2));
    let popup_x = area.width.saturating_sub(popup_width + 1);
    let popup_area = Rect::new(popup_x, 1, popup_width, popup_height);

    let items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if i == menu.selected {
                ListItem::new(format!("> {}", item)).style(Style::default().fg(Color::Yellow))
            } else {
                ListItem::new(format!("  {}", item))
            }
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(Clear, popup_area); // Clear the area first
    f.render_widget(list, popup_area);
    debug!("UI: Menu open at item {}", menu.selected);
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
