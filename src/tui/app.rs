//! Terminal UI state and key handling

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

use crate::clipboard::CopyAction;
use crate::model::Ordinal;
use crate::session::{Session, StatusLevel};
use crate::transport::Target;

/// Which pane receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Full,
    Filtered,
    NameFilter,
    ContentFilter,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Full => Focus::Filtered,
            Focus::Filtered => Focus::NameFilter,
            Focus::NameFilter => Focus::ContentFilter,
            Focus::ContentFilter => Focus::Full,
        }
    }
}

/// One-line prompt shown in place of the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Decoder `host:port`, empty for the local bus
    Address,
    /// Dump or capture file to import
    ImportPath,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

impl Prompt {
    pub fn label(&self) -> &'static str {
        match self.kind {
            PromptKind::Address => "address (empty = local bus)",
            PromptKind::ImportPath => "import file",
        }
    }
}

/// What the run loop must do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
    /// Send this text to the terminal clipboard
    Clipboard(String),
}

pub struct App {
    pub session: Session,
    pub focus: Focus,
    pub name_input: String,
    pub content_input: String,
    pub prompt: Option<Prompt>,
    /// Keep the full list scrolled to the newest record
    pub follow: bool,
    /// First visible row of the filtered list
    pub filtered_offset: usize,
    /// Visible rows of each list, recorded while drawing
    pub full_height: usize,
    pub filtered_height: usize,
}

impl App {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            focus: Focus::Full,
            name_input: String::new(),
            content_input: String::new(),
            prompt: None,
            follow: true,
            filtered_offset: 0,
            full_height: 1,
            filtered_height: 1,
        }
    }

    /// Pull in pending packets and keep the scroll positions valid.
    pub fn tick(&mut self) {
        self.session.poll();

        let len = self.session.store().len();
        if self.follow {
            self.session
                .set_full_offset(len.saturating_sub(self.full_height));
        } else if self.session.sync().full_offset() >= len {
            self.session.set_full_offset(len.saturating_sub(1));
        }

        if let Some(cursor) = self.session.sync().filtered_cursor() {
            self.filtered_offset = scroll_to(self.filtered_offset, cursor, self.filtered_height);
        }
        let filtered_len = self.session.view().len();
        if self.filtered_offset >= filtered_len {
            self.filtered_offset = filtered_len.saturating_sub(self.filtered_height);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Outcome {
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return Outcome::Continue;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.handle_control_key(key.code);
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return Outcome::Continue;
            }
            KeyCode::Esc => {
                self.focus = Focus::Full;
                return Outcome::Continue;
            }
            _ => {}
        }

        match self.focus {
            Focus::NameFilter | Focus::ContentFilter => {
                self.edit_filter(key.code);
                Outcome::Continue
            }
            Focus::Full | Focus::Filtered => self.handle_list_key(key.code),
        }
    }

    fn handle_control_key(&mut self, code: KeyCode) -> Outcome {
        match code {
            KeyCode::Char('c') => return Outcome::Quit,
            KeyCode::Char('o') => {
                let combine = self.session.toggle_combine();
                self.session
                    .set_status(StatusLevel::Info, format!("filters combined with {}", combine.as_str()));
            }
            KeyCode::Char('l') => {
                self.session.clear();
                self.filtered_offset = 0;
            }
            KeyCode::Char('e') => {
                // failures are reported on the status line
                let _ = self.session.export();
            }
            KeyCode::Char('t') => self.open_prompt(PromptKind::Address),
            KeyCode::Char('r') => self.open_prompt(PromptKind::ImportPath),
            _ => {}
        }
        Outcome::Continue
    }

    fn handle_list_key(&mut self, code: KeyCode) -> Outcome {
        let copy = match code {
            KeyCode::Char('q') => return Outcome::Quit,
            KeyCode::Char('f') => {
                self.follow = !self.follow;
                return Outcome::Continue;
            }
            KeyCode::Char('y') => Some(CopyAction::Content),
            KeyCode::Char('Y') => Some(CopyAction::RawBinary),
            KeyCode::Char('n') => Some(CopyAction::TypeName),
            KeyCode::Char('i') => Some(CopyAction::TypeId),
            KeyCode::Char('h') => Some(CopyAction::HeaderComment),
            _ => None,
        };
        if let Some(action) = copy {
            return match self.session.copy(action) {
                Ok(text) => Outcome::Clipboard(text),
                Err(_) => Outcome::Continue,
            };
        }

        let step: isize = match code {
            KeyCode::Up => -1,
            KeyCode::Down => 1,
            KeyCode::PageUp => -(self.page() as isize),
            KeyCode::PageDown => self.page() as isize,
            KeyCode::Home => isize::MIN,
            KeyCode::End => isize::MAX,
            _ => return Outcome::Continue,
        };

        match self.focus {
            Focus::Filtered => self.move_filtered(step),
            _ => self.move_full(step),
        }
        Outcome::Continue
    }

    fn page(&self) -> usize {
        match self.focus {
            Focus::Filtered => self.filtered_height.max(1),
            _ => self.full_height.max(1),
        }
    }

    fn move_full(&mut self, step: isize) {
        let len = self.session.store().len();
        if len == 0 {
            return;
        }

        let current = self
            .session
            .sync()
            .selected()
            .map_or(self.session.sync().full_offset(), Ordinal::index);
        let target = offset_by(current, step, len);

        self.follow = false;
        self.session.select_full(Ordinal(target));
        let offset = scroll_to(self.session.sync().full_offset(), target, self.full_height);
        self.session.set_full_offset(offset);
    }

    /// Moving in the filtered list selects the row, which also scrolls the
    /// full list so the record is its first visible row.
    fn move_filtered(&mut self, step: isize) {
        let len = self.session.view().len();
        if len == 0 {
            return;
        }

        let target = match self.session.sync().filtered_cursor() {
            Some(cursor) => offset_by(cursor, step, len),
            None if step < 0 => len - 1,
            None => 0,
        };

        self.follow = false;
        self.session.select_filtered(target);
        self.filtered_offset = scroll_to(self.filtered_offset, target, self.filtered_height);
    }

    fn edit_filter(&mut self, code: KeyCode) {
        let input = match self.focus {
            Focus::NameFilter => &mut self.name_input,
            _ => &mut self.content_input,
        };

        match code {
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Enter => {
                self.focus = Focus::Filtered;
                return;
            }
            _ => return,
        }

        match self.focus {
            Focus::NameFilter => self.session.set_name_filter(&self.name_input),
            _ => self.session.set_content_filter(&self.content_input),
        }
        self.filtered_offset = 0;
    }

    fn open_prompt(&mut self, kind: PromptKind) {
        let input = match kind {
            PromptKind::Address => self
                .session
                .connection()
                .and_then(|c| c.target.address())
                .unwrap_or_default()
                .to_string(),
            PromptKind::ImportPath => String::new(),
        };
        self.prompt = Some(Prompt { kind, input });
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => prompt.input.push(c),
            KeyCode::Backspace => {
                prompt.input.pop();
            }
            KeyCode::Esc => self.prompt = None,
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(prompt);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, prompt: Prompt) {
        match prompt.kind {
            PromptKind::Address => {
                self.follow = true;
                self.filtered_offset = 0;
                self.session
                    .connect(Target::from_address(Some(prompt.input.as_str())));
            }
            PromptKind::ImportPath => {
                let path = PathBuf::from(prompt.input.trim());
                // failures are reported on the status line
                let _ = self.session.import(&path);
            }
        }
    }
}

/// Move `from` by `step`, clamped to `0..len`.
fn offset_by(from: usize, step: isize, len: usize) -> usize {
    let target = if step < 0 {
        from.saturating_sub(step.unsigned_abs())
    } else {
        from.saturating_add(step as usize)
    };
    target.min(len.saturating_sub(1))
}

/// Smallest scroll change that keeps `row` inside a window of `height`.
fn scroll_to(offset: usize, row: usize, height: usize) -> usize {
    let height = height.max(1);
    if row < offset {
        row
    } else if row >= offset + height {
        row + 1 - height
    } else {
        offset
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::model::{Origin, Record};
    use crate::transport::EventBus;

    fn record(type_id: u16, name: &str) -> Record {
        let mut record = Record::undecoded(type_id, Origin::Client, 1, 0.0);
        record.type_name = name.to_string();
        record
    }

    fn app_with(records: &[(u16, &str)]) -> (App, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new());
        let config = Config::default();
        let mut session = Session::new(Arc::clone(&bus), &config);
        session.connect(Target::Bus);
        for (id, name) in records {
            bus.publish(&config.transport.bus_channel, record(*id, name));
        }

        let mut app = App::new(session);
        app.full_height = 2;
        app.filtered_height = 2;
        app.tick();
        (app, bus)
    }

    fn press(app: &mut App, code: KeyCode) -> Outcome {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(app: &mut App, c: char) -> Outcome {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_scroll_helpers() {
        assert_eq!(scroll_to(5, 3, 4), 3);
        assert_eq!(scroll_to(0, 7, 4), 4);
        assert_eq!(scroll_to(2, 3, 4), 2);
        assert_eq!(offset_by(0, -1, 3), 0);
        assert_eq!(offset_by(1, isize::MAX, 3), 2);
    }

    #[test]
    fn test_follow_keeps_tail_visible() {
        let (app, _bus) = app_with(&[(1, "A"), (2, "B"), (3, "C"), (4, "D")]);
        assert_eq!(app.session.sync().full_offset(), 2);
    }

    #[test]
    fn test_filter_typing_and_selection_sync() {
        let (mut app, _bus) = app_with(&[(1, "Ping"), (2, "Pong"), (3, "Ping")]);

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::NameFilter);
        type_text(&mut app, "ping");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.focus, Focus::Filtered);
        app.tick();
        assert_eq!(app.session.view().len(), 2);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.session.sync().selected(), Some(Ordinal(2)));
        assert_eq!(app.session.sync().full_offset(), 2);
        assert!(!app.follow);
    }

    #[test]
    fn test_copy_requires_selection() {
        let (mut app, _bus) = app_with(&[(7, "Hello")]);
        assert_eq!(press(&mut app, KeyCode::Char('i')), Outcome::Continue);

        press(&mut app, KeyCode::Down);
        assert_eq!(
            press(&mut app, KeyCode::Char('i')),
            Outcome::Clipboard("7".to_string())
        );
    }

    #[test]
    fn test_address_prompt_switches_source() {
        let (mut app, bus) = app_with(&[(1, "A")]);

        ctrl(&mut app, 't');
        assert!(app.prompt.is_some());
        // an empty address re-attaches the local bus
        press(&mut app, KeyCode::Enter);
        assert!(app.prompt.is_none());

        app.tick();
        assert!(app.session.store().is_empty());
        assert_eq!(bus.subscriber_count(app.session.bus_channel()), 1);
    }

    #[test]
    fn test_ctrl_keys() {
        let (mut app, _bus) = app_with(&[(1, "A")]);

        ctrl(&mut app, 'o');
        assert_eq!(app.session.filter().combine(), crate::filter::CombinePolicy::Or);

        ctrl(&mut app, 'l');
        app.tick();
        assert!(app.session.store().is_empty());

        assert_eq!(ctrl(&mut app, 'c'), Outcome::Quit);
        assert_eq!(press(&mut app, KeyCode::Char('q')), Outcome::Quit);
    }
}
