use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use notebox::text::{plain_text, preview};
use notebox::{
    Note, NoteDraft, NotePatch, NoteStore, SearchPatch, SortField, StoreLocation, Tab,
    DEFAULT_CATEGORY_ID,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

pub fn run(store: NoteStore, location: StoreLocation) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(store, location);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

/// "5m ago" style label relative to now.
pub fn format_age(at: DateTime<Utc>) -> String {
    let secs = (Utc::now() - at).num_seconds().max(0);
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}

struct App {
    store: NoteStore,
    location: StoreLocation,
    cursor: usize,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Searching(FieldValue),
    Creating(NoteForm),
    Editing { note_id: String, form: NoteForm },
    ConfirmPurge { note_id: String },
}

struct NoteForm {
    title: FieldValue,
    content: FieldValue,
    tags: FieldValue,
    category: FieldValue,
    field: FormField,
    /// The note as it was when editing began. Its content is edited as stored markup.
    source: Option<Note>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Title,
    Content,
    Tags,
    Category,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if let Some((idx, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    fn move_right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    fn backspace(&mut self) {
        if let Some((idx, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.value.drain(idx..self.cursor);
            self.cursor = idx;
        }
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    /// Applies a text-editing key; returns false when the key is not one.
    fn edit(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => return false,
        }
        true
    }
}

impl App {
    fn new(store: NoteStore, location: StoreLocation) -> Self {
        let status = format!("Loaded notes from {}", location.path.display());
        let mut app = App {
            store,
            location,
            cursor: 0,
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
        };
        if let Some(id) = app.store.selected_id().map(str::to_string) {
            app.cursor = app
                .store
                .visible_notes()
                .iter()
                .position(|n| n.id == id)
                .unwrap_or(0);
        }
        app
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let (quit, next) = match mode {
            Mode::Normal => (self.handle_normal_key(key), None),
            Mode::Searching(field) => (false, self.handle_search_key(field, key)),
            Mode::Creating(form) => (false, self.handle_form_key(None, form, key)),
            Mode::Editing { note_id, form } => (false, self.handle_form_key(Some(note_id), form, key)),
            Mode::ConfirmPurge { note_id } => (false, self.handle_confirm_key(note_id, key)),
        };
        if let Some(next) = next {
            self.mode = next;
        }
        self.clamp_cursor();
        quit
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        let tab = self.store.view().tab;
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('1') => self.switch_tab(Tab::Notes),
            KeyCode::Char('2') => self.switch_tab(Tab::Favorites),
            KeyCode::Char('3') => self.switch_tab(Tab::Trash),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Char('/') => {
                let current = self.store.view().search.query.clone();
                self.mode = Mode::Searching(FieldValue::new(&current));
                self.status = "Search (Enter apply, Esc cancel)".into();
            }
            KeyCode::Char('s') => self.cycle_sort(),
            KeyCode::Char('o') => {
                let direction = self.store.view().search.sort_direction.reversed();
                self.store.set_search_filters(SearchPatch {
                    sort_direction: Some(direction),
                    ..SearchPatch::default()
                });
                self.status = format!("Sort {:?}", direction).to_lowercase();
            }
            KeyCode::Char('c') => self.cycle_category(),
            KeyCode::Char('t') => self.cycle_tag(),
            KeyCode::Esc => {
                self.store.clear_search_filters();
                self.store.set_active_tab(tab);
                self.status = "Filters cleared".into();
            }
            KeyCode::Char('n') if tab != Tab::Trash => {
                self.mode = Mode::Creating(NoteForm::new());
                self.status = "New note (Tab moves, Enter saves, Esc cancels)".into();
            }
            KeyCode::Char('e') if tab != Tab::Trash => {
                if let Some(note) = self.current_note() {
                    let note_id = note.id.clone();
                    self.mode = Mode::Editing {
                        form: NoteForm::from_note(note),
                        note_id: note_id.clone(),
                    };
                    self.status = format!("Editing {}", note_id);
                }
            }
            KeyCode::Char('p') if tab != Tab::Trash => {
                self.with_current("pin", |store, id| store.toggle_pin_note(id))
            }
            KeyCode::Char('f') if tab != Tab::Trash => {
                self.with_current("favorite", |store, id| store.toggle_favorite_note(id))
            }
            KeyCode::Char('d') if tab != Tab::Trash => {
                self.with_current("trash", |store, id| store.delete_note(id))
            }
            KeyCode::Char('r') if tab == Tab::Trash => {
                self.with_current("restore", |store, id| store.restore_note(id))
            }
            KeyCode::Char('x') if tab == Tab::Trash => {
                if let Some(note) = self.current_note() {
                    self.mode = Mode::ConfirmPurge {
                        note_id: note.id.clone(),
                    };
                }
            }
            KeyCode::Char('T') => {
                self.store.toggle_dark_mode();
                self.after_save(format!("Theme {:?}", self.store.preferences().theme));
            }
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, mut field: FieldValue, key: KeyEvent) -> Option<Mode> {
        match key.code {
            KeyCode::Esc => {
                self.status = "Search canceled".into();
                None
            }
            KeyCode::Enter => {
                let query = field.value.clone();
                self.status = if query.is_empty() {
                    "Search cleared".into()
                } else {
                    format!("Searching for \"{}\"", query)
                };
                self.store.set_search_filters(SearchPatch {
                    query: Some(query),
                    ..SearchPatch::default()
                });
                self.cursor = 0;
                None
            }
            _ => {
                field.edit(key);
                Some(Mode::Searching(field))
            }
        }
    }

    fn handle_form_key(
        &mut self,
        note_id: Option<String>,
        mut form: NoteForm,
        key: KeyEvent,
    ) -> Option<Mode> {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return None;
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Enter => {
                self.submit_form(note_id.as_deref(), &form);
                return None;
            }
            _ => {
                form.active_field_mut().edit(key);
            }
        }
        Some(match note_id {
            Some(note_id) => Mode::Editing { note_id, form },
            None => Mode::Creating(form),
        })
    }

    fn handle_confirm_key(&mut self, note_id: String, key: KeyEvent) -> Option<Mode> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match self.store.permanently_delete_note(&note_id) {
                    Ok(()) => self.after_save(format!("Permanently deleted {}", note_id)),
                    Err(err) => self.status = format!("Delete failed: {}", err),
                }
                None
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                None
            }
            _ => Some(Mode::ConfirmPurge { note_id }),
        }
    }

    fn submit_form(&mut self, note_id: Option<&str>, form: &NoteForm) {
        match note_id {
            None => {
                let note = self.store.create_note(NoteDraft {
                    title: Some(form.title.value.trim().to_string()),
                    content: Some(text_to_html(&form.content.value)),
                    category: Some(form.category.value.trim().to_string()),
                    tags: parse_tags(&form.tags.value),
                    ..NoteDraft::default()
                });
                self.cursor = self
                    .store
                    .visible_notes()
                    .iter()
                    .position(|n| n.id == note.id)
                    .unwrap_or(0);
                self.after_save(format!("Created note {}", note.id));
            }
            Some(id) => {
                let patch = form.edit_patch();
                if patch.is_empty() {
                    self.status = format!("No changes to {}", id);
                    return;
                }
                match self.store.update_note(id, patch) {
                    Ok(()) => self.after_save(format!("Updated {}", id)),
                    Err(err) => self.status = format!("Could not edit: {}", err),
                }
            }
        }
    }

    fn with_current<F>(&mut self, action: &str, f: F)
    where
        F: FnOnce(&mut NoteStore, &str) -> Result<(), notebox::StoreError>,
    {
        let Some(id) = self.current_note().map(|n| n.id.clone()) else {
            self.status = format!("No note selected to {}", action);
            return;
        };
        match f(&mut self.store, &id) {
            Ok(()) => self.after_save(format!("{} {}", capitalize(action), id)),
            Err(err) => self.status = format!("Could not {}: {}", action, err),
        }
    }

    fn after_save(&mut self, message: String) {
        match self.store.last_persist_error() {
            Some(err) => self.status = format!("{} (not saved: {})", message, err),
            None => {
                self.last_save = Instant::now();
                self.status = message;
            }
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.store.set_active_tab(tab);
        self.cursor = 0;
        self.status = format!("Switched to {}", tab.label());
        self.sync_selection();
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.store.visible_notes().len();
        if len == 0 {
            return;
        }
        let next = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = next as usize;
        self.sync_selection();
    }

    fn cycle_sort(&mut self) {
        let next = match self.store.view().search.sort_by {
            SortField::UpdatedAt => SortField::CreatedAt,
            SortField::CreatedAt => SortField::Title,
            SortField::Title => SortField::UpdatedAt,
        };
        self.store.set_search_filters(SearchPatch {
            sort_by: Some(next),
            ..SearchPatch::default()
        });
        self.status = format!("Sorting by {}", next.label());
    }

    fn cycle_category(&mut self) {
        let ids: Vec<String> = self.store.categories().iter().map(|c| c.id.clone()).collect();
        let next = next_in_cycle(&ids, self.store.view().selected_category.as_deref());
        self.store.set_selected_category(next.as_deref());
        self.cursor = 0;
        self.status = match next {
            Some(id) => format!("Category {}", self.category_name(&id)),
            None => "All categories".into(),
        };
    }

    fn cycle_tag(&mut self) {
        let ids: Vec<String> = self.store.tags().iter().map(|t| t.id.clone()).collect();
        let next = next_in_cycle(&ids, self.store.view().selected_tag.as_deref());
        self.store.set_selected_tag(next.as_deref());
        self.cursor = 0;
        self.status = match next {
            Some(id) => format!("Tag #{}", self.tag_name(&id)),
            None => "All tags".into(),
        };
    }

    fn clamp_cursor(&mut self) {
        let len = self.store.visible_notes().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    /// Keeps the store's open note in step with the highlighted row.
    fn sync_selection(&mut self) {
        if self.store.view().tab == Tab::Trash {
            return;
        }
        let id = self.current_note().map(|n| n.id.clone());
        if let Err(err) = self.store.select_note(id.as_deref()) {
            self.status = format!("Could not select note: {}", err);
        }
    }

    fn current_note(&self) -> Option<&Note> {
        self.store.visible_notes().get(self.cursor).copied()
    }

    fn category_name(&self, id: &str) -> String {
        self.store
            .category(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn tag_name(&self, id: &str) -> String {
        self.store
            .tag(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_tabs(f, layout[1]);
        self.draw_body(f, layout[2]);
        self.draw_footer(f, layout[3]);

        match &self.mode {
            Mode::Creating(form) => self.draw_form(f, "New Note", form),
            Mode::Editing { form, .. } => self.draw_form(f, "Edit Note", form),
            Mode::ConfirmPurge { note_id } => self.draw_confirm(f, note_id),
            Mode::Searching(field) => self.draw_search(f, field),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "notebox ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(self.location.scope.label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("theme {:?}", self.store.preferences().theme).to_lowercase(),
                Style::default().fg(Color::Magenta),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        f.render_widget(
            Paragraph::new(title)
                .alignment(Alignment::Center)
                .block(block),
            area,
        );
    }

    fn draw_tabs(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let counts = self.store.tab_counts();
        let titles = vec![
            format!("1 Notes ({})", counts.notes),
            format!("2 Favorites ({})", counts.favorites),
            format!("3 Trash ({})", counts.trash),
        ];
        let view = self.store.view();
        let selected = match view.tab {
            Tab::Notes => 0,
            Tab::Favorites => 1,
            Tab::Trash => 2,
        };
        let mut filters = vec![format!(
            "sort {} {:?}",
            view.search.sort_by.label(),
            view.search.sort_direction
        )
        .to_lowercase()];
        if let Some(id) = &view.selected_category {
            filters.push(format!("category {}", self.category_name(id)));
        }
        if let Some(id) = &view.selected_tag {
            filters.push(format!("tag #{}", self.tag_name(id)));
        }
        if !view.search.query.is_empty() {
            filters.push(format!("search \"{}\"", view.search.query));
        }
        let tabs = Tabs::new(titles)
            .select(selected)
            .block(
                Block::default()
                    .borders(Borders::BOTTOM)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(Span::styled(
                        filters.join("  •  "),
                        Style::default().fg(Color::Gray),
                    )),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::LightCyan)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            );
        f.render_widget(tabs, area);
    }

    fn draw_body(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        let notes = self.store.visible_notes();
        let tab = self.store.view().tab;
        if notes.is_empty() {
            let message = if tab == Tab::Trash {
                "Trash is empty"
            } else {
                "No notes found"
            };
            let empty = Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(tab.label()));
            f.render_widget(empty, chunks[0]);
        } else {
            let width = chunks[0].width.saturating_sub(4) as usize;
            let items = notes
                .iter()
                .map(|note| self.note_item(note, width, tab))
                .collect::<Vec<_>>();
            let mut state = ListState::default();
            state.select(Some(self.cursor));
            let list = List::new(items)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Cyan))
                        .title(tab.label()),
                )
                .highlight_style(
                    Style::default()
                        .bg(Color::Rgb(252, 214, 112))
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD),
                );
            f.render_stateful_widget(list, chunks[0], &mut state);
        }

        let detail = match notes.get(self.cursor) {
            Some(note) => self.detail_lines(note),
            None => vec![Line::from("No note selected")],
        };
        let paragraph = Paragraph::new(detail).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title("Note"),
        );
        f.render_widget(paragraph, chunks[1]);
    }

    fn note_item(&self, note: &Note, width: usize, tab: Tab) -> ListItem<'static> {
        let mut spans = Vec::new();
        if tab != Tab::Trash && note.is_pinned {
            spans.push(Span::styled("▲ ", Style::default().fg(Color::LightYellow)));
        }
        if note.is_favorite {
            spans.push(Span::styled("★ ", Style::default().fg(Color::LightMagenta)));
        }
        spans.push(Span::styled(
            truncate_text(&note.title, width.saturating_sub(16)),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format_age(note.updated_at),
            Style::default().fg(Color::DarkGray),
        ));
        let summary = truncate_text(&preview(&note.content, width), width);
        let lines = vec![
            Line::from(spans),
            Line::from(Span::styled(summary, Style::default().fg(Color::Gray))),
        ];
        ListItem::new(lines)
    }

    fn detail_lines(&self, note: &Note) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            note.title.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))];
        let mut meta = vec![Span::styled(
            self.category_name(&note.category),
            Style::default().fg(Color::Green),
        )];
        for tag in &note.tags {
            meta.push(Span::raw("  "));
            meta.push(Span::styled(
                format!("#{}", self.tag_name(tag)),
                Style::default().fg(Color::LightMagenta),
            ));
        }
        lines.push(Line::from(meta));
        lines.push(Line::from(Span::styled(
            format!(
                "created {}  updated {}",
                note.created_at.format("%Y-%m-%d %H:%M"),
                note.updated_at.format("%Y-%m-%d %H:%M")
            ),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));
        for text in plain_text(&note.content).lines() {
            lines.push(Line::from(text.to_string()));
        }
        lines
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let mut spans = vec![
            Span::styled("1/2/3", Style::default().fg(Color::LightCyan)),
            Span::raw(" tabs  "),
            Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
            Span::raw(" move  "),
            Span::styled("/", Style::default().fg(Color::LightYellow)),
            Span::raw(" search  "),
            Span::styled("s/o", Style::default().fg(Color::LightYellow)),
            Span::raw(" sort  "),
            Span::styled("c/t", Style::default().fg(Color::LightYellow)),
            Span::raw(" category/tag  "),
        ];
        if self.store.view().tab == Tab::Trash {
            spans.extend([
                Span::styled("r", Style::default().fg(Color::LightGreen)),
                Span::raw(" restore  "),
                Span::styled("x", Style::default().fg(Color::LightRed)),
                Span::raw(" purge  "),
            ]);
        } else {
            spans.extend([
                Span::styled("n", Style::default().fg(Color::LightMagenta)),
                Span::raw(" new  "),
                Span::styled("e", Style::default().fg(Color::LightYellow)),
                Span::raw(" edit  "),
                Span::styled("p/f", Style::default().fg(Color::LightGreen)),
                Span::raw(" pin/fav  "),
                Span::styled("d", Style::default().fg(Color::LightRed)),
                Span::raw(" trash  "),
            ]);
        }
        spans.extend([
            Span::styled("q", Style::default().fg(Color::LightRed)),
            Span::raw(" quit"),
        ]);
        Line::from(spans)
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, title: &str, form: &NoteForm) {
        let area = centered_rect(70, 60, f.size());
        let mut fields = Vec::new();
        fields.push(field_line("Title", &form.title, form.field == FormField::Title));
        let content_label = if form.source.is_some() {
            "Markup"
        } else {
            "Content"
        };
        fields.push(field_line(
            content_label,
            &form.content,
            form.field == FormField::Content,
        ));
        fields.push(field_line("Tags", &form.tags, form.field == FormField::Tags));
        fields.push(field_line(
            "Category",
            &form.category,
            form.field == FormField::Category,
        ));
        fields.push(Line::from(""));
        fields.push(Line::from(Span::styled(
            "Enter to save • Esc to cancel • Tab/Shift-Tab to move",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(fields)
            .block(
                Block::default()
                    .title(Span::styled(
                        title.to_string(),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_search(&self, f: &mut ratatui::Frame<'_>, field: &FieldValue) {
        let area = centered_rect(60, 20, f.size());
        let dialog = Paragraph::new(field_line("Search", field, true)).block(
            Block::default()
                .title("Search")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightYellow)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, note_id: &str) {
        let area = centered_rect(50, 30, f.size());
        let title = self
            .store
            .note(note_id)
            .map(|(n, _)| n.title.clone())
            .unwrap_or_else(|| note_id.to_string());
        let body = vec![
            Line::from(Span::styled(
                format!("Permanently delete \"{}\"?", title),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("This cannot be undone. Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(Span::styled(
                        "Confirm Delete",
                        Style::default()
                            .fg(Color::LightRed)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightRed)),
            );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

impl NoteForm {
    fn new() -> Self {
        NoteForm {
            title: FieldValue::new(""),
            content: FieldValue::new(""),
            tags: FieldValue::new(""),
            category: FieldValue::new(DEFAULT_CATEGORY_ID),
            field: FormField::Title,
            source: None,
        }
    }

    fn from_note(note: &Note) -> Self {
        let tags = note.tags.iter().cloned().collect::<Vec<_>>().join(" ");
        NoteForm {
            title: FieldValue::new(&note.title),
            content: FieldValue::new(&note.content),
            tags: FieldValue::new(&tags),
            category: FieldValue::new(&note.category),
            field: FormField::Title,
            source: Some(note.clone()),
        }
    }

    /// Only the fields that differ from the loaded note.
    fn edit_patch(&self) -> NotePatch {
        let Some(source) = &self.source else {
            return NotePatch::default();
        };
        let title = self.title.value.trim();
        let category = self.category.value.trim();
        let tags = parse_tags(&self.tags.value);
        NotePatch {
            title: (title != source.title.trim()).then(|| title.to_string()),
            content: (self.content.value != source.content).then(|| self.content.value.clone()),
            category: (category != source.category).then(|| category.to_string()),
            tags: (tags != source.tags).then_some(tags),
            ..NotePatch::default()
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Content,
            FormField::Content => FormField::Tags,
            FormField::Tags => FormField::Category,
            FormField::Category => FormField::Title,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Category,
            FormField::Content => FormField::Title,
            FormField::Tags => FormField::Content,
            FormField::Category => FormField::Tags,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            FormField::Title => &mut self.title,
            FormField::Content => &mut self.content,
            FormField::Tags => &mut self.tags,
            FormField::Category => &mut self.category,
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Wraps plain form input in a paragraph, escaping markup characters.
fn text_to_html(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let escaped = trimmed
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!("<p>{}</p>", escaped)
}

fn parse_tags(input: &str) -> std::collections::BTreeSet<String> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .collect()
}

/// Next id after `current`, wrapping to "none" after the last one.
fn next_in_cycle(ids: &[String], current: Option<&str>) -> Option<String> {
    match current.and_then(|c| ids.iter().position(|id| id == c)) {
        None => ids.first().cloned(),
        Some(idx) => ids.get(idx + 1).cloned(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebox::StoreScope;
    use std::path::PathBuf;

    fn seeded_app() -> App {
        let mut store = NoteStore::new();
        store.initialize();
        App::new(
            store,
            StoreLocation {
                path: PathBuf::from("store.yml"),
                scope: StoreScope::Explicit,
            },
        )
    }

    fn edit_form(app: &App, id: &str) -> NoteForm {
        NoteForm::from_note(app.store.note(id).unwrap().0)
    }

    #[test]
    fn title_only_edit_keeps_stored_markup() {
        let mut app = seeded_app();
        let before = app.store.note("2").unwrap().0.clone();
        let mut form = edit_form(&app, "2");
        form.title = FieldValue::new("Q2 Planning");
        app.submit_form(Some("2"), &form);

        let after = app.store.note("2").unwrap().0;
        assert_eq!(after.title, "Q2 Planning");
        assert_eq!(after.content, before.content);
        assert_eq!(after.tags, before.tags);
        assert_eq!(after.category, before.category);
    }

    #[test]
    fn unchanged_edit_leaves_note_alone() {
        let mut app = seeded_app();
        let before = app.store.note("3").unwrap().0.clone();
        let form = edit_form(&app, "3");
        app.submit_form(Some("3"), &form);
        assert_eq!(app.store.note("3").unwrap().0, &before);
        assert_eq!(app.status, "No changes to 3");
    }

    #[test]
    fn content_edit_stores_markup_as_typed() {
        let mut app = seeded_app();
        let mut form = edit_form(&app, "4");
        form.content = FieldValue::new("<h2>Today</h2><ul><li>ship</li></ul>");
        app.submit_form(Some("4"), &form);
        assert_eq!(
            app.store.note("4").unwrap().0.content,
            "<h2>Today</h2><ul><li>ship</li></ul>"
        );
    }

    #[test]
    fn blank_category_edit_falls_back_to_default() {
        let mut app = seeded_app();
        let mut form = edit_form(&app, "2");
        form.category = FieldValue::new("  ");
        app.submit_form(Some("2"), &form);
        assert_eq!(app.store.note("2").unwrap().0.category, DEFAULT_CATEGORY_ID);
    }

    #[test]
    fn moving_cursor_selects_highlighted_note() {
        let mut app = seeded_app();
        app.move_cursor(1);
        let highlighted = app.current_note().unwrap().id.clone();
        assert_eq!(app.store.selected_id(), Some(highlighted.as_str()));
        assert!(app.status.starts_with("Loaded notes"));
    }

    #[test]
    fn new_note_form_wraps_plain_text() {
        let mut app = seeded_app();
        let mut form = NoteForm::new();
        form.title = FieldValue::new("Errands");
        form.content = FieldValue::new("milk & eggs");
        app.submit_form(None, &form);
        let note = app.store.active()[0].clone();
        assert_eq!(note.title, "Errands");
        assert_eq!(note.content, "<p>milk &amp; eggs</p>");
        assert_eq!(app.store.selected_id(), Some(note.id.as_str()));
    }

    #[test]
    fn next_in_cycle_wraps_through_none() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(next_in_cycle(&ids, None).as_deref(), Some("a"));
        assert_eq!(next_in_cycle(&ids, Some("a")).as_deref(), Some("b"));
        assert_eq!(next_in_cycle(&ids, Some("b")), None);
        assert_eq!(next_in_cycle(&ids, Some("gone")).as_deref(), Some("a"));
    }

    #[test]
    fn form_text_is_escaped_into_a_paragraph() {
        assert_eq!(text_to_html("  "), "");
        assert_eq!(text_to_html("a < b & c"), "<p>a &lt; b &amp; c</p>");
        assert_eq!(plain_text(&text_to_html("a < b & c")), "a < b & c");
    }

    #[test]
    fn parse_tags_splits_on_commas_and_spaces() {
        let tags = parse_tags("todo, idea  todo");
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("idea"));
    }

    #[test]
    fn field_value_edits_on_char_boundaries() {
        let mut field = FieldValue::new("hé");
        field.backspace();
        assert_eq!(field.value, "h");
        field.move_left();
        field.insert_char('a');
        assert_eq!(field.value, "ah");
        field.move_right();
        field.insert_char('!');
        assert_eq!(field.value, "ah!");
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        assert_eq!(truncate_text("abcdef", 5), "ab...");
        assert_eq!(truncate_text("abc", 5), "abc");
    }
}
