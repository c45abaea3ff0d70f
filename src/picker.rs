//! Interactive selection of scripts to run.
//!
//! The picker shows one row per workspace operation, build mode, and
//! project, grouped under headers. Arrow keys move between rows and cycle
//! each row's script choice; Enter confirms the whole set, Esc or `q`
//! aborts. It owns the terminal (raw mode, alternate screen) only while
//! running and yields an ordered list of `Selection`s, one per row.

use std::io::{self, Stdout};

use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Terminal;

use crate::plan::{Selection, GROUPS, SKIP_SCRIPT};
use crate::store::SavedSelections;
use crate::workspace::Workspace;

const PROJECTS_GROUP_LABEL: &str = "Projects";

/// One selectable row of the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRow {
    /// Header this row is grouped under.
    pub group: String,
    /// Package (or reserved group) name the row's selection will carry.
    pub package_name: String,
    /// Display label.
    pub label: String,
    /// Offered script names; the skip sentinel is always first.
    pub choices: Vec<String>,
    /// Index of the currently chosen script.
    pub selected: usize,
}

type PickerTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Builds the picker rows for one cycle: workspace operations, the build
/// mode, and one row per project, seeded with the previous cycle's saved
/// choices. Project script names are restricted by the include/exclude
/// filters; projects with no offered script left are omitted.
pub fn build_rows(
    workspace: &Workspace,
    saved: &SavedSelections,
    include: &[String],
    exclude: &[String],
) -> Vec<ChoiceRow> {
    let mut rows = Vec::new();
    let mut groups = GROUPS;
    groups.sort_by_key(|group| group.sort_key);

    for group in groups {
        if group.allow_multiple {
            // One toggle row per operation, so several can be on at once.
            for script in group.scripts {
                rows.push(ChoiceRow {
                    group: group.label.to_string(),
                    package_name: group.package_name.to_string(),
                    label: script.to_string(),
                    choices: vec![SKIP_SCRIPT.to_string(), script.to_string()],
                    selected: 0,
                });
            }
        } else {
            let mut choices = vec![SKIP_SCRIPT.to_string()];
            choices.extend(group.scripts.iter().map(|s| s.to_string()));
            rows.push(ChoiceRow {
                group: group.label.to_string(),
                package_name: group.package_name.to_string(),
                label: group.label.to_lowercase(),
                choices,
                selected: 0,
            });
        }
    }

    for project in &workspace.projects {
        let mut choices = vec![SKIP_SCRIPT.to_string()];
        choices.extend(
            project
                .scripts
                .iter()
                .filter(|script| script_allowed(script, include, exclude))
                .cloned(),
        );
        if choices.len() == 1 {
            continue;
        }
        let selected = saved
            .get(&project.package_name)
            .and_then(|script| choices.iter().position(|choice| choice == script))
            .unwrap_or(0);
        rows.push(ChoiceRow {
            group: PROJECTS_GROUP_LABEL.to_string(),
            package_name: project.package_name.clone(),
            label: project.package_name.clone(),
            choices,
            selected,
        });
    }

    rows
}

fn script_allowed(script: &str, include: &[String], exclude: &[String]) -> bool {
    if exclude.iter().any(|name| name == script) {
        return false;
    }
    include.is_empty() || include.iter().any(|name| name == script)
}

/// Runs the picker and returns the confirmed selections in row order, or
/// `None` when the operator aborted. Terminal failures propagate as errors.
pub fn run(mut rows: Vec<ChoiceRow>) -> Result<Option<Vec<Selection>>> {
    if rows.is_empty() {
        return Ok(Some(Vec::new()));
    }
    let mut terminal = init_terminal().context("failed to initialize terminal")?;
    let result = event_loop(&mut terminal, &mut rows);
    restore_terminal(terminal).context("failed to restore terminal")?;
    result
}

fn init_terminal() -> io::Result<PickerTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: PickerTerminal) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn event_loop(
    terminal: &mut PickerTerminal,
    rows: &mut [ChoiceRow],
) -> Result<Option<Vec<Selection>>> {
    let mut cursor = 0usize;
    loop {
        draw(terminal, rows, cursor)?;
        match crossterm::event::read().context("failed to read terminal event")? {
            Event::Key(key) => match handle_key(key, rows, &mut cursor) {
                PickerAction::None => {}
                PickerAction::Confirm => return Ok(Some(selections(rows))),
                PickerAction::Abort => return Ok(None),
            },
            Event::Resize(_, _) => {
                terminal.autoresize()?;
            }
            _ => {}
        }
    }
}

enum PickerAction {
    None,
    Confirm,
    Abort,
}

fn handle_key(key: KeyEvent, rows: &mut [ChoiceRow], cursor: &mut usize) -> PickerAction {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => PickerAction::Abort,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => PickerAction::Abort,
        KeyCode::Enter => PickerAction::Confirm,
        KeyCode::Up | KeyCode::Char('k') => {
            *cursor = cursor.saturating_sub(1);
            PickerAction::None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            *cursor = (*cursor + 1).min(rows.len().saturating_sub(1));
            PickerAction::None
        }
        KeyCode::Left | KeyCode::Char('h') => {
            cycle(&mut rows[*cursor], -1);
            PickerAction::None
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
            cycle(&mut rows[*cursor], 1);
            PickerAction::None
        }
        _ => PickerAction::None,
    }
}

fn cycle(row: &mut ChoiceRow, delta: isize) {
    let len = row.choices.len() as isize;
    let next = (row.selected as isize + delta).rem_euclid(len);
    row.selected = next as usize;
}

fn selections(rows: &[ChoiceRow]) -> Vec<Selection> {
    rows.iter()
        .map(|row| Selection::new(row.package_name.clone(), row.choices[row.selected].clone()))
        .collect()
}

fn draw(terminal: &mut PickerTerminal, rows: &[ChoiceRow], cursor: usize) -> Result<()> {
    terminal.draw(|frame| {
        let area = frame.size();
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(3)])
            .split(area);

        let mut items = Vec::new();
        let mut highlighted = 0;
        let mut ui_index = 0;
        let mut last_group: Option<&str> = None;

        for (row_index, row) in rows.iter().enumerate() {
            if last_group != Some(row.group.as_str()) {
                items.push(ListItem::new(Line::from(vec![
                    Span::styled("▼ ", Style::default().fg(Color::DarkGray)),
                    Span::styled(row.group.clone(), Style::default().fg(Color::DarkGray)),
                ])));
                ui_index += 1;
                last_group = Some(row.group.as_str());
            }

            let is_cursor = row_index == cursor;
            if is_cursor {
                highlighted = ui_index;
            }

            let marker = if is_cursor { "▶ " } else { "  " };
            let choice = &row.choices[row.selected];
            let choice_style = if choice == SKIP_SCRIPT {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            };
            let label_style = if is_cursor {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            items.push(ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Cyan)),
                Span::styled(format!("{:<24}", row.label), label_style),
                Span::styled("‹ ", Style::default().fg(Color::DarkGray)),
                Span::styled(choice.clone(), choice_style),
                Span::styled(" ›", Style::default().fg(Color::DarkGray)),
            ])));
            ui_index += 1;
        }

        let border_style = Style::default().fg(Color::DarkGray);
        let list = List::new(items).block(
            Block::default()
                .title("Select scripts")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border_style),
        );
        let mut state = ListState::default();
        state.select(Some(highlighted));
        frame.render_stateful_widget(list, vertical[0], &mut state);

        let help = Paragraph::new(Line::from(Span::styled(
            "↑/↓ select | ←/→ choose | Enter run | q quit",
            Style::default().fg(Color::DarkGray),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border_style),
        );
        frame.render_widget(help, vertical[1]);
    })?;
    Ok(())
}
