use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Terminal,
};
use std::{
    io,
    time::{Duration, Instant},
};
use taskers::{
    api::TaskApi,
    app::App,
    notice::{Notice, NoticeLevel},
    projection::{self, TaskFilter},
    render::{Status, TaskCard},
    task::{default_end, parse_timestamp, Priority, TaskDraft, TaskId, TaskRecord},
    task_store::TaskStore,
    Error,
};

const COLUMNS: [Status; 2] = [Status::Pending, Status::Completed];
const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Default)]
pub struct Board {
    selected_status: usize,
    selected_task: usize,
    category: Option<String>,
    pending_delete: Option<TaskId>,
}

impl Board {
    fn column_tasks<'a>(&self, store: &'a TaskStore, status: Status) -> Vec<&'a TaskRecord> {
        let criteria = TaskFilter {
            category: self.category.as_deref(),
            done: Some(status == Status::Completed),
            priority: None,
        };
        projection::filter(store, &criteria)
    }

    fn selected<'a>(&self, store: &'a TaskStore) -> Option<&'a TaskRecord> {
        self.column_tasks(store, COLUMNS[self.selected_status])
            .get(self.selected_task)
            .copied()
    }

    /// Keeps the cursor inside the current column after the store changes.
    fn clamp(&mut self, store: &TaskStore) {
        let len = self.column_tasks(store, COLUMNS[self.selected_status]).len();
        self.selected_task = self.selected_task.min(len.saturating_sub(1));
    }

    fn cycle_category(&mut self, store: &TaskStore) {
        let categories = projection::categories(store);
        self.category = match &self.category {
            None => categories.first().map(|c| c.to_string()),
            Some(current) => categories
                .iter()
                .position(|c| *c == current.as_str())
                .and_then(|i| categories.get(i + 1))
                .map(|c| c.to_string()),
        };
        self.selected_task = 0;
    }
}

pub async fn run_app<B: Backend, A: TaskApi>(
    terminal: &mut Terminal<B>,
    app: &mut App<A>,
) -> io::Result<()> {
    let mut board = Board::default();
    loop {
        board.clamp(app.store());
        let notices: Vec<Notice> = app.notices().active(Instant::now()).cloned().collect();
        terminal.draw(|f| draw(f, app, &board, &notices))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(id) = board.pending_delete.take() {
            if let KeyCode::Char('y') = key.code {
                let _ = app.delete_task(id).await;
            } else {
                app.notices().push(Notice::info("Delete cancelled"));
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') => return Ok(()),
            KeyCode::Char('r') => {
                let _ = app.refresh().await;
            }
            KeyCode::Left => {
                if board.selected_status > 0 {
                    board.selected_status -= 1;
                    board.selected_task = 0;
                }
            }
            KeyCode::Right => {
                if board.selected_status < COLUMNS.len() - 1 {
                    board.selected_status += 1;
                    board.selected_task = 0;
                }
            }
            KeyCode::Up => {
                if board.selected_task > 0 {
                    board.selected_task -= 1;
                }
            }
            KeyCode::Down => {
                let max_tasks = board
                    .column_tasks(app.store(), COLUMNS[board.selected_status])
                    .len();
                if board.selected_task + 1 < max_tasks {
                    board.selected_task += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char('t') => {
                if let Some(id) = board.selected(app.store()).map(|t| t.id) {
                    let _ = app.toggle_task(id).await;
                }
            }
            KeyCode::Char('d') => {
                if let Some(task) = board.selected(app.store()) {
                    let message = format!("Delete task {}? Press y to confirm", task.id);
                    board.pending_delete = Some(task.id);
                    app.notices().push(Notice::info(message));
                }
            }
            KeyCode::Char('c') => board.cycle_category(app.store()),
            KeyCode::Char('a') => {
                let draft = suspended(terminal, || read_draft(None))?;
                match draft {
                    Ok(Some(draft)) => {
                        let _ = app.add_task(draft).await;
                    }
                    Ok(None) => {}
                    Err(err) => app.notices().push(Notice::from_error("add task", &err)),
                }
            }
            KeyCode::Char('e') => {
                let Some(task) = board.selected(app.store()) else {
                    continue;
                };
                let (id, base) = (task.id, task.to_draft());
                let draft = suspended(terminal, || read_draft(Some(base)))?;
                match draft {
                    Ok(Some(draft)) => {
                        let _ = app.edit_task(id, draft).await;
                    }
                    Ok(None) => {}
                    Err(err) => app.notices().push(Notice::from_error("update task", &err)),
                }
            }
            KeyCode::Char('/') => {
                let input = suspended(terminal, || prompt("Enter task ID"))?;
                if let Some(input) = input.filter(|i| !i.is_empty()) {
                    match input.parse::<TaskId>() {
                        Ok(id) => {
                            if let Ok(task) = app.search(id) {
                                focus(&mut board, app.store(), &task);
                            }
                        }
                        Err(err) => app.notices().push(Notice::from_error("find task", &err)),
                    }
                }
            }
            _ => {}
        }
    }
}

/// Moves the cursor onto `task`, clearing a category filter that hides it.
fn focus(board: &mut Board, store: &TaskStore, task: &TaskRecord) {
    if board.category.as_deref().is_some_and(|c| c != task.category) {
        board.category = None;
    }
    let status = Status::from(task.done);
    board.selected_status = COLUMNS.iter().position(|s| *s == status).unwrap_or(0);
    board.selected_task = board
        .column_tasks(store, status)
        .iter()
        .position(|t| t.id == task.id)
        .unwrap_or(0);
}

fn draw<A: TaskApi>(f: &mut ratatui::Frame, app: &App<A>, board: &Board, notices: &[Notice]) {
    let now = Local::now().naive_local();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    let stats = app.statistics(now);
    let user = app.user().map(|u| u.name.as_str()).unwrap_or("signed out");
    let filter = board.category.as_deref().unwrap_or("all categories");
    let header = Paragraph::new(Line::from(vec![
        Span::styled(user, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            " | {filter} | total {} | done {} | pending {} | high {} | today {} | ",
            stats.total_tasks,
            stats.completed_tasks,
            stats.pending_tasks,
            stats.high_priority_tasks,
            stats.today_tasks,
        )),
        Span::styled(
            format!("overdue {}", stats.overdue_tasks),
            Style::default().fg(if stats.overdue_tasks > 0 {
                Color::Red
            } else {
                Color::Reset
            }),
        ),
    ]))
    .block(Block::default().title("taskers").borders(Borders::ALL));
    f.render_widget(header, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    for (i, status) in COLUMNS.iter().enumerate() {
        let tasks = board.column_tasks(app.store(), *status);
        let items: Vec<ListItem> = tasks
            .iter()
            .map(|t| task_item(&TaskCard::new(t, now)))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(status.to_string())
                    .borders(Borders::ALL)
                    .border_style(if board.selected_status == i {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default()
                    }),
            )
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));

        let mut state = ListState::default();
        if board.selected_status == i && !tasks.is_empty() {
            state.select(Some(board.selected_task));
        }
        f.render_stateful_widget(list, chunks[i], &mut state);
    }

    let footer = match notices.last() {
        Some(notice) => Paragraph::new(notice.message.as_str()).style(notice_style(notice.level)),
        None => Paragraph::new(
            "q quit  r refresh  a add  e edit  t toggle  d delete  c category  / search",
        ),
    };
    f.render_widget(footer.block(Block::default().borders(Borders::ALL)), rows[2]);
}

fn task_item(card: &TaskCard) -> ListItem<'static> {
    let mut description = Style::default().fg(match card.priority {
        Priority::High => Color::LightRed,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::White,
    });
    if card.is_overdue {
        description = description.add_modifier(Modifier::UNDERLINED);
    }
    let mut spans = vec![
        Span::raw(format!("[#{}] ", card.id)),
        Span::styled(card.description.clone(), description),
        Span::raw(format!(" ({}) Due: {}", card.category, card.end)),
    ];
    if card.is_overdue {
        spans.push(Span::styled(" OVERDUE", Style::default().fg(Color::Red)));
    }
    ListItem::new(Line::from(spans))
}

fn notice_style(level: NoticeLevel) -> Style {
    match level {
        NoticeLevel::Error => Style::default().fg(Color::Red),
        NoticeLevel::Success => Style::default().fg(Color::Green),
        NoticeLevel::Info => Style::default(),
    }
}

/// Leaves the board so `f` can use plain stdin/stdout, then restores it.
fn suspended<B: Backend, T>(terminal: &mut Terminal<B>, f: impl FnOnce() -> T) -> io::Result<T> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    let result = f();
    execute!(io::stdout(), EnterAlternateScreen)?;
    enable_raw_mode()?;
    terminal.clear()?;
    Ok(result)
}

fn prompt(message: &str) -> Option<String> {
    println!("{}", message);
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        Some(input.trim().to_string())
    } else {
        None
    }
}

/// Prompts for every draft field. With a `base`, an empty answer keeps the
/// current value. `Ok(None)` means the user gave up on a required field.
fn read_draft(base: Option<TaskDraft>) -> taskers::Result<Option<TaskDraft>> {
    fn ask(label: &str, current: Option<String>) -> Option<String> {
        let message = match &current {
            Some(value) => format!("{label} [{value}]"),
            None => label.to_string(),
        };
        let answer = prompt(&message)?;
        if answer.is_empty() {
            current
        } else {
            Some(answer)
        }
    }

    let default_start = Local::now().naive_local();
    let suggested_end = default_end(default_start)?;
    let format = |t: chrono::NaiveDateTime| t.format("%Y-%m-%dT%H:%M").to_string();

    let Some(description) = ask("Enter task description", base.as_ref().map(|b| b.description.clone())) else {
        return Ok(None);
    };
    let category = ask(
        "Category",
        Some(base.as_ref().map_or("Personal".to_string(), |b| b.category.clone())),
    )
    .unwrap_or_default();
    let priority = ask(
        "Priority (Low/Medium/High)",
        Some(base.as_ref().map_or(Priority::Medium, |b| b.priority).to_string()),
    )
    .unwrap_or_default()
    .parse::<Priority>()?;
    let start = ask(
        "Start (YYYY-MM-DDTHH:MM)",
        Some(format(base.as_ref().map_or(default_start, |b| b.start_time))),
    )
    .ok_or_else(|| Error::Validation("start time is required".into()))?;
    let end = ask(
        "End (YYYY-MM-DDTHH:MM)",
        Some(format(base.as_ref().map_or(suggested_end, |b| b.end_time))),
    )
    .ok_or_else(|| Error::Validation("end time is required".into()))?;
    let notes = ask("Notes", base.as_ref().map(|b| b.notes.clone())).unwrap_or_default();

    Ok(Some(TaskDraft {
        description,
        category,
        priority,
        start_time: parse_timestamp(&start)?,
        end_time: parse_timestamp(&end)?,
        notes,
    }))
}
