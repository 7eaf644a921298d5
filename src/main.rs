mod ui;

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs, io, path::PathBuf};
use taskers::{
    api::{ApiClient, RegisterRequest, TaskApi},
    app::App,
    config::Settings,
    notice::{NoticeBoard, NoticeLevel},
    projection::{self, TaskFilter},
    render::{self, TaskCard},
    session::{self, OAuthProvider, SessionStore},
    task::{default_end, parse_timestamp, Priority, TaskDraft, TaskId},
    Error,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "taskers", version, about = "Terminal client for the task-scheduler API")]
struct Cli {
    /// Overrides `api_base` from taskers.toml / TASKERS_API_BASE
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusFilter {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        name: String,
        email: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Print the URL that starts an OAuth sign-in (google or github)
    Oauth { provider: String },
    /// Finish an OAuth sign-in from the URL the browser was sent back to
    OauthCallback { url: String },
    /// Forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List tasks
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        #[arg(long)]
        priority: Option<String>,
    },
    /// Show one task by id
    Show { id: String },
    /// Add a task; start defaults to now and end to one hour later
    Add {
        description: String,
        #[arg(long, default_value = "Personal")]
        category: String,
        #[arg(long, default_value = "Medium")]
        priority: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Edit a task; omitted fields keep their current value
    Edit {
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Flip a task between pending and completed
    Toggle { id: String },
    /// Mark a task completed
    Complete { id: String },
    /// Mark a completed task pending again
    Reopen { id: String },
    /// Delete a task
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show task statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// List the categories in use
    Categories,
    /// Write tasks and statistics as an HTML page
    ExportHtml {
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Open the interactive board
    Board,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(api_base) = cli.api_base {
        settings.api_base = api_base;
    }

    let api = ApiClient::from_settings(&settings)?;
    let mut app = App::new(
        api,
        SessionStore::new(&settings.session_file),
        NoticeBoard::new(settings.notice_ttl()),
    );

    let outcome = run(cli.command, &mut app, &settings).await;

    let mut reported = false;
    for notice in app.notices().drain() {
        reported |= notice.level == NoticeLevel::Error;
        match notice.level {
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
            _ => eprintln!("{}", notice.message),
        }
    }
    if let Err(err) = outcome {
        if !reported {
            eprintln!("error: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run<A: TaskApi>(
    command: Commands,
    app: &mut App<A>,
    settings: &Settings,
) -> taskers::Result<()> {
    let now = Local::now().naive_local();
    match command {
        Commands::Login { email, password } => {
            let password = password.map_or_else(|| read_secret("Password"), Ok)?;
            app.login(&email, &password).await
        }
        Commands::Register {
            name,
            email,
            password,
            confirm_password,
        } => {
            let password = password.map_or_else(|| read_secret("Password"), Ok)?;
            let confirm_password =
                confirm_password.map_or_else(|| read_secret("Confirm password"), Ok)?;
            app.register(&RegisterRequest {
                name,
                email,
                password,
                confirm_password,
            })
            .await
        }
        Commands::Oauth { provider } => {
            let provider: OAuthProvider = provider.parse()?;
            let url = session::authorize_url(&settings.api_base, provider, &settings.redirect_uri)?;
            println!("Open this URL in a browser, then pass the page you land on to `taskers oauth-callback`:");
            println!("{url}");
            Ok(())
        }
        Commands::OauthCallback { url } => app.complete_oauth(&url).await,
        Commands::Logout => app.sign_out(),
        Commands::Whoami => {
            signed_in(app).await?;
            if let Some(user) = app.user() {
                match &user.email {
                    Some(email) => println!("{} <{}>", user.name, email),
                    None => println!("{}", user.name),
                }
            }
            Ok(())
        }
        Commands::List {
            category,
            status,
            priority,
        } => {
            signed_in(app).await?;
            let priority = priority.map(|p| p.parse::<Priority>()).transpose()?;
            let criteria = TaskFilter {
                category: category.as_deref(),
                done: status.map(|s| matches!(s, StatusFilter::Completed)),
                priority,
            };
            let tasks = projection::filter(app.store(), &criteria);
            if tasks.is_empty() {
                println!("No tasks found. Add your first task!");
            }
            for card in render::render(tasks, now) {
                println!("{card}");
            }
            Ok(())
        }
        Commands::Show { id } => {
            let id: TaskId = id.parse()?;
            signed_in(app).await?;
            let task = app.search(id)?;
            println!("{}", TaskCard::new(&task, now).details());
            Ok(())
        }
        Commands::Add {
            description,
            category,
            priority,
            start,
            end,
            notes,
        } => {
            let start_time = match start {
                Some(start) => parse_timestamp(&start)?,
                None => now,
            };
            let end_time = match end {
                Some(end) => parse_timestamp(&end)?,
                None => default_end(start_time)?,
            };
            let draft = TaskDraft {
                description,
                category,
                priority: priority.parse()?,
                start_time,
                end_time,
                notes,
            };
            signed_in(app).await?;
            let created = app.add_task(draft).await?;
            println!("{}", TaskCard::new(&created, now));
            Ok(())
        }
        Commands::Edit {
            id,
            description,
            category,
            priority,
            start,
            end,
            notes,
        } => {
            let id: TaskId = id.parse()?;
            signed_in(app).await?;
            let mut draft = app.draft_for(id)?;
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(category) = category {
                draft.category = category;
            }
            if let Some(priority) = priority {
                draft.priority = priority.parse()?;
            }
            if let Some(start) = start {
                draft.start_time = parse_timestamp(&start)?;
            }
            if let Some(end) = end {
                draft.end_time = parse_timestamp(&end)?;
            }
            if let Some(notes) = notes {
                draft.notes = notes;
            }
            app.edit_task(id, draft).await
        }
        Commands::Toggle { id } => {
            let id: TaskId = id.parse()?;
            signed_in(app).await?;
            app.toggle_task(id).await
        }
        Commands::Complete { id } => {
            let id: TaskId = id.parse()?;
            signed_in(app).await?;
            app.complete_task(id).await
        }
        Commands::Reopen { id } => {
            let id: TaskId = id.parse()?;
            signed_in(app).await?;
            app.reopen_task(id).await
        }
        Commands::Delete { id, yes } => {
            let id: TaskId = id.parse()?;
            if !yes && !confirm("Are you sure you want to delete this task?")? {
                println!("Cancelled");
                return Ok(());
            }
            signed_in(app).await?;
            app.delete_task(id).await
        }
        Commands::Stats { json } => {
            signed_in(app).await?;
            let stats = app.statistics(now);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            println!("Total:          {}", stats.total_tasks);
            println!("Completed:      {}", stats.completed_tasks);
            println!("Pending:        {}", stats.pending_tasks);
            println!("High priority:  {}", stats.high_priority_tasks);
            println!("Today:          {}", stats.today_tasks);
            println!("Overdue:        {}", stats.overdue_tasks);
            println!("Starting soon:  {}", stats.starting_soon_tasks);
            for (category, count) in &stats.by_category {
                println!("  {category}: {count}");
            }
            Ok(())
        }
        Commands::Categories => {
            signed_in(app).await?;
            for category in projection::categories(app.store()) {
                println!("{category}");
            }
            Ok(())
        }
        Commands::ExportHtml { out, category } => {
            signed_in(app).await?;
            let tasks = projection::filter_by_category(app.store(), category.as_deref());
            let page = format!(
                "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Tasks</title></head>\n<body>\n{}\n{}\n</body>\n</html>\n",
                render::render_statistics_html(&app.statistics(now))?,
                render::render_html(tasks, now)?,
            );
            match out {
                Some(path) => {
                    fs::write(&path, page)?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{page}"),
            }
            Ok(())
        }
        Commands::Board => {
            signed_in(app).await?;
            run_board(app).await
        }
    }
}

/// Resumes the saved session; commands that need tasks start here.
async fn signed_in<A: TaskApi>(app: &mut App<A>) -> taskers::Result<()> {
    if app.resume().await? {
        Ok(())
    } else {
        Err(Error::Auth(
            "Please login first (taskers login <email>)".into(),
        ))
    }
}

async fn run_board<A: TaskApi>(app: &mut App<A>) -> taskers::Result<()> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result.map_err(Error::from)
}

fn read_secret(label: &str) -> taskers::Result<String> {
    eprintln!("{label}:");
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(message: &str) -> taskers::Result<bool> {
    eprintln!("{message} [y/N]");
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim(), "y" | "Y" | "yes"))
}
