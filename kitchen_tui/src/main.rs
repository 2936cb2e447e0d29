use anyhow::{Context, Result, bail};
use clap::Parser;
use kitchen_core::{
    AgentId, Position,
    agent::AgentState,
    executor::{EpisodeOutcome, ExecutorConfig, TaskExecutor},
    kitchen::{Fixture, FoodKind, Kitchen, Object},
    layout::{Layout as KitchenLayout, Level, load_level_from_string},
    task::{LETTUCE_SALAD_PLAN, Task, parse_plan},
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// History entries shown per agent.
const HISTORY_LINES: usize = 6;

#[derive(Parser, Debug)]
#[command(version, about = "Two cooks, one kitchen: runs a task plan step by step", long_about = None)]
struct Args {
    /// Built-in kitchen to load
    #[arg(short, long, default_value = "open-divider")]
    layout: KitchenLayout,

    /// Map file to load instead of a built-in layout
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Plan file, one `agent<N>.<skill>(<item>)` per line; defaults to the lettuce salad
    #[arg(short, long, value_name = "PLAN_FILE")]
    plan: Option<PathBuf>,

    /// Step budget; defaults to the layout's own budget
    #[arg(long)]
    max_steps: Option<u64>,

    /// Run to completion without the terminal UI and print a summary
    #[arg(long)]
    headless: bool,

    /// Milliseconds between simulation steps in the UI
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Write logs to this file (the UI otherwise runs without logging)
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

struct App {
    executor: TaskExecutor<Kitchen>,
    title: String,
    /// Flag to control the main loop.
    should_quit: bool,
    paused: bool,
}

impl App {
    fn new(executor: TaskExecutor<Kitchen>, title: String) -> Self {
        App {
            executor,
            title,
            should_quit: false,
            paused: false,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.paused || self.executor.outcome().is_some() {
            return;
        }
        self.executor.tick();
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let (level, title, default_max_steps) = load_level(&args)?;
    let tasks = load_plan(args.plan.as_deref())?;
    let config = ExecutorConfig {
        max_steps: args.max_steps.unwrap_or(default_max_steps),
    };
    info!(kitchen = %title, tasks = tasks.len(), max_steps = config.max_steps, "starting");
    let executor = TaskExecutor::from_level(level, tasks, config);

    if args.headless {
        return run_headless(executor);
    }

    let mut terminal = setup_terminal()?;
    let mut app = App::new(executor, title);
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal)?;
    result
}

/// Logs go to stderr when headless. The UI owns the terminal, so there they go to
/// `--log-file` or nowhere.
fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if args.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

fn load_level(args: &Args) -> Result<(Level, String, u64)> {
    match &args.map {
        Some(path) => {
            let map = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read map file {}", path.display()))?;
            let level = load_level_from_string(&map)
                .with_context(|| format!("Failed to load map {}", path.display()))?;
            Ok((
                level,
                path.display().to_string(),
                ExecutorConfig::default().max_steps,
            ))
        }
        None => {
            let level = args
                .layout
                .level()
                .with_context(|| format!("Failed to load layout {}", args.layout))?;
            Ok((
                level,
                args.layout.to_string(),
                args.layout.default_max_steps(),
            ))
        }
    }
}

fn load_plan(path: Option<&Path>) -> Result<Vec<Task>> {
    let Some(path) = path else {
        return Ok(parse_plan(LETTUCE_SALAD_PLAN)?);
    };
    let plan = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;
    parse_plan(&plan).with_context(|| format!("Failed to parse plan {}", path.display()))
}

fn run_headless(mut executor: TaskExecutor<Kitchen>) -> Result<()> {
    let outcome = executor.run();
    for agent in executor.agents() {
        println!("agent{}:", agent.id());
        for entry in agent.history() {
            println!("  {entry}");
        }
    }
    match outcome {
        EpisodeOutcome::Success { steps, delivered } => {
            println!("success after {steps} steps, {delivered} delivered");
            Ok(())
        }
        EpisodeOutcome::Incomplete {
            steps,
            completed_tasks,
        } => bail!(
            "incomplete after {steps} steps: {completed_tasks} of {} tasks done",
            executor.queue().len()
        ),
    }
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.toggle_pause(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(3)])
        .split(frame.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[1]);

    render_map(frame, columns[0], app.executor.env(), &app.title);
    render_agents(frame, side[0], &app.executor);
    render_queue(frame, side[1], &app.executor);
    render_status(frame, rows[1], app);
}

fn food_style(kind: FoodKind) -> Style {
    match kind {
        FoodKind::Tomato => Style::default().fg(Color::Red),
        FoodKind::Lettuce => Style::default().fg(Color::Green),
    }
}

/// Single glyph for a carried or resting object: raw food is lowercase,
/// chopped food uppercase, `p` an empty plate and `P` a plated dish.
fn object_span(object: &Object) -> Span<'static> {
    match (object.plate, object.foods.as_slice()) {
        (true, []) => Span::styled("p", Style::default().fg(Color::White)),
        (true, _) => Span::styled("P", Style::default().fg(Color::Cyan).bold()),
        (false, [food, ..]) => {
            let letter = &food.kind.name()[..1];
            let glyph = if food.chopped {
                letter.to_uppercase()
            } else {
                letter.to_string()
            };
            Span::styled(glyph, food_style(food.kind))
        }
        (false, []) => Span::raw("?"),
    }
}

/// Renders the kitchen grid: stations, what rests on them, and the agents.
fn render_map(frame: &mut Frame, area: Rect, kitchen: &Kitchen, title: &str) {
    let stations = kitchen.stations();
    let mut lines: Vec<Line> = Vec::with_capacity(stations.height());

    for y in 0..stations.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(stations.width());
        for x in 0..stations.width() {
            let pos = Position::new(x, y);
            if let Some(body) = kitchen.agent_at(pos).and_then(|id| kitchen.agent(id)) {
                let mut style = Style::default().fg(Color::Yellow).bold();
                if body.holding.is_some() {
                    style = style.underlined();
                }
                spans.push(Span::styled(body.id.to_string(), style));
                continue;
            }
            let Some(station) = stations.get(pos) else {
                spans.push(Span::raw(" "));
                continue;
            };
            if let Some(object) = &station.object {
                spans.push(object_span(object));
                continue;
            }
            let (glyph, style) = match station.fixture {
                Fixture::Floor => (" ", Style::default()),
                Fixture::Counter => ("#", Style::default().fg(Color::DarkGray)),
                Fixture::Cutboard => ("/", Style::default().fg(Color::LightYellow)),
                Fixture::Delivery => ("*", Style::default().fg(Color::Magenta).bold()),
            };
            spans.push(Span::styled(glyph, style));
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title(format!("Kitchen: {title}")).borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(map_paragraph, area);
}

fn agent_lines(agent: &AgentState) -> Vec<ListItem<'static>> {
    let location = agent
        .location()
        .map_or_else(|| "?".to_string(), |pos| pos.to_string());
    let held = if agent.held().is_empty() {
        "nothing".to_string()
    } else {
        agent.held().join(", ")
    };
    let mut items = vec![ListItem::from(Line::from(vec![
        Span::styled(format!("Agent {}", agent.id()), Style::default().bold()),
        Span::raw(format!(" at {location} holding {held}")),
    ]))];
    let history = agent.history();
    let skip = history.len().saturating_sub(HISTORY_LINES);
    items.extend(history[skip..].iter().map(|entry| {
        ListItem::from(Span::styled(
            format!("  {entry}"),
            Style::default().fg(Color::Gray),
        ))
    }));
    items
}

fn render_agents(frame: &mut Frame, area: Rect, executor: &TaskExecutor<Kitchen>) {
    let items: Vec<ListItem> = executor.agents().flat_map(agent_lines).collect();
    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Agents"));
    frame.render_widget(widget, area);
}

fn render_queue(frame: &mut Frame, area: Rect, executor: &TaskExecutor<Kitchen>) {
    let current = executor.task_index();
    let items: Vec<ListItem> = executor
        .queue()
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let (marker, style) = if index < current {
                ("x", Style::default().fg(Color::DarkGray))
            } else if index == current {
                (">", owner_style(task.owner).bold())
            } else {
                (" ", Style::default())
            };
            ListItem::from(Span::styled(format!("{marker} {task}"), style))
        })
        .collect();
    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Tasks"));
    frame.render_widget(widget, area);
}

fn owner_style(owner: AgentId) -> Style {
    match owner {
        1 => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::LightBlue),
    }
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let executor = &app.executor;
    let state = match executor.outcome() {
        Some(EpisodeOutcome::Success { .. }) => "done".to_string(),
        Some(EpisodeOutcome::Incomplete { completed_tasks, .. }) => {
            format!("out of steps after {completed_tasks} tasks")
        }
        None if app.paused => "paused".to_string(),
        None => executor
            .current_task()
            .map_or_else(|| "running".to_string(), |task| format!("now {task}")),
    };
    let text = format!(
        "Step {}/{}  Delivered {}  [{state}]  Space: pause  q/Esc: quit",
        executor.steps(),
        executor.config().max_steps,
        executor.delivered(),
    );
    let status = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, area);
}
