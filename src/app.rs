use crate::api::{ApiClient, StreamClient};
use crate::config::Config;
use crate::runtime::context::RuntimeContext;
use crate::runtime::frontend::UserInputEvent;
use crate::runtime::mode::RuntimeMode;
use crate::runtime::r#loop::Runtime;
use crate::runtime::UiUpdate;
use crate::state::{build_tree, RunStatus, TrajectorySession};
use crate::types::{DatasetList, DatasetSample, ExecuteRequest};
use crate::ui::palette::StepPalette;
use crate::ui::render::{timeline_lines, tree_lines};
use crate::util::{parse_bool_str, preview};
use anyhow::{Context, Result};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

const HELP_TEXT: &str = "/run /sample /datasets /health /context <text>|@file|clear \
/subllm [on|off] /view [tree|timeline] /quit  · Tab switches view";
const NOTICE_PREVIEW_CHARS: usize = 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrajectoryView {
    #[default]
    Timeline,
    Tree,
}

impl TrajectoryView {
    pub fn label(self) -> &'static str {
        match self {
            Self::Timeline => "timeline",
            Self::Tree => "tree",
        }
    }

    fn toggled(self) -> Self {
        match self {
            Self::Timeline => Self::Tree,
            Self::Tree => Self::Timeline,
        }
    }
}

/// Inputs for the next run. `/sample` fills all of them; plain text replaces
/// only the query.
#[derive(Debug, Default)]
struct RunDraft {
    query: Option<String>,
    context: String,
    enable_sub_llm: bool,
    expected_answer: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum ContextArg {
    Show,
    Clear,
    Set(String),
    Load(String),
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run,
    Sample,
    Datasets,
    Health,
    Context(ContextArg),
    SubLlm(Option<bool>),
    View(Option<TrajectoryView>),
    Help,
    Quit,
}

/// `Ok(None)` for plain text; `Err` carries the message shown for a bad command.
fn parse_command(input: &str) -> Result<Option<Command>, String> {
    let Some(rest) = input.strip_prefix('/') else {
        return Ok(None);
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "run" => Command::Run,
        "sample" => Command::Sample,
        "datasets" => Command::Datasets,
        "health" => Command::Health,
        "context" => Command::Context(match arg {
            "" => ContextArg::Show,
            "clear" => ContextArg::Clear,
            _ => match arg.strip_prefix('@') {
                Some(path) if !path.trim().is_empty() => ContextArg::Load(path.trim().to_string()),
                _ => ContextArg::Set(arg.to_string()),
            },
        }),
        "subllm" => Command::SubLlm(match arg {
            "" => None,
            value => Some(
                parse_bool_str(value)
                    .ok_or_else(|| format!("expected on or off, got '{value}'"))?,
            ),
        }),
        "view" => Command::View(match arg {
            "" => None,
            "tree" => Some(TrajectoryView::Tree),
            "timeline" => Some(TrajectoryView::Timeline),
            other => return Err(format!("unknown view '{other}': use tree or timeline")),
        }),
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command /{other}; try /help")),
    };
    Ok(Some(command))
}

pub struct TuiMode {
    session: TrajectorySession,
    palette: StepPalette,
    view: TrajectoryView,
    draft: RunDraft,
    working_dir: PathBuf,
    notice: Option<String>,
    scroll_from_bottom: usize,
    pending_quit: bool,
    quit_requested: bool,
}

impl TuiMode {
    pub fn new(palette: StepPalette, enable_sub_llm: bool, working_dir: PathBuf) -> Self {
        Self {
            session: TrajectorySession::new(),
            palette,
            view: TrajectoryView::default(),
            draft: RunDraft {
                enable_sub_llm,
                ..RunDraft::default()
            },
            working_dir,
            notice: Some("type a query, or /sample to load one; /help lists commands".to_string()),
            scroll_from_bottom: 0,
            pending_quit: false,
            quit_requested: false,
        }
    }

    pub fn session(&self) -> &TrajectorySession {
        &self.session
    }

    pub fn view(&self) -> TrajectoryView {
        self.view
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn scroll_from_bottom(&self) -> usize {
        self.scroll_from_bottom
    }

    pub fn status_line(&self) -> String {
        format!(
            "status:{} view:{} steps:{} sub-llm:{} context:{} {}",
            self.session.status().label(),
            self.view.label(),
            self.session.steps().len(),
            if self.draft.enable_sub_llm { "on" } else { "off" },
            self.draft.context.chars().count(),
            if self.scroll_from_bottom == 0 {
                "following"
            } else {
                "scrolled"
            },
        )
    }

    /// The active projection of the current session, wrapped to `width`.
    pub fn body_lines(&self, width: usize) -> Vec<Line<'static>> {
        let steps = self.session.steps();
        let answer = self.session.final_answer();
        let mut lines = match self.view {
            TrajectoryView::Timeline => timeline_lines(steps, answer, &self.palette, width),
            TrajectoryView::Tree => {
                let forest = build_tree(steps);
                tree_lines(&forest, answer, &self.palette, width)
            }
        };

        if let Some(failure) = self.session.last_failure() {
            if !lines.is_empty() {
                lines.push(Line::from(""));
            }
            lines.push(Line::styled(
                format!("✗ run failed: {failure}"),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        } else if lines.is_empty() && self.session.status() == RunStatus::Running {
            lines.push(Line::styled(
                "waiting for the first step...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines
    }

    fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    fn start_run(&mut self, query: String, ctx: &mut RuntimeContext) {
        if self.draft.context.trim().is_empty() {
            self.set_notice("context is empty: set one with /context or load a /sample");
            return;
        }

        let superseding = self.session.status() == RunStatus::Running;
        let request = ExecuteRequest::new(
            query.clone(),
            self.draft.context.clone(),
            self.draft.enable_sub_llm,
        );
        self.draft.query = Some(query);
        let channel = ctx.start_run(&mut self.session, request);

        self.scroll_from_bottom = 0;
        self.pending_quit = false;
        self.set_notice(if superseding {
            format!("previous run discarded; started {channel}")
        } else {
            format!("started {channel}")
        });
    }

    fn run_command(&mut self, command: Command, ctx: &mut RuntimeContext) {
        match command {
            Command::Run => match self.draft.query.clone() {
                Some(query) => self.start_run(query, ctx),
                None => self.set_notice("nothing to run: type a query or load a /sample"),
            },
            Command::Sample => {
                ctx.fetch_sample();
                self.set_notice("fetching a dataset sample...");
            }
            Command::Datasets => {
                ctx.list_datasets();
                self.set_notice("listing datasets...");
            }
            Command::Health => {
                ctx.check_health();
                self.set_notice(format!("checking {}...", ctx.server_url()));
            }
            Command::Context(arg) => self.update_context(arg),
            Command::SubLlm(value) => {
                self.draft.enable_sub_llm = value.unwrap_or(!self.draft.enable_sub_llm);
                self.set_notice(format!(
                    "sub-LLM calls {} for the next run",
                    if self.draft.enable_sub_llm { "enabled" } else { "disabled" }
                ));
            }
            Command::View(view) => {
                self.view = view.unwrap_or(self.view.toggled());
                self.scroll_from_bottom = 0;
            }
            Command::Help => self.set_notice(HELP_TEXT),
            Command::Quit => self.quit_requested = true,
        }
    }

    fn update_context(&mut self, arg: ContextArg) {
        match arg {
            ContextArg::Show => {
                let notice = if self.draft.context.is_empty() {
                    "context is empty".to_string()
                } else {
                    format!(
                        "context: {} chars, starts \"{}\"",
                        self.draft.context.chars().count(),
                        preview(&self.draft.context, NOTICE_PREVIEW_CHARS)
                    )
                };
                self.set_notice(notice);
            }
            ContextArg::Clear => {
                self.draft.context.clear();
                self.draft.expected_answer = None;
                self.set_notice("context cleared");
            }
            ContextArg::Set(text) => {
                self.draft.context = text;
                self.draft.expected_answer = None;
                self.set_notice(format!(
                    "context set ({} chars)",
                    self.draft.context.chars().count()
                ));
            }
            ContextArg::Load(path) => match read_context_file(&self.working_dir, &path) {
                Ok(text) => {
                    self.draft.context = text;
                    self.draft.expected_answer = None;
                    self.set_notice(format!(
                        "context loaded from {path} ({} chars)",
                        self.draft.context.chars().count()
                    ));
                }
                Err(error) => {
                    tracing::warn!(%path, error = %format!("{error:#}"), "context file not loaded");
                    self.set_notice(format!("[error] {error:#}"));
                }
            },
        }
    }

    fn load_sample(&mut self, sample: DatasetSample) {
        let source = sample.dataset.clone().unwrap_or_else(|| "dataset".to_string());
        let query_preview = preview(&sample.query, NOTICE_PREVIEW_CHARS);
        self.draft.query = Some(sample.query);
        self.draft.context = sample.context;
        self.draft.expected_answer = sample.answer;
        self.set_notice(format!(
            "sample from {source}: \"{query_preview}\" ({} chars context), /run to execute",
            self.draft.context.chars().count()
        ));
    }

    fn show_datasets(&mut self, list: DatasetList) {
        if list.datasets.is_empty() {
            self.set_notice("backend reports no datasets");
            return;
        }
        let names: Vec<&str> = list.datasets.iter().map(|info| info.name.as_str()).collect();
        self.set_notice(format!("datasets: {}", names.join(", ")));
    }

    fn after_channel_update(&mut self, before: RunStatus) {
        let after = self.session.status();
        if before != RunStatus::Running || after == RunStatus::Running {
            return;
        }
        match after {
            RunStatus::Complete => {
                let notice = match (&self.draft.expected_answer, self.session.final_answer()) {
                    (Some(expected), Some(_)) => format!(
                        "run complete; expected answer: {}",
                        preview(expected, NOTICE_PREVIEW_CHARS)
                    ),
                    (_, Some(_)) => "run complete".to_string(),
                    (_, None) => "channel closed without a final answer".to_string(),
                };
                self.set_notice(notice);
            }
            RunStatus::Error => self.set_notice("run failed; see the trajectory pane"),
            RunStatus::Idle | RunStatus::Running => {}
        }
    }
}

fn read_context_file(working_dir: &Path, path: &str) -> Result<String> {
    let resolved = working_dir.join(path);
    std::fs::read_to_string(&resolved)
        .with_context(|| format!("failed to read context file {}", resolved.display()))
}

impl RuntimeMode for TuiMode {
    fn on_user_input(&mut self, input: String, ctx: &mut RuntimeContext) {
        let input = input.trim();
        if input.is_empty() {
            return;
        }
        self.pending_quit = false;

        match parse_command(input) {
            Ok(Some(command)) => self.run_command(command, ctx),
            Ok(None) => self.start_run(input.to_string(), ctx),
            Err(message) => self.set_notice(message),
        }
    }

    fn on_model_update(&mut self, update: UiUpdate, _ctx: &mut RuntimeContext) {
        match update {
            UiUpdate::Channel(update) => {
                let before = self.session.status();
                if self.session.apply(update.channel, update.event) {
                    self.after_channel_update(before);
                }
            }
            UiUpdate::SampleLoaded(sample) => self.load_sample(sample),
            UiUpdate::DatasetsListed(list) => self.show_datasets(list),
            UiUpdate::HealthChecked(health) => {
                self.set_notice(format!("backend status: {}", health.status));
            }
            UiUpdate::Error(message) => self.set_notice(format!("[error] {message}")),
        }
    }

    fn on_interrupt(&mut self, _ctx: &mut RuntimeContext) {
        if self.pending_quit {
            self.quit_requested = true;
        } else {
            self.pending_quit = true;
            self.set_notice("press Ctrl+C again to exit");
        }
    }

    fn on_frontend_event(&mut self, event: UserInputEvent, _ctx: &mut RuntimeContext) {
        match event {
            UserInputEvent::Scroll { action, max_offset } => {
                self.scroll_from_bottom = action.apply(self.scroll_from_bottom, max_offset);
            }
            UserInputEvent::ToggleView => {
                self.view = self.view.toggled();
                self.scroll_from_bottom = 0;
            }
            UserInputEvent::Text(_) | UserInputEvent::Interrupt => {}
        }
    }

    fn is_run_in_progress(&self) -> bool {
        self.session.status() == RunStatus::Running
    }

    fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

pub fn build_runtime(config: Config) -> Result<(Runtime<TuiMode>, RuntimeContext)> {
    let palette = StepPalette::standard().context("step presentation table is incomplete")?;
    let api = ApiClient::new(&config)?;
    let stream = StreamClient::new(&config);

    let (update_tx, update_rx) = mpsc::unbounded_channel::<UiUpdate>();
    let ctx = RuntimeContext::new(api, stream, update_tx);

    let mode = TuiMode::new(palette, config.enable_sub_llm, config.working_dir.clone());
    let runtime = Runtime::new(mode, update_rx);
    Ok((runtime, ctx))
}
