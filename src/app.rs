use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use tokio::sync::mpsc;

use crate::ai::Assistant;
use crate::config::Config;
use crate::db::{
    Repository, CODE_ANALYSES_KEY, INSIGHTS_KEY, PRACTICE_PLANS_KEY, RECOMMENDATIONS_KEY,
};
use crate::error::{AppError, Result};
use crate::models::{
    filter_and_sort, AiInsights, CodeAnalysis, CodeExecutionResult, DailyPracticePlan, Language,
    Note, PracticeRecommendation, Problem, ProblemFilter, SortKey,
};
use crate::services::{
    slug_from_input, AnalysisService, Backend, JudgeClient, LeetCodeQuestion, ProblemService,
    ProxyClient, Session,
};
use crate::store::{AssistantAction, AssistantState, ProblemAction, ProblemState};
use crate::tui::{AppAction, NoteForm, ProblemForm};

const NOTIFICATION_TTL: Duration = Duration::from_secs(4);
const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Problems,
    Dashboard,
    Notes,
    Compiler,
}

impl View {
    pub const ALL: [View; 4] = [View::Problems, View::Dashboard, View::Notes, View::Compiler];

    pub fn label(&self) -> &'static str {
        match self {
            View::Problems => "Problems",
            View::Dashboard => "Dashboard",
            View::Notes => "Notes",
            View::Compiler => "Compiler",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            View::Problems => View::Dashboard,
            View::Dashboard => View::Notes,
            View::Notes => View::Compiler,
            View::Compiler => View::Problems,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            View::Problems => View::Compiler,
            View::Dashboard => View::Problems,
            View::Notes => View::Dashboard,
            View::Compiler => View::Notes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Search,
    Import,
    LoadFile,
    SaveFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmTarget {
    Problem { id: String, title: String },
    Note(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Help,
    Prompt(PromptKind),
    ProblemForm,
    NoteForm,
    Confirm(ConfirmTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Task {
    Analysis,
    Execution,
    Recommendations,
    Plan,
    Insights,
    Import,
}

impl Task {
    fn label(&self) -> &'static str {
        match self {
            Task::Analysis => "Analyzing code",
            Task::Execution => "Running code",
            Task::Recommendations => "Generating recommendations",
            Task::Plan => "Creating daily plan",
            Task::Insights => "Generating insights",
            Task::Import => "Fetching from LeetCode",
        }
    }
}

/// Result of a background task, delivered to the UI loop.
pub enum TaskResult {
    Analysis {
        problem_id: String,
        result: std::result::Result<CodeAnalysis, String>,
    },
    Execution {
        problem_id: Option<String>,
        result: CodeExecutionResult,
    },
    Recommendations(std::result::Result<Vec<PracticeRecommendation>, String>),
    Plan(std::result::Result<DailyPracticePlan, String>),
    Insights(std::result::Result<AiInsights, String>),
    Import(std::result::Result<LeetCodeQuestion, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    shown_at: Instant,
}

impl Notification {
    fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= NOTIFICATION_TTL
    }
}

pub struct LastExecution {
    pub problem_id: Option<String>,
    pub result: CodeExecutionResult,
}

pub struct Services {
    pub problems: ProblemService,
    pub analyses: AnalysisService,
    pub repository: Repository,
    pub assistant: Option<Arc<Assistant>>,
    pub judge: Arc<JudgeClient>,
    pub proxy: Arc<ProxyClient>,
}

impl Services {
    pub async fn from_config(config: &Config, session: &Session) -> Result<Self> {
        let (url, anon_key) = config.supabase()?;
        let backend = Backend::new(url, anon_key, session)?;

        let assistant = config
            .openai_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .map(|key| Assistant::new(key, &config.openai_model, &config.openai_api_url))
            .transpose()?
            .map(Arc::new);

        let judge = JudgeClient::new(
            &config.judge_api_url,
            config.judge_api_key.clone(),
            config.judge_max_polls,
            Duration::from_millis(config.judge_poll_interval_ms),
        )?;

        Ok(Self {
            problems: ProblemService::new(backend.clone()),
            analyses: AnalysisService::new(backend),
            repository: Repository::new(&config.db_path).await?,
            assistant,
            judge: Arc::new(judge),
            proxy: Arc::new(ProxyClient::new(&config.proxy_url)?),
        })
    }
}

pub struct App {
    // Data
    pub problems: ProblemState,
    pub assistant: AssistantState,
    pub notes: Vec<Note>,
    pub username: String,

    // UI state
    pub view: View,
    pub mode: InputMode,
    pub filter: ProblemFilter,
    pub sort: SortKey,
    pub note_query: String,
    pub selected_problem: usize,
    pub selected_note: usize,
    pub prompt: String,
    pub problem_form: Option<ProblemForm>,
    pub note_form: Option<NoteForm>,
    pub compiler_language: Language,
    /// Source loaded from a file or reset to the template; overrides the selected solution.
    pub compiler_buffer: Option<String>,
    pub last_execution: Option<LastExecution>,
    pub notification: Option<Notification>,
    /// In-flight background tasks, counted per kind.
    pub pending: BTreeMap<Task, usize>,
    spinner: usize,

    // Background tasks
    task_tx: mpsc::Sender<TaskResult>,
    task_rx: mpsc::Receiver<TaskResult>,

    services: Services,
}

impl App {
    pub async fn new(config: &Config, session: &Session) -> Result<Self> {
        let services = Services::from_config(config, session).await?;
        let mut app = Self::with_services(services, session.user.username().to_string());
        app.load().await?;
        Ok(app)
    }

    pub fn with_services(services: Services, username: String) -> Self {
        let (task_tx, task_rx) = mpsc::channel(16);
        Self {
            problems: ProblemState::default(),
            assistant: AssistantState::default(),
            notes: Vec::new(),
            username,
            view: View::Problems,
            mode: InputMode::Normal,
            filter: ProblemFilter::default(),
            sort: SortKey::default(),
            note_query: String::new(),
            selected_problem: 0,
            selected_note: 0,
            prompt: String::new(),
            problem_form: None,
            note_form: None,
            compiler_language: Language::default(),
            compiler_buffer: None,
            last_execution: None,
            notification: None,
            pending: BTreeMap::new(),
            spinner: 0,
            task_tx,
            task_rx,
            services,
        }
    }

    /// Loads local data, then the problem list. A backend failure is reported, not fatal.
    pub async fn load(&mut self) -> Result<()> {
        let repo = &self.services.repository;
        let (analyses, recommendations, plans, insights, notes) = futures::try_join!(
            repo.load_cached::<Vec<CodeAnalysis>>(CODE_ANALYSES_KEY),
            repo.load_cached::<Vec<PracticeRecommendation>>(RECOMMENDATIONS_KEY),
            repo.load_cached::<Vec<DailyPracticePlan>>(PRACTICE_PLANS_KEY),
            repo.load_cached::<AiInsights>(INSIGHTS_KEY),
            repo.get_all_notes(),
        )?;

        self.assistant
            .reduce(AssistantAction::SetCodeAnalyses(analyses.unwrap_or_default()));
        self.assistant
            .reduce(AssistantAction::SetRecommendations(recommendations.unwrap_or_default()));
        self.assistant
            .reduce(AssistantAction::SetPracticePlans(plans.unwrap_or_default()));
        if let Some(insights) = insights {
            self.assistant.reduce(AssistantAction::SetInsights(insights));
        }
        self.notes = notes;

        if let Err(e) = self.reload_problems().await {
            self.notify_error(e);
        }
        Ok(())
    }

    // Derived views

    pub fn visible_problems(&self) -> Vec<&Problem> {
        filter_and_sort(&self.problems.problems, &self.filter, &self.sort)
    }

    pub fn selected_problem(&self) -> Option<&Problem> {
        self.visible_problems().get(self.selected_problem).copied()
    }

    pub fn visible_notes(&self) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| n.matches(&self.note_query))
            .collect()
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.visible_notes().get(self.selected_note).copied()
    }

    pub fn has_assistant(&self) -> bool {
        self.services.assistant.is_some()
    }

    pub fn judge_is_live(&self) -> bool {
        self.services.judge.has_api_key()
    }

    /// Source the compiler view runs: the buffer, else the selected solution when it
    /// matches the language, else the template.
    pub fn compiler_source(&self) -> (String, Option<String>) {
        if let Some(buffer) = &self.compiler_buffer {
            return (buffer.clone(), None);
        }
        if let Some(problem) = self.selected_problem() {
            let matches = Language::from_str(&problem.language).ok() == Some(self.compiler_language);
            if matches && !problem.solution.trim().is_empty() {
                return (problem.solution.clone(), Some(problem.id.clone()));
            }
        }
        (self.compiler_language.template().to_string(), None)
    }

    pub fn busy_label(&self) -> Option<String> {
        let task = self.pending.keys().next()?;
        Some(format!("{} {}...", SPINNER_FRAMES[self.spinner], task.label()))
    }

    // Notifications

    pub fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.notification = Some(Notification {
            level: NotificationLevel::Info,
            message,
            shown_at: Instant::now(),
        });
    }

    pub fn notify_error(&mut self, error: impl std::fmt::Display) {
        let message = error.to_string();
        tracing::error!("{}", message);
        self.notification = Some(Notification {
            level: NotificationLevel::Error,
            message,
            shown_at: Instant::now(),
        });
    }

    /// Advances the spinner and drops an expired notification.
    pub fn tick(&mut self) {
        self.spinner = (self.spinner + 1) % SPINNER_FRAMES.len();
        if self.notification.as_ref().is_some_and(Notification::is_expired) {
            self.notification = None;
        }
    }

    /// Returns true when the app should quit. Action failures become notifications.
    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match self.dispatch(action).await {
            Ok(quit) => Ok(quit),
            Err(e) => {
                self.notify_error(e);
                Ok(false)
            }
        }
    }

    async fn dispatch(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => return Ok(true),

            AppAction::NextView => self.view = self.view.next(),
            AppAction::PrevView => self.view = self.view.prev(),
            AppAction::MoveUp => self.move_selection(-1),
            AppAction::MoveDown => self.move_selection(1),
            AppAction::MoveToTop => self.move_selection(isize::MIN),
            AppAction::MoveToBottom => self.move_selection(isize::MAX),
            AppAction::ShowHelp => self.mode = InputMode::Help,
            AppAction::HideHelp => self.mode = InputMode::Normal,

            AppAction::Reload => {
                self.reload_problems().await?;
                self.notify(format!("Loaded {} problems", self.problems.problems.len()));
            }

            // Filters and sorting
            AppAction::StartSearch => {
                self.prompt = match self.view {
                    View::Notes => self.note_query.clone(),
                    _ => self.filter.search.clone(),
                };
                self.mode = InputMode::Prompt(PromptKind::Search);
            }
            AppAction::CycleStatusFilter => {
                self.filter.cycle_status();
                self.selected_problem = 0;
            }
            AppAction::CycleDifficultyFilter => {
                self.filter.cycle_difficulty();
                self.selected_problem = 0;
            }
            AppAction::CycleStarFilter => {
                self.filter.starred = self.filter.starred.cycle();
                self.selected_problem = 0;
            }
            AppAction::CycleSortField => self.sort.toggle(self.sort.field.cycle()),
            AppAction::FlipSortDirection => self.sort.direction = self.sort.direction.flip(),

            // Problem actions
            AppAction::AddProblem => {
                self.problem_form = Some(ProblemForm::new());
                self.mode = InputMode::ProblemForm;
            }
            AppAction::EditProblem => {
                if let Some(problem) = self.selected_problem() {
                    self.problem_form = Some(ProblemForm::edit(problem));
                    self.mode = InputMode::ProblemForm;
                }
            }
            AppAction::DeleteProblem => {
                if let Some(problem) = self.selected_problem() {
                    self.mode = InputMode::Confirm(ConfirmTarget::Problem {
                        id: problem.id.clone(),
                        title: problem.title.clone(),
                    });
                }
            }
            AppAction::ToggleStar => self.toggle_star().await?,
            AppAction::CycleStatus => self.cycle_status().await?,
            AppAction::AnalyzeProblem => self.start_analysis()?,
            AppAction::RunSolution => self.start_execution()?,
            AppAction::StartImport => {
                self.prompt.clear();
                self.mode = InputMode::Prompt(PromptKind::Import);
            }
            AppAction::OpenUrl => {
                if let Some(problem) = self.selected_problem() {
                    if problem.url.is_empty() {
                        self.notify("This problem has no URL");
                    } else {
                        let url = problem.url.clone();
                        open::that(&url)?;
                    }
                }
            }
            AppAction::AddProblemNote => {
                if let Some(problem) = self.selected_problem() {
                    self.note_form = Some(NoteForm::new(Some(problem.id.clone())));
                    self.mode = InputMode::NoteForm;
                }
            }

            // Dashboard
            AppAction::GenerateInsights => self.start_insights()?,
            AppAction::GenerateRecommendations => self.start_recommendations()?,
            AppAction::GeneratePlan => self.start_plan()?,
            AppAction::CyclePlanStatus => self.cycle_plan_status().await?,

            // Notes
            AppAction::AddNote => {
                self.note_form = Some(NoteForm::new(None));
                self.mode = InputMode::NoteForm;
            }
            AppAction::EditNote => {
                if let Some(note) = self.selected_note() {
                    self.note_form = Some(NoteForm::edit(note));
                    self.mode = InputMode::NoteForm;
                }
            }
            AppAction::DeleteNote => {
                if let Some(note) = self.selected_note() {
                    self.mode = InputMode::Confirm(ConfirmTarget::Note(note.id));
                }
            }

            // Compiler
            AppAction::CycleLanguage => {
                let previous = self.compiler_language;
                self.compiler_language = previous.cycle();
                if self.compiler_buffer.as_deref() == Some(previous.template()) {
                    self.compiler_buffer = Some(self.compiler_language.template().to_string());
                }
            }
            AppAction::LoadCode => {
                self.prompt.clear();
                self.mode = InputMode::Prompt(PromptKind::LoadFile);
            }
            AppAction::SaveCode => {
                self.prompt = format!("solution.{}", self.compiler_language.extension());
                self.mode = InputMode::Prompt(PromptKind::SaveFile);
            }
            AppAction::ResetCode => {
                self.compiler_buffer = Some(self.compiler_language.template().to_string());
                self.notify("Code cleared!");
            }

            // Text input, shared by prompts and forms
            AppAction::InputChar(c) => self.input_char(c),
            AppAction::InputBackspace => self.input_backspace(),
            AppAction::InputNewline => {
                if let Some(form) = &mut self.problem_form {
                    form.newline();
                } else if let Some(form) = &mut self.note_form {
                    form.newline();
                }
            }
            AppAction::NextField => {
                if let Some(form) = &mut self.problem_form {
                    form.next_field();
                } else if let Some(form) = &mut self.note_form {
                    form.toggle_field();
                }
            }
            AppAction::PrevField => {
                if let Some(form) = &mut self.problem_form {
                    form.prev_field();
                } else if let Some(form) = &mut self.note_form {
                    form.toggle_field();
                }
            }
            AppAction::CycleChoice(forward) => {
                if let Some(form) = &mut self.problem_form {
                    form.cycle(forward);
                }
            }
            AppAction::InputConfirm => self.confirm_input().await?,
            AppAction::InputCancel => self.cancel_input(),

            AppAction::ConfirmYes => self.confirm_delete().await?,
            AppAction::ConfirmNo => self.mode = InputMode::Normal,
        }

        Ok(false)
    }

    fn move_selection(&mut self, delta: isize) {
        let len = match self.view {
            View::Notes => self.visible_notes().len(),
            _ => self.visible_problems().len(),
        };
        let index = match self.view {
            View::Notes => &mut self.selected_note,
            _ => &mut self.selected_problem,
        };
        if len == 0 {
            *index = 0;
            return;
        }
        *index = index.saturating_add_signed(delta).min(len - 1);
    }

    fn clamp_selection(&mut self) {
        let problems = self.visible_problems().len();
        self.selected_problem = self.selected_problem.min(problems.saturating_sub(1));
        let notes = self.visible_notes().len();
        self.selected_note = self.selected_note.min(notes.saturating_sub(1));
    }

    async fn reload_problems(&mut self) -> Result<()> {
        self.problems.reduce(ProblemAction::SetLoading(true));
        let result = self.services.problems.list().await;
        self.problems.reduce(ProblemAction::SetLoading(false));
        self.problems.reduce(ProblemAction::SetProblems(result?));
        self.clamp_selection();
        Ok(())
    }

    async fn reload_notes(&mut self) -> Result<()> {
        self.notes = self.services.repository.get_all_notes().await?;
        self.clamp_selection();
        Ok(())
    }

    async fn toggle_star(&mut self) -> Result<()> {
        let Some(problem) = self.selected_problem().cloned() else {
            return Ok(());
        };
        let starred = self.services.problems.toggle_star(&problem.id).await?;
        let mut updated = problem.with_star_toggled(Utc::now());
        updated.is_starred = starred;
        self.problems.reduce(ProblemAction::UpdateProblem(updated));
        self.clamp_selection();
        Ok(())
    }

    async fn cycle_status(&mut self) -> Result<()> {
        let Some(problem) = self.selected_problem().cloned() else {
            return Ok(());
        };
        let next = problem.with_status(problem.status.cycle(), Utc::now());
        let saved = self.services.problems.update(&next).await?;
        self.notify(format!("{} marked {}", saved.title, saved.status));
        self.problems.reduce(ProblemAction::UpdateProblem(saved));
        self.clamp_selection();
        Ok(())
    }

    async fn save_problem_form(&mut self) -> Result<()> {
        let Some(form) = &mut self.problem_form else {
            return Ok(());
        };
        let now = Utc::now();
        let Ok(fields) = form.submit(now) else {
            return Ok(());
        };

        match form.editing.clone() {
            Some(id) => {
                let mut problem = self
                    .problems
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| AppError::Backend(format!("Problem {id} not found")))?;
                problem.apply(fields, now);
                let saved = self.services.problems.update(&problem).await?;
                self.problems.reduce(ProblemAction::UpdateProblem(saved));
                self.notify("Problem updated successfully!");
            }
            None => {
                let created = self.services.problems.create(&fields).await?;
                self.problems.reduce(ProblemAction::AddProblem(created));
                self.notify("Problem added successfully!");
            }
        }

        self.problem_form = None;
        self.mode = InputMode::Normal;
        self.clamp_selection();
        Ok(())
    }

    async fn save_note_form(&mut self) -> Result<()> {
        let Some(form) = &mut self.note_form else {
            return Ok(());
        };
        let Ok(note) = form.submit() else {
            return Ok(());
        };
        let editing = form.editing;

        match editing {
            Some(id) => {
                self.services
                    .repository
                    .update_note(id, note.content, note.tags)
                    .await?;
                self.notify("Note updated");
            }
            None => {
                self.services.repository.insert_note(note).await?;
                self.notify("Note added");
            }
        }

        self.note_form = None;
        self.mode = InputMode::Normal;
        self.reload_notes().await
    }

    async fn confirm_delete(&mut self) -> Result<()> {
        let InputMode::Confirm(target) = std::mem::replace(&mut self.mode, InputMode::Normal) else {
            return Ok(());
        };
        match target {
            ConfirmTarget::Problem { id, title } => {
                self.services.problems.delete(&id).await?;
                self.problems.reduce(ProblemAction::DeleteProblem(id));
                self.notify(format!("Deleted {title}"));
            }
            ConfirmTarget::Note(id) => {
                self.services.repository.delete_note(id).await?;
                self.notify("Note deleted");
                self.reload_notes().await?;
            }
        }
        self.clamp_selection();
        Ok(())
    }

    async fn cycle_plan_status(&mut self) -> Result<()> {
        let Some(mut plan) = self.assistant.today_plan().cloned() else {
            self.notify("No plan for today. Press P to create one");
            return Ok(());
        };
        plan.status = plan.status.cycle();
        self.assistant.reduce(AssistantAction::UpdatePracticePlan(plan));
        self.services
            .repository
            .save_cached(PRACTICE_PLANS_KEY, &self.assistant.practice_plans)
            .await?;
        self.notify("Practice plan updated!");
        Ok(())
    }

    // Text input

    fn input_char(&mut self, c: char) {
        if let Some(form) = &mut self.problem_form {
            form.input_char(c);
        } else if let Some(form) = &mut self.note_form {
            form.input_char(c);
        } else {
            self.prompt.push(c);
            self.apply_live_search();
        }
    }

    fn input_backspace(&mut self) {
        if let Some(form) = &mut self.problem_form {
            form.backspace();
        } else if let Some(form) = &mut self.note_form {
            form.backspace();
        } else {
            self.prompt.pop();
            self.apply_live_search();
        }
    }

    fn apply_live_search(&mut self) {
        if self.mode != InputMode::Prompt(PromptKind::Search) {
            return;
        }
        match self.view {
            View::Notes => self.note_query = self.prompt.clone(),
            _ => self.filter.search = self.prompt.clone(),
        }
        self.selected_problem = 0;
        self.selected_note = 0;
    }

    async fn confirm_input(&mut self) -> Result<()> {
        match self.mode {
            InputMode::ProblemForm => self.save_problem_form().await?,
            InputMode::NoteForm => self.save_note_form().await?,
            InputMode::Prompt(PromptKind::Search) => self.mode = InputMode::Normal,
            InputMode::Prompt(PromptKind::Import) => {
                self.mode = InputMode::Normal;
                let input = std::mem::take(&mut self.prompt);
                self.start_import(&input)?;
            }
            InputMode::Prompt(PromptKind::LoadFile) => {
                self.mode = InputMode::Normal;
                let input = std::mem::take(&mut self.prompt);
                if let Some(path) = expand_path(&input) {
                    self.load_code(&path).await?;
                }
            }
            InputMode::Prompt(PromptKind::SaveFile) => {
                self.mode = InputMode::Normal;
                let input = std::mem::take(&mut self.prompt);
                if let Some(path) = expand_path(&input) {
                    self.save_code(&path).await?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Reads a source file into the compiler buffer, picking the language from its extension.
    async fn load_code(&mut self, path: &Path) -> Result<()> {
        let source = tokio::fs::read_to_string(path).await?;
        if let Some(language) = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Language::from_extension)
        {
            self.compiler_language = language;
        }
        self.compiler_buffer = Some(source);
        self.view = View::Compiler;
        self.notify(format!("Loaded {}", path.display()));
        Ok(())
    }

    async fn save_code(&mut self, path: &Path) -> Result<()> {
        let (source, _) = self.compiler_source();
        tokio::fs::write(path, source).await?;
        self.notify(format!("Saved {}", path.display()));
        Ok(())
    }

    fn cancel_input(&mut self) {
        if self.mode == InputMode::Prompt(PromptKind::Search) {
            self.prompt.clear();
            self.apply_live_search();
        }
        self.problem_form = None;
        self.note_form = None;
        self.prompt.clear();
        self.mode = InputMode::Normal;
    }

    // Background tasks

    fn require_assistant(&self) -> Result<Arc<Assistant>> {
        self.services
            .assistant
            .clone()
            .ok_or_else(|| AppError::Config("OpenAI API key not configured (openai_api_key)".to_string()))
    }

    fn spawn_task<F>(&mut self, task: Task, fut: F)
    where
        F: std::future::Future<Output = TaskResult> + Send + 'static,
    {
        self.begin_task(task);
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(fut.await).await;
        });
    }

    fn begin_task(&mut self, task: Task) {
        *self.pending.entry(task).or_default() += 1;
    }

    fn finish_task(&mut self, task: Task) {
        if let Some(count) = self.pending.get_mut(&task) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(&task);
            }
        }
    }

    fn start_analysis(&mut self) -> Result<()> {
        let Some(problem) = self.selected_problem().cloned() else {
            return Ok(());
        };
        let assistant = self.require_assistant()?;
        self.spawn_task(Task::Analysis, async move {
            let result = assistant.analyze_code(&problem).await.map_err(|e| e.to_string());
            TaskResult::Analysis {
                problem_id: problem.id,
                result,
            }
        });
        Ok(())
    }

    fn start_execution(&mut self) -> Result<()> {
        let (language, source, problem_id) = match self.view {
            View::Compiler => {
                let (source, problem_id) = self.compiler_source();
                (self.compiler_language, source, problem_id)
            }
            _ => {
                let Some(problem) = self.selected_problem() else {
                    return Ok(());
                };
                if problem.solution.trim().is_empty() {
                    self.notify("No solution saved for this problem");
                    return Ok(());
                }
                let language = Language::from_str(&problem.language).map_err(|e| {
                    AppError::Judge(format!("Cannot run {}: {}", problem.title, e))
                })?;
                let run = (language, problem.solution.clone(), Some(problem.id.clone()));
                self.compiler_buffer = None;
                run
            }
        };

        self.compiler_language = language;
        self.view = View::Compiler;
        let judge = Arc::clone(&self.services.judge);
        self.spawn_task(Task::Execution, async move {
            let result = judge.execute(language, &source, None).await;
            TaskResult::Execution { problem_id, result }
        });
        Ok(())
    }

    fn start_recommendations(&mut self) -> Result<()> {
        let assistant = self.require_assistant()?;
        let problems = self.problems.problems.clone();
        self.spawn_task(Task::Recommendations, async move {
            TaskResult::Recommendations(
                assistant.recommend(&problems).await.map_err(|e| e.to_string()),
            )
        });
        Ok(())
    }

    fn start_plan(&mut self) -> Result<()> {
        let assistant = self.require_assistant()?;
        let today = Local::now().date_naive();
        self.spawn_task(Task::Plan, async move {
            TaskResult::Plan(assistant.daily_plan(today).await.map_err(|e| e.to_string()))
        });
        Ok(())
    }

    fn start_insights(&mut self) -> Result<()> {
        let assistant = self.require_assistant()?;
        let problems = self.problems.problems.clone();
        self.spawn_task(Task::Insights, async move {
            TaskResult::Insights(assistant.insights(&problems).await.map_err(|e| e.to_string()))
        });
        Ok(())
    }

    fn start_import(&mut self, input: &str) -> Result<()> {
        let slug = slug_from_input(input).ok_or_else(|| {
            AppError::LeetCode(format!("'{}' is not a LeetCode problem URL or slug", input.trim()))
        })?;
        let proxy = Arc::clone(&self.services.proxy);
        self.spawn_task(Task::Import, async move {
            TaskResult::Import(proxy.question(&slug).await.map_err(|e| e.to_string()))
        });
        Ok(())
    }

    /// Drains finished background tasks (non-blocking).
    pub async fn poll_task_results(&mut self) -> Result<()> {
        while let Ok(result) = self.task_rx.try_recv() {
            if let Err(e) = self.apply_task_result(result).await {
                self.notify_error(e);
            }
        }
        Ok(())
    }

    async fn apply_task_result(&mut self, result: TaskResult) -> Result<()> {
        match result {
            TaskResult::Analysis { problem_id, result } => {
                self.finish_task(Task::Analysis);
                let analysis = result.map_err(anyhow::Error::msg)?;
                let text = analysis.analysis.to_text();
                self.assistant.reduce(AssistantAction::AddCodeAnalysis(analysis));
                self.services
                    .repository
                    .save_cached(CODE_ANALYSES_KEY, &self.assistant.code_analyses)
                    .await?;
                self.services.analyses.save(&problem_id, &text).await?;
                self.notify("Code analysis completed!");
            }
            TaskResult::Execution { problem_id, result } => {
                self.finish_task(Task::Execution);
                match (&result.error, result.mocked) {
                    (Some(err), _) => self.notify_error(format!("Execution failed: {err}")),
                    (None, true) => self.notify("Code executed (mock mode)"),
                    (None, false) => self.notify("Code executed successfully!"),
                }
                self.last_execution = Some(LastExecution { problem_id, result });
            }
            TaskResult::Recommendations(result) => {
                self.finish_task(Task::Recommendations);
                let recs = result.map_err(anyhow::Error::msg)?;
                self.assistant.reduce(AssistantAction::SetRecommendations(recs));
                self.services
                    .repository
                    .save_cached(RECOMMENDATIONS_KEY, &self.assistant.recommendations)
                    .await?;
                self.notify("Recommendations generated!");
            }
            TaskResult::Plan(result) => {
                self.finish_task(Task::Plan);
                let plan = result.map_err(anyhow::Error::msg)?;
                self.assistant.reduce(AssistantAction::AddPracticePlan(plan));
                self.services
                    .repository
                    .save_cached(PRACTICE_PLANS_KEY, &self.assistant.practice_plans)
                    .await?;
                self.notify("Daily practice plan created!");
            }
            TaskResult::Insights(result) => {
                self.finish_task(Task::Insights);
                let insights = result.map_err(anyhow::Error::msg)?;
                self.assistant.reduce(AssistantAction::SetInsights(insights));
                if let Some(insights) = &self.assistant.insights {
                    self.services
                        .repository
                        .save_cached(INSIGHTS_KEY, insights)
                        .await?;
                }
                self.notify("AI insights generated!");
            }
            TaskResult::Import(result) => {
                self.finish_task(Task::Import);
                let question = result.map_err(anyhow::Error::msg)?;
                self.problem_form = Some(ProblemForm::prefilled(question.to_new_problem()));
                self.view = View::Problems;
                self.mode = InputMode::ProblemForm;
                self.notify(format!("Imported {}", question.title));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn task_sender(&self) -> mpsc::Sender<TaskResult> {
        self.task_tx.clone()
    }
}

/// Trims prompt input and expands a leading `~/`. Empty input yields `None`.
fn expand_path(input: &str) -> Option<PathBuf> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Some(home.join(rest));
        }
    }
    Some(PathBuf::from(input))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::models::{fixtures, Difficulty, ProblemStatus, StarFilter};

    async fn offline_app() -> App {
        let session: Session = serde_json::from_value(json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "user": { "id": "u1", "email": "ada@example.com" }
        }))
        .unwrap();
        // Nothing listens on port 9, so every backend call fails fast.
        let backend = Backend::new("http://127.0.0.1:9", "anon", &session).unwrap();
        let services = Services {
            problems: ProblemService::new(backend.clone()),
            analyses: AnalysisService::new(backend),
            repository: Repository::in_memory().await.unwrap(),
            assistant: None,
            judge: Arc::new(
                JudgeClient::new("http://127.0.0.1:9", None, 1, Duration::from_millis(1)).unwrap(),
            ),
            proxy: Arc::new(ProxyClient::new("http://127.0.0.1:9").unwrap()),
        };
        let mut app = App::with_services(services, "ada".to_string());
        let mut two_sum = fixtures::problem("p1", "Two Sum", Difficulty::Easy, "Arrays");
        two_sum.is_starred = true;
        app.problems.reduce(ProblemAction::SetProblems(vec![
            two_sum,
            fixtures::problem("p2", "LRU Cache", Difficulty::Medium, "Design"),
            fixtures::problem("p3", "Word Ladder", Difficulty::Hard, "Graphs"),
        ]));
        app
    }

    async fn press(app: &mut App, action: AppAction) {
        assert_ok!(app.handle_action(action).await);
    }

    #[tokio::test]
    async fn backend_failures_become_notifications() {
        let mut app = offline_app().await;

        press(&mut app, AppAction::ToggleStar).await;
        press(&mut app, AppAction::Reload).await;

        let notification = app.notification.clone().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(app.problems.problems.len(), 3);
        assert!(!app.problems.loading);
    }

    #[tokio::test]
    async fn live_search_filters_and_escape_clears() {
        let mut app = offline_app().await;

        press(&mut app, AppAction::StartSearch).await;
        for c in "lru".chars() {
            press(&mut app, AppAction::InputChar(c)).await;
        }
        assert_eq!(app.visible_problems().len(), 1);
        assert_eq!(app.selected_problem().unwrap().id, "p2");

        press(&mut app, AppAction::InputCancel).await;
        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.visible_problems().len(), 3);
    }

    #[tokio::test]
    async fn filters_reset_selection() {
        let mut app = offline_app().await;
        press(&mut app, AppAction::MoveToBottom).await;
        assert_eq!(app.selected_problem, 2);

        press(&mut app, AppAction::CycleStarFilter).await;
        assert_eq!(app.filter.starred, StarFilter::Starred);
        assert_eq!(app.selected_problem, 0);
        assert_eq!(app.visible_problems().len(), 1);
    }

    #[tokio::test]
    async fn invalid_form_stays_open_with_message() {
        let mut app = offline_app().await;
        press(&mut app, AppAction::AddProblem).await;
        press(&mut app, AppAction::InputConfirm).await;

        assert_eq!(app.mode, InputMode::ProblemForm);
        let form = app.problem_form.as_ref().unwrap();
        assert_eq!(form.error.as_deref(), Some("Please fill in all required fields"));
    }

    #[tokio::test]
    async fn notes_are_saved_locally() {
        let mut app = offline_app().await;
        app.view = View::Notes;

        press(&mut app, AppAction::AddNote).await;
        for c in "Use a deque".chars() {
            press(&mut app, AppAction::InputChar(c)).await;
        }
        press(&mut app, AppAction::InputConfirm).await;
        assert_eq!(app.notes.len(), 1);
        assert_eq!(app.mode, InputMode::Normal);

        press(&mut app, AppAction::DeleteNote).await;
        assert!(matches!(app.mode, InputMode::Confirm(ConfirmTarget::Note(_))));
        press(&mut app, AppAction::ConfirmYes).await;
        assert!(app.notes.is_empty());
    }

    #[tokio::test]
    async fn ai_actions_need_a_key() {
        let mut app = offline_app().await;
        assert_err!(app.start_insights());
        press(&mut app, AppAction::GenerateInsights).await;
        assert!(app.pending.is_empty());
        assert_eq!(app.notification.unwrap().level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn compiler_runs_template_through_mock_judge() {
        let mut app = offline_app().await;
        app.view = View::Compiler;
        press(&mut app, AppAction::CycleLanguage).await;
        assert_eq!(app.compiler_language, Language::Python);

        press(&mut app, AppAction::RunSolution).await;
        assert!(app.pending.contains_key(&Task::Execution));

        for _ in 0..50 {
            app.poll_task_results().await.unwrap();
            if app.last_execution.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let last = app.last_execution.as_ref().unwrap();
        assert!(last.result.mocked);
        assert_eq!(last.result.output, "Hello, LeetCode!\n");
        assert!(app.pending.is_empty());
    }

    #[tokio::test]
    async fn import_result_opens_prefilled_form() {
        let mut app = offline_app().await;
        app.view = View::Dashboard;
        app.begin_task(Task::Import);

        let question = LeetCodeQuestion {
            slug: "two-sum".to_string(),
            title: "Two Sum".to_string(),
            difficulty: Difficulty::Easy,
            description: "Find two numbers.".to_string(),
            tags: vec!["Array".to_string()],
        };
        app.task_sender()
            .send(TaskResult::Import(Ok(question)))
            .await
            .unwrap_or_else(|_| panic!("channel closed"));
        app.poll_task_results().await.unwrap();

        assert_eq!(app.view, View::Problems);
        assert_eq!(app.mode, InputMode::ProblemForm);
        let form = app.problem_form.as_ref().unwrap();
        assert_eq!(form.draft.category, "Array");
        assert_eq!(form.draft.status, ProblemStatus::NotStarted);
        assert!(app.pending.is_empty());
    }

    #[tokio::test]
    async fn failed_task_is_reported_and_cleared() {
        let mut app = offline_app().await;
        app.begin_task(Task::Insights);
        app.task_sender()
            .send(TaskResult::Insights(Err("AI API error: 500".to_string())))
            .await
            .unwrap_or_else(|_| panic!("channel closed"));

        app.poll_task_results().await.unwrap();

        assert!(app.pending.is_empty());
        assert!(app.assistant.insights.is_none());
        assert_eq!(app.notification.unwrap().level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn spinner_stays_until_every_task_of_a_kind_finishes() {
        let mut app = offline_app().await;
        app.begin_task(Task::Execution);
        app.begin_task(Task::Execution);

        let tx = app.task_sender();
        let finished = || TaskResult::Execution {
            problem_id: None,
            result: CodeExecutionResult::default(),
        };
        tx.send(finished()).await.unwrap_or_else(|_| panic!("channel closed"));
        app.poll_task_results().await.unwrap();
        assert_eq!(app.pending.get(&Task::Execution), Some(&1));
        assert!(app.busy_label().is_some());

        tx.send(finished()).await.unwrap_or_else(|_| panic!("channel closed"));
        app.poll_task_results().await.unwrap();
        assert!(app.pending.is_empty());
        assert!(app.busy_label().is_none());
    }

    #[tokio::test]
    async fn compiler_loads_file_and_picks_language_from_extension() {
        let mut app = offline_app().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_sum.py");
        std::fs::write(&path, "print(42)\n").unwrap();

        press(&mut app, AppAction::LoadCode).await;
        assert_eq!(app.mode, InputMode::Prompt(PromptKind::LoadFile));
        app.prompt = path.display().to_string();
        press(&mut app, AppAction::InputConfirm).await;

        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.view, View::Compiler);
        assert_eq!(app.compiler_language, Language::Python);
        assert_eq!(app.compiler_source(), ("print(42)\n".to_string(), None));
    }

    #[tokio::test]
    async fn loading_a_missing_file_is_reported() {
        let mut app = offline_app().await;
        let dir = tempfile::tempdir().unwrap();

        press(&mut app, AppAction::LoadCode).await;
        app.prompt = dir.path().join("missing.js").display().to_string();
        press(&mut app, AppAction::InputConfirm).await;

        assert!(app.compiler_buffer.is_none());
        assert_eq!(app.notification.unwrap().level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn compiler_saves_current_source() {
        let mut app = offline_app().await;
        let dir = tempfile::tempdir().unwrap();
        app.view = View::Compiler;
        app.compiler_language = Language::Cpp;
        app.compiler_buffer = Some("int main() {}\n".to_string());

        press(&mut app, AppAction::SaveCode).await;
        assert_eq!(app.mode, InputMode::Prompt(PromptKind::SaveFile));
        assert_eq!(app.prompt, "solution.cpp");

        let path = dir.path().join("solution.cpp");
        app.prompt = path.display().to_string();
        press(&mut app, AppAction::InputConfirm).await;

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "int main() {}\n");
        assert_eq!(app.notification.unwrap().level, NotificationLevel::Info);
    }

    #[tokio::test]
    async fn empty_save_path_is_ignored() {
        let mut app = offline_app().await;
        press(&mut app, AppAction::SaveCode).await;
        app.prompt = "   ".to_string();
        press(&mut app, AppAction::InputConfirm).await;

        assert_eq!(app.mode, InputMode::Normal);
        assert!(app.notification.is_none());
    }

    #[tokio::test]
    async fn reset_restores_template_and_follows_language() {
        let mut app = offline_app().await;
        app.view = View::Compiler;
        app.compiler_buffer = Some("scratch".to_string());

        press(&mut app, AppAction::ResetCode).await;
        assert_eq!(app.compiler_source().0, Language::Javascript.template());

        press(&mut app, AppAction::CycleLanguage).await;
        assert_eq!(app.compiler_source().0, Language::Python.template());

        app.compiler_buffer = Some("loaded".to_string());
        press(&mut app, AppAction::CycleLanguage).await;
        assert_eq!(app.compiler_source().0, "loaded");
    }

    #[test]
    fn prompt_paths_expand_home_and_skip_blank_input() {
        assert_eq!(expand_path("  "), None);
        assert_eq!(expand_path(" a/b.py "), Some(PathBuf::from("a/b.py")));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/x.js"), Some(home.join("x.js")));
        }
    }

    #[tokio::test]
    async fn bad_import_input_is_rejected_before_spawning() {
        let mut app = offline_app().await;
        press(&mut app, AppAction::StartImport).await;
        for c in "not a slug!".chars() {
            press(&mut app, AppAction::InputChar(c)).await;
        }
        press(&mut app, AppAction::InputConfirm).await;

        assert!(app.pending.is_empty());
        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.notification.unwrap().level, NotificationLevel::Error);
    }
}
