//! Application state and logic.
//!
//! Key handling is synchronous. Anything that needs the network is spawned
//! on the runtime and comes back as an [`AppEvent`] through the channel the
//! main loop drains.

use crate::config::Config;
use crate::forms::{AuthMode, GenerateField, GenerateForm, LoginForm};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use quiz_engine::auth::{entry_redirect, AuthSession, Credentials};
use quiz_engine::error::{ApiError, ApiResult, ValidationError};
use quiz_engine::list::{Attempts, Collection, FetchTicket, ListController, Materials, Quizzes};
use quiz_engine::models::{
    Answer, AttemptResult, AttemptSummary, Dashboard, GeneratedQuiz, LoginResponse, Material,
    MaterialId, PagedResult, QuestionKind, Quiz, QuizId, QuizSummary,
};
use quiz_engine::query::{parse_date, Filter, FilterKey};
use quiz_engine::question::{choice_answer, choice_count, choice_for_key};
use quiz_engine::session::{
    LoadError, LoadTicket, QuizSession, SessionState, SubmitRejection, SubmitTicket,
};
use quiz_engine::QuizApi;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

/// Materials shown on the dashboard when the server sends none.
const RECENT_MATERIALS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
    Quizzes,
    Materials,
    Generate,
    TakeQuiz,
}

impl Screen {
    /// Screens reachable from the tab bar.
    pub fn tabs() -> &'static [Screen] {
        &[
            Screen::Dashboard,
            Screen::Quizzes,
            Screen::Materials,
            Screen::Generate,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::Dashboard => "Dashboard",
            Screen::Quizzes => "Quizzes",
            Screen::Materials => "Materials",
            Screen::Generate => "Generate",
            Screen::TakeQuiz => "Quiz",
        }
    }

    fn step(&self, forward: bool) -> Screen {
        let tabs = Self::tabs();
        let idx = tabs.iter().position(|s| s == self).unwrap_or(0);
        let next = if forward {
            (idx + 1) % tabs.len()
        } else {
            (idx + tabs.len() - 1) % tabs.len()
        };
        tabs[next]
    }
}

/// Single-line text entry over a list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Date(FilterKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
    DeleteQuiz { id: QuizId, title: String },
    DeleteMaterial { id: MaterialId, title: String },
    Submit,
    SignOut,
}

impl Confirm {
    pub fn prompt(&self) -> String {
        match self {
            Confirm::DeleteQuiz { title, .. } => {
                format!("Delete quiz \"{}\"? This cannot be undone.", title)
            }
            Confirm::DeleteMaterial { title, .. } => {
                format!("Delete material \"{}\"? This cannot be undone.", title)
            }
            Confirm::Submit => SubmitRejection::NeedsConfirmation.to_string(),
            Confirm::SignOut => "Sign out?".to_string(),
        }
    }
}

/// Completion of a spawned request.
#[derive(Debug)]
pub enum AppEvent {
    LoggedIn(ApiResult<LoginResponse>),
    Registered(ApiResult<()>),
    Dashboard(u64, ApiResult<Dashboard>),
    Quizzes(u64, ApiResult<PagedResult<QuizSummary>>),
    Attempts(u64, ApiResult<PagedResult<AttemptSummary>>),
    Materials(u64, ApiResult<PagedResult<Material>>),
    MaterialOptions(ApiResult<Vec<Material>>),
    QuizDeleted(QuizId, ApiResult<()>),
    MaterialDeleted(MaterialId, ApiResult<()>),
    Generated(ApiResult<GeneratedQuiz>),
    QuizLoaded {
        generation: u64,
        ticket: LoadTicket,
        result: ApiResult<Quiz>,
    },
    Submitted {
        generation: u64,
        ticket: SubmitTicket,
        result: ApiResult<AttemptResult>,
    },
}

pub struct App {
    pub config: Config,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub confirm: Option<Confirm>,
    pub message: Option<String>,
    pub show_help: bool,
    pub should_quit: bool,

    pub login: LoginForm,

    // Dashboard
    pub dashboard: Option<Dashboard>,
    pub dashboard_error: Option<String>,
    dashboard_seq: u64,
    pub attempts: ListController<Attempts>,

    pub quizzes: ListController<Quizzes>,
    pub materials: ListController<Materials>,
    /// Every material, for the quiz filter and the generation form.
    pub material_options: Vec<Material>,
    pub selected: usize,

    pub generate: GenerateForm,

    // Quiz taking
    pub session: Option<QuizSession>,
    session_generation: u64,
    pub choice_cursor: usize,
    pub results_scroll: u16,

    api: Arc<dyn QuizApi>,
    credentials: Credentials,
    tx: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        config: Config,
        api: Arc<dyn QuizApi>,
        credentials: Credentials,
        tx: UnboundedSender<AppEvent>,
    ) -> Self {
        let debounce = config.debounce();
        let lists = config.lists.clone();
        let mut app = Self {
            config,
            screen: Screen::Login,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            confirm: None,
            message: None,
            show_help: false,
            should_quit: false,
            login: LoginForm::default(),
            dashboard: None,
            dashboard_error: None,
            dashboard_seq: 0,
            attempts: ListController::new(Attempts, lists.attempts_per_page, debounce),
            quizzes: ListController::new(Quizzes, lists.quizzes_per_page, debounce),
            materials: ListController::new(Materials, lists.materials_per_page, debounce),
            material_options: Vec::new(),
            selected: 0,
            generate: GenerateForm::default(),
            session: None,
            session_generation: 0,
            choice_cursor: 0,
            results_scroll: 0,
            api,
            credentials,
            tx,
        };
        if app.credentials.is_signed_in() {
            app.show(Screen::Dashboard);
        }
        app
    }

    pub fn user_label(&self) -> Option<String> {
        self.credentials
            .user()
            .map(|u| u.username.unwrap_or(u.email))
    }

    // ---- navigation ----

    /// Switch screens. List screens start from a fresh query and refetch.
    pub fn show(&mut self, screen: Screen) {
        tracing::debug!(from = ?self.screen, to = ?screen, "switching screen");
        if self.screen == Screen::TakeQuiz && screen != Screen::TakeQuiz {
            self.session = None;
        }
        self.screen = screen;
        self.input_mode = InputMode::Normal;
        self.selected = 0;

        match screen {
            Screen::Login => {
                self.login = LoginForm::default();
            }
            Screen::Dashboard => {
                self.load_dashboard();
                self.load_material_options();
                let ticket = self.attempts.reset();
                self.spawn_fetch(Attempts, ticket, AppEvent::Attempts);
            }
            Screen::Quizzes => {
                let ticket = self.quizzes.reset();
                self.spawn_fetch(Quizzes, ticket, AppEvent::Quizzes);
                self.load_material_options();
            }
            Screen::Materials => {
                let ticket = self.materials.reset();
                self.spawn_fetch(Materials, ticket, AppEvent::Materials);
            }
            Screen::Generate => {
                self.generate.error = None;
                self.load_material_options();
            }
            Screen::TakeQuiz => {}
        }
    }

    /// Start a fresh session for `quiz_id`. Also used for retakes.
    pub fn open_quiz(&mut self, quiz_id: QuizId) {
        tracing::info!(%quiz_id, "opening quiz");
        self.show(Screen::TakeQuiz);
        self.session_generation += 1;
        self.choice_cursor = 0;
        self.results_scroll = 0;

        let mut session = QuizSession::new(quiz_id.clone());
        let ticket = session.load_ticket();
        self.session = Some(session);

        let generation = self.session_generation;
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.get_quiz(&quiz_id).await;
            AppEvent::QuizLoaded {
                generation,
                ticket,
                result,
            }
        });
    }

    fn sign_out(&mut self) {
        self.credentials.sign_out();
        self.dashboard = None;
        self.material_options.clear();
        self.generate = GenerateForm::default();
        self.show(Screen::Login);
    }

    fn check_auth<T>(&mut self, result: &ApiResult<T>) {
        if matches!(result, Err(err) if err.is_unauthorized()) {
            self.expire_session();
        }
    }

    /// A 401 anywhere: the credential is gone, go back to the entry point.
    fn expire_session(&mut self) {
        self.credentials.sign_out();
        if entry_redirect(self.screen == Screen::Login) {
            tracing::info!("session expired, returning to login");
            self.sign_out();
            self.message = Some("Your session has expired. Please login again.".to_string());
        }
    }

    // ---- background work ----

    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // The receiver only goes away on shutdown.
            let _ = tx.send(fut.await);
        });
    }

    fn spawn_fetch<C: Collection>(
        &self,
        collection: C,
        ticket: FetchTicket,
        wrap: fn(u64, ApiResult<PagedResult<C::Item>>) -> AppEvent,
    ) {
        let api = self.api.clone();
        self.spawn(async move {
            let result = collection.fetch(api.as_ref(), &ticket.query).await;
            wrap(ticket.seq, result)
        });
    }

    /// Reload the current screen, keeping its query.
    fn refresh(&mut self) {
        match self.screen {
            Screen::Dashboard => {
                self.load_dashboard();
                self.load_material_options();
                let ticket = self.attempts.refetch();
                self.spawn_fetch(Attempts, ticket, AppEvent::Attempts);
            }
            Screen::Quizzes => {
                let ticket = self.quizzes.refetch();
                self.spawn_fetch(Quizzes, ticket, AppEvent::Quizzes);
                self.load_material_options();
            }
            Screen::Materials => {
                let ticket = self.materials.refetch();
                self.spawn_fetch(Materials, ticket, AppEvent::Materials);
            }
            Screen::Generate => self.load_material_options(),
            Screen::Login | Screen::TakeQuiz => {}
        }
    }

    fn load_dashboard(&mut self) {
        self.dashboard_seq += 1;
        let seq = self.dashboard_seq;
        let api = self.api.clone();
        self.spawn(async move { AppEvent::Dashboard(seq, api.dashboard().await) });
    }

    fn load_material_options(&self) {
        let api = self.api.clone();
        self.spawn(async move { AppEvent::MaterialOptions(api.list_materials().await) });
    }

    /// Advance debounce timers on every list.
    pub fn tick(&mut self, now: Instant) {
        if let Some(ticket) = self.attempts.tick(now) {
            self.spawn_fetch(Attempts, ticket, AppEvent::Attempts);
        }
        if let Some(ticket) = self.quizzes.tick(now) {
            self.spawn_fetch(Quizzes, ticket, AppEvent::Quizzes);
        }
        if let Some(ticket) = self.materials.tick(now) {
            self.spawn_fetch(Materials, ticket, AppEvent::Materials);
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::LoggedIn(result) => {
                self.login.pending = false;
                match result {
                    Ok(response) => {
                        self.credentials.sign_in(AuthSession {
                            token: response.access_token,
                            user: response.user,
                        });
                        self.show(Screen::Dashboard);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "login failed");
                        self.message = Some(
                            err.message()
                                .unwrap_or("Login failed. Please check your credentials.")
                                .to_string(),
                        );
                    }
                }
            }
            AppEvent::Registered(result) => {
                self.login.pending = false;
                match result {
                    Ok(()) => {
                        self.login.toggle_mode();
                        self.message = Some("Registration successful. Please login.".to_string());
                    }
                    Err(err) => {
                        self.message = Some(
                            err.message()
                                .unwrap_or("Registration failed. Please try again.")
                                .to_string(),
                        );
                    }
                }
            }
            AppEvent::Dashboard(seq, result) => {
                if seq != self.dashboard_seq {
                    return;
                }
                self.check_auth(&result);
                match result {
                    Ok(dashboard) => {
                        self.dashboard = Some(dashboard);
                        self.dashboard_error = None;
                    }
                    Err(err) => {
                        self.dashboard_error = Some(
                            err.message()
                                .unwrap_or("Failed to load dashboard data")
                                .to_string(),
                        );
                    }
                }
            }
            AppEvent::Attempts(seq, result) => {
                if !self.attempts.is_current(seq) {
                    return;
                }
                self.check_auth(&result);
                if let Some(ticket) = self.attempts.apply(seq, result) {
                    self.spawn_fetch(Attempts, ticket, AppEvent::Attempts);
                }
                self.clamp_selection();
            }
            AppEvent::Quizzes(seq, result) => {
                if !self.quizzes.is_current(seq) {
                    return;
                }
                self.check_auth(&result);
                if let Some(ticket) = self.quizzes.apply(seq, result) {
                    self.spawn_fetch(Quizzes, ticket, AppEvent::Quizzes);
                }
                self.clamp_selection();
            }
            AppEvent::Materials(seq, result) => {
                if !self.materials.is_current(seq) {
                    return;
                }
                self.check_auth(&result);
                if let Some(ticket) = self.materials.apply(seq, result) {
                    self.spawn_fetch(Materials, ticket, AppEvent::Materials);
                }
                self.clamp_selection();
            }
            AppEvent::MaterialOptions(result) => {
                self.check_auth(&result);
                match result {
                    Ok(materials) => {
                        self.material_options = materials;
                        self.generate.sync_materials(&self.material_options);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "material options unavailable");
                    }
                }
            }
            AppEvent::QuizDeleted(id, result) => {
                self.check_auth(&result);
                match result {
                    Ok(()) => {
                        let ticket = self.quizzes.remove_where(|q| q.id == id);
                        self.spawn_fetch(Quizzes, ticket, AppEvent::Quizzes);
                        self.message = Some("Quiz deleted".to_string());
                    }
                    Err(err) => self.quizzes.set_error(
                        err.message().unwrap_or("Failed to delete quiz").to_string(),
                    ),
                }
            }
            AppEvent::MaterialDeleted(id, result) => {
                self.check_auth(&result);
                match result {
                    Ok(()) => {
                        let ticket = self.materials.remove_where(|m| m.id == id);
                        self.spawn_fetch(Materials, ticket, AppEvent::Materials);
                        self.material_options.retain(|m| m.id != id);
                        self.message = Some("Material deleted".to_string());
                    }
                    Err(err) => self.materials.set_error(
                        err.message()
                            .unwrap_or("Failed to delete material")
                            .to_string(),
                    ),
                }
            }
            AppEvent::Generated(result) => {
                self.generate.pending = false;
                self.check_auth(&result);
                match result {
                    Ok(generated) => {
                        self.generate.title.clear();
                        self.open_quiz(generated.quiz_id);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "quiz generation failed");
                        self.generate.error = Some(match &err {
                            ApiError::Network(_) => {
                                "Network error. Please check your connection.".to_string()
                            }
                            _ => err
                                .message()
                                .unwrap_or("Failed to generate quiz")
                                .to_string(),
                        });
                    }
                }
            }
            AppEvent::QuizLoaded {
                generation,
                ticket,
                result,
            } => {
                if generation != self.session_generation {
                    return;
                }
                if let Some(session) = &mut self.session {
                    session.finish_load(ticket, result);
                    if session.state() == &SessionState::Failed(LoadError::Unauthorized) {
                        self.expire_session();
                    }
                }
            }
            AppEvent::Submitted {
                generation,
                ticket,
                result,
            } => {
                if generation != self.session_generation {
                    return;
                }
                let unauthorized = matches!(result, Err(ApiError::Unauthorized(_)));
                if let Some(session) = &mut self.session {
                    session.finish_submit(ticket, result);
                }
                if unauthorized {
                    self.expire_session();
                }
            }
        }
    }

    // ---- keys ----

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.message = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if self.show_help {
            self.show_help = false;
            return;
        }
        if self.confirm.is_some() {
            self.handle_confirm_key(key);
            return;
        }

        let screen = self.screen;
        match screen {
            Screen::Login => self.handle_login_key(key),
            Screen::TakeQuiz => self.handle_quiz_key(key),
            _ if self.input_mode != InputMode::Normal => self.handle_input_key(key),
            Screen::Generate if self.handle_generate_key(key) => {}
            _ => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Tab => self.show(self.screen.step(true)),
            KeyCode::BackTab => self.show(self.screen.step(false)),
            KeyCode::Char(c @ '1'..='4') => {
                let idx = c as usize - '1' as usize;
                self.show(Screen::tabs()[idx]);
            }
            KeyCode::Char('L') => self.confirm = Some(Confirm::SignOut),

            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('n') | KeyCode::Right => self.change_page(true),
            KeyCode::Char('p') | KeyCode::Left => self.change_page(false),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('/') if self.screen != Screen::Generate => {
                self.input_mode = InputMode::Search;
                self.input_buffer = self.search_input().to_string();
            }
            KeyCode::Char('c') => self.clear_filters(),

            KeyCode::Char('s') if self.screen == Screen::Dashboard => {
                self.begin_date_input(FilterKey::StartDate)
            }
            KeyCode::Char('e') if self.screen == Screen::Dashboard => {
                self.begin_date_input(FilterKey::EndDate)
            }
            KeyCode::Char('m') if self.screen == Screen::Quizzes => self.cycle_material_filter(),
            KeyCode::Char('d') => self.request_delete(),
            KeyCode::Char('g') if self.screen == Screen::Materials => {
                if let Some(material) = self.materials.items().get(self.selected) {
                    self.generate.material_id = Some(material.id.clone());
                    self.show(Screen::Generate);
                }
            }
            KeyCode::Enter => self.activate_selection(),
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Enter => {
                let mode = self.input_mode;
                self.input_mode = InputMode::Normal;
                if let InputMode::Date(key) = mode {
                    self.commit_date(key);
                }
                self.input_buffer.clear();
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
                self.push_search();
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
                self.push_search();
            }
            _ => {}
        }
    }

    /// Echo the search box into the active list. The list debounces.
    fn push_search(&mut self) {
        if self.input_mode != InputMode::Search {
            return;
        }
        let now = Instant::now();
        let text = self.input_buffer.clone();
        match self.screen {
            Screen::Dashboard => self.attempts.set_search_text(text, now),
            Screen::Quizzes => self.quizzes.set_search_text(text, now),
            Screen::Materials => self.materials.set_search_text(text, now),
            _ => {}
        }
    }

    fn search_input(&self) -> &str {
        match self.screen {
            Screen::Dashboard => self.attempts.search_input(),
            Screen::Quizzes => self.quizzes.search_input(),
            Screen::Materials => self.materials.search_input(),
            _ => "",
        }
    }

    fn begin_date_input(&mut self, key: FilterKey) {
        let filters = &self.attempts.query().filters;
        let current = match key {
            FilterKey::StartDate => filters.start_date,
            FilterKey::EndDate => filters.end_date,
            FilterKey::Material => None,
        };
        self.input_buffer = current.map(|d| d.to_string()).unwrap_or_default();
        self.input_mode = InputMode::Date(key);
    }

    /// Apply a typed date. An empty box clears the filter.
    fn commit_date(&mut self, key: FilterKey) {
        let text = self.input_buffer.trim();
        let ticket = if text.is_empty() {
            self.attempts.clear_filter(key)
        } else {
            match parse_date(text) {
                Ok(day) => self.attempts.set_filter(match key {
                    FilterKey::EndDate => Filter::EndDate(day),
                    _ => Filter::StartDate(day),
                }),
                Err(err) => {
                    self.message = Some(err.to_string());
                    None
                }
            }
        };
        if let Some(ticket) = ticket {
            self.spawn_fetch(Attempts, ticket, AppEvent::Attempts);
        }
    }

    fn clear_filters(&mut self) {
        match self.screen {
            Screen::Dashboard => {
                if let Some(t) = self.attempts.clear_filters() {
                    self.spawn_fetch(Attempts, t, AppEvent::Attempts);
                }
            }
            Screen::Quizzes => {
                if let Some(t) = self.quizzes.clear_filters() {
                    self.spawn_fetch(Quizzes, t, AppEvent::Quizzes);
                }
            }
            Screen::Materials => {
                if let Some(t) = self.materials.clear_filters() {
                    self.spawn_fetch(Materials, t, AppEvent::Materials);
                }
            }
            _ => {}
        }
    }

    /// Step the quiz list's material filter: none → each material → none.
    fn cycle_material_filter(&mut self) {
        let current = self.quizzes.query().filters.material.as_deref();
        let next = match current.and_then(|id| self.material_options.iter().position(|m| m.id == id)) {
            Some(i) => self.material_options.get(i + 1),
            None if current.is_some() => None,
            None => self.material_options.first(),
        };
        let ticket = match next.map(|m| m.id.clone()) {
            Some(id) => self.quizzes.set_filter(Filter::Material(id)),
            None => self.quizzes.clear_filter(FilterKey::Material),
        };
        if let Some(ticket) = ticket {
            self.spawn_fetch(Quizzes, ticket, AppEvent::Quizzes);
        }
    }

    /// Materials for the dashboard panel: the server's recent list when it
    /// sends one, otherwise the first few known materials.
    pub fn recent_materials(&self) -> &[Material] {
        match self.dashboard.as_ref().and_then(|d| d.recent_materials.as_deref()) {
            Some(recent) => recent,
            None => &self.material_options[..self.material_options.len().min(RECENT_MATERIALS)],
        }
    }

    pub fn material_title(&self, id: &str) -> Option<&str> {
        self.material_options
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.title.as_str())
    }

    fn change_page(&mut self, forward: bool) {
        match self.screen {
            Screen::Dashboard => {
                let t = if forward { self.attempts.next_page() } else { self.attempts.prev_page() };
                if let Some(t) = t {
                    self.spawn_fetch(Attempts, t, AppEvent::Attempts);
                }
            }
            Screen::Quizzes => {
                let t = if forward { self.quizzes.next_page() } else { self.quizzes.prev_page() };
                if let Some(t) = t {
                    self.spawn_fetch(Quizzes, t, AppEvent::Quizzes);
                }
            }
            Screen::Materials => {
                let t = if forward { self.materials.next_page() } else { self.materials.prev_page() };
                if let Some(t) = t {
                    self.spawn_fetch(Materials, t, AppEvent::Materials);
                }
            }
            _ => return,
        }
        self.selected = 0;
    }

    fn item_count(&self) -> usize {
        match self.screen {
            Screen::Dashboard => self.attempts.items().len(),
            Screen::Quizzes => self.quizzes.items().len(),
            Screen::Materials => self.materials.items().len(),
            _ => 0,
        }
    }

    fn move_selection(&mut self, delta: i32) {
        let count = self.item_count();
        if count == 0 {
            return;
        }
        self.selected = if delta > 0 {
            (self.selected + delta as usize).min(count - 1)
        } else {
            self.selected.saturating_sub((-delta) as usize)
        };
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.item_count().saturating_sub(1));
    }

    fn activate_selection(&mut self) {
        let quiz_id = match self.screen {
            Screen::Dashboard => self.attempts.items().get(self.selected).map(|a| a.quiz_id.clone()),
            Screen::Quizzes => self.quizzes.items().get(self.selected).map(|q| q.id.clone()),
            _ => None,
        };
        if let Some(id) = quiz_id {
            self.open_quiz(id);
        }
    }

    fn request_delete(&mut self) {
        self.confirm = match self.screen {
            Screen::Quizzes => self.quizzes.items().get(self.selected).map(|q| Confirm::DeleteQuiz {
                id: q.id.clone(),
                title: q.title.clone(),
            }),
            Screen::Materials => {
                self.materials
                    .items()
                    .get(self.selected)
                    .map(|m| Confirm::DeleteMaterial {
                        id: m.id.clone(),
                        title: m.title.clone(),
                    })
            }
            _ => None,
        };
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(action) = self.confirm.take() {
                    self.execute_confirm(action);
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.confirm = None,
            _ => {}
        }
    }

    fn execute_confirm(&mut self, action: Confirm) {
        let api = self.api.clone();
        match action {
            Confirm::DeleteQuiz { id, .. } => self.spawn(async move {
                let result = api.delete_quiz(&id).await;
                AppEvent::QuizDeleted(id, result)
            }),
            Confirm::DeleteMaterial { id, .. } => self.spawn(async move {
                let result = api.delete_material(&id).await;
                AppEvent::MaterialDeleted(id, result)
            }),
            Confirm::Submit => self.submit(true),
            Confirm::SignOut => self.sign_out(),
        }
    }

    // ---- login ----

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.login.toggle_mode()
            }
            KeyCode::Tab | KeyCode::Down => self.login.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.login.focus_prev(),
            KeyCode::Backspace => {
                self.login.focused_mut().pop();
            }
            KeyCode::Enter => self.submit_login(),
            KeyCode::Char(c) => self.login.focused_mut().push(c),
            _ => {}
        }
    }

    fn submit_login(&mut self) {
        if self.login.pending {
            return;
        }
        let api = self.api.clone();
        match self.login.mode {
            AuthMode::Login => {
                let Some((email, password)) = self.login.credentials() else {
                    self.message = Some("Please enter your email and password.".to_string());
                    return;
                };
                self.login.pending = true;
                self.spawn(async move { AppEvent::LoggedIn(api.login(&email, &password).await) });
            }
            AuthMode::Register => {
                let Some(request) = self.login.register_request() else {
                    self.message = Some("Please fill in every field.".to_string());
                    return;
                };
                self.login.pending = true;
                self.spawn(async move { AppEvent::Registered(api.register(&request).await) });
            }
        }
    }

    // ---- generation ----

    /// Returns false for keys the generate screen leaves to the global map.
    fn handle_generate_key(&mut self, key: KeyEvent) -> bool {
        let form = &mut self.generate;
        match (key.code, form.focus) {
            (KeyCode::Down, _) => form.focus_next(),
            (KeyCode::Up, _) => form.focus_prev(),
            (KeyCode::Enter, _) => self.submit_generate(),

            (KeyCode::Left, GenerateField::Material) => form.cycle_material(&self.material_options, false),
            (KeyCode::Right, GenerateField::Material) => form.cycle_material(&self.material_options, true),

            (KeyCode::Backspace, GenerateField::Title) => {
                form.title.pop();
            }
            (KeyCode::Char(c), GenerateField::Title) => form.title.push(c),

            (KeyCode::Left | KeyCode::Char('-'), GenerateField::Count) => form.adjust_count(-1),
            (KeyCode::Right | KeyCode::Char('+'), GenerateField::Count) => form.adjust_count(1),

            (KeyCode::Left, GenerateField::Kinds) => {
                form.kind_cursor = form.kind_cursor.saturating_sub(1)
            }
            (KeyCode::Right, GenerateField::Kinds) => {
                form.kind_cursor = (form.kind_cursor + 1).min(form.kinds.len() - 1)
            }
            (KeyCode::Char(' '), GenerateField::Kinds) => form.toggle_kind(form.kind_cursor),
            _ => return false,
        }
        true
    }

    fn submit_generate(&mut self) {
        if self.generate.pending {
            return;
        }
        let request = match self.generate.request() {
            Ok(request) => request,
            Err(err) => {
                self.generate.error = Some(err.to_string());
                return;
            }
        };
        tracing::info!(
            material_id = %request.material_id,
            num_questions = request.num_questions,
            "generating quiz"
        );
        self.generate.pending = true;
        self.generate.error = None;
        let api = self.api.clone();
        self.spawn(async move { AppEvent::Generated(api.generate_quiz(&request).await) });
    }

    // ---- quiz taking ----

    fn handle_quiz_key(&mut self, key: KeyEvent) {
        let Some(session) = &mut self.session else {
            self.show(Screen::Quizzes);
            return;
        };

        match session.state().clone() {
            SessionState::Loading | SessionState::Submitting => {
                if key.code == KeyCode::Esc {
                    self.show(Screen::Quizzes);
                }
            }
            SessionState::Failed(_) => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => self.show(Screen::Quizzes),
                KeyCode::Char('r') => {
                    let id = session.quiz_id().to_string();
                    self.open_quiz(id);
                }
                _ => {}
            },
            SessionState::Ready => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    session.begin();
                }
                KeyCode::Esc | KeyCode::Char('q') => self.show(Screen::Quizzes),
                _ => {}
            },
            SessionState::InProgress => self.handle_answer_key(key),
            SessionState::Finished => match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    self.results_scroll = self.results_scroll.saturating_add(1)
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.results_scroll = self.results_scroll.saturating_sub(1)
                }
                KeyCode::Char('r') => {
                    let id = session.quiz_id().to_string();
                    self.open_quiz(id);
                }
                KeyCode::Char('d') => self.show(Screen::Dashboard),
                KeyCode::Esc | KeyCode::Char('q') => self.show(Screen::Quizzes),
                _ => {}
            },
        }
    }

    fn handle_answer_key(&mut self, key: KeyEvent) {
        let Some(session) = &mut self.session else { return };
        let Some(question) = session.current_question().cloned() else { return };
        let choices = choice_count(&question);
        let before = session.current_index();

        match key.code {
            KeyCode::Esc => {
                self.show(Screen::Quizzes);
                return;
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.submit(false);
                return;
            }
            KeyCode::Left | KeyCode::BackTab => {
                session.previous();
            }
            KeyCode::Right | KeyCode::Tab => {
                session.next();
            }
            KeyCode::Home => {
                let _ = session.go_to(0);
            }
            KeyCode::End => {
                let _ = session.go_to(session.question_count().saturating_sub(1));
            }
            KeyCode::Enter => {
                if session.is_last() {
                    self.submit(false);
                    return;
                }
                session.next();
            }
            KeyCode::Up if choices > 0 => {
                self.choice_cursor = self.choice_cursor.saturating_sub(1);
            }
            KeyCode::Down if choices > 0 => {
                self.choice_cursor = (self.choice_cursor + 1).min(choices - 1);
            }
            KeyCode::Char(' ') if choices > 0 => {
                if let Some(answer) = choice_answer(&question, self.choice_cursor) {
                    let _ = session.answer_current(answer);
                }
            }
            KeyCode::Char(c) if choices > 0 => {
                if let Some(index) = choice_for_key(&question, c) {
                    self.choice_cursor = index;
                    if let Some(answer) = choice_answer(&question, index) {
                        let _ = session.answer_current(answer);
                    }
                }
            }
            KeyCode::Char(c) if question.kind == QuestionKind::ShortAnswer => {
                let mut text = current_text(session);
                text.push(c);
                let _ = session.answer_current(Answer::Text(text));
            }
            KeyCode::Backspace if question.kind == QuestionKind::ShortAnswer => {
                let mut text = current_text(session);
                text.pop();
                let _ = session.answer_current(Answer::Text(text));
            }
            _ => {}
        }

        if session.current_index() != before {
            self.choice_cursor = 0;
        }
    }

    /// Ask to submit. Without confirmation this only validates and opens
    /// the confirmation dialog.
    fn submit(&mut self, confirmed: bool) {
        let Some(session) = &mut self.session else { return };
        match session.begin_submit(confirmed) {
            Ok(ticket) => {
                let generation = self.session_generation;
                let api = self.api.clone();
                self.spawn(async move {
                    let result = api.submit_attempt(&ticket.quiz_id, &ticket.answers).await;
                    AppEvent::Submitted {
                        generation,
                        ticket,
                        result,
                    }
                });
            }
            Err(SubmitRejection::NeedsConfirmation) => self.confirm = Some(Confirm::Submit),
            Err(SubmitRejection::NoAnswers) => {
                self.message = Some(ValidationError::NoAnswers.to_string())
            }
            Err(rejection) => tracing::debug!(?rejection, "submit ignored"),
        }
    }
}

fn current_text(session: &QuizSession) -> String {
    session
        .current_answer()
        .and_then(Answer::as_text)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_engine::models::{
        AnswerMap, GenerateQuizRequest, Pagination, Question, QuestionOutcome, RegisterRequest,
        User,
    };
    use quiz_engine::query::CollectionQuery;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    #[derive(Default)]
    pub(crate) struct StubApi {
        pub quizzes: Mutex<Vec<QuizSummary>>,
        pub list_status: Mutex<Option<ApiError>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubApi {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    pub(crate) fn summary(id: &str, title: &str) -> QuizSummary {
        QuizSummary {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            material_title: Some("Cell Biology".to_string()),
            num_questions: 1,
            attempt_count: 0,
            created_at: None,
        }
    }

    #[async_trait]
    impl QuizApi for StubApi {
        async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
            self.record(format!("login {}", email));
            if password != "secret" {
                return Err(ApiError::Unauthorized(Some("Invalid email or password".into())));
            }
            Ok(LoginResponse {
                access_token: "tok".to_string(),
                user: User {
                    id: Some("u1".into()),
                    email: email.to_string(),
                    username: Some("ada".into()),
                },
            })
        }

        async fn register(&self, request: &RegisterRequest) -> ApiResult<()> {
            self.record(format!("register {}", request.username));
            Ok(())
        }

        async fn list_materials(&self) -> ApiResult<Vec<Material>> {
            self.record("list_materials");
            Ok(Vec::new())
        }

        async fn delete_material(&self, id: &str) -> ApiResult<()> {
            self.record(format!("delete_material {}", id));
            Ok(())
        }

        async fn generate_quiz(&self, request: &GenerateQuizRequest) -> ApiResult<GeneratedQuiz> {
            self.record(format!("generate {}", request.material_id));
            Ok(GeneratedQuiz {
                quiz_id: "q1".to_string(),
            })
        }

        async fn list_quizzes(&self, query: &CollectionQuery) -> ApiResult<PagedResult<QuizSummary>> {
            self.record(format!("list_quizzes page={}", query.page));
            if let Some(err) = self.list_status.lock().unwrap().clone() {
                return Err(err);
            }
            let quizzes = self.quizzes.lock().unwrap().clone();
            let total = quizzes.len() as u32;
            Ok(PagedResult::new(
                quizzes,
                Pagination {
                    pages: (total > 0) as u32,
                    total,
                },
            ))
        }

        async fn get_quiz(&self, id: &str) -> ApiResult<Quiz> {
            self.record(format!("get_quiz {}", id));
            Ok(Quiz {
                id: id.to_string(),
                title: "Sky".to_string(),
                questions: vec![Question {
                    kind: QuestionKind::TrueFalse,
                    prompt: "Sky is blue?".to_string(),
                    options: Vec::new(),
                }],
                material_id: None,
                material_title: None,
                created_at: None,
                attempt_count: 0,
            })
        }

        async fn submit_attempt(&self, id: &str, answers: &AnswerMap) -> ApiResult<AttemptResult> {
            self.record(format!("submit {} answers={}", id, answers.len()));
            Ok(AttemptResult {
                score: 1,
                total_questions: 1,
                percentage: 100.0,
                results: vec![QuestionOutcome {
                    correct: true,
                    correct_answer: Answer::Bool(true),
                    explanation: "Rayleigh scattering".to_string(),
                }],
            })
        }

        async fn delete_quiz(&self, id: &str) -> ApiResult<()> {
            self.record(format!("delete_quiz {}", id));
            self.quizzes.lock().unwrap().retain(|q| q.id != id);
            Ok(())
        }

        async fn dashboard(&self) -> ApiResult<Dashboard> {
            self.record("dashboard");
            Ok(Dashboard::default())
        }

        async fn list_attempts(
            &self,
            query: &CollectionQuery,
        ) -> ApiResult<PagedResult<AttemptSummary>> {
            self.record(format!("list_attempts page={}", query.page));
            Ok(PagedResult::from_full(Vec::new(), query.page, query.limit))
        }
    }

    pub(crate) fn test_app(api: Arc<StubApi>, signed_in: bool) -> (App, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let credentials = Credentials::new();
        if signed_in {
            credentials.sign_in(AuthSession {
                token: "tok".into(),
                user: User {
                    id: None,
                    email: "ada@example.com".into(),
                    username: None,
                },
            });
        }
        let app = App::new(Config::default(), api, credentials, tx);
        (app, rx)
    }

    /// Feed back every event until the spawned work goes quiet.
    pub(crate) async fn settle(app: &mut App, rx: &mut UnboundedReceiver<AppEvent>) {
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
            app.handle_event(event);
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[tokio::test]
    async fn test_starts_at_login_when_signed_out() {
        let api = Arc::new(StubApi::default());
        let (mut app, mut rx) = test_app(api.clone(), false);
        assert_eq!(app.screen, Screen::Login);

        type_text(&mut app, "ada@example.com");
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "wrong");
        app.handle_key(key(KeyCode::Enter));
        settle(&mut app, &mut rx).await;

        assert_eq!(app.screen, Screen::Login);
        assert_eq!(app.message.as_deref(), Some("Invalid email or password"));
    }

    #[tokio::test]
    async fn test_login_opens_dashboard() {
        let api = Arc::new(StubApi::default());
        let (mut app, mut rx) = test_app(api.clone(), false);

        type_text(&mut app, "ada@example.com");
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "secret");
        app.handle_key(key(KeyCode::Enter));
        settle(&mut app, &mut rx).await;

        assert_eq!(app.screen, Screen::Dashboard);
        assert_eq!(app.user_label().as_deref(), Some("ada"));
        assert!(app.dashboard.is_some());
        let calls = api.calls();
        assert!(calls.contains(&"dashboard".to_string()));
        assert!(calls.contains(&"list_attempts page=1".to_string()));
    }

    #[tokio::test]
    async fn test_unauthorized_list_redirects_to_login() {
        let api = Arc::new(StubApi::default());
        *api.list_status.lock().unwrap() = Some(ApiError::Unauthorized(None));
        let (mut app, mut rx) = test_app(api.clone(), true);
        settle(&mut app, &mut rx).await;

        app.show(Screen::Quizzes);
        settle(&mut app, &mut rx).await;

        assert_eq!(app.screen, Screen::Login);
        assert!(app.user_label().is_none());
        assert!(app.message.as_deref().unwrap().contains("login again"));
    }

    #[tokio::test]
    async fn test_take_quiz_and_submit() {
        let api = Arc::new(StubApi::default());
        let (mut app, mut rx) = test_app(api.clone(), true);
        settle(&mut app, &mut rx).await;

        app.open_quiz("q1".to_string());
        settle(&mut app, &mut rx).await;
        assert_eq!(app.session.as_ref().unwrap().state(), &SessionState::Ready);

        app.handle_key(key(KeyCode::Enter));
        // Submitting with nothing answered stays local.
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            app.message.as_deref(),
            Some("Please answer at least one question before submitting.")
        );
        assert!(app.confirm.is_none());

        app.handle_key(key(KeyCode::Char('t')));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.confirm, Some(Confirm::Submit));
        app.handle_key(key(KeyCode::Char('y')));
        settle(&mut app, &mut rx).await;

        let session = app.session.as_ref().unwrap();
        assert_eq!(session.state(), &SessionState::Finished);
        let rows = session.result_rows().unwrap();
        assert_eq!(rows[0].your_answer, "True");
        assert_eq!(
            api.calls().iter().filter(|c| c.starts_with("submit")).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_abandoned_session_ignores_late_load() {
        let api = Arc::new(StubApi::default());
        let (mut app, mut rx) = test_app(api.clone(), true);
        settle(&mut app, &mut rx).await;

        app.open_quiz("q1".to_string());
        app.handle_key(key(KeyCode::Esc));
        settle(&mut app, &mut rx).await;

        assert_eq!(app.screen, Screen::Quizzes);
        assert!(app.session.is_none());
    }

    #[tokio::test]
    async fn test_delete_quiz_confirms_and_refetches() {
        let api = Arc::new(StubApi::default());
        *api.quizzes.lock().unwrap() = vec![summary("q1", "Cells"), summary("q2", "Atoms")];
        let (mut app, mut rx) = test_app(api.clone(), true);
        app.show(Screen::Quizzes);
        settle(&mut app, &mut rx).await;
        assert_eq!(app.quizzes.items().len(), 2);

        app.handle_key(key(KeyCode::Char('d')));
        assert!(matches!(app.confirm, Some(Confirm::DeleteQuiz { ref id, .. }) if id == "q1"));
        app.handle_key(key(KeyCode::Char('y')));
        settle(&mut app, &mut rx).await;

        assert_eq!(app.quizzes.items().len(), 1);
        assert_eq!(app.message.as_deref(), Some("Quiz deleted"));
    }

    #[tokio::test]
    async fn test_generate_requires_material() {
        let api = Arc::new(StubApi::default());
        let (mut app, mut rx) = test_app(api.clone(), true);
        app.show(Screen::Generate);
        settle(&mut app, &mut rx).await;

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.generate.error.as_deref(), Some("Please select a study material"));
        assert!(!api.calls().iter().any(|c| c.starts_with("generate")));
    }

    #[tokio::test]
    async fn test_invalid_date_is_reported() {
        let api = Arc::new(StubApi::default());
        let (mut app, mut rx) = test_app(api.clone(), true);
        settle(&mut app, &mut rx).await;

        app.handle_key(key(KeyCode::Char('s')));
        assert_eq!(app.input_mode, InputMode::Date(FilterKey::StartDate));
        type_text(&mut app, "yesterday");
        app.handle_key(key(KeyCode::Enter));

        assert!(app.message.as_deref().unwrap().contains("YYYY-MM-DD"));
        assert!(app.attempts.query().filters.start_date.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_on_login_stays_put() {
        let api = Arc::new(StubApi::default());
        let (mut app, _rx) = test_app(api, false);
        app.credentials.sign_in(AuthSession {
            token: "tok".into(),
            user: User {
                id: None,
                email: "ada@example.com".into(),
                username: None,
            },
        });

        let ticket = app.quizzes.refetch();
        app.handle_event(AppEvent::Quizzes(ticket.seq, Err(ApiError::Unauthorized(None))));

        assert_eq!(app.screen, Screen::Login);
        assert!(app.message.is_none());
        assert!(!app.credentials.is_signed_in());
    }

    #[tokio::test]
    async fn test_superseded_unauthorized_is_ignored() {
        let api = Arc::new(StubApi::default());
        let (mut app, mut rx) = test_app(api, true);
        app.show(Screen::Quizzes);
        settle(&mut app, &mut rx).await;

        let stale = app.quizzes.refetch();
        let latest = app.quizzes.refetch();
        app.handle_event(AppEvent::Quizzes(stale.seq, Err(ApiError::Unauthorized(None))));
        assert_eq!(app.screen, Screen::Quizzes);
        assert!(app.credentials.is_signed_in());

        app.handle_event(AppEvent::Quizzes(
            latest.seq,
            Ok(PagedResult::from_full(Vec::new(), 1, 8)),
        ));
        assert!(app.quizzes.error().is_none());
        assert!(app.credentials.is_signed_in());
    }
}
