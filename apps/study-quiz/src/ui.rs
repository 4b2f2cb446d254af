//! UI rendering for study-quiz.

use crate::app::{App, InputMode, Screen};
use crate::forms::{AuthField, AuthMode, GenerateField};
use quiz_engine::list::{Collection, ListController};
use quiz_engine::models::{QuestionKind, MAX_QUESTIONS, MIN_QUESTIONS};
use quiz_engine::query::FilterKey;
use quiz_engine::question::{question_view, ChoiceRow, QuestionView};
use quiz_engine::results::{self, Verdict};
use quiz_engine::session::{QuizSession, SessionState};
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Tabs, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &App) {
    if app.screen == Screen::Login {
        draw_login(f, app);
    } else {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());

        draw_header(f, app, chunks[0]);
        match app.screen {
            Screen::Dashboard => draw_dashboard(f, app, chunks[1]),
            Screen::Quizzes => draw_quizzes(f, app, chunks[1]),
            Screen::Materials => draw_materials(f, app, chunks[1]),
            Screen::Generate => draw_generate(f, app, chunks[1]),
            Screen::TakeQuiz => draw_take_quiz(f, app, chunks[1]),
            Screen::Login => {}
        }
        draw_footer(f, app, chunks[2]);
    }

    if app.input_mode != InputMode::Normal {
        draw_input(f, app);
    }
    if let Some(confirm) = &app.confirm {
        draw_confirm(f, &confirm.prompt());
    }
    if app.show_help {
        draw_help(f);
    }
    if let Some(msg) = &app.message {
        draw_message(f, msg);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let title = match app.user_label() {
        Some(user) => format!(" Study Quiz | {} ", user),
        None => " Study Quiz ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if app.screen == Screen::TakeQuiz {
        let name = app
            .session
            .as_ref()
            .and_then(QuizSession::quiz)
            .map(|q| q.title.as_str())
            .unwrap_or("Quiz");
        let header = Paragraph::new(name)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(header, area);
        return;
    }

    let titles: Vec<String> = Screen::tabs()
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{} {}", i + 1, s.name()))
        .collect();
    let selected = Screen::tabs().iter().position(|s| *s == app.screen).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .block(block)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .select(selected);
    f.render_widget(tabs, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints = match app.screen {
        Screen::Dashboard => "j/k:Select  Enter:Retake  /:Search  s/e:Dates  c:Clear  n/p:Page  ?:Help",
        Screen::Quizzes => "j/k:Select  Enter:Take  d:Delete  /:Search  m:Material  c:Clear  n/p:Page  ?:Help",
        Screen::Materials => "j/k:Select  g:Generate quiz  d:Delete  /:Search  n/p:Page  ?:Help",
        Screen::Generate => "Up/Down:Field  Left/Right:Change  Space:Toggle  Enter:Generate  Tab:Next tab",
        Screen::TakeQuiz => quiz_hints(app),
        Screen::Login => "",
    };
    let footer = Paragraph::new(hints)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

fn quiz_hints(app: &App) -> &'static str {
    let Some(session) = &app.session else { return "Esc:Back" };
    match session.state() {
        SessionState::Loading | SessionState::Submitting => "Esc:Back",
        SessionState::Failed(_) => "r:Retry  Esc:Back",
        SessionState::Ready => "Enter:Start  Esc:Back",
        SessionState::InProgress if session.is_last() => {
            "Left/Right:Prev/Next  Up/Down+Space or letter:Choose  Enter:Submit  Esc:Leave"
        }
        SessionState::InProgress => {
            "Left/Right:Prev/Next  Up/Down+Space or letter:Choose  Enter:Next  Ctrl+S:Submit  Esc:Leave"
        }
        SessionState::Finished => "j/k:Scroll  r:Retake  d:Dashboard  Esc:Quizzes",
    }
}

// ---- login ----

fn draw_login(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 60, f.area());
    let form = &app.login;
    let title = match form.mode {
        AuthMode::Login => " Login ",
        AuthMode::Register => " Register ",
    };

    let mut lines = vec![Line::from("")];
    for field in form.fields() {
        let (label, value) = match field {
            AuthField::Username => ("Username", form.username.clone()),
            AuthField::Email => ("Email", form.email.clone()),
            AuthField::Password => ("Password", "*".repeat(form.password.chars().count())),
        };
        let style = if *field == form.focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:>10}: ", label), style.add_modifier(Modifier::BOLD)),
            Span::styled(value, style),
        ]));
        lines.push(Line::from(""));
    }

    let status = if form.pending {
        "Please wait..."
    } else {
        match form.mode {
            AuthMode::Login => "Enter:Login  Tab:Next field  Ctrl+R:Register  Esc:Quit",
            AuthMode::Register => "Enter:Register  Tab:Next field  Ctrl+R:Back to login  Esc:Quit",
        }
    };
    lines.push(Line::from(Span::styled(status, Style::default().fg(Color::DarkGray))));

    let login = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(Clear, area);
    f.render_widget(login, area);
}

// ---- lists ----

/// Placeholder shown instead of a table, if the list has nothing to show.
fn list_placeholder<C: Collection>(list: &ListController<C>, empty: &str) -> Option<Paragraph<'static>> {
    let (text, color) = if list.is_initial_load() {
        match list.error() {
            Some(err) => (err.to_string(), Color::Red),
            None => ("Loading...".to_string(), Color::DarkGray),
        }
    } else if list.items().is_empty() {
        (empty.to_string(), Color::DarkGray)
    } else {
        return None;
    };
    Some(
        Paragraph::new(text)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center),
    )
}

fn pagination<C: Collection>(list: &ListController<C>) -> Line<'static> {
    let mut spans = vec![Span::raw(format!(
        "Page {} of {} ({} total)",
        list.page(),
        list.last_page(),
        list.total()
    ))];
    if list.is_loading() {
        spans.push(Span::styled("  loading...", Style::default().fg(Color::DarkGray)));
    }
    if let (false, Some(err)) = (list.is_initial_load(), list.error()) {
        spans.push(Span::styled(format!("  {}", err), Style::default().fg(Color::Red)));
    }
    Line::from(spans)
}

/// Render a list region: filter line, table (or placeholder), pagination.
fn draw_list<C: Collection>(
    f: &mut Frame,
    area: Rect,
    title: &str,
    filters: Line,
    list: &ListController<C>,
    empty: &str,
    table: impl FnOnce() -> Table<'static>,
) {
    let block = Block::default().borders(Borders::ALL).title(format!(" {} ", title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    f.render_widget(Paragraph::new(filters), chunks[0]);
    match list_placeholder(list, empty) {
        Some(placeholder) => f.render_widget(placeholder, chunks[1]),
        None => f.render_widget(table(), chunks[1]),
    }
    f.render_widget(Paragraph::new(pagination(list)), chunks[2]);
}

fn row_style(selected: bool) -> Style {
    if selected {
        Style::default().bg(Color::DarkGray)
    } else {
        Style::default()
    }
}

fn header_row(cells: Vec<&'static str>) -> Row<'static> {
    Row::new(cells).style(Style::default().add_modifier(Modifier::BOLD))
}

fn format_date(at: Option<DateTime<Utc>>) -> String {
    at.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn filter_span(label: &str, value: Option<String>) -> Vec<Span<'static>> {
    let active = value.is_some();
    vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::DarkGray)),
        Span::styled(
            value.unwrap_or_else(|| "-".to_string()),
            if active {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            },
        ),
        Span::raw("  "),
    ]
}

fn search_value(input: &str) -> Option<String> {
    (!input.is_empty()).then(|| input.to_string())
}

fn draw_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(7), Constraint::Min(8)])
        .split(area);

    let stats = match (&app.dashboard, &app.dashboard_error) {
        (_, Some(err)) => Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))),
        (Some(d), None) => Line::from(vec![
            Span::raw("Materials: "),
            Span::styled(d.stats.total_materials.to_string(), Style::default().fg(Color::Cyan)),
            Span::raw("  Quizzes: "),
            Span::styled(d.stats.total_quizzes.to_string(), Style::default().fg(Color::Cyan)),
            Span::raw("  Attempts: "),
            Span::styled(d.stats.total_attempts.to_string(), Style::default().fg(Color::Cyan)),
            Span::raw("  Average score: "),
            Span::styled(
                format!("{:.1}%", d.stats.average_score),
                Style::default().fg(Color::Green),
            ),
        ]),
        (None, None) => Line::from("Loading..."),
    };
    f.render_widget(
        Paragraph::new(stats).block(Block::default().borders(Borders::ALL).title(" Overview ")),
        chunks[0],
    );

    let recent: Vec<ListItem> = app
        .dashboard
        .as_ref()
        .map(|d| d.recent_quizzes.as_slice())
        .unwrap_or(&[])
        .iter()
        .map(|q| {
            ListItem::new(Line::from(vec![
                Span::raw(q.title.clone()),
                Span::styled(
                    format!("  {} questions, {} attempts", q.num_questions, q.attempt_count),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    let recent = if recent.is_empty() {
        List::new(vec![ListItem::new("No quizzes yet.")])
    } else {
        List::new(recent)
    };
    let recent_area = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);
    f.render_widget(
        recent.block(Block::default().borders(Borders::ALL).title(" Recent Quizzes ")),
        recent_area[0],
    );

    let materials: Vec<ListItem> = app
        .recent_materials()
        .iter()
        .map(|m| ListItem::new(m.title.clone()))
        .collect();
    let materials = if materials.is_empty() {
        List::new(vec![ListItem::new("No study materials yet.")])
    } else {
        List::new(materials)
    };
    f.render_widget(
        materials.block(Block::default().borders(Borders::ALL).title(" Recent Materials ")),
        recent_area[1],
    );

    let query = app.attempts.query();
    let mut filters = filter_span("Search", search_value(app.attempts.search_input()));
    filters.extend(filter_span("From", query.filters.start_date.map(|d| d.to_string())));
    filters.extend(filter_span("To", query.filters.end_date.map(|d| d.to_string())));

    let empty = if query.is_filtered() {
        "No attempts match your filters."
    } else {
        "No quiz attempts yet."
    };

    draw_list(f, chunks[2], "Quiz Attempts", Line::from(filters), &app.attempts, empty, || {
        let rows: Vec<Row> = app
            .attempts
            .items()
            .iter()
            .enumerate()
            .map(|(i, a)| {
                Row::new(vec![
                    Cell::from(a.quiz_title.clone().unwrap_or_else(|| "Untitled quiz".to_string())),
                    Cell::from(format!("{}/{}", a.score, a.total_questions)),
                    Cell::from(format!("{:.1}%", a.percentage)).style(score_style(a.percentage)),
                    Cell::from(format_date(a.created_at)),
                ])
                .style(row_style(i == app.selected))
            })
            .collect();
        Table::new(
            rows,
            [
                Constraint::Percentage(45),
                Constraint::Percentage(15),
                Constraint::Percentage(15),
                Constraint::Percentage(25),
            ],
        )
        .header(header_row(vec!["Quiz", "Score", "Percent", "Date"]))
    });
}

fn score_style(percentage: f64) -> Style {
    let color = if percentage >= 80.0 {
        Color::Green
    } else if percentage >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    };
    Style::default().fg(color)
}

fn draw_quizzes(f: &mut Frame, app: &App, area: Rect) {
    let query = app.quizzes.query();
    let material = query
        .filters
        .material
        .as_deref()
        .map(|id| app.material_title(id).unwrap_or(id).to_string());
    let mut filters = filter_span("Search", search_value(app.quizzes.search_input()));
    filters.extend(filter_span("Material", material));

    let empty = if query.is_filtered() {
        "No quizzes match your filters."
    } else {
        "No quizzes yet. Generate one from a study material."
    };

    draw_list(f, area, "Quizzes", Line::from(filters), &app.quizzes, empty, || {
        let rows: Vec<Row> = app
            .quizzes
            .items()
            .iter()
            .enumerate()
            .map(|(i, q)| {
                Row::new(vec![
                    Cell::from(q.title.clone()),
                    Cell::from(q.material_title.clone().unwrap_or_else(|| "-".to_string())),
                    Cell::from(q.num_questions.to_string()),
                    Cell::from(q.attempt_count.to_string()),
                    Cell::from(format_date(q.created_at)),
                ])
                .style(row_style(i == app.selected))
            })
            .collect();
        Table::new(
            rows,
            [
                Constraint::Percentage(35),
                Constraint::Percentage(25),
                Constraint::Percentage(10),
                Constraint::Percentage(10),
                Constraint::Percentage(20),
            ],
        )
        .header(header_row(vec!["Title", "Material", "Questions", "Attempts", "Created"]))
    });
}

fn draw_materials(f: &mut Frame, app: &App, area: Rect) {
    let filters = filter_span("Search", search_value(app.materials.search_input()));
    let empty = if app.materials.query().is_filtered() {
        "No materials match your search."
    } else {
        "No study materials yet."
    };

    draw_list(f, area, "Study Materials", Line::from(filters), &app.materials, empty, || {
        let rows: Vec<Row> = app
            .materials
            .items()
            .iter()
            .enumerate()
            .map(|(i, m)| {
                Row::new(vec![
                    Cell::from(m.title.clone()),
                    Cell::from(m.description.clone().unwrap_or_default()),
                    Cell::from(m.tags.join(", ")),
                    Cell::from(format_date(m.created_at)),
                ])
                .style(row_style(i == app.selected))
            })
            .collect();
        Table::new(
            rows,
            [
                Constraint::Percentage(30),
                Constraint::Percentage(35),
                Constraint::Percentage(15),
                Constraint::Percentage(20),
            ],
        )
        .header(header_row(vec!["Title", "Description", "Tags", "Created"]))
    });
}

// ---- generation ----

fn draw_generate(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.generate;
    let focus_style = |field: GenerateField| {
        if form.focus == field {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        }
    };

    let material = form
        .selected_material(&app.material_options)
        .map(|i| app.material_options[i].title.clone())
        .unwrap_or_else(|| {
            if app.material_options.is_empty() {
                "No study materials yet. Create one first.".to_string()
            } else {
                "Select a material".to_string()
            }
        });

    let kinds: Vec<Span> = QuestionKind::GENERATABLE
        .iter()
        .zip(form.kinds)
        .enumerate()
        .flat_map(|(i, (kind, on))| {
            let mark = if on { "[x]" } else { "[ ]" };
            let style = if form.focus == GenerateField::Kinds && form.kind_cursor == i {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            vec![Span::styled(format!("{} {}", mark, kind.label()), style), Span::raw("  ")]
        })
        .collect();

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("Material:   ", focus_style(GenerateField::Material)),
            Span::raw(format!("< {} >", material)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Title:      ", focus_style(GenerateField::Title)),
            Span::raw(if form.title.is_empty() && form.focus != GenerateField::Title {
                "(optional)".to_string()
            } else {
                form.title.clone()
            }),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Questions:  ", focus_style(GenerateField::Count)),
            Span::raw(format!(
                "< {} >  ({}-{})",
                form.num_questions, MIN_QUESTIONS, MAX_QUESTIONS
            )),
        ]),
        Line::from(""),
        Line::from(
            std::iter::once(Span::styled("Types:      ", focus_style(GenerateField::Kinds)))
                .chain(kinds)
                .collect::<Vec<_>>(),
        ),
        Line::from(""),
    ];

    if form.pending {
        lines.push(Line::from(Span::styled(
            "Generating quiz...",
            Style::default().fg(Color::Cyan),
        )));
    } else if let Some(err) = &form.error {
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }

    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Generate Quiz "))
        .wrap(Wrap { trim: false });
    f.render_widget(body, area);
}

// ---- quiz taking ----

fn draw_take_quiz(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let Some(session) = &app.session else {
        f.render_widget(Paragraph::new("No quiz selected.").block(block), area);
        return;
    };

    match session.state() {
        SessionState::Loading => {
            let p = Paragraph::new("Loading quiz...")
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(p, area);
        }
        SessionState::Failed(err) => {
            let p = Paragraph::new(err.message())
                .style(Style::default().fg(Color::Red))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block.title(" Error "));
            f.render_widget(p, area);
        }
        SessionState::Ready => draw_quiz_intro(f, session, area),
        SessionState::InProgress | SessionState::Submitting => draw_question(f, app, session, area),
        SessionState::Finished => draw_results(f, app, session, area),
    }
}

fn draw_quiz_intro(f: &mut Frame, session: &QuizSession, area: Rect) {
    let Some(quiz) = session.quiz() else { return };
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            quiz.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("{} questions", quiz.question_count())),
    ];
    if let Some(material) = &quiz.material_title {
        lines.push(Line::from(format!("Material: {}", material)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Enter to start",
        Style::default().fg(Color::Yellow),
    )));

    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

/// One cell per question: current one highlighted, answered ones green.
fn nav_strip(session: &QuizSession) -> Line<'static> {
    let spans: Vec<Span> = (0..session.question_count())
        .map(|i| {
            let mut style = if session.answers().is_answered(i) {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            if i == session.current_index() {
                style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
            }
            Span::styled(format!(" {} ", i + 1), style)
        })
        .collect();
    Line::from(spans)
}

fn choice_line(row: &ChoiceRow, highlighted: bool) -> Line<'static> {
    let mark = if row.selected { "(*)" } else { "( )" };
    let pointer = if highlighted { "> " } else { "  " };
    let style = if row.selected {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let label = if row.marker.is_empty() {
        row.text.clone()
    } else {
        format!("{} {}", row.marker, row.text)
    };
    Line::from(vec![
        Span::raw(pointer),
        Span::styled(format!("{} {}", mark, label), style),
    ])
}

fn draw_question(f: &mut Frame, app: &App, session: &QuizSession, area: Rect) {
    let Some(question) = session.current_question() else { return };
    let view = question_view(question, session.current_answer());

    let mut lines = vec![
        Line::from(Span::styled(
            format!(
                "Question {} of {}",
                session.current_index() + 1,
                session.question_count()
            ),
            Style::default().fg(Color::DarkGray),
        )),
        nav_strip(session),
        Line::from(""),
        Line::from(Span::styled(
            view.prompt().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    match &view {
        QuestionView::Choices { rows, .. } => {
            lines.extend(
                rows.iter()
                    .enumerate()
                    .map(|(i, row)| choice_line(row, i == app.choice_cursor)),
            );
        }
        QuestionView::TrueFalse { rows, .. } => {
            lines.extend(
                rows.iter()
                    .enumerate()
                    .map(|(i, row)| choice_line(row, i == app.choice_cursor)),
            );
        }
        QuestionView::FreeText { text, .. } => {
            lines.push(Line::from(Span::styled(
                "Your answer:",
                Style::default().fg(Color::DarkGray),
            )));
            lines.push(Line::from(Span::styled(
                format!("{}_", text),
                Style::default().fg(Color::Yellow),
            )));
        }
        QuestionView::Unsupported { kind, .. } => {
            lines.push(Line::from(Span::styled(
                format!("Unknown question type: {}", kind),
                Style::default().fg(Color::Yellow),
            )));
        }
    }

    lines.push(Line::from(""));
    if session.state() == &SessionState::Submitting {
        lines.push(Line::from(Span::styled(
            "Submitting...",
            Style::default().fg(Color::Cyan),
        )));
    } else if let Some(failure) = session.failure() {
        lines.push(Line::from(Span::styled(
            failure.message(),
            Style::default().fg(Color::Red),
        )));
    }

    let primary = if session.is_last() { " Enter: Submit " } else { " Enter: Next " };
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title_bottom(primary));
    f.render_widget(p, area);
}

fn draw_results(f: &mut Frame, app: &App, session: &QuizSession, area: Rect) {
    let (Some(outcome), Some(rows)) = (session.outcome(), session.result_rows()) else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            "Quiz Results",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            results::summary(&outcome.result),
            score_style(outcome.result.percentage).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for row in rows {
        let verdict_style = match row.verdict {
            Verdict::Correct => Style::default().fg(Color::Green),
            Verdict::Incorrect => Style::default().fg(Color::Red),
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("Question {}: ", row.number),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(row.prompt),
            Span::raw("  "),
            Span::styled(row.verdict.label(), verdict_style),
        ]));
        lines.push(Line::from(format!("  Your answer: {}", row.your_answer)));
        lines.push(Line::from(format!("  Correct answer: {}", row.correct_answer)));
        if !row.explanation.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  Explanation: {}", row.explanation),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.push(Line::from(""));
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.results_scroll, 0))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

// ---- overlays ----

fn draw_input(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 15, f.area());
    f.render_widget(Clear, area);

    let title = match app.input_mode {
        InputMode::Search => "Search",
        InputMode::Date(FilterKey::StartDate) => "Start date (YYYY-MM-DD, empty clears)",
        InputMode::Date(_) => "End date (YYYY-MM-DD, empty clears)",
        InputMode::Normal => "",
    };

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title)));
    f.render_widget(input, area);

    f.set_cursor_position((area.x + 1 + app.input_buffer.chars().count() as u16, area.y + 1));
}

fn draw_confirm(f: &mut Frame, prompt: &str) {
    let area = centered_rect(60, 20, f.area());
    f.render_widget(Clear, area);

    let lines = vec![
        Line::from(prompt.to_string()),
        Line::from(""),
        Line::from(Span::styled("y:Yes  n:No", Style::default().fg(Color::DarkGray))),
    ];
    let popup = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Confirm "));
    f.render_widget(popup, area);
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let help = r#"
Study Quiz Keybindings

Global:
  Tab/Shift-Tab   Next/previous screen
  1-4             Jump to screen
  L               Sign out
  q               Quit

Lists:
  j/k, Up/Down    Select
  n/p             Next/previous page
  /               Search
  c               Clear filters
  r               Reload

Quiz:
  Left/Right      Previous/next question
  Home/End        First/last question
  A-Z, t/f        Choose an answer
  Enter           Next question, Submit on the last
  Ctrl+S          Submit

Press any key to close
"#;

    let popup = Paragraph::new(help)
        .block(Block::default().borders(Borders::ALL).title(" Help "))
        .wrap(Wrap { trim: false });
    f.render_widget(popup, area);
}

fn draw_message(f: &mut Frame, msg: &str) {
    let area = Rect::new(
        f.area().x + 2,
        f.area().height.saturating_sub(5),
        f.area().width.saturating_sub(4),
        3,
    );
    f.render_widget(Clear, area);

    let message = Paragraph::new(msg)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{settle, summary, test_app, StubApi};
    use quiz_engine::models::{Answer, AttemptResult, Material, Question, QuestionOutcome, Quiz};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        (area.y..area.y + area.height)
            .map(|y| {
                (area.x..area.x + area.width)
                    .filter_map(|x| buffer.cell((x, y)).map(|c| c.symbol().to_string()))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn quiz(questions: Vec<Question>) -> Quiz {
        Quiz {
            id: "q1".to_string(),
            title: "Geography".to_string(),
            questions,
            material_id: None,
            material_title: None,
            created_at: None,
            attempt_count: 0,
        }
    }

    fn question(kind: QuestionKind, prompt: &str, options: &[&str]) -> Question {
        Question {
            kind,
            prompt: prompt.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn started(quiz: Quiz) -> QuizSession {
        let mut session = QuizSession::new(quiz.id.clone());
        let ticket = session.load_ticket();
        session.finish_load(ticket, Ok(quiz));
        session.begin();
        session
    }

    #[tokio::test]
    async fn test_quiz_list_pagination_and_rows() {
        let api = Arc::new(StubApi::default());
        *api.quizzes.lock().unwrap() = vec![summary("q1", "Cells"), summary("q2", "Atoms")];
        let (mut app, mut rx) = test_app(api, true);
        app.show(Screen::Quizzes);
        settle(&mut app, &mut rx).await;

        let screen = render(&app);
        assert!(screen.contains("Page 1 of 1 (2 total)"));
        assert!(screen.contains("Cells"));
        assert!(screen.contains("Atoms"));
    }

    #[tokio::test]
    async fn test_quiz_list_empty_states() {
        let api = Arc::new(StubApi::default());
        let (mut app, mut rx) = test_app(api, true);
        app.show(Screen::Quizzes);
        settle(&mut app, &mut rx).await;
        assert!(render(&app).contains("No quizzes yet."));

        let ticket = app
            .quizzes
            .set_filter(quiz_engine::query::Filter::Material("m1".into()))
            .unwrap();
        let result = Ok(quiz_engine::models::PagedResult::from_full(Vec::new(), 1, 8));
        app.quizzes.apply(ticket.seq, result);
        assert!(render(&app).contains("No quizzes match your filters."));
    }

    #[tokio::test]
    async fn test_question_kinds_render() {
        let api = Arc::new(StubApi::default());
        let (mut app, _rx) = test_app(api, true);
        app.screen = Screen::TakeQuiz;
        let mut session = started(quiz(vec![
            question(QuestionKind::MultipleChoice, "Capital of France?", &["Paris", "Rome"]),
            question(QuestionKind::Unknown("ordering".into()), "Sort these", &[]),
        ]));
        session.answer(0, "Rome").unwrap();
        app.session = Some(session);

        let screen = render(&app);
        assert!(screen.contains("Question 1 of 2"));
        assert!(screen.contains("( ) A. Paris"));
        assert!(screen.contains("(*) B. Rome"));
        assert!(screen.contains("Enter: Next"));

        app.session.as_mut().unwrap().next();
        let screen = render(&app);
        assert!(screen.contains("Unknown question type: ordering"));
        assert!(screen.contains("Enter: Submit"));
    }

    #[tokio::test]
    async fn test_results_render() {
        let api = Arc::new(StubApi::default());
        let (mut app, _rx) = test_app(api, true);
        app.screen = Screen::TakeQuiz;
        let mut session = started(quiz(vec![
            question(QuestionKind::TrueFalse, "Sky is blue?", &[]),
            question(QuestionKind::ShortAnswer, "Largest ocean?", &[]),
        ]));
        session.answer(0, true).unwrap();
        let ticket = session.begin_submit(true).unwrap();
        session.finish_submit(
            ticket,
            Ok(AttemptResult {
                score: 1,
                total_questions: 2,
                percentage: 50.0,
                results: vec![
                    QuestionOutcome {
                        correct: true,
                        correct_answer: Answer::Bool(true),
                        explanation: "Rayleigh scattering".into(),
                    },
                    QuestionOutcome {
                        correct: false,
                        correct_answer: Answer::text("Pacific"),
                        explanation: String::new(),
                    },
                ],
            }),
        );
        app.session = Some(session);

        let screen = render(&app);
        assert!(screen.contains("Score: 1/2 (50.0%)"));
        assert!(screen.contains("Your answer: True"));
        assert!(screen.contains("Correct answer: True"));
        assert!(screen.contains("Your answer: No answer"));
        assert!(screen.contains("Correct answer: Pacific"));
    }

    #[tokio::test]
    async fn test_login_masks_password() {
        let api = Arc::new(StubApi::default());
        let (mut app, _rx) = test_app(api, false);
        app.login.password = "secret".into();

        let screen = render(&app);
        assert!(screen.contains("******"));
        assert!(!screen.contains("secret"));
    }

    #[tokio::test]
    async fn test_dashboard_recent_materials_fallback() {
        let api = Arc::new(StubApi::default());
        let (mut app, mut rx) = test_app(api, true);
        settle(&mut app, &mut rx).await;
        app.material_options = ["Cell Biology", "Organic Chemistry", "Optics", "Genetics"]
            .iter()
            .enumerate()
            .map(|(i, title)| Material {
                id: format!("m{}", i),
                title: title.to_string(),
                description: None,
                tags: Vec::new(),
                created_at: None,
            })
            .collect();

        let screen = render(&app);
        assert!(screen.contains("Recent Materials"));
        assert!(screen.contains("Cell Biology"));
        assert!(screen.contains("Optics"));
        assert!(!screen.contains("Genetics"));

        app.dashboard.as_mut().unwrap().recent_materials = Some(vec![app.material_options[3].clone()]);
        let screen = render(&app);
        assert!(screen.contains("Genetics"));
        assert!(!screen.contains("Cell Biology"));
    }
}
