use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, ConfirmTarget, InputMode, NotificationLevel, PromptKind, View};
use crate::models::{Difficulty, PlanStatus, Priority, Problem, ProblemStatus};
use crate::tui::form::{NoteField, ProblemField};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // View tabs
            Constraint::Min(0),    // Current view
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    render_tabs(frame, app, chunks[0]);

    match app.view {
        View::Problems => render_problems(frame, app, chunks[1]),
        View::Dashboard => render_dashboard(frame, app, chunks[1]),
        View::Notes => render_notes(frame, app, chunks[1]),
        View::Compiler => render_compiler(frame, app, chunks[1]),
    }

    render_status(frame, app, chunks[2]);

    match &app.mode {
        InputMode::Help => render_help(frame),
        InputMode::Prompt(kind) => render_prompt(frame, app, *kind),
        InputMode::ProblemForm => render_problem_form(frame, app),
        InputMode::NoteForm => render_note_form(frame, app),
        InputMode::Confirm(target) => render_confirm(frame, target),
        InputMode::Normal => {}
    }
}

fn difficulty_color(difficulty: Difficulty) -> Color {
    match difficulty {
        Difficulty::Easy => Color::Green,
        Difficulty::Medium => Color::Yellow,
        Difficulty::Hard => Color::Red,
    }
}

fn status_color(status: ProblemStatus) -> Color {
    match status {
        ProblemStatus::NotStarted => Color::DarkGray,
        ProblemStatus::InProgress => Color::Yellow,
        ProblemStatus::Completed => Color::Green,
        ProblemStatus::Failed => Color::Red,
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn plan_status_label(status: PlanStatus) -> &'static str {
    match status {
        PlanStatus::Pending => "Pending",
        PlanStatus::InProgress => "In Progress",
        PlanStatus::Completed => "Completed",
    }
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = View::ALL.iter().map(|v| Line::from(v.label())).collect();
    let selected = View::ALL.iter().position(|v| *v == app.view).unwrap_or(0);

    let title = format!(" LeetCode Tracker | {} ", app.username);
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(tabs, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if let Some(n) = &app.notification {
        let color = match n.level {
            NotificationLevel::Info => Color::Green,
            NotificationLevel::Error => Color::Red,
        };
        (n.message.clone(), Style::default().fg(color))
    } else if let Some(busy) = app.busy_label() {
        (busy, Style::default().fg(Color::Yellow))
    } else if app.problems.loading {
        ("Loading problems...".to_string(), Style::default().fg(Color::Yellow))
    } else {
        let hints = match app.view {
            View::Problems => "j/k:nav  a:add  e:edit  x:status  s:star  /:search  A:analyze  ?:help  q:quit",
            View::Dashboard => "I:insights  R:recommendations  P:plan  c:plan status  ?:help  q:quit",
            View::Notes => "a:add  e:edit  d:delete  /:search  ?:help  q:quit",
            View::Compiler => "l:language  r:run  o:open  w:write  c:clear  ?:help  q:quit",
        };
        (hints.to_string(), Style::default().fg(Color::DarkGray))
    };

    frame.render_widget(Paragraph::new(text).style(style), area);
}

// Problems view

fn render_problems(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_problem_list(frame, app, chunks[0]);
    render_problem_detail(frame, app, chunks[1]);
}

fn render_problem_list(frame: &mut Frame, app: &App, area: Rect) {
    let problems = app.visible_problems();

    let items: Vec<ListItem> = problems
        .iter()
        .map(|p| {
            let star = if p.is_starred { "★ " } else { "  " };
            let line = Line::from(vec![
                Span::styled(star, Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!("{:<7}", p.difficulty.label()),
                    Style::default().fg(difficulty_color(p.difficulty)),
                ),
                Span::raw(p.title.clone()),
                Span::styled(
                    format!("  {}", p.status.label()),
                    Style::default().fg(status_color(p.status)),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let title = format!(
        " {}/{} | {} | sort: {} ",
        problems.len(),
        app.problems.problems.len(),
        app.filter.label(),
        app.sort.label()
    );

    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !problems.is_empty() {
        state.select(Some(app.selected_problem));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn field_line(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(Color::Blue)),
        Span::raw(value.into()),
    ])
}

fn section(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    ))
}

fn push_text(lines: &mut Vec<Line<'static>>, text: &str) {
    lines.extend(text.lines().map(|l| Line::from(l.to_string())));
}

fn problem_lines(app: &App, p: &Problem) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                p.difficulty.label(),
                Style::default().fg(difficulty_color(p.difficulty)),
            ),
            Span::raw("  "),
            Span::styled(p.status.label(), Style::default().fg(status_color(p.status))),
            Span::raw(if p.is_starred { "  ★" } else { "" }),
        ]),
        field_line("Category", p.category.clone()),
        field_line("Attempts", p.attempts.to_string()),
    ];

    if let Some(done) = p.completed_at {
        lines.push(field_line("Completed", done.format("%Y-%m-%d").to_string()));
    }
    if !p.tags.is_empty() {
        lines.push(field_line("Tags", p.tags.join(", ")));
    }
    if !p.url.is_empty() {
        lines.push(field_line("URL", p.url.clone()));
    }
    if !p.time_complexity.is_empty() || !p.space_complexity.is_empty() {
        lines.push(field_line(
            "Complexity",
            format!("time {}  space {}", p.time_complexity, p.space_complexity),
        ));
    }

    if let Some(description) = p.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(Line::default());
        lines.push(section("Description"));
        push_text(&mut lines, description);
    }
    if !p.notes.is_empty() {
        lines.push(Line::default());
        lines.push(section("Notes"));
        push_text(&mut lines, &p.notes);
    }
    if !p.solution.is_empty() {
        lines.push(Line::default());
        lines.push(section(&format!("Solution ({})", p.language)));
        push_text(&mut lines, &p.solution);
    }
    if let Some(analysis) = app.assistant.latest_analysis(&p.id) {
        lines.push(Line::default());
        lines.push(section(&format!(
            "AI Analysis ({})",
            analysis.created_at.format("%Y-%m-%d")
        )));
        push_text(&mut lines, &analysis.analysis.to_text());
    }

    let suggested = app.assistant.recommendations_for_category(&p.category);
    if !suggested.is_empty() {
        lines.push(Line::default());
        lines.push(section(&format!("Suggested practice in {}", p.category)));
        for rec in suggested {
            lines.push(Line::from(format!(
                "  {} ~{} min: {}",
                rec.difficulty.label(),
                rec.estimated_time,
                rec.reason
            )));
        }
    }

    lines
}

fn render_problem_detail(frame: &mut Frame, app: &App, area: Rect) {
    let (title, lines) = match app.selected_problem() {
        Some(p) => (format!(" {} ", p.title), problem_lines(app, p)),
        None if app.problems.problems.is_empty() => (
            " No problems ".to_string(),
            vec![Line::from("No problems yet. Press 'a' to add one or 'i' to import from LeetCode.")],
        ),
        None => (
            " No match ".to_string(),
            vec![Line::from("No problems match the current filters.")],
        ),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

// Dashboard view

fn percent_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_stats(frame, app, chunks[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_insights_and_plan(frame, app, right[0]);
    render_recommendations(frame, app, right[1]);
}

fn render_stats(frame: &mut Frame, app: &App, area: Rect) {
    let stats = &app.problems.stats;
    let rate = stats.completion_rate();

    let mut lines = vec![field_line("Total", stats.total.to_string())];
    for status in ProblemStatus::ALL {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<12}", status.label()),
                Style::default().fg(status_color(status)),
            ),
            Span::raw(stats.status(status).to_string()),
        ]));
    }
    lines.push(Line::from(format!("{} {:.1}%", percent_bar(rate, 20), rate)));
    lines.push(Line::default());
    lines.push(section("By difficulty"));

    for difficulty in Difficulty::ALL {
        let bucket = stats.difficulty(difficulty);
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<8}", difficulty.label()),
                Style::default().fg(difficulty_color(difficulty)),
            ),
            Span::raw(format!(
                "{} {}/{}",
                percent_bar(bucket.percent(), 12),
                bucket.completed,
                bucket.total
            )),
        ]));
    }

    if !stats.categories.is_empty() {
        lines.push(Line::default());
        lines.push(section("By category"));
        for (category, bucket) in &stats.categories {
            lines.push(Line::from(format!(
                "{category}: {}/{} ({:.0}%)",
                bucket.completed,
                bucket.total,
                bucket.percent()
            )));
        }
    }

    let block = Block::default()
        .title(" Progress ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_insights_and_plan(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();

    match &app.assistant.insights {
        Some(insights) => {
            let progress = &insights.overall_progress;
            let plan = &insights.study_plan;
            lines.push(section("Insights"));
            lines.push(field_line("Completion", format!("{:.1}%", progress.completion_rate)));
            lines.push(field_line("Avg attempts", format!("{:.1}", progress.average_attempts)));
            lines.push(field_line("Strongest", progress.strongest_category.clone()));
            lines.push(field_line("Weakest", progress.weakest_category.clone()));
            lines.push(field_line("Trend", progress.improvement_trend.clone()));
            lines.push(field_line(
                "Goals",
                format!("{} / day, {} / week", plan.daily_goal, plan.weekly_goal),
            ));
            lines.push(field_line("Focus", plan.focus_areas.join(", ")));
        }
        None => lines.push(Line::from("No insights yet. Press 'I' to generate.")),
    }

    lines.push(Line::default());
    match app.assistant.today_plan() {
        Some(plan) => {
            lines.push(section(&format!(
                "Today's plan [{}] ~{} min",
                plan_status_label(plan.status),
                plan.estimated_total_time
            )));
            for problem in &plan.problems {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("  {:<7}", problem.difficulty.label()),
                        Style::default().fg(difficulty_color(problem.difficulty)),
                    ),
                    Span::raw(format!(
                        "{} ({} min) {}",
                        problem.category, problem.estimated_time, problem.reason
                    )),
                ]));
            }
        }
        None => lines.push(Line::from("No plan for today. Press 'P' to create one.")),
    }

    let title = if app.has_assistant() {
        " AI Assistant "
    } else {
        " AI Assistant (no API key) "
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_recommendations(frame: &mut Frame, app: &App, area: Rect) {
    let width = area.width.saturating_sub(2).max(20) as usize;
    let options = textwrap::Options::new(width).subsequent_indent("    ");

    let mut lines = Vec::new();
    for rec in &app.assistant.recommendations {
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{:?}] ", rec.priority),
                Style::default().fg(priority_color(rec.priority)),
            ),
            Span::styled(
                format!("{} {} ", rec.difficulty.label(), rec.category),
                Style::default().fg(difficulty_color(rec.difficulty)),
            ),
            Span::styled(
                format!("~{} min", rec.estimated_time),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        let reason = format!("    {}", rec.reason);
        lines.extend(
            textwrap::wrap(&reason, &options)
                .into_iter()
                .map(|l| Line::from(l.into_owned())),
        );
    }
    if lines.is_empty() {
        lines.push(Line::from("No recommendations yet. Press 'R' to generate."));
    }

    let block = Block::default()
        .title(" Recommendations ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// Notes view

fn render_notes(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let notes = app.visible_notes();
    let items: Vec<ListItem> = notes
        .iter()
        .map(|n| {
            let linked = n
                .problem_id
                .as_deref()
                .and_then(|id| app.problems.get(id))
                .map(|p| format!("[{}] ", p.title))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::styled(linked, Style::default().fg(Color::Blue)),
                Span::raw(n.headline().to_string()),
            ]))
        })
        .collect();

    let title = if app.note_query.is_empty() {
        format!(" Notes ({}) ", notes.len())
    } else {
        format!(" Notes ({}) /{} ", notes.len(), app.note_query)
    };
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if !notes.is_empty() {
        state.select(Some(app.selected_note));
    }
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let lines = match app.selected_note() {
        Some(note) => {
            let mut lines = vec![field_line(
                "Updated",
                note.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            )];
            if !note.tags.is_empty() {
                lines.push(field_line("Tags", note.tags.join(", ")));
            }
            lines.push(Line::default());
            push_text(&mut lines, &note.content);
            lines
        }
        None => vec![Line::from("No notes. Press 'a' to write one.")],
    };
    let block = Block::default()
        .title(" Note ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        chunks[1],
    );
}

// Compiler view

fn render_compiler(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let (source, problem_id) = app.compiler_source();
    let origin = if app.compiler_buffer.is_some() {
        "buffer".to_string()
    } else {
        problem_id
            .as_deref()
            .and_then(|id| app.problems.get(id))
            .map(|p| format!("solution of {}", p.title))
            .unwrap_or_else(|| "template".to_string())
    };
    let mode = if app.judge_is_live() { "judge" } else { "mock" };

    let block = Block::default()
        .title(format!(
            " {} | {} | {} ",
            app.compiler_language.label(),
            origin,
            mode
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(source).block(block), chunks[0]);

    let mut lines = Vec::new();
    match &app.last_execution {
        Some(last) => {
            let result = &last.result;
            let (label, color) = if result.success {
                ("Success", Color::Green)
            } else {
                ("Error", Color::Red)
            };
            let mut header = vec![Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )];
            if result.mocked {
                header.push(Span::styled("  (mock)", Style::default().fg(Color::DarkGray)));
            }
            if let Some(ms) = result.execution_time {
                header.push(Span::raw(format!("  {ms:.0} ms")));
            }
            if let Some(kb) = result.memory_usage {
                header.push(Span::raw(format!("  {kb} KB")));
            }
            lines.push(Line::from(header));
            lines.push(Line::default());
            push_text(&mut lines, &result.output);
            if let Some(err) = &result.error {
                lines.push(Line::default());
                lines.extend(
                    err.lines()
                        .map(|l| Line::styled(l.to_string(), Style::default().fg(Color::Red))),
                );
            }
        }
        None => lines.push(Line::from("Press 'r' to run.")),
    }

    let block = Block::default()
        .title(" Output ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        chunks[1],
    );
}

// Overlays

fn render_prompt(frame: &mut Frame, app: &App, kind: PromptKind) {
    let area = centered_rect(60, 20, frame.area());

    let title = match kind {
        PromptKind::Search => " Search ",
        PromptKind::Import => " Import from LeetCode - problem URL or slug ",
        PromptKind::LoadFile => " Open source file ",
        PromptKind::SaveFile => " Save source to file ",
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let input_text = format!("> {}_", app.prompt);
    frame.render_widget(
        Paragraph::new(input_text).style(Style::default().fg(Color::White)),
        inner,
    );
}

fn single_line(value: &str) -> String {
    value.replace('\n', " ⏎ ")
}

fn render_problem_form(frame: &mut Frame, app: &App) {
    let Some(form) = &app.problem_form else {
        return;
    };
    let area = centered_rect(80, 80, frame.area());

    let block = Block::default()
        .title(form.title())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(ProblemField::ALL.len() as u16),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(inner);

    let focused = form.field();
    let rows: Vec<Line> = ProblemField::ALL
        .iter()
        .map(|field| {
            let value = form.value(*field);
            let value = if field.is_choice() {
                format!("◀ {value} ▶")
            } else {
                single_line(&value)
            };
            let style = if *field == focused {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{:<13}", field.label()), Style::default().fg(Color::Blue)),
                Span::styled(value, style),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(rows), chunks[0]);

    let editor = Block::default()
        .title(format!(" {} ", focused.label()))
        .borders(Borders::ALL);
    let text = if focused.is_choice() {
        "Use Left/Right to change".to_string()
    } else {
        format!("{}_", form.value(focused))
    };
    frame.render_widget(
        Paragraph::new(text).block(editor).wrap(Wrap { trim: false }),
        chunks[1],
    );

    let footer = match &form.error {
        Some(err) => Line::styled(err.clone(), Style::default().fg(Color::Red)),
        None => Line::styled(
            "Tab/Shift-Tab: field  Ctrl-J: newline  Enter: save  Esc: cancel",
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(footer), chunks[2]);
}

fn render_note_form(frame: &mut Frame, app: &App) {
    let Some(form) = &app.note_form else {
        return;
    };
    let area = centered_rect(70, 60, frame.area());

    let title = if form.editing.is_some() {
        " Edit Note "
    } else {
        " New Note "
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3), Constraint::Length(1)])
        .split(inner);

    let focus_style = |field: NoteField| {
        if form.field() == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };
    let cursor = |field: NoteField| if form.field() == field { "_" } else { "" };

    frame.render_widget(
        Paragraph::new(format!("{}{}", form.content, cursor(NoteField::Content)))
            .block(
                Block::default()
                    .title(" Content ")
                    .borders(Borders::ALL)
                    .border_style(focus_style(NoteField::Content)),
            )
            .wrap(Wrap { trim: false }),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(format!("{}{}", form.tags, cursor(NoteField::Tags))).block(
            Block::default()
                .title(" Tags (comma separated) ")
                .borders(Borders::ALL)
                .border_style(focus_style(NoteField::Tags)),
        ),
        chunks[1],
    );

    let footer = match &form.error {
        Some(err) => Line::styled(err.clone(), Style::default().fg(Color::Red)),
        None => Line::styled(
            "Tab: switch field  Ctrl-J: newline  Enter: save  Esc: cancel",
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(footer), chunks[2]);
}

fn render_confirm(frame: &mut Frame, target: &ConfirmTarget) {
    let area = centered_rect(50, 20, frame.area());
    let question = match target {
        ConfirmTarget::Problem { title, .. } => {
            format!("Are you sure you want to delete \"{title}\"?")
        }
        ConfirmTarget::Note(_) => "Are you sure you want to delete this note?".to_string(),
    };

    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let paragraph = Paragraph::new(format!("{question}\n\ny: delete   n: keep"))
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 80, frame.area());

    let help_text = [
        "",
        " Navigation:",
        "   Tab / Shift-Tab   Next / previous view",
        "   j / ↓  k / ↑      Move down / up",
        "   < / >             Top / bottom",
        "",
        " Problems:",
        "   a / e / d         Add / edit / delete",
        "   x                 Cycle status",
        "   s                 Toggle starred",
        "   /                 Search title, category, tags",
        "   f / F / *         Filter status / difficulty / starred",
        "   o / O             Sort field / direction",
        "   A                 AI code analysis",
        "   r                 Run solution",
        "   i                 Import from LeetCode",
        "   n                 Add note for problem",
        "   w                 Open URL in browser",
        "   g                 Reload from server",
        "",
        " Dashboard:  I insights  R recommendations  P plan  c plan status",
        " Notes:      a add  e edit  d delete  / search",
        " Compiler:   l language  r run  o open file  w write file  c clear",
        "",
        "   ?                 Toggle this help",
        "   q                 Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
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
