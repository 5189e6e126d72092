use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{BarChart, Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};
use crate::commands::today;
use crate::cycle::is_expired;
use crate::models::Priority;
use super::app::{App, InputMode, ViewMode};

fn priority_style(p: Priority) -> Style {
    match p {
        Priority::High => Style::default().fg(Color::Red),
        Priority::Medium => Style::default().fg(Color::Yellow),
        Priority::Low => Style::default().fg(Color::Green),
    }
}

fn efficiency_style(eff: u8) -> Style {
    if eff >= 80 {
        Style::default().fg(Color::Green)
    } else if eff >= 50 {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Red)
    }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Cycle banner
            Constraint::Min(0),    // Body
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    let banner = match app.cycle {
        Some(c) => format!("🔒 Active Cycle: {} → {}", c.start, c.end.format("%b %d")),
        None => "✨ Starting New Cycle".to_string(),
    };
    let banner = Paragraph::new(banner)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title("Task Master"));
    f.render_widget(banner, chunks[0]);

    match app.view_mode {
        ViewMode::Tasks => render_tasks(f, app, chunks[1]),
        ViewMode::Resolutions => render_resolutions(f, app, chunks[1]),
        ViewMode::Analytics => render_analytics(f, app, chunks[1]),
    }

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Tasks => "q: Quit | a: Add | Enter: Checklist/Progress | p: Progress | d: Del | e: Toggle Expired | v: View Resolutions",
            ViewMode::Resolutions => "q: Quit | a: Add | p: Progress | d: Del | v: View Analytics",
            ViewMode::Analytics => "q: Quit | r: Refresh | v: View Tasks",
        },
        InputMode::Checklist => "Space: Toggle Day | Esc: Close",
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
    };
    let help_text = match &app.message {
        Some(m) => format!("{}  ·  {}", m, help_text),
        None => help_text.to_string(),
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    match app.input_mode {
        InputMode::Checklist => render_checklist(f, app),
        InputMode::Editing | InputMode::Adding => {
            let area = centered_rect(60, 3, f.area()); // Fixed height of 3 (border + 1 line)
            f.render_widget(Clear, area);

            let title = match app.input_mode {
                InputMode::Adding => match app.view_mode {
                    ViewMode::Resolutions => match app.add_state.step {
                        0 => "Add Resolution: Enter Goal",
                        1 => "Add Resolution: Enter Details (Optional)",
                        _ => "Add Resolution",
                    },
                    _ => match app.add_state.step {
                        0 => "Add Task: Enter Name",
                        1 => "Add Task: Enter Description (Optional)",
                        2 => "Add Task: Enter Priority (High/Medium/Low)",
                        3 => "Add Task: Enter Start Date (YYYY-MM-DD, empty = today)",
                        4 => "Add Task: Enter End Date (YYYY-MM-DD, empty = default)",
                        5 => "Add Task: Daily Checklist? (y/N)",
                        _ => "Add Task",
                    },
                },
                _ => "Set Progress % (0-100)",
            };

            let input = Paragraph::new(app.input_buffer.as_str())
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL).title(title));

            f.render_widget(input, area);
        }
        InputMode::Normal => {}
    }
}

fn render_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let today = today();
    let rows: Vec<Row> = app
        .tasks
        .iter()
        .map(|t| {
            let days_left = (t.end_date - today).num_days();
            let time_left_str = if days_left < 0 {
                "Expired".to_string()
            } else if days_left == 0 {
                "Today".to_string()
            } else {
                format!("{}d", days_left)
            };
            let style = if is_expired(t, today) {
                Style::default().fg(Color::DarkGray)
            } else {
                priority_style(t.priority)
            };
            let prefix = if t.is_daily() { "☑ " } else { "" };

            Row::new(vec![
                Cell::from(t.id.to_string()),
                Cell::from(format!("{}{}", prefix, t.name)),
                Cell::from(t.priority.as_str()),
                Cell::from(t.start_date.to_string()),
                Cell::from(t.end_date.to_string()),
                Cell::from(time_left_str),
                Cell::from(format!("{}%", t.progress.percent())),
            ]).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(8),
    ];

    let title = if app.show_expired { "Tasks (all)" } else { "Active Tasks" };
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["ID", "Name", "Priority", "Start", "End", "Time Left", "Progress"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_resolutions(f: &mut Frame, app: &mut App, area: Rect) {
    let rows: Vec<Row> = app
        .resolutions
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.id.to_string()),
                Cell::from(format!("🎯 {}", r.name)),
                Cell::from(r.description.clone().unwrap_or_default()),
                Cell::from(format!("{}%", r.progress.percent())),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Min(20),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["ID", "Goal", "Details", "Progress"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title("🌟 Resolutions"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.resolution_state);
}

fn render_analytics(f: &mut Frame, app: &mut App, area: Rect) {
    let report = &app.report;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(12),
            Constraint::Min(0),
        ].as_ref())
        .split(area);

    let current = match report.current() {
        Some(s) => format!(
            " │ {}: {} completed, {} pending",
            s.label,
            s.done_count(),
            s.pending_count()
        ),
        None => String::new(),
    };
    let metrics = Paragraph::new(format!(
        "Total Tasks: {} │ Completed Tasks: {} │ Avg Sprint Efficiency: {}%{}",
        report.total_tasks, report.completed_tasks, report.average_efficiency, current
    ))
    .style(efficiency_style(report.average_efficiency))
    .block(Block::default().borders(Borders::ALL).title("📈 Performance"));
    f.render_widget(metrics, chunks[0]);

    let recent = report.recent(app.config.analytics.recent_sprints);
    let bars: Vec<(&str, u64)> = recent
        .iter()
        .map(|s| (s.label.as_str(), u64::from(s.efficiency)))
        .collect();
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(format!("Efficiency (Last {} Sprints)", recent.len())))
        .data(bars.as_slice())
        .bar_width(9)
        .bar_gap(2)
        .max(100)
        .bar_style(Style::default().fg(Color::Blue))
        .value_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
    f.render_widget(chart, chunks[1]);

    let rows: Vec<Row> = report
        .sprints
        .iter()
        .rev()
        .map(|s| {
            let members: Vec<String> = s.tasks.iter().map(|t| t.name.clone()).collect();
            Row::new(vec![
                Cell::from(s.label.clone()),
                Cell::from(s.end_date.to_string()),
                Cell::from(format!("{}%", s.efficiency)),
                Cell::from(s.task_count().to_string()),
                Cell::from(members.join(", ")),
            ]).style(efficiency_style(s.efficiency))
        })
        .collect();

    let widths = [
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(11),
        Constraint::Length(6),
        Constraint::Min(20),
    ];
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["Sprint", "Ends", "Efficiency", "Tasks", "Members"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title("Sprint Details"));
    f.render_widget(table, chunks[2]);
}

fn render_checklist(f: &mut Frame, app: &mut App) {
    let height = (app.checklist.len() as u16).saturating_add(4).min(f.area().height);
    let area = centered_rect(40, height, f.area());
    f.render_widget(Clear, area);

    let rows: Vec<Row> = app
        .checklist
        .iter()
        .map(|(day, done)| {
            let style = if *done { Style::default().fg(Color::Green) } else { Style::default() };
            Row::new(vec![
                Cell::from(if *done { "☑" } else { "☐" }),
                Cell::from(day.format("%a, %b %d").to_string()),
            ]).style(style)
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(3), Constraint::Min(12)])
        .block(Block::default().borders(Borders::ALL).title("Daily Checklist"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.checklist_state);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
