//! Rendering for the TUI

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use taskmirror_core::Task;

use crate::filter::{self, TaskFilter};

use super::app::{App, InputMode};

/// Draw the full frame
pub fn draw(frame: &mut Frame, app: &App, tasks: &[Task]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // input box
            Constraint::Length(1), // filter line
            Constraint::Min(1),    // task list
            Constraint::Length(1), // status line
        ])
        .split(frame.area());

    draw_input(frame, app, chunks[0]);
    draw_filter_line(frame, app, tasks, chunks[1]);
    draw_task_list(frame, app, tasks, chunks[2]);
    draw_status_line(frame, app, chunks[3]);

    if let Some(ref task) = app.pending_delete {
        draw_delete_confirmation(frame, task);
    }
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let border_style = match app.input_mode {
        InputMode::Editing => Style::default().fg(Color::Yellow),
        InputMode::Normal => Style::default(),
    };

    let input = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" New Task "),
    );
    frame.render_widget(input, area);

    if app.input_mode == InputMode::Editing {
        let col = app.input[..app.cursor].chars().count() as u16;
        frame.set_cursor_position((area.x + 1 + col, area.y + 1));
    }
}

fn draw_filter_line(frame: &mut Frame, app: &App, tasks: &[Task], area: Rect) {
    let mut spans = Vec::new();
    for f in TaskFilter::ALL {
        let style = if f == app.filter {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(
            format!(" {} ({}) ", f.label(), filter::count(f, tasks)),
            style,
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_task_list(frame: &mut Frame, app: &App, tasks: &[Task], area: Rect) {
    let visible = filter::visible(app.filter, tasks);

    if visible.is_empty() {
        let empty = Paragraph::new("  no tasks").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = visible.iter().map(|task| task_row(task)).collect();

    let list = List::new(items).highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = ListState::default();
    state.select(Some(app.selected.min(visible.len() - 1)));
    frame.render_stateful_widget(list, area, &mut state);
}

fn task_row(task: &Task) -> ListItem<'_> {
    let (text_style, label) = if task.completed {
        (
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT),
            Span::styled(" [Completed]", Style::default().fg(Color::Green)),
        )
    } else {
        (
            Style::default(),
            Span::styled(" [Is Completed?]", Style::default().fg(Color::DarkGray)),
        )
    };

    ListItem::new(Line::from(vec![
        Span::raw("  "),
        Span::styled(task.text.clone(), text_style),
        label,
    ]))
}

fn draw_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.status_message {
        Some(ref message) => Line::from(Span::styled(
            format!(" {}", message),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(Span::styled(
            " a:add  space:toggle  d:delete  tab:filter  q:quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_delete_confirmation(frame: &mut Frame, task: &Task) {
    let area = centered_rect(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let body = vec![
        Line::from("Are you sure you want to delete this item?"),
        Line::from(Span::styled(
            task.text.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y] Yes", Style::default().fg(Color::Red)),
            Span::raw("   "),
            Span::styled("[n] No", Style::default().fg(Color::Green)),
        ]),
    ];

    let popup = Paragraph::new(body)
        .alignment(ratatui::layout::Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Delete "),
        );
    frame.render_widget(popup, area);
}

/// A rectangle of the given size centered in `area`, clamped to fit
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fits_inside_area() {
        let area = Rect::new(0, 0, 80, 24);
        let rect = centered_rect(50, 7, area);

        assert!(rect.x + rect.width <= area.width);
        assert!(rect.y + rect.height <= area.height);
        assert_eq!(rect.width, 50);
        assert_eq!(rect.height, 7);
    }

    #[test]
    fn test_centered_rect_clamps_to_small_area() {
        let area = Rect::new(0, 0, 20, 5);
        let rect = centered_rect(50, 7, area);

        assert_eq!(rect.width, 20);
        assert_eq!(rect.height, 5);
    }
}
