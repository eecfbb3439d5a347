use tui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::error::ErrorReport;

pub fn render_error<B: Backend>(frame: &mut Frame<B>, report: &ErrorReport) {
    let area = centered_rect(60, 30, frame.size());

    let mut lines = vec![
        Spans::from(Span::styled(
            report.header.as_str(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Spans::from(""),
    ];
    lines.extend(report.detail.lines().map(Spans::from));
    lines.push(Spans::from(""));
    lines.push(Spans::from("Press any key to close"));

    let popup = Paragraph::new(lines)
        .block(Block::default().title("Error").borders(Borders::ALL))
        .style(Style::default().fg(Color::White).bg(Color::Black))
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

pub fn render_delete_confirmation<B: Backend>(frame: &mut Frame<B>, name: &str) {
    let area = centered_rect(50, 20, frame.size());

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(format!("Delete project \"{}\"?", name)),
        Spans::from(""),
        Spans::from("This cannot be undone."),
        Spans::from(""),
        Spans::from("<Y> Yes  <N> No"),
    ])
    .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black))
    .alignment(Alignment::Center);

    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

pub fn render_notice<B: Backend>(frame: &mut Frame<B>, message: &str) {
    let area = centered_rect(40, 15, frame.size());

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(message),
        Spans::from(""),
        Spans::from("Press any key to continue"),
    ])
    .block(Block::default().title("Done").borders(Borders::ALL))
    .style(Style::default().fg(Color::Green).bg(Color::Black))
    .alignment(Alignment::Center);

    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

// Helper function to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
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
