use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};
use wav_player::status::PlayerStatus;

use super::app::{App, display_name};

pub(crate) fn draw(f: &mut ratatui::Frame, app: &App) {
    let status = app.player_status();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = match app.selected_path() {
        Some(path) => format!(
            "{} ({}/{})",
            display_name(path),
            app.selected + 1,
            app.playlist.len()
        ),
        None => "no file".to_string(),
    };
    f.render_widget(
        Paragraph::new(Line::from(title))
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL).title("wavplay")),
        chunks[0],
    );

    f.render_widget(
        Paragraph::new(info_lines(status.as_ref()))
            .block(Block::default().borders(Borders::ALL).title("File")),
        chunks[1],
    );

    let buttons = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(chunks[2]);
    let enabled = status.is_some();
    for (label, area) in [app.transport_label(), "Rewind", "FFwd"].into_iter().zip(buttons.iter()) {
        f.render_widget(button(label, enabled), *area);
    }

    match status.as_ref() {
        Some(s) => {
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL))
                .ratio(s.progress())
                .label(progress_label(s))
                .gauge_style(Style::default().fg(Color::White).bg(Color::Black));
            f.render_widget(gauge, chunks[3]);
        }
        None => f.render_widget(
            Paragraph::new(Line::from("-:-- / -:--")).block(Block::default().borders(Borders::ALL)),
            chunks[3],
        ),
    }

    f.render_widget(
        Paragraph::new(Line::from(app.status.as_str()))
            .block(Block::default().borders(Borders::ALL).title("Status")),
        chunks[4],
    );

    f.render_widget(
        Paragraph::new(Line::from(
            "space pause/play • ←/r rewind • →/f ffwd • n/p next/prev • q quit",
        ))
        .style(Style::default().fg(Color::DarkGray)),
        chunks[5],
    );
}

fn button(label: &str, enabled: bool) -> Paragraph<'_> {
    let style = if enabled {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Paragraph::new(Line::from(label))
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL))
}

fn info_lines(status: Option<&PlayerStatus>) -> Vec<Line<'static>> {
    let Some(s) = status else {
        return vec![Line::from("No file loaded")];
    };
    vec![
        Line::from(format!("Channels: {}", s.channels)),
        Line::from(format!("Sample Rate: {} Hz", s.sample_rate)),
        Line::from(format!("Bit Depth: {} bits", s.bits_per_sample)),
        Line::from(format!("Data Size: {} bytes", s.data_size)),
        Line::from(format!("Device: {} [{}]", s.device, s.state.label())),
    ]
}

fn progress_label(s: &PlayerStatus) -> String {
    format!(
        "{} / {} ({:.1}%)",
        format_duration_ms(s.position_ms),
        format_duration_ms(s.duration_ms),
        s.progress() * 100.0
    )
}

fn format_duration_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::app::tests::test_app;
    use ratatui::{Terminal, backend::TestBackend};

    #[test]
    fn durations_format_as_minutes_and_seconds() {
        assert_eq!(format_duration_ms(0), "0:00");
        assert_eq!(format_duration_ms(999), "0:00");
        assert_eq!(format_duration_ms(61_500), "1:01");
        assert_eq!(format_duration_ms(3_600_000), "60:00");
    }

    #[test]
    fn progress_label_shows_position_and_total() {
        let (mut app, _) = test_app(&["a.wav"]);
        app.load_selected();
        let status = app.player_status().unwrap();
        assert_eq!(progress_label(&status), "0:00 / 0:02 (0.0%)");
    }

    #[test]
    fn draws_buttons_for_loaded_file() {
        let (mut app, _) = test_app(&["a.wav"]);
        app.load_selected();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Pause"));
        assert!(text.contains("Rewind"));
        assert!(text.contains("FFwd"));
        assert!(text.contains("Sample Rate: 8000 Hz"));
    }

    #[test]
    fn draws_idle_screen_without_file() {
        let (app, _) = test_app(&[]);
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("No file loaded"));
        assert!(text.contains("Play"));
    }
}
