//! Terminal user interface.
//!
//! Draws the transport bar, the rhythm and chord lanes, the melody grid,
//! and a key hint line. The beat being played is highlighted in every lane.

use crate::app::{App, Lane};
use crate::audio::Synthesis;
use crate::engine::PlaybackState;
use crate::score::{DrumKind, MELODY_NOTE_OPTIONS};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Width of the row label column.
const LABEL_WIDTH: usize = 7;

/// Columns per beat cell.
const CELL_WIDTH: usize = 3;

/// Renders the whole editor.
pub fn render<S: Synthesis>(frame: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport
            Constraint::Length(3), // Rhythm + chords
            Constraint::Length(MELODY_NOTE_OPTIONS.len() as u16 + 2), // Melody grid
            Constraint::Min(1),    // Hints
        ])
        .split(frame.area());

    render_transport(frame, chunks[0], app);
    render_lanes(frame, chunks[1], app);
    render_melody(frame, chunks[2], app);
    render_hints(frame, chunks[3]);
}

/// Renders the transport bar: state, position, tempo, and status.
fn render_transport<S: Synthesis>(frame: &mut Frame, area: Rect, app: &App<S>) {
    let block = Block::default()
        .title(" Transport ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(14), // Playback state
            Constraint::Length(16), // Position
            Constraint::Length(12), // Tempo
            Constraint::Length(16), // Time sig and bars
            Constraint::Min(20),    // Status
        ])
        .split(inner);

    let play_status = match app.transport.playback_state() {
        PlaybackState::Playing => Span::styled(
            " [>] PLAY ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Paused => Span::styled(
            " [||] PAUSE ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Stopped => Span::styled(
            " [.] STOP ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };
    frame.render_widget(Paragraph::new(Line::from(play_status)), chunks[0]);

    let position = Paragraph::new(Line::from(vec![
        Span::styled("Pos: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!(
                "{} {:.1}s",
                app.position_string(),
                app.transport.current_logical_time_seconds()
            ),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ]));
    frame.render_widget(position, chunks[1]);

    let score = app.score();
    let tempo = Paragraph::new(Line::from(vec![
        Span::styled("BPM: ", Style::default().fg(Color::DarkGray)),
        Span::styled(score.bpm.to_string(), Style::default().fg(Color::White)),
    ]));
    frame.render_widget(tempo, chunks[2]);

    let meter = Paragraph::new(Line::from(Span::styled(
        format!(
            "{}/{}  {} bars",
            score.time_signature.beats_per_bar, score.time_signature.beat_unit, score.bars
        ),
        Style::default().fg(Color::White),
    )));
    frame.render_widget(meter, chunks[3]);

    let status = match &app.status_message {
        Some((msg, _)) => Line::from(Span::styled(
            msg.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        )),
        None if app.modified => Line::from(Span::styled(
            "[modified]",
            Style::default().fg(Color::DarkGray),
        )),
        None => Line::default(),
    };
    frame.render_widget(Paragraph::new(status), chunks[4]);
}

/// Style of one grid cell.
fn cell_style(is_cursor: bool, is_active: bool, is_bar_start: bool) -> Style {
    let mut style = Style::default().fg(if is_bar_start {
        Color::Gray
    } else {
        Color::DarkGray
    });
    if is_active {
        style = style.bg(Color::Rgb(60, 60, 20));
    }
    if is_cursor {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

fn label(text: &str, focused: bool) -> Span<'static> {
    let style = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Span::styled(format!("{:<width$}", text, width = LABEL_WIDTH), style)
}

/// Renders the rhythm and chord lanes.
fn render_lanes<S: Synthesis>(frame: &mut Frame, area: Rect, app: &App<S>) {
    let block = Block::default().borders(Borders::TOP | Borders::LEFT | Borders::RIGHT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let score = app.score();
    let per_bar = score.time_signature.beats_per_bar.max(1);
    let active = app.active_beat();
    let cursor = app.cursor;
    let visible = visible_beats(inner.width, score.total_beats());

    let mut rhythm = vec![label(Lane::Rhythm.label(), cursor.lane == Lane::Rhythm)];
    let mut chords = vec![label(Lane::Chords.label(), cursor.lane == Lane::Chords)];
    for beat in 0..visible {
        let is_bar_start = beat % per_bar == 0;
        let is_active = active == Some(beat);

        let symbol = match score.rhythm_at(beat) {
            Some(DrumKind::Kick) => " K ",
            Some(DrumKind::Snare) => " S ",
            None if is_bar_start => " | ",
            None => " . ",
        };
        let is_cursor = cursor.lane == Lane::Rhythm && cursor.beat == beat;
        rhythm.push(Span::styled(
            symbol,
            cell_style(is_cursor, is_active, is_bar_start),
        ));

        // A chord label spans the whole bar
        if is_bar_start {
            let bar = beat / per_bar;
            let text = score.chord_at(bar).unwrap_or("-");
            let width = (per_bar as usize * CELL_WIDTH).min((visible - beat) as usize * CELL_WIDTH);
            let is_cursor = cursor.lane == Lane::Chords && cursor.beat / per_bar == bar;
            let is_active = active.is_some_and(|b| b / per_bar == bar);
            chords.push(Span::styled(
                format!(" {:<w$}", text, w = width.saturating_sub(1)),
                cell_style(is_cursor, is_active, true),
            ));
        }
    }

    frame.render_widget(
        Paragraph::new(vec![Line::from(rhythm), Line::from(chords)]),
        inner,
    );
}

/// Renders the melody grid, highest pitch on top.
fn render_melody<S: Synthesis>(frame: &mut Frame, area: Rect, app: &App<S>) {
    let focused = app.cursor.lane == Lane::Melody;
    let block = Block::default()
        .title(" Melody ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::Gray }));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let score = app.score();
    let per_bar = score.time_signature.beats_per_bar.max(1);
    let active = app.active_beat();
    let cursor = app.cursor;
    let visible = visible_beats(inner.width, score.total_beats());

    let lines: Vec<Line> = MELODY_NOTE_OPTIONS
        .iter()
        .enumerate()
        .rev()
        .map(|(index, pitch)| {
            let row_focused = focused && cursor.pitch_index == index;
            let mut spans = vec![label(pitch, row_focused)];
            for beat in 0..visible {
                let (bar, beat_in_bar) = (beat / per_bar, beat % per_bar);
                let is_bar_start = beat_in_bar == 0;
                let has_note = score.melody_at(bar, beat_in_bar).any(|m| m.pitch == *pitch);
                let is_cursor = row_focused && cursor.beat == beat;
                let mut style = cell_style(is_cursor, active == Some(beat), is_bar_start);
                if has_note {
                    style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
                }
                let symbol = match (has_note, is_bar_start) {
                    (true, _) => " o ",
                    (false, true) => " | ",
                    (false, false) => " . ",
                };
                spans.push(Span::styled(symbol, style));
            }
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Number of beat columns that fit next to the labels.
fn visible_beats(width: u16, total_beats: u32) -> u32 {
    let columns = (width as usize).saturating_sub(LABEL_WIDTH) / CELL_WIDTH;
    (columns as u32).min(total_beats)
}

fn render_hints(frame: &mut Frame, area: Rect) {
    let keys = [
        ("Space", "Play/Pause"),
        ("s", "Stop"),
        ("Arrows", "Move"),
        ("Tab", "Lane"),
        ("Enter", "Edit"),
        ("[ ]", "Seek"),
        ("g", "Go to cursor"),
        ("+/-", "BPM"),
        ("b/B", "Bars"),
        ("Ctrl+S", "Save"),
        ("q", "Quit"),
    ];
    let spans: Vec<Span> = keys
        .iter()
        .flat_map(|(key, action)| {
            [
                Span::styled(format!("[{}]", key), Style::default().fg(Color::Yellow)),
                Span::styled(format!(" {}  ", action), Style::default().fg(Color::DarkGray)),
            ]
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_beats() {
        assert_eq!(visible_beats(7 + 3 * 10, 32), 10);
        assert_eq!(visible_beats(200, 16), 16);
        assert_eq!(visible_beats(4, 16), 0);
    }
}
