use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::difficulty::DIFFICULTIES;
use crate::game::{Phase, Snapshot};
use crate::util::format_secs;
use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snapshot = self.game.snapshot();

        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2);
        let arrow_row_fits = arrow_row_plain(&snapshot).width() <= max_chars_per_line as usize;

        let top_pad = area.height.saturating_sub(6) / 2;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints(
                [
                    Constraint::Length(top_pad),
                    Constraint::Length(1), // arrow row
                    Constraint::Length(1), // padding
                    Constraint::Length(1), // score readout
                    Constraint::Min(0),
                    Constraint::Length(1), // difficulty selector
                    Constraint::Length(1), // key help
                ]
                .as_ref(),
            )
            .split(area);

        let arrows = Paragraph::new(arrow_row(&snapshot)).alignment(if arrow_row_fits {
            // a short combo centered on its own line reads best
            Alignment::Center
        } else {
            Alignment::Left
        });
        arrows.render(chunks[1], buf);

        Paragraph::new(score_line(&snapshot))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        Paragraph::new(difficulty_line(&snapshot))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);

        Paragraph::new(help_line(self.mute, snapshot.sightread))
            .alignment(Alignment::Center)
            .render(chunks[6], buf);
    }
}

fn arrow_row_plain(snapshot: &Snapshot) -> String {
    snapshot
        .combo
        .iter()
        .map(|arrow| {
            if arrow.hidden {
                '·'
            } else {
                arrow.direction.glyph()
            }
        })
        .join(" ")
}

/// One span per combo element. The whole row flashes red or green in a
/// terminal phase; otherwise matched elements are green and the rest dim.
fn arrow_row(snapshot: &Snapshot) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let green_bold = bold.fg(Color::Green);
    let red_bold = bold.fg(Color::Red);
    let dim_bold = bold.add_modifier(Modifier::DIM);

    let mut spans: Vec<Span> = Vec::with_capacity(snapshot.combo.len() * 2);
    for (idx, arrow) in snapshot.combo.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw(" "));
        }

        let style = match snapshot.phase {
            Phase::Error => red_bold,
            Phase::Success => green_bold,
            Phase::Normal => {
                if idx < snapshot.progress {
                    green_bold
                } else {
                    dim_bold
                }
            }
        };

        let glyph = if arrow.hidden {
            "·".to_string()
        } else {
            arrow.direction.glyph().to_string()
        };
        spans.push(Span::styled(glyph, style));
    }

    Line::from(spans)
}

fn score_line(snapshot: &Snapshot) -> Line<'static> {
    let dim = Style::default().add_modifier(Modifier::DIM);

    let mut parts = Vec::new();
    parts.push(match snapshot.previous_ms {
        Some(ms) => format!("last {}", format_secs(ms)),
        None => "last —".to_string(),
    });
    parts.push(match snapshot.rolling_average_secs {
        Some(secs) => format!("avg {:.2}s", secs),
        None => "avg —".to_string(),
    });
    parts.push(match snapshot.high_score_secs {
        Some(secs) => format!("best {:.2}s", secs),
        None => "best —".to_string(),
    });

    Line::from(Span::styled(parts.iter().join("   "), dim))
}

fn difficulty_line(snapshot: &Snapshot) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let magenta_bold = bold.fg(Color::Magenta);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let mut spans: Vec<Span> = Vec::new();
    for (idx, policy) in DIFFICULTIES.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled("  ", dim));
        }
        let label = format!("[{}] {}", idx + 1, policy.label);
        if policy.label == snapshot.policy.label {
            spans.push(Span::styled(label, magenta_bold));
        } else {
            spans.push(Span::styled(label, dim));
        }
    }

    Line::from(spans)
}

fn help_line(mute: bool, sightread: bool) -> Line<'static> {
    let dim_italic = Style::default()
        .add_modifier(Modifier::DIM)
        .add_modifier(Modifier::ITALIC);

    let mute_part = if mute { "(m)ute on" } else { "(m)ute off" };
    let sightread_part = if sightread {
        "(h) sightread on"
    } else {
        "(h) sightread off"
    };
    let parts = [
        "wasd/arrows play",
        mute_part,
        sightread_part,
        "(tab) stats",
        "(esc) quit",
    ];

    Line::from(Span::styled(parts.iter().join(" · "), dim_italic))
}
