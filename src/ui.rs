use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::feedback::{Block as FbBlock, FeedbackTree, NO_ANALYSIS};
use crate::selection::AnalysisKind;
use crate::session::KvStore;
use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 3;
const VERTICAL_MARGIN: u16 = 1;

/// Something a mouse click can land on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Card(AnalysisKind),
    NextButton,
    Control(usize),
    GroupHeader(usize),
}

/// Screen regions recorded during the last draw, for mouse hit-testing.
#[derive(Debug, Clone, Default)]
pub struct HitMap {
    regions: Vec<(Rect, Target)>,
}

impl HitMap {
    fn add(&mut self, rect: Rect, target: Target) {
        self.regions.push((rect, target));
    }

    pub fn hit(&self, x: u16, y: u16) -> Option<&Target> {
        self.regions
            .iter()
            .rev()
            .find(|(rect, _)| {
                x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
            })
            .map(|(_, target)| target)
    }
}

pub fn draw<S: KvStore>(f: &mut Frame, app: &App<S>) -> HitMap {
    match app.state {
        AppState::Selecting => draw_selecting(f, app),
        AppState::Reviewing => draw_reviewing(f, app),
    }
}

fn draw_selecting<S: KvStore>(f: &mut Frame, app: &App<S>) -> HitMap {
    let mut hits = HitMap::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(7),
            Constraint::Length(2),
        ])
        .split(f.area());

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            "what type of analysis are you looking for?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "select all that apply.",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    draw_card(
        f,
        cards[0],
        app,
        AnalysisKind::Content,
        "how well your speech aligns with your planned outline or script, \
         covering key points, structure, and clarity of message",
        "input: script or outline, video",
        &mut hits,
    );
    draw_card(
        f,
        cards[1],
        app,
        AnalysisKind::Delivery,
        "how you present your speech, including filler words, pacing, tone, \
         body language, and overall presence",
        "input: video",
        &mut hits,
    );

    let enabled = !app.selection.is_empty();
    let next_style = if enabled {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    let mut footer_lines = vec![Line::from(Span::styled("[ next ]", next_style))];
    if let Some(status) = &app.status {
        footer_lines.push(Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    let footer = Paragraph::new(footer_lines).alignment(Alignment::Center);
    f.render_widget(footer, chunks[2]);
    if enabled {
        // the button is centered on the first footer row
        let width = "[ next ]".width() as u16;
        let x = chunks[2].x + chunks[2].width.saturating_sub(width) / 2;
        hits.add(Rect::new(x, chunks[2].y, width, 1), Target::NextButton);
    }

    hits
}

fn draw_card<S: KvStore>(
    f: &mut Frame,
    area: Rect,
    app: &App<S>,
    kind: AnalysisKind,
    description: &str,
    inputs: &str,
    hits: &mut HitMap,
) {
    let selected = app.selection.contains(kind);
    let focused = app.focused_card == kind;

    let border_style = match (selected, focused) {
        (true, _) => Style::default().fg(Color::Green),
        (false, true) => Style::default().fg(Color::Yellow),
        (false, false) => Style::default().add_modifier(Modifier::DIM),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(
            kind.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let checkbox = if selected { "[x]" } else { "[ ]" };
    let text = vec![
        Line::from(Span::styled(
            format!("{} {}", checkbox, kind),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(description.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            inputs.to_string(),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];
    let body = Paragraph::new(text).wrap(Wrap { trim: true });
    f.render_widget(body, inner);

    hits.add(area, Target::Card(kind));
}

/// One renderable fragment of a review line.
#[derive(Clone)]
enum Seg {
    Plain(String),
    SectionTitle(String),
    Heading(String),
    Note(String),
    Tag(String),
    Control {
        idx: usize,
        label: String,
        inert: bool,
    },
    Header {
        group: usize,
        title: String,
        collapsed: bool,
    },
}

struct LineSpec {
    segs: Vec<Seg>,
}

impl LineSpec {
    fn blank() -> Self {
        Self { segs: Vec::new() }
    }

    fn plain(text: String) -> Self {
        Self {
            segs: vec![Seg::Plain(text)],
        }
    }
}

/// Flatten the feedback tree into lines, honoring collapsed groups.
/// Control and group indices follow the same traversal order the App uses,
/// so focus and collapse state line up.
fn build_review_lines<S: KvStore>(app: &App<S>) -> (Vec<LineSpec>, Option<usize>) {
    let tree: &FeedbackTree = &app.tree;
    if tree.is_empty() {
        return (vec![LineSpec::plain(NO_ANALYSIS.to_string())], None);
    }

    let mut lines = Vec::new();
    let mut focused_line = None;
    let mut ctrl = 0usize;
    let mut grp = 0usize;

    for (section_idx, section) in tree.sections.iter().enumerate() {
        if section_idx > 0 {
            lines.push(LineSpec::blank());
        }
        lines.push(LineSpec {
            segs: vec![Seg::SectionTitle(section.title.clone())],
        });

        for block in &section.blocks {
            match block {
                FbBlock::Heading(text) => lines.push(LineSpec {
                    segs: vec![Seg::Heading(text.clone())],
                }),
                FbBlock::Note(text) => lines.push(LineSpec {
                    segs: vec![Seg::Note(text.clone())],
                }),
                FbBlock::Text(text) => lines.push(LineSpec::plain(text.clone())),
                FbBlock::Tags(tags) => {
                    let mut segs = Vec::new();
                    for tag in Itertools::intersperse(
                        tags.iter().map(|t| Seg::Tag(t.clone())),
                        Seg::Plain("  ".to_string()),
                    ) {
                        segs.push(tag);
                    }
                    lines.push(LineSpec { segs });
                }
                FbBlock::Groups(groups) => {
                    for group in groups {
                        let collapsed = app.review.collapsed.contains(&grp);
                        lines.push(LineSpec {
                            segs: vec![Seg::Header {
                                group: grp,
                                title: group.title.clone(),
                                collapsed,
                            }],
                        });
                        for entry in &group.entries {
                            if collapsed {
                                // indices still advance so focus stays stable
                                ctrl += entry.controls.len();
                                continue;
                            }
                            let mut segs = vec![Seg::Plain("  ".to_string())];
                            for control in &entry.controls {
                                if ctrl == app.review.focused {
                                    focused_line = Some(lines.len());
                                }
                                segs.push(Seg::Control {
                                    idx: ctrl,
                                    label: control.label.clone(),
                                    inert: control.seconds.is_none(),
                                });
                                segs.push(Seg::Plain(" ".to_string()));
                                ctrl += 1;
                            }
                            segs.push(Seg::Plain(entry.lead.clone()));
                            lines.push(LineSpec { segs });
                            for detail in &entry.detail {
                                lines.push(LineSpec::plain(format!("    {}", detail)));
                            }
                        }
                        grp += 1;
                    }
                }
            }
        }
    }

    (lines, focused_line)
}

fn draw_reviewing<S: KvStore>(f: &mut Frame, app: &App<S>) -> HitMap {
    let mut hits = HitMap::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(f.area());
    let area = chunks[0];

    let (lines, focused_line) = build_review_lines(app);

    // keep the focused control on screen
    let height = area.height as usize;
    let scroll = match focused_line {
        Some(line) if height > 0 && line >= height => line + 1 - height,
        _ => 0,
    };

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut rendered = Vec::new();
    for (row, spec) in lines.iter().enumerate().skip(scroll).take(height) {
        let y = area.y + (row - scroll) as u16;
        let mut x = area.x;
        let mut spans = Vec::new();
        for seg in &spec.segs {
            let (text, style, target) = match seg {
                Seg::Plain(text) => (text.clone(), Style::default(), None),
                Seg::SectionTitle(text) => {
                    (text.clone(), bold.fg(Color::Magenta), None)
                }
                Seg::Heading(text) => (text.clone(), bold, None),
                Seg::Note(text) => (
                    text.clone(),
                    Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
                    None,
                ),
                Seg::Tag(text) => (
                    format!("[{}]", text),
                    Style::default().fg(Color::Cyan),
                    None,
                ),
                Seg::Control { idx, label, inert } => {
                    let mut style = if *inert {
                        Style::default().add_modifier(Modifier::DIM)
                    } else {
                        bold.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED)
                    };
                    if *idx == app.review.focused {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    (label.clone(), style, Some(Target::Control(*idx)))
                }
                Seg::Header {
                    group,
                    title,
                    collapsed,
                } => {
                    let marker = if *collapsed { "▸" } else { "▾" };
                    (
                        format!("{} {}", marker, title),
                        bold.fg(Color::Yellow),
                        Some(Target::GroupHeader(*group)),
                    )
                }
            };
            let width = text.width() as u16;
            if let Some(target) = target {
                hits.add(Rect::new(x, y, width, 1), target);
            }
            x += width;
            spans.push(Span::styled(text, style));
        }
        rendered.push(Line::from(spans));
    }
    f.render_widget(Paragraph::new(rendered), area);

    let mut footer = vec![Span::styled(
        if app.controller.is_attached() {
            "player attached"
        } else {
            "waiting for player"
        },
        Style::default().add_modifier(Modifier::DIM),
    )];
    if let Some(status) = &app.status {
        footer.push(Span::raw("  "));
        footer.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::Red),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(footer)), chunks[1]);

    hits
}
