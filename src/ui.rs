use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use crate::app::{App, InputMode, ServiceStatus};
use crate::client::SUGGESTED_EXTENSIONS;
use crate::state::{ChatRole, Message, MessageKind};

const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];
const TYPING_CURSOR: &str = "▌";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status_text, status_color) = match app.service_status {
        ServiceStatus::Healthy => ("● online", Color::Green),
        ServiceStatus::Unhealthy => ("● degraded", Color::Yellow),
        ServiceStatus::Unreachable => ("● offline", Color::Red),
        ServiceStatus::Unknown => ("● ?", Color::Gray),
    };

    let mut spans = vec![
        Span::styled(" ragchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(app.session.base_url().to_string()),
        Span::raw(" "),
        Span::styled(status_text, Style::default().fg(status_color)),
    ];

    let spinner = SPINNER[app.animation_frame as usize % SPINNER.len()];
    if app.session.is_sending() {
        spans.push(Span::styled(
            format!("  {spinner} sending"),
            Style::default().fg(Color::Yellow),
        ));
    }
    if app.session.is_uploading() {
        spans.push(Span::styled(
            format!("  {spinner} uploading"),
            Style::default().fg(Color::Magenta),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn message_lines(msg: &Message, animation_frame: u8, lines: &mut Vec<Line<'static>>) {
    let (label, label_color) = match (msg.role, msg.kind) {
        (ChatRole::User, _) => ("You:", Color::Cyan),
        (ChatRole::Assistant, MessageKind::Chat) => ("AI:", Color::Yellow),
        (ChatRole::Assistant, MessageKind::Notice) => ("AI:", Color::Green),
        (ChatRole::Assistant, MessageKind::Error) => ("AI:", Color::Red),
    };
    lines.push(Line::from(Span::styled(
        label,
        Style::default().fg(label_color).add_modifier(Modifier::BOLD),
    )));

    if msg.is_loading {
        let spinner = SPINNER[animation_frame as usize % SPINNER.len()];
        lines.push(Line::from(Span::styled(
            format!("{spinner} Thinking"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let body_style = match msg.kind {
        MessageKind::Error => Style::default().fg(Color::Red),
        MessageKind::Notice => Style::default().fg(Color::Green),
        MessageKind::Chat => Style::default(),
    };
    let content_lines: Vec<&str> = msg.content.lines().collect();
    let last = content_lines.len().saturating_sub(1);
    for (i, line) in content_lines.iter().enumerate() {
        let mut spans = vec![Span::styled(line.to_string(), body_style)];
        if msg.is_typing && i == last {
            spans.push(Span::styled(TYPING_CURSOR, Style::default().fg(Color::Yellow)));
        }
        lines.push(Line::from(spans));
    }
    if msg.is_typing && content_lines.is_empty() {
        lines.push(Line::from(Span::styled(TYPING_CURSOR, Style::default().fg(Color::Yellow))));
    }

    if !msg.sources.is_empty() && !msg.is_typing {
        lines.push(Line::from(Span::styled(
            "Sources:",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
        )));
        for source in &msg.sources {
            lines.push(Line::from(Span::styled(
                format!("  • {} ({:.2})", source.filename, source.score),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    lines.push(Line::default());
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if app.follow {
        app.scroll_to_bottom();
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let messages = app.session.conversation().messages();
    let text = if messages.is_empty() {
        Text::from(vec![
            Line::from(Span::styled(
                "Start a conversation to begin...",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                format!(
                    "Press u to upload a document ({}).",
                    SUGGESTED_EXTENSIONS.map(|e| format!(".{e}")).join(", ")
                ),
                Style::default().fg(Color::DarkGray),
            )),
        ])
    } else {
        let mut lines = Vec::new();
        for msg in messages {
            message_lines(msg, app.animation_frame, &mut lines);
        }
        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    let total = app.transcript_lines();
    if total > app.chat_height {
        let mut state = ScrollbarState::new(total as usize).position(app.chat_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (draft, title, border_color) = match app.input_mode {
        InputMode::Upload => (&app.upload_path, " Upload file (path) ", Color::Magenta),
        InputMode::Editing => (&app.session.draft, " Ask ", Color::Yellow),
        InputMode::Normal => (&app.session.draft, " Ask (i to type) ", Color::DarkGray),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = draft.cursor();

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = draft
        .text()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_style = if app.input_mode == InputMode::Editing && app.session.is_sending() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let input = Paragraph::new(visible_text).style(text_style).block(block);
    frame.render_widget(input, area);

    // Show cursor when typing
    if app.input_mode != InputMode::Normal {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
        InputMode::Upload => Style::default().bg(Color::Magenta).fg(Color::White),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " ASK ",
        InputMode::Upload => " UPLOAD ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Normal => vec![
            Span::styled(" i ", key_style),
            Span::styled(" ask ", label_style),
            Span::styled(" u ", key_style),
            Span::styled(" upload ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" G ", key_style),
            Span::styled(" follow ", label_style),
            Span::styled(" c ", key_style),
            Span::styled(" clear ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(if app.session.is_sending() { " waiting " } else { " send " }, label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Upload => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" upload ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
