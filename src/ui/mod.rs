mod theme;

use crate::app::{AppModel, LineRole, TranscriptLine, View, ViewerState, left_pane_width};
use crate::domain::{
    HierarchyNode, Message, MessageKind, NodeKind, SessionRecord, UNKNOWN_BRANCH,
    flatten_prefix, relative_time, truncate_words, wrap_text,
};
use humansize::{DECIMAL, format_size};
use ratatui::prelude::*;
use ratatui::widgets::*;
use time::OffsetDateTime;
use unicode_width::UnicodeWidthStr;

const TITLE: &str = " Claude Session Browser ";
const TREE_HINTS: &str = "j/k:Nav  Enter:Open  Space:Expand  h:Back  r:Refresh  q:Quit ";
const VIEWER_HINTS: &str = "j/k:Scroll  PgUp/PgDn:Page  g/G:Top/End  s:Skip  b:Back ";

const PREVIEW_MESSAGES: usize = 3;
const PREVIEW_WORDS: usize = 250;
const PREVIEW_LINES_PER_MESSAGE: usize = 6;
const PREVIEW_THINKING_CHARS: usize = 100;

pub fn render(frame: &mut Frame, model: &AppModel) {
    let area = frame.area();
    if area.width == 0 || area.height == 0 {
        return;
    }

    let [title_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(TITLE).alignment(Alignment::Center).style(
            Style::default()
                .bg(theme::BAR_BG)
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        title_area,
    );

    let width = usize::from(status_area.width);
    match &model.view {
        View::Tree => {
            render_tree(frame, body_area, model);
            let tree = &model.tree;
            let position = if tree.rows().is_empty() {
                0
            } else {
                tree.selected() + 1
            };
            let mut left = vec![Span::raw(format!(" {position}/{}", tree.rows().len()))];
            let warnings = model.data.warnings.get();
            if warnings > 0 {
                left.push(Span::styled(
                    format!("  ·  {warnings} unreadable"),
                    Style::default().fg(theme::DIM),
                ));
            }
            frame.render_widget(
                status_bar(left, model.notice.as_deref(), TREE_HINTS, width),
                status_area,
            );
        }
        View::Viewer(viewer) => {
            render_viewer(frame, body_area, viewer);
            let total = viewer.lines().len();
            let current = if total == 0 { 0 } else { viewer.scroll() + 1 };
            let mut left = vec![Span::raw(format!(" Line {current}/{total}"))];
            if viewer.is_streaming() {
                left.push(Span::styled(
                    " [STREAMING]",
                    Style::default()
                        .fg(theme::STREAMING)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            frame.render_widget(
                status_bar(left, model.notice.as_deref(), VIEWER_HINTS, width),
                status_area,
            );
        }
    }
}

fn status_bar(
    left: Vec<Span<'static>>,
    notice: Option<&str>,
    hints: &'static str,
    width: usize,
) -> Paragraph<'static> {
    let mut spans = left;
    if let Some(notice) = notice {
        spans.push(Span::raw("  ·  "));
        spans.push(Span::styled(
            notice.to_string(),
            Style::default().fg(theme::NOTICE),
        ));
    }

    let left_width: usize = spans.iter().map(Span::width).sum();
    let hints_width = UnicodeWidthStr::width(hints);
    if left_width + hints_width < width {
        spans.push(Span::raw(" ".repeat(width - left_width - hints_width)));
        spans.push(Span::styled(hints, Style::default().fg(theme::DIM)));
    }

    Paragraph::new(Line::from(spans)).style(Style::default().bg(theme::BAR_BG).fg(theme::FG))
}

fn render_tree(frame: &mut Frame, area: Rect, model: &AppModel) {
    let [left_area, right_area] = Layout::horizontal([
        Constraint::Length(left_pane_width(area.width)),
        Constraint::Min(0),
    ])
    .areas(area);

    let tree = &model.tree;
    let hierarchy = tree.hierarchy();

    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(Style::default().fg(theme::BORDER));
    let left_inner = block.inner(left_area);
    frame.render_widget(block, left_area);

    let [list_header, list_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(left_inner);
    frame.render_widget(
        Paragraph::new(format!(" Sessions ({} total)", hierarchy.leaf_count())).style(
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        list_header,
    );

    let row_width = usize::from(list_area.width);
    let lines: Vec<Line> = tree
        .rows()
        .iter()
        .enumerate()
        .skip(tree.scroll())
        .take(usize::from(list_area.height))
        .map(|(idx, row)| {
            tree_row_line(
                hierarchy.node(row.node),
                row.depth,
                idx == tree.selected(),
                row_width,
            )
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), list_area);

    let preview_block = Block::default().padding(Padding::horizontal(1));
    let right_inner = preview_block.inner(right_area);
    frame.render_widget(preview_block, right_area);

    let [preview_header, preview_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(right_inner);
    frame.render_widget(
        Paragraph::new("Preview").style(
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        preview_header,
    );

    let preview = match tree.selected_node() {
        Some(node) => preview_lines(
            node,
            usize::from(preview_area.width),
            OffsetDateTime::now_utc(),
        ),
        None => empty_tree_hint(model),
    };
    frame.render_widget(Paragraph::new(preview), preview_area);
}

fn empty_tree_hint(model: &AppModel) -> Vec<Line<'static>> {
    vec![
        Line::styled(
            "No sessions found.",
            Style::default().fg(theme::DIM),
        ),
        Line::styled(
            format!("Looked in {}", model.data.projects_dir.display()),
            Style::default().fg(theme::DIM),
        ),
    ]
}

fn kind_icon(kind: &NodeKind) -> (&'static str, Color) {
    match kind {
        NodeKind::Root => ("", theme::FG),
        NodeKind::Organization { .. } => ("@", theme::ORGANIZATION),
        NodeKind::Repository { .. } => ("#", theme::REPOSITORY),
        NodeKind::Branch => ("~", theme::BRANCH),
        NodeKind::Session(_) => ("o", theme::SESSION),
        NodeKind::Agent(_) => ("*", theme::AGENT),
    }
}

fn tree_row_line(node: &HierarchyNode, depth: usize, selected: bool, width: usize) -> Line<'static> {
    let indent = "  ".repeat(depth.saturating_sub(1));
    let glyph = match (node.has_children(), node.expanded) {
        (true, true) => "v ",
        (true, false) => "> ",
        (false, _) => "  ",
    };
    let (icon, color) = kind_icon(&node.kind);
    let text = truncate_end(&format!("{indent}{glyph}{icon} {}", node.label), width);

    let mut style = Style::default().fg(color);
    if selected {
        style = style.bg(theme::SELECTED_BG).add_modifier(Modifier::BOLD);
    }
    Line::styled(pad_right(&text, width), style)
}

fn preview_lines(node: &HierarchyNode, width: usize, now: OffsetDateTime) -> Vec<Line<'static>> {
    let dim = Style::default().fg(theme::DIM);
    let title = |icon: &str, color: Color| {
        Line::styled(
            format!("{icon} {}", node.label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )
    };

    match &node.kind {
        NodeKind::Root => Vec::new(),
        NodeKind::Organization { session_count } => vec![
            title("@", theme::ORGANIZATION),
            Line::raw(""),
            Line::styled(format!("Repos: {}", node.children.len()), dim),
            Line::styled(format!("Sessions: {session_count}"), dim),
        ],
        NodeKind::Repository {
            session_count,
            agent_count,
            project_path,
        } => vec![
            title("#", theme::REPOSITORY),
            Line::styled(project_path.display().to_string(), dim),
            Line::raw(""),
            Line::styled(format!("Branches: {}", node.children.len()), dim),
            Line::styled(format!("Sessions: {session_count}"), dim),
            Line::styled(format!("Agents: {agent_count}"), dim),
        ],
        NodeKind::Branch => vec![
            title("~", theme::BRANCH),
            Line::raw(""),
            Line::styled(format!("Sessions: {}", node.children.len()), dim),
        ],
        NodeKind::Session(record) | NodeKind::Agent(record) => session_preview(record, width, now),
    }
}

fn session_preview(record: &SessionRecord, width: usize, now: OffsetDateTime) -> Vec<Line<'static>> {
    let dim = Style::default().fg(theme::DIM);
    let (kind, id) = if record.is_agent() {
        ("Agent", record.display_id())
    } else {
        (
            "Session",
            record
                .metadata
                .session_id
                .as_deref()
                .unwrap_or(record.display_id()),
        )
    };

    let mut lines = vec![Line::styled(
        format!("{kind}: {id}"),
        Style::default().fg(theme::FG).add_modifier(Modifier::BOLD),
    )];
    if let Some(branch) = &record.metadata.branch {
        lines.push(Line::styled(
            format!("Branch: {branch}"),
            Style::default().fg(theme::BRANCH),
        ));
    }
    lines.push(Line::styled(
        format!("Messages: {}", record.metadata.message_count),
        dim,
    ));
    lines.push(Line::styled(
        format!("Size: {}", format_size(record.file_size_bytes, DECIMAL)),
        dim,
    ));
    if let Some(start) = record.metadata.start {
        lines.push(Line::styled(
            format!("Started: {}", relative_time(start, now)),
            dim,
        ));
    }

    lines.push(Line::raw(""));
    lines.push(Line::styled(
        format!("Last {PREVIEW_MESSAGES} messages:"),
        Style::default().add_modifier(Modifier::UNDERLINED),
    ));
    lines.push(Line::raw(""));

    let first = record.messages.len().saturating_sub(PREVIEW_MESSAGES);
    for message in &record.messages[first..] {
        lines.extend(message_preview(message, width));
    }
    lines
}

fn message_preview(message: &Message, width: usize) -> Vec<Line<'static>> {
    let (marker, color) = match message.kind() {
        MessageKind::User => (">>", theme::USER_MSG),
        MessageKind::Assistant | MessageKind::Summary => ("<<", theme::ASSISTANT_MSG),
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{marker} "), Style::default().fg(color)),
        Span::styled(
            message.kind().label(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ])];

    let mut content = match message.thinking() {
        Some(thinking) => format!(
            "[thinking] {}...",
            flatten_prefix(thinking, PREVIEW_THINKING_CHARS)
        ),
        None => message.text().to_string(),
    };
    if !message.tool_calls().is_empty() {
        let names: Vec<&str> = message
            .tool_calls()
            .iter()
            .map(|tool| tool.name.as_str())
            .collect();
        content = format!("[{}] {content}", names.join(", "));
    }

    let wrapped = wrap_text(
        &truncate_words(&content, PREVIEW_WORDS),
        width.saturating_sub(2),
    );
    let dim = Style::default().fg(theme::DIM);
    for line in wrapped.iter().take(PREVIEW_LINES_PER_MESSAGE) {
        lines.push(Line::styled(format!("  {line}"), dim));
    }
    if wrapped.len() > PREVIEW_LINES_PER_MESSAGE {
        lines.push(Line::styled("  ...", dim));
    }
    lines.push(Line::raw(""));
    lines
}

fn render_viewer(frame: &mut Frame, area: Rect, viewer: &ViewerState) {
    let [header_area, body_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);

    let session = viewer.session();
    let id = session
        .metadata
        .session_id
        .as_deref()
        .unwrap_or(session.display_id());
    let branch = session.metadata.branch.as_deref().unwrap_or(UNKNOWN_BRANCH);
    frame.render_widget(
        Paragraph::new(format!(" Session: {id} [{branch}]")).style(
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        header_area,
    );

    let lines: Vec<Line> = viewer
        .lines()
        .iter()
        .skip(viewer.scroll())
        .take(usize::from(body_area.height))
        .map(transcript_line)
        .collect();
    frame.render_widget(Paragraph::new(lines), body_area);
}

fn transcript_line(line: &TranscriptLine) -> Line<'static> {
    let style = match line.role {
        LineRole::UserHeader => Style::default()
            .fg(theme::USER_MSG)
            .add_modifier(Modifier::BOLD),
        LineRole::AssistantHeader => Style::default()
            .fg(theme::ASSISTANT_MSG)
            .add_modifier(Modifier::BOLD),
        LineRole::OtherHeader => Style::default()
            .fg(theme::SUMMARY_MSG)
            .add_modifier(Modifier::BOLD),
        LineRole::Thinking => Style::default()
            .fg(theme::THINKING_MSG)
            .add_modifier(Modifier::ITALIC),
        LineRole::Tool => Style::default().fg(theme::TOOL_MSG),
        LineRole::Body => Style::default().fg(theme::FG),
        LineRole::Blank => Style::default(),
    };
    Line::styled(line.text.clone(), style)
}

fn pad_right(text: &str, width: usize) -> String {
    let current = UnicodeWidthStr::width(text);
    if current >= width {
        return text.to_string();
    }
    format!("{}{}", text, " ".repeat(width - current))
}

fn truncate_end(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let ellipsis = "…";
    let available = max_width.saturating_sub(UnicodeWidthStr::width(ellipsis));
    let mut out = crate::domain::take_prefix_width(text, available).to_string();
    out.push_str(ellipsis);
    out
}
