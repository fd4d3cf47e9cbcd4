use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Sparkline, Table},
};

use crate::app::{NetworkPane, ProcessPane, Screen, SystemPane};

const FOOTER_HEIGHT: u16 = 1;
// top and bottom border plus the column header
const TABLE_CHROME: u16 = 3;

const HEADER: [&str; 9] = [
    "PID", "PPID", "NAME", "CPU%", "MEM%", "S", "USER", "CONN", "PORTS",
];

/// Process rows that fit on a terminal of the given size.
pub fn process_rows_visible(area: Rect) -> usize {
    area.height.saturating_sub(FOOTER_HEIGHT + TABLE_CHROME) as usize
}

pub fn draw(f: &mut Frame, screen: &Screen) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(FOOTER_HEIGHT)])
        .split(f.area());

    match screen {
        Screen::System(pane) => draw_system(f, root[0], pane),
        Screen::Process(pane) => draw_processes(f, root[0], pane),
        Screen::Network(pane) => draw_network(f, root[0], pane),
    }

    f.render_widget(
        Paragraph::new(" Tab view  ↑↓ move  PgUp/PgDn page  Home/End  q quit")
            .style(Style::default().fg(Color::DarkGray)),
        root[1],
    );
}

fn frame_block(title: String, color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(color))
}

fn gauge(label: String, percent: f64, color: Color) -> Gauge<'static> {
    Gauge::default()
        .gauge_style(Style::default().fg(color).bg(Color::Black))
        .percent(percent.clamp(0.0, 100.0) as u16)
        .label(label)
}

fn draw_system(f: &mut Frame, area: Rect, pane: &SystemPane) {
    let block = frame_block("System (1/3) [Tab:Switch]".to_string(), Color::Cyan);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(inner);

    f.render_widget(
        gauge(format!("CPU {:.1}%", pane.cpu), pane.cpu, Color::Cyan),
        rows[0],
    );
    f.render_widget(gauge(pane.mem_label.clone(), pane.mem, Color::Yellow), rows[1]);
    f.render_widget(
        gauge(pane.disk_label.clone(), pane.disk, Color::Magenta),
        rows[2],
    );
    f.render_widget(
        Sparkline::default()
            .data(&pane.history)
            .max(100)
            .style(Style::default().fg(Color::Green)),
        rows[3],
    );
    f.render_widget(
        Paragraph::new(pane.info.join("\n")).style(Style::default().fg(Color::White)),
        rows[4],
    );
}

fn draw_processes(f: &mut Frame, area: Rect, pane: &ProcessPane) {
    let (title, rows) = match pane {
        ProcessPane::Empty => {
            f.render_widget(
                Paragraph::new("No processes found")
                    .style(Style::default().fg(Color::Gray))
                    .block(frame_block("Process (2/3) 0/0".to_string(), Color::Red)),
                area,
            );
            return;
        }
        ProcessPane::Rows { title, rows } => (title, rows),
    };

    let header = Row::new(HEADER.into_iter().map(Cell::from)).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    let rows = rows.iter().map(|row| {
        let style = if row.selected {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        Row::new(row.cells.iter().map(|c| Cell::from(c.as_str()))).style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(1),
            Constraint::Length(8),
            Constraint::Length(4),
            Constraint::Min(5),
        ],
    )
    .header(header)
    .block(frame_block(title.clone(), Color::Red));
    f.render_widget(table, area);
}

fn draw_network(f: &mut Frame, area: Rect, pane: &NetworkPane) {
    f.render_widget(
        Paragraph::new(pane.lines.join("\n"))
            .style(Style::default().fg(Color::White))
            .block(frame_block(
                "Network (3/3) [Tab:Switch]".to_string(),
                Color::Blue,
            )),
        area,
    );
}
