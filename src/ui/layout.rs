use {
    crate::{
        config::ChartStyle,
        series::{DataPoint, SERIES_CAPACITY},
        stream::StreamState,
        ui::renderer::{format_fee, format_price, format_time},
    },
    ratatui::{
        layout::{Alignment, Constraint, Layout as RatLayout, Rect},
        style::{Color, Modifier, Style},
        symbols,
        text::{Line, Span},
        widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph, Row, Table},
        Frame,
    },
};

/// Render the main UI layout
pub fn render_layout(
    f: &mut Frame,
    area: Rect,
    series: &[DataPoint],
    style: ChartStyle,
    status: &StreamState,
) -> Result<(), Box<dyn std::error::Error>> {
    let chunks = RatLayout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(3),                          // Header
            Constraint::Min(8),                             // Price chart
            Constraint::Length(SERIES_CAPACITY as u16 + 3), // Details table
            Constraint::Length(3),                          // Footer/Status
        ])
        .split(area);

    render_header(f, chunks[0]);

    if series.is_empty() {
        render_waiting(f, chunks[1]);
    } else {
        match style {
            ChartStyle::Bar => render_bar_chart(f, chunks[1], series),
            ChartStyle::Line => render_line_chart(f, chunks[1], series),
        }
    }

    render_details_table(f, chunks[2], series);
    render_footer(f, chunks[3], series.len(), status);

    Ok(())
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Block::default()
        .borders(Borders::ALL)
        .title("Bitcoin Explorer");

    let text = vec![Line::from(vec![
        Span::styled("Bitcoin Explorer", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" - live network telemetry | press 'q' or Esc to quit"),
    ])];

    f.render_widget(Paragraph::new(text).block(header), area);
}

fn render_waiting(f: &mut Frame, area: Rect) {
    let waiting = Paragraph::new("Waiting for data...")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Price"));

    f.render_widget(waiting, area);
}

fn render_bar_chart(f: &mut Frame, area: Rect, series: &[DataPoint]) {
    let bars: Vec<Bar> = series
        .iter()
        .map(|point| {
            Bar::default()
                .value(point.price().round() as u64)
                .text_value(format_price(point.price()))
                .label(Line::from(format_time(point.timestamp())))
        })
        .collect();

    // Fit every bar across the inner width, one column gap each
    let inner_width = area.width.saturating_sub(2);
    let bar_width = (inner_width / series.len().max(1) as u16)
        .saturating_sub(1)
        .clamp(1, 12);

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Price"))
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));

    f.render_widget(chart, area);
}

fn render_line_chart(f: &mut Frame, area: Rect, series: &[DataPoint]) {
    let data: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, point)| (i as f64, point.price()))
        .collect();

    let (min, max) = series.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
        (lo.min(p.price()), hi.max(p.price()))
    });
    // Keep a flat series visible
    let pad = ((max - min) * 0.1).max(1.0);
    let y_bounds = [(min - pad).max(0.0), max + pad];

    let first = series.first().map(|p| format_time(p.timestamp())).unwrap_or_default();
    let last = series.last().map(|p| format_time(p.timestamp())).unwrap_or_default();

    let datasets = vec![Dataset::default()
        .name("price")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data)];

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title("Price"))
        .x_axis(
            Axis::default()
                .title("Time")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, (series.len().saturating_sub(1)).max(1) as f64])
                .labels(vec![Span::raw(first), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format_price(y_bounds[0])),
                    Span::raw(format_price(y_bounds[1])),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_details_table(f: &mut Frame, area: Rect, series: &[DataPoint]) {
    let header = Row::new(vec!["Time", "Peer Count", "Medium Fee per KB", "Price"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    // Arrival order, oldest first, same as the chart
    let rows: Vec<Row> = series
        .iter()
        .map(|point| {
            Row::new(vec![
                format_time(point.timestamp()),
                point.peer_count().to_string(),
                format_fee(point.medium_fee_per_kb()),
                format_price(point.price()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(10), // Time
        Constraint::Length(12), // Peer Count
        Constraint::Length(20), // Medium Fee per KB
        Constraint::Length(14), // Price
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Bitcoin Data Details"));

    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, area: Rect, point_count: usize, status: &StreamState) {
    let status_color = match status {
        StreamState::Open => Color::Green,
        StreamState::Connecting => Color::Yellow,
        _ => Color::Red,
    };

    let text = vec![Line::from(vec![
        Span::styled("Status: ", Style::default().fg(status_color)),
        Span::raw(status.label()),
        Span::raw(" | "),
        Span::styled("Points: ", Style::default().fg(Color::Cyan)),
        Span::raw(format!("{}/{}", point_count, SERIES_CAPACITY)),
    ])];

    let footer = Block::default()
        .borders(Borders::ALL)
        .title("Status");

    f.render_widget(Paragraph::new(text).block(footer), area);
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::series::RawRecord,
        chrono::Local,
        ratatui::{backend::TestBackend, Terminal},
    };

    fn draw(series: &[DataPoint], style: ChartStyle, status: &StreamState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal
            .draw(|f| {
                let area = f.size();
                render_layout(f, area, series, style, status).unwrap();
            })
            .unwrap();

        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn sample() -> Vec<DataPoint> {
        (0..3)
            .map(|i| {
                RawRecord {
                    peer_count: 250 + i,
                    medium_fee_per_kb: 12000.0,
                    price: 64000.25 + i as f64,
                }
                .stamp(Local::now())
            })
            .collect()
    }

    #[test]
    fn test_empty_series_shows_waiting() {
        let screen = draw(&[], ChartStyle::Bar, &StreamState::Connecting);

        assert!(screen.contains("Waiting for data..."));
        assert!(screen.contains("Connecting"));
        assert!(screen.contains("0/10"));
    }

    #[test]
    fn test_table_lists_points() {
        let screen = draw(&sample(), ChartStyle::Bar, &StreamState::Open);

        assert!(!screen.contains("Waiting for data..."));
        assert!(screen.contains("Peer Count"));
        assert!(screen.contains("252"));
        assert!(screen.contains("64002.25"));
        assert!(screen.contains("3/10"));
    }

    #[test]
    fn test_line_chart_renders() {
        let screen = draw(&sample(), ChartStyle::Line, &StreamState::Terminated);

        assert!(screen.contains("Price"));
        assert!(screen.contains("Terminated"));
    }
}
