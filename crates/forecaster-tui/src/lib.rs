// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use forecaster_app::{ForecastResults, LineDash, ModelSummary, PlotSeries, TableRow, format_number};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::{
    Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, LegendPosition, Paragraph, Row,
    Table,
};
use std::io;
use std::time::Duration;

const MODEL_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Green,
    Color::Magenta,
    Color::Yellow,
    Color::Blue,
    Color::Red,
];
const HISTORICAL_COLOR: Color = Color::White;
const NO_DATA_MESSAGE: &str = "No data to chart.";
const KEY_HINTS: &str = "q quit | t table | j/k scroll | ? help";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ViewData {
    hide_table: bool,
    table_offset: usize,
    help_visible: bool,
}

pub fn run_results_view(results: &ForecastResults) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    let mut view_data = ViewData::default();

    let mut result = Ok(());
    loop {
        if let Err(error) = terminal.draw(|frame| render(frame, results, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(&mut view_data, results, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn handle_key_event(view_data: &mut ViewData, results: &ForecastResults, key: KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    if view_data.help_visible {
        view_data.help_visible = false;
        return false;
    }

    let last_row = results.table_rows.len().saturating_sub(1);
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => return true,
        (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            return true;
        }
        (KeyCode::Char('t'), _) => view_data.hide_table = !view_data.hide_table,
        (KeyCode::Char('?'), _) => view_data.help_visible = true,
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => {
            view_data.table_offset = (view_data.table_offset + 1).min(last_row);
        }
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => {
            view_data.table_offset = view_data.table_offset.saturating_sub(1);
        }
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => view_data.table_offset = 0,
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => view_data.table_offset = last_row,
        _ => {}
    }
    false
}

fn render(frame: &mut ratatui::Frame<'_>, results: &ForecastResults, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(if view_data.hide_table { 0 } else { 10 }),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_chart(frame, layout[0], results);

    if !view_data.hide_table {
        let lower = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(layout[1]);
        render_table(frame, lower[0], results, view_data);
        let summary = Paragraph::new(render_summary_text(&results.summary))
            .block(Block::default().title("models").borders(Borders::ALL));
        frame.render_widget(summary, lower[1]);
    }

    let status = Paragraph::new(status_text(results))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if view_data.help_visible {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_chart(frame: &mut ratatui::Frame<'_>, area: Rect, results: &ForecastResults) {
    let block = Block::default().title("forecast").borders(Borders::ALL);
    let Some(bounds) = chart_bounds(&results.series) else {
        frame.render_widget(Paragraph::new(NO_DATA_MESSAGE).block(block), area);
        return;
    };

    let data: Vec<Vec<(f64, f64)>> = results
        .series
        .iter()
        .map(|series| {
            series
                .points
                .iter()
                .map(|point| (point.x.unix_seconds(), point.y))
                .collect()
        })
        .collect();

    let datasets = results
        .series
        .iter()
        .zip(&data)
        .map(|(series, points)| {
            let (marker, graph_type) = match series.style.dash {
                LineDash::Solid => (Marker::Braille, GraphType::Line),
                LineDash::Dash => (Marker::Dot, GraphType::Line),
                LineDash::Dot => (Marker::Dot, GraphType::Scatter),
            };
            Dataset::default()
                .name(series.label.clone())
                .marker(marker)
                .graph_type(graph_type)
                .style(series_style(series, series_color(results, series)))
                .data(points)
        })
        .collect::<Vec<_>>();

    let chart = Chart::new(datasets)
        .block(block)
        .legend_position(Some(LegendPosition::TopLeft))
        .x_axis(
            Axis::default()
                .title("Date")
                .style(Style::default().fg(Color::Gray))
                .bounds(bounds.x)
                .labels(bounds.x_labels.to_vec()),
        )
        .y_axis(
            Axis::default()
                .title("Value")
                .style(Style::default().fg(Color::Gray))
                .bounds(bounds.y)
                .labels(y_axis_labels(bounds.y)),
        );
    frame.render_widget(chart, area);
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    results: &ForecastResults,
    view_data: &ViewData,
) {
    let header = Row::new(TableRow::HEADERS.into_iter().map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = results
        .table_rows
        .iter()
        .skip(view_data.table_offset)
        .map(|row| Row::new(row.cells().map(|cell| Cell::from(cell.to_owned()))));
    let widths = [Constraint::Min(10); 4];

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(results))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

#[derive(Debug, Clone, PartialEq)]
struct ChartBounds {
    x: [f64; 2],
    y: [f64; 2],
    x_labels: [String; 2],
}

fn chart_bounds(series: &[PlotSeries]) -> Option<ChartBounds> {
    let points = || series.iter().flat_map(|series| series.points.iter());
    let first = points().map(|point| point.x).min()?;
    let last = points().map(|point| point.x).max()?;

    let (low, high) = points().fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), point| {
        (low.min(point.y), high.max(point.y))
    });
    let padding = ((high - low) * 0.05).max(1.0);

    let mut x = [first.unix_seconds(), last.unix_seconds()];
    if x[0] == x[1] {
        x = [x[0] - 86_400.0, x[1] + 86_400.0];
    }
    Some(ChartBounds {
        x,
        y: [low - padding, high + padding],
        x_labels: [first.label(), last.label()],
    })
}

fn y_axis_labels(bounds: [f64; 2]) -> Vec<String> {
    let middle = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], middle, bounds[1]]
        .into_iter()
        .map(|value| format_number(Some(value)))
        .collect()
}

fn series_color(results: &ForecastResults, series: &PlotSeries) -> Color {
    let Some(model) = series.model.as_deref() else {
        return HISTORICAL_COLOR;
    };
    let index = results
        .forecast_series()
        .position(|candidate| candidate.model.as_deref() == Some(model))
        .unwrap_or(0);
    MODEL_COLORS[index % MODEL_COLORS.len()]
}

fn series_style(series: &PlotSeries, color: Color) -> Style {
    let mut style = Style::default().fg(color);
    if series.style.emphasized {
        style = style.add_modifier(Modifier::BOLD);
    }
    if series.kind.is_band() {
        style = style.add_modifier(Modifier::DIM);
    }
    style
}

fn table_title(results: &ForecastResults) -> String {
    match results.best_model_name.as_deref() {
        Some(name) if !results.table_rows.is_empty() => format!("{name} forecast"),
        _ => "forecast".to_owned(),
    }
}

fn status_text(results: &ForecastResults) -> String {
    format!("{} | {KEY_HINTS}", results.best_model_message())
}

fn help_overlay_text() -> &'static str {
    "q / esc   quit\n\
     t         show or hide the table\n\
     j / k     scroll the table\n\
     g / G     first or last row\n\
     ?         this help\n\
     \n\
     dotted lines are the best model's bounds"
}

pub fn render_summary_text(summary: &[ModelSummary]) -> String {
    if summary.is_empty() {
        return "no models returned".to_owned();
    }
    summary
        .iter()
        .map(|model| {
            let marker = if model.best { "*" } else { " " };
            let detail = match (&model.failure, model.charted) {
                (Some(reason), _) => format!("failed: {reason}"),
                (None, false) => "no forecast data".to_owned(),
                (None, true) => match model.rmse {
                    Some(_) => format!("RMSE {}", format_number(model.rmse)),
                    None => "RMSE N/A".to_owned(),
                },
            };
            format!("{marker} {}  {detail}", model.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_table_text(rows: &[TableRow]) -> String {
    let mut widths = TableRow::HEADERS.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.len());
        }
    }

    let format_line = |cells: [&str; 4]| -> String {
        cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(index, (cell, width))| {
                if index == 0 {
                    format!("{cell:<width$}")
                } else {
                    format!("{cell:>width$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_owned()
    };

    let mut lines = vec![format_line(TableRow::HEADERS)];
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    lines.extend(rows.iter().map(|row| format_line(row.cells())));
    lines.join("\n")
}

pub fn render_results_text(results: &ForecastResults) -> String {
    let mut sections = vec![results.best_model_message()];
    if !results.table_rows.is_empty() {
        sections.push(render_table_text(&results.table_rows));
    }
    sections.push(render_summary_text(&results.summary));
    let charted = results.forecast_series().count();
    sections.push(format!("{charted} forecast series charted"));
    sections.join("\n\n")
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        MODEL_COLORS, ViewData, chart_bounds, handle_key_event, render_results_text,
        render_summary_text, render_table_text, series_color, status_text, table_title,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use forecaster_app::{ForecastResults, ModelSummary, TableRow, transform};
    use forecaster_testkit::ResponseBuilder;
    use ratatui::style::Color;

    fn six_month_results() -> ForecastResults {
        transform(
            &ResponseBuilder::new()
                .demo_history(12)
                .model("ARIMA", 6, 2.5)
                .model("ETS", 6, 3.0)
                .failed_model("Prophet", "too few points")
                .best("ARIMA")
                .build(),
        )
        .expect("sample response should transform")
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn quit_keys_close_the_view() {
        let results = six_month_results();
        let mut view = ViewData::default();
        assert!(handle_key_event(&mut view, &results, key(KeyCode::Char('q'))));
        assert!(handle_key_event(&mut view, &results, key(KeyCode::Esc)));
        assert!(handle_key_event(
            &mut view,
            &results,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
        assert!(!handle_key_event(&mut view, &results, key(KeyCode::Char('x'))));
    }

    #[test]
    fn scrolling_stays_within_table() {
        let results = six_month_results();
        let mut view = ViewData::default();
        for _ in 0..20 {
            handle_key_event(&mut view, &results, key(KeyCode::Char('j')));
        }
        assert_eq!(view.table_offset, 5);
        handle_key_event(&mut view, &results, key(KeyCode::Char('k')));
        assert_eq!(view.table_offset, 4);
        handle_key_event(&mut view, &results, key(KeyCode::Char('g')));
        assert_eq!(view.table_offset, 0);
    }

    #[test]
    fn help_swallows_the_next_key() {
        let results = six_month_results();
        let mut view = ViewData::default();
        handle_key_event(&mut view, &results, key(KeyCode::Char('?')));
        assert!(view.help_visible);
        assert!(!handle_key_event(&mut view, &results, key(KeyCode::Char('q'))));
        assert!(!view.help_visible);
    }

    #[test]
    fn table_text_right_aligns_numbers() {
        let rows = vec![TableRow {
            date: "2025-01-01".to_owned(),
            forecast: "100.00".to_owned(),
            lower: "N/A".to_owned(),
            upper: "105.00".to_owned(),
        }];
        let text = render_table_text(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date        Forecast  Lower Bound  Upper Bound");
        assert_eq!(lines[2], "2025-01-01    100.00          N/A       105.00");
    }

    #[test]
    fn summary_text_marks_best_and_failures() {
        let results = six_month_results();
        let text = render_summary_text(&results.summary);
        assert_eq!(
            text,
            "* ARIMA  RMSE 2.50\n  ETS  RMSE 3.00\n  Prophet  failed: too few points"
        );
        assert_eq!(render_summary_text(&[]), "no models returned");
    }

    #[test]
    fn summary_text_reports_missing_data() {
        let summary = vec![ModelSummary {
            name: "Naive".to_owned(),
            rmse: None,
            failure: None,
            charted: false,
            best: false,
        }];
        assert_eq!(render_summary_text(&summary), "  Naive  no forecast data");
    }

    #[test]
    fn results_text_leads_with_best_model() {
        let text = render_results_text(&six_month_results());
        assert!(text.starts_with("Best model: ARIMA (RMSE 2.50)"));
        assert!(text.contains("Lower Bound"));
        assert!(text.ends_with("2 forecast series charted"));
    }

    #[test]
    fn status_and_title_follow_best_model() {
        let results = six_month_results();
        assert!(status_text(&results).starts_with("Best model: ARIMA"));
        assert_eq!(table_title(&results), "ARIMA forecast");
    }

    #[test]
    fn bounds_span_every_series() {
        let results = six_month_results();
        let bounds = chart_bounds(&results.series).expect("series have points");
        assert_eq!(bounds.x_labels[0], "2023-01-01");
        assert_eq!(bounds.x_labels[1], "2025-06-01");
        assert!(bounds.y[0] < bounds.y[1]);
        assert!(chart_bounds(&[]).is_none());
    }

    #[test]
    fn model_series_share_a_color() {
        let results = six_month_results();
        let arima: Vec<Color> = results
            .series
            .iter()
            .filter(|series| series.model.as_deref() == Some("ARIMA"))
            .map(|series| series_color(&results, series))
            .collect();
        assert_eq!(arima, vec![MODEL_COLORS[0]; 3]);
        assert_eq!(series_color(&results, &results.series[0]), Color::White);
    }
}
