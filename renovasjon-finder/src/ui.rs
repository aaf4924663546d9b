use chrono::{Local, NaiveDate};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};
use renovasjon_core::{model::CollectionEvent, resolver::days_until};

use crate::app::{App, Screen};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    // Title / header
    let header = Paragraph::new(format!("renovasjon – find your property id ({})", app.upstream_name))
        .block(Block::default().borders(Borders::ALL).title("Renovasjon"));
    frame.render_widget(header, *header_area);

    // Main screen
    match app.screen {
        Screen::AddressSearch => draw_address_search(frame, app, *content_area),
        Screen::PropertyView => draw_property_view(frame, app, *content_area),
    }

    // Status bar
    let nav_hint = match app.screen {
        Screen::AddressSearch => {
            "Type to edit · Enter search · Tab/→ open property · Esc/Ctrl-C quit"
        }
        Screen::PropertyView => "Esc/←/b back to results · q/Ctrl-C quit",
    };

    let status_text = if app.is_loading {
        format!("Loading… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {nav_hint}")
    } else {
        nav_hint.to_owned()
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_loading {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_address_search(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // input
            Constraint::Min(0),    // results
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [input_area, results_area] = chunks else {
        return;
    };

    let input = Paragraph::new(app.address_input.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Address (street and house number, Enter)"),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(input, *input_area);

    let items = if app.properties.is_empty() {
        vec![ListItem::new(
            "No results yet. Try typing a street plus house number.",
        )]
    } else {
        app.properties
            .iter()
            .map(|property| {
                ListItem::new(format!(
                    "{}  ·  gnr/bnr {}  ·  {}",
                    property.address, property.cadastral, property.owner
                ))
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Properties (↑/↓, Tab/→ to open)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !app.properties.is_empty() {
        state.select(Some(app.property_list_index));
    }
    frame.render_stateful_widget(list, *results_area, &mut state);
}

fn draw_property_view(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(property) = app.selected_property.as_ref() else {
        return;
    };

    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // details
            Constraint::Min(0),    // collections
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [details_area, schedule_area] = chunks else {
        return;
    };

    let details = Paragraph::new(vec![
        Line::from(vec![
            Span::raw("property_id = "),
            Span::styled(
                format!("\"{}\"", property.id),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!("Owner: {}", property.owner)),
        Line::from(format!("Gnr/Bnr: {}", property.cadastral)),
        Line::from("Copy the property_id line into config.toml"),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(property.address.clone()),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(details, *details_area);

    let title = "Upcoming collections (Esc/←/b to go back)";

    if app.is_loading {
        let paragraph = Paragraph::new("Loading collections…")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, *schedule_area);
        return;
    }

    if app.collections.is_empty() {
        let paragraph = Paragraph::new("No collections scheduled in the next 90 days.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, *schedule_area);
        return;
    }

    let today = Local::now().date_naive();
    let mut collections: Vec<&CollectionEvent> = app.collections.iter().collect();
    collections.sort_by_key(|event| event.date);

    let rows = collections.into_iter().map(|event| {
        let date = event.date.format("%d.%m.%Y").to_string();
        let weekday = event.date.format("%a").to_string();
        let relative = relative_day_label(event.date, today);

        let mut style = Style::default();
        if event.date <= today {
            style = style.add_modifier(Modifier::BOLD);
        }

        Row::new(vec![
            Cell::from(date),
            Cell::from(weekday),
            Cell::from(relative),
            Cell::from(event.category.clone()),
        ])
        .style(style)
    });

    let column_widths = [
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Min(20),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Date", "Day", "In", "Waste type"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1);

    frame.render_widget(table, *schedule_area);
}

fn relative_day_label(date: NaiveDate, today: NaiveDate) -> String {
    match days_until(date, today) {
        0 => "today".to_owned(),
        1 => "tomorrow".to_owned(),
        days if days > 1 => format!("in {days} days"),
        -1 => "yesterday".to_owned(),
        days => format!("{} days ago", days.abs()),
    }
}
