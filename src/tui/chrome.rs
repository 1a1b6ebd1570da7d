// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Title, file view, footer, and picker rendering helpers used by the TUI.
fn view_title(label: &str, key: char, tail: Option<&str>) -> String {
    let mut title = format!("─[{key}]─ {label}");
    if let Some(tail) = tail {
        let tail = tail.trim();
        if !tail.is_empty() {
            title.push(' ');
            title.push_str(tail);
        }
    }
    title.push(' ');
    title
}

fn render_file(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let label = app
        .file
        .as_ref()
        .map_or("no file", |file| file.path.as_str())
        .to_owned();
    let position = (app.line_count() > 0).then(|| format!("L{}/{}", app.cursor, app.line_count()));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(FOCUS_COLOR))
        .title(view_title(&label, 'o', position.as_deref()));
    app.set_viewport(block.inner(area));

    let dim = Style::default().fg(GUTTER_COLOR);
    let body = match &app.file {
        None => vec![Line::from(Span::styled(
            "No file open. Press o to pick one.",
            dim,
        ))],
        Some(file) if !file.is_text => vec![Line::from(Span::styled(
            format!("Binary file ({} bytes)", file.size),
            dim,
        ))],
        Some(file) => visible_lines(app, file),
    };
    frame.render_widget(Paragraph::new(body).block(block), area);
}

fn visible_lines(app: &App, file: &OpenFile) -> Vec<Line<'static>> {
    let lines = file.lines();
    let gutter_width = lines.len().to_string().len();
    let flashed = app.flashed_line();

    lines
        .iter()
        .enumerate()
        .skip(app.scroll)
        .take(usize::from(app.viewport.height))
        .map(|(index, text)| {
            let number = index + 1;
            let selected = app.selector.contains(number);
            let is_cursor = number == app.cursor;

            let gutter_style = if is_cursor {
                Style::default().fg(FOCUS_COLOR).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(GUTTER_COLOR)
            };
            let mut text_style = Style::default();
            if selected {
                text_style = text_style.add_modifier(Modifier::REVERSED);
            }
            if flashed == Some(number) {
                text_style = text_style.bg(FLASH_COLOR).fg(Color::Black);
            }
            let marker = match (is_cursor, selected) {
                (true, _) => "▶",
                (false, true) => "│",
                (false, false) => " ",
            };

            Line::from(vec![
                Span::styled(format!("{number:>gutter_width$} "), gutter_style),
                Span::styled(marker, gutter_style),
                Span::raw(" "),
                Span::styled(display_text(text), text_style),
            ])
        })
        .collect()
}

fn display_text(line: &str) -> String {
    line.strip_suffix('\r')
        .unwrap_or(line)
        .replace('\t', &" ".repeat(TAB_WIDTH))
}

fn footer_line(app: &App) -> Line<'static> {
    let mut spans = Vec::<Span<'static>>::new();

    if let Some(span) = app.selector.span() {
        spans.push(Span::styled(
            format!("{span} ({})", app.selector.selected().count()),
            Style::default().fg(Color::LightGreen),
        ));
    }

    if app.picker.is_some() {
        push_footer_entry(&mut spans, "OPEN", "Enter");
        push_footer_entry(&mut spans, "MOVE", "↑/↓");
        push_footer_entry(&mut spans, "CLOSE", "Esc");
    } else {
        push_footer_entry(&mut spans, "SEND", "Enter");
        push_footer_entry(&mut spans, "CLEAR", "Esc");
        push_footer_entry(&mut spans, "TOGGLE", "Space");
        push_footer_entry(&mut spans, "RANGE", "v");
        push_footer_entry(&mut spans, "PARA", "p");
        push_footer_entry(&mut spans, "BLOCK", "i");
        push_footer_entry(&mut spans, "YANK", "y");
        push_footer_entry(&mut spans, "FILE", "o");
        push_footer_entry(&mut spans, "QUIT", "q");
    }

    if let Some(toast) = &app.toast {
        spans.push(Span::styled(" | ", Style::default().fg(FOOTER_LABEL_COLOR)));
        spans.push(Span::raw(toast.message.clone()));
    } else if let Some(url) = &app.server_url {
        spans.push(Span::styled(" | ", Style::default().fg(FOOTER_LABEL_COLOR)));
        spans.push(Span::styled(url.clone(), Style::default().fg(GUTTER_COLOR)));
    }

    Line::from(spans)
}

fn push_footer_entry(spans: &mut Vec<Span<'static>>, label: &str, key: &str) {
    if !spans.is_empty() {
        spans.push(Span::styled(" | ", Style::default().fg(FOOTER_LABEL_COLOR)));
    }
    spans.push(Span::styled(
        format!("{}:", footer_label_ucfirst(label)),
        Style::default().fg(FOOTER_LABEL_COLOR),
    ));
    spans.push(Span::styled(
        key.to_owned(),
        Style::default()
            .fg(FOOTER_KEY_COLOR)
            .add_modifier(Modifier::BOLD),
    ));
}

fn footer_label_ucfirst(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn render_picker(frame: &mut Frame<'_>, picker: &FilePicker, main_area: Rect) {
    let area = centered_rect(70, 70, main_area);
    frame.render_widget(Clear, area);

    let count = format!("{}/{}", picker.matches().len(), picker.candidate_count());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(FOCUS_COLOR))
        .title(view_title("Open file", '/', Some(&count)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let prompt = Line::from(vec![
        Span::styled(
            "> ",
            Style::default()
                .fg(FOOTER_KEY_COLOR)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(picker.query().to_owned()),
    ]);
    frame.render_widget(Paragraph::new(prompt), rows[0]);

    let items: Vec<ListItem<'static>> = picker
        .matches()
        .iter()
        .map(|path| ListItem::new(path.clone()))
        .collect();
    let mut state = ListState::default();
    if !items.is_empty() {
        state.select(Some(picker.selected_index()));
    }
    let list = List::new(items)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("▶ ");
    frame.render_stateful_widget(list, rows[1], &mut state);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical_margin = (100u16.saturating_sub(height_percent)) / 2;
    let horizontal_margin = (100u16.saturating_sub(width_percent)) / 2;

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(vertical_margin),
            Constraint::Percentage(height_percent),
            Constraint::Percentage(vertical_margin),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(horizontal_margin),
            Constraint::Percentage(width_percent),
            Constraint::Percentage(horizontal_margin),
        ])
        .split(vertical[1])[1]
}
