#[cfg(coverage)]
pub(crate) fn run_tui_mode(
    project: &qd_api::LoadedProject,
) -> Result<qd_runtime::PlaybackStatus, qd_core::DramaError> {
    crate::run_line_mode(project)
}

#[cfg(not(coverage))]
mod rich {
    use std::io;
    use std::time::{Duration, Instant};

    use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
    use crossterm::terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
    };
    use crossterm::ExecutableCommand;
    use qd_api::LoadedProject;
    use qd_core::{Color as DramaColor, DramaError, Style as DramaStyle, TextStyle};
    use qd_runtime::{AdvanceFlag, Interpreter, PlaybackStatus};
    use ratatui::backend::CrosstermBackend;
    use ratatui::style::{Color, Modifier, Style};
    use ratatui::text::{Line, Span};
    use ratatui::widgets::{Paragraph, Wrap};
    use ratatui::{Frame, Terminal};

    use crate::{map_terminal_io, StyledChunk, TuiUiState, CONTINUE_PROMPT};

    const TICK: Duration = Duration::from_millis(16);
    const ELLIPSIS: &str = "…";

    struct TuiTerminal {
        terminal: Terminal<CrosstermBackend<io::Stdout>>,
    }

    impl TuiTerminal {
        fn new() -> Result<Self, DramaError> {
            enable_raw_mode().map_err(map_terminal_io)?;
            io::stdout()
                .execute(EnterAlternateScreen)
                .map_err(map_terminal_io)?;
            let backend = CrosstermBackend::new(io::stdout());
            let terminal = Terminal::new(backend).map_err(map_terminal_io)?;
            Ok(Self { terminal })
        }

        fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<io::Stdout>> {
            &mut self.terminal
        }
    }

    impl Drop for TuiTerminal {
        fn drop(&mut self) {
            let _ = disable_raw_mode();
            let _ = io::stdout().execute(LeaveAlternateScreen);
        }
    }

    pub(crate) fn run_tui_mode(project: &LoadedProject) -> Result<PlaybackStatus, DramaError> {
        let mut terminal = TuiTerminal::new()?;
        let mut interpreter = project.create_interpreter();
        let flag = AdvanceFlag::new();
        let mut ui = TuiUiState::new();
        let title = project.title().to_string();

        loop {
            ui.tick(Instant::now(), &mut interpreter, &flag)?;
            terminal
                .terminal_mut()
                .draw(|frame| render_tui(frame, &ui, &title))
                .map_err(map_terminal_io)?;

            if !event::poll(TICK).map_err(map_terminal_io)? {
                continue;
            }
            if let Event::Key(key) = event::read().map_err(map_terminal_io)? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(key, &mut interpreter, &flag, &mut ui) {
                    break;
                }
            }
        }

        tracing::info!(
            cursor = interpreter.cursor(),
            status = ?interpreter.status(),
            "player closed"
        );
        Ok(interpreter.status())
    }

    /// Returns `true` when the player should close.
    fn handle_key(
        key: KeyEvent,
        interpreter: &mut Interpreter,
        flag: &AdvanceFlag,
        ui: &mut TuiUiState,
    ) -> bool {
        let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl_c || key.code == KeyCode::Esc || key.code == KeyCode::Char('q') {
            interpreter.quit();
            return true;
        }
        if key.code == KeyCode::Char('h') {
            ui.help_visible = !ui.help_visible;
            return false;
        }
        if ui.finished {
            return true;
        }
        if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
            if ui.fast_forward() {
                return false;
            }
            if ui.awaiting {
                flag.request();
            }
        }
        false
    }

    fn truncate_to_width(value: &str, width: usize) -> String {
        if width == 0 {
            return String::new();
        }
        let chars = value.chars().collect::<Vec<_>>();
        if chars.len() <= width {
            return value.to_string();
        }
        if width == 1 {
            return ELLIPSIS.to_string();
        }
        let mut out = chars.into_iter().take(width - 1).collect::<String>();
        out.push_str(ELLIPSIS);
        out
    }

    fn wrapped_rows(line: &[StyledChunk], width: usize) -> usize {
        let chars = line
            .iter()
            .map(|chunk| chunk.text.chars().count())
            .sum::<usize>();
        chars.div_ceil(width.max(1)).max(1)
    }

    fn render_tui(frame: &mut Frame<'_>, ui: &TuiUiState, title: &str) {
        let terminal_width = frame.area().width as usize;
        let terminal_rows = frame.area().height as usize;
        let content_width = terminal_width.max(16);

        let mut reserved_rows = 3usize;
        if ui.help_visible {
            reserved_rows += 1;
        }
        if ui.finished {
            reserved_rows += 1;
        }
        let visible_text_rows = terminal_rows.saturating_sub(reserved_rows).max(1);

        let transcript = ui.visible_lines();
        let mut used_rows = 0usize;
        let mut first_visible = transcript.len();
        while first_visible > 0 {
            let rows = wrapped_rows(&transcript[first_visible - 1], content_width);
            if used_rows + rows > visible_text_rows {
                break;
            }
            used_rows += rows;
            first_visible -= 1;
        }

        let mut lines_out: Vec<Line<'_>> = Vec::new();
        lines_out.push(Line::from(Span::styled(
            truncate_to_width(&format!("{} | {}", title, ui.status), content_width),
            Style::default().fg(Color::Gray),
        )));
        let last_index = transcript.len().saturating_sub(1);
        for (index, line) in transcript.iter().enumerate().skip(first_visible) {
            let mut spans = line
                .iter()
                .map(|chunk| Span::styled(chunk.text.clone(), ratatui_style(chunk.style)))
                .collect::<Vec<_>>();
            if index == last_index && ui.awaiting && !ui.typing_in_progress() {
                spans.push(Span::styled(
                    CONTINUE_PROMPT,
                    Style::default().add_modifier(Modifier::DIM),
                ));
            }
            lines_out.push(Line::from(spans));
        }
        for _ in used_rows..visible_text_rows {
            lines_out.push(Line::from(" "));
        }
        lines_out.push(Line::from(Span::styled(
            "─".repeat(content_width),
            Style::default().fg(Color::Gray),
        )));
        if ui.finished {
            let message = ui
                .end_message
                .clone()
                .unwrap_or_else(|| "[end] press any key to exit".to_string());
            lines_out.push(Line::from(Span::styled(
                truncate_to_width(&message, content_width),
                Style::default().fg(Color::Green),
            )));
        }
        lines_out.push(Line::from(Span::styled(
            truncate_to_width(
                "keys: space/enter continue | h help | esc/q quit",
                content_width,
            ),
            Style::default().fg(Color::Yellow),
        )));
        if ui.help_visible {
            lines_out.push(Line::from(Span::styled(
                truncate_to_width(
                    "continue finishes the line being typed, then moves to the next one.",
                    content_width,
                ),
                Style::default().fg(Color::Magenta),
            )));
        }

        let paragraph = Paragraph::new(lines_out).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, frame.area());
    }

    fn ratatui_style(style: TextStyle) -> Style {
        let base = Style::default()
            .fg(ratatui_color(style.foreground))
            .bg(ratatui_color(style.background));
        match style.style {
            DramaStyle::Normal => base,
            DramaStyle::Bright => base.add_modifier(Modifier::BOLD),
            DramaStyle::Dim => base.add_modifier(Modifier::DIM),
        }
    }

    fn ratatui_color(color: DramaColor) -> Color {
        match color {
            DramaColor::Black => Color::Black,
            DramaColor::Blue => Color::Blue,
            DramaColor::Cyan => Color::Cyan,
            DramaColor::Green => Color::Green,
            DramaColor::Magenta => Color::Magenta,
            DramaColor::Red => Color::Red,
            DramaColor::White => Color::Gray,
            DramaColor::Yellow => Color::Yellow,
            DramaColor::LightBlack => Color::DarkGray,
            DramaColor::LightBlue => Color::LightBlue,
            DramaColor::LightCyan => Color::LightCyan,
            DramaColor::LightGreen => Color::LightGreen,
            DramaColor::LightMagenta => Color::LightMagenta,
            DramaColor::LightRed => Color::LightRed,
            DramaColor::LightWhite => Color::White,
            DramaColor::LightYellow => Color::LightYellow,
            DramaColor::Rgb(r, g, b) => Color::Rgb(r, g, b),
        }
    }
}

#[cfg(not(coverage))]
pub(crate) fn run_tui_mode(
    project: &qd_api::LoadedProject,
) -> Result<qd_runtime::PlaybackStatus, qd_core::DramaError> {
    use std::io::IsTerminal;

    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        tracing::info!("no terminal attached, falling back to line mode");
        return crate::run_line_mode(project);
    }
    rich::run_tui_mode(project)
}
