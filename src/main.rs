use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use pdfrag::{
    Answer, BuildProgress, BuiltIndex, Config, Document, ProcessingError, Role, Session,
    SessionPhase, pipeline_from_config, scan_files,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = Config::from_env().map_err(|e| io::Error::other(e.to_string()))?;
    init_logging(&cfg)?;
    let pipeline = pipeline_from_config(cfg).map_err(|e| io::Error::other(e.to_string()))?;
    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    info!(files = paths.len(), "starting pdfchat");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(Session::new(pipeline), paths);
    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(cfg: &Config) -> io::Result<()> {
    let file = File::create(&cfg.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

struct App {
    input: String,
    cursor: usize,
    session: Session,
    paths: Vec<PathBuf>,
    sources: Option<String>,
    status: String,
    last_elapsed: Option<f64>,
    output_focus: OutputFocus,
    sources_scroll: usize,
    sources_content_len: usize,
    sources_view_height: usize,
    sources_auto_scroll: bool,
    chat_scroll: usize,
    chat_content_len: usize,
    chat_view_height: usize,
    chat_auto_scroll: bool,
    active_build: Option<u64>,
    querying: bool,
    spinner_idx: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFocus {
    Sources,
    Chat,
}

enum Response {
    Answer(Answer),
    Progress(BuildProgress),
    Build {
        id: u64,
        result: Result<BuiltIndex, ProcessingError>,
    },
}

impl App {
    fn new(session: Session, paths: Vec<PathBuf>) -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            session,
            paths,
            sources: None,
            status: "Press Ctrl+R to process documents.".to_string(),
            last_elapsed: None,
            output_focus: OutputFocus::Chat,
            sources_scroll: 0,
            sources_content_len: 0,
            sources_view_height: 0,
            sources_auto_scroll: false,
            chat_scroll: 0,
            chat_content_len: 0,
            chat_view_height: 0,
            chat_auto_scroll: false,
            active_build: None,
            querying: false,
            spinner_idx: 0,
        }
    }

    fn is_loading(&self) -> bool {
        self.active_build.is_some() || self.querying
    }

    fn insert_char(&mut self, c: char) {
        let at = byte_offset(&self.input, self.cursor);
        self.input.insert(at, c);
        self.cursor += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = byte_offset(&self.input, self.cursor);
        self.input.remove(at);
    }

    fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    fn submit(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.input.trim().is_empty() || self.querying {
            return;
        }

        let question = self.input.trim().to_string();
        let job = self.session.begin_query(&question);
        self.querying = true;
        self.chat_auto_scroll = true;
        tokio::task::spawn_blocking(move || {
            let _ = tx.send(Response::Answer(job.run()));
        });

        self.input.clear();
        self.cursor = 0;
    }

    fn process_now(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.active_build.is_some() {
            return;
        }
        let job = self.session.begin_processing();
        self.active_build = Some(job.id());
        self.sources = None;
        self.status = "Processing documents...".to_string();

        let paths = self.paths.clone();
        let cfg = self.session.pipeline().config().clone();
        tokio::task::spawn_blocking(move || {
            let documents = if paths.is_empty() {
                scan_files(&cfg, None)
            } else {
                read_documents(&paths, &tx)
            };
            let progress_tx = tx.clone();
            let result = job.run(&documents, |p| {
                let _ = progress_tx.send(Response::Progress(p));
            });
            let _ = tx.send(Response::Build {
                id: job.id(),
                result,
            });
        });
    }

    fn cancel_processing(&mut self) {
        if self.active_build.is_some() {
            self.session.cancel_processing();
            self.status = "Cancelling...".to_string();
        }
    }

    fn clear_transcript(&mut self) {
        self.session.clear_transcript();
        self.sources = None;
        self.last_elapsed = None;
        self.chat_scroll = 0;
        self.sources_scroll = 0;
    }

    fn handle_response(&mut self, response: Response) {
        match response {
            Response::Answer(answer) => {
                self.querying = false;
                self.session.finish_query(&answer);
                self.last_elapsed = Some(answer.elapsed_seconds);
                self.sources = Some(format_sources(&answer));
            }
            Response::Progress(progress) => {
                self.status = match progress {
                    BuildProgress::Loaded { filename, pages } => {
                        format!("Loaded {filename} ({pages} pages)")
                    }
                    BuildProgress::LoadFailed { filename, reason } => {
                        format!("Skipped {filename}: {reason}")
                    }
                    BuildProgress::Chunked { chunks } => format!("Split into {chunks} chunks"),
                    BuildProgress::Embedded { done, total } => {
                        format!("Embedded {done}/{total} chunks")
                    }
                };
            }
            Response::Build { id, result } => {
                if self.active_build != Some(id) {
                    return;
                }
                self.active_build = None;
                self.status = match self.session.finish_processing(id, result) {
                    Ok(report) => {
                        let mut status = format!(
                            "Processed {} documents: {} chunks in {:.1}s. Ready for questions.",
                            report.documents,
                            report.chunks,
                            report.elapsed.as_secs_f64()
                        );
                        for failed in &report.failed {
                            status.push_str(&format!("\nSkipped {}: {}", failed.filename, failed.reason));
                        }
                        status
                    }
                    Err(err) => {
                        error!(error = %err, "processing failed");
                        format!("Error processing PDFs: {err}")
                    }
                };
            }
        }
        self.chat_auto_scroll = true;
        self.sources_auto_scroll = true;
    }

    fn scroll_up(&mut self, by: usize) {
        match self.output_focus {
            OutputFocus::Sources => {
                self.sources_scroll = self.sources_scroll.saturating_sub(by);
            }
            OutputFocus::Chat => {
                self.chat_scroll = self.chat_scroll.saturating_sub(by);
            }
        }
    }

    fn scroll_down(&mut self, by: usize) {
        match self.output_focus {
            OutputFocus::Sources => {
                let max_scroll = self
                    .sources_content_len
                    .saturating_sub(self.sources_view_height);
                self.sources_scroll = (self.sources_scroll + by).min(max_scroll);
            }
            OutputFocus::Chat => {
                let max_scroll = self.chat_content_len.saturating_sub(self.chat_view_height);
                self.chat_scroll = (self.chat_scroll + by).min(max_scroll);
            }
        }
    }

    fn scroll_to_start(&mut self) {
        match self.output_focus {
            OutputFocus::Sources => self.sources_scroll = 0,
            OutputFocus::Chat => self.chat_scroll = 0,
        }
    }

    fn scroll_to_end(&mut self) {
        match self.output_focus {
            OutputFocus::Sources => {
                self.sources_scroll = self
                    .sources_content_len
                    .saturating_sub(self.sources_view_height);
            }
            OutputFocus::Chat => {
                self.chat_scroll = self.chat_content_len.saturating_sub(self.chat_view_height);
            }
        }
    }

    fn focused_view_height(&self) -> usize {
        match self.output_focus {
            OutputFocus::Sources => self.sources_view_height,
            OutputFocus::Chat => self.chat_view_height,
        }
    }
}

/// Reads the files named on the command line. Unreadable files are reported
/// like PDFs that fail to load and do not stop the others.
fn read_documents(paths: &[PathBuf], tx: &mpsc::UnboundedSender<Response>) -> Vec<Document> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        match Document::from_path(path) {
            Ok(doc) => documents.push(doc),
            Err(err) => {
                let _ = tx.send(Response::Progress(BuildProgress::LoadFailed {
                    filename: path.display().to_string(),
                    reason: err.to_string(),
                }));
            }
        }
    }
    documents
}

fn format_sources(answer: &Answer) -> String {
    if answer.sources.is_empty() {
        return "(no sources)".to_string();
    }
    answer
        .sources
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "Source {}: {} (Page {}, score {:.3})\n{}",
                i + 1,
                s.source_filename,
                s.page_number,
                s.score,
                s.excerpt
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_transcript(app: &App) -> String {
    let mut lines: Vec<String> = app
        .session
        .transcript()
        .entries()
        .iter()
        .map(|entry| match entry.role {
            Role::User => format!("You: {}", entry.text),
            Role::Assistant => format!("Assistant: {}\n", entry.text),
        })
        .collect();
    if app.querying {
        lines.push("Assistant: thinking...".to_string());
    }
    if lines.is_empty() {
        return app.status.clone();
    }
    lines.join("\n")
}

fn byte_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map(|(i, _)| i).unwrap_or(s.len())
}

fn inner_width(area: ratatui::layout::Rect) -> usize {
    area.width.saturating_sub(2) as usize
}

fn inner_height(area: ratatui::layout::Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

fn truncate_input(input: &str, cursor: usize, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    if len <= max_width {
        return input.to_string();
    }
    let cursor = cursor.min(len);
    let mut start = cursor.saturating_sub(max_width / 2);
    if start + max_width > len {
        start = len - max_width;
    }
    chars[start..start + max_width].iter().collect()
}

fn line_count(text: &str) -> usize {
    let count = text.lines().count();
    if count == 0 { 1 } else { count }
}

fn cursor_x_in_view(input: &str, cursor: usize, max_width: usize) -> usize {
    if max_width == 0 {
        return 0;
    }
    let len = input.chars().count();
    if len <= max_width {
        return cursor.min(len);
    }
    let cursor = cursor.min(len);
    let mut start = cursor.saturating_sub(max_width / 2);
    if start + max_width > len {
        start = len - max_width;
    }
    cursor.saturating_sub(start).min(max_width)
}

fn phase_label(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Empty => "no documents",
        SessionPhase::Processing => "processing",
        SessionPhase::Ready => "ready",
    }
}

fn draw_ui(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    let spinner = ["|", "/", "-", "\\"];

    terminal.draw(|frame| {
        let title_style = Style::default().fg(Color::Black).add_modifier(Modifier::BOLD);
        let info_border = Style::default().fg(Color::Black);
        let input_border = Style::default().fg(Color::DarkGray);
        let help_border = Style::default().fg(Color::DarkGray);
        let info_text_style = Style::default().fg(Color::Blue);
        let help_text_style = Style::default().fg(Color::DarkGray);
        let input_text_style = Style::default().fg(Color::DarkGray);

        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);
        let output_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(chunks[0]);

        let sources_text = app
            .sources
            .clone()
            .unwrap_or_else(|| "Sources will appear here after you ask a question.".to_string());
        let chat_text = format_transcript(app);

        let sources_title = match app.output_focus {
            OutputFocus::Sources => "Sources *",
            OutputFocus::Chat => "Sources",
        };

        let focus_mark = if app.output_focus == OutputFocus::Chat { " *" } else { "" };
        let mut chat_title = format!("Chat [{}]", phase_label(app.session.phase()));
        if let Some(elapsed) = app.last_elapsed {
            chat_title.push_str(&format!(" response time {elapsed:.2}s"));
        }
        if app.is_loading() {
            chat_title.push_str(&format!(" {}", spinner[app.spinner_idx]));
        }
        chat_title.push_str(focus_mark);

        let sources_block = Block::bordered()
            .title(sources_title)
            .title_style(title_style)
            .border_style(info_border);
        let chat_block = Block::bordered()
            .title(chat_title)
            .title_style(title_style)
            .border_style(info_border);

        let sources_view_height = inner_height(output_chunks[0]);
        app.sources_content_len = line_count(&sources_text);
        app.sources_view_height = sources_view_height;
        if app.sources_auto_scroll {
            app.sources_scroll = 0;
            app.sources_auto_scroll = false;
        } else if app.sources_scroll > app.sources_content_len.saturating_sub(app.sources_view_height) {
            app.sources_scroll = app.sources_content_len.saturating_sub(app.sources_view_height);
        }

        let chat_view_height = inner_height(output_chunks[1]);
        app.chat_content_len = line_count(&chat_text);
        app.chat_view_height = chat_view_height;
        if app.chat_auto_scroll {
            app.chat_scroll = app.chat_content_len.saturating_sub(app.chat_view_height);
            app.chat_auto_scroll = false;
        } else if app.chat_scroll > app.chat_content_len.saturating_sub(app.chat_view_height) {
            app.chat_scroll = app.chat_content_len.saturating_sub(app.chat_view_height);
        }

        let sources = Paragraph::new(sources_text)
            .style(info_text_style)
            .scroll((app.sources_scroll as u16, 0))
            .wrap(Wrap { trim: true })
            .block(sources_block);
        frame.render_widget(sources, output_chunks[0]);

        let mut sources_scrollbar = ScrollbarState::new(app.sources_content_len).position(app.sources_scroll);
        let sources_scrollbar_widget = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .track_style(Style::default().fg(Color::DarkGray))
            .thumb_style(Style::default().fg(Color::Blue));
        frame.render_stateful_widget(
            sources_scrollbar_widget,
            output_chunks[0].inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut sources_scrollbar,
        );

        let chat = Paragraph::new(chat_text)
            .style(info_text_style)
            .scroll((app.chat_scroll as u16, 0))
            .wrap(Wrap { trim: true })
            .block(chat_block);
        frame.render_widget(chat, output_chunks[1]);

        let mut chat_scrollbar = ScrollbarState::new(app.chat_content_len).position(app.chat_scroll);
        let chat_scrollbar_widget = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .track_style(Style::default().fg(Color::DarkGray))
            .thumb_style(Style::default().fg(Color::Blue));
        frame.render_stateful_widget(
            chat_scrollbar_widget,
            output_chunks[1].inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut chat_scrollbar,
        );

        let input_block = Block::bordered()
            .title("Ask a question about your PDFs")
            .title_style(title_style)
            .border_style(input_border);
        let input_view = truncate_input(&app.input, app.cursor, inner_width(chunks[1]));
        let input = Paragraph::new(input_view)
            .style(input_text_style)
            .block(input_block)
            .wrap(Wrap { trim: false });
        frame.render_widget(input, chunks[1]);

        let cursor_x = cursor_x_in_view(&app.input, app.cursor, inner_width(chunks[1]));
        let x = chunks[1].x + 1 + cursor_x as u16;
        let y = chunks[1].y + 1;
        frame.set_cursor_position((x, y));

        let help_block = Block::bordered()
            .title(app.status.lines().last().unwrap_or("Controls").to_string())
            .title_style(title_style)
            .border_style(help_border);
        let help = Paragraph::new(
            "Enter: Ask | F2/Ctrl+R: Process | Ctrl+X: Cancel | Ctrl+L: Clear | Ctrl+O: Focus | Up/Down/PgUp/PgDn/Home/End: Scroll | Esc/Ctrl+C: Quit",
        )
        .style(help_text_style)
        .wrap(Wrap { trim: true })
        .block(help_block);
        frame.render_widget(help, chunks[2]);
    })?;

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let mut events = EventStream::new();
    let mut spinner_tick = tokio::time::interval(Duration::from_millis(100));
    spinner_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    draw_ui(terminal, app)?;

    loop {
        tokio::select! {
            _ = spinner_tick.tick() => {
                if app.is_loading() {
                    app.spinner_idx = (app.spinner_idx + 1) % 4;
                    draw_ui(terminal, app)?;
                }
            }
            maybe_result = rx.recv() => {
                if let Some(response) = maybe_result {
                    app.handle_response(response);
                    draw_ui(terminal, app)?;
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                        match key.code {
                            KeyCode::Char('c') if ctrl => return Ok(()),
                            KeyCode::Char('r') if ctrl => app.process_now(tx.clone()),
                            KeyCode::Char('x') if ctrl => app.cancel_processing(),
                            KeyCode::Char('l') if ctrl => app.clear_transcript(),
                            KeyCode::F(2) => app.process_now(tx.clone()),
                            KeyCode::Esc => return Ok(()),
                            KeyCode::Enter => app.submit(tx.clone()),
                            KeyCode::Up => app.scroll_up(1),
                            KeyCode::Down => app.scroll_down(1),
                            KeyCode::PageUp => app.scroll_up(app.focused_view_height().max(1)),
                            KeyCode::PageDown => app.scroll_down(app.focused_view_height().max(1)),
                            KeyCode::Home => app.scroll_to_start(),
                            KeyCode::End => app.scroll_to_end(),
                            KeyCode::Char('o') if ctrl => {
                                app.output_focus = match app.output_focus {
                                    OutputFocus::Sources => OutputFocus::Chat,
                                    OutputFocus::Chat => OutputFocus::Sources,
                                };
                            }
                            KeyCode::Left => app.move_left(),
                            KeyCode::Right => app.move_right(),
                            KeyCode::Backspace => app.delete_char(),
                            KeyCode::Char(ch) => app.insert_char(ch),
                            _ => {}
                        }
                        draw_ui(terminal, app)?;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => {}
                    None => return Ok(()),
                }
            }
        }
    }
}
