//! Halo CLI — terminal audio visualizer

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use log::LevelFilter;
use ratatui::prelude::*;
use ratatui::widgets::*;
use simplelog::WriteLogger;

use halo::audio::{format_time, PlayState};
use halo::controller::{ActionOrigin, ContextState, PlaybackController};
use halo::settings::RenderParameters;
use halo::viz::canvas::PixmapSurface;
use halo::viz::waveform::VisualizationMode;

/// Offscreen waveform surface in CSS pixels
const SURFACE_WIDTH: f32 = 800.0;
const SURFACE_HEIGHT: f32 = 200.0;

/// Arrow-key seek step in seconds
const SEEK_STEP_SECS: f64 = 5.0;

const VOLUME_STEP: f32 = 0.05;

#[derive(Parser)]
#[command(
    name = "halo",
    about = "Audio-reactive waveform and stripe ring visualizer",
    version
)]
struct Cli {
    /// Audio file to play (wav, mp3, ogg, flac)
    file: PathBuf,

    /// Settings file overriding the built-in render parameters
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Render one waveform frame to a PNG and exit
    #[arg(long, value_name = "PNG")]
    snapshot: Option<PathBuf>,

    /// Write debug logs to a file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(ref path) = cli.log_file {
        WriteLogger::init(
            LevelFilter::Debug,
            simplelog::Config::default(),
            File::create(path)?,
        )?;
    }

    let params = RenderParameters::load_or_default(cli.config.as_deref());
    if params.degraded {
        eprintln!("Warning: settings file could not be loaded, using defaults");
    }

    let controller = match PlaybackController::new(&cli.file, params) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let file_name = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.file.display().to_string());

    match cli.snapshot {
        Some(ref png) => snapshot(controller, png),
        None => run_tui(controller, &file_name),
    }
}

/// Render one waveform frame from live playback and write it as a PNG
fn snapshot(
    mut controller: PlaybackController,
    png: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    controller.toggle_play(ActionOrigin::UserGesture);
    if controller.context_state() != ContextState::Running {
        controller.shutdown();
        eprintln!("Error: audio output unavailable, nothing to snapshot");
        std::process::exit(1);
    }

    // Let the tap fill the analyzer windows before drawing
    std::thread::sleep(Duration::from_millis(400));
    controller.pump_events();

    let mut surface = PixmapSurface::new(SURFACE_WIDTH, SURFACE_HEIGHT, 1.0)?;
    controller.render_tick(&mut surface);
    surface.save_png(png)?;
    println!("Wrote {}", png.display());

    controller.shutdown();
    Ok(())
}

fn run_tui(
    mut controller: PlaybackController,
    file_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut surface = PixmapSurface::new(SURFACE_WIDTH, SURFACE_HEIGHT, 1.0)?;

    // Suppress stderr during TUI — ALSA/PulseAudio write diagnostic
    // messages to stderr which corrupt the ratatui display.
    let saved_stderr = unsafe { libc::dup(2) };
    {
        let devnull = File::open("/dev/null")?;
        unsafe { libc::dup2(devnull.as_raw_fd(), 2) };
    }

    terminal::enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let tick_rate = Duration::from_millis(33); // ~30fps
    let mut last_tick = Instant::now();
    let mut running = true;

    while running {
        terminal.draw(|f| draw_ui(f, &controller, file_name))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            running = false;
                        }
                        KeyCode::Char(' ') => {
                            controller.toggle_play(ActionOrigin::UserGesture);
                        }
                        KeyCode::Left => seek_by(&mut controller, -SEEK_STEP_SECS),
                        KeyCode::Right => seek_by(&mut controller, SEEK_STEP_SECS),
                        KeyCode::Char('+') | KeyCode::Char('=') => {
                            let volume = controller.volume();
                            controller.set_volume(volume + VOLUME_STEP);
                        }
                        KeyCode::Char('-') => {
                            let volume = controller.volume();
                            controller.set_volume(volume - VOLUME_STEP);
                        }
                        KeyCode::Char('m') => {
                            controller.toggle_visualization_mode();
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            controller.pump_events();
            controller.render_tick(&mut surface);
        }
    }

    // Shut down while still in the alternate screen
    // (rodio prints "Dropping OutputStream..." to stderr on drop)
    controller.shutdown();

    terminal::disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    if saved_stderr >= 0 {
        unsafe {
            libc::dup2(saved_stderr, 2);
            libc::close(saved_stderr);
        }
    }

    Ok(())
}

fn seek_by(controller: &mut PlaybackController, delta: f64) {
    let Some(duration) = controller.duration() else {
        return;
    };
    if duration <= 0.0 {
        return;
    }
    let fraction = (controller.position() + delta) / duration;
    controller.seek(fraction);
}

fn draw_ui(f: &mut Frame, controller: &PlaybackController, file_name: &str) {
    let area = f.area();

    let outer = Block::default()
        .title(format!(" Halo v{} ", env!("CARGO_PKG_VERSION")))
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let chunks = Layout::vertical([
        Constraint::Length(5), // top row: track info + ring
        Constraint::Length(3), // progress bar
        Constraint::Length(3), // help bar
    ])
    .split(inner);

    let top_cols = Layout::horizontal([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[0]);

    draw_track(f, controller, file_name, top_cols[0]);
    draw_ring(f, controller, top_cols[1]);
    draw_progress(f, controller, chunks[1]);
    draw_help(f, controller, chunks[2]);
}

fn draw_track(f: &mut Frame, controller: &PlaybackController, file_name: &str, area: Rect) {
    let (status, status_color) = match controller.play_state() {
        PlayState::Playing => ("Playing", Color::Green),
        PlayState::Paused => ("Paused", Color::Yellow),
        PlayState::Ended => ("Ended", Color::DarkGray),
        PlayState::Errored => ("Error", Color::Red),
    };
    let (context, context_color) = match controller.context_state() {
        ContextState::Uninitialized => ("Waiting for gesture", Color::DarkGray),
        ContextState::Running => ("Live", Color::Green),
        ContextState::Unavailable => ("No output", Color::Red),
    };
    let mode = match controller.visualization_mode() {
        VisualizationMode::Default => "Default",
        VisualizationMode::Glowing => "Glowing",
    };

    let text = vec![
        Line::from(vec![
            Span::styled("  Track: ", Style::default().fg(Color::DarkGray)),
            Span::styled(file_name, Style::default().fg(Color::White).bold()),
        ]),
        Line::from(vec![
            Span::styled("  Signal: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                controller.info().to_string(),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Status: ", Style::default().fg(Color::DarkGray)),
            Span::styled(status, Style::default().fg(status_color)),
            Span::raw("  "),
            Span::styled("Context: ", Style::default().fg(Color::DarkGray)),
            Span::styled(context, Style::default().fg(context_color)),
            Span::raw("  "),
            Span::styled("Mode: ", Style::default().fg(Color::DarkGray)),
            Span::styled(mode, Style::default().fg(Color::Magenta)),
        ]),
    ];
    f.render_widget(Paragraph::new(text), area);
}

fn draw_ring(f: &mut Frame, controller: &PlaybackController, area: Rect) {
    let block = Block::default()
        .title(" Ring ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray));

    // Unroll the stripe arena into a sparkline, floor at 0
    let heights: Vec<u64> = controller
        .ring()
        .elements()
        .iter()
        .map(|s| (s.height - 10.0).clamp(0.0, 80.0) as u64)
        .collect();

    let sparkline = Sparkline::default()
        .block(block)
        .data(&heights)
        .max(80)
        .style(Style::default().fg(Color::Magenta));

    f.render_widget(sparkline, area);
}

fn draw_progress(f: &mut Frame, controller: &PlaybackController, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray));

    let elapsed = format_time(controller.position());
    let total = controller
        .duration()
        .map(format_time)
        .unwrap_or_else(|| "-:--".to_string());

    let gauge = Gauge::default()
        .block(block)
        .ratio(controller.progress())
        .label(format!("{} / {}", elapsed, total))
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black));

    f.render_widget(gauge, area);
}

fn draw_help(f: &mut Frame, controller: &PlaybackController, area: Rect) {
    let vol_display = format!("{}%", (controller.volume() * 100.0).round() as u32);

    let help = Line::from(vec![
        Span::styled("  'space' ", Style::default().fg(Color::Yellow)),
        Span::raw("play/pause  |  "),
        Span::styled("'←'/'→' ", Style::default().fg(Color::Yellow)),
        Span::raw("seek  |  "),
        Span::styled("'+'/'-' ", Style::default().fg(Color::Yellow)),
        Span::raw("volume  |  "),
        Span::styled("'m' ", Style::default().fg(Color::Yellow)),
        Span::raw("mode  |  "),
        Span::styled("'q' ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  |  "),
        Span::styled(
            format!("Vol: {}", vol_display),
            Style::default().fg(Color::Cyan).bold(),
        ),
    ]);

    f.render_widget(Paragraph::new(help).alignment(Alignment::Left), area);
}
