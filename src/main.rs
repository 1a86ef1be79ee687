//! cellwin - demo of the cellwin window layer
//!
//! Draws a bordered screen with a styled panel and an event log, then echoes
//! every key and mouse event until `q` is pressed.
//!
//! # Quick Start
//!
//! ```text
//! cellwin               # Interactive demo on the current terminal
//! cellwin --headless    # Render one frame to stdout and exit
//! ```

use std::env;

use anyhow::bail;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cellwin::keys::{KEY_MOUSE, KEY_RESIZE};
use cellwin::{
    key_name, wprint, Attr, Background, Chtype, Config, CrosstermTerminal, CursesError,
    HeadlessTerminal, MouseMask, Session, Window,
};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

const HEADLESS_ROWS: u16 = 24;
const HEADLESS_COLS: u16 = 80;

/// Command line options
#[derive(Default)]
struct Options {
    headless: bool,
    strict: bool,
}

fn print_help() {
    eprintln!("cellwin {} - character-cell window demo", VERSION);
    eprintln!();
    eprintln!("Usage: cellwin [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --headless            Render one frame to stdout and exit");
    eprintln!("  --strict              Reject unknown mouse names and clipped lines");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys: q quits; every other key and mouse event is logged.");
    eprintln!();
    eprintln!("Configuration: ~/.cellwin/config.toml");
    eprintln!("Log file:      ~/.cellwin/cellwin.log (RUST_LOG sets the level)");
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options::default();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                eprintln!("cellwin {}", VERSION);
                std::process::exit(0);
            }
            "--headless" => options.headless = true,
            "--strict" => options.strict = true,
            other => return Err(format!("Unknown argument: {}. Use -h for help.", other)),
        }
    }
    Ok(options)
}

/// Log to a file; the terminal itself is being drawn on
fn init_logging() {
    let home = env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(std::path::PathBuf::from);
    let log_path = home
        .map(|h| h.join(".cellwin").join("cellwin.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("cellwin.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };
    init_logging();
    info!("cellwin {} starting", VERSION);

    let mut config = Config::load();
    if options.strict {
        config.input.strict_mouse_names = true;
        config.draw.clip_lines = false;
    }

    if options.headless {
        run_headless(config)
    } else {
        let result = run_interactive(config);
        if let Err(e) = &result {
            error!("Demo failed: {}", e);
        }
        result
    }
}

fn run_headless(config: Config) -> anyhow::Result<()> {
    let term = HeadlessTerminal::new(HEADLESS_ROWS, HEADLESS_COLS);
    let (session, root) = Session::init_with_config(term.clone(), config)?;
    draw_frame(&session, &root)?;
    session.update()?;
    session.teardown()?;
    println!("{}", term.text());
    Ok(())
}

fn run_interactive(config: Config) -> anyhow::Result<()> {
    let (session, root) = Session::init_with_config(CrosstermTerminal::new(), config)?;
    session.cbreak(true)?;
    session.echo(false)?;
    session.cursor(0)?;

    let log = draw_frame(&session, &root)?;
    log.keypad(true)?;
    let mask = session.resolve_mouse(["all"])?;
    let previous = session.mouse_mask(mask)?;
    info!("Mouse mask set (was {:?})", previous);
    session.update()?;

    loop {
        let key = match log.get_char() {
            Ok(key) => key,
            Err(CursesError::TimedOut) => continue,
            Err(e) => return Err(e.into()),
        };
        match key {
            k if k == 'q' as i32 => break,
            KEY_RESIZE => {
                let (rows, cols) = session.screen_size();
                wprint!(log, "resized to {}x{}\n", cols, rows)?;
            }
            KEY_MOUSE => {
                let event = session.get_mouse()?;
                wprint!(
                    log,
                    "mouse ({}, {}) {}\n",
                    event.y,
                    event.x,
                    event.names().join(" ")
                )?;
            }
            k => wprint!(log, "key {:#o} {}\n", k, key_name(k))?,
        }
        log.refresh()?;
        session.update()?;
    }

    session.mouse_mask(MouseMask::empty())?;
    session.teardown()?;
    info!("cellwin exiting");
    Ok(())
}

/// Draw the demo screen and return the event log window
fn draw_frame(session: &Session, root: &Window) -> anyhow::Result<Window> {
    let (rows, cols) = session.screen_size();
    if rows < 12 || cols < 40 {
        bail!("terminal too small: {}x{} (need 40x12)", cols, rows);
    }
    let line = Chtype::from_bits(0);

    if session.has_colors() {
        session.start_color()?;
        session.init_pair(1, "yellow", "blue")?;
        session.init_pair(2, "green", "black")?;
        session.init_pair(3, "white", "red")?;
    }
    let colored = |pair: i32| if session.has_colors() { pair } else { 0 };

    root.draw_box(line, line)?;
    root.attr_on(Attr::BOLD)?;
    wprint!(root, [0, 2], " cellwin {} ", VERSION)?;
    root.attr_off(Attr::BOLD)?;
    wprint!(root, [rows - 1, 2], " q quits ")?;

    // Styled panel with its own cells
    let panel = root.derived_window(7, cols - 4, 1, 2)?;
    panel.background(Background::new().pair(colored(1)))?;
    panel.draw_box(line, line)?;
    let styles = ["bold", "underline", "reverse", "dim", "standout"];
    let mut x = 2;
    for name in styles {
        panel.attr_set(Attr::compose([name])?)?;
        wprint!(panel, [2, x], "{}", name)?;
        x += name.len() as i32 + 2;
    }
    panel.attr_set(Attr::NORMAL)?;
    panel.color_set(colored(3))?;
    wprint!(panel, [4, 2], "pair {} of {}", colored(3), session.max_pairs())?;
    panel.color_set(colored(1))?;
    panel.hline(5, 1, Chtype::from(b'-'), cols - 6)?;

    // Event log viewing the root's cells
    let log = root.sub_window(rows - 10, cols - 4, 9, 2)?;
    log.set_scroll(true)?;
    log.color_set(colored(2))?;
    wprint!(log, "press keys or click; events appear here\n")?;

    root.refresh()?;
    panel.refresh()?;
    log.sync(cellwin::SyncMode::Down)?;
    log.refresh()?;
    Ok(log)
}
