use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

use chip8_vm::{
    Chip8State, DISPLAY_HEIGHT, DISPLAY_WIDTH, Fault, Key, Step, cpu::wrap_address, step,
};

pub const DEFAULT_FRAME_RATE: u64 = 60;
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u64 = 700;

pub struct Settings {
    pub frame_rate: u64,
    pub ips: u64,
    pub rom: PathBuf,
    pub seed: Option<u64>,
    pub skip_unknown: bool,
}

/// What the run loop learned from a batch of instructions.
#[derive(Default)]
struct Batch {
    redraw: bool,
    waiting: bool,
}

/// What the run loop should do after a terminal event.
#[derive(Debug, PartialEq, Eq)]
enum Control {
    Continue,
    Repaint,
    Quit,
}

pub struct Emulator {
    state: Chip8State,
    settings: Settings,
    rom: Vec<u8>,
    rng: StdRng,
}

impl Emulator {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let rom = std::fs::read(&settings.rom)
            .with_context(|| format!("failed to read ROM {:?}", settings.rom))?;
        let state = Chip8State::with_rom(&rom)
            .with_context(|| format!("failed to load ROM {:?}", settings.rom))?;
        info!("loaded {} bytes from {:?}", rom.len(), settings.rom);

        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Emulator {
            state,
            settings,
            rom,
            rng,
        })
    }

    /// Powers the machine back on with the same ROM.
    fn restart(&mut self) -> anyhow::Result<()> {
        self.state.reset();
        self.state.memory.load_rom(&self.rom)?;
        info!("restarted {:?}", self.settings.rom);
        Ok(())
    }

    fn instructions_per_frame(&self) -> u64 {
        (self.settings.ips / self.settings.frame_rate.max(1)).max(1)
    }

    /// Executes up to `count` instructions, stopping early when the machine
    /// blocks on the keypad.
    fn run_batch(&mut self, count: u64) -> anyhow::Result<Batch> {
        let mut batch = Batch::default();
        for _ in 0..count {
            match step(&mut self.state, &mut self.rng) {
                Ok(Step::Continue) => {}
                Ok(Step::Redraw) => batch.redraw = true,
                Ok(Step::WaitingForKey) => {
                    batch.waiting = true;
                    break;
                }
                Err(Fault::UnknownOpcode { address, word }) if self.settings.skip_unknown => {
                    warn!("skipping unknown opcode {word:#06X} at {address:#05X}");
                    self.state.pc = wrap_address(usize::from(address) + 2);
                }
                Err(fault) => return Err(fault).context("emulation halted"),
            }
        }
        Ok(batch)
    }

    /// Runs `cycles` instructions without a terminal, ticking the timers once
    /// per frame's worth of instructions, and returns the final screen.
    pub fn run_headless(&mut self, cycles: u64) -> anyhow::Result<String> {
        let per_frame = self.instructions_per_frame();
        let mut remaining = cycles;
        while remaining > 0 {
            let count = remaining.min(per_frame);
            let batch = self.run_batch(count)?;
            self.state.tick_timers();
            if batch.waiting {
                info!("program is waiting for a key, stopping headless run");
                break;
            }
            remaining -= count;
        }
        Ok(self.state.display.to_string())
    }

    fn handle_event(&mut self, event: Event) -> anyhow::Result<Control> {
        let control = match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => match key.code {
                KeyCode::Esc => Control::Quit,
                KeyCode::Backspace => {
                    self.restart()?;
                    Control::Repaint
                }
                code => {
                    if let Some(key) = map_key(code) {
                        self.state.keypad.press_key(key);
                    }
                    Control::Continue
                }
            },
            // The old frame is gone once the terminal changes size.
            Event::Resize(..) => Control::Repaint,
            _ => Control::Continue,
        };
        Ok(control)
    }

    fn draw(&self, frame: &mut ratatui::Frame, area: Rect, rom_name: &str, waiting: bool) {
        // Exact size for 64x32 display plus borders
        let game_width = (DISPLAY_WIDTH as u16) + 2;
        let game_height = (DISPLAY_HEIGHT as u16) + 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(game_height),
                Constraint::Length(8),
                Constraint::Min(0),
            ])
            .split(area);

        let game_area = if chunks[0].width > game_width {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Min(0),
                    Constraint::Length(game_width),
                    Constraint::Min(0),
                ])
                .split(chunks[0])[1]
        } else {
            chunks[0]
        };

        let title = if waiting {
            format!("{rom_name} (waiting for key)")
        } else {
            rom_name.to_string()
        };
        let game_paragraph = Paragraph::new(self.state.display.to_string())
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().fg(Color::White));
        frame.render_widget(game_paragraph, game_area);

        let key_mapping = "Key Mapping:\n\
    1 2 3 4    →    1 2 3 C\n\
    Q W E R    →    4 5 6 D\n\
    A S D F    →    7 8 9 E\n\
    Z X C V    →    A 0 B F\n\
    Backspace restarts, Esc quits";
        let key_paragraph = Paragraph::new(key_mapping)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Keypad"))
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(key_paragraph, chunks[1]);
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let result = self.terminal_loop();
        disable_raw_mode()?;
        result
    }

    fn terminal_loop(&mut self) -> anyhow::Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.settings.frame_rate.max(1) as f64);
        let per_frame = self.instructions_per_frame();
        let rom_stem: String = self
            .settings
            .rom
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown ROM".to_string());

        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let mut shown_waiting = None;
        'mainloop: loop {
            let frame_start = Instant::now();

            let mut repaint = false;
            while event::poll(Duration::ZERO)? {
                match self.handle_event(event::read()?)? {
                    Control::Continue => {}
                    Control::Repaint => repaint = true,
                    Control::Quit => {
                        terminal.clear()?;
                        break 'mainloop;
                    }
                }
            }

            self.state.tick_timers();
            let batch = self.run_batch(per_frame)?;
            let waiting = batch.waiting;

            // Only CLS and DRW change the picture.
            if batch.redraw || repaint || shown_waiting != Some(waiting) {
                terminal.draw(|frame| {
                    let area = frame.area();
                    self.draw(frame, area, &rom_stem, waiting);
                })?;
                shown_waiting = Some(waiting);
            }
            // Terminals rarely report key releases, so a press lasts one frame.
            self.state.keypad.release_all();

            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
        Ok(())
    }
}

/// QWERTY layout onto the hex keypad.
fn map_key(code: KeyCode) -> Option<Key> {
    let KeyCode::Char(c) = code else {
        return None;
    };
    let key = match c.to_ascii_lowercase() {
        '1' => Key::Key1,
        '2' => Key::Key2,
        '3' => Key::Key3,
        '4' => Key::KeyC,
        'q' => Key::Key4,
        'w' => Key::Key5,
        'e' => Key::Key6,
        'r' => Key::KeyD,
        'a' => Key::Key7,
        's' => Key::Key8,
        'd' => Key::Key9,
        'f' => Key::KeyE,
        'z' => Key::KeyA,
        'x' => Key::Key0,
        'c' => Key::KeyB,
        'v' => Key::KeyF,
        _ => return None,
    };
    Some(key)
}
