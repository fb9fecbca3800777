//! Draws the simulation into the terminal back buffer
//!
//! The canvas is projected onto the cells between one HUD row at the top and
//! two at the bottom. Fires are filled ellipses shaded with the same heat
//! palette as the doom-fire effect.

use super::fire::{Fire, FireKind};
use super::particles::{Particle, ParticleKind};
use super::{Simulation, Vec2};
use crate::input::InputState;
use crate::terminal::Terminal;
use crossterm::style::Color;
use rand::Rng;

const FIRE_CHARS: [char; 10] = [' ', '.', ':', ';', '*', 'o', 'O', '#', '@', '%'];
const TOP_ROWS: u16 = 1;
const BOTTOM_ROWS: u16 = 2;
const WATER_BAR: usize = 10;
pub const WIN_MESSAGE: &str = "All fires extinguished! You win!";

/// Serial link state as shown to the player
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Link<'a> {
    Connected(&'a str),
    Disconnected,
    /// Started with `--no-serial`
    Off,
}

/// Frame-loop state the HUD shows alongside the simulation
#[derive(Clone, Copy, Debug)]
pub struct Hud<'a> {
    pub input: InputState,
    pub link: Link<'a>,
    pub banner: Option<&'a str>,
    pub paused: bool,
}

/// Canvas to cell projection for the current terminal size
struct Viewport {
    sx: f32,
    sy: f32,
    cols: u16,
    rows: u16,
}

impl Viewport {
    fn new(term: &Terminal, width: f32, height: f32) -> Self {
        let (cols, h) = term.size();
        let rows = h.saturating_sub(TOP_ROWS + BOTTOM_ROWS).max(1);
        Self {
            sx: cols as f32 / width,
            sy: rows as f32 / height,
            cols,
            rows,
        }
    }

    fn cell(&self, p: Vec2) -> (i32, i32) {
        (
            (p.x * self.sx).floor() as i32,
            (p.y * self.sy).floor() as i32 + TOP_ROWS as i32,
        )
    }

    fn inside(&self, (x, y): (i32, i32)) -> bool {
        x >= 0 && x < self.cols as i32 && y >= TOP_ROWS as i32 && y < (TOP_ROWS + self.rows) as i32
    }
}

pub fn draw<R: Rng>(term: &mut Terminal, sim: &Simulation<R>, hud: &Hud) {
    term.clear();
    let view = Viewport::new(term, sim.cfg.width, sim.cfg.height);

    // Scorched patches underneath everything else
    for fire in sim.fires.iter().filter(|f| !f.is_burning()) {
        fill_ellipse(term, &view, fire.pos, fire.size / 2.0, |_| Some(('▒', Color::DarkGrey)));
    }
    for fire in sim.fires.iter().filter(|f| f.is_burning()) {
        draw_fire(term, &view, fire, sim.frames);
    }
    for puff in &sim.effects.smoke {
        fill_ellipse(term, &view, puff.pos, puff.size * 0.3, |_| Some(('░', Color::Grey)));
    }
    for p in &sim.effects.particles {
        draw_particle(term, &view, p);
    }

    let (px, py) = view.cell(sim.player);
    term.set(px, py, '●', Some(Color::Blue), true);

    draw_hud(term, sim, hud);

    let mid = TOP_ROWS as i32 + view.rows as i32 / 2;
    if let Some(text) = hud.banner {
        centered(term, mid - 3, &format!("~ {text} ~"), Color::Cyan);
    }
    if sim.is_won() {
        centered(term, mid, WIN_MESSAGE, Color::Green);
        centered(term, mid + 1, "press r to play again", Color::Grey);
    } else if hud.paused {
        centered(term, mid, "PAUSED", Color::White);
    }
}

fn draw_fire(term: &mut Terminal, view: &Viewport, fire: &Fire, frame: u64) {
    let flicker = (frame / 6) as i32;
    let (cx, cy) = view.cell(fire.pos);
    fill_ellipse(term, view, fire.pos, fire.size / 2.0, |(x, y, d)| {
        let jitter = ((x - cx) * 7 + (y - cy) * 13 + flicker).rem_euclid(3) as f32 * 0.08;
        let heat = (1.0 - d + jitter).clamp(0.0, 1.0);
        let idx = 1 + (heat * (FIRE_CHARS.len() - 2) as f32).round() as usize;
        let color = if d < 0.35 {
            Color::Yellow
        } else if d < 0.7 {
            Color::Red
        } else {
            Color::DarkRed
        };
        Some((FIRE_CHARS[idx.min(FIRE_CHARS.len() - 1)], color))
    });
    if fire.kind == FireKind::Large {
        term.set(cx, cy, '@', Some(Color::White), true);
    }
}

fn draw_particle(term: &mut Terminal, view: &Viewport, p: &Particle) {
    let (ch, color) = match p.kind {
        ParticleKind::WaterLight => ('│', Color::Blue),
        ParticleKind::WaterHeavy => ('┃', Color::Cyan),
        ParticleKind::Breeze => ('~', Color::White),
        ParticleKind::Smoke => ('░', Color::Grey),
        ParticleKind::Rain => ('/', Color::DarkCyan),
    };
    let cell = view.cell(p.pos);
    if view.inside(cell) {
        term.set(cell.0, cell.1, ch, Some(color), false);
    }
}

/// Fill the cells covered by a circle of canvas radius `r`. The shader gets
/// the cell and its normalised distance from the centre.
fn fill_ellipse<F>(term: &mut Terminal, view: &Viewport, center: Vec2, r: f32, shade: F)
where
    F: Fn((i32, i32, f32)) -> Option<(char, Color)>,
{
    let rx = (r * view.sx).max(0.5);
    let ry = (r * view.sy).max(0.5);
    let (cx, cy) = view.cell(center);
    let (ix, iy) = (rx.ceil() as i32, ry.ceil() as i32);

    for y in cy - iy..=cy + iy {
        for x in cx - ix..=cx + ix {
            if !view.inside((x, y)) {
                continue;
            }
            let dx = (x - cx) as f32 / rx;
            let dy = (y - cy) as f32 / ry;
            let d = (dx * dx + dy * dy).sqrt();
            if d > 1.0 {
                continue;
            }
            if let Some((ch, color)) = shade((x, y, d)) {
                term.set(x, y, ch, Some(color), false);
            }
        }
    }
}

fn draw_hud<R: Rng>(term: &mut Terminal, sim: &Simulation<R>, hud: &Hud) {
    let (cols, rows) = term.size();

    term.set_str(0, 0, &format!("Fires left: {}", sim.active_fires()), Some(Color::White), true);
    let right = format!(
        "Weather: {}  moisture {:.2}  water [{}]",
        sim.weather.kind.name(),
        sim.weather.fuel_moisture,
        water_bar(sim.weather.water_level),
    );
    term.set_str(cols as i32 - right.chars().count() as i32, 0, &right, Some(Color::Cyan), false);

    let status_row = rows as i32 - 2;
    let input = hud.input;
    let readout = format!("micro:bit → P0:{} P1:{} S:{:.0}", input.p0, input.p1, input.s);
    term.set_str(0, status_row, &readout, Some(Color::White), false);

    let (link, color) = match hud.link {
        Link::Connected(name) => (format!("serial: {name}"), Color::Green),
        Link::Disconnected => ("serial: disconnected".to_string(), Color::Red),
        Link::Off => ("serial: off (keyboard)".to_string(), Color::DarkGrey),
    };
    term.set_str(cols as i32 - link.chars().count() as i32, status_row, &link, Some(color), false);

    term.set_str(
        0,
        rows as i32 - 1,
        "z/x pins  s blow  arrows move  space pause  r restart  h help  q quit",
        Some(Color::DarkGrey),
        false,
    );
}

fn water_bar(level: f32) -> String {
    let filled = ((level.clamp(0.0, 1.0) * WATER_BAR as f32).round() as usize).min(WATER_BAR);
    format!("{}{}", "#".repeat(filled), "-".repeat(WATER_BAR - filled))
}

fn centered(term: &mut Terminal, y: i32, text: &str, color: Color) {
    let (cols, _) = term.size();
    let x = (cols as i32 - text.chars().count() as i32) / 2;
    term.set_str(x, y, text, Some(color), true);
}
