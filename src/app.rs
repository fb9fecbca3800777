//! The frame loop: gather input, advance the simulation, draw

use crate::classifier::{BlobSteering, KeywordDebouncer, PredictionFeed};
use crate::config::GameConfig;
use crate::error::Result;
use crate::game::render::{self, Hud, Link};
use crate::game::weather::WeatherKind;
use crate::game::Simulation;
use crate::help::render_help_overlay;
use crate::input::keyboard::SimKey;
use crate::input::mic::MicProxy;
use crate::input::serial::SerialLink;
use crate::input::InputSources;
use crate::terminal::Terminal;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rand::Rng;
use serde::Serialize;
use std::time::Instant;

/// How long a weather banner stays up
const BANNER_MS: u64 = 1100;

/// End-of-session report, printed as JSON with `--summary`
#[derive(Debug, Serialize)]
pub struct GameSummary {
    pub seed: u64,
    pub frames: u64,
    pub extinguished: u32,
    pub active_fires: usize,
    pub scorched: usize,
    pub won: bool,
    pub weather: WeatherKind,
}

impl GameSummary {
    fn from_sim<R: Rng>(sim: &Simulation<R>, seed: u64) -> Self {
        Self {
            seed,
            frames: sim.frames,
            extinguished: sim.extinguished,
            active_fires: sim.active_fires(),
            scorched: sim.scorched(),
            won: sim.is_won(),
            weather: sim.weather.kind,
        }
    }
}

/// Per-session state owned by the frame loop
#[derive(Default)]
struct Session {
    sources: InputSources,
    debouncer: KeywordDebouncer,
    steering: BlobSteering,
    paused: bool,
    show_help: bool,
    quit: bool,
    banner: Option<(WeatherKind, u64)>,
}

impl Session {
    fn handle_event<R: Rng>(&mut self, event: Event, sim: &mut Simulation<R>, now_ms: u64) {
        match event {
            Event::Key(key) => self.handle_key(key, sim, now_ms),
            // Release events never arrive once focus is gone
            Event::FocusLost => self.sources.keyboard.release_all(),
            _ => {}
        }
    }

    fn handle_key<R: Rng>(&mut self, key: KeyEvent, sim: &mut Simulation<R>, now_ms: u64) {
        if let Some(sim_key) = SimKey::from_code(key.code) {
            match key.kind {
                KeyEventKind::Release => self.sources.keyboard.release(sim_key),
                _ => self.sources.keyboard.press(sim_key, now_ms),
            }
            return;
        }
        if key.kind == KeyEventKind::Release {
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
            KeyCode::Char(' ') if key.kind == KeyEventKind::Press => self.paused = !self.paused,
            KeyCode::Char('r') | KeyCode::Char('R') => {
                tracing::info!("restart");
                sim.reset();
            }
            KeyCode::Char('h') | KeyCode::Char('?') if key.kind == KeyEventKind::Press => {
                self.show_help = !self.show_help;
            }
            KeyCode::Left => sim.step_player(-1, 0),
            KeyCode::Right => sim.step_player(1, 0),
            KeyCode::Up => sim.step_player(0, -1),
            KeyCode::Down => sim.step_player(0, 1),
            _ => {}
        }
    }

    /// Drain the classifier mailboxes
    fn poll_feed<R: Rng>(&mut self, feed: &PredictionFeed, sim: &mut Simulation<R>, now_ms: u64) {
        if let Some(kw) = feed.keywords.take() {
            if let Some(kind) = self.debouncer.observe(&kw.label, kw.confidence, now_ms) {
                self.set_weather(kind, sim, now_ms);
            }
        }
        if let Some(blob) = feed.blobs.take() {
            self.steering.observe(blob, now_ms);
        }
    }

    fn set_weather<R: Rng>(&mut self, kind: WeatherKind, sim: &mut Simulation<R>, now_ms: u64) {
        sim.weather.set(kind);
        self.banner = Some((kind, now_ms + BANNER_MS));
        tracing::info!(weather = kind.name(), water = sim.weather.water_level, "weather changed");
    }

    fn banner(&self, now_ms: u64) -> Option<&'static str> {
        self.banner
            .filter(|&(_, until)| now_ms < until)
            .map(|(kind, _)| kind.banner())
    }
}

/// Play until the user quits
pub fn run(config: GameConfig) -> Result<GameSummary> {
    config.validate()?;
    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, tick_speed = config.sim.fire_tick_speed, "starting game");
    let mut sim = Simulation::new(config.sim.clone(), seed);

    let serial = if config.serial {
        match SerialLink::connect(config.port.as_deref(), config.baud) {
            Ok(link) => Some(link),
            Err(e) => {
                tracing::warn!("serial unavailable, keyboard only: {e}");
                None
            }
        }
    } else {
        None
    };

    let mic = if config.mic {
        MicProxy::start(config.mic_gain)
            .map_err(|e| tracing::warn!("microphone unavailable: {e}"))
            .ok()
    } else {
        None
    };

    let feed = config.predictions.clone().map(PredictionFeed::spawn);

    let mut term = Terminal::new()?;
    let mut session = Session::default();
    let start = Instant::now();
    let frame_time = config.frame_time();
    let mut was_connected = serial.is_some();
    let mut was_won = false;

    while !session.quit {
        let frame_start = Instant::now();
        let now_ms = start.elapsed().as_millis() as u64;

        while let Some(event) = term.poll_event()? {
            if let Event::Resize(w, h) = event {
                term.resize(w, h);
                term.clear_screen()?;
                continue;
            }
            session.handle_event(event, &mut sim, now_ms);
        }
        if session.quit {
            break;
        }

        if !term.keyboard_enhanced() {
            session.sources.keyboard.expire(now_ms, config.key_hold_ms);
        }

        if let Some(link) = &serial {
            if let Some(t) = link.take() {
                session.sources.serial = Some(t);
            }
            let connected = link.is_connected();
            if !connected {
                session.sources.clear_serial();
            }
            if was_connected && !connected {
                tracing::warn!(port = link.name(), "serial link lost");
            }
            was_connected = connected;
        }

        session.sources.proxy_s = mic.as_ref().map(MicProxy::level);

        if let Some(feed) = &feed {
            session.poll_feed(feed, &mut sim, now_ms);
        }

        let input = session.sources.current();
        if !session.paused {
            let (dx, dy) = session.steering.direction(now_ms);
            sim.steer(dx, dy);
            sim.step(&input);
        }

        let won = sim.is_won();
        if won && !was_won {
            tracing::info!(frames = sim.frames, extinguished = sim.extinguished, "all fires out");
        }
        was_won = won;

        let link = match &serial {
            _ if !config.serial => Link::Off,
            Some(l) if l.is_connected() => Link::Connected(l.name()),
            _ => Link::Disconnected,
        };
        let hud = Hud {
            input,
            link,
            banner: session.banner(now_ms),
            paused: session.paused,
        };
        render::draw(&mut term, &sim, &hud);
        if session.show_help {
            render_help_overlay(&mut term);
        }
        term.present()?;

        let elapsed = frame_start.elapsed().as_secs_f32();
        term.sleep(frame_time - elapsed);
    }

    let summary = GameSummary::from_sim(&sim, seed);
    tracing::info!(
        extinguished = summary.extinguished,
        active = summary.active_fires,
        scorched = summary.scorched,
        "session ended"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Blob, Keyword};
    use crate::config::SimConfig;
    use crate::game::Vec2;
    use crossterm::event::KeyEventState;
    use rand::rngs::mock::StepRng;

    fn sim() -> Simulation<StepRng> {
        Simulation::with_rng(SimConfig::default(), StepRng::new(0, 0))
    }

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        key(code, KeyEventKind::Press)
    }

    #[test]
    fn pin_keys_hold_until_release() {
        let mut s = Session::default();
        let mut sim = sim();
        s.handle_key(press(KeyCode::Char('z')), &mut sim, 0);
        s.handle_key(press(KeyCode::Char('x')), &mut sim, 0);
        let input = s.sources.current();
        assert!(input.p0() && input.p1());

        s.handle_key(key(KeyCode::Char('z'), KeyEventKind::Release), &mut sim, 10);
        let input = s.sources.current();
        assert!(!input.p0() && input.p1());
    }

    #[test]
    fn focus_loss_releases_keys() {
        let mut s = Session::default();
        let mut sim = sim();
        s.handle_key(press(KeyCode::Char('s')), &mut sim, 0);
        assert!(s.sources.current().blowing());
        s.handle_event(Event::FocusLost, &mut sim, 5);
        assert!(!s.sources.current().blowing());
    }

    #[test]
    fn control_keys() {
        let mut s = Session::default();
        let mut sim = sim();

        s.handle_key(press(KeyCode::Char(' ')), &mut sim, 0);
        assert!(s.paused);
        // auto-repeat does not toggle again
        s.handle_key(key(KeyCode::Char(' '), KeyEventKind::Repeat), &mut sim, 10);
        assert!(s.paused);
        s.handle_key(press(KeyCode::Char(' ')), &mut sim, 20);
        assert!(!s.paused);

        s.handle_key(press(KeyCode::Char('h')), &mut sim, 0);
        assert!(s.show_help);

        assert!(!s.quit);
        s.handle_key(press(KeyCode::Esc), &mut sim, 0);
        assert!(s.quit);

        let mut s = Session::default();
        let ctrl_c = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..press(KeyCode::Char('c'))
        };
        s.handle_key(ctrl_c, &mut sim, 0);
        assert!(s.quit);
    }

    #[test]
    fn arrows_move_the_player() {
        let mut s = Session::default();
        let mut sim = sim();
        let start = sim.player;
        s.handle_key(press(KeyCode::Right), &mut sim, 0);
        s.handle_key(key(KeyCode::Down, KeyEventKind::Repeat), &mut sim, 0);
        assert_eq!(sim.player, start + Vec2::new(15.0, 15.0));
        // releases are ignored
        s.handle_key(key(KeyCode::Left, KeyEventKind::Release), &mut sim, 0);
        assert_eq!(sim.player, start + Vec2::new(15.0, 15.0));
    }

    #[test]
    fn restart_repopulates() {
        let mut s = Session::default();
        let mut sim = sim();
        assert!(sim.fires.is_empty());
        s.handle_key(press(KeyCode::Char('r')), &mut sim, 0);
        assert!(sim.fires.len() >= 6);
    }

    #[test]
    fn held_keyword_sets_weather_and_banner() {
        let mut s = Session::default();
        let mut sim = sim();
        let feed = PredictionFeed::detached();

        for t in [0, 200, 400] {
            feed.keywords.publish(Keyword { label: "rain".into(), confidence: 0.9 });
            s.poll_feed(&feed, &mut sim, t);
        }
        assert_eq!(sim.weather.kind, WeatherKind::Rain);
        assert_eq!(s.banner(400), Some("Raining"));
        assert_eq!(s.banner(400 + BANNER_MS), None);

        feed.blobs.publish(Blob { x: 0.0, y: 1.0, confidence: 0.9 });
        s.poll_feed(&feed, &mut sim, 500);
        assert_eq!(s.steering.direction(500), (-1, 1));
    }

    #[test]
    fn summary_reflects_the_field() {
        let mut sim = sim();
        sim.populate();
        sim.extinguished = 3;
        let summary = GameSummary::from_sim(&sim, 42);
        assert_eq!(summary.active_fires, sim.fires.len());
        assert!(!summary.won);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["seed"], 42);
        assert_eq!(json["extinguished"], 3);
        assert_eq!(json["weather"], "none");
    }
}
