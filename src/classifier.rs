//! External classifier feed
//!
//! A separate process runs the keyword-spotting and colour-tracking models and
//! writes one JSON prediction per line to a file or FIFO. A reader thread
//! follows that stream and publishes the newest keyword and blob predictions
//! into mailboxes the frame loop drains once per frame.

use crate::game::weather::WeatherKind;
use crate::mailbox::Mailbox;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Minimum confidence for a keyword to count
pub const CONF_THRESHOLD: f32 = 0.85;
/// A keyword must persist this long before it fires
pub const HOLD_MS: u64 = 400;

const BLOB_MIN_CONFIDENCE: f32 = 0.6;
const BLOB_ALPHA: f32 = 0.3;
/// Half-width of the centred region that means "stay put"
const BLOB_DEAD_ZONE: f32 = 0.15;
/// Stop steering when the tracker has been quiet this long
const BLOB_STALE_MS: u64 = 1000;
const RETRY_DELAY: Duration = Duration::from_millis(100);
const REOPEN_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Prediction {
    Keyword { label: String, confidence: f32 },
    /// Normalised centroid of the tracked colour blob
    Blob { x: f32, y: f32, confidence: f32 },
    Error { message: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Keyword {
    pub label: String,
    pub confidence: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Blob {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// Weather for a recognised command word
pub fn keyword_weather(label: &str) -> Option<WeatherKind> {
    match label {
        "drizzle" => Some(WeatherKind::Drizzle),
        "rain" => Some(WeatherKind::Rain),
        "flood" => Some(WeatherKind::Flood),
        "drought" => Some(WeatherKind::Drought),
        "stop" | "neutral" | "background" => Some(WeatherKind::None),
        _ => None,
    }
}

/// Turns a noisy label stream into discrete weather commands.
#[derive(Default)]
pub struct KeywordDebouncer {
    last_stable: Option<String>,
    stable_since: u64,
}

impl KeywordDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one prediction. Returns a weather change when the same confident
    /// label has held for the hold window.
    pub fn observe(&mut self, label: &str, confidence: f32, now_ms: u64) -> Option<WeatherKind> {
        if confidence < CONF_THRESHOLD {
            return None;
        }
        let label = label.to_lowercase();
        if label.contains("neutral") || label.contains("background") {
            return None;
        }

        if self.last_stable.as_deref() != Some(label.as_str()) {
            self.last_stable = Some(label);
            self.stable_since = now_ms;
            return None;
        }

        if now_ms.saturating_sub(self.stable_since) >= HOLD_MS {
            tracing::info!(label = %label, "keyword command");
            self.last_stable = None;
            self.stable_since = now_ms;
            return keyword_weather(&label);
        }
        None
    }
}

/// Smooths the tracked centroid and turns it into a movement direction
#[derive(Default)]
pub struct BlobSteering {
    ema: Option<(f32, f32)>,
    last_seen: u64,
}

impl BlobSteering {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, blob: Blob, now_ms: u64) {
        if blob.confidence < BLOB_MIN_CONFIDENCE {
            return;
        }
        let (x, y) = (blob.x.clamp(0.0, 1.0), blob.y.clamp(0.0, 1.0));
        self.ema = Some(match self.ema {
            Some((ex, ey)) => (
                ex + BLOB_ALPHA * (x - ex),
                ey + BLOB_ALPHA * (y - ey),
            ),
            None => (x, y),
        });
        self.last_seen = now_ms;
    }

    #[cfg(test)]
    fn centroid(&self) -> Option<(f32, f32)> {
        self.ema
    }

    /// Direction per axis in {-1, 0, 1}; zero when idle or stale
    pub fn direction(&self, now_ms: u64) -> (i8, i8) {
        match self.ema {
            Some((x, y)) if now_ms.saturating_sub(self.last_seen) <= BLOB_STALE_MS => {
                (axis(x), axis(y))
            }
            _ => (0, 0),
        }
    }
}

fn axis(v: f32) -> i8 {
    if v < 0.5 - BLOB_DEAD_ZONE {
        -1
    } else if v > 0.5 + BLOB_DEAD_ZONE {
        1
    } else {
        0
    }
}

/// Decode one feed line
pub fn parse_prediction(line: &str) -> serde_json::Result<Prediction> {
    serde_json::from_str(line)
}

/// Background reader for the prediction stream
pub struct PredictionFeed {
    pub keywords: Mailbox<Keyword>,
    pub blobs: Mailbox<Blob>,
    running: Arc<AtomicBool>,
}

impl PredictionFeed {
    /// Start following `path`. The thread is not joined on drop: opening a
    /// FIFO blocks until a writer appears, so it is only told to stop.
    pub fn spawn(path: PathBuf) -> Self {
        let keywords = Mailbox::new();
        let blobs = Mailbox::new();
        let running = Arc::new(AtomicBool::new(true));

        let (kw, bl, run) = (keywords.clone(), blobs.clone(), Arc::clone(&running));
        std::thread::spawn(move || {
            let mut tail = FeedTail::default();
            while run.load(Ordering::Relaxed) {
                match tail.open(&path) {
                    Ok(mut reader) => {
                        while run.load(Ordering::Relaxed) {
                            if let Err(e) = tail.drain(&mut reader, &kw, &bl) {
                                tracing::warn!("prediction feed read failed: {e}");
                                break;
                            }
                            std::thread::sleep(RETRY_DELAY);
                        }
                    }
                    Err(e) => tracing::warn!(path = %path.display(), "cannot open predictions: {e}"),
                }
                std::thread::sleep(REOPEN_DELAY);
            }
        });

        Self { keywords, blobs, running }
    }

    /// A feed with no reader behind it
    #[cfg(test)]
    pub fn detached() -> Self {
        Self {
            keywords: Mailbox::new(),
            blobs: Mailbox::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Drop for PredictionFeed {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Read position in the prediction stream, kept across reopens so a regular
/// file is never replayed from the start.
#[derive(Default)]
struct FeedTail {
    /// Bytes of complete lines already dispatched
    offset: u64,
    /// Start of a line whose newline has not arrived yet
    pending: Vec<u8>,
}

impl FeedTail {
    /// Open the source, resuming regular files at the saved offset. A file
    /// shorter than the offset was truncated and is read from the top.
    fn open(&mut self, path: &Path) -> io::Result<BufReader<File>> {
        let mut file = File::open(path)?;
        self.pending.clear();
        let meta = file.metadata()?;
        if meta.is_file() {
            if meta.len() < self.offset {
                self.offset = 0;
            }
            file.seek(SeekFrom::Start(self.offset))?;
        }
        Ok(BufReader::new(file))
    }

    /// Dispatch every complete line currently available. Returns at EOF with
    /// any partial line held back for the next call.
    fn drain<R: BufRead>(
        &mut self,
        reader: &mut R,
        keywords: &Mailbox<Keyword>,
        blobs: &Mailbox<Blob>,
    ) -> io::Result<()> {
        loop {
            if reader.read_until(b'\n', &mut self.pending)? == 0 {
                return Ok(());
            }
            if self.pending.last() != Some(&b'\n') {
                continue;
            }
            self.offset += self.pending.len() as u64;
            let line = String::from_utf8_lossy(&self.pending);
            dispatch(line.trim(), keywords, blobs);
            self.pending.clear();
        }
    }
}

fn dispatch(line: &str, keywords: &Mailbox<Keyword>, blobs: &Mailbox<Blob>) {
    if line.is_empty() {
        return;
    }
    match parse_prediction(line) {
        Ok(Prediction::Keyword { label, confidence }) => {
            tracing::trace!(label = %label, confidence, "heard");
            keywords.publish(Keyword { label, confidence });
        }
        Ok(Prediction::Blob { x, y, confidence }) => blobs.publish(Blob { x, y, confidence }),
        Ok(Prediction::Error { message }) => tracing::warn!("classifier error: {message}"),
        Err(e) => tracing::debug!(line, "bad prediction: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn low_confidence_never_fires() {
        let mut d = KeywordDebouncer::new();
        for t in (0..2000).step_by(100) {
            assert_eq!(d.observe("rain", 0.5, t), None);
        }
    }

    #[test]
    fn held_label_fires_once() {
        let mut d = KeywordDebouncer::new();
        let fired: Vec<_> = (0..=500)
            .step_by(100)
            .filter_map(|t| d.observe("Rain", 0.9, t))
            .collect();
        assert_eq!(fired, vec![WeatherKind::Rain]);
    }

    #[test]
    fn no_refire_within_hold_window() {
        let mut d = KeywordDebouncer::new();
        assert_eq!(d.observe("flood", 0.9, 0), None);
        assert_eq!(d.observe("flood", 0.9, 500), Some(WeatherKind::Flood));
        assert_eq!(d.observe("flood", 0.9, 600), None);
        assert_eq!(d.observe("flood", 0.9, 900), None);
        assert_eq!(d.observe("flood", 0.9, 1000), Some(WeatherKind::Flood));
    }

    #[test]
    fn label_change_restarts_hold() {
        let mut d = KeywordDebouncer::new();
        d.observe("rain", 0.95, 0);
        assert_eq!(d.observe("drought", 0.95, 300), None);
        assert_eq!(d.observe("drought", 0.95, 600), None);
        assert_eq!(d.observe("drought", 0.95, 700), Some(WeatherKind::Drought));
    }

    #[test]
    fn background_is_ignored_and_stop_clears() {
        let mut d = KeywordDebouncer::new();
        assert_eq!(d.observe("stop", 0.9, 0), None);
        assert_eq!(d.observe("Background Noise", 0.99, 200), None);
        assert_eq!(d.observe("stop", 0.9, 450), Some(WeatherKind::None));
    }

    #[test]
    fn unknown_label_resets_without_command() {
        let mut d = KeywordDebouncer::new();
        d.observe("hello", 0.9, 0);
        assert_eq!(d.observe("hello", 0.9, 400), None);
        assert_eq!(d.observe("rain", 0.9, 410), None);
    }

    #[test]
    fn parses_feed_lines() {
        assert_eq!(
            parse_prediction(r#"{"kind":"keyword","label":"rain","confidence":0.93}"#).unwrap(),
            Prediction::Keyword { label: "rain".into(), confidence: 0.93 }
        );
        assert_eq!(
            parse_prediction(r#"{"kind":"blob","x":0.2,"y":0.8,"confidence":0.7}"#).unwrap(),
            Prediction::Blob { x: 0.2, y: 0.8, confidence: 0.7 }
        );
        assert!(parse_prediction(r#"{"kind":"error","message":"mic busy"}"#).is_ok());
        assert!(parse_prediction("rain 0.9").is_err());
    }

    #[test]
    fn dispatch_publishes_latest_per_channel() {
        let data = concat!(
            "{\"kind\":\"keyword\",\"label\":\"rain\",\"confidence\":0.9}\n",
            "garbage\n",
            "{\"kind\":\"blob\",\"x\":0.1,\"y\":0.5,\"confidence\":0.9}\n",
            "{\"kind\":\"keyword\",\"label\":\"flood\",\"confidence\":0.88}\n",
        );
        let keywords = Mailbox::new();
        let blobs = Mailbox::new();
        for line in data.lines() {
            dispatch(line, &keywords, &blobs);
        }
        assert_eq!(keywords.take().map(|k| k.label), Some("flood".to_string()));
        assert_eq!(blobs.take().map(|b| b.x), Some(0.1));
    }

    const RAIN: &str = "{\"kind\":\"keyword\",\"label\":\"rain\",\"confidence\":0.9}\n";
    const FLOOD: &str = "{\"kind\":\"keyword\",\"label\":\"flood\",\"confidence\":0.9}\n";
    const BLOB: &str = "{\"kind\":\"blob\",\"x\":0.9,\"y\":0.5,\"confidence\":0.9}\n";

    #[test]
    fn invalid_utf8_line_is_skipped_not_fatal() {
        let mut data = RAIN.as_bytes().to_vec();
        data.extend_from_slice(&[0xff, 0xfe, b'\n']);
        data.extend_from_slice(BLOB.as_bytes());
        let len = data.len() as u64;

        let (keywords, blobs) = (Mailbox::new(), Mailbox::new());
        let mut tail = FeedTail::default();
        let mut reader = Cursor::new(data);
        tail.drain(&mut reader, &keywords, &blobs).unwrap();

        assert_eq!(keywords.take().map(|k| k.label), Some("rain".to_string()));
        assert_eq!(blobs.take().map(|b| b.x), Some(0.9));
        assert_eq!(tail.offset, len);

        // nothing new at EOF, nothing replayed
        tail.drain(&mut reader, &keywords, &blobs).unwrap();
        assert!(keywords.take().is_none());
        assert!(blobs.take().is_none());
    }

    #[test]
    fn partial_line_waits_for_its_newline() {
        let (keywords, blobs) = (Mailbox::new(), Mailbox::new());
        let mut tail = FeedTail::default();
        let (head, rest) = FLOOD.split_at(20);

        tail.drain(&mut Cursor::new(head.as_bytes()), &keywords, &blobs).unwrap();
        assert!(keywords.take().is_none());
        assert_eq!(tail.offset, 0);

        tail.drain(&mut Cursor::new(rest.as_bytes()), &keywords, &blobs).unwrap();
        assert_eq!(keywords.take().map(|k| k.label), Some("flood".to_string()));
        assert_eq!(tail.offset, FLOOD.len() as u64);
    }

    #[test]
    fn reopen_resumes_after_dispatched_lines() {
        let path = std::env::temp_dir().join(format!("termfire-feed-{}.jsonl", std::process::id()));
        std::fs::write(&path, RAIN).unwrap();

        let (keywords, blobs) = (Mailbox::new(), Mailbox::new());
        let mut tail = FeedTail::default();
        let mut reader = tail.open(&path).unwrap();
        tail.drain(&mut reader, &keywords, &blobs).unwrap();
        assert_eq!(keywords.take().map(|k| k.label), Some("rain".to_string()));

        let mut content = RAIN.to_string();
        content.push_str(BLOB);
        std::fs::write(&path, &content).unwrap();
        let mut reader = tail.open(&path).unwrap();
        tail.drain(&mut reader, &keywords, &blobs).unwrap();
        assert!(keywords.take().is_none());
        assert!(blobs.take().is_some());

        // truncated file starts over
        std::fs::write(&path, FLOOD).unwrap();
        let mut reader = tail.open(&path).unwrap();
        tail.drain(&mut reader, &keywords, &blobs).unwrap();
        assert_eq!(keywords.take().map(|k| k.label), Some("flood".to_string()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn blob_steering_uses_dead_zone_and_ema() {
        let mut s = BlobSteering::new();
        assert_eq!(s.direction(0), (0, 0));

        s.observe(Blob { x: 0.5, y: 0.5, confidence: 0.9 }, 0);
        assert_eq!(s.direction(0), (0, 0));

        // low confidence ignored
        s.observe(Blob { x: 0.0, y: 0.0, confidence: 0.2 }, 10);
        assert_eq!(s.centroid(), Some((0.5, 0.5)));

        for t in 1..10 {
            s.observe(Blob { x: 1.0, y: 0.5, confidence: 0.9 }, t * 10);
        }
        assert_eq!(s.direction(100), (1, 0));
        assert_eq!(s.direction(100 + BLOB_STALE_MS + 1), (0, 0));
    }
}
