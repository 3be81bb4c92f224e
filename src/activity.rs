use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::Mutex;

const MAX_LOG_LINES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Info,
    Http,
    Export,
    Error,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub text: String,
    pub kind: Kind,
}

static ACTIVITY_LOG: Lazy<Mutex<VecDeque<Entry>>> =
    Lazy::new(|| Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES)));

pub fn log<T: Into<String>>(line: T) {
    log_with(Kind::Info, line);
}

/// Records a status line and mirrors it to the tracing subscriber.
pub fn log_with<T: Into<String>>(kind: Kind, line: T) {
    let text = line.into();
    match kind {
        Kind::Error => tracing::error!(target: "activity", "{}", text),
        Kind::Http | Kind::Export | Kind::Info => tracing::info!(target: "activity", kind = ?kind, "{}", text),
    }
    if let Ok(mut buf) = ACTIVITY_LOG.lock() {
        if buf.len() >= MAX_LOG_LINES {
            buf.pop_front();
        }
        buf.push_back(Entry { text, kind });
    }
}

pub fn recent(n: usize) -> Vec<Entry> {
    if let Ok(buf) = ACTIVITY_LOG.lock() {
        let len = buf.len();
        let take = n.min(len);
        buf.iter().skip(len - take).cloned().collect()
    } else {
        Vec::new()
    }
}

pub fn latest() -> Option<Entry> {
    recent(1).pop()
}

#[cfg(test)]
mod tests {
    use super::*;

    // The ring is process-wide, so tests only look at entries they wrote.
    #[test]
    fn keeps_the_most_recent_lines() {
        for i in 0..MAX_LOG_LINES + 5 {
            log_with(Kind::Http, format!("ring-test {}", i));
        }
        let entries: Vec<Entry> = recent(MAX_LOG_LINES)
            .into_iter()
            .filter(|e| e.text.starts_with("ring-test"))
            .collect();
        assert!(entries.len() <= MAX_LOG_LINES);
        assert!(entries.iter().all(|e| e.text != "ring-test 0"));
        assert!(entries.iter().any(|e| e.text == format!("ring-test {}", MAX_LOG_LINES + 4)));
    }

    #[test]
    fn recent_never_exceeds_request() {
        log("one");
        log("two");
        assert!(recent(1).len() <= 1);
        assert!(latest().is_some());
    }
}
