//! Transient, non-blocking user notices.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_NOTICES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
    /// Server answered 429.
    RateLimited,
    /// Session expired; the host should route to its login boundary.
    LoginRequired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct Notices {
    queue: VecDeque<Notice>,
    ttl: Duration,
    next_id: u64,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(Duration::from_millis(4000))
    }
}

impl Notices {
    pub fn new(ttl: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            ttl,
            next_id: 1,
        }
    }

    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        self.push_at(kind, message, Instant::now())
    }

    pub fn push_at(&mut self, kind: NoticeKind, message: impl Into<String>, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push_back(Notice {
            id,
            kind,
            message: message.into(),
            expires_at: now + self.ttl,
        });
        while self.queue.len() > MAX_NOTICES {
            self.queue.pop_front();
        }
        id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.queue.retain(|notice| notice.id != id);
    }

    /// Drop notices whose TTL has passed. Returns how many were removed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.queue.len();
        self.queue.retain(|notice| notice.expires_at > now);
        before - self.queue.len()
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.queue.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_expire_after_ttl() {
        let start = Instant::now();
        let mut notices = Notices::new(Duration::from_millis(100));
        notices.push_at(NoticeKind::Error, "Delete failed", start);
        notices.push_at(
            NoticeKind::RateLimited,
            "Too many requests",
            start + Duration::from_millis(50),
        );

        assert_eq!(notices.expire(start + Duration::from_millis(99)), 0);
        assert_eq!(notices.expire(start + Duration::from_millis(120)), 1);
        assert_eq!(notices.latest().map(|n| n.kind), Some(NoticeKind::RateLimited));
        assert_eq!(notices.expire(start + Duration::from_secs(1)), 1);
        assert!(notices.is_empty());
    }

    #[test]
    fn test_queue_is_bounded_and_dismissable() {
        let mut notices = Notices::default();
        let mut last = 0;
        for n in 0..12 {
            last = notices.push(NoticeKind::Info, format!("notice {n}"));
        }
        assert_eq!(notices.len(), MAX_NOTICES);
        notices.dismiss(last);
        assert_eq!(notices.latest().map(|n| n.message.as_str()), Some("notice 10"));
    }
}
