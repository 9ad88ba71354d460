use std::fmt;

use crossbeam_channel::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(raw: u64) -> Self {
        RequestId(raw)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Delivered,
    Failed(String),
}

impl SyncOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SyncOutcome::Delivered)
    }
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub request: RequestId,
    pub label: String,
    pub outcome: SyncOutcome,
}

/// Return path for one selection notification.
///
/// Only the first report for a request affects the stage; duplicates and
/// reports that arrive after teardown are dropped.
#[derive(Debug, Clone)]
pub struct SyncReply {
    request: RequestId,
    label: String,
    sender: Sender<SyncReport>,
}

impl SyncReply {
    pub fn new(request: RequestId, label: String, sender: Sender<SyncReport>) -> Self {
        Self {
            request,
            label,
            sender,
        }
    }

    pub fn request(&self) -> RequestId {
        self.request
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn resolve(self, outcome: SyncOutcome) {
        let report = SyncReport {
            request: self.request,
            label: self.label,
            outcome,
        };
        // The stage may already be gone; nothing is waiting in that case.
        let _ = self.sender.send(report);
    }
}

/// Tells an external service which exercise is on screen.
///
/// `dispatch` must not block: implementations hand the work off and report
/// through the reply whenever it finishes.
pub trait SelectionNotifier {
    fn dispatch(&self, reply: SyncReply);
}
