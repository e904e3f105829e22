/// What a filesystem notification means for the tailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    /// Content (or metadata) changed; more lines may be readable.
    Written,
    /// The watched path was unlinked.
    Removed,
    /// The watched path was renamed away or now names a different file.
    Renamed,
    /// The file shrank below what has already been read.
    Truncated,
}

impl FileEvent {
    pub fn invalidates_handle(self) -> bool {
        !matches!(self, Self::Written)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    /// Pulling lines from the open handle until it is exhausted.
    Reading,
    /// Blocked on the next filesystem notification.
    AwaitingEvent,
    /// The handle is stale and a new one must be opened before reading resumes.
    Reopening,
}

impl TailState {
    /// Transition after the open handle has been read to its current end.
    pub fn on_drained(self) -> Self {
        match self {
            Self::Reading => Self::AwaitingEvent,
            other => other,
        }
    }

    /// Transition when a notification arrives. Only `AwaitingEvent` listens for events.
    pub fn on_event(self, event: FileEvent) -> Self {
        match self {
            Self::AwaitingEvent if event.invalidates_handle() => Self::Reopening,
            Self::AwaitingEvent => Self::Reading,
            other => other,
        }
    }

    /// Transition once a fresh handle and subscription are in place.
    pub fn on_reopened(self) -> Self {
        match self {
            Self::Reopening => Self::Reading,
            other => other,
        }
    }
}
