//! Session state machine
//!
//! Tracks a client session from creation to close:
//!
//! ```text
//! Created ──start──► Streaming ──update──► UpdatingLocation
//!                       ▲                        │
//!                       └────────────────────────┘
//! (any) ──close──► Closed
//! ```

use std::time::Instant;

use crate::geo::BoundingBox;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed, nothing running yet
    Created,
    /// Queue bound, producer and consumer running
    Streaming,
    /// Producer being replaced for a new box
    UpdatingLocation,
    /// Terminal
    Closed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,

    /// Box the current producer serves
    pub bbox: BoundingBox,

    /// Creation time
    pub created_at: Instant,

    /// Time streaming started
    pub streaming_since: Option<Instant>,

    /// Completed location updates
    pub location_updates: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            phase: SessionPhase::Created,
            bbox,
            created_at: Instant::now(),
            streaming_since: None,
            location_updates: 0,
        }
    }

    /// Created → Streaming
    pub fn start_streaming(&mut self) -> bool {
        if self.phase != SessionPhase::Created {
            return false;
        }
        self.phase = SessionPhase::Streaming;
        self.streaming_since = Some(Instant::now());
        true
    }

    /// Streaming → UpdatingLocation
    pub fn begin_update(&mut self) -> bool {
        if self.phase != SessionPhase::Streaming {
            return false;
        }
        self.phase = SessionPhase::UpdatingLocation;
        true
    }

    /// UpdatingLocation → Streaming with the new box
    pub fn finish_update(&mut self, bbox: BoundingBox) -> bool {
        if self.phase != SessionPhase::UpdatingLocation {
            return false;
        }
        self.bbox = bbox;
        self.location_updates += 1;
        self.phase = SessionPhase::Streaming;
        true
    }

    /// Any phase → Closed; returns the phase left, or None if already closed
    pub fn close(&mut self) -> Option<SessionPhase> {
        if self.phase == SessionPhase::Closed {
            return None;
        }
        let previous = self.phase;
        self.phase = SessionPhase::Closed;
        Some(previous)
    }

    /// Whether the session is streaming
    pub fn is_streaming(&self) -> bool {
        self.phase == SessionPhase::Streaming
    }

    /// Time spent streaming so far
    pub fn streaming_duration(&self) -> Option<std::time::Duration> {
        self.streaming_since.map(|t| t.elapsed())
    }
}
