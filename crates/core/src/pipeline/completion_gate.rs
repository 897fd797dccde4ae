/// Admits inference completions for rendering in frame-id order only.
///
/// Completions may arrive out of order when several inferences overlap. A
/// completion is rendered only if its id is newer than the last rendered
/// one; older ones are counted and dropped, so the preview never steps
/// back in time.
#[derive(Debug, Default)]
pub struct CompletionGate {
    last_rendered: Option<u64>,
    stale_dropped: u64,
}

impl CompletionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `frame_id` should be rendered, and records it as the
    /// newest rendered id.
    pub fn admit(&mut self, frame_id: u64) -> bool {
        match self.last_rendered {
            Some(last) if frame_id <= last => {
                self.stale_dropped += 1;
                false
            }
            _ => {
                self.last_rendered = Some(frame_id);
                true
            }
        }
    }

    pub fn last_rendered(&self) -> Option<u64> {
        self.last_rendered
    }

    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }
}
