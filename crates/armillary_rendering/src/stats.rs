//! Per-frame synchronization statistics.

/// What one `report` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number (1 for the first report)
    pub frame_number: u64,
    /// Non-ground bodies whose pose was read
    pub bodies_posed: u32,
    /// Persistent actors whose transform was set
    pub actors_posed: u32,
    /// Dynamic lines rebuilt
    pub lines_rebuilt: u32,
    /// Ephemeral actors from the previous frame released
    pub ephemeral_released: u32,
    /// Ephemeral actors drawn this frame
    pub ephemeral_drawn: u32,
    /// The camera was refit this frame
    pub camera_reset: bool,
    /// A frame was actually presented
    pub rendered: bool,
    /// Time spent in `report` (microseconds)
    pub sync_time_us: u32,
}

impl FrameStats {
    /// Total actors touched this frame.
    #[must_use]
    pub const fn actors_touched(&self) -> u32 {
        self.actors_posed + self.lines_rebuilt + self.ephemeral_drawn
    }
}
