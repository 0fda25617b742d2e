//! CLOCK (second chance) replacement policy.

use crate::buffer::replacer::Replacer;
use crate::common::FrameId;

/// Per-frame replacement state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ClockEntry {
    /// Made eligible at least once since it was last victimized.
    active: bool,
    /// Currently held by someone; never a victim.
    pinned: bool,
    /// Recently released; survives one pass of the hand.
    reference: bool,
}

impl ClockEntry {
    #[inline]
    fn is_eligible(&self) -> bool {
        self.active && !self.pinned
    }
}

/// Clock sweep over a fixed ring of frames.
///
/// ```text
///          hand
///           │
///   ┌───┬───▼───┬───┬───┐
///   │ A │ B │ C │ D │ E │   A: pinned      -> skip
///   └───┴───┴───┴───┴───┘   B: reference=1 -> clear, skip
///                           C: reference=0 -> victim
/// ```
///
/// A victim search inspects at most two revolutions of the ring: the first
/// can strip every reference bit, the second is then guaranteed to find any
/// eligible frame. When nothing is eligible the search stops there instead
/// of spinning.
#[derive(Debug)]
pub struct ClockReplacer {
    entries: Vec<ClockEntry>,
    hand: usize,
    eligible: usize,
}

impl ClockReplacer {
    /// Create a replacer tracking `num_frames` frames, none eligible.
    pub fn new(num_frames: usize) -> Self {
        Self {
            entries: vec![ClockEntry::default(); num_frames],
            hand: 0,
            eligible: 0,
        }
    }

    /// Number of frames the ring covers.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    fn entry_mut(&mut self, frame_id: FrameId) -> &mut ClockEntry {
        assert!(
            frame_id.0 < self.entries.len(),
            "{} out of range for replacer of {} frames",
            frame_id,
            self.entries.len()
        );
        &mut self.entries[frame_id.0]
    }
}

impl Replacer for ClockReplacer {
    fn pin(&mut self, frame_id: FrameId) {
        let entry = self.entry_mut(frame_id);
        if !entry.is_eligible() {
            return;
        }
        entry.pinned = true;
        self.eligible -= 1;
    }

    fn unpin(&mut self, frame_id: FrameId) {
        let entry = self.entry_mut(frame_id);
        let was_eligible = entry.is_eligible();
        entry.active = true;
        entry.pinned = false;
        entry.reference = true;
        if !was_eligible {
            self.eligible += 1;
        }
    }

    fn victim(&mut self) -> Option<FrameId> {
        if self.eligible == 0 {
            return None;
        }

        let n = self.entries.len();
        for _ in 0..2 * n {
            let idx = self.hand;
            self.hand = (self.hand + 1) % n;

            let entry = &mut self.entries[idx];
            if !entry.is_eligible() {
                continue;
            }
            if entry.reference {
                entry.reference = false;
                continue;
            }

            *entry = ClockEntry::default();
            self.eligible -= 1;
            return Some(FrameId::new(idx));
        }

        None
    }

    fn remove(&mut self, frame_id: FrameId) {
        let entry = std::mem::take(self.entry_mut(frame_id));
        if entry.is_eligible() {
            self.eligible -= 1;
        }
    }

    fn size(&self) -> usize {
        self.eligible
    }
}
