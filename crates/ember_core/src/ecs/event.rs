//! Append-only event pipes with masked readers.
//!
//! An [`EventPipe`] is a per-event-type log of `(payload, mask)` records.
//! Writers append through an [`EventWriter`]; any number of
//! [`EventReader`]s iterate the same log independently, each driving its
//! own external cursor. Records are addressed by absolute index since the
//! pipe was created, so cursors stay meaningful across [`EventPipe::clear`].

use std::sync::atomic::{AtomicUsize, Ordering};

/// Append-only log of events of type `T`.
///
/// Clearing contract: [`EventPipe::clear`] drops stored records and moves
/// the trim point to the current sent count. Cursors are absolute
/// indices; a cursor behind the trim point is clamped forward on the next
/// read, so it may observe fewer records than its remembered index
/// suggests. [`EventPipe::sent_events`] is monotonic and never reset.
pub struct EventPipe<T> {
    // Records at absolute indices `trimmed..sent`.
    records: Vec<(T, u32)>,
    trimmed: usize,
    sent: usize,
    // Attached-reader count, maintained for future trim decisions; it has
    // no effect on cursor correctness.
    readers: AtomicUsize,
}

impl<T> Default for EventPipe<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventPipe<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            trimmed: 0,
            sent: 0,
            readers: AtomicUsize::new(0),
        }
    }

    /// Append an event visible to every reader.
    pub fn push(&mut self, event: T) {
        self.push_with_mask(event, u32::MAX);
    }

    /// Append an event tagged with `mask`; only readers whose mask
    /// intersects it will observe the record.
    pub fn push_with_mask(&mut self, event: T, mask: u32) {
        self.records.push((event, mask));
        self.sent += 1;
    }

    /// Total number of events ever pushed. Survives [`EventPipe::clear`].
    pub fn sent_events(&self) -> usize {
        self.sent
    }

    /// Drop all stored records. Cursors behind the trim point are clamped
    /// forward on their next read.
    pub fn clear(&mut self) {
        self.records.clear();
        self.trimmed = self.sent;
    }

    /// Note that a reader attached to this pipe.
    pub fn add_reader(&self) {
        self.readers.fetch_add(1, Ordering::Relaxed);
    }

    /// Note that a reader detached from this pipe. Saturates at zero.
    pub fn remove_reader(&self) {
        let _ = self
            .readers
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                count.checked_sub(1)
            });
    }

    /// Number of currently attached readers.
    pub fn reader_count(&self) -> usize {
        self.readers.load(Ordering::Relaxed)
    }

    fn record(&self, index: usize) -> Option<&(T, u32)> {
        self.records.get(index.checked_sub(self.trimmed)?)
    }
}

/// Write handle over a pipe.
pub struct EventWriter<'p, T> {
    pipe: &'p mut EventPipe<T>,
}

impl<'p, T> EventWriter<'p, T> {
    pub fn new(pipe: &'p mut EventPipe<T>) -> Self {
        Self { pipe }
    }

    pub fn push(&mut self, event: T) {
        self.pipe.push(event);
    }

    pub fn push_with_mask(&mut self, event: T, mask: u32) {
        self.pipe.push_with_mask(event, mask);
    }
}

/// Read handle over a pipe, driving an external cursor.
///
/// The cursor belongs to the caller, which is what makes several readers
/// over the same pipe independent: each advances only its own index.
pub struct EventReader<'p, T> {
    pipe: &'p EventPipe<T>,
    cursor: &'p mut usize,
    mask: u32,
}

impl<'p, T> EventReader<'p, T> {
    /// Reader observing every record.
    pub fn new(pipe: &'p EventPipe<T>, cursor: &'p mut usize) -> Self {
        Self::with_mask(pipe, cursor, u32::MAX)
    }

    /// Reader observing only records whose mask intersects `mask`.
    pub fn with_mask(pipe: &'p EventPipe<T>, cursor: &'p mut usize, mask: u32) -> Self {
        Self { pipe, cursor, mask }
    }

    /// Next unread matching record, advancing the cursor past skipped
    /// records; `None` once exhausted.
    pub fn read(&mut self) -> Option<&'p T> {
        if *self.cursor < self.pipe.trimmed {
            *self.cursor = self.pipe.trimmed;
        }
        while let Some((event, mask)) = self.pipe.record(*self.cursor) {
            *self.cursor += 1;
            if mask & self.mask != 0 {
                return Some(event);
            }
        }
        None
    }
}

impl<'p, T> Iterator for EventReader<'p, T> {
    type Item = &'p T;

    fn next(&mut self) -> Option<Self::Item> {
        self.read()
    }
}
