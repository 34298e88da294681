//! Counters: one progress line each, updated from any thread.

use super::BarState;
use parking_lot::Mutex;
use quill_core::FormattedText;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub(crate) struct CounterData {
    pub(crate) label: FormattedText,
    pub(crate) items_completed: usize,
    pub(crate) total: Option<usize>,
    pub(crate) start_time: Instant,
    pub(crate) stop_time: Option<Instant>,
    pub(crate) done: bool,
    pub(crate) stopped: bool,
    pub(crate) remove_when_done: bool,
}

impl CounterData {
    pub(crate) fn new(label: FormattedText, total: Option<usize>, remove_when_done: bool) -> Self {
        Self {
            label,
            items_completed: 0,
            total,
            start_time: Instant::now(),
            stop_time: None,
            done: false,
            stopped: false,
            remove_when_done,
        }
    }

    pub(crate) fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            label: self.label.clone(),
            items_completed: self.items_completed,
            total: self.total,
            start_time: self.start_time,
            stop_time: self.stop_time,
            done: self.done,
            stopped: self.stopped,
        }
    }
}

/// The state of a counter at one moment, as seen by formatters.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSnapshot {
    /// Label in front of the line.
    pub label: FormattedText,
    /// Items completed so far.
    pub items_completed: usize,
    /// Expected number of items, if known.
    pub total: Option<usize>,
    /// When the counter was created.
    pub start_time: Instant,
    /// When the counter finished or was stopped.
    pub stop_time: Option<Instant>,
    /// All items are completed.
    pub done: bool,
    /// Stopped before completion.
    pub stopped: bool,
}

impl CounterSnapshot {
    /// Percentage completed; 0 without a total.
    pub fn percentage(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => self.items_completed as f64 * 100.0 / total as f64,
            _ => 0.0,
        }
    }

    /// Time since the start, frozen once the counter stops.
    pub fn time_elapsed(&self) -> Duration {
        self.time_elapsed_at(Instant::now())
    }

    /// Time between the start and `now`, or the stop time if earlier.
    pub fn time_elapsed_at(&self, now: Instant) -> Duration {
        self.stop_time.unwrap_or(now).saturating_duration_since(self.start_time)
    }

    /// Estimated time until completion, extrapolated from the rate so far.
    /// `None` until at least one item completes or without a total.
    pub fn time_left(&self) -> Option<Duration> {
        let total = self.total.filter(|t| *t > 0)?;
        if self.items_completed == 0 {
            return None;
        }
        if self.done || self.stopped {
            return Some(Duration::ZERO);
        }
        let remaining = total.saturating_sub(self.items_completed) as f64;
        Some(self.time_elapsed().mul_f64(remaining / self.items_completed as f64))
    }
}

/// Handle to one progress line. Clones update the same line.
#[derive(Clone)]
pub struct Counter {
    data: Arc<Mutex<CounterData>>,
    bar: Arc<BarState>,
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter").field("data", &*self.data.lock()).finish()
    }
}

impl Counter {
    pub(crate) fn new(data: Arc<Mutex<CounterData>>, bar: Arc<BarState>) -> Self {
        Self { data, bar }
    }

    /// Marks one more item completed.
    pub fn item_completed(&self) {
        self.data.lock().items_completed += 1;
        self.bar.invalidate();
    }

    /// Sets the number of completed items.
    pub fn set_items_completed(&self, n: usize) {
        self.data.lock().items_completed = n;
        self.bar.invalidate();
    }

    /// Sets the expected number of items.
    pub fn set_total(&self, total: Option<usize>) {
        self.data.lock().total = total;
        self.bar.invalidate();
    }

    /// Replaces the label.
    pub fn set_label(&self, label: impl Into<FormattedText>) {
        self.data.lock().label = label.into();
        self.bar.invalidate();
    }

    /// Marks the counter finished. A counter created with
    /// `remove_when_done` disappears from the bar.
    pub fn set_done(&self) {
        let remove = {
            let mut data = self.data.lock();
            data.done = true;
            data.stop_time.get_or_insert_with(Instant::now);
            data.remove_when_done
        };
        if remove {
            self.bar.counters.lock().retain(|c| !Arc::ptr_eq(c, &self.data));
        }
        self.bar.invalidate();
    }

    /// Marks the counter stopped before completion; its clock freezes.
    pub fn set_stopped(&self) {
        {
            let mut data = self.data.lock();
            data.stopped = true;
            data.stop_time.get_or_insert_with(Instant::now);
        }
        self.bar.invalidate();
    }

    /// Current state.
    pub fn snapshot(&self) -> CounterSnapshot {
        self.data.lock().snapshot()
    }
}

/// An iterator that advances a counter for every item it yields.
///
/// Iteration ends early once the bar is interrupted with Ctrl-C; the
/// counter is then marked stopped. Running to the end marks it done.
pub struct CounterIter<I> {
    inner: I,
    counter: Counter,
    started: bool,
    finished: bool,
}

impl<I> fmt::Debug for CounterIter<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterIter")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl<I> CounterIter<I> {
    pub(crate) fn new(inner: I, counter: Counter) -> Self {
        Self {
            inner,
            counter,
            started: false,
            finished: false,
        }
    }

    /// The counter this iterator advances.
    pub fn counter(&self) -> &Counter {
        &self.counter
    }
}

impl<I: Iterator> Iterator for CounterIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        if self.finished {
            return None;
        }
        // The previous item counts once the caller asks for the next one.
        if self.started {
            self.counter.item_completed();
        }
        self.started = true;
        if self.counter.bar.interrupted.load(Ordering::SeqCst) {
            self.finished = true;
            self.counter.set_stopped();
            return None;
        }
        let item = self.inner.next();
        if item.is_none() {
            self.finished = true;
            self.counter.set_done();
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, self.inner.size_hint().1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot(completed: usize, total: Option<usize>) -> CounterSnapshot {
        CounterData {
            items_completed: completed,
            ..CounterData::new(FormattedText::from("x"), total, false)
        }
        .snapshot()
    }

    #[test]
    fn test_percentage() {
        assert_eq!(snapshot(25, Some(50)).percentage(), 50.0);
        assert_eq!(snapshot(25, None).percentage(), 0.0);
        assert_eq!(snapshot(0, Some(0)).percentage(), 0.0);
    }

    #[test]
    fn test_time_elapsed_freezes_at_stop() {
        let mut s = snapshot(1, Some(2));
        s.stop_time = Some(s.start_time + Duration::from_secs(3));
        assert_eq!(s.time_elapsed_at(s.start_time + Duration::from_secs(10)), Duration::from_secs(3));
    }

    #[test]
    fn test_time_left_extrapolates() {
        let mut s = snapshot(1, Some(4));
        s.stop_time = Some(s.start_time + Duration::from_secs(2));
        assert_eq!(s.time_left(), Some(Duration::from_secs(6)));
    }

    #[test]
    fn test_time_left_unknown_or_finished() {
        assert_eq!(snapshot(0, Some(4)).time_left(), None);
        assert_eq!(snapshot(3, None).time_left(), None);
        let mut done = snapshot(4, Some(4));
        done.done = true;
        assert_eq!(done.time_left(), Some(Duration::ZERO));
    }
}
