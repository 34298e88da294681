//! Turns key presses into handler calls.
//!
//! The processor buffers keys until they match a binding. While the buffered
//! keys are a prefix of some longer binding it keeps waiting; the
//! application flushes it after `key_press_timeout` so that, for example, a
//! lone Escape still runs its own binding.

use super::bindings::{bindings_for_keys, bindings_starting_with_keys, Binding, Handler};
use crate::context::AppContext;
use crate::error::{AppError, HandlerResult};
use quill_edit::Buffer;
use quill_input::{Key, KeyPress};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Largest accepted repeat argument; anything bigger is treated as 1.
const MAX_ARG: isize = 1_000_000;

/// What a key handler receives.
pub struct KeyPressEvent<'a> {
    /// Application state.
    pub ctx: &'a mut AppContext,
    /// The keys that matched.
    pub key_sequence: Vec<KeyPress>,
    /// The keys of the previous handler call.
    pub previous_key_sequence: Vec<KeyPress>,
    /// True if the previous call ran the same handler.
    pub is_repeat: bool,
    arg: Option<String>,
}

impl fmt::Debug for KeyPressEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPressEvent")
            .field("key_sequence", &self.key_sequence)
            .field("arg", &self.arg)
            .field("is_repeat", &self.is_repeat)
            .finish_non_exhaustive()
    }
}

impl<'a> KeyPressEvent<'a> {
    /// An event for calling handlers directly.
    pub fn new(ctx: &'a mut AppContext, key_sequence: Vec<KeyPress>, arg: Option<String>) -> Self {
        Self {
            ctx,
            key_sequence,
            previous_key_sequence: Vec::new(),
            is_repeat: false,
            arg,
        }
    }

    /// Text of the last key press.
    pub fn data(&self) -> &str {
        self.key_sequence.last().map_or("", |k| k.data.as_str())
    }

    /// The last key.
    pub fn key(&self) -> Option<Key> {
        self.key_sequence.last().map(|k| k.key)
    }

    /// Repeat argument: 1 by default, -1 for a lone `-`.
    pub fn arg(&self) -> isize {
        match self.arg.as_deref() {
            None | Some("") => 1,
            Some("-") => -1,
            Some(text) => match text.parse::<isize>() {
                Ok(n) if n.abs() < MAX_ARG => n,
                _ => 1,
            },
        }
    }

    /// The repeat argument as a count, treating negative values as 1.
    pub fn count(&self) -> usize {
        usize::try_from(self.arg()).unwrap_or(1)
    }

    /// Returns true if a repeat argument was typed.
    pub fn arg_present(&self) -> bool {
        self.arg.is_some()
    }

    /// Extends the repeat argument for the next key with a digit or `-`.
    /// A sign is only accepted before the first digit.
    pub fn append_to_arg_count(&mut self, data: &str) {
        let next = match (&self.arg, data) {
            (None, d) => d.to_string(),
            (Some(current), "-") if current != "-" => {
                tracing::debug!(arg = %current, "ignoring sign after digits");
                current.clone()
            }
            (Some(_), "-") => "-".to_string(),
            (Some(current), d) => format!("{current}{d}"),
        };
        self.ctx.key_arg = Some(next);
    }

    /// The focused buffer.
    pub fn current_buffer(&self) -> Option<&Buffer> {
        self.ctx.current_buffer()
    }

    /// The focused buffer, mutably.
    pub fn current_buffer_mut(&mut self) -> Option<&mut Buffer> {
        self.ctx.current_buffer_mut()
    }

    /// Runs `f` on the focused buffer; does nothing without one.
    pub fn with_buffer(&mut self, f: impl FnOnce(&mut Buffer)) -> HandlerResult {
        if let Some(buffer) = self.ctx.current_buffer_mut() {
            f(buffer);
        }
        Ok(())
    }
}

/// Matches buffered key presses against the active bindings.
#[derive(Default)]
pub struct KeyProcessor {
    input_queue: VecDeque<KeyPress>,
    key_buffer: Vec<KeyPress>,
    previous_key_sequence: Vec<KeyPress>,
    previous_handler: Option<Handler>,
}

impl fmt::Debug for KeyProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyProcessor")
            .field("queued", &self.input_queue.len())
            .field("buffered", &self.key_buffer)
            .finish_non_exhaustive()
    }
}

impl KeyProcessor {
    /// An empty processor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets buffered keys and the previous handler.
    pub fn reset(&mut self) {
        self.input_queue.clear();
        self.key_buffer.clear();
        self.previous_key_sequence.clear();
        self.previous_handler = None;
    }

    /// Queues a key press.
    pub fn feed(&mut self, key: KeyPress) {
        self.input_queue.push_back(key);
    }

    /// Queues several key presses.
    pub fn feed_multiple(&mut self, keys: impl IntoIterator<Item = KeyPress>) {
        self.input_queue.extend(keys);
    }

    /// Returns true while keys are buffered waiting for a longer match.
    pub fn is_waiting(&self) -> bool {
        !self.key_buffer.is_empty()
    }

    /// Removes and returns queued keys that were not processed, dropping
    /// cursor position reports.
    pub fn empty_queue(&mut self) -> Vec<KeyPress> {
        let mut keys: Vec<KeyPress> = self.key_buffer.drain(..).collect();
        keys.extend(self.input_queue.drain(..));
        keys.retain(|k| k.key != Key::CprResponse);
        keys
    }

    /// Processes all queued keys. Stops early once the run is ending.
    pub fn process_keys(&mut self, ctx: &mut AppContext) {
        self.run(ctx, false);
    }

    /// Processes queued keys, then resolves whatever is still buffered as
    /// if no more keys were coming.
    pub fn flush(&mut self, ctx: &mut AppContext) {
        self.run(ctx, true);
    }

    fn run(&mut self, ctx: &mut AppContext, flush: bool) {
        let mut saw_keys = false;
        loop {
            self.take_fed_keys(ctx);
            if ctx.is_exiting() {
                break;
            }
            let Some(key) = self.input_queue.pop_front() else {
                break;
            };
            if key.key != Key::CprResponse {
                saw_keys = true;
            }
            self.key_buffer.push(key);
            self.process(ctx, false);
        }
        if flush && !ctx.is_exiting() && !self.key_buffer.is_empty() {
            self.process(ctx, true);
            self.take_fed_keys(ctx);
            if !self.input_queue.is_empty() {
                self.run(ctx, false);
            }
        }
        if saw_keys || flush {
            ctx.invalidate();
        }
    }

    fn take_fed_keys(&mut self, ctx: &mut AppContext) {
        if ctx.feed_front.is_empty() {
            return;
        }
        for key in ctx.feed_front.drain(..).rev() {
            self.input_queue.push_front(key);
        }
    }

    fn get_matches(ctx: &AppContext, all: &[Rc<Binding>], keys: &[Key]) -> Vec<Rc<Binding>> {
        bindings_for_keys(all, keys)
            .into_iter()
            .filter(|b| b.filter.eval(ctx))
            .collect()
    }

    fn is_prefix_of_longer_match(ctx: &AppContext, all: &[Rc<Binding>], keys: &[Key]) -> bool {
        bindings_starting_with_keys(all, keys)
            .iter()
            .any(|b| b.filter.eval(ctx))
    }

    /// Resolves the key buffer as far as possible. Returns when the buffer
    /// is empty or is a prefix of a longer binding.
    fn process(&mut self, ctx: &mut AppContext, flush: bool) {
        let mut flush = flush;
        while !self.key_buffer.is_empty() && !ctx.is_exiting() {
            ctx.begin_tick();
            let all = ctx.active_bindings();
            let keys: Vec<Key> = self.key_buffer.iter().map(|k| k.key).collect();

            let mut matches = Self::get_matches(ctx, &all, &keys);
            let mut is_prefix = !flush && Self::is_prefix_of_longer_match(ctx, &all, &keys);

            let eager: Vec<Rc<Binding>> = matches
                .iter()
                .filter(|b| b.eager.eval(ctx))
                .cloned()
                .collect();
            if !eager.is_empty() {
                matches = eager;
                is_prefix = false;
            }

            if is_prefix {
                return;
            }
            if let Some(binding) = matches.last().cloned() {
                let sequence = std::mem::take(&mut self.key_buffer);
                self.call_handler(ctx, &binding, sequence);
                return;
            }

            // No match: run the longest prefix that matches, else drop the
            // first key, then retry with what is left.
            let fallback = (1..keys.len()).rev().find_map(|i| {
                Self::get_matches(ctx, &all, &keys[..i])
                    .last()
                    .cloned()
                    .map(|b| (i, b))
            });
            if let Some((len, binding)) = fallback {
                let sequence: Vec<KeyPress> = self.key_buffer.drain(..len).collect();
                self.call_handler(ctx, &binding, sequence);
            } else {
                let dropped = self.key_buffer.remove(0);
                tracing::trace!(key = %dropped.key, "no binding for key");
            }
            flush = false;
        }
    }

    fn call_handler(&mut self, ctx: &mut AppContext, binding: &Rc<Binding>, sequence: Vec<KeyPress>) {
        let was_recording = ctx.recording.is_some();
        let arg = ctx.key_arg.take();
        let is_repeat = self
            .previous_handler
            .as_ref()
            .is_some_and(|h| Rc::ptr_eq(h, binding.handler()));

        let mut event = KeyPressEvent {
            ctx,
            key_sequence: sequence,
            previous_key_sequence: std::mem::take(&mut self.previous_key_sequence),
            is_repeat,
            arg,
        };

        if binding.should_save_before(&event) {
            if let Some(buffer) = event.ctx.current_buffer_mut() {
                buffer.save_to_undo_stack();
            }
        }

        let result = (binding.handler())(&mut event);
        let KeyPressEvent {
            ctx, key_sequence, ..
        } = event;

        if let Err(err) = result {
            handle_error(ctx, err);
        }

        if was_recording && binding.record_in_macro.eval(ctx) {
            if let Some(recording) = ctx.recording.as_mut() {
                recording.extend(key_sequence.iter().cloned());
            }
        }
        self.previous_key_sequence = key_sequence;
        self.previous_handler = Some(Rc::clone(binding.handler()));
        self.take_fed_keys(ctx);
    }
}

/// Routes a handler error: exit signals end the run, anything else is
/// logged and the loop continues.
pub(crate) fn handle_error(ctx: &mut AppContext, err: AppError) {
    if err.is_exit_signal() {
        let style = match err {
            AppError::KeyboardInterrupt | AppError::Abort(_) => "class:aborting",
            AppError::Eof => "class:exiting",
            _ => "",
        };
        ctx.exit_error(err, style);
    } else {
        tracing::error!("key handler failed: {err}");
        ctx.report_error(&err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::key_binding::KeyBindings;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging(log: &Log, name: &'static str) -> impl Fn(&mut KeyPressEvent<'_>) -> HandlerResult {
        let log = Rc::clone(log);
        move |event| {
            log.borrow_mut().push(format!("{name}:{}", event.arg()));
            Ok(())
        }
    }

    fn setup(kb: KeyBindings) -> AppContext {
        let mut ctx = test_context();
        ctx.global_bindings = vec![kb.shared()];
        ctx
    }

    #[test]
    fn test_single_key() {
        let log = Log::default();
        let mut kb = KeyBindings::new();
        kb.add('a', logging(&log, "a"));
        let mut ctx = setup(kb);
        let mut p = KeyProcessor::new();
        p.feed(KeyPress::char('a'));
        p.process_keys(&mut ctx);
        assert_eq!(*log.borrow(), vec!["a:1"]);
    }

    #[test]
    fn test_prefix_waits_until_flush() {
        let log = Log::default();
        let mut kb = KeyBindings::new();
        kb.add(Key::Escape, logging(&log, "esc"));
        kb.add([Key::Escape, Key::Char('f')], logging(&log, "esc-f"));
        let mut ctx = setup(kb);
        let mut p = KeyProcessor::new();

        p.feed(Key::Escape.into());
        p.process_keys(&mut ctx);
        assert!(log.borrow().is_empty());
        assert!(p.is_waiting());
        p.flush(&mut ctx);
        assert_eq!(*log.borrow(), vec!["esc:1"]);

        p.feed_multiple([Key::Escape.into(), KeyPress::char('f')]);
        p.process_keys(&mut ctx);
        assert_eq!(*log.borrow(), vec!["esc:1", "esc-f:1"]);
    }

    #[test]
    fn test_unmatched_prefix_falls_back() {
        let log = Log::default();
        let mut kb = KeyBindings::new();
        kb.add(Key::Escape, logging(&log, "esc"));
        kb.add([Key::Escape, Key::Char('f')], logging(&log, "esc-f"));
        kb.add('x', logging(&log, "x"));
        let mut ctx = setup(kb);
        let mut p = KeyProcessor::new();
        p.feed_multiple([Key::Escape.into(), KeyPress::char('x')]);
        p.process_keys(&mut ctx);
        assert_eq!(*log.borrow(), vec!["esc:1", "x:1"]);
    }

    #[test]
    fn test_eager_binding_does_not_wait() {
        let log = Log::default();
        let mut kb = KeyBindings::new();
        kb.add_binding(Binding::new(Key::Escape, logging(&log, "esc")).eager());
        kb.add([Key::Escape, Key::Char('f')], logging(&log, "esc-f"));
        let mut ctx = setup(kb);
        let mut p = KeyProcessor::new();
        p.feed(Key::Escape.into());
        p.process_keys(&mut ctx);
        assert_eq!(*log.borrow(), vec!["esc:1"]);
    }

    #[test]
    fn test_repeat_argument() {
        let log = Log::default();
        let mut kb = KeyBindings::new();
        kb.add([Key::Escape, Key::Any], |event| {
            let data = event.data().to_string();
            event.append_to_arg_count(&data);
            Ok(())
        });
        kb.add('x', logging(&log, "x"));
        let mut ctx = setup(kb);
        let mut p = KeyProcessor::new();
        p.feed_multiple([
            Key::Escape.into(),
            KeyPress::char('4'),
            Key::Escape.into(),
            KeyPress::char('2'),
            KeyPress::char('x'),
            KeyPress::char('x'),
        ]);
        p.process_keys(&mut ctx);
        assert_eq!(*log.borrow(), vec!["x:42", "x:1"]);
    }

    #[test]
    fn test_errors_do_not_stop_processing() {
        let log = Log::default();
        let mut kb = KeyBindings::new();
        kb.add('e', |_| Err(AppError::Handler("boom".into())));
        kb.add('x', logging(&log, "x"));
        let mut ctx = setup(kb);
        let mut p = KeyProcessor::new();
        p.feed_multiple([KeyPress::char('e'), KeyPress::char('x')]);
        p.process_keys(&mut ctx);
        assert_eq!(*log.borrow(), vec!["x:1"]);
        assert_eq!(ctx.errors().len(), 1);
    }

    #[test]
    fn test_exit_signal_stops_processing() {
        let log = Log::default();
        let mut kb = KeyBindings::new();
        kb.add(Key::Control('c'), |_| Err(AppError::KeyboardInterrupt));
        kb.add('x', logging(&log, "x"));
        let mut ctx = setup(kb);
        let mut p = KeyProcessor::new();
        p.feed_multiple([Key::Control('c').into(), KeyPress::char('x')]);
        p.process_keys(&mut ctx);
        assert!(log.borrow().is_empty());
        assert!(ctx.is_exiting());
        assert_eq!(p.empty_queue(), vec![KeyPress::char('x')]);
    }

    #[test]
    fn test_sign_only_before_digits() {
        let mut ctx = test_context();
        let mut event = KeyPressEvent::new(&mut ctx, Vec::new(), None);
        event.append_to_arg_count("-");
        assert_eq!(event.ctx.key_arg.as_deref(), Some("-"));

        let mut event = KeyPressEvent::new(&mut ctx, Vec::new(), Some("-".into()));
        event.append_to_arg_count("3");
        assert_eq!(event.ctx.key_arg.as_deref(), Some("-3"));

        let mut event = KeyPressEvent::new(&mut ctx, Vec::new(), Some("12".into()));
        event.append_to_arg_count("-");
        assert_eq!(event.ctx.key_arg.as_deref(), Some("12"));

        let mut event = KeyPressEvent::new(&mut ctx, Vec::new(), Some("-".into()));
        event.append_to_arg_count("-");
        assert_eq!(event.ctx.key_arg.as_deref(), Some("-"));
    }

    #[test]
    fn test_arg_parsing() {
        let mut ctx = test_context();
        let event = KeyPressEvent::new(&mut ctx, Vec::new(), Some("-".into()));
        assert_eq!(event.arg(), -1);
        let event = KeyPressEvent::new(&mut ctx, Vec::new(), Some("99999999".into()));
        assert_eq!(event.arg(), 1);
        let event = KeyPressEvent::new(&mut ctx, Vec::new(), None);
        assert!(!event.arg_present());
    }
}
