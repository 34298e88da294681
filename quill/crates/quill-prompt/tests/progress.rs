//! Progress bars running their own application thread.

use std::thread;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use quill_app::AppError;
use quill_core::{ColorDepth, Size};
use quill_input::PipeInput;
use quill_output::{MemoryWriter, Vt100Output};
use quill_prompt::progress::formatters::{Label, Percentage, Text};
use quill_prompt::{ProgressBar, ProgressOptions};
use serial_test::serial;
use std::sync::Arc;

fn start(options: ProgressOptions) -> (ProgressBar, PipeInput, MemoryWriter) {
    let input = PipeInput::new();
    let writer = MemoryWriter::new();
    let output =
        Vt100Output::new(writer.clone(), || Size::new(24, 80)).with_default_color_depth(ColorDepth::Depth8Bit);
    // Ctrl-C must not signal the test harness.
    let options = options.with_raise_sigint(false);
    let bar = ProgressBar::with_io(options, Box::new(input.clone()), Box::new(output)).expect("bar starts");
    (bar, input, writer)
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
#[serial]
fn test_ctrl_c_reaches_main_thread() {
    let (bar, input, _writer) = start(ProgressOptions::default());
    let counter = bar.counter("work", Some(100));
    for _ in 0..50 {
        counter.item_completed();
    }
    assert_eq!(counter.snapshot().items_completed, 50);

    input.send_text("\x03");
    assert!(wait_until(|| bar.interrupted()), "Ctrl-C was not seen");
    assert!(matches!(bar.finish(), Err(AppError::KeyboardInterrupt)));
}

#[test]
#[serial]
fn test_interrupt_stops_iteration() {
    let (bar, input, _writer) = start(ProgressOptions::default());
    let mut items = bar.iter(0..1000, "items", None);
    assert_eq!(items.next(), Some(0));
    assert_eq!(items.next(), Some(1));

    input.send_text("\x03");
    assert!(wait_until(|| bar.interrupted()));
    assert_eq!(items.next(), None);
    let snapshot = items.counter().snapshot();
    assert!(snapshot.stopped);
    assert!(!snapshot.done);
    assert!(bar.finish().is_err());
}

#[test]
#[serial]
fn test_lines_are_drawn_with_title() {
    let options = ProgressOptions::default()
        .with_title("Copying")
        .with_formatters(vec![
            Arc::new(Label::new().with_suffix(": ")),
            Arc::new(Percentage),
            Arc::new(Text::new(" ok", "")),
        ]);
    let (bar, _input, writer) = start(options);
    let counter = bar.counter("disk", Some(4));
    assert!(wait_until(|| writer.contents().contains("disk: ")), "{:?}", writer.contents());
    counter.set_items_completed(2);
    assert_eq!(counter.snapshot().percentage(), 50.0);
    counter.set_done();
    bar.finish().expect("finishes");

    let screen = writer.contents();
    assert!(screen.contains("Copying"));
    assert!(screen.contains("%"));
}

#[test]
#[serial]
fn test_finish_without_interrupt_is_ok() {
    let (bar, _input, _writer) = start(ProgressOptions::default());
    let total: u32 = bar.iter(1..=10, "sum", None).sum();
    assert_eq!(total, 55);
    bar.finish().expect("finishes");
}
