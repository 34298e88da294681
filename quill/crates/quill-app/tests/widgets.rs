//! Widgets driven by keys inside a running application.

use std::time::Duration;

use pretty_assertions::assert_eq;
use quill_app::layout::{FormattedTextControl, HSplit, Window};
use quill_app::widgets::{MenuContainer, MenuItem, RadioList};
use quill_app::{Application, ApplicationOptions, KeyBindings, Layout};
use quill_core::{ColorDepth, FormattedText, Size};
use quill_input::{Key, PipeInput};
use quill_output::{MemoryWriter, Vt100Output};

const F5: &str = "\x1b[15~";

fn application(input: &PipeInput) -> Application {
    let output =
        Vt100Output::new(MemoryWriter::new(), || Size::new(24, 80)).with_default_color_depth(ColorDepth::Depth8Bit);
    Application::new(
        ApplicationOptions::default()
            .with_full_screen(true)
            .with_min_redraw_interval(Duration::ZERO),
        Box::new(input.clone()),
        Box::new(output),
    )
}

#[test]
fn test_radio_list_keyboard_selection() {
    let input = PipeInput::new();
    let mut app = application(&input);
    let list = RadioList::new(vec![
        ("tea", FormattedText::from("Tea")),
        ("coffee", FormattedText::from("Coffee")),
        ("water", FormattedText::from("Water")),
    ]);
    let handle = list.handle();
    app.set_layout(Layout::new(HSplit::new(vec![Box::new(list)])));

    let mut kb = KeyBindings::new();
    kb.add(Key::F(5), |event| {
        event.ctx.exit();
        Ok(())
    });
    app.add_key_bindings(kb.shared());

    // Down twice, Up once, then select: "coffee".
    input.send_text(&format!("\x1b[B\x1b[B\x1b[A\r{F5}"));
    app.run::<()>().expect("run succeeds");
    assert_eq!(handle.current_value(), Some("coffee"));
}

#[test]
fn test_menu_runs_item_handler() {
    let input = PipeInput::new();
    let mut app = application(&input);
    let body = Window::new(FormattedTextControl::new("body"));
    let menu = MenuContainer::new(
        Box::new(body),
        vec![
            MenuItem::new("File").with_children(vec![MenuItem::new("Quit").with_handler(|ctx| ctx.exit_with("quit"))]),
            MenuItem::new("Edit").with_children(vec![
                MenuItem::new("Undo").with_disabled(true),
                MenuItem::new("Copy").with_handler(|ctx| ctx.exit_with("copy")),
            ]),
        ],
    );
    let bar = menu.bar_window_id();
    app.set_layout(Layout::new(menu));

    // Right to "Edit", Down opens it on "Copy" (Undo is disabled), Enter.
    input.send_text("\x1b[C\x1b[B\r");
    let chosen: &str = app
        .run_with(|ctx| ctx.focus_window(bar))
        .expect("run succeeds");
    assert_eq!(chosen, "copy");
}

#[test]
fn test_menu_ctrl_g_closes_submenu() {
    let input = PipeInput::new();
    let mut app = application(&input);
    let menu = MenuContainer::new(
        Box::new(Window::new(FormattedTextControl::new("body"))),
        vec![
            MenuItem::new("File").with_children(vec![MenuItem::new("Open").with_handler(|ctx| ctx.exit_with("open"))]),
            MenuItem::new("Help").with_children(vec![MenuItem::new("About").with_handler(|ctx| ctx.exit_with("about"))]),
        ],
    );
    app.set_layout(Layout::new(menu));

    // Open File, close it with Ctrl-G, move to Help and choose About.
    input.send_text("\x1b[B\x07\x1b[C\x1b[B\r");
    let chosen: &str = app.run().expect("run succeeds");
    assert_eq!(chosen, "about");
}
