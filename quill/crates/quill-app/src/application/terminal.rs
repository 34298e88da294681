//! Handing the terminal to other code while the application is paused.

use super::{system, Application};
use crate::context::{InTerminal, TerminalFn};
use crate::error::AppError;
use crate::key_binding::processor::handle_error;
use quill_core::formatted_text::FormattedText;

impl Application {
    /// Hides the application, runs `func` in cooked mode, then redraws.
    ///
    /// With `render_done` the current frame stays on screen as if the run
    /// had ended and `func`'s output appears below it.
    pub(super) fn run_in_terminal(&mut self, render_done: bool, func: TerminalFn) {
        if render_done {
            self.redraw(true);
        } else {
            self.renderer.erase(true);
        }
        self.input.detach();

        let result = match self.input.cooked_mode() {
            Ok(_cooked) => {
                let mut terminal = InTerminal {
                    ctx: &mut self.ctx,
                    output: self.renderer.output_mut(),
                    input: self.input.as_mut(),
                    style: &self.style,
                    color_depth: self.color_depth,
                };
                func(&mut terminal)
            }
            Err(e) => Err(AppError::from(e)),
        };
        if let Err(e) = result {
            handle_error(&mut self.ctx, e);
        }

        self.ctx.is_done = false;
        self.renderer.reset(true);
        if let Err(e) = self.attach_input() {
            tracing::error!("cannot reattach input: {e}");
            self.ctx.exit_error(e, "");
        }
        self.renderer.request_absolute_cursor_position();
        self.ctx.invalidate();
    }

    /// Runs a shell command with inherited stdio, optionally waiting for
    /// Enter before the application comes back.
    pub(super) fn run_system_command(&mut self, command: String, wait_for_enter: bool, display_before_text: String) {
        let func: TerminalFn = Box::new(move |terminal| {
            if !display_before_text.is_empty() {
                terminal.print_formatted_text(&FormattedText::from(display_before_text));
            }
            match system::run_shell_command(&command) {
                Ok(status) if !status.success() => tracing::debug!(%command, %status, "system command failed"),
                Ok(_) => {}
                Err(e) => return Err(AppError::Io(e)),
            }
            if wait_for_enter {
                terminal.print_formatted_text(&FormattedText::from("Press ENTER to continue..."));
                terminal.read_key(system::is_enter);
                terminal.print_formatted_text(&FormattedText::from("\n"));
            }
            Ok(())
        });
        self.run_in_terminal(false, func);
    }

    /// Stops the process group; the application redraws when resumed.
    pub(super) fn suspend_to_background(&mut self) {
        let func: TerminalFn = Box::new(|_| {
            system::suspend_process_group();
            Ok(())
        });
        self.run_in_terminal(false, func);
    }
}
