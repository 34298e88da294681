//! Completion bindings: the menu style used by default and a readline
//! style that prints the candidates above the prompt.

use super::bindings::KeyBindings;
use super::processor::KeyPressEvent;
use crate::context::InTerminal;
use crate::error::HandlerResult;
use quill_core::width::str_width;
use quill_core::FormattedText;
use quill_edit::completion::get_common_complete_suffix;
use quill_edit::{CompleteEvent, Completion, CompletionOptions};
use quill_input::{Key, KeyPress};

/// Tab: starts completion, inserting the common part, or selects the next
/// candidate.
pub fn generate_completions(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    event.with_buffer(|b| {
        if b.complete_state().is_some() {
            b.complete_next(count, false);
        } else {
            b.start_completion(CompletionOptions::requested().insert_common_part());
        }
    })
}

/// Tab, readline style: completes a unique candidate or the common suffix;
/// otherwise lists the candidates in columns above the prompt.
pub fn display_completions_like_readline(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let Some(buffer) = event.current_buffer() else {
        return Ok(());
    };
    let Some(completer) = buffer.completer().cloned() else {
        return Ok(());
    };
    let document = buffer.document().clone();
    let completions: Vec<Completion> = completer
        .get_completions(&document, &CompleteEvent::requested())
        .collect();
    let common_suffix = get_common_complete_suffix(&document, &completions);

    if let [only] = completions.as_slice() {
        let only = only.clone();
        return event.with_buffer(|b| {
            b.delete_before_cursor(only.start_position.unsigned_abs());
            b.insert_text(&only.text);
        });
    }
    if !common_suffix.is_empty() {
        return event.with_buffer(|b| b.insert_text(&common_suffix));
    }
    if !completions.is_empty() {
        event.ctx.run_in_terminal(true, move |term| {
            show_completions(term, &completions);
            Ok(())
        });
    }
    Ok(())
}

/// Column layout of the candidate listing for a terminal of the given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pages {
    column_width: usize,
    column_count: usize,
    per_page: usize,
}

impl Pages {
    fn new(completions: &[Completion], columns: usize, rows: usize) -> Self {
        let widest = completions
            .iter()
            .map(|c| str_width(&c.display_text()))
            .max()
            .unwrap_or(0);
        let column_width = (widest + 1).min(columns).max(1);
        let column_count = (columns / column_width).max(1);
        let per_page = (column_count * rows.saturating_sub(1)).max(1);
        Self {
            column_width,
            column_count,
            per_page,
        }
    }

    fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.per_page)
    }

    /// One page, filled column by column.
    fn render(&self, page: &[Completion]) -> FormattedText {
        let row_count = page.len().div_ceil(self.column_count);
        let mut result = FormattedText::new();
        for row in 0..row_count {
            for column in 0..self.column_count {
                let Some(completion) = page.get(column * row_count + row) else {
                    continue;
                };
                let style = format!("class:readline-like-completions.completion {}", completion.style);
                result.extend(completion.display.clone().with_style_prefix(&style));
                let padding = self
                    .column_width
                    .saturating_sub(str_width(&completion.display_text()));
                result.push_str(completion.style.clone(), " ".repeat(padding));
            }
            result.push_str("", "\n");
        }
        result.with_style_prefix("class:readline-like-completions")
    }
}

fn is_yes(key: &KeyPress) -> bool {
    matches!(key.key, Key::Char('y' | 'Y' | ' ') | Key::Enter)
}

fn is_answer(key: &KeyPress) -> bool {
    is_yes(key) || matches!(key.key, Key::Char('n' | 'N' | 'q' | 'Q') | Key::Control('c'))
}

fn show_completions(term: &mut InTerminal<'_>, completions: &[Completion]) {
    let size = term.output.get_size();
    let pages = Pages::new(completions, size.columns, size.rows);

    if completions.len() <= pages.per_page {
        term.print_formatted_text(&pages.render(completions));
        return;
    }

    term.print_formatted_text(&FormattedText::from(format!(
        "Display all {} possibilities? (y or n) ",
        completions.len()
    )));
    let confirmed = term.read_key(is_answer).is_some_and(|k| is_yes(&k));
    term.print_formatted_text(&FormattedText::from("\n"));
    if !confirmed {
        return;
    }

    let page_count = pages.page_count(completions.len());
    for (i, page) in completions.chunks(pages.per_page).enumerate() {
        term.print_formatted_text(&pages.render(page));
        if i + 1 == page_count {
            break;
        }
        term.print_formatted_text(&FormattedText::styled("class:readline-like-completions.more", "--MORE--"));
        let more = term.read_key(is_answer).is_some_and(|k| is_yes(&k));
        term.output.write("\r");
        term.output.erase_end_of_line();
        if !more {
            return;
        }
    }
}

/// Binds Tab to the readline style listing.
pub fn load_readline_completion_bindings() -> KeyBindings {
    let mut kb = KeyBindings::new();
    kb.add_when(
        Key::Tab,
        super::basic::insert_mode(),
        display_completions_like_readline,
    );
    kb
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words(list: &[&str]) -> Vec<Completion> {
        list.iter().map(|w| Completion::new(*w, 0)).collect()
    }

    #[test]
    fn test_page_layout() {
        let pages = Pages::new(&words(&["alpha", "beta", "gamma"]), 20, 10);
        assert_eq!(pages.column_width, 6);
        assert_eq!(pages.column_count, 3);
        assert_eq!(pages.per_page, 27);
    }

    #[test]
    fn test_render_fills_columns_first() {
        let pages = Pages {
            column_width: 3,
            column_count: 2,
            per_page: 4,
        };
        let text = pages.render(&words(&["a", "b", "c"])).to_plain_text();
        assert_eq!(text, "a  c  \nb  \n");
    }

    #[test]
    fn test_page_count() {
        let pages = Pages::new(&words(&["a"; 30]), 4, 3);
        assert_eq!(pages.per_page, 4);
        assert_eq!(pages.page_count(30), 8);
    }
}
