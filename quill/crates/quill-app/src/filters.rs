//! Conditions that enable key bindings and containers.
//!
//! A [`Filter`] is evaluated against the [`AppContext`] each time it is
//! consulted. Conditions are memoised per key press and per frame, so an
//! expensive condition shared by many bindings runs once.

use crate::context::{AppContext, BufferId};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::rc::Rc;

/// A boolean condition over application state.
#[derive(Clone, Default)]
pub enum Filter {
    /// Always true.
    #[default]
    Always,
    /// Always false.
    Never,
    /// Evaluates a closure.
    Condition(Rc<dyn Fn(&AppContext) -> bool>),
    /// True when all are true.
    And(Vec<Filter>),
    /// True when any is true.
    Or(Vec<Filter>),
    /// Negation.
    Not(Box<Filter>),
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Never => f.write_str("Never"),
            Self::Condition(_) => f.write_str("Condition"),
            Self::And(all) => f.debug_tuple("And").field(all).finish(),
            Self::Or(any) => f.debug_tuple("Or").field(any).finish(),
            Self::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
        }
    }
}

impl From<bool> for Filter {
    fn from(value: bool) -> Self {
        if value {
            Self::Always
        } else {
            Self::Never
        }
    }
}

impl Filter {
    /// A filter from a closure.
    pub fn new(condition: impl Fn(&AppContext) -> bool + 'static) -> Self {
        Self::Condition(Rc::new(condition))
    }

    /// Evaluates the filter.
    pub fn eval(&self, ctx: &AppContext) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Condition(condition) => {
                let key = Rc::as_ptr(condition).cast::<()>() as usize;
                if let Some(value) = ctx.filter_memo.borrow().get(&key) {
                    return *value;
                }
                let value = condition(ctx);
                ctx.filter_memo.borrow_mut().insert(key, value);
                value
            }
            Self::And(all) => all.iter().all(|f| f.eval(ctx)),
            Self::Or(any) => any.iter().any(|f| f.eval(ctx)),
            Self::Not(inner) => !inner.eval(ctx),
        }
    }

    /// Returns true if the filter is the constant `Always`.
    pub fn is_always(&self) -> bool {
        matches!(self, Self::Always)
    }

    /// Both conditions.
    pub fn and(self, other: impl Into<Filter>) -> Self {
        match (self, other.into()) {
            (Self::Always, f) | (f, Self::Always) => f,
            (Self::Never, _) | (_, Self::Never) => Self::Never,
            (Self::And(mut a), Self::And(b)) => {
                a.extend(b);
                Self::And(a)
            }
            (Self::And(mut a), f) => {
                a.push(f);
                Self::And(a)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// Either condition.
    pub fn or(self, other: impl Into<Filter>) -> Self {
        match (self, other.into()) {
            (Self::Never, f) | (f, Self::Never) => f,
            (Self::Always, _) | (_, Self::Always) => Self::Always,
            (Self::Or(mut a), f) => {
                a.push(f);
                Self::Or(a)
            }
            (a, b) => Self::Or(vec![a, b]),
        }
    }

    /// The negated condition.
    pub fn negate(self) -> Self {
        match self {
            Self::Always => Self::Never,
            Self::Never => Self::Always,
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and(rhs)
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.or(rhs)
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        self.negate()
    }
}

fn current(f: impl Fn(&quill_edit::Buffer) -> bool + 'static) -> Filter {
    Filter::new(move |ctx| ctx.current_buffer().is_some_and(&f))
}

/// The focused window shows `buffer`.
pub fn has_focus(buffer: BufferId) -> Filter {
    Filter::new(move |ctx| ctx.has_focus(buffer))
}

/// The focused window shows a buffer.
pub fn buffer_has_focus() -> Filter {
    Filter::new(|ctx| ctx.current_buffer_id().is_some())
}

/// The focused buffer has completions.
pub fn has_completions() -> Filter {
    current(|b| b.complete_state().is_some_and(|s| !s.completions.is_empty()))
}

/// A completion of the focused buffer is selected.
pub fn completion_is_selected() -> Filter {
    current(|b| b.complete_state().is_some_and(|s| s.current_completion().is_some()))
}

/// The focused buffer has a selection.
pub fn has_selection() -> Filter {
    current(|b| b.selection().is_some())
}

/// The focused buffer failed validation.
pub fn has_validation_error() -> Filter {
    current(|b| b.validation_error().is_some())
}

/// The focused buffer shows an auto-suggestion.
pub fn has_suggestion() -> Filter {
    current(|b| {
        b.suggestion().is_some_and(|s| !s.text.is_empty()) && b.document().is_cursor_at_the_end()
    })
}

/// The focused buffer is read-only.
pub fn is_read_only() -> Filter {
    current(quill_edit::Buffer::is_read_only)
}

/// The focused buffer accepts newlines.
pub fn is_multiline() -> Filter {
    current(quill_edit::Buffer::is_multiline)
}

/// The focused buffer has an accept handler.
pub fn is_returnable() -> Filter {
    current(quill_edit::Buffer::is_returnable)
}

/// A repeat argument is being typed.
pub fn has_arg() -> Filter {
    Filter::new(|ctx| ctx.key_arg().is_some())
}

/// The final frame is being drawn.
pub fn is_done() -> Filter {
    Filter::new(AppContext::is_done)
}

/// An incremental search is in progress.
pub fn is_searching() -> Filter {
    Filter::new(AppContext::is_searching)
}

/// The focused window can be searched.
pub fn control_is_searchable() -> Filter {
    Filter::new(|ctx| {
        ctx.focused_window()
            .and_then(|id| ctx.window_info(id))
            .is_some_and(|w| w.search_buffer.is_some())
    })
}

/// Paste mode is on.
pub fn in_paste_mode() -> Filter {
    Filter::new(|ctx| ctx.paste_mode)
}

/// The rows below the cursor are known.
pub fn renderer_height_is_known() -> Filter {
    Filter::new(AppContext::height_is_known)
}
