//! Incremental search state.

/// Which way a search moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchDirection {
    /// Towards the end of the text and newer history.
    #[default]
    Forward,
    /// Towards the start of the text and older history.
    Backward,
}

impl SearchDirection {
    /// The opposite direction.
    pub const fn invert(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// What is being searched for, and how.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchState {
    /// The search string.
    pub text: String,
    /// Search direction.
    pub direction: SearchDirection,
    /// Case-insensitive matching.
    pub ignore_case: bool,
}

impl SearchState {
    /// A search for `text` in `direction`.
    pub fn new(text: impl Into<String>, direction: SearchDirection) -> Self {
        Self {
            text: text.into(),
            direction,
            ignore_case: false,
        }
    }

    /// Sets case-insensitive matching.
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// The same search in the other direction.
    pub fn invert(&self) -> Self {
        Self {
            direction: self.direction.invert(),
            ..self.clone()
        }
    }
}
