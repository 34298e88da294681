//! Ready-made containers built from windows and splits.
//!
//! - [`base`]: text areas, labels, buttons, frames, padding, shadows and
//!   selection lists
//! - [`toolbars`]: argument, validation, search and system toolbars
//! - [`menus`]: a menu bar with drop-down submenus

pub mod base;
pub mod menus;
pub mod toolbars;

pub use base::{
    Border, BoxWidget, Button, Checkbox, CheckboxHandle, CheckboxList, Frame, HorizontalLine, Label, ListHandle,
    Padding, RadioList, Shadow, TextArea, TextAreaOptions, VerticalLine, WidgetHandler,
};
pub use menus::{MenuContainer, MenuItem};
pub use toolbars::{ArgToolbar, FormattedTextToolbar, SearchToolbar, SystemToolbar, ValidationToolbar};
