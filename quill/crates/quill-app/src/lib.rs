//! Application runtime for quill.
//!
//! - [`application`]: [`Application`], the event loop that ties input,
//!   key bindings, layout and rendering together
//! - [`context`]: [`AppContext`], the state handlers and filters see
//! - [`key_binding`]: registries, the key processor and the default
//!   emacs-style bindings
//! - [`filters`]: [`Filter`], conditions over application state
//! - [`layout`]: containers, windows, controls, margins and processors
//! - [`renderer`]: [`Renderer`], incremental drawing to an output
//! - [`widgets`]: ready-made containers such as frames, buttons, toolbars
//!   and menus

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::struct_excessive_bools)]

pub mod application;
pub mod context;
pub mod error;
pub mod filters;
pub mod key_binding;
pub mod layout;
pub mod renderer;
pub mod widgets;

pub use application::{AppState, Application, ApplicationOptions};
pub use context::{AppContext, BufferId, ExitHandle, InTerminal, LoopHandle};
pub use error::{AppError, HandlerResult, Result};
pub use filters::Filter;
pub use key_binding::{KeyBindings, KeyPressEvent, SharedKeyBindings};
pub use layout::{Container, ContainerRef, Layout};
pub use renderer::{print_formatted_text, Renderer};
