mod form;
mod handler;
mod ui;

pub use form::{NoteForm, ProblemForm};
pub use handler::{handle_key_event, AppAction};
pub use ui::draw;
