//! G-code parsing.
//!
//! The [`tokenizer`] splits lines into words, the [`Interpreter`] applies the
//! modal state and reports what the program asks for to an
//! [`EventReceiver`].

mod events;
mod interpreter;
pub mod tokenizer;

pub use events::EventReceiver;
pub use interpreter::{Interpreter, InterpreterConfig, Positioning};
pub use tokenizer::{next_word, Word};
