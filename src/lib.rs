//! Notably - page notes for the browser, with trash and JSON import/export
//! Built with Rust + WASM

pub mod bindings;
pub mod clock;
pub mod domain;
pub mod error;
pub mod keys;
pub mod note;
pub mod notes;
pub mod search;
pub mod store;
pub mod tags;
pub mod transfer;
pub mod trash;

pub use error::{Error, ImportError, StorageError};
pub use note::{Note, NoteMap, TrashedNote};
pub use notes::NoteRepository;
pub use trash::{RetentionPolicy, TrashMap, TrashRepository};

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export domain extraction for JavaScript access
#[wasm_bindgen(js_name = extractDomain)]
pub fn extract_domain(url: &str) -> String {
    domain::extract_domain(url)
}
