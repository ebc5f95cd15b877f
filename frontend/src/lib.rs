mod app;
mod browser;
mod transport;

use sauron::prelude::*;

pub use app::{Intent, Model, Msg};

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_tracing::set_as_global_default();
    tracing::info!("starting task manager frontend");
    Program::mount_to_body(Model::default());
}
