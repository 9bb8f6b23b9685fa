mod backend;
mod catalog;
mod commands;
mod config;
mod input;
mod renderer;
mod state;
mod storage;
mod terminal;
mod typewriter;
mod utils;

use crate::backend::{HttpCommentBackend, AUTH_ROUTE, COMMENT_ROUTE};
use crate::config::TerminalConfig;
use crate::input::PageTerminal;
use crate::renderer::Renderer;
use crate::state::Session;
use crate::storage::LocalStorageFlag;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    spawn_local(async {
        if let Err(err) = boot().await {
            utils::log(&format!("Failed to start terminal: {:?}", err));
        }
    });

    Ok(())
}

async fn boot() -> Result<(), JsValue> {
    let config = TerminalConfig::load().await;

    let session = Rc::new(RefCell::new(Session::new()));
    let renderer = Rc::new(Renderer::new()?);
    let backend = Rc::new(HttpCommentBackend::new(
        config.endpoint(AUTH_ROUTE),
        config.endpoint(COMMENT_ROUTE),
    ));
    let terminal: Rc<PageTerminal> = Rc::new(PageTerminal::new(
        session,
        renderer,
        backend,
        Box::new(LocalStorageFlag::new()),
        config,
    ));

    input::install_listeners(Rc::clone(&terminal))?;

    if let Some(hash) = utils::location_hash() {
        terminal.open_deep_link(&hash).await;
    }

    Ok(())
}
