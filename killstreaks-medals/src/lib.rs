//! Medal filter view glue for the medals overview page.

#[cfg(target_arch = "wasm32")]
mod wasm_medals {
    use killstreaks_core::GameSelection;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{Document, Element, Event, HtmlSelectElement, Window};

    /// Selection control on the medals overview page.
    const GAME_SELECT_ID: &str = "game_select";
    /// One panel per game, tagged with its game identifier.
    const PANEL_SELECTOR: &str = ".game-medals";
    const GAME_ID_ATTR: &str = "data-game-id";
    /// Presentation class marking the panels of the selected game.
    const CURRENT_CLASS: &str = "game-medals--current";
    /// Anchor the viewport scrolls back to after a selection change.
    const SCROLL_ANCHOR_ID: &str = "anki_killstreaks";

    /// Attach the filter handler to the game dropdown.
    ///
    /// The overview HTML is rendered by the host before this runs. A page
    /// without the dropdown (no medals yet) is left alone.
    #[wasm_bindgen]
    pub fn install_medals_filter() -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let Some(select) = document.get_element_by_id(GAME_SELECT_ID) else {
            return Ok(());
        };

        let handler = Closure::wrap(Box::new(move |event: Event| {
            on_selection_change(&event);
        }) as Box<dyn FnMut(Event)>);

        select.add_event_listener_with_callback("change", handler.as_ref().unchecked_ref())?;
        handler.forget();

        Ok(())
    }

    fn on_selection_change(event: &Event) {
        let Some(select) = event
            .target()
            .and_then(|target| target.dyn_into::<HtmlSelectElement>().ok())
        else {
            return;
        };
        let selection = GameSelection::parse(&select.value());

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        apply_selection(&document, &selection);
        scroll_to_overview(&window, &document);
    }

    fn apply_selection(document: &Document, selection: &GameSelection) {
        let Ok(panels) = document.query_selector_all(PANEL_SELECTOR) else {
            return;
        };

        for index in 0..panels.length() {
            let Some(panel) = panels
                .item(index)
                .and_then(|node| node.dyn_into::<Element>().ok())
            else {
                continue;
            };

            let game_id = panel.get_attribute(GAME_ID_ATTR).unwrap_or_default();
            let _ = panel
                .class_list()
                .toggle_with_force(CURRENT_CLASS, selection.shows(&game_id));
        }
    }

    /// Keep the horizontal offset, line the vertical offset up with the
    /// overview anchor's current bounding-rect top.
    fn scroll_to_overview(window: &Window, document: &Document) {
        let Some(anchor) = document.get_element_by_id(SCROLL_ANCHOR_ID) else {
            return;
        };

        let top = anchor.get_bounding_client_rect().top();
        let x = window.scroll_x().unwrap_or_default();
        window.scroll_to_with_x_and_y(x, top);
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_medals::install_medals_filter;

#[cfg(not(target_arch = "wasm32"))]
pub fn install_medals_filter() -> Result<(), wasm_bindgen::JsValue> {
    Err(wasm_bindgen::JsValue::from_str(
        "killstreaks-medals only supports the wasm32 target",
    ))
}
