//! JS boundary for the chase mode panel: the pycmd handshake and the HTML
//! injection entry point the host evals.

#[cfg(target_arch = "wasm32")]
mod wasm_chase {
    use gloo_timers::callback::Timeout;
    use js_sys::{Function, Reflect};
    use killstreaks_core::{
        BridgeProbe, GlueError, Handshake, HostBridge, RetryPolicy, TickOutcome,
    };
    use serde::Deserialize;
    use serde_wasm_bindgen::from_value;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::console;

    /// Global the host defines once its side of the bridge is up.
    const BRIDGE_GLOBAL: &str = "pycmd";
    /// Element the host-delivered chase mode HTML is rendered into.
    const CHASE_MODE_TARGET_ID: &str = "chase_mode";

    #[derive(Deserialize)]
    struct JsChaseConfig {
        #[serde(default)]
        max_retries: Option<u32>,
        #[serde(default)]
        poll_interval_ms: Option<u64>,
    }

    impl From<JsChaseConfig> for RetryPolicy {
        fn from(cfg: JsChaseConfig) -> Self {
            let mut base = RetryPolicy::default();
            if let Some(retries) = cfg.max_retries {
                base.max_retries = retries;
            }
            if let Some(interval) = cfg.poll_interval_ms {
                base.poll_interval_ms = interval;
            }
            base
        }
    }

    /// `window.pycmd`, looked up fresh on every use.
    struct PycmdBridge;

    impl PycmdBridge {
        fn lookup() -> Option<Function> {
            let window = web_sys::window()?;
            let value = Reflect::get(window.as_ref(), &JsValue::from_str(BRIDGE_GLOBAL)).ok()?;
            value.dyn_into::<Function>().ok()
        }
    }

    impl BridgeProbe for PycmdBridge {
        fn bridge_ready(&self) -> bool {
            Self::lookup().is_some()
        }
    }

    impl HostBridge for PycmdBridge {
        fn send(&self, command: &str) -> Result<(), GlueError> {
            let function = Self::lookup().ok_or_else(|| GlueError::BridgeCall {
                command: command.to_string(),
                reason: "pycmd disappeared before the call".to_string(),
            })?;

            function
                .call1(&JsValue::NULL, &JsValue::from_str(command))
                .map(|_| ())
                .map_err(|err| GlueError::BridgeCall {
                    command: command.to_string(),
                    reason: format!("{err:?}"),
                })
        }
    }

    /// Begin polling for the host bridge. The host's loader calls this once
    /// the module is instantiated; an optional config object overrides the
    /// retry budget and spacing.
    #[wasm_bindgen]
    pub fn start_chase_mode(config: Option<JsValue>) -> Result<(), JsValue> {
        console_error_panic_hook::set_once();

        let policy = match config {
            Some(js_cfg) => {
                let cfg: JsChaseConfig = from_value(js_cfg).map_err(|err| {
                    JsValue::from_str(&format!("could not read chase mode config: {err}"))
                })?;
                RetryPolicy::from(cfg)
            }
            None => RetryPolicy::default(),
        };

        poll_bridge(Handshake::new(policy));
        Ok(())
    }

    /// One poll tick; reschedules by moving the machine into the next
    /// timeout callback, retry counter and all.
    fn poll_bridge(mut handshake: Handshake) {
        let bridge = PycmdBridge;
        match handshake.tick(&bridge, &bridge) {
            Ok(TickOutcome::RetryAfter(delay)) => {
                console::log_1(&JsValue::from_str("Waiting for pycmd"));
                Timeout::new(delay.as_millis() as u32, move || poll_bridge(handshake)).forget();
            }
            Ok(TickOutcome::GaveUp) => {
                console::warn_1(&JsValue::from_str("timed out waiting for pycmd"));
            }
            Ok(TickOutcome::SignalSent) | Ok(TickOutcome::AlreadyDone) => {}
            Err(err) => {
                console::error_1(&JsValue::from_str(&format!(
                    "chase mode handshake failed: {err}"
                )));
            }
        }
    }

    /// Replace the chase mode panel contents with host-delivered HTML.
    ///
    /// The host evals calls to this by JS name, so the export stays
    /// `setChaseModeHTML`. A missing target element is a no-op.
    #[wasm_bindgen(js_name = setChaseModeHTML)]
    pub fn set_chase_mode_html(html: &str) {
        console::debug_1(&JsValue::from_str(html));

        let Some(document) = web_sys::window().and_then(|window| window.document()) else {
            return;
        };
        let Some(target) = document.get_element_by_id(CHASE_MODE_TARGET_ID) else {
            return;
        };
        target.set_inner_html(html);
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_chase::{set_chase_mode_html, start_chase_mode};

#[cfg(not(target_arch = "wasm32"))]
pub fn start_chase_mode(_: Option<wasm_bindgen::JsValue>) -> Result<(), wasm_bindgen::JsValue> {
    Err(wasm_bindgen::JsValue::from_str(
        "killstreaks-chase only supports the wasm32 target",
    ))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn set_chase_mode_html(_: &str) {}
