#![cfg(target_arch = "wasm32")]

use wasm_bindgen::prelude::*;

use crate::host::Scheduler;

#[wasm_bindgen]
extern "C" {
	#[wasm_bindgen(js_name = queueMicrotask)]
	fn queue_microtask(closure: &JsValue);
}

pub fn queue<F: FnOnce() + 'static>(func: F) {
	queue_microtask(&Closure::once_into_js(func));
}

/// Scheduler backed by the JS microtask queue. The delay is ignored:
/// microtasks already run after the current turn, in FIFO order.
#[derive(Clone, Copy, Default)]
pub struct MicrotaskScheduler;

impl Scheduler for MicrotaskScheduler {
	fn wait(&self, _delay_ms: u32, callback: Box<dyn FnOnce()>) {
		queue(callback);
	}
}
