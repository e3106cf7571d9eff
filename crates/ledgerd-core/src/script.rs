//! Script sandbox
//!
//! Rule and category scripts are evaluated in a throwaway ECMAScript
//! interpreter: a fresh `boa` context per call, no module cache, no globals
//! carried between evaluations. The host exposes exactly one function,
//! `print(s)`, which deposits its first argument into a capture slot; the
//! slot is read and cleared after evaluation, so the caller of [`Sandbox::eval`]
//! gets the script's "return value" without the engine having one.
//!
//! The slot is thread-local: an interpreter never crosses threads, so the
//! invoking thread's slot is exactly the invocation's slot.

use std::cell::RefCell;
use std::sync::Arc;

use boa_engine::{js_string, Context, JsResult, JsValue, NativeFunction, Source};

use crate::logger::ServiceLog;

thread_local! {
    static CAPTURE: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn native_print(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    if let Some(arg) = args.first() {
        let text = arg.to_string(context)?.to_std_string_escaped();
        CAPTURE.with(|slot| *slot.borrow_mut() = Some(text));
    }
    Ok(JsValue::undefined())
}

#[derive(Clone)]
pub struct Sandbox {
    log: Arc<ServiceLog>,
}

impl Sandbox {
    pub fn new(log: Arc<ServiceLog>) -> Self {
        Self { log }
    }

    /// Evaluate `source` and return whatever the script printed last, or the
    /// empty string when it printed nothing or raised.
    pub fn eval(&self, source: &str) -> String {
        CAPTURE.with(|slot| slot.borrow_mut().take());

        let mut context = Context::default();
        if let Err(e) = context.register_global_builtin_callable(
            js_string!("print"),
            1,
            NativeFunction::from_fn_ptr(native_print),
        ) {
            self.log.error(&format!("sandbox setup failed: {e}"));
            return String::new();
        }

        if let Err(e) = context.eval(Source::from_bytes(source)) {
            self.log.warn(&format!("script error: {e}"));
            return String::new();
        }

        CAPTURE
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_default()
    }
}
