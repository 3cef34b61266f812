// Per-thread last-error slot.
//
// The public entry points return `Result`, but callers sitting behind a
// return-code boundary can still fetch the message of the most recent
// failure on their thread. The slot is overwritten on every failing call
// and left untouched on success, so it is only meaningful right after an
// error.

use std::cell::RefCell;

use crate::error::{Error, Result};

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Message of the most recent failure on the calling thread.
///
/// Stale after a successful call; consult it only after an `Err`.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

pub(crate) fn set_last_error(err: &Error) {
    let msg = err.to_string();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(msg));
}

/// Record the error of a failed result in the last-error slot.
pub(crate) fn record<T>(result: Result<T>) -> Result<T> {
    if let Err(ref e) = result {
        set_last_error(e);
    }
    result
}
