// src/engine/common.rs
//
// Common utilities shared across engine modules.

use crate::error::ImagingError;
use std::panic::{self, AssertUnwindSafe};

/// Result type used by every engine stage. Always carries ImagingError so
/// the error kind survives from the codec up to the handle.
pub type EngineResult<T> = std::result::Result<T, ImagingError>;

/// Run a codec call, turning a panic inside third-party code into an
/// `InternalPanic` that names the stage.
///
/// Codec crates occasionally panic on hostile input instead of returning an
/// error; the handle must stay usable after a failed call.
pub fn run_with_panic_policy<T, F>(stage: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(ImagingError::internal_panic(format!("{stage}: {detail}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn passes_through_ok_and_err() {
        assert_eq!(run_with_panic_policy("t", || Ok(3)).unwrap(), 3);
        let err = run_with_panic_policy::<(), _>("t", || Err(ImagingError::decode_failed("x")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn converts_panic_to_internal_error_with_stage() {
        let err = run_with_panic_policy::<(), _>("decode:test", || panic!("codec exploded"))
            .unwrap_err();
        assert!(matches!(err, ImagingError::InternalPanic { .. }));
        let msg = err.to_string();
        assert!(msg.contains("decode:test"));
        assert!(msg.contains("codec exploded"));
    }
}
