//! FFI bindings for Synheart Health
//!
//! C-compatible entry points for the pure normalization pieces: vocabulary
//! lookups and sleep reconstruction. Queries that need a native store go
//! through [`crate::bridge::HealthBridge`] on the host side instead.
//!
//! All functions take null-terminated C strings and return allocated strings
//! that must be freed with `health_free_string`.

use serde::Deserialize;
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::schema::SleepRequest;
use crate::sleep::SleepReconstructor;
use crate::store::RawSleepStage;
use crate::types::Platform;
use crate::vocabulary::{vocabulary_for, PlatformVocabulary};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

unsafe fn vocabulary_arg(platform: *const c_char) -> Result<&'static dyn PlatformVocabulary, String> {
    let name = cstr_to_string(platform).ok_or_else(|| "Invalid platform string pointer".to_string())?;
    Platform::parse(&name)
        .map(vocabulary_for)
        .ok_or_else(|| format!("Unknown platform: {name}"))
}

/// Input of `health_reconstruct_sleep`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SleepReconstruction {
    platform: Platform,
    #[serde(flatten)]
    range: SleepRequest,
    records: Vec<RawSleepStage>,
    #[serde(default)]
    config: BridgeConfig,
}

fn reconstruct_sleep_json(json: &str) -> Result<String, BridgeError> {
    let input: SleepReconstruction = serde_json::from_str(json)?;
    input.config.validate()?;
    let range = input.range.validate()?;
    let sessions = SleepReconstructor::new(vocabulary_for(input.platform), &input.config)
        .reconstruct(input.records, range);
    Ok(serde_json::to_string(&sessions)?)
}

// ============================================================================
// Sleep
// ============================================================================

/// Rebuild sleep sessions from raw stage records.
///
/// Input is a JSON object `{platform, startDate, endDate, records, config?}`;
/// output is a JSON array of sleep sessions.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `health_free_string`.
/// - Returns NULL on error; call `health_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn health_reconstruct_sleep(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match reconstruct_sleep_json(&json_str) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Vocabulary
// ============================================================================

/// Canonical workout type for a native activity code.
///
/// # Safety
/// - `platform` must be a valid null-terminated C string
///   (`health-connect` or `healthkit`).
/// - Returns a newly allocated string that must be freed with `health_free_string`.
/// - Returns NULL on error; call `health_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn health_workout_type(platform: *const c_char, code: i64) -> *mut c_char {
    clear_last_error();

    match vocabulary_arg(platform) {
        Ok(vocab) => string_to_cstr(vocab.workout_type(code)),
        Err(msg) => {
            set_last_error(&msg);
            ptr::null_mut()
        }
    }
}

/// Canonical sleep stage name for a native stage code.
///
/// # Safety
/// - `platform` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `health_free_string`.
/// - Returns NULL on error; call `health_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn health_sleep_stage(platform: *const c_char, code: i64) -> *mut c_char {
    clear_last_error();

    match vocabulary_arg(platform) {
        Ok(vocab) => string_to_cstr(vocab.sleep_stage(code).as_str()),
        Err(msg) => {
            set_last_error(&msg);
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a `health_*` function.
///
/// # Safety
/// - `ptr` must be a pointer returned by this library, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn health_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string, valid until the next
///   `health_*` call on this thread. Do NOT free it.
/// - Returns NULL if the last call succeeded.
#[no_mangle]
pub unsafe extern "C" fn health_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn health_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
