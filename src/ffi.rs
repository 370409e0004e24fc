//! FFI bindings for Synheart Goals
//!
//! This module provides C-compatible functions for calling Goals from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `goals_free_string`.
//!
//! Each engine handle owns a single-threaded tokio runtime; calls on one handle
//! must not be made concurrently from several threads.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Runtime;

use crate::config::EngineConfig;
use crate::pipeline::{profile_to_daily_goals, GoalsEngine};
use crate::profile::InMemoryProfileStore;
use crate::types::BiometricProfile;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize a value to a C string, recording the error on failure
fn json_to_cstr<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn new_runtime() -> Result<Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Calculate goals for a profile JSON and return goals JSON.
///
/// # Safety
/// - `profile_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `goals_free_string`.
/// - Returns NULL on error; call `goals_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn goals_profile_to_daily_goals(profile_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(profile_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let runtime = match new_runtime() {
        Ok(rt) => rt,
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };

    match runtime.block_on(profile_to_daily_goals(&json_str)) {
        Ok(goals) => string_to_cstr(&goals),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Engine API
// ============================================================================

/// Opaque handle to a GoalsEngine backed by an in-memory profile store
pub struct GoalsEngineHandle {
    engine: GoalsEngine,
    store: Arc<InMemoryProfileStore>,
    runtime: Runtime,
}

/// Create a new engine.
///
/// # Safety
/// - `config_json` may be NULL for the default configuration, otherwise it must
///   be a valid null-terminated C string.
/// - Returns a pointer to a newly allocated engine.
/// - Must be freed with `goals_engine_free`.
/// - Returns NULL on error; call `goals_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn goals_engine_new(config_json: *const c_char) -> *mut GoalsEngineHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        EngineConfig::default()
    } else {
        let json_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match EngineConfig::from_json(&json_str) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let runtime = match new_runtime() {
        Ok(rt) => rt,
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };

    let store = Arc::new(InMemoryProfileStore::new());
    let engine = match GoalsEngine::with_config(store.clone(), config) {
        Ok(engine) => engine,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    Box::into_raw(Box::new(GoalsEngineHandle {
        engine,
        store,
        runtime,
    }))
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `goals_engine_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn goals_engine_free(engine: *mut GoalsEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Insert or replace a user's profile.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `goals_engine_new`.
/// - `user_id` and `profile_json` must be valid null-terminated C strings.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `goals_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn goals_engine_upsert_profile(
    engine: *mut GoalsEngineHandle,
    user_id: *const c_char,
    profile_json: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &*engine;

    let user_str = match cstr_to_string(user_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid user_id string pointer");
            return -1;
        }
    };

    let json_str = match cstr_to_string(profile_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match serde_json::from_str::<BiometricProfile>(&json_str) {
        Ok(profile) => {
            handle.store.upsert_profile(user_str, profile);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Calculate today's goals for a user and return goals JSON.
///
/// Unknown users and unusable profiles yield fallback goals, not an error.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `goals_engine_new`.
/// - `user_id` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `goals_free_string`.
/// - Returns NULL on error; call `goals_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn goals_engine_calculate(
    engine: *mut GoalsEngineHandle,
    user_id: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let user_str = match cstr_to_string(user_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid user_id string pointer");
            return ptr::null_mut();
        }
    };

    let goals = handle
        .runtime
        .block_on(handle.engine.calculate_goals(&user_str));
    json_to_cstr(&goals)
}

/// Return the calculation breakdown JSON for a user.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `goals_engine_new`.
/// - `user_id` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `goals_free_string`.
/// - Returns NULL when the user has no usable profile; `goals_last_error` says why.
#[no_mangle]
pub unsafe extern "C" fn goals_engine_breakdown(
    engine: *mut GoalsEngineHandle,
    user_id: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let user_str = match cstr_to_string(user_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid user_id string pointer");
            return ptr::null_mut();
        }
    };

    match handle
        .runtime
        .block_on(handle.engine.get_calculation_breakdown(&user_str))
    {
        Some(breakdown) => json_to_cstr(&breakdown),
        None => {
            set_last_error("No usable profile for user");
            ptr::null_mut()
        }
    }
}

/// Check whether a user has in-bounds goals calculated today.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `goals_engine_new`.
/// - `user_id` must be a valid null-terminated C string.
/// - Returns 1 if valid, 0 if not, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn goals_engine_has_valid_goals(
    engine: *mut GoalsEngineHandle,
    user_id: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &*engine;

    let user_str = match cstr_to_string(user_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid user_id string pointer");
            return -1;
        }
    };

    i32::from(handle.runtime.block_on(handle.engine.has_valid_goals(&user_str)))
}

/// Return performance metrics JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `goals_engine_new`.
/// - Returns a newly allocated string that must be freed with `goals_free_string`.
/// - Returns NULL on error; call `goals_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn goals_engine_metrics(engine: *mut GoalsEngineHandle) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    json_to_cstr(&(*engine).engine.performance_metrics())
}

/// Return performance insights as a JSON array.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `goals_engine_new`.
/// - Returns a newly allocated string that must be freed with `goals_free_string`.
/// - Returns NULL on error; call `goals_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn goals_engine_insights(engine: *mut GoalsEngineHandle) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    json_to_cstr(&(*engine).engine.performance_insights())
}

/// Report host memory usage to the engine's monitor.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `goals_engine_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn goals_engine_record_memory(
    engine: *mut GoalsEngineHandle,
    used_bytes: u64,
    total_bytes: u64,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    (*engine).engine.record_memory_usage(used_bytes, total_bytes);
    0
}

/// Clear performance metrics. The result cache is kept.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `goals_engine_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn goals_engine_reset_metrics(engine: *mut GoalsEngineHandle) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    (*engine).engine.reset_metrics();
    0
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Goals functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Goals function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn goals_free_string(ptr: *mut c_char) {
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
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Goals function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn goals_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Goals library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn goals_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
