//! FFI bindings for Win32 Volume.
//!
//! This crate provides C ABI functions for embedding the volume controller
//! in a host runtime. All functions use panic::catch_unwind to prevent Rust
//! panics from unwinding across the FFI boundary.
//!
//! An engine handle is owned by one thread (typically the host's event
//! loop). Asynchronous calls run on the engine's worker pool; their
//! callbacks run on the owning thread when it calls
//! `win32_volume_dispatch_completions` or `win32_volume_wait_idle`.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic;
use std::ptr;
use std::time::Duration;
use win32_volume::audio::ErrorKind;
use win32_volume::{
    AudioError, BoxedProvider, Continuation, ControllerOptions, DispatcherOptions, LevelPolicy,
    VolumeController, VolumeDispatcher,
};

// ============================================================================
// Error Handling
// ============================================================================

/// Error codes returned by FFI functions.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidHandle = -1,
    InvalidArgument = -2,
    /// COM setup, enumeration, missing device or endpoint activation
    DeviceUnavailable = -3,
    JsonError = -5,
    OperationFailed = -7,
    WorkerUnavailable = -8,
    Unsupported = -9,
    Panic = -99,
}

impl From<&AudioError> for ErrorCode {
    fn from(err: &AudioError) -> Self {
        match err {
            AudioError::WorkerSpawn(_) | AudioError::WorkerUnavailable => {
                ErrorCode::WorkerUnavailable
            }
            other => match other.kind() {
                ErrorKind::DeviceUnavailable => ErrorCode::DeviceUnavailable,
                ErrorKind::InvalidArgument => ErrorCode::InvalidArgument,
                ErrorKind::OperationFailed => ErrorCode::OperationFailed,
            },
        }
    }
}

/// Thread-local storage for the last error.
thread_local! {
    static LAST_ERROR: RefCell<Option<(ErrorCode, String)>> = const { RefCell::new(None) };
}

fn set_last_error(code: ErrorCode, message: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some((code, message.into()));
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Record an AudioError as the last error and return its code.
fn record_error(err: &AudioError) -> ErrorCode {
    let code = ErrorCode::from(err);
    set_last_error(code, err.to_string());
    code
}

// ============================================================================
// Configuration
// ============================================================================

/// Level policy as spelled in the configuration JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelPolicyConfig {
    #[default]
    Clamp,
    Reject,
}

impl From<LevelPolicyConfig> for LevelPolicy {
    fn from(policy: LevelPolicyConfig) -> Self {
        match policy {
            LevelPolicyConfig::Clamp => LevelPolicy::Clamp,
            LevelPolicyConfig::Reject => LevelPolicy::Reject,
        }
    }
}

/// Configuration for engine creation.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log filter directive (e.g. "debug"). Logging follows the environment when absent.
    pub log_level: Option<String>,

    /// Worker threads for asynchronous calls, capped at `MAX_WORKER_THREADS`
    pub worker_threads: Option<usize>,

    /// Handling of levels outside [0.0, 1.0]
    pub level_policy: LevelPolicyConfig,
}

/// Upper bound on `worker_threads`.
pub const MAX_WORKER_THREADS: usize = 8;

impl EngineConfig {
    fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            level_policy: self.level_policy.into(),
        }
    }

    fn dispatcher_options(&self) -> DispatcherOptions {
        let defaults = DispatcherOptions::default();
        DispatcherOptions {
            worker_threads: self
                .worker_threads
                .unwrap_or(defaults.worker_threads)
                .clamp(1, MAX_WORKER_THREADS),
        }
    }
}

fn init_logging(config: &EngineConfig) {
    let result = match config.log_level.as_deref() {
        Some(directive) => win32_volume::logging::init_with_filter(directive),
        None => win32_volume::logging::init_logging_from_env(),
    };

    if let Err(e) = result {
        tracing::debug!("Logging not initialized: {}", e);
    }
}

// ============================================================================
// Engine Handle Type
// ============================================================================

/// Opaque handle to the volume engine. Actually points to a VolumeEngine struct.
pub type VolumeEngineHandle = *mut c_void;

/// Completion callback for asynchronous calls: `(success, user_data)`.
pub type CompletionCallback = extern "C" fn(success: bool, user_data: *mut c_void);

/// Internal engine state.
struct VolumeEngine {
    dispatcher: VolumeDispatcher<BoxedProvider>,
}

impl VolumeEngine {
    fn new(provider: BoxedProvider, config: &EngineConfig) -> Result<Self, AudioError> {
        let controller = VolumeController::with_options(provider, config.controller_options());
        let dispatcher = VolumeDispatcher::new(controller, config.dispatcher_options())?;
        Ok(Self { dispatcher })
    }

    fn into_handle(self) -> VolumeEngineHandle {
        Box::into_raw(Box::new(self)) as VolumeEngineHandle
    }
}

#[cfg(windows)]
fn system_provider() -> Result<BoxedProvider, ErrorCode> {
    let provider: BoxedProvider = Box::new(win32_volume::DefaultEndpointProvider::new());
    Ok(provider)
}

#[cfg(not(windows))]
fn system_provider() -> Result<BoxedProvider, ErrorCode> {
    set_last_error(
        ErrorCode::Unsupported,
        "Windows Core Audio is not available on this platform",
    );
    Err(ErrorCode::Unsupported)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Allocate a C string from a Rust string. Caller must free with win32_volume_free_string.
fn alloc_c_string(s: &str) -> *mut c_char {
    let sanitized = s.replace('\0', "");
    CString::new(sanitized)
        .unwrap_or_default()
        .into_raw()
}

/// Parse a C string to a Rust string slice.
unsafe fn parse_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Borrow the engine behind a handle, recording InvalidHandle for null.
unsafe fn engine_ref<'a>(handle: VolumeEngineHandle) -> Option<&'a VolumeEngine> {
    if handle.is_null() {
        set_last_error(ErrorCode::InvalidHandle, "Null engine handle");
        return None;
    }
    Some(&*(handle as *const VolumeEngine))
}

fn continuation_for(
    callback: Option<CompletionCallback>,
    user_data: *mut c_void,
) -> Option<Continuation> {
    callback.map(|cb| -> Continuation { Box::new(move |success| cb(success, user_data)) })
}

// ============================================================================
// FFI Functions - Lifecycle
// ============================================================================

/// Create a new volume engine instance.
///
/// # Arguments
/// * `config_json` - JSON configuration string (can be null for defaults), e.g.
///   `{"log_level": "debug", "worker_threads": 2, "level_policy": "clamp"}`
///
/// # Returns
/// Handle to the engine, or null on failure. Check win32_volume_last_error_code() on failure.
///
/// # Safety
/// The returned handle must be freed with win32_volume_destroy().
#[no_mangle]
pub extern "C" fn win32_volume_create(config_json: *const c_char) -> VolumeEngineHandle {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let config = if config_json.is_null() {
            EngineConfig::default()
        } else {
            let json_str = match unsafe { parse_c_str(config_json) } {
                Some(s) => s,
                None => {
                    set_last_error(ErrorCode::InvalidArgument, "Configuration is not valid UTF-8");
                    return ptr::null_mut();
                }
            };
            match EngineConfig::parse(json_str) {
                Ok(config) => config,
                Err(e) => {
                    set_last_error(ErrorCode::JsonError, format!("Invalid configuration: {e}"));
                    return ptr::null_mut();
                }
            }
        };

        init_logging(&config);

        let provider = match system_provider() {
            Ok(provider) => provider,
            Err(_) => return ptr::null_mut(),
        };

        match VolumeEngine::new(provider, &config) {
            Ok(engine) => engine.into_handle(),
            Err(e) => {
                record_error(&e);
                ptr::null_mut()
            }
        }
    });

    match result {
        Ok(handle) => handle,
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during engine creation");
            ptr::null_mut()
        }
    }
}

/// Destroy a volume engine instance.
///
/// Waits for in-flight asynchronous calls to finish, then runs every callback
/// that has not been dispatched yet on the calling thread.
///
/// # Safety
/// The handle must have been created by win32_volume_create() and must not be used after this call.
#[no_mangle]
pub extern "C" fn win32_volume_destroy(handle: VolumeEngineHandle) {
    if handle.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = Box::from_raw(handle as *mut VolumeEngine);
    });
}

// ============================================================================
// FFI Functions - Volume Operations
// ============================================================================

/// Set the master volume level and wait for the result.
///
/// # Arguments
/// * `handle` - Engine handle
/// * `level` - Volume level (0.0 to 1.0)
///
/// # Returns
/// true on success. On failure check win32_volume_last_error_code().
#[no_mangle]
pub extern "C" fn win32_volume_set_volume_sync(handle: VolumeEngineHandle, level: f32) -> bool {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            return false;
        };

        match engine.dispatcher.controller().set_volume(level) {
            Ok(()) => true,
            Err(e) => {
                record_error(&e);
                false
            }
        }
    });

    result.unwrap_or_else(|_| {
        set_last_error(ErrorCode::Panic, "Panic during set volume");
        false
    })
}

/// Set the master volume level in the background.
///
/// # Arguments
/// * `handle` - Engine handle
/// * `level` - Volume level (0.0 to 1.0)
/// * `callback` - Optional; called once with the success flag when the
///   completion is dispatched
/// * `user_data` - Passed through to the callback
///
/// # Returns
/// 0 when the call was queued, negative error code otherwise.
#[no_mangle]
pub extern "C" fn win32_volume_set_volume(
    handle: VolumeEngineHandle,
    level: f32,
    callback: Option<CompletionCallback>,
    user_data: *mut c_void,
) -> i32 {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            return ErrorCode::InvalidHandle as i32;
        };

        match engine
            .dispatcher
            .set_volume(level, continuation_for(callback, user_data))
        {
            Ok(_) => ErrorCode::Success as i32,
            Err(e) => record_error(&e) as i32,
        }
    });

    result.unwrap_or_else(|_| {
        set_last_error(ErrorCode::Panic, "Panic during set volume");
        ErrorCode::Panic as i32
    })
}

/// Set the master mute state and wait for the result.
///
/// # Returns
/// true on success. On failure check win32_volume_last_error_code().
#[no_mangle]
pub extern "C" fn win32_volume_set_mute_sync(handle: VolumeEngineHandle, muted: bool) -> bool {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            return false;
        };

        match engine.dispatcher.controller().set_mute(muted) {
            Ok(()) => true,
            Err(e) => {
                record_error(&e);
                false
            }
        }
    });

    result.unwrap_or_else(|_| {
        set_last_error(ErrorCode::Panic, "Panic during set mute");
        false
    })
}

/// Set the master mute state in the background.
///
/// # Returns
/// 0 when the call was queued, negative error code otherwise.
#[no_mangle]
pub extern "C" fn win32_volume_set_mute(
    handle: VolumeEngineHandle,
    muted: bool,
    callback: Option<CompletionCallback>,
    user_data: *mut c_void,
) -> i32 {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            return ErrorCode::InvalidHandle as i32;
        };

        match engine
            .dispatcher
            .set_mute(muted, continuation_for(callback, user_data))
        {
            Ok(_) => ErrorCode::Success as i32,
            Err(e) => record_error(&e) as i32,
        }
    });

    result.unwrap_or_else(|_| {
        set_last_error(ErrorCode::Panic, "Panic during set mute");
        ErrorCode::Panic as i32
    })
}

/// Get the master volume level.
///
/// # Returns
/// The level (0.0 to 1.0), or -1.0 on failure. Check win32_volume_last_error_code().
#[no_mangle]
pub extern "C" fn win32_volume_get_volume(handle: VolumeEngineHandle) -> f32 {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            return -1.0;
        };

        match engine.dispatcher.controller().get_volume() {
            Ok(level) => level,
            Err(e) => {
                record_error(&e);
                -1.0
            }
        }
    });

    result.unwrap_or_else(|_| {
        set_last_error(ErrorCode::Panic, "Panic during get volume");
        -1.0
    })
}

/// Get the master mute state.
///
/// # Returns
/// 1 if muted, 0 if not, negative error code on failure.
#[no_mangle]
pub extern "C" fn win32_volume_get_mute(handle: VolumeEngineHandle) -> i32 {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            return ErrorCode::InvalidHandle as i32;
        };

        match engine.dispatcher.controller().get_mute() {
            Ok(muted) => muted as i32,
            Err(e) => record_error(&e) as i32,
        }
    });

    result.unwrap_or_else(|_| {
        set_last_error(ErrorCode::Panic, "Panic during get mute");
        ErrorCode::Panic as i32
    })
}

/// Toggle the master mute state.
///
/// # Returns
/// The new state (1 muted, 0 unmuted), negative error code on failure.
#[no_mangle]
pub extern "C" fn win32_volume_toggle_mute(handle: VolumeEngineHandle) -> i32 {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            return ErrorCode::InvalidHandle as i32;
        };

        match engine.dispatcher.controller().toggle_mute() {
            Ok(muted) => muted as i32,
            Err(e) => record_error(&e) as i32,
        }
    });

    result.unwrap_or_else(|_| {
        set_last_error(ErrorCode::Panic, "Panic during toggle mute");
        ErrorCode::Panic as i32
    })
}

// ============================================================================
// FFI Functions - Completions
// ============================================================================

/// Run the callbacks of finished asynchronous calls on the calling thread.
///
/// # Returns
/// Number of completions delivered, negative error code on failure.
#[no_mangle]
pub extern "C" fn win32_volume_dispatch_completions(handle: VolumeEngineHandle) -> i32 {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            return ErrorCode::InvalidHandle as i32;
        };

        i32::try_from(engine.dispatcher.dispatch_completions()).unwrap_or(i32::MAX)
    });

    result.unwrap_or_else(|_| {
        set_last_error(ErrorCode::Panic, "Panic during completion dispatch");
        ErrorCode::Panic as i32
    })
}

/// Block until every asynchronous call has completed and its callback has
/// run on the calling thread, or until `timeout_ms` elapses.
///
/// # Returns
/// 1 when idle, 0 on timeout, negative error code on failure.
#[no_mangle]
pub extern "C" fn win32_volume_wait_idle(handle: VolumeEngineHandle, timeout_ms: u32) -> i32 {
    clear_last_error();

    let result = panic::catch_unwind(|| {
        let Some(engine) = (unsafe { engine_ref(handle) }) else {
            return ErrorCode::InvalidHandle as i32;
        };

        let timeout = Duration::from_millis(u64::from(timeout_ms));
        engine.dispatcher.run_until_idle(timeout) as i32
    });

    result.unwrap_or_else(|_| {
        set_last_error(ErrorCode::Panic, "Panic while waiting for completions");
        ErrorCode::Panic as i32
    })
}

// ============================================================================
// FFI Functions - Memory Management
// ============================================================================

/// Free a string allocated by this library.
///
/// # Safety
/// The pointer must have been returned by one of the win32_volume_* functions.
/// Do not call this on strings from other sources.
#[no_mangle]
pub extern "C" fn win32_volume_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = CString::from_raw(ptr);
    });
}

// ============================================================================
// FFI Functions - Error Handling
// ============================================================================

/// Get the last error code.
///
/// # Returns
/// The error code from the last failed operation, or 0 if no error.
#[no_mangle]
pub extern "C" fn win32_volume_last_error_code() -> i32 {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(code, _)| *code as i32)
            .unwrap_or(0)
    })
}

/// Get the last error message.
///
/// # Returns
/// Error message string. Caller must free with win32_volume_free_string().
/// Returns null if no error.
#[no_mangle]
pub extern "C" fn win32_volume_last_error_message() -> *mut c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(_, msg)| alloc_c_string(msg))
            .unwrap_or(ptr::null_mut())
    })
}

// ============================================================================
// FFI Functions - Utility
// ============================================================================

/// Get the library version.
///
/// # Returns
/// Version string. Caller must free with win32_volume_free_string().
#[no_mangle]
pub extern "C" fn win32_volume_version() -> *mut c_char {
    alloc_c_string(env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use win32_volume::audio::{PlatformError, VolumeOperation};
    use win32_volume::MemoryEndpointProvider;

    fn memory_engine(provider: &MemoryEndpointProvider, config: &EngineConfig) -> VolumeEngineHandle {
        VolumeEngine::new(Box::new(provider.clone()), config)
            .unwrap()
            .into_handle()
    }

    fn last_error_message() -> String {
        let ptr = win32_volume_last_error_message();
        assert!(!ptr.is_null());
        let msg = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_string() };
        win32_volume_free_string(ptr);
        msg
    }

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(
            ErrorCode::from(&AudioError::NoDefaultDevice(PlatformError::not_found())),
            ErrorCode::DeviceUnavailable
        );
        assert_eq!(
            ErrorCode::from(&AudioError::ComInitFailed(PlatformError::unspecified())),
            ErrorCode::DeviceUnavailable
        );
        assert_eq!(
            ErrorCode::from(&AudioError::EnumeratorUnavailable(PlatformError::unspecified())),
            ErrorCode::DeviceUnavailable
        );
        assert_eq!(
            ErrorCode::from(&AudioError::VolumeNotAvailable(PlatformError::not_found())),
            ErrorCode::DeviceUnavailable
        );
        assert_eq!(
            ErrorCode::from(&AudioError::InvalidLevel(2.0)),
            ErrorCode::InvalidArgument
        );
        assert_eq!(
            ErrorCode::from(&AudioError::operation(
                VolumeOperation::SetMute,
                PlatformError::unspecified()
            )),
            ErrorCode::OperationFailed
        );
        assert_eq!(
            ErrorCode::from(&AudioError::WorkerUnavailable),
            ErrorCode::WorkerUnavailable
        );
    }

    #[test]
    fn test_config_parsing() {
        let config = EngineConfig::parse(r#"{"worker_threads": 4, "level_policy": "reject"}"#).unwrap();
        assert_eq!(config.worker_threads, Some(4));
        assert_eq!(config.level_policy, LevelPolicyConfig::Reject);
        assert!(config.log_level.is_none());

        let defaults = EngineConfig::parse("{}").unwrap();
        assert_eq!(defaults.level_policy, LevelPolicyConfig::Clamp);
        assert_eq!(defaults.dispatcher_options().worker_threads, 2);

        assert!(EngineConfig::parse(r#"{"level_policy": "loud"}"#).is_err());
    }

    #[test]
    fn test_worker_threads_are_bounded() {
        let huge = EngineConfig::parse(r#"{"worker_threads": 100000}"#).unwrap();
        assert_eq!(huge.dispatcher_options().worker_threads, MAX_WORKER_THREADS);

        let zero = EngineConfig::parse(r#"{"worker_threads": 0}"#).unwrap();
        assert_eq!(zero.dispatcher_options().worker_threads, 1);
    }

    #[test]
    fn test_create_rejects_bad_json() {
        let json = CString::new("{not json").unwrap();
        let handle = win32_volume_create(json.as_ptr());
        assert!(handle.is_null());
        assert_eq!(win32_volume_last_error_code(), ErrorCode::JsonError as i32);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_create_unsupported_off_windows() {
        let handle = win32_volume_create(ptr::null());
        assert!(handle.is_null());
        assert_eq!(win32_volume_last_error_code(), ErrorCode::Unsupported as i32);
    }

    #[test]
    fn test_sync_scenario() {
        let provider = MemoryEndpointProvider::new();
        let handle = memory_engine(&provider, &EngineConfig::default());

        assert!(win32_volume_set_volume_sync(handle, 0.5));
        assert!((win32_volume_get_volume(handle) - 0.5).abs() < 1e-6);
        assert!(win32_volume_set_mute_sync(handle, true));
        assert_eq!(win32_volume_get_mute(handle), 1);
        assert!(win32_volume_set_mute_sync(handle, false));
        assert_eq!(win32_volume_get_mute(handle), 0);
        assert_eq!(win32_volume_toggle_mute(handle), 1);
        assert_eq!(win32_volume_last_error_code(), 0);

        win32_volume_destroy(handle);
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_missing_device_is_reported() {
        let provider = MemoryEndpointProvider::without_device();
        let handle = memory_engine(&provider, &EngineConfig::default());

        assert!(!win32_volume_set_volume_sync(handle, 0.5));
        assert_eq!(
            win32_volume_last_error_code(),
            ErrorCode::DeviceUnavailable as i32
        );
        assert!(last_error_message().contains("No default audio output device"));

        assert!(!win32_volume_set_mute_sync(handle, true));
        assert_eq!(win32_volume_get_volume(handle), -1.0);
        assert_eq!(
            win32_volume_get_mute(handle),
            ErrorCode::DeviceUnavailable as i32
        );

        win32_volume_destroy(handle);
    }

    #[test]
    fn test_reject_policy_from_config() {
        let provider = MemoryEndpointProvider::with_state(0.5, false);
        let config = EngineConfig::parse(r#"{"level_policy": "reject"}"#).unwrap();
        let handle = memory_engine(&provider, &config);

        assert!(!win32_volume_set_volume_sync(handle, 1.5));
        assert_eq!(
            win32_volume_last_error_code(),
            ErrorCode::InvalidArgument as i32
        );
        assert_eq!(provider.level(), 0.5);

        win32_volume_destroy(handle);
    }

    #[derive(Default)]
    struct CallLog {
        calls: AtomicUsize,
        successes: AtomicUsize,
    }

    extern "C" fn log_call(success: bool, user_data: *mut c_void) {
        let log = unsafe { &*(user_data as *const CallLog) };
        log.calls.fetch_add(1, Ordering::SeqCst);
        if success {
            log.successes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_async_callbacks_run_once_on_dispatch() {
        let provider = MemoryEndpointProvider::with_state(0.1, false);
        let handle = memory_engine(&provider, &EngineConfig::default());
        let log = CallLog::default();
        let user_data = &log as *const CallLog as *mut c_void;

        assert_eq!(
            win32_volume_set_volume(handle, 0.8, Some(log_call), user_data),
            0
        );
        assert_eq!(
            win32_volume_set_mute(handle, true, Some(log_call), user_data),
            0
        );
        assert_eq!(win32_volume_wait_idle(handle, 5_000), 1);

        assert_eq!(log.calls.load(Ordering::SeqCst), 2);
        assert_eq!(log.successes.load(Ordering::SeqCst), 2);
        assert!((win32_volume_get_volume(handle) - 0.8).abs() < 1e-6);
        assert_eq!(win32_volume_get_mute(handle), 1);
        assert_eq!(win32_volume_dispatch_completions(handle), 0);
        assert_eq!(log.calls.load(Ordering::SeqCst), 2);

        win32_volume_destroy(handle);
    }

    #[test]
    fn test_async_failure_reports_false() {
        let provider = MemoryEndpointProvider::new();
        provider.fail(VolumeOperation::SetLevel);
        let handle = memory_engine(&provider, &EngineConfig::default());
        let log = CallLog::default();
        let user_data = &log as *const CallLog as *mut c_void;

        assert_eq!(
            win32_volume_set_volume(handle, 0.3, Some(log_call), user_data),
            0
        );
        assert_eq!(win32_volume_wait_idle(handle, 5_000), 1);
        assert_eq!(log.calls.load(Ordering::SeqCst), 1);
        assert_eq!(log.successes.load(Ordering::SeqCst), 0);

        win32_volume_destroy(handle);
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_destroy_delivers_undispatched_callbacks() {
        let provider = MemoryEndpointProvider::new();
        let handle = memory_engine(&provider, &EngineConfig::default());
        let log = CallLog::default();
        let user_data = &log as *const CallLog as *mut c_void;

        assert_eq!(
            win32_volume_set_mute(handle, true, Some(log_call), user_data),
            0
        );
        win32_volume_destroy(handle);

        assert_eq!(log.calls.load(Ordering::SeqCst), 1);
        assert_eq!(log.successes.load(Ordering::SeqCst), 1);
        assert!(provider.is_muted());
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_async_without_callback() {
        let provider = MemoryEndpointProvider::with_state(0.9, false);
        let handle = memory_engine(&provider, &EngineConfig::default());

        assert_eq!(
            win32_volume_set_volume(handle, 0.2, None, ptr::null_mut()),
            0
        );
        assert_eq!(win32_volume_wait_idle(handle, 5_000), 1);
        assert_eq!(provider.level(), 0.2);

        win32_volume_destroy(handle);
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_null_handle() {
        assert!(!win32_volume_set_volume_sync(ptr::null_mut(), 0.5));
        assert_eq!(
            win32_volume_last_error_code(),
            ErrorCode::InvalidHandle as i32
        );
        assert_eq!(win32_volume_get_volume(ptr::null_mut()), -1.0);
        assert_eq!(
            win32_volume_get_mute(ptr::null_mut()),
            ErrorCode::InvalidHandle as i32
        );
        assert_eq!(
            win32_volume_set_mute(ptr::null_mut(), true, None, ptr::null_mut()),
            ErrorCode::InvalidHandle as i32
        );
        win32_volume_destroy(ptr::null_mut());
    }

    #[test]
    fn test_version() {
        let version = win32_volume_version();
        assert!(!version.is_null());
        unsafe {
            let s = CStr::from_ptr(version).to_str().unwrap();
            assert!(!s.is_empty());
        }
        win32_volume_free_string(version);
    }
}
