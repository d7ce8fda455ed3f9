//! Plug-in ABI and loader (spec §4.D, §6): a `dlopen`/`dlsym`/`dlclose`
//! loader generalized from one fixed init symbol to the four configurable
//! entry points the spec requires, with a real unload path on `Drop` rather
//! than leaking the handle on the happy path.

use crate::error::ControllerError;
use std::ffi::{c_char, c_void, CString};
use std::os::raw::c_int;
use std::sync::atomic::{AtomicU8, Ordering};

pub type PluginInstance = *mut c_void;
pub type EnginePrivateData = *mut c_void;

pub type ActionDoneCb = unsafe extern "C" fn(priv_data: EnginePrivateData, success: bool);

/// Mirrors `Controller.h`'s four required entry points.
pub type InitFn = unsafe extern "C" fn(out_instance: *mut PluginInstance, engine_functions: *const EngineFunctions) -> c_int;
pub type UninitFn = unsafe extern "C" fn(instance: PluginInstance) -> c_int;
pub type OnCommandFn = unsafe extern "C" fn(instance: PluginInstance, data: *const c_char);
pub type OnEventFn = unsafe extern "C" fn(instance: PluginInstance, event_id: u32, name: *const c_char);

/// Passed to a plug-in's `init`. `engine_private_data` is opaque to the
/// plug-in and passed back verbatim on every call into the engine; we
/// encode the plug-in's arena index into it rather than a real pointer
/// back to the bus (spec §9 "Cyclic references").
#[repr(C)]
pub struct EngineFunctions {
    pub register_events: unsafe extern "C" fn(priv_data: EnginePrivateData, mask: u8),
    pub unregister_events: unsafe extern "C" fn(priv_data: EnginePrivateData, mask: u8),
    pub send_to_engine: unsafe extern "C" fn(priv_data: EnginePrivateData, command_id: u32, data: *const c_char, cb: Option<ActionDoneCb>),
    pub send_to_library: unsafe extern "C" fn(priv_data: EnginePrivateData, library_name: *const c_char, data: *const c_char, cb: Option<ActionDoneCb>),
    pub engine_private_data: EnginePrivateData,
}

/// Symbol names configured per library (spec §4.D loader: "`{path,
/// initSymbolName, uninitSymbolName, onCommandSymbolName,
/// onEventSymbolName}`").
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub path: String,
    pub init_symbol: String,
    pub uninit_symbol: String,
    pub on_command_symbol: String,
    pub on_event_symbol: String,
}

/// One loaded plug-in (spec §3 `ControllerLib`). `eventsMask` is mutated
/// only under the events-task lock; callers reach it through `ControllerBus`.
pub struct ControllerLib {
    pub path: String,
    handle: *mut c_void,
    uninit: UninitFn,
    pub(crate) on_command: OnCommandFn,
    pub(crate) on_event: OnEventFn,
    pub(crate) instance: PluginInstance,
    pub events_mask: AtomicU8,
}

/// A `Copy` handle to one plug-in's `onEvent` entry point, extracted while
/// the arena lock is held so the call itself can happen with the lock
/// released (spec §5 "Event library list ... with the lock released
/// around the plug-in callback").
#[derive(Clone, Copy)]
pub struct EventCallHandle {
    on_event: OnEventFn,
    instance: PluginInstance,
}

impl EventCallHandle {
    pub fn call(&self, event_id: u32, name: &str) {
        let name_c = CString::new(name).unwrap_or_default();
        unsafe { (self.on_event)(self.instance, event_id, name_c.as_ptr()) };
    }
}

/// Same idea for the library queue's cross-plug-in `onCommand` delivery.
#[derive(Clone, Copy)]
pub struct CommandCallHandle {
    on_command: OnCommandFn,
    instance: PluginInstance,
}

impl CommandCallHandle {
    pub fn call(&self, data: &str) {
        let data_c = CString::new(data).unwrap_or_default();
        unsafe { (self.on_command)(self.instance, data_c.as_ptr()) };
    }
}

unsafe impl Send for ControllerLib {}
unsafe impl Sync for ControllerLib {}

impl ControllerLib {
    /// Open `config.path`, resolve its four symbols, and call `init`. The
    /// index this plug-in will occupy in the bus's arena is threaded
    /// through as the opaque `engine_private_data`.
    pub fn load(config: &LibraryConfig, arena_index: usize, engine_functions_template: &EngineFunctionsTemplate) -> Result<ControllerLib, ControllerError> {
        let path_c = CString::new(config.path.clone()).expect("plug-in path must not contain NUL bytes");
        let handle = unsafe { libc::dlopen(path_c.as_ptr(), libc::RTLD_NOW) };
        if handle.is_null() {
            return Err(ControllerError::OpenFailed(config.path.clone()));
        }

        macro_rules! resolve {
            ($symbol:expr, $ty:ty) => {{
                let name = CString::new($symbol.clone()).expect("symbol name must not contain NUL bytes");
                let ptr = unsafe { libc::dlsym(handle, name.as_ptr()) };
                if ptr.is_null() {
                    unsafe { libc::dlclose(handle) };
                    return Err(ControllerError::MissingSymbol {
                        path: config.path.clone(),
                        symbol: $symbol.clone(),
                    });
                }
                unsafe { std::mem::transmute::<*mut c_void, $ty>(ptr) }
            }};
        }

        let init: InitFn = resolve!(config.init_symbol, InitFn);
        let uninit: UninitFn = resolve!(config.uninit_symbol, UninitFn);
        let on_command: OnCommandFn = resolve!(config.on_command_symbol, OnCommandFn);
        let on_event: OnEventFn = resolve!(config.on_event_symbol, OnEventFn);

        let engine_functions = EngineFunctions {
            register_events: engine_functions_template.register_events,
            unregister_events: engine_functions_template.unregister_events,
            send_to_engine: engine_functions_template.send_to_engine,
            send_to_library: engine_functions_template.send_to_library,
            engine_private_data: arena_index as EnginePrivateData,
        };

        let mut instance: PluginInstance = std::ptr::null_mut();
        let rc = unsafe { init(&mut instance, &engine_functions) };
        if rc != 0 {
            unsafe { libc::dlclose(handle) };
            return Err(ControllerError::InitFailed(config.path.clone()));
        }

        Ok(ControllerLib {
            path: config.path.clone(),
            handle,
            uninit,
            on_command,
            on_event,
            instance,
            events_mask: AtomicU8::new(0),
        })
    }

    pub fn event_handle(&self) -> EventCallHandle {
        EventCallHandle {
            on_event: self.on_event,
            instance: self.instance,
        }
    }

    pub fn command_handle(&self) -> CommandCallHandle {
        CommandCallHandle {
            on_command: self.on_command,
            instance: self.instance,
        }
    }

    pub fn register_events(&self, mask: u8) {
        self.events_mask.fetch_or(mask, Ordering::SeqCst);
    }

    pub fn unregister_events(&self, mask: u8) {
        self.events_mask.fetch_and(!mask, Ordering::SeqCst);
    }
}

impl Drop for ControllerLib {
    fn drop(&mut self) {
        unsafe {
            (self.uninit)(self.instance);
            if !self.handle.is_null() {
                libc::dlclose(self.handle);
            }
        }
    }
}

#[cfg(test)]
unsafe extern "C" fn noop_uninit(_instance: PluginInstance) -> c_int {
    0
}

#[cfg(test)]
impl ControllerLib {
    /// Builds a `ControllerLib` without `dlopen`, for tests that exercise
    /// queue dispatch without a real shared object on disk.
    pub(crate) fn test_stub(path: &str, on_command: OnCommandFn, on_event: OnEventFn, events_mask: u8) -> ControllerLib {
        ControllerLib {
            path: path.to_string(),
            handle: std::ptr::null_mut(),
            uninit: noop_uninit,
            on_command,
            on_event,
            instance: std::ptr::null_mut(),
            events_mask: AtomicU8::new(events_mask),
        }
    }
}

/// The three free-function entry points every loaded plug-in shares; only
/// `engine_private_data` differs per plug-in (its arena index).
pub struct EngineFunctionsTemplate {
    pub register_events: unsafe extern "C" fn(EnginePrivateData, u8),
    pub unregister_events: unsafe extern "C" fn(EnginePrivateData, u8),
    pub send_to_engine: unsafe extern "C" fn(EnginePrivateData, u32, *const c_char, Option<ActionDoneCb>),
    pub send_to_library: unsafe extern "C" fn(EnginePrivateData, *const c_char, *const c_char, Option<ActionDoneCb>),
}
