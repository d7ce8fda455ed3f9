//! `ControllerBus` (spec §3/§4.D): the plug-in arena plus the three
//! independent queue tasks (command, event, library) that drain it.
//!
//! Only one bus is ever active in a process. The four `extern "C"`
//! functions handed to every plug-in as `EngineFunctions` have no way to
//! close over a Rust closure, so they resolve the active bus through
//! `ACTIVE_BUS`, a process-wide weak reference set on `spawn` and cleared on
//! `shutdown`.

use crate::command_table::{self, CommandId};
use crate::error::ControllerError;
use crate::events::EventEnvelope;
use crate::facade::ControlFacade;
use crate::plugin::{ActionDoneCb, ControllerLib, EngineFunctionsTemplate, EnginePrivateData, LibraryConfig};
use crate::queue::WorkQueue;
use parking_lot::Mutex;
use relaycast_core::task::QuitFlag;
use std::ffi::{c_char, CStr};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

static ACTIVE_BUS: Mutex<Option<Weak<ControllerBus>>> = Mutex::new(None);

struct CommandJob {
    id: CommandId,
    data: String,
    priv_data: EnginePrivateData,
    callback: Option<ActionDoneCb>,
}
unsafe impl Send for CommandJob {}

struct LibraryJob {
    library_name: String,
    data: String,
    priv_data: EnginePrivateData,
    callback: Option<ActionDoneCb>,
}
unsafe impl Send for LibraryJob {}

pub struct ControllerBus {
    /// The plug-in arena. Index-stable: plug-ins are only ever appended,
    /// never removed individually, so `engine_private_data` (an arena
    /// index) stays valid for the bus's whole lifetime (spec §9 "Cyclic
    /// references").
    libraries: Mutex<Vec<ControllerLib>>,
    facade: Arc<ControlFacade>,
    command_queue: WorkQueue<CommandJob>,
    event_queue: WorkQueue<EventEnvelope>,
    library_queue: WorkQueue<LibraryJob>,
    quit: QuitFlag,
    command_handle: Mutex<Option<JoinHandle<()>>>,
    event_handle: Mutex<Option<JoinHandle<()>>>,
    library_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ControllerBus {
    /// Load every configured plug-in in order, then start the three queue
    /// tasks. If a plug-in fails to load, every library loaded before it is
    /// unloaded in reverse order and the failure is returned (spec §4.D
    /// "Loader").
    pub fn spawn(facade: Arc<ControlFacade>, configs: &[LibraryConfig]) -> Result<Arc<ControllerBus>, ControllerError> {
        let bus = Arc::new(ControllerBus {
            libraries: Mutex::new(Vec::new()),
            facade,
            command_queue: WorkQueue::new(),
            event_queue: WorkQueue::new(),
            library_queue: WorkQueue::new(),
            quit: QuitFlag::new(),
            command_handle: Mutex::new(None),
            event_handle: Mutex::new(None),
            library_handle: Mutex::new(None),
        });

        *ACTIVE_BUS.lock() = Some(Arc::downgrade(&bus));
        bus.facade.bind_bus(Arc::downgrade(&bus));

        if let Err(err) = bus.load_all(configs) {
            *ACTIVE_BUS.lock() = None;
            return Err(err);
        }

        let command_bus = bus.clone();
        let command_handle = relaycast_core::task::spawn_named("relaycast-controller-command", move || {
            run_command_queue(&command_bus);
        })
        .map_err(ControllerError::Task)?;

        let event_bus = bus.clone();
        let event_handle = relaycast_core::task::spawn_named("relaycast-controller-event", move || {
            run_event_queue(&event_bus);
        })
        .map_err(ControllerError::Task)?;

        let library_bus = bus.clone();
        let library_handle = relaycast_core::task::spawn_named("relaycast-controller-library", move || {
            run_library_queue(&library_bus);
        })
        .map_err(ControllerError::Task)?;

        *bus.command_handle.lock() = Some(command_handle);
        *bus.event_handle.lock() = Some(event_handle);
        *bus.library_handle.lock() = Some(library_handle);
        Ok(bus)
    }

    fn load_all(&self, configs: &[LibraryConfig]) -> Result<(), ControllerError> {
        let template = EngineFunctionsTemplate {
            register_events: ffi_register_events,
            unregister_events: ffi_unregister_events,
            send_to_engine: ffi_send_to_engine,
            send_to_library: ffi_send_to_library,
        };

        for config in configs {
            let arena_index = self.libraries.lock().len();
            match ControllerLib::load(config, arena_index, &template) {
                Ok(lib) => self.libraries.lock().push(lib),
                Err(err) => {
                    tracing::warn!(path = %config.path, error = %err, "plug-in failed to load, rolling back");
                    let mut libraries = self.libraries.lock();
                    while let Some(loaded) = libraries.pop() {
                        drop(loaded);
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// `stop` (spec §4.D): set `quit`, wake all three queues, join the
    /// tasks, then unload every plug-in in reverse load order.
    pub fn shutdown(&self) {
        self.quit.set();
        self.command_queue.wake();
        self.event_queue.wake();
        self.library_queue.wake();

        if let Some(handle) = self.command_handle.lock().take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.event_handle.lock().take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.library_handle.lock().take() {
            let _ = handle.join();
        }

        self.command_queue.clear();
        self.event_queue.clear();
        self.library_queue.clear();

        let mut libraries = self.libraries.lock();
        while let Some(loaded) = libraries.pop() {
            drop(loaded);
        }
    }

    /// Post a fully-formed command to the command queue (spec §4.D). Used
    /// both by `ffi_send_to_engine` and directly by callers that don't go
    /// through a plug-in (e.g. a local UI event).
    pub fn post_command(&self, id: CommandId, data: &str) {
        self.command_queue.push(CommandJob {
            id,
            data: data.to_string(),
            priv_data: std::ptr::null_mut(),
            callback: None,
        });
    }

    /// Post an event to every plug-in with a matching registration (spec
    /// §4.D "Event dispatch"). Dispatch is first-match: the first plug-in
    /// whose `eventsMask` intersects the event's bit receives it and no
    /// other does (spec §9 open question, preserved as specified).
    pub fn post_event(&self, event: EventEnvelope) {
        self.event_queue.push(event);
    }
}

fn run_command_queue(bus: &Arc<ControllerBus>) {
    loop {
        let job = match bus.command_queue.wait_and_pop() {
            Some(envelope) => envelope.value,
            None => {
                if bus.quit.is_set() {
                    return;
                }
                continue;
            }
        };
        if bus.quit.is_set() {
            return;
        }
        bus.facade.dispatch_command(job.id, &job.data);
        if let Some(cb) = job.callback {
            unsafe { cb(job.priv_data, true) };
        }
    }
}

fn run_event_queue(bus: &Arc<ControllerBus>) {
    loop {
        let event = match bus.event_queue.wait_and_pop() {
            Some(envelope) => envelope.value,
            None => {
                if bus.quit.is_set() {
                    return;
                }
                continue;
            }
        };
        if bus.quit.is_set() {
            return;
        }

        let bit = event.kind.bit();
        // Extract a call handle while the lock is held, then call with it
        // released (spec §5: "the library's onEvent runs with the events
        // lock released and retaken around the call").
        let handle = {
            let libraries = bus.libraries.lock();
            libraries
                .iter()
                .find(|lib| lib.events_mask.load(std::sync::atomic::Ordering::SeqCst) & bit != 0)
                .map(|lib| lib.event_handle())
        };
        if let Some(handle) = handle {
            handle.call(bit as u32, &event.name);
        }
    }
}

fn run_library_queue(bus: &Arc<ControllerBus>) {
    loop {
        let job = match bus.library_queue.wait_and_pop() {
            Some(envelope) => envelope.value,
            None => {
                if bus.quit.is_set() {
                    return;
                }
                continue;
            }
        };
        if bus.quit.is_set() {
            return;
        }

        // Substring match against each loaded plug-in's configured path
        // (spec §4.D "Library queue"). Preserved as specified; the spec's
        // open question flags that two configured paths can both contain
        // the addressed name, in which case the first match in load order
        // wins and the collision is only visible in logs.
        let handle = {
            let libraries = bus.libraries.lock();
            let matches: Vec<_> = libraries
                .iter()
                .filter(|lib| lib.path.contains(&job.library_name))
                .collect();
            if matches.len() > 1 {
                tracing::warn!(
                    library_name = %job.library_name,
                    candidates = matches.len(),
                    "library queue address matched more than one plug-in path; using the first"
                );
            }
            matches.first().map(|lib| lib.command_handle())
        };
        let delivered = handle.is_some();
        if let Some(handle) = handle {
            handle.call(&job.data);
        }
        if let Some(cb) = job.callback {
            unsafe { cb(job.priv_data, delivered) };
        }
    }
}

fn with_active_bus<R>(f: impl FnOnce(&Arc<ControllerBus>) -> R) -> Option<R> {
    let bus = ACTIVE_BUS.lock().as_ref()?.upgrade()?;
    Some(f(&bus))
}

unsafe fn cstr_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

fn arena_index(priv_data: EnginePrivateData) -> usize {
    priv_data as usize
}

unsafe extern "C" fn ffi_register_events(priv_data: EnginePrivateData, mask: u8) {
    with_active_bus(|bus| {
        let libraries = bus.libraries.lock();
        if let Some(lib) = libraries.get(arena_index(priv_data)) {
            lib.register_events(mask);
        }
    });
}

unsafe extern "C" fn ffi_unregister_events(priv_data: EnginePrivateData, mask: u8) {
    with_active_bus(|bus| {
        let libraries = bus.libraries.lock();
        if let Some(lib) = libraries.get(arena_index(priv_data)) {
            lib.unregister_events(mask);
        }
    });
}

unsafe extern "C" fn ffi_send_to_engine(
    priv_data: EnginePrivateData,
    command_id: u32,
    data: *const c_char,
    cb: Option<ActionDoneCb>,
) {
    let Some(id) = CommandId::from_u32(command_id) else {
        tracing::warn!(command_id, "plug-in sent an unknown command id");
        if let Some(cb) = cb {
            cb(priv_data, false);
        }
        return;
    };
    let data = cstr_to_string(data);
    with_active_bus(|bus| {
        bus.command_queue.push(CommandJob {
            id,
            data,
            priv_data,
            callback: cb,
        });
    });
}

unsafe extern "C" fn ffi_send_to_library(
    priv_data: EnginePrivateData,
    library_name: *const c_char,
    data: *const c_char,
    cb: Option<ActionDoneCb>,
) {
    let library_name = cstr_to_string(library_name);
    let data = cstr_to_string(data);
    with_active_bus(|bus| {
        bus.library_queue.push(LibraryJob {
            library_name,
            data,
            priv_data,
            callback: cb,
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::HandlerCatalogue;
    use std::sync::Mutex as StdMutex;

    struct RecordingCatalogue(StdMutex<Vec<(CommandId, String)>>);

    impl HandlerCatalogue for RecordingCatalogue {
        fn handle_command(&self, envelope: crate::facade::CommandEnvelope) {
            self.0.lock().unwrap().push((CommandId::CloseApplication, envelope.handler_data));
        }
    }

    #[test]
    fn command_id_round_trips_through_numeric_form() {
        for spec in command_table::COMMAND_TABLE {
            assert_eq!(CommandId::from_u32(spec.id.as_u32()), Some(spec.id));
        }
    }

    #[test]
    fn bus_with_no_plugins_starts_and_stops_cleanly() {
        let facade = Arc::new(ControlFacade::new());
        let recording = Arc::new(RecordingCatalogue(StdMutex::new(Vec::new())));
        facade.set_catalogue(recording);
        let bus = ControllerBus::spawn(facade, &[]).expect("bus starts with an empty plug-in list");
        bus.post_command(CommandId::TakeScreenshot, "");
        std::thread::sleep(std::time::Duration::from_millis(50));
        bus.shutdown();
    }

    static EVENT_HITS: StdMutex<Vec<&'static str>> = StdMutex::new(Vec::new());

    unsafe extern "C" fn record_a_on_event(_instance: crate::plugin::PluginInstance, _event_id: u32, _name: *const c_char) {
        EVENT_HITS.lock().unwrap().push("a");
    }
    unsafe extern "C" fn record_b_on_event(_instance: crate::plugin::PluginInstance, _event_id: u32, _name: *const c_char) {
        EVENT_HITS.lock().unwrap().push("b");
    }
    unsafe extern "C" fn unused_on_command(_instance: crate::plugin::PluginInstance, _data: *const c_char) {}

    #[test]
    fn event_dispatch_is_first_match_by_registered_mask() {
        // S5 — both plug-ins register EVENT_STARTED; load order decides.
        EVENT_HITS.lock().unwrap().clear();
        let facade = Arc::new(ControlFacade::new());
        let bus = ControllerBus::spawn(facade, &[]).expect("bus starts with an empty plug-in list");
        {
            let mut libraries = bus.libraries.lock();
            libraries.push(ControllerLib::test_stub("plug_a.so", unused_on_command, record_a_on_event, crate::events::EVENT_STARTED));
            libraries.push(ControllerLib::test_stub("plug_b.so", unused_on_command, record_b_on_event, crate::events::EVENT_STARTED));
        }
        bus.post_event(EventEnvelope {
            kind: crate::events::EventKind::Started,
            name: "video0".to_string(),
        });
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(*EVENT_HITS.lock().unwrap(), vec!["a"]);
        bus.shutdown();
    }

    #[test]
    fn facade_handle_click_posts_clicked_to_the_bound_bus() {
        // Confirms the facade's handleClick reaches the same bus it was
        // spawned with, with no caller-supplied wiring.
        EVENT_HITS.lock().unwrap().clear();
        let facade = Arc::new(ControlFacade::new());
        let bus = ControllerBus::spawn(facade.clone(), &[]).expect("bus starts with an empty plug-in list");
        {
            let mut libraries = bus.libraries.lock();
            libraries.push(ControllerLib::test_stub("plug_c.so", unused_on_command, record_a_on_event, crate::events::EVENT_CLICKED));
        }
        facade.handle_click("btn1");
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(*EVENT_HITS.lock().unwrap(), vec!["a"]);
        bus.shutdown();
    }
}
