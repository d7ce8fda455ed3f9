//! Control facade (spec §4.E): the single named component every other
//! component addresses; everything else is a sibling.

use crate::bus::ControllerBus;
use crate::command_table::{self, CommandId};
use crate::events::{EventEnvelope, EventKind};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// A fully-resolved command ready for the UI/graphics layer, built from a
/// plug-in's `ControllerCommand{id, data}` by looking `id` up in
/// `command_table::COMMAND_TABLE` (spec §3 `CommandEnvelope`).
#[derive(Debug, Clone)]
pub struct CommandEnvelope {
    pub handler_name: &'static str,
    pub gfx_element_name: Option<String>,
    pub handler_data: String,
}

/// Implemented by whatever owns the graphics/video/server/client
/// collaborators; the facade is the uniform entry point into it.
pub trait HandlerCatalogue: Send + Sync {
    fn handle_command(&self, envelope: CommandEnvelope);

    /// Runs the clicked element's click-handler list. The default does
    /// nothing, for catalogues with no graphics layer of their own.
    fn handle_click(&self, element_name: &str) {
        let _ = element_name;
    }
}

/// Built from a plug-in's raw `(id, data)` pair (spec §4.D).
pub fn build_envelope(id: CommandId, data: &str) -> CommandEnvelope {
    let spec = command_table::lookup(id);
    if spec.data_contains_element_name {
        let (element, rest) = data.split_once(';').unwrap_or((data, ""));
        CommandEnvelope {
            handler_name: spec.handler_name,
            gfx_element_name: Some(element.to_string()),
            handler_data: rest.to_string(),
        }
    } else {
        CommandEnvelope {
            handler_name: spec.handler_name,
            gfx_element_name: None,
            handler_data: data.to_string(),
        }
    }
}

pub struct ControlFacade {
    catalogue: Mutex<Option<Arc<dyn HandlerCatalogue>>>,
    /// Set by `ControllerBus::spawn` once the bus exists, so `handleClick`
    /// can post back to it without the facade holding a strong `Arc` (the
    /// bus already owns the facade; a strong ref back would cycle).
    bus: Mutex<Option<Weak<ControllerBus>>>,
}

impl ControlFacade {
    pub fn new() -> Self {
        ControlFacade {
            catalogue: Mutex::new(None),
            bus: Mutex::new(None),
        }
    }

    pub fn set_catalogue(&self, catalogue: Arc<dyn HandlerCatalogue>) {
        *self.catalogue.lock() = Some(catalogue);
    }

    pub(crate) fn bind_bus(&self, bus: Weak<ControllerBus>) {
        *self.bus.lock() = Some(bus);
    }

    /// Dispatch a command from the controller bus's command-queue task.
    pub fn dispatch_command(&self, id: CommandId, data: &str) {
        let envelope = build_envelope(id, data);
        // The catalogue reference is cloned out and the lock dropped before
        // calling out, so a re-entrant call from the handler (e.g. back
        // into the controller bus) can't deadlock on this mutex (spec §9
        // open question: facade lock held across the bus notify).
        let catalogue = self.catalogue.lock().clone();
        if let Some(catalogue) = catalogue {
            catalogue.handle_command(envelope);
        }
    }

    /// `handleClick` (spec §4.E): run the clicked element's handlers, then
    /// post a `Clicked` event with the element's name to the controller bus.
    pub fn handle_click(&self, element_name: &str) {
        let catalogue = self.catalogue.lock().clone();
        if let Some(catalogue) = catalogue {
            catalogue.handle_click(element_name);
        }

        let bus = self.bus.lock().as_ref().and_then(Weak::upgrade);
        if let Some(bus) = bus {
            bus.post_event(EventEnvelope {
                kind: EventKind::Clicked,
                name: element_name.to_string(),
            });
        }
    }
}

impl Default for ControlFacade {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingCatalogue(StdMutex<Vec<CommandEnvelope>>);

    impl HandlerCatalogue for RecordingCatalogue {
        fn handle_command(&self, envelope: CommandEnvelope) {
            self.0.lock().unwrap().push(envelope);
        }

        fn handle_click(&self, element_name: &str) {
            self.0.lock().unwrap().push(CommandEnvelope {
                handler_name: "click",
                gfx_element_name: Some(element_name.to_string()),
                handler_data: String::new(),
            });
        }
    }

    #[test]
    fn update_text_splits_element_name_from_data() {
        // S6 — Command id routing.
        let envelope = build_envelope(CommandId::UpdateText, "label1;3;1;12;2");
        assert_eq!(envelope.handler_name, "updateText");
        assert_eq!(envelope.gfx_element_name.as_deref(), Some("label1"));
        assert_eq!(envelope.handler_data, "3;1;12;2");
    }

    #[test]
    fn close_application_has_no_element_name() {
        let envelope = build_envelope(CommandId::CloseApplication, "");
        assert_eq!(envelope.gfx_element_name, None);
    }

    #[test]
    fn dispatch_reaches_the_registered_catalogue() {
        let facade = ControlFacade::new();
        let recording = Arc::new(RecordingCatalogue(StdMutex::new(Vec::new())));
        facade.set_catalogue(recording.clone());
        facade.dispatch_command(CommandId::TakeScreenshot, "");
        assert_eq!(recording.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn handle_click_with_no_bound_bus_still_runs_the_catalogue() {
        // Exercised standalone (no ControllerBus), so only the catalogue
        // side of handleClick is observable here; bus.rs covers the
        // Clicked-event half against a real bus.
        let facade = ControlFacade::new();
        let recording = Arc::new(RecordingCatalogue(StdMutex::new(Vec::new())));
        facade.set_catalogue(recording.clone());
        facade.handle_click("btn1");
        assert_eq!(recording.0.lock().unwrap().len(), 1);
    }
}
