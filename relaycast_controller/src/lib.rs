//! Plug-in controller bus: loads `dlopen`-based plug-ins behind a small C
//! ABI and dispatches three independent queues (command, event, library)
//! between them and the rest of the engine (spec §4.D).

pub mod bus;
pub mod command_table;
pub mod error;
pub mod events;
pub mod facade;
pub mod plugin;
pub mod queue;

pub use bus::ControllerBus;
pub use command_table::{CommandId, CommandSpec, COMMAND_TABLE};
pub use error::ControllerError;
pub use events::{EventEnvelope, EventKind, EVENT_ALL, EVENT_CLICKED, EVENT_STARTED, EVENT_STOPPED, EVENT_SUSPENDED};
pub use facade::{CommandEnvelope, ControlFacade, HandlerCatalogue};
pub use plugin::{ControllerLib, LibraryConfig};
