//! The fixed command id table of spec §6. Read-only after startup (spec §9
//! "Global mutable state").

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CommandId {
    CloseApplication = 0,
    ChangeLanguage = 1,
    SaveVideoElement = 2,
    TakeScreenshot = 3,
    HideElement = 4,
    ShowElement = 5,
    SetFocus = 6,
    HideGroup = 7,
    ShowGroup = 8,
    SetClickable = 9,
    SetNotClickable = 10,
    StopGraphics = 11,
    StartGraphics = 12,
    StopVideo = 13,
    StartVideo = 14,
    StopServer = 15,
    StartServer = 16,
    SuspendServer = 17,
    ResumeServer = 18,
    StopClient = 19,
    StartClient = 20,
    UpdateText = 21,
    UpdateImage = 22,
    UpdateNav = 23,
    SendGfxEvent = 24,
}

impl CommandId {
    /// Numeric id a plug-in passes to `sendToEngine` (spec §4.D).
    pub fn from_u32(id: u32) -> Option<CommandId> {
        COMMAND_TABLE.iter().map(|spec| spec.id).find(|candidate| *candidate as u32 == id)
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub id: CommandId,
    pub handler_name: &'static str,
    pub gfx_element_required: bool,
    pub data_contains_element_name: bool,
}

macro_rules! spec {
    ($id:ident, $handler:expr, $gfx:expr, $has_elem:expr) => {
        CommandSpec {
            id: CommandId::$id,
            handler_name: $handler,
            gfx_element_required: $gfx,
            data_contains_element_name: $has_elem,
        }
    };
}

pub const COMMAND_TABLE: &[CommandSpec] = &[
    spec!(CloseApplication, "closeApplication", false, false),
    spec!(ChangeLanguage, "changeLanguage", true, false),
    spec!(SaveVideoElement, "saveVideoElement", true, true),
    spec!(TakeScreenshot, "takeScreenshot", false, false),
    spec!(HideElement, "hideElement", false, false),
    spec!(ShowElement, "showElement", false, false),
    spec!(SetFocus, "setFocus", false, false),
    spec!(HideGroup, "hideGroup", false, false),
    spec!(ShowGroup, "showGroup", false, false),
    spec!(SetClickable, "setClickable", false, false),
    spec!(SetNotClickable, "setNotClickable", false, false),
    spec!(StopGraphics, "stopGraphics", false, false),
    spec!(StartGraphics, "startGraphics", false, false),
    spec!(StopVideo, "stopVideo", false, false),
    spec!(StartVideo, "startVideo", false, false),
    spec!(StopServer, "stopServer", false, false),
    spec!(StartServer, "startServer", false, false),
    spec!(SuspendServer, "suspendServer", false, false),
    spec!(ResumeServer, "resumeServer", false, false),
    spec!(StopClient, "stopClient", false, false),
    spec!(StartClient, "startClient", false, false),
    spec!(UpdateText, "updateText", true, true),
    spec!(UpdateImage, "updateImage", true, true),
    spec!(UpdateNav, "updateNav", true, true),
    spec!(SendGfxEvent, "sendGfxEvent", false, false),
];

pub fn lookup(id: CommandId) -> &'static CommandSpec {
    COMMAND_TABLE
        .iter()
        .find(|spec| spec.id == id)
        .expect("COMMAND_TABLE covers every CommandId variant")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_text_requires_gfx_element_and_splits_data() {
        let spec = lookup(CommandId::UpdateText);
        assert_eq!(spec.handler_name, "updateText");
        assert!(spec.gfx_element_required);
        assert!(spec.data_contains_element_name);
    }

    #[test]
    fn close_application_has_no_element() {
        let spec = lookup(CommandId::CloseApplication);
        assert!(!spec.data_contains_element_name);
    }
}
