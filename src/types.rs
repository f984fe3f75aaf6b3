//! Core Input Types
//!
//! Triggers, mouse/keyboard events and the name tables used by the
//! configuration layer. Events are plain `Copy` values: the hook layer copies
//! them out of the OS structures at delivery and nothing holds a pointer past
//! a checker return.

/// Program name, used for config paths and profile file names.
pub const PROGRAM_NAME: &str = "trackscroll";

/// Scroll trigger selection.
///
/// `Lr`, `Left` and `Right` are chord triggers resolved through the waiter;
/// `Middle`/`X1`/`X2` enter scroll mode on a single press; the `*Drag`
/// variants require press plus a motion threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    #[default]
    Lr,
    Left,
    Right,
    Middle,
    X1,
    X2,
    LeftDrag,
    RightDrag,
    MiddleDrag,
    X1Drag,
    X2Drag,
    None,
}

impl Trigger {
    pub fn is_single(self) -> bool {
        matches!(self, Trigger::Middle | Trigger::X1 | Trigger::X2)
    }

    pub fn is_double(self) -> bool {
        matches!(self, Trigger::Lr | Trigger::Left | Trigger::Right)
    }

    pub fn is_drag(self) -> bool {
        matches!(
            self,
            Trigger::LeftDrag
                | Trigger::RightDrag
                | Trigger::MiddleDrag
                | Trigger::X1Drag
                | Trigger::X2Drag
        )
    }

    pub fn is_none(self) -> bool {
        self == Trigger::None
    }

    /// Config-file name of this trigger.
    pub fn name(self) -> &'static str {
        TRIGGER_TABLE
            .iter()
            .find(|(_, t)| *t == self)
            .map(|(n, _)| *n)
            .unwrap_or("None")
    }

    /// Parse a trigger name. Also accepts the legacy `<Name>Trigger`
    /// suffixed spelling found in old profile files.
    pub fn from_name(name: &str) -> Option<Trigger> {
        if let Some(&(_, t)) = TRIGGER_TABLE.iter().find(|(n, _)| *n == name) {
            return Some(t);
        }
        name.strip_suffix("Trigger")
            .and_then(|short| TRIGGER_TABLE.iter().find(|(n, _)| *n == short))
            .map(|&(_, t)| t)
    }
}

const TRIGGER_TABLE: &[(&str, Trigger)] = &[
    ("LR", Trigger::Lr),
    ("Left", Trigger::Left),
    ("Right", Trigger::Right),
    ("Middle", Trigger::Middle),
    ("X1", Trigger::X1),
    ("X2", Trigger::X2),
    ("LeftDrag", Trigger::LeftDrag),
    ("RightDrag", Trigger::RightDrag),
    ("MiddleDrag", Trigger::MiddleDrag),
    ("X1Drag", Trigger::X1Drag),
    ("X2Drag", Trigger::X2Drag),
    ("None", Trigger::None),
];

/// Pointer info copied out of the low-level hook structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerInfo {
    pub pt: (i32, i32),
    /// High word carries the X button number for X down/up events.
    pub mouse_data: u32,
    /// Bit 0/1 set means the event was software-injected.
    pub flags: u32,
    /// Event tick time in milliseconds.
    pub time: u32,
    /// Extra info word; carries the resend tags on injected events.
    pub extra: u32,
}

impl PointerInfo {
    pub fn at(x: i32, y: i32, time: u32) -> Self {
        PointerInfo {
            pt: (x, y),
            time,
            ..Default::default()
        }
    }
}

/// Mouse event kind as classified from the hook message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseEventKind {
    LeftDown,
    LeftUp,
    RightDown,
    RightUp,
    MiddleDown,
    MiddleUp,
    X1Down,
    X1Up,
    X2Down,
    X2Up,
    Move,
    Cancel,
    #[default]
    NonEvent,
}

impl MouseEventKind {
    pub fn is_down(self) -> bool {
        matches!(
            self,
            MouseEventKind::LeftDown
                | MouseEventKind::RightDown
                | MouseEventKind::MiddleDown
                | MouseEventKind::X1Down
                | MouseEventKind::X2Down
        )
    }

    pub fn is_up(self) -> bool {
        matches!(
            self,
            MouseEventKind::LeftUp
                | MouseEventKind::RightUp
                | MouseEventKind::MiddleUp
                | MouseEventKind::X1Up
                | MouseEventKind::X2Up
        )
    }

    pub fn is_left(self) -> bool {
        matches!(self, MouseEventKind::LeftDown | MouseEventKind::LeftUp)
    }

    pub fn is_right(self) -> bool {
        matches!(self, MouseEventKind::RightDown | MouseEventKind::RightUp)
    }

    pub fn is_middle(self) -> bool {
        matches!(self, MouseEventKind::MiddleDown | MouseEventKind::MiddleUp)
    }

    pub fn is_x1(self) -> bool {
        matches!(self, MouseEventKind::X1Down | MouseEventKind::X1Up)
    }

    pub fn is_x2(self) -> bool {
        matches!(self, MouseEventKind::X2Down | MouseEventKind::X2Up)
    }

    /// The single/double trigger that matches this event's button.
    pub fn trigger(self) -> Trigger {
        if self.is_left() {
            Trigger::Left
        } else if self.is_right() {
            Trigger::Right
        } else if self.is_middle() {
            Trigger::Middle
        } else if self.is_x1() {
            Trigger::X1
        } else if self.is_x2() {
            Trigger::X2
        } else {
            Trigger::None
        }
    }

    /// The drag trigger that matches this event's button.
    pub fn drag_trigger(self) -> Trigger {
        if self.is_left() {
            Trigger::LeftDrag
        } else if self.is_right() {
            Trigger::RightDrag
        } else if self.is_middle() {
            Trigger::MiddleDrag
        } else if self.is_x1() {
            Trigger::X1Drag
        } else if self.is_x2() {
            Trigger::X2Drag
        } else {
            Trigger::None
        }
    }
}

/// A classified mouse event as seen by the checker chains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub info: PointerInfo,
}

impl MouseEvent {
    pub fn new(kind: MouseEventKind, info: PointerInfo) -> Self {
        MouseEvent { kind, info }
    }

    /// Sentinel used to wake the waiter without dispatching anything.
    pub fn cancel() -> Self {
        MouseEvent::new(MouseEventKind::Cancel, PointerInfo::default())
    }

    pub fn is_injected(&self) -> bool {
        self.info.flags & 0x3 != 0
    }
}

/// Whether the X-button data word names the first X button.
pub fn is_xbutton1(mouse_data: u32) -> bool {
    (mouse_data >> 16) == 1
}

/// Button identity used when re-emitting a full click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseClick {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseClick {
    /// Click that matches an UP event, if any.
    pub fn from_up(kind: MouseEventKind) -> Option<MouseClick> {
        match kind {
            MouseEventKind::LeftUp => Some(MouseClick::Left),
            MouseEventKind::RightUp => Some(MouseClick::Right),
            MouseEventKind::MiddleUp => Some(MouseClick::Middle),
            MouseEventKind::X1Up => Some(MouseClick::X1),
            MouseEventKind::X2Up => Some(MouseClick::X2),
            _ => None,
        }
    }
}

/// Keyboard event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEventKind {
    KeyDown,
    KeyUp,
    #[default]
    NonEvent,
}

/// A classified keyboard event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub kind: KeyEventKind,
    pub vk: u16,
    pub time: u32,
}

impl KeyboardEvent {
    pub fn new(kind: KeyEventKind, vk: u16, time: u32) -> Self {
        KeyboardEvent { kind, vk, time }
    }
}

/// Acceleration multiplier preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelPreset {
    #[default]
    M5,
    M6,
    M7,
    M8,
    M9,
}

impl AccelPreset {
    pub fn name(self) -> &'static str {
        match self {
            AccelPreset::M5 => "M5",
            AccelPreset::M6 => "M6",
            AccelPreset::M7 => "M7",
            AccelPreset::M8 => "M8",
            AccelPreset::M9 => "M9",
        }
    }

    pub fn from_name(name: &str) -> Option<AccelPreset> {
        match name {
            "M5" => Some(AccelPreset::M5),
            "M6" => Some(AccelPreset::M6),
            "M7" => Some(AccelPreset::M7),
            "M8" => Some(AccelPreset::M8),
            "M9" => Some(AccelPreset::M9),
            _ => None,
        }
    }
}

/// Process priority applied at startup and on profile load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Normal,
    #[default]
    AboveNormal,
    High,
}

impl Priority {
    pub fn name(self) -> &'static str {
        match self {
            Priority::Normal => "Normal",
            Priority::AboveNormal => "AboveNormal",
            Priority::High => "High",
        }
    }

    pub fn from_name(name: &str) -> Option<Priority> {
        match name {
            "Normal" => Some(Priority::Normal),
            "AboveNormal" | "Above Normal" => Some(Priority::AboveNormal),
            "High" => Some(Priority::High),
            _ => None,
        }
    }
}

/// VH adjuster method: keep the first locked direction, or allow switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VhMethod {
    Fixed,
    #[default]
    Switching,
}

impl VhMethod {
    pub fn name(self) -> &'static str {
        match self {
            VhMethod::Fixed => "Fixed",
            VhMethod::Switching => "Switching",
        }
    }

    pub fn from_name(name: &str) -> Option<VhMethod> {
        match name {
            "Fixed" => Some(VhMethod::Fixed),
            "Switching" => Some(VhMethod::Switching),
            _ => None,
        }
    }
}

/// Locked scroll direction in VH adjuster mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VhDirection {
    Vertical,
    Horizontal,
    #[default]
    None,
}

/// Sign of the previous motion on an axis (real wheel turn detection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveDirection {
    Plus,
    Minus,
    #[default]
    Zero,
}

/// Virtual key codes selectable as a keyboard trigger.
pub const VK_TABLE: &[(&str, u16)] = &[
    ("None", 0x00),
    ("VK_TAB", 0x09),
    ("VK_PAUSE", 0x13),
    ("VK_CAPITAL", 0x14),
    ("VK_CONVERT", 0x1C),
    ("VK_NONCONVERT", 0x1D),
    ("VK_PRIOR", 0x21),
    ("VK_NEXT", 0x22),
    ("VK_END", 0x23),
    ("VK_HOME", 0x24),
    ("VK_SNAPSHOT", 0x2C),
    ("VK_INSERT", 0x2D),
    ("VK_DELETE", 0x2E),
    ("VK_LWIN", 0x5B),
    ("VK_RWIN", 0x5C),
    ("VK_APPS", 0x5D),
    ("VK_NUMLOCK", 0x90),
    ("VK_SCROLL", 0x91),
    ("VK_LSHIFT", 0xA0),
    ("VK_RSHIFT", 0xA1),
    ("VK_LCONTROL", 0xA2),
    ("VK_RCONTROL", 0xA3),
    ("VK_LMENU", 0xA4),
    ("VK_RMENU", 0xA5),
];

/// Look up a VK code by its table name.
pub fn vk_code_from_name(name: &str) -> Option<u16> {
    VK_TABLE.iter().find(|(n, _)| *n == name).map(|&(_, c)| c)
}

/// Look up the table name for a VK code.
pub fn vk_name_from_code(code: u16) -> &'static str {
    VK_TABLE
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(n, _)| *n)
        .unwrap_or("None")
}

// Async key state codes consulted on the hook path.
pub const VK_SHIFT: u16 = 0x10;
pub const VK_CONTROL: u16 = 0x11;
pub const VK_MENU: u16 = 0x12;
pub const VK_ESCAPE: u16 = 0x1B;
