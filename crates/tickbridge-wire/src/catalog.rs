//! Static registry of event kinds and their fixed payload sizes.
//!
//! Kind ids are grouped by category:
//!
//! | Range       | Category           |
//! |-------------|--------------------|
//! | 0-49        | sprite             |
//! | 50-99       | geometry           |
//! | 100-199     | input              |
//! | 200-299     | window             |
//! | 300-399     | text               |
//! | 400-499     | audio              |
//! | 500-599     | physics            |
//! | 1000-1099   | plugin             |
//! | 2000-2999   | camera             |
//! | 3000-3999   | script             |
//!
//! Sizes are the in-memory size of the driver's payload structs, trailing
//! padding included. For variable kinds the size covers the fixed header
//! only; the header carries `u32` length fields for the strings that follow.

use std::fmt;

/// How the bytes after the 16-byte record prefix are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLayout {
    /// No payload.
    Empty,
    /// Exactly `fixed_size` bytes.
    Fixed,
    /// A `fixed_size` header, then one byte string per length field. Each
    /// string is followed by zero padding to the next multiple of 8.
    Strings {
        /// Byte offsets of little-endian `u32` length fields inside the header.
        length_offsets: &'static [usize],
    },
    /// A `fixed_size` header, then `count` packed primitives whose element
    /// size depends on the primitive type stored in the header.
    Primitives { type_offset: usize, count_offset: usize },
}

impl PayloadLayout {
    /// True for layouts with data after the fixed header.
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Strings { .. } | Self::Primitives { .. })
    }

    /// Short label used by tooling.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Fixed => "fixed",
            Self::Strings { .. } => "strings",
            Self::Primitives { .. } => "primitives",
        }
    }
}

/// Event kind family, derived from the id range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Sprite,
    Geometry,
    Input,
    Window,
    Text,
    Audio,
    Physics,
    Plugin,
    Camera,
    Script,
}

impl EventCategory {
    /// Category for a raw kind id, if the id falls in a known range.
    pub fn for_id(id: u32) -> Option<Self> {
        match id {
            0..=49 => Some(Self::Sprite),
            50..=99 => Some(Self::Geometry),
            100..=199 => Some(Self::Input),
            200..=299 => Some(Self::Window),
            300..=399 => Some(Self::Text),
            400..=499 => Some(Self::Audio),
            500..=599 => Some(Self::Physics),
            1000..=1099 => Some(Self::Plugin),
            2000..=2999 => Some(Self::Camera),
            3000..=3999 => Some(Self::Script),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sprite => "sprite",
            Self::Geometry => "geometry",
            Self::Input => "input",
            Self::Window => "window",
            Self::Text => "text",
            Self::Audio => "audio",
            Self::Physics => "physics",
            Self::Plugin => "plugin",
            Self::Camera => "camera",
            Self::Script => "script",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: EventKind,
    pub name: &'static str,
    /// Size of the fixed payload, or of the header for variable kinds.
    pub fixed_size: usize,
    pub layout: PayloadLayout,
}

const TEXTURE_PATH: &[usize] = &[16];
const TEXT_FONT_AND_STRING: &[usize] = &[52, 56];
const TEXT_STRING: &[usize] = &[16];
const AUDIO_PATH: &[usize] = &[0];
const PLUGIN_PATH: &[usize] = &[4];

macro_rules! event_kinds {
    ($($variant:ident = $id:literal, $name:literal, $size:literal, $layout:expr;)+) => {
        /// Every event kind known to the catalog.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u32)]
        pub enum EventKind {
            $($variant = $id,)+
        }

        /// Catalog rows, sorted by kind id.
        static CATALOG: &[CatalogEntry] = &[
            $(CatalogEntry {
                kind: EventKind::$variant,
                name: $name,
                fixed_size: $size,
                layout: $layout,
            },)+
        ];
    };
}

use PayloadLayout::{Empty, Fixed};

event_kinds! {
    SpriteAdd = 0, "SPRITE_ADD", 128, Fixed;
    SpriteRemove = 1, "SPRITE_REMOVE", 16, Fixed;
    SpriteMove = 2, "SPRITE_MOVE", 40, Fixed;
    SpriteScale = 3, "SPRITE_SCALE", 40, Fixed;
    SpriteResize = 4, "SPRITE_RESIZE", 32, Fixed;
    SpriteRotate = 5, "SPRITE_ROTATE", 40, Fixed;
    SpriteColor = 6, "SPRITE_COLOR", 24, Fixed;
    SpriteSpeed = 7, "SPRITE_SPEED", 32, Fixed;
    SpriteTextureLoad = 8, "SPRITE_TEXTURE_LOAD", 24,
        PayloadLayout::Strings { length_offsets: TEXTURE_PATH };
    SpriteTextureSet = 9, "SPRITE_TEXTURE_SET", 24, Fixed;
    SpriteSetSourceRect = 10, "SPRITE_SET_SOURCE_RECT", 32, Fixed;

    GeomAddPoint = 50, "GEOM_ADD_POINT", 40, Fixed;
    GeomAddLine = 51, "GEOM_ADD_LINE", 48, Fixed;
    GeomAddRect = 52, "GEOM_ADD_RECT", 48, Fixed;
    GeomAddFillRect = 53, "GEOM_ADD_FILL_RECT", 48, Fixed;
    GeomAddPacked = 54, "GEOM_ADD_PACKED", 40,
        PayloadLayout::Primitives { type_offset: 32, count_offset: 36 };
    GeomRemove = 55, "GEOM_REMOVE", 16, Fixed;
    GeomSetColor = 56, "GEOM_SET_COLOR", 24, Fixed;

    InputKeyUp = 100, "INPUT_KEYUP", 12, Fixed;
    InputKeyDown = 101, "INPUT_KEYDOWN", 12, Fixed;
    InputMouseUp = 102, "INPUT_MOUSEUP", 12, Fixed;
    InputMouseDown = 103, "INPUT_MOUSEDOWN", 12, Fixed;
    InputMouseMotion = 104, "INPUT_MOUSEMOTION", 16, Fixed;

    WindowTitle = 200, "WINDOW_TITLE", 256, Fixed;
    WindowResize = 201, "WINDOW_RESIZE", 8, Fixed;
    WindowFlags = 202, "WINDOW_FLAGS", 8, Fixed;

    TextAdd = 300, "TEXT_ADD", 64,
        PayloadLayout::Strings { length_offsets: TEXT_FONT_AND_STRING };
    TextSetString = 301, "TEXT_SET_STRING", 24,
        PayloadLayout::Strings { length_offsets: TEXT_STRING };

    AudioLoad = 400, "AUDIO_LOAD", 4,
        PayloadLayout::Strings { length_offsets: AUDIO_PATH };
    AudioLoaded = 401, "AUDIO_LOADED", 8, Fixed;
    AudioPlay = 402, "AUDIO_PLAY", 8, Fixed;
    AudioStopAll = 403, "AUDIO_STOP_ALL", 0, Empty;
    AudioSetMasterVolume = 404, "AUDIO_SET_MASTER_VOLUME", 4, Fixed;
    AudioPause = 405, "AUDIO_PAUSE", 8, Fixed;
    AudioStop = 406, "AUDIO_STOP", 8, Fixed;
    AudioUnload = 407, "AUDIO_UNLOAD", 8, Fixed;
    AudioSetVolume = 408, "AUDIO_SET_VOLUME", 16, Fixed;

    PhysicsAddBody = 500, "PHYSICS_ADD_BODY", 80, Fixed;
    PhysicsRemoveBody = 501, "PHYSICS_REMOVE_BODY", 16, Fixed;
    PhysicsApplyForce = 502, "PHYSICS_APPLY_FORCE", 32, Fixed;
    PhysicsApplyImpulse = 503, "PHYSICS_APPLY_IMPULSE", 32, Fixed;
    PhysicsSetVelocity = 504, "PHYSICS_SET_VELOCITY", 32, Fixed;
    PhysicsSetPosition = 505, "PHYSICS_SET_POSITION", 32, Fixed;
    PhysicsSetRotation = 506, "PHYSICS_SET_ROTATION", 24, Fixed;
    PhysicsCollisionBegin = 507, "PHYSICS_COLLISION_BEGIN", 32, Fixed;
    PhysicsCollisionSeparate = 508, "PHYSICS_COLLISION_SEPARATE", 32, Fixed;
    PhysicsSyncTransform = 509, "PHYSICS_SYNC_TRANSFORM", 72, Fixed;
    PhysicsSetDebugMode = 510, "PHYSICS_SET_DEBUG_MODE", 4, Fixed;

    Plugin = 1000, "PLUGIN", 1, Fixed;
    PluginLoad = 1001, "PLUGIN_LOAD", 8,
        PayloadLayout::Strings { length_offsets: PLUGIN_PATH };
    PluginUnload = 1002, "PLUGIN_UNLOAD", 1, Fixed;
    PluginSet = 1003, "PLUGIN_SET", 1, Fixed;
    PluginEventStacking = 1004, "PLUGIN_EVENT_STACKING", 2, Fixed;
    PluginSubscribeEvent = 1005, "PLUGIN_SUBSCRIBE_EVENT", 8, Fixed;
    PluginUnsubscribeEvent = 1006, "PLUGIN_UNSUBSCRIBE_EVENT", 8, Fixed;

    CameraSetPosition = 2000, "CAMERA_SET_POSITION", 16, Fixed;
    CameraMove = 2001, "CAMERA_MOVE", 16, Fixed;
    CameraSetZoom = 2002, "CAMERA_SET_ZOOM", 8, Fixed;
    CameraSetRotation = 2003, "CAMERA_SET_ROTATION", 8, Fixed;
    CameraFollowEntity = 2004, "CAMERA_FOLLOW_ENTITY", 16, Fixed;
    CameraStopFollowing = 2005, "CAMERA_STOP_FOLLOWING", 0, Empty;

    ScriptSubscribe = 3000, "SCRIPT_SUBSCRIBE", 8, Fixed;
    ScriptUnsubscribe = 3001, "SCRIPT_UNSUBSCRIBE", 8, Fixed;
}

impl EventKind {
    /// Resolve a raw wire id.
    pub fn from_u32(id: u32) -> Option<Self> {
        entry(id).map(|e| e.kind)
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn category(self) -> EventCategory {
        // Every catalog id sits inside a category range.
        EventCategory::for_id(self.id()).unwrap_or(EventCategory::Sprite)
    }

    pub fn entry(self) -> &'static CatalogEntry {
        let idx = CATALOG
            .binary_search_by_key(&self.id(), |e| e.kind.id())
            .unwrap_or_default();
        &CATALOG[idx]
    }
}

impl From<EventKind> for u32 {
    fn from(kind: EventKind) -> Self {
        kind as u32
    }
}

impl TryFrom<u32> for EventKind {
    type Error = u32;

    fn try_from(id: u32) -> std::result::Result<Self, Self::Error> {
        Self::from_u32(id).ok_or(id)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All catalog rows, sorted by kind id.
pub fn entries() -> &'static [CatalogEntry] {
    CATALOG
}

/// Look up a catalog row by raw kind id.
pub fn entry(kind: u32) -> Option<&'static CatalogEntry> {
    CATALOG
        .binary_search_by_key(&kind, |e| e.kind.id())
        .ok()
        .map(|idx| &CATALOG[idx])
}

/// Size of the fixed part of a kind's payload.
///
/// Returns the full payload size for fixed kinds, the header size for
/// variable kinds, and 0 for kinds without a payload or unknown ids.
pub fn payload_size(kind: u32) -> usize {
    entry(kind).map_or(0, |e| e.fixed_size)
}

/// Kinds that carry 4 extra zero bytes between the fixed header and the
/// first variable string. Kept for wire compatibility with existing drivers.
pub fn has_legacy_padding(kind: u32) -> bool {
    kind == EventKind::AudioLoad.id() || kind == EventKind::PluginLoad.id()
}

/// Packed primitive type codes carried by `GEOM_ADD_PACKED`.
pub mod primitive {
    pub const POINT: u32 = 0;
    pub const LINE: u32 = 1;
    pub const RECT: u32 = 2;
    pub const FILL_RECT: u32 = 3;
    pub const POINTS: u32 = 4;
    pub const LINES: u32 = 5;
    pub const RECTS: u32 = 6;
    pub const FILL_RECTS: u32 = 7;

    /// Bytes per packed element: `f32` pairs for points and lines, `f32`
    /// quads for rects. Single-shape types carry no packed data.
    pub fn element_size(primitive_type: u32) -> usize {
        match primitive_type {
            POINTS | LINES => 8,
            RECTS | FILL_RECTS => 16,
            _ => 0,
        }
    }
}
