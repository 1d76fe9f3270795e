//! Normalized event records
//!
//! One flat record per fired event. The category is chosen from the event
//! type, and each category reads a fixed set of platform field names off
//! the native event. Missing fields read as zero / empty.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use dom::{FileInfo, NativeEvent};

use crate::types::{HandlerId, NodeId};

/// What the producer receives when a registered listener fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_type: String,
    pub target: NodeId,
    pub handler: HandlerId,
    pub bubbles: bool,
    pub data: EventData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifiers {
    pub alt_key: bool,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseData {
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
    pub screen_x: f64,
    pub screen_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub button: i64,
    pub buttons: i64,
    #[serde(flatten)]
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerData {
    pub pointer_id: i64,
    pub pointer_type: String,
    pub is_primary: bool,
    pub width: f64,
    pub height: f64,
    pub pressure: f64,
    pub tangential_pressure: f64,
    pub tilt_x: f64,
    pub tilt_y: f64,
    pub twist: f64,
    #[serde(flatten)]
    pub mouse: MouseData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelData {
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_z: f64,
    pub delta_mode: i64,
    #[serde(flatten)]
    pub mouse: MouseData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardData {
    pub key: String,
    pub code: String,
    pub location: i64,
    pub repeat: bool,
    #[serde(flatten)]
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionData {
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationData {
    pub animation_name: String,
    pub pseudo_element: String,
    pub elapsed_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionData {
    pub property_name: String,
    pub pseudo_element: String,
    pub elapsed_time: f64,
}

/// Input/change/submit payload. `values` groups the enclosing form's
/// named controls; a name can repeat (checkbox groups, multi-selects).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormData {
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub values: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragData {
    #[serde(flatten)]
    pub mouse: MouseData,
    #[serde(default)]
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventData {
    Mouse(MouseData),
    Pointer(PointerData),
    Wheel(WheelData),
    Keyboard(KeyboardData),
    Composition(CompositionData),
    Animation(AnimationData),
    Transition(TransitionData),
    Form(FormData),
    Drag(DragData),
    Focus,
    Generic,
}

/// Event families, by the platform interface that carries them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Mouse,
    Pointer,
    Wheel,
    Keyboard,
    Composition,
    Animation,
    Transition,
    Form,
    Drag,
    Focus,
    Generic,
}

impl EventCategory {
    pub fn of(event_type: &str) -> Self {
        match event_type {
            "click" | "contextmenu" | "dblclick" | "doubleclick" | "mousedown" | "mouseenter"
            | "mouseleave" | "mousemove" | "mouseout" | "mouseover" | "mouseup" => Self::Mouse,
            "pointerdown" | "pointermove" | "pointerup" | "pointercancel" | "pointerenter"
            | "pointerleave" | "pointerover" | "pointerout" | "gotpointercapture"
            | "lostpointercapture" => Self::Pointer,
            "wheel" => Self::Wheel,
            "keydown" | "keypress" | "keyup" => Self::Keyboard,
            "compositionstart" | "compositionupdate" | "compositionend" => Self::Composition,
            "animationstart" | "animationend" | "animationiteration" => Self::Animation,
            "transitionend" => Self::Transition,
            "change" | "input" | "invalid" | "reset" | "submit" => Self::Form,
            "drag" | "dragend" | "dragenter" | "dragexit" | "dragleave" | "dragover"
            | "dragstart" | "drop" => Self::Drag,
            "focus" | "blur" | "focusin" | "focusout" => Self::Focus,
            _ => Self::Generic,
        }
    }
}

struct Fields<'e, E: ?Sized>(&'e E);

impl<E: NativeEvent + ?Sized> Fields<'_, E> {
    fn f64(&self, name: &str) -> f64 {
        self.0.field(name).and_then(|v| v.as_f64()).unwrap_or(0.0)
    }

    fn i64(&self, name: &str) -> i64 {
        self.0.field(name).and_then(|v| v.as_i64()).unwrap_or(0)
    }

    fn bool(&self, name: &str) -> bool {
        self.0.field(name).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    fn string(&self, name: &str) -> String {
        self.0
            .field(name)
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default()
    }

    fn modifiers(&self) -> Modifiers {
        Modifiers {
            alt_key: self.bool("altKey"),
            ctrl_key: self.bool("ctrlKey"),
            meta_key: self.bool("metaKey"),
            shift_key: self.bool("shiftKey"),
        }
    }

    fn mouse(&self) -> MouseData {
        MouseData {
            client_x: self.f64("clientX"),
            client_y: self.f64("clientY"),
            page_x: self.f64("pageX"),
            page_y: self.f64("pageY"),
            screen_x: self.f64("screenX"),
            screen_y: self.f64("screenY"),
            offset_x: self.f64("offsetX"),
            offset_y: self.f64("offsetY"),
            button: self.i64("button"),
            buttons: self.i64("buttons"),
            modifiers: self.modifiers(),
        }
    }
}

/// Read a native event into its category's data
pub fn event_data<E: NativeEvent + ?Sized>(event: &E) -> EventData {
    let f = Fields(event);
    match EventCategory::of(event.event_type()) {
        EventCategory::Mouse => EventData::Mouse(f.mouse()),
        EventCategory::Pointer => EventData::Pointer(PointerData {
            pointer_id: f.i64("pointerId"),
            pointer_type: f.string("pointerType"),
            is_primary: f.bool("isPrimary"),
            width: f.f64("width"),
            height: f.f64("height"),
            pressure: f.f64("pressure"),
            tangential_pressure: f.f64("tangentialPressure"),
            tilt_x: f.f64("tiltX"),
            tilt_y: f.f64("tiltY"),
            twist: f.f64("twist"),
            mouse: f.mouse(),
        }),
        EventCategory::Wheel => EventData::Wheel(WheelData {
            delta_x: f.f64("deltaX"),
            delta_y: f.f64("deltaY"),
            delta_z: f.f64("deltaZ"),
            delta_mode: f.i64("deltaMode"),
            mouse: f.mouse(),
        }),
        EventCategory::Keyboard => EventData::Keyboard(KeyboardData {
            key: f.string("key"),
            code: f.string("code"),
            location: f.i64("location"),
            repeat: f.bool("repeat"),
            modifiers: f.modifiers(),
        }),
        EventCategory::Composition => EventData::Composition(CompositionData {
            data: f.string("data"),
        }),
        EventCategory::Animation => EventData::Animation(AnimationData {
            animation_name: f.string("animationName"),
            pseudo_element: f.string("pseudoElement"),
            elapsed_time: f.f64("elapsedTime"),
        }),
        EventCategory::Transition => EventData::Transition(TransitionData {
            property_name: f.string("propertyName"),
            pseudo_element: f.string("pseudoElement"),
            elapsed_time: f.f64("elapsedTime"),
        }),
        EventCategory::Form => {
            let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (name, value) in event.form_values() {
                values.entry(name).or_default().push(value);
            }
            EventData::Form(FormData {
                value: event.field("value").and_then(|v| v.as_str().map(String::from)),
                checked: event.field("checked").and_then(|v| v.as_bool()),
                values,
                files: event.files(),
            })
        }
        EventCategory::Drag => EventData::Drag(DragData {
            mouse: f.mouse(),
            files: event.files(),
        }),
        EventCategory::Focus => EventData::Focus,
        EventCategory::Generic => EventData::Generic,
    }
}

/// Build the record for one listener firing
pub fn normalize<E: NativeEvent + ?Sized>(
    event: &E,
    target: NodeId,
    handler: HandlerId,
    bubbles: bool,
) -> EventRecord {
    EventRecord {
        event_type: event.event_type().to_string(),
        target,
        handler,
        bubbles,
        data: event_data(event),
    }
}
