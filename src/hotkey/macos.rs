use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rdev::{listen, Event, EventType, Key};

use super::{build_display_name, common_trigger_name, held_modifiers, is_modifier, match_binding, Action};
use crate::config::{HotkeyConfig, Shortcuts};

/// Start the hotkey listener on a dedicated OS thread.
/// Sends the matching `Action` through the channel on each shortcut press.
pub fn start_listener(
    sender: async_channel::Sender<Action>,
    shortcuts: Arc<Mutex<Shortcuts>>,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("hotkey-listener".into())
        .spawn(move || {
            let mut held_keys: HashSet<u16> = HashSet::new();

            let callback = move |event: Event| match event.event_type {
                EventType::KeyPress(key) => {
                    let code = rdev_key_to_code(key);
                    // rdev reports auto-repeat as repeated presses
                    if !held_keys.insert(code) {
                        return;
                    }
                    let current = shortcuts.lock().unwrap_or_else(|e| e.into_inner()).clone();
                    if let Some(action) = match_binding(&current, &held_keys, code) {
                        log::info!(
                            "Hotkey triggered: {} ({action:?})",
                            current.binding(action).display_name
                        );
                        let _ = sender.try_send(action);
                    }
                }
                EventType::KeyRelease(key) => {
                    held_keys.remove(&rdev_key_to_code(key));
                }
                _ => {}
            };

            if let Err(e) = listen(callback) {
                log::error!("rdev listener error: {:?}", e);
            }
        })?;
    Ok(())
}

/// Capture a single key combination.
/// Returns when a non-modifier key is pressed while modifiers are held.
/// Used by the settings window to rebind a shortcut.
pub fn capture_hotkey_combo() -> Option<HotkeyConfig> {
    let result: Arc<Mutex<Option<HotkeyConfig>>> = Arc::new(Mutex::new(None));
    let start = Instant::now();
    let timeout = Duration::from_secs(10);

    let res = result.clone();
    let mut held_keys: HashSet<u16> = HashSet::new();

    let callback = move |event: Event| {
        let mut slot = res.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() || start.elapsed() > timeout {
            return;
        }
        match event.event_type {
            EventType::KeyPress(key) => {
                let code = rdev_key_to_code(key);
                held_keys.insert(code);

                if !is_modifier(code) && held_keys.iter().any(|k| is_modifier(*k)) {
                    let modifiers = held_modifiers(&held_keys);
                    let display = build_display_name(&modifiers, &trigger_name(code));
                    *slot = Some(HotkeyConfig {
                        modifiers,
                        trigger: code,
                        display_name: display,
                    });
                }
            }
            EventType::KeyRelease(key) => {
                held_keys.remove(&rdev_key_to_code(key));
            }
            _ => {}
        }
    };

    // rdev::listen blocks, so run it in a thread
    let handle = std::thread::spawn(move || {
        let _ = listen(callback);
    });

    // Poll for completion
    while start.elapsed() <= timeout {
        if result.lock().unwrap_or_else(|e| e.into_inner()).is_some() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    // rdev::listen cannot be stopped; the callback goes inert once a
    // combination is recorded. Detach the thread.
    drop(handle);

    let captured = result.lock().unwrap_or_else(|e| e.into_inner()).take();
    captured
}

/// Map rdev::Key to a numeric code consistent with evdev codes
/// so that HotkeyConfig serialization is cross-platform.
fn rdev_key_to_code(key: Key) -> u16 {
    match key {
        // Modifiers, same codes as evdev
        Key::ControlLeft => 29,
        Key::ControlRight => 97,
        Key::ShiftLeft => 42,
        Key::ShiftRight => 54,
        Key::Alt => 56,
        Key::AltGr => 100,
        Key::MetaLeft => 125,
        Key::MetaRight => 126,
        // Common keys
        Key::Escape => 1,
        Key::BackSpace => 14,
        Key::Tab => 15,
        Key::Return => 28,
        Key::Space => 57,
        // Letters
        Key::KeyA => 30,
        Key::KeyB => 48,
        Key::KeyC => 46,
        Key::KeyD => 32,
        Key::KeyE => 18,
        Key::KeyF => 33,
        Key::KeyG => 34,
        Key::KeyH => 35,
        Key::KeyI => 23,
        Key::KeyJ => 36,
        Key::KeyK => 37,
        Key::KeyL => 38,
        Key::KeyM => 50,
        Key::KeyN => 49,
        Key::KeyO => 24,
        Key::KeyP => 25,
        Key::KeyQ => 16,
        Key::KeyR => 19,
        Key::KeyS => 31,
        Key::KeyT => 20,
        Key::KeyU => 22,
        Key::KeyV => 47,
        Key::KeyW => 17,
        Key::KeyX => 45,
        Key::KeyY => 21,
        Key::KeyZ => 44,
        // Numbers
        Key::Num0 => 11,
        Key::Num1 => 2,
        Key::Num2 => 3,
        Key::Num3 => 4,
        Key::Num4 => 5,
        Key::Num5 => 6,
        Key::Num6 => 7,
        Key::Num7 => 8,
        Key::Num8 => 9,
        Key::Num9 => 10,
        // Function keys
        Key::F1 => 59,
        Key::F2 => 60,
        Key::F3 => 61,
        Key::F4 => 62,
        Key::F5 => 63,
        Key::F6 => 64,
        Key::F7 => 65,
        Key::F8 => 66,
        Key::F9 => 67,
        Key::F10 => 68,
        Key::F11 => 87,
        Key::F12 => 88,
        // Arrows
        Key::UpArrow => 103,
        Key::LeftArrow => 105,
        Key::RightArrow => 106,
        Key::DownArrow => 108,
        Key::Unknown(code) => code as u16,
        _ => 0,
    }
}

fn trigger_name(code: u16) -> String {
    if let Some(name) = common_trigger_name(code) {
        return name.into();
    }
    match code {
        30 => "A".into(),
        48 => "B".into(),
        46 => "C".into(),
        32 => "D".into(),
        18 => "E".into(),
        33 => "F".into(),
        34 => "G".into(),
        35 => "H".into(),
        23 => "I".into(),
        36 => "J".into(),
        37 => "K".into(),
        38 => "L".into(),
        50 => "M".into(),
        49 => "N".into(),
        24 => "O".into(),
        25 => "P".into(),
        16 => "Q".into(),
        19 => "R".into(),
        31 => "S".into(),
        20 => "T".into(),
        22 => "U".into(),
        47 => "V".into(),
        17 => "W".into(),
        45 => "X".into(),
        21 => "Y".into(),
        44 => "Z".into(),
        _ => format!("Key{code}"),
    }
}
