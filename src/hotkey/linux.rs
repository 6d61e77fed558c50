use evdev::{Device, EventType, KeyCode};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

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
            if let Err(e) = listener_loop(sender, shortcuts) {
                log::error!("Hotkey listener exited: {e}");
            }
        })?;
    Ok(())
}

fn listener_loop(
    sender: async_channel::Sender<Action>,
    shortcuts: Arc<Mutex<Shortcuts>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut devices = open_keyboard_devices();
    if devices.is_empty() {
        return Err("No keyboard devices found. Is the user in the 'input' group?".into());
    }
    log::info!("Opened {} keyboard device(s)", devices.len());

    for dev in &devices {
        dev.set_nonblocking(true)?;
    }

    let mut held_keys: HashSet<u16> = HashSet::new();

    loop {
        let mut pressed: Vec<u16> = Vec::new();

        for dev in &mut devices {
            if let Ok(events) = dev.fetch_events() {
                for event in events {
                    if event.event_type() != EventType::KEY {
                        continue;
                    }
                    let code = event.code();
                    match event.value() {
                        1 => {
                            held_keys.insert(code);
                            pressed.push(code);
                        }
                        0 => {
                            held_keys.remove(&code);
                        }
                        _ => {} // repeat events
                    }
                }
            }
        }

        if pressed.is_empty() {
            std::thread::sleep(Duration::from_millis(1));
            continue;
        }

        let current = shortcuts.lock().unwrap_or_else(|e| e.into_inner()).clone();
        for code in pressed {
            let Some(action) = match_binding(&current, &held_keys, code) else {
                continue;
            };
            log::info!(
                "Hotkey triggered: {} ({action:?})",
                current.binding(action).display_name
            );
            if sender.try_send(action).is_err() {
                log::info!("Action channel closed, exiting hotkey listener");
                return Ok(());
            }
        }
    }
}

/// Open all /dev/input/event* devices that look like keyboards.
fn open_keyboard_devices() -> Vec<Device> {
    let mut devices = Vec::new();
    let Ok(entries) = std::fs::read_dir("/dev/input") else {
        return devices;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        if !name.starts_with("event") {
            continue;
        }
        if let Ok(dev) = Device::open(&path) {
            // Must support EV_KEY and have KEY_A
            let has_key = dev.supported_events().contains(EventType::KEY);
            let has_key_a = dev
                .supported_keys()
                .map(|keys| keys.contains(KeyCode::KEY_A))
                .unwrap_or(false);
            if has_key && has_key_a {
                log::info!(
                    "Opened keyboard: {} ({})",
                    dev.name().unwrap_or("unknown"),
                    path.display()
                );
                devices.push(dev);
            }
        }
    }
    devices
}

/// Capture a single key combination from evdev devices.
/// Returns when a non-modifier key is pressed while modifiers are held.
/// Used by the settings window to rebind a shortcut.
pub fn capture_hotkey_combo() -> Option<HotkeyConfig> {
    let mut devices = open_keyboard_devices();
    if devices.is_empty() {
        return None;
    }
    for dev in &devices {
        let _ = dev.set_nonblocking(true);
    }

    let mut held_keys: HashSet<u16> = HashSet::new();
    let start = Instant::now();
    let timeout = Duration::from_secs(10);

    loop {
        if start.elapsed() > timeout {
            return None;
        }

        for dev in &mut devices {
            if let Ok(events) = dev.fetch_events() {
                for event in events {
                    if event.event_type() != EventType::KEY {
                        continue;
                    }
                    let code = event.code();
                    match event.value() {
                        1 => {
                            held_keys.insert(code);
                            if !is_modifier(code) && held_keys.iter().any(|k| is_modifier(*k)) {
                                let modifiers = held_modifiers(&held_keys);
                                let display = build_display_name(&modifiers, &trigger_name(code));
                                return Some(HotkeyConfig {
                                    modifiers,
                                    trigger: code,
                                    display_name: display,
                                });
                            }
                        }
                        0 => {
                            held_keys.remove(&code);
                        }
                        _ => {}
                    }
                }
            }
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn trigger_name(code: u16) -> String {
    if let Some(name) = common_trigger_name(code) {
        return name.into();
    }
    let key = KeyCode(code);
    let debug = format!("{key:?}");
    // KeyCode debug looks like "KEY_A", strip "KEY_"
    debug.strip_prefix("KEY_").unwrap_or(&debug).to_string()
}
