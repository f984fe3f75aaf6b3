//! Profile Files
//!
//! Sectioned key=value persistence for [`Settings`]. Malformed lines, unknown
//! keys and out-of-range values are ignored (the previous value is kept), so
//! a damaged profile can never stop the program from starting. Saving is
//! atomic: write a temp sibling, then rename over the target.

use super::Settings;
use crate::scroll::accel::{
    self, parse_multipliers, parse_thresholds, serialize_multipliers, serialize_thresholds,
    AccelTable,
};
use crate::types::{AccelPreset, Priority, Trigger, VhMethod, PROGRAM_NAME};
use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Clamp ranges for the numeric keys; values outside are ignored on load.
pub const NUMBER_RANGES: &[(&str, i64, i64)] = &[
    ("poll_timeout", 50, 500),
    ("scroll_lock_time", 150, 500),
    ("vertical_threshold", 0, 500),
    ("horizontal_threshold", 0, 500),
    ("drag_threshold", 0, 500),
    ("wheel_delta", 10, 500),
    ("v_wheel_move", 10, 500),
    ("h_wheel_move", 10, 500),
    ("first_min_threshold", 1, 10),
    ("switching_threshold", 10, 500),
    ("health_check_interval", 0, 300),
];

fn in_range(key: &str, n: i64) -> bool {
    NUMBER_RANGES
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|&(_, lo, hi)| n >= lo && n <= hi)
        .unwrap_or(true)
}

fn parse_number(key: &str, value: &str) -> Option<i64> {
    match value.trim().parse::<i64>() {
        Ok(n) if in_range(key, n) => Some(n),
        Ok(n) => {
            debug!("profile: {} = {} out of range, ignored", key, n);
            None
        }
        Err(_) => {
            debug!("profile: {} = {:?} not a number, ignored", key, value);
            None
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => {
            debug!("profile: {} = {:?} not a boolean, ignored", key, value);
            None
        }
    }
}

/// Apply profile text onto existing settings. Section headers only shape the
/// stored form; keys are unique and applied by name.
pub fn apply_str(contents: &str, s: &mut Settings) {
    let mut custom_thresholds: Option<String> = None;
    let mut custom_multipliers: Option<String> = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            debug!("profile: skipping malformed line {:?}", line);
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "trigger" => {
                if let Some(t) = Trigger::from_name(value) {
                    s.trigger = t;
                } else {
                    debug!("profile: unknown trigger {:?}, ignored", value);
                }
            }
            "priority" => {
                if let Some(p) = Priority::from_name(value) {
                    s.priority = p;
                }
            }
            "accel_preset" => {
                if let Some(p) = AccelPreset::from_name(value) {
                    s.accel_preset = p;
                }
            }
            "vh_method" => {
                if let Some(m) = VhMethod::from_name(value) {
                    s.vh_method = m;
                }
            }
            "vk_code" => {
                if let Some(code) = crate::types::vk_code_from_name(value) {
                    s.vk_code = code;
                }
            }
            "custom_accel_thresholds" => custom_thresholds = Some(value.to_string()),
            "custom_accel_multipliers" => custom_multipliers = Some(value.to_string()),

            "pass_mode" => {
                if let Some(b) = parse_bool(key, value) {
                    s.pass_mode = b;
                }
            }
            "keyboard_hook" => {
                if let Some(b) = parse_bool(key, value) {
                    s.keyboard_hook = b;
                }
            }
            "reverse_scroll" => {
                if let Some(b) = parse_bool(key, value) {
                    s.reverse_scroll = b;
                }
            }
            "swap_scroll" => {
                if let Some(b) = parse_bool(key, value) {
                    s.swap_scroll = b;
                }
            }
            "horizontal_scroll" => {
                if let Some(b) = parse_bool(key, value) {
                    s.horizontal_scroll = b;
                }
            }
            "cursor_change" => {
                if let Some(b) = parse_bool(key, value) {
                    s.cursor_change = b;
                }
            }
            "dragged_lock" => {
                if let Some(b) = parse_bool(key, value) {
                    s.dragged_lock = b;
                }
            }
            "send_middle_click" => {
                if let Some(b) = parse_bool(key, value) {
                    s.send_middle_click = b;
                }
            }
            "accel_enabled" => {
                if let Some(b) = parse_bool(key, value) {
                    s.accel_enabled = b;
                }
            }
            "custom_accel" => {
                if let Some(b) = parse_bool(key, value) {
                    s.custom_accel = b;
                }
            }
            "real_wheel_mode" => {
                if let Some(b) = parse_bool(key, value) {
                    s.real_wheel_mode = b;
                }
            }
            "quick_first" => {
                if let Some(b) = parse_bool(key, value) {
                    s.quick_first = b;
                }
            }
            "quick_turn" => {
                if let Some(b) = parse_bool(key, value) {
                    s.quick_turn = b;
                }
            }
            "vh_adjuster_mode" => {
                if let Some(b) = parse_bool(key, value) {
                    s.vh_adjuster_mode = b;
                }
            }
            "first_prefer_vertical" => {
                if let Some(b) = parse_bool(key, value) {
                    s.first_prefer_vertical = b;
                }
            }

            "poll_timeout" => {
                if let Some(n) = parse_number(key, value) {
                    s.poll_timeout = n as u32;
                }
            }
            "scroll_lock_time" => {
                if let Some(n) = parse_number(key, value) {
                    s.scroll_lock_time = n as u32;
                }
            }
            "health_check_interval" => {
                if let Some(n) = parse_number(key, value) {
                    s.health_check_interval = n as u32;
                }
            }
            "vertical_threshold" => {
                if let Some(n) = parse_number(key, value) {
                    s.vertical_threshold = n as i32;
                }
            }
            "horizontal_threshold" => {
                if let Some(n) = parse_number(key, value) {
                    s.horizontal_threshold = n as i32;
                }
            }
            "drag_threshold" => {
                if let Some(n) = parse_number(key, value) {
                    s.drag_threshold = n as i32;
                }
            }
            "wheel_delta" => {
                if let Some(n) = parse_number(key, value) {
                    s.wheel_delta = n as i32;
                }
            }
            "v_wheel_move" => {
                if let Some(n) = parse_number(key, value) {
                    s.v_wheel_move = n as i32;
                }
            }
            "h_wheel_move" => {
                if let Some(n) = parse_number(key, value) {
                    s.h_wheel_move = n as i32;
                }
            }
            "switching_threshold" => {
                if let Some(n) = parse_number(key, value) {
                    s.switching_threshold = n as i32;
                }
            }
            _ => debug!("profile: unknown key {:?}, ignored", key),
        }
    }

    if let (Some(ts), Some(ms)) = (custom_thresholds, custom_multipliers) {
        match parse_custom_table(&ts, &ms) {
            Ok(table) => s.custom_accel_table = Some(table),
            Err(e) => warn!("profile: custom accel table rejected: {}", e),
        }
    }
}

fn parse_custom_table(ts: &str, ms: &str) -> Result<AccelTable, accel::AccelTableError> {
    let thresholds = parse_thresholds(ts)?;
    let multipliers = parse_multipliers(ms)?;
    AccelTable::new(thresholds, multipliers)
}

/// Load settings from `path`, starting from defaults. A missing file yields
/// the defaults; a damaged file yields whatever could be applied.
pub fn load(path: &Path) -> Settings {
    let mut s = Settings::default();
    match fs::read_to_string(path) {
        Ok(contents) => apply_str(&contents, &mut s),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("profile {:?} not found, using defaults", path);
        }
        Err(e) => warn!("profile {:?} unreadable ({}), using defaults", path, e),
    }
    s
}

/// Render settings in the sectioned profile form.
pub fn render(s: &Settings) -> String {
    let mut out = String::new();

    out.push_str("[General]\n");
    out.push_str(&format!("trigger={}\n", s.trigger.name()));
    out.push_str(&format!("poll_timeout={}\n", s.poll_timeout));
    out.push_str(&format!("pass_mode={}\n", s.pass_mode));
    out.push_str(&format!("keyboard_hook={}\n", s.keyboard_hook));
    out.push_str(&format!("priority={}\n", s.priority.name()));
    out.push_str(&format!(
        "health_check_interval={}\n",
        s.health_check_interval
    ));

    out.push_str("\n[Scroll]\n");
    out.push_str(&format!("scroll_lock_time={}\n", s.scroll_lock_time));
    out.push_str(&format!("vertical_threshold={}\n", s.vertical_threshold));
    out.push_str(&format!(
        "horizontal_threshold={}\n",
        s.horizontal_threshold
    ));
    out.push_str(&format!("drag_threshold={}\n", s.drag_threshold));
    out.push_str(&format!("reverse_scroll={}\n", s.reverse_scroll));
    out.push_str(&format!("swap_scroll={}\n", s.swap_scroll));
    out.push_str(&format!("horizontal_scroll={}\n", s.horizontal_scroll));
    out.push_str(&format!("cursor_change={}\n", s.cursor_change));
    out.push_str(&format!("dragged_lock={}\n", s.dragged_lock));
    out.push_str(&format!("send_middle_click={}\n", s.send_middle_click));

    out.push_str("\n[Acceleration]\n");
    out.push_str(&format!("accel_enabled={}\n", s.accel_enabled));
    out.push_str(&format!("accel_preset={}\n", s.accel_preset.name()));
    out.push_str(&format!("custom_accel={}\n", s.custom_accel));
    if let Some(ref t) = s.custom_accel_table {
        out.push_str(&format!(
            "custom_accel_thresholds={}\n",
            serialize_thresholds(t.thresholds())
        ));
        out.push_str(&format!(
            "custom_accel_multipliers={}\n",
            serialize_multipliers(t.multipliers())
        ));
    }

    out.push_str("\n[Real Wheel]\n");
    out.push_str(&format!("real_wheel_mode={}\n", s.real_wheel_mode));
    out.push_str(&format!("wheel_delta={}\n", s.wheel_delta));
    out.push_str(&format!("v_wheel_move={}\n", s.v_wheel_move));
    out.push_str(&format!("h_wheel_move={}\n", s.h_wheel_move));
    out.push_str(&format!("quick_first={}\n", s.quick_first));
    out.push_str(&format!("quick_turn={}\n", s.quick_turn));

    out.push_str("\n[VH Adjuster]\n");
    out.push_str(&format!("vh_adjuster_mode={}\n", s.vh_adjuster_mode));
    out.push_str(&format!("vh_method={}\n", s.vh_method.name()));
    out.push_str(&format!(
        "first_prefer_vertical={}\n",
        s.first_prefer_vertical
    ));
    out.push_str(&format!("first_min_threshold={}\n", s.first_min_threshold));
    out.push_str(&format!("switching_threshold={}\n", s.switching_threshold));

    out.push_str("\n[Keyboard]\n");
    out.push_str(&format!(
        "vk_code={}\n",
        crate::types::vk_name_from_code(s.vk_code)
    ));

    out
}

/// Store settings atomically: write `<path>.tmp`, then rename over `path`.
pub fn store(path: &Path, s: &Settings) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, render(s))?;
    fs::rename(&tmp, path)
}

/// Path of a named profile inside `dir`. "Default" maps to the bare file.
pub fn profile_path(dir: &Path, name: &str) -> PathBuf {
    if name == "Default" {
        dir.join(format!("{}.conf", PROGRAM_NAME))
    } else {
        dir.join(format!("{}.{}.conf", PROGRAM_NAME, name))
    }
}

/// Whether the named profile exists.
pub fn exists(dir: &Path, name: &str) -> bool {
    profile_path(dir, name).exists()
}

/// Names of the non-default profiles in `dir`. `--` prefixed names are
/// reserved for command words and skipped.
pub fn list(dir: &Path) -> Vec<String> {
    let prefix = format!("{}.", PROGRAM_NAME);
    let mut names = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return names;
    };
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(rest) = file_name.strip_prefix(&prefix) else {
            continue;
        };
        let Some(name) = rest.strip_suffix(".conf") else {
            continue;
        };
        if name.is_empty() || name == "Default" || name.starts_with("--") {
            continue;
        }
        names.push(name.to_string());
    }
    names.sort();
    names
}

/// Copy a profile; refuses to overwrite an existing destination.
pub fn copy(dir: &Path, src: &str, dest: &str) -> io::Result<()> {
    let to = profile_path(dir, dest);
    if to.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("profile {:?} already exists", dest),
        ));
    }
    fs::copy(profile_path(dir, src), to).map(|_| ())
}

/// Delete a named profile.
pub fn delete(dir: &Path, name: &str) -> io::Result<()> {
    fs::remove_file(profile_path(dir, name))
}
