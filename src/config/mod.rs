//! Configuration Store
//!
//! Typed settings with defaults and clamped ranges, published behind a
//! read/write lock. The hook path takes cheap read snapshots; writes happen
//! only from the settings surface and profile loads. Publishing a new trigger
//! notifies the registered observers so the classifiers can swap their
//! handler mode and drop stale per-event state.

pub mod profile;

use crate::scroll::accel::AccelTable;
use crate::types::{AccelPreset, Priority, Trigger, VhMethod};
use log::info;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Observer of configuration mode changes.
///
/// The mouse and keyboard classifiers register one each; the config store
/// notifies them instead of the modules holding function pointers into each
/// other.
pub trait ModeObserver: Send + Sync {
    /// A new trigger was published.
    fn trigger_changed(&self, _new: Trigger) {}
    /// Full state reset requested (ESC, control command).
    fn state_reset(&self) {}
}

/// All tunable settings. Every field has a defined default; numeric fields
/// are clamped to the ranges in [`profile::NUMBER_RANGES`] when loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub trigger: Trigger,
    pub poll_timeout: u32,
    pub pass_mode: bool,
    pub keyboard_hook: bool,
    pub priority: Priority,
    /// Seconds between hook liveness checks; 0 disables the watchdog.
    pub health_check_interval: u32,

    pub scroll_lock_time: u32,
    pub vertical_threshold: i32,
    pub horizontal_threshold: i32,
    pub drag_threshold: i32,
    pub reverse_scroll: bool,
    pub swap_scroll: bool,
    pub horizontal_scroll: bool,
    pub cursor_change: bool,
    pub dragged_lock: bool,
    pub send_middle_click: bool,

    pub accel_enabled: bool,
    pub accel_preset: AccelPreset,
    pub custom_accel: bool,
    pub custom_accel_table: Option<AccelTable>,

    pub real_wheel_mode: bool,
    pub wheel_delta: i32,
    pub v_wheel_move: i32,
    pub h_wheel_move: i32,
    pub quick_first: bool,
    pub quick_turn: bool,

    pub vh_adjuster_mode: bool,
    pub vh_method: VhMethod,
    pub first_prefer_vertical: bool,
    pub first_min_threshold: i32,
    pub switching_threshold: i32,

    pub vk_code: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            trigger: Trigger::Lr,
            poll_timeout: 200,
            pass_mode: false,
            keyboard_hook: false,
            priority: Priority::AboveNormal,
            health_check_interval: 0,

            scroll_lock_time: 200,
            vertical_threshold: 0,
            horizontal_threshold: 75,
            drag_threshold: 0,
            reverse_scroll: false,
            swap_scroll: false,
            horizontal_scroll: true,
            cursor_change: true,
            dragged_lock: false,
            send_middle_click: false,

            accel_enabled: true,
            accel_preset: AccelPreset::M5,
            custom_accel: false,
            custom_accel_table: None,

            real_wheel_mode: false,
            wheel_delta: 120,
            v_wheel_move: 60,
            h_wheel_move: 60,
            quick_first: false,
            quick_turn: false,

            vh_adjuster_mode: false,
            vh_method: VhMethod::Switching,
            first_prefer_vertical: true,
            first_min_threshold: 5,
            switching_threshold: 50,

            vk_code: 0x1D, // VK_NONCONVERT
        }
    }
}

impl Settings {
    /// Effective acceleration table, if acceleration applies at all.
    pub fn accel_table(&self) -> Option<AccelTable> {
        if !self.accel_enabled {
            return None;
        }
        if self.custom_accel {
            if let Some(ref t) = self.custom_accel_table {
                return Some(t.clone());
            }
        }
        Some(AccelTable::preset(self.accel_preset))
    }

    /// VH adjuster only engages when horizontal scrolling is on.
    pub fn vh_adjuster_active(&self) -> bool {
        self.horizontal_scroll && self.vh_adjuster_mode
    }
}

/// Shared, read-mostly configuration publication point.
pub struct ConfigStore {
    inner: RwLock<Settings>,
    // Mirrors `Settings::pass_mode` so the dispatch gate never takes the lock.
    pass_mode: AtomicBool,
    observers: Mutex<Vec<Arc<dyn ModeObserver>>>,
}

impl ConfigStore {
    pub fn new(settings: Settings) -> Self {
        let pass = settings.pass_mode;
        ConfigStore {
            inner: RwLock::new(settings),
            pass_mode: AtomicBool::new(pass),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer for trigger changes and state resets.
    pub fn register_observer(&self, obs: Arc<dyn ModeObserver>) {
        self.observers.lock().push(obs);
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.inner.read().clone()
    }

    pub fn trigger(&self) -> Trigger {
        self.inner.read().trigger
    }

    pub fn poll_timeout(&self) -> u32 {
        self.inner.read().poll_timeout
    }

    pub fn scroll_lock_time(&self) -> u32 {
        self.inner.read().scroll_lock_time
    }

    pub fn drag_threshold(&self) -> i32 {
        self.inner.read().drag_threshold
    }

    pub fn cursor_change(&self) -> bool {
        self.inner.read().cursor_change
    }

    pub fn dragged_lock(&self) -> bool {
        self.inner.read().dragged_lock
    }

    pub fn send_middle_click(&self) -> bool {
        self.inner.read().send_middle_click
    }

    pub fn keyboard_hook(&self) -> bool {
        self.inner.read().keyboard_hook
    }

    pub fn vk_code(&self) -> u16 {
        self.inner.read().vk_code
    }

    pub fn health_check_interval(&self) -> u32 {
        self.inner.read().health_check_interval
    }

    pub fn is_pass_mode(&self) -> bool {
        self.pass_mode.load(Ordering::Acquire)
    }

    pub fn set_pass_mode(&self, on: bool) {
        self.inner.write().pass_mode = on;
        self.pass_mode.store(on, Ordering::Release);
        info!("pass mode {}", if on { "on" } else { "off" });
    }

    /// Publish a new trigger and notify the classifiers.
    pub fn set_trigger(&self, t: Trigger) {
        self.inner.write().trigger = t;
        info!("trigger changed to {}", t.name());
        self.notify_trigger_changed(t);
    }

    /// Mutate settings wholesale (settings surface, profile reload) and
    /// republish the trigger-derived state.
    pub fn apply(&self, settings: Settings) {
        let trigger = settings.trigger;
        let pass = settings.pass_mode;
        *self.inner.write() = settings;
        self.pass_mode.store(pass, Ordering::Release);
        self.notify_trigger_changed(trigger);
    }

    /// Run a closure against the settings under the write lock, then
    /// republish the trigger.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        let trigger = {
            let mut inner = self.inner.write();
            f(&mut inner);
            self.pass_mode.store(inner.pass_mode, Ordering::Release);
            inner.trigger
        };
        self.notify_trigger_changed(trigger);
    }

    /// Ask every observer to drop its per-event tracking state.
    pub fn notify_state_reset(&self) {
        for obs in self.observers.lock().iter() {
            obs.state_reset();
        }
    }

    fn notify_trigger_changed(&self, t: Trigger) {
        for obs in self.observers.lock().iter() {
            obs.trigger_changed(t);
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        ConfigStore::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingObserver {
        changed: AtomicUsize,
        reset: AtomicUsize,
    }

    impl ModeObserver for CountingObserver {
        fn trigger_changed(&self, _new: Trigger) {
            self.changed.fetch_add(1, Ordering::SeqCst);
        }
        fn state_reset(&self) {
            self.reset.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.trigger, Trigger::Lr);
        assert_eq!(s.poll_timeout, 200);
        assert_eq!(s.scroll_lock_time, 200);
        assert_eq!(s.vertical_threshold, 0);
        assert_eq!(s.horizontal_threshold, 75);
        assert_eq!(s.wheel_delta, 120);
        assert_eq!(s.v_wheel_move, 60);
        assert_eq!(s.first_min_threshold, 5);
        assert_eq!(s.switching_threshold, 50);
        assert_eq!(s.health_check_interval, 0);
        assert_eq!(s.vk_code, 0x1D);
    }

    #[test]
    fn test_accel_table_resolution() {
        let mut s = Settings::default();
        assert!(s.accel_table().is_some());
        s.accel_enabled = false;
        assert!(s.accel_table().is_none());

        s.accel_enabled = true;
        s.custom_accel = true;
        // Custom flag without a table falls back to the preset.
        let preset = s.accel_table().unwrap();
        assert_eq!(preset.thresholds(), AccelTable::preset(s.accel_preset).thresholds());

        let custom = AccelTable::new(vec![1, 10], vec![2.0, 3.0]).unwrap();
        s.custom_accel_table = Some(custom.clone());
        assert_eq!(s.accel_table().unwrap(), custom);
    }

    #[test]
    fn test_vh_adjuster_requires_horizontal() {
        let mut s = Settings::default();
        s.vh_adjuster_mode = true;
        assert!(s.vh_adjuster_active());
        s.horizontal_scroll = false;
        assert!(!s.vh_adjuster_active());
    }

    #[test]
    fn test_trigger_change_notifies_observers() {
        let store = ConfigStore::default();
        let obs = Arc::new(CountingObserver {
            changed: AtomicUsize::new(0),
            reset: AtomicUsize::new(0),
        });
        store.register_observer(obs.clone());
        store.set_trigger(Trigger::Middle);
        assert_eq!(store.trigger(), Trigger::Middle);
        assert_eq!(obs.changed.load(Ordering::SeqCst), 1);
        store.notify_state_reset();
        assert_eq!(obs.reset.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pass_mode_mirror() {
        let store = ConfigStore::default();
        assert!(!store.is_pass_mode());
        store.set_pass_mode(true);
        assert!(store.is_pass_mode());
        assert!(store.snapshot().pass_mode);
        store.update(|s| s.pass_mode = false);
        assert!(!store.is_pass_mode());
    }
}
