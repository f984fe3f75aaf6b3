//! Application Core
//!
//! Composes the pipeline: config store, latches, injection queue, scroll
//! control, waiter and the two classifiers. The platform layer holds one
//! `Core` and routes hook callbacks, raw deltas and control words into it.

use crate::config::{profile, ConfigStore, Settings};
use crate::inject::{InjectorWorker, InputQueue, Resend, QUEUE_CAPACITY};
use crate::input::dispatch::HookDispatch;
use crate::input::keyboard::KeyDispatch;
use crate::input::mouse::MouseDispatch;
use crate::input::waiter::Waiter;
use crate::input::LastFlags;
use crate::ipc::ControlCommand;
use crate::platform::{CursorHost, Injector, KeyState, MotionSource};
use log::{info, warn};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// OS services the core is wired to.
pub struct Collaborators {
    pub injector: Arc<dyn Injector>,
    pub cursor: Arc<dyn CursorHost>,
    pub motion: Arc<dyn MotionSource>,
    pub keys: Arc<dyn KeyState>,
}

/// What the host should do after a control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlResponse {
    Continue,
    Exit,
}

/// The assembled event pipeline.
pub struct Core {
    config: Arc<ConfigStore>,
    flags: Arc<LastFlags>,
    scroll: Arc<crate::scroll::ScrollCtl>,
    waiter: Arc<Waiter>,
    queue: Arc<InputQueue>,
    dispatch: Arc<HookDispatch>,
    profile_dir: PathBuf,
    profile_name: Mutex<String>,
    _injector_worker: InjectorWorker,
}

impl Core {
    /// Build the pipeline from explicit settings.
    pub fn with_settings(
        settings: Settings,
        profile_dir: PathBuf,
        profile_name: String,
        collab: Collaborators,
    ) -> Arc<Core> {
        let config = Arc::new(ConfigStore::new(settings));
        let queue = Arc::new(InputQueue::new(QUEUE_CAPACITY));
        let resend = Arc::new(Resend::new(queue.clone()));
        let injector_worker = InjectorWorker::spawn(queue.clone(), collab.injector);
        let flags = Arc::new(LastFlags::new());
        let scroll = Arc::new(crate::scroll::ScrollCtl::new(
            config.clone(),
            resend.clone(),
            collab.cursor.clone(),
            collab.motion,
        ));
        let waiter = Arc::new(Waiter::new(
            config.clone(),
            flags.clone(),
            scroll.clone(),
            resend.clone(),
        ));
        let mouse = Arc::new(MouseDispatch::new(
            config.clone(),
            flags.clone(),
            scroll.clone(),
            waiter.clone(),
            resend,
            collab.cursor,
            collab.keys,
        ));
        let keyboard = Arc::new(KeyDispatch::new(config.clone(), flags.clone(), scroll.clone()));
        config.register_observer(mouse.clone());
        config.register_observer(keyboard.clone());

        let dispatch = Arc::new(HookDispatch::new(config.clone(), mouse, keyboard));
        Arc::new(Core {
            config,
            flags,
            scroll,
            waiter,
            queue,
            dispatch,
            profile_dir,
            profile_name: Mutex::new(profile_name),
            _injector_worker: injector_worker,
        })
    }

    /// Build the pipeline from a named profile on disk.
    pub fn load(profile_dir: PathBuf, profile_name: String, collab: Collaborators) -> Arc<Core> {
        let path = profile::profile_path(&profile_dir, &profile_name);
        let settings = profile::load(&path);
        info!("loaded profile {:?} from {:?}", profile_name, path);
        Core::with_settings(settings, profile_dir, profile_name, collab)
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn dispatch(&self) -> &Arc<HookDispatch> {
        &self.dispatch
    }

    pub fn queue(&self) -> &Arc<InputQueue> {
        &self.queue
    }

    pub fn profile_name(&self) -> String {
        self.profile_name.lock().clone()
    }

    /// Raw pointer delta from the OS motion source.
    pub fn on_raw_delta(&self, dx: i32, dy: i32) {
        self.scroll.on_raw_delta(dx, dy);
    }

    /// Reset every piece of per-session state.
    pub fn init_state(&self) {
        info!("resetting pipeline state");
        self.config.notify_state_reset();
        self.flags.clear();
        self.waiter.cancel();
        self.scroll.exit_scroll();
    }

    /// Re-read the selected profile and publish it.
    pub fn reload_profile(&self) {
        let name = self.profile_name();
        let path = profile::profile_path(&self.profile_dir, &name);
        let settings = profile::load(&path);
        info!("reloaded profile {:?}", name);
        self.config.apply(settings);
    }

    /// Persist the current settings to the selected profile.
    pub fn store_profile(&self) {
        let name = self.profile_name();
        let path = profile::profile_path(&self.profile_dir, &name);
        if let Err(e) = profile::store(&path, &self.config.snapshot()) {
            warn!("failed to store profile {:?}: {}", name, e);
        }
    }

    /// Apply a control-channel command.
    pub fn apply_control(&self, cmd: ControlCommand) -> ControlResponse {
        match cmd {
            ControlCommand::Exit => return ControlResponse::Exit,
            ControlCommand::SetPassMode(on) => self.config.set_pass_mode(on),
            ControlCommand::ReloadProfile => self.reload_profile(),
            ControlCommand::ResetState => self.init_state(),
        }
        ControlResponse::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Decision;
    use crate::platform::{NullCursorHost, NullInjector, NullKeyState, NullMotionSource};
    use crate::types::{MouseEvent, MouseEventKind, PointerInfo, Trigger};

    fn null_collaborators() -> Collaborators {
        Collaborators {
            injector: Arc::new(NullInjector),
            cursor: Arc::new(NullCursorHost),
            motion: Arc::new(NullMotionSource),
            keys: Arc::new(NullKeyState),
        }
    }

    fn core() -> Arc<Core> {
        let mut settings = Settings::default();
        settings.trigger = Trigger::Middle;
        settings.accel_enabled = false;
        Core::with_settings(
            settings,
            std::env::temp_dir(),
            "Default".to_string(),
            null_collaborators(),
        )
    }

    #[test]
    fn test_end_to_end_scroll_cycle() {
        use crate::inject::{flags, InjectEvent};
        use crate::platform::{InjectError, Injector};
        use parking_lot::Mutex;
        use std::time::{Duration, Instant};

        struct CaptureInjector {
            events: Mutex<Vec<InjectEvent>>,
        }
        impl Injector for CaptureInjector {
            fn inject_batch(&self, batch: &[InjectEvent]) -> Result<(), InjectError> {
                self.events.lock().extend_from_slice(batch);
                Ok(())
            }
        }

        let injector = Arc::new(CaptureInjector {
            events: Mutex::new(Vec::new()),
        });
        let mut settings = Settings::default();
        settings.trigger = crate::types::Trigger::Middle;
        settings.accel_enabled = false;
        let core = Core::with_settings(
            settings,
            std::env::temp_dir(),
            "Default".to_string(),
            Collaborators {
                injector: injector.clone(),
                cursor: Arc::new(crate::platform::NullCursorHost),
                motion: Arc::new(crate::platform::NullMotionSource),
                keys: Arc::new(crate::platform::NullKeyState),
            },
        );

        let down = MouseEvent::new(MouseEventKind::MiddleDown, PointerInfo::at(0, 0, 1000));
        assert_eq!(core.dispatch().on_mouse(down), Decision::Suppress);

        // Raw deltas now translate into injected wheel traffic.
        for _ in 0..3 {
            core.on_raw_delta(0, 10);
        }
        let deadline = Instant::now() + Duration::from_secs(2);
        while injector.events.lock().len() < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        {
            let events = injector.events.lock();
            assert_eq!(events.len(), 3);
            assert!(events.iter().all(|e| e.flags == flags::WHEEL));
            // Positive dy scrolls down: negative wheel value.
            assert!(events.iter().all(|e| e.data == -10));
        }

        let up = MouseEvent::new(MouseEventKind::MiddleUp, PointerInfo::at(0, 0, 1400));
        assert_eq!(core.dispatch().on_mouse(up), Decision::Suppress);
    }

    #[test]
    fn test_control_commands() {
        let core = core();
        assert_eq!(
            core.apply_control(ControlCommand::SetPassMode(true)),
            ControlResponse::Continue
        );
        assert!(core.config().is_pass_mode());

        assert_eq!(
            core.apply_control(ControlCommand::ResetState),
            ControlResponse::Continue
        );
        assert_eq!(
            core.apply_control(ControlCommand::Exit),
            ControlResponse::Exit
        );
    }

    #[test]
    fn test_init_state_clears_scroll() {
        let core = core();
        let down = MouseEvent::new(MouseEventKind::MiddleDown, PointerInfo::at(0, 0, 0));
        core.dispatch().on_mouse(down);
        core.init_state();
        let mv = MouseEvent::new(MouseEventKind::Move, PointerInfo::at(1, 1, 10));
        // Back to idle: motion passes through.
        assert_eq!(core.dispatch().on_mouse(mv), Decision::Pass);
    }
}
