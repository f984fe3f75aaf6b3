//! Windows Platform Layer
//!
//! Low-level hook installation, batch injection via SendInput, raw input
//! registration through a message-only window, system cursor swapping and
//! async key state. Everything here runs against the real OS; the core never
//! touches these APIs directly.

use super::{CursorHost, InjectError, Injector, KeyState, MotionSource};
use crate::app::{ControlResponse, Core};
use crate::inject::InjectEvent;
use crate::ipc::ControlCommand;
use crate::types::{KeyEventKind, KeyboardEvent, MouseEvent, MouseEventKind, PointerInfo, Priority};
use log::{error, info, warn};
use once_cell::sync::OnceCell;
use std::mem::size_of;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::{
    GetCurrentProcess, GetCurrentThread, SetPriorityClass, SetThreadPriority,
    ABOVE_NORMAL_PRIORITY_CLASS, HIGH_PRIORITY_CLASS, NORMAL_PRIORITY_CLASS,
    THREAD_PRIORITY_ABOVE_NORMAL,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEINPUT, MOUSE_EVENT_FLAGS,
};
use windows::Win32::UI::Input::{
    GetRawInputData, RegisterRawInputDevices, HRAWINPUT, RAWINPUT, RAWINPUTDEVICE,
    RAWINPUTDEVICE_FLAGS, RAWINPUTHEADER, RIDEV_INPUTSINK, RIDEV_REMOVE, RID_INPUT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, CopyIcon, CreateWindowExW, DefWindowProcW, DispatchMessageW, FindWindowW,
    GetCursorPos, GetMessageW, LoadImageW, PostMessageW, PostQuitMessage, RegisterClassExW,
    SetSystemCursor, SetWindowsHookExW, SystemParametersInfoW, TranslateMessage,
    UnhookWindowsHookEx, HCURSOR, HHOOK, HWND_MESSAGE, IMAGE_CURSOR, KBDLLHOOKSTRUCT,
    LR_DEFAULTSIZE, LR_SHARED, MSG, MSLLHOOKSTRUCT, OCR_HAND, OCR_IBEAM, OCR_NORMAL, OCR_SIZENS,
    OCR_SIZEWE, SPI_SETCURSORS, SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS, WH_KEYBOARD_LL, WH_MOUSE_LL,
    WINDOW_EX_STYLE, WINDOW_STYLE, WM_APP, WM_INPUT, WM_KEYDOWN, WM_KEYUP, WM_LBUTTONDOWN,
    WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEMOVE, WM_RBUTTONDOWN, WM_RBUTTONUP,
    WM_SYSKEYDOWN, WM_SYSKEYUP, WM_XBUTTONDOWN, WM_XBUTTONUP, WNDCLASSEXW,
};

/// Control words arrive on the message window as WM_APP + 1.
const WM_CONTROL: u32 = WM_APP + 1;

const MESSAGE_WINDOW_CLASS: &str = "TrackscrollMessageWindow";

static CORE: OnceCell<Arc<Core>> = OnceCell::new();
static MESSAGE_WINDOW: AtomicIsize = AtomicIsize::new(0);
static MOUSE_HOOK: AtomicIsize = AtomicIsize::new(0);
static KEYBOARD_HOOK: AtomicIsize = AtomicIsize::new(0);

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Raise the calling worker thread above normal priority.
pub fn boost_current_thread() {
    unsafe {
        let _ = SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_ABOVE_NORMAL);
    }
}

/// Apply the configured process priority class.
pub fn apply_process_priority(priority: Priority) {
    let class = match priority {
        Priority::Normal => NORMAL_PRIORITY_CLASS,
        Priority::AboveNormal => ABOVE_NORMAL_PRIORITY_CLASS,
        Priority::High => HIGH_PRIORITY_CLASS,
    };
    unsafe {
        if SetPriorityClass(GetCurrentProcess(), class).is_err() {
            warn!("failed to set process priority");
        }
    }
}

/// Batch injector over SendInput.
#[derive(Debug, Default)]
pub struct WinInjector;

impl Injector for WinInjector {
    fn inject_batch(&self, batch: &[InjectEvent]) -> Result<(), InjectError> {
        let inputs: Vec<INPUT> = batch.iter().map(to_input).collect();
        let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) } as usize;
        if sent == inputs.len() {
            Ok(())
        } else {
            Err(InjectError::Partial {
                sent,
                requested: inputs.len(),
            })
        }
    }
}

fn to_input(ev: &InjectEvent) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: ev.pt.0,
                dy: ev.pt.1,
                mouseData: ev.data as u32,
                dwFlags: MOUSE_EVENT_FLAGS(ev.flags),
                time: ev.time,
                dwExtraInfo: ev.extra as usize,
            },
        },
    }
}

/// System cursor swapper using the shared size cursors.
pub struct WinCursorHost {
    vertical: HCURSOR,
    horizontal: HCURSOR,
}

// HCURSOR handles from LR_SHARED LoadImageW are process-global.
unsafe impl Send for WinCursorHost {}
unsafe impl Sync for WinCursorHost {}

impl WinCursorHost {
    pub fn new() -> Self {
        unsafe {
            let load = |id: u32| -> HCURSOR {
                LoadImageW(
                    None,
                    PCWSTR(id as usize as *const u16),
                    IMAGE_CURSOR,
                    0,
                    0,
                    LR_DEFAULTSIZE | LR_SHARED,
                )
                .map(|h| HCURSOR(h.0))
                .unwrap_or_default()
            };
            WinCursorHost {
                vertical: load(OCR_SIZENS.0),
                horizontal: load(OCR_SIZEWE.0),
            }
        }
    }

    fn change(&self, cursor: HCURSOR) {
        unsafe {
            for id in [OCR_NORMAL, OCR_IBEAM, OCR_HAND] {
                if let Ok(copy) = CopyIcon(windows::Win32::UI::WindowsAndMessaging::HICON(cursor.0))
                {
                    let _ = SetSystemCursor(HCURSOR(copy.0), id);
                }
            }
        }
    }
}

impl Default for WinCursorHost {
    fn default() -> Self {
        WinCursorHost::new()
    }
}

impl CursorHost for WinCursorHost {
    fn change_vertical(&self) {
        self.change(self.vertical);
    }

    fn change_horizontal(&self) {
        self.change(self.horizontal);
    }

    fn restore(&self) {
        unsafe {
            let _ = SystemParametersInfoW(
                SPI_SETCURSORS,
                0,
                None,
                SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
            );
        }
    }

    fn position(&self) -> (i32, i32) {
        let mut pt = windows::Win32::Foundation::POINT::default();
        unsafe {
            let _ = GetCursorPos(&mut pt);
        }
        (pt.x, pt.y)
    }
}

/// Registers the HID mouse for raw deltas targeted at the message window.
#[derive(Debug, Default)]
pub struct WinMotionSource;

const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
const HID_USAGE_GENERIC_MOUSE: u16 = 0x02;

fn register_raw_device(flags: RAWINPUTDEVICE_FLAGS, hwnd: HWND) {
    let device = RAWINPUTDEVICE {
        usUsagePage: HID_USAGE_PAGE_GENERIC,
        usUsage: HID_USAGE_GENERIC_MOUSE,
        dwFlags: flags,
        hwndTarget: hwnd,
    };
    unsafe {
        if RegisterRawInputDevices(&[device], size_of::<RAWINPUTDEVICE>() as u32).is_err() {
            warn!("raw input device registration failed");
        }
    }
}

impl MotionSource for WinMotionSource {
    fn register(&self) {
        let hwnd = HWND(MESSAGE_WINDOW.load(Ordering::Acquire) as *mut _);
        register_raw_device(RIDEV_INPUTSINK, hwnd);
    }

    fn unregister(&self) {
        register_raw_device(RIDEV_REMOVE, HWND::default());
    }
}

/// Async key state over GetAsyncKeyState.
#[derive(Debug, Default)]
pub struct WinKeyState;

impl KeyState for WinKeyState {
    fn is_down(&self, vk: u16) -> bool {
        unsafe { (GetAsyncKeyState(vk as i32) as u16 & 0xF000) != 0 }
    }
}

// ---- hooks ----

fn pointer_info(info: &MSLLHOOKSTRUCT) -> PointerInfo {
    PointerInfo {
        pt: (info.pt.x, info.pt.y),
        mouse_data: info.mouseData,
        flags: info.flags,
        time: info.time,
        extra: info.dwExtraInfo as u32,
    }
}

unsafe extern "system" fn mouse_proc(ncode: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    // ncode < 0: lparam may be invalid; pass through without touching it.
    if ncode < 0 {
        return CallNextHookEx(None, ncode, wparam, lparam);
    }
    let Some(core) = CORE.get() else {
        return CallNextHookEx(None, ncode, wparam, lparam);
    };

    let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
    let pi = pointer_info(info);
    let dispatch = core.dispatch();

    let decision = match wparam.0 as u32 {
        WM_MOUSEMOVE => dispatch.on_mouse(MouseEvent::new(MouseEventKind::Move, pi)),
        WM_LBUTTONDOWN => dispatch.on_mouse(MouseEvent::new(MouseEventKind::LeftDown, pi)),
        WM_LBUTTONUP => dispatch.on_mouse(MouseEvent::new(MouseEventKind::LeftUp, pi)),
        WM_RBUTTONDOWN => dispatch.on_mouse(MouseEvent::new(MouseEventKind::RightDown, pi)),
        WM_RBUTTONUP => dispatch.on_mouse(MouseEvent::new(MouseEventKind::RightUp, pi)),
        WM_MBUTTONDOWN => dispatch.on_mouse(MouseEvent::new(MouseEventKind::MiddleDown, pi)),
        WM_MBUTTONUP => dispatch.on_mouse(MouseEvent::new(MouseEventKind::MiddleUp, pi)),
        WM_XBUTTONDOWN => dispatch.mouse().handle_x(true, pi),
        WM_XBUTTONUP => dispatch.mouse().handle_x(false, pi),
        _ => crate::input::Decision::Pass,
    };

    match decision {
        crate::input::Decision::Pass => CallNextHookEx(None, ncode, wparam, lparam),
        crate::input::Decision::Suppress => LRESULT(1),
    }
}

unsafe extern "system" fn keyboard_proc(ncode: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if ncode < 0 {
        return CallNextHookEx(None, ncode, wparam, lparam);
    }
    let Some(core) = CORE.get() else {
        return CallNextHookEx(None, ncode, wparam, lparam);
    };

    let info = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
    let kind = match wparam.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => KeyEventKind::KeyDown,
        WM_KEYUP | WM_SYSKEYUP => KeyEventKind::KeyUp,
        _ => return CallNextHookEx(None, ncode, wparam, lparam),
    };
    let ke = KeyboardEvent::new(kind, info.vkCode as u16, info.time);

    match core.dispatch().on_key(ke) {
        crate::input::Decision::Pass => CallNextHookEx(None, ncode, wparam, lparam),
        crate::input::Decision::Suppress => LRESULT(1),
    }
}

/// Install the low-level mouse hook. Failure is fatal to startup.
pub fn install_mouse_hook() -> windows::core::Result<()> {
    unsafe {
        let hmodule = GetModuleHandleW(None)?;
        let hhk = SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_proc), Some(hmodule.into()), 0)?;
        MOUSE_HOOK.store(hhk.0 as isize, Ordering::Release);
    }
    info!("mouse hook installed");
    Ok(())
}

/// Install or remove the low-level keyboard hook.
pub fn set_keyboard_hook(enable: bool) -> windows::core::Result<()> {
    unsafe {
        let old = KEYBOARD_HOOK.swap(0, Ordering::AcqRel);
        if old != 0 {
            let _ = UnhookWindowsHookEx(HHOOK(old as *mut _));
        }
        if enable {
            let hmodule = GetModuleHandleW(None)?;
            let hhk = SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), Some(hmodule.into()), 0)?;
            KEYBOARD_HOOK.store(hhk.0 as isize, Ordering::Release);
            info!("keyboard hook installed");
        }
    }
    Ok(())
}

/// Remove both hooks.
pub fn unhook_all() {
    unsafe {
        let mh = MOUSE_HOOK.swap(0, Ordering::AcqRel);
        if mh != 0 {
            let _ = UnhookWindowsHookEx(HHOOK(mh as *mut _));
        }
        let kh = KEYBOARD_HOOK.swap(0, Ordering::AcqRel);
        if kh != 0 {
            let _ = UnhookWindowsHookEx(HHOOK(kh as *mut _));
        }
    }
}

// ---- message window (raw input + control words) ----

fn handle_raw_input(core: &Core, lparam: LPARAM) {
    let mut raw = RAWINPUT::default();
    let mut size = size_of::<RAWINPUT>() as u32;
    let copied = unsafe {
        GetRawInputData(
            HRAWINPUT(lparam.0 as *mut _),
            RID_INPUT,
            Some(&mut raw as *mut RAWINPUT as *mut _),
            &mut size,
            size_of::<RAWINPUTHEADER>() as u32,
        )
    };
    if copied == u32::MAX || copied == 0 {
        return;
    }
    // RIM_TYPEMOUSE with relative motion only.
    if raw.header.dwType == 0 {
        let mouse = unsafe { raw.data.mouse };
        if mouse.usFlags.0 == 0 {
            let (dx, dy) = (mouse.lLastX, mouse.lLastY);
            if dx != 0 || dy != 0 {
                core.on_raw_delta(dx, dy);
            }
        }
    }
}

unsafe extern "system" fn message_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_INPUT => {
            if let Some(core) = CORE.get() {
                handle_raw_input(core, lparam);
            }
            LRESULT(0)
        }
        WM_CONTROL => {
            if let Some(core) = CORE.get() {
                if let Some(cmd) = ControlCommand::decode(wparam.0 as u32) {
                    info!("control word received: {:?}", cmd);
                    if core.apply_control(cmd) == ControlResponse::Exit {
                        PostQuitMessage(0);
                    }
                } else {
                    warn!("unknown control word {:#x}", wparam.0 as u32);
                }
            }
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

fn create_message_window() -> windows::core::Result<HWND> {
    unsafe {
        let class_name = to_wide(MESSAGE_WINDOW_CLASS);
        let hmodule = GetModuleHandleW(None)?;
        let wc = WNDCLASSEXW {
            cbSize: size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(message_wnd_proc),
            hInstance: hmodule.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        RegisterClassExW(&wc);

        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE(0),
            PCWSTR(class_name.as_ptr()),
            PCWSTR::null(),
            WINDOW_STYLE(0),
            0,
            0,
            0,
            0,
            Some(HWND_MESSAGE),
            None,
            Some(hmodule.into()),
            None,
        )?;
        MESSAGE_WINDOW.store(hwnd.0 as isize, Ordering::Release);
        Ok(hwnd)
    }
}

/// Post a control word to a running instance. Returns false when none is
/// listening.
pub fn send_control(cmd: ControlCommand) -> bool {
    unsafe {
        let class_name = to_wide(MESSAGE_WINDOW_CLASS);
        let Ok(hwnd) = FindWindowW(PCWSTR(class_name.as_ptr()), PCWSTR::null()) else {
            return false;
        };
        PostMessageW(
            Some(hwnd),
            WM_CONTROL,
            WPARAM(cmd.encode() as usize),
            LPARAM(0),
        )
        .is_ok()
    }
}

/// Install the platform plumbing and pump messages until exit.
pub fn run(core: Arc<Core>) -> anyhow::Result<()> {
    apply_process_priority(core.config().snapshot().priority);

    CORE.set(core.clone())
        .map_err(|_| anyhow::anyhow!("platform already initialized"))?;
    create_message_window().map_err(|e| anyhow::anyhow!("message window: {}", e))?;

    install_mouse_hook().map_err(|e| anyhow::anyhow!("mouse hook install failed: {}", e))?;
    if core.config().keyboard_hook() {
        if let Err(e) = set_keyboard_hook(true) {
            error!("keyboard hook install failed: {}", e);
        }
    }

    unsafe {
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    unhook_all();
    core.store_profile();
    Ok(())
}
