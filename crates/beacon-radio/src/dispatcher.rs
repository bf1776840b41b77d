//! Radio command dispatch.
//!
//! The controller firmware exposes a single request routine that takes
//! a command group, a command id, a parameter block and a response
//! buffer. It has no stable symbol, so callers reach it through a
//! [`DispatcherHandle`] produced by [`crate::resolver`]. Everything above
//! this module talks to a [`CommandDispatcher`] and never sees an address.

use libc::{c_int, c_void};
use std::fmt;

use beacon_core::wire::MAX_COMMAND_PARAMS;

/// Low address bit selecting the compact (Thumb) instruction set on a branch.
pub const THUMB_BIT: usize = 0x1;

/// Sends one raw command to the controller.
pub trait CommandDispatcher: Send + Sync {
    /// Issue `command` in `group` with `request` as its parameter block.
    ///
    /// The controller's reply is written into `response`. A negative return
    /// means the transport failed and `response` was not touched.
    fn dispatch(&self, group: u16, command: u16, request: &[u8], response: &mut [u8]) -> i32;
}

/// Resolved entry point of the firmware's request routine.
///
/// Immutable once resolved. The stored value already carries
/// [`THUMB_BIT`], so it can be branched to directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatcherHandle {
    entry: usize,
}

impl DispatcherHandle {
    pub(crate) fn from_address(address: usize) -> Self {
        Self {
            entry: address | THUMB_BIT,
        }
    }

    /// Branch target, execution-mode bit included.
    pub fn entry(&self) -> usize {
        self.entry
    }

    /// Code address, execution-mode bit cleared.
    pub fn address(&self) -> usize {
        self.entry & !THUMB_BIT
    }
}

impl fmt::Display for DispatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.entry)
    }
}

// ── Native dispatch ──────────────────────────────────────────────────────────

/// Request block the firmware routine expects, field for field.
#[repr(C)]
#[derive(Debug)]
pub struct HciRequest {
    pub ogf: u16,
    pub ocf: u16,
    pub event: c_int,
    pub cparam: *mut c_void,
    pub clen: c_int,
    pub rparam: *mut c_void,
    pub rlen: c_int,
}

type SendRequestFn = unsafe extern "C" fn(*mut HciRequest, u8) -> c_int;

/// Calls the firmware request routine in-process through its handle.
pub struct NativeDispatcher {
    send: SendRequestFn,
}

impl NativeDispatcher {
    /// # Safety
    ///
    /// `handle` must be the entry point of the firmware request routine of
    /// the running image, taking `(*mut HciRequest, u8)` and returning a
    /// C int with the C calling convention. Nothing here can verify that:
    /// a fallback handle on an unknown firmware build jumps into arbitrary
    /// code.
    pub unsafe fn new(handle: DispatcherHandle) -> Self {
        Self::from_entry(handle.entry())
    }

    /// Bind to a raw branch target, execution-mode bit already applied.
    ///
    /// # Safety
    ///
    /// Same contract as [`new`](Self::new).
    unsafe fn from_entry(entry: usize) -> Self {
        Self {
            send: std::mem::transmute::<usize, SendRequestFn>(entry),
        }
    }
}

impl CommandDispatcher for NativeDispatcher {
    fn dispatch(&self, group: u16, command: u16, request: &[u8], response: &mut [u8]) -> i32 {
        if request.len() > MAX_COMMAND_PARAMS {
            return -1;
        }
        let mut params = [0u8; MAX_COMMAND_PARAMS];
        params[..request.len()].copy_from_slice(request);

        let mut rq = HciRequest {
            ogf: group,
            ocf: command,
            event: 0,
            cparam: if request.is_empty() {
                std::ptr::null_mut()
            } else {
                params.as_mut_ptr().cast()
            },
            clen: request.len() as c_int,
            rparam: response.as_mut_ptr().cast(),
            rlen: response.len() as c_int,
        };
        // Synchronous request (async = 0).
        unsafe { (self.send)(&mut rq, 0) }
    }
}
