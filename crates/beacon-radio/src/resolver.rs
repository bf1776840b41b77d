//! Runtime discovery of the firmware's radio request routine.
//!
//! The compiler places a 32-bit literal a fixed distance after the
//! routine's first instruction. The literal sits in flash in big-endian
//! byte order relative to its value, so the scan compares against
//! `signature.to_be_bytes()`. The first hit, minus that fixed distance,
//! is the entry point.
//!
//! When the signature is missing the configured fallback entry is used.
//! It is only known to be right for one firmware build; there is no way
//! to check it from here.

use beacon_core::config::FirmwareConfig;

use crate::dispatcher::DispatcherHandle;
use crate::error::BeaconError;

/// A readable slice of the address space, tagged with its base address.
#[derive(Debug, Clone, Copy)]
pub struct ScanWindow<'a> {
    base: usize,
    bytes: &'a [u8],
}

impl<'a> ScanWindow<'a> {
    pub fn new(base: usize, bytes: &'a [u8]) -> Self {
        Self { base, bytes }
    }

    /// View `start..end` of the running process's own address space.
    ///
    /// # Safety
    ///
    /// The whole range must be mapped, readable and never written for the
    /// lifetime of the process (e.g. execute-in-place flash).
    pub unsafe fn from_raw_range(start: usize, end: usize) -> ScanWindow<'static> {
        let len = end.saturating_sub(start);
        ScanWindow {
            base: start,
            bytes: std::slice::from_raw_parts(start as *const u8, len),
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// One past the last address covered.
    pub fn end(&self) -> usize {
        self.base + self.bytes.len()
    }
}

/// The literal to look for and where it sits relative to the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub pattern: u32,
    pub offset: usize,
}

impl From<&FirmwareConfig> for Signature {
    fn from(firmware: &FirmwareConfig) -> Self {
        Self {
            pattern: firmware.signature,
            offset: firmware.signature_offset,
        }
    }
}

/// Scan `window` for `signature`. Fails only when no usable match exists.
pub fn try_resolve(window: &ScanWindow<'_>, signature: Signature) -> Result<DispatcherHandle, BeaconError> {
    let needle = signature.pattern.to_be_bytes();
    for (position, candidate) in window.bytes.windows(needle.len()).enumerate() {
        if candidate != needle.as_slice() {
            continue;
        }
        let match_address = window.base + position;
        // A hit closer to the window base than the offset cannot be ours.
        if let Some(entry) = match_address.checked_sub(signature.offset) {
            tracing::debug!(
                match_address = %format!("0x{match_address:08x}"),
                entry = %format!("0x{entry:08x}"),
                "signature found"
            );
            return Ok(DispatcherHandle::from_address(entry));
        }
    }
    Err(BeaconError::AddressNotResolved {
        start: window.base(),
        end: window.end(),
    })
}

/// Resolve the request routine, falling back to the configured address.
///
/// Always yields a handle. Run once at startup, before any command is sent.
pub fn resolve(window: &ScanWindow<'_>, firmware: &FirmwareConfig) -> DispatcherHandle {
    match try_resolve(window, Signature::from(firmware)) {
        Ok(handle) => {
            tracing::info!(entry = %handle, "radio request routine resolved by scan");
            handle
        }
        Err(e) => {
            let handle = DispatcherHandle::from_address(firmware.fallback_entry);
            tracing::warn!(
                error = %e,
                entry = %handle,
                "signature not found, using fallback entry point"
            );
            handle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: usize = 0x0800_0000;

    fn firmware() -> FirmwareConfig {
        FirmwareConfig {
            scan_start: BASE,
            scan_end: BASE + 0x400,
            signature: 0x3368_0446,
            signature_offset: 6,
            fallback_entry: 0x0801_61e8,
        }
    }

    fn image_with_signature_at(position: usize) -> Vec<u8> {
        let mut image = vec![0u8; 0x400];
        image[position..position + 4].copy_from_slice(&[0x33, 0x68, 0x04, 0x46]);
        image
    }

    #[test]
    fn finds_entry_before_signature() {
        let image = image_with_signature_at(0x106);
        let window = ScanWindow::new(BASE, &image);
        let handle = resolve(&window, &firmware());
        assert_eq!(handle.address(), BASE + 0x100);
        assert_eq!(handle.entry(), BASE + 0x101);
    }

    #[test]
    fn falls_back_without_signature() {
        let image = vec![0u8; 0x400];
        let window = ScanWindow::new(BASE, &image);
        let handle = resolve(&window, &firmware());
        assert_eq!(handle.entry(), 0x0801_61e9);
    }

    #[test]
    fn native_byte_order_does_not_match() {
        let mut image = vec![0u8; 0x400];
        image[0x106..0x10a].copy_from_slice(&0x3368_0446u32.to_le_bytes());
        let window = ScanWindow::new(BASE, &image);
        let err = try_resolve(&window, Signature::from(&firmware())).unwrap_err();
        assert_eq!(
            err,
            BeaconError::AddressNotResolved { start: BASE, end: BASE + 0x400 }
        );
    }

    #[test]
    fn first_match_wins() {
        let mut image = image_with_signature_at(0x206);
        image[0x306..0x30a].copy_from_slice(&[0x33, 0x68, 0x04, 0x46]);
        let window = ScanWindow::new(BASE, &image);
        let handle = try_resolve(&window, Signature::from(&firmware())).unwrap();
        assert_eq!(handle.address(), BASE + 0x200);
    }

    #[test]
    fn signature_in_last_four_bytes_is_found() {
        let image = image_with_signature_at(0x3fc);
        let window = ScanWindow::new(BASE, &image);
        let handle = try_resolve(&window, Signature::from(&firmware())).unwrap();
        assert_eq!(handle.address(), BASE + 0x3f6);
    }

    #[test]
    fn raw_range_scans_process_memory() {
        let image = image_with_signature_at(0x106);
        let start = image.as_ptr() as usize;
        let window = unsafe { ScanWindow::from_raw_range(start, start + image.len()) };
        assert_eq!(window.base(), start);
        assert_eq!(window.end(), start + 0x400);
        let handle = try_resolve(&window, Signature::from(&firmware())).unwrap();
        assert_eq!(handle.address(), start + 0x100);
    }

    #[test]
    fn hit_too_close_to_base_is_skipped() {
        let image = image_with_signature_at(0x2);
        let window = ScanWindow::new(0, &image);
        assert!(try_resolve(&window, Signature::from(&firmware())).is_err());
    }
}
