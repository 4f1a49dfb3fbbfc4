//! C-callable functions over [`Connection`].
//!
//! Enabled with the `capi` feature and built into the `cdylib` artifact.
//!
//! ```c
//! typedef void* Slmp;
//!
//! Slmp    slmp_connect(const char* ip, uint16_t port);   // NULL on failure
//! void    slmp_shutdown(Slmp slmp);                      // frees the handle
//! int32_t slmp_read_words(Slmp slmp, uint8_t device, uint32_t head, uint16_t number, uint16_t* data);
//! int32_t slmp_write_words(Slmp slmp, uint8_t device, uint32_t head, uint16_t number, const uint16_t* data);
//! int32_t slmp_read_bits(Slmp slmp, uint8_t device, uint32_t head, uint16_t number, uint8_t* data);
//! int32_t slmp_write_bits(Slmp slmp, uint8_t device, uint32_t head, uint16_t number, const uint8_t* data);
//! ```
//!
//! `device` is the device wire code:
//!
//! | Device | Code |
//! |--------|:----:|
//! | D | `0xA8` |
//! | R | `0xAF` |
//! | ZR | `0xB0` |
//! | M | `0x90` |
//! | X | `0x9C` |
//! | Y | `0x9D` |
//!
//! Small selector values such as `1` or `3`, used by older callers of the
//! previous C library, are not device codes. They are rejected with
//! [`CODE_INVALID_ADDRESS`] and nothing is sent; such callers must pass the
//! codes above. The previous header also had no `device` argument on the
//! word functions, so this is not a drop-in binary replacement.
//!
//! The `int32_t` results are `0` on success, otherwise [`SlmpError::code`]. A
//! null handle or data pointer, or an unknown device code, returns
//! [`CODE_INVALID_ADDRESS`].
//!
//! `slmp_shutdown` releases the handle; calling it twice on the same handle
//! is undefined behaviour.

use std::ffi::{c_char, c_void, CStr};
use std::slice;

use crate::client::Connection;
use crate::device::DeviceKind;
use crate::error::{Result, CODE_INVALID_ADDRESS};

/// Opaque connection handle.
pub type SlmpHandle = *mut c_void;

fn result_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            log::debug!("capi call failed: {}", e);
            e.code()
        }
    }
}

/// Borrows the connection behind `handle`.
///
/// # Safety
///
/// `handle` must be null or a live pointer returned by [`slmp_connect`].
unsafe fn connection<'a>(handle: SlmpHandle) -> Option<&'a mut Connection> {
    (handle as *mut Connection).as_mut()
}

/// Connects to `ip:port`. Returns null if the connection fails.
///
/// # Safety
///
/// `ip` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn slmp_connect(ip: *const c_char, port: u16) -> SlmpHandle {
    if ip.is_null() {
        return std::ptr::null_mut();
    }
    let host = match CStr::from_ptr(ip).to_str() {
        Ok(host) => host,
        Err(_) => return std::ptr::null_mut(),
    };
    match Connection::connect(host, port) {
        Ok(conn) => Box::into_raw(Box::new(conn)) as SlmpHandle,
        Err(e) => {
            log::debug!("slmp_connect failed: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// Closes the connection and frees the handle.
///
/// # Safety
///
/// `handle` must be null or a pointer returned by [`slmp_connect`] that has
/// not been shut down yet.
#[no_mangle]
pub unsafe extern "C" fn slmp_shutdown(handle: SlmpHandle) {
    if handle.is_null() {
        return;
    }
    let conn = Box::from_raw(handle as *mut Connection);
    if let Err(e) = conn.shutdown() {
        log::debug!("slmp_shutdown failed: {}", e);
    }
}

/// Reads `number` words into `data`.
///
/// # Safety
///
/// `handle` as for [`slmp_shutdown`]; `data` must be valid for `number` writes.
#[no_mangle]
pub unsafe extern "C" fn slmp_read_words(
    handle: SlmpHandle,
    device: u8,
    head: u32,
    number: u16,
    data: *mut u16,
) -> i32 {
    let (Some(conn), Some(kind)) = (connection(handle), DeviceKind::from_code(device)) else {
        return CODE_INVALID_ADDRESS;
    };
    if data.is_null() {
        return CODE_INVALID_ADDRESS;
    }
    result_code(conn.read_words(kind, head, number).map(|words| {
        slice::from_raw_parts_mut(data, words.len()).copy_from_slice(&words);
    }))
}

/// Writes `number` words from `data`.
///
/// # Safety
///
/// `handle` as for [`slmp_shutdown`]; `data` must be valid for `number` reads.
#[no_mangle]
pub unsafe extern "C" fn slmp_write_words(
    handle: SlmpHandle,
    device: u8,
    head: u32,
    number: u16,
    data: *const u16,
) -> i32 {
    let (Some(conn), Some(kind)) = (connection(handle), DeviceKind::from_code(device)) else {
        return CODE_INVALID_ADDRESS;
    };
    if data.is_null() {
        return CODE_INVALID_ADDRESS;
    }
    let values = slice::from_raw_parts(data, usize::from(number));
    result_code(conn.write_words(kind, head, values))
}

/// Reads `number` bits into `data`, one byte (0 or 1) per point.
///
/// # Safety
///
/// `handle` as for [`slmp_shutdown`]; `data` must be valid for `number` writes.
#[no_mangle]
pub unsafe extern "C" fn slmp_read_bits(
    handle: SlmpHandle,
    device: u8,
    head: u32,
    number: u16,
    data: *mut u8,
) -> i32 {
    let (Some(conn), Some(kind)) = (connection(handle), DeviceKind::from_code(device)) else {
        return CODE_INVALID_ADDRESS;
    };
    if data.is_null() {
        return CODE_INVALID_ADDRESS;
    }
    result_code(conn.read_bits(kind, head, number).map(|bits| {
        slice::from_raw_parts_mut(data, bits.len()).copy_from_slice(&bits);
    }))
}

/// Writes `number` bits from `data`, one byte per point (non-zero = ON).
///
/// # Safety
///
/// `handle` as for [`slmp_shutdown`]; `data` must be valid for `number` reads.
#[no_mangle]
pub unsafe extern "C" fn slmp_write_bits(
    handle: SlmpHandle,
    device: u8,
    head: u32,
    number: u16,
    data: *const u8,
) -> i32 {
    let (Some(conn), Some(kind)) = (connection(handle), DeviceKind::from_code(device)) else {
        return CODE_INVALID_ADDRESS;
    };
    if data.is_null() {
        return CODE_INVALID_ADDRESS;
    }
    let bits = slice::from_raw_parts(data, usize::from(number));
    result_code(conn.write_bits(kind, head, bits))
}
