//! Minimal CoreFoundation bindings for bookmarks and application preferences.

#![allow(non_upper_case_globals)]

use std::ffi::{c_int, c_void};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

pub(crate) type CFTypeRef = *const c_void;
type CFAllocatorRef = *const c_void;
type CFIndex = isize;
type CFOptionFlags = usize;
type CFTypeID = usize;
type Boolean = u8;
pub(crate) type CFStringRef = *const c_void;
type CFDataRef = *const c_void;
type CFURLRef = *const c_void;
type CFErrorRef = *const c_void;
type CFArrayRef = *const c_void;

const kCFStringEncodingUTF8: u32 = 0x0800_0100;
const kCFURLBookmarkCreationWithSecurityScope: CFOptionFlags = 1 << 11;
const kCFURLBookmarkResolutionWithSecurityScope: CFOptionFlags = 1 << 10;
const PATH_MAX: usize = 1024;

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    static kCFPreferencesCurrentApplication: CFStringRef;

    fn CFRelease(cf: CFTypeRef);
    fn CFGetTypeID(cf: CFTypeRef) -> CFTypeID;
    fn CFDataGetTypeID() -> CFTypeID;

    fn CFDataCreate(allocator: CFAllocatorRef, bytes: *const u8, length: CFIndex) -> CFDataRef;
    fn CFDataGetLength(data: CFDataRef) -> CFIndex;
    fn CFDataGetBytePtr(data: CFDataRef) -> *const u8;

    fn CFStringCreateWithBytes(
        allocator: CFAllocatorRef,
        bytes: *const u8,
        num_bytes: CFIndex,
        encoding: u32,
        is_external_representation: Boolean,
    ) -> CFStringRef;

    fn CFErrorGetCode(error: CFErrorRef) -> CFIndex;

    fn CFURLCreateFromFileSystemRepresentation(
        allocator: CFAllocatorRef,
        buffer: *const u8,
        buf_len: CFIndex,
        is_directory: Boolean,
    ) -> CFURLRef;
    fn CFURLGetFileSystemRepresentation(
        url: CFURLRef,
        resolve_against_base: Boolean,
        buffer: *mut u8,
        max_buf_len: CFIndex,
    ) -> Boolean;
    fn CFURLCreateBookmarkData(
        allocator: CFAllocatorRef,
        url: CFURLRef,
        options: CFOptionFlags,
        resource_properties_to_include: CFArrayRef,
        relative_to_url: CFURLRef,
        error: *mut CFErrorRef,
    ) -> CFDataRef;
    fn CFURLCreateByResolvingBookmarkData(
        allocator: CFAllocatorRef,
        bookmark: CFDataRef,
        options: CFOptionFlags,
        relative_to_url: CFURLRef,
        resource_properties_to_include: CFArrayRef,
        is_stale: *mut Boolean,
        error: *mut CFErrorRef,
    ) -> CFURLRef;
    fn CFURLStartAccessingSecurityScopedResource(url: CFURLRef) -> Boolean;
    fn CFURLStopAccessingSecurityScopedResource(url: CFURLRef);

    fn CFPreferencesCopyAppValue(key: CFStringRef, application_id: CFStringRef) -> CFTypeRef;
    fn CFPreferencesSetAppValue(key: CFStringRef, value: CFTypeRef, application_id: CFStringRef);
    fn CFPreferencesAppSynchronize(application_id: CFStringRef) -> Boolean;
}

/// Owned CoreFoundation object, released on drop.
pub(crate) struct CfOwned(CFTypeRef);

// CoreFoundation retain/release is thread-safe and the wrapped objects are immutable.
unsafe impl Send for CfOwned {}
unsafe impl Sync for CfOwned {}

impl CfOwned {
    /// Take ownership of a +1 reference. Returns None for null.
    fn from_create(ptr: CFTypeRef) -> Option<Self> {
        if ptr.is_null() { None } else { Some(Self(ptr)) }
    }

    pub(crate) fn as_ptr(&self) -> CFTypeRef {
        self.0
    }
}

impl Drop for CfOwned {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0) }
    }
}

fn error_code(error: CFErrorRef) -> String {
    if error.is_null() {
        return "unknown CoreFoundation error".to_string();
    }
    let owned = CfOwned(error);
    let code = unsafe { CFErrorGetCode(owned.as_ptr()) };
    format!("CoreFoundation error code {code}")
}

pub(crate) fn cf_string(value: &str) -> Option<CfOwned> {
    let ptr = unsafe {
        CFStringCreateWithBytes(
            std::ptr::null(),
            value.as_ptr(),
            value.len() as CFIndex,
            kCFStringEncodingUTF8,
            0,
        )
    };
    CfOwned::from_create(ptr)
}

fn cf_data(bytes: &[u8]) -> Option<CfOwned> {
    let ptr = unsafe { CFDataCreate(std::ptr::null(), bytes.as_ptr(), bytes.len() as CFIndex) };
    CfOwned::from_create(ptr)
}

fn data_bytes(data: &CfOwned) -> Vec<u8> {
    unsafe {
        let len = CFDataGetLength(data.as_ptr());
        let ptr = CFDataGetBytePtr(data.as_ptr());
        if ptr.is_null() || len <= 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(ptr, len as usize).to_vec()
        }
    }
}

fn directory_url(path: &Path) -> Option<CfOwned> {
    let bytes = path.as_os_str().as_bytes();
    let ptr = unsafe {
        CFURLCreateFromFileSystemRepresentation(
            std::ptr::null(),
            bytes.as_ptr(),
            bytes.len() as CFIndex,
            1,
        )
    };
    CfOwned::from_create(ptr)
}

pub(crate) fn url_path(url: &CfOwned) -> Option<PathBuf> {
    use std::ffi::OsStr;
    let mut buffer = vec![0u8; PATH_MAX];
    let ok = unsafe {
        CFURLGetFileSystemRepresentation(url.as_ptr(), 1, buffer.as_mut_ptr(), buffer.len() as CFIndex)
    };
    if ok == 0 {
        return None;
    }
    let len = buffer.iter().position(|b| *b == 0).unwrap_or(buffer.len());
    Some(PathBuf::from(OsStr::from_bytes(&buffer[..len])))
}

/// Create security-scoped bookmark data for a directory.
pub(crate) fn create_security_scoped_bookmark(path: &Path) -> Result<Vec<u8>, String> {
    let url = directory_url(path).ok_or_else(|| format!("invalid path '{}'", path.display()))?;
    let mut error: CFErrorRef = std::ptr::null();
    let data = unsafe {
        CFURLCreateBookmarkData(
            std::ptr::null(),
            url.as_ptr(),
            kCFURLBookmarkCreationWithSecurityScope,
            std::ptr::null(),
            std::ptr::null(),
            &mut error,
        )
    };
    let data = CfOwned::from_create(data).ok_or_else(|| error_code(error))?;
    Ok(data_bytes(&data))
}

/// Resolve security-scoped bookmark data into a URL and its staleness.
pub(crate) fn resolve_security_scoped_bookmark(bytes: &[u8]) -> Result<(CfOwned, bool), String> {
    let data = cf_data(bytes).ok_or_else(|| "could not wrap bookmark data".to_string())?;
    let mut is_stale: Boolean = 0;
    let mut error: CFErrorRef = std::ptr::null();
    let url = unsafe {
        CFURLCreateByResolvingBookmarkData(
            std::ptr::null(),
            data.as_ptr(),
            kCFURLBookmarkResolutionWithSecurityScope,
            std::ptr::null(),
            std::ptr::null(),
            &mut is_stale,
            &mut error,
        )
    };
    let url = CfOwned::from_create(url).ok_or_else(|| error_code(error))?;
    Ok((url, is_stale != 0))
}

unsafe extern "C" {
    fn pthread_main_np() -> c_int;
}

/// Whether the caller is on the process main thread, where AppKit panels run.
pub(crate) fn is_main_thread() -> bool {
    // SAFETY: no arguments, only reads the calling thread's identity.
    unsafe { pthread_main_np() != 0 }
}

pub(crate) fn start_accessing(url: &CfOwned) -> bool {
    unsafe { CFURLStartAccessingSecurityScopedResource(url.as_ptr()) != 0 }
}

pub(crate) fn stop_accessing(url: &CfOwned) {
    unsafe { CFURLStopAccessingSecurityScopedResource(url.as_ptr()) }
}

/// Read a data value from the current application's preferences.
pub(crate) fn preferences_data(key: &str) -> Result<Option<Vec<u8>>, String> {
    let key = cf_string(key).ok_or_else(|| "invalid preferences key".to_string())?;
    let value = unsafe { CFPreferencesCopyAppValue(key.as_ptr(), kCFPreferencesCurrentApplication) };
    let Some(value) = CfOwned::from_create(value) else {
        return Ok(None);
    };
    if unsafe { CFGetTypeID(value.as_ptr()) != CFDataGetTypeID() } {
        return Err("stored value is not data".to_string());
    }
    Ok(Some(data_bytes(&value)))
}

/// Write (or with `None`, remove) a data value and synchronize to disk.
pub(crate) fn set_preferences_data(key: &str, bytes: Option<&[u8]>) -> Result<(), String> {
    let key = cf_string(key).ok_or_else(|| "invalid preferences key".to_string())?;
    let data = match bytes {
        Some(bytes) => Some(cf_data(bytes).ok_or_else(|| "could not wrap data".to_string())?),
        None => None,
    };
    let value = data.as_ref().map_or(std::ptr::null(), CfOwned::as_ptr);
    unsafe {
        CFPreferencesSetAppValue(key.as_ptr(), value, kCFPreferencesCurrentApplication);
        if CFPreferencesAppSynchronize(kCFPreferencesCurrentApplication) == 0 {
            return Err("failed to synchronize preferences".to_string());
        }
    }
    Ok(())
}
