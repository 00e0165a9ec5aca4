//! FFI bindings for Visual Mileage
//!
//! This module provides C-compatible functions so a desktop shell written in
//! another language can hand over pasted text and receive the completion
//! message. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `mileage_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use crate::config::MileageConfig;
use crate::error::MileageError;
use crate::locations::LocationCodeMap;
use crate::pipeline::MileageProcessor;
use crate::reference::{ReferenceTable, DEFAULT_INDEX_COLUMN};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Report a pipeline result through the last-error slot
fn finish(result: Result<String, MileageError>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn processor_for_chart(reference_path: &str) -> Result<MileageProcessor, MileageError> {
    let reference = ReferenceTable::load(reference_path, DEFAULT_INDEX_COLUMN)?;
    Ok(MileageProcessor::new(LocationCodeMap::default(), reference))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Build the mileage report from pasted text and return the completion message.
///
/// The report format follows the extension of `output_path`.
///
/// # Safety
/// - `text`, `reference_path`, and `output_path` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `mileage_free_string`.
/// - Returns NULL on error; call `mileage_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mileage_export(
    text: *const c_char,
    reference_path: *const c_char,
    output_path: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let text_str = match cstr_to_string(text) {
        Some(s) => s,
        None => {
            set_last_error("Invalid text string pointer");
            return ptr::null_mut();
        }
    };

    let reference_str = match cstr_to_string(reference_path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid reference_path string pointer");
            return ptr::null_mut();
        }
    };

    let output_str = match cstr_to_string(output_path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid output_path string pointer");
            return ptr::null_mut();
        }
    };

    finish(processor_for_chart(&reference_str).and_then(|processor| {
        processor
            .export(&text_str, Path::new(&output_str), None)
            .map(|(message, _)| message)
    }))
}

/// Process pasted text and return the legs and run statistics as JSON.
///
/// # Safety
/// - `text` and `reference_path` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `mileage_free_string`.
/// - Returns NULL on error; call `mileage_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mileage_process_json(
    text: *const c_char,
    reference_path: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let text_str = match cstr_to_string(text) {
        Some(s) => s,
        None => {
            set_last_error("Invalid text string pointer");
            return ptr::null_mut();
        }
    };

    let reference_str = match cstr_to_string(reference_path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid reference_path string pointer");
            return ptr::null_mut();
        }
    };

    finish(processor_for_chart(&reference_str).and_then(|processor| {
        let run = processor.process(&text_str)?;
        Ok(serde_json::to_string(&run)?)
    }))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a MileageProcessor with its chart already loaded
pub struct MileageProcessorHandle {
    processor: MileageProcessor,
}

/// Create a processor from a TOML configuration file.
///
/// Pass NULL to use the built-in defaults (`mileage-chart.csv` in the
/// working directory, standard branch list).
///
/// # Safety
/// - `config_path` must be NULL or a valid null-terminated C string.
/// - Must be freed with `mileage_processor_free`.
/// - Returns NULL on error; call `mileage_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mileage_processor_new(
    config_path: *const c_char,
) -> *mut MileageProcessorHandle {
    clear_last_error();

    let config = if config_path.is_null() {
        Ok(MileageConfig::default())
    } else {
        match cstr_to_string(config_path) {
            Some(path) => MileageConfig::from_file(path),
            None => {
                set_last_error("Invalid config_path string pointer");
                return ptr::null_mut();
            }
        }
    };

    match config.and_then(|c| MileageProcessor::from_config(&c)) {
        Ok(processor) => Box::into_raw(Box::new(MileageProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `mileage_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn mileage_processor_free(processor: *mut MileageProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Build the mileage report with a loaded processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `mileage_processor_new`.
/// - `text` and `output_path` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `mileage_free_string`.
/// - Returns NULL on error; call `mileage_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mileage_processor_export(
    processor: *mut MileageProcessorHandle,
    text: *const c_char,
    output_path: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let text_str = match cstr_to_string(text) {
        Some(s) => s,
        None => {
            set_last_error("Invalid text string pointer");
            return ptr::null_mut();
        }
    };

    let output_str = match cstr_to_string(output_path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid output_path string pointer");
            return ptr::null_mut();
        }
    };

    let handle = &*processor;
    finish(
        handle
            .processor
            .export(&text_str, Path::new(&output_str), None)
            .map(|(message, _)| message),
    )
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Visual Mileage functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Visual Mileage function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn mileage_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Visual Mileage call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn mileage_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn mileage_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CHART: &str = "LOCATION,MAIN,BIRM\nMAIN,0,5.1\nBIRM,5.1,0\n";

    fn pasted_text() -> CString {
        CString::new(
            "Main Library\n08:00 AM\nJan 05, 2024\n09:00 AM\nJan 05, 2024\n1:00\n2.0 miles\n\
             Birmingham Branch\n10:00 AM\nJan 05, 2024\n11:00 AM\nJan 05, 2024\n1:00\n6.3 miles\n",
        )
        .unwrap()
    }

    fn chart_in(dir: &TempDir) -> CString {
        let path = dir.path().join("mileage-chart.csv");
        fs::write(&path, CHART).unwrap();
        CString::new(path.to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_ffi_export() {
        let dir = TempDir::new().unwrap();
        let chart = chart_in(&dir);
        let output_path = dir.path().join("final-mileage.csv");
        let output = CString::new(output_path.to_str().unwrap()).unwrap();
        let text = pasted_text();

        unsafe {
            let result = mileage_export(text.as_ptr(), chart.as_ptr(), output.as_ptr());
            assert!(!result.is_null());

            let message = CStr::from_ptr(result).to_str().unwrap();
            assert!(message.starts_with("File saved as: "));
            assert!(message.ends_with("final-mileage.csv"));

            mileage_free_string(result);
        }

        let written = fs::read_to_string(output_path).unwrap();
        assert!(written.contains("2024-01-05,Main Library,Birmingham Branch,5.1"));
    }

    #[test]
    fn test_ffi_process_json() {
        let dir = TempDir::new().unwrap();
        let chart = chart_in(&dir);
        let text = pasted_text();

        unsafe {
            let result = mileage_process_json(text.as_ptr(), chart.as_ptr());
            assert!(!result.is_null());

            let json = CStr::from_ptr(result).to_str().unwrap();
            let value: serde_json::Value = serde_json::from_str(json).unwrap();
            assert_eq!(value["legs"][0]["Distance"], 5.1);
            assert_eq!(value["stats"]["visits_parsed"], 2);

            mileage_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        let dir = TempDir::new().unwrap();
        let chart_path = dir.path().join("chart.csv");
        fs::write(&chart_path, CHART).unwrap();
        let config_path = dir.path().join("mileage.toml");
        fs::write(
            &config_path,
            format!("[reference]\npath = {:?}\n", chart_path.to_str().unwrap()),
        )
        .unwrap();
        let config = CString::new(config_path.to_str().unwrap()).unwrap();
        let output = CString::new(dir.path().join("out.json").to_str().unwrap()).unwrap();
        let text = pasted_text();

        unsafe {
            let processor = mileage_processor_new(config.as_ptr());
            assert!(!processor.is_null());

            let result = mileage_processor_export(processor, text.as_ptr(), output.as_ptr());
            assert!(!result.is_null());
            mileage_free_string(result);

            mileage_processor_free(processor);
        }

        assert!(dir.path().join("out.json").exists());
    }

    #[test]
    fn test_ffi_error_handling() {
        let missing = CString::new("/nonexistent/mileage-chart.csv").unwrap();
        let output = CString::new("/nonexistent/out.xlsx").unwrap();
        let text = pasted_text();

        unsafe {
            let result = mileage_export(text.as_ptr(), missing.as_ptr(), output.as_ptr());
            assert!(result.is_null());

            let error = mileage_last_error();
            assert!(!error.is_null());

            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = mileage_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
