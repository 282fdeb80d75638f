//! Value fields of a HID device, read through the Windows HID parser (HidP).
//!
//! [`ValueReader`] fetches a device's preparsed descriptor once, flattens its
//! input value caps into [`ValueField`]s (usage ranges expanded, descriptor order
//! kept), and then pulls individual field values out of raw input reports with
//! `HidP_GetUsageValue`. Buttons and hats are not read.

use crate::backends::hid_usage;
use crate::axis::AxisRange;
use std::ffi::OsStr;
use std::io;
use std::os::windows::ffi::OsStrExt;
use windows_sys::Win32::Devices::HumanInterfaceDevice::{
    HidD_FreePreparsedData, HidD_GetPreparsedData, HidP_GetCaps, HidP_GetUsageValue,
    HidP_GetValueCaps, HidP_Input, HIDP_CAPS, HIDP_STATUS_BUFFER_TOO_SMALL, HIDP_STATUS_SUCCESS,
    HIDP_VALUE_CAPS, PHIDP_PREPARSED_DATA,
};
use windows_sys::Win32::Foundation::{CloseHandle, GENERIC_READ, GENERIC_WRITE, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};

/// One input value of the device (an axis, slider, dial, hat...).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ValueField {
    pub report_id: u8,
    pub usage_page: u16,
    pub usage: u16,
    pub link_collection: u16,
    pub bit_size: u16,
    pub logical_min: i32,
    pub logical_max: i32,
}

impl ValueField {
    pub fn range(&self) -> AxisRange {
        hid_usage::logical_range(self.logical_min, self.logical_max, self.bit_size)
    }
}

/// Preparsed descriptor plus the value fields it declares.
pub(crate) struct ValueReader {
    ppd: PHIDP_PREPARSED_DATA,
    report_len: usize,
    fields: Vec<ValueField>,
}

impl ValueReader {
    /// Read the descriptor of the HID interface at `path`.
    pub fn open(path: &str) -> io::Result<Self> {
        let handle = open_device_handle(path)?;

        let mut ppd: PHIDP_PREPARSED_DATA = 0;
        // SAFETY: `handle` is a live HID handle; `ppd` receives the parser's allocation.
        let ok = unsafe { HidD_GetPreparsedData(handle, &mut ppd) };
        // SAFETY: the preparsed data does not depend on the handle staying open.
        unsafe { CloseHandle(handle) };
        if ok == 0 || ppd == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "HidD_GetPreparsedData failed"));
        }

        // From here on `reader` owns `ppd` and frees it on every exit path.
        let mut reader = Self {
            ppd,
            report_len: 0,
            fields: Vec::new(),
        };

        // SAFETY: HIDP_CAPS is plain old data; all-zero is a valid value.
        let mut caps: HIDP_CAPS = unsafe { std::mem::zeroed() };
        // SAFETY: `ppd` is valid and `caps` is writable.
        let status = unsafe { HidP_GetCaps(ppd, &mut caps) };
        if status != HIDP_STATUS_SUCCESS {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("HidP_GetCaps failed: {:#010x}", status as u32),
            ));
        }
        reader.report_len = usize::from(caps.InputReportByteLength);
        reader.fields = value_caps(ppd).iter().flat_map(flatten).collect();
        Ok(reader)
    }

    pub fn fields(&self) -> &[ValueField] {
        &self.fields
    }

    /// Size of one input report including the leading report ID byte.
    pub fn report_len(&self) -> usize {
        self.report_len
    }

    /// Value of `field` in `report`, or `None` if the report does not carry it.
    pub fn value(&self, field: &ValueField, report: &mut [u8]) -> Option<i32> {
        let len = u32::try_from(report.len()).ok()?;
        let read = |link_collection: u16, report: &mut [u8]| {
            let mut raw: u32 = 0;
            // SAFETY: `report` is `len` bytes long and `ppd` outlives the call.
            let status = unsafe {
                HidP_GetUsageValue(
                    HidP_Input,
                    field.usage_page,
                    link_collection,
                    field.usage,
                    &mut raw,
                    self.ppd,
                    report.as_mut_ptr(),
                    len,
                )
            };
            (status == HIDP_STATUS_SUCCESS).then_some(raw)
        };

        // Some stacks only resolve values against the top-level collection.
        let raw = match read(field.link_collection, report) {
            Some(raw) => raw,
            None if field.link_collection != 0 => read(0, report)?,
            None => return None,
        };
        Some(hid_usage::field_value(raw, field.logical_min, field.bit_size))
    }
}

impl Drop for ValueReader {
    fn drop(&mut self) {
        if self.ppd != 0 {
            // SAFETY: `ppd` came from HidD_GetPreparsedData and is freed exactly once.
            unsafe { HidD_FreePreparsedData(self.ppd) };
            self.ppd = 0;
        }
    }
}

fn value_caps(ppd: PHIDP_PREPARSED_DATA) -> Vec<HIDP_VALUE_CAPS> {
    let query = |len: u16| {
        // SAFETY: HIDP_VALUE_CAPS is plain old data; all-zero is a valid value.
        let mut caps: Vec<HIDP_VALUE_CAPS> = vec![unsafe { std::mem::zeroed() }; usize::from(len)];
        let mut count = len;
        // SAFETY: `caps` holds `count` entries; HidP writes at most that many.
        let status = unsafe { HidP_GetValueCaps(HidP_Input, caps.as_mut_ptr(), &mut count, ppd) };
        caps.truncate(usize::from(count));
        (status, caps, count)
    };

    match query(64) {
        (HIDP_STATUS_SUCCESS, caps, _) => caps,
        (HIDP_STATUS_BUFFER_TOO_SMALL, _, needed) if needed > 0 => match query(needed) {
            (HIDP_STATUS_SUCCESS, caps, _) => caps,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// One [`ValueField`] per usage covered by a value cap.
fn flatten(cap: &HIDP_VALUE_CAPS) -> Vec<ValueField> {
    let field = |usage: u16| ValueField {
        report_id: cap.ReportID,
        usage_page: cap.UsagePage,
        usage,
        link_collection: cap.LinkCollection,
        bit_size: cap.BitSize,
        logical_min: cap.LogicalMin,
        logical_max: cap.LogicalMax,
    };
    if cap.UsagePage == 0 {
        return Vec::new();
    }
    // SAFETY: `IsRange` selects which union member HidP filled in.
    unsafe {
        if cap.IsRange != 0 {
            let range = cap.Anonymous.Range;
            (range.UsageMin..=range.UsageMax).map(field).collect()
        } else {
            vec![field(cap.Anonymous.NotRange.Usage)]
        }
    }
}

/// Open the HID interface for descriptor queries, read-write if allowed.
fn open_device_handle(path: &str) -> io::Result<HANDLE> {
    let wide: Vec<u16> = OsStr::new(path)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    let open = |access: u32| {
        // SAFETY: `wide` is NUL-terminated and outlives the call.
        unsafe {
            CreateFileW(
                wide.as_ptr(),
                access,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                std::ptr::null(),
                OPEN_EXISTING,
                FILE_ATTRIBUTE_NORMAL,
                std::ptr::null_mut(),
            )
        }
    };

    let mut handle = open(GENERIC_READ | GENERIC_WRITE);
    if handle == INVALID_HANDLE_VALUE {
        handle = open(GENERIC_READ);
    }
    if handle == INVALID_HANDLE_VALUE {
        return Err(io::Error::last_os_error());
    }
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_range_handles_unsigned_descriptors() {
        let field = ValueField {
            report_id: 1,
            usage_page: hid_usage::USAGE_PAGE_GENERIC_DESKTOP,
            usage: hid_usage::USAGE_DIAL,
            link_collection: 0,
            bit_size: 16,
            logical_min: 0,
            logical_max: -1,
        };
        assert_eq!(field.range(), AxisRange::new(0, 65535));
    }

    #[test]
    fn missing_interfaces_fail_to_open() {
        assert!(ValueReader::open(r"\\?\hid#axisdelta-missing").is_err());
    }
}
