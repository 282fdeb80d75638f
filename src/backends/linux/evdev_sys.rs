//! Thin evdev ioctl layer.
//!
//! Request numbers follow `<linux/input.h>` (`_IOC_READ`, type `'E'`) for the
//! common `_IOC` layout used by x86, x86_64, arm and aarch64.

use libc::{c_int, c_ulong, input_absinfo, input_id};
use std::io;
use std::mem::size_of;
use std::os::fd::{AsRawFd, BorrowedFd};

pub(crate) const EV_REL: u16 = 0x02;
pub(crate) const EV_ABS: u16 = 0x03;
const EV_CNT: usize = 0x20;

pub(crate) const REL_X: u16 = 0x00;
pub(crate) const REL_Y: u16 = 0x01;
const REL_CNT: usize = 0x10;

pub(crate) const ABS_X: u16 = 0x00;
pub(crate) const ABS_Y: u16 = 0x01;
pub(crate) const ABS_THROTTLE: u16 = 0x06;
pub(crate) const ABS_RUDDER: u16 = 0x07;
pub(crate) const ABS_MISC: u16 = 0x28;
pub(crate) const ABS_CNT: usize = 0x40;

const IOC_READ: c_ulong = 2;
const IOC_NRSHIFT: c_ulong = 0;
const IOC_TYPESHIFT: c_ulong = 8;
const IOC_SIZESHIFT: c_ulong = 16;
const IOC_DIRSHIFT: c_ulong = 30;

const BITS_PER_LONG: usize = c_ulong::BITS as usize;

/// Size of one `struct input_event` on this target.
pub(crate) const EVENT_SIZE: usize = size_of::<libc::input_event>();

const fn ior(nr: c_ulong, size: usize) -> c_ulong {
    (IOC_READ << IOC_DIRSHIFT)
        | ((b'E' as c_ulong) << IOC_TYPESHIFT)
        | (nr << IOC_NRSHIFT)
        | ((size as c_ulong) << IOC_SIZESHIFT)
}

const EVIOCGID: c_ulong = ior(0x02, size_of::<input_id>());

const fn eviocgname(len: usize) -> c_ulong {
    ior(0x06, len)
}

const fn eviocgbit(ev: u16, len: usize) -> c_ulong {
    ior(0x20 + ev as c_ulong, len)
}

const fn eviocgabs(abs: u16) -> c_ulong {
    ior(0x40 + abs as c_ulong, size_of::<input_absinfo>())
}

const fn longs_for(bits: usize) -> usize {
    bits.div_ceil(BITS_PER_LONG)
}

/// Feature bitmap as returned by `EVIOCGBIT`.
#[derive(Clone, Debug, Default)]
pub(crate) struct BitSet(Vec<c_ulong>);

impl BitSet {
    pub(crate) fn contains(&self, bit: u16) -> bool {
        let bit = usize::from(bit);
        self.0
            .get(bit / BITS_PER_LONG)
            .is_some_and(|word| (*word >> (bit % BITS_PER_LONG)) & 1 != 0)
    }
}

fn check(ret: c_int) -> io::Result<()> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn query_bits(fd: BorrowedFd<'_>, ev: u16, count: usize) -> io::Result<BitSet> {
    let mut words: Vec<c_ulong> = vec![0; longs_for(count)];
    let len = words.len() * size_of::<c_ulong>();
    // SAFETY: the kernel writes at most `len` bytes into `words`, which owns exactly `len` bytes.
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), eviocgbit(ev, len) as _, words.as_mut_ptr()) };
    check(ret)?;
    Ok(BitSet(words))
}

/// Event types the device supports (`EV_*`).
pub(crate) fn event_types(fd: BorrowedFd<'_>) -> io::Result<BitSet> {
    query_bits(fd, 0, EV_CNT)
}

/// Absolute axis codes the device supports (`ABS_*`).
pub(crate) fn abs_codes(fd: BorrowedFd<'_>) -> io::Result<BitSet> {
    query_bits(fd, EV_ABS, ABS_CNT)
}

/// Relative axis codes the device supports (`REL_*`).
pub(crate) fn rel_codes(fd: BorrowedFd<'_>) -> io::Result<BitSet> {
    query_bits(fd, EV_REL, REL_CNT)
}

/// State of one absolute axis: current `value` plus its `minimum`/`maximum`.
pub(crate) fn abs_info(fd: BorrowedFd<'_>, code: u16) -> io::Result<input_absinfo> {
    // SAFETY: input_absinfo is plain old data; all-zero is a valid value.
    let mut info: input_absinfo = unsafe { std::mem::zeroed() };
    // SAFETY: EVIOCGABS writes exactly one input_absinfo into `info`.
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), eviocgabs(code) as _, &mut info as *mut input_absinfo) };
    check(ret)?;
    Ok(info)
}

/// Bus/vendor/product/version. Also used as the liveness probe: it fails with
/// `ENODEV` once the device is unplugged.
pub(crate) fn device_id(fd: BorrowedFd<'_>) -> io::Result<input_id> {
    // SAFETY: input_id is plain old data; all-zero is a valid value.
    let mut id: input_id = unsafe { std::mem::zeroed() };
    // SAFETY: EVIOCGID writes exactly one input_id into `id`.
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), EVIOCGID as _, &mut id as *mut input_id) };
    check(ret)?;
    Ok(id)
}

/// Kernel-reported device name.
pub(crate) fn device_name(fd: BorrowedFd<'_>) -> io::Result<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the kernel writes at most `buf.len()` bytes into `buf`.
    let ret = unsafe {
        libc::ioctl(
            fd.as_raw_fd(),
            eviocgname(buf.len()) as _,
            buf.as_mut_ptr(),
        )
    };
    check(ret)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(buf.get(..end).unwrap_or_default()).into_owned())
}

/// `(type, code, value)` of one raw `struct input_event`.
///
/// The timestamp prefix differs in size between targets; the trailing
/// `u16 type, u16 code, i32 value` does not.
pub(crate) fn decode_event(raw: &[u8]) -> Option<(u16, u16, i32)> {
    let tail = raw.len().checked_sub(8).and_then(|start| raw.get(start..))?;
    let ty = u16::from_ne_bytes(tail.get(0..2)?.try_into().ok()?);
    let code = u16::from_ne_bytes(tail.get(2..4)?.try_into().ok()?);
    let value = i32::from_ne_bytes(tail.get(4..8)?.try_into().ok()?);
    Some((ty, code, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_numbers_match_linux_headers() {
        // Values from <linux/input.h> on x86_64.
        assert_eq!(EVIOCGID, 0x8008_4502);
        assert_eq!(eviocgname(256), 0x8100_4506);
        assert_eq!(eviocgabs(ABS_X), 0x8018_4540);
        assert_eq!(eviocgbit(EV_ABS, 8), 0x8008_4523);
    }

    #[test]
    fn bitset_lookup() {
        let bits = BitSet(vec![0b1000_0101]);
        assert!(bits.contains(0));
        assert!(!bits.contains(1));
        assert!(bits.contains(2));
        assert!(bits.contains(7));
        assert!(!bits.contains(200));
    }

    #[test]
    fn decodes_the_event_tail() {
        let mut raw = vec![0u8; EVENT_SIZE];
        let tail = EVENT_SIZE - 8;
        raw[tail..tail + 2].copy_from_slice(&EV_ABS.to_ne_bytes());
        raw[tail + 2..tail + 4].copy_from_slice(&ABS_RUDDER.to_ne_bytes());
        raw[tail + 4..].copy_from_slice(&(-1234i32).to_ne_bytes());
        assert_eq!(decode_event(&raw), Some((EV_ABS, ABS_RUDDER, -1234)));
        assert_eq!(decode_event(&raw[..4]), None);
    }
}
