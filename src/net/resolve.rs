use std::ffi::{CStr, CString};
use std::net::Ipv4Addr;
use std::ptr;

use tracing::debug;

use crate::error::{PacketError, Result};

fn resolution_error(host: &str, reason: impl Into<String>) -> PacketError {
    PacketError::Resolution {
        host: host.to_string(),
        reason: reason.into(),
    }
}

/// Resolves a hostname or dotted quad to an IPv4 address.
///
/// The lookup is pinned to `AF_INET`, so a host that only has AAAA records
/// (or an IPv6 literal) fails instead of yielding something reinterpreted as
/// IPv4. One synchronous attempt, no retry.
pub fn resolve_ipv4(host: &str) -> Result<Ipv4Addr> {
    if let Ok(address) = host.parse::<Ipv4Addr>() {
        return Ok(address);
    }

    let c_host = CString::new(host).map_err(|_| resolution_error(host, "host contains a NUL byte"))?;

    // SAFETY: addrinfo is a plain C struct, all-zero is the documented
    // "no preference" value for every hint field.
    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_INET;
    hints.ai_socktype = libc::SOCK_DGRAM;

    let mut results: *mut libc::addrinfo = ptr::null_mut();
    // SAFETY: c_host outlives the call, hints is initialised and results
    // is only read after getaddrinfo reports success.
    let status = unsafe { libc::getaddrinfo(c_host.as_ptr(), ptr::null(), &hints, &mut results) };
    if status != 0 {
        // SAFETY: gai_strerror returns a pointer to a static string.
        let reason = unsafe { CStr::from_ptr(libc::gai_strerror(status)) }
            .to_string_lossy()
            .into_owned();
        return Err(resolution_error(host, reason));
    }

    let mut found = None;
    let mut cursor = results;
    while !cursor.is_null() {
        // SAFETY: cursor walks the list returned by getaddrinfo, which stays
        // valid until freeaddrinfo below.
        let info = unsafe { &*cursor };
        if info.ai_family == libc::AF_INET && !info.ai_addr.is_null() {
            // SAFETY: AF_INET entries carry a sockaddr_in.
            let sin = unsafe { &*(info.ai_addr as *const libc::sockaddr_in) };
            found = Some(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)));
            break;
        }
        cursor = info.ai_next;
    }

    // SAFETY: results came from a successful getaddrinfo and is freed once.
    unsafe { libc::freeaddrinfo(results) };

    match found {
        Some(address) => {
            debug!(host, %address, "resolved host");
            Ok(address)
        }
        None => Err(resolution_error(host, "no IPv4 address found")),
    }
}
