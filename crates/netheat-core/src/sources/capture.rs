//! Live capture from a network interface.
//!
//! On Linux this is an `AF_PACKET` raw socket bound to one interface in
//! promiscuous mode. Every frame is read whole (up to
//! [`SNAP_LEN`](crate::config::SNAP_LEN) bytes) and handed to
//! [`decode_frame`](crate::decode::decode_frame). Capturing normally needs
//! root or `CAP_NET_RAW`.
//!
//! Other platforms get [`Error::Unsupported`] from [`LiveCapture::open`].

use crate::error::{Error, Result};
use crate::source::{PacketSource, SourceEvent};

#[cfg(target_os = "linux")]
pub use linux::LiveCapture;

#[cfg(not(target_os = "linux"))]
pub use fallback::LiveCapture;

#[cfg(target_os = "linux")]
mod linux {
    use std::ffi::CString;
    use std::io;
    use std::mem;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    use super::*;
    use crate::config::SNAP_LEN;
    use crate::decode::decode_frame;

    /// How long a single `recv` may block before reporting [`SourceEvent::Idle`].
    const RECV_TIMEOUT_USEC: libc::suseconds_t = 250_000;

    pub struct LiveCapture {
        fd: OwnedFd,
        name: String,
        buf: Vec<u8>,
    }

    impl LiveCapture {
        pub fn open(interface: &str) -> Result<Self> {
            let c_name = CString::new(interface)
                .map_err(|_| Error::NoSuchInterface(interface.to_string()))?;
            // SAFETY: c_name is a valid NUL-terminated string that outlives the call.
            let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
            if index == 0 {
                return Err(Error::NoSuchInterface(interface.to_string()));
            }
            let capture_err = |source: io::Error| Error::Capture {
                interface: interface.to_string(),
                source,
            };

            let protocol = (libc::ETH_P_ALL as u16).to_be();
            // SAFETY: socket() takes no pointers; the result is checked below.
            let raw = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, i32::from(protocol)) };
            if raw < 0 {
                return Err(capture_err(io::Error::last_os_error()));
            }
            // SAFETY: raw is a freshly created descriptor that nothing else owns.
            let fd = unsafe { OwnedFd::from_raw_fd(raw) };

            // SAFETY: sockaddr_ll is plain old data; all-zero is a valid value.
            let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
            addr.sll_family = libc::AF_PACKET as u16;
            addr.sll_protocol = protocol;
            addr.sll_ifindex = index as i32;
            // SAFETY: addr is a fully initialised sockaddr_ll and the length matches its type.
            let rc = unsafe {
                libc::bind(
                    fd.as_raw_fd(),
                    (&addr as *const libc::sockaddr_ll).cast::<libc::sockaddr>(),
                    mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
                )
            };
            if rc < 0 {
                return Err(capture_err(io::Error::last_os_error()));
            }

            let membership = libc::packet_mreq {
                mr_ifindex: index as i32,
                mr_type: libc::PACKET_MR_PROMISC as u16,
                mr_alen: 0,
                mr_address: [0; 8],
            };
            set_option(
                &fd,
                libc::SOL_PACKET,
                libc::PACKET_ADD_MEMBERSHIP,
                &membership,
            )
            .map_err(capture_err)?;

            let timeout = libc::timeval {
                tv_sec: 0,
                tv_usec: RECV_TIMEOUT_USEC,
            };
            set_option(&fd, libc::SOL_SOCKET, libc::SO_RCVTIMEO, &timeout)
                .map_err(capture_err)?;

            log::info!("capturing on {interface} (ifindex {index})");
            Ok(Self {
                fd,
                name: format!("capture:{interface}"),
                buf: vec![0u8; SNAP_LEN],
            })
        }
    }

    fn set_option<T>(fd: &OwnedFd, level: libc::c_int, name: libc::c_int, value: &T) -> io::Result<()> {
        // SAFETY: value points to a live T and the length passed is size_of::<T>().
        let rc = unsafe {
            libc::setsockopt(
                fd.as_raw_fd(),
                level,
                name,
                (value as *const T).cast::<libc::c_void>(),
                mem::size_of::<T>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    impl PacketSource for LiveCapture {
        fn name(&self) -> &str {
            &self.name
        }

        fn next_event(&mut self) -> Option<SourceEvent> {
            // SAFETY: buf is valid for writes of buf.len() bytes for the whole call.
            let n = unsafe {
                libc::recv(
                    self.fd.as_raw_fd(),
                    self.buf.as_mut_ptr().cast::<libc::c_void>(),
                    self.buf.len(),
                    0,
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                return match err.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
                        Some(SourceEvent::Idle)
                    }
                    _ => {
                        log::error!("{}: recv failed: {err}", self.name);
                        None
                    }
                };
            }
            Some(decode_frame(&self.buf[..n as usize]))
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod fallback {
    use super::*;

    /// Placeholder so callers compile everywhere; it can never be opened.
    pub struct LiveCapture;

    impl LiveCapture {
        pub fn open(interface: &str) -> Result<Self> {
            log::error!("live capture on {interface} requested on an unsupported platform");
            Err(Error::Unsupported)
        }
    }

    impl PacketSource for LiveCapture {
        fn name(&self) -> &str {
            "capture"
        }

        fn next_event(&mut self) -> Option<SourceEvent> {
            None
        }
    }
}
