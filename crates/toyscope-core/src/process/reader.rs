#![cfg_attr(
    not(any(target_os = "windows", target_os = "linux")),
    allow(dead_code, unused_variables)
)]

use crate::error::{Error, Result};
use crate::process::ProcessHandle;

#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;

/// Trait for reading memory from a process or buffer
///
/// This is the only boundary through which decoders touch target memory.
/// Implementations take `&self` and carry no cursor state, so one reader can
/// serve repeated decode calls. Concurrent use is only as safe as the
/// underlying source: the live-process and snapshot readers are reentrant,
/// and the core adds no locking of its own.
pub trait ReadMemory {
    /// Read exactly `size` bytes at `address`, or fail.
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Pointer width of the target, when the source knows it.
    fn pointer_size(&self) -> Option<usize> {
        None
    }

    fn read_u8(&self, address: u64) -> Result<u8> {
        let bytes = self.read_bytes(address, 1)?;
        Ok(bytes[0])
    }

    /// Read an unsigned 32-bit integer from memory
    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a signed 64-bit integer from memory
    fn read_i64(&self, address: u64) -> Result<i64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(i64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Read an unsigned 64-bit integer from memory
    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Read a pointer-sized (or `size_t`-sized) word of `width` bytes.
    fn read_ptr(&self, address: u64, width: usize) -> Result<u64> {
        match width {
            8 => self.read_u64(address),
            4 => self.read_u32(address).map(u64::from),
            other => Err(Error::MemoryReadFailed {
                address,
                message: format!("Unsupported pointer width {}", other),
            }),
        }
    }
}

impl<R: ReadMemory + ?Sized> ReadMemory for &R {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn pointer_size(&self) -> Option<usize> {
        (**self).pointer_size()
    }
}

impl<R: ReadMemory + ?Sized> ReadMemory for Box<R> {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn pointer_size(&self) -> Option<usize> {
        (**self).pointer_size()
    }
}

/// Reads the memory of a live process.
pub struct MemoryReader<'a> {
    process: &'a ProcessHandle,
}

impl<'a> MemoryReader<'a> {
    pub fn new(process: &'a ProcessHandle) -> Self {
        Self { process }
    }

    #[cfg(target_os = "windows")]
    fn read_bytes_impl(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut bytes_read = 0;

        // SAFETY: ReadProcessMemory is called with:
        // - A valid process handle from ProcessHandle (opened with PROCESS_VM_READ)
        // - A properly allocated buffer of the requested size
        // - A pointer to receive the actual bytes read
        // An invalid target address makes the call fail, which is mapped to an error.
        unsafe {
            ReadProcessMemory(
                self.process.handle(),
                address as *const _,
                buffer.as_mut_ptr() as *mut _,
                size,
                Some(&mut bytes_read),
            )
            .map_err(|e| Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            })?;
        }

        // All-or-nothing: a partially read structure cannot be decoded.
        if bytes_read != size {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("Expected {} bytes, read {}", size, bytes_read),
            });
        }

        Ok(buffer)
    }

    #[cfg(target_os = "linux")]
    fn read_bytes_impl(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];

        let local = libc::iovec {
            iov_base: buffer.as_mut_ptr() as *mut libc::c_void,
            iov_len: size,
        };
        let remote = libc::iovec {
            iov_base: address as usize as *mut libc::c_void,
            iov_len: size,
        };

        // SAFETY: `local` describes a buffer we own of exactly `size` bytes. `remote` is only
        // interpreted by the kernel inside the target's address space; unmapped ranges make
        // the call fail with EFAULT instead of touching our memory.
        let read = unsafe {
            libc::process_vm_readv(self.process.pid as libc::pid_t, &local, 1, &remote, 1, 0)
        };

        if read < 0 {
            return Err(Error::MemoryReadFailed {
                address,
                message: std::io::Error::last_os_error().to_string(),
            });
        }

        if read as usize != size {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("Expected {} bytes, read {}", size, read),
            });
        }

        Ok(buffer)
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    fn read_bytes_impl(&self, address: u64, _size: usize) -> Result<Vec<u8>> {
        Err(Error::MemoryReadFailed {
            address,
            message: "memory reading not supported on this platform".to_string(),
        })
    }
}

impl ReadMemory for MemoryReader<'_> {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        self.read_bytes_impl(address, size).map_err(|e| {
            // A vanished target explains every later failure better than the OS error.
            if self.process.is_alive() {
                e
            } else {
                Error::MemoryReadFailed {
                    address,
                    message: format!("process {} has exited", self.process.pid),
                }
            }
        })
    }

    fn pointer_size(&self) -> Option<usize> {
        self.process.pointer_size()
    }
}
