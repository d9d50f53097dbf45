#![cfg_attr(
    not(any(target_os = "windows", target_os = "linux")),
    allow(dead_code, unused_variables)
)]

use crate::error::{Error, Result};

#[cfg(target_os = "windows")]
use tracing::warn;

#[cfg(target_os = "windows")]
use std::ffi::OsString;
#[cfg(target_os = "windows")]
use std::os::windows::ffi::OsStringExt;
#[cfg(target_os = "windows")]
use windows::Win32::Foundation::{BOOL, CloseHandle, HANDLE};
#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
#[cfg(target_os = "windows")]
use windows::Win32::System::Threading::{
    GetExitCodeProcess, IsWow64Process, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
};

/// An open, read-only binding to a traced interpreter process.
#[cfg(target_os = "windows")]
pub struct ProcessHandle {
    handle: HANDLE,
    pub pid: u32,
}

/// An open, read-only binding to a traced interpreter process.
#[cfg(not(target_os = "windows"))]
pub struct ProcessHandle {
    pub pid: u32,
}

#[cfg(target_os = "windows")]
impl ProcessHandle {
    /// Find a running process by executable name (case-insensitive) and open it.
    pub fn find_by_name(name: &str) -> Result<Self> {
        let pid = find_process_id(name)?;
        tracing::debug!("Found {} with PID {}", name, pid);
        Self::open(pid)
    }

    pub fn open(pid: u32) -> Result<Self> {
        // SAFETY: OpenProcess is called with valid access flags and the returned handle is
        // owned by this struct and closed in Drop.
        let handle = unsafe {
            OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, pid).map_err(|e| {
                tracing::debug!("OpenProcess failed for PID {}: {}", pid, e);
                Error::ProcessOpenFailed(e.to_string())
            })?
        };

        Ok(Self { handle, pid })
    }

    pub fn handle(&self) -> HANDLE {
        self.handle
    }

    /// Check if the process is still running
    pub fn is_alive(&self) -> bool {
        const STILL_ACTIVE: u32 = 259;

        let mut exit_code: u32 = 0;
        // SAFETY: self.handle is a live handle from OpenProcess.
        unsafe {
            if GetExitCodeProcess(self.handle, &mut exit_code).is_ok() {
                exit_code == STILL_ACTIVE
            } else {
                false
            }
        }
    }

    /// Pointer width of the target: 4 under WOW64, otherwise the host's.
    pub fn pointer_size(&self) -> Option<usize> {
        if cfg!(target_pointer_width = "32") {
            return Some(4);
        }
        let mut wow64 = BOOL::default();
        // SAFETY: self.handle is a live handle opened with PROCESS_QUERY_INFORMATION.
        unsafe { IsWow64Process(self.handle, &mut wow64) }.ok()?;
        Some(if wow64.as_bool() { 4 } else { 8 })
    }
}

#[cfg(target_os = "windows")]
impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.handle.is_invalid() {
            // SAFETY: self.handle came from OpenProcess and is closed exactly once here.
            if let Err(e) = unsafe { CloseHandle(self.handle) } {
                warn!("Failed to close process handle: {}", e);
            }
        }
    }
}

#[cfg(target_os = "windows")]
fn find_process_id(name: &str) -> Result<u32> {
    // SAFETY: the snapshot handle is closed before returning.
    let snapshot = unsafe {
        CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::ProcessNotFound(e.to_string()))?
    };

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    // SAFETY: Process32FirstW/Process32NextW receive a valid snapshot handle and an
    // initialized PROCESSENTRY32W.
    let result = unsafe {
        let mut found = None;
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let end = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                let exe_name = OsString::from_wide(&entry.szExeFile[..end]);

                if exe_name.to_string_lossy().eq_ignore_ascii_case(name) {
                    found = Some(entry.th32ProcessID);
                    break;
                }

                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
        found.ok_or_else(|| Error::ProcessNotFound(format!("Process '{}' not found", name)))
    };

    // SAFETY: snapshot is a valid handle from CreateToolhelp32Snapshot
    let _ = unsafe { CloseHandle(snapshot) };
    result
}

#[cfg(target_os = "linux")]
impl ProcessHandle {
    /// Find a running process whose `comm` matches `name` and open it.
    pub fn find_by_name(name: &str) -> Result<Self> {
        let pid = find_process_id(name)?;
        tracing::debug!("Found {} with PID {}", name, pid);
        Self::open(pid)
    }

    pub fn open(pid: u32) -> Result<Self> {
        let proc_dir = std::path::PathBuf::from(format!("/proc/{}", pid));
        if !proc_dir.exists() {
            return Err(Error::ProcessNotFound(format!("No process with PID {}", pid)));
        }
        Ok(Self { pid })
    }

    /// Check if the process is still running
    pub fn is_alive(&self) -> bool {
        std::path::Path::new(&format!("/proc/{}", self.pid)).exists()
    }

    /// Pointer width of the target executable, from its ELF class byte.
    pub fn pointer_size(&self) -> Option<usize> {
        use std::io::Read;

        let mut ident = [0u8; 5];
        let mut exe = std::fs::File::open(format!("/proc/{}/exe", self.pid)).ok()?;
        exe.read_exact(&mut ident).ok()?;
        match ident {
            [0x7F, b'E', b'L', b'F', 1] => Some(4),
            [0x7F, b'E', b'L', b'F', 2] => Some(8),
            _ => None,
        }
    }
}

#[cfg(target_os = "linux")]
fn find_process_id(name: &str) -> Result<u32> {
    for entry in std::fs::read_dir("/proc")? {
        let entry = entry?;
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.parse::<u32>().ok())
        else {
            continue;
        };

        // Processes can exit between read_dir and the comm read.
        let Ok(comm) = std::fs::read_to_string(entry.path().join("comm")) else {
            continue;
        };
        if comm.trim_end() == name {
            return Ok(pid);
        }
    }

    Err(Error::ProcessNotFound(format!(
        "Process '{}' not found",
        name
    )))
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
impl ProcessHandle {
    pub fn find_by_name(_name: &str) -> Result<Self> {
        Err(Error::ProcessNotFound(
            "process access not supported on this platform".to_string(),
        ))
    }

    pub fn open(_pid: u32) -> Result<Self> {
        Err(Error::ProcessNotFound(
            "process access not supported on this platform".to_string(),
        ))
    }

    pub fn is_alive(&self) -> bool {
        false
    }

    pub fn pointer_size(&self) -> Option<usize> {
        None
    }
}
