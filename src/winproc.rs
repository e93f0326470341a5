//! Thin wrappers over the `windows` crate's process/thread snapshot and
//! suspend/resume APIs. Nothing in the example corpus uses these even
//! though the teacher's `Cargo.toml` already declares `windows` with
//! `Win32_System_Threading`/`Win32_Foundation` (unused, per its own
//! `grep` — only `std::os::windows::process::CommandExt` is actually used
//! there, for `CREATE_NO_WINDOW`). This module is the missing piece: Game
//! Monitor (F) needs to enumerate processes by name and suspend/resume
//! every thread of a target pid, which Python's original does via
//! `psutil.Process.suspend()`/`.resume()` (itself a `NtSuspendProcess`
//! wrapper on Windows). We do it directly with `CreateToolhelp32Snapshot`
//! (added here via the `Win32_System_Diagnostics_ToolHelp` feature) plus
//! `SuspendThread`/`ResumeThread` per thread, since `windows` 0.52 has no
//! safe `NtSuspendProcess` binding.

#![cfg(target_os = "windows")]

use std::path::PathBuf;

use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, Thread32First, Thread32Next,
    PROCESSENTRY32W, TH32CS_SNAPPROCESS, TH32CS_SNAPTHREAD, THREADENTRY32,
};
use windows::Win32::System::Threading::{
    OpenProcess, OpenThread, QueryFullProcessImageNameW, ResumeThread, SuspendThread,
    PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION, THREAD_SUSPEND_RESUME,
};

pub struct ProcEntry {
    pub pid: u32,
    pub name: String,
}

fn exe_name_from_raw(raw: &[u16]) -> String {
    let len = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    String::from_utf16_lossy(&raw[..len])
}

/// Snapshot every running process. Grounded on the original's
/// `psutil.process_iter(['name', 'pid'])`.
pub fn enum_processes() -> windows::core::Result<Vec<ProcEntry>> {
    let mut out = Vec::new();
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)?;
        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                out.push(ProcEntry {
                    pid: entry.th32ProcessID,
                    name: exe_name_from_raw(&entry.szExeFile),
                });
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
        let _ = CloseHandle(snapshot);
    }
    Ok(out)
}

/// Resolve a pid's executable path, for deriving the game directory in
/// `paths::resolve_game_dir`.
pub fn process_image_path(pid: u32) -> Option<PathBuf> {
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
        let mut buf = [0u16; 1024];
        let mut size = buf.len() as u32;
        let result = QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_WIN32,
            windows::core::PWSTR(buf.as_mut_ptr()),
            &mut size,
        );
        let _ = CloseHandle(handle);
        result.ok()?;
        Some(PathBuf::from(String::from_utf16_lossy(&buf[..size as usize])))
    }
}

/// Every thread id belonging to `pid`, for suspend/resume.
fn enum_thread_ids(pid: u32) -> windows::core::Result<Vec<u32>> {
    let mut out = Vec::new();
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPTHREAD, 0)?;
        let mut entry = THREADENTRY32 {
            dwSize: std::mem::size_of::<THREADENTRY32>() as u32,
            ..Default::default()
        };
        if Thread32First(snapshot, &mut entry).is_ok() {
            loop {
                if entry.th32OwnerProcessID == pid {
                    out.push(entry.th32ThreadID);
                }
                if Thread32Next(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
        let _ = CloseHandle(snapshot);
    }
    Ok(out)
}

fn for_each_thread(pid: u32, f: impl Fn(HANDLE)) -> windows::core::Result<()> {
    for tid in enum_thread_ids(pid)? {
        unsafe {
            if let Ok(handle) = OpenThread(THREAD_SUSPEND_RESUME, false, tid) {
                f(handle);
                let _ = CloseHandle(handle);
            }
        }
    }
    Ok(())
}

/// Suspend every thread of `pid`. Best-effort: a denied `OpenThread` on one
/// thread does not abort the others (mirrors `psutil.Process.suspend()`
/// suspending all threads it can reach).
pub fn suspend_process(pid: u32) -> windows::core::Result<()> {
    for_each_thread(pid, |handle| unsafe {
        SuspendThread(handle);
    })
}

/// Resume every thread of `pid`. Idempotent: resuming an already-running
/// thread is a harmless no-op (`ResumeThread` just decrements a counter
/// that is already at zero).
pub fn resume_process(pid: u32) -> windows::core::Result<()> {
    for_each_thread(pid, |handle| unsafe {
        ResumeThread(handle);
    })
}
