//! Keeps other unprivileged processes from inspecting or steering the broker
//! while a prompt is open.

#[cfg(unix)]
use std::ffi::OsString;
#[cfg(unix)]
use std::os::unix::ffi::OsStrExt;

#[cfg(any(target_os = "linux", target_os = "android"))]
const PRCTL_FAILED_EXIT_CODE: i32 = 5;

#[cfg(target_os = "macos")]
const PTRACE_DENY_ATTACH_FAILED_EXIT_CODE: i32 = 6;

#[cfg(unix)]
const SET_RLIMIT_CORE_FAILED_EXIT_CODE: i32 = 7;

/// Runs before `main` (see the `ctor` hook in the binary):
/// - marks the process non-dumpable, which also blocks ptrace attach on Linux
/// - denies debugger attach on macOS
/// - disables core dumps
/// - drops loader variables (`LD_*`, `DYLD_*`) before anything reads them
pub fn pre_main_hardening() {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pre_main_hardening_linux();

    #[cfg(target_os = "macos")]
    pre_main_hardening_macos();
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn pre_main_hardening_linux() {
    let ret_code = unsafe { libc::prctl(libc::PR_SET_DUMPABLE, 0, 0, 0, 0) };
    if ret_code != 0 {
        fail(
            "prctl(PR_SET_DUMPABLE, 0)",
            std::io::Error::last_os_error(),
            PRCTL_FAILED_EXIT_CODE,
        );
    }

    set_core_file_size_limit_to_zero();
    remove_env_with_prefix(b"LD_");
}

#[cfg(target_os = "macos")]
fn pre_main_hardening_macos() {
    let ret_code = unsafe { libc::ptrace(libc::PT_DENY_ATTACH, 0, std::ptr::null_mut(), 0) };
    if ret_code == -1 {
        fail(
            "ptrace(PT_DENY_ATTACH)",
            std::io::Error::last_os_error(),
            PTRACE_DENY_ATTACH_FAILED_EXIT_CODE,
        );
    }

    set_core_file_size_limit_to_zero();
    remove_env_with_prefix(b"DYLD_");
}

#[cfg(unix)]
fn set_core_file_size_limit_to_zero() {
    let rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    let ret_code = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlim) };
    if ret_code != 0 {
        fail(
            "setrlimit(RLIMIT_CORE)",
            std::io::Error::last_os_error(),
            SET_RLIMIT_CORE_FAILED_EXIT_CODE,
        );
    }
}

/// No logging exists yet this early; stderr is all there is.
#[cfg(unix)]
#[allow(clippy::print_stderr)]
fn fail(call: &str, err: std::io::Error, exit_code: i32) -> ! {
    eprintln!("ERROR: {call} failed: {err}");
    std::process::exit(exit_code);
}

#[cfg(unix)]
fn remove_env_with_prefix(prefix: &[u8]) {
    for key in env_keys_with_prefix(std::env::vars_os(), prefix) {
        // Safety: runs from a constructor, before main and any other thread.
        unsafe {
            std::env::remove_var(key);
        }
    }
}

#[cfg(unix)]
fn env_keys_with_prefix<I>(vars: I, prefix: &[u8]) -> Vec<OsString>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, _)| {
            key.as_os_str()
                .as_bytes()
                .starts_with(prefix)
                .then_some(key)
        })
        .collect()
}
