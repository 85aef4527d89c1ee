//! Display-name resolution.
//!
//! The name comes from the command line when given. Otherwise the OS
//! account name is used, found the same way login tools do: the
//! `LOGNAME`, `USER`, `LNAME` and `USERNAME` variables in order, then the
//! passwd entry of the current uid.
//!
//! The server reserves names starting with `~` for connections whose
//! Unix peer matches that user, so the legacy handshake marks a fallback
//! name that way.

use anyhow::{bail, Result};

/// Prefix marking a name as the connecting account's own.
pub const ACCOUNT_NAME_PREFIX: char = '~';

const ACCOUNT_ENV_VARS: [&str; 4] = ["LOGNAME", "USER", "LNAME", "USERNAME"];

/// Pick the display name for this session.
///
/// `explicit` wins unchanged. Otherwise the account name is used,
/// prefixed with [`ACCOUNT_NAME_PREFIX`] when `mark_account` is set.
pub fn display_name(explicit: Option<&str>, mark_account: bool) -> Result<String> {
    if let Some(name) = explicit {
        return Ok(name.to_string());
    }
    let account = account_name()?;
    Ok(if mark_account {
        format!("{ACCOUNT_NAME_PREFIX}{account}")
    } else {
        account
    })
}

/// The OS account name of the current user.
pub fn account_name() -> Result<String> {
    if let Some(name) = account_name_from_env(|key| std::env::var(key).ok()) {
        return Ok(name);
    }
    match passwd_name() {
        Some(name) => Ok(name),
        None => bail!("Could not determine the current user name; pass a name argument"),
    }
}

/// First non-empty account variable, looked up through `lookup`.
fn account_name_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    ACCOUNT_ENV_VARS
        .into_iter()
        .filter_map(lookup)
        .find(|value| !value.is_empty())
}

fn passwd_name() -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    // SAFETY: passwd is a plain C struct of integers and pointers; all-zero is a valid value.
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    // SAFETY: every pointer refers to live, correctly sized storage owned by this frame.
    let rc = unsafe {
        libc::getpwuid_r(
            libc::getuid(),
            &mut pwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        )
    };
    if rc != 0 || result.is_null() || pwd.pw_name.is_null() {
        return None;
    }

    // SAFETY: on success pw_name points at a NUL-terminated string inside `buf`.
    let name = unsafe { std::ffi::CStr::from_ptr(pwd.pw_name) };
    name.to_str().ok().map(str::to_string)
}
