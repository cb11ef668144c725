//! Maps the requester's uid to something a human can recognize.
//!
//! Lookups may fail for many reasons (the uid belongs to nothing installed,
//! the data directory is unreadable). None of them may prevent the user from
//! answering, so callers go through [`resolve_or_placeholder`].

use std::ffi::CStr;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::path::PathBuf;

/// Shown in place of any identity field that could not be resolved.
pub const PLACEHOLDER: &str = "N/A";

/// Android assigns each user a block of this many uids.
pub const AID_USER_OFFSET: i32 = 100_000;
pub const AID_APP_START: i32 = 10_000;
pub const AID_APP_END: i32 = 19_999;

const PASSWD_BUF_MAX: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub display_name: String,
    pub package: String,
    /// Other packages running under the same uid.
    pub shared_with: Vec<String>,
}

impl AppIdentity {
    pub fn placeholder() -> Self {
        Self {
            display_name: PLACEHOLDER.to_string(),
            package: PLACEHOLDER.to_string(),
            shared_with: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("{0} is not a valid uid")]
    InvalidUid(i32),
    #[error("uid {0} is outside the application range")]
    NotAnApp(i32),
    #[error("nothing installed owns uid {0}")]
    Unknown(i32),
    #[error("failed to look up uid {uid}: {source}")]
    Lookup {
        uid: i32,
        #[source]
        source: io::Error,
    },
}

pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, uid: i32) -> Result<AppIdentity, IdentityError>;
}

pub fn resolve_or_placeholder(resolver: &dyn IdentityResolver, uid: i32) -> AppIdentity {
    match resolver.resolve(uid) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(uid, "identity lookup failed, using placeholder: {err}");
            AppIdentity::placeholder()
        }
    }
}

pub fn to_app_id(uid: i32) -> i32 {
    uid % AID_USER_OFFSET
}

pub fn to_user_id(uid: i32) -> i32 {
    uid / AID_USER_OFFSET
}

/// Finds packages by the owner of their per-user data directory.
///
/// Every installed package has `<root>/<user_id>/<package>` owned by the
/// package's uid, which makes the directory listing a uid -> package index
/// that needs no package manager.
#[derive(Debug, Clone)]
pub struct AppDataDirResolver {
    root: PathBuf,
}

impl AppDataDirResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl IdentityResolver for AppDataDirResolver {
    fn resolve(&self, uid: i32) -> Result<AppIdentity, IdentityError> {
        if uid < 0 {
            return Err(IdentityError::InvalidUid(uid));
        }
        if !(AID_APP_START..=AID_APP_END).contains(&to_app_id(uid)) {
            return Err(IdentityError::NotAnApp(uid));
        }
        let user_dir = self.root.join(to_user_id(uid).to_string());
        let packages = packages_owned_by(&user_dir, uid)
            .map_err(|source| IdentityError::Lookup { uid, source })?;
        identity_from_packages(uid, packages)
    }
}

fn packages_owned_by(user_dir: &Path, uid: i32) -> io::Result<Vec<String>> {
    let owner = u32::try_from(uid).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
    let mut packages = Vec::new();
    for entry in std::fs::read_dir(user_dir)? {
        let entry = entry?;
        // `DirEntry::metadata` does not follow symlinks.
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.is_dir() && metadata.uid() == owner {
            packages.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    packages.sort();
    Ok(packages)
}

fn identity_from_packages(uid: i32, packages: Vec<String>) -> Result<AppIdentity, IdentityError> {
    let mut packages = packages.into_iter();
    let package = packages.next().ok_or(IdentityError::Unknown(uid))?;
    Ok(AppIdentity {
        display_name: package.clone(),
        package,
        shared_with: packages.collect(),
    })
}

/// Resolves through the system user database.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswdResolver;

impl IdentityResolver for PasswdResolver {
    fn resolve(&self, uid: i32) -> Result<AppIdentity, IdentityError> {
        let raw_uid = libc::uid_t::try_from(uid).map_err(|_| IdentityError::InvalidUid(uid))?;
        let mut buf: Vec<libc::c_char> = vec![0; 1024];
        loop {
            let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::passwd = std::ptr::null_mut();
            let ret = unsafe {
                libc::getpwuid_r(raw_uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
            };
            if ret == libc::ERANGE && buf.len() < PASSWD_BUF_MAX {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if ret != 0 {
                return Err(IdentityError::Lookup {
                    uid,
                    source: io::Error::from_raw_os_error(ret),
                });
            }
            if result.is_null() || pwd.pw_name.is_null() {
                return Err(IdentityError::Unknown(uid));
            }
            let login = unsafe { CStr::from_ptr(pwd.pw_name) }
                .to_string_lossy()
                .into_owned();
            let display_name = full_name(&pwd).unwrap_or_else(|| login.clone());
            return Ok(AppIdentity {
                display_name,
                package: login,
                shared_with: Vec::new(),
            });
        }
    }
}

#[cfg(not(target_os = "android"))]
fn full_name(pwd: &libc::passwd) -> Option<String> {
    if pwd.pw_gecos.is_null() {
        return None;
    }
    let gecos = unsafe { CStr::from_ptr(pwd.pw_gecos) }.to_string_lossy();
    // GECOS is comma separated; the first field is the full name.
    gecos
        .split(',')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(target_os = "android")]
fn full_name(_pwd: &libc::passwd) -> Option<String> {
    None
}

/// Tries each resolver in order; the first success wins.
#[derive(Default)]
pub struct ChainResolver {
    resolvers: Vec<Box<dyn IdentityResolver>>,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl IdentityResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl IdentityResolver for ChainResolver {
    fn resolve(&self, uid: i32) -> Result<AppIdentity, IdentityError> {
        let mut last_err = IdentityError::Unknown(uid);
        for resolver in &self.resolvers {
            match resolver.resolve(uid) {
                Ok(identity) => return Ok(identity),
                Err(err) => {
                    tracing::debug!(uid, "identity resolver failed: {err}");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}
