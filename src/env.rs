use std::ffi::OsStr;

/// Settings read from environment variables at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Env {
    /// Print the assembled memory after a successful compile (`JNS_LISTING=1`)
    pub listing: bool,
}

impl Env {
    pub fn from_vars() -> Self {
        Env {
            listing: var_is("JNS_LISTING", "1"),
        }
    }
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}
