//! Address-space ceiling for page builds.
//!
//! Assembling a large page inflates the owned DOM tree several times over
//! the serialized size. [`MemoryCeilingGuard`] raises the process soft
//! address-space limit to a fixed ceiling for the duration of a build and
//! restores the previous limit afterwards, so one oversized page cannot
//! take the whole process down with it.

#[cfg(unix)]
const MEMORY_CEILING: libc::rlim_t = 1024 * 1024 * 1024;

/// RAII guard over the process address-space soft limit.
///
/// On non-Unix targets this is a no-op.
#[derive(Debug)]
pub struct MemoryCeilingGuard {
    /// Prior (soft, hard) limits to restore on drop.
    #[cfg(unix)]
    previous: Option<(libc::rlim_t, libc::rlim_t)>,
}

impl MemoryCeilingGuard {
    /// Raise the soft address-space limit to the build ceiling.
    ///
    /// Limits already at or above the ceiling (or unlimited) are left
    /// untouched. Failures are logged and the build proceeds under the
    /// existing limit.
    #[must_use]
    pub fn engage() -> Self {
        Self {
            #[cfg(unix)]
            previous: raise_address_space_limit(),
        }
    }
}

#[cfg(unix)]
impl Drop for MemoryCeilingGuard {
    fn drop(&mut self) {
        if let Some((soft, hard)) = self.previous.take() {
            let restored = libc::rlimit {
                rlim_cur: soft,
                rlim_max: hard,
            };
            // SAFETY: restoring limits previously read via getrlimit.
            if unsafe { libc::setrlimit(libc::RLIMIT_AS, &raw const restored) } != 0 {
                tracing::warn!(
                    "failed to restore address-space limit: {}",
                    std::io::Error::last_os_error()
                );
            }
        }
    }
}

/// Raise the soft address-space limit, returning the prior limits.
#[cfg(unix)]
fn raise_address_space_limit() -> Option<(libc::rlim_t, libc::rlim_t)> {
    let mut current = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: passing a valid pointer to an rlimit the call fills in.
    if unsafe { libc::getrlimit(libc::RLIMIT_AS, &raw mut current) } != 0 {
        tracing::warn!(
            "failed to read address-space limit: {}",
            std::io::Error::last_os_error()
        );
        return None;
    }
    if current.rlim_cur == libc::RLIM_INFINITY || current.rlim_cur >= MEMORY_CEILING {
        return None;
    }

    let raised = libc::rlimit {
        rlim_cur: if current.rlim_max == libc::RLIM_INFINITY {
            MEMORY_CEILING
        } else {
            current.rlim_max.min(MEMORY_CEILING)
        },
        rlim_max: current.rlim_max,
    };
    // SAFETY: raising only the soft limit, never above the hard limit.
    if unsafe { libc::setrlimit(libc::RLIMIT_AS, &raw const raised) } != 0 {
        tracing::warn!(
            "failed to raise address-space limit: {}",
            std::io::Error::last_os_error()
        );
        return None;
    }
    tracing::debug!(
        "raised address-space soft limit from {} to {} for page build",
        current.rlim_cur,
        raised.rlim_cur
    );
    Some((current.rlim_cur, current.rlim_max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engage_and_drop_do_not_panic() {
        let guard = MemoryCeilingGuard::engage();
        drop(guard);
    }
}
