//! Privilege-gated handlers.

use crate::{
    args::{HandlerResult, Invocation},
    error::CommandError,
};

/// Answers whether the running process may perform privileged commands
pub trait PrivilegeCheck: Send + Sync {
    fn is_elevated(&self) -> bool;
}

/// Checks the effective user of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessPrivilege;

impl PrivilegeCheck for ProcessPrivilege {
    #[cfg(target_os = "linux")]
    fn is_elevated(&self) -> bool {
        use std::os::unix::fs::MetadataExt;

        // /proc/self is owned by the effective uid of the reading process
        std::fs::metadata("/proc/self")
            .map(|meta| meta.uid() == 0)
            .unwrap_or_else(|e| {
                tracing::debug!("Cannot determine effective uid: {e}");
                false
            })
    }

    #[cfg(not(target_os = "linux"))]
    fn is_elevated(&self) -> bool {
        false
    }
}

/// Fixed answer, for embedding and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedPrivilege(pub bool);

impl PrivilegeCheck for FixedPrivilege {
    fn is_elevated(&self) -> bool {
        self.0
    }
}

/// Wrap `handler` so it only runs for an elevated process.
///
/// The wrapper fails with [`CommandError::PermissionDenied`] otherwise. The
/// parser tree is unaffected: the command is still listed and parsed.
pub fn require_privilege<F>(
    handler: F,
) -> impl Fn(&mut Invocation<'_>) -> HandlerResult + Send + Sync + 'static
where
    F: Fn(&mut Invocation<'_>) -> HandlerResult + Send + Sync + 'static,
{
    move |invocation: &mut Invocation<'_>| {
        if !invocation.is_elevated() {
            tracing::warn!(
                command = invocation.command(),
                "Refusing privileged command for unprivileged process"
            );
            return Err(CommandError::PermissionDenied);
        }
        handler(invocation)
    }
}
