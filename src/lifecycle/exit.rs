//! Process termination.

/// Terminates the process with an exit code.
///
/// Implementations used outside tests are expected not to return.
pub trait Exiter: Send + Sync {
    fn exit(&self, code: i32);
}

impl<F> Exiter for F
where
    F: Fn(i32) + Send + Sync,
{
    fn exit(&self, code: i32) {
        self(code)
    }
}

/// Exits through [`std::process::exit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl Exiter for ProcessExit {
    fn exit(&self, code: i32) {
        tracing::warn!(code, "Forcing process exit");
        std::process::exit(code)
    }
}
