//! Log capture for lock discipline tests.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing::subscriber::DefaultGuard;

type LockCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Records, for every log write, whether the checked lock was held.
#[derive(Clone)]
pub(crate) struct LockCheckWriter {
    check: LockCheck,
    held: Arc<Mutex<Vec<bool>>>,
}

impl io::Write for LockCheckWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let held = (self.check)();
        self.held.lock().push(held);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Install a thread-local TRACE subscriber whose writes run `check`.
pub(crate) fn capture_lock_state(
    check: impl Fn() -> bool + Send + Sync + 'static,
) -> (DefaultGuard, Arc<Mutex<Vec<bool>>>) {
    let held = Arc::new(Mutex::new(Vec::new()));
    let writer = LockCheckWriter {
        check: Arc::new(check),
        held: held.clone(),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (tracing::subscriber::set_default(subscriber), held)
}
