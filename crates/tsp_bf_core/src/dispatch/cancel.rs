use std::sync::{
    Arc, Mutex, OnceLock,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::Notify;

static INTERRUPT_TARGET: OnceLock<Mutex<Option<Cancellation>>> = OnceLock::new();
static INTERRUPT_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Default)]
struct Latch {
    tripped: AtomicBool,
    notify: Notify,
}

/// One-way cancellation latch shared by every unit of work in a run.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    latch: Arc<Latch>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.latch.tripped.swap(true, Ordering::SeqCst) {
            log::debug!("cancel: latch tripped");
        }
        self.latch.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.latch.tripped.load(Ordering::SeqCst)
    }

    /// Resolves once [`Cancellation::cancel`] has been called, including before the call.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.latch.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

fn interrupt_target() -> &'static Mutex<Option<Cancellation>> {
    INTERRUPT_TARGET.get_or_init(|| Mutex::new(None))
}

fn install_interrupt_hook_once() {
    INTERRUPT_HOOK_INSTALLED.get_or_init(|| {
        if let Err(err) = ctrlc::set_handler(|| {
            let target = match interrupt_target().lock() {
                Ok(guard) => guard.clone(),
                Err(_) => None,
            };
            match target {
                Some(cancel) => {
                    log::warn!("interrupt: cancelling active search");
                    cancel.cancel();
                }
                None => std::process::exit(130),
            }
        }) {
            log::warn!("interrupt: failed to install handler err={err}");
        }
    });
}

/// Routes Ctrl-C to `cancel` until another run registers or the guard is dropped.
pub fn cancel_on_interrupt(cancel: &Cancellation) -> InterruptGuard {
    install_interrupt_hook_once();
    if let Ok(mut guard) = interrupt_target().lock() {
        *guard = Some(cancel.clone());
    }
    InterruptGuard
}

#[must_use = "dropping the guard unregisters the run from Ctrl-C handling"]
pub struct InterruptGuard;

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Some(target) = INTERRUPT_TARGET.get()
            && let Ok(mut guard) = target.lock()
        {
            *guard = None;
        }
    }
}
