use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::time::{Instant, Sleep};

/// A sleep that may have no deadline at all, in which case it never completes.
///
/// Lets a `select!` loop always include a timer branch, whether or not a timer
/// is currently armed.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub(crate) struct MaybeTimer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl MaybeTimer {
    pub(crate) fn at(expires_at: Option<Instant>) -> Self {
        Self {
            sleep: expires_at.map(|at| Box::pin(tokio::time::sleep_until(at))),
        }
    }
}

impl Future for MaybeTimer {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().poll(cx),
            // Nothing to wake for, the other select branches drive the loop
            None => Poll::Pending,
        }
    }
}
