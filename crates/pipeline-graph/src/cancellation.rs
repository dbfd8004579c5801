/// A thin, cloneable wrapper over [`tokio_util::sync::CancellationToken`].
///
/// `exitSync()` (spec §4.1 step 6) sets this; every source filter observes
/// it and stops activating, which cascades into the normal EOS path rather
/// than tearing the graph down abruptly.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(tokio_util::sync::CancellationToken);

impl CancellationToken {
    pub fn new() -> Self {
        Self(tokio_util::sync::CancellationToken::new())
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    pub fn child_token(&self) -> Self {
        Self(self.0.child_token())
    }

    pub async fn cancelled(&self) {
        self.0.cancelled().await;
    }
}
