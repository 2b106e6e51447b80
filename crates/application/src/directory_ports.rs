use async_trait::async_trait;
use seatkeeper_core::AppResult;
use seatkeeper_domain::{Principal, Subject, SubjectId};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Buffered items between a directory producer and its consumer.
pub const DEFAULT_SUBJECT_STREAM_BUFFER: usize = 64;

/// Repository port for principal metadata lookups.
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// Resolves one principal.
    ///
    /// An empty id yields the anonymous principal. An unknown id may yield a
    /// minimal principal carrying only the id.
    async fn get_by_id(&self, id: &SubjectId) -> AppResult<Principal>;

    /// Bulk version of [`PrincipalRepository::get_by_id`], failing on the first error.
    async fn get_by_ids(&self, ids: &[SubjectId]) -> AppResult<Vec<Principal>>;
}

/// Repository port for organization membership.
pub trait SubjectRepository: Send + Sync {
    /// Starts streaming all members of an organization.
    ///
    /// Each call restarts from the first page. The producer stops after the
    /// first error item and whenever `cancellation` fires or the stream is
    /// dropped.
    fn get_by_org_id(&self, org_id: &str, cancellation: &CancellationToken) -> SubjectStream;
}

/// Producer half of a [`SubjectStream`].
#[derive(Debug, Clone)]
pub struct SubjectSink {
    sender: mpsc::Sender<AppResult<Subject>>,
    cancellation: CancellationToken,
}

impl SubjectSink {
    /// Sends one item, waiting for buffer space.
    ///
    /// Returns `false` once the consumer is gone or cancelled, after which the
    /// producer should stop.
    pub async fn send(&self, item: AppResult<Subject>) -> bool {
        tokio::select! {
            () = self.cancellation.cancelled() => false,
            result = self.sender.send(item) => result.is_ok(),
        }
    }

    /// Returns whether the consumer asked the producer to stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled() || self.sender.is_closed()
    }

    /// Resolves when the consumer asks the producer to stop.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}

/// Lazy sequence of organization members terminated by the producer.
///
/// Items are either a member or an error; after an error the producer emits
/// nothing further. Dropping the stream cancels the producer.
#[derive(Debug)]
pub struct SubjectStream {
    receiver: mpsc::Receiver<AppResult<Subject>>,
    _cancel_on_drop: DropGuard,
}

impl SubjectStream {
    /// Creates a connected producer/consumer pair.
    ///
    /// The pair listens to a child of `parent`, so cancelling the parent stops
    /// the producer while dropping the stream leaves the parent untouched.
    #[must_use]
    pub fn channel(capacity: usize, parent: &CancellationToken) -> (SubjectSink, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let cancellation = parent.child_token();

        (
            SubjectSink {
                sender,
                cancellation: cancellation.clone(),
            },
            Self {
                receiver,
                _cancel_on_drop: cancellation.drop_guard(),
            },
        )
    }

    /// Receives the next item, or `None` once the producer finished.
    pub async fn next(&mut self) -> Option<AppResult<Subject>> {
        self.receiver.recv().await
    }

    /// Drains the stream, returning every member or the first error.
    pub async fn collect_all(mut self) -> AppResult<Vec<Subject>> {
        let mut subjects = Vec::new();

        while let Some(item) = self.next().await {
            subjects.push(item?);
        }

        Ok(subjects)
    }
}
