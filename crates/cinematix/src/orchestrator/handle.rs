use tokio::task::JoinHandle;
use uuid::Uuid;

/// Owns the task driving one operation. Dropping the handle aborts the task.
pub struct OperationHandle {
    id: Uuid,
    task: JoinHandle<()>,
}

impl OperationHandle {
    pub fn new(id: Uuid, task: JoinHandle<()>) -> Self {
        Self { id, task }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel(&self) {
        if !self.task.is_finished() {
            log::debug!("Cancelling operation {}", self.id);
            self.task.abort();
        }
    }
}

impl Drop for OperationHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
