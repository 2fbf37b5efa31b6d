use std::any::Any;

/// A unit of work run by a [`WorkerPool`](super::WorkerPool).
///
/// Each pool thread owns one worker and feeds it jobs one at a time, so
/// `execute` may keep scratch state in `self` without synchronization.
pub trait Worker: Send + 'static {
    /// Input of one job.
    type Job: Send + 'static;
    /// Output produced for every job.
    type Output: Send + 'static;

    /// Runs one job to completion.
    ///
    /// Failures belong in `Output`. A panic is caught by the pool, which
    /// then asks [`Worker::on_panic`] for the output of the job.
    fn execute(&mut self, job: Self::Job) -> Self::Output;

    /// Builds the output for a job whose `execute` panicked.
    ///
    /// Returning `None` counts the job as finished without delivering
    /// anything. The default does that.
    fn on_panic(&mut self, payload: &(dyn Any + Send)) -> Option<Self::Output> {
        let _ = payload;
        None
    }
}

/// Extracts the message of a panic payload, if it was a string.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
