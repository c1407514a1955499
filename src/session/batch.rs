//! Bounded batch analysis over a finite frame source.
//!
//! State machine: `Opened → Processing → Finished | Failed | Cancelled`.
//!
//! - `Finished`: the source is exhausted, or the frame budget is reached. If
//!   the source still had frames at that point the report is `Truncated`.
//! - `Failed`: the source returned an error. History so far is kept.
//! - `Cancelled`: the cancel token was set. Checked before every read.
//!
//! A detection failure on one frame only skips that frame.

use crate::ingest::FrameSource;
use crate::report::{Completion, FinalReport};

use super::{CancelToken, Progress, Session, TickOutput};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchState {
    Opened,
    Processing,
    Finished,
    Failed,
    Cancelled,
}

impl BatchState {
    /// Terminal state a batch with this completion ended in.
    pub fn of(completion: &Completion) -> Self {
        match completion {
            Completion::Complete | Completion::Truncated { .. } | Completion::Stopped => {
                BatchState::Finished
            }
            Completion::Failed { .. } => BatchState::Failed,
            Completion::Cancelled => BatchState::Cancelled,
        }
    }
}

/// Drive `session` over `source` until a terminal state.
///
/// `on_frame` is called after every frame read, with the tick output when
/// detection succeeded and `None` when the frame was skipped.
pub fn run_batch<S, F>(
    mut session: Session,
    source: &mut S,
    cancel: &CancelToken,
    mut on_frame: F,
) -> FinalReport
where
    S: FrameSource + ?Sized,
    F: FnMut(&Progress, Option<&TickOutput>),
{
    let budget = session.frame_budget();
    let total = match (budget, source.len_hint()) {
        (Some(cap), Some(len)) => Some(cap.min(len)),
        (Some(cap), None) => Some(cap),
        (None, len) => len,
    };
    let mut state = BatchState::Opened;
    log::debug!("batch {:?}: expecting {:?} frame(s)", state, total);

    let completion = loop {
        if cancel.is_cancelled() {
            break Completion::Cancelled;
        }
        if session.budget_exhausted() {
            break at_budget(source, budget.unwrap_or_default());
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break Completion::Complete,
            Err(err) => {
                log::error!("{}", err);
                break Completion::Failed {
                    reason: err.to_string(),
                };
            }
        };
        if state == BatchState::Opened {
            state = BatchState::Processing;
            log::debug!("batch {:?}", state);
        }

        let index = frame.index;
        let output = match session.tick(frame) {
            Ok(output) => Some(output),
            Err(err) => {
                log::warn!("skipping frame {}: {}", index, err);
                None
            }
        };
        let progress = Progress::Batch {
            processed: session.elapsed_frames(),
            total,
        };
        on_frame(&progress, output.as_ref());
    };

    state = BatchState::of(&completion);
    log::debug!("batch {:?}", state);
    session.end(completion)
}

// The budget is spent; peek once to tell a full run from a truncated one.
fn at_budget<S: FrameSource + ?Sized>(source: &mut S, cap: u64) -> Completion {
    match source.next_frame() {
        Ok(None) => Completion::Complete,
        Ok(Some(_)) => {
            log::warn!("analysis truncated at {} frames", cap);
            Completion::Truncated { cap }
        }
        Err(err) => {
            log::warn!("source failed after frame cap was reached: {}", err);
            Completion::Truncated { cap }
        }
    }
}
