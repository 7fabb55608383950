use std::thread;

use crate::error::Result;
use crate::queue::{channel, Consumer, Producer};
use crate::stage::Stage;

/// How many records a stage worker pulls from its input queue at a time.
const STAGE_BATCH: usize = 32;

/// One stage awaiting construction: the transform plus the record width of
/// the queue it feeds.
struct StageSpec {
    elem_size: usize,
    stage: Box<dyn Stage>,
}

/// Builder that chains queues through worker threads.
///
/// Each `stage` call appends a transform and declares the record width of
/// the queue it pushes into; `build` creates the queues, spawns one worker
/// thread per stage, and hands back the producer feeding the head and the
/// consumer draining the tail.
///
/// Workers terminate on their own: a stage exits once its input reaches
/// end-of-stream, which releases its handles and propagates the shutdown
/// down the chain. Dropping the head producer is all it takes to wind the
/// whole pipeline down once the data runs out.
///
/// # Example
///
/// ```
/// use bytepipe::PipelineBuilder;
///
/// let (head, tail) = PipelineBuilder::new(1)
///     .stage(1, |batch: &[u8], _count: usize, out: &bytepipe::Producer| {
///         let doubled: Vec<u8> = batch.iter().map(|b| b * 2).collect();
///         out.push(&doubled);
///     })
///     .build()
///     .unwrap();
///
/// head.push(&[1, 2, 3]);
/// drop(head);
///
/// let mut out = [0u8; 3];
/// assert_eq!(tail.pop(&mut out), 3);
/// assert_eq!(out, [2, 4, 6]);
/// assert_eq!(tail.pop(&mut out), 0);
/// ```
pub struct PipelineBuilder {
    head_elem_size: usize,
    limit: usize,
    stages: Vec<StageSpec>,
}

impl PipelineBuilder {
    /// Starts a pipeline whose head queue carries `elem_size`-byte records.
    pub fn new(elem_size: usize) -> Self {
        Self {
            head_elem_size: elem_size,
            limit: 0,
            stages: Vec::new(),
        }
    }

    /// Appends a stage that pushes `elem_size`-byte records into the next
    /// queue.
    pub fn stage(mut self, elem_size: usize, stage: impl Stage) -> Self {
        self.stages.push(StageSpec {
            elem_size,
            stage: Box::new(stage),
        });
        self
    }

    /// Bounds every queue in the pipeline to roughly `limit` records, so a
    /// slow stage stalls the stages upstream of it instead of buffering
    /// without end. Zero (the default) leaves the queues unbounded.
    pub fn bounded(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Creates the queues and spawns the stage workers.
    pub fn build(self) -> Result<(Producer, Consumer)> {
        let (head, mut tail) = channel(self.head_elem_size, self.limit)?;

        for spec in self.stages {
            let (next_head, next_tail) = channel(spec.elem_size, self.limit)?;
            spawn_stage(tail, next_head, spec.stage);
            tail = next_tail;
        }

        Ok((head, tail))
    }
}

/// Runs one stage on its own thread until the input reaches end-of-stream.
/// The worker owns the only handles linking its two queues; dropping them on
/// exit is what lets the stages downstream drain out and finish.
fn spawn_stage(input: Consumer, output: Producer, mut stage: Box<dyn Stage>) {
    thread::spawn(move || {
        let elem_size = input.elem_size();
        let mut batch = vec![0u8; STAGE_BATCH * elem_size];
        loop {
            let got = input.pop(&mut batch);
            if got == 0 {
                break;
            }
            stage.process(&batch[..got * elem_size], got, &output);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::PassthroughStage;

    #[test]
    fn empty_pipeline_is_a_plain_queue() {
        let (head, tail) = PipelineBuilder::new(2).build().unwrap();
        head.push(&[1, 2, 3, 4]);
        drop(head);

        let mut out = [0u8; 4];
        assert_eq!(tail.pop(&mut out), 2);
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(tail.pop(&mut out), 0);
    }

    #[test]
    fn zero_width_stage_is_rejected() {
        assert!(PipelineBuilder::new(0).build().is_err());
        assert!(PipelineBuilder::new(1)
            .stage(0, PassthroughStage)
            .build()
            .is_err());
    }

    #[test]
    fn passthrough_stage_delivers_everything() {
        let (head, tail) = PipelineBuilder::new(1)
            .stage(1, PassthroughStage)
            .build()
            .unwrap();

        head.push(&[10, 20, 30, 40]);
        drop(head);

        let mut collected = Vec::new();
        let mut buf = [0u8; 8];
        loop {
            let got = tail.pop(&mut buf);
            if got == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..got]);
        }
        assert_eq!(collected, vec![10, 20, 30, 40]);
    }
}
