use crate::queue::Producer;

/// A transform applied between two queues of a pipeline.
///
/// `process` is invoked serially on the stage's worker thread with a batch of
/// whole input records. It may push any number of output records, including
/// none or more than it was handed. Pushing into `out` blocks when the next
/// queue is bounded and full; that is the pipeline's backpressure, and the
/// only thing a stage should ever block on.
pub trait Stage: Send + 'static {
    /// Transform `count` records laid out back to back in `batch`, pushing
    /// any results into `out`.
    fn process(&mut self, batch: &[u8], count: usize, out: &Producer);

    /// Get a human-readable name for this stage
    fn name(&self) -> &str {
        "stage"
    }
}

impl<F> Stage for F
where
    F: FnMut(&[u8], usize, &Producer) + Send + 'static,
{
    fn process(&mut self, batch: &[u8], count: usize, out: &Producer) {
        self(batch, count, out)
    }
}

/// Forwards every batch unchanged. Input and output widths must match.
#[derive(Debug)]
pub struct PassthroughStage;

impl Stage for PassthroughStage {
    fn process(&mut self, batch: &[u8], _count: usize, out: &Producer) {
        out.push(batch);
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Transforms each input record into exactly one output record.
#[derive(Debug)]
pub struct MapStage<F>
where
    F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
{
    name: String,
    mapper: F,
}

impl<F> MapStage<F>
where
    F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
{
    /// Create a new map stage
    pub fn new(name: impl Into<String>, mapper: F) -> Self {
        Self {
            name: name.into(),
            mapper,
        }
    }
}

impl<F> Stage for MapStage<F>
where
    F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
{
    fn process(&mut self, batch: &[u8], count: usize, out: &Producer) {
        if count == 0 {
            return;
        }
        let width = batch.len() / count;
        let mut mapped = Vec::with_capacity(count * out.elem_size());
        for record in batch.chunks_exact(width) {
            mapped.extend_from_slice(&(self.mapper)(record));
        }
        out.push(&mapped);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Forwards the input records matching a predicate. Input and output widths
/// must match.
#[derive(Debug)]
pub struct FilterStage<F>
where
    F: FnMut(&[u8]) -> bool + Send + 'static,
{
    name: String,
    predicate: F,
}

impl<F> FilterStage<F>
where
    F: FnMut(&[u8]) -> bool + Send + 'static,
{
    /// Create a new filter stage
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Stage for FilterStage<F>
where
    F: FnMut(&[u8]) -> bool + Send + 'static,
{
    fn process(&mut self, batch: &[u8], count: usize, out: &Producer) {
        if count == 0 {
            return;
        }
        let width = batch.len() / count;
        let mut kept = Vec::with_capacity(batch.len());
        for record in batch.chunks_exact(width) {
            if (self.predicate)(record) {
                kept.extend_from_slice(record);
            }
        }
        out.push(&kept);
    }

    fn name(&self) -> &str {
        &self.name
    }
}
