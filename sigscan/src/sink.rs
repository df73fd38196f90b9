//! Output sinks for the enumeration engine (spec.md §4.6): an append-only,
//! order-preserving destination for testable intervals, significant
//! intervals, and the final psi-histogram.

/// A single emitted record (spec.md §3): a testable interval, a
/// significant interval, or one bucket of the psi-histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record {
    /// A testable interval of length `l` starting at `tau`, with combined
    /// p-value `p`.
    Testable {
        /// Interval length.
        l: usize,
        /// Interval start.
        tau: usize,
        /// Combined p-value.
        p: f64,
    },
    /// A significant interval (`p <= delta_star`) of length `l` starting
    /// at `tau`, with combined p-value `p`.
    Significant {
        /// Interval length.
        l: usize,
        /// Interval start.
        tau: usize,
        /// Combined p-value.
        p: f64,
    },
    /// `count` testable intervals whose combined minimum attainable
    /// p-value fell in threshold-grid bucket `bucket`.
    HistogramBucket {
        /// Grid bucket index, `0..=grid::NGRID`.
        bucket: usize,
        /// Number of testable intervals recorded in this bucket.
        count: u64,
    },
}

/// Receives testable intervals, significant intervals, and psi-histogram
/// buckets as a run discovers them.
///
/// Implementations must be append-only: a record, once emitted, is never
/// revisited or overwritten. [`Self::record`] is the sole required method;
/// the three `record_*` helpers are how callers actually emit records and
/// need no overriding.
pub trait ReportSink {
    /// Records a single emitted record.
    fn record(&mut self, record: Record);

    /// Records a testable interval of length `l` starting at `tau`, with
    /// combined p-value `p`.
    fn record_testable(&mut self, l: usize, tau: usize, p: f64) {
        self.record(Record::Testable { l, tau, p });
    }

    /// Records a significant interval (`p <= delta_star`) of length `l`
    /// starting at `tau`, with combined p-value `p`.
    fn record_significant(&mut self, l: usize, tau: usize, p: f64) {
        self.record(Record::Significant { l, tau, p });
    }

    /// Records one bucket of the psi-histogram.
    fn record_histogram_bucket(&mut self, bucket: usize, count: u64) {
        self.record(Record::HistogramBucket { bucket, count });
    }
}

/// In-memory sink, chiefly for tests and for building a summary report.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    /// Every testable interval seen, in emission order: `(l, tau, p)`.
    pub testable: Vec<(usize, usize, f64)>,
    /// Every significant interval seen, in emission order: `(l, tau, p)`.
    pub significant: Vec<(usize, usize, f64)>,
    /// Every histogram bucket seen, in emission order: `(bucket, count)`.
    pub histogram: Vec<(usize, u64)>,
}

impl ReportSink for VecSink {
    fn record(&mut self, record: Record) {
        match record {
            Record::Testable { l, tau, p } => self.testable.push((l, tau, p)),
            Record::Significant { l, tau, p } => self.significant.push((l, tau, p)),
            Record::HistogramBucket { bucket, count } => self.histogram.push((bucket, count)),
        }
    }
}

/// Sink that forwards each record to one of three closures, for streaming
/// records to a writer without buffering them in memory.
pub struct CallbackSink<T, S, H>
where
    T: FnMut(usize, usize, f64),
    S: FnMut(usize, usize, f64),
    H: FnMut(usize, u64),
{
    on_testable: T,
    on_significant: S,
    on_histogram: H,
}

impl<T, S, H> CallbackSink<T, S, H>
where
    T: FnMut(usize, usize, f64),
    S: FnMut(usize, usize, f64),
    H: FnMut(usize, u64),
{
    /// Builds a sink that calls `on_testable`, `on_significant` and
    /// `on_histogram` as records arrive.
    pub fn new(on_testable: T, on_significant: S, on_histogram: H) -> Self {
        Self {
            on_testable,
            on_significant,
            on_histogram,
        }
    }
}

impl<T, S, H> ReportSink for CallbackSink<T, S, H>
where
    T: FnMut(usize, usize, f64),
    S: FnMut(usize, usize, f64),
    H: FnMut(usize, u64),
{
    fn record(&mut self, record: Record) {
        match record {
            Record::Testable { l, tau, p } => (self.on_testable)(l, tau, p),
            Record::Significant { l, tau, p } => (self.on_significant)(l, tau, p),
            Record::HistogramBucket { bucket, count } => (self.on_histogram)(bucket, count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_preserves_emission_order() {
        let mut sink = VecSink::default();
        sink.record_testable(1, 3, 0.2);
        sink.record_testable(2, 1, 0.01);
        sink.record_significant(2, 1, 0.01);
        sink.record_histogram_bucket(5, 2);
        assert_eq!(sink.testable, vec![(1, 3, 0.2), (2, 1, 0.01)]);
        assert_eq!(sink.significant, vec![(2, 1, 0.01)]);
        assert_eq!(sink.histogram, vec![(5, 2)]);
    }

    #[test]
    fn callback_sink_forwards_records() {
        let mut testable = Vec::new();
        let mut significant = Vec::new();
        let mut histogram = Vec::new();
        {
            let mut sink = CallbackSink::new(
                |l, tau, p| testable.push((l, tau, p)),
                |l, tau, p| significant.push((l, tau, p)),
                |bucket, count| histogram.push((bucket, count)),
            );
            sink.record_testable(1, 0, 0.5);
            sink.record_significant(1, 0, 0.5);
            sink.record_histogram_bucket(3, 7);
        }
        assert_eq!(testable, vec![(1, 0, 0.5)]);
        assert_eq!(significant, vec![(1, 0, 0.5)]);
        assert_eq!(histogram, vec![(3, 7)]);
    }
}
