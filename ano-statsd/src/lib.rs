//! Injectable StatsD counters built on cadence.
//!
//! ## Defining Metrics
//!
//! In order to use metrics, one needs to first define the [`CounterMetric`] trait on a custom enum.
//! The trait serves only to provide a type safe metric name.
//!
//! ## Recording Metrics
//!
//! Metrics are recorded through a [`MetricsRecorder`], which is passed explicitly to the
//! components that emit measurements. There is no process-wide client: a component that has not
//! been given a recorder uses the [`NoopRecorder`], and tests can inject a capturing recorder to
//! assert on emitted metrics in isolation.
//!
//! To report to a StatsD server, construct a [`StatsdRecorder`] with known arguments:
//!
//! ```no_run
//! # use std::collections::BTreeMap;
//! use ano_statsd::{MetricsClientConfig, StatsdRecorder};
//!
//! let recorder = StatsdRecorder::new(MetricsClientConfig {
//!     prefix: "anodot",
//!     host: "localhost:8125",
//!     default_tags: BTreeMap::new(),
//! })
//! .expect("statsd host must resolve");
//! ```
//!
//! ## Macro Usage
//!
//! The recommended way to record metrics is by using the [`metric!`] macro:
//!
//! ```
//! use ano_statsd::{metric, CounterMetric, NoopRecorder};
//!
//! enum MyCounter {
//!     Responses,
//! }
//!
//! impl CounterMetric for MyCounter {
//!     fn name(&self) -> &'static str {
//!         match self {
//!             Self::Responses => "responses_total",
//!         }
//!     }
//! }
//!
//! let recorder = NoopRecorder;
//! metric!(recorder, counter(MyCounter::Responses) += 1, response_code = "200");
//! ```
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::io;
use std::net::{ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use cadence::{
    BufferedUdpMetricSink, Counted, Metric, MetricBuilder, QueuingMetricSink, StatsdClient,
};

/// Maximum number of metric events that can be queued before we start dropping them.
const METRICS_MAX_QUEUE_SIZE: usize = 100_000;

/// A metric for capturing counters.
///
/// Counters are simple values incremented by a client. The rates at which these events occur will
/// be determined by the server receiving them. Examples of counter uses include the number of HTTP
/// responses received from the Anodot API.
pub trait CounterMetric {
    /// Returns the counter metric name that will be sent to statsd.
    fn name(&self) -> &'static str;
}

/// A sink for internal measurements.
///
/// Implementations must be cheap to call and must never fail the caller. Errors while emitting a
/// metric are logged and swallowed.
pub trait MetricsRecorder: Send + Sync {
    /// Adds `value` to the counter `name` with the given tags.
    fn count(&self, name: &'static str, value: i64, tags: &[(&str, &str)]);
}

impl<T: MetricsRecorder + ?Sized> MetricsRecorder for Arc<T> {
    fn count(&self, name: &'static str, value: i64, tags: &[(&str, &str)]) {
        (**self).count(name, value, tags)
    }
}

impl<T: MetricsRecorder + ?Sized> MetricsRecorder for &T {
    fn count(&self, name: &'static str, value: i64, tags: &[(&str, &str)]) {
        (**self).count(name, value, tags)
    }
}

/// A recorder that discards all metrics.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRecorder;

impl MetricsRecorder for NoopRecorder {
    fn count(&self, _name: &'static str, _value: i64, _tags: &[(&str, &str)]) {}
}

/// Client configuration used for initialization of [`StatsdRecorder`].
#[derive(Debug)]
pub struct MetricsClientConfig<'a, A> {
    /// Prefix which is prepended to all metric names.
    pub prefix: &'a str,
    /// Host of the metrics upstream.
    pub host: A,
    /// Tags that are added to all metrics.
    pub default_tags: BTreeMap<String, String>,
}

/// A recorder that reports to a StatsD server over UDP.
#[derive(Debug)]
pub struct StatsdRecorder {
    client: StatsdClient,
    default_tags: BTreeMap<String, String>,
}

impl StatsdRecorder {
    /// Creates a recorder reporting to the configured host.
    ///
    /// Metrics are buffered and sent from a background queue, so recording never blocks.
    pub fn new<A: ToSocketAddrs>(config: MetricsClientConfig<'_, A>) -> io::Result<Self> {
        let addr = config.host.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "statsd host did not resolve")
        })?;
        ano_log::info!("reporting metrics to statsd at {addr}");

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;

        let udp_sink = BufferedUdpMetricSink::from(addr, socket).map_err(io::Error::other)?;
        let queuing_sink = QueuingMetricSink::with_capacity(udp_sink, METRICS_MAX_QUEUE_SIZE);

        Ok(Self {
            client: StatsdClient::from_sink(config.prefix, queuing_sink),
            default_tags: config.default_tags,
        })
    }

    fn send<'a, T>(&'a self, mut metric: MetricBuilder<'a, 'a, T>)
    where
        T: Metric + From<String>,
    {
        for (k, v) in &self.default_tags {
            metric = metric.with_tag(k, v);
        }

        if let Err(error) = metric.try_send() {
            ano_log::error!(
                error = &error as &dyn std::error::Error,
                maximum_capacity = METRICS_MAX_QUEUE_SIZE,
                "error sending a metric",
            );
        }
    }
}

impl MetricsRecorder for StatsdRecorder {
    fn count(&self, name: &'static str, value: i64, tags: &[(&str, &str)]) {
        let mut metric = self.client.count_with_tags(name, value);
        for (k, v) in tags {
            metric = metric.with_tag(k, v);
        }
        self.send(metric);
    }
}

/// A recorder that keeps every metric in memory in StatsD line format.
///
/// Lines are formatted as `name:value|c|#tag:value,...`, with tags in the order they were given.
#[cfg(any(test, feature = "test"))]
#[derive(Debug, Default)]
pub struct CapturingRecorder {
    lines: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test"))]
impl CapturingRecorder {
    /// Creates an empty capturing recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all lines captured so far and clears the buffer.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

#[cfg(any(test, feature = "test"))]
impl MetricsRecorder for CapturingRecorder {
    fn count(&self, name: &'static str, value: i64, tags: &[(&str, &str)]) {
        let mut line = format!("{name}:{value}|c");
        for (index, (k, v)) in tags.iter().enumerate() {
            line.push_str(if index == 0 { "|#" } else { "," });
            line.push_str(k);
            line.push(':');
            line.push_str(v);
        }
        self.lines.lock().push(line);
    }
}

/// Emits a metric through a [`MetricsRecorder`].
///
/// The first argument is the recorder, which may be a value, a reference or an `Arc`. Tags are
/// given as `key = value` pairs, where values must be string slices.
///
/// ```
/// use ano_statsd::{metric, CounterMetric, NoopRecorder};
///
/// struct Submissions;
///
/// impl CounterMetric for Submissions {
///     fn name(&self) -> &'static str {
///         "submissions"
///     }
/// }
///
/// metric!(NoopRecorder, counter(Submissions) += 2);
/// ```
#[macro_export]
macro_rules! metric {
    ($recorder:expr, counter($id:expr) += $value:expr $(, $k:ident = $v:expr)* $(,)?) => {
        $crate::MetricsRecorder::count(
            &$recorder,
            $crate::CounterMetric::name(&$id),
            $value as i64,
            &[$((stringify!($k), $v)),*],
        )
    };
}
