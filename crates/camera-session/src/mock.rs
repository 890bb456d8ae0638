use crate::{CaptureHandle, CaptureProvider, CaptureTarget, Error, Frame, PixelFormat, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

/// Scripted failure modes for [`MockProvider`].
#[derive(Clone, Debug, Default)]
pub struct MockBehavior {
    /// Refuse to open any target.
    pub fail_open: bool,
    /// Open, but fail the first read (the session's trial frame).
    pub fail_trial_read: bool,
    /// Fail every read after this many successful reads on one handle,
    /// trial frame included.
    pub fail_reads_after: Option<u64>,
    /// Geometry the fake driver clamps to instead of the requested one.
    pub negotiated: Option<(u32, u32)>,
}

/// Counters shared between a provider and its handles.
#[derive(Clone, Debug, Default)]
pub struct MockStats {
    inner: Arc<MockStatsInner>,
}

#[derive(Debug, Default)]
struct MockStatsInner {
    opens: AtomicU64,
    releases: AtomicU64,
    reads: AtomicU64,
    last_target: Mutex<Option<CaptureTarget>>,
}

impl MockStats {
    pub fn opens(&self) -> u64 {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> u64 {
        self.inner.releases.load(Ordering::SeqCst)
    }

    /// Successful reads across all handles.
    pub fn reads(&self) -> u64 {
        self.inner.reads.load(Ordering::SeqCst)
    }

    pub fn last_target(&self) -> Option<CaptureTarget> {
        self.inner
            .last_target
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

/// In-process capture provider producing a moving BGR ramp.
#[derive(Default)]
pub struct MockProvider {
    behavior: MockBehavior,
    stats: MockStats,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            stats: MockStats::default(),
        }
    }

    pub fn stats(&self) -> MockStats {
        self.stats.clone()
    }
}

impl CaptureProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn open(&mut self, target: &CaptureTarget) -> Result<Box<dyn CaptureHandle>> {
        if let Ok(mut last) = self.stats.inner.last_target.lock() {
            *last = Some(target.clone());
        }
        if self.behavior.fail_open {
            return Err(Error::OpenFailure(format!("mock refused {target}")));
        }
        self.stats.inner.opens.fetch_add(1, Ordering::SeqCst);

        let (width, height) = self
            .behavior
            .negotiated
            .unwrap_or_else(|| target_geometry(target));
        Ok(Box::new(MockHandle {
            width,
            height,
            negotiated: self.behavior.negotiated,
            fail_trial_read: self.behavior.fail_trial_read,
            fail_reads_after: self.behavior.fail_reads_after,
            served: 0,
            stats: self.stats.clone(),
        }))
    }
}

struct MockHandle {
    width: u32,
    height: u32,
    negotiated: Option<(u32, u32)>,
    fail_trial_read: bool,
    fail_reads_after: Option<u64>,
    served: u64,
    stats: MockStats,
}

impl CaptureHandle for MockHandle {
    fn read(&mut self) -> Result<Frame> {
        if self.fail_trial_read && self.served == 0 {
            return Err(Error::ReadFailure("mock sensor delivers no data".into()));
        }
        if let Some(limit) = self.fail_reads_after {
            if self.served >= limit {
                return Err(Error::ReadFailure("mock stream stalled".into()));
            }
        }
        self.served += 1;
        self.stats.inner.reads.fetch_add(1, Ordering::SeqCst);

        let (w, h) = (self.width as usize, self.height as usize);
        let shift = self.served as usize;
        let mut data = vec![0u8; w * h * 3];
        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) * 3;
                data[idx] = ((x + shift) % 256) as u8;
                data[idx + 1] = ((y + shift) % 256) as u8;
                data[idx + 2] = ((x + y) % 256) as u8;
            }
        }
        Ok(Frame {
            width: self.width,
            height: self.height,
            pixel_format: PixelFormat::Bgr8,
            data,
            ts: Some(OffsetDateTime::now_utc()),
        })
    }

    fn negotiated(&self) -> Option<(u32, u32)> {
        self.negotiated
    }

    fn release(self: Box<Self>) {
        self.stats.inner.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Requested geometry; pipelines are scanned for their first `width=`/`height=`.
fn target_geometry(target: &CaptureTarget) -> (u32, u32) {
    match target {
        CaptureTarget::Device { width, height, .. } => (*width, *height),
        CaptureTarget::Pipeline(desc) => {
            let width = caps_value(desc, "width=").unwrap_or(640);
            let height = caps_value(desc, "height=").unwrap_or(480);
            (width, height)
        }
    }
}

fn caps_value(desc: &str, key: &str) -> Option<u32> {
    let start = desc.find(key)? + key.len();
    let digits: String = desc[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
