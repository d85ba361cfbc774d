use crate::classify::{BinStatus, PredictResponse};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// 保留的最近分析条数
pub const HISTORY_CAPACITY: usize = 10;

/// 单次分析记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp: DateTime<Utc>,
    pub filename: Option<String>,
    pub status: BinStatus,
    pub confidence: f32,
    pub class_name: Option<String>,
    pub detection_count: usize,
    /// 秒
    pub processing_time: f64,
}

impl AnalysisRecord {
    pub fn from_response(response: &PredictResponse) -> Self {
        Self {
            timestamp: Utc::now(),
            filename: response.image_info.filename.clone(),
            status: response.status,
            confidence: response.confidence,
            class_name: response.class_name.clone(),
            detection_count: response.detection_count,
            processing_time: response.processing_time,
        }
    }
}

/// 统计快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_analyses: u64,
    pub full: u64,
    pub empty: u64,
    pub unknown: u64,
    pub no_detection: u64,
    pub total_confidence: f64,
    pub total_time: f64,
    pub average_confidence: f64,
    pub average_processing_time: f64,
    pub full_percent: f64,
    /// 最近记录，最新在前
    pub history: Vec<AnalysisRecord>,
}

/// 导出的累计统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsExport {
    pub full: u64,
    pub empty: u64,
    pub unknown: u64,
    pub no_detection: u64,
    pub total_analyses: u64,
    pub total_confidence: f64,
    pub total_time: f64,
    pub exported_at: DateTime<Utc>,
}

/// 分析统计存储
pub trait StatsStore: Send + Sync {
    fn record(&self, record: AnalysisRecord);

    fn snapshot(&self) -> StatsSnapshot;

    /// 清空历史，累计计数保留
    fn clear_history(&self);

    fn export(&self) -> StatsExport;
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    full: u64,
    empty: u64,
    unknown: u64,
    no_detection: u64,
    total_confidence: f64,
    total_time: f64,
}

#[derive(Debug, Default)]
struct Inner {
    counters: Counters,
    history: VecDeque<AnalysisRecord>,
}

/// 进程内存储，重启后清零
#[derive(Debug)]
pub struct InMemoryStatsStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
        }
    }
}

impl Default for InMemoryStatsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsStore for InMemoryStatsStore {
    fn record(&self, record: AnalysisRecord) {
        let mut inner = self.inner.lock();
        let counters = &mut inner.counters;

        counters.total += 1;
        counters.total_confidence += record.confidence as f64;
        counters.total_time += record.processing_time;
        match record.status {
            BinStatus::Full => counters.full += 1,
            BinStatus::Empty => counters.empty += 1,
            BinStatus::Unknown => counters.unknown += 1,
            BinStatus::NoDetection => counters.no_detection += 1,
        }

        inner.history.push_front(record);
        inner.history.truncate(self.capacity);
    }

    fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock();
        let c = &inner.counters;

        let (average_confidence, average_processing_time, full_percent) = if c.total > 0 {
            let total = c.total as f64;
            (c.total_confidence / total, c.total_time / total, c.full as f64 / total * 100.0)
        } else {
            (0.0, 0.0, 0.0)
        };

        StatsSnapshot {
            total_analyses: c.total,
            full: c.full,
            empty: c.empty,
            unknown: c.unknown,
            no_detection: c.no_detection,
            total_confidence: c.total_confidence,
            total_time: c.total_time,
            average_confidence,
            average_processing_time,
            full_percent,
            history: inner.history.iter().cloned().collect(),
        }
    }

    fn clear_history(&self) {
        self.inner.lock().history.clear();
        tracing::info!("Analysis history cleared");
    }

    fn export(&self) -> StatsExport {
        let inner = self.inner.lock();
        let c = &inner.counters;

        StatsExport {
            full: c.full,
            empty: c.empty,
            unknown: c.unknown,
            no_detection: c.no_detection,
            total_analyses: c.total,
            total_confidence: c.total_confidence,
            total_time: c.total_time,
            exported_at: Utc::now(),
        }
    }
}
