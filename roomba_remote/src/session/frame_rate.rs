// roomba_remote/src/session/frame_rate.rs

//! 图像帧率估计。
//!
//! 固定容量的环形缓冲区记录最近若干帧的到达时刻，
//! 帧率 = (已记录帧数 - 1) / (当前时刻 - 最早记录时刻)，即相邻帧间隔数除以总跨度。

use std::time::Instant;

pub struct FrameRateMeter {
    arrivals: Vec<Option<Instant>>,
    next: usize,
}

impl FrameRateMeter {
    /// `window` 为 0 时按 1 处理。
    pub fn new(window: usize) -> Self {
        Self { arrivals: vec![None; window.max(1)], next: 0 }
    }

    /// 记录一帧的到达并返回当前帧率。
    pub fn record(&mut self) -> f64 {
        self.record_at(Instant::now())
    }

    /// 以给定时刻记录一帧的到达并返回当前帧率；时间跨度为 0 时返回 0。
    pub fn record_at(&mut self, now: Instant) -> f64 {
        self.arrivals[self.next] = Some(now);
        self.next = (self.next + 1) % self.arrivals.len();

        let recorded = self.arrivals.iter().flatten().count();
        let Some(oldest) = self.arrivals.iter().flatten().min().copied() else {
            return 0.0;
        };
        let span = now.saturating_duration_since(oldest).as_secs_f64();
        if span > 0.0 {
            (recorded - 1) as f64 / span
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        self.arrivals.iter_mut().for_each(|slot| *slot = None);
        self.next = 0;
    }
}
