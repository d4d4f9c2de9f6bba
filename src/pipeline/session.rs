//! 单次调度的计时参数与会话记录。

use std::time::Duration;

use chrono::{DateTime, Local};

/// 各阶段的等待与轮询参数。
///
/// 所有截止时间都是软截止：超时只改变流水线走哪条分支，从不报错。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineTimings {
    /// 清空剪贴板后等待系统生效。
    pub after_clear: Duration,
    /// 单行模式选中与剪切之间的停顿。
    pub line_select_pause: Duration,
    pub poll_interval: Duration,
    pub poll_deadline: Duration,
    pub confirm_initial: Duration,
    pub confirm_factor: f64,
    pub confirm_cap: Duration,
    pub confirm_budget: Duration,
    /// 粘贴后、回车前的等待。
    pub before_send: Duration,
}

impl Default for PipelineTimings {
    fn default() -> Self {
        Self {
            after_clear: Duration::from_millis(5),
            line_select_pause: Duration::from_millis(10),
            poll_interval: Duration::from_millis(5),
            poll_deadline: Duration::from_millis(2500),
            confirm_initial: Duration::from_millis(10),
            confirm_factor: 1.5,
            confirm_cap: Duration::from_millis(80),
            confirm_budget: Duration::from_millis(500),
            before_send: Duration::from_millis(400),
        }
    }
}

impl PipelineTimings {
    /// 测试用的短等待参数。
    pub fn fast() -> Self {
        Self {
            after_clear: Duration::from_millis(1),
            line_select_pause: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
            poll_deadline: Duration::from_millis(60),
            confirm_initial: Duration::from_millis(1),
            confirm_factor: 1.5,
            confirm_cap: Duration::from_millis(4),
            confirm_budget: Duration::from_millis(20),
            before_send: Duration::from_millis(1),
        }
    }

    /// 确认阶段的等待序列：从初始值按倍率递增并封顶，总和不超过预算。
    pub fn confirm_waits(&self) -> Vec<Duration> {
        let mut waits = Vec::new();
        let mut wait = self.confirm_initial;
        let mut total = Duration::ZERO;
        while total < self.confirm_budget && !wait.is_zero() {
            waits.push(wait);
            total += wait;
            wait = wait.mul_f64(self.confirm_factor).min(self.confirm_cap);
        }
        waits
    }
}

/// 一次调度的会话：起始时间与累积的提示信息。
#[derive(Debug, Clone)]
pub struct AutomationSession {
    started_at: DateTime<Local>,
    notes: Vec<String>,
}

impl Default for AutomationSession {
    fn default() -> Self {
        Self::start()
    }
}

impl AutomationSession {
    pub fn start() -> Self {
        Self {
            started_at: Local::now(),
            notes: Vec::new(),
        }
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Local::now() - self.started_at).num_milliseconds().max(0)
    }

    /// 记录阶段耗时。
    pub fn stage(&self, label: &str) {
        log::debug!("⏱️ [{}ms] {}", self.elapsed_ms(), label);
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// 最终报告：累积提示 + 角色与总耗时。
    pub fn report(&self, character: &str) -> String {
        let elapsed = self.elapsed_ms();
        log::info!("✅ 调度完成 character={} elapsed_ms={}", character, elapsed);
        format!("{}角色: {}, 用时: {}ms", self.notes.concat(), character, elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_waits_back_off_and_respect_budget() {
        let waits = PipelineTimings::default().confirm_waits();
        assert_eq!(waits[0], Duration::from_millis(10));
        assert_eq!(waits[1], Duration::from_millis(15));
        assert!(waits.iter().all(|w| *w <= Duration::from_millis(80)));
        assert!(waits.contains(&Duration::from_millis(80)));

        let total: Duration = waits.iter().sum();
        let last = *waits.last().expect("non-empty");
        assert!(total >= Duration::from_millis(500));
        assert!(total - last < Duration::from_millis(500));
    }

    #[test]
    fn report_prefixes_notes() {
        let mut session = AutomationSession::start();
        session.note("角色 樱羽艾玛 表情(开心): 3 |");
        let report = session.report("ema");
        assert!(report.starts_with("角色 樱羽艾玛 表情(开心): 3 |角色: ema, 用时: "));
        assert!(report.ends_with("ms"));
    }
}
