//! # 按键序列
//!
//! 剪切 / 粘贴 / 发送都表示成 `KeyStep` 列表，由流水线顺序执行：
//! 连续的按键一次交给 `KeyInjector`，`Pause` 在两批按键之间等待。
//! 这样按键注入本身保持无状态，测试只需记录收到的按键。

use std::time::Duration;

use crate::config::CutMode;

/// 逻辑按键，平台实现负责映射到真实键码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Control,
    /// macOS 的 Command 键。
    Meta,
    Shift,
    Home,
    End,
    Return,
    Char(char),
}

impl Key {
    /// 当前系统的快捷键修饰键：macOS 为 Command，其余为 Control。
    pub fn platform_modifier() -> Self {
        if cfg!(target_os = "macos") {
            Self::Meta
        } else {
            Self::Control
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStroke {
    Press(Key),
    Release(Key),
    /// 按下并立即松开。
    Click(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStep {
    Stroke(KeyStroke),
    Pause(Duration),
}

fn chord(modifier: Key, key: char) -> Vec<KeyStep> {
    vec![
        KeyStep::Stroke(KeyStroke::Press(modifier)),
        KeyStep::Stroke(KeyStroke::Click(Key::Char(key))),
        KeyStep::Stroke(KeyStroke::Release(modifier)),
    ]
}

/// 按剪切模式生成按键序列。
///
/// - `Full`：修饰键按住期间依次点击 `a`、`x`
/// - `SingleLine`：`End`，`Shift+Home` 选中整行，停顿 `line_pause` 后剪切
/// - `Direct`：只发送剪切键
pub fn cut_plan(mode: CutMode, modifier: Key, line_pause: Duration) -> Vec<KeyStep> {
    match mode {
        CutMode::Full => vec![
            KeyStep::Stroke(KeyStroke::Press(modifier)),
            KeyStep::Stroke(KeyStroke::Click(Key::Char('a'))),
            KeyStep::Stroke(KeyStroke::Click(Key::Char('x'))),
            KeyStep::Stroke(KeyStroke::Release(modifier)),
        ],
        CutMode::SingleLine => {
            let mut steps = vec![
                KeyStep::Stroke(KeyStroke::Click(Key::End)),
                KeyStep::Stroke(KeyStroke::Press(Key::Shift)),
                KeyStep::Stroke(KeyStroke::Click(Key::Home)),
                KeyStep::Stroke(KeyStroke::Release(Key::Shift)),
                KeyStep::Pause(line_pause),
            ];
            steps.extend(chord(modifier, 'x'));
            steps
        }
        CutMode::Direct => chord(modifier, 'x'),
    }
}

pub fn paste_plan(modifier: Key) -> Vec<KeyStep> {
    chord(modifier, 'v')
}

pub fn enter_plan() -> Vec<KeyStep> {
    vec![KeyStep::Stroke(KeyStroke::Click(Key::Return))]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Batch {
    Keys(Vec<KeyStroke>),
    Pause(Duration),
}

/// 把序列切成“按键批次 / 停顿”交替的片段。
pub(crate) fn batches(steps: &[KeyStep]) -> Vec<Batch> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for step in steps {
        match step {
            KeyStep::Stroke(stroke) => current.push(*stroke),
            KeyStep::Pause(pause) => {
                if !current.is_empty() {
                    out.push(Batch::Keys(std::mem::take(&mut current)));
                }
                out.push(Batch::Pause(*pause));
            }
        }
    }
    if !current.is_empty() {
        out.push(Batch::Keys(current));
    }
    out
}
