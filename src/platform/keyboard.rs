//! 基于 `enigo` 的键盘输入模拟。

use enigo::{
    Direction::{Click, Press, Release},
    Enigo, Keyboard, Settings,
};

use crate::error::AppError;
use crate::pipeline::{Key, KeyInjector, KeyStroke};

/// 每批按键新建一个 `Enigo` 实例。
#[derive(Debug, Default, Clone, Copy)]
pub struct EnigoKeyboard;

impl EnigoKeyboard {
    pub fn new() -> Self {
        Self
    }
}

fn map_key(key: Key) -> enigo::Key {
    match key {
        Key::Control => enigo::Key::Control,
        Key::Meta => enigo::Key::Meta,
        Key::Shift => enigo::Key::Shift,
        Key::Home => enigo::Key::Home,
        Key::End => enigo::Key::End,
        Key::Return => enigo::Key::Return,
        Key::Char(c) => enigo::Key::Unicode(c),
    }
}

impl KeyInjector for EnigoKeyboard {
    fn send(&self, strokes: &[KeyStroke]) -> Result<(), AppError> {
        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| AppError::Input(format!("初始化输入模拟失败: {}", e)))?;

        for stroke in strokes {
            let (key, direction) = match *stroke {
                KeyStroke::Press(key) => (key, Press),
                KeyStroke::Release(key) => (key, Release),
                KeyStroke::Click(key) => (key, Click),
            };
            enigo
                .key(map_key(key), direction)
                .map_err(|e| AppError::Input(format!("模拟按键失败 {:?}: {}", stroke, e)))?;
        }

        log::debug!("⌨️ 已发送 {} 个按键事件", strokes.len());
        Ok(())
    }
}
