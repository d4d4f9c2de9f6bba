//! 资源路径解析。
//!
//! 目录约定：
//! - 背景 `assets/background/<name>.<ext>`
//! - 角色 `assets/chara/<name>/<name> (<idx>).<ext>`
//! - 贴图 `assets/shader/<file>`
//! - 字体 `assets/fonts/<name>.<ttf|otf|ttc>`

use std::path::{Path, PathBuf};

/// 按优先级尝试的图片扩展名。
pub(crate) const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "webp"];
const FONT_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

#[derive(Debug, Clone)]
pub(crate) struct AssetLocator {
    root: PathBuf,
}

impl AssetLocator {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub(crate) fn background_path(&self, name: &str) -> PathBuf {
        probe(&self.root.join("background"), name, &IMAGE_EXTENSIONS)
    }

    pub(crate) fn character_path(&self, character: &str, emotion_index: u32) -> PathBuf {
        let base = format!("{} ({})", character, emotion_index);
        probe(&self.root.join("chara").join(character), &base, &IMAGE_EXTENSIONS)
    }

    /// 通用贴图；绝对路径原样使用。
    pub(crate) fn shader_path(&self, file: &str) -> PathBuf {
        let raw = Path::new(file);
        if raw.is_absolute() {
            return raw.to_path_buf();
        }
        let direct = self.root.join("shader").join(file);
        if direct.is_file() {
            return direct;
        }
        probe(&self.root.join("shader"), file, &IMAGE_EXTENSIONS)
    }

    pub(crate) fn font_path(&self, name: &str) -> PathBuf {
        probe(&self.root.join("fonts"), name, &FONT_EXTENSIONS)
    }
}

/// 依次尝试扩展名，全部不存在时返回第一个扩展名的路径。
fn probe(dir: &Path, base: &str, extensions: &[&str]) -> PathBuf {
    for ext in extensions {
        let candidate = dir.join(format!("{}.{}", base, ext));
        if candidate.is_file() {
            return candidate;
        }
    }
    dir.join(format!("{}.{}", base, extensions[0]))
}

/// 去掉扩展名后的路径字符串，作为格式无关的缓存键。
pub(crate) fn extensionless_key(path: &Path) -> String {
    path.with_extension("").to_string_lossy().to_string()
}
