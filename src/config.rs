use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub hashing: Hashing,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub classifier: Classifier,
    #[serde(default)]
    pub splitting: Splitting,
    #[serde(default)]
    pub folder: Folder,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
    pub dump_effective_config: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
            dump_effective_config: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub log_dir: String,
    pub response_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            response_dir: ".".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Hashing {
    /// `full_sha256` or `fast_2x16mb`.
    pub mode: String,
    pub fast_window_bytes: u64,
}
impl Default for Hashing {
    fn default() -> Self {
        Self {
            mode: "fast_2x16mb".into(),
            fast_window_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_input_file_bytes: u64,
    pub max_input_pages: u32,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_file_bytes: 2 * 1024 * 1024 * 1024,
            max_input_pages: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Classifier {
    /// Worker executable; it renders pages, calls the model and prints the
    /// reply envelope on stdout.
    pub program: String,
    pub args: Vec<String>,
    pub model: String,
    pub render_scale: f32,
    /// 0 waits forever.
    pub timeout_seconds: u64,
    pub keep_stderr: bool,
    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,
}
impl Default for Classifier {
    fn default() -> Self {
        Self {
            program: "python3".into(),
            args: vec!["scripts/classify_pages.py".into()],
            model: "gemini-2.5-flash".into(),
            render_scale: 2.0,
            timeout_seconds: 0,
            keep_stderr: true,
            env: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Splitting {
    /// `span` extracts min..max of a bucket's pages, `exact` only the listed pages.
    pub page_selection: String,
    /// Longest page list embedded in an artifact file name before it is
    /// shortened to `<min>-to-<max>`.
    pub max_pages_in_filename: usize,
}
impl Default for Splitting {
    fn default() -> Self {
        Self {
            page_selection: "span".into(),
            max_pages_in_filename: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Folder {
    pub image_extensions: Vec<String>,
    pub skip_single_page: bool,
}
impl Default for Folder {
    fn default() -> Self {
        Self {
            image_extensions: ["png", "jpg", "jpeg", "gif", "bmp", "tiff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            skip_single_page: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub enabled: bool,
    pub sink_path: String,
}
impl Default for Usage {
    fn default() -> Self {
        Self {
            enabled: true,
            sink_path: "usage.jsonl".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write_response_file: bool,
    pub response_file_prefix: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_response_file: true,
            response_file_prefix: "file_".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}
