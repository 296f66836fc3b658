use crate::config::Config;
use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::OnceLock;
use time::format_description::well_known::Rfc3339;
use unicode_normalization::UnicodeNormalization;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Seconds since the epoch, used as the default correlation id.
pub fn unix_timestamp() -> String {
    time::OffsetDateTime::now_utc().unix_timestamp().to_string()
}

pub fn hash_file(cfg: &Config, path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| "open file")?;
    let meta = f.metadata().with_context(|| "metadata")?;
    let size = meta.len();

    match cfg.hashing.mode.as_str() {
        "full_sha256" => {
            let mut h = Sha256::new();
            let mut buf = vec![0u8; 1024 * 1024];
            loop {
                let n = f.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                h.update(&buf[..n]);
            }
            Ok(format!("{:x}", h.finalize()))
        }
        "fast_2x16mb" => {
            let w = cfg.hashing.fast_window_bytes.min(size);
            let mut h = Sha256::new();

            if w > 0 {
                f.seek(SeekFrom::Start(0))?;
                let mut buf = vec![0u8; w as usize];
                f.read_exact(&mut buf)?;
                h.update(&buf);

                if size > w {
                    f.seek(SeekFrom::Start(size - w))?;
                    let mut buf2 = vec![0u8; w as usize];
                    f.read_exact(&mut buf2)?;
                    h.update(&buf2);
                }
            }

            h.update(size.to_le_bytes());
            Ok(format!("{:x}", h.finalize()))
        }
        _ => anyhow::bail!("unknown hashing.mode: {}", cfg.hashing.mode),
    }
}

/// Document type to file name fragment: `Bank Statement` -> `bank-statement`.
pub fn slugify(raw: &str) -> String {
    static NON_SLUG: OnceLock<Regex> = OnceLock::new();
    let re = NON_SLUG.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

    let folded: String = raw
        .nfkd()
        .filter(|c| c.is_ascii())
        .collect::<String>()
        .to_ascii_lowercase();
    let slug = re.replace_all(&folded, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug.to_string()
    }
}

/// True when `path` has one of `exts` as its extension, ignoring case.
pub fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| exts.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

pub fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}
