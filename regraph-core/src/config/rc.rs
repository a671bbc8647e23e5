use crate::style::ConflictPolicy;
use directories::BaseDirs;
use std::path::PathBuf;
use std::{env, fs, path::Path};

pub const RC_FILE: &str = ".regraphrc";

/// Values picked up from `.regraphrc` files before env overrides are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RcSettings {
    pub registry: Option<String>,
    pub api_key: Option<String>,
    pub max_depth: Option<usize>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub style_conflict: Option<ConflictPolicy>,
    pub base_tailwind: Option<PathBuf>,
    pub base_css: Option<PathBuf>,
}

pub fn expand_env_vars(text: &str) -> String {
    let mut out = String::new();
    let mut i = 0;
    let bytes = text.as_bytes();

    while i < bytes.len() {
        if bytes[i] == b'$' {
            if i + 1 < bytes.len()
                && bytes[i + 1] == b'{'
                && let Some(end) = text[i + 2..].find('}')
            {
                let var = &text[i + 2..i + 2 + end];
                let val = env::var(var).unwrap_or_default();
                out.push_str(&val);
                i += 2 + end + 1;
                continue;
            }

            let mut j = i + 1;
            while j < bytes.len()
                && (bytes[j] == b'_' || (bytes[j] as char).is_ascii_alphanumeric())
            {
                j += 1;
            }

            let var = &text[i + 1..j];
            if !var.is_empty() {
                let val = env::var(var).unwrap_or_default();
                out.push_str(&val);
                i = j;
                continue;
            }

            out.push('$');
            i += 1;
            continue;
        }

        let ch = text[i..].chars().next().unwrap_or_default();
        out.push(ch);
        i += ch.len_utf8().max(1);
    }

    out
}

pub fn normalize_registry_url(value: &str) -> String {
    let mut url = if value.starts_with("//") {
        format!("https:{}", value)
    } else {
        value.to_string()
    };

    while url.ends_with('/') {
        url.pop();
    }

    let (scheme, rest) = if let Some(r) = url.strip_prefix("https://") {
        ("https", r)
    } else if let Some(r) = url.strip_prefix("http://") {
        ("http", r)
    } else {
        return url;
    };

    let mut parts = rest.splitn(2, '/');
    let hostport = parts.next().unwrap_or("").to_ascii_lowercase();
    let suffix = parts.next().unwrap_or("");

    let mut host = hostport.clone();
    if let Some((host_part, port_part)) = hostport.split_once(':') {
        let default_https = scheme == "https" && port_part == "443";
        let default_http = scheme == "http" && port_part == "80";
        if default_https || default_http {
            host = host_part.to_string();
        }
    }

    if suffix.is_empty() {
        format!("{}://{}", scheme, host)
    } else {
        format!("{}://{}/{}", scheme, host, suffix)
    }
}

pub fn read_rc_settings() -> RcSettings {
    let mut settings = RcSettings::default();

    if let Some(base) = BaseDirs::new() {
        apply_rc_file(&base.home_dir().join(RC_FILE), &mut settings);
    }

    // Closer directories are applied last so they take precedence.
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut chain: Vec<PathBuf> = cwd.ancestors().map(Path::to_path_buf).collect();
    chain.reverse();

    for dir in chain {
        apply_rc_file(&dir.join(RC_FILE), &mut settings);
    }

    settings
}

pub fn apply_rc_file(path: &Path, settings: &mut RcSettings) {
    if !path.is_file() {
        return;
    }

    let Ok(data) = fs::read_to_string(path) else {
        return;
    };

    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };

        let key = key.trim();
        let value = expand_env_vars(value.trim());

        if value.is_empty() {
            continue;
        }

        match key {
            "registry" => settings.registry = Some(normalize_registry_url(&value)),
            "_authToken" | "api-key" => settings.api_key = Some(value),
            "max-depth" => {
                if let Ok(parsed) = value.parse::<usize>() {
                    settings.max_depth = Some(parsed);
                }
            }
            "concurrency" => {
                if let Ok(parsed) = value.parse::<usize>()
                    && parsed > 0
                {
                    settings.concurrency = Some(parsed);
                }
            }
            "timeout-secs" => {
                if let Ok(parsed) = value.parse::<u64>()
                    && parsed > 0
                {
                    settings.timeout_secs = Some(parsed);
                }
            }
            "style-conflict" => {
                if let Some(policy) = ConflictPolicy::parse(&value) {
                    settings.style_conflict = Some(policy);
                }
            }
            "base-tailwind" => settings.base_tailwind = Some(base_dir.join(value)),
            "base-css" => settings.base_css = Some(base_dir.join(value)),
            _ => {}
        }
    }
}
