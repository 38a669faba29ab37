//! Structured edits of the front-end project's shared build files.
//!
//! `package.json` is edited as a parsed JSON tree. In `vite.config.js` only
//! the `basePathMap` object literal is parsed and re-rendered; the rest of
//! the module is left byte-for-byte intact.

use serde_json::{json, Map, Value};

use crate::document::{to_strict_json, ConfigMap, ConfigValue};
use crate::kinds::{platform_key, uni_platform, Host};

/// Declaration whose object literal maps build keys to public base paths.
pub const BASE_PATH_MAP_DECL: &str = "const basePathMap";

#[derive(Debug, thiserror::Error)]
pub enum ProjectFileError {
    #[error("Cannot find {0}")]
    MissingSection(&'static str),

    #[error("{section} is not valid: {source}")]
    Parse {
        section: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{section} must be an object")]
    NotAnObject { section: &'static str },

    #[error("Failed to serialize project file: {0}")]
    Serialize(#[source] serde_json::Error),
}

// ---------------------------------------------------------------------------
// package.json
// ---------------------------------------------------------------------------

/// Build entry registered for one `(brand, host)` pair.
#[derive(Debug, Clone)]
pub struct PlatformEntry {
    pub brand: String,
    pub host: String,
    pub app_name: String,
}

impl PlatformEntry {
    pub fn key(&self) -> String {
        platform_key(&self.brand, &self.host)
    }

    fn dev_script(&self) -> (String, String) {
        let key = self.key();
        (format!("dev:{key}"), format!("uni -p {key} --minify"))
    }

    fn build_script(&self) -> (String, String) {
        let key = self.key();
        (
            format!("build:{key}"),
            format!("cross-env UNI_UTS_PLATFORM={key} npm run prebuild && uni build -p {key} --minify"),
        )
    }

    fn uni_app_script(&self) -> Value {
        let mut define = Map::new();
        define.insert(
            format!("MP-{}", self.brand.to_uppercase()),
            Value::Bool(true),
        );
        if let Some(flag) = Host::parse(&self.host).ok().and_then(Host::platform_macro) {
            define.insert(flag.to_string(), Value::Bool(true));
        }
        json!({
            "env": { "UNI_PLATFORM": uni_platform(&self.host) },
            "define": define,
            "title": format!("h5{}", self.app_name),
        })
    }
}

/// Parsed `package.json`.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    root: Map<String, Value>,
    trailing_newline: bool,
}

impl PackageManifest {
    pub fn parse(text: &str) -> Result<Self, ProjectFileError> {
        let root: Value = serde_json::from_str(text).map_err(|source| ProjectFileError::Parse {
            section: "package.json",
            source,
        })?;
        let Value::Object(root) = root else {
            return Err(ProjectFileError::NotAnObject {
                section: "package.json",
            });
        };
        Ok(Self {
            root,
            trailing_newline: text.ends_with('\n'),
        })
    }

    pub fn render(&self) -> Result<String, ProjectFileError> {
        let mut text = serde_json::to_string_pretty(&self.root).map_err(ProjectFileError::Serialize)?;
        if self.trailing_newline {
            text.push('\n');
        }
        Ok(text)
    }

    /// Whether a `dev:{host}-{brand}` script is registered.
    pub fn has_platform(&self, key: &str) -> bool {
        self.root
            .get("scripts")
            .and_then(Value::as_object)
            .is_some_and(|scripts| scripts.contains_key(&format!("dev:{key}")))
    }

    /// Register dev/build scripts and the uni-app build entry, placed ahead
    /// of the existing entries. Returns `false` if already registered.
    pub fn add_platform(&mut self, entry: &PlatformEntry) -> Result<bool, ProjectFileError> {
        let key = entry.key();
        if self.has_platform(&key) {
            return Ok(false);
        }

        let scripts = object_at(&mut self.root, "scripts", "scripts")?;
        let (dev_name, dev_cmd) = entry.dev_script();
        let (build_name, build_cmd) = entry.build_script();
        prepend(
            scripts,
            vec![
                (dev_name, Value::String(dev_cmd)),
                (build_name, Value::String(build_cmd)),
            ],
        );

        let uni_app = object_at(&mut self.root, "uni-app", "uni-app")?;
        let uni_scripts = object_at(uni_app, "scripts", "uni-app.scripts")?;
        uni_scripts.shift_remove(&key);
        prepend(uni_scripts, vec![(key, entry.uni_app_script())]);

        Ok(true)
    }

    /// Remove every entry registered for `key`. Returns `true` if anything
    /// was removed.
    pub fn remove_platform(&mut self, key: &str) -> bool {
        let mut removed = false;
        if let Some(scripts) = self.root.get_mut("scripts").and_then(Value::as_object_mut) {
            removed |= scripts.shift_remove(&format!("dev:{key}")).is_some();
            removed |= scripts.shift_remove(&format!("build:{key}")).is_some();
        }
        if let Some(uni_scripts) = self
            .root
            .get_mut("uni-app")
            .and_then(|v| v.get_mut("scripts"))
            .and_then(Value::as_object_mut)
        {
            removed |= uni_scripts.shift_remove(key).is_some();
        }
        removed
    }

    /// The uni-app build entry for `key`, if present.
    pub fn uni_app_entry(&self, key: &str) -> Option<&Value> {
        self.root.get("uni-app")?.get("scripts")?.get(key)
    }
}

fn object_at<'m>(
    map: &'m mut Map<String, Value>,
    key: &str,
    section: &'static str,
) -> Result<&'m mut Map<String, Value>, ProjectFileError> {
    match map.get_mut(key) {
        Some(Value::Object(inner)) => Ok(inner),
        Some(_) => Err(ProjectFileError::NotAnObject { section }),
        None => Err(ProjectFileError::MissingSection(section)),
    }
}

fn prepend(map: &mut Map<String, Value>, entries: Vec<(String, Value)>) {
    let existing = std::mem::take(map);
    map.extend(entries);
    for (k, v) in existing {
        if !map.contains_key(&k) {
            map.insert(k, v);
        }
    }
}

// ---------------------------------------------------------------------------
// vite.config.js
// ---------------------------------------------------------------------------

/// Byte range of the `basePathMap` object literal, braces included.
fn locate_base_path_map(source: &str) -> Result<(usize, usize), ProjectFileError> {
    let decl = source
        .find(BASE_PATH_MAP_DECL)
        .ok_or(ProjectFileError::MissingSection("basePathMap in vite.config.js"))?;
    let open = source[decl..]
        .find('{')
        .map(|offset| decl + offset)
        .ok_or(ProjectFileError::MissingSection("basePathMap body in vite.config.js"))?;

    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i += 2;
                    while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                        i += 1;
                    }
                    i += 1;
                }
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok((open, i));
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    Err(ProjectFileError::MissingSection("basePathMap end in vite.config.js"))
}

fn parse_base_path_map(section: &str) -> Result<ConfigMap, ProjectFileError> {
    serde_json::from_str(&to_strict_json(section)).map_err(|source| ProjectFileError::Parse {
        section: "basePathMap",
        source,
    })
}

fn render_base_path_map(map: &ConfigMap, indent: &str) -> Result<String, ProjectFileError> {
    let mut out = String::from("{\n");
    for (key, value) in map {
        let rendered = match value {
            ConfigValue::String(s) => js_single_quoted(s),
            other => serde_json::to_string(other).map_err(ProjectFileError::Serialize)?,
        };
        out.push_str(&format!("{indent}  {}: {rendered},\n", js_single_quoted(key)));
    }
    out.push_str(indent);
    out.push('}');
    Ok(out)
}

fn js_single_quoted(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

fn line_indent(source: &str, at: usize) -> &str {
    let line_start = source[..at].rfind('\n').map_or(0, |i| i + 1);
    let line = &source[line_start..at];
    let width = line.len() - line.trim_start().len();
    &line[..width]
}

fn edit_base_path_map<F>(source: &str, edit: F) -> Result<Option<String>, ProjectFileError>
where
    F: FnOnce(&mut ConfigMap) -> bool,
{
    let (open, close) = locate_base_path_map(source)?;
    let mut map = parse_base_path_map(&source[open..=close])?;
    if !edit(&mut map) {
        return Ok(None);
    }
    let decl = source[..open].rfind(BASE_PATH_MAP_DECL).unwrap_or(open);
    let rendered = render_base_path_map(&map, line_indent(source, decl))?;
    Ok(Some(format!(
        "{}{}{}",
        &source[..open],
        rendered,
        &source[close + 1..]
    )))
}

/// Base path registered for `key`, if any.
pub fn base_path_entry(source: &str, key: &str) -> Result<Option<String>, ProjectFileError> {
    let (open, close) = locate_base_path_map(source)?;
    let map = parse_base_path_map(&source[open..=close])?;
    Ok(map.get(key).and_then(ConfigValue::as_str).map(str::to_string))
}

/// Add `key: base` to `basePathMap`. Returns `None` when `key` is already
/// present (the file is left unchanged).
pub fn add_base_path(source: &str, key: &str, base: &str) -> Result<Option<String>, ProjectFileError> {
    edit_base_path_map(source, |map| {
        if map.contains_key(key) {
            return false;
        }
        map.insert(key.to_string(), ConfigValue::from(base));
        true
    })
}

/// Remove `key` from `basePathMap`. Returns `None` when it was absent.
pub fn remove_base_path(source: &str, key: &str) -> Result<Option<String>, ProjectFileError> {
    edit_base_path_map(source, |map| map.shift_remove(key).is_some())
}

// ---------------------------------------------------------------------------
// Prebuild templates
// ---------------------------------------------------------------------------

/// `manifest.json` generated for a new brand.
pub fn prebuild_manifest(brand: &str, app_name: &str) -> Value {
    json!({
        "name": brand,
        "appid": "",
        "description": "",
        "icon": "static/imgs/mine/head.png",
        "package": "com.example.demo",
        "minPlatformVersion": 1062,
        "versionName": "1.0.0",
        "versionCode": "100",
        "transformPx": false,
        "uniStatistics": { "enable": false },
        "vueVersion": "2",
        "h5": {
            "template": "index.html",
            "router": { "mode": "history" },
            "title": app_name,
        },
    })
}

/// `pages-{host}.json` generated for a new channel.
pub fn prebuild_pages(app_name: &str) -> Value {
    json!({
        "pages": [
            {
                "path": "pages/readerPage/readerPage",
                "style": {
                    "navigationBarTitleText": app_name,
                    "onReachBottomDistance": 50,
                    "enablePullDownRefresh": true,
                },
            },
            {
                "path": "pages/loginCallback/loginCallback",
                "style": { "navigationBarTitleText": format!("{app_name}-登陆回调") },
            },
            {
                "path": "pages/userInfo/userInfo",
                "style": { "navigationBarTitleText": format!("{app_name}-用户信息") },
            },
            {
                "path": "pages/testJump/testJump",
                "style": { "navigationBarTitleText": format!("{app_name}-用户信息") },
            },
            {
                "path": "pages/webView/webView",
                "style": { "navigationBarTitleText": app_name },
            },
        ],
        "globalStyle": {
            "navigationBarTitleText": app_name,
            "navigationStyle": "custom",
        },
    })
}
