//! Path and package filters, and normalization of framework path templates.

use crate::config::{DocConfig, GroupConfig};
use log::warn;
use regex::Regex;

/// An Ant-style path pattern: `?` matches one character, `*` anything within a segment,
/// `**` any number of segments and `{name}` one non-empty segment.
#[derive(Debug, Clone)]
pub struct AntPattern {
    pattern: String,
    regex: Regex,
}

impl AntPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&ant_to_regex(pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

fn ant_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut regex = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let double_star = chars.get(i + 1) == Some(&'*') && chars.get(i + 2) == Some(&'*');
        if c == '/' && double_star && matches!(chars.get(i + 3), None | Some('/')) {
            regex.push_str("(?:/.*)?");
            i += 3;
            continue;
        }
        match c {
            '*' if chars.get(i + 1) == Some(&'*') => {
                regex.push_str(".*");
                i += 1;
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            '{' => {
                while i < chars.len() && chars[i] != '}' {
                    i += 1;
                }
                regex.push_str("[^/]+");
            }
            _ => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }
    regex.push('$');
    regex
}

fn compile(patterns: &[String]) -> Vec<AntPattern> {
    patterns
        .iter()
        .filter_map(|pattern| match AntPattern::new(pattern) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                warn!("Ignoring invalid path pattern {}: {}", pattern, e);
                None
            }
        })
        .collect()
}

/// Include/exclude filter over path templates
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<AntPattern>,
    exclude: Vec<AntPattern>,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        Self {
            include: compile(include),
            exclude: compile(exclude),
        }
    }

    /// Group patterns when the group declares any, the global ones otherwise
    pub fn for_group(config: &DocConfig, group: Option<&GroupConfig>) -> Self {
        match group {
            Some(g) if !g.paths_to_match.is_empty() || !g.paths_to_exclude.is_empty() => {
                Self::new(&g.paths_to_match, &g.paths_to_exclude)
            }
            _ => Self::new(&config.paths_to_match, &config.paths_to_exclude),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(path));
        included && !self.exclude.iter().any(|p| p.matches(path))
    }
}

/// Include/exclude filter over controller module paths. `app::api` and `app.api` are
/// equivalent, and a prefix matches whole segments only.
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl PackageFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        Self {
            include: include.iter().map(|p| normalize_package(p)).collect(),
            exclude: exclude.iter().map(|p| normalize_package(p)).collect(),
        }
    }

    pub fn for_group(config: &DocConfig, group: Option<&GroupConfig>) -> Self {
        match group {
            Some(g) if !g.packages_to_scan.is_empty() || !g.packages_to_exclude.is_empty() => {
                Self::new(&g.packages_to_scan, &g.packages_to_exclude)
            }
            _ => Self::new(&config.packages_to_scan, &config.packages_to_exclude),
        }
    }

    pub fn matches(&self, package: &str) -> bool {
        let package = normalize_package(package);
        let included = self.include.is_empty() || self.include.iter().any(|p| in_package(&package, p));
        included && !self.exclude.iter().any(|p| in_package(&package, p))
    }
}

fn normalize_package(package: &str) -> String {
    package.trim().replace('.', "::")
}

fn in_package(package: &str, prefix: &str) -> bool {
    package == prefix
        || package
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with("::"))
}

/// Rewrites framework placeholders into OpenAPI form: `:id`, `*rest`, `<id>`, `{id: [0-9]+}`
/// and `{*rest}` all become `{id}` / `{rest}`. A trailing slash is dropped.
pub fn normalize_path_template(path: &str) -> String {
    let segments: Vec<String> = path.split('/').map(normalize_segment).collect();
    let mut normalized = segments.join("/");
    if !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

fn normalize_segment(segment: &str) -> String {
    if let Some(name) = segment.strip_prefix(':') {
        return format!("{{{}}}", name);
    }
    if let Some(name) = segment.strip_prefix('*').filter(|n| !n.is_empty()) {
        return format!("{{{}}}", name);
    }
    if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        let name = inner.split(':').next().unwrap_or(inner).trim_end_matches("..");
        return format!("{{{}}}", name.trim());
    }

    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut depth = 1;
        let mut in_name = true;
        let mut name = String::new();
        for c in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                ':' if depth == 1 => in_name = false,
                _ if in_name && depth == 1 => name.push(c),
                _ => {}
            }
        }
        out.push('{');
        out.push_str(name.trim().trim_start_matches('*'));
        out.push('}');
    }
    out
}
