//! File-local pre-pass collecting names bound to the axios client.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Name of the HTTP client library whose default export is tracked.
pub(super) const CLIENT_LIBRARY: &str = "axios";

struct AliasPatterns {
    /// `import http from 'axios'`, `import http, { AxiosError } from "axios"`
    import: Regex,
    /// `const http = require('axios')`
    require: Regex,
    /// `const api = <name>.create(` with an optional TS type annotation
    factory: Regex,
}

static ALIAS_PATTERNS: OnceLock<AliasPatterns> = OnceLock::new();

fn get_alias_patterns() -> &'static AliasPatterns {
    ALIAS_PATTERNS.get_or_init(|| AliasPatterns {
        import: Regex::new(
            r#"\bimport\s+([A-Za-z_$][\w$]*)\s*(?:,\s*\{[^}\n]*\}\s*)?from\s*['"]axios['"]"#,
        )
        .unwrap(),
        require: Regex::new(
            r#"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*require\s*\(\s*['"]axios['"]\s*\)"#,
        )
        .unwrap(),
        factory: Regex::new(
            r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::\s*[A-Za-z_$][\w$.<>]*\s*)?=\s*([A-Za-z_$][\w$]*)\s*\.\s*create\s*\(",
        )
        .unwrap(),
    })
}

/// Local names bound to the client library or to an instance created from it.
#[derive(Debug, Clone, Default)]
pub(super) struct AliasSet {
    names: HashSet<String>,
}

impl AliasSet {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Scan one file for client aliases.
///
/// Imports are collected first so that `const api = http.create()` after
/// `import http from 'axios'` is recognized as an instance too.
pub(super) fn collect_aliases(text: &str) -> AliasSet {
    let patterns = get_alias_patterns();
    let mut names = HashSet::new();

    for caps in patterns
        .import
        .captures_iter(text)
        .chain(patterns.require.captures_iter(text))
    {
        names.insert(caps[1].to_string());
    }

    for caps in patterns.factory.captures_iter(text) {
        let factory = &caps[2];
        if factory == CLIENT_LIBRARY || names.contains(factory) {
            names.insert(caps[1].to_string());
        }
    }

    AliasSet { names }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_instance() {
        let aliases = collect_aliases("const api = axios.create({ baseURL: '/api' });");
        assert!(aliases.contains("api"));
        assert_eq!(aliases.len(), 1);
    }

    #[test]
    fn test_typed_factory_instance() {
        let aliases = collect_aliases("export const client: AxiosInstance = axios.create();");
        assert!(aliases.contains("client"));
    }

    #[test]
    fn test_import_and_require() {
        let text = "import http, { AxiosError } from 'axios';\nconst legacy = require(\"axios\");";
        let aliases = collect_aliases(text);
        assert!(aliases.contains("http"));
        assert!(aliases.contains("legacy"));
    }

    #[test]
    fn test_instance_from_import_alias() {
        let text = "import http from 'axios';\nlet backend = http.create();";
        let aliases = collect_aliases(text);
        assert!(aliases.contains("backend"));
    }

    #[test]
    fn test_unrelated_factories_ignored() {
        let aliases = collect_aliases("const store = Vuex.create();\nimport React from 'react';");
        assert_eq!(aliases.len(), 0);
    }
}
